//! Kolosal INT8 CLI Module
//!
//! Command-line interface for running calibration, inspecting calibration
//! tables and checking calibration manifests.

use clap::{Parser, Subcommand};
use colored::*;
use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::calibration::{
    run_calibration, CalibrationOutcome, CalibrationTable, EntropyCalibrator, ImageList,
    MinMaxEngine, RawTensorDecoder,
};
use crate::config::CalibratorConfig;
use crate::device::HostDevice;

// ─── Styling helpers ───────────────────────────────────────────────────────────

fn dim(s: &str) -> ColoredString   { s.truecolor(100, 100, 100) }
fn muted(s: &str) -> ColoredString { s.truecolor(140, 140, 140) }
fn ok(s: &str) -> ColoredString     { s.truecolor(100, 210, 120) }

fn step_ok(msg: &str) {
    println!("  {} {}", ok("✓"), msg);
}

fn section(title: &str) {
    println!();
    println!("  {}", title.white().bold());
    println!("  {}", dim(&"─".repeat(56)));
}

fn kv(key: &str, val: impl std::fmt::Display) {
    println!("  {:<14} {}", muted(key), val);
}

// ─── CLI definition ────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "kolosal-int8")]
#[command(author = "KolosalAI")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "INT8 calibration batch staging and calibration table caching")]
#[command(long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run calibration with the min-max reference engine
    Calibrate {
        /// Calibrator configuration file (JSON)
        #[arg(short, long)]
        config: PathBuf,

        /// Fix the shuffle seed for a reproducible batch order
        #[arg(long)]
        seed: Option<u64>,

        /// Ignore any existing calibration table
        #[arg(long)]
        no_cache: bool,
    },

    /// Show the contents of a calibration table
    Inspect {
        /// Calibration table file
        table: PathBuf,
    },

    /// Count images and full batches in a calibration manifest
    Manifest {
        /// Manifest file, one image path per line
        path: PathBuf,

        /// Batch size to count full batches for
        #[arg(short, long, default_value = "4")]
        batch_size: usize,
    },

    /// Write a default configuration file
    InitConfig {
        /// Output configuration file
        #[arg(default_value = "calibration.json")]
        output: PathBuf,
    },
}

// ─── Calibrate ─────────────────────────────────────────────────────────────────

pub fn cmd_calibrate(config_path: &Path, seed: Option<u64>, no_cache: bool) -> anyhow::Result<()> {
    section("INT8 Calibration");

    let mut config = CalibratorConfig::load(config_path)?;
    if let Some(seed) = seed {
        config = config.with_seed(seed);
    }
    if no_cache {
        config = config.with_read_cache(false);
    }

    kv("Manifest", config.calibration_set_path.display());
    kv("Table", config.calibration_table_path.display());
    kv("Input", format!(
        "{} [{}x{}x{}]",
        config.input_blob_name,
        config.channels(),
        config.input_h,
        config.input_w
    ));
    kv("Batch size", config.batch_size);
    println!();

    let start = Instant::now();
    let decoder = RawTensorDecoder::new(config.channels());
    let mut calibrator = EntropyCalibrator::new(config, &HostDevice::new(), decoder)?;
    let mut engine = MinMaxEngine::new();

    match run_calibration(&mut calibrator, &mut engine)? {
        CalibrationOutcome::Cached(table) => {
            step_ok(&format!("Reused existing table ({} bytes)", table.len()));
        }
        CalibrationOutcome::Computed { table, batches } => {
            step_ok(&format!(
                "Calibrated on {} batches / {} images in {:.2}s",
                batches,
                engine.images(),
                start.elapsed().as_secs_f64()
            ));
            step_ok(&format!("Input scale {:.6e}", engine.scale()));
            step_ok(&format!(
                "Wrote {} bytes to {}",
                table.len(),
                calibrator.cache().path().display()
            ));
        }
    }

    println!();
    Ok(())
}

// ─── Inspect ───────────────────────────────────────────────────────────────────

pub fn cmd_inspect(table_path: &Path) -> anyhow::Result<()> {
    section("Calibration Table");

    let bytes = std::fs::read(table_path)?;
    kv("File", table_path.display());
    kv("Size", format!("{} bytes", bytes.len()));

    match CalibrationTable::parse(&bytes) {
        Ok(table) => {
            kv("Header", &table.header);
            kv("Tensors", table.scales.len());
            println!();
            println!("  {:<32} {:>14}", muted("Tensor"), muted("Scale"));
            println!("  {}", dim(&"─".repeat(48)));
            for (name, scale) in &table.scales {
                println!("  {:<32} {:>14.6e}", name, scale);
            }
        }
        Err(e) => {
            kv("Format", format!("opaque ({})", e));
        }
    }

    println!();
    Ok(())
}

// ─── Manifest ──────────────────────────────────────────────────────────────────

pub fn cmd_manifest(path: &Path, batch_size: usize) -> anyhow::Result<()> {
    section("Calibration Manifest");

    if batch_size == 0 {
        anyhow::bail!("batch size must be positive");
    }

    let images = ImageList::load(path)?;
    let batches = images.full_batches(batch_size);
    kv("File", path.display());
    kv("Images", images.len());
    kv("Batches", format!("{} x {}", batches, batch_size));
    kv("Unused", images.len() - batches * batch_size);

    let missing = images.paths().iter().filter(|p| !p.exists()).count();
    if missing > 0 {
        println!();
        println!("  {} {} listed images not found", "!".yellow(), missing);
    }

    println!();
    Ok(())
}

// ─── Init config ───────────────────────────────────────────────────────────────

pub fn cmd_init_config(output: &Path) -> anyhow::Result<()> {
    if output.exists() {
        anyhow::bail!("{} already exists", output.display());
    }
    CalibratorConfig::default().save(output)?;
    step_ok(&format!("Wrote default configuration to {}", output.display()));
    Ok(())
}
