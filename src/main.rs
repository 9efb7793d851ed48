//! Kolosal INT8 - Main Entry Point
//!
//! Runs INT8 calibration and inspects calibration tables from the command line.

use clap::Parser;
use kolosal_int8::cli::{cmd_calibrate, cmd_init_config, cmd_inspect, cmd_manifest, Cli, Commands};

fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "kolosal_int8=info".into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Calibrate { config, seed, no_cache } => {
            cmd_calibrate(&config, seed, no_cache)?;
        }
        Commands::Inspect { table } => {
            cmd_inspect(&table)?;
        }
        Commands::Manifest { path, batch_size } => {
            cmd_manifest(&path, batch_size)?;
        }
        Commands::InitConfig { output } => {
            cmd_init_config(&output)?;
        }
    }

    Ok(())
}
