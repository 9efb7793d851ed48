//! Calibration run driver
//!
//! Drives the handoff between a calibrator and a calibration engine:
//!
//! 1. Ask the calibrator for an existing table. If there is one, the run ends
//!    there and no batch is staged.
//! 2. Otherwise pull batches until the calibrator reports exhaustion, feeding
//!    each one to the engine.
//! 3. Let the engine produce its table and persist it.
//!
//! Any error aborts the run before step 3 writes anything.

use tracing::info;

use super::calibrator::HostReadback;
use super::stager::BatchOutcome;
use super::table::CalibrationTable;
use crate::error::{KolosalError, Result};

/// Quantization algorithm fed by the calibrator
pub trait CalibrationEngine {
    /// Consume one staged batch of `batch_size` images laid out back to back
    fn observe(&mut self, batch: &[f32], batch_size: usize) -> Result<()>;

    /// Produce the calibration table after the last batch
    fn finish(&mut self, input_name: &str) -> Result<Vec<u8>>;
}

/// How a calibration run obtained its table
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CalibrationOutcome {
    /// Reused the table already on disk
    Cached(Vec<u8>),
    /// Computed from `batches` staged batches and written to disk
    Computed { table: Vec<u8>, batches: usize },
}

impl CalibrationOutcome {
    pub fn table(&self) -> &[u8] {
        match self {
            CalibrationOutcome::Cached(table) => table,
            CalibrationOutcome::Computed { table, .. } => table,
        }
    }

    pub fn is_cached(&self) -> bool {
        matches!(self, CalibrationOutcome::Cached(_))
    }
}

/// Run calibration to completion, reusing the cached table when allowed.
pub fn run_calibration<C, E>(calibrator: &mut C, engine: &mut E) -> Result<CalibrationOutcome>
where
    C: HostReadback + ?Sized,
    E: CalibrationEngine,
{
    if let Some(table) = calibrator.read_calibration_cache() {
        info!(bytes = table.len(), "Reusing calibration table, skipping batch staging");
        return Ok(CalibrationOutcome::Cached(table.to_vec()));
    }

    let input_name = calibrator.input_name().to_string();
    let batch_size = calibrator.batch_size();
    let mut host = vec![0.0f32; calibrator.batch_elements()];
    let mut batches = 0usize;

    loop {
        match calibrator.get_batch(&[input_name.as_str()])? {
            BatchOutcome::Batch(_) => {
                calibrator.read_staged_batch(&mut host)?;
                engine.observe(&host, batch_size)?;
                batches += 1;
            }
            BatchOutcome::Exhausted => break,
        }
    }

    if batches == 0 {
        return Err(KolosalError::ConfigError(format!(
            "calibration set holds fewer images than one batch of {}",
            batch_size
        )));
    }

    let table = engine.finish(&input_name)?;
    calibrator.write_calibration_cache(&table)?;
    info!(batches, bytes = table.len(), "Calibration complete");
    Ok(CalibrationOutcome::Computed { table, batches })
}

/// Header written by [`MinMaxEngine`]
pub const MIN_MAX_HEADER: &str = "TRT-MinMaxCalibration";

/// Symmetric per-tensor min-max engine for the network input.
///
/// Emits `max|v| / 127` as the input scale in the text table layout. Useful for
/// dry runs of the staging pipeline; it does not replace entropy calibration.
#[derive(Debug, Clone, Default)]
pub struct MinMaxEngine {
    max_abs: f32,
    batches: usize,
    images: usize,
}

impl MinMaxEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Largest finite magnitude observed so far
    pub fn max_abs(&self) -> f32 {
        self.max_abs
    }

    pub fn batches(&self) -> usize {
        self.batches
    }

    pub fn images(&self) -> usize {
        self.images
    }

    /// Input scale implied by the observed range
    pub fn scale(&self) -> f32 {
        if self.max_abs < 1e-10 {
            1e-10
        } else {
            self.max_abs / 127.0
        }
    }
}

impl CalibrationEngine for MinMaxEngine {
    fn observe(&mut self, batch: &[f32], batch_size: usize) -> Result<()> {
        if batch_size == 0 || batch.len() % batch_size != 0 {
            return Err(KolosalError::ShapeError {
                expected: format!("a multiple of batch size {}", batch_size),
                actual: format!("{} elements", batch.len()),
            });
        }

        self.max_abs = batch
            .iter()
            .filter(|v| v.is_finite())
            .fold(self.max_abs, |acc, v| acc.max(v.abs()));
        self.batches += 1;
        self.images += batch_size;
        Ok(())
    }

    fn finish(&mut self, input_name: &str) -> Result<Vec<u8>> {
        if self.batches == 0 {
            return Err(KolosalError::ConfigError(
                "no calibration batches observed".to_string(),
            ));
        }

        let mut table = CalibrationTable::new(MIN_MAX_HEADER);
        table.push(input_name, self.scale());
        Ok(table.to_bytes())
    }
}
