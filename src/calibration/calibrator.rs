//! INT8 entropy calibrator
//!
//! Implements the three capabilities a calibration engine expects from its
//! calibrator: the next input batch, a previously computed table if one exists,
//! and persistence of a freshly computed table.

use std::cell::OnceCell;

use rand::Rng;
use tracing::info;

use super::cache::CalibrationCache;
use super::decoder::ImageDecoder;
use super::manifest::ImageList;
use super::shuffle::SampleShuffler;
use super::stager::{BatchOutcome, BatchStager};
use crate::config::CalibratorConfig;
use crate::device::{Device, DeviceBuffer};
use crate::error::{KolosalError, Result};

/// Calibrator capabilities consumed by a calibration engine
pub trait Int8Calibrator {
    /// Images per staged batch
    fn batch_size(&self) -> usize;

    /// Stage the next batch for the bindings named by the engine.
    fn get_batch(&mut self, binding_names: &[&str]) -> Result<BatchOutcome>;

    /// A previously written calibration table, if one should be reused
    fn read_calibration_cache(&self) -> Option<&[u8]>;

    /// Persist a table produced by the engine
    fn write_calibration_cache(&mut self, table: &[u8]) -> Result<()>;

    /// Pointer-slot form of [`get_batch`](Int8Calibrator::get_batch) used at
    /// native engine boundaries: on success slot 0 receives the device address.
    fn get_batch_bindings(&mut self, binding_names: &[&str], bindings: &mut [usize]) -> Result<bool> {
        if bindings.is_empty() {
            return Err(KolosalError::InvalidParameter {
                name: "bindings".to_string(),
                value: "0 slots".to_string(),
                reason: "at least one binding slot is required".to_string(),
            });
        }
        match self.get_batch(binding_names)? {
            BatchOutcome::Batch(handle) => {
                bindings[0] = handle.addr();
                Ok(true)
            }
            BatchOutcome::Exhausted => Ok(false),
        }
    }
}

/// Calibrators whose most recent batch can be copied back to the host.
///
/// This is what [`run_calibration`](super::run_calibration) needs on top of
/// [`Int8Calibrator`] to feed a host-side engine.
pub trait HostReadback: Int8Calibrator {
    /// Name of the input binding batches are staged for
    fn input_name(&self) -> &str;

    /// Number of f32 elements in one staged batch
    fn batch_elements(&self) -> usize;

    /// Copy the most recently staged batch into `host`
    fn read_staged_batch(&self, host: &mut [f32]) -> Result<()>;
}

/// Lifecycle of the batch side of a calibrator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalibratorState {
    /// Batches may still be staged
    Ready,
    /// The calibration set has run out; terminal
    Exhausted,
}

/// Calibrator over a shuffled image manifest with a file-backed table cache
pub struct EntropyCalibrator<D: Device, I: ImageDecoder> {
    config: CalibratorConfig,
    stager: BatchStager<D, I>,
    cache: CalibrationCache,
    /// Table loaded on the first cache request; never refreshed by writes
    table: OnceCell<Option<Vec<u8>>>,
    state: CalibratorState,
}

impl<D: Device, I: ImageDecoder> EntropyCalibrator<D, I> {
    /// Build a calibrator that shuffles with `config.seed`, or with fresh
    /// entropy when no seed is set.
    pub fn new(config: CalibratorConfig, device: &D, decoder: I) -> Result<Self> {
        let shuffler = match config.seed {
            Some(seed) => SampleShuffler::new().with_seed(seed),
            None => SampleShuffler::new(),
        };
        let mut rng = shuffler.rng();
        Self::with_rng(config, device, decoder, &mut rng)
    }

    /// Build a calibrator that shuffles the manifest with `rng`.
    ///
    /// Configuration is validated before the manifest or device are touched.
    pub fn with_rng<R: Rng + ?Sized>(
        config: CalibratorConfig,
        device: &D,
        decoder: I,
        rng: &mut R,
    ) -> Result<Self> {
        config.validate()?;
        let cache = CalibrationCache::new(&config.calibration_table_path, config.read_cache)?;

        let mut images = ImageList::load(&config.calibration_set_path)?;
        SampleShuffler::shuffle_with(&mut images, rng);

        let stager = BatchStager::new(images, &config, device, decoder)?;
        info!(
            images = stager.images().len(),
            batches = stager.remaining_batches(),
            batch_size = config.batch_size,
            input = %config.input_blob_name,
            "INT8 calibrator ready"
        );

        Ok(Self {
            config,
            stager,
            cache,
            table: OnceCell::new(),
            state: CalibratorState::Ready,
        })
    }

    pub fn config(&self) -> &CalibratorConfig {
        &self.config
    }

    pub fn state(&self) -> CalibratorState {
        self.state
    }

    /// Index of the next unconsumed image
    pub fn cursor(&self) -> usize {
        self.stager.cursor()
    }

    /// The shuffled image list
    pub fn images(&self) -> &ImageList {
        self.stager.images()
    }

    /// The device buffer holding the most recent batch
    pub fn device_buffer(&self) -> &D::Buffer {
        self.stager.device_buffer()
    }

    pub fn cache(&self) -> &CalibrationCache {
        &self.cache
    }
}

impl<D: Device, I: ImageDecoder> Int8Calibrator for EntropyCalibrator<D, I> {
    fn batch_size(&self) -> usize {
        self.stager.batch_size()
    }

    fn get_batch(&mut self, binding_names: &[&str]) -> Result<BatchOutcome> {
        if self.state == CalibratorState::Exhausted {
            return Ok(BatchOutcome::Exhausted);
        }

        let outcome = self.stager.next_batch(binding_names)?;
        if outcome.is_exhausted() {
            self.state = CalibratorState::Exhausted;
            info!(
                staged_images = self.stager.cursor(),
                batches = self.stager.cursor() / self.stager.batch_size(),
                "Calibration batches exhausted"
            );
        }
        Ok(outcome)
    }

    fn read_calibration_cache(&self) -> Option<&[u8]> {
        self.table.get_or_init(|| self.cache.read()).as_deref()
    }

    fn write_calibration_cache(&mut self, table: &[u8]) -> Result<()> {
        self.cache.write(table)
    }
}

impl<D: Device, I: ImageDecoder> HostReadback for EntropyCalibrator<D, I> {
    fn input_name(&self) -> &str {
        &self.config.input_blob_name
    }

    fn batch_elements(&self) -> usize {
        self.config.batch_elements()
    }

    fn read_staged_batch(&self, host: &mut [f32]) -> Result<()> {
        self.stager.device_buffer().copy_to_host(host)
    }
}
