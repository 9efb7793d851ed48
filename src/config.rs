//! Calibrator configuration

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{KolosalError, Result};

/// Configuration for the INT8 entropy calibrator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalibratorConfig {
    /// Number of images staged per batch
    pub batch_size: usize,

    /// Manifest listing calibration image paths, one per line
    pub calibration_set_path: PathBuf,

    /// File the calibration table is read from and written to
    pub calibration_table_path: PathBuf,

    /// Number of f32 elements per image (height * width * channels)
    pub input_size: usize,

    /// Network input height
    pub input_h: usize,

    /// Network input width
    pub input_w: usize,

    /// Name of the network's single input binding
    pub input_blob_name: String,

    /// Reuse an existing calibration table instead of recalibrating
    pub read_cache: bool,

    /// Shuffle seed; `None` draws a fresh order every run
    pub seed: Option<u64>,
}

impl Default for CalibratorConfig {
    fn default() -> Self {
        Self {
            batch_size: 4,
            calibration_set_path: PathBuf::from("calibration_images.txt"),
            calibration_table_path: PathBuf::from("calibration.table"),
            input_size: 3 * 416 * 416,
            input_h: 416,
            input_w: 416,
            input_blob_name: "data".to_string(),
            read_cache: true,
            seed: None,
        }
    }
}

impl CalibratorConfig {
    /// Create a new calibrator configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method to set batch size
    pub fn with_batch_size(mut self, size: usize) -> Self {
        self.batch_size = size;
        self
    }

    /// Builder method to set the image manifest path
    pub fn with_calibration_set(mut self, path: impl Into<PathBuf>) -> Self {
        self.calibration_set_path = path.into();
        self
    }

    /// Builder method to set the calibration table path
    pub fn with_calibration_table(mut self, path: impl Into<PathBuf>) -> Self {
        self.calibration_table_path = path.into();
        self
    }

    /// Builder method to set the input geometry
    pub fn with_input_shape(mut self, height: usize, width: usize, channels: usize) -> Self {
        self.input_h = height;
        self.input_w = width;
        self.input_size = height.saturating_mul(width).saturating_mul(channels);
        self
    }

    /// Builder method to set the input binding name
    pub fn with_input_blob_name(mut self, name: impl Into<String>) -> Self {
        self.input_blob_name = name.into();
        self
    }

    /// Builder method to toggle reuse of an existing calibration table
    pub fn with_read_cache(mut self, read_cache: bool) -> Self {
        self.read_cache = read_cache;
        self
    }

    /// Builder method to fix the shuffle seed
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Channels per pixel implied by `input_size`
    pub fn channels(&self) -> usize {
        match self.input_h.checked_mul(self.input_w) {
            Some(plane) if plane > 0 => self.input_size / plane,
            _ => 0,
        }
    }

    /// Number of f32 elements in one staged batch.
    ///
    /// Saturates for configurations that [`validate`](Self::validate) rejects.
    pub fn batch_elements(&self) -> usize {
        self.batch_size.saturating_mul(self.input_size)
    }

    /// Check every option before any file or device resource is touched.
    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(KolosalError::InvalidParameter {
                name: "batch_size".to_string(),
                value: self.batch_size.to_string(),
                reason: "must be positive".to_string(),
            });
        }
        if self.input_h == 0 || self.input_w == 0 {
            return Err(KolosalError::InvalidParameter {
                name: "input_h x input_w".to_string(),
                value: format!("{}x{}", self.input_h, self.input_w),
                reason: "dimensions must be positive".to_string(),
            });
        }
        let plane = self.input_h.checked_mul(self.input_w).ok_or_else(|| {
            KolosalError::InvalidParameter {
                name: "input_h x input_w".to_string(),
                value: format!("{}x{}", self.input_h, self.input_w),
                reason: "image plane overflows usize".to_string(),
            }
        })?;
        if self.input_size == 0 || self.input_size % plane != 0 {
            return Err(KolosalError::InvalidParameter {
                name: "input_size".to_string(),
                value: self.input_size.to_string(),
                reason: format!("must be a positive multiple of {}x{}", self.input_h, self.input_w),
            });
        }
        let batch_bytes = self
            .batch_size
            .checked_mul(self.input_size)
            .and_then(|elements| elements.checked_mul(std::mem::size_of::<f32>()));
        if batch_bytes.is_none() {
            return Err(KolosalError::InvalidParameter {
                name: "batch_size".to_string(),
                value: self.batch_size.to_string(),
                reason: format!("batch of {} f32 elements per image overflows usize", self.input_size),
            });
        }
        if self.calibration_table_path.as_os_str().is_empty() {
            return Err(KolosalError::ConfigError(
                "calibration table path is empty".to_string(),
            ));
        }
        if self.calibration_set_path.as_os_str().is_empty() {
            return Err(KolosalError::ConfigError(
                "calibration set path is empty".to_string(),
            ));
        }
        if self.input_blob_name.is_empty() {
            return Err(KolosalError::ConfigError(
                "input blob name is empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Save the configuration as pretty JSON
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Load a configuration from JSON; missing fields take their defaults
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&json)?;
        Ok(config)
    }
}
