//! Kolosal INT8 - post-training quantization calibrator
//!
//! This crate feeds an INT8 calibration engine with representative input
//! batches and persists the calibration table it produces:
//! - Calibration manifests and one-time randomized sampling order
//! - Batch staging into a single, reused device input buffer
//! - Calibration table caching so later runs skip staging entirely
//!
//! # Modules
//!
//! - [`calibration`] - Manifest loading, shuffling, batch staging, table cache, calibrator
//! - [`device`] - Device memory buffers the engine reads batches from
//! - [`config`] - Calibrator configuration
//! - [`cli`] - Command-line interface
//!
//! # Example
//!
//! ```no_run
//! use kolosal_int8::prelude::*;
//!
//! let config = CalibratorConfig::load("calibration.json")?;
//! let decoder = RawTensorDecoder::new(config.channels());
//! let mut calibrator = EntropyCalibrator::new(config, &HostDevice::new(), decoder)?;
//!
//! let outcome = run_calibration(&mut calibrator, &mut MinMaxEngine::new())?;
//! println!("table: {} bytes (cached: {})", outcome.table().len(), outcome.is_cached());
//! # Ok::<(), KolosalError>(())
//! ```

// Core error handling
pub mod error;
pub mod config;

// Calibration
pub mod calibration;
pub mod device;

// Services
pub mod cli;

pub use error::{KolosalError, Result};

/// Re-export commonly used types
pub mod prelude {
    // Error handling
    pub use crate::error::{KolosalError, Result};

    // Configuration
    pub use crate::config::CalibratorConfig;

    // Calibration
    pub use crate::calibration::{
        run_calibration, BatchOutcome, CalibrationCache, CalibrationEngine, CalibrationOutcome,
        CalibrationTable, CalibratorState, EntropyCalibrator, ImageDecoder, ImageList,
        HostReadback, Int8Calibrator, MinMaxEngine, RawTensorDecoder, SampleShuffler,
    };

    // Device
    pub use crate::device::{Device, DeviceBuffer, DeviceHandle, HostDevice};
}
