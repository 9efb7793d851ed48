//! INT8 Calibration Module
//!
//! Supplies representative input batches to an INT8 calibration engine and
//! caches the resulting calibration table so it is computed once per
//! model/dataset pair.
//!
//! Data flows from the image manifest through a one-time shuffle into the
//! batch stager, which fills a device buffer on demand. The engine consumes
//! those batches and hands back a table, which the cache store persists for
//! later runs to short-circuit staging entirely.

mod cache;
mod calibrator;
mod decoder;
mod manifest;
mod session;
mod shuffle;
mod stager;
pub mod table;

pub use cache::CalibrationCache;
pub use calibrator::{CalibratorState, EntropyCalibrator, HostReadback, Int8Calibrator};
pub use decoder::{ImageDecoder, RawTensorDecoder};
pub use manifest::ImageList;
pub use session::{run_calibration, CalibrationEngine, CalibrationOutcome, MinMaxEngine, MIN_MAX_HEADER};
pub use shuffle::SampleShuffler;
pub use stager::{clamp_pixel, BatchOutcome, PIXEL_MAX, PIXEL_MIN};
pub use table::CalibrationTable;
