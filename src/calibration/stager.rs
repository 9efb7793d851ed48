//! Batch staging
//!
//! Walks the shuffled image list in fixed-size batches. Each batch is decoded,
//! clamped, packed into one contiguous host buffer and copied into the single
//! device buffer allocated at construction. The host buffer lives only for the
//! duration of one call; the device buffer is overwritten in place every time.

use std::path::Path;

use tracing::debug;

use super::decoder::ImageDecoder;
use super::manifest::ImageList;
use crate::config::CalibratorConfig;
use crate::device::{Device, DeviceBuffer, DeviceHandle};
use crate::error::{KolosalError, Result};

/// Lower bound applied to every staged pixel value
pub const PIXEL_MIN: f32 = 0.0;
/// Upper bound applied to every staged pixel value
pub const PIXEL_MAX: f32 = 1.0;

/// Clamp a decoded value into `[PIXEL_MIN, PIXEL_MAX]`; NaN maps to `PIXEL_MIN`.
#[inline]
pub fn clamp_pixel(value: f32) -> f32 {
    value.max(PIXEL_MIN).min(PIXEL_MAX)
}

/// Result of asking for the next calibration batch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchOutcome {
    /// A full batch now sits in the device buffer behind this handle
    Batch(DeviceHandle),
    /// Not enough images remain for another full batch
    Exhausted,
}

impl BatchOutcome {
    pub fn is_exhausted(&self) -> bool {
        matches!(self, BatchOutcome::Exhausted)
    }

    /// Device handle of a staged batch
    pub fn handle(&self) -> Option<DeviceHandle> {
        match self {
            BatchOutcome::Batch(handle) => Some(*handle),
            BatchOutcome::Exhausted => None,
        }
    }
}

/// Iteration driver over the calibration set
pub struct BatchStager<D: Device, I: ImageDecoder> {
    images: ImageList,
    decoder: I,
    buffer: D::Buffer,
    input_blob_name: String,
    batch_size: usize,
    input_size: usize,
    input_h: usize,
    input_w: usize,
    /// Index of the next unconsumed image
    cursor: usize,
}

impl<D: Device, I: ImageDecoder> BatchStager<D, I> {
    /// Allocate the device buffer for `config.batch_size` images.
    ///
    /// `config` must already have passed [`CalibratorConfig::validate`].
    pub(crate) fn new(images: ImageList, config: &CalibratorConfig, device: &D, decoder: I) -> Result<Self> {
        let buffer = device.allocate(config.batch_elements())?;
        debug!(
            device = device.name(),
            images = images.len(),
            batch_size = config.batch_size,
            "Batch stager ready"
        );

        Ok(Self {
            images,
            decoder,
            buffer,
            input_blob_name: config.input_blob_name.clone(),
            batch_size: config.batch_size,
            input_size: config.input_size,
            input_h: config.input_h,
            input_w: config.input_w,
            cursor: 0,
        })
    }

    /// Stage the next batch for the binding named in slot 0 of `binding_names`.
    ///
    /// A binding mismatch is checked before anything is decoded or copied and
    /// is returned as the fatal [`KolosalError::BindingMismatch`]. The cursor
    /// only advances once the batch is on the device.
    pub fn next_batch(&mut self, binding_names: &[&str]) -> Result<BatchOutcome> {
        self.check_binding(binding_names)?;

        if self.cursor + self.batch_size > self.images.len() {
            debug!(
                cursor = self.cursor,
                images = self.images.len(),
                "Calibration set exhausted"
            );
            return Ok(BatchOutcome::Exhausted);
        }

        let start = self.cursor;
        let end = start + self.batch_size;
        let mut host = Vec::with_capacity(self.batch_size * self.input_size);
        for path in &self.images.paths()[start..end] {
            let data = self.decode(path)?;
            host.extend(data.into_iter().map(clamp_pixel));
        }

        self.buffer.copy_from_host(&host)?;
        self.cursor = end;

        debug!(cursor = self.cursor, batch_size = self.batch_size, "Staged calibration batch");
        Ok(BatchOutcome::Batch(self.buffer.handle()))
    }

    fn check_binding(&self, binding_names: &[&str]) -> Result<()> {
        match binding_names.first() {
            Some(name) if *name == self.input_blob_name => Ok(()),
            other => Err(KolosalError::BindingMismatch {
                expected: self.input_blob_name.clone(),
                actual: other.map_or_else(|| "<none>".to_string(), |n| n.to_string()),
            }),
        }
    }

    fn decode(&self, path: &Path) -> Result<Vec<f32>> {
        let data = self.decoder.decode(path, self.input_h, self.input_w)?;
        if data.len() != self.input_size {
            return Err(KolosalError::ShapeError {
                expected: format!("{} elements for {}", self.input_size, path.display()),
                actual: format!("{} elements", data.len()),
            });
        }
        Ok(data)
    }

    /// Index of the next unconsumed image
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Full batches still available
    pub fn remaining_batches(&self) -> usize {
        (self.images.len() - self.cursor) / self.batch_size
    }

    /// The shuffled image list
    pub fn images(&self) -> &ImageList {
        &self.images
    }

    /// Name of the input binding batches are staged for
    pub fn input_blob_name(&self) -> &str {
        &self.input_blob_name
    }

    /// The device buffer holding the most recent batch
    pub fn device_buffer(&self) -> &D::Buffer {
        &self.buffer
    }
}
