//! Image decode collaborator
//!
//! Decoding and resizing live outside the calibrator. A decoder receives an
//! image path and the network input size and returns the image as a flat f32
//! buffer of `height * width * channels` elements in network input layout.

use std::path::Path;

use crate::error::{KolosalError, Result};

/// Produces network-ready f32 data for one calibration image
pub trait ImageDecoder {
    fn decode(&self, path: &Path, height: usize, width: usize) -> Result<Vec<f32>>;
}

impl<F> ImageDecoder for F
where
    F: Fn(&Path, usize, usize) -> Result<Vec<f32>>,
{
    fn decode(&self, path: &Path, height: usize, width: usize) -> Result<Vec<f32>> {
        self(path, height, width)
    }
}

/// Reads images that were already decoded to raw little-endian f32 tensors.
///
/// Each file must hold exactly `height * width * channels` values; no resizing
/// is attempted.
#[derive(Debug, Clone, Copy)]
pub struct RawTensorDecoder {
    channels: usize,
}

impl RawTensorDecoder {
    pub fn new(channels: usize) -> Self {
        Self { channels }
    }

    pub fn channels(&self) -> usize {
        self.channels
    }
}

impl ImageDecoder for RawTensorDecoder {
    fn decode(&self, path: &Path, height: usize, width: usize) -> Result<Vec<f32>> {
        let expected_bytes = height
            .checked_mul(width)
            .and_then(|plane| plane.checked_mul(self.channels))
            .and_then(|elements| elements.checked_mul(std::mem::size_of::<f32>()))
            .ok_or_else(|| KolosalError::DecodeError {
                path: path.to_path_buf(),
                reason: format!(
                    "{}x{}x{} f32 tensor overflows usize",
                    height, width, self.channels
                ),
            })?;

        let bytes = std::fs::read(path).map_err(|e| KolosalError::DecodeError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        if bytes.len() != expected_bytes {
            return Err(KolosalError::DecodeError {
                path: path.to_path_buf(),
                reason: format!(
                    "expected {} bytes for {}x{}x{} f32 tensor, found {}",
                    expected_bytes,
                    height,
                    width,
                    self.channels,
                    bytes.len()
                ),
            });
        }

        Ok(bytes
            .chunks_exact(4)
            .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
            .collect())
    }
}
