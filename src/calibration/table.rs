//! Text calibration tables
//!
//! Engines are free to store anything in the calibration cache. The common
//! TensorRT layout is a header line followed by one `tensor: scale` line per
//! tensor, with the f32 scale written as its bit pattern in hex:
//!
//! ```text
//! TRT-8601-EntropyCalibration2
//! data: 3c010204
//! conv1: 3d4e2f10
//! ```
//!
//! This module reads and writes that layout for inspection and for the
//! reference engine; it never rewrites tables handed through the cache.

use crate::error::{KolosalError, Result};

/// A parsed text calibration table
#[derive(Debug, Clone, PartialEq)]
pub struct CalibrationTable {
    /// First line, naming the producer and algorithm
    pub header: String,
    /// Per-tensor scales in file order
    pub scales: Vec<(String, f32)>,
}

impl CalibrationTable {
    pub fn new(header: impl Into<String>) -> Self {
        Self {
            header: header.into(),
            scales: Vec::new(),
        }
    }

    /// Append a tensor scale
    pub fn push(&mut self, tensor: impl Into<String>, scale: f32) {
        self.scales.push((tensor.into(), scale));
    }

    /// Scale recorded for `tensor`
    pub fn scale(&self, tensor: &str) -> Option<f32> {
        self.scales
            .iter()
            .find(|(name, _)| name == tensor)
            .map(|(_, scale)| *scale)
    }

    /// Parse a table; blank lines are skipped.
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        let text = std::str::from_utf8(bytes).map_err(|_| {
            KolosalError::SerializationError("calibration table is not UTF-8 text".to_string())
        })?;

        let mut lines = text
            .lines()
            .enumerate()
            .map(|(i, line)| (i + 1, line.trim()))
            .filter(|(_, line)| !line.is_empty());

        let header = match lines.next() {
            Some((_, line)) => line.to_string(),
            None => {
                return Err(KolosalError::SerializationError(
                    "calibration table is empty".to_string(),
                ))
            }
        };

        let mut table = Self::new(header);
        for (line_no, line) in lines {
            let (name, hex) = line.rsplit_once(':').ok_or_else(|| {
                KolosalError::SerializationError(format!(
                    "line {}: expected 'tensor: scale', found '{}'",
                    line_no, line
                ))
            })?;
            let bits = u32::from_str_radix(hex.trim(), 16).map_err(|e| {
                KolosalError::SerializationError(format!("line {}: bad scale '{}': {}", line_no, hex.trim(), e))
            })?;
            table.push(name.trim(), f32::from_bits(bits));
        }
        Ok(table)
    }

    /// Serialize to the text layout
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = String::with_capacity(self.header.len() + 1 + self.scales.len() * 24);
        out.push_str(&self.header);
        out.push('\n');
        for (name, scale) in &self.scales {
            out.push_str(&format!("{}: {:08x}\n", name, scale.to_bits()));
        }
        out.into_bytes()
    }
}
