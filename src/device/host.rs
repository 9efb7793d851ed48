//! Host-memory device
//!
//! Stands in for accelerator memory when no accelerator runtime is linked,
//! e.g. for dry runs of the calibration loop and for tests.

use tracing::debug;

use super::{Device, DeviceBuffer, DeviceHandle};
use crate::error::{KolosalError, Result};

/// Device backed by ordinary heap memory
#[derive(Debug, Clone)]
pub struct HostDevice {
    name: String,
    max_elements: Option<usize>,
}

impl Default for HostDevice {
    fn default() -> Self {
        Self::new()
    }
}

impl HostDevice {
    /// Create a host device with no allocation limit
    pub fn new() -> Self {
        Self {
            name: "host".to_string(),
            max_elements: None,
        }
    }

    /// Refuse allocations larger than `elements` f32 values
    pub fn with_capacity_limit(mut self, elements: usize) -> Self {
        self.max_elements = Some(elements);
        self
    }
}

impl Device for HostDevice {
    type Buffer = HostBuffer;

    fn name(&self) -> &str {
        &self.name
    }

    fn allocate(&self, elements: usize) -> Result<HostBuffer> {
        if let Some(limit) = self.max_elements {
            if elements > limit {
                return Err(KolosalError::DeviceError(format!(
                    "allocation of {} elements exceeds {} limit of {}",
                    elements, self.name, limit
                )));
            }
        }

        let buffer = HostBuffer {
            data: vec![0.0; elements].into_boxed_slice(),
        };
        debug!(
            device = %self.name,
            bytes = buffer.handle().size_bytes(),
            "Allocated device input buffer"
        );
        Ok(buffer)
    }
}

/// Heap buffer released on drop
#[derive(Debug)]
pub struct HostBuffer {
    data: Box<[f32]>,
}

impl HostBuffer {
    /// View the current contents
    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }
}

impl DeviceBuffer for HostBuffer {
    fn handle(&self) -> DeviceHandle {
        DeviceHandle::new(self.data.as_ptr() as usize, self.data.len())
    }

    fn len(&self) -> usize {
        self.data.len()
    }

    fn copy_from_host(&mut self, src: &[f32]) -> Result<()> {
        if src.len() != self.data.len() {
            return Err(KolosalError::ShapeError {
                expected: format!("{} elements", self.data.len()),
                actual: format!("{} elements", src.len()),
            });
        }
        self.data.copy_from_slice(src);
        Ok(())
    }

    fn copy_to_host(&self, dst: &mut [f32]) -> Result<()> {
        if dst.len() != self.data.len() {
            return Err(KolosalError::ShapeError {
                expected: format!("{} elements", self.data.len()),
                actual: format!("{} elements", dst.len()),
            });
        }
        dst.copy_from_slice(&self.data);
        Ok(())
    }
}

impl Drop for HostBuffer {
    fn drop(&mut self) {
        debug!(bytes = self.handle().size_bytes(), "Released device input buffer");
    }
}
