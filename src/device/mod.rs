//! Device memory module: staging buffers the calibration engine reads from.
//!
//! The calibrator owns exactly one device buffer for its whole lifetime. It is
//! allocated once when the calibrator is built, overwritten in place by every
//! staged batch and released when the owning buffer value is dropped.
//!
//! # Example
//! ```
//! use kolosal_int8::device::{Device, DeviceBuffer, HostDevice};
//!
//! let device = HostDevice::new();
//! let mut buffer = device.allocate(4).unwrap();
//! buffer.copy_from_host(&[0.0, 0.25, 0.5, 1.0]).unwrap();
//! assert_eq!(buffer.handle().len(), 4);
//! ```
mod host;

pub use host::{HostBuffer, HostDevice};

use crate::error::Result;

/// Opaque address of a staged device buffer, as handed to the calibration engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DeviceHandle {
    addr: usize,
    len: usize,
}

impl DeviceHandle {
    /// Wrap a raw device address and its length in f32 elements
    pub fn new(addr: usize, len: usize) -> Self {
        Self { addr, len }
    }

    /// Raw device address
    pub fn addr(&self) -> usize {
        self.addr
    }

    /// Number of f32 elements behind the address
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Size of the buffer in bytes
    pub fn size_bytes(&self) -> usize {
        self.len * std::mem::size_of::<f32>()
    }
}

/// A fixed-size f32 buffer in device memory
pub trait DeviceBuffer {
    /// Address handed to the calibration engine
    fn handle(&self) -> DeviceHandle;

    /// Capacity in f32 elements; never changes after allocation
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Blocking host-to-device copy; `src` must fill the buffer exactly
    fn copy_from_host(&mut self, src: &[f32]) -> Result<()>;

    /// Blocking device-to-host copy; `dst` must match the buffer exactly
    fn copy_to_host(&self, dst: &mut [f32]) -> Result<()>;
}

/// Allocator for device buffers
pub trait Device {
    type Buffer: DeviceBuffer;

    /// Human-readable device name
    fn name(&self) -> &str;

    /// Allocate a zeroed buffer of `elements` f32 values
    fn allocate(&self, elements: usize) -> Result<Self::Buffer>;
}
