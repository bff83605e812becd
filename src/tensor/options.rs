//! Allocation options for new tensors

use super::MemoryFormat;
use crate::dtype::DType;
use crate::runtime::Device;

/// Element type, device and physical layout for freshly allocated tensors
///
/// There is no process-wide default; every allocating entry point takes its
/// options explicitly. `Default` is `F32` on the CPU in row-major order.
///
/// # Example
/// ```
/// use tessera::prelude::*;
/// let opts = TensorOptions::default()
///     .with_dtype(DType::I64)
///     .with_memory_format(MemoryFormat::ChannelsLast);
/// let t = Tensor::zeros_with(&[2, 3, 4, 4], &opts).unwrap();
/// assert_eq!(t.strides(), &[48, 1, 12, 3]);
/// ```
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct TensorOptions {
    /// Element type
    pub dtype: DType,
    /// Device tag
    pub device: Device,
    /// Physical layout of the allocation
    pub memory_format: MemoryFormat,
}

impl TensorOptions {
    /// Options with the given dtype and all other fields at their defaults
    pub fn new(dtype: DType) -> Self {
        Self {
            dtype,
            ..Self::default()
        }
    }

    /// Set the element type
    pub fn with_dtype(mut self, dtype: DType) -> Self {
        self.dtype = dtype;
        self
    }

    /// Set the device tag
    pub fn with_device(mut self, device: Device) -> Self {
        self.device = device;
        self
    }

    /// Set the physical layout
    pub fn with_memory_format(mut self, memory_format: MemoryFormat) -> Self {
        self.memory_format = memory_format;
        self
    }
}

impl Default for TensorOptions {
    fn default() -> Self {
        Self {
            dtype: DType::default_float(),
            device: Device::Cpu,
            memory_format: MemoryFormat::Contiguous,
        }
    }
}
