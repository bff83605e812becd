//! Device identity and host-side element movement
//!
//! tessera keeps every buffer in host memory. [`Device`] is carried on each
//! storage so operations can reject mixed-device operands the same way a
//! multi-backend runtime would, but no device allocator exists.

pub(crate) mod copy;

use std::fmt;

/// Identifies where a storage's bytes logically live
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum Device {
    /// Host memory
    #[default]
    Cpu,
    /// Accelerator with the given ordinal (tag only)
    Cuda(usize),
}

impl Device {
    /// Unique identifier for this device
    ///
    /// The CPU is 0; accelerator ordinals start at 1.
    pub fn id(&self) -> usize {
        match self {
            Self::Cpu => 0,
            Self::Cuda(ordinal) => ordinal + 1,
        }
    }

    /// Check if two devices are the same
    #[inline]
    pub fn is_same(&self, other: &Self) -> bool {
        self == other
    }

    /// Human-readable name
    pub fn name(&self) -> String {
        match self {
            Self::Cpu => "cpu".to_string(),
            Self::Cuda(ordinal) => format!("cuda:{ordinal}"),
        }
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}
