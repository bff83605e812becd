//! Element trait for mapping Rust types to DType

use super::DType;
use bytemuck::{Pod, Zeroable};
use std::ops::Add;

/// Trait for types that can be elements of a tensor
///
/// This trait connects Rust's type system to tessera's runtime dtype system.
/// It's implemented for all primitive numeric types.
///
/// # Bounds
/// - `Pod + Zeroable` - Safe reinterpretation of storage bytes (bytemuck)
/// - `Add` - Generic arithmetic over elements
/// - `PartialOrd` - Comparison in tests and diagnostics
pub trait Element:
    Copy + Clone + Send + Sync + Pod + Zeroable + 'static + Add<Output = Self> + PartialOrd
{
    /// The corresponding DType for this Rust type
    const DTYPE: DType;

    /// Convert to f64 for generic numeric operations
    fn to_f64(self) -> f64;

    /// Convert from f64 to this type
    fn from_f64(v: f64) -> Self;

    /// Interpret this value as a tensor index.
    ///
    /// Returns `None` for floating point types, which are never valid indices.
    fn to_index(self) -> Option<i64>;

    /// Zero value
    fn zero() -> Self;

    /// One value
    fn one() -> Self;

    /// Sum used by accumulating writes; integers wrap on overflow
    fn accumulate(self, other: Self) -> Self;
}

macro_rules! impl_int_element {
    ($($ty:ty => $dtype:ident),* $(,)?) => {
        $(
            impl Element for $ty {
                const DTYPE: DType = DType::$dtype;

                #[inline]
                fn to_f64(self) -> f64 {
                    self as f64
                }

                #[inline]
                fn from_f64(v: f64) -> Self {
                    v as $ty
                }

                #[inline]
                fn to_index(self) -> Option<i64> {
                    i64::try_from(self).ok()
                }

                #[inline]
                fn zero() -> Self {
                    0
                }

                #[inline]
                fn one() -> Self {
                    1
                }

                #[inline]
                fn accumulate(self, other: Self) -> Self {
                    self.wrapping_add(other)
                }
            }
        )*
    };
}

impl_int_element!(
    i64 => I64,
    i32 => I32,
    i16 => I16,
    i8 => I8,
    u64 => U64,
    u32 => U32,
    u16 => U16,
    u8 => U8,
);

impl Element for f64 {
    const DTYPE: DType = DType::F64;

    #[inline]
    fn to_f64(self) -> f64 {
        self
    }

    #[inline]
    fn from_f64(v: f64) -> Self {
        v
    }

    #[inline]
    fn to_index(self) -> Option<i64> {
        None
    }

    #[inline]
    fn zero() -> Self {
        0.0
    }

    #[inline]
    fn one() -> Self {
        1.0
    }

    #[inline]
    fn accumulate(self, other: Self) -> Self {
        self + other
    }
}

impl Element for f32 {
    const DTYPE: DType = DType::F32;

    #[inline]
    fn to_f64(self) -> f64 {
        self as f64
    }

    #[inline]
    fn from_f64(v: f64) -> Self {
        v as f32
    }

    #[inline]
    fn to_index(self) -> Option<i64> {
        None
    }

    #[inline]
    fn zero() -> Self {
        0.0
    }

    #[inline]
    fn one() -> Self {
        1.0
    }

    #[inline]
    fn accumulate(self, other: Self) -> Self {
        self + other
    }
}

// Note: bool doesn't implement Pod, so Bool tensors are stored as one u8 per element.

// ============================================================================
// Half-precision floating point types (requires "f16" feature)
// ============================================================================

#[cfg(feature = "f16")]
impl Element for half::f16 {
    const DTYPE: DType = DType::F16;

    #[inline]
    fn to_f64(self) -> f64 {
        self.to_f64()
    }

    #[inline]
    fn from_f64(v: f64) -> Self {
        half::f16::from_f64(v)
    }

    #[inline]
    fn to_index(self) -> Option<i64> {
        None
    }

    #[inline]
    fn zero() -> Self {
        half::f16::ZERO
    }

    #[inline]
    fn one() -> Self {
        half::f16::ONE
    }

    #[inline]
    fn accumulate(self, other: Self) -> Self {
        self + other
    }
}

#[cfg(feature = "f16")]
impl Element for half::bf16 {
    const DTYPE: DType = DType::BF16;

    #[inline]
    fn to_f64(self) -> f64 {
        self.to_f64()
    }

    #[inline]
    fn from_f64(v: f64) -> Self {
        half::bf16::from_f64(v)
    }

    #[inline]
    fn to_index(self) -> Option<i64> {
        None
    }

    #[inline]
    fn zero() -> Self {
        half::bf16::ZERO
    }

    #[inline]
    fn one() -> Self {
        half::bf16::ONE
    }

    #[inline]
    fn accumulate(self, other: Self) -> Self {
        self + other
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_element_dtype() {
        assert_eq!(f64::DTYPE, DType::F64);
        assert_eq!(f32::DTYPE, DType::F32);
        assert_eq!(i32::DTYPE, DType::I32);
        assert_eq!(u8::DTYPE, DType::U8);
    }

    #[test]
    fn test_element_conversions() {
        assert_eq!(f32::from_f64(2.5).to_f64(), 2.5f32 as f64);
        assert_eq!(i32::from_f64(42.0), 42);
    }

    #[test]
    fn test_to_index() {
        assert_eq!((-3i32).to_index(), Some(-3));
        assert_eq!(200u8.to_index(), Some(200));
        assert_eq!(u64::MAX.to_index(), None);
        assert_eq!(1.0f32.to_index(), None);
    }

    #[test]
    fn test_accumulate_wraps_integers() {
        assert_eq!(200u8.accumulate(100), 44);
        assert_eq!(i32::MAX.accumulate(1), i32::MIN);
        assert_eq!(1.5f32.accumulate(2.0), 3.5);
    }
}
