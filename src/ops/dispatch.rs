//! DType dispatch utilities
//!
//! This module provides the `dispatch_dtype!` macro for runtime type dispatch.
//! Storage bytes are untyped, so operations that must interpret elements
//! (filling, accumulating scatters, reading index tensors) convert the
//! runtime `DType` into a concrete generic type with it.
//!
//! # Usage
//!
//! ```ignore
//! fn my_operation(dtype: DType) -> Result<usize> {
//!     dispatch_dtype!(dtype, T => {
//!         // T is now a concrete type (f32, f64, i32, etc.)
//!         Ok(std::mem::size_of::<T>())
//!     }, "my_operation")
//! }
//! ```
//!
//! ## Supported Types
//!
//! - `F64` -> `f64`
//! - `F32` -> `f32`
//! - `F16` -> `half::f16` (requires "f16" feature)
//! - `BF16` -> `half::bf16` (requires "f16" feature)
//! - `I64`/`I32`/`I16`/`I8` -> signed integers
//! - `U64`/`U32`/`U16`/`U8` -> unsigned integers
//! - `Bool` -> Returns `UnsupportedDType` error

/// Internal helper macro to dispatch types requiring the "f16" feature.
#[macro_export]
#[doc(hidden)]
macro_rules! dispatch_f16_type {
    ($T:ident, $body:block, $dtype:expr, $error_op:expr, $type:ty) => {{
        #[cfg(feature = "f16")]
        {
            type $T = $type;
            $body
        }
        #[cfg(not(feature = "f16"))]
        {
            return Err($crate::error::Error::UnsupportedDType {
                dtype: $dtype,
                op: $error_op,
            });
        }
    }};
}

/// Macro for runtime dtype dispatch to typed operations.
///
/// Executes `$body` with `$T` bound to the Rust type matching `$dtype`.
/// `Bool` and (without the `f16` feature) half-precision dtypes return
/// `UnsupportedDType` from the enclosing function.
#[macro_export]
macro_rules! dispatch_dtype {
    ($dtype:expr, $T:ident => $body:block, $error_op:expr) => {
        match $dtype {
            $crate::dtype::DType::F64 => {
                type $T = f64;
                $body
            }
            $crate::dtype::DType::F32 => {
                type $T = f32;
                $body
            }
            $crate::dtype::DType::F16 => {
                $crate::dispatch_f16_type!($T, $body, $dtype, $error_op, half::f16)
            }
            $crate::dtype::DType::BF16 => {
                $crate::dispatch_f16_type!($T, $body, $dtype, $error_op, half::bf16)
            }
            $crate::dtype::DType::I64 => {
                type $T = i64;
                $body
            }
            $crate::dtype::DType::I32 => {
                type $T = i32;
                $body
            }
            $crate::dtype::DType::I16 => {
                type $T = i16;
                $body
            }
            $crate::dtype::DType::I8 => {
                type $T = i8;
                $body
            }
            $crate::dtype::DType::U64 => {
                type $T = u64;
                $body
            }
            $crate::dtype::DType::U32 => {
                type $T = u32;
                $body
            }
            $crate::dtype::DType::U16 => {
                type $T = u16;
                $body
            }
            $crate::dtype::DType::U8 => {
                type $T = u8;
                $body
            }
            $crate::dtype::DType::Bool => {
                return Err($crate::error::Error::UnsupportedDType {
                    dtype: $dtype,
                    op: $error_op,
                })
            }
        }
    };
}
