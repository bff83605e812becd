//! # tessera
//!
//! **Strided tensor views over shared storage.**
//!
//! tessera is the layout layer of a tensor library: a [`Tensor`](tensor::Tensor)
//! is a typed [`Storage`](tensor::Storage) buffer plus a shape, strides and an
//! element offset. Views (transpose, slice, expand, diagonal, ...) only build
//! new metadata; data is copied only where an operation says so.
//!
//! ## Features
//!
//! - **Views**: view/reshape, permute, narrow, select, slice, squeeze,
//!   unsqueeze, expand, diagonal, unfold, flip, split, chunk, as_strided
//! - **Broadcasting**: right-aligned shape unification with stride-0 expansion
//! - **Indexing**: integers, slices, ellipsis, new axes, boolean masks and
//!   integer arrays, for reading and for `index_put`
//! - **Memory formats**: channels-last layouts, classification and propagation
//! - **Overlap detection**: refuses in-place writes through self-aliasing views
//!
//! ## Quick Start
//!
//! ```
//! use tessera::prelude::*;
//!
//! let a = Tensor::from_slice(&[1.0f32, 2.0, 3.0, 4.0, 5.0, 6.0], &[2, 3]);
//! let t = a.t().unwrap();
//! assert_eq!(t.shape(), &[3, 2]);
//! assert_eq!(t.strides(), &[1, 3]);
//! assert!(t.shares_storage_with(&a));
//!
//! let col = t.index(&[IndexTerm::full(), IndexTerm::from(1)]).unwrap();
//! assert_eq!(col.to_vec::<f32>().unwrap(), vec![4.0, 5.0, 6.0]);
//! ```
//!
//! ## Feature Flags
//!
//! - `f16`: half-precision element types (F16, BF16)
//! - `strict-strides`: bounds-check raw strided layouts in release builds

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod dtype;
pub mod error;
pub mod ops;
pub mod runtime;
pub mod tensor;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::dtype::{DType, Element};
    pub use crate::error::{Error, Result};
    pub use crate::ops::{
        IndexTerm, broadcast_pair, broadcast_shape, broadcast_shapes, broadcast_tensors,
    };
    pub use crate::runtime::Device;
    pub use crate::tensor::{
        FormatClass, Layout, MemOverlap, MemOverlapStatus, MemoryFormat, Tensor, TensorOptions,
        assert_no_internal_overlap, assert_no_partial_overlap, classify_overlap, format_strides,
        overlap_status, propagate_format,
    };
}
