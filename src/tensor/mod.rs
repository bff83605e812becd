//! Tensor types and operations
//!
//! This module provides the core `Tensor` type, a strided view over a shared
//! [`Storage`], together with the pure layout machinery behind it: shape and
//! stride utilities, view operations, memory-format classification and
//! overlap detection.

mod core;
mod layout;
mod memory_format;
mod options;
mod overlap;
mod shape;
mod storage;
mod strides;

pub use core::Tensor;
pub use layout::{
    Layout, Offsets, can_view_without_copy, contiguous_strides, is_contiguous_row_major,
    normalize_dim, numel,
};
pub use memory_format::{FormatClass, MemoryFormat, format_strides, propagate_format};
pub use options::TensorOptions;
pub use overlap::{
    MemOverlap, MemOverlapStatus, assert_no_internal_overlap, assert_no_partial_overlap,
    classify_overlap, overlap_status,
};
pub use shape::Shape;
pub use storage::Storage;
pub use strides::Strides;

