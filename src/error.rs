//! Error types for tessera

use crate::dtype::DType;
use thiserror::Error;

/// Result type alias using tessera's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in tensor view, broadcast and indexing operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Element count or dimension disagreement
    #[error("Shape mismatch: expected {expected:?}, got {got:?}")]
    ShapeMismatch {
        /// Expected shape
        expected: Vec<usize>,
        /// Actual shape
        got: Vec<usize>,
    },

    /// A view was requested but the layout cannot be reinterpreted without a copy
    #[error("View of shape {shape:?} with strides {strides:?} cannot be viewed as {target:?}; use reshape")]
    NotViewable {
        /// Source shape
        shape: Vec<usize>,
        /// Source strides
        strides: Vec<isize>,
        /// Requested shape
        target: Vec<usize>,
    },

    /// Dimension order is not a permutation of `0..ndim`
    #[error("Invalid permutation {dims:?} for tensor with {ndim} dimensions")]
    InvalidPermutation {
        /// The requested order
        dims: Vec<isize>,
        /// Number of dimensions
        ndim: usize,
    },

    /// Invalid dimension index
    #[error("Invalid dimension {dim} for tensor with {ndim} dimensions")]
    InvalidDimension {
        /// The invalid dimension
        dim: isize,
        /// Number of dimensions
        ndim: usize,
    },

    /// Index or range outside a dimension
    #[error("Index {index} is out of range for dimension {dim} with size {size}")]
    IndexOutOfRange {
        /// The offending index (or range end)
        index: isize,
        /// Dimension that was indexed
        dim: usize,
        /// Size of that dimension
        size: usize,
    },

    /// More consuming index terms than tensor dimensions
    #[error("Too many indices for tensor of dimension {ndim} (got {given})")]
    TooManyIndices {
        /// Number of dimension-consuming terms
        given: usize,
        /// Tensor rank
        ndim: usize,
    },

    /// Index term of an unusable kind or dtype
    #[error("Invalid index: {reason}")]
    InvalidIndexType {
        /// What was wrong with the index
        reason: String,
    },

    /// Shapes cannot be broadcast together
    #[error("Shapes {shapes:?} cannot be broadcast together")]
    NotBroadcastable {
        /// All participating shapes
        shapes: Vec<Vec<usize>>,
    },

    /// Raw strided layout violates the storage bounds or rank invariant
    #[error("Invalid strided layout: {reason}")]
    InvalidStride {
        /// Which invariant was violated
        reason: String,
    },

    /// DType mismatch between operands
    #[error("DType mismatch: {lhs:?} vs {rhs:?}")]
    DTypeMismatch {
        /// Left-hand side dtype
        lhs: DType,
        /// Right-hand side dtype
        rhs: DType,
    },

    /// Device mismatch between operands
    #[error("Device mismatch: tensors must be on the same device")]
    DeviceMismatch,

    /// Unsupported dtype for an operation
    #[error("Unsupported dtype {dtype:?} for operation '{op}'")]
    UnsupportedDType {
        /// The unsupported dtype
        dtype: DType,
        /// The operation name
        op: &'static str,
    },

    /// Invalid argument provided to an operation
    #[error("Invalid argument '{arg}': {reason}")]
    InvalidArgument {
        /// The argument name
        arg: &'static str,
        /// Reason for invalidity
        reason: String,
    },

    /// Storage allocation failed
    #[error("Out of memory: failed to allocate {size} bytes")]
    OutOfMemory {
        /// Requested size in bytes
        size: usize,
    },

    /// In-place write target addresses some element more than once
    #[error("{op}: unsupported operation on a tensor with internal memory overlap")]
    InternalOverlap {
        /// Operation that was refused
        op: &'static str,
    },

    /// Two operands of an in-place write partially share memory
    #[error("{op}: operands partially overlap in memory")]
    PartialOverlap {
        /// Operation that was refused
        op: &'static str,
    },
}

impl Error {
    /// Create a shape mismatch error
    pub fn shape_mismatch(expected: &[usize], got: &[usize]) -> Self {
        Self::ShapeMismatch {
            expected: expected.to_vec(),
            got: got.to_vec(),
        }
    }

    /// Create a broadcast error for a pair of shapes
    pub fn not_broadcastable(lhs: &[usize], rhs: &[usize]) -> Self {
        Self::NotBroadcastable {
            shapes: vec![lhs.to_vec(), rhs.to_vec()],
        }
    }

    /// Create an invalid index error
    pub fn invalid_index(reason: impl Into<String>) -> Self {
        Self::InvalidIndexType {
            reason: reason.into(),
        }
    }

    /// Create an invalid argument error
    pub fn invalid_argument(arg: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            arg,
            reason: reason.into(),
        }
    }
}
