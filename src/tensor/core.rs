//! Core Tensor type

use super::memory_format::format_strides;
use super::{Layout, MemoryFormat, Storage, TensorOptions};
use crate::dispatch_dtype;
use crate::dtype::{DType, Element};
use crate::error::{Error, Result};
use crate::runtime::{Device, copy};
use std::fmt;
use tracing::debug;

/// N-dimensional strided view over shared storage
///
/// `Tensor` is the fundamental data structure in tessera. It consists of:
/// - **Storage**: Reference-counted flat element buffer
/// - **Layout**: Shape, strides, and offset defining the view into storage
/// - **DType**: Element type (determined at runtime, owned by the storage)
///
/// # Zero-Copy Views
///
/// Operations like `transpose`, `narrow`, `view` and `expand` create new
/// tensors that share the same underlying storage. This is achieved through:
/// - Arc-wrapped storage (reference counting)
/// - Modified layout (different strides/offset)
///
/// # Example
///
/// ```
/// use tessera::prelude::*;
///
/// let a = Tensor::from_slice(&[1.0f32, 2.0, 3.0, 4.0], &[2, 2]);
/// let b = a.transpose(-1, -2).unwrap(); // Zero-copy, shares storage with a
/// assert!(a.shares_storage_with(&b));
/// assert_eq!(b.to_vec::<f32>().unwrap(), vec![1.0, 3.0, 2.0, 4.0]);
/// ```
#[derive(Clone)]
pub struct Tensor {
    /// Element buffer, shared between views
    storage: Storage,
    /// Shape, strides, offset
    layout: Layout,
}

impl Tensor {
    /// Create a tensor from storage and layout
    ///
    /// The layout is trusted; see [`Self::from_storage`] for the checked form.
    pub fn from_parts(storage: Storage, layout: Layout) -> Self {
        Self { storage, layout }
    }

    /// Create a tensor from a slice of data
    ///
    /// # Panics
    ///
    /// Panics if `data.len()` does not equal the product of the `shape` dimensions.
    /// For a fallible alternative, use [`Self::try_from_slice`].
    pub fn from_slice<T: Element>(data: &[T], shape: &[usize]) -> Self {
        Self::try_from_slice(data, shape).expect("Tensor::from_slice failed")
    }

    /// Create a tensor from a slice of data (fallible version)
    ///
    /// Returns an error if `data.len()` does not equal the product of the `shape` dimensions.
    pub fn try_from_slice<T: Element>(data: &[T], shape: &[usize]) -> Result<Self> {
        let expected_len: usize = shape.iter().product();
        if data.len() != expected_len {
            return Err(Error::ShapeMismatch {
                expected: shape.to_vec(),
                got: vec![data.len()],
            });
        }

        Ok(Self {
            storage: Storage::from_slice(data, Device::Cpu),
            layout: Layout::contiguous(shape),
        })
    }

    /// Create a `Bool` tensor from a slice of booleans
    ///
    /// # Panics
    ///
    /// Panics if `data.len()` does not match `shape`. See [`Self::try_from_bools`].
    pub fn from_bools(data: &[bool], shape: &[usize]) -> Self {
        Self::try_from_bools(data, shape).expect("Tensor::from_bools failed")
    }

    /// Create a `Bool` tensor from a slice of booleans (fallible version)
    pub fn try_from_bools(data: &[bool], shape: &[usize]) -> Result<Self> {
        let expected_len: usize = shape.iter().product();
        if data.len() != expected_len {
            return Err(Error::ShapeMismatch {
                expected: shape.to_vec(),
                got: vec![data.len()],
            });
        }
        let bytes: Vec<u8> = data.iter().map(|&b| u8::from(b)).collect();
        let storage = Storage::from_bytes(&bytes, DType::Bool, Device::Cpu)?;
        Ok(Self {
            storage,
            layout: Layout::contiguous(shape),
        })
    }

    /// Create a zero-initialized tensor on the CPU
    ///
    /// Storage is always zero-filled, so "empty" only means the contents are
    /// unspecified by contract.
    pub fn empty(shape: &[usize], dtype: DType) -> Self {
        Self::try_empty(shape, dtype).expect("Tensor::empty failed")
    }

    /// Create a tensor with unspecified contents (fallible version)
    pub fn try_empty(shape: &[usize], dtype: DType) -> Result<Self> {
        Self::empty_with(shape, &TensorOptions::new(dtype))
    }

    /// Create a tensor filled with zeros
    pub fn zeros(shape: &[usize], dtype: DType) -> Self {
        Self::try_zeros(shape, dtype).expect("Tensor::zeros failed")
    }

    /// Create a tensor filled with zeros (fallible version)
    pub fn try_zeros(shape: &[usize], dtype: DType) -> Result<Self> {
        Self::zeros_with(shape, &TensorOptions::new(dtype))
    }

    /// Create a tensor filled with a scalar value
    pub fn full_scalar(shape: &[usize], dtype: DType, value: f64) -> Self {
        Self::try_full_scalar(shape, dtype, value).expect("Tensor::full_scalar failed")
    }

    /// Create a tensor filled with a scalar value (fallible version)
    ///
    /// `value` is converted with `as`-cast semantics; for `Bool` any non-zero
    /// value is `true`.
    pub fn try_full_scalar(shape: &[usize], dtype: DType, value: f64) -> Result<Self> {
        Self::full_with(shape, value, &TensorOptions::new(dtype))
    }

    /// Allocate a tensor laid out in `options.memory_format`
    ///
    /// `MemoryFormat::Preserve` has no source tensor to preserve here and
    /// allocates row-major.
    pub fn empty_with(shape: &[usize], options: &TensorOptions) -> Result<Self> {
        let format = match options.memory_format {
            MemoryFormat::Preserve => MemoryFormat::Contiguous,
            format => format,
        };
        let strides = format_strides(shape, format)?;
        let numel: usize = shape.iter().product();
        let storage = Storage::new(numel, options.dtype, options.device)?;
        Ok(Self {
            storage,
            layout: Layout::new(shape, strides, 0)?,
        })
    }

    /// Allocate a zero-filled tensor with the given options
    pub fn zeros_with(shape: &[usize], options: &TensorOptions) -> Result<Self> {
        Self::empty_with(shape, options)
    }

    /// Allocate a tensor filled with `value` with the given options
    pub fn full_with(shape: &[usize], value: f64, options: &TensorOptions) -> Result<Self> {
        let t = Self::empty_with(shape, options)?;
        if t.numel() == 0 {
            return Ok(t);
        }
        let elem = scalar_bytes(options.dtype, value)?;
        t.storage.write().copy_from_slice(&elem.repeat(t.numel()));
        Ok(t)
    }

    /// Create a view with explicit shape, strides and offset into `storage`
    ///
    /// This is the raw strided constructor. The stride count must match the
    /// rank. In debug builds, or with the `strict-strides` feature, every
    /// addressed element must also lie inside the storage
    /// ([`Error::InvalidStride`] otherwise). Release builds skip the bounds
    /// check; out-of-range layouts then panic on access.
    ///
    /// The result may address one element from several indices. Check
    /// [`crate::tensor::classify_overlap`] before writing through it.
    pub fn from_storage(
        storage: Storage,
        shape: &[usize],
        strides: &[isize],
        offset: usize,
    ) -> Result<Self> {
        let layout = Layout::new(shape, strides, offset)?;
        if cfg!(any(debug_assertions, feature = "strict-strides")) {
            layout.validate_bounds(storage.len())?;
        }
        Ok(Self { storage, layout })
    }

    // ===== Accessors =====

    /// Get the storage
    #[inline]
    pub fn storage(&self) -> &Storage {
        &self.storage
    }

    /// Get the layout
    #[inline]
    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    /// Get the shape
    #[inline]
    pub fn shape(&self) -> &[usize] {
        self.layout.shape()
    }

    /// Get the strides
    #[inline]
    pub fn strides(&self) -> &[isize] {
        self.layout.strides()
    }

    /// Element offset of the first element into the storage
    #[inline]
    pub fn storage_offset(&self) -> usize {
        self.layout.offset()
    }

    /// Get number of dimensions
    #[inline]
    pub fn ndim(&self) -> usize {
        self.layout.ndim()
    }

    /// Get total number of elements
    #[inline]
    pub fn numel(&self) -> usize {
        self.layout.numel()
    }

    /// Get element type
    #[inline]
    pub fn dtype(&self) -> DType {
        self.storage.dtype()
    }

    /// Get device
    #[inline]
    pub fn device(&self) -> Device {
        self.storage.device()
    }

    /// Check if tensor is contiguous in memory (row-major)
    #[inline]
    pub fn is_contiguous(&self) -> bool {
        self.layout.is_contiguous()
    }

    /// Check if tensor is a scalar (0-dimensional)
    #[inline]
    pub fn is_scalar(&self) -> bool {
        self.layout.is_scalar()
    }

    /// Check if tensor has no elements
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.layout.is_empty()
    }

    /// Get size along a dimension (supports negative indexing)
    pub fn size(&self, dim: isize) -> Option<usize> {
        self.layout.dim(dim)
    }

    /// Whether both tensors view the same storage
    #[inline]
    pub fn shares_storage_with(&self, other: &Tensor) -> bool {
        self.storage.same_storage(&other.storage)
    }

    fn with_layout(&self, layout: Layout) -> Self {
        Self {
            storage: self.storage.clone(),
            layout,
        }
    }

    // ===== View Operations (Zero-Copy) =====

    /// View with a different shape (zero-copy)
    ///
    /// Fails with [`Error::NotViewable`] when the strides cannot express the new
    /// shape; [`Self::reshape`] copies in that case.
    pub fn view(&self, shape: &[usize]) -> Result<Self> {
        Ok(self.with_layout(self.layout.view(shape)?))
    }

    /// Reshape to a new shape, copying only if no view exists
    ///
    /// The element count must match; that error is never hidden by the copy.
    pub fn reshape(&self, shape: &[usize]) -> Result<Self> {
        match self.view(shape) {
            Err(Error::NotViewable { .. }) => {
                debug!(
                    op = "reshape",
                    shape = ?self.shape(),
                    target = ?shape,
                    numel = self.numel(),
                    "view impossible, copying"
                );
                self.contiguous()?.view(shape)
            }
            result => result,
        }
    }

    /// Flatten to 1D (zero-copy if possible)
    pub fn flatten(&self) -> Result<Self> {
        self.reshape(&[self.numel()])
    }

    /// Permute dimensions (zero-copy)
    ///
    /// Reorders the dimensions of the tensor according to the given permutation.
    ///
    /// # Arguments
    /// * `dims` - New order of dimensions. Must be a permutation of 0..ndim
    ///   (negative entries wrap).
    ///
    /// # Example
    ///
    /// ```
    /// # use tessera::prelude::*;
    /// let tensor = Tensor::zeros(&[2, 3, 4], DType::F32);
    /// let permuted = tensor.permute(&[2, 0, 1]).unwrap();
    /// assert_eq!(permuted.shape(), &[4, 2, 3]);
    /// ```
    pub fn permute(&self, dims: &[isize]) -> Result<Self> {
        Ok(self.with_layout(self.layout.permute(dims)?))
    }

    /// Transpose two dimensions (zero-copy)
    pub fn transpose(&self, dim0: isize, dim1: isize) -> Result<Self> {
        Ok(self.with_layout(self.layout.transpose(dim0, dim1)?))
    }

    /// Transpose last two dimensions (matrix transpose)
    pub fn t(&self) -> Result<Self> {
        self.transpose(-2, -1)
    }

    /// Narrow a dimension (zero-copy slice)
    ///
    /// # Arguments
    /// * `dim` - Dimension to narrow (supports negative indexing)
    /// * `start` - Starting index in that dimension
    /// * `length` - Number of elements to keep
    pub fn narrow(&self, dim: isize, start: usize, length: usize) -> Result<Self> {
        Ok(self.with_layout(self.layout.narrow(dim, start, length)?))
    }

    /// Select one index along a dimension, removing it (zero-copy)
    pub fn select(&self, dim: isize, index: isize) -> Result<Self> {
        Ok(self.with_layout(self.layout.select(dim, index)?))
    }

    /// Python-style `start:stop:step` slice of one dimension (zero-copy)
    pub fn slice(
        &self,
        dim: isize,
        start: Option<isize>,
        stop: Option<isize>,
        step: isize,
    ) -> Result<Self> {
        Ok(self.with_layout(self.layout.slice(dim, start, stop, step)?))
    }

    /// Remove dimensions of size 1
    pub fn squeeze(&self, dim: Option<isize>) -> Result<Self> {
        Ok(self.with_layout(self.layout.squeeze(dim)?))
    }

    /// Add a dimension of size 1
    pub fn unsqueeze(&self, dim: isize) -> Result<Self> {
        Ok(self.with_layout(self.layout.unsqueeze(dim)?))
    }

    /// Expand size-1 dimensions with stride 0 (`-1` keeps a size)
    pub fn expand(&self, sizes: &[isize]) -> Result<Self> {
        Ok(self.with_layout(self.layout.expand(sizes)?))
    }

    /// Expand to the shape of `other`
    pub fn expand_as(&self, other: &Tensor) -> Result<Self> {
        self.broadcast_to(other.shape())
    }

    /// Broadcast to a target shape (zero-copy)
    pub fn broadcast_to(&self, shape: &[usize]) -> Result<Self> {
        Ok(self.with_layout(self.layout.broadcast_to(shape)?))
    }

    /// View of the diagonal over `dim1` and `dim2`, appended as the last dim
    pub fn diagonal(&self, offset: isize, dim1: isize, dim2: isize) -> Result<Self> {
        Ok(self.with_layout(self.layout.diagonal(offset, dim1, dim2)?))
    }

    /// Sliding windows of `size` along `dim`, `step` apart (zero-copy)
    ///
    /// Windows overlap when `step < size`; the result must not be written.
    pub fn unfold(&self, dim: isize, size: usize, step: usize) -> Result<Self> {
        Ok(self.with_layout(self.layout.unfold(dim, size, step)?))
    }

    /// Flip (reverse) tensor along a dimension (zero-copy)
    ///
    /// # Example
    ///
    /// ```
    /// # use tessera::prelude::*;
    /// let tensor = Tensor::from_slice(&[1.0f32, 2.0, 3.0, 4.0], &[2, 2]);
    /// let flipped = tensor.flip(0).unwrap(); // Reverse rows: [[3, 4], [1, 2]]
    /// assert_eq!(flipped.to_vec::<f32>().unwrap(), vec![3.0, 4.0, 1.0, 2.0]);
    /// ```
    pub fn flip(&self, dim: isize) -> Result<Self> {
        Ok(self.with_layout(self.layout.flip(dim)?))
    }

    /// Flip (reverse) tensor along multiple dimensions (zero-copy)
    pub fn flip_dims(&self, dims: &[isize]) -> Result<Self> {
        Ok(self.with_layout(self.layout.flip_dims(dims)?))
    }

    /// Re-view this tensor's storage with explicit strides
    ///
    /// Same checks as [`Self::from_storage`].
    pub fn as_strided(&self, shape: &[usize], strides: &[isize], offset: usize) -> Result<Self> {
        Self::from_storage(self.storage.clone(), shape, strides, offset)
    }

    /// Split into views of `split_size` along `dim`; the last may be shorter
    pub fn split(&self, split_size: usize, dim: isize) -> Result<Vec<Self>> {
        if split_size == 0 {
            return Err(Error::invalid_argument(
                "split_size",
                "split_size must be greater than zero",
            ));
        }
        if self.ndim() == 0 {
            return Err(Error::invalid_argument("tensor", "cannot split a scalar tensor"));
        }

        let dim_idx = self.layout.normalize_dim(dim)?;
        let dim_size = self.shape()[dim_idx];

        let mut result = Vec::new();
        let mut start = 0;
        while start < dim_size {
            let length = (dim_size - start).min(split_size);
            result.push(self.narrow(dim, start, length)?);
            start += length;
        }
        Ok(result)
    }

    /// Split into `chunks` views along `dim`
    ///
    /// Earlier chunks are one element larger when the size does not divide.
    pub fn chunk(&self, chunks: usize, dim: isize) -> Result<Vec<Self>> {
        if chunks == 0 {
            return Err(Error::invalid_argument(
                "chunks",
                "chunks must be greater than zero",
            ));
        }
        if self.ndim() == 0 {
            return Err(Error::invalid_argument("tensor", "cannot chunk a scalar tensor"));
        }

        let dim_idx = self.layout.normalize_dim(dim)?;
        let dim_size = self.shape()[dim_idx];
        let base_size = dim_size / chunks;
        let remainder = dim_size % chunks;

        let mut result = Vec::with_capacity(chunks);
        let mut start = 0;
        for i in 0..chunks {
            let length = if i < remainder { base_size + 1 } else { base_size };
            result.push(self.narrow(dim, start, length)?);
            start += length;
        }
        Ok(result)
    }

    // ===== Materialization =====

    /// Make tensor contiguous (copy if needed)
    ///
    /// If the tensor is already contiguous, returns a view (zero-copy).
    /// Otherwise, allocates new storage and copies the data in row-major order.
    pub fn contiguous(&self) -> Result<Self> {
        self.contiguous_format(MemoryFormat::Contiguous)
    }

    /// Make tensor dense in `format` (copy if needed)
    ///
    /// Returns a view sharing storage when the tensor already satisfies the
    /// format. `Preserve` uses the format suggested by the current strides.
    pub fn contiguous_format(&self, format: MemoryFormat) -> Result<Self> {
        let format = match format {
            MemoryFormat::Preserve => self.layout.suggest_memory_format(),
            format => format,
        };
        if self.layout.is_contiguous_in(format) {
            return Ok(self.clone());
        }

        debug!(
            op = "contiguous",
            format = ?format,
            shape = ?self.shape(),
            numel = self.numel(),
            "materializing copy"
        );
        let opts = TensorOptions::new(self.dtype())
            .with_device(self.device())
            .with_memory_format(format);
        let out = Self::empty_with(self.shape(), &opts)?;
        let packed = self.packed_bytes();
        copy::scatter_bytes(
            &mut out.storage.write(),
            out.layout.offsets(),
            &packed,
            self.dtype().size_in_bytes(),
        );
        Ok(out)
    }

    /// Elements of this view as packed row-major bytes
    pub(crate) fn packed_bytes(&self) -> Vec<u8> {
        let data = self.storage.read();
        copy::gather_bytes(
            &data,
            self.layout.offsets(),
            self.dtype().size_in_bytes(),
        )
    }

    // ===== Data Access =====

    /// Copy the viewed elements to a Vec in row-major order
    ///
    /// Works for any layout. Fails with [`Error::DTypeMismatch`] if `T` does
    /// not match the tensor dtype.
    pub fn to_vec<T: Element>(&self) -> Result<Vec<T>> {
        self.check_element::<T>()?;
        Ok(self
            .packed_bytes()
            .chunks_exact(std::mem::size_of::<T>())
            .map(bytemuck::pod_read_unaligned)
            .collect())
    }

    /// Copy a `Bool` tensor's elements to a Vec in row-major order
    pub fn to_bools(&self) -> Result<Vec<bool>> {
        if self.dtype() != DType::Bool {
            return Err(Error::DTypeMismatch {
                lhs: self.dtype(),
                rhs: DType::Bool,
            });
        }
        Ok(self.packed_bytes().into_iter().map(|b| b != 0).collect())
    }

    /// Extract the scalar value from a single-element tensor
    ///
    /// # Returns
    ///
    /// The single element as type `T`, or an error if the tensor doesn't
    /// contain exactly one element.
    pub fn item<T: Element>(&self) -> Result<T> {
        if self.numel() != 1 {
            return Err(Error::ShapeMismatch {
                expected: vec![1],
                got: self.shape().to_vec(),
            });
        }
        self.check_element::<T>()?;

        let elem_size = std::mem::size_of::<T>();
        let start = self.layout.offset() * elem_size;
        let data = self.storage.read();
        Ok(bytemuck::pod_read_unaligned(&data[start..start + elem_size]))
    }

    fn check_element<T: Element>(&self) -> Result<()> {
        if T::DTYPE != self.dtype() {
            return Err(Error::DTypeMismatch {
                lhs: self.dtype(),
                rhs: T::DTYPE,
            });
        }
        Ok(())
    }
}

/// Bytes of a single element of `dtype` holding `value`
pub(crate) fn scalar_bytes(dtype: DType, value: f64) -> Result<Vec<u8>> {
    if dtype == DType::Bool {
        return Ok(vec![u8::from(value != 0.0)]);
    }
    dispatch_dtype!(dtype, T => {
        Ok(bytemuck::bytes_of(&T::from_f64(value)).to_vec())
    }, "full_scalar")
}

impl fmt::Debug for Tensor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tensor")
            .field("shape", &self.shape())
            .field("strides", &self.strides())
            .field("offset", &self.storage_offset())
            .field("dtype", &self.dtype())
            .field("device", &self.device())
            .finish()
    }
}

impl fmt::Display for Tensor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Tensor({:?}, dtype={})", self.shape(), self.dtype())
    }
}
