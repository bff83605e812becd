//! Layout: shape, strides, and offset for tensor memory layout
//!
//! Every view operation in tessera is a pure function from one [`Layout`] to
//! another. [`Tensor`](super::Tensor) methods only pair the result with the
//! shared storage, so everything here can be tested without allocating.

use super::{Shape, Strides};
use crate::error::{Error, Result};
use smallvec::SmallVec;
use std::fmt;

// ============================================================================
// Shape/stride utilities
// ============================================================================

/// Number of elements addressed by a shape.
///
/// The empty product is 1 (rank-0 scalar); any zero-length dimension gives 0.
#[inline]
pub fn numel(shape: &[usize]) -> usize {
    shape.iter().product()
}

/// Row-major (C-order) strides for a shape.
#[inline]
pub fn contiguous_strides(shape: &[usize]) -> Strides {
    Strides::row_major(shape)
}

/// Normalize a dimension index, supporting negative indexing.
///
/// Returns `None` if the dimension is out of bounds.
#[inline]
pub fn normalize_dim(dim: isize, ndim: usize) -> Option<usize> {
    let idx = if dim < 0 { ndim as isize + dim } else { dim };
    if idx >= 0 && (idx as usize) < ndim {
        Some(idx as usize)
    } else {
        None
    }
}

/// Normalize a dimension, or report it as an [`Error::InvalidDimension`].
#[inline]
pub(crate) fn wrap_dim(dim: isize, ndim: usize) -> Result<usize> {
    normalize_dim(dim, ndim).ok_or(Error::InvalidDimension { dim, ndim })
}

/// Whether `strides` describe a dense row-major layout for `shape`.
///
/// Scanning from the last dimension to the first, each stride must equal the
/// product of the sizes of all faster-varying dimensions. Size-1 dimensions
/// never falsify contiguity, and empty tensors are always contiguous.
pub fn is_contiguous_row_major(shape: &[usize], strides: &[isize]) -> bool {
    if numel(shape) == 0 {
        return true;
    }
    let mut expected = 1isize;
    for (&size, &stride) in shape.iter().zip(strides).rev() {
        if size == 1 {
            continue;
        }
        if stride != expected {
            return false;
        }
        expected *= size as isize;
    }
    true
}

/// Compute strides that let `new_shape` reinterpret an existing layout.
///
/// The old dimensions are grouped into maximal chunks whose strides nest in
/// row-major order. Each chunk may be re-split into any run of new dimensions
/// with the same element count; a new dimension can never straddle two
/// chunks. Returns `None` when no such assignment exists, in which case the
/// caller must copy.
pub fn can_view_without_copy(
    old_shape: &[usize],
    old_strides: &[isize],
    new_shape: &[usize],
) -> Option<Strides> {
    let old_numel = numel(old_shape);
    if old_numel != numel(new_shape) {
        return None;
    }
    if old_shape.is_empty() {
        // A scalar only views as all-ones shapes, which any strides satisfy.
        return Some(contiguous_strides(new_shape));
    }
    if old_numel == 0 {
        if old_shape == new_shape {
            return Some(Strides::from(old_strides));
        }
        return Some(contiguous_strides(new_shape));
    }

    let mut new_strides = Strides::zeros(new_shape.len());
    let mut view_d = new_shape.len() as isize - 1;
    let mut chunk_base_stride = old_strides[old_strides.len() - 1];
    let mut tensor_numel = 1usize;
    let mut view_numel = 1usize;

    for tensor_d in (0..old_shape.len()).rev() {
        tensor_numel *= old_shape[tensor_d];
        let chunk_ends = tensor_d == 0
            || (old_shape[tensor_d - 1] != 1
                && old_strides[tensor_d - 1] != tensor_numel as isize * chunk_base_stride);
        if !chunk_ends {
            continue;
        }
        while view_d >= 0 && (view_numel < tensor_numel || new_shape[view_d as usize] == 1) {
            new_strides[view_d as usize] = view_numel as isize * chunk_base_stride;
            view_numel *= new_shape[view_d as usize];
            view_d -= 1;
        }
        if view_numel != tensor_numel {
            return None;
        }
        if tensor_d > 0 {
            chunk_base_stride = old_strides[tensor_d - 1];
            tensor_numel = 1;
            view_numel = 1;
        }
    }

    if view_d != -1 {
        return None;
    }
    Some(new_strides)
}

// ============================================================================
// Layout
// ============================================================================

/// Layout describes the memory layout of a tensor
///
/// A tensor's elements live in a flat storage buffer, but not necessarily
/// in row-major order. The layout specifies how to compute the storage
/// element offset of any element given its indices.
///
/// Address of element at indices [i0, i1, ..., in]:
///   offset + i0 * strides[0] + i1 * strides[1] + ... + in * strides[n]
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Layout {
    /// Shape: size along each dimension
    shape: Shape,
    /// Strides: offset (in elements) between consecutive elements along each dimension
    strides: Strides,
    /// Offset: starting element index in the underlying storage
    offset: usize,
}

impl Layout {
    /// Create a new contiguous (row-major/C-order) layout from a shape
    ///
    /// # Example
    /// ```
    /// use tessera::tensor::Layout;
    /// let layout = Layout::contiguous(&[2, 3, 4]);
    /// assert_eq!(layout.shape(), &[2, 3, 4]);
    /// assert_eq!(layout.strides(), &[12, 4, 1]);
    /// ```
    pub fn contiguous(shape: &[usize]) -> Self {
        Self {
            shape: Shape::from(shape),
            strides: contiguous_strides(shape),
            offset: 0,
        }
    }

    /// Create a layout with explicit shape, strides, and offset
    ///
    /// This is unchecked apart from the rank: it is the raw constructor behind
    /// `as_strided`, and callers are responsible for staying inside storage.
    pub fn new(shape: impl Into<Shape>, strides: impl Into<Strides>, offset: usize) -> Result<Self> {
        let shape = shape.into();
        let strides = strides.into();
        if shape.len() != strides.len() {
            return Err(Error::InvalidStride {
                reason: format!(
                    "shape has {} dimensions but {} strides were given",
                    shape.len(),
                    strides.len()
                ),
            });
        }
        Ok(Self {
            shape,
            strides,
            offset,
        })
    }

    /// Create a scalar (0-dimensional) layout
    pub fn scalar() -> Self {
        Self {
            shape: Shape::new(),
            strides: Strides::new(),
            offset: 0,
        }
    }

    fn with_parts(shape: Shape, strides: Strides, offset: usize) -> Self {
        debug_assert_eq!(shape.len(), strides.len());
        Self {
            shape,
            strides,
            offset,
        }
    }

    /// Get the shape
    #[inline]
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    /// Get the strides
    #[inline]
    pub fn strides(&self) -> &[isize] {
        &self.strides
    }

    /// Get the storage offset
    #[inline]
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Number of dimensions (rank)
    #[inline]
    pub fn ndim(&self) -> usize {
        self.shape.len()
    }

    /// Total number of elements
    #[inline]
    pub fn numel(&self) -> usize {
        numel(&self.shape)
    }

    /// Check if the tensor is a scalar (0 dimensions)
    #[inline]
    pub fn is_scalar(&self) -> bool {
        self.shape.is_empty()
    }

    /// Check if the layout addresses no elements
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.numel() == 0
    }

    /// Check if memory is contiguous (row-major order)
    ///
    /// The storage offset does not affect contiguity.
    pub fn is_contiguous(&self) -> bool {
        is_contiguous_row_major(&self.shape, &self.strides)
    }

    /// Get size along a specific dimension
    ///
    /// Supports negative indexing: -1 is the last dimension
    pub fn dim(&self, d: isize) -> Option<usize> {
        let idx = normalize_dim(d, self.ndim())?;
        Some(self.shape[idx])
    }

    /// Get stride along a specific dimension
    pub fn stride(&self, d: isize) -> Option<isize> {
        let idx = normalize_dim(d, self.ndim())?;
        Some(self.strides[idx])
    }

    /// Normalize a dimension index (handle negative indices)
    pub fn normalize_dim(&self, d: isize) -> Result<usize> {
        wrap_dim(d, self.ndim())
    }

    /// Compute the storage element offset for given indices
    pub fn index(&self, indices: &[usize]) -> Option<usize> {
        if indices.len() != self.ndim() {
            return None;
        }
        if indices.iter().zip(self.shape.iter()).any(|(&i, &d)| i >= d) {
            return None;
        }

        let mut linear = self.offset as isize;
        for (&idx, &stride) in indices.iter().zip(self.strides.iter()) {
            linear += idx as isize * stride;
        }
        usize::try_from(linear).ok()
    }

    /// Smallest and largest storage offsets this layout addresses.
    ///
    /// Returns `None` for empty layouts.
    pub fn span(&self) -> Option<(isize, isize)> {
        if self.is_empty() {
            return None;
        }
        let mut lo = self.offset as isize;
        let mut hi = lo;
        for (&size, &stride) in self.shape.iter().zip(self.strides.iter()) {
            let reach = stride * (size as isize - 1);
            if reach >= 0 {
                hi += reach;
            } else {
                lo += reach;
            }
        }
        Some((lo, hi))
    }

    /// Check that every addressed element lies in `[0, storage_len)`.
    pub fn validate_bounds(&self, storage_len: usize) -> Result<()> {
        let Some((lo, hi)) = self.span() else {
            return Ok(());
        };
        if lo < 0 || hi >= storage_len as isize {
            return Err(Error::InvalidStride {
                reason: format!(
                    "{self:?} addresses elements [{lo}, {hi}] outside storage of {storage_len} elements"
                ),
            });
        }
        Ok(())
    }

    /// Iterate the storage offsets of all elements in row-major index order.
    pub fn offsets(&self) -> Offsets<'_> {
        Offsets::new(self)
    }

    /// Storage offset shifted by `delta` elements.
    fn shifted(&self, delta: isize) -> Result<usize> {
        usize::try_from(self.offset as isize + delta).map_err(|_| Error::InvalidStride {
            reason: format!("storage offset {} shifted by {delta} is negative", self.offset),
        })
    }

    // ===== View Operations =====

    /// Reinterpret the layout with a new shape without copying.
    ///
    /// Fails with `ShapeMismatch` if the element counts differ and with
    /// `NotViewable` if the strides cannot express the new shape.
    pub fn view(&self, new_shape: &[usize]) -> Result<Self> {
        if numel(new_shape) != self.numel() {
            return Err(Error::shape_mismatch(self.shape(), new_shape));
        }
        let strides = can_view_without_copy(&self.shape, &self.strides, new_shape).ok_or_else(
            || Error::NotViewable {
                shape: self.shape.to_vec(),
                strides: self.strides.to_vec(),
                target: new_shape.to_vec(),
            },
        )?;
        Ok(Self::with_parts(Shape::from(new_shape), strides, self.offset))
    }

    /// Reorder dimensions: output dimension `i` is input dimension `dims[i]`.
    pub fn permute(&self, dims: &[isize]) -> Result<Self> {
        let ndim = self.ndim();
        let invalid = || Error::InvalidPermutation {
            dims: dims.to_vec(),
            ndim,
        };
        if dims.len() != ndim {
            return Err(invalid());
        }

        let mut seen: SmallVec<[bool; 8]> = SmallVec::from_elem(false, ndim);
        let mut shape = Shape::with_capacity(ndim);
        let mut strides = Strides::new();
        for &d in dims {
            let idx = normalize_dim(d, ndim).ok_or_else(invalid)?;
            if seen[idx] {
                return Err(invalid());
            }
            seen[idx] = true;
            shape.push(self.shape[idx]);
            strides.push(self.strides[idx]);
        }
        Ok(Self::with_parts(shape, strides, self.offset))
    }

    /// Create a transposed layout (swap two dimensions)
    pub fn transpose(&self, dim0: isize, dim1: isize) -> Result<Self> {
        if self.is_scalar() && matches!(dim0, 0 | -1) && matches!(dim1, 0 | -1) {
            return Ok(self.clone());
        }
        let d0 = self.normalize_dim(dim0)?;
        let d1 = self.normalize_dim(dim1)?;

        let mut new_shape = self.shape.clone();
        let mut new_strides = self.strides.clone();
        new_shape.swap(d0, d1);
        new_strides.swap(d0, d1);

        Ok(Self::with_parts(new_shape, new_strides, self.offset))
    }

    /// Keep `length` elements of dimension `dim` starting at `start`.
    pub fn narrow(&self, dim: isize, start: usize, length: usize) -> Result<Self> {
        let d = self.normalize_dim(dim)?;
        let size = self.shape[d];
        let end = start.checked_add(length).unwrap_or(usize::MAX);
        if end > size {
            return Err(Error::IndexOutOfRange {
                index: end.min(isize::MAX as usize) as isize,
                dim: d,
                size,
            });
        }

        let mut shape = self.shape.clone();
        shape[d] = length;
        let offset = if length == 0 {
            self.offset
        } else {
            self.shifted(start as isize * self.strides[d])?
        };
        Ok(Self::with_parts(shape, self.strides.clone(), offset))
    }

    /// Pick one index of dimension `dim`, removing that dimension.
    pub fn select(&self, dim: isize, index: isize) -> Result<Self> {
        let d = self.normalize_dim(dim)?;
        let size = self.shape[d];
        let idx = if index < 0 { index + size as isize } else { index };
        if idx < 0 || idx >= size as isize {
            return Err(Error::IndexOutOfRange {
                index,
                dim: d,
                size,
            });
        }

        let offset = self.shifted(idx * self.strides[d])?;
        let mut shape = self.shape.clone();
        let mut strides = self.strides.clone();
        shape.remove(d);
        strides.remove(d);
        Ok(Self::with_parts(shape, strides, offset))
    }

    /// Python-style slice of one dimension.
    ///
    /// `start`/`stop` wrap when negative and are clamped to the dimension, so
    /// out-of-range bounds produce a shorter (possibly empty) result rather
    /// than an error. `step` must be positive.
    pub fn slice(
        &self,
        dim: isize,
        start: Option<isize>,
        stop: Option<isize>,
        step: isize,
    ) -> Result<Self> {
        if step <= 0 {
            return Err(Error::invalid_argument(
                "step",
                format!("slice step must be positive, got {step}"),
            ));
        }
        let d = self.normalize_dim(dim)?;
        let size = self.shape[d] as isize;
        let clamp = |v: isize| {
            if v < 0 {
                (v + size).max(0)
            } else {
                v.min(size)
            }
        };
        let start = start.map_or(0, clamp);
        let stop = stop.map_or(size, clamp);
        let length = if stop > start {
            (stop - start + step - 1) / step
        } else {
            0
        };

        let mut shape = self.shape.clone();
        let mut strides = self.strides.clone();
        shape[d] = length as usize;
        strides[d] = self.strides[d] * step;
        let offset = if length == 0 {
            self.offset
        } else {
            self.shifted(start * self.strides[d])?
        };
        Ok(Self::with_parts(shape, strides, offset))
    }

    /// Create a squeezed layout (remove dimensions of size 1)
    ///
    /// With `Some(dim)`, only that dimension is removed, and only if it has
    /// size 1; otherwise the layout is returned unchanged.
    pub fn squeeze(&self, dim: Option<isize>) -> Result<Self> {
        match dim {
            Some(d) => {
                if self.is_scalar() && matches!(d, 0 | -1) {
                    return Ok(self.clone());
                }
                let idx = self.normalize_dim(d)?;
                if self.shape[idx] != 1 {
                    return Ok(self.clone());
                }
                let mut new_shape = self.shape.clone();
                let mut new_strides = self.strides.clone();
                new_shape.remove(idx);
                new_strides.remove(idx);
                Ok(Self::with_parts(new_shape, new_strides, self.offset))
            }
            None => {
                let mut new_shape = Shape::new();
                let mut new_strides = Strides::new();
                for (&s, &st) in self.shape.iter().zip(self.strides.iter()) {
                    if s != 1 {
                        new_shape.push(s);
                        new_strides.push(st);
                    }
                }
                Ok(Self::with_parts(new_shape, new_strides, self.offset))
            }
        }
    }

    /// Create an unsqueezed layout (add dimension of size 1 at `dim`)
    ///
    /// `dim` ranges over `-(ndim + 1)..=ndim`.
    pub fn unsqueeze(&self, dim: isize) -> Result<Self> {
        let ndim = self.ndim();
        let idx = normalize_dim(dim, ndim + 1).ok_or(Error::InvalidDimension {
            dim,
            ndim: ndim + 1,
        })?;

        // Stride the new dimension as if it nested just outside its neighbour
        let new_stride = if idx < ndim {
            self.strides[idx] * self.shape[idx] as isize
        } else {
            1
        };

        let mut new_shape = self.shape.clone();
        let mut new_strides = self.strides.clone();
        new_shape.insert(idx, 1);
        new_strides.insert(idx, new_stride);

        Ok(Self::with_parts(new_shape, new_strides, self.offset))
    }

    /// Expand size-1 dimensions to `target` using stride 0.
    ///
    /// `target` may be longer than the current rank (new leading dimensions).
    /// A `-1` entry keeps the existing size of that dimension.
    pub fn expand(&self, target: &[isize]) -> Result<Self> {
        let ndim = self.ndim();
        let not_broadcastable = || Error::NotBroadcastable {
            shapes: vec![
                self.shape.to_vec(),
                target.iter().map(|&t| t.max(0) as usize).collect(),
            ],
        };
        if target.len() < ndim {
            return Err(not_broadcastable());
        }

        let pad = target.len() - ndim;
        let mut shape = Shape::from(vec![0; target.len()]);
        let mut strides = Strides::zeros(target.len());
        for i in (0..target.len()).rev() {
            let want = target[i];
            if want < -1 {
                return Err(Error::invalid_argument(
                    "target",
                    format!("invalid expanded size {want}"),
                ));
            }
            let (size, stride) = if i < pad {
                if want == -1 {
                    return Err(Error::invalid_argument(
                        "target",
                        "-1 is not allowed for a new leading dimension",
                    ));
                }
                // Virtual size-1 dim nested outside the one to its right
                let inner = if i + 1 < target.len() {
                    strides[i + 1] * shape[i + 1] as isize
                } else {
                    1
                };
                (1, inner)
            } else {
                (self.shape[i - pad], self.strides[i - pad])
            };

            let want = if want == -1 { size } else { want as usize };
            if want == size {
                shape[i] = size;
                strides[i] = stride;
            } else if size == 1 {
                shape[i] = want;
                strides[i] = 0;
            } else {
                return Err(not_broadcastable());
            }
        }
        Ok(Self::with_parts(shape, strides, self.offset))
    }

    /// Create a broadcast layout to a target shape
    pub fn broadcast_to(&self, target: &[usize]) -> Result<Self> {
        let target: SmallVec<[isize; 8]> = target.iter().map(|&t| t as isize).collect();
        self.expand(&target)
    }

    /// View the generalized diagonal of dimensions `dim1` and `dim2`.
    ///
    /// Both dimensions are removed and the diagonal is appended as the last
    /// dimension. A positive `offset` selects a diagonal above the main one.
    pub fn diagonal(&self, offset: isize, dim1: isize, dim2: isize) -> Result<Self> {
        let d1 = self.normalize_dim(dim1)?;
        let d2 = self.normalize_dim(dim2)?;
        if d1 == d2 {
            return Err(Error::invalid_argument(
                "dim2",
                format!("diagonal dimensions cannot be identical ({dim1}, {dim2})"),
            ));
        }

        let (size1, size2) = (self.shape[d1] as isize, self.shape[d2] as isize);
        let (stride1, stride2) = (self.strides[d1], self.strides[d2]);
        let diag_size = if offset >= 0 {
            size1.min(size2 - offset)
        } else {
            (size1 + offset).min(size2)
        }
        .max(0);

        let new_offset = if diag_size == 0 {
            self.offset
        } else if offset >= 0 {
            self.shifted(offset * stride2)?
        } else {
            self.shifted(-offset * stride1)?
        };

        let mut shape = Shape::with_capacity(self.ndim() - 1);
        let mut strides = Strides::new();
        for (i, (&s, &st)) in self.shape.iter().zip(self.strides.iter()).enumerate() {
            if i != d1 && i != d2 {
                shape.push(s);
                strides.push(st);
            }
        }
        shape.push(diag_size as usize);
        strides.push(stride1 + stride2);
        Ok(Self::with_parts(shape, strides, new_offset))
    }

    /// Sliding windows of `size` elements along `dim`, `step` apart.
    ///
    /// The window index replaces `dim` and a trailing dimension of length
    /// `size` walks the window.
    pub fn unfold(&self, dim: isize, size: usize, step: usize) -> Result<Self> {
        if step == 0 {
            return Err(Error::invalid_argument("step", "unfold step must be positive"));
        }
        if self.is_scalar() {
            // A scalar unfolds as a length-1 sequence
            if !matches!(dim, 0 | -1) {
                return Err(Error::InvalidDimension { dim, ndim: 0 });
            }
            if size > 1 {
                return Err(Error::IndexOutOfRange {
                    index: size as isize,
                    dim: 0,
                    size: 1,
                });
            }
            return Ok(Self::with_parts(
                Shape::from([size]),
                Strides::from([1]),
                self.offset,
            ));
        }

        let d = self.normalize_dim(dim)?;
        let dim_size = self.shape[d];
        if size > dim_size {
            return Err(Error::IndexOutOfRange {
                index: size as isize,
                dim: d,
                size: dim_size,
            });
        }

        let mut shape = self.shape.clone();
        let mut strides = self.strides.clone();
        shape[d] = (dim_size - size) / step + 1;
        strides[d] = self.strides[d] * step as isize;
        shape.push(size);
        strides.push(self.strides[d]);
        Ok(Self::with_parts(shape, strides, self.offset))
    }

    /// Reverse the order of elements along a dimension (negative stride)
    pub fn flip(&self, dim: isize) -> Result<Self> {
        let d = self.normalize_dim(dim)?;
        let size = self.shape[d];
        let mut strides = self.strides.clone();
        if size == 0 {
            return Ok(self.clone());
        }
        let offset = self.shifted((size as isize - 1) * self.strides[d])?;
        strides[d] = -self.strides[d];
        Ok(Self::with_parts(self.shape.clone(), strides, offset))
    }

    /// Reverse along several dimensions; each dimension may appear once
    pub fn flip_dims(&self, dims: &[isize]) -> Result<Self> {
        let mut seen: SmallVec<[bool; 8]> = SmallVec::from_elem(false, self.ndim());
        let mut layout = self.clone();
        for &dim in dims {
            let d = self.normalize_dim(dim)?;
            if seen[d] {
                return Err(Error::invalid_argument(
                    "dims",
                    format!("dimension {d} appears more than once"),
                ));
            }
            seen[d] = true;
            layout = layout.flip(d as isize)?;
        }
        Ok(layout)
    }
}

impl fmt::Debug for Layout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Layout {{ shape: {:?}, strides: {:?}, offset: {} }}",
            self.shape.as_slice(),
            self.strides.as_slice(),
            self.offset
        )
    }
}

impl fmt::Display for Layout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.shape.as_slice())
    }
}

// ============================================================================
// Offset iteration
// ============================================================================

/// Row-major iterator over the storage offsets addressed by a [`Layout`]
pub struct Offsets<'a> {
    layout: &'a Layout,
    index: SmallVec<[usize; 8]>,
    current: isize,
    remaining: usize,
}

impl<'a> Offsets<'a> {
    fn new(layout: &'a Layout) -> Self {
        Self {
            layout,
            index: SmallVec::from_elem(0, layout.ndim()),
            current: layout.offset as isize,
            remaining: layout.numel(),
        }
    }
}

impl Iterator for Offsets<'_> {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        if self.remaining == 0 {
            return None;
        }
        let out = self.current;
        self.remaining -= 1;
        if self.remaining > 0 {
            let shape = self.layout.shape();
            let strides = self.layout.strides();
            for d in (0..shape.len()).rev() {
                self.index[d] += 1;
                self.current += strides[d];
                if self.index[d] < shape[d] {
                    break;
                }
                self.current -= strides[d] * shape[d] as isize;
                self.index[d] = 0;
            }
        }
        // Negative offsets only arise from unchecked raw layouts; they index
        // out of bounds and panic at the access site.
        Some(out as usize)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl ExactSizeIterator for Offsets<'_> {}
