//! Basic and advanced indexing
//!
//! An index expression is a list of [`IndexTerm`]s. Integers, slices,
//! `Ellipsis` and `NewAxis` ("basic" terms) always produce a view. Boolean
//! masks and integer-array tensors ("advanced" terms) select arbitrary
//! elements and materialize a new tensor.
//!
//! Advanced terms are broadcast against each other. If they sit on adjacent
//! dimensions the broadcast dimensions replace them in place; otherwise the
//! broadcast dimensions move to the front of the result.
//!
//! # Example
//!
//! ```
//! use tessera::prelude::*;
//!
//! let data: Vec<f32> = (0..20).map(|i| i as f32).collect();
//! let t = Tensor::from_slice(&data, &[4, 5]);
//!
//! // t[1:3, -1]
//! let col = t.index(&[IndexTerm::range(1, 3), IndexTerm::from(-1)]).unwrap();
//! assert_eq!(col.to_vec::<f32>().unwrap(), vec![9.0, 14.0]);
//!
//! // t[[0, 3], ::2]
//! let rows = Tensor::from_slice(&[0i64, 3], &[2]);
//! let picked = t
//!     .index(&[IndexTerm::IntArray(rows), IndexTerm::slice(None, None, 2)])
//!     .unwrap();
//! assert_eq!(picked.shape(), &[2, 3]);
//! ```

mod resolve;

use crate::dispatch_dtype;
use crate::dtype::{DType, DTypeSet, Element};
use crate::error::{Error, Result};
use crate::runtime::copy;
use crate::tensor::{Layout, Storage, Tensor, assert_no_internal_overlap};
use resolve::Selection;
use std::ops::{Range, RangeFull};
use tracing::debug;

/// One term of an index expression
#[derive(Clone, Debug)]
pub enum IndexTerm {
    /// Select one position, removing the dimension; negative values wrap
    Int(isize),
    /// Python-style `start:stop:step`; bounds are clamped, `step > 0`
    Slice {
        /// First position (default 0)
        start: Option<isize>,
        /// One past the last position (default: the dimension size)
        stop: Option<isize>,
        /// Distance between selected positions
        step: isize,
    },
    /// Stands for as many full slices as needed to cover all dimensions
    Ellipsis,
    /// Insert a dimension of size 1
    NewAxis,
    /// Boolean (`Bool` or `U8`) mask over the next `mask.ndim()` dimensions
    Mask(Tensor),
    /// Integer positions along the next dimension
    IntArray(Tensor),
}

impl IndexTerm {
    /// The full range `:`
    pub fn full() -> Self {
        Self::Slice {
            start: None,
            stop: None,
            step: 1,
        }
    }

    /// The range `start:stop`
    pub fn range(start: isize, stop: isize) -> Self {
        Self::Slice {
            start: Some(start),
            stop: Some(stop),
            step: 1,
        }
    }

    /// The range `start:stop:step`
    pub fn slice(start: Option<isize>, stop: Option<isize>, step: isize) -> Self {
        Self::Slice { start, stop, step }
    }

    /// Number of source dimensions this term consumes
    fn consumed_dims(&self) -> usize {
        match self {
            Self::Int(_) | Self::Slice { .. } | Self::IntArray(_) => 1,
            Self::Mask(mask) => mask.ndim(),
            Self::Ellipsis | Self::NewAxis => 0,
        }
    }
}

impl From<isize> for IndexTerm {
    fn from(index: isize) -> Self {
        Self::Int(index)
    }
}

impl From<Range<isize>> for IndexTerm {
    fn from(range: Range<isize>) -> Self {
        Self::range(range.start, range.end)
    }
}

impl From<RangeFull> for IndexTerm {
    fn from(_: RangeFull) -> Self {
        Self::full()
    }
}

impl From<Tensor> for IndexTerm {
    /// `Bool` tensors become masks; every other dtype an integer array
    fn from(tensor: Tensor) -> Self {
        if tensor.dtype() == DType::Bool {
            Self::Mask(tensor)
        } else {
            Self::IntArray(tensor)
        }
    }
}

/// Coordinates of the non-zero elements of a mask
///
/// Returns one 1-D `I64` tensor per mask dimension; entry `k` of each holds
/// the coordinates of the `k`-th non-zero element in row-major order.
pub fn nonzero(mask: &Tensor) -> Result<Vec<Tensor>> {
    if !DTypeSet::MASKS.contains(mask.dtype()) {
        return Err(Error::invalid_index(format!(
            "masks must be bool or u8, got {}",
            mask.dtype()
        )));
    }
    let shape = mask.shape();
    let mut coords: Vec<Vec<i64>> = vec![Vec::new(); shape.len()];
    let mut index = vec![0usize; shape.len()];
    for byte in mask.packed_bytes() {
        if byte != 0 {
            for (c, &i) in coords.iter_mut().zip(&index) {
                c.push(i as i64);
            }
        }
        for d in (0..shape.len()).rev() {
            index[d] += 1;
            if index[d] < shape[d] {
                break;
            }
            index[d] = 0;
        }
    }
    coords
        .iter()
        .map(|c| Tensor::try_from_slice(c, &[c.len()]))
        .collect()
}

impl Tensor {
    /// Read `self[terms]`
    ///
    /// Basic expressions return a view sharing storage; any mask or integer
    /// array returns a new contiguous tensor.
    pub fn index(&self, terms: &[IndexTerm]) -> Result<Tensor> {
        match resolve::resolve(self, terms)? {
            Selection::View(layout) => Ok(Tensor::from_parts(self.storage().clone(), layout)),
            Selection::Gather { shape, offsets } => {
                let elem_size = self.dtype().size_in_bytes();
                let bytes = copy::gather_bytes(&self.storage().read(), offsets.into_iter(), elem_size);
                let storage = Storage::from_bytes(&bytes, self.dtype(), self.device())?;
                Ok(Tensor::from_parts(storage, Layout::contiguous(&shape)))
            }
        }
    }

    /// Write `value` into `self[terms]`
    ///
    /// `value` must have the same dtype and device and broadcast to the
    /// selected shape. It is read in full before anything is written, so it
    /// may alias `self`. With repeated integer indices the last write wins,
    /// unless `accumulate` is set, in which case every occurrence is added
    /// to the existing element.
    ///
    /// Fails with [`Error::InternalOverlap`] if the written elements cannot be
    /// proven distinct for a view target, or if `self` aliases itself for an
    /// advanced target.
    pub fn index_put(&self, terms: &[IndexTerm], value: &Tensor, accumulate: bool) -> Result<()> {
        if value.dtype() != self.dtype() {
            return Err(Error::DTypeMismatch {
                lhs: self.dtype(),
                rhs: value.dtype(),
            });
        }
        if value.device() != self.device() {
            return Err(Error::DeviceMismatch);
        }
        if accumulate && self.dtype() == DType::Bool {
            return Err(Error::UnsupportedDType {
                dtype: DType::Bool,
                op: "index_put",
            });
        }

        let (shape, offsets) = match resolve::resolve(self, terms)? {
            Selection::View(layout) => {
                let target = Tensor::from_parts(self.storage().clone(), layout);
                assert_no_internal_overlap(&target, "index_put")?;
                let offsets: Vec<usize> = target.layout().offsets().collect();
                (target.shape().to_vec(), offsets)
            }
            Selection::Gather { shape, offsets } => {
                assert_no_internal_overlap(self, "index_put")?;
                (shape.to_vec(), offsets)
            }
        };

        let packed = value.broadcast_to(&shape)?.packed_bytes();
        debug!(
            op = "index_put",
            shape = ?shape,
            numel = offsets.len(),
            accumulate,
            "scatter write"
        );

        let elem_size = self.dtype().size_in_bytes();
        let mut data = self.storage().write();
        if !accumulate {
            copy::scatter_bytes(&mut data, offsets.into_iter(), &packed, elem_size);
            return Ok(());
        }
        dispatch_dtype!(self.dtype(), T => {
            accumulate_into::<T>(&mut data, &offsets, &packed);
            Ok(())
        }, "index_put")
    }
}

/// Add packed `values` into `data` at element `offsets`
fn accumulate_into<T: Element>(data: &mut [u8], offsets: &[usize], values: &[u8]) {
    let size = std::mem::size_of::<T>();
    for (&off, chunk) in offsets.iter().zip(values.chunks_exact(size)) {
        let slot = &mut data[off * size..(off + 1) * size];
        let current: T = bytemuck::pod_read_unaligned(slot);
        let add: T = bytemuck::pod_read_unaligned(chunk);
        slot.copy_from_slice(bytemuck::bytes_of(&current.accumulate(add)));
    }
}
