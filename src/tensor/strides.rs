//! Strides type: element offsets for tensor memory layout

use super::shape::STACK_DIMS;
use smallvec::SmallVec;
use std::fmt;
use std::iter::FromIterator;
use std::ops::{Deref, DerefMut};

/// Strides type: element offsets between consecutive elements along each dimension
/// Signed to support negative strides (flip) and zero strides (expand)
/// NOTE: Strides are in ELEMENTS, not bytes
#[derive(Clone, PartialEq, Eq, Hash, Default)]
pub struct Strides(SmallVec<[isize; STACK_DIMS]>);

impl Strides {
    /// Create empty strides.
    pub fn new() -> Self {
        Self(SmallVec::new())
    }

    /// Create `ndim` zero strides, to be filled in by the caller.
    pub fn zeros(ndim: usize) -> Self {
        Self(SmallVec::from_elem(0, ndim))
    }

    /// Row-major (C-order) strides for a shape.
    ///
    /// Zero-length dimensions are treated as length 1 so that the strides of
    /// an empty tensor stay meaningful.
    pub fn row_major(shape: &[usize]) -> Self {
        let mut strides = Self::zeros(shape.len());
        let mut stride = 1isize;
        for (slot, &dim) in strides.iter_mut().zip(shape).rev() {
            *slot = stride;
            stride *= dim.max(1) as isize;
        }
        strides
    }

    /// Push a stride value.
    pub fn push(&mut self, stride: isize) {
        self.0.push(stride);
    }

    /// Remove stride at index.
    pub fn remove(&mut self, index: usize) -> isize {
        self.0.remove(index)
    }

    /// Insert stride at index.
    pub fn insert(&mut self, index: usize, value: isize) {
        self.0.insert(index, value);
    }

    /// View strides as a slice.
    pub fn as_slice(&self) -> &[isize] {
        self.0.as_slice()
    }
}

impl Deref for Strides {
    type Target = [isize];

    fn deref(&self) -> &Self::Target {
        self.0.as_slice()
    }
}

impl DerefMut for Strides {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.0.as_mut_slice()
    }
}

impl fmt::Debug for Strides {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl AsRef<[isize]> for Strides {
    fn as_ref(&self) -> &[isize] {
        self.0.as_slice()
    }
}

impl PartialEq<[isize]> for Strides {
    fn eq(&self, other: &[isize]) -> bool {
        self.0.as_slice() == other
    }
}

impl From<Vec<isize>> for Strides {
    fn from(value: Vec<isize>) -> Self {
        Self(value.into_iter().collect())
    }
}

impl From<&[isize]> for Strides {
    fn from(value: &[isize]) -> Self {
        Self(value.iter().copied().collect())
    }
}

impl<const N: usize> From<[isize; N]> for Strides {
    fn from(value: [isize; N]) -> Self {
        Self(value.into_iter().collect())
    }
}

impl FromIterator<isize> for Strides {
    fn from_iter<T: IntoIterator<Item = isize>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}
