//! Memory-overlap detection for in-place write guards
//!
//! Two questions are answered here. [`Layout::internal_overlap`] asks whether
//! distinct indices of one view can resolve to the same storage element.
//! [`overlap_status`] asks how two views relate when both address the same
//! storage. Both are conservative: when neither proof succeeds the answer is
//! `TooHard`, and write guards treat that as unsafe.

use super::{Layout, Tensor};
use crate::error::{Error, Result};
use smallvec::SmallVec;
use tracing::trace;

/// Whether a single view addresses any element more than once
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum MemOverlap {
    /// Every index maps to a distinct element
    No,
    /// Some element is reachable from two distinct indices
    Yes,
    /// Neither outcome could be proven
    TooHard,
}

/// How two views of possibly the same storage relate
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum MemOverlapStatus {
    /// No shared element
    No,
    /// Both views cover exactly the same elements
    Full,
    /// Some but not all elements are shared
    Partial,
    /// The relation could not be determined
    TooHard,
}

impl Layout {
    /// Classify whether distinct indices can address the same element.
    ///
    /// After dropping size-1 dimensions, any zero stride is a proven overlap.
    /// Otherwise dimensions are sorted by stride magnitude; if each stride
    /// exceeds the furthest offset reachable through all smaller-stride
    /// dimensions the layout is overlap-free. A stride that equals a small
    /// multiple of a finer one yields a concrete collision.
    pub fn internal_overlap(&self) -> MemOverlap {
        if self.numel() <= 1 || self.is_contiguous() {
            return MemOverlap::No;
        }

        let mut dims: SmallVec<[(usize, usize); 8]> = SmallVec::new();
        for (&size, &stride) in self.shape().iter().zip(self.strides()) {
            if size == 1 {
                continue;
            }
            if stride == 0 {
                return MemOverlap::Yes;
            }
            dims.push((stride.unsigned_abs(), size));
        }
        dims.sort_unstable();

        let mut reach = 0usize;
        let mut packed = true;
        for &(stride, size) in &dims {
            if stride <= reach {
                packed = false;
                break;
            }
            reach += stride * (size - 1);
        }
        if packed {
            return MemOverlap::No;
        }

        // Index 1 along `k` equals index `m` along a finer `j` when
        // stride_k == m * stride_j and m is in range.
        for (k, &(coarse, _)) in dims.iter().enumerate() {
            for &(fine, fine_size) in &dims[..k] {
                if coarse % fine == 0 && coarse / fine < fine_size {
                    return MemOverlap::Yes;
                }
            }
        }

        trace!(
            shape = ?self.shape(),
            strides = ?self.strides(),
            "internal overlap undecided"
        );
        MemOverlap::TooHard
    }

    /// Addressed span as a half-open range if the layout is overlap-free and
    /// dense over it.
    fn dense_span(&self) -> Option<(isize, isize)> {
        let (lo, hi) = self.span()?;
        let dense = (hi - lo + 1) as usize == self.numel()
            && self.internal_overlap() == MemOverlap::No;
        dense.then_some((lo, hi + 1))
    }
}

/// Classify whether a tensor addresses any element more than once
pub fn classify_overlap(t: &Tensor) -> MemOverlap {
    t.layout().internal_overlap()
}

/// Relation between the elements addressed by `a` and by `b`
pub fn overlap_status(a: &Tensor, b: &Tensor) -> MemOverlapStatus {
    if !a.storage().same_storage(b.storage()) {
        return MemOverlapStatus::No;
    }
    let (Some((a_lo, a_hi)), Some((b_lo, b_hi))) = (a.layout().span(), b.layout().span()) else {
        return MemOverlapStatus::No;
    };
    if a_hi < b_lo || b_hi < a_lo {
        return MemOverlapStatus::No;
    }
    if a.layout() == b.layout() {
        return MemOverlapStatus::Full;
    }
    match (a.layout().dense_span(), b.layout().dense_span()) {
        (Some(a_range), Some(b_range)) if a_range == b_range => MemOverlapStatus::Full,
        (Some(_), Some(_)) => MemOverlapStatus::Partial,
        _ => {
            trace!(
                a_shape = ?a.shape(),
                a_strides = ?a.strides(),
                b_shape = ?b.shape(),
                b_strides = ?b.strides(),
                "overlap status undecided"
            );
            MemOverlapStatus::TooHard
        }
    }
}

/// Refuse an in-place write through a tensor that may alias itself.
///
/// Fails with [`Error::InternalOverlap`] when overlap is proven or undecided.
pub fn assert_no_internal_overlap(t: &Tensor, op: &'static str) -> Result<()> {
    match classify_overlap(t) {
        MemOverlap::No => Ok(()),
        MemOverlap::Yes | MemOverlap::TooHard => Err(Error::InternalOverlap { op }),
    }
}

/// Refuse an in-place write where `a` and `b` may partially share elements.
///
/// Full overlap (the same elements in the same order or not) is allowed.
pub fn assert_no_partial_overlap(a: &Tensor, b: &Tensor, op: &'static str) -> Result<()> {
    match overlap_status(a, b) {
        MemOverlapStatus::No | MemOverlapStatus::Full => Ok(()),
        MemOverlapStatus::Partial | MemOverlapStatus::TooHard => {
            Err(Error::PartialOverlap { op })
        }
    }
}
