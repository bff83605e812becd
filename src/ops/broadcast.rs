//! Broadcasting: common shapes and stride-0 expansion
//!
//! Shapes are right-aligned; missing leading dimensions count as 1. At each
//! position every size must equal the common size or be 1. A zero-length
//! dimension broadcasts like any other size, so `0` against `1` gives `0`
//! while `0` against `5` fails.

use crate::error::{Error, Result};
use crate::tensor::{Shape, Tensor};

/// Broadcast two shapes, or `None` if they are incompatible
pub fn broadcast_shape(a: &[usize], b: &[usize]) -> Option<Shape> {
    let max_ndim = a.len().max(b.len());
    let mut result = Shape::from(vec![1; max_ndim]);

    // Iterate from right to left
    for i in 0..max_ndim {
        let a_dim = if i < a.len() { a[a.len() - 1 - i] } else { 1 };
        let b_dim = if i < b.len() { b[b.len() - 1 - i] } else { 1 };

        result[max_ndim - 1 - i] = if a_dim == b_dim || b_dim == 1 {
            a_dim
        } else if a_dim == 1 {
            b_dim
        } else {
            return None;
        };
    }
    Some(result)
}

/// Common broadcast shape of any number of shapes
///
/// An empty list broadcasts to the scalar shape. On failure the error lists
/// every input shape.
pub fn broadcast_shapes(shapes: &[&[usize]]) -> Result<Shape> {
    let mut out = Shape::new();
    for shape in shapes {
        out = broadcast_shape(&out, shape).ok_or_else(|| Error::NotBroadcastable {
            shapes: shapes.iter().map(|s| s.to_vec()).collect(),
        })?;
    }
    Ok(out)
}

/// Expand every tensor to the common broadcast shape (zero-copy)
pub fn broadcast_tensors(tensors: &[&Tensor]) -> Result<Vec<Tensor>> {
    let shapes: Vec<&[usize]> = tensors.iter().map(|t| t.shape()).collect();
    let target = broadcast_shapes(&shapes)?;
    tensors.iter().map(|t| t.broadcast_to(&target)).collect()
}

/// Broadcast the two operands of an elementwise binary operation
///
/// Both operands must share dtype and device; no promotion is attempted.
pub fn broadcast_pair(a: &Tensor, b: &Tensor) -> Result<(Tensor, Tensor)> {
    if a.dtype() != b.dtype() {
        return Err(Error::DTypeMismatch {
            lhs: a.dtype(),
            rhs: b.dtype(),
        });
    }
    if a.device() != b.device() {
        return Err(Error::DeviceMismatch);
    }
    let target = broadcast_shape(a.shape(), b.shape())
        .ok_or_else(|| Error::not_broadcastable(a.shape(), b.shape()))?;
    Ok((a.broadcast_to(&target)?, b.broadcast_to(&target)?))
}
