//! Resolution of index expressions into views or element offsets

use super::IndexTerm;
use crate::dispatch_dtype;
use crate::dtype::{DTypeSet, Element};
use crate::error::{Error, Result};
use crate::ops::broadcast::broadcast_shapes;
use crate::tensor::{Layout, Shape, Tensor};
use tracing::debug;

/// What an index expression selects from a tensor
pub(crate) enum Selection {
    /// Basic indexing only: a view of the same storage
    View(Layout),
    /// Advanced indexing: storage offsets of the selected elements, in
    /// row-major order of the result `shape`
    Gather { shape: Shape, offsets: Vec<usize> },
}

/// An advanced term after masks are lowered to coordinates
struct AdvancedIndex {
    /// Dimension of the basic-indexed layout this index addresses
    dim: usize,
    /// Dimension of the source tensor, for error reports
    source_dim: usize,
    /// Index tensor, any integer dtype
    index: Tensor,
}

/// Report an out-of-range integer against the source tensor's dimension
fn at_source_dim(err: Error, source_dim: usize) -> Error {
    match err {
        Error::IndexOutOfRange { index, size, .. } => Error::IndexOutOfRange {
            index,
            dim: source_dim,
            size,
        },
        other => other,
    }
}

pub(crate) fn resolve(t: &Tensor, terms: &[IndexTerm]) -> Result<Selection> {
    let ndim = t.ndim();
    let mut ellipses = 0usize;
    let mut consumed = 0usize;
    for term in terms {
        match term {
            IndexTerm::Ellipsis => ellipses += 1,
            IndexTerm::Mask(mask) if mask.ndim() == 0 => {
                return Err(Error::invalid_index("zero-dimensional masks are not supported"));
            }
            _ => consumed += term.consumed_dims(),
        }
    }
    if ellipses > 1 {
        return Err(Error::invalid_index("an index can only have a single ellipsis"));
    }
    if consumed > ndim {
        return Err(Error::TooManyIndices {
            given: consumed,
            ndim,
        });
    }
    let ellipsis_dims = ndim - consumed;

    // Basic pass: apply views left to right, recording where advanced terms land
    let mut layout = t.layout().clone();
    let mut dim = 0usize;
    let mut source_dim = 0usize;
    let mut advanced: Vec<AdvancedIndex> = Vec::new();
    for term in terms {
        match term {
            IndexTerm::Int(i) => {
                layout = layout
                    .select(dim as isize, *i)
                    .map_err(|e| at_source_dim(e, source_dim))?;
                source_dim += 1;
            }
            IndexTerm::Slice { start, stop, step } => {
                layout = layout.slice(dim as isize, *start, *stop, *step)?;
                dim += 1;
                source_dim += 1;
            }
            IndexTerm::NewAxis => {
                layout = layout.unsqueeze(dim as isize)?;
                dim += 1;
            }
            IndexTerm::Ellipsis => {
                dim += ellipsis_dims;
                source_dim += ellipsis_dims;
            }
            IndexTerm::Mask(mask) => {
                if !DTypeSet::MASKS.contains(mask.dtype()) {
                    return Err(Error::invalid_index(format!(
                        "masks must be bool or u8, got {}",
                        mask.dtype()
                    )));
                }
                let run = &layout.shape()[dim..dim + mask.ndim()];
                if mask.shape() != run {
                    return Err(Error::shape_mismatch(run, mask.shape()));
                }
                for (i, coords) in super::nonzero(mask)?.into_iter().enumerate() {
                    advanced.push(AdvancedIndex {
                        dim: dim + i,
                        source_dim: source_dim + i,
                        index: coords,
                    });
                }
                dim += mask.ndim();
                source_dim += mask.ndim();
            }
            IndexTerm::IntArray(index) => {
                if !index.dtype().is_int() {
                    return Err(Error::invalid_index(format!(
                        "index arrays must have an integer dtype, got {}",
                        index.dtype()
                    )));
                }
                advanced.push(AdvancedIndex {
                    dim,
                    source_dim,
                    index: index.clone(),
                });
                dim += 1;
                source_dim += 1;
            }
        }
    }

    if advanced.is_empty() {
        return Ok(Selection::View(layout));
    }

    let shapes: Vec<&[usize]> = advanced.iter().map(|a| a.index.shape()).collect();
    let batch = broadcast_shapes(&shapes)?;
    let batch_numel = batch.numel();

    // Sum of index * stride over the advanced dims, one entry per batch element
    let mut batch_offsets = vec![0isize; batch_numel];
    for adv in &advanced {
        let size = layout.shape()[adv.dim];
        let stride = layout.strides()[adv.dim];
        let values = read_indices(&adv.index.broadcast_to(&batch)?)?;
        for (acc, &raw) in batch_offsets.iter_mut().zip(&values) {
            let idx = if raw < 0 { raw + size as i64 } else { raw };
            if idx < 0 || idx >= size as i64 {
                return Err(Error::IndexOutOfRange {
                    index: raw as isize,
                    dim: adv.source_dim,
                    size,
                });
            }
            *acc += idx as isize * stride;
        }
    }

    let positions: Vec<usize> = advanced.iter().map(|a| a.dim).collect();
    let adjacent = positions.windows(2).all(|w| w[1] == w[0] + 1);
    let shape = layout.shape();
    let strides = layout.strides();
    let base = layout.offset() as isize;

    let (out_shape, offsets) = if adjacent {
        // Batch dims replace the indexed run in place
        let first = positions[0];
        let last = positions[positions.len() - 1] + 1;
        let pre = relative_offsets(&shape[..first], &strides[..first]);
        let post = relative_offsets(&shape[last..], &strides[last..]);

        let mut out_shape = Shape::from(&shape[..first]);
        out_shape.extend_from_slice(&batch);
        out_shape.extend_from_slice(&shape[last..]);

        let mut offsets = Vec::with_capacity(pre.len() * batch_numel * post.len());
        for &a in &pre {
            for &b in &batch_offsets {
                offsets.extend(post.iter().map(|&c| (base + a + b + c) as usize));
            }
        }
        (out_shape, offsets)
    } else {
        // Batch dims move to the front
        let (rest_shape, rest_strides): (Vec<usize>, Vec<isize>) = (0..shape.len())
            .filter(|d| !positions.contains(d))
            .map(|d| (shape[d], strides[d]))
            .unzip();
        let rest = relative_offsets(&rest_shape, &rest_strides);

        let mut out_shape = batch.clone();
        out_shape.extend_from_slice(&rest_shape);

        let mut offsets = Vec::with_capacity(batch_numel * rest.len());
        for &b in &batch_offsets {
            offsets.extend(rest.iter().map(|&c| (base + b + c) as usize));
        }
        (out_shape, offsets)
    };

    debug!(
        op = "index",
        kind = if terms_are_single_mask(terms) { "mask" } else { "gather" },
        shape = ?out_shape.as_slice(),
        numel = offsets.len(),
        "advanced index resolved"
    );
    Ok(Selection::Gather {
        shape: out_shape,
        offsets,
    })
}

fn terms_are_single_mask(terms: &[IndexTerm]) -> bool {
    let mut advanced = terms
        .iter()
        .filter(|t| matches!(t, IndexTerm::Mask(_) | IndexTerm::IntArray(_)));
    matches!(
        (advanced.next(), advanced.next()),
        (Some(IndexTerm::Mask(_)), None)
    )
}

/// Offsets relative to the first element, in row-major order
fn relative_offsets(shape: &[usize], strides: &[isize]) -> Vec<isize> {
    let mut out = vec![0isize];
    for (&size, &stride) in shape.iter().zip(strides) {
        let mut next = Vec::with_capacity(out.len() * size);
        for &base in &out {
            next.extend((0..size).map(|i| base + i as isize * stride));
        }
        out = next;
    }
    out
}

/// Read an integer tensor's values in row-major order
fn read_indices(index: &Tensor) -> Result<Vec<i64>> {
    let dtype = index.dtype();
    if !dtype.is_int() {
        return Err(Error::invalid_index(format!(
            "index arrays must have an integer dtype, got {dtype}"
        )));
    }
    let bytes = index.packed_bytes();
    dispatch_dtype!(dtype, T => {
        bytes
            .chunks_exact(std::mem::size_of::<T>())
            .map(|chunk| {
                let value: T = bytemuck::pod_read_unaligned(chunk);
                value
                    .to_index()
                    .ok_or_else(|| Error::invalid_index("index value does not fit in i64"))
            })
            .collect()
    }, "index")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relative_offsets() {
        assert_eq!(relative_offsets(&[], &[]), vec![0]);
        assert_eq!(relative_offsets(&[2, 3], &[3, 1]), vec![0, 1, 2, 3, 4, 5]);
        assert_eq!(relative_offsets(&[2], &[-4]), vec![0, -4]);
        assert!(relative_offsets(&[3, 0], &[1, 1]).is_empty());
    }

    #[test]
    fn test_read_indices() {
        let t = Tensor::from_slice(&[3u8, 0, 2], &[3]);
        assert_eq!(read_indices(&t).unwrap(), vec![3, 0, 2]);
        let r = Tensor::from_slice(&[-1i32, 4], &[2]).flip(0).unwrap();
        assert_eq!(read_indices(&r).unwrap(), vec![4, -1]);
        let f = Tensor::from_slice(&[1.0f32], &[1]);
        assert!(matches!(
            read_indices(&f),
            Err(Error::InvalidIndexType { .. })
        ));
    }
}
