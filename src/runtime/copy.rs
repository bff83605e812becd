//! Byte-level strided gather and scatter
//!
//! These routines move whole elements between a storage buffer and a packed
//! row-major buffer. The offsets come from [`Layout::offsets`](crate::tensor::Layout::offsets)
//! and are measured in elements, not bytes.

/// Gather the elements at `offsets` from `src` into a packed buffer.
pub(crate) fn gather_bytes(
    src: &[u8],
    offsets: impl ExactSizeIterator<Item = usize>,
    elem_size: usize,
) -> Vec<u8> {
    let mut out = Vec::with_capacity(offsets.len() * elem_size);
    for off in offsets {
        let start = off * elem_size;
        out.extend_from_slice(&src[start..start + elem_size]);
    }
    out
}

/// Scatter a packed buffer into `dst` at `offsets`.
///
/// `src` must hold exactly one element per offset.
pub(crate) fn scatter_bytes(
    dst: &mut [u8],
    offsets: impl Iterator<Item = usize>,
    src: &[u8],
    elem_size: usize,
) {
    for (off, chunk) in offsets.zip(src.chunks_exact(elem_size)) {
        let start = off * elem_size;
        dst[start..start + elem_size].copy_from_slice(chunk);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gather_then_scatter() {
        let src: Vec<u8> = (0..12).collect();
        // Elements of size 2 at offsets 5, 0, 3
        let packed = gather_bytes(&src, [5usize, 0, 3].into_iter(), 2);
        assert_eq!(packed, vec![10, 11, 0, 1, 6, 7]);

        let mut dst = vec![0u8; 8];
        scatter_bytes(&mut dst, [3usize, 1, 0].into_iter(), &packed, 2);
        assert_eq!(dst, vec![6, 7, 0, 1, 0, 0, 10, 11]);
    }
}
