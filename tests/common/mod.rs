//! Common test utilities
#![allow(dead_code)]

use tessera::dtype::DType;
use tessera::tensor::{Layout, Tensor};

/// `0..numel` as f32, row-major in `shape`
pub fn arange_f32(shape: &[usize]) -> Tensor {
    let n: usize = shape.iter().product();
    let data: Vec<f32> = (0..n).map(|i| i as f32).collect();
    Tensor::from_slice(&data, shape)
}

/// `0..numel` as i64, row-major in `shape`
pub fn arange_i64(shape: &[usize]) -> Tensor {
    let n: usize = shape.iter().product();
    let data: Vec<i64> = (0..n as i64).collect();
    Tensor::from_slice(&data, shape)
}

/// Integer index tensor of shape `[indices.len()]`
pub fn idx(indices: &[i64]) -> Tensor {
    Tensor::from_slice(indices, &[indices.len()])
}

/// Read back f32 elements, panicking on dtype mismatch
pub fn values_f32(t: &Tensor) -> Vec<f32> {
    t.to_vec::<f32>().expect("tensor is not f32")
}

/// Read back i64 elements, panicking on dtype mismatch
pub fn values_i64(t: &Tensor) -> Vec<i64> {
    t.to_vec::<i64>().expect("tensor is not i64")
}

/// Assert two tensors have identical shape, strides and offset
pub fn assert_same_layout(a: &Tensor, b: &Tensor, msg: &str) {
    assert_eq!(a.shape(), b.shape(), "{}: shape differs", msg);
    assert_eq!(a.strides(), b.strides(), "{}: strides differ", msg);
    assert_eq!(
        a.storage_offset(),
        b.storage_offset(),
        "{}: offset differs",
        msg
    );
}

/// Tensor viewing a fresh f32 storage through an explicit layout
pub fn strided_f32(storage_len: usize, layout: &Layout) -> Tensor {
    let base = Tensor::zeros(&[storage_len], DType::F32);
    base.as_strided(layout.shape(), layout.strides(), layout.offset())
        .expect("layout out of bounds")
}
