//! Index assignment through `index_put`

use crate::common::{arange_f32, idx, values_f32};
use tessera::prelude::*;

#[test]
fn test_masked_fill_with_scalar() {
    let t = arange_f32(&[2, 3]);
    let mask = Tensor::from_bools(&[true, false, true, false, true, false], &[2, 3]);
    let zero = Tensor::full_scalar(&[], DType::F32, 0.0);
    t.index_put(&[IndexTerm::Mask(mask)], &zero, false).unwrap();
    assert_eq!(values_f32(&t), vec![0.0, 1.0, 0.0, 3.0, 0.0, 5.0]);
}

#[test]
fn test_put_rows_by_index() {
    let t = Tensor::zeros(&[3, 2], DType::F32);
    let rows = Tensor::from_slice(&[1.0f32, 2.0, 3.0, 4.0], &[2, 2]);
    t.index_put(&[IndexTerm::IntArray(idx(&[2, 0]))], &rows, false)
        .unwrap();
    assert_eq!(values_f32(&t), vec![3.0, 4.0, 0.0, 0.0, 1.0, 2.0]);
}

#[test]
fn test_put_into_slice_view() {
    let t = arange_f32(&[4]);
    let src = Tensor::from_slice(&[10.0f32, 20.0], &[2]);
    t.index_put(&[IndexTerm::slice(Some(0), None, 2)], &src, false)
        .unwrap();
    assert_eq!(values_f32(&t), vec![10.0, 1.0, 20.0, 3.0]);
}

#[test]
fn test_accumulate_sums_repeats() {
    let t = Tensor::zeros(&[3], DType::I64);
    let ones = Tensor::full_scalar(&[5], DType::I64, 1.0);
    t.index_put(&[IndexTerm::IntArray(idx(&[0, 2, 2, 0, 2]))], &ones, true)
        .unwrap();
    assert_eq!(t.to_vec::<i64>().unwrap(), vec![2, 0, 3]);
}

#[test]
fn test_accumulate_wraps_integer_overflow() {
    let bytes = Tensor::from_slice(&[200u8, 0], &[2]);
    let add = Tensor::from_slice(&[100u8], &[1]);
    bytes
        .index_put(&[IndexTerm::IntArray(idx(&[0]))], &add, true)
        .unwrap();
    assert_eq!(bytes.to_vec::<u8>().unwrap(), vec![44, 0]);

    let ints = Tensor::from_slice(&[i32::MAX, 7], &[2]);
    let ones = Tensor::from_slice(&[1i32, 1], &[2]);
    ints.index_put(&[IndexTerm::IntArray(idx(&[0, 0]))], &ones, true)
        .unwrap();
    assert_eq!(ints.to_vec::<i32>().unwrap(), vec![i32::MIN + 1, 7]);
}

#[test]
fn test_value_may_alias_target() {
    let t = arange_f32(&[4]);
    let shifted = t.narrow(0, 0, 3).unwrap();
    t.index_put(&[IndexTerm::range(1, 4)], &shifted, false)
        .unwrap();
    assert_eq!(values_f32(&t), vec![0.0, 0.0, 1.0, 2.0]);
}

#[test]
fn test_expanded_target_rejected() {
    let base = Tensor::zeros(&[3], DType::F32);
    let wide = base.unsqueeze(0).unwrap().expand(&[4, -1]).unwrap();
    let one = Tensor::full_scalar(&[], DType::F32, 1.0);

    assert!(matches!(
        wide.index_put(&[IndexTerm::full()], &one, false),
        Err(Error::InternalOverlap { .. })
    ));
    assert!(matches!(
        wide.index_put(&[IndexTerm::IntArray(idx(&[0]))], &one, false),
        Err(Error::InternalOverlap { .. })
    ));
    // A single row of the expansion does not alias itself
    wide.index_put(&[IndexTerm::from(0)], &one, false).unwrap();
    assert_eq!(values_f32(&base), vec![1.0, 1.0, 1.0]);
}

#[test]
fn test_value_checks() {
    let t = Tensor::zeros(&[2, 2], DType::F32);

    let wrong_shape = Tensor::zeros(&[3], DType::F32);
    assert!(matches!(
        t.index_put(&[IndexTerm::full()], &wrong_shape, false),
        Err(Error::NotBroadcastable { .. })
    ));

    let opts = TensorOptions::new(DType::F32).with_device(Device::Cuda(0));
    let remote = Tensor::zeros_with(&[2], &opts).unwrap();
    assert!(matches!(
        t.index_put(&[IndexTerm::full()], &remote, false),
        Err(Error::DeviceMismatch)
    ));
}
