//! Basic indexing: every result is a view

use crate::common::{arange_f32, assert_same_layout, values_f32};
use tessera::prelude::*;

#[test]
fn test_row_range_and_last_column() {
    let t = arange_f32(&[4, 5]);
    let v = t
        .index(&[IndexTerm::range(1, 3), IndexTerm::from(-1)])
        .unwrap();
    assert_eq!(v.shape(), &[2]);
    assert!(v.shares_storage_with(&t));
    assert_eq!(values_f32(&v), vec![9.0, 14.0]);
}

#[test]
fn test_degenerate_slice_is_empty() {
    let t = arange_f32(&[4, 5]);
    let v = t.index(&[IndexTerm::range(2, 1)]).unwrap();
    assert_eq!(v.shape(), &[0, 5]);
}

#[test]
fn test_ellipsis_fills_leading_dims() {
    let t = arange_f32(&[4, 5]);
    let col = t.index(&[IndexTerm::Ellipsis, IndexTerm::from(0)]).unwrap();
    assert_eq!(col.shape(), &[4]);
    assert_eq!(values_f32(&col), vec![0.0, 5.0, 10.0, 15.0]);

    let same = t.index(&[IndexTerm::Ellipsis]).unwrap();
    assert_same_layout(&same, &t, "bare ellipsis");

    let none = t.index(&[]).unwrap();
    assert_same_layout(&none, &t, "empty index");
}

#[test]
fn test_new_axis() {
    let t = arange_f32(&[4, 5]);
    let v = t.index(&[IndexTerm::NewAxis, IndexTerm::from(2)]).unwrap();
    assert_eq!(v.shape(), &[1, 5]);
    assert_eq!(values_f32(&v), vec![10.0, 11.0, 12.0, 13.0, 14.0]);

    let w = t.index(&[IndexTerm::Ellipsis, IndexTerm::NewAxis]).unwrap();
    assert_eq!(w.shape(), &[4, 5, 1]);

    // New axes do not count against the rank
    let x = t
        .index(&[
            IndexTerm::full(),
            IndexTerm::NewAxis,
            IndexTerm::full(),
            IndexTerm::NewAxis,
        ])
        .unwrap();
    assert_eq!(x.shape(), &[4, 1, 5, 1]);
}

#[test]
fn test_stepped_slice() {
    let t = arange_f32(&[4, 5]);
    let v = t
        .index(&[IndexTerm::slice(None, None, 3), IndexTerm::slice(Some(1), None, 2)])
        .unwrap();
    assert_eq!(v.shape(), &[2, 2]);
    assert_eq!(v.strides(), &[15, 2]);
    assert_eq!(values_f32(&v), vec![1.0, 3.0, 16.0, 18.0]);
}

#[test]
fn test_too_many_indices() {
    let t = arange_f32(&[4, 5]);
    let err = t
        .index(&[IndexTerm::from(0), IndexTerm::from(0), IndexTerm::from(0)])
        .unwrap_err();
    assert_eq!(err, Error::TooManyIndices { given: 3, ndim: 2 });
}

#[test]
fn test_second_ellipsis_rejected() {
    let t = arange_f32(&[4, 5]);
    assert!(matches!(
        t.index(&[IndexTerm::Ellipsis, IndexTerm::Ellipsis]),
        Err(Error::InvalidIndexType { .. })
    ));
}

#[test]
fn test_integer_out_of_range() {
    let t = arange_f32(&[4, 5]);
    assert!(matches!(
        t.index(&[IndexTerm::from(4)]),
        Err(Error::IndexOutOfRange { index: 4, dim: 0, size: 4 })
    ));
    assert!(matches!(
        t.index(&[IndexTerm::full(), IndexTerm::from(-6)]),
        Err(Error::IndexOutOfRange { .. })
    ));
    assert!(matches!(
        t.index(&[IndexTerm::from(1), IndexTerm::from(5)]),
        Err(Error::IndexOutOfRange { index: 5, dim: 1, size: 5 })
    ));
}

#[test]
fn test_index_scalar_tensor() {
    let s = Tensor::full_scalar(&[], DType::I32, 3.0);
    let v = s.index(&[IndexTerm::Ellipsis]).unwrap();
    assert_eq!(v.item::<i32>().unwrap(), 3);
    let u = s.index(&[IndexTerm::NewAxis]).unwrap();
    assert_eq!(u.shape(), &[1]);
    assert!(s.index(&[IndexTerm::from(0)]).is_err());
}
