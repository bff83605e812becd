//! Advanced indexing: integer arrays and boolean masks gather new storage

use crate::common::{arange_f32, arange_i64, idx, values_f32, values_i64};
use tessera::prelude::*;

#[test]
fn test_rows_with_stepped_columns() {
    let t = arange_f32(&[4, 5]);
    let v = t
        .index(&[IndexTerm::IntArray(idx(&[0, 3])), IndexTerm::slice(None, None, 2)])
        .unwrap();
    assert_eq!(v.shape(), &[2, 3]);
    assert!(!v.shares_storage_with(&t));
    assert!(v.is_contiguous());
    assert_eq!(values_f32(&v), vec![0.0, 2.0, 4.0, 15.0, 17.0, 19.0]);
}

#[test]
fn test_paired_coordinates() {
    let t = arange_f32(&[4, 5]);
    let v = t
        .index(&[IndexTerm::IntArray(idx(&[0, 2])), IndexTerm::IntArray(idx(&[1, 3]))])
        .unwrap();
    assert_eq!(v.shape(), &[2]);
    assert_eq!(values_f32(&v), vec![1.0, 13.0]);
}

#[test]
fn test_index_arrays_broadcast() {
    let t = arange_f32(&[4, 5]);
    let rows = Tensor::from_slice(&[0i64, 3], &[2, 1]);
    let cols = Tensor::from_slice(&[0i32, 1, 2], &[3]);
    let v = t
        .index(&[IndexTerm::IntArray(rows), IndexTerm::IntArray(cols)])
        .unwrap();
    assert_eq!(v.shape(), &[2, 3]);
    assert_eq!(values_f32(&v), vec![0.0, 1.0, 2.0, 15.0, 16.0, 17.0]);
}

#[test]
fn test_index_arrays_not_broadcastable() {
    let t = arange_f32(&[4, 5]);
    assert!(matches!(
        t.index(&[IndexTerm::IntArray(idx(&[0, 1])), IndexTerm::IntArray(idx(&[0, 1, 2]))]),
        Err(Error::NotBroadcastable { .. })
    ));
}

#[test]
fn test_adjacent_advanced_dims_stay_in_place() {
    let t = arange_i64(&[2, 3, 4]);
    let v = t
        .index(&[IndexTerm::full(), IndexTerm::IntArray(idx(&[0, 2]))])
        .unwrap();
    assert_eq!(v.shape(), &[2, 2, 4]);
    assert_eq!(
        values_i64(&v),
        vec![0, 1, 2, 3, 8, 9, 10, 11, 12, 13, 14, 15, 20, 21, 22, 23]
    );
}

#[test]
fn test_separated_advanced_dims_move_to_front() {
    let t = arange_i64(&[2, 3, 4]);
    let v = t
        .index(&[
            IndexTerm::IntArray(idx(&[0, 1])),
            IndexTerm::full(),
            IndexTerm::IntArray(idx(&[0, 3])),
        ])
        .unwrap();
    assert_eq!(v.shape(), &[2, 3]);
    assert_eq!(values_i64(&v), vec![0, 4, 8, 15, 19, 23]);
}

#[test]
fn test_negative_and_out_of_range_array_entries() {
    let t = arange_f32(&[4, 5]);
    let last = t.index(&[IndexTerm::IntArray(idx(&[-1]))]).unwrap();
    assert_eq!(last.shape(), &[1, 5]);
    assert_eq!(values_f32(&last), vec![15.0, 16.0, 17.0, 18.0, 19.0]);

    assert!(matches!(
        t.index(&[IndexTerm::IntArray(idx(&[4]))]),
        Err(Error::IndexOutOfRange { index: 4, dim: 0, size: 4 })
    ));
}

#[test]
fn test_out_of_range_reports_source_dim() {
    let t = arange_f32(&[4, 5]);
    assert!(matches!(
        t.index(&[IndexTerm::from(0), IndexTerm::IntArray(idx(&[9]))]),
        Err(Error::IndexOutOfRange { index: 9, dim: 1, size: 5 })
    ));

    let cube = arange_f32(&[2, 3, 4]);
    assert!(matches!(
        cube.index(&[
            IndexTerm::from(1),
            IndexTerm::Ellipsis,
            IndexTerm::IntArray(idx(&[-5])),
        ]),
        Err(Error::IndexOutOfRange { index: -5, dim: 2, size: 4 })
    ));
}

#[test]
fn test_float_index_rejected() {
    let t = arange_f32(&[4, 5]);
    let f = Tensor::from_slice(&[0.0f32], &[1]);
    assert!(matches!(
        t.index(&[IndexTerm::IntArray(f)]),
        Err(Error::InvalidIndexType { .. })
    ));
}

#[test]
fn test_gather_from_transposed_source() {
    let t = arange_f32(&[4, 5]).t().unwrap();
    let v = t.index(&[IndexTerm::IntArray(idx(&[1, 0]))]).unwrap();
    assert_eq!(v.shape(), &[2, 4]);
    assert_eq!(
        values_f32(&v),
        vec![1.0, 6.0, 11.0, 16.0, 0.0, 5.0, 10.0, 15.0]
    );
}

#[test]
fn test_full_mask_selects_in_row_major_order() {
    let t = arange_f32(&[4, 5]);
    let flags: Vec<bool> = (0..20).map(|v| v > 12).collect();
    let mask = Tensor::from_bools(&flags, &[4, 5]);
    let v = t.index(&[IndexTerm::from(mask)]).unwrap();
    assert_eq!(v.shape(), &[7]);
    assert_eq!(
        values_f32(&v),
        vec![13.0, 14.0, 15.0, 16.0, 17.0, 18.0, 19.0]
    );
}

#[test]
fn test_row_mask() {
    let t = arange_f32(&[4, 5]);
    let mask = Tensor::from_bools(&[true, false, true, false], &[4]);
    let v = t.index(&[IndexTerm::Mask(mask)]).unwrap();
    assert_eq!(v.shape(), &[2, 5]);
    assert_eq!(
        values_f32(&v),
        vec![0.0, 1.0, 2.0, 3.0, 4.0, 10.0, 11.0, 12.0, 13.0, 14.0]
    );
}

#[test]
fn test_column_mask_after_full_slice() {
    let t = arange_f32(&[4, 5]);
    let mask = Tensor::from_slice(&[0u8, 1, 0, 0, 1], &[5]);
    let v = t.index(&[IndexTerm::full(), IndexTerm::Mask(mask)]).unwrap();
    assert_eq!(v.shape(), &[4, 2]);
    assert_eq!(
        values_f32(&v),
        vec![1.0, 4.0, 6.0, 9.0, 11.0, 14.0, 16.0, 19.0]
    );
}

#[test]
fn test_all_false_mask() {
    let t = arange_f32(&[4, 5]);
    let mask = Tensor::from_bools(&[false; 4], &[4]);
    let v = t.index(&[IndexTerm::Mask(mask)]).unwrap();
    assert_eq!(v.shape(), &[0, 5]);
    assert!(v.is_empty());
}

#[test]
fn test_mask_shape_must_match() {
    let t = arange_f32(&[4, 5]);
    let mask = Tensor::from_bools(&[true, false, true], &[3]);
    assert!(matches!(
        t.index(&[IndexTerm::Mask(mask)]),
        Err(Error::ShapeMismatch { .. })
    ));

    let wide = Tensor::from_slice(&[1i32, 0, 1, 0], &[4]);
    assert!(matches!(
        t.index(&[IndexTerm::Mask(wide)]),
        Err(Error::InvalidIndexType { .. })
    ));
}

#[test]
fn test_mask_with_index_array() {
    let t = arange_f32(&[4, 5]);
    let rows = Tensor::from_bools(&[false, true, false, true], &[4]);
    let v = t
        .index(&[IndexTerm::Mask(rows), IndexTerm::IntArray(idx(&[0, 4]))])
        .unwrap();
    assert_eq!(v.shape(), &[2]);
    assert_eq!(values_f32(&v), vec![5.0, 19.0]);
}
