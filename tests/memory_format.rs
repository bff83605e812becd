//! Integration tests for memory-format classification and propagation

mod common;

use common::{arange_f32, values_f32};
use tessera::prelude::*;

#[test]
fn test_channels_last_and_contiguous_operands_give_contiguous() {
    let x = arange_f32(&[4, 3, 8, 8]);
    let a = x.contiguous_format(MemoryFormat::ChannelsLast).unwrap();
    let b = x.contiguous_format(MemoryFormat::Contiguous).unwrap();

    assert_eq!(a.layout().classify_format(), FormatClass::ChannelsLast);
    assert_eq!(b.layout().classify_format(), FormatClass::Contiguous);
    assert_eq!(propagate_format(&[&a, &b]), MemoryFormat::Contiguous);
    assert_eq!(propagate_format(&[&b, &a]), MemoryFormat::Contiguous);
}

#[test]
fn test_channels_last_propagates_alone() {
    let x = arange_f32(&[2, 3, 4, 4]);
    let a = x.contiguous_format(MemoryFormat::ChannelsLast).unwrap();
    assert_eq!(propagate_format(&[&a]), MemoryFormat::ChannelsLast);

    // Lower-rank operands broadcast in and carry no format
    let bias = arange_f32(&[3, 1, 1]);
    assert_eq!(propagate_format(&[&a, &bias]), MemoryFormat::ChannelsLast);

    // Size-1 spatial dims make an operand ambiguous, not contiguous
    let pooled = arange_f32(&[2, 3, 1, 1]);
    assert_eq!(pooled.layout().classify_format(), FormatClass::Ambiguous);
    assert_eq!(propagate_format(&[&a, &pooled]), MemoryFormat::ChannelsLast);
}

#[test]
fn test_ambiguous_only_defaults_to_contiguous() {
    let a = arange_f32(&[1, 1, 1, 1]);
    let b = Tensor::zeros(&[0, 3, 2, 2], DType::F32);
    assert_eq!(b.layout().classify_format(), FormatClass::Ambiguous);
    assert_eq!(propagate_format(&[&a, &b]), MemoryFormat::Contiguous);
    assert_eq!(propagate_format(&[]), MemoryFormat::Contiguous);
}

#[test]
fn test_channels_last_3d() {
    let x = arange_f32(&[2, 3, 2, 2, 2]);
    let cl = x.contiguous_format(MemoryFormat::ChannelsLast3d).unwrap();
    assert_eq!(cl.strides(), &[24, 1, 12, 6, 3]);
    assert_eq!(cl.layout().classify_format(), FormatClass::ChannelsLast3d);
    assert_eq!(values_f32(&cl), values_f32(&x));
    assert!(x.contiguous_format(MemoryFormat::ChannelsLast).is_err());
}

#[test]
fn test_permuted_view_is_channels_last() {
    // NHWC data viewed as NCHW
    let nhwc = arange_f32(&[2, 4, 4, 3]);
    let nchw = nhwc.permute(&[0, 3, 1, 2]).unwrap();
    assert_eq!(nchw.layout().classify_format(), FormatClass::ChannelsLast);
    assert_eq!(nchw.layout().suggest_memory_format(), MemoryFormat::ChannelsLast);

    let same = nchw.contiguous_format(MemoryFormat::Preserve).unwrap();
    assert!(same.shares_storage_with(&nhwc));
}

#[test]
fn test_unclassified_layout() {
    let t = arange_f32(&[4, 3, 8, 8]).slice(2, None, None, 2).unwrap();
    assert_eq!(t.layout().classify_format(), FormatClass::Unclassified);
    assert!(!t.layout().is_contiguous_in(MemoryFormat::Contiguous));
}

#[test]
fn test_allocate_with_options() {
    let opts = TensorOptions::new(DType::I32).with_memory_format(MemoryFormat::ChannelsLast);
    let t = Tensor::full_with(&[1, 2, 2, 2], 5.0, &opts).unwrap();
    assert_eq!(t.strides(), &[8, 1, 4, 2]);
    assert_eq!(t.to_vec::<i32>().unwrap(), vec![5; 8]);

    let preserve = TensorOptions::default().with_memory_format(MemoryFormat::Preserve);
    let p = Tensor::empty_with(&[2, 3, 4, 5], &preserve).unwrap();
    assert!(p.is_contiguous());
    assert_eq!(p.dtype(), DType::F32);
}
