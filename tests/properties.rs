//! Property tests for view round trips and broadcasting

mod common;

use common::{arange_f32, assert_same_layout, strided_f32};
use proptest::prelude::*;
use tessera::prelude::*;

fn shape_strategy() -> impl Strategy<Value = Vec<usize>> {
    prop::collection::vec(1usize..5, 1..5)
}

fn shape_and_permutation() -> impl Strategy<Value = (Vec<usize>, Vec<usize>)> {
    shape_strategy().prop_flat_map(|shape| {
        let perm: Vec<usize> = (0..shape.len()).collect();
        (Just(shape), Just(perm).prop_shuffle())
    })
}

fn shape_and_strides() -> impl Strategy<Value = (Vec<usize>, Vec<isize>)> {
    prop::collection::vec(1usize..4, 1..4).prop_flat_map(|shape| {
        let n = shape.len();
        (Just(shape), prop::collection::vec(0isize..4, n))
    })
}

fn inverse(perm: &[usize]) -> Vec<isize> {
    let mut inv = vec![0isize; perm.len()];
    for (i, &p) in perm.iter().enumerate() {
        inv[p] = i as isize;
    }
    inv
}

proptest! {
    #[test]
    fn prop_permute_inverse_restores_layout((shape, perm) in shape_and_permutation()) {
        let t = arange_f32(&shape);
        let dims: Vec<isize> = perm.iter().map(|&p| p as isize).collect();
        let back = t.permute(&dims).unwrap().permute(&inverse(&perm)).unwrap();
        assert_same_layout(&back, &t, "permute round trip");
    }

    #[test]
    fn prop_transpose_twice_restores_layout(
        shape in shape_strategy(),
        i in 0usize..4,
        j in 0usize..4,
    ) {
        let t = arange_f32(&shape);
        let (i, j) = ((i % shape.len()) as isize, (j % shape.len()) as isize);
        let back = t.transpose(i, j).unwrap().transpose(i, j).unwrap();
        assert_same_layout(&back, &t, "transpose round trip");
    }

    #[test]
    fn prop_view_round_trip(shape in shape_strategy(), split in 0usize..4) {
        let t = arange_f32(&shape);
        // Merge everything after `split` into one dimension
        let split = split % shape.len();
        let mut merged: Vec<usize> = shape[..split].to_vec();
        merged.push(shape[split..].iter().product());

        let v = t.view(&merged).unwrap();
        let back = v.view(&shape).unwrap();
        assert_same_layout(&back, &t, "view round trip");
        prop_assert!(back.shares_storage_with(&t));
    }

    #[test]
    fn prop_view_of_permuted_round_trips_when_possible(
        (shape, perm) in shape_and_permutation(),
    ) {
        let dims: Vec<isize> = perm.iter().map(|&p| p as isize).collect();
        let p = arange_f32(&shape).permute(&dims).unwrap();
        let flat = [p.numel()];
        if let Ok(v) = p.view(&flat) {
            let back = v.view(p.shape()).unwrap();
            prop_assert_eq!(back.to_vec::<f32>().unwrap(), p.to_vec::<f32>().unwrap());
        }
    }

    #[test]
    fn prop_broadcast_numel_dominates(
        a in prop::collection::vec(prop_oneof![Just(1usize), 2usize..5], 0..4),
        b in prop::collection::vec(prop_oneof![Just(1usize), 2usize..5], 0..4),
    ) {
        match broadcast_shapes(&[a.as_slice(), b.as_slice()]) {
            Ok(out) => {
                let n_a: usize = a.iter().product();
                let n_b: usize = b.iter().product();
                prop_assert!(out.numel() >= n_a.max(n_b));
                prop_assert_eq!(out.len(), a.len().max(b.len()));
            }
            Err(err) => {
                let shapes = vec![a.clone(), b.clone()];
                prop_assert_eq!(err, Error::NotBroadcastable { shapes });
                prop_assert!(broadcast_shape(&a, &b).is_none());
            }
        }
    }

    #[test]
    fn prop_unfold_window_count(len in 1usize..20, size in 1usize..6, step in 1usize..4) {
        prop_assume!(size <= len);
        let t = arange_f32(&[len]);
        let w = t.unfold(0, size, step).unwrap();
        prop_assert_eq!(w.shape(), &[(len - size) / step + 1, size]);
        prop_assert!(w.shares_storage_with(&t));
    }

    #[test]
    fn prop_overlap_verdict_agrees_with_offsets((shape, strides) in shape_and_strides()) {
        let layout = Layout::new(shape.as_slice(), strides.as_slice(), 0).unwrap();
        let t = strided_f32(32, &layout);
        let offsets: Vec<usize> = t.layout().offsets().collect();
        let mut unique = offsets.clone();
        unique.sort_unstable();
        unique.dedup();
        let verdict = classify_overlap(&t);
        if unique.len() < offsets.len() {
            prop_assert_ne!(verdict, MemOverlap::No);
        } else {
            prop_assert_ne!(verdict, MemOverlap::Yes);
        }
    }
}
