//! Property tests for the executors, run through the dispatch engine.

use lax_core::primitive::{Computation, Monoid, Padding, WindowSpec};
use lax_core::{Array, Config, DType, Shape};
use lax_cpu::{CpuRefBackend, Engine};
use proptest::prelude::*;

fn engine() -> Engine {
    Engine::with_backend(Box::new(CpuRefBackend), Config::default())
}

// ── Strategies ───────────────────────────────────────────────────────────

/// A small f32 array with integral values, so sums are exact.
fn arb_array() -> impl Strategy<Value = Array> {
    prop::collection::vec(1usize..=5, 1..=3).prop_flat_map(|dims| {
        let numel: usize = dims.iter().product();
        prop::collection::vec(-50i32..50, numel).prop_map(move |data| {
            let data: Vec<f32> = data.into_iter().map(|v| v as f32).collect();
            Array::from_f32(&data, &Shape::new(dims.clone())).unwrap()
        })
    })
}

/// Operand dims, update dims no larger than them, and in-range starts.
fn arb_update_window() -> impl Strategy<Value = (Vec<usize>, Vec<usize>, Vec<usize>)> {
    prop::collection::vec(1usize..=6, 1..=3)
        .prop_flat_map(|dims| {
            let sizes: Vec<_> = dims.iter().map(|&d| 1..=d).collect();
            (Just(dims), sizes)
        })
        .prop_flat_map(|(dims, sizes)| {
            let starts: Vec<_> = dims.iter().zip(&sizes).map(|(&d, &s)| 0..=d - s).collect();
            (Just(dims), Just(sizes), starts)
        })
}

fn index_arrays(starts: &[i64]) -> Vec<Array> {
    starts.iter().map(|&s| Array::scalar(s, DType::I32)).collect()
}

// ── Slicing ──────────────────────────────────────────────────────────────

proptest! {
    #[test]
    fn zero_pad_is_identity(x in arb_array()) {
        let e = engine();
        let config = vec![(0, 0, 0); x.ndim()];
        let zero = Array::scalar(0.0f32, DType::F32);
        prop_assert_eq!(e.pad(&x, &zero, &config).unwrap(), x);
    }

    #[test]
    fn dynamic_update_slice_round_trip((dims, sizes, starts) in arb_update_window()) {
        let e = engine();
        let x = Array::zeros(&Shape::new(dims), DType::F32);
        let n: usize = sizes.iter().product();
        let data: Vec<f32> = (0..n).map(|i| i as f32 + 1.0).collect();
        let update = Array::from_f32(&data, &Shape::new(sizes.clone())).unwrap();
        let starts: Vec<i64> = starts.iter().map(|&s| s as i64).collect();
        let idx = index_arrays(&starts);
        let refs: Vec<&Array> = idx.iter().collect();

        let written = e.dynamic_update_slice(&x, &update, &refs).unwrap();
        prop_assert_eq!(e.dynamic_slice(&written, &refs, &sizes).unwrap(), update);
    }

    #[test]
    fn dynamic_slice_clamps_out_of_range_starts(x in arb_array(), shift in 0i64..10) {
        let e = engine();
        let sizes: Vec<usize> = x.shape().dims().iter().map(|&d| d.div_ceil(2)).collect();
        let starts: Vec<i64> = x.shape().dims().iter().map(|&d| d as i64 + shift).collect();
        let idx = index_arrays(&starts);
        let refs: Vec<&Array> = idx.iter().collect();
        let got = e.dynamic_slice(&x, &refs, &sizes).unwrap();

        // clamped to the last in-bounds window
        let start: Vec<usize> = x.shape().dims().iter().zip(&sizes).map(|(d, s)| d - s).collect();
        let limit: Vec<usize> = x.shape().dims().to_vec();
        prop_assert_eq!(got, e.slice(&x, &start, &limit, None).unwrap());
    }

    #[test]
    fn transpose_involution(x in arb_array()) {
        let e = engine();
        let n = x.ndim();
        let perm: Vec<usize> = (0..n).rev().collect();
        let t = e.transpose(&x, &perm).unwrap();
        prop_assert_eq!(e.transpose(&t, &perm).unwrap(), x);
    }
}

// ── Reductions ───────────────────────────────────────────────────────────

proptest! {
    #[test]
    fn unit_window_is_identity(x in arb_array()) {
        let e = engine();
        let n = x.ndim();
        let window = WindowSpec::new(vec![1; n], vec![1; n], Padding::Valid);
        let zero = Array::scalar(0.0f32, DType::F32);
        let out = e
            .reduce_window(&[&x], &[&zero], Computation::Monoid(Monoid::Sum), window.clone())
            .unwrap();
        prop_assert_eq!(&out[0], &x);

        let neg_inf = Array::scalar(f32::NEG_INFINITY, DType::F32);
        let out = e
            .reduce_window(&[&x], &[&neg_inf], Computation::Monoid(Monoid::Max), window)
            .unwrap();
        prop_assert_eq!(&out[0], &x);
    }

    #[test]
    fn full_reduce_matches_sum_of_elements(x in arb_array()) {
        let e = engine();
        let axes: Vec<usize> = (0..x.ndim()).collect();
        let expected: f32 = x.to_vec_f32().iter().sum();
        prop_assert_eq!(e.reduce_sum(&x, &axes).unwrap().to_vec_f32(), vec![expected]);
    }
}

// ── Sorting ──────────────────────────────────────────────────────────────

proptest! {
    #[test]
    fn sort_is_idempotent(x in arb_array()) {
        let e = engine();
        let once = e.sort(&[&x], -1, true, 1).unwrap();
        let twice = e.sort(&[&once[0]], -1, true, 1).unwrap();
        prop_assert_eq!(&once[0], &twice[0]);
    }

    #[test]
    fn top_k_matches_descending_sort(
        data in prop::collection::vec(-20i32..20, 1..=12),
        k in 0usize..=12,
    ) {
        let e = engine();
        let k = k.min(data.len());
        let x = Array::from_i32(&data, &Shape::new(vec![data.len()])).unwrap();
        let (values, indices) = e.top_k(&x, k as i64).unwrap();

        let mut expected = data.clone();
        expected.sort_by(|a, b| b.cmp(a));
        let values = values.to_vec_i64();
        prop_assert_eq!(values.len(), k);
        for (got, want) in values.iter().zip(&expected) {
            prop_assert_eq!(*got, *want as i64);
        }
        // indices point at their values
        for (i, v) in indices.to_vec_i64().iter().zip(&values) {
            prop_assert_eq!(data[*i as usize] as i64, *v);
        }
    }
}
