//! Property tests for shape inference, broadcasting, and dtype promotion.

use lax_core::primitive::{Monoid, Padding, Primitive, UnaryOp, WindowSpec};
use lax_core::{DType, Shape, ShapedArray};
use lax_ops::{broadcast_shapes, infer, padtype_to_pads, promote};
use proptest::prelude::*;

// ── Strategies ───────────────────────────────────────────────────────────

fn dim() -> impl Strategy<Value = usize> {
    1usize..=8
}

fn arb_shape() -> impl Strategy<Value = Shape> {
    prop::collection::vec(dim(), 0..=4).prop_map(Shape::new)
}

/// A shape and a suffix of it with some dims masked to 1.
fn broadcastable_pair() -> impl Strategy<Value = (Shape, Shape)> {
    prop::collection::vec(dim(), 1..=4).prop_flat_map(|target| {
        let len = target.len();
        (0..=len, prop::collection::vec(prop::bool::ANY, len), Just(target)).prop_map(
            |(skip, masks, t)| {
                let a: Vec<usize> = t[skip..]
                    .iter()
                    .zip(&masks[skip..])
                    .map(|(&d, &keep)| if keep { d } else { 1 })
                    .collect();
                (Shape::new(a), Shape::new(t))
            },
        )
    })
}

fn arb_dtype() -> impl Strategy<Value = DType> {
    prop::sample::select(DType::ALL.to_vec())
}

// ── Broadcasting ─────────────────────────────────────────────────────────

proptest! {
    #[test]
    fn broadcast_commutative(a in arb_shape(), b in arb_shape()) {
        prop_assert_eq!(broadcast_shapes(&a, &b), broadcast_shapes(&b, &a));
    }

    #[test]
    fn broadcast_self_identity(a in arb_shape()) {
        prop_assert_eq!(broadcast_shapes(&a, &a), Some(a));
    }

    #[test]
    fn broadcast_valid_pairs((a, b) in broadcastable_pair()) {
        prop_assert_eq!(broadcast_shapes(&a, &b), Some(b));
    }

    #[test]
    fn broadcast_scalar(a in arb_shape()) {
        prop_assert_eq!(broadcast_shapes(&a, &Shape::scalar()), Some(a));
    }
}

// ── Shape inference ──────────────────────────────────────────────────────

proptest! {
    #[test]
    fn unary_preserves_aval(a in arb_shape()) {
        let x = ShapedArray::new(a, DType::F32);
        for op in [UnaryOp::Neg, UnaryOp::Exp, UnaryOp::Tanh] {
            let out = infer(&Primitive::Unary(op), std::slice::from_ref(&x)).unwrap();
            prop_assert_eq!(&out[0], &x);
        }
    }

    #[test]
    fn reduce_sum_all_is_scalar(a in arb_shape()) {
        let axes: Vec<usize> = (0..a.ndim()).collect();
        let prim = Primitive::ReduceMonoid { monoid: Monoid::Sum, axes };
        let out = infer(&prim, &[ShapedArray::new(a, DType::I32)]).unwrap();
        prop_assert_eq!(&out[0].shape, &Shape::scalar());
    }

    #[test]
    fn transpose_reverse_preserves_numel(dims in prop::collection::vec(dim(), 1..=4)) {
        let permutation: Vec<usize> = (0..dims.len()).rev().collect();
        let x = ShapedArray::new(dims.clone(), DType::F32);
        let out = infer(&Primitive::Transpose { permutation }, &[x]).unwrap();
        let expected: Vec<usize> = dims.iter().rev().copied().collect();
        prop_assert_eq!(out[0].shape.0.clone(), expected);
    }

    /// SAME reduce_window with unit strides keeps the operand shape.
    #[test]
    fn same_window_preserves_shape(
        dims in prop::collection::vec(dim(), 1..=3),
        window in prop::collection::vec(1usize..=4, 3),
    ) {
        let rank = dims.len();
        let spec = WindowSpec::new(window[..rank].to_vec(), vec![1; rank], Padding::Same);
        let x = ShapedArray::new(dims.clone(), DType::F32);
        let prim = Primitive::ReduceWindowMonoid { monoid: Monoid::Max, window: spec };
        let out = infer(&prim, &[x]).unwrap();
        prop_assert_eq!(out[0].shape.0.clone(), dims);
    }

    /// SAME padding puts the odd unit high, so high - low is 0 or 1.
    #[test]
    fn same_padding_split(input in 1usize..=16, window in 1usize..=6, stride in 1usize..=4) {
        let pads = padtype_to_pads(&[input], &[window], &[stride], &Padding::Same);
        let (lo, hi) = pads[0];
        prop_assert!(lo >= 0);
        prop_assert!(hi - lo == 0 || hi - lo == 1);
        let out = (input as i64 + lo + hi - window as i64) / stride as i64 + 1;
        prop_assert_eq!(out as usize, input.div_ceil(stride));
    }
}

// ── DType promotion ──────────────────────────────────────────────────────

proptest! {
    #[test]
    fn promote_commutative(a in arb_dtype(), b in arb_dtype()) {
        prop_assert_eq!(promote(a, b), promote(b, a));
    }

    #[test]
    fn promote_self_identity(a in arb_dtype()) {
        prop_assert_eq!(promote(a, a), a);
    }

    /// The promoted dtype absorbs either input.
    #[test]
    fn promote_is_upper_bound(a in arb_dtype(), b in arb_dtype()) {
        let r = promote(a, b);
        prop_assert_eq!(promote(r, a), r);
        prop_assert_eq!(promote(r, b), r);
    }
}
