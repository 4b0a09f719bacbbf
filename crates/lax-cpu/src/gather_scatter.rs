//! Gather and scatter executors.
//!
//! Index vectors always live on the last axis of `indices`. Bounds handling
//! follows [`GatherScatterMode`]: gather clamps unless asked to fill, scatter
//! drops out-of-bounds windows unless asked to clip.

use num_complex::Complex64;
use rayon::prelude::*;

use lax_core::primitive::{BinaryOp, GatherScatterMode, GatherSpec, ScatterKind, ScatterSpec};
use lax_core::{Array, DType, DTypeKind, Result, Scalar, ShapedArray};
use lax_core::scalar::{signed_min, unsigned_max};

use crate::elementwise::{binary_scalar, unary_scalar};
use crate::index::{IndexIter, build, strides, unravel};

/// Fill value used by gather in fill mode when none is given.
pub fn default_fill_value(dtype: DType) -> Scalar {
    match dtype.kind() {
        DTypeKind::Bool => Scalar::Bool(true),
        DTypeKind::Signed => Scalar::Int(signed_min(dtype.bits())),
        DTypeKind::Unsigned => Scalar::UInt(unsigned_max(dtype.bits())),
        DTypeKind::Float => Scalar::Float(f64::NAN),
        DTypeKind::Complex => Scalar::Complex(Complex64::new(f64::NAN, f64::NAN)),
    }
}

/// Start index vector for batch position `batch` (all axes but the last).
fn index_vector(indices: &Array, batch: &[usize]) -> Vec<i64> {
    let dims = indices.shape().dims();
    let len = dims[dims.len() - 1];
    let st = strides(dims);
    let base: usize = batch.iter().zip(&st).map(|(i, s)| i * s).sum();
    (0..len).map(|k| indices.data()[base + k].as_index()).collect()
}

/// Resolve per-axis window starts in place. Returns `false` when the window
/// is out of bounds and must be filled or dropped.
fn resolve_starts(
    starts: &mut [i64],
    operand_dims: &[usize],
    window: &[usize],
    clamp: bool,
) -> bool {
    for ((s, &dim), &w) in starts.iter_mut().zip(operand_dims).zip(window) {
        let max_start = dim as i64 - w as i64;
        if clamp {
            *s = (*s).clamp(0, max_start.max(0));
        } else if *s < 0 || *s > max_start {
            return false;
        }
    }
    true
}

// ── gather ──────────────────────────────────────────────────────────────────

pub fn gather(operand: &Array, indices: &Array, spec: &GatherSpec, out: &ShapedArray) -> Result<Array> {
    let dnums = &spec.dimension_numbers;
    let operand_dims = operand.shape().dims();
    let operand_st = strides(operand_dims);
    let out_dims = out.shape.dims().to_vec();
    let rank = operand_dims.len();
    let clamp = !matches!(spec.mode, Some(GatherScatterMode::FillOrDrop));
    let fill = spec
        .fill_value
        .unwrap_or_else(|| default_fill_value(operand.dtype()));

    // Operand axes that carry a window offset, in output offset_dims order.
    let window_axes: Vec<usize> = (0..rank)
        .filter(|d| !dnums.collapsed_slice_dims.contains(d))
        .collect();
    let batch_axes: Vec<usize> = (0..out_dims.len())
        .filter(|d| !dnums.offset_dims.contains(d))
        .collect();

    let data = (0..out.shape.numel())
        .into_par_iter()
        .map(|flat| {
            let out_idx = unravel(flat, &out_dims);
            let batch: Vec<usize> = batch_axes.iter().map(|&a| out_idx[a]).collect();
            let vector = index_vector(indices, &batch);
            let mut starts = vec![0i64; rank];
            for (k, &axis) in dnums.start_index_map.iter().enumerate() {
                starts[axis] = vector[k];
            }
            if !resolve_starts(&mut starts, operand_dims, &spec.slice_sizes, clamp) {
                return fill;
            }
            let mut offset = 0usize;
            for (d, &start) in starts.iter().enumerate() {
                offset += start as usize * operand_st[d];
            }
            for (&axis, &out_axis) in window_axes.iter().zip(&dnums.offset_dims) {
                offset += out_idx[out_axis] * operand_st[axis];
            }
            operand.data()[offset]
        })
        .collect();
    build(out, data)
}

// ── scatter ─────────────────────────────────────────────────────────────────

fn combine(kind: ScatterKind, current: Scalar, update: Scalar, dtype: DType) -> Result<Scalar> {
    match kind {
        ScatterKind::Replace => Ok(update.cast(dtype)),
        ScatterKind::Add => binary_scalar(BinaryOp::Add, current, update.cast(dtype), dtype),
        ScatterKind::Mul => binary_scalar(BinaryOp::Mul, current, update.cast(dtype), dtype),
        ScatterKind::Min => binary_scalar(BinaryOp::Min, current, update.cast(dtype), dtype),
        ScatterKind::Max => binary_scalar(BinaryOp::Max, current, update.cast(dtype), dtype),
        ScatterKind::Apply(op) => unary_scalar(op, current, dtype),
    }
}

/// Updates are applied sequentially in row-major order of `updates`, so
/// with colliding indices the last update wins for `Replace`.
pub fn scatter(
    operand: &Array,
    indices: &Array,
    updates: &Array,
    spec: &ScatterSpec,
    mode: GatherScatterMode,
    out: &ShapedArray,
) -> Result<Array> {
    let dnums = &spec.dimension_numbers;
    let operand_dims = operand.shape().dims();
    let operand_st = strides(operand_dims);
    let update_dims = updates.shape().dims();
    let rank = operand_dims.len();
    let dtype = operand.dtype();
    let clamp = mode == GatherScatterMode::Clip;

    let window_axes: Vec<usize> = (0..rank)
        .filter(|d| !dnums.inserted_window_dims.contains(d))
        .collect();
    let scatter_axes: Vec<usize> = (0..update_dims.len())
        .filter(|d| !dnums.update_window_dims.contains(d))
        .collect();
    let mut window = vec![1usize; rank];
    for (&axis, &update_axis) in window_axes.iter().zip(&dnums.update_window_dims) {
        window[axis] = update_dims[update_axis];
    }

    let mut result = operand.data().to_vec();
    for (flat, update_idx) in IndexIter::new(update_dims).enumerate() {
        let batch: Vec<usize> = scatter_axes.iter().map(|&a| update_idx[a]).collect();
        let vector = index_vector(indices, &batch);
        let mut starts = vec![0i64; rank];
        for (k, &axis) in dnums.scatter_dims_to_operand_dims.iter().enumerate() {
            starts[axis] = vector[k];
        }
        if !resolve_starts(&mut starts, operand_dims, &window, clamp) {
            continue;
        }
        let mut offset = 0usize;
        for (d, &start) in starts.iter().enumerate() {
            offset += start as usize * operand_st[d];
        }
        for (&axis, &update_axis) in window_axes.iter().zip(&dnums.update_window_dims) {
            offset += update_idx[update_axis] * operand_st[axis];
        }
        result[offset] = combine(spec.kind, result[offset], updates.data()[flat], dtype)?;
    }
    build(out, result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use lax_core::primitive::{GatherDimensionNumbers, ScatterDimensionNumbers, UnaryOp};
    use lax_core::Shape;

    fn f32s(data: &[f32], dims: &[usize]) -> Array {
        Array::from_f32(data, &Shape::new(dims.to_vec())).unwrap()
    }

    fn i32s(data: &[i32], dims: &[usize]) -> Array {
        Array::from_i32(data, &Shape::new(dims.to_vec())).unwrap()
    }

    fn point_gather() -> GatherSpec {
        GatherSpec::new(
            GatherDimensionNumbers {
                offset_dims: vec![],
                collapsed_slice_dims: vec![0],
                start_index_map: vec![0],
            },
            vec![1],
        )
    }

    fn point_scatter(kind: ScatterKind) -> ScatterSpec {
        ScatterSpec::new(
            kind,
            ScatterDimensionNumbers {
                update_window_dims: vec![],
                inserted_window_dims: vec![0],
                scatter_dims_to_operand_dims: vec![0],
            },
        )
    }

    #[test]
    fn test_gather_points() {
        let x = f32s(&[10.0, 20.0, 30.0, 40.0], &[4]);
        let idx = i32s(&[0, 2], &[2, 1]);
        let out = ShapedArray::new(vec![2], DType::F32);
        let r = gather(&x, &idx, &point_gather(), &out).unwrap();
        assert_eq!(r.to_vec_f32(), vec![10.0, 30.0]);
    }

    #[test]
    fn test_gather_clip_and_fill() {
        let x = f32s(&[10.0, 20.0, 30.0, 40.0], &[4]);
        let idx = i32s(&[-1, 7], &[2, 1]);
        let out = ShapedArray::new(vec![2], DType::F32);
        let clipped = gather(&x, &idx, &point_gather(), &out).unwrap();
        assert_eq!(clipped.to_vec_f32(), vec![10.0, 40.0]);

        let spec = point_gather().with_mode(GatherScatterMode::FillOrDrop);
        let filled = gather(&x, &idx, &spec, &out).unwrap();
        assert!(filled.to_vec_f32().iter().all(|v| v.is_nan()));

        let spec = spec.with_fill_value(Scalar::Float(-1.0));
        let filled = gather(&x, &idx, &spec, &out).unwrap();
        assert_eq!(filled.to_vec_f32(), vec![-1.0, -1.0]);
    }

    #[test]
    fn test_gather_row_slices() {
        // take rows 2 and 0 of a 3x2 matrix
        let x = f32s(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0], &[3, 2]);
        let idx = i32s(&[2, 0], &[2, 1]);
        let spec = GatherSpec::new(
            GatherDimensionNumbers {
                offset_dims: vec![1],
                collapsed_slice_dims: vec![0],
                start_index_map: vec![0],
            },
            vec![1, 2],
        );
        let out = ShapedArray::new(vec![2, 2], DType::F32);
        let r = gather(&x, &idx, &spec, &out).unwrap();
        assert_eq!(r.to_vec_f32(), vec![5.0, 6.0, 1.0, 2.0]);
    }

    #[test]
    fn test_default_fill_values() {
        assert_eq!(default_fill_value(DType::I8), Scalar::Int(-128));
        assert_eq!(default_fill_value(DType::U16), Scalar::UInt(65535));
        assert_eq!(default_fill_value(DType::Bool), Scalar::Bool(true));
        assert!(default_fill_value(DType::F32).is_nan());
    }

    #[test]
    fn test_scatter_add_duplicates() {
        let x = f32s(&[0.0; 4], &[4]);
        let idx = i32s(&[1, 1, 3], &[3, 1]);
        let upd = f32s(&[1.0, 2.0, 5.0], &[3]);
        let out = x.aval();
        let r = scatter(&x, &idx, &upd, &point_scatter(ScatterKind::Add), GatherScatterMode::FillOrDrop, &out)
            .unwrap();
        assert_eq!(r.to_vec_f32(), vec![0.0, 3.0, 0.0, 5.0]);
    }

    #[test]
    fn test_scatter_replace_last_wins() {
        let x = f32s(&[0.0; 3], &[3]);
        let idx = i32s(&[0, 0], &[2, 1]);
        let upd = f32s(&[1.0, 2.0], &[2]);
        let r = scatter(
            &x,
            &idx,
            &upd,
            &point_scatter(ScatterKind::Replace),
            GatherScatterMode::FillOrDrop,
            &x.aval(),
        )
        .unwrap();
        assert_eq!(r.to_vec_f32(), vec![2.0, 0.0, 0.0]);
    }

    #[test]
    fn test_scatter_drop_vs_clip() {
        let x = f32s(&[0.0; 3], &[3]);
        let idx = i32s(&[5], &[1, 1]);
        let upd = f32s(&[9.0], &[1]);
        let spec = point_scatter(ScatterKind::Replace);
        let dropped = scatter(&x, &idx, &upd, &spec, GatherScatterMode::FillOrDrop, &x.aval()).unwrap();
        assert_eq!(dropped.to_vec_f32(), vec![0.0, 0.0, 0.0]);
        let clipped = scatter(&x, &idx, &upd, &spec, GatherScatterMode::Clip, &x.aval()).unwrap();
        assert_eq!(clipped.to_vec_f32(), vec![0.0, 0.0, 9.0]);
    }

    #[test]
    fn test_scatter_window_dropped_whole() {
        // a 2-wide window starting at 2 of a length-3 operand is out of bounds
        let x = f32s(&[0.0; 3], &[3]);
        let idx = i32s(&[2], &[1, 1]);
        let upd = f32s(&[1.0, 1.0], &[1, 2]);
        let spec = ScatterSpec::new(
            ScatterKind::Add,
            ScatterDimensionNumbers {
                update_window_dims: vec![1],
                inserted_window_dims: vec![],
                scatter_dims_to_operand_dims: vec![0],
            },
        );
        let r = scatter(&x, &idx, &upd, &spec, GatherScatterMode::FillOrDrop, &x.aval()).unwrap();
        assert_eq!(r.to_vec_f32(), vec![0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_scatter_apply() {
        let x = f32s(&[1.0, 4.0, 9.0], &[3]);
        let idx = i32s(&[1], &[1, 1]);
        let upd = f32s(&[0.0], &[1]);
        let spec = point_scatter(ScatterKind::Apply(UnaryOp::Sqrt));
        let r = scatter(&x, &idx, &upd, &spec, GatherScatterMode::FillOrDrop, &x.aval()).unwrap();
        assert_eq!(r.to_vec_f32(), vec![1.0, 2.0, 9.0]);
    }

    #[test]
    fn test_scatter_min_max() {
        let x = i32s(&[5, 5], &[2]);
        let idx = i32s(&[0, 1], &[2, 1]);
        let upd = i32s(&[3, 8], &[2]);
        let mode = GatherScatterMode::FillOrDrop;
        let lo = scatter(&x, &idx, &upd, &point_scatter(ScatterKind::Min), mode, &x.aval()).unwrap();
        assert_eq!(lo.to_vec_i64(), vec![3, 5]);
        let hi = scatter(&x, &idx, &upd, &point_scatter(ScatterKind::Max), mode, &x.aval()).unwrap();
        assert_eq!(hi.to_vec_i64(), vec![5, 8]);
    }
}
