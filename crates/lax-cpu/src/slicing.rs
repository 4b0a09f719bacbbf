//! Data-movement executors: pad, slices, broadcasting and layout changes.
//!
//! None of these compute on element values; they only route them, so every
//! executor is a gather from an output multi-index to an input offset.

use rayon::prelude::*;

use lax_core::{Array, LaxError, Result, Scalar, ShapedArray};

use crate::index::{IndexIter, build, ravel, strides, unravel};

/// Map every output element through `source`, which returns the input flat
/// offset or `None` for a fill position.
fn route<F>(x: &Array, out: &ShapedArray, fill: Scalar, source: F) -> Result<Array>
where
    F: Fn(&[usize]) -> Option<usize> + Sync,
{
    let out_dims = out.shape.dims().to_vec();
    let data = (0..out.shape.numel())
        .into_par_iter()
        .map(|flat| {
            let idx = unravel(flat, &out_dims);
            source(&idx).map_or(fill, |off| x.data()[off])
        })
        .collect();
    build(out, data)
}

// ── pad ─────────────────────────────────────────────────────────────────────

/// `(low, high, interior)` per axis; negative low/high trim.
pub fn pad(x: &Array, padding_value: &Array, config: &[(i64, i64, i64)], out: &ShapedArray) -> Result<Array> {
    let fill = padding_value.item()?.cast(out.dtype);
    let in_dims = x.shape().dims();
    let st = strides(in_dims);
    route(x, out, fill, |idx| {
        let mut off = 0;
        for (axis, &o) in idx.iter().enumerate() {
            let (lo, _, interior) = config[axis];
            let p = o as i64 - lo;
            let step = interior + 1;
            if p < 0 || p % step != 0 || p / step >= in_dims[axis] as i64 {
                return None;
            }
            off += (p / step) as usize * st[axis];
        }
        Some(off)
    })
}

// ── slices ──────────────────────────────────────────────────────────────────

pub fn slice(x: &Array, start: &[usize], slice_strides: Option<&[usize]>, out: &ShapedArray) -> Result<Array> {
    let st = strides(x.shape().dims());
    route(x, out, Scalar::zero(out.dtype), |idx| {
        let mut off = 0;
        for (axis, &o) in idx.iter().enumerate() {
            let step = slice_strides.map_or(1, |s| s[axis]);
            off += (start[axis] + o * step) * st[axis];
        }
        Some(off)
    })
}

/// Read rank-0 start indices and clamp each so a window of `sizes` fits.
fn clamped_starts(starts: &[&Array], dims: &[usize], sizes: &[usize]) -> Result<Vec<usize>> {
    if starts.len() != dims.len() {
        return Err(LaxError::InvalidArgument(format!(
            "expected {} start indices, got {}",
            dims.len(),
            starts.len()
        )));
    }
    starts
        .iter()
        .zip(dims.iter().zip(sizes))
        .map(|(s, (&dim, &size))| {
            let max_start = dim.saturating_sub(size) as i64;
            Ok(s.item()?.as_index().clamp(0, max_start) as usize)
        })
        .collect()
}

/// Start indices are clamped so the slice stays in bounds.
pub fn dynamic_slice(x: &Array, starts: &[&Array], sizes: &[usize], out: &ShapedArray) -> Result<Array> {
    let begin = clamped_starts(starts, x.shape().dims(), sizes)?;
    let st = strides(x.shape().dims());
    route(x, out, Scalar::zero(out.dtype), |idx| {
        Some(idx.iter().zip(&begin).zip(&st).map(|((o, b), s)| (o + b) * s).sum())
    })
}

pub fn dynamic_update_slice(x: &Array, update: &Array, starts: &[&Array], out: &ShapedArray) -> Result<Array> {
    let dims = x.shape().dims();
    let update_dims = update.shape().dims();
    let begin = clamped_starts(starts, dims, update_dims)?;
    let st = strides(dims);
    let mut data = x.data().to_vec();
    for (flat, idx) in IndexIter::new(update_dims).enumerate() {
        let off: usize = idx.iter().zip(&begin).zip(&st).map(|((i, b), s)| (i + b) * s).sum();
        data[off] = update.data()[flat];
    }
    build(out, data)
}

// ── broadcasting and layout ─────────────────────────────────────────────────

pub fn broadcast_in_dim(x: &Array, broadcast_dimensions: &[usize], out: &ShapedArray) -> Result<Array> {
    let in_dims = x.shape().dims();
    let st = strides(in_dims);
    route(x, out, Scalar::zero(out.dtype), |idx| {
        let mut off = 0;
        for (k, &axis) in broadcast_dimensions.iter().enumerate() {
            if in_dims[k] != 1 {
                off += idx[axis] * st[k];
            }
        }
        Some(off)
    })
}

pub fn transpose(x: &Array, permutation: &[usize], out: &ShapedArray) -> Result<Array> {
    let st = strides(x.shape().dims());
    route(x, out, Scalar::zero(out.dtype), |idx| {
        Some(permutation.iter().enumerate().map(|(o, &axis)| idx[o] * st[axis]).sum())
    })
}

/// Reshape, squeeze and expand_dims keep row-major element order.
pub fn relayout(x: &Array, out: &ShapedArray) -> Result<Array> {
    build(out, x.data().to_vec())
}

pub fn rev(x: &Array, dimensions: &[usize], out: &ShapedArray) -> Result<Array> {
    let dims = x.shape().dims();
    let st = strides(dims);
    route(x, out, Scalar::zero(out.dtype), |idx| {
        let flipped: Vec<usize> = idx
            .iter()
            .enumerate()
            .map(|(axis, &i)| if dimensions.contains(&axis) { dims[axis] - 1 - i } else { i })
            .collect();
        Some(ravel(&flipped, &st))
    })
}

pub fn concatenate(operands: &[&Array], dimension: usize, out: &ShapedArray) -> Result<Array> {
    let out_dims = out.shape.dims().to_vec();
    // Offset of each operand along the concatenation axis.
    let mut bounds = Vec::with_capacity(operands.len());
    let mut acc = 0;
    for a in operands {
        bounds.push(acc);
        acc += a.shape().dims()[dimension];
    }
    let operand_strides: Vec<Vec<usize>> = operands.iter().map(|a| strides(a.shape().dims())).collect();
    let data = (0..out.shape.numel())
        .into_par_iter()
        .map(|flat| {
            let mut idx = unravel(flat, &out_dims);
            let which = bounds.partition_point(|&b| b <= idx[dimension]) - 1;
            idx[dimension] -= bounds[which];
            operands[which].data()[ravel(&idx, &operand_strides[which])]
        })
        .collect();
    build(out, data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use lax_core::{DType, Shape};

    fn f32s(data: &[f32], dims: &[usize]) -> Array {
        Array::from_f32(data, &Shape::new(dims.to_vec())).unwrap()
    }

    fn zero() -> Array {
        Array::scalar(0.0, DType::F32)
    }

    #[test]
    fn test_pad_low_high_interior() {
        let x = f32s(&[1.0, 2.0, 3.0], &[3]);
        let out = ShapedArray::new(vec![8], DType::F32);
        let r = pad(&x, &zero(), &[(1, 2, 1)], &out).unwrap();
        assert_eq!(r.to_vec_f32(), vec![0.0, 1.0, 0.0, 2.0, 0.0, 3.0, 0.0, 0.0]);
    }

    #[test]
    fn test_pad_negative_trims() {
        let x = f32s(&[1.0, 2.0, 3.0, 4.0], &[4]);
        let out = ShapedArray::new(vec![2], DType::F32);
        let r = pad(&x, &zero(), &[(-1, -1, 0)], &out).unwrap();
        assert_eq!(r.to_vec_f32(), vec![2.0, 3.0]);
        let out = ShapedArray::new(vec![0], DType::F32);
        let r = pad(&x, &zero(), &[(-2, -2, 0)], &out).unwrap();
        assert_eq!(r.numel(), 0);
    }

    #[test]
    fn test_slice_strided() {
        let x = f32s(&[0.0, 1.0, 2.0, 3.0, 4.0, 5.0], &[6]);
        let out = ShapedArray::new(vec![3], DType::F32);
        let r = slice(&x, &[1], Some(&[2]), &out).unwrap();
        assert_eq!(r.to_vec_f32(), vec![1.0, 3.0, 5.0]);
    }

    #[test]
    fn test_dynamic_slice_clamps() {
        let x = f32s(&[0.0, 1.0, 2.0, 3.0, 4.0], &[5]);
        let start = Array::scalar(4i64, DType::I32);
        let out = ShapedArray::new(vec![2], DType::F32);
        let r = dynamic_slice(&x, &[&start], &[2], &out).unwrap();
        assert_eq!(r.to_vec_f32(), vec![3.0, 4.0]);
        let start = Array::scalar(-3i64, DType::I32);
        let r = dynamic_slice(&x, &[&start], &[2], &out).unwrap();
        assert_eq!(r.to_vec_f32(), vec![0.0, 1.0]);
    }

    #[test]
    fn test_dynamic_update_slice() {
        let x = f32s(&[0.0; 6], &[2, 3]);
        let upd = f32s(&[7.0, 8.0], &[1, 2]);
        let i = Array::scalar(1i64, DType::I32);
        let j = Array::scalar(5i64, DType::I32);
        let r = dynamic_update_slice(&x, &upd, &[&i, &j], &x.aval()).unwrap();
        assert_eq!(r.to_vec_f32(), vec![0.0, 0.0, 0.0, 0.0, 7.0, 8.0]);
    }

    #[test]
    fn test_broadcast_in_dim() {
        let x = f32s(&[1.0, 2.0], &[2]);
        let out = ShapedArray::new(vec![2, 3], DType::F32);
        let r = broadcast_in_dim(&x, &[0], &out).unwrap();
        assert_eq!(r.to_vec_f32(), vec![1.0, 1.0, 1.0, 2.0, 2.0, 2.0]);
        let x = f32s(&[5.0], &[1]);
        let r = broadcast_in_dim(&x, &[1], &out).unwrap();
        assert_eq!(r.to_vec_f32(), vec![5.0; 6]);
    }

    #[test]
    fn test_transpose_and_rev() {
        let x = f32s(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0], &[2, 3]);
        let out = ShapedArray::new(vec![3, 2], DType::F32);
        let t = transpose(&x, &[1, 0], &out).unwrap();
        assert_eq!(t.to_vec_f32(), vec![1.0, 4.0, 2.0, 5.0, 3.0, 6.0]);
        let r = rev(&x, &[1], &x.aval()).unwrap();
        assert_eq!(r.to_vec_f32(), vec![3.0, 2.0, 1.0, 6.0, 5.0, 4.0]);
    }

    #[test]
    fn test_concatenate() {
        let a = f32s(&[1.0, 2.0], &[1, 2]);
        let b = f32s(&[3.0, 4.0, 5.0, 6.0], &[2, 2]);
        let out = ShapedArray::new(vec![3, 2], DType::F32);
        let r = concatenate(&[&a, &b], 0, &out).unwrap();
        assert_eq!(r.to_vec_f32(), vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        let c = f32s(&[9.0], &[1, 1]);
        let out = ShapedArray::new(vec![1, 3], DType::F32);
        let r = concatenate(&[&a, &c], 1, &out).unwrap();
        assert_eq!(r.to_vec_f32(), vec![1.0, 2.0, 9.0]);
    }
}
