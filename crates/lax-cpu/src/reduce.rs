//! Reductions: reduce, argmax/argmin, cumulative scans and reduce_window.
//!
//! Every fold is sequential in row-major order over the reduced (or window)
//! coordinates, starting from the init value, so results are deterministic.
//! Output positions are computed in parallel.

use rayon::prelude::*;

use lax_core::primitive::{Computation, Monoid, WindowSpec};
use lax_core::{Array, DType, LaxError, Result, Scalar, ShapedArray};
use lax_ops::reduce_window_shape;

use crate::elementwise::binary_scalar;
use crate::index::{IndexIter, build, strides, unravel};

/// One fold step over tuples: `acc <- computation(acc, x)`.
fn fold_step(computation: &Computation, acc: &[Scalar], x: &[Scalar], dtypes: &[DType]) -> Result<Vec<Scalar>> {
    match computation {
        Computation::Monoid(m) => acc
            .iter()
            .zip(x)
            .zip(dtypes)
            .map(|((&a, &b), &dt)| Ok(binary_scalar(m.binary_op(), a, b, dt)?.cast(dt)))
            .collect(),
        Computation::Custom(reducer) => {
            let out = reducer.apply(acc, x);
            if out.len() != acc.len() {
                return Err(LaxError::InvalidArgument(format!(
                    "reducer {} returned {} values for {} operands",
                    reducer.name(),
                    out.len(),
                    acc.len()
                )));
            }
            Ok(out.iter().zip(dtypes).map(|(v, &dt)| v.cast(dt)).collect())
        }
    }
}

fn init_values(inits: &[&Array], dtypes: &[DType]) -> Result<Vec<Scalar>> {
    inits
        .iter()
        .zip(dtypes)
        .map(|(a, &dt)| Ok(a.item()?.cast(dt)))
        .collect()
}

/// Split `outputs` into per-operand columns.
fn transpose_results(rows: Vec<Vec<Scalar>>, n: usize) -> Vec<Vec<Scalar>> {
    let mut cols: Vec<Vec<Scalar>> = (0..n).map(|_| Vec::with_capacity(rows.len())).collect();
    for row in rows {
        for (col, v) in cols.iter_mut().zip(row) {
            col.push(v);
        }
    }
    cols
}

// ── reduce ──────────────────────────────────────────────────────────────────

pub fn reduce(
    computation: &Computation,
    axes: &[usize],
    operands: &[&Array],
    inits: &[&Array],
    outputs: &[ShapedArray],
) -> Result<Vec<Array>> {
    let Some(first) = operands.first() else {
        return Err(LaxError::InvalidArgument("reduce requires at least one operand".into()));
    };
    let dims = first.shape().dims().to_vec();
    let st = strides(&dims);
    let dtypes: Vec<DType> = operands.iter().map(|a| a.dtype()).collect();
    let init = init_values(inits, &dtypes)?;

    let kept: Vec<usize> = (0..dims.len()).filter(|a| !axes.contains(a)).collect();
    let kept_dims: Vec<usize> = kept.iter().map(|&a| dims[a]).collect();
    let reduced_dims: Vec<usize> = axes.iter().map(|&a| dims[a]).collect();
    let n_out: usize = kept_dims.iter().product();

    let rows = (0..n_out)
        .into_par_iter()
        .map(|flat| {
            let out_idx = unravel(flat, &kept_dims);
            let mut full = vec![0usize; dims.len()];
            for (&axis, &i) in kept.iter().zip(&out_idx) {
                full[axis] = i;
            }
            let mut acc = init.clone();
            for r in IndexIter::new(&reduced_dims) {
                for (&axis, &i) in axes.iter().zip(&r) {
                    full[axis] = i;
                }
                let offset: usize = full.iter().zip(&st).map(|(i, s)| i * s).sum();
                let x: Vec<Scalar> = operands.iter().map(|a| a.data()[offset]).collect();
                acc = fold_step(computation, &acc, &x, &dtypes)?;
            }
            Ok(acc)
        })
        .collect::<Result<Vec<_>>>()?;

    transpose_results(rows, operands.len())
        .into_iter()
        .zip(outputs)
        .map(|(data, aval)| build(aval, data))
        .collect()
}

pub fn reduce_monoid(monoid: Monoid, axes: &[usize], x: &Array, out: &ShapedArray) -> Result<Array> {
    let identity = monoid_identity(monoid, x.dtype())?;
    let init = Array::scalar(identity, x.dtype());
    let mut results = reduce(
        &Computation::Monoid(monoid),
        axes,
        &[x],
        &[&init],
        std::slice::from_ref(out),
    )?;
    results
        .pop()
        .ok_or_else(|| LaxError::InvalidArgument("reduce produced no output".into()))
}

fn monoid_identity(monoid: Monoid, dtype: DType) -> Result<Scalar> {
    monoid.identity(dtype).ok_or_else(|| {
        LaxError::dtype_error(format!(
            "reduce_{} does not accept dtype {dtype}.",
            monoid.name()
        ))
    })
}

// ── argmax / argmin ─────────────────────────────────────────────────────────

/// Index of the first maximum (or minimum) along `axis`. NaN wins.
pub fn arg_reduce(is_max: bool, axis: usize, x: &Array, out: &ShapedArray) -> Result<Array> {
    let dims = x.shape().dims();
    let st = strides(dims);
    let len = dims[axis];
    let mut lane_dims = dims.to_vec();
    lane_dims.remove(axis);
    let n_out: usize = lane_dims.iter().product();

    let data: Vec<Scalar> = (0..n_out)
        .into_par_iter()
        .map(|flat| {
            let mut idx = unravel(flat, &lane_dims);
            idx.insert(axis, 0);
            let base: usize = idx.iter().zip(&st).map(|(i, s)| i * s).sum();
            let mut best = 0usize;
            let mut best_v = x.data()[base];
            for j in 1..len {
                if best_v.is_nan() {
                    break;
                }
                let v = x.data()[base + j * st[axis]];
                let better = v.is_nan() || {
                    let ord = v.total_cmp(&best_v);
                    if is_max { ord.is_gt() } else { ord.is_lt() }
                };
                if better {
                    best = j;
                    best_v = v;
                }
            }
            Scalar::UInt(best as u64)
        })
        .collect();
    build(out, data)
}

// ── cumulative ──────────────────────────────────────────────────────────────

/// Inclusive scan along `axis`, optionally from the end.
pub fn cumulative(monoid: Monoid, axis: usize, reverse: bool, x: &Array, out: &ShapedArray) -> Result<Array> {
    let dtype = x.dtype();
    let identity = monoid_identity(monoid, dtype)?;
    let dims = x.shape().dims();
    let st = strides(dims);
    let len = dims[axis];
    let mut lane_dims = dims.to_vec();
    lane_dims.remove(axis);
    let n_lanes: usize = lane_dims.iter().product();

    let mut data = x.data().to_vec();
    let lanes = (0..n_lanes)
        .into_par_iter()
        .map(|flat| {
            let mut idx = unravel(flat, &lane_dims);
            idx.insert(axis, 0);
            let base: usize = idx.iter().zip(&st).map(|(i, s)| i * s).sum();
            let order: Vec<usize> = if reverse { (0..len).rev().collect() } else { (0..len).collect() };
            let mut acc = identity;
            let mut lane = Vec::with_capacity(len);
            for j in order {
                let offset = base + j * st[axis];
                acc = binary_scalar(monoid.binary_op(), acc, x.data()[offset], dtype)?.cast(dtype);
                lane.push((offset, acc));
            }
            Ok(lane)
        })
        .collect::<Result<Vec<_>>>()?;
    for (offset, v) in lanes.into_iter().flatten() {
        data[offset] = v;
    }
    build(out, data)
}

// ── reduce_window ───────────────────────────────────────────────────────────

/// Windowed reduction over one or more operands sharing window coordinates.
///
/// Positions that fall in padding or in base-dilation holes contribute the
/// init value, matching a reduction over the padded, dilated operand.
pub fn reduce_window(
    computation: &Computation,
    window: &WindowSpec,
    operands: &[&Array],
    inits: &[&Array],
    outputs: &[ShapedArray],
) -> Result<Vec<Array>> {
    let Some(first) = operands.first() else {
        return Err(LaxError::InvalidArgument("reduce_window requires at least one operand".into()));
    };
    let (out_shape, pads) = reduce_window_shape(first.shape(), window)?;
    let dims = first.shape().dims().to_vec();
    let st = strides(&dims);
    let dtypes: Vec<DType> = operands.iter().map(|a| a.dtype()).collect();
    let init = init_values(inits, &dtypes)?;
    let out_dims = out_shape.dims().to_vec();

    let rows = (0..out_shape.numel())
        .into_par_iter()
        .map(|flat| {
            let out_idx = unravel(flat, &out_dims);
            let mut acc = init.clone();
            for w in IndexIter::new(&window.window_dimensions) {
                let mut offset = 0usize;
                let mut inside = true;
                for axis in 0..dims.len() {
                    let pos = (out_idx[axis] * window.window_strides[axis]) as i64
                        + (w[axis] * window.window_dilation[axis]) as i64
                        - pads[axis].0;
                    let base = window.base_dilation[axis] as i64;
                    if pos < 0 || pos % base != 0 || pos / base >= dims[axis] as i64 {
                        inside = false;
                        break;
                    }
                    offset += (pos / base) as usize * st[axis];
                }
                if !inside {
                    acc = fold_step(computation, &acc, &init, &dtypes)?;
                    continue;
                }
                let x: Vec<Scalar> = operands.iter().map(|a| a.data()[offset]).collect();
                acc = fold_step(computation, &acc, &x, &dtypes)?;
            }
            Ok(acc)
        })
        .collect::<Result<Vec<_>>>()?;

    transpose_results(rows, operands.len())
        .into_iter()
        .zip(outputs)
        .map(|(data, aval)| build(aval, data))
        .collect()
}

pub fn reduce_window_monoid(monoid: Monoid, window: &WindowSpec, x: &Array, out: &ShapedArray) -> Result<Array> {
    let identity = monoid_identity(monoid, x.dtype())?;
    let init = Array::scalar(identity, x.dtype());
    let mut results = reduce_window(
        &Computation::Monoid(monoid),
        window,
        &[x],
        &[&init],
        std::slice::from_ref(out),
    )?;
    results
        .pop()
        .ok_or_else(|| LaxError::InvalidArgument("reduce_window produced no output".into()))
}
