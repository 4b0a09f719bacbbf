//! Sorting executors: multi-operand `sort` and `top_k`.
//!
//! Comparison uses [`Scalar::total_cmp`]: NaNs sort after every other value
//! and `-0.0 == 0.0`. Both sorts are stable.

use std::cmp::Ordering;

use rayon::prelude::*;

use lax_core::{Array, Result, Scalar, ShapedArray};

use crate::index::{build, require_output, strides, unravel};

/// Flat offsets of every lane along `axis`, one `Vec` per lane.
fn lanes(dims: &[usize], axis: usize) -> Vec<Vec<usize>> {
    let st = strides(dims);
    let len = dims[axis];
    let mut outer_dims = dims.to_vec();
    outer_dims[axis] = 1;
    let count: usize = outer_dims.iter().product();
    (0..count)
        .map(|lane| {
            let base: usize = unravel(lane, &outer_dims)
                .iter()
                .zip(&st)
                .map(|(i, s)| i * s)
                .sum();
            (0..len).map(|j| base + j * st[axis]).collect()
        })
        .collect()
}

/// Sort all `operands` along `axis`, ordering lexicographically by the first
/// `num_keys` operands. Ties keep their original order.
pub fn sort(axis: usize, num_keys: usize, operands: &[&Array], outputs: &[ShapedArray]) -> Result<Vec<Array>> {
    let Some(first) = operands.first() else {
        return Ok(Vec::new());
    };
    let dims = first.shape().dims();
    if dims.is_empty() || dims[axis] == 0 {
        return operands
            .iter()
            .zip(outputs)
            .map(|(a, out)| build(out, a.data().to_vec()))
            .collect();
    }

    let lane_list = lanes(dims, axis);
    let permutations: Vec<Vec<usize>> = lane_list
        .par_iter()
        .map(|lane| {
            let mut order: Vec<usize> = (0..lane.len()).collect();
            order.sort_by(|&a, &b| {
                operands[..num_keys]
                    .iter()
                    .map(|key| key.data()[lane[a]].total_cmp(&key.data()[lane[b]]))
                    .find(|o| *o != Ordering::Equal)
                    .unwrap_or(Ordering::Equal)
            });
            order
        })
        .collect();

    let mut data: Vec<Vec<Scalar>> = operands.iter().map(|a| a.data().to_vec()).collect();
    for (values, src) in data.iter_mut().zip(operands) {
        for (lane, order) in lane_list.iter().zip(&permutations) {
            for (dst, &from) in lane.iter().zip(order) {
                values[*dst] = src.data()[lane[from]];
            }
        }
    }
    data.into_iter()
        .zip(outputs)
        .map(|(values, out)| build(out, values))
        .collect()
}

/// Largest `k` entries along the last axis, descending, with their int32
/// indices. Equal values keep the lower index first; NaN ranks highest.
pub fn top_k(k: usize, x: &Array, outputs: &[ShapedArray]) -> Result<Vec<Array>> {
    let dims = x.shape().dims();
    let axis = dims.len() - 1;
    let lane_list = lanes(dims, axis);
    let picked: Vec<(Vec<Scalar>, Vec<Scalar>)> = lane_list
        .par_iter()
        .map(|lane| {
            let mut order: Vec<usize> = (0..lane.len()).collect();
            order.sort_by(|&a, &b| x.data()[lane[b]].total_cmp(&x.data()[lane[a]]));
            order.truncate(k);
            let values = order.iter().map(|&j| x.data()[lane[j]]).collect();
            let indices = order.iter().map(|&j| Scalar::Int(j as i64)).collect();
            (values, indices)
        })
        .collect();
    let (values, indices): (Vec<Vec<Scalar>>, Vec<Vec<Scalar>>) = picked.into_iter().unzip();
    let values_out = require_output(outputs, 0)?;
    let indices_out = require_output(outputs, 1)?;
    Ok(vec![
        build(values_out, values.concat())?,
        build(indices_out, indices.concat())?,
    ])
}
