//! Inference rules for data-movement primitives: sort, top_k, pad, slicing,
//! dynamic slicing and the layout ops.

use lax_core::{DType, DTypeKind, LaxError, Result, Shape, ShapedArray};

use crate::broadcast::format_dims;
use crate::dimension_numbers::check_permutation;
use crate::dtype_promotion::{ElemType, check_accepted, promote_all};
use crate::shape_inference::{resolve_axis, same_type};

// ── Sorting ─────────────────────────────────────────────────────────────────

pub fn sort(dimension: i64, num_keys: usize, inputs: &[ShapedArray]) -> Result<Vec<ShapedArray>> {
    let Some(first) = inputs.first() else {
        return Err(LaxError::InvalidArgument("sort requires at least one operand".into()));
    };
    if let Some(bad) = inputs.iter().find(|o| o.shape != first.shape) {
        return Err(LaxError::type_error(format!(
            "sort operands must have the same shape, got {} and {}.",
            first.shape.tuple_str(),
            bad.shape.tuple_str()
        )));
    }
    if num_keys < 1 || num_keys > inputs.len() {
        return Err(LaxError::value_error(format!(
            "num_keys must be at least 1 and at most the number of operands, got num_keys={num_keys} for {} operands.",
            inputs.len()
        )));
    }
    resolve_axis(dimension, first.ndim(), "sort")?;
    Ok(inputs.to_vec())
}

pub fn top_k(k: i64, x: &ShapedArray) -> Result<Vec<ShapedArray>> {
    if x.ndim() == 0 {
        return Err(LaxError::type_error(format!(
            "top_k operand must have >= 1 dimension, got {}",
            x.shape.tuple_str()
        )));
    }
    check_accepted("top_k", x.dtype, &[DTypeKind::Unsigned, DTypeKind::Signed, DTypeKind::Float])?;
    if k < 0 {
        return Err(LaxError::value_error(format!(
            "k argument to top_k must be nonnegative, got {k}"
        )));
    }
    let minor = x.shape.0[x.ndim() - 1];
    if k as usize > minor {
        return Err(LaxError::type_error(format!(
            "k argument to top_k must be no larger than minor dimension; {k} vs {}",
            x.shape.tuple_str()
        )));
    }
    let mut dims = x.shape.0.clone();
    let last = dims.len() - 1;
    dims[last] = k as usize;
    Ok(vec![
        same_type(x, Shape::new(dims.clone())),
        ShapedArray::new(dims, DType::I32),
    ])
}

// ── Padding and slicing ─────────────────────────────────────────────────────

fn format_padding_config(config: &[(i64, i64, i64)]) -> String {
    let parts: Vec<String> = config
        .iter()
        .map(|(lo, hi, interior)| format!("({lo}, {hi}, {interior})"))
        .collect();
    format!("[{}]", parts.join(", "))
}

/// Size of one axis after `(low, high, interior)` padding; may be negative.
pub fn padded_dim(d: usize, (lo, hi, interior): (i64, i64, i64)) -> i64 {
    let d = d as i64;
    lo + hi + d + (d - 1).max(0) * interior
}

pub fn pad(config: &[(i64, i64, i64)], operand: &ShapedArray, padding_value: &ShapedArray) -> Result<ShapedArray> {
    if !padding_value.shape.is_scalar() {
        return Err(LaxError::type_error(format!(
            "pad padding_value must be a scalar, got shape {}.",
            padding_value.shape.tuple_str()
        )));
    }
    if !padding_value.weak_type && padding_value.dtype != operand.dtype {
        return Err(LaxError::dtype_error(format!(
            "pad operand and padding_value must be same dtype: got {} and {}.",
            operand.dtype, padding_value.dtype
        )));
    }
    if config.len() != operand.ndim() {
        return Err(LaxError::value_error(format!(
            "length of padding_config must equal the number of axes of operand, got padding_config {} for operand shape {}",
            format_padding_config(config),
            operand.shape.tuple_str()
        )));
    }
    if config.iter().any(|&(_, _, interior)| interior < 0) {
        return Err(LaxError::value_error(format!(
            "interior padding in padding_config must be nonnegative, got padding_config {}",
            format_padding_config(config)
        )));
    }
    let sizes: Vec<i64> = operand
        .dims()
        .iter()
        .zip(config)
        .map(|(&d, &c)| padded_dim(d, c))
        .collect();
    if sizes.iter().any(|&s| s < 0) {
        let shown: Vec<String> = sizes.iter().map(|s| s.to_string()).collect();
        let shown = if shown.len() == 1 {
            format!("({},)", shown[0])
        } else {
            format!("({})", shown.join(", "))
        };
        return Err(LaxError::value_error(format!(
            "Dimension size after padding is not at least 0, got result shape {shown}, for padding_config {} and operand shape {}",
            format_padding_config(config),
            operand.shape.tuple_str()
        )));
    }
    Ok(same_type(
        operand,
        Shape::new(sizes.into_iter().map(|s| s as usize).collect::<Vec<_>>()),
    ))
}

pub fn slice_shape(
    operand: &Shape,
    start: &[usize],
    limit: &[usize],
    strides: Option<&[usize]>,
) -> Result<Shape> {
    let rank = operand.ndim();
    if start.len() != rank || limit.len() != rank {
        return Err(LaxError::type_error(format!(
            "slice start_indices and limit_indices must have length equal to the number of dimensions of the operand, got start_indices {} and limit_indices {} for operand shape {}.",
            format_dims(start),
            format_dims(limit),
            operand.tuple_str()
        )));
    }
    if limit.iter().zip(operand.dims()).any(|(l, d)| l > d) {
        return Err(LaxError::type_error(format!(
            "slice limit_indices must be less than or equal to operand shape, got limit_indices {} for operand shape {}.",
            format_dims(limit),
            operand.tuple_str()
        )));
    }
    if start.iter().zip(limit).any(|(s, l)| s > l) {
        return Err(LaxError::type_error(format!(
            "slice limit_indices must be greater than or equal to start_indices, got start_indices {} and limit_indices {}.",
            format_dims(start),
            format_dims(limit)
        )));
    }
    let ones = vec![1; rank];
    let strides = strides.unwrap_or(&ones);
    if strides.len() != rank {
        return Err(LaxError::type_error(format!(
            "slice strides must have length equal to the number of dimensions of the operand, got strides {} for operand shape {}.",
            format_dims(strides),
            operand.tuple_str()
        )));
    }
    if strides.contains(&0) {
        return Err(LaxError::type_error(format!(
            "slice strides must be positive, got {}",
            format_dims(strides)
        )));
    }
    Ok(Shape::new(
        start
            .iter()
            .zip(limit)
            .zip(strides)
            .map(|((&s, &l), &st)| (l - s).div_ceil(st))
            .collect::<Vec<_>>(),
    ))
}

fn check_dynamic_indices(op_name: &str, rank: usize, operand_shape: &Shape, indices: &[ShapedArray]) -> Result<()> {
    if indices.len() != rank {
        return Err(LaxError::type_error(format!(
            "{op_name} start_indices must have length equal to the number of dimensions of the operand, got indices {} for operand shape {}.",
            indices.len(),
            operand_shape.tuple_str()
        )));
    }
    if let Some(bad) = indices.iter().find(|i| !i.shape.is_scalar()) {
        return Err(LaxError::type_error(format!(
            "{op_name} start_indices must be scalars, got shape {}.",
            bad.shape.tuple_str()
        )));
    }
    let strong: Vec<DType> = indices.iter().filter(|i| !i.weak_type).map(|i| i.dtype).collect();
    let all_int = indices.iter().all(|i| i.dtype.is_integer());
    if !all_int || strong.windows(2).any(|w| w[0] != w[1]) {
        let names: Vec<String> = indices.iter().map(|i| i.dtype.to_string()).collect();
        return Err(LaxError::dtype_error(format!(
            "index arguments to {op_name} must be integers of the same type, got: {}",
            names.join(", ")
        )));
    }
    Ok(())
}

/// `(operand, start_indices...)`
pub fn dynamic_slice(slice_sizes: &[usize], inputs: &[ShapedArray]) -> Result<ShapedArray> {
    let Some((operand, indices)) = inputs.split_first() else {
        return Err(LaxError::InvalidArgument("dynamic_slice requires an operand".into()));
    };
    check_dynamic_indices("dynamic_slice", operand.ndim(), &operand.shape, indices)?;
    if slice_sizes.len() != operand.ndim() {
        return Err(LaxError::type_error(format!(
            "dynamic_slice slice_sizes must have the same length as the operand rank, got slice_sizes {} for operand shape {}.",
            format_dims(slice_sizes),
            operand.shape.tuple_str()
        )));
    }
    if slice_sizes.iter().zip(operand.dims()).any(|(s, d)| s > d) {
        return Err(LaxError::type_error(format!(
            "slice slice_sizes must be less than or equal to operand shape, got slice_sizes {} for operand shape {}.",
            format_dims(slice_sizes),
            operand.shape.tuple_str()
        )));
    }
    Ok(same_type(operand, Shape::new(slice_sizes.to_vec())))
}

/// `(operand, update, start_indices...)`
pub fn dynamic_update_slice(inputs: &[ShapedArray]) -> Result<ShapedArray> {
    if inputs.len() < 2 {
        return Err(LaxError::InvalidArgument(
            "dynamic_update_slice requires an operand and an update".into(),
        ));
    }
    let (operand, update, indices) = (&inputs[0], &inputs[1], &inputs[2..]);
    if update.ndim() != operand.ndim() {
        return Err(LaxError::type_error(format!(
            "dynamic_update_slice update must have the same rank as operand, got update shape {} for operand shape {}.",
            update.shape.tuple_str(),
            operand.shape.tuple_str()
        )));
    }
    if update.dims().iter().zip(operand.dims()).any(|(u, d)| u > d) {
        return Err(LaxError::type_error(format!(
            "dynamic_update_slice update shape must be smaller than operand shape, got update shape {} for operand shape {}.",
            update.shape.tuple_str(),
            operand.shape.tuple_str()
        )));
    }
    if !update.weak_type && update.dtype != operand.dtype {
        return Err(LaxError::dtype_error(format!(
            "dynamic_update_slice update and operand dtypes must match, got {} and {}.",
            operand.dtype, update.dtype
        )));
    }
    check_dynamic_indices("dynamic_update_slice", operand.ndim(), &operand.shape, indices)?;
    Ok(operand.clone())
}

// ── Layout ──────────────────────────────────────────────────────────────────

pub fn transpose_shape(operand: &Shape, permutation: &[usize]) -> Result<Shape> {
    check_permutation(permutation, operand.ndim(), "transpose", "permutation")?;
    Ok(Shape::new(
        permutation.iter().map(|&p| operand.0[p]).collect::<Vec<_>>(),
    ))
}

pub fn reshape_shape(operand: &Shape, new_sizes: &[usize]) -> Result<Shape> {
    let new_total: usize = new_sizes.iter().product();
    if new_total != operand.numel() {
        return Err(LaxError::type_error(format!(
            "reshape total size must be unchanged, got new_sizes {} (of total size {new_total}) for shape {} (of total size {}).",
            format_dims(new_sizes),
            operand.tuple_str(),
            operand.numel()
        )));
    }
    Ok(Shape::new(new_sizes.to_vec()))
}

pub fn squeeze_shape(operand: &Shape, dimensions: &[usize]) -> Result<Shape> {
    let mut drop = vec![false; operand.ndim()];
    for &d in dimensions {
        if d >= operand.ndim() || drop[d] || operand.0[d] != 1 {
            return Err(LaxError::value_error(format!(
                "cannot select an axis to squeeze out which has size not equal to one, got shape={} and dimensions={}",
                operand.tuple_str(),
                format_dims(dimensions)
            )));
        }
        drop[d] = true;
    }
    Ok(Shape::new(
        operand
            .dims()
            .iter()
            .zip(&drop)
            .filter(|(_, dropped)| !**dropped)
            .map(|(&d, _)| d)
            .collect::<Vec<_>>(),
    ))
}

pub fn expand_dims_shape(operand: &Shape, dimensions: &[usize]) -> Result<Shape> {
    let out_rank = operand.ndim() + dimensions.len();
    let mut inserted = vec![false; out_rank];
    for &d in dimensions {
        if d >= out_rank || inserted[d] {
            return Err(LaxError::value_error(format!(
                "expand_dims dimensions must be unique and less than {out_rank}, got {}",
                format_dims(dimensions)
            )));
        }
        inserted[d] = true;
    }
    let mut rest = operand.dims().iter();
    Ok(Shape::new(
        inserted
            .iter()
            .map(|&ins| if ins { 1 } else { rest.next().copied().unwrap_or(1) })
            .collect::<Vec<_>>(),
    ))
}

pub fn check_rev(operand: &Shape, dimensions: &[usize]) -> Result<()> {
    let mut seen = vec![false; operand.ndim()];
    for &d in dimensions {
        if d >= operand.ndim() {
            return Err(LaxError::value_error(format!(
                "rev dimensions {} out of bounds for operand of shape {}",
                format_dims(dimensions),
                operand.tuple_str()
            )));
        }
        if seen[d] {
            return Err(LaxError::value_error(format!(
                "rev dimensions must be unique, got {}",
                format_dims(dimensions)
            )));
        }
        seen[d] = true;
    }
    Ok(())
}

pub fn concatenate(dimension: usize, inputs: &[ShapedArray]) -> Result<ShapedArray> {
    let Some(first) = inputs.first() else {
        return Err(LaxError::value_error("concatenate requires at least one operand"));
    };
    let rank = first.ndim();
    if dimension >= rank {
        return Err(LaxError::type_error(format!(
            "concatenate dimension out of bounds: dimension {dimension} for shapes {}.",
            first.shape.tuple_str()
        )));
    }
    let mut out = first.shape.0.clone();
    for x in &inputs[1..] {
        let compatible = x.ndim() == rank
            && (0..rank).all(|i| i == dimension || x.shape.0[i] == first.shape.0[i]);
        if !compatible {
            let shapes: Vec<String> = inputs.iter().map(|i| i.shape.tuple_str()).collect();
            return Err(LaxError::type_error(format!(
                "Cannot concatenate arrays with shapes that differ in dimensions other than the one being concatenated: concatenating along dimension {dimension} for shapes {}.",
                shapes.join(", ")
            )));
        }
        out[dimension] += x.shape.0[dimension];
    }
    let strong: Vec<DType> = inputs.iter().filter(|i| !i.weak_type).map(|i| i.dtype).collect();
    if strong.windows(2).any(|w| w[0] != w[1]) {
        let names: Vec<String> = inputs.iter().map(|i| i.dtype.to_string()).collect();
        return Err(LaxError::dtype_error(format!(
            "Cannot concatenate arrays with different numeric types: {}.",
            names.join(", ")
        )));
    }
    let types: Vec<ElemType> = inputs.iter().map(ElemType::of).collect();
    let et = promote_all(&types).unwrap_or(ElemType::of(first));
    Ok(ShapedArray {
        shape: Shape::new(out),
        dtype: et.dtype,
        weak_type: et.weak,
    })
}
