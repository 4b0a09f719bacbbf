//! Inference rules for reductions, scans and windowed reductions.

use lax_core::primitive::{Computation, Monoid, WindowSpec};
use lax_core::{DType, DTypeKind, LaxError, Result, Shape, ShapedArray};

use crate::broadcast::format_dims;
use crate::dtype_promotion::check_accepted;
use crate::shape_inference::same_type;
use crate::window::reduce_window_shape;

/// Reduction axes must be in range and distinct.
pub fn check_axes(op_name: &str, axes: &[usize], ndim: usize) -> Result<()> {
    let mut seen = vec![false; ndim];
    for &a in axes {
        if a >= ndim {
            return Err(LaxError::value_error(format!(
                "{op_name}: axes {} out of bounds for operand of rank {ndim}.",
                format_dims(axes)
            )));
        }
        if seen[a] {
            return Err(LaxError::value_error(format!(
                "duplicate value in 'axes' of reduction: {}",
                format_dims(axes)
            )));
        }
        seen[a] = true;
    }
    Ok(())
}

/// Shape with `axes` removed.
pub fn reduced_shape(shape: &Shape, axes: &[usize]) -> Shape {
    Shape::new(
        shape
            .dims()
            .iter()
            .enumerate()
            .filter(|(i, _)| !axes.contains(i))
            .map(|(_, &d)| d)
            .collect::<Vec<_>>(),
    )
}

fn check_monoid_dtype(op_name: &str, monoid: Monoid, dtype: DType) -> Result<()> {
    check_accepted(op_name, dtype, monoid.binary_op().accepted_kinds())
}

/// `(operands..., init_values...)` → one reduced aval per operand.
pub fn reduce(computation: &Computation, axes: &[usize], inputs: &[ShapedArray]) -> Result<Vec<ShapedArray>> {
    if inputs.is_empty() || inputs.len() % 2 != 0 {
        return Err(LaxError::value_error(format!(
            "reduce operands must have the same tree structure as init_values, got {} arrays.",
            inputs.len()
        )));
    }
    let (operands, inits) = inputs.split_at(inputs.len() / 2);
    let shape = &operands[0].shape;
    if let Some(bad) = operands.iter().find(|o| &o.shape != shape) {
        return Err(LaxError::value_error(format!(
            "reduce operands must have the same shape, got {} and {}.",
            shape.tuple_str(),
            bad.shape.tuple_str()
        )));
    }
    if let Some(bad) = inits.iter().find(|i| !i.shape.is_scalar()) {
        return Err(LaxError::value_error(format!(
            "reduce found non-scalar initial value: {}",
            bad.shape.tuple_str()
        )));
    }
    for (operand, init) in operands.iter().zip(inits) {
        if !init.weak_type && init.dtype != operand.dtype {
            return Err(LaxError::dtype_error(format!(
                "reduce operand dtypes should match corresponding initial value dtypes, got operand {} and initial value {}.",
                operand.dtype, init.dtype
            )));
        }
        if let Computation::Monoid(m) = computation {
            check_monoid_dtype("reduce", *m, operand.dtype)?;
        }
    }
    check_axes("reduce", axes, shape.ndim())?;
    let out_shape = reduced_shape(shape, axes);
    Ok(operands
        .iter()
        .zip(inits)
        .map(|(o, i)| ShapedArray {
            shape: out_shape.clone(),
            dtype: o.dtype,
            weak_type: o.weak_type && i.weak_type,
        })
        .collect())
}

pub fn reduce_monoid(op_name: &str, monoid: Monoid, axes: &[usize], x: &ShapedArray) -> Result<ShapedArray> {
    check_monoid_dtype(op_name, monoid, x.dtype)?;
    check_axes(op_name, axes, x.ndim())?;
    Ok(same_type(x, reduced_shape(&x.shape, axes)))
}

pub fn arg_reduce(op_name: &str, axis: usize, index_dtype: DType, x: &ShapedArray) -> Result<ShapedArray> {
    if axis >= x.ndim() {
        return Err(LaxError::value_error(format!(
            "{op_name}: axis {axis} is out of bounds for array of dimension {}",
            x.ndim()
        )));
    }
    if x.shape.0[axis] == 0 {
        return Err(LaxError::value_error(format!(
            "{op_name} requires a non-empty reduced dimension, got operand shape {}.",
            x.shape.tuple_str()
        )));
    }
    check_accepted(op_name, x.dtype, &[DTypeKind::Bool, DTypeKind::Unsigned, DTypeKind::Signed, DTypeKind::Float])?;
    if !index_dtype.is_integer() {
        return Err(LaxError::dtype_error(format!(
            "{op_name} index_dtype must be an integer type, got {index_dtype}."
        )));
    }
    Ok(ShapedArray::new(reduced_shape(&x.shape, &[axis]), index_dtype))
}

pub fn cumulative(op_name: &str, monoid: Monoid, axis: usize, x: &ShapedArray) -> Result<ShapedArray> {
    if axis >= x.ndim() {
        return Err(LaxError::value_error(format!(
            "{op_name}: axis {axis} is out of bounds for array of dimension {}",
            x.ndim()
        )));
    }
    check_monoid_dtype(op_name, monoid, x.dtype)?;
    Ok(x.clone())
}

/// `(operands..., init_values...)` over a window geometry.
pub fn reduce_window(window: &WindowSpec, inputs: &[ShapedArray]) -> Result<Vec<ShapedArray>> {
    if inputs.is_empty() || inputs.len() % 2 != 0 {
        return Err(LaxError::value_error(
            "reduce_window output must have the same tree structure as the operands",
        ));
    }
    let (operands, inits) = inputs.split_at(inputs.len() / 2);
    if inits.iter().any(|i| !i.shape.is_scalar()) {
        let shapes: Vec<String> = inits.iter().map(|i| i.shape.tuple_str()).collect();
        return Err(LaxError::type_error(format!(
            "reduce_window expected init_values to be scalars but init_values have shapes [{}].",
            shapes.join(", ")
        )));
    }
    let shape = &operands[0].shape;
    if let Some(bad) = operands.iter().find(|o| &o.shape != shape) {
        return Err(LaxError::type_error(format!(
            "reduce_window got operands of different shapes: {} and {}.",
            shape.tuple_str(),
            bad.shape.tuple_str()
        )));
    }
    for (operand, init) in operands.iter().zip(inits) {
        if !init.weak_type && init.dtype != operand.dtype {
            return Err(LaxError::dtype_error(format!(
                "reduce_window operand and init_value dtypes must match, got {} and {}.",
                operand.dtype, init.dtype
            )));
        }
    }
    let (out_shape, _) = reduce_window_shape(shape, window)?;
    Ok(operands
        .iter()
        .zip(inits)
        .map(|(o, i)| ShapedArray {
            shape: out_shape.clone(),
            dtype: o.dtype,
            weak_type: o.weak_type && i.weak_type,
        })
        .collect())
}

pub fn reduce_window_monoid(
    op_name: &str,
    monoid: Monoid,
    window: &WindowSpec,
    x: &ShapedArray,
) -> Result<ShapedArray> {
    check_monoid_dtype(op_name, monoid, x.dtype)?;
    let (out_shape, _) = reduce_window_shape(&x.shape, window)?;
    Ok(same_type(x, out_shape))
}
