//! Window and padding arithmetic shared by convolution and reduce_window.

use lax_core::primitive::{Padding, WindowSpec};
use lax_core::{LaxError, Result, Shape};

use crate::broadcast::format_dims;

/// Size of a dimension after inserting `dilation - 1` gaps between elements.
pub fn dilate_dim(d: usize, dilation: usize) -> usize {
    if d == 0 { 0 } else { (d - 1) * dilation + 1 }
}

/// Every element of a window-like attribute must be positive.
pub fn check_shapelike(op_name: &str, arg_name: &str, values: &[usize]) -> Result<()> {
    if values.contains(&0) {
        return Err(LaxError::type_error(format!(
            "{op_name} {arg_name} must have every element be positive, got {}.",
            format_dims(values)
        )));
    }
    Ok(())
}

/// Resolve a padding spec to explicit `(low, high)` pairs.
///
/// For `Same` the total
/// padding is `max((ceil(in / stride) - 1) * stride + window - in, 0)`, with
/// `low = total / 2` rounded down and the remainder placed high; `SameLower`
/// places the remainder low.
pub fn padtype_to_pads(
    in_shape: &[usize],
    window_shape: &[usize],
    strides: &[usize],
    padding: &Padding,
) -> Vec<(i64, i64)> {
    match padding {
        Padding::Valid => vec![(0, 0); in_shape.len()],
        Padding::Explicit(pads) => pads.clone(),
        Padding::Same | Padding::SameLower => in_shape
            .iter()
            .zip(window_shape)
            .zip(strides)
            .map(|((&i, &w), &s)| {
                let (i, w, s) = (i as i64, w as i64, s.max(1) as i64);
                let out = (i + s - 1) / s;
                let total = ((out - 1) * s + w - i).max(0);
                let small = total / 2;
                if *padding == Padding::Same {
                    (small, total - small)
                } else {
                    (total - small, small)
                }
            })
            .collect(),
    }
}

/// Output extent of a window swept with `stride` over a padded extent.
pub fn window_output_dim(padded: i64, window: usize, stride: usize) -> usize {
    let window = window as i64;
    if padded < window {
        0
    } else {
        ((padded - window) / stride as i64 + 1) as usize
    }
}

/// Validate a reduce_window geometry and compute its output shape together
/// with the resolved explicit padding.
pub fn reduce_window_shape(operand: &Shape, window: &WindowSpec) -> Result<(Shape, Vec<(i64, i64)>)> {
    let rank = operand.ndim();
    let lengths = [
        ("window_dimensions", window.window_dimensions.len()),
        ("window_strides", window.window_strides.len()),
        ("base_dilation", window.base_dilation.len()),
        ("window_dilation", window.window_dilation.len()),
    ];
    for (name, len) in lengths {
        if len != rank {
            return Err(LaxError::type_error(format!(
                "reduce_window {name} must have length equal to operand ndim, got {len} for operand of shape {}.",
                operand.tuple_str()
            )));
        }
    }
    check_shapelike("reduce_window", "window_dimensions", &window.window_dimensions)?;
    check_shapelike("reduce_window", "window_strides", &window.window_strides)?;
    check_shapelike("reduce_window", "base_dilation", &window.base_dilation)?;
    check_shapelike("reduce_window", "window_dilation", &window.window_dilation)?;

    let dilated_in: Vec<usize> = operand
        .dims()
        .iter()
        .zip(&window.base_dilation)
        .map(|(&d, &b)| dilate_dim(d, b))
        .collect();
    let dilated_window: Vec<usize> = window
        .window_dimensions
        .iter()
        .zip(&window.window_dilation)
        .map(|(&w, &d)| dilate_dim(w, d))
        .collect();
    // String padding is resolved on the undilated operand and window.
    let pads = padtype_to_pads(
        operand.dims(),
        &window.window_dimensions,
        &window.window_strides,
        &window.padding,
    );
    if pads.len() != rank {
        return Err(LaxError::value_error(format!(
            "reduce_window padding must have length equal to operand ndim, got {} for operand of shape {}.",
            pads.len(),
            operand.tuple_str()
        )));
    }

    let mut out = Vec::with_capacity(rank);
    for i in 0..rank {
        let (lo, hi) = pads[i];
        let padded = dilated_in[i] as i64 + lo + hi;
        if padded < 0 {
            return Err(LaxError::value_error(format!(
                "reduce_window padding {pads:?} results in a negative padded size for operand of shape {}.",
                operand.tuple_str()
            )));
        }
        out.push(window_output_dim(padded, dilated_window[i], window.window_strides[i]));
    }
    Ok((Shape::new(out), pads))
}
