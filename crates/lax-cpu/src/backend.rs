//! Built-in CPU reference backend, the correctness oracle.
//!
//! This is a simple, safe Rust implementation of every primitive. It
//! prioritizes correctness and readability over performance; the only
//! concession to speed is rayon parallelism over output elements.

use lax_core::primitive::{GatherScatterMode, Primitive};
use lax_core::{Array, Backend, Result, ShapedArray};
use lax_ops::resolve_axis;

use crate::index::{require_input, require_output};
use crate::{conv, elementwise, gather_scatter, reduce, slicing, sort};

/// Reference CPU backend.
pub struct CpuRefBackend;

impl Backend for CpuRefBackend {
    fn name(&self) -> &'static str {
        "cpu"
    }

    fn execute(
        &self,
        prim: &Primitive,
        inputs: &[&Array],
        outputs: &[ShapedArray],
    ) -> Result<Vec<Array>> {
        let out = require_output(outputs, 0)?;
        let single = |a: Result<Array>| a.map(|a| vec![a]);
        match prim {
            Primitive::Unary(op) => single(elementwise::unary(*op, require_input(inputs, 0)?, out)),
            Primitive::Binary(op) => {
                let x = require_input(inputs, 0)?;
                let y = require_input(inputs, 1)?;
                single(elementwise::binary(*op, x, y, out))
            }
            Primitive::Select => {
                let pred = require_input(inputs, 0)?;
                let on_true = require_input(inputs, 1)?;
                let on_false = require_input(inputs, 2)?;
                single(elementwise::select(pred, on_true, on_false, out))
            }
            Primitive::Clamp => {
                let lo = require_input(inputs, 0)?;
                let x = require_input(inputs, 1)?;
                let hi = require_input(inputs, 2)?;
                single(elementwise::clamp(lo, x, hi, out))
            }
            Primitive::ConvertElementType { .. } => {
                single(elementwise::convert_element_type(require_input(inputs, 0)?, out))
            }
            Primitive::BitcastConvertType { .. } => {
                single(elementwise::bitcast_convert_type(require_input(inputs, 0)?, out))
            }
            Primitive::ReducePrecision {
                exponent_bits,
                mantissa_bits,
            } => single(elementwise::reduce_precision(
                require_input(inputs, 0)?,
                *exponent_bits,
                *mantissa_bits,
                out,
            )),
            Primitive::RegularizedIncompleteBeta => {
                let a = require_input(inputs, 0)?;
                let b = require_input(inputs, 1)?;
                let x = require_input(inputs, 2)?;
                single(elementwise::regularized_incomplete_beta(a, b, x, out))
            }
            Primitive::Iota { dimension, .. } => single(elementwise::iota(*dimension, out)),

            Primitive::Reduce { computation, axes } => {
                let (operands, inits) = inputs.split_at(inputs.len() / 2);
                reduce::reduce(computation, axes, operands, inits, outputs)
            }
            Primitive::ReduceMonoid { monoid, axes } => {
                single(reduce::reduce_monoid(*monoid, axes, require_input(inputs, 0)?, out))
            }
            Primitive::Argmax { axis, .. } => {
                single(reduce::arg_reduce(true, *axis, require_input(inputs, 0)?, out))
            }
            Primitive::Argmin { axis, .. } => {
                single(reduce::arg_reduce(false, *axis, require_input(inputs, 0)?, out))
            }
            Primitive::Cumulative {
                monoid,
                axis,
                reverse,
            } => single(reduce::cumulative(*monoid, *axis, *reverse, require_input(inputs, 0)?, out)),
            Primitive::ReduceWindow { computation, window } => {
                let (operands, inits) = inputs.split_at(inputs.len() / 2);
                reduce::reduce_window(computation, window, operands, inits, outputs)
            }
            Primitive::ReduceWindowMonoid { monoid, window } => {
                single(reduce::reduce_window_monoid(*monoid, window, require_input(inputs, 0)?, out))
            }

            Primitive::ConvGeneralDilated(spec) => {
                let lhs = require_input(inputs, 0)?;
                let rhs = require_input(inputs, 1)?;
                single(conv::conv_general_dilated(lhs, rhs, spec, out))
            }
            Primitive::DotGeneral(spec) => {
                let lhs = require_input(inputs, 0)?;
                let rhs = require_input(inputs, 1)?;
                single(conv::dot_general(lhs, rhs, &spec.dimension_numbers, out))
            }

            Primitive::Gather(spec) => {
                let operand = require_input(inputs, 0)?;
                let indices = require_input(inputs, 1)?;
                single(gather_scatter::gather(operand, indices, spec, out))
            }
            Primitive::Scatter(spec) => {
                let operand = require_input(inputs, 0)?;
                let indices = require_input(inputs, 1)?;
                let updates = require_input(inputs, 2)?;
                let mode = spec.mode.unwrap_or(GatherScatterMode::FillOrDrop);
                single(gather_scatter::scatter(operand, indices, updates, spec, mode, out))
            }

            Primitive::Sort {
                dimension,
                num_keys,
                ..
            } => {
                let axis = resolve_axis(*dimension, out.ndim(), "sort")?;
                sort::sort(axis, *num_keys, inputs, outputs)
            }
            Primitive::TopK { k } => {
                let k = usize::try_from(*k).unwrap_or(0);
                sort::top_k(k, require_input(inputs, 0)?, outputs)
            }

            Primitive::Pad { padding_config } => {
                let x = require_input(inputs, 0)?;
                let padding_value = require_input(inputs, 1)?;
                single(slicing::pad(x, padding_value, padding_config, out))
            }
            Primitive::Slice {
                start_indices,
                strides,
                ..
            } => single(slicing::slice(
                require_input(inputs, 0)?,
                start_indices,
                strides.as_deref(),
                out,
            )),
            Primitive::DynamicSlice { slice_sizes } => {
                let x = require_input(inputs, 0)?;
                single(slicing::dynamic_slice(x, &inputs[1..], slice_sizes, out))
            }
            Primitive::DynamicUpdateSlice => {
                let x = require_input(inputs, 0)?;
                let update = require_input(inputs, 1)?;
                single(slicing::dynamic_update_slice(x, update, &inputs[2..], out))
            }
            Primitive::BroadcastInDim {
                broadcast_dimensions,
                ..
            } => single(slicing::broadcast_in_dim(require_input(inputs, 0)?, broadcast_dimensions, out)),
            Primitive::Transpose { permutation } => {
                single(slicing::transpose(require_input(inputs, 0)?, permutation, out))
            }
            Primitive::Reshape { .. } | Primitive::Squeeze { .. } | Primitive::ExpandDims { .. } => {
                single(slicing::relayout(require_input(inputs, 0)?, out))
            }
            Primitive::Rev { dimensions } => single(slicing::rev(require_input(inputs, 0)?, dimensions, out)),
            Primitive::Concatenate { dimension } => single(slicing::concatenate(inputs, *dimension, out)),
        }
    }
}
