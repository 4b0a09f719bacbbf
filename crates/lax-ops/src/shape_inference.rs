//! Shape and dtype inference for every primitive.
//!
//! Given a `Primitive` and the abstract values of its operands, computes the
//! abstract values of its results or the validation error the primitive
//! raises. Execution always runs this first, so `infer` and `execute` agree
//! on errors.

use lax_core::primitive::{BinaryOp, Primitive, ScatterKind, UnaryOp};
use lax_core::{DType, DTypeKind, LaxError, Result, Shape, ShapedArray};

use crate::broadcast::{broadcast_all, broadcast_in_dim_shape};
use crate::convolution::{conv_geometry, dot_general_shape};
use crate::dimension_numbers::{gather_shape, scatter_shape};
use crate::dtype_promotion::{
    ElemType, check_accepted, check_preferred_element_type, promote_all, promote_weak,
};
use crate::{reduction, structural};

/// Infer the result avals of `prim` applied to `inputs`.
pub fn infer(prim: &Primitive, inputs: &[ShapedArray]) -> Result<Vec<ShapedArray>> {
    let result = infer_rule(prim, inputs);
    if let Err(e) = &result {
        tracing::trace!(primitive = prim.name(), error = %e, "inference rejected operands");
    }
    result
}

fn infer_rule(prim: &Primitive, inputs: &[ShapedArray]) -> Result<Vec<ShapedArray>> {
    match prim {
        Primitive::Unary(op) => {
            expect_arity(prim, inputs, 1)?;
            Ok(vec![unary(*op, &inputs[0])?])
        }
        Primitive::Binary(op) => {
            expect_arity(prim, inputs, 2)?;
            Ok(vec![binary(*op, &inputs[0], &inputs[1])?])
        }
        Primitive::Select => {
            expect_arity(prim, inputs, 3)?;
            Ok(vec![select(&inputs[0], &inputs[1], &inputs[2])?])
        }
        Primitive::Clamp => {
            expect_arity(prim, inputs, 3)?;
            Ok(vec![clamp(&inputs[0], &inputs[1], &inputs[2])?])
        }
        Primitive::ConvertElementType {
            new_dtype,
            weak_type,
        } => {
            expect_arity(prim, inputs, 1)?;
            Ok(vec![ShapedArray {
                shape: inputs[0].shape.clone(),
                dtype: *new_dtype,
                weak_type: *weak_type,
            }])
        }
        Primitive::BitcastConvertType { new_dtype } => {
            expect_arity(prim, inputs, 1)?;
            Ok(vec![bitcast_convert_type(&inputs[0], *new_dtype)?])
        }
        Primitive::ReducePrecision {
            exponent_bits,
            mantissa_bits,
        } => {
            expect_arity(prim, inputs, 1)?;
            Ok(vec![reduce_precision(*exponent_bits, *mantissa_bits, &inputs[0])?])
        }
        Primitive::RegularizedIncompleteBeta => {
            expect_arity(prim, inputs, 3)?;
            Ok(vec![regularized_incomplete_beta(&inputs[0], &inputs[1], &inputs[2])?])
        }
        Primitive::Iota {
            dtype,
            shape,
            dimension,
        } => {
            expect_arity(prim, inputs, 0)?;
            if *dimension >= shape.len() {
                return Err(LaxError::type_error(format!(
                    "iota dimension must be in range [0, {}), got dimension={dimension}.",
                    shape.len()
                )));
            }
            check_accepted("iota", *dtype, &[DTypeKind::Unsigned, DTypeKind::Signed, DTypeKind::Float, DTypeKind::Complex])?;
            Ok(vec![ShapedArray::new(shape.clone(), *dtype)])
        }

        Primitive::Reduce { computation, axes } => reduction::reduce(computation, axes, inputs),
        Primitive::ReduceMonoid { monoid, axes } => {
            expect_arity(prim, inputs, 1)?;
            Ok(vec![reduction::reduce_monoid(prim.name(), *monoid, axes, &inputs[0])?])
        }
        Primitive::Argmax { axis, index_dtype } | Primitive::Argmin { axis, index_dtype } => {
            expect_arity(prim, inputs, 1)?;
            Ok(vec![reduction::arg_reduce(prim.name(), *axis, *index_dtype, &inputs[0])?])
        }
        Primitive::Cumulative { monoid, axis, .. } => {
            expect_arity(prim, inputs, 1)?;
            Ok(vec![reduction::cumulative(prim.name(), *monoid, *axis, &inputs[0])?])
        }
        Primitive::ReduceWindow { window, .. } => reduction::reduce_window(window, inputs),
        Primitive::ReduceWindowMonoid { monoid, window } => {
            expect_arity(prim, inputs, 1)?;
            Ok(vec![reduction::reduce_window_monoid(prim.name(), *monoid, window, &inputs[0])?])
        }

        Primitive::ConvGeneralDilated(spec) => {
            expect_arity(prim, inputs, 2)?;
            let geometry = conv_geometry(&inputs[0].shape, &inputs[1].shape, spec)?;
            let et = contraction_type(
                prim.name(),
                &inputs[0],
                &inputs[1],
                spec.preferred_element_type,
            )?;
            Ok(vec![ShapedArray {
                shape: geometry.out_shape,
                dtype: et.dtype,
                weak_type: et.weak,
            }])
        }
        Primitive::DotGeneral(spec) => {
            expect_arity(prim, inputs, 2)?;
            let shape = dot_general_shape(&inputs[0].shape, &inputs[1].shape, &spec.dimension_numbers)?;
            let et = contraction_type(
                prim.name(),
                &inputs[0],
                &inputs[1],
                spec.preferred_element_type,
            )?;
            Ok(vec![ShapedArray {
                shape,
                dtype: et.dtype,
                weak_type: et.weak,
            }])
        }

        Primitive::Gather(spec) => {
            expect_arity(prim, inputs, 2)?;
            let (operand, indices) = (&inputs[0], &inputs[1]);
            check_indices_dtype("gather", indices)?;
            let shape = gather_shape(
                &operand.shape,
                &indices.shape,
                &spec.dimension_numbers,
                &spec.slice_sizes,
            )?;
            Ok(vec![ShapedArray {
                shape,
                dtype: operand.dtype,
                weak_type: operand.weak_type,
            }])
        }
        Primitive::Scatter(spec) => {
            expect_arity(prim, inputs, 3)?;
            let (operand, indices, updates) = (&inputs[0], &inputs[1], &inputs[2]);
            let name = prim.name();
            check_indices_dtype(name, indices)?;
            if !matches!(spec.kind, ScatterKind::Apply(_))
                && !updates.weak_type
                && updates.dtype != operand.dtype
            {
                return Err(LaxError::dtype_error(format!(
                    "{name} operand and updates must have the same dtype, got {} and {}.",
                    operand.dtype, updates.dtype
                )));
            }
            let shape = scatter_shape(
                &operand.shape,
                &indices.shape,
                &updates.shape,
                &spec.dimension_numbers,
            )?;
            Ok(vec![ShapedArray {
                shape,
                dtype: operand.dtype,
                weak_type: operand.weak_type,
            }])
        }

        Primitive::Sort {
            dimension,
            num_keys,
            ..
        } => structural::sort(*dimension, *num_keys, inputs),
        Primitive::TopK { k } => {
            expect_arity(prim, inputs, 1)?;
            structural::top_k(*k, &inputs[0])
        }
        Primitive::Pad { padding_config } => {
            expect_arity(prim, inputs, 2)?;
            Ok(vec![structural::pad(padding_config, &inputs[0], &inputs[1])?])
        }
        Primitive::Slice {
            start_indices,
            limit_indices,
            strides,
        } => {
            expect_arity(prim, inputs, 1)?;
            let shape = structural::slice_shape(
                &inputs[0].shape,
                start_indices,
                limit_indices,
                strides.as_deref(),
            )?;
            Ok(vec![same_type(&inputs[0], shape)])
        }
        Primitive::DynamicSlice { slice_sizes } => {
            Ok(vec![structural::dynamic_slice(slice_sizes, inputs)?])
        }
        Primitive::DynamicUpdateSlice => Ok(vec![structural::dynamic_update_slice(inputs)?]),
        Primitive::BroadcastInDim {
            shape,
            broadcast_dimensions,
        } => {
            expect_arity(prim, inputs, 1)?;
            let out = broadcast_in_dim_shape(&inputs[0].shape, shape, broadcast_dimensions)?;
            Ok(vec![same_type(&inputs[0], out)])
        }
        Primitive::Transpose { permutation } => {
            expect_arity(prim, inputs, 1)?;
            let out = structural::transpose_shape(&inputs[0].shape, permutation)?;
            Ok(vec![same_type(&inputs[0], out)])
        }
        Primitive::Reshape { new_sizes } => {
            expect_arity(prim, inputs, 1)?;
            let out = structural::reshape_shape(&inputs[0].shape, new_sizes)?;
            Ok(vec![same_type(&inputs[0], out)])
        }
        Primitive::Squeeze { dimensions } => {
            expect_arity(prim, inputs, 1)?;
            let out = structural::squeeze_shape(&inputs[0].shape, dimensions)?;
            Ok(vec![same_type(&inputs[0], out)])
        }
        Primitive::ExpandDims { dimensions } => {
            expect_arity(prim, inputs, 1)?;
            let out = structural::expand_dims_shape(&inputs[0].shape, dimensions)?;
            Ok(vec![same_type(&inputs[0], out)])
        }
        Primitive::Rev { dimensions } => {
            expect_arity(prim, inputs, 1)?;
            structural::check_rev(&inputs[0].shape, dimensions)?;
            Ok(vec![inputs[0].clone()])
        }
        Primitive::Concatenate { dimension } => {
            Ok(vec![structural::concatenate(*dimension, inputs)?])
        }
    }
}

pub(crate) fn expect_arity(prim: &Primitive, inputs: &[ShapedArray], n: usize) -> Result<()> {
    if inputs.len() != n {
        return Err(LaxError::InvalidArgument(format!(
            "{} expects {n} operands, got {}",
            prim.name(),
            inputs.len()
        )));
    }
    Ok(())
}

/// Aval with `src`'s dtype and weak flag but a new shape.
pub(crate) fn same_type(src: &ShapedArray, shape: Shape) -> ShapedArray {
    ShapedArray {
        shape,
        dtype: src.dtype,
        weak_type: src.weak_type,
    }
}

/// Resolve a possibly-negative axis.
pub fn resolve_axis(axis: i64, ndim: usize, op_name: &str) -> Result<usize> {
    let ndim_i = ndim as i64;
    let resolved = if axis < 0 { ndim_i + axis } else { axis };
    if resolved < 0 || resolved >= ndim_i {
        return Err(LaxError::value_error(format!(
            "{op_name}: axis {axis} is out of bounds for array of dimension {ndim}"
        )));
    }
    Ok(resolved as usize)
}

fn check_indices_dtype(op_name: &str, indices: &ShapedArray) -> Result<()> {
    if !indices.dtype.is_integer() {
        return Err(LaxError::dtype_error(format!(
            "{op_name} indices must have an integer type, got {}.",
            indices.dtype
        )));
    }
    Ok(())
}

fn unary(op: UnaryOp, x: &ShapedArray) -> Result<ShapedArray> {
    check_accepted(op.name(), x.dtype, op.accepted_kinds())?;
    let dtype = match op {
        UnaryOp::IsFinite => return Ok(ShapedArray::new(x.shape.clone(), DType::Bool)),
        UnaryOp::Real | UnaryOp::Imag => x.dtype.real_dtype(),
        UnaryOp::Abs => x.dtype.real_dtype(),
        _ => x.dtype,
    };
    Ok(ShapedArray {
        shape: x.shape.clone(),
        dtype,
        weak_type: x.weak_type,
    })
}

fn binary(op: BinaryOp, x: &ShapedArray, y: &ShapedArray) -> Result<ShapedArray> {
    let shape = broadcast_all(op.name(), &[&x.shape, &y.shape])?;
    let et = promote_weak(ElemType::of(x), ElemType::of(y));
    check_accepted(op.name(), et.dtype, op.accepted_kinds())?;
    if op.is_comparison() {
        return Ok(ShapedArray::new(shape, DType::Bool));
    }
    let dtype = match op {
        BinaryOp::Complex => et.dtype.complex_dtype().unwrap_or(DType::C64),
        _ => et.dtype,
    };
    Ok(ShapedArray {
        shape,
        dtype,
        weak_type: et.weak,
    })
}

fn select(pred: &ShapedArray, on_true: &ShapedArray, on_false: &ShapedArray) -> Result<ShapedArray> {
    if pred.dtype != DType::Bool {
        return Err(LaxError::dtype_error(format!(
            "select_n which must be boolean, got {}.",
            pred.dtype
        )));
    }
    if on_true.shape != on_false.shape {
        return Err(LaxError::type_error(format!(
            "select_n cases must have the same shapes, got [{}, {}].",
            on_true.shape.tuple_str(),
            on_false.shape.tuple_str()
        )));
    }
    if !pred.shape.is_scalar() && pred.shape != on_true.shape {
        return Err(LaxError::type_error(format!(
            "select_n `which` must be scalar or have the same shape as cases, got `which` shape {} but case shape {}.",
            pred.shape.tuple_str(),
            on_true.shape.tuple_str()
        )));
    }
    let et = promote_weak(ElemType::of(on_true), ElemType::of(on_false));
    Ok(ShapedArray {
        shape: on_true.shape.clone(),
        dtype: et.dtype,
        weak_type: et.weak,
    })
}

fn clamp(min: &ShapedArray, x: &ShapedArray, max: &ShapedArray) -> Result<ShapedArray> {
    for (name, bound) in [("min", min), ("max", max)] {
        if !bound.shape.is_scalar() && bound.shape != x.shape {
            return Err(LaxError::type_error(format!(
                "clamp requires {name}.shape == operand.shape or {name}.shape == (), got {}.",
                bound.shape.tuple_str()
            )));
        }
    }
    check_accepted("clamp", x.dtype, &[DTypeKind::Bool, DTypeKind::Unsigned, DTypeKind::Signed, DTypeKind::Float])?;
    let et = promote_all(&[ElemType::of(min), ElemType::of(x), ElemType::of(max)])
        .unwrap_or(ElemType::of(x));
    Ok(ShapedArray {
        shape: x.shape.clone(),
        dtype: et.dtype,
        weak_type: et.weak,
    })
}

fn bitcast_convert_type(x: &ShapedArray, new_dtype: DType) -> Result<ShapedArray> {
    let old_dtype = x.dtype;
    let exotic = |d: DType| matches!(d.kind(), DTypeKind::Bool | DTypeKind::Complex);
    if (exotic(old_dtype) || exotic(new_dtype)) && old_dtype != new_dtype {
        return Err(LaxError::dtype_error(format!(
            "bitcast_convert_type for operand type ({old_dtype}) cannot have different source and destination types, got {new_dtype}."
        )));
    }
    let (old_bits, new_bits) = (old_dtype.bits(), new_dtype.bits());
    let dims = x.shape.dims();
    let shape = if old_bits == new_bits {
        x.shape.clone()
    } else if old_bits > new_bits {
        let mut out = dims.to_vec();
        out.push((old_bits / new_bits) as usize);
        Shape::new(out)
    } else {
        let last = dims.last().copied().unwrap_or(1);
        if last * old_bits as usize != new_bits as usize {
            return Err(LaxError::value_error(format!(
                "Attempting to convert array of shape {} from {old_dtype} of size {old_bits} bits to {new_dtype} of size {new_bits} bits, but {last} * {old_bits} != {new_bits}.",
                x.shape.tuple_str()
            )));
        }
        Shape::new(dims[..dims.len() - 1].to_vec())
    };
    Ok(ShapedArray::new(shape, new_dtype))
}

fn reduce_precision(exponent_bits: i32, mantissa_bits: i32, x: &ShapedArray) -> Result<ShapedArray> {
    if exponent_bits < 1 {
        return Err(LaxError::value_error(format!(
            "reduce_precision: exponent_bits must be positive; got {exponent_bits}"
        )));
    }
    if mantissa_bits < 0 {
        return Err(LaxError::value_error(format!(
            "reduce_precision: mantissa_bits must be non-negative; got {mantissa_bits}"
        )));
    }
    check_accepted("reduce_precision", x.dtype, &[DTypeKind::Float])?;
    Ok(x.clone())
}

fn regularized_incomplete_beta(a: &ShapedArray, b: &ShapedArray, x: &ShapedArray) -> Result<ShapedArray> {
    let name = "regularized_incomplete_beta";
    let shape = broadcast_all(name, &[&a.shape, &b.shape, &x.shape])?;
    let et = promote_all(&[ElemType::of(a), ElemType::of(b), ElemType::of(x)]).unwrap_or(ElemType::of(x));
    check_accepted(name, et.dtype, &[DTypeKind::Float])?;
    Ok(ShapedArray {
        shape,
        dtype: et.dtype,
        weak_type: et.weak,
    })
}

/// Result type of a contraction, honoring `preferred_element_type`.
pub fn contraction_type(
    op_name: &str,
    lhs: &ShapedArray,
    rhs: &ShapedArray,
    preferred: Option<DType>,
) -> Result<ElemType> {
    let et = promote_weak(ElemType::of(lhs), ElemType::of(rhs));
    check_accepted(op_name, et.dtype, &[DTypeKind::Unsigned, DTypeKind::Signed, DTypeKind::Float, DTypeKind::Complex])?;
    match preferred {
        Some(p) => {
            check_preferred_element_type(op_name, et.dtype, p)?;
            Ok(ElemType::strong(p))
        }
        None => Ok(et),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lax_core::primitive::{
        ConvSpec, DotDimensionNumbers, DotGeneralSpec, GatherDimensionNumbers, GatherSpec, Padding,
    };

    fn f32s(dims: &[usize]) -> ShapedArray {
        ShapedArray::new(dims.to_vec(), DType::F32)
    }

    #[test]
    fn test_unary_preserves_shape_and_weak() {
        let x = ShapedArray::weak(vec![2, 3], DType::F32);
        let out = infer(&Primitive::Unary(UnaryOp::Exp), &[x.clone()]).unwrap();
        assert_eq!(out, vec![x]);
    }

    #[test]
    fn test_unary_dtype_rejections() {
        let b = ShapedArray::new(vec![3], DType::Bool);
        let err = infer(&Primitive::Unary(UnaryOp::PopulationCount), &[b]).unwrap_err();
        assert!(err.message().contains("population_count does not accept dtype bool"));
        let i = ShapedArray::new(vec![3], DType::I32);
        assert!(infer(&Primitive::Unary(UnaryOp::Floor), &[i]).is_err());
    }

    #[test]
    fn test_abs_of_complex_is_real() {
        let c = ShapedArray::new(vec![2], DType::C64);
        let out = infer(&Primitive::Unary(UnaryOp::Abs), &[c]).unwrap();
        assert_eq!(out[0].dtype, DType::F32);
    }

    #[test]
    fn test_binary_broadcast_and_promote() {
        let a = ShapedArray::new(vec![3, 1], DType::I32);
        let b = ShapedArray::weak(Shape::scalar(), DType::F32);
        let out = infer(&Primitive::Binary(BinaryOp::Add), &[a, b]).unwrap();
        assert_eq!(out[0].shape, Shape::new(vec![3, 1]));
        assert_eq!(out[0].dtype, DType::I32);
        assert!(!out[0].weak_type);
    }

    #[test]
    fn test_comparison_rejects_complex() {
        let c = ShapedArray::new(vec![2], DType::C64);
        for op in [BinaryOp::Lt, BinaryOp::Gt, BinaryOp::Ge, BinaryOp::Le, BinaryOp::Rem] {
            let err = infer(&Primitive::Binary(op), &[c.clone(), c.clone()]).unwrap_err();
            assert!(err.message().contains("does not accept dtype complex"), "{op:?}");
        }
        let out = infer(&Primitive::Binary(BinaryOp::Eq), &[c.clone(), c]).unwrap();
        assert_eq!(out[0].dtype, DType::Bool);
    }

    #[test]
    fn test_arity_checked() {
        let err = infer(&Primitive::Binary(BinaryOp::Add), &[f32s(&[2])]).unwrap_err();
        assert!(matches!(err, LaxError::InvalidArgument(_)));
    }

    #[test]
    fn test_select_shapes() {
        let p = ShapedArray::new(Shape::scalar(), DType::Bool);
        let out = infer(&Primitive::Select, &[p, f32s(&[2]), f32s(&[2])]).unwrap();
        assert_eq!(out[0], f32s(&[2]));
        let p = ShapedArray::new(vec![3], DType::Bool);
        assert!(infer(&Primitive::Select, &[p, f32s(&[2]), f32s(&[2])]).is_err());
    }

    #[test]
    fn test_bitcast_convert_type_shapes() {
        let bitcast = |x: ShapedArray, new_dtype| infer(&Primitive::BitcastConvertType { new_dtype }, &[x]);
        let same = bitcast(ShapedArray::weak(vec![2, 3], DType::F32), DType::I32).unwrap();
        assert_eq!(same[0], ShapedArray::new(vec![2, 3], DType::I32));
        let narrow = bitcast(f32s(&[2]), DType::U8).unwrap();
        assert_eq!(narrow[0].shape, Shape::new(vec![2, 4]));
        let wide = bitcast(ShapedArray::new(vec![3, 2], DType::I16), DType::F32).unwrap();
        assert_eq!(wide[0].shape, Shape::new(vec![3]));

        let err = bitcast(ShapedArray::new(vec![3], DType::I16), DType::F32).unwrap_err();
        assert!(err.is_value_error());
        assert!(bitcast(ShapedArray::new(Shape::scalar(), DType::I16), DType::F32).is_err());
        let err = bitcast(ShapedArray::new(vec![2], DType::Bool), DType::U8).unwrap_err();
        assert!(err.message().contains("cannot have different source and destination types"));
        assert!(bitcast(ShapedArray::new(vec![2], DType::C64), DType::C64).is_ok());
    }

    #[test]
    fn test_reduce_precision_checks_bits_and_dtype() {
        let rp = |e, m, x: ShapedArray| {
            infer(
                &Primitive::ReducePrecision {
                    exponent_bits: e,
                    mantissa_bits: m,
                },
                &[x],
            )
        };
        let x = ShapedArray::weak(vec![4], DType::F32);
        assert_eq!(rp(5, 10, x.clone()).unwrap(), vec![x.clone()]);
        let err = rp(0, 10, x.clone()).unwrap_err();
        assert!(err.message().contains("exponent_bits must be positive; got 0"));
        let err = rp(5, -1, x).unwrap_err();
        assert!(err.message().contains("mantissa_bits must be non-negative; got -1"));
        let err = rp(5, 10, ShapedArray::new(vec![4], DType::I32)).unwrap_err();
        assert!(err.is_type_error());
    }

    #[test]
    fn test_regularized_incomplete_beta_float_only() {
        let prim = Primitive::RegularizedIncompleteBeta;
        let scalar = ShapedArray::weak(Shape::scalar(), DType::F32);
        let out = infer(&prim, &[scalar.clone(), scalar, f32s(&[3])]).unwrap();
        assert_eq!(out[0], f32s(&[3]));
        let ints = ShapedArray::new(vec![3], DType::I32);
        assert!(infer(&prim, &[ints.clone(), ints.clone(), ints]).unwrap_err().is_type_error());
        assert!(infer(&prim, &[f32s(&[2]), f32s(&[3]), f32s(&[3])]).is_err());
    }

    #[test]
    fn test_conv_preferred_element_type() {
        let lhs = ShapedArray::new(vec![1, 1, 4], DType::I8);
        let rhs = ShapedArray::new(vec![1, 1, 2], DType::I8);
        let spec = ConvSpec::new(vec![1], Padding::Valid).with_preferred_element_type(DType::I32);
        let out = infer(&Primitive::ConvGeneralDilated(spec), &[lhs.clone(), rhs.clone()]).unwrap();
        assert_eq!(out[0].dtype, DType::I32);
        assert_eq!(out[0].shape, Shape::new(vec![1, 1, 3]));
        let spec = ConvSpec::new(vec![1], Padding::Valid).with_preferred_element_type(DType::F32);
        let err = infer(&Primitive::ConvGeneralDilated(spec), &[lhs, rhs]).unwrap_err();
        assert!(err.is_type_error());
    }

    #[test]
    fn test_dot_general_weak() {
        let lhs = ShapedArray::weak(vec![2, 3], DType::F32);
        let rhs = ShapedArray::weak(vec![3, 4], DType::F32);
        let spec = DotGeneralSpec {
            dimension_numbers: DotDimensionNumbers {
                lhs_contracting: vec![1],
                rhs_contracting: vec![0],
                ..Default::default()
            },
            ..Default::default()
        };
        let out = infer(&Primitive::DotGeneral(spec.clone()), &[lhs.clone(), rhs.clone()]).unwrap();
        assert!(out[0].weak_type);
        let spec = DotGeneralSpec {
            preferred_element_type: Some(DType::F32),
            ..spec
        };
        let out = infer(&Primitive::DotGeneral(spec), &[lhs, rhs]).unwrap();
        assert!(!out[0].weak_type);
    }

    #[test]
    fn test_gather_requires_integer_indices() {
        let spec = GatherSpec::new(
            GatherDimensionNumbers {
                offset_dims: vec![],
                collapsed_slice_dims: vec![0],
                start_index_map: vec![0],
            },
            vec![1],
        );
        let err = infer(&Primitive::Gather(spec), &[f32s(&[5]), f32s(&[2, 1])]).unwrap_err();
        assert!(err.message().contains("integer"));
    }

    #[test]
    fn test_iota() {
        let out = infer(
            &Primitive::Iota {
                dtype: DType::I32,
                shape: vec![2, 3],
                dimension: 1,
            },
            &[],
        )
        .unwrap();
        assert_eq!(out[0], ShapedArray::new(vec![2, 3], DType::I32));
    }

    #[test]
    fn test_resolve_axis() {
        assert_eq!(resolve_axis(-1, 3, "sort").unwrap(), 2);
        assert!(resolve_axis(3, 3, "sort").is_err());
        assert!(resolve_axis(-4, 3, "sort").is_err());
    }
}
