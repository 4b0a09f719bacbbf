//! Convenience API over [`Engine::execute`].
//!
//! Each method builds the matching [`Primitive`] from friendlier arguments
//! (string padding, layout strings, signed axes) and runs it.

use lax_core::primitive::{
    BinaryOp, Computation, ConvDimensionNumbers, ConvSpec, DotDimensionNumbers, DotGeneralSpec,
    GatherDimensionNumbers, GatherScatterMode, GatherSpec, Monoid, Padding, Primitive,
    ScatterDimensionNumbers, ScatterKind, ScatterSpec, UnaryOp, WindowSpec,
};
use lax_core::{Array, DType, LaxError, Result, Scalar, Shape};
use lax_ops::resolve_axis;

use crate::engine::Engine;
use crate::index::{IndexIter, ravel, strides};

impl Engine {
    // ── literals ────────────────────────────────────────────────────────────

    /// Weakly-typed rank-0 literal in the engine's default dtype for its kind.
    pub fn literal(&self, value: impl Into<Scalar>) -> Array {
        let value = value.into();
        let dtype = match value {
            Scalar::Bool(_) => DType::Bool,
            Scalar::Int(_) | Scalar::UInt(_) => self.config().default_int_dtype(),
            Scalar::Float(_) => self.config().default_float_dtype(),
            Scalar::Complex(_) => self.config().default_complex_dtype(),
        };
        Array::weak_scalar(value, dtype)
    }

    /// Array of `data` in `dtype`, canonicalized for the engine config.
    pub fn array(&self, shape: &[usize], dtype: DType, data: Vec<Scalar>) -> Result<Array> {
        Array::new(shape.to_vec(), self.config().canonicalize_dtype(dtype), data)
    }

    // ── elementwise ─────────────────────────────────────────────────────────

    pub fn unary(&self, op: UnaryOp, x: &Array) -> Result<Array> {
        self.execute1(&Primitive::Unary(op), &[x])
    }

    pub fn binary(&self, op: BinaryOp, x: &Array, y: &Array) -> Result<Array> {
        self.execute1(&Primitive::Binary(op), &[x, y])
    }

    pub fn add(&self, x: &Array, y: &Array) -> Result<Array> {
        self.binary(BinaryOp::Add, x, y)
    }

    pub fn sub(&self, x: &Array, y: &Array) -> Result<Array> {
        self.binary(BinaryOp::Sub, x, y)
    }

    pub fn mul(&self, x: &Array, y: &Array) -> Result<Array> {
        self.binary(BinaryOp::Mul, x, y)
    }

    pub fn div(&self, x: &Array, y: &Array) -> Result<Array> {
        self.binary(BinaryOp::Div, x, y)
    }

    pub fn max(&self, x: &Array, y: &Array) -> Result<Array> {
        self.binary(BinaryOp::Max, x, y)
    }

    pub fn min(&self, x: &Array, y: &Array) -> Result<Array> {
        self.binary(BinaryOp::Min, x, y)
    }

    pub fn select(&self, pred: &Array, on_true: &Array, on_false: &Array) -> Result<Array> {
        self.execute1(&Primitive::Select, &[pred, on_true, on_false])
    }

    pub fn clamp(&self, lo: &Array, x: &Array, hi: &Array) -> Result<Array> {
        self.execute1(&Primitive::Clamp, &[lo, x, hi])
    }

    pub fn convert_element_type(&self, x: &Array, new_dtype: DType) -> Result<Array> {
        self.execute1(
            &Primitive::ConvertElementType {
                new_dtype,
                weak_type: false,
            },
            &[x],
        )
    }

    pub fn bitcast_convert_type(&self, x: &Array, new_dtype: DType) -> Result<Array> {
        self.execute1(&Primitive::BitcastConvertType { new_dtype }, &[x])
    }

    pub fn reduce_precision(&self, x: &Array, exponent_bits: i32, mantissa_bits: i32) -> Result<Array> {
        let prim = Primitive::ReducePrecision {
            exponent_bits,
            mantissa_bits,
        };
        self.execute1(&prim, &[x])
    }

    /// Regularized incomplete beta function `I_x(a, b)`.
    pub fn betainc(&self, a: &Array, b: &Array, x: &Array) -> Result<Array> {
        self.execute1(&Primitive::RegularizedIncompleteBeta, &[a, b, x])
    }

    pub fn iota(&self, dtype: DType, size: usize) -> Result<Array> {
        self.broadcasted_iota(dtype, &[size], 0)
    }

    pub fn broadcasted_iota(&self, dtype: DType, shape: &[usize], dimension: usize) -> Result<Array> {
        self.execute1(
            &Primitive::Iota {
                dtype,
                shape: shape.to_vec(),
                dimension,
            },
            &[],
        )
    }

    // ── reductions ──────────────────────────────────────────────────────────

    /// Reduce `operands` over `axes`. A monoid whose init values are all its
    /// identity runs as the specialized monoid reduction.
    pub fn reduce(
        &self,
        operands: &[&Array],
        init_values: &[&Array],
        computation: Computation,
        axes: &[usize],
    ) -> Result<Vec<Array>> {
        if let Computation::Monoid(monoid) = &computation
            && let ([x], [init]) = (operands, init_values)
            && is_identity(*monoid, init)
            && init.dtype() == x.dtype()
        {
            let prim = Primitive::ReduceMonoid {
                monoid: *monoid,
                axes: axes.to_vec(),
            };
            return self.execute(&prim, &[*x]);
        }
        let mut inputs = operands.to_vec();
        inputs.extend_from_slice(init_values);
        let prim = Primitive::Reduce {
            computation,
            axes: axes.to_vec(),
        };
        self.execute(&prim, &inputs)
    }

    pub fn reduce_sum(&self, x: &Array, axes: &[usize]) -> Result<Array> {
        self.reduce_monoid(Monoid::Sum, x, axes)
    }

    pub fn reduce_max(&self, x: &Array, axes: &[usize]) -> Result<Array> {
        self.reduce_monoid(Monoid::Max, x, axes)
    }

    pub fn reduce_min(&self, x: &Array, axes: &[usize]) -> Result<Array> {
        self.reduce_monoid(Monoid::Min, x, axes)
    }

    pub fn reduce_monoid(&self, monoid: Monoid, x: &Array, axes: &[usize]) -> Result<Array> {
        self.execute1(
            &Primitive::ReduceMonoid {
                monoid,
                axes: axes.to_vec(),
            },
            &[x],
        )
    }

    pub fn argmax(&self, x: &Array, axis: i64, index_dtype: DType) -> Result<Array> {
        let axis = resolve_axis(axis, x.ndim(), "argmax")?;
        self.execute1(&Primitive::Argmax { axis, index_dtype }, &[x])
    }

    pub fn argmin(&self, x: &Array, axis: i64, index_dtype: DType) -> Result<Array> {
        let axis = resolve_axis(axis, x.ndim(), "argmin")?;
        self.execute1(&Primitive::Argmin { axis, index_dtype }, &[x])
    }

    pub fn cumulative(&self, monoid: Monoid, x: &Array, axis: i64, reverse: bool) -> Result<Array> {
        let axis = resolve_axis(axis, x.ndim(), "cumulative")?;
        self.execute1(
            &Primitive::Cumulative {
                monoid,
                axis,
                reverse,
            },
            &[x],
        )
    }

    pub fn cumsum(&self, x: &Array, axis: i64) -> Result<Array> {
        self.cumulative(Monoid::Sum, x, axis, false)
    }

    /// Windowed reduction; like [`Engine::reduce`], an identity init selects
    /// the monoid form.
    pub fn reduce_window(
        &self,
        operands: &[&Array],
        init_values: &[&Array],
        computation: Computation,
        window: WindowSpec,
    ) -> Result<Vec<Array>> {
        if let Computation::Monoid(monoid) = &computation
            && matches!(monoid, Monoid::Sum | Monoid::Max | Monoid::Min)
            && let ([x], [init]) = (operands, init_values)
            && is_identity(*monoid, init)
            && init.dtype() == x.dtype()
        {
            let prim = Primitive::ReduceWindowMonoid {
                monoid: *monoid,
                window,
            };
            return self.execute(&prim, &[*x]);
        }
        let mut inputs = operands.to_vec();
        inputs.extend_from_slice(init_values);
        self.execute(&Primitive::ReduceWindow { computation, window }, &inputs)
    }

    // ── contractions ────────────────────────────────────────────────────────

    pub fn conv_general_dilated(&self, lhs: &Array, rhs: &Array, spec: ConvSpec) -> Result<Array> {
        self.execute1(&Primitive::ConvGeneralDilated(spec), &[lhs, rhs])
    }

    /// Convolution with string padding (`VALID`, `SAME`, `SAME_LOWER`) and
    /// optional layout strings such as `("NHWC", "HWIO", "NHWC")`.
    pub fn conv(
        &self,
        lhs: &Array,
        rhs: &Array,
        window_strides: &[usize],
        padding: &str,
        dimension_numbers: Option<(&str, &str, &str)>,
    ) -> Result<Array> {
        let mut spec = ConvSpec::new(window_strides.to_vec(), padding.parse::<Padding>()?);
        if let Some((l, r, o)) = dimension_numbers {
            spec = spec.with_dimension_numbers(ConvDimensionNumbers::from_strings(l, r, o)?);
        }
        self.conv_general_dilated(lhs, rhs, spec)
    }

    /// Patches a convolution with a `filter_shape` kernel would see, laid
    /// out as output features. Feature `c * prod(filter_shape) + k` holds
    /// input channel `c` at flat filter offset `k`. Built as a grouped
    /// convolution with a one-hot kernel; `spec`'s group counts are ignored.
    pub fn conv_general_dilated_patches(&self, lhs: &Array, filter_shape: &[usize], spec: ConvSpec) -> Result<Array> {
        let ndim = lhs.ndim();
        if filter_shape.len() + 2 != ndim {
            return Err(LaxError::type_error(format!(
                "conv_general_dilated_patches filter_shape must have one entry per spatial dimension of lhs, got {:?} for lhs of rank {ndim}.",
                filter_shape
            )));
        }
        let dnums = spec
            .dimension_numbers
            .clone()
            .unwrap_or_else(|| ConvDimensionNumbers::default_for_rank(ndim));
        if dnums.lhs_spec.len() != ndim || dnums.rhs_spec.len() != ndim {
            return Err(LaxError::type_error(format!(
                "conv_general_dilated_patches dimension_numbers must have rank {ndim}."
            )));
        }
        let channels = lhs.shape().dims()[dnums.lhs_spec[1]];
        let patch_size: usize = filter_shape.iter().product();

        let mut rhs_dims = vec![0; ndim];
        rhs_dims[dnums.rhs_spec[0]] = channels * patch_size;
        rhs_dims[dnums.rhs_spec[1]] = 1;
        for (i, &size) in filter_shape.iter().enumerate() {
            rhs_dims[dnums.rhs_spec[2 + i]] = size;
        }
        let filter_strides = strides(filter_shape);
        let one_hot = IndexIter::new(&rhs_dims)
            .map(|idx| {
                let pos: Vec<usize> = (0..filter_shape.len()).map(|i| idx[dnums.rhs_spec[2 + i]]).collect();
                Scalar::Bool(idx[dnums.rhs_spec[0]] % patch_size == ravel(&pos, &filter_strides))
            })
            .collect();
        let rhs = Array::new(Shape::new(rhs_dims), lhs.dtype(), one_hot)?;

        let spec = ConvSpec {
            dimension_numbers: Some(dnums),
            feature_group_count: channels,
            batch_group_count: 1,
            ..spec
        };
        tracing::debug!(channels, patch_size, "conv_general_dilated_patches");
        self.conv_general_dilated(lhs, &rhs, spec)
    }

    pub fn dot_general(
        &self,
        lhs: &Array,
        rhs: &Array,
        dimension_numbers: DotDimensionNumbers,
        preferred_element_type: Option<DType>,
    ) -> Result<Array> {
        let spec = DotGeneralSpec {
            dimension_numbers,
            precision: None,
            preferred_element_type,
        };
        self.execute1(&Primitive::DotGeneral(spec), &[lhs, rhs])
    }

    /// Matrix product of two rank-2 arrays.
    pub fn dot(&self, lhs: &Array, rhs: &Array) -> Result<Array> {
        let dnums = DotDimensionNumbers {
            lhs_contracting: vec![1],
            rhs_contracting: vec![0],
            ..Default::default()
        };
        self.dot_general(lhs, rhs, dnums, None)
    }

    // ── gather / scatter ────────────────────────────────────────────────────

    pub fn gather(&self, operand: &Array, indices: &Array, spec: GatherSpec) -> Result<Array> {
        self.execute1(&Primitive::Gather(spec), &[operand, indices])
    }

    pub fn scatter_with(
        &self,
        kind: ScatterKind,
        operand: &Array,
        indices: &Array,
        updates: &Array,
        dimension_numbers: ScatterDimensionNumbers,
        mode: Option<GatherScatterMode>,
    ) -> Result<Array> {
        let mut spec = ScatterSpec::new(kind, dimension_numbers);
        spec.mode = mode;
        self.execute1(&Primitive::Scatter(spec), &[operand, indices, updates])
    }

    pub fn scatter(
        &self,
        operand: &Array,
        indices: &Array,
        updates: &Array,
        dimension_numbers: ScatterDimensionNumbers,
    ) -> Result<Array> {
        self.scatter_with(ScatterKind::Replace, operand, indices, updates, dimension_numbers, None)
    }

    pub fn scatter_add(
        &self,
        operand: &Array,
        indices: &Array,
        updates: &Array,
        dimension_numbers: ScatterDimensionNumbers,
    ) -> Result<Array> {
        self.scatter_with(ScatterKind::Add, operand, indices, updates, dimension_numbers, None)
    }

    /// Apply `op` at every addressed location. Only the shape of the index
    /// windows matters, so the updates are zeros of the operand dtype.
    pub fn scatter_apply(
        &self,
        op: UnaryOp,
        operand: &Array,
        indices: &Array,
        update_shape: &[usize],
        dimension_numbers: ScatterDimensionNumbers,
    ) -> Result<Array> {
        let updates = Array::zeros(&Shape::new(update_shape.to_vec()), operand.dtype());
        self.scatter_with(
            ScatterKind::Apply(op),
            operand,
            indices,
            &updates,
            dimension_numbers,
            None,
        )
    }

    /// Point gather of rank-1 `operand` at `indices` of shape `[n, 1]`.
    pub fn take(&self, operand: &Array, indices: &Array) -> Result<Array> {
        let spec = GatherSpec::new(
            GatherDimensionNumbers {
                offset_dims: vec![],
                collapsed_slice_dims: vec![0],
                start_index_map: vec![0],
            },
            vec![1],
        );
        self.gather(operand, indices, spec)
    }

    // ── sorting ─────────────────────────────────────────────────────────────

    pub fn sort(&self, operands: &[&Array], dimension: i64, is_stable: bool, num_keys: usize) -> Result<Vec<Array>> {
        let prim = Primitive::Sort {
            dimension,
            is_stable,
            num_keys,
        };
        self.execute(&prim, operands)
    }

    /// Sort `values` by `keys` along `dimension`; returns `(keys, values)`.
    pub fn sort_key_val(&self, keys: &Array, values: &Array, dimension: i64) -> Result<(Array, Array)> {
        let mut out = self.sort(&[keys, values], dimension, true, 1)?.into_iter();
        match (out.next(), out.next()) {
            (Some(k), Some(v)) => Ok((k, v)),
            _ => Err(LaxError::InvalidArgument("sort_key_val expects two outputs".into())),
        }
    }

    /// `(values, indices)` of the `k` largest entries along the last axis.
    pub fn top_k(&self, x: &Array, k: i64) -> Result<(Array, Array)> {
        let mut out = self.execute(&Primitive::TopK { k }, &[x])?.into_iter();
        match (out.next(), out.next()) {
            (Some(v), Some(i)) => Ok((v, i)),
            _ => Err(LaxError::InvalidArgument("top_k expects two outputs".into())),
        }
    }

    // ── structure ───────────────────────────────────────────────────────────

    pub fn pad(&self, x: &Array, padding_value: &Array, padding_config: &[(i64, i64, i64)]) -> Result<Array> {
        let prim = Primitive::Pad {
            padding_config: padding_config.to_vec(),
        };
        self.execute1(&prim, &[x, padding_value])
    }

    pub fn slice(
        &self,
        x: &Array,
        start_indices: &[usize],
        limit_indices: &[usize],
        strides: Option<&[usize]>,
    ) -> Result<Array> {
        let prim = Primitive::Slice {
            start_indices: start_indices.to_vec(),
            limit_indices: limit_indices.to_vec(),
            strides: strides.map(|s| s.to_vec()),
        };
        self.execute1(&prim, &[x])
    }

    pub fn dynamic_slice(&self, x: &Array, start_indices: &[&Array], slice_sizes: &[usize]) -> Result<Array> {
        let mut inputs = vec![x];
        inputs.extend_from_slice(start_indices);
        let prim = Primitive::DynamicSlice {
            slice_sizes: slice_sizes.to_vec(),
        };
        self.execute1(&prim, &inputs)
    }

    pub fn dynamic_update_slice(&self, x: &Array, update: &Array, start_indices: &[&Array]) -> Result<Array> {
        let mut inputs = vec![x, update];
        inputs.extend_from_slice(start_indices);
        self.execute1(&Primitive::DynamicUpdateSlice, &inputs)
    }

    pub fn broadcast_in_dim(&self, x: &Array, shape: &[usize], broadcast_dimensions: &[usize]) -> Result<Array> {
        let prim = Primitive::BroadcastInDim {
            shape: shape.to_vec(),
            broadcast_dimensions: broadcast_dimensions.to_vec(),
        };
        self.execute1(&prim, &[x])
    }

    pub fn transpose(&self, x: &Array, permutation: &[usize]) -> Result<Array> {
        let prim = Primitive::Transpose {
            permutation: permutation.to_vec(),
        };
        self.execute1(&prim, &[x])
    }

    pub fn reshape(&self, x: &Array, new_sizes: &[usize]) -> Result<Array> {
        let prim = Primitive::Reshape {
            new_sizes: new_sizes.to_vec(),
        };
        self.execute1(&prim, &[x])
    }

    pub fn squeeze(&self, x: &Array, dimensions: &[usize]) -> Result<Array> {
        let prim = Primitive::Squeeze {
            dimensions: dimensions.to_vec(),
        };
        self.execute1(&prim, &[x])
    }

    pub fn expand_dims(&self, x: &Array, dimensions: &[usize]) -> Result<Array> {
        let prim = Primitive::ExpandDims {
            dimensions: dimensions.to_vec(),
        };
        self.execute1(&prim, &[x])
    }

    pub fn rev(&self, x: &Array, dimensions: &[usize]) -> Result<Array> {
        let prim = Primitive::Rev {
            dimensions: dimensions.to_vec(),
        };
        self.execute1(&prim, &[x])
    }

    pub fn concatenate(&self, operands: &[&Array], dimension: usize) -> Result<Array> {
        self.execute1(&Primitive::Concatenate { dimension }, operands)
    }
}

fn is_identity(monoid: Monoid, init: &Array) -> bool {
    match (monoid.identity(init.dtype()), init.item()) {
        (Some(id), Ok(v)) => v == id,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lax_core::Config;

    use crate::backend::CpuRefBackend;

    fn engine() -> Engine {
        Engine::with_backend(Box::new(CpuRefBackend), Config::default())
    }

    #[test]
    fn test_literal_is_weak() {
        let e = engine();
        let lit = e.literal(2.0);
        assert!(lit.weak_type());
        assert_eq!(lit.dtype(), DType::F32);
        assert_eq!(e.literal(3i64).dtype(), DType::I32);
    }

    #[test]
    fn test_weak_literal_keeps_array_dtype() {
        let e = engine();
        let x = Array::new(vec![2], DType::BF16, vec![Scalar::Float(1.0), Scalar::Float(2.0)]).unwrap();
        let r = e.mul(&x, &e.literal(2.0)).unwrap();
        assert_eq!(r.dtype(), DType::BF16);
        assert!(!r.weak_type());
        assert_eq!(r.to_vec_f32(), vec![2.0, 4.0]);
    }

    #[test]
    fn test_reduce_picks_monoid_for_identity_init() {
        let e = engine();
        let x = Array::from_f32(&[1.0, 2.0, 3.0], &Shape::new(vec![3])).unwrap();
        let zero = Array::scalar(0.0, DType::F32);
        let r = e.reduce(&[&x], &[&zero], Computation::Monoid(Monoid::Sum), &[0]).unwrap();
        assert_eq!(r[0].to_vec_f32(), vec![6.0]);
        let ten = Array::scalar(10.0, DType::F32);
        let r = e.reduce(&[&x], &[&ten], Computation::Monoid(Monoid::Sum), &[0]).unwrap();
        assert_eq!(r[0].to_vec_f32(), vec![16.0]);
    }

    #[test]
    fn test_conv_string_padding() {
        let e = engine();
        let lhs = Array::ones(&Shape::new(vec![1, 3, 3, 1]), DType::F32);
        let rhs = Array::ones(&Shape::new(vec![3, 3, 1, 1]), DType::F32);
        let r = e
            .conv(&lhs, &rhs, &[1, 1], "SAME", Some(("NHWC", "HWIO", "NHWC")))
            .unwrap();
        assert_eq!(r.shape().dims(), &[1, 3, 3, 1]);
        assert_eq!(r.to_vec_f32(), vec![4.0, 6.0, 4.0, 6.0, 9.0, 6.0, 4.0, 6.0, 4.0]);
        assert!(e.conv(&lhs, &rhs, &[1, 1], "FULL", None).unwrap_err().is_value_error());
    }

    #[test]
    fn test_argmax_negative_axis() {
        let e = engine();
        let x = Array::from_f32(&[1.0, 5.0, 2.0, 7.0, 0.0, 7.0], &Shape::new(vec![2, 3])).unwrap();
        let r = e.argmax(&x, -1, DType::I32).unwrap();
        assert_eq!(r.to_vec_i64(), vec![1, 0]);
    }
}
