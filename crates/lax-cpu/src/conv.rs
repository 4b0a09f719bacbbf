//! Contractions: generalized dilated convolution and dot_general.
//!
//! Operands are converted to the promoted input dtype, products are
//! accumulated per output element in 64-bit (integers wrap) and the sum is
//! normalized to the output dtype, which may be a wider preferred type.

use num_complex::Complex64;
use rayon::prelude::*;

use lax_core::primitive::{ConvSpec, DotDimensionNumbers};
use lax_core::{Array, DType, DTypeKind, Result, Scalar, ShapedArray};
use lax_ops::convolution::free_dims;
use lax_ops::conv_geometry;

use crate::elementwise::binary_compute_dtype;
use crate::index::{IndexIter, build, strides, unravel};

/// Running sum of products in the widest type of the accumulating kind.
#[derive(Clone, Copy)]
enum Accumulator {
    Int(i64),
    UInt(u64),
    Float(f64),
    Complex(Complex64),
}

impl Accumulator {
    fn zero(dtype: DType) -> Self {
        match dtype.kind() {
            DTypeKind::Signed => Accumulator::Int(0),
            DTypeKind::Unsigned | DTypeKind::Bool => Accumulator::UInt(0),
            DTypeKind::Float => Accumulator::Float(0.0),
            DTypeKind::Complex => Accumulator::Complex(Complex64::new(0.0, 0.0)),
        }
    }

    fn add_product(&mut self, a: Scalar, b: Scalar) {
        match self {
            Accumulator::Int(acc) => *acc = acc.wrapping_add(a.as_i64().wrapping_mul(b.as_i64())),
            Accumulator::UInt(acc) => *acc = acc.wrapping_add(a.as_u64().wrapping_mul(b.as_u64())),
            Accumulator::Float(acc) => *acc += a.as_f64() * b.as_f64(),
            Accumulator::Complex(acc) => *acc += a.as_complex() * b.as_complex(),
        }
    }

    fn finish(self) -> Scalar {
        match self {
            Accumulator::Int(v) => Scalar::Int(v),
            Accumulator::UInt(v) => Scalar::UInt(v),
            Accumulator::Float(v) => Scalar::Float(v),
            Accumulator::Complex(v) => Scalar::Complex(v),
        }
    }
}

/// Inputs converted to the promoted dtype, and the accumulator dtype.
fn contraction_inputs(lhs: &Array, rhs: &Array, out: &ShapedArray) -> (Array, Array, DType) {
    let dtype = binary_compute_dtype(&lhs.aval(), &rhs.aval());
    let lhs = if lhs.dtype() == dtype { lhs.clone() } else { lhs.astype(dtype) };
    let rhs = if rhs.dtype() == dtype { rhs.clone() } else { rhs.astype(dtype) };
    let acc_dtype = if out.dtype.kind() == dtype.kind() { out.dtype } else { dtype };
    (lhs, rhs, acc_dtype)
}

// ── conv_general_dilated ────────────────────────────────────────────────────

pub fn conv_general_dilated(lhs: &Array, rhs: &Array, spec: &ConvSpec, out: &ShapedArray) -> Result<Array> {
    let geometry = conv_geometry(lhs.shape(), rhs.shape(), spec)?;
    let (lhs, rhs, acc_dtype) = contraction_inputs(lhs, rhs, out);
    let dn = &geometry.dnums;
    let nspatial = dn.num_spatial();

    let lhs_dims = lhs.shape().dims();
    let rhs_dims = rhs.shape().dims();
    let lhs_st = strides(lhs_dims);
    let rhs_st = strides(rhs_dims);
    let out_dims = geometry.out_shape.dims().to_vec();

    let fgc = spec.feature_group_count;
    let bgc = spec.batch_group_count;
    let rhs_in = rhs_dims[dn.rhs_spec[1]];
    let rhs_out = rhs_dims[dn.rhs_spec[0]];
    let out_batch = lhs_dims[dn.lhs_spec[0]] / bgc;
    let out_per_fgroup = rhs_out / fgc;
    let out_per_bgroup = rhs_out / bgc;

    let lhs_spatial: Vec<usize> = (0..nspatial).map(|i| lhs_dims[dn.lhs_spec[2 + i]]).collect();
    let kernel_spatial: Vec<usize> = (0..nspatial).map(|i| rhs_dims[dn.rhs_spec[2 + i]]).collect();
    let lhs_dilation = &spec.lhs_dilation;
    let rhs_dilation = &spec.rhs_dilation;
    let strides_ = &spec.window_strides;
    let pads = &geometry.padding;

    let data = (0..geometry.out_shape.numel())
        .into_par_iter()
        .map(|flat| {
            let out_idx = unravel(flat, &out_dims);
            let b = out_idx[dn.out_spec[0]];
            let o = out_idx[dn.out_spec[1]];
            let feature_group = o / out_per_fgroup;
            let lhs_batch = if bgc > 1 { (o / out_per_bgroup) * out_batch + b } else { b };

            let mut acc = Accumulator::zero(acc_dtype);
            for k in IndexIter::new(&kernel_spatial) {
                // Position of this kernel tap in the undilated lhs, if any.
                let mut lhs_off = lhs_batch * lhs_st[dn.lhs_spec[0]];
                let mut rhs_off = o * rhs_st[dn.rhs_spec[0]];
                let mut inside = true;
                for i in 0..nspatial {
                    let pos = (out_idx[dn.out_spec[2 + i]] * strides_[i]) as i64
                        + (k[i] * rhs_dilation[i]) as i64
                        - pads[i].0;
                    let dil = lhs_dilation[i] as i64;
                    if pos < 0 || pos % dil != 0 || pos / dil >= lhs_spatial[i] as i64 {
                        inside = false;
                        break;
                    }
                    lhs_off += (pos / dil) as usize * lhs_st[dn.lhs_spec[2 + i]];
                    rhs_off += k[i] * rhs_st[dn.rhs_spec[2 + i]];
                }
                if !inside {
                    continue;
                }
                for ci in 0..rhs_in {
                    let c = feature_group * rhs_in + ci;
                    let a = lhs.data()[lhs_off + c * lhs_st[dn.lhs_spec[1]]];
                    let w = rhs.data()[rhs_off + ci * rhs_st[dn.rhs_spec[1]]];
                    acc.add_product(a, w);
                }
            }
            acc.finish()
        })
        .collect();
    build(out, data)
}

// ── dot_general ─────────────────────────────────────────────────────────────

/// Output axes are batch dims, then lhs free dims, then rhs free dims.
pub fn dot_general(lhs: &Array, rhs: &Array, dnums: &DotDimensionNumbers, out: &ShapedArray) -> Result<Array> {
    let (lhs, rhs, acc_dtype) = contraction_inputs(lhs, rhs, out);
    let lhs_dims = lhs.shape().dims();
    let rhs_dims = rhs.shape().dims();
    let lhs_st = strides(lhs_dims);
    let rhs_st = strides(rhs_dims);
    let lhs_free = free_dims(lhs_dims.len(), &dnums.lhs_batch, &dnums.lhs_contracting);
    let rhs_free = free_dims(rhs_dims.len(), &dnums.rhs_batch, &dnums.rhs_contracting);
    let contract_dims: Vec<usize> = dnums.lhs_contracting.iter().map(|&a| lhs_dims[a]).collect();
    let out_dims = out.shape.dims().to_vec();
    let nb = dnums.lhs_batch.len();

    let data = (0..out.shape.numel())
        .into_par_iter()
        .map(|flat| {
            let out_idx = unravel(flat, &out_dims);
            let mut lhs_base = 0usize;
            let mut rhs_base = 0usize;
            for (i, (&la, &ra)) in dnums.lhs_batch.iter().zip(&dnums.rhs_batch).enumerate() {
                lhs_base += out_idx[i] * lhs_st[la];
                rhs_base += out_idx[i] * rhs_st[ra];
            }
            for (j, &la) in lhs_free.iter().enumerate() {
                lhs_base += out_idx[nb + j] * lhs_st[la];
            }
            for (j, &ra) in rhs_free.iter().enumerate() {
                rhs_base += out_idx[nb + lhs_free.len() + j] * rhs_st[ra];
            }
            let mut acc = Accumulator::zero(acc_dtype);
            for c in IndexIter::new(&contract_dims) {
                let mut lo = lhs_base;
                let mut ro = rhs_base;
                for (k, &ci) in c.iter().enumerate() {
                    lo += ci * lhs_st[dnums.lhs_contracting[k]];
                    ro += ci * rhs_st[dnums.rhs_contracting[k]];
                }
                acc.add_product(lhs.data()[lo], rhs.data()[ro]);
            }
            acc.finish()
        })
        .collect();
    build(out, data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use lax_core::Shape;
    use lax_core::primitive::{ConvDimensionNumbers, Padding};

    fn arr(data: &[f32], dims: &[usize]) -> Array {
        Array::from_f32(data, &Shape::new(dims.to_vec())).unwrap()
    }

    fn iota_f32(dims: &[usize]) -> Array {
        let n: usize = dims.iter().product();
        arr(&(0..n).map(|v| v as f32).collect::<Vec<_>>(), dims)
    }

    #[test]
    fn test_conv_1d_valid() {
        let lhs = arr(&[1.0, 2.0, 3.0, 4.0], &[1, 1, 4]);
        let rhs = arr(&[1.0, -1.0], &[1, 1, 2]);
        let spec = ConvSpec::new(vec![1], Padding::Valid);
        let out = ShapedArray::new(vec![1, 1, 3], DType::F32);
        let r = conv_general_dilated(&lhs, &rhs, &spec, &out).unwrap();
        assert_eq!(r.to_vec_f32(), vec![-1.0, -1.0, -1.0]);
    }

    #[test]
    fn test_conv_1x1_sums_features() {
        let lhs = iota_f32(&[1, 2, 3, 3]);
        let rhs = arr(&[1.0, 1.0], &[1, 2, 1, 1]);
        let spec = ConvSpec::new(vec![1, 1], Padding::Valid);
        let out = ShapedArray::new(vec![1, 1, 3, 3], DType::F32);
        let r = conv_general_dilated(&lhs, &rhs, &spec, &out).unwrap();
        let expected: Vec<f32> = (0..9).map(|i| i as f32 + (i + 9) as f32).collect();
        assert_eq!(r.to_vec_f32(), expected);
    }

    #[test]
    fn test_conv_same_padding_1d() {
        let lhs = arr(&[1.0, 2.0, 3.0], &[1, 1, 3]);
        let rhs = arr(&[1.0, 1.0, 1.0], &[1, 1, 3]);
        let spec = ConvSpec::new(vec![1], Padding::Same);
        let out = ShapedArray::new(vec![1, 1, 3], DType::F32);
        let r = conv_general_dilated(&lhs, &rhs, &spec, &out).unwrap();
        assert_eq!(r.to_vec_f32(), vec![3.0, 6.0, 5.0]);
    }

    #[test]
    fn test_conv_lhs_dilation() {
        // lhs dilated to [1, 0, 2], kernel [1, 1]
        let lhs = arr(&[1.0, 2.0], &[1, 1, 2]);
        let rhs = arr(&[1.0, 1.0], &[1, 1, 2]);
        let spec = ConvSpec::new(vec![1], Padding::Valid).with_dilation(vec![2], vec![1]);
        let out = ShapedArray::new(vec![1, 1, 2], DType::F32);
        let r = conv_general_dilated(&lhs, &rhs, &spec, &out).unwrap();
        assert_eq!(r.to_vec_f32(), vec![1.0, 2.0]);
    }

    #[test]
    fn test_conv_feature_groups() {
        // depthwise: 2 input features, 2 groups, each output sees one channel
        let lhs = arr(&[1.0, 2.0, 10.0, 20.0], &[1, 2, 2]);
        let rhs = arr(&[1.0, 3.0], &[2, 1, 1]);
        let spec = ConvSpec::new(vec![1], Padding::Valid).with_feature_group_count(2);
        let out = ShapedArray::new(vec![1, 2, 2], DType::F32);
        let r = conv_general_dilated(&lhs, &rhs, &spec, &out).unwrap();
        assert_eq!(r.to_vec_f32(), vec![1.0, 2.0, 30.0, 60.0]);
    }

    #[test]
    fn test_conv_batch_groups() {
        // batch 2 split into 2 groups; output feature g reads batch g
        let lhs = arr(&[1.0, 2.0, 3.0, 4.0], &[2, 1, 2]);
        let rhs = arr(&[1.0, 10.0], &[2, 1, 1]);
        let spec = ConvSpec::new(vec![1], Padding::Valid).with_batch_group_count(2);
        let out = ShapedArray::new(vec![1, 2, 2], DType::F32);
        let r = conv_general_dilated(&lhs, &rhs, &spec, &out).unwrap();
        assert_eq!(r.to_vec_f32(), vec![1.0, 2.0, 30.0, 40.0]);
    }

    #[test]
    fn test_conv0d_matches_dot() {
        let lhs = iota_f32(&[3, 4]);
        let rhs = iota_f32(&[4, 2]);
        let dn = ConvDimensionNumbers::from_strings("NC", "IO", "NC").unwrap();
        let spec = ConvSpec::new(vec![], Padding::Valid).with_dimension_numbers(dn);
        let out = ShapedArray::new(vec![3, 2], DType::F32);
        let conv = conv_general_dilated(&lhs, &rhs, &spec, &out).unwrap();
        let dnums = DotDimensionNumbers {
            lhs_contracting: vec![1],
            rhs_contracting: vec![0],
            ..Default::default()
        };
        let dot = dot_general(&lhs, &rhs, &dnums, &out).unwrap();
        assert_eq!(conv, dot);
    }

    #[test]
    fn test_dot_general_batched() {
        let lhs = iota_f32(&[2, 2, 3]);
        let rhs = arr(&[1.0; 12], &[2, 3, 2]);
        let dnums = DotDimensionNumbers {
            lhs_contracting: vec![2],
            rhs_contracting: vec![1],
            lhs_batch: vec![0],
            rhs_batch: vec![0],
        };
        let out = ShapedArray::new(vec![2, 2, 2], DType::F32);
        let r = dot_general(&lhs, &rhs, &dnums, &out).unwrap();
        assert_eq!(r.to_vec_f32(), vec![3.0, 3.0, 12.0, 12.0, 21.0, 21.0, 30.0, 30.0]);
    }

    #[test]
    fn test_preferred_element_type_accumulates_wide() {
        let lhs = Array::new(vec![2], DType::I8, vec![Scalar::Int(100), Scalar::Int(100)]).unwrap();
        let rhs = lhs.clone();
        let dnums = DotDimensionNumbers {
            lhs_contracting: vec![0],
            rhs_contracting: vec![0],
            ..Default::default()
        };
        let out = ShapedArray::new(Shape::scalar(), DType::I32);
        let r = dot_general(&lhs, &rhs, &dnums, &out).unwrap();
        assert_eq!(r.to_vec_i64(), vec![20000]);
    }
}
