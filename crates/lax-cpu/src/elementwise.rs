//! Elementwise executors: unary, binary (numpy-broadcast), select, clamp,
//! the type conversions, regularized_incomplete_beta and iota.
//!
//! Values are computed in 64-bit per dtype kind and re-normalized to the
//! output dtype, so narrow integer arithmetic wraps and narrow floats round.

use half::{bf16, f16};
use num_complex::Complex64;
use rayon::prelude::*;

use lax_core::primitive::{BinaryOp, RoundingMethod, UnaryOp};
use lax_core::scalar::unsigned_max;
use lax_core::{Array, DType, DTypeKind, LaxError, Result, Scalar, ShapedArray};
use lax_ops::dtype_promotion::{ElemType, promote_weak};

use crate::index::{IndexIter, build, strides, unravel};
use crate::special;

// ── Broadcasting ──────────────────────────────────────────────────────────

/// Flat source offset into an operand of `dims` for an output multi-index,
/// with numpy right-aligned broadcasting.
fn broadcast_offset(out_idx: &[usize], dims: &[usize], strides: &[usize]) -> usize {
    let lead = out_idx.len() - dims.len();
    dims.iter()
        .zip(strides)
        .enumerate()
        .map(|(i, (&d, &s))| if d == 1 { 0 } else { out_idx[lead + i] * s })
        .sum()
}

/// Read `x` at every position of `out_dims`, broadcasting as needed.
fn broadcast_read(x: &Array, out_dims: &[usize]) -> Vec<Scalar> {
    if x.shape().dims() == out_dims {
        return x.data().to_vec();
    }
    let dims = x.shape().dims();
    let st = strides(dims);
    let data = x.data();
    IndexIter::new(out_dims)
        .map(|idx| data[broadcast_offset(&idx, dims, &st)])
        .collect()
}

// ── Unary ─────────────────────────────────────────────────────────────────

pub fn unary(op: UnaryOp, x: &Array, out: &ShapedArray) -> Result<Array> {
    let dtype = x.dtype();
    let data = x
        .data()
        .par_iter()
        .map(|&v| unary_scalar(op, v, dtype))
        .collect::<Result<Vec<_>>>()?;
    build(out, data)
}

fn unsupported(op: &str, dtype: DType) -> LaxError {
    LaxError::dtype_error(format!("{op} does not accept dtype {dtype}."))
}

/// Apply `op` to one element of dtype `dtype`. The result is not yet
/// normalized to the output dtype.
pub fn unary_scalar(op: UnaryOp, v: Scalar, dtype: DType) -> Result<Scalar> {
    match dtype.kind() {
        DTypeKind::Bool => match op {
            UnaryOp::Not => Ok(Scalar::Bool(!v.as_bool())),
            _ => Err(unsupported(op.name(), dtype)),
        },
        DTypeKind::Signed => int_unary(op, v.as_i64(), dtype),
        DTypeKind::Unsigned => uint_unary(op, v.as_u64(), dtype),
        DTypeKind::Float => {
            if op == UnaryOp::IsFinite {
                return Ok(Scalar::Bool(v.as_f64().is_finite()));
            }
            float_unary(op, v.as_f64()).map(Scalar::Float).ok_or_else(|| unsupported(op.name(), dtype))
        }
        DTypeKind::Complex => complex_unary(op, v.as_complex()).ok_or_else(|| unsupported(op.name(), dtype)),
    }
}

fn bit_mask(bits: u32) -> u64 {
    if bits >= 64 { u64::MAX } else { (1u64 << bits) - 1 }
}

fn int_unary(op: UnaryOp, v: i64, dtype: DType) -> Result<Scalar> {
    let bits = dtype.bits();
    let r = match op {
        UnaryOp::Neg => v.wrapping_neg(),
        UnaryOp::Sign => v.signum(),
        UnaryOp::Abs => v.wrapping_abs(),
        UnaryOp::Square => v.wrapping_mul(v),
        UnaryOp::IntegerPow(n) => {
            if n < 0 {
                return Err(LaxError::domain(format!(
                    "integer_pow with negative exponent {n} requires an inexact dtype, got {dtype}"
                )));
            }
            v.wrapping_pow(n as u32)
        }
        UnaryOp::Not => !v,
        UnaryOp::PopulationCount => i64::from((v as u64 & bit_mask(bits)).count_ones()),
        UnaryOp::Clz => i64::from((v as u64 & bit_mask(bits)).leading_zeros() - (64 - bits)),
        _ => return Err(unsupported(op.name(), dtype)),
    };
    Ok(Scalar::Int(r))
}

fn uint_unary(op: UnaryOp, v: u64, dtype: DType) -> Result<Scalar> {
    let bits = dtype.bits();
    let r = match op {
        UnaryOp::Neg => v.wrapping_neg(),
        UnaryOp::Sign => v.min(1),
        UnaryOp::Square => v.wrapping_mul(v),
        UnaryOp::IntegerPow(n) => {
            if n < 0 {
                return Err(LaxError::domain(format!(
                    "integer_pow with negative exponent {n} requires an inexact dtype, got {dtype}"
                )));
            }
            v.wrapping_pow(n as u32)
        }
        UnaryOp::Not => !v,
        UnaryOp::PopulationCount => u64::from(v.count_ones()),
        UnaryOp::Clz => u64::from((v & bit_mask(bits)).leading_zeros() - (64 - bits)),
        _ => return Err(unsupported(op.name(), dtype)),
    };
    Ok(Scalar::UInt(r))
}

fn float_unary(op: UnaryOp, x: f64) -> Option<f64> {
    let r = match op {
        UnaryOp::Neg => -x,
        UnaryOp::Sign => {
            if x.is_nan() || x == 0.0 {
                x
            } else {
                x.signum()
            }
        }
        UnaryOp::Floor => x.floor(),
        UnaryOp::Ceil => x.ceil(),
        UnaryOp::Round(RoundingMethod::AwayFromZero) => x.round(),
        UnaryOp::Round(RoundingMethod::ToNearestEven) => x.round_ties_even(),
        UnaryOp::Exp => x.exp(),
        UnaryOp::Exp2 => libm::exp2(x),
        UnaryOp::Expm1 => libm::expm1(x),
        UnaryOp::Log => x.ln(),
        UnaryOp::Log1p => libm::log1p(x),
        UnaryOp::Tanh => x.tanh(),
        UnaryOp::Logistic => 1.0 / (1.0 + (-x).exp()),
        UnaryOp::Sin => x.sin(),
        UnaryOp::Cos => x.cos(),
        UnaryOp::Tan => x.tan(),
        UnaryOp::Asin => x.asin(),
        UnaryOp::Acos => x.acos(),
        UnaryOp::Atan => x.atan(),
        UnaryOp::Sinh => x.sinh(),
        UnaryOp::Cosh => x.cosh(),
        UnaryOp::Asinh => libm::asinh(x),
        UnaryOp::Acosh => libm::acosh(x),
        UnaryOp::Atanh => libm::atanh(x),
        UnaryOp::Sqrt => x.sqrt(),
        UnaryOp::Rsqrt => 1.0 / x.sqrt(),
        UnaryOp::Cbrt => libm::cbrt(x),
        UnaryOp::Square => x * x,
        UnaryOp::IntegerPow(n) => x.powi(n),
        UnaryOp::Reciprocal => 1.0 / x,
        UnaryOp::Lgamma => libm::lgamma(x),
        UnaryOp::Digamma => special::digamma(x),
        UnaryOp::Erf => libm::erf(x),
        UnaryOp::Erfc => libm::erfc(x),
        UnaryOp::ErfInv => special::erf_inv(x),
        UnaryOp::BesselI0e => special::bessel_i0e(x),
        UnaryOp::BesselI1e => special::bessel_i1e(x),
        UnaryOp::Abs => x.abs(),
        _ => return None,
    };
    Some(r)
}

fn complex_unary(op: UnaryOp, z: Complex64) -> Option<Scalar> {
    let one = Complex64::new(1.0, 0.0);
    let r = match op {
        UnaryOp::Real => return Some(Scalar::Float(z.re)),
        UnaryOp::Imag => return Some(Scalar::Float(z.im)),
        UnaryOp::Abs => return Some(Scalar::Float(z.norm())),
        UnaryOp::Neg => -z,
        UnaryOp::Sign => {
            let n = z.norm();
            if n == 0.0 { z } else { z / n }
        }
        UnaryOp::Exp => z.exp(),
        UnaryOp::Expm1 => z.exp() - one,
        UnaryOp::Log => z.ln(),
        UnaryOp::Log1p => (z + one).ln(),
        UnaryOp::Tanh => z.tanh(),
        UnaryOp::Logistic => one / (one + (-z).exp()),
        UnaryOp::Sin => z.sin(),
        UnaryOp::Cos => z.cos(),
        UnaryOp::Tan => z.tan(),
        UnaryOp::Asin => z.asin(),
        UnaryOp::Acos => z.acos(),
        UnaryOp::Atan => z.atan(),
        UnaryOp::Sinh => z.sinh(),
        UnaryOp::Cosh => z.cosh(),
        UnaryOp::Asinh => z.asinh(),
        UnaryOp::Acosh => z.acosh(),
        UnaryOp::Atanh => z.atanh(),
        UnaryOp::Sqrt => z.sqrt(),
        UnaryOp::Rsqrt => one / z.sqrt(),
        UnaryOp::Square => z * z,
        UnaryOp::IntegerPow(n) => z.powi(n),
        UnaryOp::Reciprocal => one / z,
        UnaryOp::Conj => z.conj(),
        _ => return None,
    };
    Some(Scalar::Complex(r))
}

// ── Binary ────────────────────────────────────────────────────────────────

/// Dtype both operands are converted to before a binary op.
pub fn binary_compute_dtype(x: &ShapedArray, y: &ShapedArray) -> DType {
    promote_weak(ElemType::of(x), ElemType::of(y)).dtype
}

pub fn binary(op: BinaryOp, x: &Array, y: &Array, out: &ShapedArray) -> Result<Array> {
    let dtype = binary_compute_dtype(&x.aval(), &y.aval());
    let out_dims = out.shape.dims();
    let xs = broadcast_read(x, out_dims);
    let ys = broadcast_read(y, out_dims);
    let data = xs
        .par_iter()
        .zip(ys.par_iter())
        .map(|(&a, &b)| binary_scalar(op, a.cast(dtype), b.cast(dtype), dtype))
        .collect::<Result<Vec<_>>>()?;
    build(out, data)
}

/// Apply `op` to two elements already normalized to `dtype`.
pub fn binary_scalar(op: BinaryOp, a: Scalar, b: Scalar, dtype: DType) -> Result<Scalar> {
    match dtype.kind() {
        DTypeKind::Bool => bool_binary(op, a.as_bool(), b.as_bool()).ok_or_else(|| unsupported(op.name(), dtype)),
        DTypeKind::Signed => int_binary(op, a.as_i64(), b.as_i64(), dtype),
        DTypeKind::Unsigned => uint_binary(op, a.as_u64(), b.as_u64(), dtype),
        DTypeKind::Float => float_binary(op, a.as_f64(), b.as_f64(), dtype).ok_or_else(|| unsupported(op.name(), dtype)),
        DTypeKind::Complex => {
            complex_binary(op, a.as_complex(), b.as_complex()).ok_or_else(|| unsupported(op.name(), dtype))
        }
    }
}

fn bool_binary(op: BinaryOp, a: bool, b: bool) -> Option<Scalar> {
    let r = match op {
        BinaryOp::Add | BinaryOp::Or | BinaryOp::Max => a || b,
        BinaryOp::Mul | BinaryOp::And | BinaryOp::Min => a && b,
        BinaryOp::Xor | BinaryOp::Ne => a != b,
        BinaryOp::Eq => a == b,
        BinaryOp::Lt => !a && b,
        BinaryOp::Le => !a || b,
        BinaryOp::Gt => a && !b,
        BinaryOp::Ge => a || !b,
        _ => return None,
    };
    Some(Scalar::Bool(r))
}

fn compare<T: PartialOrd>(op: BinaryOp, a: T, b: T) -> Option<bool> {
    Some(match op {
        BinaryOp::Eq => a == b,
        BinaryOp::Ne => a != b,
        BinaryOp::Lt => a < b,
        BinaryOp::Le => a <= b,
        BinaryOp::Gt => a > b,
        BinaryOp::Ge => a >= b,
        _ => return None,
    })
}

fn division_by_zero(op: BinaryOp, dtype: DType) -> LaxError {
    LaxError::domain(format!("integer {} by zero for dtype {dtype}", op.name()))
}

fn int_pow(base: i64, exp: i64) -> i64 {
    if exp < 0 {
        return match base {
            1 => 1,
            -1 if exp % 2 == 0 => 1,
            -1 => -1,
            _ => 0,
        };
    }
    base.wrapping_pow(exp.min(i64::from(u32::MAX)) as u32)
}

fn int_binary(op: BinaryOp, a: i64, b: i64, dtype: DType) -> Result<Scalar> {
    if let Some(c) = compare(op, a, b) {
        return Ok(Scalar::Bool(c));
    }
    let bits = i64::from(dtype.bits());
    let r = match op {
        BinaryOp::Add => a.wrapping_add(b),
        BinaryOp::Sub => a.wrapping_sub(b),
        BinaryOp::Mul => a.wrapping_mul(b),
        BinaryOp::Div | BinaryOp::Rem if b == 0 => return Err(division_by_zero(op, dtype)),
        BinaryOp::Div => a.wrapping_div(b),
        BinaryOp::Rem => a.wrapping_rem(b),
        BinaryOp::Pow => int_pow(a, b),
        BinaryOp::Max => a.max(b),
        BinaryOp::Min => a.min(b),
        BinaryOp::And => a & b,
        BinaryOp::Or => a | b,
        BinaryOp::Xor => a ^ b,
        BinaryOp::ShiftLeft => {
            if (0..bits).contains(&b) {
                a.wrapping_shl(b as u32)
            } else {
                0
            }
        }
        BinaryOp::ShiftRightLogical => {
            if (0..bits).contains(&b) {
                ((a as u64 & bit_mask(bits as u32)) >> b) as i64
            } else {
                0
            }
        }
        BinaryOp::ShiftRightArithmetic => {
            if (0..bits).contains(&b) {
                a >> b
            } else if a < 0 {
                -1
            } else {
                0
            }
        }
        _ => return Err(unsupported(op.name(), dtype)),
    };
    Ok(Scalar::Int(r))
}

fn uint_binary(op: BinaryOp, a: u64, b: u64, dtype: DType) -> Result<Scalar> {
    if let Some(c) = compare(op, a, b) {
        return Ok(Scalar::Bool(c));
    }
    let bits = u64::from(dtype.bits());
    let r = match op {
        BinaryOp::Add => a.wrapping_add(b),
        BinaryOp::Sub => a.wrapping_sub(b),
        BinaryOp::Mul => a.wrapping_mul(b),
        BinaryOp::Div | BinaryOp::Rem if b == 0 => return Err(division_by_zero(op, dtype)),
        BinaryOp::Div => a / b,
        BinaryOp::Rem => a % b,
        BinaryOp::Pow => a.wrapping_pow(b.min(u64::from(u32::MAX)) as u32),
        BinaryOp::Max => a.max(b),
        BinaryOp::Min => a.min(b),
        BinaryOp::And => a & b,
        BinaryOp::Or => a | b,
        BinaryOp::Xor => a ^ b,
        BinaryOp::ShiftLeft => {
            if b < bits {
                a.wrapping_shl(b as u32)
            } else {
                0
            }
        }
        BinaryOp::ShiftRightLogical => {
            if b < bits {
                a >> b
            } else {
                0
            }
        }
        BinaryOp::ShiftRightArithmetic => {
            // Shift the two's complement reading of the bit pattern.
            let signed = Scalar::UInt(a).cast(signed_twin(dtype)).as_i64();
            let shifted = if b < bits {
                signed >> b
            } else if signed < 0 {
                -1
            } else {
                0
            };
            return Ok(Scalar::Int(shifted).cast(dtype));
        }
        _ => return Err(unsupported(op.name(), dtype)),
    };
    Ok(Scalar::UInt(r))
}

fn signed_twin(dtype: DType) -> DType {
    match dtype {
        DType::U8 => DType::I8,
        DType::U16 => DType::I16,
        DType::U32 => DType::I32,
        _ => DType::I64,
    }
}

fn nextafter_half(x: f64, y: f64, to_bits: fn(f64) -> u16, from_bits: fn(u16) -> f64) -> f64 {
    if x.is_nan() || y.is_nan() {
        return f64::NAN;
    }
    if x == y {
        return y;
    }
    if x == 0.0 {
        let tiny = from_bits(1);
        return if y > 0.0 { tiny } else { -tiny };
    }
    let bits = to_bits(x);
    let away_from_zero = (y > x) == (x > 0.0);
    from_bits(if away_from_zero { bits + 1 } else { bits - 1 })
}

fn nextafter(x: f64, y: f64, dtype: DType) -> f64 {
    match dtype {
        DType::F32 => f64::from(libm::nextafterf(x as f32, y as f32)),
        DType::F16 => nextafter_half(x, y, |v| f16::from_f64(v).to_bits(), |b| f16::from_bits(b).to_f64()),
        DType::BF16 => nextafter_half(x, y, |v| bf16::from_f64(v).to_bits(), |b| bf16::from_bits(b).to_f64()),
        _ => libm::nextafter(x, y),
    }
}

fn float_binary(op: BinaryOp, a: f64, b: f64, dtype: DType) -> Option<Scalar> {
    if let Some(c) = compare(op, a, b) {
        return Some(Scalar::Bool(c));
    }
    let r = match op {
        BinaryOp::Add => a + b,
        BinaryOp::Sub => a - b,
        BinaryOp::Mul => a * b,
        BinaryOp::Div => a / b,
        BinaryOp::Rem => a % b,
        BinaryOp::Pow => a.powf(b),
        BinaryOp::Max => {
            if a.is_nan() || b.is_nan() {
                f64::NAN
            } else {
                a.max(b)
            }
        }
        BinaryOp::Min => {
            if a.is_nan() || b.is_nan() {
                f64::NAN
            } else {
                a.min(b)
            }
        }
        BinaryOp::Atan2 => libm::atan2(a, b),
        BinaryOp::Nextafter => nextafter(a, b, dtype),
        BinaryOp::Complex => return Some(Scalar::Complex(Complex64::new(a, b))),
        BinaryOp::Igamma => special::igamma(a, b),
        BinaryOp::Igammac => special::igammac(a, b),
        _ => return None,
    };
    Some(Scalar::Float(r))
}

fn complex_pow(a: Complex64, b: Complex64) -> Complex64 {
    if b.re == 0.0 && b.im == 0.0 {
        return Complex64::new(1.0, 0.0);
    }
    if a.re == 0.0 && a.im == 0.0 {
        return if b.im == 0.0 && b.re > 0.0 {
            Complex64::new(0.0, 0.0)
        } else {
            Complex64::new(f64::NAN, f64::NAN)
        };
    }
    a.powc(b)
}

fn complex_binary(op: BinaryOp, a: Complex64, b: Complex64) -> Option<Scalar> {
    let lex = Scalar::Complex(a).total_cmp(&Scalar::Complex(b));
    let r = match op {
        BinaryOp::Eq => return Some(Scalar::Bool(a == b)),
        BinaryOp::Ne => return Some(Scalar::Bool(a != b)),
        BinaryOp::Add => a + b,
        BinaryOp::Sub => a - b,
        BinaryOp::Mul => a * b,
        BinaryOp::Div => a / b,
        BinaryOp::Pow => complex_pow(a, b),
        BinaryOp::Max => {
            if lex.is_ge() { a } else { b }
        }
        BinaryOp::Min => {
            if lex.is_le() { a } else { b }
        }
        _ => return None,
    };
    Some(Scalar::Complex(r))
}

// ── Ternary and conversions ─────────────────────────────────────────────────

/// `pred` is a scalar or matches the case shape.
pub fn select(pred: &Array, on_true: &Array, on_false: &Array, out: &ShapedArray) -> Result<Array> {
    let n = out.shape.numel();
    let scalar_pred = pred.shape().is_scalar();
    let data = (0..n)
        .map(|i| {
            let p = if scalar_pred { pred.data()[0] } else { pred.data()[i] };
            if p.as_bool() {
                on_true.data()[i]
            } else {
                on_false.data()[i]
            }
        })
        .collect();
    build(out, data)
}

/// `min(max(x, lo), hi)`; bounds are scalars or match `x`.
pub fn clamp(lo: &Array, x: &Array, hi: &Array, out: &ShapedArray) -> Result<Array> {
    let dtype = out.dtype;
    let pick = |a: &Array, i: usize| {
        if a.shape().is_scalar() {
            a.data()[0].cast(dtype)
        } else {
            a.data()[i].cast(dtype)
        }
    };
    let data = (0..x.numel())
        .map(|i| {
            let v = binary_scalar(BinaryOp::Max, x.data()[i].cast(dtype), pick(lo, i), dtype)?;
            binary_scalar(BinaryOp::Min, v, pick(hi, i), dtype)
        })
        .collect::<Result<Vec<_>>>()?;
    build(out, data)
}

pub fn convert_element_type(x: &Array, out: &ShapedArray) -> Result<Array> {
    Ok(x.astype(out.dtype).with_weak_type(out.weak_type))
}

/// Bit pattern of `v` stored as `dtype`, in the low `dtype.bits()` bits.
fn element_bits(v: Scalar, dtype: DType) -> u64 {
    match dtype {
        DType::F16 => u64::from(f16::from_f64(v.as_f64()).to_bits()),
        DType::BF16 => u64::from(bf16::from_f64(v.as_f64()).to_bits()),
        DType::F32 => u64::from((v.as_f64() as f32).to_bits()),
        DType::F64 => v.as_f64().to_bits(),
        _ => v.as_u64() & unsigned_max(dtype.bits()),
    }
}

fn from_element_bits(bits: u64, dtype: DType) -> Scalar {
    match dtype {
        DType::F16 => Scalar::Float(f16::from_bits(bits as u16).to_f64()),
        DType::BF16 => Scalar::Float(bf16::from_bits(bits as u16).to_f64()),
        DType::F32 => Scalar::Float(f64::from(f32::from_bits(bits as u32))),
        DType::F64 => Scalar::Float(f64::from_bits(bits)),
        _ => Scalar::UInt(bits).cast(dtype),
    }
}

pub fn bitcast_convert_type(x: &Array, out: &ShapedArray) -> Result<Array> {
    let (from, to) = (x.dtype(), out.dtype);
    if from == to {
        return build(out, x.data().to_vec());
    }
    let (from_bits, to_bits) = (from.bits(), to.bits());
    let data: Vec<Scalar> = if from_bits == to_bits {
        x.data()
            .iter()
            .map(|&v| from_element_bits(element_bits(v, from), to))
            .collect()
    } else if from_bits > to_bits {
        // Split each element into little-endian pieces along a new last axis.
        let mask = unsigned_max(to_bits);
        x.data()
            .iter()
            .flat_map(|&v| {
                let bits = element_bits(v, from);
                (0..from_bits / to_bits).map(move |k| from_element_bits((bits >> (k * to_bits)) & mask, to))
            })
            .collect()
    } else {
        x.data()
            .chunks((to_bits / from_bits) as usize)
            .map(|piece| {
                let bits = piece
                    .iter()
                    .enumerate()
                    .fold(0u64, |acc, (k, &v)| acc | (element_bits(v, from) << (k as u32 * from_bits)));
                from_element_bits(bits, to)
            })
            .collect()
    };
    build(out, data)
}

/// Round `x` to a float format with the given field widths, ties to even.
/// Overflow goes to infinity and values below the smallest normal of the
/// narrow format flush to signed zero.
pub fn reduce_precision_f64(x: f64, exponent_bits: u32, mantissa_bits: u32) -> f64 {
    const MANTISSA_BITS: u32 = 52;
    const EXPONENT_BITS: u32 = 11;
    const EXPONENT_BIAS: u64 = 1023;
    if x.is_nan() {
        return if mantissa_bits > 0 { x } else { f64::INFINITY };
    }
    let mut bits = x.to_bits();
    if mantissa_bits < MANTISSA_BITS {
        let shift = MANTISSA_BITS - mantissa_bits;
        let last_kept = 1u64 << shift;
        let bias = (last_kept >> 1) - 1 + ((bits & last_kept) >> shift);
        bits = bits.wrapping_add(bias) & !(last_kept - 1);
    }
    if exponent_bits < EXPONENT_BITS {
        let exponent_mask = ((1u64 << EXPONENT_BITS) - 1) << MANTISSA_BITS;
        let signed_zero = bits & (1u64 << 63);
        let reduced_bias = (1u64 << (exponent_bits - 1)) - 1;
        let max_exponent = (EXPONENT_BIAS + reduced_bias) << MANTISSA_BITS;
        let min_exponent = (EXPONENT_BIAS - reduced_bias) << MANTISSA_BITS;
        let exponent = bits & exponent_mask;
        if exponent > max_exponent {
            bits = signed_zero | exponent_mask;
        } else if exponent <= min_exponent {
            bits = signed_zero;
        }
    }
    f64::from_bits(bits)
}

pub fn reduce_precision(x: &Array, exponent_bits: i32, mantissa_bits: i32, out: &ShapedArray) -> Result<Array> {
    let (e, m) = (exponent_bits.max(1) as u32, mantissa_bits.max(0) as u32);
    let data = x
        .data()
        .par_iter()
        .map(|v| Scalar::Float(reduce_precision_f64(v.as_f64(), e, m)))
        .collect();
    build(out, data)
}

pub fn regularized_incomplete_beta(a: &Array, b: &Array, x: &Array, out: &ShapedArray) -> Result<Array> {
    let dims = out.shape.dims();
    let (a, b, x) = (broadcast_read(a, dims), broadcast_read(b, dims), broadcast_read(x, dims));
    let data = a
        .par_iter()
        .zip(b.par_iter())
        .zip(x.par_iter())
        .map(|((a, b), x)| Scalar::Float(special::betainc(a.as_f64(), b.as_f64(), x.as_f64())))
        .collect();
    build(out, data)
}

pub fn iota(dimension: usize, out: &ShapedArray) -> Result<Array> {
    let dims = out.shape.dims();
    let data = (0..out.shape.numel())
        .map(|flat| Scalar::UInt(unravel(flat, dims)[dimension] as u64))
        .collect();
    build(out, data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use lax_core::Shape;

    fn arr_f32(data: &[f32], dims: &[usize]) -> Array {
        Array::from_f32(data, &Shape::new(dims.to_vec())).unwrap()
    }

    #[test]
    fn test_binary_broadcast_add() {
        let x = arr_f32(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0], &[2, 3]);
        let y = arr_f32(&[10.0, 20.0, 30.0], &[3]);
        let out = ShapedArray::new(vec![2, 3], DType::F32);
        let r = binary(BinaryOp::Add, &x, &y, &out).unwrap();
        assert_eq!(r.to_vec_f32(), vec![11.0, 22.0, 33.0, 14.0, 25.0, 36.0]);
    }

    #[test]
    fn test_weak_scalar_adopts_strong_dtype() {
        let x = Array::from_i32(&[1, 2], &Shape::new(vec![2])).unwrap().astype(DType::I8);
        let two = Array::weak_scalar(2.9f64, DType::F32);
        // weak float literal is converted to int8 (truncation) before multiplying
        let out = ShapedArray::new(vec![2], DType::I8);
        let r = binary(BinaryOp::Mul, &x, &two, &out).unwrap();
        assert_eq!(r.to_vec_i64(), vec![2, 4]);
    }

    #[test]
    fn test_integer_division_by_zero_is_domain_error() {
        let x = Array::from_i32(&[1], &Shape::new(vec![1])).unwrap();
        let z = Array::from_i32(&[0], &Shape::new(vec![1])).unwrap();
        let out = ShapedArray::new(vec![1], DType::I32);
        let err = binary(BinaryOp::Div, &x, &z, &out).unwrap_err();
        assert!(matches!(err, LaxError::Domain(_)));
        assert!(binary(BinaryOp::Rem, &x, &z, &out).is_err());
    }

    #[test]
    fn test_int_div_rem_truncate() {
        let a = Scalar::Int(-7);
        let b = Scalar::Int(2);
        assert_eq!(binary_scalar(BinaryOp::Div, a, b, DType::I32).unwrap(), Scalar::Int(-3));
        assert_eq!(binary_scalar(BinaryOp::Rem, a, b, DType::I32).unwrap(), Scalar::Int(-1));
    }

    #[test]
    fn test_float_rem_follows_dividend_sign() {
        let r = binary_scalar(BinaryOp::Rem, Scalar::Float(-5.5), Scalar::Float(2.0), DType::F32).unwrap();
        assert_eq!(r, Scalar::Float(-1.5));
    }

    #[test]
    fn test_narrow_int_wraps() {
        let x = Array::new(vec![1], DType::I8, vec![Scalar::Int(127)]).unwrap();
        let one = Array::new(vec![1], DType::I8, vec![Scalar::Int(1)]).unwrap();
        let out = ShapedArray::new(vec![1], DType::I8);
        let r = binary(BinaryOp::Add, &x, &one, &out).unwrap();
        assert_eq!(r.to_vec_i64(), vec![-128]);
    }

    #[test]
    fn test_shifts() {
        let s = |op, a, b| binary_scalar(op, Scalar::Int(a), Scalar::Int(b), DType::I8).unwrap().cast(DType::I8);
        assert_eq!(s(BinaryOp::ShiftLeft, 1, 3), Scalar::Int(8));
        assert_eq!(s(BinaryOp::ShiftLeft, 1, 8), Scalar::Int(0));
        assert_eq!(s(BinaryOp::ShiftRightArithmetic, -8, 1), Scalar::Int(-4));
        assert_eq!(s(BinaryOp::ShiftRightArithmetic, -8, 9), Scalar::Int(-1));
        assert_eq!(s(BinaryOp::ShiftRightLogical, -8, 1), Scalar::Int(124));
        let u = binary_scalar(BinaryOp::ShiftRightArithmetic, Scalar::UInt(200), Scalar::UInt(1), DType::U8).unwrap();
        assert_eq!(u, Scalar::UInt(228));
    }

    #[test]
    fn test_float_max_propagates_nan() {
        let r = binary_scalar(BinaryOp::Max, Scalar::Float(f64::NAN), Scalar::Float(1.0), DType::F32).unwrap();
        assert!(r.is_nan());
    }

    #[test]
    fn test_nextafter_f32() {
        let r = binary_scalar(BinaryOp::Nextafter, Scalar::Float(1.0), Scalar::Float(2.0), DType::F32).unwrap();
        assert_eq!(r.as_f64(), f64::from(1.0f32 + f32::EPSILON));
        let r = binary_scalar(BinaryOp::Nextafter, Scalar::Float(0.0), Scalar::Float(-1.0), DType::F16).unwrap();
        assert!(r.as_f64() < 0.0);
    }

    #[test]
    fn test_comparisons_yield_bool() {
        let x = arr_f32(&[1.0, f32::NAN, 3.0], &[3]);
        let y = arr_f32(&[2.0, 2.0, 3.0], &[3]);
        let out = ShapedArray::new(vec![3], DType::Bool);
        let lt = binary(BinaryOp::Lt, &x, &y, &out).unwrap();
        assert_eq!(lt.to_vec_bool(), vec![true, false, false]);
        let ne = binary(BinaryOp::Ne, &x, &y, &out).unwrap();
        assert_eq!(ne.to_vec_bool(), vec![true, true, false]);
    }

    #[test]
    fn test_unary_int_bits() {
        assert_eq!(unary_scalar(UnaryOp::PopulationCount, Scalar::Int(-1), DType::I8).unwrap(), Scalar::Int(8));
        assert_eq!(unary_scalar(UnaryOp::Clz, Scalar::Int(1), DType::I16).unwrap(), Scalar::Int(15));
        assert_eq!(unary_scalar(UnaryOp::Clz, Scalar::UInt(0), DType::U8).unwrap(), Scalar::UInt(8));
        assert!(unary_scalar(UnaryOp::PopulationCount, Scalar::Bool(true), DType::Bool).is_err());
    }

    #[test]
    fn test_round_modes() {
        let away = UnaryOp::Round(RoundingMethod::AwayFromZero);
        let even = UnaryOp::Round(RoundingMethod::ToNearestEven);
        assert_eq!(unary_scalar(away, Scalar::Float(2.5), DType::F32).unwrap(), Scalar::Float(3.0));
        assert_eq!(unary_scalar(even, Scalar::Float(2.5), DType::F32).unwrap(), Scalar::Float(2.0));
        assert_eq!(unary_scalar(away, Scalar::Float(-0.5), DType::F32).unwrap(), Scalar::Float(-1.0));
    }

    #[test]
    fn test_complex_unary() {
        let z = Scalar::Complex(Complex64::new(3.0, 4.0));
        assert_eq!(unary_scalar(UnaryOp::Abs, z, DType::C64).unwrap(), Scalar::Float(5.0));
        assert_eq!(unary_scalar(UnaryOp::Imag, z, DType::C64).unwrap(), Scalar::Float(4.0));
        assert_eq!(
            unary_scalar(UnaryOp::Conj, z, DType::C64).unwrap(),
            Scalar::Complex(Complex64::new(3.0, -4.0))
        );
    }

    #[test]
    fn test_complex_pow_zero() {
        let zero = Scalar::Complex(Complex64::new(0.0, 0.0));
        assert_eq!(
            binary_scalar(BinaryOp::Pow, zero, zero, DType::C64).unwrap(),
            Scalar::Complex(Complex64::new(1.0, 0.0))
        );
    }

    #[test]
    fn test_select_scalar_pred() {
        let t = arr_f32(&[1.0, 2.0], &[2]);
        let f = arr_f32(&[3.0, 4.0], &[2]);
        let p = Array::scalar(false, DType::Bool);
        let r = select(&p, &t, &f, &ShapedArray::new(vec![2], DType::F32)).unwrap();
        assert_eq!(r.to_vec_f32(), vec![3.0, 4.0]);
    }

    #[test]
    fn test_clamp() {
        let x = arr_f32(&[-2.0, 0.5, 9.0], &[3]);
        let lo = Array::scalar(0.0f32, DType::F32);
        let hi = Array::scalar(1.0f32, DType::F32);
        let r = clamp(&lo, &x, &hi, &ShapedArray::new(vec![3], DType::F32)).unwrap();
        assert_eq!(r.to_vec_f32(), vec![0.0, 0.5, 1.0]);
    }

    #[test]
    fn test_iota() {
        let r = iota(1, &ShapedArray::new(vec![2, 3], DType::I32)).unwrap();
        assert_eq!(r.to_vec_i64(), vec![0, 1, 2, 0, 1, 2]);
    }
}
