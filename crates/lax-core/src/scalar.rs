//! Element values.
//!
//! Arrays store one [`Scalar`] per element. A scalar normalized for a dtype
//! uses the variant matching the dtype's kind and holds a value already
//! rounded (floats) or wrapped (integers) to that dtype's range, so kernels
//! can compute in 64-bit and re-normalize with [`Scalar::cast`].

use std::cmp::Ordering;

use half::{bf16, f16};
use num_complex::Complex64;

use crate::types::{DType, DTypeKind};

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Scalar {
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    Complex(Complex64),
}

impl Scalar {
    pub fn zero(dtype: DType) -> Scalar {
        Scalar::Int(0).cast(dtype)
    }

    pub fn one(dtype: DType) -> Scalar {
        Scalar::Int(1).cast(dtype)
    }

    /// Smallest value of `dtype` (`-inf` for inexact types).
    pub fn lowest(dtype: DType) -> Scalar {
        match dtype.kind() {
            DTypeKind::Bool => Scalar::Bool(false),
            DTypeKind::Signed => Scalar::Int(signed_min(dtype.bits())),
            DTypeKind::Unsigned => Scalar::UInt(0),
            DTypeKind::Float => Scalar::Float(f64::NEG_INFINITY),
            DTypeKind::Complex => Scalar::Complex(Complex64::new(f64::NEG_INFINITY, 0.0)),
        }
    }

    /// Largest value of `dtype` (`+inf` for inexact types).
    pub fn highest(dtype: DType) -> Scalar {
        match dtype.kind() {
            DTypeKind::Bool => Scalar::Bool(true),
            DTypeKind::Signed => Scalar::Int(signed_max(dtype.bits())),
            DTypeKind::Unsigned => Scalar::UInt(unsigned_max(dtype.bits())),
            DTypeKind::Float => Scalar::Float(f64::INFINITY),
            DTypeKind::Complex => Scalar::Complex(Complex64::new(f64::INFINITY, 0.0)),
        }
    }

    /// Value conversion to `dtype`.
    ///
    /// Float to integer truncates toward zero and saturates (NaN becomes 0);
    /// integer to narrower integer wraps; complex to real drops the imaginary
    /// part; anything to bool tests for non-zero.
    pub fn cast(self, dtype: DType) -> Scalar {
        let bits = dtype.bits();
        match dtype.kind() {
            DTypeKind::Bool => Scalar::Bool(self.as_bool()),
            DTypeKind::Signed => match self {
                Scalar::Float(x) => Scalar::Int(saturate_signed(x, bits)),
                Scalar::Complex(c) => Scalar::Int(saturate_signed(c.re, bits)),
                other => Scalar::Int(wrap_signed(other.as_i128(), bits)),
            },
            DTypeKind::Unsigned => match self {
                Scalar::Float(x) => Scalar::UInt(saturate_unsigned(x, bits)),
                Scalar::Complex(c) => Scalar::UInt(saturate_unsigned(c.re, bits)),
                other => Scalar::UInt(wrap_unsigned(other.as_i128(), bits)),
            },
            DTypeKind::Float => Scalar::Float(round_float(self.as_f64(), dtype)),
            DTypeKind::Complex => {
                let c = self.as_complex();
                let part = dtype.real_dtype();
                Scalar::Complex(Complex64::new(
                    round_float(c.re, part),
                    round_float(c.im, part),
                ))
            }
        }
    }

    pub fn as_bool(self) -> bool {
        match self {
            Scalar::Bool(b) => b,
            Scalar::Int(v) => v != 0,
            Scalar::UInt(v) => v != 0,
            Scalar::Float(x) => x != 0.0,
            Scalar::Complex(c) => c.re != 0.0 || c.im != 0.0,
        }
    }

    pub fn as_f64(self) -> f64 {
        match self {
            Scalar::Bool(b) => f64::from(u8::from(b)),
            Scalar::Int(v) => v as f64,
            Scalar::UInt(v) => v as f64,
            Scalar::Float(x) => x,
            Scalar::Complex(c) => c.re,
        }
    }

    /// Integer view; floats truncate and saturate.
    pub fn as_i64(self) -> i64 {
        match self {
            Scalar::Bool(b) => i64::from(b),
            Scalar::Int(v) => v,
            Scalar::UInt(v) => v as i64,
            Scalar::Float(x) => x as i64,
            Scalar::Complex(c) => c.re as i64,
        }
    }

    /// Position view for start indices: unsigned values above `i64::MAX`
    /// saturate instead of wrapping negative.
    pub fn as_index(self) -> i64 {
        match self {
            Scalar::UInt(v) => i64::try_from(v).unwrap_or(i64::MAX),
            other => other.as_i64(),
        }
    }

    pub fn as_u64(self) -> u64 {
        match self {
            Scalar::Bool(b) => u64::from(b),
            Scalar::Int(v) => v as u64,
            Scalar::UInt(v) => v,
            Scalar::Float(x) => x as u64,
            Scalar::Complex(c) => c.re as u64,
        }
    }

    pub fn as_complex(self) -> Complex64 {
        match self {
            Scalar::Complex(c) => c,
            other => Complex64::new(other.as_f64(), 0.0),
        }
    }

    fn as_i128(self) -> i128 {
        match self {
            Scalar::Bool(b) => i128::from(b),
            Scalar::Int(v) => i128::from(v),
            Scalar::UInt(v) => i128::from(v),
            Scalar::Float(x) => x as i128,
            Scalar::Complex(c) => c.re as i128,
        }
    }

    pub fn is_nan(self) -> bool {
        match self {
            Scalar::Float(x) => x.is_nan(),
            Scalar::Complex(c) => c.re.is_nan() || c.im.is_nan(),
            _ => false,
        }
    }

    /// Total order used by sort and top_k: NaNs compare greater than every
    /// other value and equal to each other, `-0.0 == 0.0`, complex values
    /// order by real then imaginary part.
    pub fn total_cmp(&self, other: &Scalar) -> Ordering {
        match (self, other) {
            (Scalar::Bool(a), Scalar::Bool(b)) => a.cmp(b),
            (Scalar::Int(a), Scalar::Int(b)) => a.cmp(b),
            (Scalar::UInt(a), Scalar::UInt(b)) => a.cmp(b),
            (Scalar::Float(a), Scalar::Float(b)) => float_total_cmp(*a, *b),
            (Scalar::Complex(a), Scalar::Complex(b)) => {
                float_total_cmp(a.re, b.re).then_with(|| float_total_cmp(a.im, b.im))
            }
            (a, b) => float_total_cmp(a.as_f64(), b.as_f64()),
        }
    }
}

/// NaN-last float ordering with signed zeros equal.
pub fn float_total_cmp(a: f64, b: f64) -> Ordering {
    match (a.is_nan(), b.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => a.partial_cmp(&b).unwrap_or(Ordering::Equal),
    }
}

/// Round an f64 to the precision of a real float dtype.
pub fn round_float(x: f64, dtype: DType) -> f64 {
    match dtype {
        DType::F16 => f16::from_f64(x).to_f64(),
        DType::BF16 => bf16::from_f64(x).to_f64(),
        DType::F32 => x as f32 as f64,
        _ => x,
    }
}

pub fn signed_min(bits: u32) -> i64 {
    (-(1i128 << (bits - 1))) as i64
}

pub fn signed_max(bits: u32) -> i64 {
    ((1i128 << (bits - 1)) - 1) as i64
}

pub fn unsigned_max(bits: u32) -> u64 {
    ((1u128 << bits) - 1) as u64
}

fn wrap_signed(v: i128, bits: u32) -> i64 {
    let shift = 128 - bits;
    ((v << shift) >> shift) as i64
}

fn wrap_unsigned(v: i128, bits: u32) -> u64 {
    (v as u64) & unsigned_max(bits)
}

fn saturate_signed(x: f64, bits: u32) -> i64 {
    if x.is_nan() {
        return 0;
    }
    let t = x.trunc();
    if t <= signed_min(bits) as f64 {
        signed_min(bits)
    } else if t >= signed_max(bits) as f64 {
        signed_max(bits)
    } else {
        t as i64
    }
}

fn saturate_unsigned(x: f64, bits: u32) -> u64 {
    if x.is_nan() || x <= 0.0 {
        return 0;
    }
    let t = x.trunc();
    if t >= unsigned_max(bits) as f64 {
        unsigned_max(bits)
    } else {
        t as u64
    }
}

impl std::fmt::Display for Scalar {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Scalar::Bool(b) => write!(f, "{b}"),
            Scalar::Int(v) => write!(f, "{v}"),
            Scalar::UInt(v) => write!(f, "{v}"),
            Scalar::Float(x) => write!(f, "{x}"),
            Scalar::Complex(c) => write!(f, "{}{:+}j", c.re, c.im),
        }
    }
}

impl From<bool> for Scalar {
    fn from(v: bool) -> Self {
        Scalar::Bool(v)
    }
}

impl From<i32> for Scalar {
    fn from(v: i32) -> Self {
        Scalar::Int(i64::from(v))
    }
}

impl From<i64> for Scalar {
    fn from(v: i64) -> Self {
        Scalar::Int(v)
    }
}

impl From<u32> for Scalar {
    fn from(v: u32) -> Self {
        Scalar::UInt(u64::from(v))
    }
}

impl From<u64> for Scalar {
    fn from(v: u64) -> Self {
        Scalar::UInt(v)
    }
}

impl From<f32> for Scalar {
    fn from(v: f32) -> Self {
        Scalar::Float(f64::from(v))
    }
}

impl From<f64> for Scalar {
    fn from(v: f64) -> Self {
        Scalar::Float(v)
    }
}

impl From<Complex64> for Scalar {
    fn from(v: Complex64) -> Self {
        Scalar::Complex(v)
    }
}
