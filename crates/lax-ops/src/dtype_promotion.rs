//! DType promotion rules.
//!
//! Three layers:
//! - [`promote`]: the strong promotion lattice, ordered
//!   `bool < unsigned < signed < float < complex` and by width within a
//!   category, never narrowing.
//! - [`promote_weak`]: weak-type aware promotion over [`ElemType`] pairs.
//! - [`check_preferred_element_type`]: validation of explicit result dtypes
//!   for contractions and reductions.

use lax_core::{DType, DTypeKind, LaxError, Result, ShapedArray};

/// A dtype together with its weak-type flag.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ElemType {
    pub dtype: DType,
    pub weak: bool,
}

impl ElemType {
    pub fn strong(dtype: DType) -> Self {
        Self { dtype, weak: false }
    }

    pub fn weak(dtype: DType) -> Self {
        Self { dtype, weak: true }
    }

    pub fn of(aval: &ShapedArray) -> Self {
        Self {
            dtype: aval.dtype,
            weak: aval.weak_type,
        }
    }
}

impl std::fmt::Display for ElemType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.weak {
            write!(f, "weak {}", self.dtype)
        } else {
            write!(f, "{}", self.dtype)
        }
    }
}

/// Promote two strong dtypes to a common result dtype.
///
/// Rules:
/// - Same dtype → same dtype
/// - Bool + x → x
/// - Same category → wider
/// - Unsigned + signed → smallest signed type holding both (`u64` + signed
///   has none and goes to `f64`)
/// - Integer + float → the float
/// - `f16` + `bf16` → `f32`
/// - Anything + complex → complex wide enough for both components
pub fn promote(a: DType, b: DType) -> DType {
    if a == b {
        return a;
    }
    let (lo, hi) = if a.kind() <= b.kind() { (a, b) } else { (b, a) };
    match (lo.kind(), hi.kind()) {
        (DTypeKind::Bool, _) => hi,
        (ka, kb) if ka == kb && ka == DTypeKind::Float => {
            if lo.bits() == hi.bits() {
                // f16 + bf16
                DType::F32
            } else if lo.bits() > hi.bits() {
                lo
            } else {
                hi
            }
        }
        (ka, kb) if ka == kb => {
            if lo.bits() >= hi.bits() {
                lo
            } else {
                hi
            }
        }
        (DTypeKind::Unsigned, DTypeKind::Signed) => {
            let bits = (lo.bits() * 2).max(hi.bits());
            signed_of_bits(bits).unwrap_or(DType::F64)
        }
        (DTypeKind::Unsigned | DTypeKind::Signed, DTypeKind::Float | DTypeKind::Complex) => hi,
        (DTypeKind::Float, DTypeKind::Complex) => {
            if lo == DType::F64 {
                DType::C128
            } else {
                hi
            }
        }
        _ => hi,
    }
}

fn signed_of_bits(bits: u32) -> Option<DType> {
    match bits {
        8 => Some(DType::I8),
        16 => Some(DType::I16),
        32 => Some(DType::I32),
        64 => Some(DType::I64),
        _ => None,
    }
}

/// Weak-type aware promotion.
///
/// - Both weak: lattice promotion, result weak.
/// - Exactly one weak: the strong operand's dtype, result strong.
/// - Neither weak: lattice promotion, result strong.
pub fn promote_weak(a: ElemType, b: ElemType) -> ElemType {
    match (a.weak, b.weak) {
        (true, true) => ElemType::weak(promote(a.dtype, b.dtype)),
        (true, false) => ElemType::strong(b.dtype),
        (false, true) => ElemType::strong(a.dtype),
        (false, false) => ElemType::strong(promote(a.dtype, b.dtype)),
    }
}

/// Fold [`promote_weak`] over any number of operands.
pub fn promote_all(types: &[ElemType]) -> Option<ElemType> {
    let (first, rest) = types.split_first()?;
    Some(rest.iter().fold(*first, |acc, &t| promote_weak(acc, t)))
}

fn is_integral(dtype: DType) -> bool {
    dtype.is_bool() || dtype.is_integer()
}

/// Validate a caller-requested result dtype against the operand dtype.
///
/// The preferred dtype must be in the same category as the operand
/// (integral, floating or complex) and at least as wide.
pub fn check_preferred_element_type(op_name: &str, operand: DType, preferred: DType) -> Result<()> {
    let same_category = (is_integral(operand) && is_integral(preferred))
        || (operand.is_float() && preferred.is_float())
        || (operand.is_complex() && preferred.is_complex());
    if !same_category {
        return Err(LaxError::dtype_error(format!(
            "{op_name}: `preferred_element_type` and the original type must both be integral, both be floating point or both be complex; got input dtype {operand} and preferred_element_type {preferred}."
        )));
    }
    if preferred.bits() < operand.bits() {
        return Err(LaxError::dtype_error(format!(
            "{op_name}: `preferred_element_type` must not be narrower than the original type; got input dtype {operand} and preferred_element_type {preferred}."
        )));
    }
    Ok(())
}

/// Reject dtypes whose kind is not in `accepted`.
pub fn check_accepted(op_name: &str, dtype: DType, accepted: &[DTypeKind]) -> Result<()> {
    if accepted.contains(&dtype.kind()) {
        return Ok(());
    }
    let names: Vec<&str> = accepted
        .iter()
        .map(|k| match k {
            DTypeKind::Bool => "bool",
            DTypeKind::Unsigned => "unsignedinteger",
            DTypeKind::Signed => "signedinteger",
            DTypeKind::Float => "floating",
            DTypeKind::Complex => "complexfloating",
        })
        .collect();
    Err(LaxError::dtype_error(format!(
        "{op_name} does not accept dtype {dtype}. Accepted dtypes are subtypes of {}.",
        names.join(", ")
    )))
}
