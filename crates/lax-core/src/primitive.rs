//! Primitive operations and their attributes.
//!
//! Every operation the engine understands is a variant of [`Primitive`]. Each
//! variant carries its own attribute struct; positional array operands are
//! passed separately to `infer` / `execute`.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use crate::scalar::Scalar;
use crate::types::{DType, DTypeKind};
use crate::{LaxError, Result};

// ── Elementwise ops ─────────────────────────────────────────────────────────

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RoundingMethod {
    AwayFromZero,
    ToNearestEven,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    Neg,
    Sign,
    Floor,
    Ceil,
    Round(RoundingMethod),
    IsFinite,
    Exp,
    Exp2,
    Expm1,
    Log,
    Log1p,
    Tanh,
    Logistic,
    Sin,
    Cos,
    Tan,
    Asin,
    Acos,
    Atan,
    Sinh,
    Cosh,
    Asinh,
    Acosh,
    Atanh,
    Sqrt,
    Rsqrt,
    Cbrt,
    Square,
    IntegerPow(i32),
    Reciprocal,
    Lgamma,
    Digamma,
    Erf,
    Erfc,
    ErfInv,
    BesselI0e,
    BesselI1e,
    Real,
    Imag,
    Conj,
    Abs,
    Not,
    PopulationCount,
    Clz,
}

impl UnaryOp {
    pub fn name(self) -> &'static str {
        match self {
            UnaryOp::Neg => "neg",
            UnaryOp::Sign => "sign",
            UnaryOp::Floor => "floor",
            UnaryOp::Ceil => "ceil",
            UnaryOp::Round(_) => "round",
            UnaryOp::IsFinite => "is_finite",
            UnaryOp::Exp => "exp",
            UnaryOp::Exp2 => "exp2",
            UnaryOp::Expm1 => "expm1",
            UnaryOp::Log => "log",
            UnaryOp::Log1p => "log1p",
            UnaryOp::Tanh => "tanh",
            UnaryOp::Logistic => "logistic",
            UnaryOp::Sin => "sin",
            UnaryOp::Cos => "cos",
            UnaryOp::Tan => "tan",
            UnaryOp::Asin => "asin",
            UnaryOp::Acos => "acos",
            UnaryOp::Atan => "atan",
            UnaryOp::Sinh => "sinh",
            UnaryOp::Cosh => "cosh",
            UnaryOp::Asinh => "asinh",
            UnaryOp::Acosh => "acosh",
            UnaryOp::Atanh => "atanh",
            UnaryOp::Sqrt => "sqrt",
            UnaryOp::Rsqrt => "rsqrt",
            UnaryOp::Cbrt => "cbrt",
            UnaryOp::Square => "square",
            UnaryOp::IntegerPow(_) => "integer_pow",
            UnaryOp::Reciprocal => "reciprocal",
            UnaryOp::Lgamma => "lgamma",
            UnaryOp::Digamma => "digamma",
            UnaryOp::Erf => "erf",
            UnaryOp::Erfc => "erfc",
            UnaryOp::ErfInv => "erf_inv",
            UnaryOp::BesselI0e => "bessel_i0e",
            UnaryOp::BesselI1e => "bessel_i1e",
            UnaryOp::Real => "real",
            UnaryOp::Imag => "imag",
            UnaryOp::Conj => "conj",
            UnaryOp::Abs => "abs",
            UnaryOp::Not => "not",
            UnaryOp::PopulationCount => "population_count",
            UnaryOp::Clz => "clz",
        }
    }

    /// Dtype kinds this op accepts.
    pub fn accepted_kinds(self) -> &'static [DTypeKind] {
        use DTypeKind::*;
        match self {
            UnaryOp::Neg | UnaryOp::Sign | UnaryOp::Square | UnaryOp::IntegerPow(_) => {
                &[Unsigned, Signed, Float, Complex]
            }
            UnaryOp::Abs => &[Signed, Float, Complex],
            UnaryOp::Floor
            | UnaryOp::Ceil
            | UnaryOp::Round(_)
            | UnaryOp::IsFinite
            | UnaryOp::Atan
            | UnaryOp::Cbrt
            | UnaryOp::Lgamma
            | UnaryOp::Digamma
            | UnaryOp::Erf
            | UnaryOp::Erfc
            | UnaryOp::ErfInv
            | UnaryOp::BesselI0e
            | UnaryOp::BesselI1e
            | UnaryOp::Exp2 => &[Float],
            UnaryOp::Exp
            | UnaryOp::Expm1
            | UnaryOp::Log
            | UnaryOp::Log1p
            | UnaryOp::Tanh
            | UnaryOp::Logistic
            | UnaryOp::Sin
            | UnaryOp::Cos
            | UnaryOp::Tan
            | UnaryOp::Asin
            | UnaryOp::Acos
            | UnaryOp::Sinh
            | UnaryOp::Cosh
            | UnaryOp::Asinh
            | UnaryOp::Acosh
            | UnaryOp::Atanh
            | UnaryOp::Sqrt
            | UnaryOp::Rsqrt
            | UnaryOp::Reciprocal => &[Float, Complex],
            UnaryOp::Real | UnaryOp::Imag | UnaryOp::Conj => &[Complex],
            UnaryOp::Not => &[Bool, Unsigned, Signed],
            UnaryOp::PopulationCount | UnaryOp::Clz => &[Unsigned, Signed],
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Pow,
    Max,
    Min,
    Atan2,
    Nextafter,
    Complex,
    And,
    Or,
    Xor,
    ShiftLeft,
    ShiftRightLogical,
    ShiftRightArithmetic,
    Igamma,
    Igammac,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl BinaryOp {
    pub fn name(self) -> &'static str {
        match self {
            BinaryOp::Add => "add",
            BinaryOp::Sub => "sub",
            BinaryOp::Mul => "mul",
            BinaryOp::Div => "div",
            BinaryOp::Rem => "rem",
            BinaryOp::Pow => "pow",
            BinaryOp::Max => "max",
            BinaryOp::Min => "min",
            BinaryOp::Atan2 => "atan2",
            BinaryOp::Nextafter => "nextafter",
            BinaryOp::Complex => "complex",
            BinaryOp::And => "and",
            BinaryOp::Or => "or",
            BinaryOp::Xor => "xor",
            BinaryOp::ShiftLeft => "shift_left",
            BinaryOp::ShiftRightLogical => "shift_right_logical",
            BinaryOp::ShiftRightArithmetic => "shift_right_arithmetic",
            BinaryOp::Igamma => "igamma",
            BinaryOp::Igammac => "igammac",
            BinaryOp::Eq => "eq",
            BinaryOp::Ne => "ne",
            BinaryOp::Lt => "lt",
            BinaryOp::Le => "le",
            BinaryOp::Gt => "gt",
            BinaryOp::Ge => "ge",
        }
    }

    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            BinaryOp::Eq | BinaryOp::Ne | BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge
        )
    }

    /// Dtype kinds this op accepts for its (promoted) operands.
    pub fn accepted_kinds(self) -> &'static [DTypeKind] {
        use DTypeKind::*;
        match self {
            BinaryOp::Add | BinaryOp::Mul | BinaryOp::Max | BinaryOp::Min => {
                &[Bool, Unsigned, Signed, Float, Complex]
            }
            BinaryOp::Eq | BinaryOp::Ne => &[Bool, Unsigned, Signed, Float, Complex],
            BinaryOp::Sub | BinaryOp::Div | BinaryOp::Pow => &[Unsigned, Signed, Float, Complex],
            BinaryOp::Rem => &[Unsigned, Signed, Float],
            BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => {
                &[Bool, Unsigned, Signed, Float]
            }
            BinaryOp::Atan2
            | BinaryOp::Nextafter
            | BinaryOp::Complex
            | BinaryOp::Igamma
            | BinaryOp::Igammac => &[Float],
            BinaryOp::And | BinaryOp::Or | BinaryOp::Xor => &[Bool, Unsigned, Signed],
            BinaryOp::ShiftLeft | BinaryOp::ShiftRightLogical | BinaryOp::ShiftRightArithmetic => {
                &[Unsigned, Signed]
            }
        }
    }
}

// ── Reductions ──────────────────────────────────────────────────────────────

/// Associative, commutative reductions with a well-defined identity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Monoid {
    Sum,
    Prod,
    Max,
    Min,
    And,
    Or,
    Xor,
}

impl Monoid {
    pub const ALL: [Monoid; 7] = [
        Monoid::Sum,
        Monoid::Prod,
        Monoid::Max,
        Monoid::Min,
        Monoid::And,
        Monoid::Or,
        Monoid::Xor,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Monoid::Sum => "sum",
            Monoid::Prod => "prod",
            Monoid::Max => "max",
            Monoid::Min => "min",
            Monoid::And => "and",
            Monoid::Or => "or",
            Monoid::Xor => "xor",
        }
    }

    /// Binary op folded by this monoid.
    pub fn binary_op(self) -> BinaryOp {
        match self {
            Monoid::Sum => BinaryOp::Add,
            Monoid::Prod => BinaryOp::Mul,
            Monoid::Max => BinaryOp::Max,
            Monoid::Min => BinaryOp::Min,
            Monoid::And => BinaryOp::And,
            Monoid::Or => BinaryOp::Or,
            Monoid::Xor => BinaryOp::Xor,
        }
    }

    /// Identity element for `dtype`. Bitwise monoids only have identities on
    /// bool and integer dtypes.
    pub fn identity(self, dtype: DType) -> Option<Scalar> {
        let bitwise = dtype.is_bool() || dtype.is_integer();
        match self {
            Monoid::Sum => Some(Scalar::zero(dtype)),
            Monoid::Prod => Some(Scalar::one(dtype)),
            Monoid::Max => Some(Scalar::lowest(dtype)),
            Monoid::Min => Some(Scalar::highest(dtype)),
            Monoid::And if bitwise => Some(Scalar::Int(-1).cast(dtype)),
            Monoid::Or | Monoid::Xor if bitwise => Some(Scalar::zero(dtype)),
            _ => None,
        }
    }
}

type ReducerFn = dyn Fn(&[Scalar], &[Scalar]) -> Vec<Scalar> + Send + Sync;

/// A caller-supplied reducer over tuples: `(accumulator, element) -> accumulator`.
#[derive(Clone)]
pub struct Reducer {
    name: String,
    func: Arc<ReducerFn>,
}

impl Reducer {
    pub fn new(
        name: impl Into<String>,
        func: impl Fn(&[Scalar], &[Scalar]) -> Vec<Scalar> + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            func: Arc::new(func),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn apply(&self, acc: &[Scalar], x: &[Scalar]) -> Vec<Scalar> {
        (self.func)(acc, x)
    }
}

impl fmt::Debug for Reducer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reducer").field("name", &self.name).finish()
    }
}

/// Reduction computation: a known monoid or a custom reducer.
#[derive(Clone, Debug)]
pub enum Computation {
    Monoid(Monoid),
    Custom(Reducer),
}

// ── Windows and padding ─────────────────────────────────────────────────────

/// Spatial padding for windowed ops.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Padding {
    Valid,
    /// Output size `ceil(in / stride)`; the odd unit of padding goes high.
    Same,
    /// Like `Same`, but the odd unit of padding goes low.
    SameLower,
    Explicit(Vec<(i64, i64)>),
}

impl FromStr for Padding {
    type Err = LaxError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_uppercase().as_str() {
            "VALID" => Ok(Padding::Valid),
            "SAME" => Ok(Padding::Same),
            "SAME_LOWER" => Ok(Padding::SameLower),
            _ => Err(LaxError::value_error(format!("Unknown padding type: {s}."))),
        }
    }
}

/// Window geometry shared by reduce_window and cumulative reductions.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct WindowSpec {
    pub window_dimensions: Vec<usize>,
    pub window_strides: Vec<usize>,
    pub padding: Padding,
    pub base_dilation: Vec<usize>,
    pub window_dilation: Vec<usize>,
}

impl WindowSpec {
    /// Undilated window.
    pub fn new(window_dimensions: Vec<usize>, window_strides: Vec<usize>, padding: Padding) -> Self {
        let n = window_dimensions.len();
        Self {
            window_dimensions,
            window_strides,
            padding,
            base_dilation: vec![1; n],
            window_dilation: vec![1; n],
        }
    }

    pub fn with_base_dilation(mut self, base_dilation: Vec<usize>) -> Self {
        self.base_dilation = base_dilation;
        self
    }

    pub fn with_window_dilation(mut self, window_dilation: Vec<usize>) -> Self {
        self.window_dilation = window_dilation;
        self
    }
}

// ── Contractions ────────────────────────────────────────────────────────────

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Precision {
    Default,
    High,
    Highest,
}

impl FromStr for Precision {
    type Err = LaxError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "default" | "bfloat16" | "fastest" => Ok(Precision::Default),
            "high" | "tensorfloat32" => Ok(Precision::High),
            "highest" | "float32" => Ok(Precision::Highest),
            _ => Err(LaxError::value_error(format!(
                "Precision argument must be one of DEFAULT, HIGH or HIGHEST, got {s}"
            ))),
        }
    }
}

/// Axis roles for convolution: `lhs_spec = (batch, feature, spatial...)`,
/// `rhs_spec = (out feature, in feature, spatial...)`,
/// `out_spec = (batch, feature, spatial...)`, each entry an axis index.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ConvDimensionNumbers {
    pub lhs_spec: Vec<usize>,
    pub rhs_spec: Vec<usize>,
    pub out_spec: Vec<usize>,
}

impl ConvDimensionNumbers {
    /// `NC...`, `OI...`, `NC...` layout for arrays of rank `ndim`.
    pub fn default_for_rank(ndim: usize) -> Self {
        let iota: Vec<usize> = (0..ndim).collect();
        Self {
            lhs_spec: iota.clone(),
            rhs_spec: iota.clone(),
            out_spec: iota,
        }
    }

    /// Parse layout strings such as `("NCHW", "OIHW", "NCHW")`.
    ///
    /// Spatial axes are ordered as they appear in the kernel string.
    pub fn from_strings(lhs: &str, rhs: &str, out: &str) -> Result<Self> {
        let specs: [Vec<char>; 3] = [lhs.chars().collect(), rhs.chars().collect(), out.chars().collect()];
        let charpairs = [('N', 'C'), ('O', 'I'), ('N', 'C')];
        for (i, (spec, (a, b))) in specs.iter().zip(charpairs).enumerate() {
            let count = |c: char| spec.iter().filter(|&&x| x == c).count();
            if count(a) != 1 || count(b) != 1 {
                return Err(LaxError::type_error(format!(
                    "convolution dimension_numbers[{i}] must contain the characters '{a}' and '{b}' exactly once, got {}.",
                    spec.iter().collect::<String>()
                )));
            }
        }
        for (i, spec) in specs.iter().enumerate() {
            let mut seen = spec.clone();
            seen.sort_unstable();
            seen.dedup();
            if seen.len() != spec.len() {
                return Err(LaxError::type_error(format!(
                    "convolution dimension_numbers[{i}] cannot have duplicate characters, got {}.",
                    spec.iter().collect::<String>()
                )));
            }
        }
        let spatial_set = |spec: &[char], (a, b): (char, char)| {
            let mut s: Vec<char> = spec.iter().copied().filter(|&c| c != a && c != b).collect();
            s.sort_unstable();
            s
        };
        let lhs_sp = spatial_set(&specs[0], charpairs[0]);
        if lhs_sp != spatial_set(&specs[1], charpairs[1]) || lhs_sp != spatial_set(&specs[2], charpairs[2]) {
            return Err(LaxError::type_error(format!(
                "convolution dimension_numbers elements must each have the same set of spatial characters, got ({lhs:?}, {rhs:?}, {out:?})."
            )));
        }

        let rhs_chars = &specs[1];
        let perm = |spec: &[char], (a, b): (char, char), is_rhs: bool| -> Vec<usize> {
            let mut spatial: Vec<usize> = (0..spec.len())
                .filter(|&i| spec[i] != a && spec[i] != b)
                .collect();
            if !is_rhs {
                spatial.sort_by_key(|&i| rhs_chars.iter().position(|&c| c == spec[i]));
            }
            let pos = |c: char| spec.iter().position(|&x| x == c).unwrap_or(0);
            let mut out = vec![pos(a), pos(b)];
            out.extend(spatial);
            out
        };
        Ok(Self {
            lhs_spec: perm(&specs[0], charpairs[0], false),
            rhs_spec: perm(&specs[1], charpairs[1], true),
            out_spec: perm(&specs[2], charpairs[2], false),
        })
    }

    pub fn num_spatial(&self) -> usize {
        self.lhs_spec.len().saturating_sub(2)
    }
}

/// Attributes of `conv_general_dilated`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ConvSpec {
    pub window_strides: Vec<usize>,
    pub padding: Padding,
    pub lhs_dilation: Vec<usize>,
    pub rhs_dilation: Vec<usize>,
    /// `None` means the `NC...`/`OI...`/`NC...` default.
    pub dimension_numbers: Option<ConvDimensionNumbers>,
    pub feature_group_count: usize,
    pub batch_group_count: usize,
    pub precision: Option<Precision>,
    pub preferred_element_type: Option<DType>,
}

impl ConvSpec {
    pub fn new(window_strides: Vec<usize>, padding: Padding) -> Self {
        let n = window_strides.len();
        Self {
            window_strides,
            padding,
            lhs_dilation: vec![1; n],
            rhs_dilation: vec![1; n],
            dimension_numbers: None,
            feature_group_count: 1,
            batch_group_count: 1,
            precision: None,
            preferred_element_type: None,
        }
    }

    pub fn with_dilation(mut self, lhs_dilation: Vec<usize>, rhs_dilation: Vec<usize>) -> Self {
        self.lhs_dilation = lhs_dilation;
        self.rhs_dilation = rhs_dilation;
        self
    }

    pub fn with_dimension_numbers(mut self, dnums: ConvDimensionNumbers) -> Self {
        self.dimension_numbers = Some(dnums);
        self
    }

    pub fn with_feature_group_count(mut self, count: usize) -> Self {
        self.feature_group_count = count;
        self
    }

    pub fn with_batch_group_count(mut self, count: usize) -> Self {
        self.batch_group_count = count;
        self
    }

    pub fn with_preferred_element_type(mut self, dtype: DType) -> Self {
        self.preferred_element_type = Some(dtype);
        self
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct DotDimensionNumbers {
    pub lhs_contracting: Vec<usize>,
    pub rhs_contracting: Vec<usize>,
    pub lhs_batch: Vec<usize>,
    pub rhs_batch: Vec<usize>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct DotGeneralSpec {
    pub dimension_numbers: DotDimensionNumbers,
    pub precision: Option<Precision>,
    pub preferred_element_type: Option<DType>,
}

// ── Gather / scatter ────────────────────────────────────────────────────────

/// Out-of-bounds index handling for gather and scatter.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum GatherScatterMode {
    /// Clamp start indices so the whole window is in bounds.
    Clip,
    /// Gather returns the fill value for out-of-bounds slices; scatter drops
    /// out-of-bounds windows.
    FillOrDrop,
    /// Caller guarantees in-bounds indices; behaves like the native
    /// semantics (gather clamps, scatter drops).
    PromiseInBounds,
}

impl FromStr for GatherScatterMode {
    type Err = LaxError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "clip" => Ok(GatherScatterMode::Clip),
            "fill" | "drop" | "fill_or_drop" => Ok(GatherScatterMode::FillOrDrop),
            "promise_in_bounds" => Ok(GatherScatterMode::PromiseInBounds),
            _ => Err(LaxError::value_error(format!("Unknown gather mode \"{s}\""))),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct GatherDimensionNumbers {
    pub offset_dims: Vec<usize>,
    pub collapsed_slice_dims: Vec<usize>,
    pub start_index_map: Vec<usize>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct GatherSpec {
    pub dimension_numbers: GatherDimensionNumbers,
    pub slice_sizes: Vec<usize>,
    pub indices_are_sorted: bool,
    pub unique_indices: bool,
    /// `None` means clip.
    pub mode: Option<GatherScatterMode>,
    /// Fill value for `FillOrDrop`; `None` picks a dtype-dependent default.
    pub fill_value: Option<Scalar>,
}

impl GatherSpec {
    pub fn new(dimension_numbers: GatherDimensionNumbers, slice_sizes: Vec<usize>) -> Self {
        Self {
            dimension_numbers,
            slice_sizes,
            indices_are_sorted: false,
            unique_indices: false,
            mode: None,
            fill_value: None,
        }
    }

    pub fn with_mode(mut self, mode: GatherScatterMode) -> Self {
        self.mode = Some(mode);
        self
    }

    pub fn with_fill_value(mut self, fill_value: Scalar) -> Self {
        self.fill_value = Some(fill_value);
        self
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct ScatterDimensionNumbers {
    pub update_window_dims: Vec<usize>,
    pub inserted_window_dims: Vec<usize>,
    pub scatter_dims_to_operand_dims: Vec<usize>,
}

/// How an update combines with the operand value it lands on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ScatterKind {
    Replace,
    Add,
    Mul,
    Min,
    Max,
    /// Apply a unary op to the addressed operand element; updates only
    /// contribute their shape.
    Apply(UnaryOp),
}

impl ScatterKind {
    pub fn name(self) -> &'static str {
        match self {
            ScatterKind::Replace => "scatter",
            ScatterKind::Add => "scatter_add",
            ScatterKind::Mul => "scatter_mul",
            ScatterKind::Min => "scatter_min",
            ScatterKind::Max => "scatter_max",
            ScatterKind::Apply(_) => "scatter_apply",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ScatterSpec {
    pub kind: ScatterKind,
    pub dimension_numbers: ScatterDimensionNumbers,
    pub indices_are_sorted: bool,
    pub unique_indices: bool,
    /// `None` defers to the engine configuration.
    pub mode: Option<GatherScatterMode>,
}

impl ScatterSpec {
    pub fn new(kind: ScatterKind, dimension_numbers: ScatterDimensionNumbers) -> Self {
        Self {
            kind,
            dimension_numbers,
            indices_are_sorted: false,
            unique_indices: false,
            mode: None,
        }
    }

    pub fn with_mode(mut self, mode: GatherScatterMode) -> Self {
        self.mode = Some(mode);
        self
    }
}

// ── Primitive ───────────────────────────────────────────────────────────────

/// Every operation the engine can infer and execute.
///
/// Operand conventions are noted per variant.
#[derive(Clone, Debug)]
pub enum Primitive {
    /// `(x)`
    Unary(UnaryOp),
    /// `(x, y)`, numpy-broadcast, promoted.
    Binary(BinaryOp),
    /// `(pred, on_true, on_false)`
    Select,
    /// `(min, x, max)`
    Clamp,
    /// `(x)`
    ConvertElementType { new_dtype: DType, weak_type: bool },
    /// `(x)`; reinterprets the bits of each element. A narrower `new_dtype`
    /// appends a trailing axis of size `bits(x) / bits(new_dtype)`, a wider
    /// one consumes a trailing axis of that size. Elements are packed
    /// little-endian.
    BitcastConvertType { new_dtype: DType },
    /// `(x)`; rounds a float to the format with the given exponent and
    /// mantissa widths, then back to `x`'s dtype.
    ReducePrecision { exponent_bits: i32, mantissa_bits: i32 },
    /// `(a, b, x)`; regularized incomplete beta `I_x(a, b)`.
    RegularizedIncompleteBeta,
    /// No operands.
    Iota {
        dtype: DType,
        shape: Vec<usize>,
        dimension: usize,
    },

    /// `(operands..., init_values...)`
    Reduce {
        computation: Computation,
        axes: Vec<usize>,
    },
    /// `(x)`; the init value is the monoid identity.
    ReduceMonoid { monoid: Monoid, axes: Vec<usize> },
    /// `(x)`
    Argmax { axis: usize, index_dtype: DType },
    /// `(x)`
    Argmin { axis: usize, index_dtype: DType },
    /// `(x)`; inclusive scan along `axis`.
    Cumulative {
        monoid: Monoid,
        axis: usize,
        reverse: bool,
    },
    /// `(operands..., init_values...)`
    ReduceWindow {
        computation: Computation,
        window: WindowSpec,
    },
    /// `(x)`
    ReduceWindowMonoid { monoid: Monoid, window: WindowSpec },

    /// `(lhs, rhs)`
    ConvGeneralDilated(ConvSpec),
    /// `(lhs, rhs)`
    DotGeneral(DotGeneralSpec),

    /// `(operand, indices)`
    Gather(GatherSpec),
    /// `(operand, indices, updates)`
    Scatter(ScatterSpec),

    /// `(operands...)`; the first `num_keys` operands are compared.
    ///
    /// The CPU backend always sorts stably, so `is_stable: false` yields
    /// the same order as `true`.
    Sort {
        dimension: i64,
        is_stable: bool,
        num_keys: usize,
    },
    /// `(x)` -> `(values, indices)` along the last axis.
    TopK { k: i64 },

    /// `(operand, padding_value)`; `(low, high, interior)` per axis.
    Pad { padding_config: Vec<(i64, i64, i64)> },
    /// `(x)`
    Slice {
        start_indices: Vec<usize>,
        limit_indices: Vec<usize>,
        strides: Option<Vec<usize>>,
    },
    /// `(operand, start_indices...)`, one rank-0 index per axis.
    DynamicSlice { slice_sizes: Vec<usize> },
    /// `(operand, update, start_indices...)`
    DynamicUpdateSlice,
    /// `(x)`
    BroadcastInDim {
        shape: Vec<usize>,
        broadcast_dimensions: Vec<usize>,
    },
    /// `(x)`
    Transpose { permutation: Vec<usize> },
    /// `(x)`
    Reshape { new_sizes: Vec<usize> },
    /// `(x)`
    Squeeze { dimensions: Vec<usize> },
    /// `(x)`
    ExpandDims { dimensions: Vec<usize> },
    /// `(x)`
    Rev { dimensions: Vec<usize> },
    /// `(operands...)`
    Concatenate { dimension: usize },
}

impl Primitive {
    pub fn name(&self) -> &'static str {
        match self {
            Primitive::Unary(op) => op.name(),
            Primitive::Binary(op) => op.name(),
            Primitive::Select => "select_n",
            Primitive::Clamp => "clamp",
            Primitive::ConvertElementType { .. } => "convert_element_type",
            Primitive::BitcastConvertType { .. } => "bitcast_convert_type",
            Primitive::ReducePrecision { .. } => "reduce_precision",
            Primitive::RegularizedIncompleteBeta => "regularized_incomplete_beta",
            Primitive::Iota { .. } => "iota",
            Primitive::Reduce { .. } => "reduce",
            Primitive::ReduceMonoid { monoid, .. } => match monoid {
                Monoid::Sum => "reduce_sum",
                Monoid::Prod => "reduce_prod",
                Monoid::Max => "reduce_max",
                Monoid::Min => "reduce_min",
                Monoid::And => "reduce_and",
                Monoid::Or => "reduce_or",
                Monoid::Xor => "reduce_xor",
            },
            Primitive::Argmax { .. } => "argmax",
            Primitive::Argmin { .. } => "argmin",
            Primitive::Cumulative { monoid, .. } => match monoid {
                Monoid::Sum => "cumsum",
                Monoid::Prod => "cumprod",
                Monoid::Max => "cummax",
                Monoid::Min => "cummin",
                Monoid::And => "cumand",
                Monoid::Or => "cumor",
                Monoid::Xor => "cumxor",
            },
            Primitive::ReduceWindow { .. } => "reduce_window",
            Primitive::ReduceWindowMonoid { monoid, .. } => match monoid {
                Monoid::Sum => "reduce_window_sum",
                Monoid::Max => "reduce_window_max",
                Monoid::Min => "reduce_window_min",
                _ => "reduce_window",
            },
            Primitive::ConvGeneralDilated(_) => "conv_general_dilated",
            Primitive::DotGeneral(_) => "dot_general",
            Primitive::Gather(_) => "gather",
            Primitive::Scatter(spec) => spec.kind.name(),
            Primitive::Sort { .. } => "sort",
            Primitive::TopK { .. } => "top_k",
            Primitive::Pad { .. } => "pad",
            Primitive::Slice { .. } => "slice",
            Primitive::DynamicSlice { .. } => "dynamic_slice",
            Primitive::DynamicUpdateSlice => "dynamic_update_slice",
            Primitive::BroadcastInDim { .. } => "broadcast_in_dim",
            Primitive::Transpose { .. } => "transpose",
            Primitive::Reshape { .. } => "reshape",
            Primitive::Squeeze { .. } => "squeeze",
            Primitive::ExpandDims { .. } => "expand_dims",
            Primitive::Rev { .. } => "rev",
            Primitive::Concatenate { .. } => "concatenate",
        }
    }
}

impl fmt::Display for Primitive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_padding_from_str() {
        assert_eq!("SAME".parse::<Padding>().unwrap(), Padding::Same);
        assert_eq!("valid".parse::<Padding>().unwrap(), Padding::Valid);
        assert_eq!("SAME_LOWER".parse::<Padding>().unwrap(), Padding::SameLower);
        assert!("FULL".parse::<Padding>().unwrap_err().is_value_error());
    }

    #[test]
    fn test_conv_dnums_nchw() {
        let d = ConvDimensionNumbers::from_strings("NCHW", "OIHW", "NCHW").unwrap();
        assert_eq!(d, ConvDimensionNumbers::default_for_rank(4));
    }

    #[test]
    fn test_conv_dnums_nhwc_hwio() {
        let d = ConvDimensionNumbers::from_strings("NHWC", "HWIO", "NHWC").unwrap();
        assert_eq!(d.lhs_spec, vec![0, 3, 1, 2]);
        assert_eq!(d.rhs_spec, vec![3, 2, 0, 1]);
        assert_eq!(d.out_spec, vec![0, 3, 1, 2]);
    }

    #[test]
    fn test_conv_dnums_spatial_follow_rhs_order() {
        let d = ConvDimensionNumbers::from_strings("NCHW", "OIWH", "NCWH").unwrap();
        assert_eq!(d.rhs_spec, vec![0, 1, 2, 3]);
        assert_eq!(d.lhs_spec, vec![0, 1, 3, 2]);
        assert_eq!(d.out_spec, vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_conv_dnums_rejects_bad_strings() {
        let err = ConvDimensionNumbers::from_strings("NHW", "OIHW", "NCHW").unwrap_err();
        assert!(err.message().contains("exactly once"));
        let err = ConvDimensionNumbers::from_strings("NCHH", "OIHH", "NCHH").unwrap_err();
        assert!(err.message().contains("duplicate"));
        let err = ConvDimensionNumbers::from_strings("NCHW", "OIHX", "NCHW").unwrap_err();
        assert!(err.message().contains("spatial characters"));
    }

    #[test]
    fn test_monoid_identities() {
        assert_eq!(Monoid::Sum.identity(DType::F32), Some(Scalar::Float(0.0)));
        assert_eq!(Monoid::Max.identity(DType::I8), Some(Scalar::Int(-128)));
        assert_eq!(Monoid::Min.identity(DType::U8), Some(Scalar::UInt(255)));
        assert_eq!(Monoid::And.identity(DType::Bool), Some(Scalar::Bool(true)));
        assert_eq!(Monoid::And.identity(DType::U8), Some(Scalar::UInt(255)));
        assert_eq!(Monoid::Or.identity(DType::F32), None);
    }

    #[test]
    fn test_primitive_names() {
        assert_eq!(
            Primitive::ReduceMonoid {
                monoid: Monoid::Sum,
                axes: vec![0]
            }
            .name(),
            "reduce_sum"
        );
        let spec = ScatterSpec::new(ScatterKind::Add, ScatterDimensionNumbers::default());
        assert_eq!(Primitive::Scatter(spec).to_string(), "scatter_add");
    }

    #[test]
    fn test_reducer_applies() {
        let r = Reducer::new("add", |a, b| vec![Scalar::Float(a[0].as_f64() + b[0].as_f64())]);
        assert_eq!(r.apply(&[Scalar::Float(1.0)], &[Scalar::Float(2.0)]), vec![Scalar::Float(3.0)]);
        assert_eq!(format!("{r:?}"), "Reducer { name: \"add\" }");
    }
}
