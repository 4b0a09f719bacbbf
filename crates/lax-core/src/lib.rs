//! Core value model for the lax array engine.
//!
//! `lax-core` provides the foundational types (`DType`, `Shape`, `ShapedArray`,
//! `Scalar`, `Array`), the closed [`Primitive`] enum describing every operation
//! together with its attributes, and the [`Backend`] interface executors plug
//! into.
//!
//! Shape inference lives in `lax-ops`; the CPU reference executors and the
//! dispatch [`Engine`](../lax_cpu/struct.Engine.html) live in `lax-cpu`.

pub mod array;
pub mod backend;
pub mod config;
pub mod extended;
pub mod primitive;
pub mod scalar;
pub mod types;

pub use array::Array;
pub use backend::Backend;
pub use config::Config;
pub use extended::{ExtendedArray, ExtendedDType, ExtendedDTypeRegistry};
pub use primitive::Primitive;
pub use scalar::Scalar;
pub use types::{DType, DTypeKind, Shape, ShapedArray};

pub type Result<T> = std::result::Result<T, LaxError>;

/// Python-style class reported with shape and dtype errors.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorClass {
    TypeError,
    ValueError,
}

impl std::fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorClass::TypeError => write!(f, "TypeError"),
            ErrorClass::ValueError => write!(f, "ValueError"),
        }
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum LaxError {
    /// Rank mismatches, bad dimension numbers, out-of-range axes, negative sizes.
    #[error("{class}: {message}")]
    Shape { class: ErrorClass, message: String },

    /// Disallowed dtype for an operation or incompatible dtype combination.
    #[error("{class}: {message}")]
    DType { class: ErrorClass, message: String },

    /// Value-level failure detected while computing.
    #[error("Domain error: {0}")]
    Domain(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Unknown extended dtype: {0}")]
    UnknownExtendedDType(String),

    #[error("Extended dtype already registered: {0}")]
    DuplicateExtendedDType(String),
}

impl LaxError {
    /// Shape error reported as a `TypeError`.
    pub fn type_error(message: impl Into<String>) -> Self {
        LaxError::Shape {
            class: ErrorClass::TypeError,
            message: message.into(),
        }
    }

    /// Shape error reported as a `ValueError`.
    pub fn value_error(message: impl Into<String>) -> Self {
        LaxError::Shape {
            class: ErrorClass::ValueError,
            message: message.into(),
        }
    }

    /// Dtype error; always reported as a `TypeError`.
    pub fn dtype_error(message: impl Into<String>) -> Self {
        LaxError::DType {
            class: ErrorClass::TypeError,
            message: message.into(),
        }
    }

    pub fn domain(message: impl Into<String>) -> Self {
        LaxError::Domain(message.into())
    }

    pub fn class(&self) -> Option<ErrorClass> {
        match self {
            LaxError::Shape { class, .. } | LaxError::DType { class, .. } => Some(*class),
            _ => None,
        }
    }

    pub fn is_type_error(&self) -> bool {
        self.class() == Some(ErrorClass::TypeError)
    }

    pub fn is_value_error(&self) -> bool {
        self.class() == Some(ErrorClass::ValueError)
    }

    /// Message without the class prefix.
    pub fn message(&self) -> String {
        match self {
            LaxError::Shape { message, .. } | LaxError::DType { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }
}
