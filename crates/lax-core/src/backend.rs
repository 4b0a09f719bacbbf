//! Backend trait: pluggable executor for validated primitives.
//!
//! A `Backend` only computes. Validation and shape inference run before it is
//! called, so a backend may assume operands match the inferred output avals.

use tracing::{debug, warn};

use crate::Result;
use crate::array::Array;
use crate::primitive::Primitive;
use crate::types::ShapedArray;

pub const BACKEND_ENV: &str = "LAX_RS_BACKEND";

pub trait Backend: Send + Sync {
    fn name(&self) -> &'static str;

    /// Execute `prim` on `inputs`, producing one array per entry of `outputs`.
    fn execute(
        &self,
        prim: &Primitive,
        inputs: &[&Array],
        outputs: &[ShapedArray],
    ) -> Result<Vec<Array>>;
}

/// Which backend to use by default.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DefaultBackend {
    Cpu,
}

/// Resolve the default backend.
///
/// Resolution order:
/// 1. `LAX_RS_BACKEND` env var (`cpu`)
/// 2. CPU reference backend
pub fn default_backend() -> DefaultBackend {
    if let Ok(val) = std::env::var(BACKEND_ENV) {
        match val.to_lowercase().as_str() {
            "cpu" => {
                debug!(backend = "cpu", "backend selected from {BACKEND_ENV}");
                return DefaultBackend::Cpu;
            }
            other => warn!(value = other, "unrecognized {BACKEND_ENV}, using cpu"),
        }
    }
    DefaultBackend::Cpu
}
