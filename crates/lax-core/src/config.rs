//! Runtime configuration.
//!
//! Resolution order for each field: explicit builder call, then environment
//! variable, then the built-in default.
//!
//! | Variable | Values | Default |
//! |----------|--------|---------|
//! | `LAX_RS_ENABLE_X64` | `1`, `true`, `yes` | disabled |
//! | `LAX_RS_SCATTER_MODE` | `clip`, `fill`, `drop`, `promise_in_bounds` | `fill` |

use crate::primitive::GatherScatterMode;
use crate::types::DType;

pub const ENABLE_X64_ENV: &str = "LAX_RS_ENABLE_X64";
pub const SCATTER_MODE_ENV: &str = "LAX_RS_SCATTER_MODE";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Config {
    /// Keep 64-bit dtypes; when false they canonicalize to 32-bit.
    pub enable_x64: bool,
    /// Scatter mode used when a scatter leaves its mode unspecified.
    pub default_scatter_mode: GatherScatterMode,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            enable_x64: false,
            default_scatter_mode: GatherScatterMode::FillOrDrop,
        }
    }
}

impl Config {
    /// Defaults overridden by any recognized environment variables.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(val) = std::env::var(ENABLE_X64_ENV) {
            match val.to_lowercase().as_str() {
                "1" | "true" | "yes" => config.enable_x64 = true,
                "0" | "false" | "no" => config.enable_x64 = false,
                _ => {} // ignore unrecognized values, fall through
            }
        }
        if let Ok(val) = std::env::var(SCATTER_MODE_ENV)
            && let Ok(mode) = val.parse::<GatherScatterMode>()
        {
            config.default_scatter_mode = mode;
        }
        config
    }

    pub fn with_x64(mut self, enable: bool) -> Self {
        self.enable_x64 = enable;
        self
    }

    pub fn with_scatter_mode(mut self, mode: GatherScatterMode) -> Self {
        self.default_scatter_mode = mode;
        self
    }

    /// Map a requested dtype to the dtype actually used.
    pub fn canonicalize_dtype(&self, dtype: DType) -> DType {
        if self.enable_x64 {
            return dtype;
        }
        match dtype {
            DType::I64 => DType::I32,
            DType::U64 => DType::U32,
            DType::F64 => DType::F32,
            DType::C128 => DType::C64,
            other => other,
        }
    }

    /// Dtype given to untyped integer literals.
    pub fn default_int_dtype(&self) -> DType {
        if self.enable_x64 { DType::I64 } else { DType::I32 }
    }

    /// Dtype given to untyped float literals.
    pub fn default_float_dtype(&self) -> DType {
        if self.enable_x64 { DType::F64 } else { DType::F32 }
    }

    pub fn default_complex_dtype(&self) -> DType {
        if self.enable_x64 { DType::C128 } else { DType::C64 }
    }
}
