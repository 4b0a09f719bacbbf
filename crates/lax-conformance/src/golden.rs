//! JSON golden fixtures.
//!
//! A fixture file holds a list of cases. Each case names one primitive with its
//! attributes, the input arrays, and either the expected outputs or the
//! expected error class and message fragment.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use lax_core::primitive::{
    BinaryOp, ConvDimensionNumbers, ConvSpec, GatherDimensionNumbers, GatherScatterMode, GatherSpec,
    Monoid, Padding, Primitive, ScatterDimensionNumbers, ScatterKind, ScatterSpec, WindowSpec,
};
use lax_core::{Array, DType, Scalar, Shape};
use lax_cpu::Engine;

#[derive(thiserror::Error, Debug)]
pub enum GoldenError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("case {case}: {source}")]
    Lax {
        case: String,
        source: lax_core::LaxError,
    },
}

/// Array literal: `data` is row-major and cast to `dtype`.
#[derive(Clone, Debug, Deserialize)]
pub struct TensorSpec {
    pub shape: Vec<usize>,
    pub dtype: DType,
    pub data: Vec<f64>,
    #[serde(default)]
    pub weak: bool,
}

impl TensorSpec {
    pub fn to_array(&self) -> lax_core::Result<Array> {
        let data = self.data.iter().map(|&v| Scalar::Float(v)).collect();
        Ok(Array::new(Shape::new(self.shape.clone()), self.dtype, data)?.with_weak_type(self.weak))
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(untagged)]
pub enum PaddingSpec {
    Named(String),
    Explicit(Vec<(i64, i64)>),
}

impl PaddingSpec {
    fn to_padding(&self) -> lax_core::Result<Padding> {
        match self {
            PaddingSpec::Named(name) => name.parse(),
            PaddingSpec::Explicit(pairs) => Ok(Padding::Explicit(pairs.clone())),
        }
    }
}

#[derive(Clone, Copy, Debug, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BinaryName {
    Add,
    Sub,
    Mul,
    Div,
    Max,
    Min,
}

#[derive(Clone, Copy, Debug, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MonoidName {
    Sum,
    Prod,
    Max,
    Min,
}

#[derive(Clone, Copy, Debug, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScatterName {
    Replace,
    Add,
    Mul,
    Min,
    Max,
}

fn default_one() -> usize {
    1
}

/// One primitive and its attributes, tagged by `"kind"`.
#[derive(Clone, Debug, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OpSpec {
    Binary {
        name: BinaryName,
    },
    ReduceWindow {
        monoid: MonoidName,
        window_dimensions: Vec<usize>,
        window_strides: Vec<usize>,
        padding: PaddingSpec,
        #[serde(default)]
        base_dilation: Option<Vec<usize>>,
        #[serde(default)]
        window_dilation: Option<Vec<usize>>,
    },
    Conv {
        window_strides: Vec<usize>,
        padding: PaddingSpec,
        #[serde(default)]
        lhs_dilation: Option<Vec<usize>>,
        #[serde(default)]
        rhs_dilation: Option<Vec<usize>>,
        #[serde(default)]
        dimension_numbers: Option<(String, String, String)>,
        #[serde(default = "default_one")]
        feature_group_count: usize,
        #[serde(default = "default_one")]
        batch_group_count: usize,
    },
    Gather {
        offset_dims: Vec<usize>,
        collapsed_slice_dims: Vec<usize>,
        start_index_map: Vec<usize>,
        slice_sizes: Vec<usize>,
        #[serde(default)]
        mode: Option<String>,
        #[serde(default)]
        fill_value: Option<f64>,
    },
    Scatter {
        combine: ScatterName,
        update_window_dims: Vec<usize>,
        inserted_window_dims: Vec<usize>,
        scatter_dims_to_operand_dims: Vec<usize>,
        #[serde(default)]
        mode: Option<String>,
    },
    Sort {
        dimension: i64,
        #[serde(default = "default_one")]
        num_keys: usize,
    },
    TopK {
        k: i64,
    },
    Pad {
        padding_config: Vec<(i64, i64, i64)>,
    },
    DynamicSlice {
        slice_sizes: Vec<usize>,
    },
    BroadcastInDim {
        shape: Vec<usize>,
        broadcast_dimensions: Vec<usize>,
    },
}

fn parse_mode(mode: &Option<String>) -> lax_core::Result<Option<GatherScatterMode>> {
    mode.as_deref().map(str::parse).transpose()
}

impl OpSpec {
    pub fn to_primitive(&self) -> lax_core::Result<Primitive> {
        Ok(match self {
            OpSpec::Binary { name } => Primitive::Binary(match name {
                BinaryName::Add => BinaryOp::Add,
                BinaryName::Sub => BinaryOp::Sub,
                BinaryName::Mul => BinaryOp::Mul,
                BinaryName::Div => BinaryOp::Div,
                BinaryName::Max => BinaryOp::Max,
                BinaryName::Min => BinaryOp::Min,
            }),
            OpSpec::ReduceWindow {
                monoid,
                window_dimensions,
                window_strides,
                padding,
                base_dilation,
                window_dilation,
            } => {
                let mut window = WindowSpec::new(
                    window_dimensions.clone(),
                    window_strides.clone(),
                    padding.to_padding()?,
                );
                if let Some(d) = base_dilation {
                    window = window.with_base_dilation(d.clone());
                }
                if let Some(d) = window_dilation {
                    window = window.with_window_dilation(d.clone());
                }
                Primitive::ReduceWindowMonoid {
                    monoid: match monoid {
                        MonoidName::Sum => Monoid::Sum,
                        MonoidName::Prod => Monoid::Prod,
                        MonoidName::Max => Monoid::Max,
                        MonoidName::Min => Monoid::Min,
                    },
                    window,
                }
            }
            OpSpec::Conv {
                window_strides,
                padding,
                lhs_dilation,
                rhs_dilation,
                dimension_numbers,
                feature_group_count,
                batch_group_count,
            } => {
                let n = window_strides.len();
                let mut spec = ConvSpec::new(window_strides.clone(), padding.to_padding()?)
                    .with_dilation(
                        lhs_dilation.clone().unwrap_or_else(|| vec![1; n]),
                        rhs_dilation.clone().unwrap_or_else(|| vec![1; n]),
                    )
                    .with_feature_group_count(*feature_group_count)
                    .with_batch_group_count(*batch_group_count);
                if let Some((l, r, o)) = dimension_numbers {
                    spec = spec.with_dimension_numbers(ConvDimensionNumbers::from_strings(l, r, o)?);
                }
                Primitive::ConvGeneralDilated(spec)
            }
            OpSpec::Gather {
                offset_dims,
                collapsed_slice_dims,
                start_index_map,
                slice_sizes,
                mode,
                fill_value,
            } => {
                let mut spec = GatherSpec::new(
                    GatherDimensionNumbers {
                        offset_dims: offset_dims.clone(),
                        collapsed_slice_dims: collapsed_slice_dims.clone(),
                        start_index_map: start_index_map.clone(),
                    },
                    slice_sizes.clone(),
                );
                spec.mode = parse_mode(mode)?;
                spec.fill_value = fill_value.map(Scalar::Float);
                Primitive::Gather(spec)
            }
            OpSpec::Scatter {
                combine,
                update_window_dims,
                inserted_window_dims,
                scatter_dims_to_operand_dims,
                mode,
            } => {
                let kind = match combine {
                    ScatterName::Replace => ScatterKind::Replace,
                    ScatterName::Add => ScatterKind::Add,
                    ScatterName::Mul => ScatterKind::Mul,
                    ScatterName::Min => ScatterKind::Min,
                    ScatterName::Max => ScatterKind::Max,
                };
                let mut spec = ScatterSpec::new(
                    kind,
                    ScatterDimensionNumbers {
                        update_window_dims: update_window_dims.clone(),
                        inserted_window_dims: inserted_window_dims.clone(),
                        scatter_dims_to_operand_dims: scatter_dims_to_operand_dims.clone(),
                    },
                );
                spec.mode = parse_mode(mode)?;
                Primitive::Scatter(spec)
            }
            OpSpec::Sort {
                dimension,
                num_keys,
            } => Primitive::Sort {
                dimension: *dimension,
                is_stable: true,
                num_keys: *num_keys,
            },
            OpSpec::TopK { k } => Primitive::TopK { k: *k },
            OpSpec::Pad { padding_config } => Primitive::Pad {
                padding_config: padding_config.clone(),
            },
            OpSpec::DynamicSlice { slice_sizes } => Primitive::DynamicSlice {
                slice_sizes: slice_sizes.clone(),
            },
            OpSpec::BroadcastInDim {
                shape,
                broadcast_dimensions,
            } => Primitive::BroadcastInDim {
                shape: shape.clone(),
                broadcast_dimensions: broadcast_dimensions.clone(),
            },
        })
    }
}

/// Expected error: its class (`TypeError`/`ValueError`) and a message fragment.
#[derive(Clone, Debug, Deserialize)]
pub struct ExpectedError {
    pub class: String,
    pub contains: String,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Expected {
    Outputs(Vec<TensorSpec>),
    Error(ExpectedError),
}

#[derive(Clone, Debug, Deserialize)]
pub struct GoldenCase {
    pub name: String,
    pub op: OpSpec,
    pub inputs: Vec<TensorSpec>,
    pub expected: Expected,
    #[serde(default)]
    pub atol: Option<f32>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct GoldenFile {
    pub cases: Vec<GoldenCase>,
}

/// Directory holding the checked-in fixtures.
pub fn goldens_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("goldens")
}

pub fn load_goldens(path: &Path) -> Result<GoldenFile, GoldenError> {
    let text = fs::read_to_string(path).map_err(|source| GoldenError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&text).map_err(|source| GoldenError::Json {
        path: path.to_path_buf(),
        source,
    })
}

impl GoldenCase {
    /// Build the inputs and run the case's primitive on `engine`. Bad input
    /// literals are fixture errors; bad attributes belong to the case result.
    pub fn run(&self, engine: &Engine) -> Result<lax_core::Result<Vec<Array>>, GoldenError> {
        let lax = |source| GoldenError::Lax {
            case: self.name.clone(),
            source,
        };
        let inputs = self
            .inputs
            .iter()
            .map(TensorSpec::to_array)
            .collect::<lax_core::Result<Vec<_>>>()
            .map_err(lax)?;
        let refs: Vec<&Array> = inputs.iter().collect();
        Ok(self
            .op
            .to_primitive()
            .and_then(|prim| engine.execute(&prim, &refs)))
    }

    /// Run the case and assert its expectation, panicking with the case name
    /// on any mismatch.
    pub fn check(&self, engine: &Engine) {
        let name = &self.name;
        let result = match self.run(engine) {
            Ok(result) => result,
            Err(e) => panic!("{e}"),
        };
        match (&self.expected, result) {
            (Expected::Outputs(expected), Ok(outputs)) => {
                assert_eq!(outputs.len(), expected.len(), "{name}: output count");
                let atol = self.atol.unwrap_or(1e-6);
                for (i, (got, want)) in outputs.iter().zip(expected).enumerate() {
                    assert_eq!(got.shape().dims(), &want.shape[..], "{name}: output {i} shape");
                    assert_eq!(got.dtype(), want.dtype, "{name}: output {i} dtype");
                    let want_f32: Vec<f32> = want.data.iter().map(|&v| v as f32).collect();
                    crate::assert_allclose(&got.to_vec_f32(), &want_f32, atol, atol);
                }
            }
            (Expected::Error(expected), Err(err)) => {
                let class = err.class().map(|c| c.to_string()).unwrap_or_default();
                assert_eq!(class, expected.class, "{name}: error class of {err}");
                assert!(
                    err.message().contains(&expected.contains),
                    "{name}: expected {:?} in {:?}",
                    expected.contains,
                    err.message()
                );
            }
            (Expected::Outputs(_), Err(err)) => panic!("{name}: unexpected error {err}"),
            (Expected::Error(expected), Ok(_)) => {
                panic!("{name}: expected {} but the case succeeded", expected.class)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_case() {
        let json = r#"{
            "name": "add_weak",
            "op": {"kind": "binary", "name": "add"},
            "inputs": [
                {"shape": [2], "dtype": "bf16", "data": [1, 2]},
                {"shape": [], "dtype": "f32", "data": [0.5], "weak": true}
            ],
            "expected": {"outputs": [{"shape": [2], "dtype": "bf16", "data": [1.5, 2.5]}]}
        }"#;
        let case: GoldenCase = serde_json::from_str(json).unwrap();
        assert!(matches!(case.op.to_primitive().unwrap(), Primitive::Binary(BinaryOp::Add)));
        assert!(case.inputs[1].weak);
        assert!(matches!(case.expected, Expected::Outputs(ref o) if o[0].dtype == DType::BF16));
    }

    #[test]
    fn test_unknown_kind_rejected() {
        let json = r#"{"name": "x", "op": {"kind": "fft"}, "inputs": [], "expected": {"outputs": []}}"#;
        assert!(serde_json::from_str::<GoldenCase>(json).is_err());
    }

    #[test]
    fn test_parse_padding_forms() {
        let named: PaddingSpec = serde_json::from_str(r#""SAME""#).unwrap();
        assert_eq!(named.to_padding().unwrap(), Padding::Same);
        let explicit: PaddingSpec = serde_json::from_str("[[1, 2]]").unwrap();
        assert_eq!(explicit.to_padding().unwrap(), Padding::Explicit(vec![(1, 2)]));
    }

    #[test]
    fn test_tensor_spec_casts() {
        let t: TensorSpec =
            serde_json::from_str(r#"{"shape": [2], "dtype": "i32", "data": [1.7, -2.0]}"#).unwrap();
        let a = t.to_array().unwrap();
        assert_eq!(a.dtype(), DType::I32);
        assert_eq!(a.to_vec_i64(), vec![1, -2]);
    }
}
