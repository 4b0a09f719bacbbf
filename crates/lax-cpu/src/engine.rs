//! Dispatch core: validates, infers and executes primitives.
//!
//! Every call to [`Engine::execute`] runs [`Engine::infer`] first, so the
//! inference path and the execution path report the same errors for the same
//! invalid attributes. Attributes that name a dtype are canonicalized against
//! the engine [`Config`] before either path sees them.

use std::sync::Arc;

use smallvec::SmallVec;
use tracing::{debug, trace};

use lax_core::backend::{DefaultBackend, default_backend};
use lax_core::primitive::{ConvSpec, DotGeneralSpec, Primitive, ScatterSpec};
use lax_core::{
    Array, Backend, Config, DType, ExtendedArray, ExtendedDType, ExtendedDTypeRegistry, LaxError,
    Result, Shape, ShapedArray,
};

use crate::backend::CpuRefBackend;

type Avals = SmallVec<[ShapedArray; 4]>;

pub struct Engine {
    backend: Box<dyn Backend>,
    config: Config,
    registry: ExtendedDTypeRegistry,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new(Config::from_env())
    }
}

impl Engine {
    /// Engine on the backend selected by `LAX_RS_BACKEND`.
    pub fn new(config: Config) -> Self {
        let backend: Box<dyn Backend> = match default_backend() {
            DefaultBackend::Cpu => Box::new(CpuRefBackend),
        };
        Self::with_backend(backend, config)
    }

    pub fn with_backend(backend: Box<dyn Backend>, config: Config) -> Self {
        Self {
            backend,
            config,
            registry: ExtendedDTypeRegistry::new(),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    pub fn registry(&self) -> &ExtendedDTypeRegistry {
        &self.registry
    }

    pub fn register_dtype(&mut self, dtype: Arc<dyn ExtendedDType>) -> Result<()> {
        self.registry.register(dtype)
    }

    pub fn unregister_dtype(&mut self, name: &str) -> Result<Arc<dyn ExtendedDType>> {
        self.registry.unregister(name)
    }

    /// Apply engine-level defaults to a primitive's attributes.
    pub fn canonicalize(&self, prim: &Primitive) -> Primitive {
        let canon = |d: DType| self.config.canonicalize_dtype(d);
        match prim {
            Primitive::Iota {
                dtype,
                shape,
                dimension,
            } => Primitive::Iota {
                dtype: canon(*dtype),
                shape: shape.clone(),
                dimension: *dimension,
            },
            Primitive::ConvertElementType {
                new_dtype,
                weak_type,
            } => Primitive::ConvertElementType {
                new_dtype: canon(*new_dtype),
                weak_type: *weak_type,
            },
            Primitive::BitcastConvertType { new_dtype } => Primitive::BitcastConvertType {
                new_dtype: canon(*new_dtype),
            },
            Primitive::Argmax { axis, index_dtype } => Primitive::Argmax {
                axis: *axis,
                index_dtype: canon(*index_dtype),
            },
            Primitive::Argmin { axis, index_dtype } => Primitive::Argmin {
                axis: *axis,
                index_dtype: canon(*index_dtype),
            },
            Primitive::ConvGeneralDilated(spec) => Primitive::ConvGeneralDilated(ConvSpec {
                preferred_element_type: spec.preferred_element_type.map(canon),
                ..spec.clone()
            }),
            Primitive::DotGeneral(spec) => Primitive::DotGeneral(DotGeneralSpec {
                preferred_element_type: spec.preferred_element_type.map(canon),
                ..spec.clone()
            }),
            Primitive::Scatter(spec) => Primitive::Scatter(ScatterSpec {
                mode: Some(spec.mode.unwrap_or(self.config.default_scatter_mode)),
                ..spec.clone()
            }),
            other => other.clone(),
        }
    }

    /// Validate `prim` against input avals and compute the output avals.
    pub fn infer(&self, prim: &Primitive, inputs: &[ShapedArray]) -> Result<Vec<ShapedArray>> {
        lax_ops::infer(&self.canonicalize(prim), inputs)
    }

    /// Validate and run `prim`, returning one array per output.
    pub fn execute(&self, prim: &Primitive, inputs: &[&Array]) -> Result<Vec<Array>> {
        let prim = self.canonicalize(prim);
        let avals: Avals = inputs.iter().map(|a| a.aval()).collect();
        debug!(
            op = prim.name(),
            backend = self.backend.name(),
            inputs = %format_avals(&avals),
            "execute"
        );
        let outputs = lax_ops::infer(&prim, &avals)?;
        let results = self.backend.execute(&prim, inputs, &outputs)?;
        trace!(op = prim.name(), outputs = %format_avals(&outputs), "execute done");
        Ok(results)
    }

    /// Run `prim` and return its single output.
    pub fn execute1(&self, prim: &Primitive, inputs: &[&Array]) -> Result<Array> {
        self.execute(prim, inputs)?
            .into_iter()
            .next()
            .ok_or_else(|| LaxError::InvalidArgument(format!("{} produced no outputs", prim.name())))
    }

    // ── extended dtypes ─────────────────────────────────────────────────────

    /// Run a structural primitive on extended arrays by lowering it to the
    /// physical arrays. `operands` are the extended inputs (two for
    /// `dynamic_update_slice`, otherwise one); `indices` are the start
    /// indices of the dynamic slicing primitives.
    pub fn execute_extended(
        &self,
        prim: &Primitive,
        operands: &[&ExtendedArray],
        indices: &[&Array],
    ) -> Result<ExtendedArray> {
        let Some(first) = operands.first() else {
            return Err(LaxError::InvalidArgument(format!(
                "{} expects at least one extended operand",
                prim.name()
            )));
        };
        let dtype = self.registry.get(first.type_name())?;
        if let Some(other) = operands.iter().find(|o| o.type_name() != dtype.name()) {
            return Err(LaxError::type_error(format!(
                "{} requires operands of one extended dtype, got {} and {}",
                prim.name(),
                first.aval_str(),
                other.aval_str()
            )));
        }

        let physical: Vec<&Array> = operands.iter().map(|o| o.physical()).collect();
        let trailing = dtype.element_dims().len();
        let zero_index = Array::scalar(0i64, indices.first().map_or(DType::I32, |i| i.dtype()));
        let zeros: Vec<&Array> = (0..trailing).map(|_| &zero_index).collect();

        let (lowered, inputs) = match prim {
            Primitive::Slice {
                start_indices,
                limit_indices,
                strides,
            } => (
                dtype.slice_rule(start_indices, limit_indices, strides.as_deref()),
                vec![physical[0]],
            ),
            Primitive::DynamicSlice { slice_sizes } => {
                let mut inputs = vec![physical[0]];
                inputs.extend_from_slice(indices);
                inputs.extend_from_slice(&zeros);
                (dtype.dynamic_slice_rule(slice_sizes), inputs)
            }
            Primitive::DynamicUpdateSlice => {
                let (lowered, extra) = dtype.dynamic_update_slice_rule();
                let mut inputs = physical.clone();
                inputs.extend_from_slice(indices);
                inputs.extend((0..extra).map(|_| &zero_index));
                (lowered, inputs)
            }
            Primitive::BroadcastInDim {
                shape,
                broadcast_dimensions,
            } => (
                dtype.broadcast_in_dim_rule(shape, broadcast_dimensions),
                vec![physical[0]],
            ),
            Primitive::Transpose { permutation } => (dtype.transpose_rule(permutation), vec![physical[0]]),
            other => {
                return Err(LaxError::type_error(format!(
                    "{} is not supported on extended dtype {}",
                    other.name(),
                    first.aval_str()
                )));
            }
        };

        let out = self.execute1(&lowered, &inputs)?;
        let dims = out.shape().dims();
        let logical = Shape::new(dims[..dims.len() - trailing].to_vec());
        ExtendedArray::new(dtype, logical, out)
    }
}

fn format_avals(avals: &[ShapedArray]) -> String {
    let parts: Vec<String> = avals.iter().map(|a| a.str_short()).collect();
    format!("({})", parts.join(", "))
}

/// Engine with the CPU reference backend and environment configuration.
pub fn cpu_engine() -> Engine {
    Engine::with_backend(Box::new(CpuRefBackend), Config::from_env())
}
