//! Extended (user-defined) element types.
//!
//! An extended dtype has no arithmetic of its own. Each logical element is
//! stored as a small physical block of a numeric dtype, so an extended array
//! of logical shape `S` is a physical array of shape `S ++ element_dims`.
//! Structural primitives (slicing, broadcasting, transposition) lower to the
//! same primitive on the physical array with the trailing dims carried along.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use tracing::info;

use crate::array::Array;
use crate::primitive::Primitive;
use crate::types::{DType, Shape};
use crate::{LaxError, Result};

/// Capability interface implemented by every extended dtype.
pub trait ExtendedDType: Send + Sync + fmt::Debug {
    fn name(&self) -> &str;

    /// Dtype of the physical storage.
    fn physical_dtype(&self) -> DType;

    /// Trailing dims each logical element occupies.
    fn element_dims(&self) -> Vec<usize>;

    /// Physical block for one default element.
    fn empty(&self) -> Array {
        Array::zeros(&Shape::new(self.element_dims()), self.physical_dtype())
    }

    /// Physical shape for a logical shape.
    fn physical_shape(&self, logical: &Shape) -> Shape {
        let mut dims = logical.0.clone();
        dims.extend(self.element_dims());
        Shape::new(dims)
    }

    fn dynamic_slice_rule(&self, slice_sizes: &[usize]) -> Primitive {
        let mut sizes = slice_sizes.to_vec();
        sizes.extend(self.element_dims());
        Primitive::DynamicSlice { slice_sizes: sizes }
    }

    /// The update is an extended array too; the returned count is how many
    /// zero start indices to append for the element dims.
    fn dynamic_update_slice_rule(&self) -> (Primitive, usize) {
        (Primitive::DynamicUpdateSlice, self.element_dims().len())
    }

    fn slice_rule(
        &self,
        start_indices: &[usize],
        limit_indices: &[usize],
        strides: Option<&[usize]>,
    ) -> Primitive {
        let trailing = self.element_dims();
        let mut start = start_indices.to_vec();
        let mut limit = limit_indices.to_vec();
        start.extend(trailing.iter().map(|_| 0));
        limit.extend(trailing.iter().copied());
        let strides = strides.map(|s| {
            let mut s = s.to_vec();
            s.extend(trailing.iter().map(|_| 1));
            s
        });
        Primitive::Slice {
            start_indices: start,
            limit_indices: limit,
            strides,
        }
    }

    fn broadcast_in_dim_rule(&self, shape: &[usize], broadcast_dimensions: &[usize]) -> Primitive {
        let trailing = self.element_dims();
        let out_rank = shape.len();
        let mut physical_shape = shape.to_vec();
        physical_shape.extend(trailing.iter().copied());
        let mut dims = broadcast_dimensions.to_vec();
        dims.extend(out_rank..out_rank + trailing.len());
        Primitive::BroadcastInDim {
            shape: physical_shape,
            broadcast_dimensions: dims,
        }
    }

    fn transpose_rule(&self, permutation: &[usize]) -> Primitive {
        let rank = permutation.len();
        let mut perm = permutation.to_vec();
        perm.extend(rank..rank + self.element_dims().len());
        Primitive::Transpose { permutation: perm }
    }
}

/// An array whose elements are of an extended dtype.
#[derive(Clone, Debug)]
pub struct ExtendedArray {
    dtype: Arc<dyn ExtendedDType>,
    shape: Shape,
    physical: Array,
}

impl ExtendedArray {
    pub fn new(dtype: Arc<dyn ExtendedDType>, shape: Shape, physical: Array) -> Result<Self> {
        let expected = dtype.physical_shape(&shape);
        if physical.shape() != &expected || physical.dtype() != dtype.physical_dtype() {
            return Err(LaxError::type_error(format!(
                "physical array for {}{} must be {}{}, got {}",
                dtype.name(),
                shape,
                dtype.physical_dtype().short_name(),
                expected,
                physical.aval()
            )));
        }
        Ok(Self {
            dtype,
            shape,
            physical,
        })
    }

    pub fn dtype(&self) -> &Arc<dyn ExtendedDType> {
        &self.dtype
    }

    pub fn type_name(&self) -> &str {
        self.dtype.name()
    }

    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    pub fn physical(&self) -> &Array {
        &self.physical
    }

    /// Aval string such as `foo[3,4]`.
    pub fn aval_str(&self) -> String {
        let dims: Vec<String> = self.shape.0.iter().map(|d| d.to_string()).collect();
        format!("{}[{}]", self.dtype.name(), dims.join(","))
    }
}

impl fmt::Display for ExtendedArray {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.aval_str())
    }
}

/// Registry of extended dtypes, owned by an engine.
#[derive(Debug, Default)]
pub struct ExtendedDTypeRegistry {
    types: HashMap<String, Arc<dyn ExtendedDType>>,
}

impl ExtendedDTypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, dtype: Arc<dyn ExtendedDType>) -> Result<()> {
        let name = dtype.name().to_string();
        if self.types.contains_key(&name) {
            return Err(LaxError::DuplicateExtendedDType(name));
        }
        info!(
            dtype = %name,
            physical = %dtype.physical_dtype(),
            "Registered extended dtype"
        );
        self.types.insert(name, dtype);
        Ok(())
    }

    pub fn unregister(&mut self, name: &str) -> Result<Arc<dyn ExtendedDType>> {
        let removed = self
            .types
            .remove(name)
            .ok_or_else(|| LaxError::UnknownExtendedDType(name.to_string()))?;
        info!(dtype = %name, "Unregistered extended dtype");
        Ok(removed)
    }

    pub fn get(&self, name: &str) -> Result<Arc<dyn ExtendedDType>> {
        self.types
            .get(name)
            .cloned()
            .ok_or_else(|| LaxError::UnknownExtendedDType(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.types.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.types.keys().cloned().collect();
        names.sort();
        names
    }
}
