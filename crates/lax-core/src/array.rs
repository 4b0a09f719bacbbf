//! Immutable dense arrays.

use std::sync::Arc;

use num_complex::Complex64;

use crate::scalar::Scalar;
use crate::types::{DType, Shape, ShapedArray};
use crate::{LaxError, Result};

/// A dense row-major array. Operations never mutate an `Array`; they build
/// new ones. Cloning is cheap (the buffer is shared).
#[derive(Clone, Debug, PartialEq)]
pub struct Array {
    shape: Shape,
    dtype: DType,
    weak_type: bool,
    data: Arc<[Scalar]>,
}

impl Array {
    /// Build an array from scalars, normalizing every element to `dtype`.
    pub fn new(shape: impl Into<Shape>, dtype: DType, data: Vec<Scalar>) -> Result<Self> {
        let shape = shape.into();
        if data.len() != shape.numel() {
            return Err(LaxError::InvalidArgument(format!(
                "data length {} does not match shape {} (numel {})",
                data.len(),
                shape,
                shape.numel()
            )));
        }
        let data: Vec<Scalar> = data.into_iter().map(|s| s.cast(dtype)).collect();
        Ok(Self {
            shape,
            dtype,
            weak_type: false,
            data: Arc::from(data),
        })
    }

    pub fn from_f32(data: &[f32], shape: &Shape) -> Result<Self> {
        Self::new(shape.clone(), DType::F32, data.iter().map(|&v| v.into()).collect())
    }

    pub fn from_f64(data: &[f64], shape: &Shape) -> Result<Self> {
        Self::new(shape.clone(), DType::F64, data.iter().map(|&v| v.into()).collect())
    }

    pub fn from_i32(data: &[i32], shape: &Shape) -> Result<Self> {
        Self::new(shape.clone(), DType::I32, data.iter().map(|&v| v.into()).collect())
    }

    pub fn from_i64(data: &[i64], shape: &Shape) -> Result<Self> {
        Self::new(shape.clone(), DType::I64, data.iter().map(|&v| v.into()).collect())
    }

    pub fn from_u32(data: &[u32], shape: &Shape) -> Result<Self> {
        Self::new(shape.clone(), DType::U32, data.iter().map(|&v| v.into()).collect())
    }

    pub fn from_bool(data: &[bool], shape: &Shape) -> Result<Self> {
        Self::new(shape.clone(), DType::Bool, data.iter().map(|&v| v.into()).collect())
    }

    pub fn from_c64(data: &[Complex64], shape: &Shape) -> Result<Self> {
        Self::new(shape.clone(), DType::C64, data.iter().map(|&v| v.into()).collect())
    }

    /// Rank-0 array.
    pub fn scalar(value: impl Into<Scalar>, dtype: DType) -> Self {
        Self::full(&Shape::scalar(), value, dtype)
    }

    /// Rank-0 weakly-typed array, as produced by an untyped literal.
    pub fn weak_scalar(value: impl Into<Scalar>, dtype: DType) -> Self {
        Self::scalar(value, dtype).with_weak_type(true)
    }

    pub fn full(shape: &Shape, value: impl Into<Scalar>, dtype: DType) -> Self {
        let v = value.into().cast(dtype);
        Self {
            shape: shape.clone(),
            dtype,
            weak_type: false,
            data: vec![v; shape.numel()].into(),
        }
    }

    pub fn zeros(shape: &Shape, dtype: DType) -> Self {
        Self::full(shape, Scalar::zero(dtype), dtype)
    }

    pub fn ones(shape: &Shape, dtype: DType) -> Self {
        Self::full(shape, Scalar::one(dtype), dtype)
    }

    /// `[0, 1, ..., n-1]`.
    pub fn arange(n: usize, dtype: DType) -> Self {
        let data: Vec<Scalar> = (0..n).map(|i| Scalar::Int(i as i64).cast(dtype)).collect();
        Self {
            shape: Shape::new(vec![n]),
            dtype,
            weak_type: false,
            data: data.into(),
        }
    }

    pub fn with_weak_type(mut self, weak_type: bool) -> Self {
        self.weak_type = weak_type;
        self
    }

    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    pub fn dtype(&self) -> DType {
        self.dtype
    }

    pub fn weak_type(&self) -> bool {
        self.weak_type
    }

    pub fn ndim(&self) -> usize {
        self.shape.ndim()
    }

    pub fn numel(&self) -> usize {
        self.data.len()
    }

    /// Abstract value of this array.
    pub fn aval(&self) -> ShapedArray {
        ShapedArray {
            shape: self.shape.clone(),
            dtype: self.dtype,
            weak_type: self.weak_type,
        }
    }

    pub fn data(&self) -> &[Scalar] {
        &self.data
    }

    /// Element at a multi-index, or `None` when out of bounds.
    pub fn get(&self, index: &[usize]) -> Option<Scalar> {
        if index.len() != self.ndim() {
            return None;
        }
        let mut flat = 0usize;
        for ((&i, &d), s) in index.iter().zip(self.shape.dims()).zip(self.shape.strides()) {
            if i >= d {
                return None;
            }
            flat += i * s;
        }
        self.data.get(flat).copied()
    }

    /// Value of a rank-0 array.
    pub fn item(&self) -> Result<Scalar> {
        if self.numel() != 1 {
            return Err(LaxError::InvalidArgument(format!(
                "item() requires a single-element array, got shape {}",
                self.shape
            )));
        }
        Ok(self.data[0])
    }

    /// Same data reinterpreted with a new shape of equal size.
    pub fn reshape(&self, shape: &Shape) -> Result<Array> {
        if shape.numel() != self.numel() {
            return Err(LaxError::type_error(format!(
                "reshape total size must be unchanged, got new_sizes {} for shape {}.",
                shape.tuple_str(),
                self.shape.tuple_str()
            )));
        }
        Ok(Self {
            shape: shape.clone(),
            dtype: self.dtype,
            weak_type: self.weak_type,
            data: Arc::clone(&self.data),
        })
    }

    /// Convert every element to `dtype`; the result is strongly typed.
    pub fn astype(&self, dtype: DType) -> Array {
        let data: Vec<Scalar> = self.data.iter().map(|s| s.cast(dtype)).collect();
        Self {
            shape: self.shape.clone(),
            dtype,
            weak_type: false,
            data: data.into(),
        }
    }

    pub fn to_vec_f32(&self) -> Vec<f32> {
        self.data.iter().map(|s| s.as_f64() as f32).collect()
    }

    pub fn to_vec_f64(&self) -> Vec<f64> {
        self.data.iter().map(|s| s.as_f64()).collect()
    }

    pub fn to_vec_i64(&self) -> Vec<i64> {
        self.data.iter().map(|s| s.as_i64()).collect()
    }

    pub fn to_vec_bool(&self) -> Vec<bool> {
        self.data.iter().map(|s| s.as_bool()).collect()
    }

    pub fn to_vec_c64(&self) -> Vec<Complex64> {
        self.data.iter().map(|s| s.as_complex()).collect()
    }
}
