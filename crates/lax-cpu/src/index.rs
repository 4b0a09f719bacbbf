//! Row-major index arithmetic shared by the executors.

use lax_core::{Array, LaxError, Result, Scalar, Shape, ShapedArray};

/// Row-major strides for `dims`.
pub fn strides(dims: &[usize]) -> Vec<usize> {
    let mut strides = vec![1; dims.len()];
    for i in (0..dims.len().saturating_sub(1)).rev() {
        strides[i] = strides[i + 1] * dims[i + 1];
    }
    strides
}

/// Multi-index of flat offset `flat` in `dims`.
pub fn unravel(mut flat: usize, dims: &[usize]) -> Vec<usize> {
    let mut idx = vec![0; dims.len()];
    for i in (0..dims.len()).rev() {
        if dims[i] > 0 {
            idx[i] = flat % dims[i];
            flat /= dims[i];
        }
    }
    idx
}

pub fn ravel(idx: &[usize], strides: &[usize]) -> usize {
    idx.iter().zip(strides).map(|(i, s)| i * s).sum()
}

/// Iterates every multi-index of a shape in row-major order.
///
/// A rank-0 shape yields one empty index; a shape with a zero dim yields
/// nothing.
pub struct IndexIter {
    dims: Vec<usize>,
    next: Option<Vec<usize>>,
}

impl IndexIter {
    pub fn new(dims: &[usize]) -> Self {
        let next = if dims.contains(&0) {
            None
        } else {
            Some(vec![0; dims.len()])
        };
        Self {
            dims: dims.to_vec(),
            next,
        }
    }
}

impl Iterator for IndexIter {
    type Item = Vec<usize>;

    fn next(&mut self) -> Option<Vec<usize>> {
        let current = self.next.take()?;
        let mut succ = current.clone();
        for axis in (0..self.dims.len()).rev() {
            succ[axis] += 1;
            if succ[axis] < self.dims[axis] {
                self.next = Some(succ);
                return Some(current);
            }
            succ[axis] = 0;
        }
        Some(current)
    }
}

pub fn require_input<'a>(inputs: &[&'a Array], idx: usize) -> Result<&'a Array> {
    inputs
        .get(idx)
        .copied()
        .ok_or_else(|| LaxError::InvalidArgument(format!("expected input at index {idx}")))
}

pub fn require_output(outputs: &[ShapedArray], idx: usize) -> Result<&ShapedArray> {
    outputs
        .get(idx)
        .ok_or_else(|| LaxError::InvalidArgument(format!("expected output aval at index {idx}")))
}

/// Build an array carrying exactly the dtype and weak flag of `aval`.
pub fn build(aval: &ShapedArray, data: Vec<Scalar>) -> Result<Array> {
    Ok(Array::new(aval.shape.clone(), aval.dtype, data)?.with_weak_type(aval.weak_type))
}

/// Same as [`build`] with an explicit shape.
pub fn build_shaped(shape: &Shape, aval: &ShapedArray, data: Vec<Scalar>) -> Result<Array> {
    Ok(Array::new(shape.clone(), aval.dtype, data)?.with_weak_type(aval.weak_type))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strides() {
        assert_eq!(strides(&[2, 3, 4]), vec![12, 4, 1]);
        assert_eq!(strides(&[]), Vec::<usize>::new());
    }

    #[test]
    fn test_unravel_ravel() {
        let dims = [2, 3, 4];
        let s = strides(&dims);
        for flat in 0..24 {
            assert_eq!(ravel(&unravel(flat, &dims), &s), flat);
        }
        assert_eq!(unravel(23, &dims), vec![1, 2, 3]);
    }

    #[test]
    fn test_index_iter() {
        let all: Vec<_> = IndexIter::new(&[2, 2]).collect();
        assert_eq!(all, vec![vec![0, 0], vec![0, 1], vec![1, 0], vec![1, 1]]);
        assert_eq!(IndexIter::new(&[]).count(), 1);
        assert_eq!(IndexIter::new(&[3, 0]).count(), 0);
    }
}
