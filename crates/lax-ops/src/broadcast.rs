//! Broadcasting rules: implicit NumPy-style broadcasting for elementwise ops
//! and the explicit `broadcast_in_dim` shape rule.

use lax_core::{LaxError, Result, Shape};

/// Compute the broadcast shape of two shapes, or None if incompatible.
///
/// Rules (NumPy-style):
/// 1. Align shapes from the trailing dimension.
/// 2. For each dimension pair: must be equal, or one must be 1.
/// 3. The output dimension is the max of the two.
pub fn broadcast_shapes(a: &Shape, b: &Shape) -> Option<Shape> {
    Shape::broadcast_shapes(a, b)
}

/// Broadcast any number of shapes, failing with a `ValueError`.
pub fn broadcast_all(op_name: &str, shapes: &[&Shape]) -> Result<Shape> {
    let mut out = Shape::scalar();
    for s in shapes {
        out = broadcast_shapes(&out, s).ok_or_else(|| {
            let all: Vec<String> = shapes.iter().map(|s| s.tuple_str()).collect();
            LaxError::value_error(format!(
                "{op_name} got incompatible shapes for broadcasting: {}.",
                all.join(", ")
            ))
        })?;
    }
    Ok(out)
}

/// Validate `broadcast_in_dim(operand, shape, broadcast_dimensions)`.
///
/// Checks run in a fixed order so that the first violated rule is reported:
/// dimension count, target rank, subset of output axes, per-axis sizes,
/// strictly increasing.
pub fn broadcast_in_dim_shape(
    operand: &Shape,
    shape: &[usize],
    broadcast_dimensions: &[usize],
) -> Result<Shape> {
    let dims = format_dims(broadcast_dimensions);
    let target = Shape::new(shape.to_vec()).tuple_str();
    if operand.ndim() != broadcast_dimensions.len() {
        return Err(LaxError::type_error(format!(
            "broadcast_in_dim broadcast_dimensions must have length equal to operand ndim; got broadcast_dimensions {dims} for operand ndim {}.",
            operand.ndim()
        )));
    }
    if shape.len() < operand.ndim() {
        return Err(LaxError::type_error(format!(
            "broadcast_in_dim target broadcast shape must have equal or higher rank to the operand shape; got operand ndim {} and target broadcast ndim {}.",
            operand.ndim(),
            shape.len()
        )));
    }
    if broadcast_dimensions.iter().any(|&d| d >= shape.len()) {
        return Err(LaxError::type_error(format!(
            "broadcast_in_dim broadcast_dimensions must be a subset of output dimensions, got {dims} for operand ndim {} and shape {target}",
            operand.ndim()
        )));
    }
    for (&op_dim, &out_axis) in operand.dims().iter().zip(broadcast_dimensions) {
        if op_dim != 1 && op_dim != shape[out_axis] {
            return Err(LaxError::type_error(format!(
                "broadcast_in_dim operand dimension sizes must either be 1, or be equal to their corresponding dimensions in the target broadcast shape; got operand of shape {}, target broadcast shape {target}, broadcast_dimensions {dims} ",
                operand.tuple_str()
            )));
        }
    }
    if broadcast_dimensions.windows(2).any(|w| w[0] >= w[1]) {
        return Err(LaxError::type_error(format!(
            "broadcast_in_dim broadcast_dimensions must be strictly increasing; got broadcast_dimensions {dims}"
        )));
    }
    Ok(Shape::new(shape.to_vec()))
}

/// Python-tuple style rendering of an axis list, e.g. `(0, 2)`.
pub fn format_dims(dims: &[usize]) -> String {
    Shape::new(dims.to_vec()).tuple_str()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_shapes() {
        let a = Shape::new(vec![2, 3]);
        let b = Shape::new(vec![2, 3]);
        assert_eq!(broadcast_shapes(&a, &b), Some(Shape::new(vec![2, 3])));
    }

    #[test]
    fn test_scalar_broadcast() {
        let a = Shape::new(vec![2, 3]);
        let b = Shape::scalar();
        assert_eq!(broadcast_shapes(&a, &b), Some(Shape::new(vec![2, 3])));
    }

    #[test]
    fn test_incompatible() {
        let a = Shape::new(vec![2, 3]);
        let b = Shape::new(vec![2, 4]);
        assert_eq!(broadcast_shapes(&a, &b), None);
        let err = broadcast_all("add", &[&a, &b]).unwrap_err();
        assert!(err.is_value_error());
        assert!(err.message().contains("(2, 3), (2, 4)"));
    }

    #[test]
    fn test_broadcast_all_three() {
        let a = Shape::new(vec![2, 1]);
        let b = Shape::new(vec![3]);
        let c = Shape::scalar();
        assert_eq!(broadcast_all("select_n", &[&a, &b, &c]).unwrap(), Shape::new(vec![2, 3]));
    }

    #[test]
    fn test_broadcast_in_dim_ok() {
        let out = broadcast_in_dim_shape(&Shape::new(vec![3]), &[2, 3], &[1]).unwrap();
        assert_eq!(out, Shape::new(vec![2, 3]));
        let out = broadcast_in_dim_shape(&Shape::new(vec![1, 3]), &[4, 3], &[0, 1]).unwrap();
        assert_eq!(out, Shape::new(vec![4, 3]));
        let out = broadcast_in_dim_shape(&Shape::scalar(), &[2, 2], &[]).unwrap();
        assert_eq!(out, Shape::new(vec![2, 2]));
    }

    fn bid_err(operand: &[usize], shape: &[usize], dims: &[usize]) -> String {
        let err = broadcast_in_dim_shape(&Shape::new(operand.to_vec()), shape, dims).unwrap_err();
        assert!(err.is_type_error());
        err.message()
    }

    #[test]
    fn test_broadcast_in_dim_errors() {
        assert!(
            bid_err(&[2], &[2, 2], &[0, 1])
                .contains("broadcast_dimensions must have length equal to operand ndim")
        );
        assert!(
            bid_err(&[2, 2], &[2], &[0, 1]).contains(
                "target broadcast shape must have equal or higher rank to the operand shape"
            )
        );
        assert!(
            bid_err(&[2], &[2, 3], &[2])
                .contains("broadcast_in_dim broadcast_dimensions must be a subset of output dimensions")
        );
        assert!(bid_err(&[3], &[2, 2], &[1]).contains(
            "operand dimension sizes must either be 1, or be equal to their corresponding dimensions in the target broadcast shape"
        ));
        assert!(
            bid_err(&[2, 2], &[2, 2], &[1, 0])
                .contains("broadcast_dimensions must be strictly increasing")
        );
        assert!(
            bid_err(&[2, 2], &[2, 2, 2], &[1, 1])
                .contains("broadcast_dimensions must be strictly increasing")
        );
    }
}
