//! Dimension-number validation for gather and scatter, plus the ordering /
//! uniqueness / permutation checks convolution shares.
//!
//! Error wording is part of the public contract; conformance tests match on
//! these strings.

use lax_core::primitive::{GatherDimensionNumbers, ScatterDimensionNumbers};
use lax_core::{LaxError, Result, Shape};

use crate::broadcast::format_dims;

/// Entries must be non-decreasing.
pub fn is_sorted(dims: &[usize], op_name: &str, name: &str) -> Result<()> {
    if dims.windows(2).any(|w| w[1] < w[0]) {
        return Err(LaxError::type_error(format!(
            "{name} in {op_name} op must be sorted; got {}",
            format_dims(dims)
        )));
    }
    Ok(())
}

/// Entries must be unique.
pub fn no_duplicate_dims(dims: &[usize], op_name: &str, name: &str) -> Result<()> {
    let mut seen = dims.to_vec();
    seen.sort_unstable();
    if seen.windows(2).any(|w| w[0] == w[1]) {
        return Err(LaxError::type_error(format!(
            "{name} in {op_name} op must not repeat; got {}.",
            format_dims(dims)
        )));
    }
    Ok(())
}

/// `perm` must be a permutation of `0..rank`.
pub fn check_permutation(perm: &[usize], rank: usize, op_name: &str, name: &str) -> Result<()> {
    let mut sorted = perm.to_vec();
    sorted.sort_unstable();
    if perm.len() != rank || sorted.iter().enumerate().any(|(i, &p)| i != p) {
        return Err(LaxError::type_error(format!(
            "{op_name} {name} must be a permutation of range({rank}), got {}.",
            format_dims(perm)
        )));
    }
    Ok(())
}

/// Index vectors live on the last axis of the indices array.
fn index_vector_dim(indices: &Shape, op_name: &str) -> Result<usize> {
    if indices.ndim() == 0 {
        return Err(LaxError::type_error(format!(
            "{op_name} indices must have rank at least 1, got shape {}.",
            indices.tuple_str()
        )));
    }
    Ok(indices.ndim() - 1)
}

/// Validate gather dimension numbers and compute the output shape.
pub fn gather_shape(
    operand: &Shape,
    indices: &Shape,
    dnums: &GatherDimensionNumbers,
    slice_sizes: &[usize],
) -> Result<Shape> {
    let rank = operand.ndim();
    let ivd = index_vector_dim(indices, "gather")?;
    let offset_dims = &dnums.offset_dims;
    let collapsed = &dnums.collapsed_slice_dims;
    let start_index_map = &dnums.start_index_map;

    is_sorted(offset_dims, "gather", "offset_dims")?;
    no_duplicate_dims(offset_dims, "gather", "offset_dims")?;

    let output_rank = offset_dims.len() + indices.ndim() - 1;
    for (i, &offset_dim) in offset_dims.iter().enumerate() {
        if offset_dim >= output_rank {
            return Err(LaxError::type_error(format!(
                "Offset dimension {i} in gather op is out of bounds; got {offset_dim}, but should have been in [0, {output_rank})"
            )));
        }
    }

    let bound = indices.dims()[ivd];
    if start_index_map.len() != bound {
        return Err(LaxError::type_error(format!(
            "Gather op has {} elements in start_index_map and the bound of dimension index_vector_dim={ivd} of indices is {bound}. These two numbers must be equal.",
            start_index_map.len()
        )));
    }
    for (i, &operand_dim) in start_index_map.iter().enumerate() {
        if operand_dim >= rank {
            return Err(LaxError::type_error(format!(
                "Invalid start_index_map; domain is [0, {rank}), got: {i}->{operand_dim}."
            )));
        }
    }
    no_duplicate_dims(start_index_map, "gather", "start_index_map")?;

    is_sorted(collapsed, "gather", "collapsed_slice_dims")?;
    no_duplicate_dims(collapsed, "gather", "collapsed_slice_dims")?;
    for &dim in collapsed {
        if dim >= rank {
            return Err(LaxError::type_error(format!(
                "Invalid collapsed_slice_dims set in gather op; valid range is [0, {rank}), got: {dim}."
            )));
        }
    }

    if slice_sizes.len() != rank {
        return Err(LaxError::type_error(format!(
            "Gather op must have one slice size for every input dimension; got: len(slice_sizes)={}, input_shape.rank={rank}",
            slice_sizes.len()
        )));
    }
    if offset_dims.len() + collapsed.len() != rank {
        return Err(LaxError::type_error(format!(
            "All components of the offset index in a gather op must either be a offset dimension or explicitly collapsed; got len(slice_sizes)={}, output_slice_sizes={}, collapsed_slice_dims={}.",
            slice_sizes.len(),
            format_dims(offset_dims),
            format_dims(collapsed)
        )));
    }
    for (i, (&size, &dim)) in slice_sizes.iter().zip(operand.dims()).enumerate() {
        if size > dim {
            return Err(LaxError::type_error(format!(
                "Slice size at index {i} in gather op is out of range, must be within [0, {dim} + 1), got {size}."
            )));
        }
    }
    for (i, &dim) in collapsed.iter().enumerate() {
        let bound = slice_sizes[dim];
        if bound != 1 {
            return Err(LaxError::type_error(format!(
                "Gather op can only collapse slice dims with bound 1, but bound is {bound} for index {dim} at position {i}."
            )));
        }
    }

    let window_sizes: Vec<usize> = slice_sizes
        .iter()
        .enumerate()
        .filter(|(i, _)| !collapsed.contains(i))
        .map(|(_, &s)| s)
        .collect();
    let batch_dims = &indices.dims()[..ivd];
    let mut window_iter = window_sizes.iter();
    let mut batch_iter = batch_dims.iter();
    let mut out = Vec::with_capacity(output_rank);
    for i in 0..output_rank {
        let next = if offset_dims.contains(&i) {
            window_iter.next()
        } else {
            batch_iter.next()
        };
        // Both iterators have exactly the right length after the checks above.
        out.push(next.copied().unwrap_or(0));
    }
    Ok(Shape::new(out))
}

/// Validate scatter dimension numbers against operand, indices and updates.
/// The output shape of a scatter is the operand shape.
pub fn scatter_shape(
    operand: &Shape,
    indices: &Shape,
    updates: &Shape,
    dnums: &ScatterDimensionNumbers,
) -> Result<Shape> {
    let rank = operand.ndim();
    let ivd = index_vector_dim(indices, "scatter")?;
    let update_window_dims = &dnums.update_window_dims;
    let inserted = &dnums.inserted_window_dims;
    let sd2od = &dnums.scatter_dims_to_operand_dims;

    is_sorted(update_window_dims, "scatter", "update_window_dims")?;
    no_duplicate_dims(update_window_dims, "scatter", "update_window_dims")?;
    for &dim in update_window_dims {
        if dim >= updates.ndim() {
            return Err(LaxError::type_error(format!(
                "Invalid update_window_dims set in scatter op; valid range is [0, {}). got: {dim}.",
                updates.ndim()
            )));
        }
    }

    is_sorted(inserted, "scatter", "inserted_window_dims")?;
    no_duplicate_dims(inserted, "scatter", "inserted_window_dims")?;
    for &dim in inserted {
        if dim >= rank {
            return Err(LaxError::type_error(format!(
                "Invalid inserted_window_dims set in scatter op; valid range is [0, {rank}), got: {dim}."
            )));
        }
    }

    let window_size = update_window_dims.len() + inserted.len();
    if window_size != rank {
        return Err(LaxError::type_error(format!(
            "Scatter op has window of size {window_size}; doesn't match operand of rank {rank}."
        )));
    }

    let bound = indices.dims()[ivd];
    if sd2od.len() != bound {
        return Err(LaxError::type_error(format!(
            "Scatter op has {} elements in scatter_dims_to_operand_dims and the bound of dimension index_vector_dim={ivd} of indices is {bound}. These two numbers must be equal",
            sd2od.len()
        )));
    }
    for (i, &dim) in sd2od.iter().enumerate() {
        if dim >= rank {
            return Err(LaxError::type_error(format!(
                "Invalid scatter_dims_to_operand_dims mapping; domain is [0, {rank}), got: {i}->{dim}."
            )));
        }
    }
    no_duplicate_dims(sd2od, "scatter", "scatter_dims_to_operand_dims")?;

    let expected_updates_rank = update_window_dims.len() + indices.ndim() - 1;
    if updates.ndim() != expected_updates_rank {
        return Err(LaxError::type_error(format!(
            "Updates tensor must be of rank {expected_updates_rank}; got {}.",
            updates.ndim()
        )));
    }

    let max_update_slice_sizes: Vec<usize> = (0..rank)
        .filter(|i| !inserted.contains(i))
        .map(|i| operand.dims()[i])
        .collect();
    for (i, &dim) in update_window_dims.iter().enumerate() {
        if max_update_slice_sizes[i] < updates.dims()[dim] {
            return Err(LaxError::type_error(format!(
                "Bounds of the window dimensions of updates must not exceed the bounds of the corresponding dimensions of operand. For dimension {dim}, updates bound is {}, operand bound is {}.",
                updates.dims()[dim],
                max_update_slice_sizes[i]
            )));
        }
    }

    let mut scatter_dims_seen = 0;
    for i in (0..updates.ndim()).filter(|d| !update_window_dims.contains(d)) {
        if scatter_dims_seen == ivd {
            scatter_dims_seen += 1;
        }
        if updates.dims()[i] != indices.dims()[scatter_dims_seen] {
            return Err(LaxError::type_error(format!(
                "Bounds of the scatter dimensions of updates must be the same as the bounds of the corresponding dimensions of scatter indices. For scatter dimension {i}, updates bound is {}, indices bound is {}.",
                updates.dims()[i],
                indices.dims()[scatter_dims_seen]
            )));
        }
        scatter_dims_seen += 1;
    }

    Ok(operand.clone())
}
