//! Shape rules for contractions: `conv_general_dilated` and `dot_general`.

use lax_core::primitive::{ConvDimensionNumbers, ConvSpec, DotDimensionNumbers, Padding};
use lax_core::{LaxError, Result, Shape};

use crate::broadcast::format_dims;
use crate::dimension_numbers::check_permutation;
use crate::window::{check_shapelike, dilate_dim, padtype_to_pads, window_output_dim};

/// Fully resolved convolution geometry, shared by inference and execution.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConvGeometry {
    pub dnums: ConvDimensionNumbers,
    /// Explicit `(low, high)` padding per spatial axis, in `lhs_spec` order.
    pub padding: Vec<(i64, i64)>,
    pub out_shape: Shape,
}

fn conv_error(message: String) -> LaxError {
    LaxError::value_error(message)
}

/// Validate a convolution and compute its geometry.
pub fn conv_geometry(lhs: &Shape, rhs: &Shape, spec: &ConvSpec) -> Result<ConvGeometry> {
    const OP: &str = "conv_general_dilated";
    if lhs.ndim() != rhs.ndim() {
        return Err(conv_error(format!(
            "{OP} lhs and rhs must have the same number of dimensions, but got {} and {}.",
            lhs.tuple_str(),
            rhs.tuple_str()
        )));
    }
    if lhs.ndim() < 2 {
        return Err(conv_error(format!(
            "{OP} lhs must have rank at least 2, got shape {}.",
            lhs.tuple_str()
        )));
    }
    let ndim = lhs.ndim();
    let dnums = spec
        .dimension_numbers
        .clone()
        .unwrap_or_else(|| ConvDimensionNumbers::default_for_rank(ndim));
    check_permutation(&dnums.lhs_spec, ndim, OP, "lhs_spec")?;
    check_permutation(&dnums.rhs_spec, ndim, OP, "rhs_spec")?;
    check_permutation(&dnums.out_spec, ndim, OP, "out_spec")?;

    let nspatial = ndim - 2;
    let vectors = [
        ("window_strides", spec.window_strides.as_slice()),
        ("lhs_dilation", spec.lhs_dilation.as_slice()),
        ("rhs_dilation", spec.rhs_dilation.as_slice()),
    ];
    for (name, values) in vectors {
        if values.len() != nspatial {
            return Err(conv_error(format!(
                "{OP} window and {name} must have the same number of dimensions, but got {nspatial} and {}.",
                values.len()
            )));
        }
        check_shapelike(OP, name, values)?;
    }
    if let Padding::Explicit(pads) = &spec.padding
        && pads.len() != nspatial
    {
        return Err(conv_error(format!(
            "{OP} padding argument must have one (low, high) pair per spatial dimension, got {pads:?} for {nspatial} spatial dimensions."
        )));
    }

    let fgc = spec.feature_group_count;
    let bgc = spec.batch_group_count;
    if fgc == 0 || bgc == 0 {
        return Err(conv_error(format!(
            "{OP} feature_group_count and batch_group_count must be positive integers, got {fgc} and {bgc}."
        )));
    }
    if fgc > 1 && bgc > 1 {
        return Err(conv_error(format!(
            "At most one of feature_group_count and batch_group_count may be > 1, got feature_group_count={fgc} and batch_group_count={bgc}"
        )));
    }

    let lhs_batch = lhs.dims()[dnums.lhs_spec[0]];
    let lhs_feature = lhs.dims()[dnums.lhs_spec[1]];
    let rhs_out = rhs.dims()[dnums.rhs_spec[0]];
    let rhs_in = rhs.dims()[dnums.rhs_spec[1]];

    if !lhs_feature.is_multiple_of(fgc) {
        return Err(conv_error(format!(
            "{OP} feature_group_count must divide lhs feature dimension size, but {fgc} does not divide {lhs_feature}."
        )));
    }
    if lhs_feature / fgc != rhs_in {
        return Err(conv_error(format!(
            "{OP} lhs feature dimension size divided by feature_group_count must equal the rhs input feature dimension size, but {lhs_feature} // {fgc} != {rhs_in}."
        )));
    }
    if !rhs_out.is_multiple_of(fgc) {
        return Err(conv_error(format!(
            "{OP} rhs output feature dimension size must be a multiple of feature_group_count, but {rhs_out} is not a multiple of {fgc}."
        )));
    }
    if !lhs_batch.is_multiple_of(bgc) {
        return Err(conv_error(format!(
            "{OP} batch_group_count must divide lhs batch dimension size, but {bgc} does not divide {lhs_batch}."
        )));
    }
    if !rhs_out.is_multiple_of(bgc) {
        return Err(conv_error(format!(
            "{OP} rhs output feature dimension size must be a multiple of batch_group_count, but {rhs_out} is not a multiple of {bgc}."
        )));
    }

    let lhs_spatial: Vec<usize> = dnums.lhs_spec[2..].iter().map(|&a| lhs.dims()[a]).collect();
    let rhs_spatial: Vec<usize> = dnums.rhs_spec[2..].iter().map(|&a| rhs.dims()[a]).collect();
    if rhs_spatial.contains(&0) {
        return Err(conv_error(format!(
            "{OP} kernel spatial dimensions must be positive after dilation, got {}.",
            format_dims(&rhs_spatial)
        )));
    }
    let eff_rhs: Vec<usize> = rhs_spatial
        .iter()
        .zip(&spec.rhs_dilation)
        .map(|(&k, &d)| dilate_dim(k, d))
        .collect();
    let padding = padtype_to_pads(&lhs_spatial, &eff_rhs, &spec.window_strides, &spec.padding);

    let mut out = vec![0usize; ndim];
    out[dnums.out_spec[0]] = lhs_batch / bgc;
    out[dnums.out_spec[1]] = rhs_out;
    for i in 0..nspatial {
        let (lo, hi) = padding[i];
        let padded = dilate_dim(lhs_spatial[i], spec.lhs_dilation[i]) as i64 + lo + hi;
        if padded < 0 {
            return Err(conv_error(format!(
                "{OP} padding {padding:?} results in a negative padded size for lhs shape {}.",
                lhs.tuple_str()
            )));
        }
        out[dnums.out_spec[i + 2]] = window_output_dim(padded, eff_rhs[i], spec.window_strides[i]);
    }

    Ok(ConvGeometry {
        dnums,
        padding,
        out_shape: Shape::new(out),
    })
}

fn dot_error(message: String) -> LaxError {
    LaxError::type_error(message)
}

/// Validate `dot_general` dimension numbers and compute the output shape:
/// batch dims, then lhs free dims, then rhs free dims.
pub fn dot_general_shape(lhs: &Shape, rhs: &Shape, dnums: &DotDimensionNumbers) -> Result<Shape> {
    let (lc, rc) = (&dnums.lhs_contracting, &dnums.rhs_contracting);
    let (lb, rb) = (&dnums.lhs_batch, &dnums.rhs_batch);
    if lb.len() != rb.len() {
        return Err(dot_error(format!(
            "dot_general requires equal numbers of lhs_batch_dimensions and rhs_batch_dimensions, got lhs_batch_dimensions {} and rhs_batch_dimensions {}.",
            format_dims(lb),
            format_dims(rb)
        )));
    }
    if lc.len() != rc.len() {
        return Err(dot_error(format!(
            "dot_general requires equal numbers of lhs_contracting_dimensions and rhs_contracting_dimensions, got {} and {}.",
            format_dims(lc),
            format_dims(rc)
        )));
    }
    for (side, shape, batch, contract) in [("lhs", lhs, lb, lc), ("rhs", rhs, rb, rc)] {
        if batch.iter().chain(contract.iter()).any(|&d| d >= shape.ndim()) {
            return Err(dot_error(format!(
                "dot_general requires {side} batch dimensions and {side} contracting dimensions to be in range [0, {}), got {side}_batch_dimensions {} and {side}_contracting_dimensions {}.",
                shape.ndim(),
                format_dims(batch),
                format_dims(contract)
            )));
        }
        let mut all: Vec<usize> = batch.iter().chain(contract.iter()).copied().collect();
        all.sort_unstable();
        if all.windows(2).any(|w| w[0] == w[1]) {
            return Err(dot_error(format!(
                "dot_general requires {side} batch and contracting dimensions to be distinct and disjoint, got {side}_batch_dimensions {} and {side}_contracting_dimensions {}.",
                format_dims(batch),
                format_dims(contract)
            )));
        }
    }
    let lhs_batch_shape: Vec<usize> = lb.iter().map(|&d| lhs.dims()[d]).collect();
    let rhs_batch_shape: Vec<usize> = rb.iter().map(|&d| rhs.dims()[d]).collect();
    if lhs_batch_shape != rhs_batch_shape {
        return Err(dot_error(format!(
            "dot_general requires lhs batch dimensions and rhs batch dimensions to have the same shape, got {} and {}.",
            format_dims(&lhs_batch_shape),
            format_dims(&rhs_batch_shape)
        )));
    }
    let lhs_contract_shape: Vec<usize> = lc.iter().map(|&d| lhs.dims()[d]).collect();
    let rhs_contract_shape: Vec<usize> = rc.iter().map(|&d| rhs.dims()[d]).collect();
    if lhs_contract_shape != rhs_contract_shape {
        return Err(dot_error(format!(
            "dot_general requires contracting dimensions to have the same shape, got {} and {}.",
            format_dims(&lhs_contract_shape),
            format_dims(&rhs_contract_shape)
        )));
    }

    let mut out = lhs_batch_shape;
    out.extend(free_dims(lhs.ndim(), lb, lc).iter().map(|&d| lhs.dims()[d]));
    out.extend(free_dims(rhs.ndim(), rb, rc).iter().map(|&d| rhs.dims()[d]));
    Ok(Shape::new(out))
}

/// Axes that are neither batch nor contracting, in order.
pub fn free_dims(ndim: usize, batch: &[usize], contracting: &[usize]) -> Vec<usize> {
    (0..ndim)
        .filter(|d| !batch.contains(d) && !contracting.contains(d))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn s(dims: &[usize]) -> Shape {
        Shape::new(dims.to_vec())
    }

    #[test]
    fn test_conv_valid_shape() {
        let spec = ConvSpec::new(vec![1, 1], Padding::Valid);
        let g = conv_geometry(&s(&[2, 3, 9, 10]), &s(&[4, 3, 3, 3]), &spec).unwrap();
        assert_eq!(g.out_shape, s(&[2, 4, 7, 8]));
        assert_eq!(g.padding, vec![(0, 0), (0, 0)]);
    }

    #[test]
    fn test_conv_same_stride_shape() {
        let spec = ConvSpec::new(vec![2, 2], Padding::Same);
        let g = conv_geometry(&s(&[1, 1, 5, 6]), &s(&[1, 1, 4, 3]), &spec).unwrap();
        // ceil(5/2) = 3, ceil(6/2) = 3
        assert_eq!(g.out_shape, s(&[1, 1, 3, 3]));
        // dim0: total (3-1)*2 + 4 - 5 = 3 → (1, 2); dim1: 4 + 3 - 6 = 1 → (0, 1)
        assert_eq!(g.padding, vec![(1, 2), (0, 1)]);
    }

    #[test]
    fn test_conv_dilations_shape() {
        let spec = ConvSpec::new(vec![1], Padding::Valid).with_dilation(vec![2], vec![2]);
        // lhs 4 dilated to 7; kernel 3 dilated to 5 → 3
        let g = conv_geometry(&s(&[1, 1, 4]), &s(&[1, 1, 3]), &spec).unwrap();
        assert_eq!(g.out_shape, s(&[1, 1, 3]));
    }

    #[test]
    fn test_conv_nhwc_layout() {
        let dn = ConvDimensionNumbers::from_strings("NHWC", "HWIO", "NHWC").unwrap();
        let spec = ConvSpec::new(vec![1, 1], Padding::Valid).with_dimension_numbers(dn);
        let g = conv_geometry(&s(&[2, 9, 10, 3]), &s(&[3, 3, 3, 4]), &spec).unwrap();
        assert_eq!(g.out_shape, s(&[2, 7, 8, 4]));
    }

    #[test]
    fn test_conv_groups_shape() {
        let spec = ConvSpec::new(vec![1], Padding::Valid).with_feature_group_count(2);
        let g = conv_geometry(&s(&[1, 4, 5]), &s(&[6, 2, 1]), &spec).unwrap();
        assert_eq!(g.out_shape, s(&[1, 6, 5]));
        let spec = ConvSpec::new(vec![1], Padding::Valid).with_batch_group_count(2);
        let g = conv_geometry(&s(&[4, 3, 5]), &s(&[6, 3, 1]), &spec).unwrap();
        assert_eq!(g.out_shape, s(&[2, 6, 5]));
    }

    #[test]
    fn test_conv0d() {
        let spec = ConvSpec::new(vec![], Padding::Valid);
        let g = conv_geometry(&s(&[10, 5]), &s(&[7, 5]), &spec).unwrap();
        assert_eq!(g.out_shape, s(&[10, 7]));
    }

    #[test]
    fn test_conv_errors() {
        let spec = ConvSpec::new(vec![1, 1], Padding::Valid);
        let err = conv_geometry(&s(&[1, 1, 3, 3]), &s(&[1, 1, 3]), &spec).unwrap_err();
        assert!(err.is_value_error());
        assert!(err.message().contains("lhs and rhs must have the same number of dimensions"));

        let spec = ConvSpec::new(vec![1], Padding::Valid);
        let err = conv_geometry(&s(&[1, 1, 3, 3]), &s(&[1, 1, 3, 3]), &spec).unwrap_err();
        assert!(err.message().contains("window and window_strides must have the same number of dimensions"));

        let spec = ConvSpec::new(vec![1, 1], Padding::Explicit(vec![(3, 3)]));
        let err = conv_geometry(&s(&[1, 1, 3, 3]), &s(&[1, 1, 3, 3]), &spec).unwrap_err();
        assert!(err.message().contains("padding argument"));

        let spec = ConvSpec::new(vec![1, 0], Padding::Valid);
        let err = conv_geometry(&s(&[1, 1, 3, 3]), &s(&[1, 1, 3, 3]), &spec).unwrap_err();
        assert!(err.is_type_error());

        let spec = ConvSpec::new(vec![1], Padding::Valid);
        let err = conv_geometry(&s(&[1, 4, 3]), &s(&[1, 3, 1]), &spec).unwrap_err();
        assert!(err.message().contains("rhs input feature dimension size"));

        let spec = ConvSpec::new(vec![1], Padding::Valid)
            .with_feature_group_count(2)
            .with_batch_group_count(2);
        let err = conv_geometry(&s(&[2, 4, 3]), &s(&[2, 2, 1]), &spec).unwrap_err();
        assert!(err.message().contains("At most one"));
    }

    #[test]
    fn test_dot_general_shape() {
        let dn = DotDimensionNumbers {
            lhs_contracting: vec![2],
            rhs_contracting: vec![1],
            lhs_batch: vec![0],
            rhs_batch: vec![0],
        };
        let out = dot_general_shape(&s(&[3, 4, 5]), &s(&[3, 5, 6]), &dn).unwrap();
        assert_eq!(out, s(&[3, 4, 6]));
    }

    #[test]
    fn test_dot_general_errors() {
        let dn = DotDimensionNumbers {
            lhs_contracting: vec![1],
            rhs_contracting: vec![0],
            ..Default::default()
        };
        let err = dot_general_shape(&s(&[3, 4]), &s(&[5, 6]), &dn).unwrap_err();
        assert!(err.message().contains("contracting dimensions to have the same shape"));
        let dn = DotDimensionNumbers {
            lhs_contracting: vec![1],
            rhs_contracting: vec![0],
            lhs_batch: vec![1],
            rhs_batch: vec![1],
        };
        let err = dot_general_shape(&s(&[3, 4]), &s(&[4, 4]), &dn).unwrap_err();
        assert!(err.message().contains("distinct and disjoint"));
    }
}
