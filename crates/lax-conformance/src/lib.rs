//! Golden conformance testing infrastructure.
//!
//! Compares CPU engine outputs against reference values recorded as JSON
//! fixtures under `goldens/`, with configurable tolerances. Error cases pin
//! both the error class and the literal message wording.

pub mod golden;

pub use golden::{GoldenCase, GoldenError, GoldenFile, goldens_dir, load_goldens};

/// Assert two f32 slices are element-wise close. NaNs compare equal to NaNs.
pub fn assert_allclose(a: &[f32], b: &[f32], atol: f32, rtol: f32) {
    assert_eq!(
        a.len(),
        b.len(),
        "length mismatch: rust={} reference={}",
        a.len(),
        b.len()
    );
    for (i, (x, y)) in a.iter().zip(b.iter()).enumerate() {
        if x.is_nan() && y.is_nan() {
            continue;
        }
        if x.is_infinite() || y.is_infinite() {
            assert_eq!(x, y, "mismatch at [{i}]: rust={x} reference={y}");
            continue;
        }
        let diff = (x - y).abs();
        let tol = atol + rtol * y.abs();
        assert!(
            diff <= tol,
            "mismatch at [{i}]: rust={x} reference={y} diff={diff} tol={tol}"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allclose_exact() {
        assert_allclose(&[1.0, 2.0, 3.0], &[1.0, 2.0, 3.0], 1e-6, 1e-6);
    }

    #[test]
    fn test_allclose_within_tolerance() {
        assert_allclose(&[1.0001], &[1.0], 1e-3, 1e-3);
    }

    #[test]
    fn test_allclose_nan_and_inf() {
        assert_allclose(&[f32::NAN, f32::NEG_INFINITY], &[f32::NAN, f32::NEG_INFINITY], 0.0, 0.0);
    }

    #[test]
    #[should_panic(expected = "mismatch")]
    fn test_allclose_fails() {
        assert_allclose(&[1.0], &[2.0], 1e-6, 1e-6);
    }

    #[test]
    #[should_panic(expected = "mismatch")]
    fn test_allclose_inf_sign() {
        assert_allclose(&[f32::INFINITY], &[f32::NEG_INFINITY], 1e-6, 1e-6);
    }
}
