//! Element-wise comparison of runtime output against the reference.

use half::f16;
use serde::Serialize;

use crate::{HarnessError, Result};

/// Machine epsilon of IEEE half precision (2^-10).
pub fn half_epsilon() -> f32 {
    f16::EPSILON.to_f32()
}

/// Absolute-difference statistics between two equally sized slices.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct ErrorStats {
    /// Largest `|actual - expected|`; NaN if any element compared as NaN.
    pub max_abs: f32,
    pub mean_abs: f32,
    /// Index of the element that produced `max_abs`.
    pub worst_index: usize,
}

impl ErrorStats {
    /// Whether every element is within `atol` of the reference.
    pub fn within(&self, atol: f32) -> bool {
        self.max_abs <= atol
    }
}

/// Compute max and mean absolute error of `actual` against `expected`.
pub fn abs_error_stats(actual: &[f32], expected: &[f32]) -> Result<ErrorStats> {
    if actual.len() != expected.len() {
        return Err(HarnessError::ShapeMismatch {
            expected: vec![expected.len() as i64],
            got: vec![actual.len() as i64],
        });
    }

    let mut max_abs = 0.0f32;
    let mut worst_index = 0;
    let mut total = 0.0f64;
    for (i, (x, y)) in actual.iter().zip(expected.iter()).enumerate() {
        let diff = (x - y).abs();
        total += f64::from(diff);
        // The first NaN sticks.
        if !max_abs.is_nan() && (diff.is_nan() || diff > max_abs) {
            max_abs = diff;
            worst_index = i;
        }
    }
    let mean_abs = if actual.is_empty() {
        0.0
    } else {
        (total / actual.len() as f64) as f32
    };

    Ok(ErrorStats {
        max_abs,
        mean_abs,
        worst_index,
    })
}

/// Assert two f32 slices are element-wise close.
pub fn assert_allclose(a: &[f32], b: &[f32], atol: f32, rtol: f32) {
    assert_eq!(
        a.len(),
        b.len(),
        "length mismatch: actual={} expected={}",
        a.len(),
        b.len()
    );
    for (i, (x, y)) in a.iter().zip(b.iter()).enumerate() {
        let diff = (x - y).abs();
        let tol = atol + rtol * y.abs();
        assert!(
            diff <= tol,
            "mismatch at [{i}]: actual={x} expected={y} diff={diff} tol={tol}"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_half_epsilon() {
        assert_eq!(half_epsilon(), 0.0009765625);
    }

    #[test]
    fn test_stats_exact() {
        let s = abs_error_stats(&[1.0, 2.0, 3.0], &[1.0, 2.0, 3.0]).unwrap();
        assert_eq!(s.max_abs, 0.0);
        assert_eq!(s.mean_abs, 0.0);
        assert!(s.within(0.0));
    }

    #[test]
    fn test_stats_max_and_mean() {
        let s = abs_error_stats(&[1.0, 2.5, 3.0, 4.0], &[1.0, 2.0, 3.25, 4.0]).unwrap();
        assert_eq!(s.max_abs, 0.5);
        assert_eq!(s.worst_index, 1);
        assert!((s.mean_abs - 0.1875).abs() < 1e-7);
        assert!(!s.within(0.25));
        assert!(s.within(0.5));
    }

    #[test]
    fn test_stats_nan_is_violation() {
        let s = abs_error_stats(&[0.5, f32::NAN, 0.5], &[0.5, 0.5, 0.0]).unwrap();
        assert!(s.max_abs.is_nan());
        assert_eq!(s.worst_index, 1);
        assert!(!s.within(f32::INFINITY));
    }

    #[test]
    fn test_stats_length_mismatch() {
        assert!(matches!(
            abs_error_stats(&[1.0], &[1.0, 2.0]),
            Err(HarnessError::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn test_allclose_within_tolerance() {
        assert_allclose(&[1.0001], &[1.0], 1e-3, 1e-3);
    }

    #[test]
    #[should_panic(expected = "mismatch")]
    fn test_allclose_fails() {
        assert_allclose(&[1.0], &[2.0], 1e-6, 1e-6);
    }
}
