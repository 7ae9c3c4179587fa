use std::time::Duration;

use normcheck_core::Shape;
use serde::{Deserialize, Serialize};

use crate::compare::ErrorStats;
use crate::precision::Precision;
use crate::{HarnessError, Result};

/// One softmax conformance case: input shape `(batch_size, rows, cols)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TestCase {
    pub batch_size: usize,
    pub rows: usize,
    pub cols: usize,
    pub precision: Precision,
    pub iterations: usize,
}

impl TestCase {
    /// A case with a single iteration.
    pub const fn new(batch_size: usize, rows: usize, cols: usize, precision: Precision) -> Self {
        Self {
            batch_size,
            rows,
            cols,
            precision,
            iterations: 1,
        }
    }

    pub const fn with_iterations(mut self, iterations: usize) -> Self {
        self.iterations = iterations;
        self
    }

    /// Reject empty dimensions and zero iterations.
    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 || self.rows == 0 || self.cols == 0 {
            return Err(HarnessError::Config(format!(
                "every dimension must be at least 1 ({self})"
            )));
        }
        if self.iterations == 0 {
            return Err(HarnessError::Config(format!(
                "iterations must be at least 1 ({self})"
            )));
        }
        Ok(())
    }

    pub fn shape(&self) -> Shape {
        Shape::new(vec![
            self.batch_size as i64,
            self.rows as i64,
            self.cols as i64,
        ])
    }

    pub fn numel(&self) -> usize {
        self.batch_size * self.rows * self.cols
    }
}

impl std::fmt::Display for TestCase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "batch_size={} rows={} cols={} precision={} iterations={}",
            self.batch_size, self.rows, self.cols, self.precision, self.iterations
        )
    }
}

/// Outcome of a passing case.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CaseReport {
    pub case: TestCase,
    pub max_abs_error: f32,
    pub mean_abs_error: f32,
    pub elapsed_ms: f64,
    pub elapsed_per_iter_ms: f64,
}

impl CaseReport {
    pub fn new(case: TestCase, stats: ErrorStats, elapsed: Duration) -> Self {
        let elapsed_ms = elapsed.as_secs_f64() * 1e3;
        Self {
            case,
            max_abs_error: stats.max_abs,
            mean_abs_error: stats.mean_abs,
            elapsed_ms,
            elapsed_per_iter_ms: elapsed_ms / case.iterations.max(1) as f64,
        }
    }
}

impl std::fmt::Display for CaseReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "softmax test batch_size: {:6} m: {:6} n: {:6} data_type: {} \
             max_abs_error: {:.5} mean_abs_error: {:.5} elapsed {:.5} ms \
             iter {} elapsed_per_iter {:.5} ms",
            self.case.batch_size,
            self.case.rows,
            self.case.cols,
            self.case.precision,
            self.max_abs_error,
            self.mean_abs_error,
            self.elapsed_ms,
            self.case.iterations,
            self.elapsed_per_iter_ms,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate() {
        assert!(TestCase::new(1, 32, 4, Precision::Half).validate().is_ok());
        for bad in [
            TestCase::new(0, 32, 4, Precision::Half),
            TestCase::new(1, 0, 4, Precision::Half),
            TestCase::new(1, 32, 0, Precision::Single),
            TestCase::new(1, 32, 4, Precision::Single).with_iterations(0),
        ] {
            assert!(matches!(bad.validate(), Err(HarnessError::Config(_))));
        }
    }

    #[test]
    fn test_shape() {
        let case = TestCase::new(2, 64, 32, Precision::Single);
        assert_eq!(case.shape(), Shape::new(vec![2, 64, 32]));
        assert_eq!(case.numel(), 4096);
    }

    #[test]
    fn test_report_line() {
        let case = TestCase::new(2, 64, 64, Precision::Single).with_iterations(4);
        let stats = ErrorStats {
            max_abs: 0.000_12,
            mean_abs: 0.000_01,
            worst_index: 0,
        };
        let report = CaseReport::new(case, stats, Duration::from_millis(8));
        assert_eq!(report.elapsed_per_iter_ms, 2.0);
        assert_eq!(
            report.to_string(),
            "softmax test batch_size:      2 m:     64 n:     64 data_type: single \
             max_abs_error: 0.00012 mean_abs_error: 0.00001 elapsed 8.00000 ms \
             iter 4 elapsed_per_iter 2.00000 ms"
        );
    }
}
