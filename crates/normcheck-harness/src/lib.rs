//! Numerical conformance harness for row-wise softmax.
//!
//! For each [`TestCase`] the harness declares a `(batch, rows, cols)` input on
//! a [`ComputeBackend`], asks it for softmax along the last axis, feeds
//! uniform random data in `[0, 1)`, runs it, and compares the result against
//! an independent single-precision [`ReferenceOracle`]. Every element must be
//! within the half-precision epsilon of the reference, for both precisions.

pub mod backend;
pub mod case;
pub mod compare;
pub mod config;
pub mod harness;
pub mod oracle;
pub mod precision;
pub mod suite;

pub use backend::{ComputeBackend, ComputeContext, CpuRuntimeBackend};
pub use case::{CaseReport, TestCase};
pub use compare::{ErrorStats, abs_error_stats, assert_allclose, half_epsilon};
pub use config::HarnessConfig;
pub use harness::{Harness, random_input};
pub use oracle::{ReferenceOracle, ScalarSoftmax};
pub use precision::Precision;
pub use suite::{CaseOutcome, SuiteReport, default_cases};

use normcheck_core::NormError;

pub type Result<T> = std::result::Result<T, HarnessError>;

#[derive(thiserror::Error, Debug)]
pub enum HarnessError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Runtime(#[from] NormError),

    #[error("Reference failed: {0}")]
    Reference(String),

    #[error("Shape mismatch: expected {expected:?}, got {got:?}")]
    ShapeMismatch { expected: Vec<i64>, got: Vec<i64> },

    #[error(
        "softmax mismatch for {case}: max_abs_error {max_abs:.6} exceeds tolerance {tolerance:.6} \
         at [{index}] (mean_abs_error {mean_abs:.6})"
    )]
    Conformance {
        case: TestCase,
        max_abs: f32,
        mean_abs: f32,
        tolerance: f32,
        index: usize,
    },
}
