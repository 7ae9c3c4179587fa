//! The conformance driver.

use half::f16;
use normcheck_core::{HostArray, Shape};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{error, info};

use crate::backend::{ComputeBackend, ComputeContext};
use crate::case::{CaseReport, TestCase};
use crate::compare::abs_error_stats;
use crate::config::HarnessConfig;
use crate::oracle::{ReferenceOracle, ScalarSoftmax};
use crate::precision::Precision;
use crate::suite::{CaseOutcome, SuiteReport, default_cases};
use crate::{CpuRuntimeBackend, HarnessError, Result};

/// Uniform `[0, 1)` host data of the given shape and precision.
///
/// Half-precision values are drawn as `f32` and rounded, so a few may land
/// exactly on 1.0.
pub fn random_input<R: Rng>(
    shape: &Shape,
    precision: Precision,
    rng: &mut R,
) -> Result<HostArray> {
    let n = shape.numel() as usize;
    let array = match precision {
        Precision::Single => {
            HostArray::from_f32(shape.clone(), (0..n).map(|_| rng.random::<f32>()).collect())
        }
        Precision::Half => HostArray::from_f16(
            shape.clone(),
            (0..n).map(|_| f16::from_f32(rng.random::<f32>())).collect(),
        ),
    }?;
    Ok(array)
}

/// Drives test cases through a backend and checks them against an oracle.
///
/// The backend is acquired once and lives as long as the harness; each case
/// opens and drops its own context.
pub struct Harness<B, O = ScalarSoftmax> {
    backend: B,
    oracle: O,
    config: HarnessConfig,
    rng: StdRng,
}

impl Harness<CpuRuntimeBackend> {
    /// Harness over the in-process CPU runtime with the scalar reference.
    pub fn cpu(config: HarnessConfig) -> Self {
        Self::new(CpuRuntimeBackend, ScalarSoftmax, config)
    }
}

impl<B: ComputeBackend, O: ReferenceOracle> Harness<B, O> {
    pub fn new(backend: B, oracle: O, config: HarnessConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        Self {
            backend,
            oracle,
            config,
            rng,
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Run one case end to end.
    ///
    /// Returns the report on success. Runtime errors come back as
    /// [`HarnessError::Runtime`] unchanged; an element outside the tolerance
    /// yields [`HarnessError::Conformance`].
    pub fn run_one_case(&mut self, case: &TestCase) -> Result<CaseReport> {
        case.validate()?;
        let shape = case.shape();

        let mut ctx = self.backend.open()?;
        let input = ctx.tensor(&shape, case.precision.dtype())?;
        let output = ctx.softmax_last_axis(&input)?;
        ctx.launch()?;

        let host_input = random_input(&shape, case.precision, &mut self.rng)?;
        ctx.load_from_host(&input, &host_input)?;
        ctx.run(case.iterations, self.config.async_run)?;
        let elapsed = ctx.stop()?;
        let host_output = ctx.copy_to_host(&output)?;
        drop(ctx);

        if host_output.shape() != &shape {
            return Err(HarnessError::ShapeMismatch {
                expected: shape.0.clone(),
                got: host_output.shape().0.clone(),
            });
        }

        let reference = self
            .oracle
            .softmax_last_axis(&host_input.to_f32_vec(), &shape)?;
        let stats = abs_error_stats(&host_output.to_f32_vec(), &reference)?;

        if !stats.within(self.config.tolerance) {
            return Err(HarnessError::Conformance {
                case: *case,
                max_abs: stats.max_abs,
                mean_abs: stats.mean_abs,
                tolerance: self.config.tolerance,
                index: stats.worst_index,
            });
        }

        let report = CaseReport::new(*case, stats, elapsed);
        if self.config.print_reports {
            println!("{report}");
        }
        info!(
            backend = self.backend.name(),
            case = %case,
            max_abs_error = report.max_abs_error,
            mean_abs_error = report.mean_abs_error,
            elapsed_ms = report.elapsed_ms,
            "softmax case passed"
        );
        Ok(report)
    }

    /// Run `cases` in order. A failing case is recorded and the next one
    /// still runs.
    pub fn run_cases(&mut self, cases: &[TestCase]) -> SuiteReport {
        let mut outcomes = Vec::with_capacity(cases.len());
        for case in cases {
            let outcome = match self.run_one_case(case) {
                Ok(report) => CaseOutcome::passed(report),
                Err(e) => {
                    error!(case = %case, error = %e, "softmax case failed");
                    CaseOutcome::failed(*case, &e)
                }
            };
            outcomes.push(outcome);
        }
        SuiteReport {
            backend: self.backend.name().to_string(),
            outcomes,
        }
    }

    /// Run the built-in case list.
    pub fn run_suite(&mut self) -> SuiteReport {
        self.run_cases(default_cases())
    }
}
