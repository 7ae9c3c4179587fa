//! Harness configuration: defaults, then environment, then explicit overrides.

use tracing::warn;

use crate::compare::half_epsilon;

/// Environment variable holding a `u64` seed for input generation.
pub const SEED_ENV: &str = "NORMCHECK_SEED";
/// Environment variable forcing synchronous runs (`1` or `true`).
pub const SYNC_ENV: &str = "NORMCHECK_SYNC";

#[derive(Clone, Debug, PartialEq)]
pub struct HarnessConfig {
    /// Seed for the input generator; `None` draws one from the OS.
    pub seed: Option<u64>,
    /// Issue runs asynchronously and wait on them with `stop()`.
    pub async_run: bool,
    /// Absolute per-element tolerance. Half-precision epsilon for both
    /// precisions.
    pub tolerance: f32,
    /// Print each passing case's report line to stdout.
    pub print_reports: bool,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            seed: None,
            async_run: true,
            tolerance: half_epsilon(),
            print_reports: true,
        }
    }
}

impl HarnessConfig {
    /// Defaults overlaid with `NORMCHECK_SEED` and `NORMCHECK_SYNC`.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut cfg = Self::default();

        if let Some(raw) = lookup(SEED_ENV) {
            match raw.trim().parse::<u64>() {
                Ok(seed) => cfg.seed = Some(seed),
                Err(_) => warn!(value = %raw, "ignoring unparseable {}", SEED_ENV),
            }
        }

        if let Some(raw) = lookup(SYNC_ENV) {
            match raw.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" => cfg.async_run = false,
                "0" | "false" | "no" | "" => {}
                _ => warn!(value = %raw, "ignoring unrecognized {}", SYNC_ENV),
            }
        }

        cfg
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_async_run(mut self, async_run: bool) -> Self {
        self.async_run = async_run;
        self
    }

    pub fn with_print_reports(mut self, print_reports: bool) -> Self {
        self.print_reports = print_reports;
        self
    }
}
