//! Lazy tensor runtime used as the system under test by `normcheck-harness`.
//!
//! `normcheck-core` provides the foundational types (`DType`, `Shape`,
//! `HostArray`), a lazy computation graph, and a `Runtime` context that
//! materializes the graph on a pluggable [`backend::Backend`].
//!
//! The lifecycle mirrors a device runtime:
//!
//! 1. declare input tensors and ops (`Runtime::tensor`, `Tensor::softmax`)
//! 2. `launch()` to schedule the graph and allocate buffers
//! 3. `load_from_host` the inputs
//! 4. `run(iterations, async_run)` then `stop()` for the elapsed time
//! 5. `copy_to_host` the outputs

pub mod backend;
pub mod cpu_kernels;
pub mod graph;
pub mod host;
pub mod runtime;
pub mod schedule;
pub mod types;

pub use backend::Backend;
pub use cpu_kernels::CpuBackend;
pub use graph::NodeId;
pub use host::{HostArray, HostData};
pub use runtime::{Runtime, Tensor};
pub use types::{DType, Shape};

pub type Result<T> = std::result::Result<T, NormError>;

#[derive(thiserror::Error, Debug)]
pub enum NormError {
    #[error("Shape mismatch: expected {expected:?}, got {got:?}")]
    ShapeMismatch { expected: Vec<i64>, got: Vec<i64> },

    #[error("DType mismatch: expected {expected}, got {got}")]
    DTypeMismatch { expected: DType, got: DType },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Invalid runtime state: {0}")]
    Lifecycle(&'static str),

    #[error("Graph error: {0}")]
    Graph(&'static str),

    #[error("Execution failed: {0}")]
    Execution(String),
}
