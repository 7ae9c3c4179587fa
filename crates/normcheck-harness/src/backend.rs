//! Seams between the harness and the runtime under test.
//!
//! A [`ComputeBackend`] is the suite-scoped resource; the harness opens one
//! fresh [`ComputeContext`] per test case and drops it when the case ends.

use std::time::Duration;

use normcheck_core::{DType, HostArray, Result, Runtime, Shape, Tensor};

/// Per-case execution context of a tensor runtime.
pub trait ComputeContext {
    type Tensor;

    /// Declare an input tensor.
    fn tensor(&mut self, shape: &Shape, dtype: DType) -> Result<Self::Tensor>;

    /// Declare softmax along the last axis of `input`.
    fn softmax_last_axis(&mut self, input: &Self::Tensor) -> Result<Self::Tensor>;

    /// Materialize execution resources for everything declared so far.
    fn launch(&mut self) -> Result<()>;

    fn load_from_host(&mut self, tensor: &Self::Tensor, data: &HostArray) -> Result<()>;

    /// Execute `iterations` times, optionally without blocking.
    fn run(&mut self, iterations: usize, async_run: bool) -> Result<()>;

    /// Block until the last run completes and return its duration.
    fn stop(&mut self) -> Result<Duration>;

    fn copy_to_host(&mut self, tensor: &Self::Tensor) -> Result<HostArray>;
}

/// Factory for [`ComputeContext`]s.
pub trait ComputeBackend {
    type Context: ComputeContext;

    fn name(&self) -> &str;

    fn open(&self) -> Result<Self::Context>;
}

impl ComputeContext for Runtime {
    type Tensor = Tensor;

    fn tensor(&mut self, shape: &Shape, dtype: DType) -> Result<Tensor> {
        Runtime::tensor(self, shape.clone(), dtype)
    }

    fn softmax_last_axis(&mut self, input: &Tensor) -> Result<Tensor> {
        input.softmax(-1)
    }

    fn launch(&mut self) -> Result<()> {
        Runtime::launch(self)
    }

    fn load_from_host(&mut self, tensor: &Tensor, data: &HostArray) -> Result<()> {
        tensor.load_from_host(data)
    }

    fn run(&mut self, iterations: usize, async_run: bool) -> Result<()> {
        Runtime::run(self, iterations, async_run)
    }

    fn stop(&mut self) -> Result<Duration> {
        Runtime::stop(self)
    }

    fn copy_to_host(&mut self, tensor: &Tensor) -> Result<HostArray> {
        tensor.copy_to_host()
    }
}

/// The in-process `normcheck-core` runtime on its CPU backend.
#[derive(Debug, Default, Clone, Copy)]
pub struct CpuRuntimeBackend;

impl ComputeBackend for CpuRuntimeBackend {
    type Context = Runtime;

    fn name(&self) -> &str {
        "normcheck-cpu"
    }

    fn open(&self) -> Result<Runtime> {
        Ok(Runtime::cpu())
    }
}
