//! Runtime context and tensor handles.
//!
//! A `Runtime` owns a lazy graph, a backend and the materialized buffers.
//! It moves through three phases:
//!
//! - **building**: tensors and ops are declared; nothing is allocated
//! - **launched**: the graph is frozen, scheduled and every buffer exists;
//!   inputs can be loaded and outputs copied back
//! - **running**: a run was issued and has not been `stop()`ped yet
//!
//! Asynchronous runs execute on a worker thread that shares the runtime
//! state; `stop()` joins it and reports the wall-clock duration.

use std::collections::HashMap;
use std::sync::{Arc, OnceLock};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use smallvec::SmallVec;
use tracing::{debug, info};

use crate::backend::{Backend, NodeInput};
use crate::cpu_kernels::CpuBackend;
use crate::graph::{Graph, Node, OpKind, TensorMeta};
use crate::host::HostArray;
use crate::schedule::schedule_all;
use crate::{DType, NodeId, NormError, Result, Shape};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Phase {
    Building,
    Launched,
    Running,
}

/// One scheduled node with the metadata of its inputs.
struct Step {
    node: Node,
    input_metas: Vec<TensorMeta>,
}

struct Inner {
    graph: Mutex<Graph>,
    backend: Box<dyn Backend>,
    buffers: Mutex<HashMap<NodeId, Vec<f32>>>,
    plan: OnceLock<Vec<Step>>,
    phase: Mutex<Phase>,
}

enum Execution {
    Pending(JoinHandle<Result<Duration>>),
    Finished(Result<Duration>),
}

/// Execution context binding a graph to a backend.
pub struct Runtime {
    inner: Arc<Inner>,
    execution: Mutex<Option<Execution>>,
}

impl Runtime {
    /// Create a new runtime with the given backend.
    pub fn new(backend: Box<dyn Backend>) -> Self {
        Self {
            inner: Arc::new(Inner {
                graph: Mutex::new(Graph::new()),
                backend,
                buffers: Mutex::new(HashMap::new()),
                plan: OnceLock::new(),
                phase: Mutex::new(Phase::Building),
            }),
            execution: Mutex::new(None),
        }
    }

    /// Create a runtime on the built-in CPU backend.
    pub fn cpu() -> Self {
        Self::new(Box::new(CpuBackend))
    }

    pub fn backend_name(&self) -> &'static str {
        self.inner.backend.name()
    }

    /// Number of nodes declared so far.
    pub fn node_count(&self) -> usize {
        self.inner.graph.lock().len()
    }

    /// Declare an input tensor. Every dimension must be at least 1.
    pub fn tensor(&self, shape: Shape, dtype: DType) -> Result<Tensor> {
        if let Some(&bad) = shape.0.iter().find(|&&d| d < 1) {
            return Err(NormError::InvalidArgument(format!(
                "tensor shape {shape} has non-positive dimension {bad}"
            )));
        }
        self.inner
            .declare(OpKind::Input, SmallVec::new(), TensorMeta { shape, dtype })
    }

    /// Freeze the graph, schedule it and allocate every buffer.
    pub fn launch(&self) -> Result<()> {
        let mut phase = self.inner.phase.lock();
        if *phase != Phase::Building {
            return Err(NormError::Lifecycle("runtime already launched"));
        }

        let graph = self.inner.graph.lock();
        let schedule = schedule_all(&*graph)?;

        let mut steps = Vec::with_capacity(schedule.len());
        let mut buffers = self.inner.buffers.lock();
        let mut bytes = 0usize;
        for &id in &schedule.topo {
            let node = graph
                .get(id)
                .ok_or(NormError::Graph("missing graph node"))?;
            let input_metas = node
                .inputs
                .iter()
                .map(|&i| {
                    graph
                        .get(i)
                        .map(|n| n.meta.clone())
                        .ok_or(NormError::Graph("missing input node"))
                })
                .collect::<Result<Vec<_>>>()?;

            let numel = node.meta.shape.numel() as usize;
            bytes += numel * node.meta.dtype.size_bytes();
            buffers.insert(id, vec![0.0; numel]);
            steps.push(Step {
                node: node.clone(),
                input_metas,
            });
        }
        drop(buffers);
        drop(graph);

        if self.inner.plan.set(steps).is_err() {
            return Err(NormError::Lifecycle("runtime already launched"));
        }
        *phase = Phase::Launched;

        info!(
            backend = self.backend_name(),
            nodes = schedule.len(),
            bytes,
            "launched runtime"
        );
        Ok(())
    }

    /// Execute the launched graph `iterations` times.
    ///
    /// With `async_run` the work happens on a worker thread and this returns
    /// immediately. In both modes `stop()` must be called to collect the
    /// elapsed time before buffers can be accessed again.
    pub fn run(&self, iterations: usize, async_run: bool) -> Result<()> {
        if iterations == 0 {
            return Err(NormError::InvalidArgument(
                "iterations must be at least 1".into(),
            ));
        }

        let mut phase = self.inner.phase.lock();
        match *phase {
            Phase::Building => return Err(NormError::Lifecycle("run called before launch")),
            Phase::Running => return Err(NormError::Lifecycle("a run is already in flight")),
            Phase::Launched => {}
        }

        debug!(iterations, async_run, "starting run");
        let execution = if async_run {
            let inner = Arc::clone(&self.inner);
            let handle = std::thread::Builder::new()
                .name("normcheck-run".into())
                .spawn(move || inner.execute(iterations))
                .map_err(|e| NormError::Execution(format!("failed to spawn run thread: {e}")))?;
            Execution::Pending(handle)
        } else {
            Execution::Finished(self.inner.execute(iterations))
        };

        *self.execution.lock() = Some(execution);
        *phase = Phase::Running;
        Ok(())
    }

    /// Wait for the in-flight run and return its wall-clock duration.
    pub fn stop(&self) -> Result<Duration> {
        let execution = self
            .execution
            .lock()
            .take()
            .ok_or(NormError::Lifecycle("stop called without a run"))?;

        let result = match execution {
            Execution::Pending(handle) => handle
                .join()
                .unwrap_or_else(|_| Err(NormError::Execution("run thread panicked".into()))),
            Execution::Finished(result) => result,
        };
        *self.inner.phase.lock() = Phase::Launched;

        let elapsed = result?;
        debug!(elapsed_ms = elapsed.as_secs_f64() * 1e3, "run stopped");
        Ok(elapsed)
    }
}

impl Drop for Runtime {
    fn drop(&mut self) {
        if let Some(Execution::Pending(handle)) = self.execution.get_mut().take() {
            let _ = handle.join();
        }
    }
}

impl std::fmt::Debug for Runtime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Runtime")
            .field("backend", &self.backend_name())
            .field("phase", &*self.inner.phase.lock())
            .finish_non_exhaustive()
    }
}

impl Inner {
    fn declare(
        self: &Arc<Self>,
        op: OpKind,
        inputs: SmallVec<[NodeId; 2]>,
        meta: TensorMeta,
    ) -> Result<Tensor> {
        let phase = self.phase.lock();
        if *phase != Phase::Building {
            return Err(NormError::Lifecycle("graph is frozen after launch"));
        }
        let shape = meta.shape.clone();
        let dtype = meta.dtype;
        let node_id = self.graph.lock().add_node(op, inputs, meta);
        Ok(Tensor {
            node_id,
            shape,
            dtype,
            inner: Arc::clone(self),
        })
    }

    fn execute(&self, iterations: usize) -> Result<Duration> {
        let plan = self
            .plan
            .get()
            .ok_or(NormError::Lifecycle("run called before launch"))?;
        let start = Instant::now();

        for _ in 0..iterations {
            for step in plan {
                if step.node.op.is_source() {
                    continue;
                }
                let result = {
                    let buffers = self.buffers.lock();
                    let inputs = step
                        .node
                        .inputs
                        .iter()
                        .zip(step.input_metas.iter())
                        .map(|(id, meta)| {
                            buffers
                                .get(id)
                                .map(|data| NodeInput {
                                    data: data.as_slice(),
                                    shape: &meta.shape,
                                    dtype: meta.dtype,
                                })
                                .ok_or(NormError::Graph("input buffer missing"))
                        })
                        .collect::<Result<Vec<_>>>()?;
                    self.backend
                        .eval_node(&step.node.op, &inputs, &step.node.meta)?
                };
                self.buffers.lock().insert(step.node.id, result);
            }
        }

        Ok(start.elapsed())
    }

    fn require_launched(&self, action: &'static str) -> Result<()> {
        match *self.phase.lock() {
            Phase::Launched => Ok(()),
            Phase::Building => Err(NormError::Lifecycle(action)),
            Phase::Running => Err(NormError::Lifecycle("a run is in flight; call stop() first")),
        }
    }
}

/// A tensor handle.
///
/// A `Tensor` is a lightweight reference to a node in its runtime's graph.
/// Ops add nodes while the runtime is building; data moves in and out once
/// it is launched.
#[derive(Clone)]
pub struct Tensor {
    node_id: NodeId,
    shape: Shape,
    dtype: DType,
    inner: Arc<Inner>,
}

impl Tensor {
    /// Softmax along an axis (negative axes count from the end).
    pub fn softmax(&self, axis: i32) -> Result<Tensor> {
        self.check_axis(axis)?;
        self.inner.declare(
            OpKind::Softmax { axis },
            SmallVec::from_slice(&[self.node_id]),
            TensorMeta {
                shape: self.shape.clone(),
                dtype: self.dtype,
            },
        )
    }

    /// Sum along an axis, keeping it with extent 1.
    ///
    /// With `relu`, each reduced value is clamped at zero.
    pub fn reduce_sum(&self, axis: i32, relu: bool) -> Result<Tensor> {
        let ax = self.check_axis(axis)?;
        let mut dims = self.shape.0.clone();
        dims[ax] = 1;
        self.inner.declare(
            OpKind::ReduceSum { axis, relu },
            SmallVec::from_slice(&[self.node_id]),
            TensorMeta {
                shape: Shape::new(dims),
                dtype: self.dtype,
            },
        )
    }

    /// Copy host data into this input tensor's buffer.
    pub fn load_from_host(&self, array: &HostArray) -> Result<()> {
        self.inner.require_launched("load_from_host called before launch")?;
        let is_input = self
            .inner
            .graph
            .lock()
            .get(self.node_id)
            .is_some_and(|n| n.op.is_source());
        if !is_input {
            return Err(NormError::InvalidArgument(
                "only input tensors can be loaded from the host".into(),
            ));
        }
        if array.shape() != &self.shape {
            return Err(NormError::ShapeMismatch {
                expected: self.shape.0.clone(),
                got: array.shape().0.clone(),
            });
        }
        if array.dtype() != self.dtype {
            return Err(NormError::DTypeMismatch {
                expected: self.dtype,
                got: array.dtype(),
            });
        }
        self.inner
            .buffers
            .lock()
            .insert(self.node_id, array.to_storage());
        Ok(())
    }

    /// Copy this tensor's buffer back to host memory.
    pub fn copy_to_host(&self) -> Result<HostArray> {
        self.inner.require_launched("copy_to_host called before launch")?;
        let buffers = self.inner.buffers.lock();
        let storage = buffers
            .get(&self.node_id)
            .ok_or(NormError::Graph("buffer not allocated"))?;
        HostArray::from_storage(self.shape.clone(), self.dtype, storage)
    }

    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    pub fn dtype(&self) -> DType {
        self.dtype
    }

    fn check_axis(&self, axis: i32) -> Result<usize> {
        self.shape.normalize_axis(axis).ok_or_else(|| {
            NormError::InvalidArgument(format!(
                "axis {axis} out of range for ndim {}",
                self.shape.ndim()
            ))
        })
    }
}

impl std::fmt::Debug for Tensor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tensor")
            .field("node_id", &self.node_id)
            .field("shape", &self.shape)
            .field("dtype", &self.dtype)
            .finish_non_exhaustive()
    }
}
