//! Backend trait — pluggable compute engine for graph nodes.
//!
//! A `Backend` knows how to execute a single graph node (op + inputs → output).
//! The `Runtime` owns scheduling and buffer management; the backend only
//! implements kernel dispatch.

use crate::Result;
use crate::graph::{OpKind, TensorMeta};
use crate::types::{DType, Shape};

/// Materialized input data passed to a backend for evaluation.
pub struct NodeInput<'a> {
    pub data: &'a [f32],
    pub shape: &'a Shape,
    pub dtype: DType,
}

/// Pluggable compute backend.
///
/// Buffers are `f32` storage regardless of dtype. A backend must return
/// values already rounded to `output_meta.dtype`.
pub trait Backend: Send + Sync {
    /// Short name used in logs and reports.
    fn name(&self) -> &'static str;

    /// Evaluate a single op node given its materialized inputs.
    fn eval_node(
        &self,
        op: &OpKind,
        inputs: &[NodeInput<'_>],
        output_meta: &TensorMeta,
    ) -> Result<Vec<f32>>;
}
