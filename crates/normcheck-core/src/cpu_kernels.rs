//! Built-in CPU backend.
//!
//! Kernels accumulate in `f32` and round the result to the output dtype, the
//! way a half-precision device kernel with `f32` accumulators would.

use crate::backend::{Backend, NodeInput};
use crate::graph::{OpKind, TensorMeta};
use crate::{NormError, Result};

/// CPU backend.
#[derive(Debug, Default, Clone, Copy)]
pub struct CpuBackend;

impl Backend for CpuBackend {
    fn name(&self) -> &'static str {
        "cpu"
    }

    fn eval_node(
        &self,
        op: &OpKind,
        inputs: &[NodeInput<'_>],
        output_meta: &TensorMeta,
    ) -> Result<Vec<f32>> {
        let mut out = match op {
            OpKind::Input => {
                return Err(NormError::InvalidArgument(
                    "Input nodes are loaded from the host, not evaluated".into(),
                ));
            }
            OpKind::Softmax { axis } => softmax(inputs, *axis)?,
            OpKind::ReduceSum { axis, relu } => reduce_sum(inputs, *axis, *relu)?,
        };
        let expected = output_meta.shape.numel() as usize;
        if out.len() != expected {
            return Err(NormError::ShapeMismatch {
                expected: output_meta.shape.0.clone(),
                got: vec![out.len() as i64],
            });
        }
        output_meta.dtype.round_storage(&mut out);
        Ok(out)
    }
}

fn require_input<'a>(inputs: &'a [NodeInput<'_>], idx: usize) -> Result<&'a NodeInput<'a>> {
    inputs
        .get(idx)
        .ok_or_else(|| NormError::InvalidArgument(format!("expected input at index {idx}")))
}

fn resolve_axis(a: &NodeInput<'_>, axis: i32) -> Result<usize> {
    a.shape.normalize_axis(axis).ok_or_else(|| {
        NormError::InvalidArgument(format!(
            "axis {axis} out of range for ndim {}",
            a.shape.ndim()
        ))
    })
}

fn softmax(inputs: &[NodeInput<'_>], axis: i32) -> Result<Vec<f32>> {
    let a = require_input(inputs, 0)?;
    let ax = resolve_axis(a, axis)?;
    let (outer, dim, inner) = a.shape.split_at_axis(ax);

    let mut data = a.data.to_vec();

    for o in 0..outer {
        for i in 0..inner {
            let base = o * dim * inner + i;
            let mut max_val = f32::NEG_INFINITY;
            for d in 0..dim {
                max_val = max_val.max(data[base + d * inner]);
            }
            let mut sum_exp = 0.0f32;
            for d in 0..dim {
                let idx = base + d * inner;
                data[idx] = (data[idx] - max_val).exp();
                sum_exp += data[idx];
            }
            for d in 0..dim {
                data[base + d * inner] /= sum_exp;
            }
        }
    }
    Ok(data)
}

fn reduce_sum(inputs: &[NodeInput<'_>], axis: i32, relu: bool) -> Result<Vec<f32>> {
    let a = require_input(inputs, 0)?;
    let ax = resolve_axis(a, axis)?;
    let (outer, dim, inner) = a.shape.split_at_axis(ax);

    let mut result = Vec::with_capacity(outer * inner);
    for o in 0..outer {
        for i in 0..inner {
            let base = o * dim * inner + i;
            let sum: f32 = (0..dim).map(|d| a.data[base + d * inner]).sum();
            result.push(if relu { sum.max(0.0) } else { sum });
        }
    }
    Ok(result)
}
