//! Trusted reference implementations.

use normcheck_core::Shape;

use crate::{HarnessError, Result};

/// Pure host-side reference for the operation under test.
pub trait ReferenceOracle {
    /// Softmax along the last axis of a row-major single-precision array.
    fn softmax_last_axis(&self, input: &[f32], shape: &Shape) -> Result<Vec<f32>>;
}

/// Straightforward row-at-a-time softmax in `f32`.
#[derive(Debug, Default, Clone, Copy)]
pub struct ScalarSoftmax;

impl ReferenceOracle for ScalarSoftmax {
    fn softmax_last_axis(&self, input: &[f32], shape: &Shape) -> Result<Vec<f32>> {
        let cols = shape
            .dim(-1)
            .filter(|&c| c > 0)
            .ok_or_else(|| HarnessError::Reference(format!("shape {shape} has no last axis")))?;
        let cols = cols as usize;
        if input.len() != shape.numel() as usize {
            return Err(HarnessError::Reference(format!(
                "{} values do not fill shape {shape}",
                input.len()
            )));
        }

        let mut out = Vec::with_capacity(input.len());
        for row in input.chunks_exact(cols) {
            let max = row.iter().copied().fold(f32::NEG_INFINITY, f32::max);
            let start = out.len();
            out.extend(row.iter().map(|&x| (x - max).exp()));
            let sum: f32 = out[start..].iter().sum();
            for v in &mut out[start..] {
                *v /= sum;
            }
        }
        Ok(out)
    }
}
