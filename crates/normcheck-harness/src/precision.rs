use std::str::FromStr;

use normcheck_core::DType;
use serde::{Deserialize, Serialize};

use crate::HarnessError;

/// Element precision of a test case.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Precision {
    Single,
    Half,
}

impl Precision {
    pub fn dtype(self) -> DType {
        match self {
            Precision::Single => DType::F32,
            Precision::Half => DType::F16,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Precision::Single => "single",
            Precision::Half => "half",
        }
    }
}

impl FromStr for Precision {
    type Err = HarnessError;

    /// Accepts `single`/`float`/`f32`/`fp32` and `half`/`f16`/`fp16`.
    fn from_str(tag: &str) -> Result<Self, Self::Err> {
        match tag.trim().to_ascii_lowercase().as_str() {
            "single" | "float" | "f32" | "fp32" => Ok(Precision::Single),
            "half" | "f16" | "fp16" => Ok(Precision::Half),
            _ => Err(HarnessError::Config(format!(
                "unsupported precision tag {tag:?} (expected \"single\" or \"half\")"
            ))),
        }
    }
}

impl std::fmt::Display for Precision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
