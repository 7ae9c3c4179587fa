//! Host-side arrays exchanged with the runtime.
//!
//! A `HostArray` owns dense row-major data whose element type matches one of
//! the runtime's [`DType`]s. Device-side buffers are always `f32` storage;
//! conversion happens at the `load_from_host` / `copy_to_host` boundary.

use half::f16;

use crate::{DType, NormError, Result, Shape};

/// Typed element storage of a host array.
#[derive(Clone, Debug, PartialEq)]
pub enum HostData {
    F32(Vec<f32>),
    F16(Vec<f16>),
}

impl HostData {
    pub fn len(&self) -> usize {
        match self {
            HostData::F32(v) => v.len(),
            HostData::F16(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn dtype(&self) -> DType {
        match self {
            HostData::F32(_) => DType::F32,
            HostData::F16(_) => DType::F16,
        }
    }
}

/// A dense host array with a shape and typed data.
#[derive(Clone, Debug, PartialEq)]
pub struct HostArray {
    shape: Shape,
    data: HostData,
}

impl HostArray {
    /// Wrap typed data, checking that its length matches the shape.
    pub fn new(shape: Shape, data: HostData) -> Result<Self> {
        let expected = shape.numel() as usize;
        if data.len() != expected {
            return Err(NormError::InvalidArgument(format!(
                "data length {} does not match shape {} (expected {})",
                data.len(),
                shape,
                expected,
            )));
        }
        Ok(Self { shape, data })
    }

    pub fn from_f32(shape: Shape, data: Vec<f32>) -> Result<Self> {
        Self::new(shape, HostData::F32(data))
    }

    pub fn from_f16(shape: Shape, data: Vec<f16>) -> Result<Self> {
        Self::new(shape, HostData::F16(data))
    }

    /// Rebuild a host array from runtime `f32` storage.
    pub(crate) fn from_storage(shape: Shape, dtype: DType, storage: &[f32]) -> Result<Self> {
        let data = match dtype {
            DType::F32 => HostData::F32(storage.to_vec()),
            DType::F16 => HostData::F16(storage.iter().map(|&v| f16::from_f32(v)).collect()),
        };
        Self::new(shape, data)
    }

    /// Widen the data into runtime `f32` storage.
    pub(crate) fn to_storage(&self) -> Vec<f32> {
        self.to_f32_vec()
    }

    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    pub fn dtype(&self) -> DType {
        self.data.dtype()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Upcast every element to `f32`. Lossless for both element types.
    pub fn to_f32_vec(&self) -> Vec<f32> {
        match &self.data {
            HostData::F32(v) => v.clone(),
            HostData::F16(v) => v.iter().map(|x| x.to_f32()).collect(),
        }
    }
}
