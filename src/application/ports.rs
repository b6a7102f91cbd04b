use async_trait::async_trait;

use crate::domain::{
    detection::InferenceResult,
    errors::{DomainResult, PipelineError},
    model::{ModelId, ModelMetadata},
};

/// Salida cruda de una llamada al motor, copiada fuera de la memoria del motor.
#[derive(Debug, Clone, PartialEq)]
pub struct TensorOutput {
    pub shape: Vec<i64>,
    pub data: Vec<f32>,
}

/// Ejecuta un tensor planar `f32` sobre un modelo cargado.
///
/// `input` solo se presta durante la llamada: las implementaciones no pueden guardar
/// ninguna vista sobre él, el llamante lo devuelve al pool justo después.
pub trait InferenceEngine: Send + Sync {
    fn run(&self, input: &[f32], shape: [usize; 4]) -> Result<TensorOutput, PipelineError>;
}

/// Procesa un frame comprimido completo de forma síncrona.
pub trait FrameInferencePort: Send + Sync {
    fn infer(&self, frame: &[u8]) -> Result<InferenceResult, PipelineError>;
}

#[async_trait]
pub trait ModelCatalogPort: Send + Sync {
    async fn validate_model(&self, model: &ModelId) -> DomainResult<()>;
    async fn load_metadata(&self, model: &ModelId) -> DomainResult<ModelMetadata>;
}
