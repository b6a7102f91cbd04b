use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::error;

use crate::{
    application::ports::{FrameInferencePort, ModelCatalogPort},
    domain::{
        detection::InferenceResult,
        errors::{DomainResult, PipelineError},
        model::{ModelId, ModelMetadata},
    },
};

/// Ejecuta frames en el pipeline compartido fuera del runtime async.
///
/// Cada llamada bloquea solo a su conexión; cualquier número de conexiones puede
/// llamar a `detect` a la vez.
#[derive(Clone)]
pub struct PipelineService {
    pipeline: Arc<dyn FrameInferencePort>,
    loaded: Arc<AtomicBool>,
}

impl PipelineService {
    pub fn new(pipeline: Arc<dyn FrameInferencePort>) -> Self {
        Self {
            pipeline,
            loaded: Arc::new(AtomicBool::new(true)),
        }
    }

    pub async fn detect(&self, frame: Vec<u8>) -> Result<InferenceResult, PipelineError> {
        let pipeline = Arc::clone(&self.pipeline);
        tokio::task::spawn_blocking(move || pipeline.infer(&frame))
            .await
            .unwrap_or_else(|e| {
                error!(error = %e, "frame worker panicked");
                Err(PipelineError::Inference("worker aborted".into()))
            })
    }

    pub fn model_loaded(&self) -> bool {
        self.loaded.load(Ordering::Acquire)
    }

    /// Marca el modelo como no disponible al empezar el apagado.
    pub fn mark_unloaded(&self) {
        self.loaded.store(false, Ordering::Release);
    }
}

/// Acceso al artefacto del modelo, solo durante el arranque.
#[derive(Clone)]
pub struct ModelService {
    catalog: Arc<dyn ModelCatalogPort>,
}

impl ModelService {
    pub fn new(catalog: Arc<dyn ModelCatalogPort>) -> Self {
        Self { catalog }
    }

    /// Valida la ruta del modelo antes de leer sus metadatos embebidos.
    pub async fn metadata(&self, model: &ModelId) -> DomainResult<ModelMetadata> {
        self.catalog.validate_model(model).await?;
        self.catalog.load_metadata(model).await
    }
}
