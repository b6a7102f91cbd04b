use async_trait::async_trait;
use tracing::warn;

use crate::adapters::onnx::metadata::{parse_class_names, parse_model_metadata};
use crate::application::ports::ModelCatalogPort;
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::model::{ClassNames, ModelId, ModelMetadata};

/// Clave de las props con el literal de nombres de clase.
const NAMES_KEY: &str = "names";

pub struct OnnxModelCatalog;

impl OnnxModelCatalog {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ModelCatalogPort for OnnxModelCatalog {
    async fn validate_model(&self, model: &ModelId) -> DomainResult<()> {
        if model.onnx_path.as_os_str().is_empty() {
            return Err(DomainError::InvalidInput("onnx_path empty".into()));
        }
        if !tokio::fs::try_exists(&model.onnx_path).await.unwrap_or(false) {
            return Err(DomainError::NotFound(format!(
                "model file not found: {}",
                model.onnx_path.display()
            )));
        }
        Ok(())
    }

    async fn load_metadata(&self, model: &ModelId) -> DomainResult<ModelMetadata> {
        let bytes = tokio::fs::read(&model.onnx_path)
            .await
            .map_err(|e| DomainError::OperationFailed(format!("reading {}: {e}", model.onnx_path.display())))?;
        Ok(metadata_from_bytes(&bytes))
    }
}

/// Sin nombres de clase legibles el mapa queda vacío y se usa `cls<id>`.
pub fn metadata_from_bytes(bytes: &[u8]) -> ModelMetadata {
    let props = parse_model_metadata(bytes);
    let class_names = match props.get(NAMES_KEY) {
        Some(raw) => {
            let names = parse_class_names(raw);
            if names.is_empty() {
                warn!("model metadata has an unreadable `names` entry");
            }
            ClassNames::new(names)
        }
        None => {
            warn!("model metadata has no `names` entry");
            ClassNames::default()
        }
    };
    ModelMetadata { props, class_names }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn props_message(key: &str, value: &str) -> Vec<u8> {
        let mut entry = vec![0x0a, key.len() as u8];
        entry.extend_from_slice(key.as_bytes());
        entry.extend_from_slice(&[0x12, value.len() as u8]);
        entry.extend_from_slice(value.as_bytes());

        let mut out = vec![(14 << 3) | 2, entry.len() as u8];
        out.extend_from_slice(&entry);
        out
    }

    #[test]
    fn names_become_class_map() {
        let meta = metadata_from_bytes(&props_message("names", "{0: 'person', 1: 'bicycle'}"));
        assert_eq!(meta.class_names.len(), 2);
        assert_eq!(meta.class_names.name(1), "bicycle");
        assert_eq!(meta.prop("names"), Some("{0: 'person', 1: 'bicycle'}"));
    }

    #[test]
    fn missing_names_degrade_to_placeholders() {
        let meta = metadata_from_bytes(&props_message("task", "detect"));
        assert!(meta.class_names.is_empty());
        assert_eq!(meta.class_names.name(3), "cls3");
        assert_eq!(meta.prop("task"), Some("detect"));

        assert!(metadata_from_bytes(b"\xff\xff\xff").class_names.is_empty());
    }

    #[tokio::test]
    async fn validate_rejects_bad_paths() {
        let catalog = OnnxModelCatalog::new();
        let empty = ModelId { name: "x".into(), onnx_path: PathBuf::new() };
        assert!(matches!(catalog.validate_model(&empty).await, Err(DomainError::InvalidInput(_))));

        let missing = ModelId::from_path("/nonexistent/model.onnx");
        assert!(matches!(catalog.validate_model(&missing).await, Err(DomainError::NotFound(_))));
    }

    #[tokio::test]
    async fn loads_metadata_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("yolo26n.onnx");
        tokio::fs::write(&path, props_message("names", "{0: 'person'}")).await.unwrap();

        let catalog = OnnxModelCatalog::new();
        let model = ModelId::from_path(&path);
        catalog.validate_model(&model).await.unwrap();
        let meta = catalog.load_metadata(&model).await.unwrap();
        assert_eq!(meta.class_names.name(0), "person");
        assert_eq!(model.name, "yolo26n");
    }
}
