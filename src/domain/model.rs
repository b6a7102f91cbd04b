use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelId {
    pub name: String,       // logical name, e.g. "yolo26n"
    pub onnx_path: PathBuf, // filesystem path
}

impl ModelId {
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        let onnx_path = path.into();
        let name = onnx_path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "model".to_string());
        Self { name, onnx_path }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct YoloParams {
    pub input_size: u32,     // 640 typical
    pub conf_threshold: f32, // 0..1, inclusive lower bound
}

impl Default for YoloParams {
    fn default() -> Self {
        Self {
            input_size: 640,
            conf_threshold: 0.4,
        }
    }
}

/// Id de clase → nombre legible, fijo tras el arranque.
#[derive(Debug, Clone, Default)]
pub struct ClassNames {
    names: HashMap<i64, String>,
}

impl ClassNames {
    pub fn new(names: HashMap<i64, String>) -> Self {
        Self { names }
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Los ids desconocidos se muestran como `cls<id>`.
    pub fn name(&self, id: i64) -> String {
        match self.names.get(&id) {
            Some(name) => name.clone(),
            None => format!("cls{id}"),
        }
    }
}

/// Props clave/valor embebidas en el modelo más el mapa de clases decodificado de ellas.
#[derive(Debug, Clone, Default)]
pub struct ModelMetadata {
    pub props: HashMap<String, String>,
    pub class_names: ClassNames,
}

impl ModelMetadata {
    pub fn prop(&self, key: &str) -> Option<&str> {
        self.props.get(key).map(String::as_str)
    }
}
