use serde::{Deserialize, Serialize};

/// Un objeto reconocido, en píxeles del frame original.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    #[serde(rename = "box")]
    pub bbox: [i32; 4],
    pub score: f64,
    pub label: i64,
    pub name: String,
}

/// Detecciones de un frame, en el orden de salida del modelo.
pub type InferenceResult = Vec<Detection>;
