use serde::Serialize;

use super::detection::Detection;

/// Respuesta de texto para cada frame binario; exactamente una por frame.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum StreamReply<'a> {
    Detections { detections: &'a [Detection] },
    Error { error: String },
}
