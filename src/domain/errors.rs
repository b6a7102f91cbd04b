use thiserror::Error;

#[derive(Debug, Error)]
pub enum DomainError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("operation failed: {0}")]
    OperationFailed(String),
}

pub type DomainResult<T> = Result<T, DomainError>;

/// Fallos por frame. El texto de `Display` se envía tal cual al cliente; la conexión
/// sigue abierta y el siguiente frame se procesa con normalidad.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum PipelineError {
    #[error("image decode failed")]
    Decode,
    #[error("tensor creation: {0}")]
    TensorCreation(String),
    #[error("inference: {0}")]
    Inference(String),
    #[error("unexpected output tensor: {0}")]
    UnexpectedOutput(String),
}
