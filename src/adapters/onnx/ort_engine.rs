use anyhow::{anyhow, Context, Result};
use ort::execution_providers::CUDAExecutionProvider;
use ort::session::Session;
use ort::value::TensorRef;
use parking_lot::Mutex;
use std::path::Path;
use tracing::{info, warn};

use crate::application::ports::{InferenceEngine, TensorOutput};
use crate::domain::errors::PipelineError;

pub struct EngineOptions {
    pub intra_threads: usize,
    pub use_cuda: bool,
}

/// Sesión de ONNX Runtime compartida por todas las conexiones.
///
/// `Session::run` necesita `&mut Session`, así que las llamadas se serializan en el
/// mutex; la decodificación y el pre/post-procesado siguen en paralelo fuera de él.
pub struct OrtEngine {
    session: Mutex<Session>,
    input_name: String,
    output_name: String,
}

impl OrtEngine {
    pub fn load(path: &Path, opts: &EngineOptions) -> Result<Self> {
        let mut builder = Session::builder()?.with_intra_threads(opts.intra_threads)?;

        // CUDA es opcional: si está disponible se registra, si no continuamos en CPU.
        if opts.use_cuda {
            let cuda = CUDAExecutionProvider::default().build();
            match builder.clone().with_execution_providers([cuda]) {
                Ok(with_cuda) => builder = with_cuda,
                Err(e) => warn!(error = %e, "CUDA provider unavailable, using CPU"),
            }
        }

        let session = builder
            .commit_from_file(path)
            .with_context(|| format!("failed to load model {}", path.display()))?;

        let input_name = session
            .inputs
            .first()
            .map(|i| i.name.clone())
            .ok_or_else(|| anyhow!("model has no inputs"))?;
        let output_name = session
            .outputs
            .first()
            .map(|o| o.name.clone())
            .ok_or_else(|| anyhow!("model has no outputs"))?;

        info!(input = %input_name, output = %output_name, "model signature");

        Ok(Self {
            session: Mutex::new(session),
            input_name,
            output_name,
        })
    }
}

impl InferenceEngine for OrtEngine {
    fn run(&self, input: &[f32], shape: [usize; 4]) -> Result<TensorOutput, PipelineError> {
        // Vista prestada sobre el buffer del llamante; se suelta antes de retornar.
        let tensor = TensorRef::from_array_view((shape, input))
            .map_err(|e| PipelineError::TensorCreation(e.to_string()))?;

        let mut session = self.session.lock();
        let outputs = session
            .run(ort::inputs![self.input_name.as_str() => tensor])
            .map_err(|e| PipelineError::Inference(e.to_string()))?;

        let value = outputs
            .get(self.output_name.as_str())
            .ok_or_else(|| PipelineError::UnexpectedOutput(format!("missing output {}", self.output_name)))?;
        let (shape_out, data_out) = value
            .try_extract_tensor::<f32>()
            .map_err(|e| PipelineError::UnexpectedOutput(e.to_string()))?;

        Ok(TensorOutput {
            shape: shape_out.to_vec(),
            data: data_out.to_vec(),
        })
    }
}
