//! Fixtures compartidas para tests: imágenes en memoria y un motor guionizado.

use std::collections::HashMap;
use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use image::{ImageFormat, Rgb, RgbImage};
use tokio::sync::watch;

use crate::adapters::http::state::{ConnectionTracker, HttpState};
use crate::adapters::onnx::pipeline::FramePipeline;
use crate::application::buffer_pool::BufferPools;
use crate::application::ports::{InferenceEngine, TensorOutput};
use crate::application::services::PipelineService;
use crate::domain::errors::PipelineError;
use crate::domain::model::{ClassNames, YoloParams};

pub fn encode_png(width: u32, height: u32, color: [u8; 3]) -> Vec<u8> {
    let img = RgbImage::from_pixel(width, height, Rgb(color));
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, ImageFormat::Png).unwrap();
    out.into_inner()
}

/// Responde con filas fijas `[x1, y1, x2, y2, score, label]`, o con un error fijo.
///
/// Cada llamada comprueba la forma de la entrada y usa su primer valor para distinguir
/// frames.
pub struct ScriptedEngine {
    rows: Vec<[f32; 6]>,
    fail: Option<PipelineError>,
    pub calls: AtomicUsize,
}

impl ScriptedEngine {
    pub fn rows(rows: Vec<[f32; 6]>) -> Self {
        Self { rows, fail: None, calls: AtomicUsize::new(0) }
    }

    pub fn failing(err: PipelineError) -> Self {
        Self { rows: Vec::new(), fail: Some(err), calls: AtomicUsize::new(0) }
    }
}

impl InferenceEngine for ScriptedEngine {
    fn run(&self, input: &[f32], shape: [usize; 4]) -> Result<TensorOutput, PipelineError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        assert_eq!(shape[0] * shape[1] * shape[2] * shape[3], input.len());
        if let Some(err) = &self.fail {
            return Err(err.clone());
        }
        // El canal rojo del primer píxel etiqueta las filas: las detecciones de cada frame
        // llevan una etiqueta derivada de sus propios píxeles.
        let tag = (input[0] * 255.0).round();
        let data = self
            .rows
            .iter()
            .flat_map(|r| [r[0], r[1], r[2], r[3], r[4], r[5] + tag])
            .collect();
        Ok(TensorOutput {
            shape: vec![1, self.rows.len() as i64, 6],
            data,
        })
    }
}

pub fn pipeline_with(engine: Arc<dyn InferenceEngine>, names: ClassNames) -> (Arc<FramePipeline>, Arc<BufferPools>) {
    let params = YoloParams::default();
    let pools = Arc::new(BufferPools::new(params.input_size as usize, 16));
    let pipeline = FramePipeline::new(engine, Arc::clone(&pools), Arc::new(names), params);
    (Arc::new(pipeline), pools)
}

/// Estado de handlers sobre un [`ScriptedEngine`] que conoce la clase 0 como "person".
pub fn http_state(rows: Vec<[f32; 6]>) -> (HttpState, watch::Sender<bool>) {
    let names = ClassNames::new(HashMap::from([(0, "person".to_string())]));
    let (pipeline, pools) = pipeline_with(Arc::new(ScriptedEngine::rows(rows)), names);
    let (tx, rx) = watch::channel(false);
    let state = HttpState {
        pipeline: Arc::new(PipelineService::new(pipeline)),
        pools,
        shutdown: rx,
        connections: Arc::new(ConnectionTracker::default()),
    };
    (state, tx)
}
