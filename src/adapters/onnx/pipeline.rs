use ndarray::ArrayView2;
use std::sync::Arc;
use tracing::debug;

use crate::adapters::imaging::{decode_rgb, fill_planar, resize_square};
use crate::application::buffer_pool::BufferPools;
use crate::application::ports::{FrameInferencePort, InferenceEngine, TensorOutput};
use crate::domain::{
    detection::{Detection, InferenceResult},
    errors::PipelineError,
    model::{ClassNames, YoloParams},
};

/// Valores por fila de salida: `[x1, y1, x2, y2, score, label]`.
const ROW_LEN: usize = 6;

/// decodificar → redimensionar → normalizar → inferir → filtrar/reescalar, frame a frame.
///
/// Sin estado salvo los pools compartidos: una sola instancia sirve a todas las conexiones.
pub struct FramePipeline {
    engine: Arc<dyn InferenceEngine>,
    pools: Arc<BufferPools>,
    class_names: Arc<ClassNames>,
    params: YoloParams,
}

impl FramePipeline {
    pub fn new(
        engine: Arc<dyn InferenceEngine>,
        pools: Arc<BufferPools>,
        class_names: Arc<ClassNames>,
        params: YoloParams,
    ) -> Self {
        Self { engine, pools, class_names, params }
    }
}

impl FrameInferencePort for FramePipeline {
    fn infer(&self, frame: &[u8]) -> Result<InferenceResult, PipelineError> {
        let rgb = decode_rgb(frame)?;
        let side = self.params.input_size;
        let scale_x = rgb.width() as f32 / side as f32;
        let scale_y = rgb.height() as f32 / side as f32;

        let resized = resize_square(rgb, side);

        let mut input = self.pools.tensors.acquire();
        fill_planar(resized.as_raw(), &mut input);

        let side = side as usize;
        let output = self.engine.run(&input, [1, 3, side, side]);
        // El motor ya ha devuelto el control y soltado su vista del buffer.
        input.release();
        let output = output?;

        let detections = postprocess(&output, scale_x, scale_y, self.params.conf_threshold, &self.class_names)?;
        debug!(detections = detections.len(), "frame processed");
        Ok(detections)
    }
}

/// Convierte la salida cruda `(1, N, 6)` o `(N, 6)` en detecciones en píxeles del frame
/// original.
///
/// Se descartan las filas con score por debajo de `threshold`; el resto mantiene el
/// orden del modelo. Rango 2 o 3 con filas que no miden 6 es un error; cualquier otro
/// rango no produce detecciones.
pub fn postprocess(
    output: &TensorOutput,
    scale_x: f32,
    scale_y: f32,
    threshold: f32,
    names: &ClassNames,
) -> Result<InferenceResult, PipelineError> {
    let bad_shape = || PipelineError::UnexpectedOutput(format!("shape {:?}", output.shape));
    let rows = match output.shape.as_slice() {
        [_, n, w] | [n, w] if *w == ROW_LEN as i64 => usize::try_from(*n).map_err(|_| bad_shape())?,
        [_, _, _] | [_, _] => return Err(bad_shape()),
        _ => return Ok(Vec::new()),
    };

    let len = rows.checked_mul(ROW_LEN).ok_or_else(bad_shape)?;
    let data = output.data.get(..len).ok_or_else(bad_shape)?;
    let view = ArrayView2::from_shape((rows, ROW_LEN), data)
        .map_err(|e| PipelineError::UnexpectedOutput(e.to_string()))?;

    let detections = view
        .rows()
        .into_iter()
        .filter(|row| row[4] >= threshold)
        .map(|row| {
            let label = row[5] as i64;
            Detection {
                // `as` trunca hacia cero.
                bbox: [
                    (row[0] * scale_x) as i32,
                    (row[1] * scale_y) as i32,
                    (row[2] * scale_x) as i32,
                    (row[3] * scale_y) as i32,
                ],
                score: round4(row[4]),
                label,
                name: names.name(label),
            }
        })
        .collect();
    Ok(detections)
}

/// Redondeo a cuatro decimales, mitades hacia arriba.
fn round4(score: f32) -> f64 {
    (f64::from(score) * 10_000.0).round() / 10_000.0
}
