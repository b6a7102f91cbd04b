use image::{imageops::FilterType, RgbImage};

use crate::domain::errors::PipelineError;

/// Decodifica un frame comprimido (JPEG, PNG, ...) a RGB8 empaquetado.
pub fn decode_rgb(bytes: &[u8]) -> Result<RgbImage, PipelineError> {
    let img = image::load_from_memory(bytes).map_err(|_| PipelineError::Decode)?;
    let rgb = img.to_rgb8();
    if rgb.width() == 0 || rgb.height() == 0 {
        return Err(PipelineError::Decode);
    }
    Ok(rgb)
}

/// Redimensionado bilineal a un cuadrado `side × side`, sin mantener la proporción.
pub fn resize_square(rgb: RgbImage, side: u32) -> RgbImage {
    if rgb.width() == side && rgb.height() == side {
        return rgb;
    }
    image::imageops::resize(&rgb, side, side, FilterType::Triangle)
}

/// RGB8 entrelazado → floats planares `[R | G | B]` en `0..=1`.
///
/// `out` debe contener exactamente tres planos de `raw.len() / 3` valores.
pub fn fill_planar(raw: &[u8], out: &mut [f32]) {
    let plane = raw.len() / 3;
    debug_assert_eq!(out.len(), 3 * plane);
    let (r, rest) = out.split_at_mut(plane);
    let (g, b) = rest.split_at_mut(plane);
    for (i, px) in raw.chunks_exact(3).enumerate() {
        r[i] = f32::from(px[0]) / 255.0;
        g[i] = f32::from(px[1]) / 255.0;
        b[i] = f32::from(px[2]) / 255.0;
    }
}
