//! Preview encoding: rasterised page → PNG bytes → base64.

use super::marker::marker_region;
use crate::error::SanitiseError;
use crate::geometry::{mm_to_points, GeometryCatalog};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::{ImageFormat, Rgba, RgbaImage};
use std::io::Cursor;
use tracing::debug;

/// Paint the marker's search region white so its anti-aliased edge does not
/// show in a preview.
///
/// The region is converted at `dpi` and clipped to the left margin, so logo
/// and address content next to the marker is never touched.
pub fn hide_marker(image: &mut RgbaImage, catalog: &GeometryCatalog, dpi: u32) {
    let scale = dpi as f32 / 72.0;
    let region = marker_region(catalog);
    let right = (region.x + region.width).min(mm_to_points(catalog.margins.left));

    let x0 = (region.x.max(0.0) * scale).floor() as u32;
    let x1 = ((right * scale).floor() as u32).min(image.width());
    let y0 = (region.y.max(0.0) * scale).floor() as u32;
    let y1 = (((region.y + region.height) * scale).ceil() as u32).min(image.height());

    let white = Rgba([255, 255, 255, 255]);
    for y in y0..y1 {
        for x in x0..x1 {
            image.put_pixel(x, y, white);
        }
    }
}

/// Encode a page bitmap as PNG.
pub fn encode_png(image: &RgbaImage) -> Result<Vec<u8>, SanitiseError> {
    let mut buf = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
        .map_err(|e| SanitiseError::Internal(format!("PNG encoding failed: {}", e)))?;
    debug!(
        "Encoded {}x{} page → {} bytes PNG",
        image.width(),
        image.height(),
        buf.len()
    );
    Ok(buf)
}

/// Base64 text of PNG bytes, as embedded in validation responses.
pub fn to_base64(png: &[u8]) -> String {
    STANDARD.encode(png)
}
