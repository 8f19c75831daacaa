//! Marker tag: a tiny white `NOTIFY` in the top-left margin of page 1.
//!
//! The tag is invisible on white paper but tells the print provider the
//! letter came through this pipeline. It is centred horizontally in the left
//! margin strip, just below the top edge.

use super::address::clean_lines;
use super::first_page;
use crate::engine::{Colour, PageDrawing, PdfEngine, TextExtractor};
use crate::error::SanitiseError;
use crate::fonts;
use crate::geometry::{mm_to_points, points_to_mm, GeometryCatalog, Region};
use tracing::{debug, info};

/// Baseline origin of the marker on a page `page_height` points tall.
pub fn marker_origin(catalog: &GeometryCatalog, page_height: f32) -> (f32, f32) {
    let marker = &catalog.marker;
    let width = fonts::text_width(marker.text, marker.font_size);
    let x = mm_to_points(catalog.margins.left) / 2.0 - width / 2.0;
    let y = page_height
        - (mm_to_points(marker.from_top_mm) + fonts::line_height(marker.font_size)
            - marker.line_spacing);
    (x, y)
}

/// Where to look for an existing marker: its nominal box plus 5mm/3mm of
/// slack on the left/top and 10mm/6mm extra width/height.
pub fn marker_region(catalog: &GeometryCatalog) -> Region {
    let marker = &catalog.marker;
    let width_mm = points_to_mm(fonts::text_width(marker.text, marker.font_size));
    let height_mm = points_to_mm(fonts::line_height(marker.font_size));
    Region::from_mm(
        marker.from_left_mm - 5.0,
        marker.from_top_mm - 3.0,
        width_mm + 10.0,
        height_mm + 6.0,
    )
}

/// Whether page 1 already carries the marker.
pub fn is_marker_present(
    extractor: &dyn TextExtractor,
    pdf: &[u8],
    catalog: &GeometryCatalog,
) -> Result<bool, SanitiseError> {
    let raw = extractor.extract_text(pdf, 0, marker_region(catalog))?;
    let found = clean_lines(&raw).join("\n") == catalog.marker.text;
    debug!("Marker present: {}", found);
    Ok(found)
}

/// Stamp the marker onto page 1. Later pages are untouched.
pub fn stamp_marker(
    engine: &dyn PdfEngine,
    pdf: &[u8],
    catalog: &GeometryCatalog,
) -> Result<Vec<u8>, SanitiseError> {
    let (x, y) = marker_origin(catalog, first_page(engine, pdf)?.height);
    let drawing = PageDrawing::new(0).text(
        x,
        y,
        catalog.marker.text,
        catalog.marker.font_size,
        Colour::WHITE,
    );
    info!("Stamping marker at ({:.2}, {:.2})", x, y);
    engine.compose(pdf, &[drawing])
}
