//! Address block rewriter.
//!
//! The citizen address is read back out of page 1, the address window is
//! whited out, and the lines are typeset again in Helvetica 8pt with a fixed
//! 8.5pt leading. The last line's baseline sits on the window's bottom edge,
//! lifted by a small rise so descenders stay inside the window.

use super::first_page;
use crate::engine::{Colour, PageDrawing, PdfEngine, TextExtractor};
use crate::error::SanitiseError;
use crate::geometry::{GeometryCatalog, PageSize};
use tracing::{info, warn};

/// Trim every line and drop the blank ones.
pub fn clean_lines(raw: &str) -> Vec<String> {
    raw.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

/// Opaque lines of an address block, top to bottom.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AddressText {
    lines: Vec<String>,
}

impl AddressText {
    pub fn from_raw(raw: &str) -> Self {
        Self {
            lines: clean_lines(raw),
        }
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn as_text(&self) -> String {
        self.lines.join("\n")
    }
}

/// Read the address block from page 1.
pub fn extract_address(
    engine: &dyn PdfEngine,
    extractor: &dyn TextExtractor,
    pdf: &[u8],
    catalog: &GeometryCatalog,
) -> Result<AddressText, SanitiseError> {
    let page = first_page(engine, pdf)?.size();
    extract_address_on(extractor, pdf, catalog, page)
}

fn extract_address_on(
    extractor: &dyn TextExtractor,
    pdf: &[u8],
    catalog: &GeometryCatalog,
    page: PageSize,
) -> Result<AddressText, SanitiseError> {
    let region = catalog.address_extraction_region(page);
    let address = AddressText::from_raw(&extractor.extract_text(pdf, 0, region)?);
    info!("Extracted {} address lines", address.lines().len());
    Ok(address)
}

/// Drawing that blanks the address window of page 1 and typesets `address`
/// inside it. Text in the window is removed first, so the redacted and the
/// painted areas are the same rectangle.
pub fn address_drawing(
    catalog: &GeometryCatalog,
    page: PageSize,
    address: &AddressText,
) -> PageDrawing {
    let window = catalog.citizen_address.resolve(page);
    let spec = &catalog.address_text;

    let lines_after_first = address.lines().len().saturating_sub(1) as f32;
    let first_baseline = window.bottom + spec.line_height * lines_after_first + spec.rise;

    address.lines().iter().enumerate().fold(
        PageDrawing::new(0)
            .redact(window)
            .rect(window, Colour::WHITE),
        |drawing, (i, line)| {
            drawing.text(
                window.left,
                first_baseline - spec.line_height * i as f32,
                line.as_str(),
                spec.font_size,
                Colour::BLACK,
            )
        },
    )
}

/// Extract the address from page 1 and typeset it again in place.
///
/// An empty extraction leaves a blank window behind; that is logged, not
/// treated as a failure.
pub fn rewrite_address_block(
    engine: &dyn PdfEngine,
    extractor: &dyn TextExtractor,
    pdf: &[u8],
    catalog: &GeometryCatalog,
) -> Result<Vec<u8>, SanitiseError> {
    let page = first_page(engine, pdf)?.size();
    let address = extract_address_on(extractor, pdf, catalog, page)?;
    if address.is_empty() {
        warn!("No address text found on page 1; address window will be blank");
    }
    let drawing = address_drawing(catalog, page, &address);
    engine.compose(pdf, &[drawing])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::Shape;
    use crate::geometry::{mm_to_points, A4_LETTER};

    fn a4() -> PageSize {
        PageSize {
            width: mm_to_points(210.0),
            height: mm_to_points(297.0),
        }
    }

    #[test]
    fn raw_text_is_trimmed_and_compacted() {
        let address = AddressText::from_raw("  Ms A Citizen \n\n 1 High St\n   \nSW1A 1AA\n");
        assert_eq!(address.lines(), ["Ms A Citizen", "1 High St", "SW1A 1AA"]);
        assert_eq!(address.as_text(), "Ms A Citizen\n1 High St\nSW1A 1AA");
        assert!(AddressText::from_raw(" \n \n").is_empty());
    }

    #[test]
    fn last_line_sits_on_window_bottom_plus_rise() {
        let address = AddressText::from_raw("A\nB\nC");
        let drawing = address_drawing(&A4_LETTER, a4(), &address);

        let window = A4_LETTER.citizen_address.resolve(a4());
        let baselines: Vec<f32> = drawing
            .shapes
            .iter()
            .filter_map(|s| match s {
                Shape::Text { y, .. } => Some(*y),
                Shape::Rect { .. } => None,
            })
            .collect();
        assert_eq!(baselines.len(), 3);
        assert!((baselines[2] - (window.bottom + 2.0)).abs() < 1e-3);
        assert!((baselines[0] - baselines[1] - 8.5).abs() < 1e-3);
    }

    #[test]
    fn empty_address_leaves_only_the_white_window() {
        let drawing = address_drawing(&A4_LETTER, a4(), &AddressText::default());
        assert_eq!(drawing.shapes.len(), 1);
        assert!(matches!(
            drawing.shapes[0],
            Shape::Rect { fill: Colour::WHITE, .. }
        ));
        assert_eq!(drawing.redactions, vec![A4_LETTER.citizen_address.resolve(a4())]);
    }
}
