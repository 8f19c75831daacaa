//! Overlay compositor: merge zone rectangles onto every page.
//!
//! | Mode | Fill | Page 1 | Pages 2+ |
//! |------|------|--------|----------|
//! | Masking | opaque white | body, service address, logo, citizen address | body between top and bottom margins |
//! | Highlighting | translucent red | margin strips + strips around the address | margin strips |
//!
//! Masking erases everything that is allowed to carry ink, so whatever is
//! still visible afterwards lies outside the printable area. Highlighting
//! tints exactly the areas that must stay blank, for a human reviewer.
//! Zones are resolved against each page's own media box.

use crate::engine::{Colour, PageDrawing, PageGeometry, PdfEngine};
use crate::error::SanitiseError;
use crate::geometry::{GeometryCatalog, Rect};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// What the overlay paints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OverlayMode {
    /// Allowed zones in background white, for the bounds scan.
    Masking,
    /// Disallowed zones in a translucent tint, for operator previews.
    Highlighting,
}

impl OverlayMode {
    pub fn fill(self) -> Colour {
        match self {
            OverlayMode::Masking => Colour::WHITE,
            OverlayMode::Highlighting => Colour::HIGHLIGHT,
        }
    }
}

/// Rectangles drawn on the page at `page.index` for `mode`.
pub fn zone_rects(catalog: &GeometryCatalog, mode: OverlayMode, page: &PageGeometry) -> Vec<Rect> {
    let size = page.size();
    let first = page.index == 0;
    match mode {
        OverlayMode::Masking if first => catalog
            .first_page_zones()
            .iter()
            .map(|zone| zone.resolve(size))
            .collect(),
        OverlayMode::Masking => catalog
            .continuation_zones()
            .iter()
            .map(|zone| zone.resolve(size))
            .collect(),
        OverlayMode::Highlighting => {
            let mut rects = catalog.margin_strips(size).to_vec();
            if first {
                rects.extend(catalog.address_surround(size));
            }
            rects
        }
    }
}

/// One drawing per page.
pub fn overlay_drawings(
    catalog: &GeometryCatalog,
    mode: OverlayMode,
    pages: &[PageGeometry],
) -> Vec<PageDrawing> {
    let fill = mode.fill();
    pages
        .iter()
        .map(|page| {
            zone_rects(catalog, mode, page)
                .into_iter()
                .fold(PageDrawing::new(page.index), |drawing, rect| {
                    drawing.rect(rect, fill)
                })
        })
        .collect()
}

/// Merge the overlay for `mode` onto every page and return the new document.
pub fn composite(
    engine: &dyn PdfEngine,
    pdf: &[u8],
    catalog: &GeometryCatalog,
    mode: OverlayMode,
) -> Result<Vec<u8>, SanitiseError> {
    let pages = engine.page_geometry(pdf)?;
    let drawings = overlay_drawings(catalog, mode, &pages);
    debug!("Compositing {:?} overlay onto {} pages", mode, pages.len());
    engine.compose(pdf, &drawings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::Rotation;
    use crate::geometry::{mm_to_points, A4_LETTER};

    fn a4(index: usize) -> PageGeometry {
        PageGeometry {
            index,
            width: mm_to_points(210.0),
            height: mm_to_points(297.0),
            rotation: Rotation::Deg0,
        }
    }

    #[test]
    fn masking_draws_four_zones_then_one() {
        assert_eq!(zone_rects(&A4_LETTER, OverlayMode::Masking, &a4(0)).len(), 4);
        assert_eq!(zone_rects(&A4_LETTER, OverlayMode::Masking, &a4(1)).len(), 1);
    }

    #[test]
    fn highlighting_adds_address_surround_on_first_page() {
        assert_eq!(zone_rects(&A4_LETTER, OverlayMode::Highlighting, &a4(0)).len(), 8);
        assert_eq!(zone_rects(&A4_LETTER, OverlayMode::Highlighting, &a4(2)).len(), 4);
    }

    #[test]
    fn masking_and_highlighting_do_not_overlap() {
        for index in 0..2 {
            let page = a4(index);
            let allowed = zone_rects(&A4_LETTER, OverlayMode::Masking, &page);
            let blocked = zone_rects(&A4_LETTER, OverlayMode::Highlighting, &page);
            for a in &allowed {
                for b in &blocked {
                    assert!(a.overlap_area(b) < 1e-2, "{:?} overlaps {:?}", a, b);
                }
            }
        }
    }

    #[test]
    fn drawings_use_mode_fill() {
        let drawings = overlay_drawings(&A4_LETTER, OverlayMode::Highlighting, &[a4(0), a4(1)]);
        assert_eq!(drawings.len(), 2);
        assert_eq!(drawings[1].page_index, 1);
        assert!(drawings.iter().flat_map(|d| &d.shapes).all(|s| matches!(
            s,
            crate::engine::Shape::Rect { fill, .. } if *fill == Colour::HIGHLIGHT
        )));
    }
}
