//! Page classifier: is each page A4 portrait once its rotation is applied?

use crate::config::GeometryScan;
use crate::engine::PageGeometry;
use crate::geometry::PageSpec;
use crate::report::PageReport;
use tracing::warn;

fn near(value: f32, target: f32, tolerance: f32) -> bool {
    (value - target).abs() <= tolerance
}

/// A page passes if it is portrait-sized and unrotated (or upside down), or
/// landscape-sized and turned a quarter.
pub fn is_a4_portrait(page: &PageGeometry, spec: &PageSpec) -> bool {
    let (h, w) = (page.height_mm(), page.width_mm());
    let tol = spec.tolerance_mm;
    if near(h, spec.height_mm, tol) && near(w, spec.width_mm, tol) {
        !page.rotation.is_quarter_turn()
    } else if near(w, spec.height_mm, tol) && near(h, spec.width_mm, tol) {
        page.rotation.is_quarter_turn()
    } else {
        false
    }
}

/// 1-indexed pages that fail [`is_a4_portrait`], in order.
///
/// With [`GeometryScan::FirstPageOnly`] only page 1 is looked at.
pub fn invalid_pages(pages: &[PageGeometry], spec: &PageSpec, scan: GeometryScan) -> Vec<usize> {
    let limit = scan.page_limit(pages.len());
    pages
        .iter()
        .take(limit)
        .filter(|page| !is_a4_portrait(page, spec))
        .map(|page| {
            warn!(
                "Letter is not A4 portrait size on page {}. Rotate: {}, height: {:.0}mm, width: {:.0}mm",
                page.index + 1,
                page.rotation.degrees(),
                page.height_mm(),
                page.width_mm()
            );
            page.index + 1
        })
        .collect()
}

/// Classifier verdict for every page, for inspection output.
pub fn page_reports(pages: &[PageGeometry], spec: &PageSpec) -> Vec<PageReport> {
    pages
        .iter()
        .map(|page| PageReport::new(page, is_a4_portrait(page, spec)))
        .collect()
}
