//! Out-of-bounds detector: rasterise a masked document and look for ink.
//!
//! Pages are rendered one at a time and each bitmap is dropped right after
//! its colour census, so peak memory is one page regardless of length.

use crate::engine::PdfEngine;
use crate::error::SanitiseError;
use crate::progress::ScanProgressCallback;
use image::RgbaImage;
use std::collections::HashMap;
use tracing::{debug, error, info, warn};

const BACKGROUND: [u8; 3] = [255, 255, 255];

/// Distinct opaque colours of a bitmap with their pixel counts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColourCensus {
    counts: HashMap<[u8; 3], u64>,
}

impl ColourCensus {
    /// Count every pixel, compositing translucent pixels over white.
    pub fn of(image: &RgbaImage) -> Self {
        let mut counts = HashMap::new();
        for pixel in image.pixels() {
            let [r, g, b, a] = pixel.0;
            let over_white = |c: u8| {
                let alpha = a as u32;
                ((c as u32 * alpha + 255 * (255 - alpha)) / 255) as u8
            };
            *counts
                .entry([over_white(r), over_white(g), over_white(b)])
                .or_insert(0) += 1;
        }
        Self { counts }
    }

    pub fn distinct(&self) -> usize {
        self.counts.len()
    }

    pub fn count(&self, rgb: [u8; 3]) -> u64 {
        self.counts.get(&rgb).copied().unwrap_or(0)
    }

    /// Pixels of any colour other than background white.
    pub fn ink_pixels(&self) -> u64 {
        self.counts
            .iter()
            .filter(|(rgb, _)| **rgb != BACKGROUND)
            .map(|(_, n)| n)
            .sum()
    }
}

/// Verdict for a single census.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageInk {
    Clean,
    /// Non-white pixels found.
    Ink(u64),
    /// The bitmap had no pixels at all.
    Empty,
}

impl PageInk {
    pub fn from_census(census: &ColourCensus) -> Self {
        if census.distinct() == 0 {
            return PageInk::Empty;
        }
        match census.ink_pixels() {
            0 => PageInk::Clean,
            n => PageInk::Ink(n),
        }
    }

    pub fn is_clean(self) -> bool {
        self == PageInk::Clean
    }
}

/// 1-indexed pages of a masked document that show anything but white.
pub fn out_of_bounds_pages(
    engine: &dyn PdfEngine,
    masked_pdf: &[u8],
    dpi: u32,
    progress: &dyn ScanProgressCallback,
) -> Result<Vec<usize>, SanitiseError> {
    let total = engine.page_count(masked_pdf)?;
    info!("Scanning {} pages at {} dpi", total, dpi);
    progress.on_scan_start(total);

    let mut failing = Vec::new();
    for index in 0..total {
        let page = index + 1;
        let verdict = {
            let bitmap = engine.render_page(masked_pdf, index, dpi)?;
            PageInk::from_census(&ColourCensus::of(&bitmap))
        };
        match verdict {
            PageInk::Clean => debug!("Page {} is clean", page),
            PageInk::Ink(pixels) => {
                warn!(
                    "Letter exceeds boundaries on page {} ({} pixels)",
                    page, pixels
                );
                failing.push(page);
            }
            PageInk::Empty => {
                error!("Letter has zero colours of any description on page {}", page);
                failing.push(page);
            }
        }
        progress.on_page_scanned(page, total, verdict.is_clean());
    }

    progress.on_scan_complete(total, failing.len());
    Ok(failing)
}
