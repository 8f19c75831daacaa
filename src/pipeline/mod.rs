//! Pipeline stages for checking and repairing a precompiled letter.
//!
//! Each submodule implements exactly one step and talks to PDFs only through
//! the [`crate::engine`] capabilities.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ classify ──▶ overlay(mask) ──▶ bounds ──▶ colour ──▶ marker
//! (magic)   (A4 check)   (white zones)    (pixels)   (CMYK)     (stamp)
//! ```
//!
//! 1. [`input`]    — reject empty and non-PDF bodies
//! 2. [`classify`] — page size and orientation against the catalog
//! 3. [`overlay`]  — paint allowed zones white (or tint disallowed zones)
//! 4. [`bounds`]   — rasterise page by page and look for leftover ink
//! 5. [`colour`]   — convert to CMYK when needed
//! 6. [`marker`]   — detect the marker tag, stamp it when absent
//!
//! [`address`] and [`encode`] serve the validation preview.

pub mod address;
pub mod bounds;
pub mod classify;
pub mod colour;
pub mod encode;
pub mod input;
pub mod marker;
pub mod overlay;

use crate::engine::{PageGeometry, PdfEngine};
use crate::error::SanitiseError;

/// Geometry of page 1, or [`SanitiseError::NoPages`].
pub(crate) fn first_page(engine: &dyn PdfEngine, pdf: &[u8]) -> Result<PageGeometry, SanitiseError> {
    engine
        .page_geometry(pdf)?
        .into_iter()
        .next()
        .ok_or(SanitiseError::NoPages)
}
