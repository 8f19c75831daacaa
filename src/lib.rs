//! # letterguard
//!
//! Check precompiled letters against a fixed A4 print layout and repair the
//! two defects that can be repaired automatically.
//!
//! A letter arrives as PDF bytes produced by someone else's software. Before
//! it goes to the print provider every page must be A4 portrait, and nothing
//! may be printed outside the body, address and logo zones. A letter that
//! passes is converted to CMYK when needed and stamped with an invisible
//! `NOTIFY` marker on page 1.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF bytes
//!  │
//!  ├─ 1. Input     reject empty / non-PDF bodies
//!  ├─ 2. Classify  A4 portrait within ±2mm, rotation consistent with media
//!  ├─ 3. Mask      paint every allowed zone white
//!  ├─ 4. Scan      rasterise page by page; any non-white pixel is a defect
//!  ├─ 5. Colour    convert to CMYK unless already print-ready
//!  └─ 6. Marker    stamp NOTIFY on page 1 if it is not there yet
//! ```
//!
//! `validate` stops after step 4 and can render previews: rejected letters
//! with the forbidden areas tinted red, accepted ones with their address
//! block typeset again.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use letterguard::{SanitiseConfig, SanitiseOutcome, Sanitiser};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let sanitiser = Sanitiser::with_pdfium(SanitiseConfig::default())?;
//!     let pdf = std::fs::read("letter.pdf")?;
//!     match sanitiser.sanitise_async(pdf).await? {
//!         SanitiseOutcome::Sanitised { pdf, page_count, .. } => {
//!             std::fs::write("letter.sanitised.pdf", pdf)?;
//!             eprintln!("{} pages ready for print", page_count);
//!         }
//!         SanitiseOutcome::Rejected(rejection) => eprintln!("{}", rejection),
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `letterguard` binary (clap + anyhow + indicatif + tracing-subscriber) |
//!
//! ## Engines
//!
//! Every PDF operation goes through the traits in [`engine`]. The production
//! wiring is pdfium (pages, drawing, rasterising, text) plus ghostscript
//! (CMYK). [`engine::memory::MemoryEngine`] implements the same traits over a
//! JSON page model and needs no native libraries.

// ── Modules ──────────────────────────────────────────────────────────────

pub mod cache;
pub mod config;
pub mod engine;
pub mod error;
pub mod fonts;
pub mod geometry;
pub mod logo;
pub mod pipeline;
pub mod progress;
pub mod report;
pub mod sanitise;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use cache::{cache_key, MemoryCache, ResultCache};
pub use config::{GeometryScan, SanitiseConfig, SanitiseConfigBuilder};
pub use engine::{ColourConverter, PdfEngine, TextExtractor};
pub use error::{ErrorKind, SanitiseError};
pub use geometry::{GeometryCatalog, A4_LETTER};
pub use logo::{Logo, LogoTable};
pub use pipeline::overlay::OverlayMode;
pub use progress::{NoopScanProgress, ScanProgress, ScanProgressCallback};
pub use report::{
    PageReport, Rejection, RejectionReason, SanitiseOutcome, ValidationReport, ValidationResult,
};
pub use sanitise::{OverlayFormat, PipelineState, Sanitiser};
