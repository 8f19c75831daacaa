//! The [`Sanitiser`] service: every operation on a precompiled letter.
//!
//! ## State machine
//!
//! ```text
//! Received ──▶ SizeChecked ──▶ BoundsChecked ──▶ Accepted
//!     │              │
//!     └──▶ Rejected ◀┘ (wrong size / ink outside the printable area)
//! ```
//!
//! `sanitise` continues past `Accepted` into colour normalisation and the
//! marker stamp. `validate` branches into previews instead: highlighted
//! zones when rejected, the rewritten address block when accepted.
//!
//! All operations here block. The `*_async` forms move them onto
//! `spawn_blocking` with the configured render timeout.

use crate::cache::{cache_key, ResultCache};
use crate::config::SanitiseConfig;
use crate::engine::pdfium::PdfiumEngine;
use crate::engine::{ColourConverter, PdfEngine, TextExtractor};
use crate::error::{ErrorKind, SanitiseError};
use crate::geometry::{GeometryCatalog, A4_LETTER};
use crate::logo::{Logo, LogoTable};
use crate::pipeline::colour::{normalise_colour, GhostscriptConverter};
use crate::pipeline::overlay::{composite, OverlayMode};
use crate::pipeline::{address, bounds, classify, encode, input, marker};
use crate::report::{
    PageReport, Rejection, RejectionReason, SanitiseOutcome, ValidationReport, ValidationResult,
    PASSED_MESSAGE,
};
use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;
use tracing::{debug, error, info, warn};

/// Where a document is in the check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Received,
    SizeChecked,
    BoundsChecked,
    Accepted,
    Rejected,
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PipelineState::Received => "received",
            PipelineState::SizeChecked => "size-checked",
            PipelineState::BoundsChecked => "bounds-checked",
            PipelineState::Accepted => "accepted",
            PipelineState::Rejected => "rejected",
        };
        f.write_str(name)
    }
}

fn enter(state: PipelineState) -> PipelineState {
    debug!("Pipeline state → {}", state);
    state
}

/// Output format of [`Sanitiser::overlay`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverlayFormat {
    /// The whole document with every page highlighted.
    Pdf,
    /// One highlighted page as PNG. 1-indexed.
    Png { page_number: usize },
}

impl OverlayFormat {
    /// `pdf` or `png` (case-insensitive). `page_number` only applies to PNG.
    pub fn from_file_type(file_type: &str, page_number: usize) -> Result<Self, SanitiseError> {
        match file_type.trim().to_ascii_lowercase().as_str() {
            "pdf" => Ok(OverlayFormat::Pdf),
            "png" => Ok(OverlayFormat::Png { page_number }),
            other => Err(SanitiseError::UnsupportedFileType(other.to_string())),
        }
    }
}

const OVERLAY_CACHE_FOLDER: &str = "overlay";

/// Checks, repairs and previews precompiled letters.
///
/// Cheap to clone: capabilities, logos and cache are shared.
#[derive(Clone)]
pub struct Sanitiser {
    engine: Arc<dyn PdfEngine>,
    extractor: Arc<dyn TextExtractor>,
    converter: Arc<dyn ColourConverter>,
    catalog: GeometryCatalog,
    logos: Arc<LogoTable>,
    cache: Option<Arc<dyn ResultCache>>,
    jobs: Arc<Semaphore>,
    config: SanitiseConfig,
}

impl fmt::Debug for Sanitiser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Sanitiser")
            .field("catalog", &self.catalog)
            .field("logos", &self.logos.len())
            .field("cache", &self.cache.is_some())
            .field("idle_jobs", &self.jobs.available_permits())
            .field("config", &self.config)
            .finish()
    }
}

impl Sanitiser {
    /// Assemble a sanitiser from explicit capabilities.
    ///
    /// The logo table is loaded here, so a bad `logo_table_path` fails at
    /// construction rather than on first use.
    pub fn new(
        engine: Arc<dyn PdfEngine>,
        extractor: Arc<dyn TextExtractor>,
        converter: Arc<dyn ColourConverter>,
        config: SanitiseConfig,
    ) -> Result<Self, SanitiseError> {
        let logos = match &config.logo_table_path {
            Some(path) => LogoTable::load(path)?,
            None => LogoTable::builtin(),
        };
        Ok(Self {
            engine,
            extractor,
            converter,
            catalog: A4_LETTER,
            logos: Arc::new(logos),
            cache: None,
            jobs: Arc::new(Semaphore::new(config.max_concurrent_jobs)),
            config,
        })
    }

    /// Production wiring: pdfium for pages and text, ghostscript for CMYK.
    pub fn with_pdfium(config: SanitiseConfig) -> Result<Self, SanitiseError> {
        let pdfium = Arc::new(PdfiumEngine::new(config.pdfium_lib_path.clone())?);
        let converter = Arc::new(GhostscriptConverter::new(
            config.ghostscript_path.clone(),
            config.colour_timeout(),
            pdfium.clone(),
        ));
        Self::new(pdfium.clone(), pdfium, converter, config)
    }

    pub fn with_cache(mut self, cache: Arc<dyn ResultCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn with_catalog(mut self, catalog: GeometryCatalog) -> Self {
        self.catalog = catalog;
        self
    }

    pub fn config(&self) -> &SanitiseConfig {
        &self.config
    }

    pub fn catalog(&self) -> &GeometryCatalog {
        &self.catalog
    }

    /// Job slots not held by a running or timed-out blocking call.
    pub fn available_jobs(&self) -> usize {
        self.jobs.available_permits()
    }

    /// Look up an organisation's logo assets.
    pub fn logo(&self, code: &str) -> Result<&Logo, SanitiseError> {
        self.logos.get(code)
    }

    // ── Layout check ─────────────────────────────────────────────────────

    /// Size/orientation check followed by the masked pixel scan.
    ///
    /// A failed check is a value, not an error; errors mean the document
    /// could not be evaluated at all.
    pub fn check_layout(&self, pdf: &[u8]) -> Result<ValidationResult, SanitiseError> {
        let started = Instant::now();
        enter(PipelineState::Received);

        let pages = self.engine.page_geometry(pdf)?;
        if pages.is_empty() {
            return Err(SanitiseError::NoPages);
        }

        let wrong_size = classify::invalid_pages(&pages, &self.catalog.page, self.config.geometry_scan);
        enter(PipelineState::SizeChecked);
        if !wrong_size.is_empty() {
            enter(PipelineState::Rejected);
            return Ok(ValidationResult::Invalid(Rejection::new(
                RejectionReason::WrongSizeOrOrientation,
                wrong_size,
            )));
        }

        let masked = composite(self.engine.as_ref(), pdf, &self.catalog, OverlayMode::Masking)?;
        let outside = bounds::out_of_bounds_pages(
            self.engine.as_ref(),
            &masked,
            self.config.dpi,
            self.config.progress_callback.as_ref(),
        )?;
        enter(PipelineState::BoundsChecked);

        let result = if outside.is_empty() {
            enter(PipelineState::Accepted);
            ValidationResult::Valid
        } else {
            enter(PipelineState::Rejected);
            ValidationResult::Invalid(Rejection::new(
                RejectionReason::ContentOutsidePrintableArea,
                outside,
            ))
        };
        info!(
            "Layout check of {} pages finished in {}ms (valid: {})",
            pages.len(),
            started.elapsed().as_millis(),
            result.is_valid()
        );
        Ok(result)
    }

    // ── Operations ───────────────────────────────────────────────────────

    /// Check the layout; if it passes, convert to CMYK when needed and stamp
    /// the marker when it is missing.
    ///
    /// The address block is read and returned but not rewritten.
    pub fn sanitise(&self, pdf: &[u8]) -> Result<SanitiseOutcome, SanitiseError> {
        input::check_pdf_bytes(pdf)?;
        info!("Sanitising {} byte letter", pdf.len());

        if let ValidationResult::Invalid(rejection) = self.check_layout(pdf)? {
            info!("Sanitise rejected: {}", rejection);
            return Ok(SanitiseOutcome::Rejected(rejection));
        }

        let normalised = normalise_colour(self.converter.as_ref(), pdf)?;
        let sanitised =
            if marker::is_marker_present(self.extractor.as_ref(), &normalised, &self.catalog)? {
                info!("Marker already present; not stamping");
                normalised.into_owned()
            } else {
                marker::stamp_marker(self.engine.as_ref(), &normalised, &self.catalog)?
            };

        let recipient = address::extract_address(
            self.engine.as_ref(),
            self.extractor.as_ref(),
            &sanitised,
            &self.catalog,
        )?;
        let page_count = self.engine.page_count(&sanitised)?;
        info!("Sanitised {} pages → {} bytes", page_count, sanitised.len());

        Ok(SanitiseOutcome::Sanitised {
            pdf: sanitised,
            page_count,
            recipient_address: recipient.as_text(),
        })
    }

    /// Stamp the marker on page 1 whether or not one is already there.
    pub fn add_tag(&self, pdf: &[u8]) -> Result<Vec<u8>, SanitiseError> {
        input::check_pdf_bytes(pdf)?;
        marker::stamp_marker(self.engine.as_ref(), pdf, &self.catalog)
    }

    /// Run the layout check and build a report.
    ///
    /// A rejection always carries its message. Previews are only rendered
    /// when asked for: highlighted zones for a rejected letter, the letter
    /// with its address block typeset again for an accepted one.
    pub fn validate(
        &self,
        pdf: &[u8],
        include_preview: bool,
    ) -> Result<ValidationReport, SanitiseError> {
        input::check_pdf_bytes(pdf)?;
        let result = self.check_layout(pdf)?;

        let report = match (result, include_preview) {
            (ValidationResult::Invalid(rejection), false) => ValidationReport {
                result: false,
                message: Some(rejection.message()),
                pages: None,
            },
            (ValidationResult::Invalid(rejection), true) => {
                let highlighted =
                    composite(self.engine.as_ref(), pdf, &self.catalog, OverlayMode::Highlighting)?;
                ValidationReport {
                    result: false,
                    message: Some(rejection.message()),
                    pages: Some(self.preview_pages(&highlighted, false)?),
                }
            }
            (ValidationResult::Valid, false) => ValidationReport {
                result: true,
                message: None,
                pages: None,
            },
            (ValidationResult::Valid, true) => {
                let rewritten = address::rewrite_address_block(
                    self.engine.as_ref(),
                    self.extractor.as_ref(),
                    pdf,
                    &self.catalog,
                )?;
                ValidationReport {
                    result: true,
                    message: Some(PASSED_MESSAGE.to_string()),
                    pages: Some(self.preview_pages(&rewritten, true)?),
                }
            }
        };
        Ok(report)
    }

    /// Highlight the areas that must stay blank.
    pub fn overlay(&self, pdf: &[u8], format: OverlayFormat) -> Result<Vec<u8>, SanitiseError> {
        input::check_pdf_bytes(pdf)?;
        match format {
            OverlayFormat::Pdf => {
                composite(self.engine.as_ref(), pdf, &self.catalog, OverlayMode::Highlighting)
            }
            OverlayFormat::Png { page_number } => self.overlay_png(pdf, page_number),
        }
    }

    fn overlay_png(&self, pdf: &[u8], page_number: usize) -> Result<Vec<u8>, SanitiseError> {
        let total = self.engine.page_count(pdf)?;
        if page_number == 0 || page_number > total {
            return Err(SanitiseError::PageOutOfRange {
                page: page_number,
                total,
            });
        }

        let page_bytes = page_number.to_string();
        let key = cache_key(OVERLAY_CACHE_FOLDER, &[pdf, page_bytes.as_bytes()], "png");
        if let Some(cache) = &self.cache {
            if let Some(png) = cache.get(&key) {
                debug!("Overlay page {} served from cache", page_number);
                return Ok(png);
            }
        }

        let highlighted =
            composite(self.engine.as_ref(), pdf, &self.catalog, OverlayMode::Highlighting)?;
        let bitmap = self
            .engine
            .render_page(&highlighted, page_number - 1, self.config.dpi)?;
        let png = encode::encode_png(&bitmap)?;

        if let Some(cache) = &self.cache {
            cache.set(&key, &png, self.config.cache_ttl());
        }
        Ok(png)
    }

    /// Per-page size, rotation and classifier verdict.
    pub fn inspect(&self, pdf: &[u8]) -> Result<Vec<PageReport>, SanitiseError> {
        input::check_pdf_bytes(pdf)?;
        let pages = self.engine.page_geometry(pdf)?;
        if pages.is_empty() {
            return Err(SanitiseError::NoPages);
        }
        Ok(classify::page_reports(&pages, &self.catalog.page))
    }

    /// Base64 PNG of every page, rendered one at a time.
    fn preview_pages(&self, pdf: &[u8], hide_marker: bool) -> Result<Vec<String>, SanitiseError> {
        let total = self.engine.page_count(pdf)?;
        let mut pages = Vec::with_capacity(total);
        for index in 0..total {
            let mut bitmap = self.engine.render_page(pdf, index, self.config.dpi)?;
            if hide_marker {
                encode::hide_marker(&mut bitmap, &self.catalog, self.config.dpi);
            }
            pages.push(encode::to_base64(&encode::encode_png(&bitmap)?));
        }
        debug!("Rendered {} preview pages", pages.len());
        Ok(pages)
    }

    // ── Async wrappers ───────────────────────────────────────────────────

    /// Run `work` on the blocking pool, bounded by the render timeout.
    ///
    /// An engine call cannot be interrupted. After a timeout the task keeps
    /// running and keeps its job slot until the engine returns, so at most
    /// `max_concurrent_jobs` hung calls can pile up; later calls wait for a
    /// slot under the same timeout. The synchronous operations have no time
    /// limit of their own.
    async fn run_blocking<T, F>(&self, stage: &'static str, work: F) -> Result<T, SanitiseError>
    where
        T: Send + 'static,
        F: FnOnce(Sanitiser) -> Result<T, SanitiseError> + Send + 'static,
    {
        let this = self.clone();
        let jobs = self.jobs.clone();
        let limit = self.config.render_timeout();

        let job = async move {
            let permit = match jobs.acquire_owned().await {
                Ok(permit) => permit,
                Err(e) => {
                    return Err(SanitiseError::Internal(format!(
                        "{} job queue closed: {}",
                        stage, e
                    )))
                }
            };
            let task = tokio::task::spawn_blocking(move || {
                let _slot = permit;
                work(this)
            });
            match task.await {
                Ok(result) => result,
                Err(e) => Err(SanitiseError::Internal(format!("{} task panicked: {}", stage, e))),
            }
        };

        let result = match tokio::time::timeout(limit, job).await {
            Ok(result) => result,
            Err(_) => {
                warn!("{} exceeded {:?}", stage, limit);
                Err(SanitiseError::Timeout {
                    stage,
                    secs: limit.as_secs(),
                })
            }
        };
        if let Err(e) = &result {
            if e.kind() == ErrorKind::Internal {
                error!("{} failed: {:?}", stage, e);
            }
        }
        result
    }

    pub async fn sanitise_async(&self, pdf: Vec<u8>) -> Result<SanitiseOutcome, SanitiseError> {
        self.run_blocking("sanitise", move |s| s.sanitise(&pdf)).await
    }

    pub async fn add_tag_async(&self, pdf: Vec<u8>) -> Result<Vec<u8>, SanitiseError> {
        self.run_blocking("add_tag", move |s| s.add_tag(&pdf)).await
    }

    pub async fn validate_async(
        &self,
        pdf: Vec<u8>,
        include_preview: bool,
    ) -> Result<ValidationReport, SanitiseError> {
        self.run_blocking("validate", move |s| s.validate(&pdf, include_preview))
            .await
    }

    pub async fn overlay_async(
        &self,
        pdf: Vec<u8>,
        format: OverlayFormat,
    ) -> Result<Vec<u8>, SanitiseError> {
        self.run_blocking("overlay", move |s| s.overlay(&pdf, format)).await
    }

    pub async fn inspect_async(&self, pdf: Vec<u8>) -> Result<Vec<PageReport>, SanitiseError> {
        self.run_blocking("inspect", move |s| s.inspect(&pdf)).await
    }
}
