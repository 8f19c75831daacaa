//! Configuration for the sanitisation pipeline.
//!
//! Every tunable lives in [`SanitiseConfig`], built through its
//! [`SanitiseConfigBuilder`]. The layout itself (page size, margins, zones) is
//! not configuration: it is the fixed [`crate::geometry::GeometryCatalog`].

use crate::error::SanitiseError;
use crate::progress::{NoopScanProgress, ScanProgress};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Configuration for a [`crate::Sanitiser`].
///
/// # Example
/// ```rust
/// use letterguard::{GeometryScan, SanitiseConfig};
///
/// let config = SanitiseConfig::builder()
///     .dpi(200)
///     .geometry_scan(GeometryScan::FirstPageOnly)
///     .build()
///     .unwrap();
/// assert_eq!(config.dpi, 200);
/// ```
#[derive(Clone)]
pub struct SanitiseConfig {
    /// Resolution used when rasterising pages for the bounds scan and for
    /// previews. Range: 72–400. Default: 150.
    ///
    /// A single stray mark must survive rasterisation as at least one
    /// non-white pixel. At 150 dpi one pixel is ~0.17 mm.
    pub dpi: u32,

    /// Upper bound on one blocking pipeline call (render, scan, extraction)
    /// when run through the async wrappers. Default: 60.
    pub render_timeout_secs: u64,

    /// Upper bound on the external CMYK conversion process. Default: 60.
    pub colour_timeout_secs: u64,

    /// Blocking pipeline calls allowed in flight at once through the async
    /// wrappers. A call that timed out keeps its slot until the engine
    /// returns. Default: 4.
    pub max_concurrent_jobs: usize,

    /// Which pages the size/orientation check looks at. Default: all pages.
    pub geometry_scan: GeometryScan,

    /// Lifetime of cached preview renders. Default: 600.
    pub cache_ttl_secs: u64,

    /// Ghostscript executable used for CMYK conversion. Default: `gs`.
    pub ghostscript_path: PathBuf,

    /// Directory or file path of the pdfium shared library. When `None`, the
    /// library next to the executable and then the system library are tried.
    pub pdfium_lib_path: Option<PathBuf>,

    /// Optional JSON file of extra organisation logos.
    pub logo_table_path: Option<PathBuf>,

    /// Receives per-page events from the bounds scan.
    pub progress_callback: ScanProgress,
}

impl Default for SanitiseConfig {
    fn default() -> Self {
        Self {
            dpi: 150,
            render_timeout_secs: 60,
            colour_timeout_secs: 60,
            max_concurrent_jobs: 4,
            geometry_scan: GeometryScan::default(),
            cache_ttl_secs: 600,
            ghostscript_path: PathBuf::from("gs"),
            pdfium_lib_path: None,
            logo_table_path: None,
            progress_callback: Arc::new(NoopScanProgress),
        }
    }
}

impl fmt::Debug for SanitiseConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SanitiseConfig")
            .field("dpi", &self.dpi)
            .field("render_timeout_secs", &self.render_timeout_secs)
            .field("colour_timeout_secs", &self.colour_timeout_secs)
            .field("max_concurrent_jobs", &self.max_concurrent_jobs)
            .field("geometry_scan", &self.geometry_scan)
            .field("cache_ttl_secs", &self.cache_ttl_secs)
            .field("ghostscript_path", &self.ghostscript_path)
            .field("pdfium_lib_path", &self.pdfium_lib_path)
            .field("logo_table_path", &self.logo_table_path)
            .field("progress_callback", &"<dyn ScanProgressCallback>")
            .finish()
    }
}

impl SanitiseConfig {
    /// Create a new builder seeded with the defaults.
    pub fn builder() -> SanitiseConfigBuilder {
        SanitiseConfigBuilder {
            config: Self::default(),
        }
    }

    pub fn render_timeout(&self) -> Duration {
        Duration::from_secs(self.render_timeout_secs)
    }

    pub fn colour_timeout(&self) -> Duration {
        Duration::from_secs(self.colour_timeout_secs)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }
}

/// Builder for [`SanitiseConfig`].
#[derive(Debug)]
pub struct SanitiseConfigBuilder {
    config: SanitiseConfig,
}

impl SanitiseConfigBuilder {
    /// Out-of-range values are reported by [`Self::build`], not clamped.
    pub fn dpi(mut self, dpi: u32) -> Self {
        self.config.dpi = dpi;
        self
    }

    pub fn render_timeout_secs(mut self, secs: u64) -> Self {
        self.config.render_timeout_secs = secs;
        self
    }

    pub fn colour_timeout_secs(mut self, secs: u64) -> Self {
        self.config.colour_timeout_secs = secs;
        self
    }

    pub fn max_concurrent_jobs(mut self, jobs: usize) -> Self {
        self.config.max_concurrent_jobs = jobs;
        self
    }

    pub fn geometry_scan(mut self, scan: GeometryScan) -> Self {
        self.config.geometry_scan = scan;
        self
    }

    pub fn cache_ttl_secs(mut self, secs: u64) -> Self {
        self.config.cache_ttl_secs = secs;
        self
    }

    pub fn ghostscript_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.ghostscript_path = path.into();
        self
    }

    pub fn pdfium_lib_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.pdfium_lib_path = Some(path.into());
        self
    }

    pub fn logo_table_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.logo_table_path = Some(path.into());
        self
    }

    pub fn progress_callback(mut self, callback: ScanProgress) -> Self {
        self.config.progress_callback = callback;
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<SanitiseConfig, SanitiseError> {
        let c = &self.config;
        if c.dpi < 72 || c.dpi > 400 {
            return Err(SanitiseError::InvalidConfig(format!(
                "DPI must be 72–400, got {}",
                c.dpi
            )));
        }
        if c.render_timeout_secs == 0 {
            return Err(SanitiseError::InvalidConfig(
                "Render timeout must be ≥ 1 second".into(),
            ));
        }
        if c.colour_timeout_secs == 0 {
            return Err(SanitiseError::InvalidConfig(
                "Colour conversion timeout must be ≥ 1 second".into(),
            ));
        }
        if c.max_concurrent_jobs == 0 || c.max_concurrent_jobs > 1024 {
            return Err(SanitiseError::InvalidConfig(format!(
                "Concurrent jobs must be 1–1024, got {}",
                c.max_concurrent_jobs
            )));
        }
        if c.ghostscript_path.as_os_str().is_empty() {
            return Err(SanitiseError::InvalidConfig(
                "Ghostscript path must not be empty".into(),
            ));
        }
        Ok(self.config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// Pages inspected by the size/orientation check.
///
/// | Mode | Behaviour |
/// |------|-----------|
/// | `AllPages` | every page is classified; any bad page rejects (default) |
/// | `FirstPageOnly` | stops after page 1, so later bad pages go unnoticed |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum GeometryScan {
    FirstPageOnly,
    #[default]
    AllPages,
}

impl GeometryScan {
    /// Number of pages to classify out of `total`.
    pub fn page_limit(self, total: usize) -> usize {
        match self {
            GeometryScan::FirstPageOnly => total.min(1),
            GeometryScan::AllPages => total,
        }
    }
}
