//! Progress-callback trait for the per-page bounds scan.
//!
//! Rasterising every page is the slow part of a check. Inject an
//! [`Arc<dyn ScanProgressCallback>`] via
//! [`crate::config::SanitiseConfigBuilder::progress_callback`] to observe it.
//!
//! # Example
//!
//! ```rust
//! use letterguard::{SanitiseConfig, ScanProgressCallback};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct DirtyPages(AtomicUsize);
//!
//! impl ScanProgressCallback for DirtyPages {
//!     fn on_page_scanned(&self, _page: usize, _total: usize, clean: bool) {
//!         if !clean {
//!             self.0.fetch_add(1, Ordering::SeqCst);
//!         }
//!     }
//! }
//!
//! let config = SanitiseConfig::builder()
//!     .progress_callback(Arc::new(DirtyPages(AtomicUsize::new(0))))
//!     .build()
//!     .unwrap();
//! ```

use std::sync::Arc;

/// Called by the bounds scan as it rasterises each page.
///
/// All methods have default no-op implementations so callers only override
/// what they care about. Calls arrive from the blocking worker thread, so
/// shared state needs `Mutex` or atomics.
pub trait ScanProgressCallback: Send + Sync {
    /// Called once before the first page is rendered.
    fn on_scan_start(&self, total_pages: usize) {
        let _ = total_pages;
    }

    /// Called after each page's colour census.
    ///
    /// # Arguments
    /// * `page_num`    — 1-indexed page number
    /// * `total_pages` — total pages in the document
    /// * `clean`       — whether the page only contained background white
    fn on_page_scanned(&self, page_num: usize, total_pages: usize, clean: bool) {
        let _ = (page_num, total_pages, clean);
    }

    /// Called once after every page has been scanned.
    fn on_scan_complete(&self, total_pages: usize, failing_pages: usize) {
        let _ = (total_pages, failing_pages);
    }
}

/// The default callback: ignores every event.
pub struct NoopScanProgress;

impl ScanProgressCallback for NoopScanProgress {}

/// Type stored in [`crate::config::SanitiseConfig`].
pub type ScanProgress = Arc<dyn ScanProgressCallback>;
