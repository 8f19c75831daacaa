//! Verdicts and reports produced by the pipeline.
//!
//! A rejected letter is an expected outcome and travels as a value, never as
//! a [`crate::SanitiseError`].

use crate::engine::PageGeometry;
use serde::Serialize;
use std::fmt;

/// Message returned with a passing validation.
pub const PASSED_MESSAGE: &str = "Your PDF passed the layout check";

/// Why a letter was turned away.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum RejectionReason {
    WrongSizeOrOrientation,
    ContentOutsidePrintableArea,
}

impl RejectionReason {
    fn lead(self) -> &'static str {
        match self {
            RejectionReason::WrongSizeOrOrientation => "Your letter is not A4 portrait size on",
            RejectionReason::ContentOutsidePrintableArea => {
                "Content in this PDF is outside the printable area on"
            }
        }
    }
}

/// The failing pages and the reason they failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Rejection {
    /// 1-indexed, ascending.
    pub pages: Vec<usize>,
    pub reason: RejectionReason,
}

impl Rejection {
    pub fn new(reason: RejectionReason, mut pages: Vec<usize>) -> Self {
        pages.sort_unstable();
        pages.dedup();
        Self { pages, reason }
    }

    /// Human-readable explanation, e.g.
    /// `Content in this PDF is outside the printable area on pages 1 and 3`.
    pub fn message(&self) -> String {
        format!("{} {}", self.reason.lead(), page_list(&self.pages))
    }
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message())
    }
}

/// `page 1`, `pages 1 and 2`, `pages 1, 2 and 3`.
pub fn page_list(pages: &[usize]) -> String {
    let numbers: Vec<String> = pages.iter().map(|p| p.to_string()).collect();
    match numbers.as_slice() {
        [] => "pages".to_string(),
        [only] => format!("page {}", only),
        [init @ .., last] => format!("pages {} and {}", init.join(", "), last),
    }
}

/// Outcome of the layout check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationResult {
    Valid,
    Invalid(Rejection),
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        matches!(self, ValidationResult::Valid)
    }

    pub fn rejection(&self) -> Option<&Rejection> {
        match self {
            ValidationResult::Valid => None,
            ValidationResult::Invalid(r) => Some(r),
        }
    }
}

/// Response body of a validation request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationReport {
    pub result: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Base64 PNG previews, one per page, when requested.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pages: Option<Vec<String>>,
}

/// Outcome of a sanitise request.
#[derive(Debug, Clone, PartialEq)]
pub enum SanitiseOutcome {
    Sanitised {
        pdf: Vec<u8>,
        page_count: usize,
        /// The citizen address block as extracted from page 1.
        recipient_address: String,
    },
    Rejected(Rejection),
}

/// One row of an inspection listing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PageReport {
    /// 1-indexed.
    pub page: usize,
    pub width_mm: f32,
    pub height_mm: f32,
    pub rotation: u16,
    pub a4_portrait: bool,
}

impl PageReport {
    pub fn new(geometry: &PageGeometry, a4_portrait: bool) -> Self {
        Self {
            page: geometry.index + 1,
            width_mm: geometry.width_mm(),
            height_mm: geometry.height_mm(),
            rotation: geometry.rotation.degrees(),
            a4_portrait,
        }
    }
}
