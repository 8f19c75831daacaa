//! Capability seams between the pipeline and the libraries that actually
//! read, draw on and rasterise PDFs.
//!
//! The pipeline never touches a PDF library directly. It asks a
//! [`PdfEngine`] for page geometry and bitmaps, hands it [`PageDrawing`]s to
//! merge, and asks a [`TextExtractor`] / [`ColourConverter`] for the two
//! operations that historically live in separate native tools. Every method
//! takes the document as bytes and returns new bytes: no engine mutates its
//! input.
//!
//! ```text
//!              ┌──────────────┐
//!   bytes ───▶ │  PdfEngine   │ ──▶ geometry / bitmaps / composed bytes
//!              ├──────────────┤
//!              │TextExtractor │ ──▶ plain text of a page region
//!              ├──────────────┤
//!              │ColourConvert │ ──▶ colour profile / CMYK bytes
//!              └──────────────┘
//! ```
//!
//! Two implementations ship:
//! * [`pdfium::PdfiumEngine`]: production engine on `pdfium-render`.
//! * [`memory::MemoryEngine`]: a deterministic JSON page model with a tiny
//!   software rasteriser, used by the test suite and dry runs.

pub mod memory;
pub mod pdfium;

use crate::error::SanitiseError;
use crate::geometry::{points_to_mm, PageSize, Rect, Region};
use image::RgbaImage;
use serde::{Deserialize, Serialize};
use std::fmt;

// ── Drawing model ────────────────────────────────────────────────────────

/// An 8-bit RGBA colour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Colour {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Colour {
    pub const WHITE: Colour = Colour::rgba(255, 255, 255, 255);
    pub const BLACK: Colour = Colour::rgba(0, 0, 0, 255);
    /// Translucent red used to tint disallowed regions in previews.
    pub const HIGHLIGHT: Colour = Colour::rgba(255, 0, 0, 51);

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }
}

/// One vector primitive, in bottom-left-origin user-space points.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Shape {
    /// A filled rectangle. Never stroked.
    Rect { rect: Rect, fill: Colour },
    /// A single line of Helvetica text with its baseline starting at `(x, y)`.
    Text {
        x: f32,
        y: f32,
        text: String,
        font_size: f32,
        colour: Colour,
    },
}

/// A vector drawing to merge onto one page.
///
/// `redactions` are applied first: text objects whose centre falls inside
/// any of the rectangles are removed from the page. `shapes` are then drawn
/// on top of the remaining content, in order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PageDrawing {
    /// 0-indexed page the drawing is merged onto.
    pub page_index: usize,
    pub redactions: Vec<Rect>,
    pub shapes: Vec<Shape>,
}

impl PageDrawing {
    pub fn new(page_index: usize) -> Self {
        Self {
            page_index,
            ..Self::default()
        }
    }

    pub fn rect(mut self, rect: Rect, fill: Colour) -> Self {
        self.shapes.push(Shape::Rect { rect, fill });
        self
    }

    pub fn text(
        mut self,
        x: f32,
        y: f32,
        text: impl Into<String>,
        font_size: f32,
        colour: Colour,
    ) -> Self {
        self.shapes.push(Shape::Text {
            x,
            y,
            text: text.into(),
            font_size,
            colour,
        });
        self
    }

    pub fn redact(mut self, rect: Rect) -> Self {
        self.redactions.push(rect);
        self
    }
}

// ── Page model ───────────────────────────────────────────────────────────

/// A canonical page rotation. A page with no rotation entry reads as `Deg0`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Rotation {
    #[default]
    Deg0,
    Deg90,
    Deg180,
    Deg270,
}

impl Rotation {
    /// Normalise a rotation in degrees; `None` for non-multiples of 90.
    pub fn from_degrees(degrees: i32) -> Option<Self> {
        match degrees.rem_euclid(360) {
            0 => Some(Rotation::Deg0),
            90 => Some(Rotation::Deg90),
            180 => Some(Rotation::Deg180),
            270 => Some(Rotation::Deg270),
            _ => None,
        }
    }

    pub fn degrees(self) -> u16 {
        match self {
            Rotation::Deg0 => 0,
            Rotation::Deg90 => 90,
            Rotation::Deg180 => 180,
            Rotation::Deg270 => 270,
        }
    }

    /// Whether the page is turned a quarter, swapping its visual axes.
    pub fn is_quarter_turn(self) -> bool {
        matches!(self, Rotation::Deg90 | Rotation::Deg270)
    }
}

impl fmt::Display for Rotation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}°", self.degrees())
    }
}

/// Media box size and rotation of one page.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PageGeometry {
    /// 0-indexed page position.
    pub index: usize,
    /// Media box width in points.
    pub width: f32,
    /// Media box height in points.
    pub height: f32,
    pub rotation: Rotation,
}

impl PageGeometry {
    pub fn size(&self) -> PageSize {
        PageSize {
            width: self.width,
            height: self.height,
        }
    }

    pub fn width_mm(&self) -> f32 {
        points_to_mm(self.width)
    }

    pub fn height_mm(&self) -> f32 {
        points_to_mm(self.height)
    }
}

/// Colour model of an embedded raster image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColourModel {
    Gray,
    Rgb,
    Cmyk,
    Other,
}

impl ColourModel {
    /// Classify a colour-space name such as `DeviceCMYK` or `ICCBased(RGB)`.
    pub fn from_name(name: &str) -> Self {
        let upper = name.to_ascii_uppercase();
        if upper.contains("CMYK") {
            ColourModel::Cmyk
        } else if upper.contains("RGB") {
            ColourModel::Rgb
        } else if upper.contains("GRAY") {
            ColourModel::Gray
        } else {
            ColourModel::Other
        }
    }
}

/// Which colour models a document's images use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct ColourProfile {
    pub contains_cmyk: bool,
    pub contains_rgb: bool,
}

impl ColourProfile {
    pub fn from_models(models: &[ColourModel]) -> Self {
        Self {
            contains_cmyk: models.contains(&ColourModel::Cmyk),
            contains_rgb: models.contains(&ColourModel::Rgb),
        }
    }

    /// Print-ready means some CMYK content and no RGB content.
    pub fn is_print_ready(&self) -> bool {
        self.contains_cmyk && !self.contains_rgb
    }
}

// ── Capabilities ─────────────────────────────────────────────────────────

/// Reading, merging and rasterising PDF pages.
pub trait PdfEngine: Send + Sync {
    /// Media box and rotation of every page, in order.
    fn page_geometry(&self, pdf: &[u8]) -> Result<Vec<PageGeometry>, SanitiseError>;

    fn page_count(&self, pdf: &[u8]) -> Result<usize, SanitiseError> {
        Ok(self.page_geometry(pdf)?.len())
    }

    /// Merge each drawing onto its page and return the new document. Pages
    /// without a drawing keep their content unchanged.
    fn compose(&self, pdf: &[u8], drawings: &[PageDrawing]) -> Result<Vec<u8>, SanitiseError>;

    /// Rasterise one 0-indexed page at `dpi`.
    fn render_page(&self, pdf: &[u8], index: usize, dpi: u32) -> Result<RgbaImage, SanitiseError>;

    /// Colour model of every embedded image, across all pages.
    fn image_colour_models(&self, pdf: &[u8]) -> Result<Vec<ColourModel>, SanitiseError>;
}

/// Extracting plain text from a rectangle of one page.
pub trait TextExtractor: Send + Sync {
    /// `region` is measured from the page's top-left corner, in points.
    /// Output lines are separated by `\n`.
    fn extract_text(
        &self,
        pdf: &[u8],
        page_index: usize,
        region: Region,
    ) -> Result<String, SanitiseError>;
}

/// Detecting and converting the document colour model.
pub trait ColourConverter: Send + Sync {
    fn profile(&self, pdf: &[u8]) -> Result<ColourProfile, SanitiseError>;

    fn convert_to_cmyk(&self, pdf: &[u8]) -> Result<Vec<u8>, SanitiseError>;
}
