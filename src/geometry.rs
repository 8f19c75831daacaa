//! The geometry catalog: page size, margins and the reserved zones of a
//! precompiled letter.
//!
//! All measurements are millimetres relative to a page edge. Zones are
//! resolved into PDF user-space points (origin bottom-left) against the size
//! of the page they are drawn on, so the same catalog serves any media box.
//! The catalog itself is plain `Copy` data built once and passed by
//! reference into every pipeline stage; nothing recomputes it per document.
//!
//! ```text
//!  ┌──────────────────────────────────────────────┐  ▲ 5mm top margin
//!  │   ┌───────────── logo ──────────┬──────────┐ │
//!  │   │                             │ service  │ │
//!  │   └─────────────────────────────┤ address  │ │
//!  │     ┌── citizen address ──┐     │          │ │
//!  │     └─────────────────────┘     │          │ │
//!  │   ┌─────────────────────────────┴──────────┐ │  95mm from top
//!  │   │                 body                   │ │
//!  │   └────────────────────────────────────────┘ │
//!  └──────────────────────────────────────────────┘  ▼ 5mm bottom margin
//!   15mm                                       15mm
//! ```

use serde::{Deserialize, Serialize};

/// PostScript points per millimetre (72 pt per inch, 25.4 mm per inch).
pub const POINTS_PER_MM: f32 = 72.0 / 25.4;

/// Convert millimetres to points.
pub fn mm_to_points(mm: f32) -> f32 {
    mm * POINTS_PER_MM
}

/// Convert points to millimetres.
pub fn points_to_mm(points: f32) -> f32 {
    points / POINTS_PER_MM
}

/// An axis-aligned rectangle in PDF user space (points, origin bottom-left).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub left: f32,
    pub bottom: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub fn new(left: f32, bottom: f32, width: f32, height: f32) -> Self {
        Self {
            left,
            bottom,
            width,
            height,
        }
    }

    /// Build a rectangle from its four edges.
    pub fn from_edges(left: f32, bottom: f32, right: f32, top: f32) -> Self {
        Self::new(left, bottom, right - left, top - bottom)
    }

    pub fn right(&self) -> f32 {
        self.left + self.width
    }

    pub fn top(&self) -> f32 {
        self.bottom + self.height
    }

    /// Whether the point lies inside the rectangle (left/bottom inclusive).
    pub fn contains(&self, x: f32, y: f32) -> bool {
        x >= self.left && x < self.right() && y >= self.bottom && y < self.top()
    }

    /// Area shared with `other`; zero for rectangles that merely touch.
    pub fn overlap_area(&self, other: &Rect) -> f32 {
        let w = self.right().min(other.right()) - self.left.max(other.left);
        let h = self.top().min(other.top()) - self.bottom.max(other.bottom);
        if w > 0.0 && h > 0.0 {
            w * h
        } else {
            0.0
        }
    }

    /// Grow the rectangle by `margin` points on every side.
    pub fn expand(&self, margin: f32) -> Self {
        Self::new(
            self.left - margin,
            self.bottom - margin,
            self.width + 2.0 * margin,
            self.height + 2.0 * margin,
        )
    }

    /// Re-express the rectangle with a top-left origin on a page of
    /// `page_height` points, which is what text extraction works in.
    pub fn to_region(&self, page_height: f32) -> Region {
        Region {
            x: self.left,
            y: page_height - self.top(),
            width: self.width,
            height: self.height,
        }
    }
}

/// A rectangle measured from the top-left corner of the page, in points.
///
/// This is the device-unit convention of text extraction tools: `x` grows to
/// the right, `y` grows downwards.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Region {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Region {
    /// Build a region from millimetre offsets measured from the top-left.
    pub fn from_mm(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x: mm_to_points(x),
            y: mm_to_points(y),
            width: mm_to_points(width),
            height: mm_to_points(height),
        }
    }

    /// Convert back into bottom-left-origin user space.
    pub fn to_rect(&self, page_height: f32) -> Rect {
        Rect::new(self.x, page_height - self.y - self.height, self.width, self.height)
    }
}

/// Page dimensions in points, as read from the media box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageSize {
    pub width: f32,
    pub height: f32,
}

/// A horizontal zone edge, in millimetres from the left or right page edge.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum XEdge {
    FromLeft(f32),
    FromRight(f32),
}

impl XEdge {
    fn resolve(self, page: PageSize) -> f32 {
        match self {
            XEdge::FromLeft(mm) => mm_to_points(mm),
            XEdge::FromRight(mm) => page.width - mm_to_points(mm),
        }
    }
}

/// A vertical zone edge, in millimetres from the top or bottom page edge.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum YEdge {
    FromTop(f32),
    FromBottom(f32),
}

impl YEdge {
    fn resolve(self, page: PageSize) -> f32 {
        match self {
            YEdge::FromTop(mm) => page.height - mm_to_points(mm),
            YEdge::FromBottom(mm) => mm_to_points(mm),
        }
    }
}

/// The named reserved areas of a letter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ZoneKind {
    Body,
    CitizenAddress,
    ServiceAddress,
    Logo,
}

/// A reserved rectangle described by its four edges.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Zone {
    pub kind: ZoneKind,
    pub left: XEdge,
    pub right: XEdge,
    pub top: YEdge,
    pub bottom: YEdge,
}

impl Zone {
    /// Resolve the zone to user-space points on a page of the given size.
    pub fn resolve(&self, page: PageSize) -> Rect {
        Rect::from_edges(
            self.left.resolve(page),
            self.bottom.resolve(page),
            self.right.resolve(page),
            self.top.resolve(page),
        )
    }
}

/// Blank strips around the page where nothing may be printed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Margins {
    pub top: f32,
    pub bottom: f32,
    pub left: f32,
    pub right: f32,
}

/// The accepted physical page.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageSpec {
    pub height_mm: f32,
    pub width_mm: f32,
    pub tolerance_mm: f32,
}

/// Placement of the system marker on page 1.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MarkerSpec {
    pub text: &'static str,
    pub from_top_mm: f32,
    pub from_left_mm: f32,
    pub font_size: f32,
    pub line_spacing: f32,
}

/// Typography of a re-rendered address block.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AddressTextSpec {
    pub font_size: f32,
    pub line_height: f32,
    /// Upward baseline shift that keeps descenders on the last line inside
    /// the address window.
    pub rise: f32,
    /// Slack added around the address zone when extracting text.
    pub extraction_margin_mm: f32,
}

/// Every fixed measurement of the letter layout.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeometryCatalog {
    pub page: PageSpec,
    pub margins: Margins,
    pub body: Zone,
    pub citizen_address: Zone,
    pub service_address: Zone,
    pub logo: Zone,
    /// The body zone of pages 2 onwards, which spans the page between the
    /// top and bottom margins.
    pub continuation_body: Zone,
    pub marker: MarkerSpec,
    pub address_text: AddressTextSpec,
}

/// The A4 letter layout accepted by the print provider.
pub const A4_LETTER: GeometryCatalog = GeometryCatalog {
    page: PageSpec {
        height_mm: 297.0,
        width_mm: 210.0,
        tolerance_mm: 2.0,
    },
    margins: Margins {
        top: 5.0,
        bottom: 5.0,
        left: 15.0,
        right: 15.0,
    },
    body: Zone {
        kind: ZoneKind::Body,
        left: XEdge::FromLeft(15.0),
        right: XEdge::FromRight(15.0),
        top: YEdge::FromTop(95.0),
        bottom: YEdge::FromBottom(5.0),
    },
    citizen_address: Zone {
        kind: ZoneKind::CitizenAddress,
        left: XEdge::FromLeft(24.6),
        right: XEdge::FromLeft(120.0),
        top: YEdge::FromTop(39.5),
        bottom: YEdge::FromTop(66.3),
    },
    service_address: Zone {
        kind: ZoneKind::ServiceAddress,
        left: XEdge::FromLeft(125.0),
        right: XEdge::FromRight(15.0),
        top: YEdge::FromTop(5.0),
        bottom: YEdge::FromTop(95.0),
    },
    logo: Zone {
        kind: ZoneKind::Logo,
        left: XEdge::FromLeft(15.0),
        right: XEdge::FromLeft(125.0),
        top: YEdge::FromTop(5.0),
        bottom: YEdge::FromTop(30.0),
    },
    continuation_body: Zone {
        kind: ZoneKind::Body,
        left: XEdge::FromLeft(15.0),
        right: XEdge::FromRight(15.0),
        top: YEdge::FromTop(5.0),
        bottom: YEdge::FromBottom(5.0),
    },
    marker: MarkerSpec {
        text: "NOTIFY",
        from_top_mm: 4.3,
        from_left_mm: 7.4,
        font_size: 6.0,
        line_spacing: 1.75,
    },
    address_text: AddressTextSpec {
        font_size: 8.0,
        line_height: 8.5,
        rise: 2.0,
        extraction_margin_mm: 3.0,
    },
};

impl Default for GeometryCatalog {
    fn default() -> Self {
        A4_LETTER
    }
}

impl GeometryCatalog {
    /// Zones that may carry content on page 1.
    pub fn first_page_zones(&self) -> [Zone; 4] {
        [
            self.body,
            self.service_address,
            self.logo,
            self.citizen_address,
        ]
    }

    /// Zones that may carry content on pages 2 onwards.
    pub fn continuation_zones(&self) -> [Zone; 1] {
        [self.continuation_body]
    }

    /// The four margin strips of a page, which must stay blank.
    pub fn margin_strips(&self, page: PageSize) -> [Rect; 4] {
        let left = mm_to_points(self.margins.left);
        let right = mm_to_points(self.margins.right);
        let top = mm_to_points(self.margins.top);
        let bottom = mm_to_points(self.margins.bottom);
        [
            Rect::new(0.0, 0.0, left, page.height),
            Rect::from_edges(left, page.height - top, page.width - right, page.height),
            Rect::new(page.width - right, 0.0, right, page.height),
            Rect::from_edges(left, 0.0, page.width - right, bottom),
        ]
    }

    /// The blank strips around the citizen address on page 1: left of it,
    /// above it (up to the logo), right of it (up to the service address
    /// column) and below it (down to the body).
    pub fn address_surround(&self, page: PageSize) -> [Rect; 4] {
        let margin_left = mm_to_points(self.margins.left);
        let address = self.citizen_address.resolve(page);
        let logo = self.logo.resolve(page);
        let service = self.service_address.resolve(page);
        let body = self.body.resolve(page);
        [
            Rect::from_edges(margin_left, address.bottom, address.left, address.top()),
            Rect::from_edges(margin_left, address.top(), service.left, logo.bottom),
            Rect::from_edges(address.right(), address.bottom, service.left, address.top()),
            Rect::from_edges(margin_left, body.top(), service.left, address.bottom),
        ]
    }

    /// The address zone grown by the extraction margin, as a top-left region.
    pub fn address_extraction_region(&self, page: PageSize) -> Region {
        self.citizen_address
            .resolve(page)
            .expand(mm_to_points(self.address_text.extraction_margin_mm))
            .to_region(page.height)
    }
}
