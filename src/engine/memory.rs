//! A deterministic in-process engine over a JSON page model.
//!
//! Documents are the bytes `%PDF-memory\n` followed by a JSON
//! [`MemoryDocument`]. Each page is a list of [`Shape`]s plus the colour
//! models of its embedded images. The engine implements every capability the
//! pipeline needs, so the full sanitise/validate flow runs without a native
//! PDF library:
//!
//! * rasterisation samples pixel centres and alpha-blends shapes over white;
//!   text is drawn as its Helvetica glyph box
//! * text extraction returns the text shapes whose glyph box centre lies in
//!   the region, top to bottom
//! * CMYK conversion re-tags RGB images as CMYK
//!
//! Rotation is recorded for the classifier but not applied when rasterising.

use super::{
    Colour, ColourConverter, ColourModel, ColourProfile, PageDrawing, PageGeometry, PdfEngine,
    Rotation, Shape, TextExtractor,
};
use crate::error::SanitiseError;
use crate::fonts;
use crate::geometry::{mm_to_points, Rect, Region};
use image::{Rgba, RgbaImage};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::debug;

/// Leading bytes of every memory document. Starts with the PDF magic so
/// input validation treats it like any other PDF.
pub const MEMORY_MAGIC: &[u8] = b"%PDF-memory\n";

/// One page of a [`MemoryDocument`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryPage {
    /// Media box width in points.
    pub width: f32,
    /// Media box height in points.
    pub height: f32,
    /// Rotation in degrees; absent means unrotated.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rotation: Option<i32>,
    #[serde(default)]
    pub shapes: Vec<Shape>,
    /// Colour models of embedded images.
    #[serde(default)]
    pub images: Vec<ColourModel>,
}

impl MemoryPage {
    /// A blank page of `width_mm` × `height_mm`.
    pub fn blank_mm(width_mm: f32, height_mm: f32) -> Self {
        Self {
            width: mm_to_points(width_mm),
            height: mm_to_points(height_mm),
            rotation: None,
            shapes: Vec::new(),
            images: Vec::new(),
        }
    }

    /// A blank A4 portrait page.
    pub fn a4() -> Self {
        Self::blank_mm(210.0, 297.0)
    }

    pub fn rotated(mut self, degrees: i32) -> Self {
        self.rotation = Some(degrees);
        self
    }

    pub fn with_shape(mut self, shape: Shape) -> Self {
        self.shapes.push(shape);
        self
    }

    pub fn with_image(mut self, model: ColourModel) -> Self {
        self.images.push(model);
        self
    }

    /// Glyph box of every text shape, with its text.
    pub fn text_boxes(&self) -> impl Iterator<Item = (Rect, &str)> {
        self.shapes.iter().filter_map(|shape| match shape {
            Shape::Text {
                x,
                y,
                text,
                font_size,
                ..
            } => Some((text_box(*x, *y, text, *font_size), text.as_str())),
            Shape::Rect { .. } => None,
        })
    }
}

/// The whole document model.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MemoryDocument {
    pub pages: Vec<MemoryPage>,
}

impl MemoryDocument {
    pub fn new(pages: Vec<MemoryPage>) -> Self {
        Self { pages }
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, SanitiseError> {
        let json = serde_json::to_vec(self)
            .map_err(|e| SanitiseError::Internal(format!("Serialising document: {}", e)))?;
        let mut bytes = Vec::with_capacity(MEMORY_MAGIC.len() + json.len());
        bytes.extend_from_slice(MEMORY_MAGIC);
        bytes.extend_from_slice(&json);
        Ok(bytes)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, SanitiseError> {
        let body = bytes
            .strip_prefix(MEMORY_MAGIC)
            .ok_or_else(|| SanitiseError::CorruptPdf {
                detail: "missing memory document header".into(),
            })?;
        serde_json::from_slice(body).map_err(|e| SanitiseError::CorruptPdf {
            detail: e.to_string(),
        })
    }

    fn page(&self, index: usize) -> Result<&MemoryPage, SanitiseError> {
        self.pages
            .get(index)
            .ok_or(SanitiseError::PageOutOfRange {
                page: index + 1,
                total: self.pages.len(),
            })
    }
}

fn text_box(x: f32, y: f32, text: &str, font_size: f32) -> Rect {
    Rect::from_edges(
        x,
        y - fonts::descent(font_size),
        x + fonts::text_width(text, font_size),
        y + fonts::ascent(font_size),
    )
}

fn centre_inside(rect: &Rect, area: &Rect) -> bool {
    area.contains(rect.left + rect.width / 2.0, rect.bottom + rect.height / 2.0)
}

/// Engine over [`MemoryDocument`] bytes.
///
/// Counts renders and colour conversions so callers can check how often the
/// expensive paths ran.
#[derive(Debug, Default)]
pub struct MemoryEngine {
    renders: AtomicUsize,
    conversions: AtomicUsize,
}

impl MemoryEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pages rasterised so far.
    pub fn render_count(&self) -> usize {
        self.renders.load(Ordering::SeqCst)
    }

    /// CMYK conversions performed so far.
    pub fn conversion_count(&self) -> usize {
        self.conversions.load(Ordering::SeqCst)
    }
}

impl PdfEngine for MemoryEngine {
    fn page_geometry(&self, pdf: &[u8]) -> Result<Vec<PageGeometry>, SanitiseError> {
        let doc = MemoryDocument::from_bytes(pdf)?;
        doc.pages
            .iter()
            .enumerate()
            .map(|(index, page)| {
                let degrees = page.rotation.unwrap_or(0);
                let rotation =
                    Rotation::from_degrees(degrees).ok_or_else(|| SanitiseError::CorruptPdf {
                        detail: format!("page {} has rotation {}", index + 1, degrees),
                    })?;
                if page.width <= 0.0 || page.height <= 0.0 {
                    return Err(SanitiseError::CorruptPdf {
                        detail: format!("page {} has an empty media box", index + 1),
                    });
                }
                Ok(PageGeometry {
                    index,
                    width: page.width,
                    height: page.height,
                    rotation,
                })
            })
            .collect()
    }

    fn page_count(&self, pdf: &[u8]) -> Result<usize, SanitiseError> {
        Ok(MemoryDocument::from_bytes(pdf)?.pages.len())
    }

    fn compose(&self, pdf: &[u8], drawings: &[PageDrawing]) -> Result<Vec<u8>, SanitiseError> {
        let mut doc = MemoryDocument::from_bytes(pdf)?;
        let total = doc.pages.len();
        for drawing in drawings {
            let page = doc.pages.get_mut(drawing.page_index).ok_or_else(|| {
                SanitiseError::DrawingFailed {
                    page: drawing.page_index + 1,
                    detail: format!("document has {} pages", total),
                }
            })?;
            if !drawing.redactions.is_empty() {
                page.shapes.retain(|shape| match shape {
                    Shape::Text {
                        x,
                        y,
                        text,
                        font_size,
                        ..
                    } => {
                        let glyphs = text_box(*x, *y, text, *font_size);
                        !drawing
                            .redactions
                            .iter()
                            .any(|area| centre_inside(&glyphs, area))
                    }
                    Shape::Rect { .. } => true,
                });
            }
            page.shapes.extend(drawing.shapes.iter().cloned());
        }
        doc.to_bytes()
    }

    fn render_page(&self, pdf: &[u8], index: usize, dpi: u32) -> Result<RgbaImage, SanitiseError> {
        let doc = MemoryDocument::from_bytes(pdf)?;
        let page = doc.page(index)?;
        self.renders.fetch_add(1, Ordering::SeqCst);

        let scale = dpi as f32 / 72.0;
        let width = (page.width * scale).round().max(0.0) as u32;
        let height = (page.height * scale).round().max(0.0) as u32;
        let mut image = RgbaImage::from_pixel(width, height, Rgba([255, 255, 255, 255]));

        for shape in &page.shapes {
            let (area, colour) = match shape {
                Shape::Rect { rect, fill } => (*rect, *fill),
                Shape::Text {
                    x,
                    y,
                    text,
                    font_size,
                    colour,
                } => (text_box(*x, *y, text, *font_size), *colour),
            };
            fill_area(&mut image, page.height, scale, &area, colour);
        }

        debug!(
            "Rendered memory page {} → {}x{} px",
            index + 1,
            image.width(),
            image.height()
        );
        Ok(image)
    }

    fn image_colour_models(&self, pdf: &[u8]) -> Result<Vec<ColourModel>, SanitiseError> {
        let doc = MemoryDocument::from_bytes(pdf)?;
        Ok(doc
            .pages
            .iter()
            .flat_map(|page| page.images.iter().copied())
            .collect())
    }
}

/// Blend `colour` into every pixel whose centre lies inside `area`.
fn fill_area(
    image: &mut RgbaImage,
    page_height: f32,
    scale: f32,
    area: &Rect,
    colour: Colour,
) {
    if colour.a == 0 {
        return;
    }
    let (w, h) = (image.width(), image.height());
    let clamp = |v: f32, max: u32| (v.max(0.0) as u32).min(max);
    let x0 = clamp((area.left * scale).floor(), w);
    let x1 = clamp((area.right() * scale).ceil(), w);
    let y0 = clamp(((page_height - area.top()) * scale).floor(), h);
    let y1 = clamp(((page_height - area.bottom) * scale).ceil(), h);
    let alpha = colour.a as f32 / 255.0;

    for py in y0..y1 {
        let y = page_height - (py as f32 + 0.5) / scale;
        for px in x0..x1 {
            let x = (px as f32 + 0.5) / scale;
            if !area.contains(x, y) {
                continue;
            }
            let pixel = image.get_pixel_mut(px, py);
            let blend = |src: u8, dst: u8| {
                (src as f32 * alpha + dst as f32 * (1.0 - alpha)).round() as u8
            };
            *pixel = Rgba([
                blend(colour.r, pixel[0]),
                blend(colour.g, pixel[1]),
                blend(colour.b, pixel[2]),
                255,
            ]);
        }
    }
}

impl TextExtractor for MemoryEngine {
    fn extract_text(
        &self,
        pdf: &[u8],
        page_index: usize,
        region: Region,
    ) -> Result<String, SanitiseError> {
        let doc = MemoryDocument::from_bytes(pdf)?;
        let page = doc
            .page(page_index)
            .map_err(|e| SanitiseError::TextExtractionFailed {
                page: page_index + 1,
                detail: e.to_string(),
            })?;
        let area = region.to_rect(page.height);

        let mut hits: Vec<(Rect, &str)> = page
            .text_boxes()
            .filter(|(glyphs, _)| centre_inside(glyphs, &area))
            .collect();
        hits.sort_by(|(a, _), (b, _)| {
            b.bottom
                .total_cmp(&a.bottom)
                .then(a.left.total_cmp(&b.left))
        });

        Ok(hits
            .into_iter()
            .map(|(_, text)| text)
            .collect::<Vec<_>>()
            .join("\n"))
    }
}

impl ColourConverter for MemoryEngine {
    fn profile(&self, pdf: &[u8]) -> Result<ColourProfile, SanitiseError> {
        Ok(ColourProfile::from_models(&self.image_colour_models(pdf)?))
    }

    fn convert_to_cmyk(&self, pdf: &[u8]) -> Result<Vec<u8>, SanitiseError> {
        let mut doc = MemoryDocument::from_bytes(pdf)?;
        self.conversions.fetch_add(1, Ordering::SeqCst);
        for model in doc.pages.iter_mut().flat_map(|p| p.images.iter_mut()) {
            if *model == ColourModel::Rgb {
                *model = ColourModel::Cmyk;
            }
        }
        doc.to_bytes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(pages: Vec<MemoryPage>) -> Vec<u8> {
        MemoryDocument::new(pages).to_bytes().unwrap()
    }

    #[test]
    fn bytes_start_with_pdf_magic() {
        let bytes = doc(vec![MemoryPage::a4()]);
        assert_eq!(&bytes[..4], b"%PDF");
        assert_eq!(MemoryDocument::from_bytes(&bytes).unwrap().pages.len(), 1);
    }

    #[test]
    fn garbage_is_corrupt() {
        let err = MemoryDocument::from_bytes(b"%PDF-1.7 not json").unwrap_err();
        assert!(matches!(err, SanitiseError::CorruptPdf { .. }));
    }

    #[test]
    fn odd_rotation_is_corrupt() {
        let engine = MemoryEngine::new();
        let bytes = doc(vec![MemoryPage::a4().rotated(45)]);
        assert!(matches!(
            engine.page_geometry(&bytes),
            Err(SanitiseError::CorruptPdf { .. })
        ));
    }

    #[test]
    fn render_size_follows_dpi() {
        let engine = MemoryEngine::new();
        let bytes = doc(vec![MemoryPage::a4()]);
        let img = engine.render_page(&bytes, 0, 72).unwrap();
        assert_eq!((img.width(), img.height()), (595, 842));
        assert_eq!(engine.render_count(), 1);
    }

    #[test]
    fn opaque_rect_paints_pixels() {
        let engine = MemoryEngine::new();
        let page = MemoryPage::a4().with_shape(Shape::Rect {
            rect: Rect::new(0.0, 0.0, 10.0, 10.0),
            fill: Colour::BLACK,
        });
        let img = engine.render_page(&doc(vec![page]), 0, 72).unwrap();
        // Bottom-left of the page is the bottom row of the bitmap.
        assert_eq!(img.get_pixel(5, img.height() - 5), &Rgba([0, 0, 0, 255]));
        assert_eq!(img.get_pixel(20, img.height() - 5), &Rgba([255, 255, 255, 255]));
    }

    #[test]
    fn translucent_rect_blends_over_white() {
        let engine = MemoryEngine::new();
        let page = MemoryPage::a4().with_shape(Shape::Rect {
            rect: Rect::new(0.0, 0.0, 10.0, 10.0),
            fill: Colour::HIGHLIGHT,
        });
        let img = engine.render_page(&doc(vec![page]), 0, 72).unwrap();
        let px = img.get_pixel(5, img.height() - 5);
        assert_eq!(px[0], 255);
        assert!(px[1] < 255 && px[1] > 150, "got {:?}", px);
    }

    #[test]
    fn extraction_orders_lines_top_down() {
        let engine = MemoryEngine::new();
        let page = MemoryPage::a4()
            .with_shape(Shape::Text {
                x: 100.0,
                y: 700.0,
                text: "second".into(),
                font_size: 8.0,
                colour: Colour::BLACK,
            })
            .with_shape(Shape::Text {
                x: 100.0,
                y: 710.0,
                text: "first".into(),
                font_size: 8.0,
                colour: Colour::BLACK,
            });
        let bytes = doc(vec![page]);
        let region = Rect::new(90.0, 690.0, 100.0, 40.0).to_region(mm_to_points(297.0));
        let text = engine.extract_text(&bytes, 0, region).unwrap();
        assert_eq!(text, "first\nsecond");
    }

    #[test]
    fn compose_redacts_before_drawing() {
        let engine = MemoryEngine::new();
        let page = MemoryPage::a4().with_shape(Shape::Text {
            x: 100.0,
            y: 700.0,
            text: "old".into(),
            font_size: 8.0,
            colour: Colour::BLACK,
        });
        let bytes = doc(vec![page, MemoryPage::a4()]);
        let area = Rect::new(90.0, 690.0, 100.0, 40.0);
        let drawing = PageDrawing::new(0)
            .redact(area)
            .text(100.0, 700.0, "new", 8.0, Colour::BLACK);
        let out = engine.compose(&bytes, &[drawing]).unwrap();

        let text = engine
            .extract_text(&out, 0, area.to_region(mm_to_points(297.0)))
            .unwrap();
        assert_eq!(text, "new");
        let composed = MemoryDocument::from_bytes(&out).unwrap();
        assert_eq!(composed.pages[1], MemoryPage::a4());
    }

    #[test]
    fn compose_rejects_missing_page() {
        let engine = MemoryEngine::new();
        let bytes = doc(vec![MemoryPage::a4()]);
        let err = engine.compose(&bytes, &[PageDrawing::new(3)]).unwrap_err();
        assert!(matches!(err, SanitiseError::DrawingFailed { page: 4, .. }));
    }

    #[test]
    fn conversion_retags_rgb_images() {
        let engine = MemoryEngine::new();
        let bytes = doc(vec![MemoryPage::a4()
            .with_image(ColourModel::Rgb)
            .with_image(ColourModel::Gray)]);
        assert!(engine.profile(&bytes).unwrap().contains_rgb);
        let out = engine.convert_to_cmyk(&bytes).unwrap();
        let profile = engine.profile(&out).unwrap();
        assert!(profile.is_print_ready());
        assert_eq!(engine.conversion_count(), 1);
    }
}
