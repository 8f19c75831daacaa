//! Production engine backed by `pdfium-render`.
//!
//! ## Binding
//!
//! pdfium is a native library loaded at runtime. [`PdfiumEngine::new`] binds
//! once up front so a missing library surfaces at startup as
//! [`SanitiseError::EngineBindingFailed`] rather than on the first request.
//! Each call then binds again and opens its own document: pdfium keeps
//! per-document state that must not be shared across threads, and the
//! `thread_safe` feature serialises the calls that reach the library.
//!
//! All calls are blocking; the async wrappers on [`crate::Sanitiser`] move
//! them onto `spawn_blocking`.

use super::{
    Colour, ColourModel, PageDrawing, PageGeometry, PdfEngine, Rotation, Shape, TextExtractor,
};
use crate::error::SanitiseError;
use crate::geometry::{Rect, Region};
use image::RgbaImage;
use pdfium_render::prelude::*;
use std::path::PathBuf;
use tracing::{debug, info};

/// [`PdfEngine`] and [`TextExtractor`] on top of pdfium.
#[derive(Debug, Clone)]
pub struct PdfiumEngine {
    library_path: Option<PathBuf>,
}

impl PdfiumEngine {
    /// Bind to pdfium at `library_path` (a directory holding the platform
    /// library, or the library file itself). Without a path, the working
    /// directory and then the system library are tried.
    pub fn new(library_path: Option<PathBuf>) -> Result<Self, SanitiseError> {
        let engine = Self { library_path };
        engine.bind()?;
        info!(
            "pdfium bound ({})",
            engine
                .library_path
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "default search".into())
        );
        Ok(engine)
    }

    fn bind(&self) -> Result<Pdfium, SanitiseError> {
        let bindings = match &self.library_path {
            Some(path) if path.is_dir() => {
                let dir = path.to_string_lossy();
                Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path(&*dir))
            }
            Some(path) => Pdfium::bind_to_library(path),
            None => Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
                .or_else(|_| Pdfium::bind_to_system_library()),
        }
        .map_err(|e| SanitiseError::EngineBindingFailed(format!("{:?}", e)))?;
        Ok(Pdfium::new(bindings))
    }
}

fn load<'a>(pdfium: &'a Pdfium, pdf: &'a [u8]) -> Result<PdfDocument<'a>, SanitiseError> {
    pdfium.load_pdf_from_byte_slice(pdf, None).map_err(|e| {
        let detail = format!("{:?}", e);
        if detail.contains("Password") || detail.contains("password") {
            SanitiseError::PasswordProtected
        } else {
            SanitiseError::CorruptPdf { detail }
        }
    })
}

fn get_page<'a>(document: &PdfDocument<'a>, index: usize) -> Result<PdfPage<'a>, SanitiseError> {
    let pages = document.pages();
    let total = pages.len() as usize;
    if index >= total {
        return Err(SanitiseError::PageOutOfRange {
            page: index + 1,
            total,
        });
    }
    pages
        .get(index as u16)
        .map_err(|e| SanitiseError::CorruptPdf {
            detail: format!("page {}: {:?}", index + 1, e),
        })
}

/// Media box size, falling back to pdfium's page size when the box is
/// missing.
fn media_size(page: &PdfPage) -> (f32, f32) {
    match page.boundaries().media() {
        Ok(media) => (media.bounds.width().value, media.bounds.height().value),
        Err(_) => (page.width().value, page.height().value),
    }
}

fn pdf_colour(colour: Colour) -> PdfColor {
    PdfColor::new(colour.r, colour.g, colour.b, colour.a)
}

fn pdf_rect(rect: &Rect) -> PdfRect {
    PdfRect::new_from_values(rect.bottom, rect.left, rect.top(), rect.right())
}

/// Remove every text object whose centre lies inside one of `areas`.
fn redact(page: &mut PdfPage, areas: &[Rect]) -> Result<(), PdfiumError> {
    if areas.is_empty() {
        return Ok(());
    }
    let mut doomed = Vec::new();
    for (index, object) in page.objects().iter().enumerate() {
        if object.as_text_object().is_none() {
            continue;
        }
        let bounds = object.bounds()?;
        let cx = (bounds.left().value + bounds.right().value) / 2.0;
        let cy = (bounds.bottom().value + bounds.top().value) / 2.0;
        if areas.iter().any(|area| area.contains(cx, cy)) {
            doomed.push(index);
        }
    }
    for index in doomed.into_iter().rev() {
        page.objects_mut().remove_object_at_index(index)?;
    }
    Ok(())
}

fn draw(page: &mut PdfPage, font: PdfFontToken, shape: &Shape) -> Result<(), PdfiumError> {
    match shape {
        Shape::Rect { rect, fill } => {
            page.objects_mut().create_path_object_rect(
                pdf_rect(rect),
                None,
                None,
                Some(pdf_colour(*fill)),
            )?;
        }
        Shape::Text {
            x,
            y,
            text,
            font_size,
            colour,
        } => {
            let mut object = page.objects_mut().create_text_object(
                PdfPoints::new(*x),
                PdfPoints::new(*y),
                text,
                font,
                PdfPoints::new(*font_size),
            )?;
            object.set_fill_color(pdf_colour(*colour))?;
        }
    }
    Ok(())
}

impl PdfEngine for PdfiumEngine {
    fn page_geometry(&self, pdf: &[u8]) -> Result<Vec<PageGeometry>, SanitiseError> {
        let pdfium = self.bind()?;
        let document = load(&pdfium, pdf)?;
        let pages = document.pages();
        info!("PDF loaded: {} pages", pages.len());

        pages
            .iter()
            .enumerate()
            .map(|(index, page)| {
                let rotation = match page.rotation() {
                    Ok(PdfPageRenderRotation::None) => Rotation::Deg0,
                    Ok(PdfPageRenderRotation::Degrees90) => Rotation::Deg90,
                    Ok(PdfPageRenderRotation::Degrees180) => Rotation::Deg180,
                    Ok(PdfPageRenderRotation::Degrees270) => Rotation::Deg270,
                    Err(e) => {
                        return Err(SanitiseError::CorruptPdf {
                            detail: format!("page {} rotation: {:?}", index + 1, e),
                        })
                    }
                };
                let (width, height) = media_size(&page);
                Ok(PageGeometry {
                    index,
                    width,
                    height,
                    rotation,
                })
            })
            .collect()
    }

    fn page_count(&self, pdf: &[u8]) -> Result<usize, SanitiseError> {
        let pdfium = self.bind()?;
        let document = load(&pdfium, pdf)?;
        let count = document.pages().len() as usize;
        Ok(count)
    }

    fn compose(&self, pdf: &[u8], drawings: &[PageDrawing]) -> Result<Vec<u8>, SanitiseError> {
        let pdfium = self.bind()?;
        let mut document = load(&pdfium, pdf)?;
        let font = document.fonts_mut().helvetica();

        for drawing in drawings {
            let page_num = drawing.page_index + 1;
            let fail = |e: PdfiumError| SanitiseError::DrawingFailed {
                page: page_num,
                detail: format!("{:?}", e),
            };
            let mut page = get_page(&document, drawing.page_index)?;
            redact(&mut page, &drawing.redactions).map_err(fail)?;
            for shape in &drawing.shapes {
                draw(&mut page, font, shape).map_err(fail)?;
            }
            debug!(
                "Merged {} shapes onto page {} ({} redactions)",
                drawing.shapes.len(),
                page_num,
                drawing.redactions.len()
            );
        }

        document
            .save_to_bytes()
            .map_err(|e| SanitiseError::Internal(format!("Saving composed PDF: {:?}", e)))
    }

    fn render_page(&self, pdf: &[u8], index: usize, dpi: u32) -> Result<RgbaImage, SanitiseError> {
        let pdfium = self.bind()?;
        let document = load(&pdfium, pdf)?;
        let page = get_page(&document, index)?;

        let render_config = PdfRenderConfig::new().scale_page_by_factor(dpi as f32 / 72.0);
        let bitmap = page.render_with_config(&render_config).map_err(|e| {
            SanitiseError::RasterisationFailed {
                page: index + 1,
                detail: format!("{:?}", e),
            }
        })?;

        let image = bitmap.as_image().to_rgba8();
        debug!(
            "Rendered page {} → {}x{} px",
            index + 1,
            image.width(),
            image.height()
        );
        Ok(image)
    }

    fn image_colour_models(&self, pdf: &[u8]) -> Result<Vec<ColourModel>, SanitiseError> {
        let pdfium = self.bind()?;
        let document = load(&pdfium, pdf)?;
        let mut models = Vec::new();
        for page in document.pages().iter() {
            for object in page.objects().iter() {
                if let Some(image) = object.as_image_object() {
                    let model = match image.color_space() {
                        Ok(space) => ColourModel::from_name(&format!("{:?}", space)),
                        Err(_) => ColourModel::Other,
                    };
                    models.push(model);
                }
            }
        }
        debug!("Found {} embedded images", models.len());
        Ok(models)
    }
}

impl TextExtractor for PdfiumEngine {
    fn extract_text(
        &self,
        pdf: &[u8],
        page_index: usize,
        region: Region,
    ) -> Result<String, SanitiseError> {
        let pdfium = self.bind()?;
        let document = load(&pdfium, pdf)?;
        let page = get_page(&document, page_index)?;
        let (_, height) = media_size(&page);

        let text = page
            .text()
            .map_err(|e| SanitiseError::TextExtractionFailed {
                page: page_index + 1,
                detail: format!("{:?}", e),
            })?;
        Ok(text.inside_rect(pdf_rect(&region.to_rect(height))))
    }
}
