//! End-to-end tests against the real pdfium engine (and ghostscript where
//! noted).
//!
//! They need the native pdfium library, so they are gated behind the
//! `E2E_ENABLED` environment variable and skipped otherwise. Letters are
//! generated with pdfium itself; tests that read sample files from
//! `./test_cases/` also skip when the file is missing.
//!
//! Run with:
//!   E2E_ENABLED=1 LETTERGUARD_PDFIUM_LIB_PATH=. cargo test --test e2e -- --nocapture

use letterguard::engine::pdfium::PdfiumEngine;
use letterguard::geometry::{mm_to_points, A4_LETTER};
use letterguard::pipeline::marker::is_marker_present;
use letterguard::{
    OverlayFormat, RejectionReason, SanitiseConfig, SanitiseOutcome, Sanitiser, ValidationResult,
};
use pdfium_render::prelude::*;
use std::path::PathBuf;
use std::process::Command;

// ── Test helpers ─────────────────────────────────────────────────────────────

fn test_cases_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("test_cases")
}

fn lib_path() -> Option<PathBuf> {
    std::env::var_os("LETTERGUARD_PDFIUM_LIB_PATH").map(PathBuf::from)
}

/// Skip this test unless E2E_ENABLED is set.
macro_rules! e2e_skip_unless_enabled {
    () => {{
        if std::env::var("E2E_ENABLED").is_err() {
            println!("SKIP — set E2E_ENABLED=1 to run e2e tests");
            return;
        }
    }};
}

/// Skip this test if E2E_ENABLED is not set *or* no PDF file at `path`.
macro_rules! e2e_skip_unless_ready {
    ($path:expr) => {{
        e2e_skip_unless_enabled!();
        let p: PathBuf = $path;
        if !p.exists() {
            println!("SKIP — test file not found: {}", p.display());
            return;
        }
        p
    }};
}

fn bind() -> Pdfium {
    let bindings = match lib_path() {
        Some(dir) => Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path(
            &*dir.to_string_lossy(),
        )),
        None => Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
            .or_else(|_| Pdfium::bind_to_system_library()),
    }
    .expect("pdfium should be available when E2E_ENABLED is set");
    Pdfium::new(bindings)
}

/// A black square `size_mm` wide, top-left corner `(x_mm, y_mm)` from the
/// page's top-left corner.
struct Ink {
    x_mm: f32,
    y_mm: f32,
    size_mm: f32,
}

/// Build a letter with pdfium: one entry per page, each with its ink.
fn letter(pages: &[(PdfPagePaperSize, Vec<Ink>)]) -> Vec<u8> {
    let pdfium = bind();
    let mut document = pdfium.create_new_pdf().expect("new document");
    for (size, inks) in pages {
        let mut page = document
            .pages_mut()
            .create_page_at_end(*size)
            .expect("new page");
        let height = page.height().value;
        for ink in inks {
            let left = mm_to_points(ink.x_mm);
            let top = height - mm_to_points(ink.y_mm);
            let side = mm_to_points(ink.size_mm);
            page.objects_mut()
                .create_path_object_rect(
                    PdfRect::new_from_values(top - side, left, top, left + side),
                    None,
                    None,
                    Some(PdfColor::new(0, 0, 0, 255)),
                )
                .expect("ink rectangle");
        }
    }
    document.save_to_bytes().expect("save")
}

fn sanitiser() -> Sanitiser {
    let mut builder = SanitiseConfig::builder();
    if let Some(path) = lib_path() {
        builder = builder.pdfium_lib_path(path);
    }
    Sanitiser::with_pdfium(builder.build().expect("valid config")).expect("pdfium binds")
}

fn ghostscript_available() -> bool {
    Command::new("gs").arg("--version").output().is_ok()
}

// ── Layout checks ────────────────────────────────────────────────────────────

#[test]
fn blank_a4_letter_is_valid() {
    e2e_skip_unless_enabled!();
    let pdf = letter(&[(PdfPagePaperSize::a4(), vec![])]);
    assert_eq!(sanitiser().check_layout(&pdf).unwrap(), ValidationResult::Valid);
}

#[test]
fn ink_in_the_body_is_valid() {
    e2e_skip_unless_enabled!();
    let pdf = letter(&[(
        PdfPagePaperSize::a4(),
        vec![Ink {
            x_mm: 40.0,
            y_mm: 150.0,
            size_mm: 30.0,
        }],
    )]);
    assert_eq!(sanitiser().check_layout(&pdf).unwrap(), ValidationResult::Valid);
}

#[test]
fn dot_in_the_margin_is_rejected() {
    e2e_skip_unless_enabled!();
    let pdf = letter(&[
        (PdfPagePaperSize::a4(), vec![]),
        (
            PdfPagePaperSize::a4(),
            vec![Ink {
                x_mm: 5.0,
                y_mm: 5.0,
                size_mm: 1.0,
            }],
        ),
    ]);
    let result = sanitiser().check_layout(&pdf).unwrap();
    let rejection = result.rejection().expect("margin ink should be rejected");
    assert_eq!(rejection.reason, RejectionReason::ContentOutsidePrintableArea);
    assert_eq!(rejection.pages, vec![2]);
}

#[test]
fn landscape_page_is_rejected() {
    e2e_skip_unless_enabled!();
    let pdf = letter(&[(PdfPagePaperSize::a4().landscape(), vec![])]);
    let report = sanitiser().validate(&pdf, false).unwrap();
    assert!(!report.result);
    assert_eq!(
        report.message.as_deref(),
        Some("Your letter is not A4 portrait size on page 1")
    );
}

#[test]
fn inspect_reports_a4() {
    e2e_skip_unless_enabled!();
    let pdf = letter(&[(PdfPagePaperSize::a4(), vec![]), (PdfPagePaperSize::a4(), vec![])]);
    let pages = sanitiser().inspect(&pdf).unwrap();
    assert_eq!(pages.len(), 2);
    assert!(pages.iter().all(|p| p.a4_portrait));
    assert!((pages[0].width_mm - 210.0).abs() < 1.0);
}

// ── Marker, previews, overlays ───────────────────────────────────────────────

#[test]
fn add_tag_is_detectable() {
    e2e_skip_unless_enabled!();
    let s = sanitiser();
    let pdf = letter(&[(PdfPagePaperSize::a4(), vec![])]);
    let engine = PdfiumEngine::new(lib_path()).unwrap();
    assert!(!is_marker_present(&engine, &pdf, &A4_LETTER).unwrap());
    let tagged = s.add_tag(&pdf).unwrap();
    assert!(is_marker_present(&engine, &tagged, &A4_LETTER).unwrap());
    // The white marker does not count as ink.
    assert_eq!(s.check_layout(&tagged).unwrap(), ValidationResult::Valid);
}

#[test]
fn validate_preview_renders_every_page() {
    e2e_skip_unless_enabled!();
    let pdf = letter(&[(PdfPagePaperSize::a4(), vec![]), (PdfPagePaperSize::a4(), vec![])]);
    let report = sanitiser().validate(&pdf, true).unwrap();
    assert!(report.result);
    assert_eq!(report.pages.map(|p| p.len()), Some(2));
}

#[test]
fn overlay_png_is_a_png() {
    e2e_skip_unless_enabled!();
    let pdf = letter(&[(PdfPagePaperSize::a4(), vec![])]);
    let png = sanitiser()
        .overlay(&pdf, OverlayFormat::Png { page_number: 1 })
        .unwrap();
    assert_eq!(&png[1..4], b"PNG");
}

// ── Sanitise (needs ghostscript) ─────────────────────────────────────────────

#[tokio::test]
async fn sanitise_converts_and_tags() {
    e2e_skip_unless_enabled!();
    if !ghostscript_available() {
        println!("SKIP — ghostscript not installed");
        return;
    }
    let s = sanitiser();
    let pdf = letter(&[(PdfPagePaperSize::a4(), vec![])]);
    match s.sanitise_async(pdf).await.unwrap() {
        SanitiseOutcome::Sanitised { pdf, page_count, .. } => {
            assert_eq!(page_count, 1);
            let engine = PdfiumEngine::new(lib_path()).unwrap();
            assert!(is_marker_present(&engine, &pdf, &A4_LETTER).unwrap());
        }
        SanitiseOutcome::Rejected(r) => panic!("unexpected rejection: {}", r),
    }
}

#[tokio::test]
async fn sample_letter_from_test_cases() {
    let path = e2e_skip_unless_ready!(test_cases_dir().join("valid_letter.pdf"));
    let pdf = std::fs::read(&path).unwrap();
    let report = sanitiser().validate_async(pdf, false).await.unwrap();
    println!("{}: {:?}", path.display(), report);
    assert!(report.result, "sample letter should pass: {:?}", report.message);
}
