//! End-to-end integration tests for edgequake-layout.
//!
//! These need a pdfium library and, for the service tests, live Document
//! Intelligence credentials. They are gated behind the `E2E_ENABLED`
//! environment variable so they do not run in CI unless explicitly requested.
//!
//! Run with:
//!   E2E_ENABLED=1 PDFIUM_LIB_PATH=. cargo test --test e2e -- --nocapture
//!
//! Service tests additionally need AZURE_DOCUMENT_INTELLIGENCE_ENDPOINT and
//! AZURE_DOCUMENT_INTELLIGENCE_KEY.

use edgequake_layout::geometry::format_polygon;
use edgequake_layout::model::{
    save_json, AnalysisDocument, BoundingRegion, Page, Paragraph, Word,
};
use edgequake_layout::pipeline::overlay::ElementCategory;
use edgequake_layout::pipeline::render::bind_pdfium;
use edgequake_layout::{
    analyze_to_file, verify_credentials, visualize, OverlayConfig, ServiceConfig,
};
use pdfium_render::prelude::*;
use std::path::{Path, PathBuf};

// ── Test helpers ─────────────────────────────────────────────────────────────

macro_rules! e2e_skip_unless_enabled {
    () => {{
        if std::env::var("E2E_ENABLED").is_err() {
            println!("SKIP — set E2E_ENABLED=1 to run e2e tests");
            return;
        }
    }};
}

macro_rules! e2e_skip_unless_credentials {
    () => {{
        e2e_skip_unless_enabled!();
        let config = ServiceConfig::from_env();
        if config.credentials().is_err() {
            println!("SKIP — Document Intelligence credentials not set");
            return;
        }
        config
    }};
}

/// Write a blank two-page US Letter PDF with pdfium.
fn blank_pdf(path: &Path) {
    let pdfium = bind_pdfium(OverlayConfig::from_env().pdfium_lib_path.as_deref())
        .unwrap_or_else(|e| panic!("pdfium: {e}"));
    let mut document = pdfium.create_new_pdf().expect("new document");
    for _ in 0..2 {
        document
            .pages_mut()
            .create_page_at_end(PdfPagePaperSize::Custom(
                PdfPoints::new(612.0),
                PdfPoints::new(792.0),
            ))
            .expect("new page");
    }
    document.save_to_file(path).expect("save blank pdf");
}

fn one_word_analysis() -> AnalysisDocument {
    let square = format_polygon(&[1.0, 1.0, 2.0, 1.0, 2.0, 2.0, 1.0, 2.0]);
    AnalysisDocument {
        pages: vec![Page {
            page_number: 1,
            width: Some(8.5),
            height: Some(11.0),
            words: vec![Word {
                content: "Test".into(),
                confidence: 0.99,
                polygon: square.clone(),
                span: None,
            }],
            ..Page::default()
        }],
        paragraphs: vec![Paragraph {
            role: None,
            content: "Test".into(),
            bounding_regions: vec![BoundingRegion {
                page_number: 1,
                polygon: square,
            }],
        }],
        ..AnalysisDocument::default()
    }
}

fn sample_document() -> Option<PathBuf> {
    let p = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("sample_documents/sample.pdf");
    p.exists().then_some(p)
}

/// A path object read back from a rendered PDF.
#[derive(Debug, PartialEq)]
struct DrawnPath {
    bounds: [f32; 4],
    fill: [u8; 4],
    stroke: [u8; 4],
}

fn rgba(color: PdfColor) -> [u8; 4] {
    [color.red(), color.green(), color.blue(), color.alpha()]
}

/// Path objects on page 1, and the object count of every later page.
fn read_back(pdf: &Path) -> (Vec<DrawnPath>, Vec<usize>) {
    let pdfium = bind_pdfium(OverlayConfig::from_env().pdfium_lib_path.as_deref())
        .unwrap_or_else(|e| panic!("pdfium: {e}"));
    let document = pdfium.load_pdf_from_file(pdf, None).expect("load output");
    let pages = document.pages();

    let first = pages.get(0).expect("first page");
    let paths = first
        .objects()
        .iter()
        .filter(|object| object.object_type() == PdfPageObjectType::Path)
        .map(|object| {
            let bounds = object.bounds().expect("bounds");
            DrawnPath {
                bounds: [
                    bounds.left().value,
                    bounds.bottom().value,
                    bounds.right().value,
                    bounds.top().value,
                ],
                fill: rgba(object.fill_color().expect("fill color")),
                stroke: rgba(object.stroke_color().expect("stroke color")),
            }
        })
        .collect();

    let later = (1..pages.len())
        .map(|i| pages.get(i).expect("page").objects().len())
        .collect();
    (paths, later)
}

fn assert_close(actual: f32, expected: f32) {
    // Bounds may include half the 1 pt stroke.
    assert!(
        (actual - expected).abs() <= 1.0,
        "expected {expected}, got {actual}"
    );
}

// ── Overlay (pdfium, no service) ─────────────────────────────────────────────

#[tokio::test]
async fn test_visualize_json_analysis() {
    e2e_skip_unless_enabled!();
    let dir = tempfile::tempdir().unwrap();
    let pdf = dir.path().join("blank.pdf");
    blank_pdf(&pdf);
    let original = std::fs::read(&pdf).unwrap();

    let analysis = dir.path().join("analysis.json");
    save_json(&one_word_analysis(), &analysis).unwrap();
    let output = dir.path().join("out/annotated.pdf");

    let stats = visualize(&pdf, &analysis, &output, &OverlayConfig::from_env())
        .await
        .expect("visualize should succeed");

    assert_eq!(stats.drawn, 2, "paragraph + word");
    assert!(stats.failures.is_empty());
    assert_eq!(std::fs::read(&pdf).unwrap(), original, "input must be unchanged");

    let (paths, later_pages) = read_back(&output);
    assert_eq!(paths.len(), 2);
    for path in &paths {
        // (1, 1)-(2, 2) in inches, y flipped against 792 pt.
        let [left, bottom, right, top] = path.bounds;
        assert_close(left, 72.0);
        assert_close(right, 144.0);
        assert_close(bottom, 648.0);
        assert_close(top, 720.0);
        assert_eq!(path.fill[3], 51, "fill opacity 0.2");
        assert_eq!(path.stroke[..3], path.fill[..3]);
    }
    assert_eq!(
        paths[0].fill[..3],
        ElementCategory::Paragraph.color().to_u8(),
        "paragraph below"
    );
    assert_eq!(paths[1].fill[..3], [255, 0, 0], "word on top");
    assert_eq!(paths[1].stroke, [255, 0, 0, 255]);
    assert_eq!(later_pages, vec![0], "page 2 is copied through untouched");
}

#[tokio::test]
async fn test_rendering_twice_draws_identical_geometry() {
    e2e_skip_unless_enabled!();
    let dir = tempfile::tempdir().unwrap();
    let pdf = dir.path().join("blank.pdf");
    blank_pdf(&pdf);
    let analysis = dir.path().join("analysis.json");
    save_json(&one_word_analysis(), &analysis).unwrap();

    let first = dir.path().join("first.pdf");
    let second = dir.path().join("second.pdf");
    let config = OverlayConfig::from_env();
    visualize(&pdf, &analysis, &first, &config).await.unwrap();
    visualize(&pdf, &analysis, &second, &config).await.unwrap();

    let (first_paths, _) = read_back(&first);
    let (second_paths, _) = read_back(&second);
    assert_eq!(first_paths.len(), 2);
    assert_eq!(first_paths, second_paths);
}

#[tokio::test]
async fn test_visualize_legacy_report() {
    e2e_skip_unless_enabled!();
    let dir = tempfile::tempdir().unwrap();
    let pdf = dir.path().join("blank.pdf");
    blank_pdf(&pdf);

    let analysis = dir.path().join("analysis.txt");
    std::fs::write(
        &analysis,
        "
    Analyzing layout from page #1
    Word 'Test' has confidence 0.99 within bounding polygon '[1.0, 1.0], [2.0, 1.0], [2.0, 1.3], [1.0, 1.3]'
    ",
    )
    .unwrap();
    let output = dir.path().join("annotated.pdf");

    let stats = visualize(&pdf, &analysis, &output, &OverlayConfig::from_env())
        .await
        .expect("visualize should succeed");

    assert_eq!(stats.drawn, 1);
    assert!(std::fs::metadata(&output).unwrap().len() > std::fs::metadata(&pdf).unwrap().len());
}

#[tokio::test]
async fn test_visualize_empty_analysis_still_writes_output() {
    e2e_skip_unless_enabled!();
    let dir = tempfile::tempdir().unwrap();
    let pdf = dir.path().join("blank.pdf");
    blank_pdf(&pdf);
    let analysis = dir.path().join("empty.json");
    std::fs::write(&analysis, r#"{"pages": [], "tables": [], "has_handwritten_content": false}"#)
        .unwrap();
    let output = dir.path().join("annotated.pdf");

    let stats = visualize(&pdf, &analysis, &output, &OverlayConfig::from_env())
        .await
        .expect("visualize should succeed");

    assert_eq!(stats.drawn, 0);
    assert!(output.exists());
}

// ── Live service ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_check_credentials() {
    let config = e2e_skip_unless_credentials!();
    let check = verify_credentials(&config).await;
    assert!(check.ok, "credential check failed: {}", check.message);
}

#[tokio::test]
async fn test_bad_key_is_rejected() {
    let mut config = e2e_skip_unless_credentials!();
    config.api_key = Some("00000000000000000000000000000000".into());
    let check = verify_credentials(&config).await;
    assert!(!check.ok);
    println!("{}", check.message);
}

#[tokio::test]
async fn test_analyze_and_visualize_sample() {
    let config = e2e_skip_unless_credentials!();
    let Some(sample) = sample_document() else {
        println!("SKIP — sample_documents/sample.pdf not found");
        return;
    };
    let dir = tempfile::tempdir().unwrap();
    let json = dir.path().join("sample.json");

    let analysis = analyze_to_file(sample.to_str().unwrap(), &json, &config)
        .await
        .expect("analysis should succeed");
    assert!(!analysis.pages.is_empty());
    assert!(analysis.pages.iter().all(|p| p.page_number >= 1));

    let output = dir.path().join("sample_annotated.pdf");
    let stats = visualize(&sample, &json, &output, &OverlayConfig::from_env())
        .await
        .expect("visualize should succeed");
    println!("drawn={} skipped={}", stats.drawn, stats.skipped);
    assert!(output.exists());
}
