//! Overlay rendering: paint an [`OverlayPlan`] onto the first page via pdfium.
//!
//! ## Why spawn_blocking?
//!
//! The `pdfium-render` crate wraps the pdfium C++ library, which uses
//! thread-local state internally and is not safe to call from async contexts.
//! [`render_overlay`] moves the work onto tokio's blocking pool so the async
//! workers never stall on pdfium.
//!
//! ## Coordinates
//!
//! Plan paths are device points with a top-left origin. PDF user space has a
//! bottom-left origin, so every y is flipped against the fixed canvas height:
//! `y_pdf = 792 - y`.
//!
//! The annotated copy is saved even when some shapes failed to draw; only
//! failures to open the source or write the output are fatal.

use crate::config::OverlayConfig;
use crate::error::LayoutError;
use crate::geometry::CANVAS_HEIGHT_PT;
use crate::model::write_atomic;
use crate::pipeline::overlay::{
    paint, OverlayCanvas, OverlayPlan, OverlayShape, OverlayStats, FILL_OPACITY, STROKE_WIDTH,
};
use pdfium_render::prelude::*;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Bind to a pdfium library.
///
/// `lib_path` may name the library file or the directory containing it.
/// Without it, the working directory is tried first, then the system
/// library search path.
pub fn bind_pdfium(lib_path: Option<&Path>) -> Result<Pdfium, LayoutError> {
    let bindings = match lib_path {
        Some(path) if path.is_dir() => {
            Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path(path))
        }
        Some(path) => Pdfium::bind_to_library(path),
        None => Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
            .or_else(|_| Pdfium::bind_to_system_library()),
    }
    .map_err(|e| LayoutError::PdfiumBindingFailed(format!("{:?}", e)))?;

    Ok(Pdfium::new(bindings))
}

/// Paint `plan` onto the first page of `pdf_path` and save the result to
/// `output_path`.
pub async fn render_overlay(
    pdf_path: &Path,
    output_path: &Path,
    plan: OverlayPlan,
    config: &OverlayConfig,
) -> Result<OverlayStats, LayoutError> {
    let input = pdf_path.to_path_buf();
    let output = output_path.to_path_buf();
    let config = config.clone();

    tokio::task::spawn_blocking(move || render_overlay_blocking(&input, &output, &plan, &config))
        .await
        .map_err(|e| LayoutError::Internal(format!("Render task panicked: {}", e)))?
}

/// Blocking implementation of overlay rendering.
pub fn render_overlay_blocking(
    pdf_path: &Path,
    output_path: &Path,
    plan: &OverlayPlan,
    config: &OverlayConfig,
) -> Result<OverlayStats, LayoutError> {
    let pdfium = bind_pdfium(config.pdfium_lib_path.as_deref())?;

    let document = pdfium
        .load_pdf_from_file(pdf_path, config.password.as_deref())
        .map_err(|e| corrupt(pdf_path, e))?;

    let total_pages = document.pages().len() as usize;
    info!("PDF loaded: {} pages", total_pages);

    let stats = {
        let mut page = document
            .pages()
            .get(0)
            .map_err(|e| LayoutError::PageUnavailable {
                page: 1,
                detail: format!("{:?}", e),
            })?;
        // Each added path is written into the page content before the next one.
        page.set_content_regeneration_strategy(
            PdfPageContentRegenerationStrategy::AutomaticOnEveryChange,
        );

        let mut canvas = PdfiumCanvas {
            document: &document,
            page: &mut page,
        };
        paint(plan, &mut canvas)
    };

    if !stats.failures.is_empty() {
        warn!(
            "{} of {} shapes failed to draw; saving what was drawn",
            stats.failures.len(),
            plan.shapes.len()
        );
    }

    let bytes = document
        .save_to_bytes()
        .map_err(|e| LayoutError::Serialize(format!("PDF save: {:?}", e)))?;
    write_atomic(output_path, &bytes, "pdf.tmp")?;

    debug!(
        "Wrote {} bytes to {} ({} drawn, {} skipped)",
        bytes.len(),
        output_path.display(),
        stats.drawn,
        stats.skipped
    );
    Ok(stats)
}

fn corrupt(path: &Path, e: PdfiumError) -> LayoutError {
    LayoutError::CorruptPdf {
        path: PathBuf::from(path),
        detail: format!("{:?}", e),
    }
}

/// Fill alpha as the 0–255 channel value pdfium expects.
pub fn fill_alpha() -> u8 {
    (FILL_OPACITY * 255.0).round() as u8
}

/// Flip a top-left-origin y onto PDF user space.
pub fn flip_y(y: f64) -> f64 {
    CANVAS_HEIGHT_PT - y
}

/// [`OverlayCanvas`] backed by one pdfium page.
struct PdfiumCanvas<'a, 'p> {
    document: &'p PdfDocument<'a>,
    page: &'p mut PdfPage<'a>,
}

impl OverlayCanvas for PdfiumCanvas<'_, '_> {
    fn draw_shape(&mut self, shape: &OverlayShape) -> Result<(), String> {
        let [r, g, b] = shape.color.to_u8();
        let (first, rest) = shape
            .path
            .split_first()
            .ok_or_else(|| "empty path".to_string())?;

        let mut path = PdfPagePathObject::new(
            self.document,
            PdfPoints::new(first.x as f32),
            PdfPoints::new(flip_y(first.y) as f32),
            Some(PdfColor::new(r, g, b, 255)),
            Some(PdfPoints::new(STROKE_WIDTH as f32)),
            Some(PdfColor::new(r, g, b, fill_alpha())),
        )
        .map_err(|e| format!("{:?}", e))?;

        for point in rest {
            path.line_to(PdfPoints::new(point.x as f32), PdfPoints::new(flip_y(point.y) as f32))
                .map_err(|e| format!("{:?}", e))?;
        }
        path.close_path().map_err(|e| format!("{:?}", e))?;

        self.page
            .objects_mut()
            .add_path_object(path)
            .map_err(|e| format!("{:?}", e))?;
        Ok(())
    }
}
