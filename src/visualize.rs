//! Overlay entry points: PDF + Analysis Document in, annotated PDF out.
//!
//! Only the persisted schema is needed here. The analysis file may be the
//! JSON written by [`crate::analyze::analyze_to_file`] or a legacy text
//! report; see [`crate::report::load_analysis`].

use crate::config::OverlayConfig;
use crate::error::LayoutError;
use crate::model::AnalysisDocument;
use crate::pipeline::input::ensure_pdf;
use crate::pipeline::overlay::{plan_first_page, OverlayStats};
use crate::pipeline::render;
use crate::report::load_analysis;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Draw the first page's layout from `analysis_path` onto a copy of
/// `pdf_path`, saved at `output_path`.
///
/// The input PDF is never modified.
pub async fn visualize(
    pdf_path: impl AsRef<Path>,
    analysis_path: impl AsRef<Path>,
    output_path: impl AsRef<Path>,
    config: &OverlayConfig,
) -> Result<OverlayStats, LayoutError> {
    let pdf_path = pdf_path.as_ref();
    let analysis_path = analysis_path.as_ref();

    if !pdf_path.exists() {
        return Err(LayoutError::FileNotFound {
            path: pdf_path.to_path_buf(),
        });
    }
    if !analysis_path.exists() {
        return Err(LayoutError::AnalysisNotFound {
            path: analysis_path.to_path_buf(),
        });
    }

    let analysis = load_analysis(analysis_path)?;
    debug!(
        "Loaded analysis {}: {} pages",
        analysis_path.display(),
        analysis.pages.len()
    );
    visualize_analysis(pdf_path, &analysis, output_path, config).await
}

/// Like [`visualize`], with an Analysis Document already in memory.
pub async fn visualize_analysis(
    pdf_path: impl AsRef<Path>,
    analysis: &AnalysisDocument,
    output_path: impl AsRef<Path>,
    config: &OverlayConfig,
) -> Result<OverlayStats, LayoutError> {
    let pdf_path = pdf_path.as_ref();
    let output_path = output_path.as_ref();

    ensure_pdf(pdf_path)?;
    if same_file(pdf_path, output_path) {
        return Err(LayoutError::OutputIsInput {
            path: output_path.to_path_buf(),
        });
    }

    let plan = plan_first_page(analysis);
    info!(
        "Overlay plan for page {}: {} shapes, {} skipped",
        plan.page_number,
        plan.shapes.len(),
        plan.skipped
    );

    let stats = render::render_overlay(pdf_path, output_path, plan, config).await?;
    info!(
        "Annotated PDF written to {} ({} drawn, {} failed)",
        output_path.display(),
        stats.drawn,
        stats.failures.len()
    );
    Ok(stats)
}

/// Synchronous wrapper around [`visualize`].
pub fn visualize_sync(
    pdf_path: impl AsRef<Path>,
    analysis_path: impl AsRef<Path>,
    output_path: impl AsRef<Path>,
    config: &OverlayConfig,
) -> Result<OverlayStats, LayoutError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| LayoutError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(visualize(pdf_path, analysis_path, output_path, config))
}

/// `<dir>/<stem>_annotated.pdf` next to the input.
pub fn default_output_path(pdf_path: &Path) -> PathBuf {
    let stem = pdf_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "document".to_string());
    pdf_path.with_file_name(format!("{stem}_annotated.pdf"))
}

/// True when both paths name the same file. `b` need not exist yet.
fn same_file(a: &Path, b: &Path) -> bool {
    let Ok(a) = a.canonicalize() else {
        return false;
    };
    if let Ok(b) = b.canonicalize() {
        return a == b;
    }
    match (b.parent(), b.file_name()) {
        (Some(parent), Some(name)) => {
            let parent = if parent.as_os_str().is_empty() {
                Path::new(".")
            } else {
                parent
            };
            parent
                .canonicalize()
                .map(|p| p.join(name) == a)
                .unwrap_or(false)
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_output_sits_next_to_input() {
        assert_eq!(
            default_output_path(Path::new("/tmp/docs/report.pdf")),
            PathBuf::from("/tmp/docs/report_annotated.pdf")
        );
        assert_eq!(
            default_output_path(Path::new("scan.PDF")),
            PathBuf::from("scan_annotated.pdf")
        );
    }

    #[test]
    fn same_file_detects_aliases() {
        let dir = tempfile::tempdir().unwrap();
        let pdf = dir.path().join("in.pdf");
        std::fs::write(&pdf, b"%PDF-1.4").unwrap();

        assert!(same_file(&pdf, &pdf));
        assert!(same_file(&pdf, &dir.path().join(".").join("in.pdf")));
        assert!(!same_file(&pdf, &dir.path().join("out.pdf")));
        assert!(!same_file(&dir.path().join("missing.pdf"), &pdf));
    }

    #[tokio::test]
    async fn rejects_output_equal_to_input() {
        let dir = tempfile::tempdir().unwrap();
        let pdf = dir.path().join("in.pdf");
        std::fs::write(&pdf, b"%PDF-1.4\n").unwrap();

        let err = visualize_analysis(
            &pdf,
            &AnalysisDocument::default(),
            &pdf,
            &OverlayConfig::default(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, LayoutError::OutputIsInput { .. }));
        assert_eq!(std::fs::read(&pdf).unwrap(), b"%PDF-1.4\n");
    }

    #[tokio::test]
    async fn missing_pdf_is_reported_before_missing_analysis() {
        let err = visualize(
            "/no/such.pdf",
            "/no/such.json",
            "/tmp/out.pdf",
            &OverlayConfig::default(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, LayoutError::FileNotFound { .. }));
    }

    #[tokio::test]
    async fn missing_analysis_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let pdf = dir.path().join("in.pdf");
        std::fs::write(&pdf, b"%PDF-1.4\n").unwrap();

        let err = visualize(
            &pdf,
            dir.path().join("none.json"),
            dir.path().join("o.pdf"),
            &OverlayConfig::default(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, LayoutError::AnalysisNotFound { .. }));
        assert!(!dir.path().join("o.pdf").exists());
    }
}
