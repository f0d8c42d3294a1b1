//! Analysis entry points: document in, [`AnalysisDocument`] out.
//!
//! Order of checks is fixed: the service is resolved first (missing
//! credentials fail before anything touches the input or the network), then
//! the input, then exactly one remote analysis, then shaping. Persisting
//! happens only after shaping succeeded, so a failed run never leaves a
//! partial file behind.

use crate::config::ServiceConfig;
use crate::error::LayoutError;
use crate::model::{self, AnalysisDocument};
use crate::pipeline::input::{self, DocumentSource};
use crate::pipeline::service::{DocumentIntelligenceClient, LayoutService};
use crate::pipeline::shape;
use crate::report;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// Analyse a local file or HTTP/HTTPS URL.
///
/// # Errors
/// - [`LayoutError::MissingCredentials`] when no service is configured
/// - [`LayoutError::FileNotFound`] / [`LayoutError::InvalidInput`] for bad input
/// - any service error, unmodified
/// - [`LayoutError::MissingField`] when the result lacks a mandatory field
pub async fn analyze(
    input_str: impl AsRef<str>,
    config: &ServiceConfig,
) -> Result<AnalysisDocument, LayoutError> {
    let input_str = input_str.as_ref();
    info!("Starting analysis: {}", input_str);

    // ── Step 1: Get/create service ───────────────────────────────────────
    let service = resolve_service(config)?;

    // ── Step 2: Resolve input ────────────────────────────────────────────
    let source = input::resolve_input(input_str).await?;

    run(service.as_ref(), &source, config).await
}

/// Analyse a document held in memory.
pub async fn analyze_bytes(
    bytes: &[u8],
    config: &ServiceConfig,
) -> Result<AnalysisDocument, LayoutError> {
    let service = resolve_service(config)?;
    let source = DocumentSource::Bytes {
        path: PathBuf::from("<memory>"),
        data: bytes.to_vec(),
    };
    run(service.as_ref(), &source, config).await
}

/// Analyse a document and write the Analysis Document JSON to `output_path`.
///
/// Parent directories are created; nothing is written if analysis fails.
pub async fn analyze_to_file(
    input_str: impl AsRef<str>,
    output_path: impl AsRef<Path>,
    config: &ServiceConfig,
) -> Result<AnalysisDocument, LayoutError> {
    let analysis = analyze(input_str, config).await?;
    let path = output_path.as_ref();
    model::save_json(&analysis, path)?;
    info!("Analysis written to {}", path.display());
    Ok(analysis)
}

/// Analyse a document and write the legacy text report to `output_path`.
pub async fn analyze_to_report(
    input_str: impl AsRef<str>,
    output_path: impl AsRef<Path>,
    config: &ServiceConfig,
) -> Result<AnalysisDocument, LayoutError> {
    let analysis = analyze(input_str, config).await?;
    let path = output_path.as_ref();
    report::save_report(&analysis, path)?;
    info!("Report written to {}", path.display());
    Ok(analysis)
}

/// Synchronous wrapper around [`analyze`].
///
/// Creates a new tokio runtime internally. Prefer the async API if you
/// already have a runtime.
pub fn analyze_sync(
    input_str: impl AsRef<str>,
    config: &ServiceConfig,
) -> Result<AnalysisDocument, LayoutError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| LayoutError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(analyze(input_str, config))
}

/// Synchronous wrapper around [`analyze_to_file`].
pub fn analyze_to_file_sync(
    input_str: impl AsRef<str>,
    output_path: impl AsRef<Path>,
    config: &ServiceConfig,
) -> Result<AnalysisDocument, LayoutError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| LayoutError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(analyze_to_file(input_str, output_path, config))
}

/// Pick the service: an injected one wins, otherwise build the REST client
/// from endpoint and key.
pub fn resolve_service(config: &ServiceConfig) -> Result<Arc<dyn LayoutService>, LayoutError> {
    if let Some(ref service) = config.service {
        return Ok(Arc::clone(service));
    }
    let client = DocumentIntelligenceClient::new(config)?;
    Ok(Arc::new(client))
}

async fn run(
    service: &dyn LayoutService,
    source: &DocumentSource,
    config: &ServiceConfig,
) -> Result<AnalysisDocument, LayoutError> {
    let start = Instant::now();
    let origin = source.describe();
    if let Some(ref cb) = config.progress_callback {
        cb.on_analysis_start(&origin);
    }

    // ── Step 3: Remote analysis + shaping ────────────────────────────────
    let outcome = service.analyze(source).await.and_then(|result| {
        debug!(
            "{} returned {} pages (model {:?})",
            service.name(),
            result.pages.len(),
            result.model_id
        );
        shape::shape_result(&result)
    });

    match outcome {
        Ok(analysis) => {
            info!(
                "Analysis complete: {} pages, {} words, {} tables in {}ms",
                analysis.pages.len(),
                analysis.word_count(),
                analysis.tables.len(),
                start.elapsed().as_millis()
            );
            if let Some(ref cb) = config.progress_callback {
                cb.on_analysis_complete(analysis.pages.len());
            }
            Ok(analysis)
        }
        Err(e) => {
            if let Some(ref cb) = config.progress_callback {
                cb.on_analysis_error(&e.to_string());
            }
            Err(e)
        }
    }
}
