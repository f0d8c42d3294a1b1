//! # edgequake-layout
//!
//! Analyze document layout with Azure Document Intelligence (`prebuilt-layout`),
//! normalize the result into a flat JSON schema, and draw the detected
//! geometry back onto the source PDF.
//!
//! ## Pipeline Overview
//!
//! ```text
//! document (path or URL)
//!  │
//!  ├─ 1. Input    read local bytes, or pass the URL through
//!  ├─ 2. Service  one analyze operation: submit, then poll until done
//!  ├─ 3. Shape    normalize polygons, enforce mandatory fields
//!  └─ 4. Persist  Analysis Document JSON (or the legacy text report)
//!
//! PDF + Analysis Document
//!  │
//!  ├─ 5. Plan     first-page shapes in fixed z-order and colors
//!  └─ 6. Render   semi-transparent outlines via pdfium → annotated copy
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use edgequake_layout::{analyze_to_file, visualize, OverlayConfig, ServiceConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Endpoint and key from AZURE_DOCUMENT_INTELLIGENCE_ENDPOINT / _KEY
//!     let config = ServiceConfig::from_env();
//!     let analysis = analyze_to_file("invoice.pdf", "out/invoice.json", &config).await?;
//!     eprintln!("{} pages, {} words", analysis.pages.len(), analysis.word_count());
//!
//!     let stats = visualize(
//!         "invoice.pdf",
//!         "out/invoice.json",
//!         "out/invoice_annotated.pdf",
//!         &OverlayConfig::from_env(),
//!     )
//!     .await?;
//!     eprintln!("drew {} shapes", stats.drawn);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `doclayout` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! edgequake-layout = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod analyze;
pub mod config;
pub mod credentials;
pub mod error;
pub mod geometry;
pub mod model;
pub mod pipeline;
pub mod progress;
pub mod report;
pub mod visualize;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use analyze::{
    analyze, analyze_bytes, analyze_sync, analyze_to_file, analyze_to_file_sync,
    analyze_to_report, resolve_service,
};
pub use config::{OverlayConfig, OverlayConfigBuilder, ServiceConfig, ServiceConfigBuilder};
pub use credentials::{verify_credentials, verify_credentials_sync, CredentialCheck};
pub use error::{LayoutError, ShapeError};
pub use geometry::{Point, Polygon};
pub use model::{AnalysisDocument, Page, Table};
pub use pipeline::input::DocumentSource;
pub use pipeline::overlay::{ElementCategory, OverlayPlan, OverlayStats};
pub use pipeline::service::{DocumentIntelligenceClient, LayoutService};
pub use pipeline::wire::AnalyzeResult;
pub use progress::{AnalysisProgressCallback, NoopProgressCallback, ProgressCallback};
pub use report::load_analysis;
pub use visualize::{default_output_path, visualize, visualize_analysis, visualize_sync};
