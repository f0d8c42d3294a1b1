//! Progress-callback trait for layout analysis events.
//!
//! Inject an [`Arc<dyn AnalysisProgressCallback>`] via
//! [`crate::config::ServiceConfigBuilder::progress_callback`] to receive
//! events while a document is submitted and the remote operation is polled.
//! The CLI uses it to drive a spinner; library callers can forward the events
//! anywhere.
//!
//! # Example
//!
//! ```rust
//! use edgequake_layout::{AnalysisProgressCallback, ServiceConfig};
//! use std::sync::{Arc, atomic::{AtomicU32, Ordering}};
//!
//! struct PollCounter {
//!     polls: AtomicU32,
//! }
//!
//! impl AnalysisProgressCallback for PollCounter {
//!     fn on_operation_status(&self, attempt: u32, status: &str) {
//!         self.polls.store(attempt, Ordering::SeqCst);
//!         eprintln!("poll {attempt}: {status}");
//!     }
//! }
//!
//! let config = ServiceConfig::builder()
//!     .progress_callback(Arc::new(PollCounter { polls: AtomicU32::new(0) }))
//!     .build()
//!     .unwrap();
//! ```

use std::sync::Arc;

/// Called by the analysis pipeline as a document moves through the service.
///
/// All methods have default no-op implementations so callers only override
/// what they care about.
pub trait AnalysisProgressCallback: Send + Sync {
    /// Called once the input is resolved, just before submission.
    ///
    /// # Arguments
    /// * `source` — the path or URL being analysed
    fn on_analysis_start(&self, source: &str) {
        let _ = source;
    }

    /// Called after each status check of the remote operation.
    ///
    /// # Arguments
    /// * `attempt` — 1-indexed status check number
    /// * `status`  — status reported by the service (`running`, `succeeded`, …)
    fn on_operation_status(&self, attempt: u32, status: &str) {
        let _ = (attempt, status);
    }

    /// Called when the result has been shaped into an Analysis Document.
    ///
    /// # Arguments
    /// * `page_count` — pages in the shaped document
    fn on_analysis_complete(&self, page_count: usize) {
        let _ = page_count;
    }

    /// Called when analysis fails for any reason.
    fn on_analysis_error(&self, error: &str) {
        let _ = error;
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl AnalysisProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::ServiceConfig`].
pub type ProgressCallback = Arc<dyn AnalysisProgressCallback>;
