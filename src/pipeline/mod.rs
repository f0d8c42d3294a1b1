//! Pipeline stages for layout analysis and overlay rendering.
//!
//! Each submodule implements exactly one transformation step.
//!
//! ## Data Flow
//!
//! ```text
//! analysis:  input ──▶ encode ──▶ service ──▶ wire ──▶ shape ──▶ AnalysisDocument
//!            (path/URL) (base64)   (REST)     (serde)  (normalize)
//!
//! overlay:   AnalysisDocument ──▶ overlay ──▶ render ──▶ annotated PDF
//!                                 (plan)      (pdfium)
//! ```
//!
//! 1. [`input`]   — turn the user-supplied path or URL into a [`input::DocumentSource`]
//! 2. [`encode`]  — base64-wrap local bytes for the request body
//! 3. [`service`] — submit and poll the remote operation; the only stage with
//!    network I/O
//! 4. [`wire`]    — typed view of the service JSON
//! 5. [`shape`]   — normalize polygons and enforce mandatory fields
//! 6. [`overlay`] — pure drawing plan for the first page: colors, z-order,
//!    skipped geometry
//! 7. [`render`]  — paint the plan with pdfium; runs in `spawn_blocking`
//!    because pdfium is not async-safe

pub mod encode;
pub mod input;
pub mod overlay;
pub mod render;
pub mod service;
pub mod shape;
pub mod wire;
