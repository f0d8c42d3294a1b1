//! The persisted Analysis Document schema.
//!
//! This is the only contract between the analysis side and the overlay
//! renderer: any producer that writes this JSON can feed
//! [`crate::visualize::visualize`]. Field order in the structs below is the
//! key order in the written file.
//!
//! ```text
//! {
//!   "pages": [ { page_number, width, height, unit, lines, words, selection_marks } ],
//!   "paragraphs": [ { role, content, bounding_regions } ],
//!   "tables": [ { row_count, column_count, cells, bounding_regions } ],
//!   "has_handwritten_content": false
//! }
//! ```

use crate::error::LayoutError;
use crate::geometry::Polygon;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

/// Top-level result of analysing one source document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisDocument {
    pub pages: Vec<Page>,
    /// Paragraphs live at document level; each points back to its page(s)
    /// through `bounding_regions`.
    #[serde(default)]
    pub paragraphs: Vec<Paragraph>,
    #[serde(default)]
    pub tables: Vec<Table>,
    #[serde(default)]
    pub has_handwritten_content: bool,
}

impl AnalysisDocument {
    /// The first page, which is the one the overlay renderer annotates.
    pub fn first_page(&self) -> Option<&Page> {
        self.pages.first()
    }

    /// Total number of words across all pages.
    pub fn word_count(&self) -> usize {
        self.pages.iter().map(|p| p.words.len()).sum()
    }
}

/// Measurement unit of a page's width, height and polygons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LengthUnit {
    /// PDF and TIFF input.
    Inch,
    /// Raster image input.
    Pixel,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Page {
    /// 1-based.
    pub page_number: u32,
    #[serde(default)]
    pub width: Option<f64>,
    #[serde(default)]
    pub height: Option<f64>,
    #[serde(default)]
    pub unit: Option<LengthUnit>,
    #[serde(default)]
    pub lines: Vec<Line>,
    #[serde(default)]
    pub words: Vec<Word>,
    #[serde(default)]
    pub selection_marks: Vec<SelectionMark>,
}

/// Reference into the service's extracted text stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Span {
    pub offset: u32,
    pub length: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Line {
    pub content: String,
    #[serde(default)]
    pub polygon: Polygon,
    #[serde(default)]
    pub spans: Vec<Span>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Word {
    pub content: String,
    /// In `[0, 1]`.
    pub confidence: f64,
    #[serde(default)]
    pub polygon: Polygon,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub span: Option<Span>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SelectionState {
    Selected,
    Unselected,
}

impl SelectionState {
    pub fn as_str(self) -> &'static str {
        match self {
            SelectionState::Selected => "selected",
            SelectionState::Unselected => "unselected",
        }
    }
}

/// A detected checkbox or radio-button-like mark.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectionMark {
    pub state: SelectionState,
    /// In `[0, 1]`.
    pub confidence: f64,
    #[serde(default)]
    pub polygon: Polygon,
}

/// A polygon scoped to one page.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BoundingRegion {
    pub page_number: u32,
    #[serde(default)]
    pub polygon: Polygon,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Paragraph {
    /// Semantic role reported by the service (`title`, `pageHeader`, …).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    pub content: String,
    #[serde(default)]
    pub bounding_regions: Vec<BoundingRegion>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Table {
    pub row_count: u32,
    pub column_count: u32,
    #[serde(default)]
    pub cells: Vec<Cell>,
    #[serde(default)]
    pub bounding_regions: Vec<BoundingRegion>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Cell {
    /// Zero-based; repeats across the rows a spanned cell covers.
    pub row_index: u32,
    pub column_index: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub row_span: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column_span: Option<u32>,
    pub content: String,
    #[serde(default)]
    pub bounding_regions: Vec<BoundingRegion>,
}

/// Serialize `analysis` as indented UTF-8 JSON.
pub fn to_json_pretty(analysis: &AnalysisDocument) -> Result<String, LayoutError> {
    serde_json::to_string_pretty(analysis).map_err(|e| LayoutError::Serialize(e.to_string()))
}

/// Write `analysis` to `path` as indented JSON.
///
/// Missing parent directories are created. The file is written to a sibling
/// temp path and renamed into place so readers never see a partial file.
pub fn save_json(analysis: &AnalysisDocument, path: &Path) -> Result<(), LayoutError> {
    let json = to_json_pretty(analysis)?;
    write_atomic(path, json.as_bytes(), "json.tmp")?;
    debug!("Wrote analysis JSON ({} bytes) to {}", json.len(), path.display());
    Ok(())
}

/// Read a persisted Analysis Document.
pub fn load_json(path: &Path) -> Result<AnalysisDocument, LayoutError> {
    let text = std::fs::read_to_string(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => LayoutError::AnalysisNotFound {
            path: path.to_path_buf(),
        },
        _ => LayoutError::AnalysisParse {
            path: path.to_path_buf(),
            detail: e.to_string(),
        },
    })?;
    from_json_str(&text).map_err(|detail| LayoutError::AnalysisParse {
        path: path.to_path_buf(),
        detail,
    })
}

/// Parse an Analysis Document from JSON text.
pub fn from_json_str(text: &str) -> Result<AnalysisDocument, String> {
    serde_json::from_str(text).map_err(|e| e.to_string())
}

/// Create parent directories, write to `<path>.<tmp_ext>`, rename into place.
pub(crate) fn write_atomic(path: &Path, bytes: &[u8], tmp_ext: &str) -> Result<(), LayoutError> {
    let write_err = |source: std::io::Error| LayoutError::OutputWriteFailed {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(write_err)?;
        }
    }

    let tmp_path = path.with_extension(tmp_ext);
    let written =
        std::fs::write(&tmp_path, bytes).and_then(|()| std::fs::rename(&tmp_path, path));
    if let Err(e) = written {
        let _ = std::fs::remove_file(&tmp_path);
        return Err(write_err(e));
    }
    Ok(())
}
