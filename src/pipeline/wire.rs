//! Typed view of the layout service's JSON.
//!
//! Mirrors the `analyzeResult` object of the Document Intelligence REST API
//! (camelCase keys). Every collection and most scalars are optional on the
//! wire; [`crate::pipeline::shape`] decides which absences are acceptable and
//! which are structural errors. Unknown keys are ignored so newer API
//! versions keep decoding.

use crate::model::{LengthUnit, SelectionState};
use serde::{Deserialize, Serialize};

/// Status document returned by `GET <Operation-Location>`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeOperation {
    pub status: OperationStatus,
    #[serde(default)]
    pub analyze_result: Option<AnalyzeResult>,
    #[serde(default)]
    pub error: Option<ServiceError>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum OperationStatus {
    NotStarted,
    Running,
    Succeeded,
    Failed,
    Canceled,
    Skipped,
    #[serde(other)]
    Unknown,
}

impl OperationStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, OperationStatus::NotStarted | OperationStatus::Running)
    }
}

/// Error body, both inside a failed operation and at the top level of a
/// non-2xx response (`{"error": {...}}`).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ServiceError {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub innererror: Option<Box<ServiceError>>,
}

impl ServiceError {
    /// The innermost code, which is the most specific one.
    pub fn detailed_code(&self) -> &str {
        match &self.innererror {
            Some(inner) if !inner.code.is_empty() => inner.detailed_code(),
            _ => &self.code,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ErrorEnvelope {
    pub error: ServiceError,
}

/// Body of the analyze request.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base64_source: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url_source: Option<String>,
}

/// The analysis result proper.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeResult {
    #[serde(default)]
    pub api_version: Option<String>,
    #[serde(default)]
    pub model_id: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub pages: Vec<WirePage>,
    #[serde(default)]
    pub paragraphs: Option<Vec<WireParagraph>>,
    #[serde(default)]
    pub tables: Option<Vec<WireTable>>,
    #[serde(default)]
    pub styles: Option<Vec<WireStyle>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WirePage {
    pub page_number: u32,
    #[serde(default)]
    pub angle: Option<f64>,
    #[serde(default)]
    pub width: Option<f64>,
    #[serde(default)]
    pub height: Option<f64>,
    #[serde(default)]
    pub unit: Option<LengthUnit>,
    #[serde(default)]
    pub words: Option<Vec<WireWord>>,
    #[serde(default)]
    pub lines: Option<Vec<WireLine>>,
    #[serde(default)]
    pub selection_marks: Option<Vec<WireSelectionMark>>,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct WireSpan {
    pub offset: u32,
    pub length: u32,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct WireWord {
    pub content: String,
    #[serde(default)]
    pub polygon: Option<Vec<f64>>,
    #[serde(default)]
    pub confidence: Option<f64>,
    #[serde(default)]
    pub span: Option<WireSpan>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct WireLine {
    pub content: String,
    #[serde(default)]
    pub polygon: Option<Vec<f64>>,
    #[serde(default)]
    pub spans: Option<Vec<WireSpan>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WireSelectionMark {
    pub state: SelectionState,
    #[serde(default)]
    pub polygon: Option<Vec<f64>>,
    #[serde(default)]
    pub confidence: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireBoundingRegion {
    pub page_number: u32,
    #[serde(default)]
    pub polygon: Option<Vec<f64>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireParagraph {
    #[serde(default)]
    pub role: Option<String>,
    pub content: String,
    #[serde(default)]
    pub bounding_regions: Option<Vec<WireBoundingRegion>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireTable {
    pub row_count: u32,
    pub column_count: u32,
    #[serde(default)]
    pub cells: Vec<WireCell>,
    #[serde(default)]
    pub bounding_regions: Option<Vec<WireBoundingRegion>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireCell {
    #[serde(default)]
    pub kind: Option<String>,
    pub row_index: u32,
    pub column_index: u32,
    #[serde(default)]
    pub row_span: Option<u32>,
    #[serde(default)]
    pub column_span: Option<u32>,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub bounding_regions: Option<Vec<WireBoundingRegion>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireStyle {
    #[serde(default)]
    pub is_handwritten: Option<bool>,
    #[serde(default)]
    pub confidence: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_running_operation_without_result() {
        let op: AnalyzeOperation =
            serde_json::from_str(r#"{"status": "running", "createdDateTime": "x"}"#).unwrap();
        assert_eq!(op.status, OperationStatus::Running);
        assert!(!op.status.is_terminal());
        assert!(op.analyze_result.is_none());
    }

    #[test]
    fn unknown_status_is_terminal() {
        let op: AnalyzeOperation = serde_json::from_str(r#"{"status": "exploded"}"#).unwrap();
        assert_eq!(op.status, OperationStatus::Unknown);
        assert!(op.status.is_terminal());
    }

    #[test]
    fn decodes_failed_operation_error() {
        let op: AnalyzeOperation = serde_json::from_str(
            r#"{"status": "failed", "error": {"code": "InvalidRequest", "message": "bad",
                "innererror": {"code": "InvalidContent", "message": "corrupt"}}}"#,
        )
        .unwrap();
        let err = op.error.unwrap();
        assert_eq!(err.code, "InvalidRequest");
        assert_eq!(err.detailed_code(), "InvalidContent");
    }

    #[test]
    fn request_serializes_only_the_given_source() {
        let req = AnalyzeRequest {
            base64_source: Some("AAAA".into()),
            url_source: None,
        };
        assert_eq!(
            serde_json::to_string(&req).unwrap(),
            r#"{"base64Source":"AAAA"}"#
        );
    }

    #[test]
    fn page_collections_are_optional() {
        let page: WirePage = serde_json::from_str(r#"{"pageNumber": 3}"#).unwrap();
        assert_eq!(page.page_number, 3);
        assert!(page.words.is_none() && page.lines.is_none() && page.selection_marks.is_none());
    }
}
