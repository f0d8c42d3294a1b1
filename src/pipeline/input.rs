//! Input resolution: normalise a user-supplied path or URL into something the
//! layout service can analyse.
//!
//! Local files are read into memory and sent inline (`base64Source`); URLs are
//! forwarded untouched (`urlSource`) so the service fetches them itself and no
//! download happens on this side. The overlay renderer has the opposite need:
//! pdfium opens a path, so [`ensure_pdf`] checks the file up front and turns a
//! missing or non-PDF input into a typed error instead of a pdfium failure.

use crate::error::LayoutError;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::debug;

/// A document ready for submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentSource {
    /// Contents of a local file.
    Bytes { path: PathBuf, data: Vec<u8> },
    /// A publicly reachable document the service downloads itself.
    Url(String),
}

impl DocumentSource {
    /// Human-readable origin, used in logs and progress events.
    pub fn describe(&self) -> String {
        match self {
            DocumentSource::Bytes { path, .. } => path.display().to_string(),
            DocumentSource::Url(url) => url.clone(),
        }
    }
}

/// Check if the input string looks like a URL.
pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// Resolve the input string to a [`DocumentSource`].
///
/// URLs are validated for shape only. Local paths must exist and be readable.
pub async fn resolve_input(input: &str) -> Result<DocumentSource, LayoutError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(LayoutError::InvalidInput {
            input: input.to_string(),
        });
    }

    if is_url(trimmed) {
        return match reqwest::Url::parse(trimmed) {
            Ok(url) if url.host_str().is_some() => Ok(DocumentSource::Url(trimmed.to_string())),
            _ => Err(LayoutError::InvalidInput {
                input: input.to_string(),
            }),
        };
    }

    let path = PathBuf::from(trimmed);
    if !path.is_file() {
        return Err(LayoutError::FileNotFound { path });
    }

    let data = tokio::fs::read(&path).await.map_err(|e| match e.kind() {
        std::io::ErrorKind::PermissionDenied => LayoutError::PermissionDenied {
            path: path.clone(),
        },
        _ => LayoutError::FileNotFound { path: path.clone() },
    })?;

    debug!("Read {} bytes from {}", data.len(), path.display());
    Ok(DocumentSource::Bytes { path, data })
}

/// Validate that `path` is an existing, readable PDF (by magic bytes).
pub fn ensure_pdf(path: &Path) -> Result<(), LayoutError> {
    if !path.is_file() {
        return Err(LayoutError::FileNotFound {
            path: path.to_path_buf(),
        });
    }

    let mut file = std::fs::File::open(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::PermissionDenied => LayoutError::PermissionDenied {
            path: path.to_path_buf(),
        },
        _ => LayoutError::FileNotFound {
            path: path.to_path_buf(),
        },
    })?;

    let mut magic = [0u8; 4];
    if file.read_exact(&mut magic).is_err() || &magic != b"%PDF" {
        return Err(LayoutError::NotAPdf {
            path: path.to_path_buf(),
            magic,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_is_url() {
        assert!(is_url("https://example.com/doc.pdf"));
        assert!(is_url("http://example.com/doc.pdf"));
        assert!(!is_url("/tmp/doc.pdf"));
        assert!(!is_url("doc.pdf"));
        assert!(!is_url(""));
    }

    #[tokio::test]
    async fn url_is_passed_through() {
        let src = resolve_input("https://example.com/a.pdf").await.unwrap();
        assert_eq!(src, DocumentSource::Url("https://example.com/a.pdf".into()));
        assert_eq!(src.describe(), "https://example.com/a.pdf");
    }

    #[tokio::test]
    async fn url_without_host_is_invalid() {
        let err = resolve_input("https://").await.unwrap_err();
        assert!(matches!(err, LayoutError::InvalidInput { .. }));
    }

    #[tokio::test]
    async fn empty_input_is_invalid() {
        let err = resolve_input("   ").await.unwrap_err();
        assert!(matches!(err, LayoutError::InvalidInput { .. }));
    }

    #[tokio::test]
    async fn missing_file_is_not_found() {
        let err = resolve_input("/definitely/not/here.pdf").await.unwrap_err();
        assert!(matches!(err, LayoutError::FileNotFound { .. }));
    }

    #[tokio::test]
    async fn local_file_is_read() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"%PDF-1.4 hello").unwrap();
        let src = resolve_input(file.path().to_str().unwrap()).await.unwrap();
        match src {
            DocumentSource::Bytes { data, .. } => assert_eq!(data, b"%PDF-1.4 hello"),
            other => panic!("unexpected source: {other:?}"),
        }
    }

    #[test]
    fn ensure_pdf_checks_magic() {
        let mut pdf = tempfile::NamedTempFile::new().unwrap();
        pdf.write_all(b"%PDF-1.7\n").unwrap();
        assert!(ensure_pdf(pdf.path()).is_ok());

        let mut png = tempfile::NamedTempFile::new().unwrap();
        png.write_all(b"\x89PNG\r\n").unwrap();
        let err = ensure_pdf(png.path()).unwrap_err();
        match err {
            LayoutError::NotAPdf { magic, .. } => assert_eq!(&magic, b"\x89PNG"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn ensure_pdf_missing_file() {
        let err = ensure_pdf(Path::new("/no/such/file.pdf")).unwrap_err();
        assert!(matches!(err, LayoutError::FileNotFound { .. }));
    }
}
