//! Input resolution: turn a user-supplied path or URL into a [`Document`].
//!
//! Every stage works on the in-memory buffer, so a URL is downloaded straight
//! into memory and a local file is read whole. The `%PDF` magic is checked
//! here so callers get a meaningful error instead of a PDFium parse failure.

use crate::error::AnalyzerError;
use crate::output::Document;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

/// Check if the input string looks like a URL.
pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// Load the input (local file or HTTP/HTTPS URL) as a PDF document.
pub async fn resolve_input(input: &str, timeout_secs: u64) -> Result<Document, AnalyzerError> {
    if input.trim().is_empty() {
        return Err(AnalyzerError::InvalidInput {
            input: input.to_string(),
        });
    }

    let document = if is_url(input) {
        download_url(input, timeout_secs).await?
    } else {
        read_local(Path::new(input)).await?
    };

    ensure_pdf(input, document)
}

/// Reject buffers that do not start with `%PDF`.
pub fn ensure_pdf(input: &str, document: Document) -> Result<Document, AnalyzerError> {
    if document.has_pdf_magic() {
        return Ok(document);
    }
    let magic = document.as_bytes().iter().take(4).copied().collect();
    Err(AnalyzerError::NotAPdf {
        input: input.to_string(),
        magic,
    })
}

async fn read_local(path: &Path) -> Result<Document, AnalyzerError> {
    let bytes = tokio::fs::read(path).await.map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => AnalyzerError::FileNotFound {
            path: path.display().to_string(),
        },
        _ => AnalyzerError::Internal(format!("Failed to read '{}': {e}", path.display())),
    })?;
    debug!(bytes = bytes.len(), "Read local PDF: {}", path.display());
    Ok(Document::from(bytes))
}

async fn download_url(url: &str, timeout_secs: u64) -> Result<Document, AnalyzerError> {
    info!("Downloading PDF from: {}", url);
    let failed = |reason: String| AnalyzerError::DownloadFailed {
        url: url.to_string(),
        reason,
    };

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| failed(e.to_string()))?;

    let response = client.get(url).send().await.map_err(|e| {
        if e.is_timeout() {
            failed(format!("timed out after {timeout_secs}s"))
        } else {
            failed(e.to_string())
        }
    })?;

    if !response.status().is_success() {
        return Err(failed(format!("HTTP {}", response.status())));
    }

    let bytes = response.bytes().await.map_err(|e| failed(e.to_string()))?;
    info!(bytes = bytes.len(), "Downloaded PDF");
    Ok(Document::from(bytes.to_vec()))
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
    async fn reads_local_pdf() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"%PDF-1.4\n%%EOF\n").unwrap();
        let path = file.path().to_str().unwrap().to_string();

        let doc = resolve_input(&path, 5).await.unwrap();
        assert_eq!(doc.len(), 15);
    }

    #[tokio::test]
    async fn rejects_non_pdf() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"PK\x03\x04zip").unwrap();
        let path = file.path().to_str().unwrap().to_string();

        match resolve_input(&path, 5).await {
            Err(AnalyzerError::NotAPdf { magic, .. }) => assert_eq!(magic, b"PK\x03\x04"),
            other => panic!("expected NotAPdf, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn missing_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.pdf");
        let err = resolve_input(path.to_str().unwrap(), 5).await.unwrap_err();
        assert!(matches!(err, AnalyzerError::FileNotFound { .. }));
    }

    #[tokio::test]
    async fn blank_input_is_invalid() {
        let err = resolve_input("  ", 5).await.unwrap_err();
        assert!(matches!(err, AnalyzerError::InvalidInput { .. }));
    }
}
