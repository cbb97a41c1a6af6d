//! Text extraction for source documents.
//!
//! Two content types are accepted: `application/pdf` (via `pdf-extract`)
//! and `text/plain` (UTF-8 passthrough). The content type is chosen from
//! the file extension. Extraction never panics; failures come back as an
//! [`ExtractError`] and the caller skips the file.

use std::path::Path;

use thiserror::Error;

pub const MIME_PDF: &str = "application/pdf";
pub const MIME_TEXT: &str = "text/plain";

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("unsupported content-type: {0}")]
    UnsupportedContentType(String),
    #[error("PDF extraction failed: {0}")]
    Pdf(String),
    #[error("text is not valid UTF-8: {0}")]
    Encoding(#[from] std::string::FromUtf8Error),
    #[error("no text could be extracted")]
    Empty,
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Text pulled out of one file, ready for chunking.
#[derive(Debug, Clone)]
pub struct ExtractedDocument {
    /// File name without directories; the document's identity in the store.
    pub source_name: String,
    pub content_type: &'static str,
    pub text: String,
}

/// Content type for a path, by extension (case-insensitive).
pub fn content_type_for_path(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "pdf" => Some(MIME_PDF),
        "txt" | "text" | "md" => Some(MIME_TEXT),
        _ => None,
    }
}

/// Extract plain text from `bytes`. Whitespace-only results are an
/// [`ExtractError::Empty`].
pub fn extract_text(bytes: &[u8], content_type: &str) -> Result<String, ExtractError> {
    let text = match content_type {
        MIME_PDF => extract_pdf(bytes)?,
        MIME_TEXT => String::from_utf8(bytes.to_vec())?,
        _ => {
            return Err(ExtractError::UnsupportedContentType(
                content_type.to_string(),
            ))
        }
    };
    if text.trim().is_empty() {
        return Err(ExtractError::Empty);
    }
    Ok(text)
}

fn extract_pdf(bytes: &[u8]) -> Result<String, ExtractError> {
    pdf_extract::extract_text_from_mem(bytes).map_err(|e| ExtractError::Pdf(e.to_string()))
}

/// Read and extract a file from disk.
pub fn read_document(path: &Path) -> Result<ExtractedDocument, ExtractError> {
    let content_type = content_type_for_path(path).ok_or_else(|| {
        ExtractError::UnsupportedContentType(format!(
            "unknown file extension for {}",
            path.display()
        ))
    })?;
    let bytes = std::fs::read(path).map_err(|source| ExtractError::Io {
        path: path.display().to_string(),
        source,
    })?;
    let text = extract_text(&bytes, content_type)?;

    Ok(ExtractedDocument {
        source_name: source_name_for(path),
        content_type,
        text,
    })
}

/// The identifier a file is stored under: its file name.
pub fn source_name_for(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
