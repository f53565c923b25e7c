//! PDF text extraction with `pdf-extract`.
//!
//! Parsing is CPU-bound and the parser may panic on malformed input, so it
//! runs on the blocking pool and a panic surfaces as a `Validation` error
//! instead of taking the worker down.

use async_trait::async_trait;
use docqa_core::extract::{Extraction, PdfExtractor};
use docqa_core::{Error, Result};

/// Content types accepted for upload.
pub const MIME_PDF: &str = "application/pdf";
pub const MIME_X_PDF: &str = "application/x-pdf";

pub const MAX_PAGES_LIMIT: usize = 200;

pub fn is_pdf_content_type(content_type: &str) -> bool {
    let essence = content_type.split(';').next().unwrap_or("").trim();
    essence.eq_ignore_ascii_case(MIME_PDF) || essence.eq_ignore_ascii_case(MIME_X_PDF)
}

#[derive(Debug, Default, Clone, Copy)]
pub struct PdfExtractExtractor;

#[async_trait]
impl PdfExtractor for PdfExtractExtractor {
    async fn extract(&self, bytes: &[u8], max_pages: usize) -> Result<Extraction> {
        let bytes = bytes.to_vec();
        let pages = tokio::task::spawn_blocking(move || {
            pdf_extract::extract_text_from_mem_by_pages(&bytes)
        })
        .await
        .map_err(|e| Error::validation(format!("could not read PDF: parser crashed ({})", e)))?
        .map_err(|e| Error::validation(format!("could not read PDF: {}", e)))?;

        Ok(join_pages(&pages, max_pages))
    }
}

/// Keep the first `max_pages` pages, drop NULs and blank pages, join with
/// blank lines.
pub fn join_pages(pages: &[String], max_pages: usize) -> Extraction {
    let taken = pages.len().min(max_pages);
    let text = pages[..taken]
        .iter()
        .map(|p| p.replace('\0', ""))
        .map(|p| p.trim().to_string())
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join("\n\n");
    Extraction {
        text,
        pages_processed: taken,
    }
}
