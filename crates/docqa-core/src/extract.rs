//! PDF text extraction contract.

use async_trait::async_trait;
use serde::Serialize;

use crate::error::Result;

/// Text pulled out of a PDF.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Extraction {
    pub text: String,
    pub pages_processed: usize,
}

/// Turns PDF bytes into plain text.
///
/// Image-only PDFs are not an error: they yield an empty `text`.
#[async_trait]
pub trait PdfExtractor: Send + Sync {
    /// Read at most `max_pages` pages from the start of the document.
    async fn extract(&self, bytes: &[u8], max_pages: usize) -> Result<Extraction>;
}
