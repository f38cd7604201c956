use std::path::Path;

use lopdf::Document;
use tracing::{debug, warn};

use common::error::AppError;

use crate::segmenter::Page;

/// Loads a PDF as an ordered sequence of pages with their text layers.
///
/// Parsing runs off the async executor. Pages whose text layer cannot be
/// decoded come back empty rather than failing the document; when no page
/// yields any text at all, a whole-document extraction pass is tried before
/// giving up.
pub async fn load_pdf_pages(path: &Path) -> Result<Vec<Page>, AppError> {
    let pdf_bytes = tokio::fs::read(path).await?;

    let pages = tokio::task::spawn_blocking(move || -> Result<Vec<Page>, AppError> {
        let document = Document::load_mem(&pdf_bytes)
            .map_err(|e| AppError::Ingestion(format!("Failed to parse PDF: {e}")))?;

        let mut page_numbers: Vec<u32> = document.get_pages().keys().copied().collect();
        page_numbers.sort_unstable();

        let mut pages = Vec::with_capacity(page_numbers.len());
        for number in page_numbers {
            let content = match document.extract_text(&[number]) {
                Ok(text) => text,
                Err(e) => {
                    debug!(page = number, error = %e, "Page has no extractable text layer");
                    String::new()
                }
            };
            pages.push(Page { number, content });
        }

        if pages.iter().all(|p| p.content.trim().is_empty()) {
            warn!("No per-page text layer found, falling back to whole-document extraction");
            let text = pdf_extract::extract_text_from_mem(&pdf_bytes)
                .map_err(|e| AppError::Ingestion(format!("Failed to extract text from PDF: {e}")))?;
            if text.trim().is_empty() {
                return Err(AppError::Ingestion(
                    "PDF contains no extractable text".into(),
                ));
            }
            return Ok(vec![Page {
                number: 1,
                content: text,
            }]);
        }

        Ok(pages)
    })
    .await??;

    Ok(pages)
}
