use text_splitter::{ChunkConfig, TextSplitter};
use tracing::debug;

use common::error::AppError;

use crate::segmenter::{combine_pages, Page, Section};

/// Upper bound for a single chunk; whole sections at or below this size are
/// kept intact.
pub const MAX_SECTION_CHARS: usize = 1000;
/// Overlap carried between consecutive pieces of an oversized section.
pub const SECTION_OVERLAP_CHARS: usize = 200;

/// Chunk size for documents without article structure.
pub const FALLBACK_CHUNK_CHARS: usize = 500;
/// Overlap for fallback chunking.
pub const FALLBACK_OVERLAP_CHARS: usize = 50;

pub const FALLBACK_ARTICLE: &str = "unknown";
pub const FALLBACK_SECTION: &str = "fallback";

/// An indexable unit of text ready for embedding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptimizedChunk {
    pub article: String,
    pub section: String,
    pub subchunk_index: usize,
    pub content: String,
    pub page: Option<u32>,
}

/// Turns sections into bounded-size chunks.
///
/// A section whose trimmed text fits within `MAX_SECTION_CHARS` becomes
/// exactly one chunk, keeping the regulatory clause intact. Only longer
/// sections are re-split, with overlap, and their pieces keep the parent
/// section identifiers plus an ordinal sub-chunk index.
pub fn optimize(sections: &[Section]) -> Result<Vec<OptimizedChunk>, AppError> {
    optimize_with_limits(sections, MAX_SECTION_CHARS, SECTION_OVERLAP_CHARS)
}

pub fn optimize_with_limits(
    sections: &[Section],
    max_chars: usize,
    overlap: usize,
) -> Result<Vec<OptimizedChunk>, AppError> {
    let splitter = bounded_splitter(max_chars, overlap)?;

    let mut skipped_empty = 0usize;
    let mut optimized = Vec::new();

    for section in sections {
        let text = section.content.trim();
        if text.is_empty() {
            skipped_empty += 1;
            continue;
        }

        if text.chars().count() <= max_chars {
            optimized.push(OptimizedChunk {
                article: section.article.clone(),
                section: section.section.clone(),
                subchunk_index: 0,
                content: text.to_string(),
                page: section.page,
            });
            continue;
        }

        for (idx, piece) in splitter.chunks(text).enumerate() {
            let piece = piece.trim();
            if piece.is_empty() {
                continue;
            }

            optimized.push(OptimizedChunk {
                article: section.article.clone(),
                section: section.section.clone(),
                subchunk_index: idx,
                content: piece.to_string(),
                page: section.page,
            });
        }
    }

    if skipped_empty > 0 {
        debug!(skipped_empty, "Skipped empty sections during optimization");
    }

    Ok(optimized)
}

/// Chunks a whole document that has no article structure.
///
/// Every piece is tagged with the fallback article/section sentinels and an
/// ordinal sub-chunk index; nothing empty survives.
pub fn fallback_chunks(pages: &[Page]) -> Result<Vec<OptimizedChunk>, AppError> {
    let (buffer, _) = combine_pages(pages);
    let splitter = bounded_splitter(FALLBACK_CHUNK_CHARS, FALLBACK_OVERLAP_CHARS)?;

    let mut chunks = Vec::new();
    for (idx, piece) in splitter.chunks(&buffer).enumerate() {
        let piece = piece.trim();
        if piece.is_empty() {
            continue;
        }

        chunks.push(OptimizedChunk {
            article: FALLBACK_ARTICLE.to_string(),
            section: FALLBACK_SECTION.to_string(),
            subchunk_index: idx,
            content: piece.to_string(),
            page: None,
        });
    }

    Ok(chunks)
}

/// Recursive separator-based splitter: paragraph breaks first, then line
/// breaks, sentences, and finally words, bounded by `max_chars` with
/// `overlap` characters carried between pieces.
fn bounded_splitter(
    max_chars: usize,
    overlap: usize,
) -> Result<TextSplitter<text_splitter::Characters>, AppError> {
    let chunk_config = ChunkConfig::new(max_chars)
        .with_overlap(overlap)
        .map_err(|e| AppError::Validation(format!("invalid chunk overlap: {e}")))?;

    Ok(TextSplitter::new(chunk_config))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn section(id: &str, content: String) -> Section {
        Section {
            article: "ARTICLE B1: Definitions".into(),
            section: id.into(),
            content,
            page: Some(3),
        }
    }

    #[test]
    fn test_short_section_kept_whole() {
        let sections = vec![section(
            "B1.7.3",
            "  Pit lane speed limit is 60 km/h save for conditions in B1.7.4.  ".into(),
        )];

        let chunks = optimize(&sections).expect("optimize");

        assert_eq!(chunks.len(), 1);
        assert_eq!(
            chunks[0].content,
            "Pit lane speed limit is 60 km/h save for conditions in B1.7.4."
        );
        assert_eq!(chunks[0].subchunk_index, 0);
        assert_eq!(chunks[0].page, Some(3));
    }

    #[test]
    fn test_long_section_split_with_bounds() {
        let sentence = "The stewards may impose penalties for any breach of these provisions. ";
        let long_text = sentence.repeat(40);
        let sections = vec![section("B2.1", long_text)];

        let chunks = optimize(&sections).expect("optimize");

        assert!(chunks.len() >= 2);
        for chunk in &chunks {
            assert!(chunk.content.chars().count() <= MAX_SECTION_CHARS);
            assert!(!chunk.content.trim().is_empty());
            assert_eq!(chunk.section, "B2.1");
        }
        let indexes: Vec<usize> = chunks.iter().map(|c| c.subchunk_index).collect();
        assert_eq!(indexes[0], 0);
        assert!(indexes.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_empty_sections_skipped() {
        let sections = vec![section("B3.9", "   \n  ".into())];
        let chunks = optimize(&sections).expect("optimize");
        assert!(chunks.is_empty());
    }

    #[test]
    fn test_fallback_chunks_tagged_and_nonempty() {
        let paragraph = "Technical regulations describe bodywork dimensions in detail. ";
        let pages = vec![
            Page {
                number: 1,
                content: paragraph.repeat(20),
            },
            Page {
                number: 2,
                content: paragraph.repeat(20),
            },
        ];

        let chunks = fallback_chunks(&pages).expect("fallback");

        assert!(chunks.len() >= 2);
        for chunk in &chunks {
            assert_eq!(chunk.article, FALLBACK_ARTICLE);
            assert_eq!(chunk.section, FALLBACK_SECTION);
            assert!(!chunk.content.trim().is_empty());
            assert!(chunk.content.chars().count() <= FALLBACK_CHUNK_CHARS);
        }
    }

    #[test]
    fn test_fallback_chunks_empty_pages() {
        let pages = vec![Page {
            number: 1,
            content: String::new(),
        }];
        let chunks = fallback_chunks(&pages).expect("fallback");
        assert!(chunks.is_empty());
    }
}
