#![allow(clippy::missing_docs_in_private_items)]

pub mod answer;
pub mod retriever;
pub mod router;
pub mod scoring;

use common::storage::types::{table_chunk::TableChunk, text_chunk::TextChunk};

pub use answer::{Answer, AnswerComposer, Citation};
pub use retriever::{CrossStoreRetriever, ScopedRetriever};
pub use router::{route, QueryRoute};

/// The chunk behind a retrieval hit, tagged by content kind.
#[derive(Debug, Clone)]
pub enum DocumentPayload {
    Text(TextChunk),
    Table(TableChunk),
}

/// A chunk returned from similarity search, annotated with the partition it
/// came from.
#[derive(Debug, Clone)]
pub struct RetrievedDocument {
    pub partition: String,
    pub payload: DocumentPayload,
}

impl RetrievedDocument {
    pub fn content(&self) -> &str {
        match &self.payload {
            DocumentPayload::Text(chunk) => &chunk.content,
            DocumentPayload::Table(chunk) => &chunk.content,
        }
    }

    pub fn page(&self) -> Option<u32> {
        match &self.payload {
            DocumentPayload::Text(chunk) => chunk.page,
            DocumentPayload::Table(chunk) => Some(chunk.page),
        }
    }

    pub const fn is_table(&self) -> bool {
        matches!(self.payload, DocumentPayload::Table(_))
    }
}
