use std::collections::HashSet;

use crate::RetrievedDocument;

/// Length of the content prefix used as a duplicate signature: the same
/// chunk surfaced by different partitions or query variants collapses to one.
pub const DEDUPE_SIGNATURE_CHARS: usize = 200;

/// Removes near-identical documents, first occurrence wins.
///
/// Identity is the leading `DEDUPE_SIGNATURE_CHARS` of trimmed content; the
/// source partition is deliberately not part of the signature.
pub fn dedupe_documents(documents: Vec<RetrievedDocument>) -> Vec<RetrievedDocument> {
    let mut seen = HashSet::new();
    let mut unique = Vec::new();

    for document in documents {
        let signature = prefix_chars(document.content().trim(), DEDUPE_SIGNATURE_CHARS);
        if seen.insert(signature) {
            unique.push(document);
        }
    }

    unique
}

/// Lexical relevance of a document to a (translated) query: the number of
/// query words appearing as substrings of the content.
///
/// Table documents always score zero; they are capped and included on their
/// own track rather than ranked against prose.
pub fn relevance_score(document: &RetrievedDocument, query: &str) -> usize {
    if document.is_table() {
        return 0;
    }

    let content = document.content().to_lowercase();
    query
        .to_lowercase()
        .split_whitespace()
        .filter(|word| content.contains(*word))
        .count()
}

/// How many query words appear anywhere in the assembled context,
/// case-insensitively. Zero overlap means the question is out-of-corpus.
pub fn word_overlap(query: &str, context: &str) -> usize {
    let context = context.to_lowercase();
    query
        .to_lowercase()
        .split_whitespace()
        .filter(|word| context.contains(*word))
        .count()
}

/// First `n` characters of `text` (character, not byte, counted).
pub fn prefix_chars(text: &str, n: usize) -> String {
    text.chars().take(n).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DocumentPayload;
    use common::storage::types::{table_chunk::TableChunk, text_chunk::TextChunk};

    fn text_doc(partition: &str, content: &str) -> RetrievedDocument {
        RetrievedDocument {
            partition: partition.to_string(),
            payload: DocumentPayload::Text(TextChunk::new(
                "ARTICLE B1".into(),
                "B1.1".into(),
                0,
                content.to_string(),
                Some(1),
                vec![0.0],
            )),
        }
    }

    fn table_doc(partition: &str, content: &str) -> RetrievedDocument {
        RetrievedDocument {
            partition: partition.to_string(),
            payload: DocumentPayload::Table(TableChunk::new(0, 2, content.to_string(), vec![0.0])),
        }
    }

    #[test]
    fn test_dedupe_collapses_same_prefix_across_partitions() {
        let docs = vec![
            text_doc("sporting_text", "Pit lane speed limit is 60 km/h."),
            text_doc("misc_text", "  Pit lane speed limit is 60 km/h.  "),
            text_doc("sporting_text", "Completely different clause."),
        ];

        let unique = dedupe_documents(docs);

        assert_eq!(unique.len(), 2);
        assert_eq!(unique[0].partition, "sporting_text");
    }

    #[test]
    fn test_dedupe_is_idempotent() {
        let docs = vec![
            text_doc("a_text", "First clause body."),
            text_doc("b_text", "First clause body."),
            text_doc("a_text", "Second clause body."),
        ];

        let once = dedupe_documents(docs);
        let contents: Vec<String> = once.iter().map(|d| d.content().to_string()).collect();
        let twice = dedupe_documents(once);

        assert_eq!(
            twice.iter().map(|d| d.content().to_string()).collect::<Vec<_>>(),
            contents
        );
    }

    #[test]
    fn test_relevance_score_counts_query_words() {
        let doc = text_doc("sporting_text", "The pit lane speed limit applies during the race.");

        assert_eq!(relevance_score(&doc, "pit lane speed limit"), 4);
        assert_eq!(relevance_score(&doc, "engine TOKENS"), 0);
    }

    #[test]
    fn test_relevance_score_tables_always_zero() {
        let doc = table_doc("sporting_tables", r#"[{"points": "25"}]"#);
        assert_eq!(relevance_score(&doc, "points"), 0);
    }

    #[test]
    fn test_word_overlap_case_insensitive() {
        assert_eq!(word_overlap("Pit LANE limit", "the pit lane is closed"), 2);
        assert_eq!(word_overlap("podium ceremony", "pit lane text"), 0);
    }
}
