use std::sync::Arc;

use tracing::{debug, info};

use common::{error::AppError, utils::chat::ChatModel};

use crate::{
    retriever::CrossStoreRetriever,
    scoring::{dedupe_documents, prefix_chars, relevance_score, word_overlap},
    RetrievedDocument,
};

/// Text documents kept for the answer context.
const MAX_CONTEXT_TEXT_DOCS: usize = 3;
/// Table documents kept for the answer context.
const MAX_CONTEXT_TABLE_DOCS: usize = 2;
/// Citation excerpts show this many leading characters.
const CITATION_EXCERPT_CHARS: usize = 300;
/// Citation duplicates are detected on this excerpt prefix.
const CITATION_DEDUPE_CHARS: usize = 150;

/// Returned when retrieval produced nothing usable.
const NO_DOCUMENTS_ANSWER: &str = "검색된 문서가 없습니다.";

/// One attribution block: a content excerpt and its provenance label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Citation {
    pub excerpt: String,
    pub label: String,
}

/// The final answer with its deduplicated citations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Answer {
    pub text: String,
    pub citations: Vec<Citation>,
}

impl Answer {
    fn without_citations(text: String) -> Self {
        Self {
            text,
            citations: Vec::new(),
        }
    }

    /// Renders the answer and its citation blocks for terminal display.
    pub fn to_display_string(&self) -> String {
        let mut out = format!("### 답변\n{}\n", self.text);

        if !self.citations.is_empty() {
            out.push_str("\n### 규정 인용\n");
            for citation in &self.citations {
                out.push_str(&format!("- {}\n  ({})\n", citation.excerpt, citation.label));
            }
        }

        out
    }
}

/// Answers Korean questions over the English regulation corpus.
///
/// Linear flow with one branch: translate the query, retrieve in both
/// languages, dedupe and rank, then either synthesize from the assembled
/// context or, when no query word appears in it, fall back to general
/// knowledge. Either way the answer is translated back before returning.
pub struct AnswerComposer<'a> {
    retriever: CrossStoreRetriever<'a>,
    chat: Arc<dyn ChatModel>,
    chat_model: String,
    translation_model: String,
}

impl<'a> AnswerComposer<'a> {
    pub fn new(
        retriever: CrossStoreRetriever<'a>,
        chat: Arc<dyn ChatModel>,
        chat_model: String,
        translation_model: String,
    ) -> Self {
        Self {
            retriever,
            chat,
            chat_model,
            translation_model,
        }
    }

    /// Produces a cited answer for `query`, retrieving `k` documents per
    /// partition per language.
    pub async fn ask(&self, query: &str, k: usize) -> Result<Answer, AppError> {
        let query_en = self.translate_to_english(query).await?;
        debug!(query_en = %query_en, "Translated query");

        let mut documents = self.retriever.retrieve_across_all(query, k, None).await?;
        documents.extend(self.retriever.retrieve_across_all(&query_en, k, None).await?);
        let documents = dedupe_documents(documents);

        if documents.is_empty() {
            info!("No documents retrieved for query");
            return Ok(Answer::without_citations(NO_DOCUMENTS_ANSWER.to_string()));
        }

        let (text_docs, table_docs) = select_context_documents(documents, &query_en);
        let (context, citations) = assemble_context(&text_docs, &table_docs);

        let overlap = word_overlap(&query_en, &context);
        debug!(overlap, "Computed query/context overlap");

        if overlap == 0 {
            // Out-of-corpus question: answer from general knowledge only.
            let prompt = general_knowledge_prompt(query);
            let raw = self.chat.generate(&self.chat_model, &prompt).await?;
            let answer = self.translate_to_korean(&raw).await?;
            return Ok(Answer::without_citations(answer));
        }

        let prompt = grounded_prompt(&context, query);
        let raw = self.chat.generate(&self.chat_model, &prompt).await?;
        let text = self.translate_to_korean(&raw).await?;

        Ok(Answer {
            text,
            citations: dedupe_citations(citations),
        })
    }

    async fn translate_to_english(&self, query: &str) -> Result<String, AppError> {
        let prompt = format!(
            "Translate this into FIA Sporting Regulations style English.\n\
             Do NOT simplify terms. Maintain technical vocabulary.\n\
             \n\
             Query:\n\
             {query}"
        );
        self.chat.generate(&self.translation_model, &prompt).await
    }

    async fn translate_to_korean(&self, text: &str) -> Result<String, AppError> {
        let prompt = format!(
            "아래 영문 내용을 FIA 기술/스포팅 규정 문체에 맞게 자연스러운 한국어로 번역하세요.\n\
             숫자, 단어, 용어는 원문을 정확하게 유지하세요.\n\
             \n\
             텍스트:\n\
             {text}"
        );
        self.chat.generate(&self.translation_model, &prompt).await
    }
}

/// Splits the merged results by kind, ranks the prose track by lexical
/// relevance to the translated query, and applies the fixed caps.
///
/// Tables are never ranked against prose; they are included up to their own
/// cap in retrieval order.
fn select_context_documents(
    documents: Vec<RetrievedDocument>,
    query_en: &str,
) -> (Vec<RetrievedDocument>, Vec<RetrievedDocument>) {
    let (table_docs, mut text_docs): (Vec<_>, Vec<_>) =
        documents.into_iter().partition(RetrievedDocument::is_table);

    text_docs.sort_by(|a, b| relevance_score(b, query_en).cmp(&relevance_score(a, query_en)));
    text_docs.truncate(MAX_CONTEXT_TEXT_DOCS);

    let mut table_docs = table_docs;
    table_docs.truncate(MAX_CONTEXT_TABLE_DOCS);

    (text_docs, table_docs)
}

/// Builds the prompt context plus the raw citation list.
///
/// Table documents are parsed back into structured rows and re-serialized
/// under an explicit marker; a table that fails to parse is silently left
/// out of both the context and the citations.
fn assemble_context(
    text_docs: &[RetrievedDocument],
    table_docs: &[RetrievedDocument],
) -> (String, Vec<Citation>) {
    let mut blocks = Vec::new();
    let mut citations = Vec::new();

    for document in text_docs {
        blocks.push(document.content().to_string());
        citations.push(Citation {
            excerpt: prefix_chars(document.content(), CITATION_EXCERPT_CHARS).replace('\n', " "),
            label: citation_label(document),
        });
    }

    for document in table_docs {
        let parsed: Result<serde_json::Value, _> = serde_json::from_str(document.content());
        match parsed {
            Ok(rows) => {
                let rendered =
                    serde_json::to_string_pretty(&rows).unwrap_or_else(|_| rows.to_string());
                blocks.push(format!("TABLE_DATA:\n{rendered}"));
                citations.push(Citation {
                    excerpt: rows.to_string(),
                    label: citation_label(document),
                });
            }
            Err(e) => {
                debug!(partition = %document.partition, error = %e, "Dropping unparsable table document");
            }
        }
    }

    (blocks.join("\n\n"), citations)
}

fn citation_label(document: &RetrievedDocument) -> String {
    let page = document
        .page()
        .map_or_else(|| "?".to_string(), |p| p.to_string());
    format!("{} · p.{}", document.partition, page)
}

/// Collapses citations sharing the same leading excerpt text, first
/// occurrence wins.
fn dedupe_citations(citations: Vec<Citation>) -> Vec<Citation> {
    let mut seen = std::collections::HashSet::new();
    citations
        .into_iter()
        .filter(|citation| seen.insert(prefix_chars(&citation.excerpt, CITATION_DEDUPE_CHARS)))
        .collect()
}

fn general_knowledge_prompt(query: &str) -> String {
    format!(
        "You are an F1 expert. The question does not appear in the regulations.\n\
         \n\
         Provide ONLY commonly-known F1 knowledge.\n\
         Do not invent article numbers or regulations.\n\
         \n\
         Question:\n\
         {query}\n\
         \n\
         Answer:"
    )
}

fn grounded_prompt(context: &str, query: &str) -> String {
    format!(
        "You are an FIA Sporting Regulations expert.\n\
         \n\
         Use ONLY information appearing in Context.\n\
         If sentences are duplicated in Context, summarize them once.\n\
         \n\
         [Context]\n\
         {context}\n\
         \n\
         [Question]\n\
         {query}\n\
         \n\
         [Answer]"
    )
}
