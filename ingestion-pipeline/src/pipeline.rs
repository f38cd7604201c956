use std::{path::Path, sync::Arc};

use tracing::{info, warn};

use common::{
    error::AppError,
    storage::{
        partition::PartitionStore,
        registry::PartitionRegistry,
        types::{table_chunk::TableChunk, text_chunk::TextChunk},
    },
    utils::{config::AppConfig, embedding::EmbeddingProvider},
};

use crate::{
    classifier::classify,
    optimizer::{fallback_chunks, optimize, OptimizedChunk},
    segmenter::{split_into_articles, split_into_sections, Page},
    tables::{convert_tables, TableExtractor, TableRecord},
    utils::pdf::load_pdf_pages,
};

/// Runs the full document-to-partition pipeline: classify, segment,
/// optimize, embed, and persist into `<category>_text` / `<category>_tables`
/// partitions.
pub struct IngestionPipeline {
    config: AppConfig,
    embedding: Arc<EmbeddingProvider>,
    table_extractor: Arc<dyn TableExtractor>,
}

impl IngestionPipeline {
    pub fn new(
        config: AppConfig,
        embedding: Arc<EmbeddingProvider>,
        table_extractor: Arc<dyn TableExtractor>,
    ) -> Self {
        Self {
            config,
            embedding,
            table_extractor,
        }
    }

    /// Ingests every PDF in the configured data directory.
    ///
    /// Finding no documents is a warning, not an error. Returns the number
    /// of documents processed.
    pub async fn ingest_all(&self, registry: &mut PartitionRegistry) -> Result<usize, AppError> {
        let data_dir = Path::new(&self.config.data_dir);

        let mut pdf_paths = Vec::new();
        if data_dir.is_dir() {
            let mut entries = tokio::fs::read_dir(data_dir).await?;
            while let Some(entry) = entries.next_entry().await? {
                let path = entry.path();
                let is_pdf = path
                    .extension()
                    .map(|ext| ext.eq_ignore_ascii_case("pdf"))
                    .unwrap_or(false);
                if is_pdf {
                    pdf_paths.push(path);
                }
            }
        }
        pdf_paths.sort();

        if pdf_paths.is_empty() {
            warn!(path = %data_dir.display(), "No PDF files found");
            return Ok(0);
        }

        for path in &pdf_paths {
            self.ingest_file(registry, path).await?;
        }

        Ok(pdf_paths.len())
    }

    /// Ingests a single document into its category's partitions.
    pub async fn ingest_file(
        &self,
        registry: &mut PartitionRegistry,
        path: &Path,
    ) -> Result<(), AppError> {
        let filename = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .ok_or_else(|| AppError::Validation(format!("Not a file path: {}", path.display())))?;
        let category = classify(&filename);

        info!(file = %filename, category = %category, "Ingesting document");

        let pages = load_pdf_pages(path).await?;
        let chunks = document_chunks(&pages)?;
        self.build_text_partition(registry, chunks, category.text_partition())
            .await?;

        let raw_tables = self.table_extractor.extract(path).await;
        let records = convert_tables(&raw_tables);
        self.build_table_partition(registry, records, category.tables_partition())
            .await?;

        Ok(())
    }

    async fn build_text_partition(
        &self,
        registry: &mut PartitionRegistry,
        chunks: Vec<OptimizedChunk>,
        name: String,
    ) -> Result<(), AppError> {
        let chunks: Vec<OptimizedChunk> = chunks
            .into_iter()
            .filter(|c| !c.content.trim().is_empty())
            .collect();

        if chunks.is_empty() {
            info!(partition = %name, "No valid text chunks, skipping partition build");
            return Ok(());
        }

        let contents: Vec<String> = chunks.iter().map(|c| c.content.clone()).collect();
        let embeddings = self.embed_contents(contents, &name).await?;

        let rows: Vec<TextChunk> = chunks
            .into_iter()
            .zip(embeddings)
            .map(|(chunk, embedding)| {
                TextChunk::new(
                    chunk.article,
                    chunk.section,
                    chunk.subchunk_index,
                    chunk.content,
                    chunk.page,
                    embedding,
                )
            })
            .collect();

        let index_dir = Path::new(&self.config.index_dir);
        let store = PartitionStore::create(index_dir, &name, self.embedding.dimension()).await?;
        let count = rows.len();
        store.insert_text_chunks(rows).await?;

        info!(partition = %name, chunks = count, "Built text partition");
        registry.insert(store);
        Ok(())
    }

    async fn build_table_partition(
        &self,
        registry: &mut PartitionRegistry,
        records: Vec<TableRecord>,
        name: String,
    ) -> Result<(), AppError> {
        if records.is_empty() {
            info!(partition = %name, "No table records, skipping partition build");
            return Ok(());
        }

        let contents: Vec<String> = records.iter().map(|r| r.content.clone()).collect();
        let embeddings = self.embed_contents(contents, &name).await?;

        let rows: Vec<TableChunk> = records
            .into_iter()
            .zip(embeddings)
            .map(|(record, embedding)| {
                TableChunk::new(record.table_index, record.page, record.content, embedding)
            })
            .collect();

        let index_dir = Path::new(&self.config.index_dir);
        let store = PartitionStore::create(index_dir, &name, self.embedding.dimension()).await?;
        let count = rows.len();
        store.insert_table_chunks(rows).await?;

        info!(partition = %name, tables = count, "Built table partition");
        registry.insert(store);
        Ok(())
    }

    /// Embeds chunk contents before any partition directory exists, so a
    /// failed embedding run leaves nothing half-written on disk.
    async fn embed_contents(
        &self,
        contents: Vec<String>,
        partition: &str,
    ) -> Result<Vec<Vec<f32>>, AppError> {
        let expected = contents.len();
        let embeddings = self
            .embedding
            .embed_batch(contents)
            .await
            .map_err(|e| AppError::Ingestion(format!("Embedding failed for {partition}: {e}")))?;

        if embeddings.len() != expected {
            return Err(AppError::Ingestion(format!(
                "Embedding count mismatch for {partition}: expected {expected}, got {}",
                embeddings.len()
            )));
        }

        Ok(embeddings)
    }
}

/// Shapes a document's pages into indexable chunks: article/section
/// segmentation when the structural markers are present, generic bounded
/// chunking otherwise.
fn document_chunks(pages: &[Page]) -> Result<Vec<OptimizedChunk>, AppError> {
    let articles = split_into_articles(pages);

    if articles.is_empty() {
        warn!("No ARTICLE markers found, using fallback chunking");
        return fallback_chunks(pages);
    }

    let sections: Vec<_> = articles.iter().flat_map(split_into_sections).collect();
    optimize(&sections)
}
