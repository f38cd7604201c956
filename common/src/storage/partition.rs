use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::AppError;

use super::{
    db::SurrealDbClient,
    types::{table_chunk::TableChunk, text_chunk::TextChunk},
};

/// What a partition stores, derived from its directory name.
///
/// Partition names follow the `<category>_<kind>` convention
/// (`sporting_text`, `technical_tables`, ...), and retrieval filters on the
/// same name substrings, so the tag in the name is authoritative.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PartitionKind {
    Text,
    Tables,
}

impl PartitionKind {
    pub fn of_partition_name(name: &str) -> Self {
        if name.contains("tables") {
            Self::Tables
        } else {
            Self::Text
        }
    }

    /// The name-substring tag used when routing a query to partitions.
    pub const fn tag(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Tables => "tables",
        }
    }

    const fn index_statement(self, dimension: usize) -> IndexStatement {
        match self {
            Self::Text => IndexStatement {
                name: "idx_embedding_text_chunk",
                table: "text_chunk",
                dimension,
            },
            Self::Tables => IndexStatement {
                name: "idx_embedding_table_chunk",
                table: "table_chunk",
                dimension,
            },
        }
    }
}

struct IndexStatement {
    name: &'static str,
    table: &'static str,
    dimension: usize,
}

impl IndexStatement {
    fn to_query(&self) -> String {
        format!(
            "DEFINE INDEX IF NOT EXISTS {} ON {} FIELDS embedding HNSW DIMENSION {}",
            self.name, self.table, self.dimension
        )
    }
}

/// One named, persisted collection of chunks for a (category, kind) pair.
///
/// Backed by its own embedded database directory under the index root; the
/// directory contents are owned entirely by the database engine.
#[derive(Clone)]
pub struct PartitionStore {
    name: String,
    kind: PartitionKind,
    db: SurrealDbClient,
}

impl PartitionStore {
    /// Creates the partition directory and its vector index.
    ///
    /// Callers must not create partitions for empty chunk sets; that check
    /// lives in the ingestion pipeline so no directory appears on disk.
    pub async fn create(index_dir: &Path, name: &str, dimension: usize) -> Result<Self, AppError> {
        let kind = PartitionKind::of_partition_name(name);
        let db = SurrealDbClient::open(&partition_path(index_dir, name), name)
            .await
            .map_err(|e| AppError::Ingestion(format!("Failed to create partition {name}: {e}")))?;

        db.query(kind.index_statement(dimension).to_query())
            .await
            .map_err(|e| {
                AppError::Ingestion(format!("Failed to define vector index for {name}: {e}"))
            })?;

        Ok(Self {
            name: name.to_string(),
            kind,
            db,
        })
    }

    /// Opens an existing partition directory without rebuilding anything.
    pub async fn open(index_dir: &Path, name: &str) -> Result<Self, AppError> {
        let path = partition_path(index_dir, name);
        if !path.is_dir() {
            return Err(AppError::PartitionLoad(format!(
                "Partition directory {} does not exist",
                path.display()
            )));
        }

        let db = SurrealDbClient::open(&path, name)
            .await
            .map_err(|e| AppError::PartitionLoad(format!("Failed to open partition {name}: {e}")))?;

        Ok(Self {
            name: name.to_string(),
            kind: PartitionKind::of_partition_name(name),
            db,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub const fn kind(&self) -> PartitionKind {
        self.kind
    }

    pub async fn insert_text_chunks(&self, chunks: Vec<TextChunk>) -> Result<(), AppError> {
        let count = chunks.len();
        for chunk in chunks {
            self.db.store_item(chunk).await?;
        }
        debug!(partition = %self.name, count, "Stored text chunks");
        Ok(())
    }

    pub async fn insert_table_chunks(&self, chunks: Vec<TableChunk>) -> Result<(), AppError> {
        let count = chunks.len();
        for chunk in chunks {
            self.db.store_item(chunk).await?;
        }
        debug!(partition = %self.name, count, "Stored table chunks");
        Ok(())
    }

    /// Top-k nearest text chunks by embedding distance.
    ///
    /// Returns an empty result on a tables partition, whose `text_chunk`
    /// table has no rows.
    pub async fn search_text(
        &self,
        embedding: &[f32],
        k: usize,
    ) -> Result<Vec<TextChunk>, AppError> {
        let closest_query = format!(
            "SELECT *, vector::distance::knn() AS distance FROM text_chunk WHERE embedding <|{},40|> {:?} ORDER BY distance",
            k, embedding
        );

        let closest: Vec<TextChunk> = self.db.query(closest_query).await?.take(0)?;

        Ok(closest)
    }

    /// Top-k nearest table chunks by embedding distance.
    pub async fn search_tables(
        &self,
        embedding: &[f32],
        k: usize,
    ) -> Result<Vec<TableChunk>, AppError> {
        let closest_query = format!(
            "SELECT *, vector::distance::knn() AS distance FROM table_chunk WHERE embedding <|{},40|> {:?} ORDER BY distance",
            k, embedding
        );

        let closest: Vec<TableChunk> = self.db.query(closest_query).await?.take(0)?;

        Ok(closest)
    }
}

fn partition_path(index_dir: &Path, name: &str) -> PathBuf {
    index_dir.join(name)
}

#[cfg(any(test, feature = "test-utils"))]
impl PartitionStore {
    /// In-memory partition for tests; same schema and index as `create`.
    pub async fn memory(name: &str, dimension: usize) -> Result<Self, AppError> {
        let kind = PartitionKind::of_partition_name(name);
        let db = SurrealDbClient::memory(name)
            .await
            .map_err(|e| AppError::Ingestion(format!("Failed to create partition {name}: {e}")))?;

        db.query(kind.index_statement(dimension).to_query())
            .await
            .map_err(|e| {
                AppError::Ingestion(format!("Failed to define vector index for {name}: {e}"))
            })?;

        Ok(Self {
            name: name.to_string(),
            kind,
            db,
        })
    }
}
