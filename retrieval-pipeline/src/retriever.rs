use tracing::debug;

use common::{
    error::AppError,
    storage::{
        partition::{PartitionKind, PartitionStore},
        registry::PartitionRegistry,
    },
    utils::embedding::EmbeddingProvider,
};

use crate::{
    router::{route, QueryRoute},
    DocumentPayload, RetrievedDocument,
};

/// Fans similarity searches out across the loaded partitions.
pub struct CrossStoreRetriever<'a> {
    registry: &'a PartitionRegistry,
    embedding: &'a EmbeddingProvider,
}

impl<'a> CrossStoreRetriever<'a> {
    pub fn new(registry: &'a PartitionRegistry, embedding: &'a EmbeddingProvider) -> Self {
        Self {
            registry,
            embedding,
        }
    }

    /// Top-k search against every partition, optionally narrowed to one
    /// content kind by partition-name tag.
    ///
    /// Results keep partition load order; ranking happens downstream.
    pub async fn retrieve_across_all(
        &self,
        query: &str,
        k: usize,
        target_kind: Option<QueryRoute>,
    ) -> Result<Vec<RetrievedDocument>, AppError> {
        let query_embedding = self.embedding.embed(query).await?;

        let mut results = Vec::new();
        for partition in self.registry.iter() {
            if let Some(kind) = target_kind {
                if !partition.name().contains(kind.partition_tag()) {
                    continue;
                }
            }

            results.extend(search_partition(partition, &query_embedding, k).await?);
        }

        debug!(
            query_chars = query.chars().count(),
            results = results.len(),
            "Cross-store retrieval finished"
        );
        Ok(results)
    }

    /// Builds a retriever scoped to the partitions matching the query's
    /// route; when nothing matches, every partition stays in scope.
    pub fn scoped(&self, k: usize, query: &str) -> ScopedRetriever<'a> {
        let query_route = route(query);

        let mut partitions: Vec<&PartitionStore> = self
            .registry
            .iter()
            .filter(|p| p.name().contains(query_route.partition_tag()))
            .collect();

        if partitions.is_empty() {
            partitions = self.registry.iter().collect();
        }

        ScopedRetriever {
            partitions,
            embedding: self.embedding,
            k,
        }
    }
}

/// A fixed partition set with a fixed k; retrieves any query against
/// exactly those partitions.
pub struct ScopedRetriever<'a> {
    partitions: Vec<&'a PartitionStore>,
    embedding: &'a EmbeddingProvider,
    k: usize,
}

impl ScopedRetriever<'_> {
    pub async fn retrieve(&self, query: &str) -> Result<Vec<RetrievedDocument>, AppError> {
        let query_embedding = self.embedding.embed(query).await?;

        let mut results = Vec::new();
        for partition in &self.partitions {
            results.extend(search_partition(partition, &query_embedding, self.k).await?);
        }

        Ok(results)
    }

    pub fn partition_names(&self) -> Vec<&str> {
        self.partitions.iter().map(|p| p.name()).collect()
    }
}

async fn search_partition(
    partition: &PartitionStore,
    query_embedding: &[f32],
    k: usize,
) -> Result<Vec<RetrievedDocument>, AppError> {
    let documents = match partition.kind() {
        PartitionKind::Text => partition
            .search_text(query_embedding, k)
            .await?
            .into_iter()
            .map(|chunk| RetrievedDocument {
                partition: partition.name().to_string(),
                payload: DocumentPayload::Text(chunk),
            })
            .collect(),
        PartitionKind::Tables => partition
            .search_tables(query_embedding, k)
            .await?
            .into_iter()
            .map(|chunk| RetrievedDocument {
                partition: partition.name().to_string(),
                payload: DocumentPayload::Table(chunk),
            })
            .collect(),
    };

    Ok(documents)
}
