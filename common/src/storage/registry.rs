use std::path::Path;

use tracing::{info, warn};

use crate::error::AppError;

use super::partition::PartitionStore;

/// Ordered collection of the loaded index partitions.
///
/// Constructed once at the composition root and passed by reference to the
/// ingestion and retrieval sides; never a process-wide global. Iteration
/// order is the load/insert order, which downstream merging relies on.
#[derive(Default)]
pub struct PartitionRegistry {
    partitions: Vec<PartitionStore>,
}

impl PartitionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens every subdirectory of `index_dir` as a partition.
    ///
    /// A partition that fails to open is logged and excluded rather than
    /// aborting the remaining loads. A missing root directory yields an
    /// empty registry.
    pub async fn load_all(index_dir: &Path) -> Result<Self, AppError> {
        let mut registry = Self::new();

        if !index_dir.is_dir() {
            info!(path = %index_dir.display(), "No partition directory found");
            return Ok(registry);
        }

        let mut names = Vec::new();
        let mut entries = tokio::fs::read_dir(index_dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            if entry.file_type().await?.is_dir() {
                names.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        names.sort();

        for name in names {
            match PartitionStore::open(index_dir, &name).await {
                Ok(partition) => {
                    info!(partition = %name, "Loaded partition");
                    registry.insert(partition);
                }
                Err(e) => {
                    warn!(partition = %name, error = %e, "Failed to load partition, excluding it");
                }
            }
        }

        Ok(registry)
    }

    /// Registers a partition, replacing any previous one with the same name.
    pub fn insert(&mut self, partition: PartitionStore) {
        if let Some(existing) = self
            .partitions
            .iter_mut()
            .find(|p| p.name() == partition.name())
        {
            *existing = partition;
        } else {
            self.partitions.push(partition);
        }
    }

    pub fn get(&self, name: &str) -> Option<&PartitionStore> {
        self.partitions.iter().find(|p| p.name() == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &PartitionStore> {
        self.partitions.iter()
    }

    pub fn names(&self) -> Vec<&str> {
        self.partitions.iter().map(PartitionStore::name).collect()
    }

    pub fn len(&self) -> usize {
        self.partitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.partitions.is_empty()
    }
}
