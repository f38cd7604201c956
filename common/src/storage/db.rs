use std::ops::Deref;
use std::path::Path;

use surrealdb::{
    engine::any::{connect, Any},
    Error, Surreal,
};

use super::types::StoredObject;

const NAMESPACE: &str = "regatta";

/// Connection to one embedded SurrealDB database.
///
/// Each index partition owns its own database directory; nothing is shared
/// between partitions besides the namespace name.
#[derive(Clone)]
pub struct SurrealDbClient {
    pub client: Surreal<Any>,
}

impl SurrealDbClient {
    /// Opens (or creates) the embedded RocksDB-backed database at `path`.
    pub async fn open(path: &Path, database: &str) -> Result<Self, Error> {
        let db = connect(format!("rocksdb://{}", path.display())).await?;

        db.use_ns(NAMESPACE).use_db(database).await?;

        Ok(SurrealDbClient { client: db })
    }

    /// Operation to store a object in SurrealDB, requires the struct to implement StoredObject
    ///
    /// # Arguments
    /// * `item` - The item to be stored
    ///
    /// # Returns
    /// * `Result` - Item or Error
    pub async fn store_item<T>(&self, item: T) -> Result<Option<T>, Error>
    where
        T: StoredObject + Send + Sync + 'static,
    {
        self.client
            .create((T::table_name(), item.get_id()))
            .content(item)
            .await
    }

    /// Operation to retrieve all objects from a certain table, requires the struct to implement StoredObject
    ///
    /// # Returns
    /// * `Result` - Vec<T> or Error
    pub async fn get_all_stored_items<T>(&self) -> Result<Vec<T>, Error>
    where
        T: for<'de> StoredObject,
    {
        self.client.select(T::table_name()).await
    }
}

impl Deref for SurrealDbClient {
    type Target = Surreal<Any>;

    fn deref(&self) -> &Self::Target {
        &self.client
    }
}

#[cfg(any(test, feature = "test-utils"))]
impl SurrealDbClient {
    /// Create an in-memory SurrealDB client for testing.
    pub async fn memory(database: &str) -> Result<Self, Error> {
        let db = connect("mem://").await?;

        db.use_ns(NAMESPACE).use_db(database).await?;

        Ok(SurrealDbClient { client: db })
    }
}
