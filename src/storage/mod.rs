//! Persistence contract and its backends
//!
//! The service and the deletion pipeline program against [`Storage`] only.
//! Three backends satisfy it:
//! - `memory`: mutex-guarded map, full contract
//! - `file`: append-only JSON lines log; no conflict detection, no deletion,
//!   no per-owner listing
//! - `database`: SeaORM over SQLite / MySQL / PostgreSQL, full contract

use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use crate::config::StaticConfig;
use crate::errors::{Result, ShortenerError};
use crate::utils::Deadline;

pub mod backend;
pub mod file;
pub mod memory;
pub mod models;

pub use backend::SeaOrmStorage;
pub use file::FileStorage;
pub use memory::MemoryStorage;
pub use models::{BatchRecord, Record, StorageConfig};

#[async_trait]
pub trait Storage: Send + Sync {
    /// Original URL for `key`; `NotFound` if absent, `Gone` if soft-deleted.
    async fn read(&self, key: &str, deadline: &Deadline) -> Result<String>;

    /// Owner of `key`; `NotFound` if absent.
    async fn read_owner(&self, key: &str, deadline: &Deadline) -> Result<String>;

    /// Atomic compare-and-insert; `Conflict` if `key` exists, leaving it untouched.
    async fn write(
        &self,
        owner_id: &str,
        key: &str,
        url: &str,
        deadline: &Deadline,
    ) -> Result<()>;

    /// All-or-nothing insert of `records` for one owner.
    async fn write_batch(
        &self,
        owner_id: &str,
        records: &[BatchRecord],
        deadline: &Deadline,
    ) -> Result<()>;

    /// Like `write`, but `Conflict` is guaranteed even on backends whose plain
    /// `write` does not detect duplicates. The existence check and the insert
    /// are one atomic step.
    async fn write_if_absent(
        &self,
        owner_id: &str,
        key: &str,
        url: &str,
        deadline: &Deadline,
    ) -> Result<()> {
        self.write(owner_id, key, url, deadline).await
    }

    /// `write_batch` with the same guarantee as `write_if_absent`: if any key
    /// is already present nothing is written and `Conflict` is returned.
    async fn write_batch_if_absent(
        &self,
        owner_id: &str,
        records: &[BatchRecord],
        deadline: &Deadline,
    ) -> Result<()> {
        self.write_batch(owner_id, records, deadline).await
    }

    /// Live (not soft-deleted) records created by `owner_id`.
    async fn select_by_owner(&self, owner_id: &str, deadline: &Deadline) -> Result<Vec<Record>>;

    /// Flip `deleted` for every key in one commit.
    async fn mark_deleted(&self, keys: &[String], deadline: &Deadline) -> Result<()>;

    /// Liveness check of the underlying store; `StorageUnavailable` when it
    /// cannot be reached.
    async fn ping(&self, deadline: &Deadline) -> Result<()>;

    fn backend_config(&self) -> StorageConfig;
}

/// Backend kinds selectable from configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    Memory,
    File,
    Database,
}

impl std::str::FromStr for BackendKind {
    type Err = ShortenerError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "memory" => Ok(Self::Memory),
            "file" => Ok(Self::File),
            "database" | "db" | "sql" => Ok(Self::Database),
            other => Err(ShortenerError::invalid_input(format!(
                "Unknown storage backend '{}'. Valid: memory, file, database",
                other
            ))),
        }
    }
}

/// Pick the backend: explicit choice first, then database > file > memory.
pub fn select_backend(config: &StaticConfig) -> Result<BackendKind> {
    if let Some(explicit) = config.storage.backend.as_deref().filter(|b| !b.is_empty()) {
        return explicit.parse();
    }
    if !config.database.database_url.is_empty() {
        Ok(BackendKind::Database)
    } else if !config.storage.file_path.is_empty() {
        Ok(BackendKind::File)
    } else {
        Ok(BackendKind::Memory)
    }
}

pub struct StorageFactory;

impl StorageFactory {
    pub async fn create(config: &StaticConfig) -> Result<Arc<dyn Storage>> {
        let storage: Arc<dyn Storage> = match select_backend(config)? {
            BackendKind::Memory => Arc::new(MemoryStorage::new()),
            BackendKind::File => {
                if config.storage.file_path.is_empty() {
                    return Err(ShortenerError::invalid_input(
                        "storage.file_path is required for the file backend",
                    ));
                }
                Arc::new(FileStorage::new_async(&config.storage.file_path).await?)
            }
            BackendKind::Database => {
                let database_url = &config.database.database_url;
                let backend_name = backend::infer_backend_from_url(database_url)?;
                Arc::new(SeaOrmStorage::new(database_url, &backend_name, &config.database).await?)
            }
        };

        info!(
            "Using storage backend: {}",
            storage.backend_config().storage_type
        );
        Ok(storage)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_kind_parse() {
        assert_eq!("memory".parse::<BackendKind>().unwrap(), BackendKind::Memory);
        assert_eq!("FILE".parse::<BackendKind>().unwrap(), BackendKind::File);
        assert_eq!("database".parse::<BackendKind>().unwrap(), BackendKind::Database);
        assert!("redis".parse::<BackendKind>().is_err());
    }

    #[test]
    fn test_select_backend_precedence() {
        let mut config = StaticConfig::default();
        assert_eq!(select_backend(&config).unwrap(), BackendKind::Memory);

        config.storage.file_path = "links.jsonl".into();
        assert_eq!(select_backend(&config).unwrap(), BackendKind::File);

        config.database.database_url = "sqlite://links.db".into();
        assert_eq!(select_backend(&config).unwrap(), BackendKind::Database);

        config.storage.backend = Some("memory".into());
        assert_eq!(select_backend(&config).unwrap(), BackendKind::Memory);
    }

    #[tokio::test]
    async fn test_factory_builds_memory_by_default() {
        let storage = StorageFactory::create(&StaticConfig::default()).await.unwrap();
        assert_eq!(storage.backend_config().storage_type, "memory");
    }
}
