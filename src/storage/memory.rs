use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use parking_lot::Mutex;
use tracing::{debug, info};

use super::{BatchRecord, Record, Storage, StorageConfig};
use crate::errors::{Result, ShortenerError};
use crate::utils::Deadline;

/// In-process store shared by request handling and the deletion pipeline.
///
/// Every operation takes the single lock for its whole duration, so a
/// compare-and-insert or a multi-key delete is observed atomically.
#[derive(Default)]
pub struct MemoryStorage {
    records: Mutex<HashMap<String, Record>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of records held, deleted ones included.
    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn read(&self, key: &str, deadline: &Deadline) -> Result<String> {
        deadline.check("read")?;
        let records = self.records.lock();
        match records.get(key) {
            Some(record) if record.deleted => Err(ShortenerError::gone(format!(
                "Short link '{}' has been deleted",
                key
            ))),
            Some(record) => Ok(record.original_url.clone()),
            None => Err(ShortenerError::not_found(format!(
                "Short link '{}' not found",
                key
            ))),
        }
    }

    async fn read_owner(&self, key: &str, deadline: &Deadline) -> Result<String> {
        deadline.check("read_owner")?;
        self.records
            .lock()
            .get(key)
            .map(|record| record.owner_id.clone())
            .ok_or_else(|| ShortenerError::not_found(format!("Short link '{}' not found", key)))
    }

    async fn write(
        &self,
        owner_id: &str,
        key: &str,
        url: &str,
        deadline: &Deadline,
    ) -> Result<()> {
        deadline.check("write")?;
        let mut records = self.records.lock();
        if records.contains_key(key) {
            return Err(ShortenerError::conflict(format!(
                "Short link '{}' already exists",
                key
            )));
        }
        records.insert(
            key.to_string(),
            Record {
                short_key: key.to_string(),
                original_url: url.to_string(),
                owner_id: owner_id.to_string(),
                deleted: false,
            },
        );
        debug!("Memory storage: created '{}'", key);
        Ok(())
    }

    async fn write_batch(
        &self,
        owner_id: &str,
        batch: &[BatchRecord],
        deadline: &Deadline,
    ) -> Result<()> {
        deadline.check("write_batch")?;
        let mut records = self.records.lock();

        // 先整体校验，任何冲突都不修改状态
        let mut seen = HashSet::with_capacity(batch.len());
        for row in batch {
            if records.contains_key(&row.short_key) || !seen.insert(row.short_key.as_str()) {
                return Err(ShortenerError::conflict(format!(
                    "Short link '{}' already exists; batch rolled back",
                    row.short_key
                )));
            }
        }

        for row in batch {
            records.insert(
                row.short_key.clone(),
                Record {
                    short_key: row.short_key.clone(),
                    original_url: row.original_url.clone(),
                    owner_id: owner_id.to_string(),
                    deleted: false,
                },
            );
        }
        info!("Memory storage: batch inserted {} links", batch.len());
        Ok(())
    }

    async fn select_by_owner(&self, owner_id: &str, deadline: &Deadline) -> Result<Vec<Record>> {
        deadline.check("select_by_owner")?;
        let mut owned: Vec<Record> = self
            .records
            .lock()
            .values()
            .filter(|record| record.owner_id == owner_id && !record.deleted)
            .cloned()
            .collect();
        owned.sort_by(|a, b| a.short_key.cmp(&b.short_key));
        Ok(owned)
    }

    async fn mark_deleted(&self, keys: &[String], deadline: &Deadline) -> Result<()> {
        deadline.check("mark_deleted")?;
        let mut records = self.records.lock();
        let mut flipped = 0usize;
        for key in keys {
            if let Some(record) = records.get_mut(key)
                && !record.deleted
            {
                record.deleted = true;
                flipped += 1;
            }
        }
        info!(
            "Memory storage: marked {} of {} links deleted",
            flipped,
            keys.len()
        );
        Ok(())
    }

    async fn ping(&self, deadline: &Deadline) -> Result<()> {
        deadline.check("ping")
    }

    fn backend_config(&self) -> StorageConfig {
        StorageConfig {
            storage_type: "memory".into(),
            supports_ownership_queries: true,
            supports_deletion: true,
            detects_conflicts: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ErrorKind;
    use std::time::Duration;

    fn deadline() -> Deadline {
        Deadline::after(Duration::from_secs(5))
    }

    fn batch_row(key: &str, url: &str) -> BatchRecord {
        BatchRecord {
            short_key: key.into(),
            original_url: url.into(),
        }
    }

    #[tokio::test]
    async fn test_write_then_read() {
        let storage = MemoryStorage::new();
        storage
            .write("alice", "k1", "https://example.com/1", &deadline())
            .await
            .unwrap();
        assert_eq!(
            storage.read("k1", &deadline()).await.unwrap(),
            "https://example.com/1"
        );
        assert_eq!(storage.read_owner("k1", &deadline()).await.unwrap(), "alice");
    }

    #[tokio::test]
    async fn test_write_conflict_keeps_original() {
        let storage = MemoryStorage::new();
        storage
            .write("alice", "k1", "https://example.com/1", &deadline())
            .await
            .unwrap();
        let err = storage
            .write("bob", "k1", "https://example.com/other", &deadline())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);
        assert_eq!(storage.read_owner("k1", &deadline()).await.unwrap(), "alice");
        assert_eq!(
            storage.read("k1", &deadline()).await.unwrap(),
            "https://example.com/1"
        );
    }

    #[tokio::test]
    async fn test_missing_key() {
        let storage = MemoryStorage::new();
        assert_eq!(
            storage.read("nope", &deadline()).await.unwrap_err().kind(),
            ErrorKind::NotFound
        );
        assert_eq!(
            storage.read_owner("nope", &deadline()).await.unwrap_err().kind(),
            ErrorKind::NotFound
        );
    }

    #[tokio::test]
    async fn test_batch_is_all_or_nothing() {
        let storage = MemoryStorage::new();
        storage
            .write("alice", "k2", "https://example.com/2", &deadline())
            .await
            .unwrap();

        let err = storage
            .write_batch(
                "bob",
                &[
                    batch_row("k1", "https://example.com/1"),
                    batch_row("k2", "https://example.com/2"),
                ],
                &deadline(),
            )
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);
        assert_eq!(storage.len(), 1);
        assert_eq!(
            storage.read("k1", &deadline()).await.unwrap_err().kind(),
            ErrorKind::NotFound
        );
    }

    #[tokio::test]
    async fn test_batch_rejects_duplicate_rows() {
        let storage = MemoryStorage::new();
        let err = storage
            .write_batch(
                "bob",
                &[
                    batch_row("k1", "https://example.com/1"),
                    batch_row("k1", "https://example.com/1"),
                ],
                &deadline(),
            )
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);
        assert!(storage.is_empty());
    }

    #[tokio::test]
    async fn test_mark_deleted_and_listing() {
        let storage = MemoryStorage::new();
        for (key, owner) in [("k1", "alice"), ("k2", "alice"), ("k3", "bob")] {
            storage
                .write(owner, key, &format!("https://example.com/{}", key), &deadline())
                .await
                .unwrap();
        }

        storage
            .mark_deleted(&["k1".to_string(), "missing".to_string()], &deadline())
            .await
            .unwrap();

        assert_eq!(
            storage.read("k1", &deadline()).await.unwrap_err().kind(),
            ErrorKind::Gone
        );
        // 删除后仍可查询所有者
        assert_eq!(storage.read_owner("k1", &deadline()).await.unwrap(), "alice");

        let alice = storage.select_by_owner("alice", &deadline()).await.unwrap();
        assert_eq!(alice.len(), 1);
        assert_eq!(alice[0].short_key, "k2");
        assert_eq!(storage.len(), 3);
    }

    #[tokio::test]
    async fn test_deleted_is_monotonic() {
        let storage = MemoryStorage::new();
        storage
            .write("alice", "k1", "https://example.com/1", &deadline())
            .await
            .unwrap();
        storage
            .mark_deleted(&["k1".to_string()], &deadline())
            .await
            .unwrap();
        // 重新写入同一个 key 不会复活记录
        let err = storage
            .write("alice", "k1", "https://example.com/1", &deadline())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);
        assert_eq!(
            storage.read("k1", &deadline()).await.unwrap_err().kind(),
            ErrorKind::Gone
        );
    }

    #[tokio::test]
    async fn test_ping() {
        let storage = MemoryStorage::new();
        assert!(storage.ping(&deadline()).await.is_ok());
        let expired = Deadline::after(Duration::ZERO);
        assert_eq!(
            storage.ping(&expired).await.unwrap_err().kind(),
            ErrorKind::Timeout
        );
    }

    #[tokio::test]
    async fn test_expired_deadline_short_circuits() {
        let storage = MemoryStorage::new();
        let expired = Deadline::after(Duration::ZERO);
        let err = storage
            .write("alice", "k1", "https://example.com/1", &expired)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Timeout);
        assert!(storage.is_empty());
    }
}
