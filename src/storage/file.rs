//! Append-only file backend
//!
//! One JSON object per line:
//! `{"uuid": .., "user_id": .., "short_url": .., "original_url": ..}`.
//!
//! Reads rebuild the key map by scanning the whole log on every call, so read
//! cost grows with log size. That is the known ceiling of this backend.
//! Plain `write` does not reject duplicate keys: a repeated key is appended
//! again and the last line wins on read. `write_if_absent` scans and appends
//! under the append lock, so concurrent creators of one key leave exactly one
//! line. Soft deletion and per-owner listing are not
//! supported; `mark_deleted` is a no-op and `select_by_owner` returns nothing.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use super::{BatchRecord, Record, Storage, StorageConfig};
use crate::errors::{Result, ShortenerError};
use crate::utils::Deadline;

/// 文件中的一行记录
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct FileRecord {
    pub uuid: String,
    pub user_id: String,
    pub short_url: String,
    pub original_url: String,
}

impl FileRecord {
    pub fn new(user_id: &str, short_key: &str, original_url: &str) -> Self {
        Self {
            uuid: uuid::Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            short_url: short_key.to_string(),
            original_url: original_url.to_string(),
        }
    }

    fn to_line(&self) -> Result<String> {
        let mut line = serde_json::to_string(self)?;
        line.push('\n');
        Ok(line)
    }
}

pub struct FileStorage {
    file_path: PathBuf,
    /// 串行化追加写入
    append_lock: Mutex<()>,
}

impl FileStorage {
    pub async fn new_async<P: AsRef<Path>>(file_path: P) -> Result<Self> {
        let file_path = file_path.as_ref().to_path_buf();

        if let Some(parent) = file_path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).await?;
        }

        // 如果不存在就初始化
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(&file_path)
            .await
            .map_err(|e| {
                ShortenerError::storage_unavailable(format!(
                    "Failed to open link file {}: {}",
                    file_path.display(),
                    e
                ))
            })?;

        info!("File storage initialized at {}", file_path.display());
        Ok(FileStorage {
            file_path,
            append_lock: Mutex::new(()),
        })
    }

    /// Scan the whole log. Later lines override earlier ones for the same key.
    async fn load_from_file(&self) -> Result<HashMap<String, FileRecord>> {
        let content = fs::read_to_string(&self.file_path).await.map_err(|e| {
            error!("Failed to read link file: {}", e);
            ShortenerError::storage_unavailable(format!("Failed to read link file: {}", e))
        })?;

        let mut map = HashMap::new();
        for (line_no, line) in content.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let record: FileRecord = serde_json::from_str(line).map_err(|e| {
                error!("Malformed record at line {}: {}", line_no + 1, e);
                ShortenerError::storage_unavailable(format!(
                    "Malformed record at line {}: {}",
                    line_no + 1,
                    e
                ))
            })?;
            map.insert(record.short_url.clone(), record);
        }
        debug!("Scanned {} short links from file", map.len());
        Ok(map)
    }

    async fn append(&self, payload: &str) -> Result<()> {
        let _guard = self.append_lock.lock().await;
        self.append_locked(payload).await
    }

    /// Append `payload` only if none of `keys` is in the log yet.
    async fn append_if_absent(&self, keys: &[&str], payload: &str) -> Result<()> {
        let _guard = self.append_lock.lock().await;
        let links = self.load_from_file().await?;

        let mut seen = HashSet::with_capacity(keys.len());
        for key in keys {
            if links.contains_key(*key) || !seen.insert(*key) {
                debug!("File storage: '{}' already logged, nothing appended", key);
                return Err(ShortenerError::conflict(format!(
                    "Short link '{}' already exists",
                    key
                )));
            }
        }
        self.append_locked(payload).await
    }

    /// Caller holds `append_lock`.
    async fn append_locked(&self, payload: &str) -> Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.file_path)
            .await?;
        file.write_all(payload.as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }
}

#[async_trait]
impl Storage for FileStorage {
    async fn read(&self, key: &str, deadline: &Deadline) -> Result<String> {
        let links = deadline.run("read", self.load_from_file()).await?;
        links
            .get(key)
            .map(|record| record.original_url.clone())
            .ok_or_else(|| ShortenerError::not_found(format!("Short link '{}' not found", key)))
    }

    async fn read_owner(&self, key: &str, deadline: &Deadline) -> Result<String> {
        let links = deadline.run("read_owner", self.load_from_file()).await?;
        links
            .get(key)
            .map(|record| record.user_id.clone())
            .ok_or_else(|| ShortenerError::not_found(format!("Short link '{}' not found", key)))
    }

    async fn write(
        &self,
        owner_id: &str,
        key: &str,
        url: &str,
        deadline: &Deadline,
    ) -> Result<()> {
        let line = FileRecord::new(owner_id, key, url).to_line()?;
        deadline.run("write", self.append(&line)).await?;
        debug!("File storage: appended '{}'", key);
        Ok(())
    }

    async fn write_batch(
        &self,
        owner_id: &str,
        records: &[BatchRecord],
        deadline: &Deadline,
    ) -> Result<()> {
        // 整批序列化后一次写入
        let mut payload = String::new();
        for row in records {
            let record = FileRecord::new(owner_id, &row.short_key, &row.original_url);
            payload.push_str(&record.to_line()?);
        }
        if payload.is_empty() {
            return Ok(());
        }
        deadline.run("write_batch", self.append(&payload)).await?;
        info!("File storage: batch appended {} links", records.len());
        Ok(())
    }

    async fn write_if_absent(
        &self,
        owner_id: &str,
        key: &str,
        url: &str,
        deadline: &Deadline,
    ) -> Result<()> {
        let line = FileRecord::new(owner_id, key, url).to_line()?;
        deadline
            .run("write_if_absent", self.append_if_absent(&[key], &line))
            .await?;
        debug!("File storage: appended '{}'", key);
        Ok(())
    }

    async fn write_batch_if_absent(
        &self,
        owner_id: &str,
        records: &[BatchRecord],
        deadline: &Deadline,
    ) -> Result<()> {
        if records.is_empty() {
            return Ok(());
        }
        let mut payload = String::new();
        for row in records {
            let record = FileRecord::new(owner_id, &row.short_key, &row.original_url);
            payload.push_str(&record.to_line()?);
        }
        let keys: Vec<&str> = records.iter().map(|row| row.short_key.as_str()).collect();
        deadline
            .run("write_batch_if_absent", self.append_if_absent(&keys, &payload))
            .await?;
        info!("File storage: batch appended {} links", records.len());
        Ok(())
    }

    async fn select_by_owner(&self, owner_id: &str, deadline: &Deadline) -> Result<Vec<Record>> {
        deadline.check("select_by_owner")?;
        debug!(
            "File storage does not index owners; empty listing for '{}'",
            owner_id
        );
        Ok(Vec::new())
    }

    async fn mark_deleted(&self, keys: &[String], deadline: &Deadline) -> Result<()> {
        deadline.check("mark_deleted")?;
        if !keys.is_empty() {
            warn!(
                "File storage does not support deletion; ignoring {} keys",
                keys.len()
            );
        }
        Ok(())
    }

    async fn ping(&self, deadline: &Deadline) -> Result<()> {
        deadline
            .run("ping", async {
                fs::File::open(&self.file_path).await.map_err(|e| {
                    ShortenerError::storage_unavailable(format!(
                        "Link file {} is not readable: {}",
                        self.file_path.display(),
                        e
                    ))
                })?;
                Ok(())
            })
            .await
    }

    fn backend_config(&self) -> StorageConfig {
        StorageConfig {
            storage_type: "file".into(),
            supports_ownership_queries: false,
            supports_deletion: false,
            detects_conflicts: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_layout() {
        let record = FileRecord {
            uuid: "u-1".into(),
            user_id: "alice".into(),
            short_url: "cd69b81e".into(),
            original_url: "https://example.com/a".into(),
        };
        assert_eq!(
            record.to_line().unwrap(),
            "{\"uuid\":\"u-1\",\"user_id\":\"alice\",\"short_url\":\"cd69b81e\",\"original_url\":\"https://example.com/a\"}\n"
        );
    }

    #[test]
    fn test_new_generates_uuid() {
        let a = FileRecord::new("alice", "k", "https://example.com");
        let b = FileRecord::new("alice", "k", "https://example.com");
        assert_ne!(a.uuid, b.uuid);
        assert!(uuid::Uuid::parse_str(&a.uuid).is_ok());
    }
}
