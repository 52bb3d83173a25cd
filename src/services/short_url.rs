//! Short URL service
//!
//! Validation, key derivation and the idempotence policy live here. Storage
//! backends only promise the `Storage` contract; creation always goes through
//! the `*_if_absent` writes so a repeated key surfaces as `Conflict` on every
//! backend, including those whose plain writes never detect duplicates.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::deletion::{DeletionPipeline, DeletionReport};
use crate::config::StaticConfig;
use crate::errors::{ErrorKind, Result, ShortenerError};
use crate::storage::{BatchRecord, Storage};
use crate::utils::url_validator::validate_url;
use crate::utils::{Deadline, derive_short_key, is_valid_short_key, render_short_url};

// ============ Request/Response DTOs ============

/// Result of shortening one URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShortenOutcome {
    pub short_key: String,
    pub short_url: String,
    /// The record was already stored; nothing new was written
    pub already_existed: bool,
}

/// One caller-supplied batch item, unvalidated
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchRequestItem {
    pub correlation_id: String,
    pub original_url: String,
}

/// One result per valid batch item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchResult {
    pub correlation_id: String,
    pub short_key: String,
    pub short_url: String,
    pub original_url: String,
}

/// A listed record as shown to its owner
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    pub short_url: String,
    pub original_url: String,
}

// ============ Service ============

/// Budget for a storage liveness check.
const PING_BUDGET: Duration = Duration::from_secs(1);

pub struct ShortUrlService {
    storage: Arc<dyn Storage>,
    base_url: String,
    request_timeout: Duration,
    deletion: DeletionPipeline,
}

impl ShortUrlService {
    pub fn new(storage: Arc<dyn Storage>, config: &StaticConfig) -> Self {
        let deletion = DeletionPipeline::new(Arc::clone(&storage), &config.deletion);
        Self {
            storage,
            base_url: config.server.base_url.clone(),
            request_timeout: config.server.request_timeout(),
            deletion,
        }
    }

    pub fn storage(&self) -> &Arc<dyn Storage> {
        &self.storage
    }

    pub fn short_url(&self, key: &str) -> String {
        render_short_url(&self.base_url, key)
    }

    fn deadline(&self) -> Deadline {
        Deadline::after(self.request_timeout)
    }

    fn outcome(&self, key: String, already_existed: bool) -> ShortenOutcome {
        ShortenOutcome {
            short_url: self.short_url(&key),
            short_key: key,
            already_existed,
        }
    }

    /// Shorten one URL for `owner_id`.
    ///
    /// Submitting a URL that is already stored returns the existing short URL
    /// with `already_existed` set. A key already holding a *different* URL is
    /// a hash collision and fails with `Conflict`.
    pub async fn make_short_url(
        &self,
        owner_id: &str,
        original_url: &str,
    ) -> Result<ShortenOutcome> {
        validate_url(original_url).map_err(|e| {
            ShortenerError::invalid_input(format!("Invalid URL '{}': {}", original_url, e))
        })?;

        let key = derive_short_key(original_url.as_bytes());
        let deadline = self.deadline();

        match self
            .storage
            .write_if_absent(owner_id, &key, original_url, &deadline)
            .await
        {
            Ok(()) => {
                info!("Short link created: {} -> {}", key, original_url);
                Ok(self.outcome(key, false))
            }
            Err(e) if e.is(ErrorKind::Conflict) => {
                self.is_stored(&key, original_url, &deadline).await?;
                debug!("Short link '{}' already existed", key);
                Ok(self.outcome(key, true))
            }
            Err(e) => Err(e),
        }
    }

    /// Whether `key` already maps to `url`.
    ///
    /// `Ok(false)` when the key is free, `Conflict` when it maps elsewhere.
    /// A soft-deleted key counts as stored.
    async fn is_stored(&self, key: &str, url: &str, deadline: &Deadline) -> Result<bool> {
        match self.storage.read(key, deadline).await {
            Ok(stored) if stored == url => Ok(true),
            Ok(stored) => {
                warn!(
                    "Key collision on '{}': stored '{}', submitted '{}'",
                    key, stored, url
                );
                Err(ShortenerError::conflict(format!(
                    "Short key '{}' already maps to a different URL",
                    key
                )))
            }
            Err(e) if e.is(ErrorKind::Gone) => Ok(true),
            Err(e) if e.is(ErrorKind::NotFound) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Resolve a short key. `NotFound` and `Gone` stay distinct.
    pub async fn get_true_url(&self, key: &str) -> Result<String> {
        if key.trim().is_empty() {
            return Err(ShortenerError::invalid_input("Short key is empty"));
        }
        // No derived key has any other shape
        if !is_valid_short_key(key) {
            return Err(ShortenerError::not_found(format!(
                "Short link '{}' not found",
                key
            )));
        }
        self.storage.read(key, &self.deadline()).await
    }

    /// Shorten many URLs in one storage write.
    ///
    /// Invalid items are skipped without failing the batch, so the output may
    /// be shorter than the input. Repeated URLs are written once but every
    /// valid item gets its own result. An item whose key is already taken by a
    /// different URL earlier in the same batch is skipped as well.
    pub async fn make_short_url_batch(
        &self,
        owner_id: &str,
        items: &[BatchRequestItem],
    ) -> Result<Vec<BatchResult>> {
        let mut results = Vec::with_capacity(items.len());
        let mut rows = Vec::with_capacity(items.len());
        let mut seen: HashMap<String, &str> = HashMap::with_capacity(items.len());

        for item in items {
            if let Err(e) = validate_url(&item.original_url) {
                debug!("Batch item '{}' skipped: {}", item.correlation_id, e);
                continue;
            }
            let key = derive_short_key(item.original_url.as_bytes());
            match seen.get(&key) {
                Some(url) if *url == item.original_url => {}
                Some(url) => {
                    warn!(
                        "Batch item '{}' skipped: key '{}' already taken by '{}' in this batch",
                        item.correlation_id, key, url
                    );
                    continue;
                }
                None => {
                    seen.insert(key.clone(), &item.original_url);
                    rows.push(BatchRecord {
                        short_key: key.clone(),
                        original_url: item.original_url.clone(),
                    });
                }
            }
            results.push(BatchResult {
                correlation_id: item.correlation_id.clone(),
                short_url: self.short_url(&key),
                short_key: key,
                original_url: item.original_url.clone(),
            });
        }

        if rows.is_empty() {
            return Ok(results);
        }

        let deadline = self.deadline();
        match self
            .storage
            .write_batch_if_absent(owner_id, &rows, &deadline)
            .await
        {
            Ok(()) => {}
            Err(e) if e.is(ErrorKind::Conflict) => {
                // Some rows were stored before; retry with the new ones only
                let fresh = self.unstored(rows, &deadline).await?;
                if !fresh.is_empty() {
                    self.storage
                        .write_batch_if_absent(owner_id, &fresh, &deadline)
                        .await?;
                }
            }
            Err(e) => return Err(e),
        }

        info!(
            "Batch for '{}': {} of {} items accepted",
            owner_id,
            results.len(),
            items.len()
        );
        Ok(results)
    }

    async fn unstored(
        &self,
        rows: Vec<BatchRecord>,
        deadline: &Deadline,
    ) -> Result<Vec<BatchRecord>> {
        let mut fresh = Vec::with_capacity(rows.len());
        for row in rows {
            if !self
                .is_stored(&row.short_key, &row.original_url, deadline)
                .await?
            {
                fresh.push(row);
            }
        }
        Ok(fresh)
    }

    /// List the owner's live records. Soft-deleted records are not listed.
    pub async fn get_all_records(&self, owner_id: &str) -> Result<Vec<UserRecord>> {
        let records = self
            .storage
            .select_by_owner(owner_id, &self.deadline())
            .await?;
        Ok(records
            .into_iter()
            .filter(|record| !record.deleted)
            .map(|record| UserRecord {
                short_url: self.short_url(&record.short_key),
                original_url: record.original_url,
            })
            .collect())
    }

    /// Check the storage backend is reachable under a short fixed budget.
    pub async fn ping(&self) -> Result<()> {
        self.storage.ping(&Deadline::after(PING_BUDGET)).await
    }

    /// Start deleting `keys` on behalf of `owner_id` and return immediately.
    ///
    /// Only keys owned by `owner_id` are deleted. The handle can be awaited
    /// for the report or dropped.
    pub fn delete_user_urls(
        &self,
        owner_id: &str,
        keys: Vec<String>,
    ) -> JoinHandle<DeletionReport> {
        info!("Queued deletion of {} keys for '{}'", keys.len(), owner_id);
        self.deletion.spawn(owner_id.to_string(), keys)
    }
}
