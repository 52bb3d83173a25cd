//! Ownership-verified bulk soft-delete
//!
//! One pipeline run:
//! 1. every candidate key goes onto the worker pool's bounded queue;
//! 2. workers call `read_owner` and forward keys owned by the requester;
//! 3. the pool's collector gathers them until the join barrier closes the
//!    results channel, or the pipeline deadline elapses;
//! 4. one `mark_deleted` commits whatever was verified.
//!
//! A failed ownership lookup means "not owned". Errors never reach the caller
//! that triggered the run; they end up in the log and in [`DeletionReport`].

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::config::DeletionConfig;
use crate::storage::Storage;
use crate::utils::{Deadline, WorkerPool};

/// What a single pipeline run did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeletionReport {
    /// Candidate keys received
    pub requested: usize,
    /// Distinct keys confirmed as owned by the requester
    pub verified: usize,
    /// The ownership phase was cut short by its deadline
    pub timed_out: bool,
    /// `mark_deleted` succeeded for the verified set
    pub committed: bool,
}

#[derive(Clone)]
pub struct DeletionPipeline {
    storage: Arc<dyn Storage>,
    pool: WorkerPool,
    timeout: Duration,
    commit_timeout: Duration,
}

impl DeletionPipeline {
    pub fn new(storage: Arc<dyn Storage>, config: &DeletionConfig) -> Self {
        Self {
            storage,
            pool: WorkerPool::new(config.workers),
            timeout: config.timeout(),
            commit_timeout: config.commit_timeout(),
        }
    }

    pub fn workers(&self) -> usize {
        self.pool.size()
    }

    /// Launch a run detached from the caller.
    pub fn spawn(&self, owner_id: String, keys: Vec<String>) -> JoinHandle<DeletionReport> {
        let pipeline = self.clone();
        tokio::spawn(async move { pipeline.run(owner_id, keys).await })
    }

    pub async fn run(&self, owner_id: String, keys: Vec<String>) -> DeletionReport {
        let requested = keys.len();
        if !self.storage.backend_config().supports_deletion {
            warn!(
                "Backend '{}' ignores deletion; {} keys will stay live",
                self.storage.backend_config().storage_type,
                requested
            );
        }

        let deadline = Deadline::after(self.timeout);
        let storage = Arc::clone(&self.storage);
        let owner = Arc::new(owner_id);
        let requester = Arc::clone(&owner);

        let report = self
            .pool
            .run(keys, deadline, move |key: String| {
                let storage = Arc::clone(&storage);
                let owner = Arc::clone(&requester);
                async move {
                    match storage.read_owner(&key, &deadline).await {
                        Ok(found) if found == *owner => Some(key),
                        Ok(_) => {
                            debug!("Key '{}' belongs to someone else; skipped", key);
                            None
                        }
                        Err(e) => {
                            debug!("Ownership lookup for '{}' failed: {}; skipped", key, e);
                            None
                        }
                    }
                }
            })
            .await;

        // The same key may be submitted more than once
        let mut seen = HashSet::with_capacity(report.results.len());
        let verified: Vec<String> = report
            .results
            .into_iter()
            .filter(|key| seen.insert(key.clone()))
            .collect();

        let mut summary = DeletionReport {
            requested,
            verified: verified.len(),
            timed_out: !report.finished,
            committed: false,
        };

        if verified.is_empty() {
            info!(
                "Deletion for '{}': none of {} keys verified; nothing to commit",
                owner, requested
            );
            return summary;
        }

        let commit_deadline = Deadline::after(self.commit_timeout);
        match self.storage.mark_deleted(&verified, &commit_deadline).await {
            Ok(()) => {
                summary.committed = true;
                info!(
                    "Deletion for '{}': committed {} of {} keys (timed out: {})",
                    owner, summary.verified, requested, summary.timed_out
                );
            }
            Err(e) => {
                error!(
                    "Deletion for '{}': commit of {} keys failed: {}",
                    owner, summary.verified, e
                );
            }
        }
        summary
    }
}
