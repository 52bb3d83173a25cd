//! Deletion pipeline tests
//!
//! Ownership filtering over real backends, plus a scripted `Storage` mock for
//! slow lookups, failing lookups and failing commits.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use shortener::config::{DatabaseConfig, DeletionConfig, StaticConfig};
use shortener::errors::{ErrorKind, Result, ShortenerError};
use shortener::services::{DeletionPipeline, DeletionReport, ShortUrlService};
use shortener::storage::{
    BatchRecord, MemoryStorage, Record, SeaOrmStorage, Storage, StorageConfig,
};
use shortener::utils::Deadline;
use tempfile::TempDir;

fn deletion_config(timeout_ms: u64) -> DeletionConfig {
    DeletionConfig {
        workers: 3,
        timeout_ms,
        commit_timeout_ms: 2_000,
    }
}

// =============================================================================
// Scripted storage
// =============================================================================

/// Owners by key. Keys starting with `slow` hang on `read_owner`, keys
/// starting with `broken` fail it.
struct ScriptedStorage {
    owners: HashMap<String, String>,
    commits: Mutex<Vec<Vec<String>>>,
    fail_commit: bool,
}

impl ScriptedStorage {
    fn new(owners: &[(&str, &str)]) -> Self {
        Self {
            owners: owners
                .iter()
                .map(|(k, o)| (k.to_string(), o.to_string()))
                .collect(),
            commits: Mutex::new(Vec::new()),
            fail_commit: false,
        }
    }

    fn failing_commit(mut self) -> Self {
        self.fail_commit = true;
        self
    }

    fn committed_keys(&self) -> Vec<HashSet<String>> {
        self.commits
            .lock()
            .iter()
            .map(|keys| keys.iter().cloned().collect())
            .collect()
    }
}

#[async_trait]
impl Storage for ScriptedStorage {
    async fn read(&self, key: &str, _deadline: &Deadline) -> Result<String> {
        Err(ShortenerError::not_found(key))
    }

    async fn read_owner(&self, key: &str, deadline: &Deadline) -> Result<String> {
        if key.starts_with("slow") {
            deadline
                .run("read_owner", async {
                    tokio::time::sleep(Duration::from_secs(30)).await;
                    Ok(())
                })
                .await?;
        }
        if key.starts_with("broken") {
            return Err(ShortenerError::storage_unavailable("disk on fire"));
        }
        self.owners
            .get(key)
            .cloned()
            .ok_or_else(|| ShortenerError::not_found(key))
    }

    async fn write(&self, _: &str, _: &str, _: &str, _: &Deadline) -> Result<()> {
        Ok(())
    }

    async fn write_batch(&self, _: &str, _: &[BatchRecord], _: &Deadline) -> Result<()> {
        Ok(())
    }

    async fn select_by_owner(&self, _: &str, _: &Deadline) -> Result<Vec<Record>> {
        Ok(Vec::new())
    }

    async fn mark_deleted(&self, keys: &[String], deadline: &Deadline) -> Result<()> {
        deadline.check("mark_deleted")?;
        if self.fail_commit {
            return Err(ShortenerError::storage_unavailable("commit refused"));
        }
        self.commits.lock().push(keys.to_vec());
        Ok(())
    }

    async fn ping(&self, deadline: &Deadline) -> Result<()> {
        deadline.check("ping")
    }

    fn backend_config(&self) -> StorageConfig {
        StorageConfig {
            storage_type: "scripted".into(),
            supports_ownership_queries: true,
            supports_deletion: true,
            detects_conflicts: true,
        }
    }
}

fn keys(list: &[&str]) -> Vec<String> {
    list.iter().map(|k| k.to_string()).collect()
}

fn set(list: &[&str]) -> HashSet<String> {
    list.iter().map(|k| k.to_string()).collect()
}

// =============================================================================
// 所有权过滤
// =============================================================================

#[cfg(test)]
mod ownership_tests {
    use super::*;

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_k1_k2_k3_memory() {
        let storage = Arc::new(MemoryStorage::new());
        let service = ShortUrlService::new(storage.clone(), &StaticConfig::default());

        let k1 = service
            .make_short_url("owner", "https://example.com/1")
            .await
            .unwrap()
            .short_key;
        let k2 = service
            .make_short_url("other", "https://example.com/2")
            .await
            .unwrap()
            .short_key;
        let k3 = service
            .make_short_url("owner", "https://example.com/3")
            .await
            .unwrap()
            .short_key;

        let report = service
            .delete_user_urls("owner", vec![k1.clone(), k2.clone(), k3.clone()])
            .await
            .unwrap();

        assert_eq!(report.verified, 2);
        assert!(report.committed);
        assert_eq!(
            service.get_true_url(&k1).await.unwrap_err().kind(),
            ErrorKind::Gone
        );
        assert_eq!(
            service.get_true_url(&k3).await.unwrap_err().kind(),
            ErrorKind::Gone
        );
        assert_eq!(
            service.get_true_url(&k2).await.unwrap(),
            "https://example.com/2"
        );
        assert!(service.get_all_records("owner").await.unwrap().is_empty());
        assert_eq!(service.get_all_records("other").await.unwrap().len(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_k1_k2_k3_sqlite() {
        let temp_dir = TempDir::new().unwrap();
        let db_url = format!("sqlite://{}?mode=rwc", temp_dir.path().join("test.db").display());
        let storage = Arc::new(
            SeaOrmStorage::new(&db_url, "sqlite", &DatabaseConfig::default())
                .await
                .unwrap(),
        );
        let service = ShortUrlService::new(storage.clone(), &StaticConfig::default());

        let results = service
            .make_short_url_batch(
                "owner",
                &[
                    shortener::services::BatchRequestItem {
                        correlation_id: "1".into(),
                        original_url: "https://example.com/1".into(),
                    },
                    shortener::services::BatchRequestItem {
                        correlation_id: "3".into(),
                        original_url: "https://example.com/3".into(),
                    },
                ],
            )
            .await
            .unwrap();
        let k2 = service
            .make_short_url("other", "https://example.com/2")
            .await
            .unwrap()
            .short_key;

        let candidates = vec![results[0].short_key.clone(), k2.clone(), results[1].short_key.clone()];
        let report = service
            .delete_user_urls("owner", candidates)
            .await
            .unwrap();

        assert_eq!(report.requested, 3);
        assert_eq!(report.verified, 2);
        assert!(report.committed);
        for result in &results {
            assert_eq!(
                service.get_true_url(&result.short_key).await.unwrap_err().kind(),
                ErrorKind::Gone
            );
        }
        assert!(service.get_true_url(&k2).await.is_ok());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_single_commit_with_owned_set() {
        let storage = Arc::new(ScriptedStorage::new(&[
            ("a", "owner"),
            ("b", "other"),
            ("c", "owner"),
            ("d", "owner"),
        ]));
        let pipeline = DeletionPipeline::new(storage.clone(), &deletion_config(5_000));

        let report = pipeline
            .run("owner".into(), keys(&["a", "b", "c", "d", "ghost"]))
            .await;

        assert_eq!(
            report,
            DeletionReport {
                requested: 5,
                verified: 3,
                timed_out: false,
                committed: true,
            }
        );
        assert_eq!(storage.committed_keys(), vec![set(&["a", "c", "d"])]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_lookup_errors_mean_not_owned() {
        let storage = Arc::new(ScriptedStorage::new(&[("a", "owner"), ("broken1", "owner")]));
        let pipeline = DeletionPipeline::new(storage.clone(), &deletion_config(5_000));

        let report = pipeline
            .run("owner".into(), keys(&["broken1", "a", "broken2"]))
            .await;

        assert_eq!(report.verified, 1);
        assert!(report.committed);
        assert_eq!(storage.committed_keys(), vec![set(&["a"])]);
    }
}

// =============================================================================
// 截止时间与提交
// =============================================================================

#[cfg(test)]
mod deadline_tests {
    use super::*;
    use tokio::time::Instant;

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_deadline_commits_partial_results() {
        let storage = Arc::new(ScriptedStorage::new(&[
            ("fast1", "owner"),
            ("slow1", "owner"),
            ("fast2", "owner"),
            ("slow2", "owner"),
            ("fast3", "owner"),
        ]));
        let pipeline = DeletionPipeline::new(storage.clone(), &deletion_config(400));

        let started = Instant::now();
        let report = pipeline
            .run(
                "owner".into(),
                keys(&["fast1", "slow1", "fast2", "slow2", "fast3"]),
            )
            .await;

        assert!(started.elapsed() < Duration::from_secs(5));
        assert!(report.timed_out);
        assert!(report.committed);
        assert_eq!(report.verified, 3);
        // 未验证的 key 不会被删除
        assert_eq!(
            storage.committed_keys(),
            vec![set(&["fast1", "fast2", "fast3"])]
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_nothing_verified_before_deadline() {
        let storage = Arc::new(ScriptedStorage::new(&[("slow1", "owner")]));
        let pipeline = DeletionPipeline::new(storage.clone(), &deletion_config(100));

        let report = pipeline.run("owner".into(), keys(&["slow1"])).await;

        assert!(report.timed_out);
        assert_eq!(report.verified, 0);
        assert!(!report.committed);
        assert!(storage.committed_keys().is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_commit_failure_is_reported_not_raised() {
        let storage = Arc::new(ScriptedStorage::new(&[("a", "owner")]).failing_commit());
        let pipeline = DeletionPipeline::new(storage.clone(), &deletion_config(5_000));

        let report = pipeline.run("owner".into(), keys(&["a"])).await;

        assert_eq!(report.verified, 1);
        assert!(!report.committed);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_delete_returns_before_pipeline_finishes() {
        let storage = Arc::new(ScriptedStorage::new(&[("a", "owner"), ("slow1", "owner")]));
        let mut config = StaticConfig::default();
        config.deletion = deletion_config(300);
        let service = ShortUrlService::new(storage.clone(), &config);

        let started = Instant::now();
        let handle = service.delete_user_urls("owner", keys(&["a", "slow1"]));
        assert!(started.elapsed() < Duration::from_millis(100));
        assert!(!handle.is_finished());

        let report = handle.await.unwrap();
        assert!(report.timed_out);
        assert_eq!(storage.committed_keys(), vec![set(&["a"])]);
    }

    #[tokio::test]
    async fn test_empty_candidate_list() {
        let storage = Arc::new(ScriptedStorage::new(&[]));
        let pipeline = DeletionPipeline::new(storage.clone(), &deletion_config(1_000));

        let report = pipeline.run("owner".into(), Vec::new()).await;

        assert_eq!(report, DeletionReport::default());
        assert!(storage.committed_keys().is_empty());
    }
}
