//! SeaORM storage backend
//!
//! Relational implementation of [`Storage`] on SQLite, MySQL/MariaDB or
//! PostgreSQL. Uniqueness of `short_url_key` is enforced by a unique index;
//! multi-row writes and multi-key deletes each run in one transaction.

mod connection;
mod converters;
mod mutations;
mod query;
pub mod retry;

use async_trait::async_trait;
use sea_orm::DatabaseConnection;
use tracing::warn;

use super::{BatchRecord, Record, Storage, StorageConfig};
use crate::config::DatabaseConfig;
use crate::errors::{Result, ShortenerError};
use crate::utils::Deadline;

pub use connection::{connect_generic, connect_sqlite, run_migrations};
pub use converters::{model_to_record, new_active_model};
pub use mutations::is_unique_violation;

/// 从数据库 URL 推断数据库类型
pub fn infer_backend_from_url(database_url: &str) -> Result<String> {
    if database_url.starts_with("sqlite://")
        || database_url.ends_with(".db")
        || database_url.ends_with(".sqlite")
        || database_url == ":memory:"
    {
        Ok("sqlite".to_string())
    } else if database_url.starts_with("mysql://") || database_url.starts_with("mariadb://") {
        Ok("mysql".to_string())
    } else if database_url.starts_with("postgres://") || database_url.starts_with("postgresql://") {
        Ok("postgres".to_string())
    } else {
        Err(ShortenerError::invalid_input(format!(
            "Cannot infer database type from URL: {}. Supported: sqlite://, mysql://, mariadb://, postgres://",
            database_url
        )))
    }
}

/// 规范化 backend 名称
pub fn normalize_backend_name(backend: &str) -> String {
    match backend {
        "mariadb" => "mysql".to_string(),
        other => other.to_string(),
    }
}

/// SeaORM-based storage backend
#[derive(Clone)]
pub struct SeaOrmStorage {
    db: DatabaseConnection,
    backend_name: String,
    retry_config: retry::RetryConfig,
}

impl SeaOrmStorage {
    pub async fn new(
        database_url: &str,
        backend_name: &str,
        config: &DatabaseConfig,
    ) -> Result<Self> {
        if database_url.is_empty() {
            return Err(ShortenerError::invalid_input("database_url is not set"));
        }

        let backend_name = normalize_backend_name(backend_name);
        let retry_config = retry::RetryConfig {
            max_retries: config.retry_count,
            base_delay_ms: config.retry_base_delay_ms,
            max_delay_ms: config.retry_max_delay_ms,
        };

        // 根据不同数据库类型配置连接选项
        let db = if backend_name == "sqlite" {
            connect_sqlite(database_url).await?
        } else {
            connect_generic(database_url, &backend_name, config).await?
        };

        let storage = SeaOrmStorage {
            db,
            backend_name,
            retry_config,
        };

        // 运行迁移（幂等，每次启动都执行）
        run_migrations(&storage.db).await?;

        warn!(
            "{} Storage initialized.",
            storage.backend_name.to_uppercase()
        );
        Ok(storage)
    }

    /// 获取数据库连接
    pub fn get_db(&self) -> &DatabaseConnection {
        &self.db
    }

    pub fn backend_name(&self) -> &str {
        &self.backend_name
    }
}

#[async_trait]
impl Storage for SeaOrmStorage {
    async fn read(&self, key: &str, deadline: &Deadline) -> Result<String> {
        deadline.run("read", self.read_url(key, deadline)).await
    }

    async fn read_owner(&self, key: &str, deadline: &Deadline) -> Result<String> {
        deadline
            .run("read_owner", self.read_owner_id(key, deadline))
            .await
    }

    async fn write(
        &self,
        owner_id: &str,
        key: &str,
        url: &str,
        deadline: &Deadline,
    ) -> Result<()> {
        deadline
            .run("write", self.insert_one(owner_id, key, url, deadline))
            .await
    }

    async fn write_batch(
        &self,
        owner_id: &str,
        records: &[BatchRecord],
        deadline: &Deadline,
    ) -> Result<()> {
        deadline
            .run("write_batch", self.insert_batch(owner_id, records))
            .await
    }

    async fn select_by_owner(&self, owner_id: &str, deadline: &Deadline) -> Result<Vec<Record>> {
        deadline
            .run("select_by_owner", self.list_by_owner(owner_id, deadline))
            .await
    }

    async fn mark_deleted(&self, keys: &[String], deadline: &Deadline) -> Result<()> {
        deadline
            .run("mark_deleted", self.soft_delete(keys))
            .await
            .map(|_| ())
    }

    async fn ping(&self, deadline: &Deadline) -> Result<()> {
        deadline
            .run("ping", async {
                self.db.ping().await.map_err(|e| {
                    ShortenerError::storage_unavailable(format!(
                        "{} ping failed: {}",
                        self.backend_name, e
                    ))
                })
            })
            .await
    }

    fn backend_config(&self) -> StorageConfig {
        StorageConfig {
            storage_type: self.backend_name.clone(),
            supports_ownership_queries: true,
            supports_deletion: true,
            detects_conflicts: true,
        }
    }
}
