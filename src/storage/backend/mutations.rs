//! Mutation operations for SeaOrmStorage
//!
//! This module contains all write database operations.

use sea_orm::{
    ColumnTrait, DatabaseTransaction, DbErr, EntityTrait, QueryFilter, SqlErr, TransactionTrait,
    sea_query::Expr,
};
use tracing::{debug, info, warn};

use super::SeaOrmStorage;
use super::converters::new_active_model;
use super::retry;
use crate::errors::{Result, ShortenerError};
use crate::storage::BatchRecord;
use crate::utils::Deadline;

use migration::entities::shortener;

/// Keys per `IN (...)` clause when soft-deleting.
const DELETE_CHUNK_SIZE: usize = 500;

/// 判断是否为唯一约束冲突
pub fn is_unique_violation(err: &DbErr) -> bool {
    if let Some(SqlErr::UniqueConstraintViolation(_)) = err.sql_err() {
        return true;
    }
    // 回退到字符串匹配
    let msg = err.to_string().to_lowercase();
    msg.contains("unique constraint")
        || msg.contains("duplicate key")
        || msg.contains("duplicate entry")
}

fn classify_write_error(err: DbErr, key: &str) -> ShortenerError {
    if is_unique_violation(&err) {
        ShortenerError::conflict(format!("Short link '{}' already exists", key))
    } else {
        ShortenerError::storage_unavailable(format!("Failed to insert '{}': {}", key, err))
    }
}

async fn rollback(txn: DatabaseTransaction, operation: &str) {
    if let Err(e) = txn.rollback().await {
        warn!("Rollback of {} failed: {}", operation, e);
    }
}

impl SeaOrmStorage {
    pub(super) async fn insert_one(
        &self,
        owner_id: &str,
        key: &str,
        url: &str,
        deadline: &Deadline,
    ) -> Result<()> {
        let db = &self.db;

        retry::with_retry(
            &format!("write({})", key),
            self.retry_config,
            deadline,
            || async {
                shortener::Entity::insert(new_active_model(owner_id, key, url))
                    .exec(db)
                    .await
            },
            |e| classify_write_error(e, key),
        )
        .await?;

        debug!("Short link created: {}", key);
        Ok(())
    }

    /// 批量插入（使用事务）
    ///
    /// The first failing row rolls the whole batch back.
    pub(super) async fn insert_batch(
        &self,
        owner_id: &str,
        records: &[BatchRecord],
    ) -> Result<()> {
        if records.is_empty() {
            return Ok(());
        }

        let txn = self.db.begin().await.map_err(|e| {
            ShortenerError::storage_unavailable(format!("开始事务失败: {}", e))
        })?;

        for row in records {
            let model = new_active_model(owner_id, &row.short_key, &row.original_url);
            let inserted = shortener::Entity::insert(model).exec(&txn).await;
            if let Err(e) = inserted {
                let err = classify_write_error(e, &row.short_key);
                rollback(txn, "write_batch").await;
                return Err(err);
            }
        }

        txn.commit()
            .await
            .map_err(|e| ShortenerError::storage_unavailable(format!("提交事务失败: {}", e)))?;

        info!("Batch inserted {} links", records.len());
        Ok(())
    }

    /// 批量软删除（使用事务）
    ///
    /// Absent keys and already-deleted keys are skipped silently.
    /// Returns the number of rows flipped.
    pub(super) async fn soft_delete(&self, keys: &[String]) -> Result<u64> {
        if keys.is_empty() {
            return Ok(0);
        }

        let txn = self.db.begin().await.map_err(|e| {
            ShortenerError::storage_unavailable(format!("开始事务失败: {}", e))
        })?;

        let mut flipped = 0u64;
        for chunk in keys.chunks(DELETE_CHUNK_SIZE) {
            let result = shortener::Entity::update_many()
                .col_expr(shortener::Column::IsDeleted, Expr::val(true))
                .filter(shortener::Column::ShortUrlKey.is_in(chunk.iter().cloned()))
                .filter(shortener::Column::IsDeleted.eq(false))
                .exec(&txn)
                .await;
            match result {
                Ok(res) => flipped += res.rows_affected,
                Err(e) => {
                    rollback(txn, "mark_deleted").await;
                    return Err(ShortenerError::storage_unavailable(format!(
                        "批量删除失败: {}",
                        e
                    )));
                }
            }
        }

        txn.commit()
            .await
            .map_err(|e| ShortenerError::storage_unavailable(format!("提交事务失败: {}", e)))?;

        info!("Marked {} of {} links deleted", flipped, keys.len());
        Ok(flipped)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ErrorKind;
    use sea_orm::error::RuntimeErr;

    #[test]
    fn test_unique_message_fallback() {
        for msg in [
            "UNIQUE constraint failed: shortener.ShortUrlKey",
            "duplicate key value violates unique constraint \"short_url_key_index\"",
            "Duplicate entry 'cd69b81e' for key 'short_url_key_index'",
        ] {
            let err = DbErr::Exec(RuntimeErr::Internal(msg.to_string()));
            assert!(is_unique_violation(&err), "{}", msg);
        }
    }

    #[test]
    fn test_classify_write_error() {
        let dup = DbErr::Exec(RuntimeErr::Internal(
            "UNIQUE constraint failed: shortener.ShortUrlKey".to_string(),
        ));
        assert_eq!(classify_write_error(dup, "k").kind(), ErrorKind::Conflict);

        let other = DbErr::Conn(RuntimeErr::Internal("connection refused".to_string()));
        assert_eq!(
            classify_write_error(other, "k").kind(),
            ErrorKind::StorageUnavailable
        );
    }
}
