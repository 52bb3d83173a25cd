//! Query operations for SeaOrmStorage
//!
//! This module contains all read-only database operations.

use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, QueryOrder};
use tracing::{debug, error};

use super::converters::model_to_record;
use super::{SeaOrmStorage, retry};
use crate::errors::{Result, ShortenerError};
use crate::storage::Record;
use crate::utils::Deadline;

use migration::entities::shortener;

impl SeaOrmStorage {
    async fn find_by_key(
        &self,
        key: &str,
        deadline: &Deadline,
    ) -> Result<Option<shortener::Model>> {
        let db = &self.db;

        retry::with_retry(
            &format!("find({})", key),
            self.retry_config,
            deadline,
            || async {
                shortener::Entity::find()
                    .filter(shortener::Column::ShortUrlKey.eq(key))
                    .one(db)
                    .await
            },
            |e| {
                error!("查询短链接失败: {}", e);
                ShortenerError::storage_unavailable(format!("Failed to query '{}': {}", key, e))
            },
        )
        .await
    }

    pub(super) async fn read_url(&self, key: &str, deadline: &Deadline) -> Result<String> {
        match self.find_by_key(key, deadline).await? {
            Some(model) if model.is_deleted => Err(ShortenerError::gone(format!(
                "Short link '{}' has been deleted",
                key
            ))),
            Some(model) => Ok(model.full_url),
            None => Err(ShortenerError::not_found(format!(
                "Short link '{}' not found",
                key
            ))),
        }
    }

    /// Owner lookup ignores the deleted flag.
    pub(super) async fn read_owner_id(&self, key: &str, deadline: &Deadline) -> Result<String> {
        self.find_by_key(key, deadline)
            .await?
            .map(|model| model.user_id)
            .ok_or_else(|| ShortenerError::not_found(format!("Short link '{}' not found", key)))
    }

    pub(super) async fn list_by_owner(
        &self,
        owner_id: &str,
        deadline: &Deadline,
    ) -> Result<Vec<Record>> {
        let db = &self.db;

        let models = retry::with_retry(
            &format!("select_by_owner({})", owner_id),
            self.retry_config,
            deadline,
            || async {
                shortener::Entity::find()
                    .filter(shortener::Column::UserId.eq(owner_id))
                    .filter(shortener::Column::IsDeleted.eq(false))
                    .order_by_asc(shortener::Column::ShortUrlKey)
                    .all(db)
                    .await
            },
            |e| {
                ShortenerError::storage_unavailable(format!(
                    "Failed to list links for '{}': {}",
                    owner_id, e
                ))
            },
        )
        .await?;

        debug!("Owner '{}' holds {} live links", owner_id, models.len());
        Ok(models.into_iter().map(model_to_record).collect())
    }
}
