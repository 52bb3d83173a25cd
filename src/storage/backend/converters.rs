use crate::storage::Record;
use migration::entities::shortener;

/// 将 Sea-ORM Model 转换为 Record
pub fn model_to_record(model: shortener::Model) -> Record {
    Record {
        short_key: model.short_url_key,
        original_url: model.full_url,
        owner_id: model.user_id,
        deleted: model.is_deleted,
    }
}

/// 构建新记录的 ActiveModel，id 由数据库生成
pub fn new_active_model(owner_id: &str, key: &str, url: &str) -> shortener::ActiveModel {
    use sea_orm::ActiveValue::*;

    shortener::ActiveModel {
        id: NotSet,
        user_id: Set(owner_id.to_string()),
        full_url: Set(url.to_string()),
        short_url_key: Set(key.to_string()),
        is_deleted: Set(false),
    }
}
