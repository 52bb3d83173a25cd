use serde::{Deserialize, Serialize};

/// One stored link.
///
/// `owner_id` is fixed at creation; `deleted` only ever goes from false to true.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub short_key: String,
    pub original_url: String,
    pub owner_id: String,
    #[serde(default)]
    pub deleted: bool,
}

/// A row of a multi-record write; the owner is supplied once per batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchRecord {
    pub short_key: String,
    pub original_url: String,
}

/// What a backend is and which parts of the contract it honours.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct StorageConfig {
    pub storage_type: String,
    /// `select_by_owner` returns real data
    pub supports_ownership_queries: bool,
    /// `mark_deleted` actually flips records
    pub supports_deletion: bool,
    /// `write` reports `Conflict` for an existing key
    pub detects_conflicts: bool,
}
