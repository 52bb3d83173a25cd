//! Owner identity collaborator
//!
//! Resolving who is calling is somebody else's job (a cookie, a token, a CLI
//! flag). The service only ever sees the resulting opaque owner id.

use crate::errors::{Result, ShortenerError};

pub trait OwnerResolver: Send + Sync {
    /// Turn a presented credential into an owner id, or fail `Unauthorized`.
    fn resolve_owner(&self, credential: Option<&str>) -> Result<String>;
}

/// Accepts the presented credential as the owner id, falling back to a fixed
/// owner when nothing is presented.
#[derive(Debug, Clone, Default)]
pub struct FixedOwner {
    fallback: Option<String>,
}

impl FixedOwner {
    pub fn new<T: Into<String>>(owner_id: T) -> Self {
        Self {
            fallback: Some(owner_id.into()),
        }
    }

    /// No fallback: a missing credential is `Unauthorized`.
    pub fn anonymous() -> Self {
        Self::default()
    }
}

impl OwnerResolver for FixedOwner {
    fn resolve_owner(&self, credential: Option<&str>) -> Result<String> {
        credential
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .or_else(|| {
                self.fallback
                    .as_deref()
                    .map(str::trim)
                    .filter(|f| !f.is_empty())
            })
            .map(str::to_string)
            .ok_or_else(|| ShortenerError::unauthorized("No owner identity presented"))
    }
}

/// Mint a fresh opaque owner id for a caller that presented none.
pub fn issue_owner_id() -> String {
    uuid::Uuid::new_v4().to_string()
}
