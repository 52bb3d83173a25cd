//! Service layer for business logic
//!
//! The service owns no storage of its own: a single `Arc<dyn Storage>` is
//! built once at startup and injected here.

pub mod deletion;
pub mod identity;
mod short_url;

pub use deletion::{DeletionPipeline, DeletionReport};
pub use identity::{FixedOwner, OwnerResolver, issue_owner_id};
pub use short_url::*;
