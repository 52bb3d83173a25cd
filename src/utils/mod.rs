pub mod deadline;
pub mod short_key;
pub mod url_validator;
pub mod worker_pool;

pub use deadline::Deadline;
pub use short_key::{SHORT_KEY_LEN, derive_short_key, is_valid_short_key};
pub use worker_pool::{PoolReport, WorkerPool};

/// Render the public short URL for a key under the configured base URL.
pub fn render_short_url(base_url: &str, key: &str) -> String {
    format!("{}/{}", base_url.trim_end_matches('/'), key)
}
