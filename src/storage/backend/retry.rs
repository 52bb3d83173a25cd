//! Bounded retries for relational store calls
//!
//! A failed call is retried only when two things hold: the caller's own
//! classification of the error is `StorageUnavailable` (so a unique violation
//! mapped to `Conflict` is never retried), and the driver error looks
//! transient. Backoff is exponential with up to 25% jitter and never sleeps
//! past the caller's [`Deadline`].

use std::future::Future;
use std::time::Duration;

use rand::RngExt;
use sea_orm::DbErr;
use sea_orm::error::RuntimeErr;
use tracing::{debug, warn};

use crate::errors::{ErrorKind, Result, ShortenerError};
use crate::utils::Deadline;

/// SQLSTATE / vendor codes worth another attempt.
const TRANSIENT_CODES: &[(&str, &str)] = &[
    ("1213", "deadlock"),              // MySQL
    ("1205", "lock wait timeout"),     // MySQL
    ("40001", "serialization failure"), // PostgreSQL
    ("40P01", "deadlock"),             // PostgreSQL
    ("5", "database busy"),            // SQLite BUSY
    ("6", "table locked"),             // SQLite LOCKED
];

/// Message fragments used when the driver gives no code.
const TRANSIENT_MESSAGES: &[(&str, &str)] = &[
    ("deadlock", "deadlock"),
    ("lock wait timeout", "lock wait timeout"),
    ("database is locked", "database busy"),
    ("serialization failure", "serialization failure"),
];

#[derive(Debug, Clone, Copy)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay_ms: 100,
            max_delay_ms: 2000,
        }
    }
}

/// Why `err` is worth retrying, or `None` if it is not.
pub fn transient_cause(err: &DbErr) -> Option<&'static str> {
    match err {
        DbErr::ConnectionAcquire(_) => Some("connection pool exhausted"),
        DbErr::Conn(_) => Some("connection lost"),
        DbErr::Exec(runtime) | DbErr::Query(runtime) => runtime_cause(runtime),
        _ => None,
    }
}

fn runtime_cause(err: &RuntimeErr) -> Option<&'static str> {
    if let RuntimeErr::SqlxError(sqlx_err) = err
        && let Some(code) = sqlx_err.as_database_error().and_then(|db| db.code())
    {
        return TRANSIENT_CODES
            .iter()
            .find(|(known, _)| *known == code.as_ref())
            .map(|(_, cause)| *cause);
    }
    let message = err.to_string().to_lowercase();
    TRANSIENT_MESSAGES
        .iter()
        .find(|(fragment, _)| message.contains(fragment))
        .map(|(_, cause)| *cause)
}

/// Run `operation` until it succeeds, fails for good, or the budget runs out.
///
/// `classify` turns the final `DbErr` into the crate error handed back to the
/// caller; it also decides retryability, since only `StorageUnavailable` is
/// retried.
pub async fn with_retry<T, F, Fut, C>(
    operation_name: &str,
    config: RetryConfig,
    deadline: &Deadline,
    mut operation: F,
    classify: C,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = std::result::Result<T, DbErr>>,
    C: Fn(DbErr) -> ShortenerError,
{
    let mut attempt = 0;
    loop {
        deadline.check(operation_name)?;

        let db_err = match operation().await {
            Ok(value) => {
                if attempt > 0 {
                    debug!("'{}' succeeded after {} retries", operation_name, attempt);
                }
                return Ok(value);
            }
            Err(e) => e,
        };

        let cause = transient_cause(&db_err);
        let err = classify(db_err);
        let Some(cause) = cause.filter(|_| err.is(ErrorKind::StorageUnavailable)) else {
            return Err(err);
        };
        if attempt >= config.max_retries {
            warn!(
                "'{}' still failing after {} retries ({}): {}",
                operation_name, attempt, cause, err
            );
            return Err(err);
        }

        attempt += 1;
        let delay = backoff(attempt, config);
        if delay >= deadline.remaining() {
            warn!(
                "'{}' failed ({}); no budget left for retry {}",
                operation_name, cause, attempt
            );
            return Err(err);
        }
        warn!(
            "'{}' failed ({}), retry {}/{} in {:?}",
            operation_name, cause, attempt, config.max_retries, delay
        );
        tokio::time::sleep(delay).await;
    }
}

/// Delay before retry number `attempt` (1-based).
fn backoff(attempt: u32, config: RetryConfig) -> Duration {
    let exp = config
        .base_delay_ms
        .saturating_mul(2u64.saturating_pow(attempt.saturating_sub(1)));
    let capped = exp.min(config.max_delay_ms);
    let jitter = rand::rng().random_range(0..=capped / 4);
    Duration::from_millis(capped.saturating_add(jitter))
}
