//! Cancellation budget passed down every blocking call
//!
//! A `Deadline` is created once per request (or per deletion pipeline run) and
//! handed by reference to every storage operation. Blocking boundaries either
//! `check` it before doing work or `run` their future under it.

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;
use tracing::debug;

use crate::errors::{Result, ShortenerError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Deadline {
    at: Instant,
}

impl Deadline {
    /// A deadline `budget` from now.
    pub fn after(budget: Duration) -> Self {
        Self {
            at: Instant::now() + budget,
        }
    }

    pub(crate) fn instant(&self) -> Instant {
        self.at
    }

    /// Time left before the deadline, zero once elapsed.
    pub fn remaining(&self) -> Duration {
        self.at.saturating_duration_since(Instant::now())
    }

    pub fn is_expired(&self) -> bool {
        Instant::now() >= self.at
    }

    /// Fail with `Timeout` if the deadline has already elapsed.
    pub fn check(&self, operation: &str) -> Result<()> {
        if self.is_expired() {
            debug!("Deadline elapsed before '{}' started", operation);
            return Err(ShortenerError::timeout(format!(
                "{} exceeded its deadline",
                operation
            )));
        }
        Ok(())
    }

    /// Drive `fut` to completion unless the deadline elapses first.
    pub async fn run<T, F>(&self, operation: &str, fut: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        match tokio::time::timeout_at(self.at, fut).await {
            Ok(result) => result,
            Err(_) => {
                debug!("Operation '{}' cut short by deadline", operation);
                Err(ShortenerError::timeout(format!(
                    "{} exceeded its deadline",
                    operation
                )))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ErrorKind;

    #[tokio::test]
    async fn test_run_completes_within_budget() {
        let deadline = Deadline::after(Duration::from_secs(5));
        let value = deadline.run("quick", async { Ok(42) }).await.unwrap();
        assert_eq!(value, 42);
        assert!(!deadline.is_expired());
        assert!(deadline.remaining() > Duration::ZERO);
    }

    #[tokio::test]
    async fn test_run_times_out() {
        let deadline = Deadline::after(Duration::from_millis(20));
        let err = deadline
            .run("slow", async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok(())
            })
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Timeout);
        assert!(err.message().contains("slow"));
    }

    #[tokio::test]
    async fn test_inner_error_passes_through() {
        let deadline = Deadline::after(Duration::from_secs(5));
        let err = deadline
            .run::<(), _>("lookup", async { Err(ShortenerError::not_found("k")) })
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_check_after_expiry() {
        let deadline = Deadline::after(Duration::ZERO);
        assert!(deadline.is_expired());
        assert_eq!(deadline.remaining(), Duration::ZERO);
        assert_eq!(deadline.check("read").unwrap_err().kind(), ErrorKind::Timeout);
    }
}
