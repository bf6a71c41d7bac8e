//! Bounded retry for operations that lost a serialization race.

use crate::config::RetrySettings;
use crate::errors::Result;
use std::future::Future;
use tracing::warn;

/// Runs `attempt` until it succeeds, fails with a non-retryable error, or the
/// retry budget is spent. Only [`crate::errors::ErrorKind::Concurrency`] errors
/// are retried; each retry waits [`RetrySettings::delay_for`].
pub async fn with_retry<T, F, Fut>(policy: RetrySettings, operation: &str, mut attempt: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut retries = 0;
    loop {
        match attempt().await {
            Err(err) if err.is_retryable() && retries < policy.max_retries => {
                retries += 1;
                let delay = policy.delay_for(retries);
                warn!(
                    operation,
                    retries,
                    delay_ms = delay.as_millis(),
                    "Retrying after concurrency conflict: {err}"
                );
                tokio::time::sleep(delay).await;
            }
            outcome => return outcome,
        }
    }
}
