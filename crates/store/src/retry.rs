//! Retry logic for idempotent store reads.
//!
//! Wraps read operations with exponential backoff using the `backon` crate.
//! Only reads go through here: workflow writes execute exactly once and rely
//! on the audit cycle for convergence.

use std::future::Future;

use backon::{ExponentialBuilder, Retryable};

use crate::{config::RetryPolicy, error::StoreError};

/// Executes an idempotent read with retry on transient failures.
///
/// The operation is retried according to the policy whenever it fails with a
/// retryable error (as determined by [`StoreError::is_retryable`]);
/// non-retryable errors return immediately.
pub(crate) async fn with_read_retry<F, Fut, T>(
    policy: &RetryPolicy,
    op_name: &'static str,
    operation: F,
) -> Result<T, StoreError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, StoreError>>,
{
    // backon's max_times counts retries, not total attempts
    let max_retries = policy.max_attempts.saturating_sub(1) as usize;

    let backoff = ExponentialBuilder::new()
        .with_min_delay(policy.initial_backoff)
        .with_max_delay(policy.max_backoff)
        .with_factor(policy.multiplier)
        .with_max_times(max_retries);

    operation
        .retry(backoff)
        .sleep(tokio::time::sleep)
        .when(|e: &StoreError| e.is_retryable())
        .notify(|err: &StoreError, dur: std::time::Duration| {
            tracing::debug!(
                op = op_name,
                backoff_ms = dur.as_millis() as u64,
                error = %err,
                "retrying store read after backoff"
            );
        })
        .await
}
