//! Test assertion helpers.
//!
//! Provides polling-based assertions for async test scenarios.

use std::time::Duration;

use tokio::time::{Instant, sleep};

/// Default polling interval for [`assert_eventually`].
const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Polls a condition until it returns true or the timeout expires.
///
/// This is useful for testing background jobs where the exact timing is
/// non-deterministic. It avoids flaky tests that use fixed sleeps.
///
/// # Arguments
///
/// * `timeout` - Maximum wait duration
/// * `condition` - Closure returning `true` when the expected state holds
///
/// # Returns
///
/// `true` if the condition became true before timeout, `false` otherwise.
pub async fn assert_eventually<F>(timeout: Duration, condition: F) -> bool
where
    F: Fn() -> bool,
{
    let start = Instant::now();

    while start.elapsed() < timeout {
        if condition() {
            return true;
        }
        sleep(DEFAULT_POLL_INTERVAL).await;
    }

    // Final check after timeout
    condition()
}
