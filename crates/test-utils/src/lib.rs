//! Shared fixtures for the stackrun integration tests: module and stack
//! builders, a scripted [`fake_runner::FakeRunner`] standing in for the
//! terraform process, and tracing/timeout helpers.

pub mod builders;
pub mod fake_runner;

use std::sync::Once;
use tracing_subscriber::{EnvFilter, fmt};

use stackrun::logging::LOG_ENV_VAR;

static INIT: Once = Once::new();

/// Route engine and scheduler logs into the test harness.
///
/// Reads the same `STACKRUN_LOG` filter as the binary and defaults to
/// `info`. Output is captured per test and only shown for failures, so
/// `STACKRUN_LOG=stackrun::engine=debug cargo test -- --nocapture` is the
/// way to watch group barriers and slot acquisition live.
pub fn init_tracing() {
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_env(LOG_ENV_VAR).unwrap_or_else(|_| EnvFilter::new("info"));

        fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(true)
            .init();
    });
}

/// Fail the test if `f` has not finished within 5 seconds.
///
/// Fake runner delays are tens of milliseconds, so hitting this means a
/// group barrier or semaphore never released rather than a slow machine.
pub async fn with_timeout<F, T>(f: F) -> T
where
    F: std::future::Future<Output = T>,
{
    tokio::time::timeout(std::time::Duration::from_secs(5), f)
        .await
        .expect("Test timed out after 5 seconds")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn with_timeout_passes_the_value_through() {
        init_tracing();
        assert_eq!(with_timeout(async { 7 }).await, 7);
    }
}
