//! Shared helpers for cmdrun's integration tests.
//!
//! - [`builders`]: in-memory `ConfigFile` / `CommandConfig` construction.
//! - [`recording_sink`]: an `OutputSink` that records every callback.

pub mod builders;
pub mod recording_sink;

use std::future::Future;
use std::sync::Once;
use std::time::Duration;

use tracing_subscriber::{fmt, EnvFilter};

/// Upper bound for any single awaited command in a test.
pub const TEST_TIMEOUT: Duration = Duration::from_secs(5);

static INIT: Once = Once::new();

/// Install a test-writer subscriber once per test binary.
///
/// Reads the same `CMDRUN_LOG` variable as the binary, so
/// `CMDRUN_LOG=cmdrun=debug cargo test -- --nocapture` shows the runner's
/// chunk and settlement logs.
pub fn init_tracing() {
    INIT.call_once(|| {
        let filter =
            EnvFilter::try_from_env("CMDRUN_LOG").unwrap_or_else(|_| EnvFilter::new("cmdrun=info"));

        fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(false)
            .init();
    });
}

/// Await `f`, failing the test if it takes longer than [`TEST_TIMEOUT`].
///
/// Pass `&mut handle` to keep an `ExecutionHandle` usable afterwards.
pub async fn with_timeout<F, T>(f: F) -> T
where
    F: Future<Output = T>,
{
    tokio::time::timeout(TEST_TIMEOUT, f)
        .await
        .unwrap_or_else(|_| panic!("command did not settle within {TEST_TIMEOUT:?}"))
}
