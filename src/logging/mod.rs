//! Logging: console formatting, the per-command log file, the run summary
//! and buffering for resources reconciled in parallel.
//!
//! ```text
//! Log::{stage, info, debug, trace, warn, error}
//!   ├─ Logger       ─▶ tracing event ─▶ console (ProvisionFormatter)
//!   │                                 └▶ $XDG_CACHE_HOME/provision/<cmd>.log (FileLayer)
//!   └─ BufferedLog  ─▶ held per resource, replayed through Logger on completion
//! ```

mod buffered;
mod logger;
mod subscriber;
mod types;
mod utils;

pub use buffered::BufferedLog;
pub use logger::Logger;
pub use subscriber::init_subscriber;
pub use types::{Level, Log, STAGE_TARGET, StepEntry, StepStatus, Summary, TRACE_TARGET};

/// Serializes `XDG_CACHE_HOME` manipulation across parallel test threads.
#[cfg(test)]
static TEST_ENV_MUTEX: std::sync::Mutex<()> = std::sync::Mutex::new(());

/// Run `f` with `XDG_CACHE_HOME` pointing at `dir`.
#[cfg(test)]
#[allow(unsafe_code)]
pub(crate) fn with_cache_home<T>(dir: &std::path::Path, f: impl FnOnce() -> T) -> T {
    let _lock = TEST_ENV_MUTEX
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner);
    // SAFETY: every test that touches XDG_CACHE_HOME holds TEST_ENV_MUTEX.
    unsafe {
        std::env::set_var("XDG_CACHE_HOME", dir);
    }
    let out = f();
    // SAFETY: still holding TEST_ENV_MUTEX.
    unsafe {
        std::env::remove_var("XDG_CACHE_HOME");
    }
    out
}

/// A [`Logger`] whose events go to a log file in a fresh temporary cache
/// directory through a thread-local subscriber.
///
/// Keep the returned guard alive for the duration of the test; dropping it
/// restores the previous thread-local dispatcher.
#[cfg(test)]
#[allow(clippy::expect_used)]
pub(crate) fn isolated_logger() -> (Logger, tempfile::TempDir, tracing::dispatcher::DefaultGuard) {
    use tracing_subscriber::{Layer as _, filter::LevelFilter, layer::SubscriberExt as _};

    let tmp = tempfile::tempdir().expect("create temp cache dir");
    let (file_layer, log) = with_cache_home(tmp.path(), || {
        (subscriber::FileLayer::new("test"), Logger::new("test"))
    });
    let file_layer = file_layer.expect("open test log file");
    let subscriber =
        tracing_subscriber::registry().with(file_layer.with_filter(LevelFilter::DEBUG));
    let guard = tracing::dispatcher::set_default(&tracing::Dispatch::new(subscriber));
    (log, tmp, guard)
}
