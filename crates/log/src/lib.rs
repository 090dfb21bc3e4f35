//! # Cirrus Log
//!
//! Logging bootstrap for the runtime binaries. Everything else in the
//! workspace only emits `tracing` events; this crate decides where they go.
//!
//! ```no_run
//! let _guard = cirrus_log::auto_init()?;
//! tracing::info!(port = 8080, "server starting");
//! # Ok::<(), cirrus_log::LogError>(())
//! ```
//!
//! Output always goes to stderr.

#![forbid(unsafe_code)]

mod builder;
mod config;
mod error;

pub use builder::{LoggerBuilder, LoggerGuard};
pub use config::{Config, DisplayConfig, Format};
pub use error::{LogError, LogResult};

static TEST_INIT: std::sync::OnceLock<()> = std::sync::OnceLock::new();

/// Pick a configuration from the environment and install it.
///
/// With `CIRRUS_LOG` or `RUST_LOG` set the environment decides; otherwise
/// debug builds get [`Config::development`] and release builds
/// [`Config::production`].
pub fn auto_init() -> LogResult<LoggerGuard> {
    let from_env = std::env::var_os("CIRRUS_LOG").is_some() || std::env::var_os("RUST_LOG").is_some();
    if from_env {
        init_with(Config::from_env())
    } else if cfg!(debug_assertions) {
        init_with(Config::development())
    } else {
        init_with(Config::production())
    }
}

/// Initialize with default configuration
pub fn init() -> LogResult<LoggerGuard> {
    init_with(Config::default())
}

/// Initialize with custom configuration
pub fn init_with(config: Config) -> LogResult<LoggerGuard> {
    LoggerBuilder::from_config(config).build()
}

/// Initialize for tests. Safe to call from every test; only the first call
/// in a process installs anything.
pub fn init_test() -> LoggerGuard {
    let mut guard = None;
    TEST_INIT.get_or_init(|| {
        if !tracing::dispatcher::has_been_set() {
            guard = init_with(Config::test()).ok();
        }
    });
    guard.unwrap_or_else(LoggerGuard::noop)
}
