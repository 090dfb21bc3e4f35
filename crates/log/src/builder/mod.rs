//! Logger builder implementation

#[macro_use]
mod format;

use tracing_subscriber::{EnvFilter, Registry, layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::{Config, Format};
use crate::error::{LogError, LogResult};

/// Logger builder
#[derive(Debug)]
pub struct LoggerBuilder {
    config: Config,
}

/// Returned by a successful initialisation. Holds what was installed;
/// [`LoggerGuard::noop`] stands for "a subscriber was already in place".
#[derive(Debug)]
#[must_use = "the guard reports what was installed"]
pub struct LoggerGuard {
    installed: Option<Format>,
}

impl LoggerBuilder {
    /// Create builder from config
    #[must_use]
    pub fn from_config(config: Config) -> Self {
        Self { config }
    }

    /// Check the filter directives without installing anything.
    pub fn filter(&self) -> LogResult<EnvFilter> {
        EnvFilter::try_new(&self.config.level)
            .map_err(|e| LogError::Filter(format!("{}: {e}", self.config.level)))
    }

    /// Build the subscriber and install it as the global default.
    /// Events go to stderr; stdout is left to the activation protocol.
    pub fn build(self) -> LogResult<LoggerGuard> {
        let filter = self.filter()?;
        let display = &self.config.display;

        let installed = match self.config.format {
            Format::Pretty => {
                init_subscriber!(filter, create_fmt_layer!(pretty, display, std::io::stderr), display)
            }
            Format::Compact => {
                init_subscriber!(filter, create_fmt_layer!(compact, display, std::io::stderr), display)
            }
            Format::Json => {
                init_subscriber!(filter, create_json_layer!(display, std::io::stderr), display)
            }
        };
        installed.map_err(|e| LogError::Init(e.to_string()))?;

        Ok(LoggerGuard {
            installed: Some(self.config.format),
        })
    }
}

impl LoggerGuard {
    pub(crate) fn noop() -> Self {
        Self { installed: None }
    }

    /// The format installed by this call, or `None` if a subscriber was
    /// already set.
    pub fn format(&self) -> Option<Format> {
        self.installed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_directives_are_rejected() {
        let builder = LoggerBuilder::from_config(Config {
            level: "cirrus=notalevel".to_owned(),
            ..Config::default()
        });
        let err = builder.filter().unwrap_err();
        assert!(matches!(err, LogError::Filter(ref msg) if msg.starts_with("cirrus=notalevel")));
    }

    #[test]
    fn directives_with_targets_are_accepted() {
        let builder = LoggerBuilder::from_config(Config {
            level: "info,cirrus_loader=debug,tower_http=warn".to_owned(),
            ..Config::default()
        });
        assert!(builder.filter().is_ok());
    }

    #[test]
    fn noop_guard_installed_nothing() {
        assert_eq!(LoggerGuard::noop().format(), None);
    }
}
