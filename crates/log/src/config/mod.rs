//! Configuration types

mod presets;

use serde::{Deserialize, Serialize};

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Filter directives (e.g., "info", "debug,cirrus_json=trace")
    pub level: String,

    /// Output format
    pub format: Format,

    /// Display configuration
    pub display: DisplayConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            level: "info".to_owned(),
            format: Format::Compact,
            display: DisplayConfig::default(),
        }
    }
}

/// Output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    /// Human-readable, multi-line
    Pretty,
    /// Single line per event
    Compact,
    /// One JSON object per event
    Json,
}

impl Format {
    /// Parse a format name. Unknown names fall back to [`Format::Compact`].
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "pretty" => Self::Pretty,
            "json" => Self::Json,
            _ => Self::Compact,
        }
    }
}

/// Display configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    /// Show timestamps
    pub time: bool,
    /// Show source location (file:line)
    pub source: bool,
    /// Show target module
    pub target: bool,
    /// Use ANSI colors
    pub colors: bool,
    /// Flatten JSON events
    pub flatten: bool,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            time: true,
            source: false,
            target: true,
            colors: false,
            flatten: false,
        }
    }
}

impl DisplayConfig {
    /// Apply `CIRRUS_LOG_TIME`, `CIRRUS_LOG_SOURCE` and `CIRRUS_LOG_COLORS`
    /// overrides.
    pub(crate) fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(time) = var("CIRRUS_LOG_TIME").as_deref().and_then(parse_bool) {
            self.time = time;
        }
        if let Some(source) = var("CIRRUS_LOG_SOURCE").as_deref().and_then(parse_bool) {
            self.source = source;
        }
        if let Some(colors) = var("CIRRUS_LOG_COLORS").as_deref().and_then(parse_bool) {
            self.colors = colors;
        }
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("pretty", Format::Pretty)]
    #[case("JSON", Format::Json)]
    #[case(" compact ", Format::Compact)]
    #[case("logfmt", Format::Compact)]
    #[case("", Format::Compact)]
    fn format_names(#[case] name: &str, #[case] expected: Format) {
        assert_eq!(Format::from_name(name), expected);
    }

    #[test]
    fn display_overrides_ignore_garbage() {
        let mut display = DisplayConfig::default();
        display.apply_env(|key| match key {
            "CIRRUS_LOG_TIME" => Some("off".into()),
            "CIRRUS_LOG_SOURCE" => Some("maybe".into()),
            "CIRRUS_LOG_COLORS" => Some("1".into()),
            _ => None,
        });
        assert!(!display.time);
        assert!(!display.source);
        assert!(display.colors);
    }
}
