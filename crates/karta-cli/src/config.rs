//! Command-line configuration parsed from environment variables.
//!
//! Settings are read from variables prefixed with `KARTA_` and then
//! overridden by command-line flags.

use std::env;
use std::str::FromStr;

use karta::ConfigError;

/// Log level enumeration matching tracing crate levels.
///
/// Defaults to `Warn` so command output stays uncluttered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogLevel {
    /// Most verbose logging, includes all trace spans.
    Trace,
    /// Debug-level information, including every compiled feature.
    Debug,
    /// Standard informational messages.
    Info,
    /// Warning messages for potentially problematic situations.
    #[default]
    Warn,
    /// Error messages for failures.
    Error,
}

impl FromStr for LogLevel {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "trace" => Ok(Self::Trace),
            "debug" => Ok(Self::Debug),
            "info" => Ok(Self::Info),
            "warn" | "warning" => Ok(Self::Warn),
            "error" => Ok(Self::Error),
            _ => Err(ConfigError {
                key: LOG_LEVEL_VAR,
                value: s.to_owned(),
                reason: "expected one of: trace, debug, info, warn, error",
            }),
        }
    }
}

impl LogLevel {
    /// Convert to a tracing filter directive string.
    #[must_use]
    pub fn as_filter_str(&self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

const LOG_LEVEL_VAR: &str = "KARTA_LOG_LEVEL";

/// Configuration for the `karta` command.
///
/// # Environment Variables
///
/// - `KARTA_LOG_LEVEL`: Sets the log level (trace, debug, info, warn, error)
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: LogLevel,
}

impl CliConfig {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if a variable contains an invalid value.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through `lookup` instead of the process
    /// environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if a variable contains an invalid value.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let log_level = match lookup(LOG_LEVEL_VAR) {
            Some(val) => val.parse()?,
            None => LogLevel::default(),
        };
        Ok(Self { log_level })
    }

    /// Apply optional overrides to an existing configuration.
    ///
    /// Command-line flags take precedence over environment-based defaults.
    #[must_use]
    pub fn apply_overrides(mut self, log_level: Option<LogLevel>) -> Self {
        if let Some(level) = log_level {
            self.log_level = level;
        }
        self
    }

    /// Create a new configuration with the specified log level.
    #[must_use]
    pub fn with_log_level(mut self, level: LogLevel) -> Self {
        self.log_level = level;
        self
    }
}

#[cfg(test)]
#[expect(
    clippy::unwrap_used,
    reason = "tests require explicit panic messages for debugging failures"
)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("trace", LogLevel::Trace)]
    #[case("debug", LogLevel::Debug)]
    #[case("INFO", LogLevel::Info)]
    #[case("Warning", LogLevel::Warn)]
    #[case(" error ", LogLevel::Error)]
    fn log_level_parses_valid_values(#[case] text: &str, #[case] expected: LogLevel) {
        assert_eq!(text.parse::<LogLevel>().ok(), Some(expected));
    }

    #[test]
    fn log_level_rejects_invalid_values() {
        let err = "loud".parse::<LogLevel>().unwrap_err();
        assert_eq!(err.key, "KARTA_LOG_LEVEL");
        assert!(err.to_string().contains("expected one of"));
    }

    #[test]
    fn config_reads_the_log_level_variable() {
        let config = CliConfig::from_lookup(|key| {
            (key == "KARTA_LOG_LEVEL").then(|| "debug".to_owned())
        })
        .unwrap();
        assert_eq!(config.log_level, LogLevel::Debug);
        assert_eq!(CliConfig::from_lookup(|_| None).unwrap().log_level, LogLevel::Warn);
        assert!(CliConfig::from_lookup(|_| Some("nope".to_owned())).is_err());
    }

    #[test]
    fn overrides_take_precedence() {
        let config = CliConfig::default().with_log_level(LogLevel::Info);
        assert_eq!(config.clone().apply_overrides(None).log_level, LogLevel::Info);
        assert_eq!(
            config.apply_overrides(Some(LogLevel::Trace)).log_level,
            LogLevel::Trace
        );
    }
}
