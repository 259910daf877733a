//! Runtime configuration parsed from environment variables.
//!
//! All settings can be overridden via environment variables prefixed with
//! `KARTA_`, and again programmatically through the `with_*` builders.

use std::env;

use thiserror::Error;

/// Default number of event listener worker threads.
const DEFAULT_LISTENER_WORKERS: usize = 2;

/// Default capacity of the pending listener event queue.
const DEFAULT_LISTENER_QUEUE: usize = 256;

/// An environment variable holds a value that cannot be used.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid value '{value}' for {key}: {reason}")]
pub struct ConfigError {
    /// Variable name.
    pub key: &'static str,
    /// Raw value.
    pub value: String,
    /// What was expected instead.
    pub reason: &'static str,
}

/// Configuration for a [`Runtime`](crate::execution::Runtime).
///
/// # Environment Variables
///
/// - `KARTA_SEED`: seed of the random source, for replaying a run
/// - `KARTA_LISTENER_WORKERS`: event listener worker threads (at least 1)
/// - `KARTA_LISTENER_QUEUE`: capacity of the pending event queue (at least 1)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeConfig {
    /// Seed of the random source; drawn from entropy when unset.
    pub seed: Option<u64>,
    /// Event listener worker threads.
    pub listener_workers: usize,
    /// Capacity of the pending event queue.
    pub listener_queue: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            seed: None,
            listener_workers: DEFAULT_LISTENER_WORKERS,
            listener_queue: DEFAULT_LISTENER_QUEUE,
        }
    }
}

impl RuntimeConfig {
    /// Load configuration from environment variables, falling back to
    /// defaults for missing values.
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
    /// See [`RuntimeConfig::from_env`].
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let seed = lookup("KARTA_SEED")
            .map(|value| parse("KARTA_SEED", value, "expected an unsigned 64-bit integer"))
            .transpose()?;
        let listener_workers = lookup("KARTA_LISTENER_WORKERS")
            .map(|value| positive("KARTA_LISTENER_WORKERS", value))
            .transpose()?
            .unwrap_or(defaults.listener_workers);
        let listener_queue = lookup("KARTA_LISTENER_QUEUE")
            .map(|value| positive("KARTA_LISTENER_QUEUE", value))
            .transpose()?
            .unwrap_or(defaults.listener_queue);
        Ok(Self {
            seed,
            listener_workers,
            listener_queue,
        })
    }

    /// Use a fixed seed.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Set the listener worker count, clamped to at least one.
    #[must_use]
    pub fn with_listener_workers(mut self, workers: usize) -> Self {
        self.listener_workers = workers.max(1);
        self
    }

    /// Set the pending event queue capacity, clamped to at least one.
    #[must_use]
    pub fn with_listener_queue(mut self, capacity: usize) -> Self {
        self.listener_queue = capacity.max(1);
        self
    }
}

fn parse<T: std::str::FromStr>(
    key: &'static str,
    value: String,
    reason: &'static str,
) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError { key, value, reason })
}

fn positive(key: &'static str, value: String) -> Result<usize, ConfigError> {
    const REASON: &str = "expected a positive integer";
    match parse::<usize>(key, value.clone(), REASON)? {
        0 => Err(ConfigError {
            key,
            value,
            reason: REASON,
        }),
        n => Ok(n),
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

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let pairs: Vec<(String, String)> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        move |key| pairs.iter().find(|(k, _)| k == key).map(|(_, v)| v.clone())
    }

    #[test]
    fn defaults_apply_when_unset() {
        let config = RuntimeConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, RuntimeConfig::default());
        assert_eq!(config.listener_workers, 2);
        assert_eq!(config.listener_queue, 256);
    }

    #[test]
    fn reads_every_variable() {
        let config = RuntimeConfig::from_lookup(lookup(&[
            ("KARTA_SEED", "42"),
            ("KARTA_LISTENER_WORKERS", " 4 "),
            ("KARTA_LISTENER_QUEUE", "8"),
        ]))
        .unwrap();
        assert_eq!(config.seed, Some(42));
        assert_eq!(config.listener_workers, 4);
        assert_eq!(config.listener_queue, 8);
    }

    #[rstest]
    #[case("KARTA_SEED", "-1")]
    #[case("KARTA_LISTENER_WORKERS", "0")]
    #[case("KARTA_LISTENER_QUEUE", "many")]
    fn rejects_invalid_values(#[case] key: &str, #[case] value: &str) {
        let err = RuntimeConfig::from_lookup(lookup(&[(key, value)])).unwrap_err();
        assert_eq!(err.key, key);
        assert!(err.to_string().contains(value));
    }

    #[test]
    fn builders_clamp_to_one() {
        let config = RuntimeConfig::default()
            .with_seed(7)
            .with_listener_workers(0)
            .with_listener_queue(0);
        assert_eq!(config.seed, Some(7));
        assert_eq!(config.listener_workers, 1);
        assert_eq!(config.listener_queue, 1);
    }
}
