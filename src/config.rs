//! Configuration types.

use std::path::PathBuf;
use std::time::Duration;

use crate::error::ConfigError;

/// Pacing of the assistant's scripted messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimingConfig {
    /// Minimum "typing" time for any assistant message.
    pub typing_floor: Duration,
    /// Typing time per character of message text.
    pub typing_per_char: Duration,
    /// Pause inserted before every queued assistant message.
    pub message_gap: Duration,
    /// Delay between the final "saved" message and delivering the result.
    pub handoff_delay: Duration,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            typing_floor: Duration::from_millis(1000),
            typing_per_char: Duration::from_millis(25),
            message_gap: Duration::from_millis(500),
            handoff_delay: Duration::from_millis(2000),
        }
    }
}

impl TimingConfig {
    /// Timing with every delay set to zero. Messages still keep their order.
    pub fn instant() -> Self {
        Self {
            typing_floor: Duration::ZERO,
            typing_per_char: Duration::ZERO,
            message_gap: Duration::ZERO,
            handoff_delay: Duration::ZERO,
        }
    }

    /// Same pacing with a different per-character typing speed.
    pub fn with_per_char(mut self, per_char: Duration) -> Self {
        self.typing_per_char = per_char;
        self
    }
}

/// Simulated backend latencies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LatencyConfig {
    pub account: Duration,
    pub vehicle: Duration,
    pub preferences: Duration,
    pub profile: Duration,
    pub sign_in: Duration,
}

impl Default for LatencyConfig {
    fn default() -> Self {
        Self {
            account: Duration::from_millis(3000),
            vehicle: Duration::from_millis(2000),
            preferences: Duration::from_millis(2000),
            profile: Duration::from_millis(1500),
            sign_in: Duration::from_millis(2000),
        }
    }
}

impl LatencyConfig {
    pub fn zero() -> Self {
        Self {
            account: Duration::ZERO,
            vehicle: Duration::ZERO,
            preferences: Duration::ZERO,
            profile: Duration::ZERO,
            sign_in: Duration::ZERO,
        }
    }
}

/// Onboarding configuration.
#[derive(Debug, Clone)]
pub struct OnboardingConfig {
    /// Message pacing shared by all flows.
    pub timing: TimingConfig,
    /// The account flow types a little slower than the others.
    pub account_typing_per_char: Duration,
    /// Simulated backend latencies.
    pub latency: LatencyConfig,
    /// Probability (0.0–1.0) that a simulated save fails.
    pub failure_rate: f64,
    /// Where saved records are written as JSON. `None` keeps them in memory.
    pub data_dir: Option<PathBuf>,
    /// Directory for rolling log files. `None` logs to stderr.
    pub log_dir: Option<PathBuf>,
}

impl Default for OnboardingConfig {
    fn default() -> Self {
        Self {
            timing: TimingConfig::default(),
            account_typing_per_char: Duration::from_millis(30),
            latency: LatencyConfig::default(),
            failure_rate: 0.0,
            data_dir: None,
            log_dir: None,
        }
    }
}

impl OnboardingConfig {
    /// Build from `UMODA_*` environment variables, falling back to defaults.
    ///
    /// - `UMODA_TYPING_FLOOR_MS`, `UMODA_TYPING_PER_CHAR_MS`, `UMODA_MESSAGE_GAP_MS`
    /// - `UMODA_SAVE_LATENCY_MS` (applies to every simulated save and sign-in)
    /// - `UMODA_FAILURE_RATE`
    /// - `UMODA_DATA_DIR`, `UMODA_LOG_DIR`
    /// - `UMODA_FAST=1` disables all delays
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup. Used by `from_env` and tests.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if lookup("UMODA_FAST").is_some_and(|v| v == "1" || v.eq_ignore_ascii_case("true")) {
            config.timing = TimingConfig::instant();
            config.account_typing_per_char = Duration::ZERO;
            config.latency = LatencyConfig::zero();
        }

        if let Some(ms) = parse_millis(&lookup, "UMODA_TYPING_FLOOR_MS")? {
            config.timing.typing_floor = ms;
        }
        if let Some(ms) = parse_millis(&lookup, "UMODA_TYPING_PER_CHAR_MS")? {
            config.timing.typing_per_char = ms;
            config.account_typing_per_char = ms;
        }
        if let Some(ms) = parse_millis(&lookup, "UMODA_MESSAGE_GAP_MS")? {
            config.timing.message_gap = ms;
        }
        if let Some(ms) = parse_millis(&lookup, "UMODA_SAVE_LATENCY_MS")? {
            config.latency = LatencyConfig {
                account: ms,
                vehicle: ms,
                preferences: ms,
                profile: ms,
                sign_in: ms,
            };
        }

        if let Some(raw) = lookup("UMODA_FAILURE_RATE") {
            let rate: f64 = raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
                key: "UMODA_FAILURE_RATE".to_string(),
                message: format!("not a number: {raw}"),
            })?;
            if !(0.0..=1.0).contains(&rate) {
                return Err(ConfigError::InvalidValue {
                    key: "UMODA_FAILURE_RATE".to_string(),
                    message: format!("must be between 0 and 1, got {rate}"),
                });
            }
            config.failure_rate = rate;
        }

        config.data_dir = lookup("UMODA_DATA_DIR")
            .filter(|s| !s.trim().is_empty())
            .map(PathBuf::from);
        config.log_dir = lookup("UMODA_LOG_DIR")
            .filter(|s| !s.trim().is_empty())
            .map(PathBuf::from);

        Ok(config)
    }

    /// Timing used by the account creation flow.
    pub fn account_timing(&self) -> TimingConfig {
        self.timing.with_per_char(self.account_typing_per_char)
    }
}

fn parse_millis<F>(lookup: &F, key: &str) -> Result<Option<Duration>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse::<u64>()
            .map(|ms| Some(Duration::from_millis(ms)))
            .map_err(|_| ConfigError::InvalidValue {
                key: key.to_string(),
                message: format!("expected milliseconds, got {raw}"),
            }),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_match_original_pacing() {
        let config = OnboardingConfig::default();
        assert_eq!(config.timing.typing_floor, Duration::from_millis(1000));
        assert_eq!(config.timing.typing_per_char, Duration::from_millis(25));
        assert_eq!(config.account_timing().typing_per_char, Duration::from_millis(30));
        assert_eq!(config.latency.account, Duration::from_millis(3000));
        assert_eq!(config.latency.profile, Duration::from_millis(1500));
        assert!(config.data_dir.is_none());
    }

    #[test]
    fn empty_lookup_is_default() {
        let config = OnboardingConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.timing, TimingConfig::default());
        assert_eq!(config.failure_rate, 0.0);
    }

    #[test]
    fn fast_mode_zeroes_delays() {
        let config = OnboardingConfig::from_lookup(lookup(&[("UMODA_FAST", "1")])).unwrap();
        assert_eq!(config.timing, TimingConfig::instant());
        assert_eq!(config.latency, LatencyConfig::zero());
    }

    #[test]
    fn overrides_are_applied() {
        let config = OnboardingConfig::from_lookup(lookup(&[
            ("UMODA_TYPING_FLOOR_MS", "200"),
            ("UMODA_SAVE_LATENCY_MS", "10"),
            ("UMODA_FAILURE_RATE", "0.25"),
            ("UMODA_DATA_DIR", "/tmp/umoda"),
        ]))
        .unwrap();
        assert_eq!(config.timing.typing_floor, Duration::from_millis(200));
        assert_eq!(config.latency.sign_in, Duration::from_millis(10));
        assert_eq!(config.failure_rate, 0.25);
        assert_eq!(config.data_dir, Some(PathBuf::from("/tmp/umoda")));
    }

    #[test]
    fn bad_values_are_rejected() {
        let err = OnboardingConfig::from_lookup(lookup(&[("UMODA_MESSAGE_GAP_MS", "soon")]))
            .unwrap_err();
        assert!(err.to_string().contains("UMODA_MESSAGE_GAP_MS"));

        let err =
            OnboardingConfig::from_lookup(lookup(&[("UMODA_FAILURE_RATE", "1.5")])).unwrap_err();
        assert!(err.to_string().contains("between 0 and 1"));
    }
}
