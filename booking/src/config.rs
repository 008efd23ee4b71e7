//! Configuration management for the booking front end.
//!
//! Loads configuration from environment variables with sensible defaults.

use crate::catalog;
use crate::error::ConfigError;
use crate::types::ResortId;
use resort_booking_core::environment::DelayWindow;
use resort_booking_runtime::retry::RetryPolicy;
use serde::{Deserialize, Serialize};
use std::env;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Whether a guest has to be signed in to select a room
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SelectionPolicy {
    /// Anyone browsing can reserve
    #[default]
    AllowGuests,
    /// Room selection requires a current user
    RequireSignIn,
}

impl FromStr for SelectionPolicy {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "allow-guests" => Ok(Self::AllowGuests),
            "require-sign-in" => Ok(Self::RequireSignIn),
            other => Err(format!(
                "expected allow-guests or require-sign-in, got {other}"
            )),
        }
    }
}

impl fmt::Display for SelectionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AllowGuests => f.write_str("allow-guests"),
            Self::RequireSignIn => f.write_str("require-sign-in"),
        }
    }
}

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingConfig {
    /// Feedback prompt and sink configuration
    pub feedback: FeedbackConfig,
    /// Reservation configuration
    pub reservation: ReservationConfig,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
}

/// Feedback prompt and sink configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedbackConfig {
    /// Shortest wait between a confirmation and the prompt, in milliseconds
    pub delay_min_ms: u64,
    /// Longest wait between a confirmation and the prompt, in milliseconds
    pub delay_max_ms: u64,
    /// Free-text cap in characters (0 = unbounded)
    pub text_limit: usize,
    /// Timeout of a single sink call in seconds
    pub sink_timeout_secs: u64,
    /// Retries after a failed sink call (at most 1)
    pub sink_retries: usize,
    /// Base URL of a REST document store; in-memory sink when unset
    pub sink_url: Option<String>,
}

/// Reservation configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReservationConfig {
    /// Sign-in gate for room selection
    pub selection_policy: SelectionPolicy,
    /// Resort whose rooms are offered
    pub resort_id: String,
}

impl Default for BookingConfig {
    fn default() -> Self {
        Self {
            feedback: FeedbackConfig {
                delay_min_ms: 3_000,
                delay_max_ms: 6_000,
                text_limit: 500,
                sink_timeout_secs: 10,
                sink_retries: 1,
                sink_url: None,
            },
            reservation: ReservationConfig {
                selection_policy: SelectionPolicy::AllowGuests,
                resort_id: catalog::DEFAULT_RESORT.to_string(),
            },
            log_level: "info".to_string(),
        }
    }
}

impl BookingConfig {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when a variable is set but cannot be
    /// parsed.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup.
    ///
    /// Unset keys fall back to [`BookingConfig::default`].
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when a value cannot be parsed.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        Ok(Self {
            feedback: FeedbackConfig {
                delay_min_ms: parsed(&lookup, "FEEDBACK_DELAY_MIN_MS", defaults.feedback.delay_min_ms)?,
                delay_max_ms: parsed(&lookup, "FEEDBACK_DELAY_MAX_MS", defaults.feedback.delay_max_ms)?,
                text_limit: parsed(&lookup, "FEEDBACK_TEXT_LIMIT", defaults.feedback.text_limit)?,
                sink_timeout_secs: parsed(
                    &lookup,
                    "FEEDBACK_SINK_TIMEOUT_SECS",
                    defaults.feedback.sink_timeout_secs,
                )?,
                sink_retries: parsed(&lookup, "FEEDBACK_SINK_RETRIES", defaults.feedback.sink_retries)?,
                sink_url: lookup("FEEDBACK_SINK_URL").filter(|url| !url.trim().is_empty()),
            },
            reservation: ReservationConfig {
                selection_policy: parsed(
                    &lookup,
                    "ROOM_SELECTION_POLICY",
                    defaults.reservation.selection_policy,
                )?,
                resort_id: lookup("RESORT_ID").unwrap_or(defaults.reservation.resort_id),
            },
            log_level: lookup("LOG_LEVEL").unwrap_or(defaults.log_level),
        })
    }

    /// Check values that parse but cannot be used together.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] for a zero sink timeout, more than
    /// one sink retry, an inverted delay window, or a resort that is unknown
    /// or closed for bookings.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let feedback = &self.feedback;

        if feedback.delay_min_ms > feedback.delay_max_ms {
            return Err(invalid(
                "FEEDBACK_DELAY_MIN_MS",
                feedback.delay_min_ms,
                "must not exceed FEEDBACK_DELAY_MAX_MS",
            ));
        }
        if feedback.sink_timeout_secs == 0 {
            return Err(invalid("FEEDBACK_SINK_TIMEOUT_SECS", 0, "must be positive"));
        }
        if feedback.sink_retries > 1 {
            return Err(invalid(
                "FEEDBACK_SINK_RETRIES",
                feedback.sink_retries,
                "at most one retry is allowed",
            ));
        }
        match catalog::resort(&ResortId::new(self.reservation.resort_id.as_str())) {
            None => Err(invalid(
                "RESORT_ID",
                &self.reservation.resort_id,
                "not a listed resort",
            )),
            Some(resort) if !resort.available => Err(invalid(
                "RESORT_ID",
                &self.reservation.resort_id,
                "resort does not take bookings",
            )),
            Some(_) => Ok(()),
        }
    }

    /// Window the feedback prompt delay is drawn from
    #[must_use]
    pub fn feedback_delay(&self) -> DelayWindow {
        DelayWindow::from_millis(self.feedback.delay_min_ms, self.feedback.delay_max_ms)
    }

    /// Free-text cap, `None` when unbounded
    #[must_use]
    pub const fn text_limit(&self) -> Option<usize> {
        match self.feedback.text_limit {
            0 => None,
            limit => Some(limit),
        }
    }

    /// Retry policy for sink calls
    #[must_use]
    pub fn sink_retry(&self) -> RetryPolicy {
        RetryPolicy::builder()
            .max_retries(self.feedback.sink_retries)
            .attempt_timeout(Duration::from_secs(self.feedback.sink_timeout_secs))
            .build()
    }
}

fn parsed<T, F>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|error: T::Err| ConfigError::Invalid {
            key,
            value: raw.clone(),
            reason: error.to_string(),
        }),
    }
}

fn invalid(key: &'static str, value: impl fmt::Display, reason: &str) -> ConfigError {
    ConfigError::Invalid {
        key,
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(key, value)| ((*key).to_string(), (*value).to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn defaults_when_nothing_is_set() {
        let config = BookingConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, BookingConfig::default());
        assert_eq!(config.feedback_delay(), DelayWindow::from_millis(3_000, 6_000));
        assert_eq!(config.text_limit(), Some(500));
        assert_eq!(config.sink_retry().max_retries, 1);
        assert_eq!(config.sink_retry().attempt_timeout, Duration::from_secs(10));
        config.validate().unwrap();
    }

    #[test]
    fn reads_overrides() {
        let config = BookingConfig::from_lookup(lookup(&[
            ("FEEDBACK_TEXT_LIMIT", "0"),
            ("ROOM_SELECTION_POLICY", "require-sign-in"),
            ("RESORT_ID", "entoto"),
            ("FEEDBACK_SINK_URL", "http://localhost:9000"),
        ]))
        .unwrap();

        assert_eq!(config.text_limit(), None);
        assert_eq!(config.reservation.selection_policy, SelectionPolicy::RequireSignIn);
        assert_eq!(config.feedback.sink_url.as_deref(), Some("http://localhost:9000"));
        config.validate().unwrap();
    }

    #[test]
    fn rejects_unparsable_values() {
        let error = BookingConfig::from_lookup(lookup(&[("ROOM_SELECTION_POLICY", "vip-only")]))
            .unwrap_err();
        assert!(matches!(error, ConfigError::Invalid { key: "ROOM_SELECTION_POLICY", .. }));

        let error = BookingConfig::from_lookup(lookup(&[("FEEDBACK_DELAY_MIN_MS", "soon")]))
            .unwrap_err();
        assert!(matches!(error, ConfigError::Invalid { key: "FEEDBACK_DELAY_MIN_MS", .. }));
    }

    #[test]
    fn validate_catches_inconsistent_values() {
        let mut config = BookingConfig::default();
        config.feedback.sink_retries = 3;
        assert!(config.validate().is_err());

        let mut config = BookingConfig::default();
        config.feedback.delay_min_ms = 9_000;
        assert!(config.validate().is_err());

        let mut config = BookingConfig::default();
        config.reservation.resort_id = "atlantis".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn closed_resort_is_rejected() {
        let config = BookingConfig::from_lookup(lookup(&[("RESORT_ID", "awash")])).unwrap();
        let error = config.validate().unwrap_err();
        assert!(matches!(
            error,
            ConfigError::Invalid { key: "RESORT_ID", ref reason, .. } if reason.contains("bookings")
        ));

        let config = BookingConfig::from_lookup(lookup(&[("RESORT_ID", "tana")])).unwrap();
        assert_eq!(config.validate(), Ok(()));
    }
}
