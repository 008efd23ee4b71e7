//! Injected collaborators shared by every booking reducer.

use crate::config::{BookingConfig, SelectionPolicy};
use crate::identity::IdentityProvider;
use crate::inventory::InventoryStore;
use crate::sink::{FeedbackSink, SinkDocument, SINK_WRITE};
use crate::types::DocumentId;
use resort_booking_core::async_effect;
use resort_booking_core::effect::Effect;
use resort_booking_core::environment::{Clock, DelayJitter, DelayWindow};
use resort_booking_runtime::retry::{retry_with_timeout, RetryPolicy};
use std::sync::Arc;
use std::time::Duration;

/// Behavioural settings of the booking flow
#[derive(Debug, Clone, PartialEq)]
pub struct FlowSettings {
    /// Window the feedback prompt delay is drawn from
    pub feedback_delay: DelayWindow,
    /// Free-text cap in characters, `None` when unbounded
    pub text_limit: Option<usize>,
    /// Sign-in gate for room selection
    pub selection_policy: SelectionPolicy,
    /// Timeout and retries for sink calls
    pub sink_retry: RetryPolicy,
    /// Timeout for the inventory call of a confirmation; never retried
    pub inventory_call: RetryPolicy,
}

impl Default for FlowSettings {
    fn default() -> Self {
        Self::from_config(&BookingConfig::default())
    }
}

impl FlowSettings {
    /// Settings derived from configuration
    #[must_use]
    pub fn from_config(config: &BookingConfig) -> Self {
        let sink_retry = config.sink_retry();
        Self {
            feedback_delay: config.feedback_delay(),
            text_limit: config.text_limit(),
            selection_policy: config.reservation.selection_policy,
            inventory_call: RetryPolicy::builder()
                .max_retries(0)
                .attempt_timeout(sink_retry.attempt_timeout)
                .build(),
            sink_retry,
        }
    }

    /// Apply the free-text cap, cutting on a character boundary
    #[must_use]
    pub fn clamp_text(&self, text: String) -> String {
        let Some(limit) = self.text_limit else {
            return text;
        };
        match text.char_indices().nth(limit) {
            Some((cut, _)) => {
                let mut text = text;
                text.truncate(cut);
                text
            },
            None => text,
        }
    }

    /// Upper bound on how long a remote call of the flow can take, retries
    /// and backoff included
    #[must_use]
    pub fn outcome_timeout(&self) -> Duration {
        let attempts = u32::try_from(self.sink_retry.max_retries + 1).unwrap_or(u32::MAX);
        let sink = self
            .sink_retry
            .attempt_timeout
            .saturating_mul(attempts)
            .saturating_add(self.sink_retry.max_delay.saturating_mul(attempts));
        sink.max(self.inventory_call.attempt_timeout)
            .saturating_add(Duration::from_secs(1))
    }
}

/// Environment of the booking reducers
#[derive(Clone)]
pub struct BookingEnvironment {
    /// Timestamps for submitted documents
    pub clock: Arc<dyn Clock>,
    /// Picks the feedback prompt delay
    pub jitter: Arc<dyn DelayJitter>,
    /// Rooms of the current resort
    pub inventory: Arc<dyn InventoryStore>,
    /// Current user
    pub identity: Arc<dyn IdentityProvider>,
    /// Destination of feedback documents
    pub sink: Arc<dyn FeedbackSink>,
    /// Behavioural settings
    pub settings: FlowSettings,
}

impl BookingEnvironment {
    /// Append `document` to the sink with the configured retries
    ///
    /// The call is registered under [`SINK_WRITE`], so a teardown aborts it
    /// and `outcome` is never reduced. On failure `outcome` gets the reason.
    #[must_use]
    pub fn append_to_sink<A, F>(&self, document: SinkDocument, outcome: F) -> Effect<A>
    where
        A: Send + 'static,
        F: FnOnce(Result<DocumentId, String>) -> A + Send + 'static,
    {
        let sink = Arc::clone(&self.sink);
        let policy = self.settings.sink_retry.clone();
        Effect::cancellable(
            SINK_WRITE,
            async_effect! {
                let result = retry_with_timeout(&policy, || {
                    let sink = Arc::clone(&sink);
                    let document = document.clone();
                    async move { sink.append(document).await }
                })
                .await;
                Some(outcome(result.map_err(|error| error.to_string())))
            },
        )
    }
}

impl std::fmt::Debug for BookingEnvironment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BookingEnvironment")
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamp_text_cuts_on_char_boundary() {
        let settings = FlowSettings {
            text_limit: Some(3),
            ..FlowSettings::default()
        };
        assert_eq!(settings.clamp_text("ቡናና ሻይ".to_string()), "ቡናና".chars().take(3).collect::<String>());
        assert_eq!(settings.clamp_text("ok".to_string()), "ok");

        let unbounded = FlowSettings {
            text_limit: None,
            ..FlowSettings::default()
        };
        let long = "x".repeat(2_000);
        assert_eq!(unbounded.clamp_text(long.clone()), long);
    }

    #[test]
    fn defaults_follow_config_defaults() {
        let settings = FlowSettings::default();
        assert_eq!(settings.feedback_delay, DelayWindow::from_millis(3_000, 6_000));
        assert_eq!(settings.text_limit, Some(500));
        assert_eq!(settings.inventory_call.max_retries, 0);
        assert!(settings.outcome_timeout() > settings.sink_retry.attempt_timeout);
    }
}
