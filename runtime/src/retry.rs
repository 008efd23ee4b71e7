//! Bounded retry with a per-attempt timeout.
//!
//! Calls to remote collaborators (the feedback sink, a remote inventory) must
//! never hang the flow. Each attempt is raced against
//! [`RetryPolicy::attempt_timeout`]; an expired attempt counts as a failure
//! and is retried like any other error until `max_retries` is exhausted.
//!
//! # Example
//!
//! ```rust
//! use resort_booking_runtime::retry::{RetryPolicy, retry_with_timeout};
//! use std::time::Duration;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let policy = RetryPolicy::builder()
//!     .max_retries(1)
//!     .attempt_timeout(Duration::from_secs(10))
//!     .build();
//!
//! let id = retry_with_timeout(&policy, || async { Ok::<_, String>("doc-1") }).await?;
//! assert_eq!(id, "doc-1");
//! # Ok(())
//! # }
//! ```

use std::fmt;
use std::future::Future;
use std::time::Duration;
use tokio::time::{sleep, timeout};

/// How often and how patiently an operation is attempted.
///
/// # Default Values
///
/// - `max_retries`: 1 (at most two attempts in total)
/// - `attempt_timeout`: 10 seconds
/// - `initial_delay`: 250ms
/// - `max_delay`: 2 seconds
/// - `multiplier`: 2.0
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Retries after the first attempt
    pub max_retries: usize,
    /// Upper bound on a single attempt
    pub attempt_timeout: Duration,
    /// Pause before the first retry
    pub initial_delay: Duration,
    /// Cap on the pause between retries
    pub max_delay: Duration,
    /// Growth factor of the pause
    pub multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 1,
            attempt_timeout: Duration::from_secs(10),
            initial_delay: Duration::from_millis(250),
            max_delay: Duration::from_secs(2),
            multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    /// Create a new policy builder.
    #[must_use]
    pub fn builder() -> RetryPolicyBuilder {
        RetryPolicyBuilder {
            policy: Self::default(),
        }
    }

    /// A single attempt with the default timeout
    #[must_use]
    pub fn no_retry() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    /// Pause before retry number `attempt` (zero based).
    ///
    /// `initial_delay * multiplier ^ attempt`, capped at `max_delay`.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
    pub fn delay_for_attempt(&self, attempt: usize) -> Duration {
        let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
        let delay_ms = self.initial_delay.as_millis() as f64 * self.multiplier.powi(exponent);

        if !delay_ms.is_finite() || delay_ms >= self.max_delay.as_millis() as f64 {
            self.max_delay
        } else {
            Duration::from_millis(delay_ms as u64)
        }
    }
}

/// Builder for [`RetryPolicy`].
#[derive(Debug, Clone)]
pub struct RetryPolicyBuilder {
    policy: RetryPolicy,
}

impl RetryPolicyBuilder {
    /// Set maximum number of retries.
    #[must_use]
    pub const fn max_retries(mut self, max_retries: usize) -> Self {
        self.policy.max_retries = max_retries;
        self
    }

    /// Set the timeout applied to each attempt.
    #[must_use]
    pub const fn attempt_timeout(mut self, attempt_timeout: Duration) -> Self {
        self.policy.attempt_timeout = attempt_timeout;
        self
    }

    /// Set the pause before the first retry.
    #[must_use]
    pub const fn initial_delay(mut self, delay: Duration) -> Self {
        self.policy.initial_delay = delay;
        self
    }

    /// Set the cap on the pause between retries.
    #[must_use]
    pub const fn max_delay(mut self, delay: Duration) -> Self {
        self.policy.max_delay = delay;
        self
    }

    /// Set the backoff multiplier.
    #[must_use]
    pub const fn multiplier(mut self, multiplier: f64) -> Self {
        self.policy.multiplier = multiplier;
        self
    }

    /// Build the [`RetryPolicy`].
    #[must_use]
    pub fn build(self) -> RetryPolicy {
        self.policy
    }
}

/// Why the last attempt of [`retry_with_timeout`] failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptError<E> {
    /// The attempt did not finish within the policy timeout
    TimedOut(Duration),
    /// The operation returned an error
    Failed(E),
}

impl<E: fmt::Display> fmt::Display for AttemptError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TimedOut(after) => write!(f, "timed out after {}ms", after.as_millis()),
            Self::Failed(error) => write!(f, "{error}"),
        }
    }
}

impl<E: fmt::Debug + fmt::Display> std::error::Error for AttemptError<E> {}

/// Run `operation` under `policy`, timing out and retrying each attempt.
///
/// # Errors
///
/// Returns the error of the last attempt once the retries are exhausted.
pub async fn retry_with_timeout<F, Fut, T, E>(
    policy: &RetryPolicy,
    mut operation: F,
) -> Result<T, AttemptError<E>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: fmt::Display,
{
    let mut attempt = 0;

    loop {
        let outcome = match timeout(policy.attempt_timeout, operation()).await {
            Ok(Ok(value)) => {
                if attempt > 0 {
                    tracing::info!(attempt, "Operation succeeded after retry");
                }
                return Ok(value);
            },
            Ok(Err(error)) => AttemptError::Failed(error),
            Err(_) => AttemptError::TimedOut(policy.attempt_timeout),
        };

        if attempt >= policy.max_retries {
            tracing::warn!(attempt, error = %outcome, "Operation failed, giving up");
            return Err(outcome);
        }

        let delay = policy.delay_for_attempt(attempt);
        tracing::debug!(
            attempt,
            delay_ms = delay.as_millis(),
            error = %outcome,
            "Operation failed, retrying"
        );
        sleep(delay).await;
        attempt += 1;
    }
}
