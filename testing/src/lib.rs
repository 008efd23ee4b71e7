//! # Resort Booking Testing
//!
//! Testing utilities and helpers for the resort booking front end.
//!
//! This crate provides:
//! - Deterministic implementations of the core environment traits
//!   ([`FixedClock`], [`ManualClock`], [`FixedJitter`])
//! - [`ReducerTest`], a Given-When-Then builder for reducers
//! - Effect assertion helpers
//!
//! ## Example
//!
//! ```ignore
//! use resort_booking_testing::{ReducerTest, assertions};
//!
//! ReducerTest::new(ReservationReducer::new())
//!     .with_env(test_environment())
//!     .given_state(ReservationState::default())
//!     .when_action(ReservationAction::Cancel)
//!     .then_state(|state| assert!(state.phase.is_idle()))
//!     .then_effects(assertions::assert_no_effects)
//!     .run();
//! ```

use chrono::{DateTime, Utc};
use resort_booking_core::environment::{Clock, DelayJitter, DelayWindow};

/// Ergonomic reducer tests
pub mod reducer_test;

pub use reducer_test::{assertions, ReducerTest};

/// Mock implementations of Environment traits
pub mod mocks {
    use super::{Clock, DateTime, DelayJitter, DelayWindow, Utc};
    use std::sync::Mutex;
    use std::sync::PoisonError;
    use std::time::Duration;

    /// Fixed clock for deterministic tests
    ///
    /// # Example
    ///
    /// ```
    /// use resort_booking_testing::mocks::FixedClock;
    /// use resort_booking_core::environment::Clock;
    /// use chrono::Utc;
    ///
    /// let clock = FixedClock::new(Utc::now());
    /// assert_eq!(clock.now(), clock.now());
    /// ```
    #[derive(Debug, Clone)]
    pub struct FixedClock {
        time: DateTime<Utc>,
    }

    impl FixedClock {
        /// Create a new fixed clock with the given time
        #[must_use]
        pub const fn new(time: DateTime<Utc>) -> Self {
            Self { time }
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.time
        }
    }

    /// Clock that only moves when told to
    #[derive(Debug)]
    pub struct ManualClock {
        time: Mutex<DateTime<Utc>>,
    }

    impl ManualClock {
        /// Start the clock at `time`
        #[must_use]
        pub const fn new(time: DateTime<Utc>) -> Self {
            Self {
                time: Mutex::new(time),
            }
        }

        /// Move the clock forward
        pub fn advance(&self, by: chrono::Duration) {
            let mut time = self.time.lock().unwrap_or_else(PoisonError::into_inner);
            *time += by;
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> DateTime<Utc> {
            *self.time.lock().unwrap_or_else(PoisonError::into_inner)
        }
    }

    /// Jitter that always answers the same delay, clamped into the window
    #[derive(Debug, Clone, Copy)]
    pub struct FixedJitter {
        delay: Duration,
    }

    impl FixedJitter {
        /// Always pick `delay`
        #[must_use]
        pub const fn new(delay: Duration) -> Self {
            Self { delay }
        }

        /// Always pick the lower bound of the window
        #[must_use]
        pub const fn shortest() -> Self {
            Self::new(Duration::ZERO)
        }
    }

    impl DelayJitter for FixedJitter {
        fn pick(&self, window: DelayWindow) -> Duration {
            window.clamp(self.delay)
        }
    }

    /// Create a default fixed clock for tests (2025-04-11 14:00:00 UTC)
    #[must_use]
    pub fn test_clock() -> FixedClock {
        FixedClock::new(test_time())
    }

    /// The instant [`test_clock`] is frozen at
    #[must_use]
    pub fn test_time() -> DateTime<Utc> {
        DateTime::<Utc>::from_timestamp(1_744_380_000, 0).unwrap_or_default()
    }
}

/// Install a `tracing` subscriber that writes through the test harness.
///
/// Safe to call from every test; only the first call installs anything.
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_test_writer()
        .try_init();
}

// Re-export commonly used items
pub use mocks::{test_clock, test_time, FixedClock, FixedJitter, ManualClock};
