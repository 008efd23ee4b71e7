//! # Resort Booking Core
//!
//! Core traits and types for the resort booking front end.
//!
//! Every feature of the booking flow is written as a reducer: a pure function
//! that takes the current state, an action and the injected environment,
//! updates the state in place and returns descriptions of the side effects
//! the runtime should perform.
//!
//! ## Core Concepts
//!
//! - **State**: What the UI renders (room list, workflow phase, prompt buffers)
//! - **Action**: User commands and the results of finished effects
//! - **Reducer**: `(State, Action, Environment) → (State, Effects)`
//! - **Effect**: A side effect description (async call, timer, cancellation)
//! - **Environment**: Collaborators injected through traits (clock, jitter,
//!   inventory, identity, feedback sink)
//!
//! ## Example
//!
//! ```ignore
//! use resort_booking_core::*;
//!
//! impl Reducer for ReservationReducer {
//!     type State = ReservationState;
//!     type Action = ReservationAction;
//!     type Environment = BookingEnvironment;
//!
//!     fn reduce(
//!         &self,
//!         state: &mut ReservationState,
//!         action: ReservationAction,
//!         env: &BookingEnvironment,
//!     ) -> SmallVec<[Effect<ReservationAction>; 4]> {
//!         // Business logic goes here
//!         SmallVec::new()
//!     }
//! }
//! ```

// Re-export commonly used types
pub use chrono::{DateTime, Utc};
pub use serde::{Deserialize, Serialize};
pub use smallvec::{smallvec, SmallVec};

/// Reducer composition helpers
pub mod composition;

/// Declarative macros for building effects
#[macro_use]
pub mod effect_macros;

/// Reducer module - The core trait for business logic
///
/// Reducers are pure functions: `(State, Action, Environment) → (State, Effects)`.
/// They hold all of the workflow rules and are deterministic and testable
/// without a runtime.
pub mod reducer {
    use super::effect::Effect;
    use smallvec::SmallVec;

    /// The Reducer trait - core abstraction for business logic
    ///
    /// # Type Parameters
    ///
    /// - `State`: The state this reducer operates on
    /// - `Action`: The action type this reducer processes
    /// - `Environment`: The injected dependencies this reducer needs
    pub trait Reducer {
        /// The state type this reducer operates on
        type State;

        /// The action type this reducer processes
        type Action;

        /// The environment type with injected dependencies
        type Environment;

        /// Reduce an action into state changes and effects
        ///
        /// Validates the action, updates `state` in place and returns the
        /// effects the runtime has to execute. A rejected action must leave
        /// the state in its last stable shape.
        fn reduce(
            &self,
            state: &mut Self::State,
            action: Self::Action,
            env: &Self::Environment,
        ) -> SmallVec<[Effect<Self::Action>; 4]>;
    }
}

/// Effect module - Side effect descriptions
///
/// Effects are values, not execution. The runtime interprets them, which is
/// what keeps reducers testable: a test can inspect the returned effects
/// without anything being spawned.
pub mod effect {
    use std::fmt;
    use std::future::Future;
    use std::pin::Pin;
    use std::time::Duration;

    /// Names a group of cancellable effects.
    ///
    /// Every effect registered under the same id is aborted by a single
    /// [`Effect::Cancel`].
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct EffectId(&'static str);

    impl EffectId {
        /// Creates an id from a static name
        #[must_use]
        pub const fn new(name: &'static str) -> Self {
            Self(name)
        }

        /// Returns the name of this id
        #[must_use]
        pub const fn as_str(&self) -> &'static str {
            self.0
        }
    }

    impl fmt::Display for EffectId {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str(self.0)
        }
    }

    /// Effect type - describes a side effect to be executed
    ///
    /// Effects are NOT executed immediately. They are returned from reducers
    /// and executed by the Store runtime; any action they produce is fed back
    /// into the reducer.
    pub enum Effect<Action> {
        /// No-op effect
        None,

        /// Run effects concurrently
        Parallel(Vec<Effect<Action>>),

        /// Dispatch an action after a delay
        Delay {
            /// How long to wait
            duration: Duration,
            /// Action to dispatch after delay
            action: Box<Action>,
        },

        /// Arbitrary async computation
        ///
        /// Returns `Option<Action>` - if Some, the action is fed back into the reducer
        Future(Pin<Box<dyn Future<Output = Option<Action>> + Send>>),

        /// Run `effect` so that it can later be aborted with [`Effect::Cancel`]
        Cancellable {
            /// Group the spawned work is registered under
            id: EffectId,
            /// The effect to run
            effect: Box<Effect<Action>>,
        },

        /// Abort every in-flight effect registered under the id
        Cancel(EffectId),
    }

    // Manual Debug implementation since Future doesn't implement Debug
    impl<Action> fmt::Debug for Effect<Action>
    where
        Action: fmt::Debug,
    {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            match self {
                Effect::None => write!(f, "Effect::None"),
                Effect::Parallel(effects) => {
                    f.debug_tuple("Effect::Parallel").field(effects).finish()
                },
                Effect::Delay { duration, action } => f
                    .debug_struct("Effect::Delay")
                    .field("duration", duration)
                    .field("action", action)
                    .finish(),
                Effect::Future(_) => write!(f, "Effect::Future(<future>)"),
                Effect::Cancellable { id, effect } => f
                    .debug_struct("Effect::Cancellable")
                    .field("id", id)
                    .field("effect", effect)
                    .finish(),
                Effect::Cancel(id) => f.debug_tuple("Effect::Cancel").field(id).finish(),
            }
        }
    }

    impl<Action> Effect<Action> {
        /// Combine effects to run in parallel
        #[must_use]
        pub const fn merge(effects: Vec<Effect<Action>>) -> Effect<Action> {
            Effect::Parallel(effects)
        }

        /// Wrap an effect so it can be cancelled by id
        #[must_use]
        pub fn cancellable(id: EffectId, effect: Effect<Action>) -> Effect<Action> {
            Effect::Cancellable {
                id,
                effect: Box::new(effect),
            }
        }

        /// Returns true for [`Effect::None`]
        #[must_use]
        pub const fn is_none(&self) -> bool {
            matches!(self, Effect::None)
        }

        /// Lift this effect into another action type.
        ///
        /// Used by parent reducers to embed the effects of a child feature.
        /// Timers and cancellation ids are preserved.
        #[must_use]
        pub fn map<B>(self, f: fn(Action) -> B) -> Effect<B>
        where
            Action: 'static,
            B: 'static,
        {
            match self {
                Effect::None => Effect::None,
                Effect::Parallel(effects) => {
                    Effect::Parallel(effects.into_iter().map(|effect| effect.map(f)).collect())
                },
                Effect::Delay { duration, action } => Effect::Delay {
                    duration,
                    action: Box::new(f(*action)),
                },
                Effect::Future(fut) => Effect::Future(Box::pin(async move { fut.await.map(f) })),
                Effect::Cancellable { id, effect } => Effect::Cancellable {
                    id,
                    effect: Box::new(effect.map(f)),
                },
                Effect::Cancel(id) => Effect::Cancel(id),
            }
        }
    }
}

/// Environment module - Dependency injection traits
///
/// Time and randomness are abstracted here so reducers never reach for a
/// global clock or RNG.
pub mod environment {
    use chrono::{DateTime, Utc};
    use std::time::Duration;

    /// Clock trait - abstracts time operations for testability
    pub trait Clock: Send + Sync {
        /// Get the current time
        fn now(&self) -> DateTime<Utc>;
    }

    /// Wall clock backed by [`Utc::now`]
    #[derive(Debug, Clone, Copy, Default)]
    pub struct SystemClock;

    impl Clock for SystemClock {
        fn now(&self) -> DateTime<Utc> {
            Utc::now()
        }
    }

    /// Inclusive window a randomised delay is drawn from
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct DelayWindow {
        min: Duration,
        max: Duration,
    }

    impl DelayWindow {
        /// Creates a window from two bounds, in either order
        #[must_use]
        pub fn new(a: Duration, b: Duration) -> Self {
            if a <= b {
                Self { min: a, max: b }
            } else {
                Self { min: b, max: a }
            }
        }

        /// Creates a window from millisecond bounds
        #[must_use]
        pub fn from_millis(min: u64, max: u64) -> Self {
            Self::new(Duration::from_millis(min), Duration::from_millis(max))
        }

        /// Lower bound
        #[must_use]
        pub const fn min(&self) -> Duration {
            self.min
        }

        /// Upper bound
        #[must_use]
        pub const fn max(&self) -> Duration {
            self.max
        }

        /// Whether `duration` falls inside the window
        #[must_use]
        pub fn contains(&self, duration: Duration) -> bool {
            self.min <= duration && duration <= self.max
        }

        /// Clamp an arbitrary duration into the window
        #[must_use]
        pub fn clamp(&self, duration: Duration) -> Duration {
            duration.clamp(self.min, self.max)
        }
    }

    /// Picks a delay inside a [`DelayWindow`].
    ///
    /// Production code draws uniformly at random; tests inject a fixed value.
    pub trait DelayJitter: Send + Sync {
        /// Choose a duration within `window`
        fn pick(&self, window: DelayWindow) -> Duration;
    }
}
