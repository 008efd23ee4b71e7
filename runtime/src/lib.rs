//! # Resort Booking Runtime
//!
//! Runtime implementation for the resort booking front end.
//!
//! This crate provides the Store runtime that coordinates reducer execution
//! and effect handling.
//!
//! ## Core Components
//!
//! - **Store**: Owns the state, runs the reducer and executes effects
//! - **Timer registry**: Tracks cancellable effects so a [`Effect::Cancel`]
//!   or a teardown aborts them before they fire
//! - **Retry**: Bounded retry with a per-attempt timeout for remote calls
//! - **Jitter**: Uniform random delay selection
//!
//! Actions are reduced one at a time behind an async write lock, so the
//! reducer behaves like a single-threaded UI event loop even though effects
//! run on the tokio scheduler.
//!
//! ## Example
//!
//! ```ignore
//! use resort_booking_runtime::Store;
//!
//! let store = Store::new(BookingState::new(rooms), BookingReducer::new(), environment);
//!
//! store.send(BookingAction::Reservation(ReservationAction::SelectRoom { room })).await?;
//!
//! let phase = store.state(|s| s.reservation.phase.clone()).await;
//! ```

use resort_booking_core::{
    effect::{Effect, EffectId},
    reducer::Reducer,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::{broadcast, Notify, RwLock};
use tokio::task::AbortHandle;

/// Random delay selection
pub mod jitter;

/// Bounded retry with a per-attempt timeout
pub mod retry;

pub use jitter::UniformJitter;

/// Error types for the Store runtime
pub mod error {
    use thiserror::Error;

    /// Errors that can occur during Store operations
    #[derive(Error, Debug, Clone, PartialEq, Eq)]
    pub enum StoreError {
        /// Store is shutting down and not accepting new actions
        ///
        /// Returned by `send()` after `shutdown()` was called. Effects that
        /// complete after teardown drop their action instead.
        #[error("Store is shutting down")]
        ShutdownInProgress,

        /// Shutdown timed out waiting for effects to complete
        #[error("Shutdown timed out with {0} effects still running")]
        ShutdownTimeout(usize),

        /// Timeout waiting for a matching action
        ///
        /// Returned by `send_and_wait_for` when the timeout expires before
        /// a matching action is received.
        #[error("Timeout waiting for action")]
        Timeout,

        /// Action broadcast channel closed
        #[error("Action broadcast channel closed")]
        ChannelClosed,
    }
}

pub use error::StoreError;

/// Store configuration
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Capacity of the channel that broadcasts effect-produced actions
    pub broadcast_capacity: usize,
    /// Default wait used by [`Store::teardown`]
    pub shutdown_timeout: Duration,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            broadcast_capacity: 16,
            shutdown_timeout: Duration::from_secs(5),
        }
    }
}

/// Count of running effects with a wake-up when it drops to zero.
#[derive(Debug, Default)]
struct EffectCounter {
    value: AtomicUsize,
    idle: Notify,
}

impl EffectCounter {
    fn increment(&self) {
        self.value.fetch_add(1, Ordering::SeqCst);
    }

    fn decrement(&self) {
        if self.value.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.idle.notify_waiters();
        }
    }

    fn get(&self) -> usize {
        self.value.load(Ordering::SeqCst)
    }

    async fn wait_idle(&self) {
        loop {
            let notified = self.idle.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if self.get() == 0 {
                return;
            }
            notified.await;
        }
    }
}

/// Decrements both the per-send and the store-wide counter when an effect
/// task finishes, panics or is aborted.
struct EffectGuard {
    tracking: Arc<EffectCounter>,
    pending: Arc<EffectCounter>,
}

impl EffectGuard {
    fn new(tracking: &Arc<EffectCounter>, pending: &Arc<EffectCounter>) -> Self {
        tracking.increment();
        pending.increment();
        Self {
            tracking: Arc::clone(tracking),
            pending: Arc::clone(pending),
        }
    }
}

impl Drop for EffectGuard {
    fn drop(&mut self) {
        self.tracking.decrement();
        self.pending.decrement();
    }
}

/// Handle for waiting on the effects caused by one `send`
///
/// Actions produced by those effects are reduced under the same handle, so
/// [`EffectHandle::wait`] covers the whole cascade, timers included.
#[derive(Clone)]
pub struct EffectHandle {
    tracking: Arc<EffectCounter>,
}

impl EffectHandle {
    /// Wait until every tracked effect has completed or been cancelled
    pub async fn wait(&self) {
        self.tracking.wait_idle().await;
    }

    /// Wait with a timeout
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Timeout`] if effects are still running when the
    /// timeout elapses.
    pub async fn wait_with_timeout(&self, timeout: Duration) -> Result<(), StoreError> {
        tokio::time::timeout(timeout, self.wait())
            .await
            .map_err(|_| StoreError::Timeout)
    }

    /// Number of effects still running under this handle
    #[must_use]
    pub fn pending(&self) -> usize {
        self.tracking.get()
    }
}

impl std::fmt::Debug for EffectHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EffectHandle")
            .field("pending", &self.tracking.get())
            .finish()
    }
}

/// Store module - The runtime for reducers
pub mod store {
    use super::{
        broadcast, AbortHandle, Arc, AtomicBool, Duration, Effect, EffectCounter, EffectGuard,
        EffectHandle, EffectId, HashMap, Mutex, Notify, Ordering, PoisonError, Reducer, RwLock,
        StoreConfig, StoreError,
    };

    struct Inner<S, A, E, R> {
        state: RwLock<S>,
        reducer: R,
        environment: E,
        config: StoreConfig,
        shutdown: AtomicBool,
        closed: Notify,
        pending: Arc<EffectCounter>,
        timers: Mutex<HashMap<EffectId, Vec<AbortHandle>>>,
        action_broadcast: broadcast::Sender<A>,
    }

    /// The Store - runtime coordinator for a reducer
    ///
    /// The Store manages:
    /// 1. State (behind `RwLock`, written only while reducing)
    /// 2. Reducer (business logic)
    /// 3. Environment (injected dependencies)
    /// 4. Effect execution, with produced actions fed back to the reducer
    /// 5. Cancellable timers and teardown
    ///
    /// Cloning a Store is cheap; clones share everything.
    pub struct Store<S, A, E, R>
    where
        R: Reducer<State = S, Action = A, Environment = E>,
    {
        inner: Arc<Inner<S, A, E, R>>,
    }

    impl<S, A, E, R> Clone for Store<S, A, E, R>
    where
        R: Reducer<State = S, Action = A, Environment = E>,
    {
        fn clone(&self) -> Self {
            Self {
                inner: Arc::clone(&self.inner),
            }
        }
    }

    impl<S, A, E, R> Store<S, A, E, R>
    where
        R: Reducer<State = S, Action = A, Environment = E> + Send + Sync + 'static,
        A: Send + Clone + std::fmt::Debug + 'static,
        S: Send + Sync + 'static,
        E: Send + Sync + 'static,
    {
        /// Create a new store with initial state, reducer, and environment
        #[must_use]
        pub fn new(initial_state: S, reducer: R, environment: E) -> Self {
            Self::with_config(initial_state, reducer, environment, StoreConfig::default())
        }

        /// Create a new Store with custom configuration
        #[must_use]
        pub fn with_config(initial_state: S, reducer: R, environment: E, config: StoreConfig) -> Self {
            let (action_broadcast, _) = broadcast::channel(config.broadcast_capacity.max(1));

            Self {
                inner: Arc::new(Inner {
                    state: RwLock::new(initial_state),
                    reducer,
                    environment,
                    config,
                    shutdown: AtomicBool::new(false),
                    closed: Notify::new(),
                    pending: Arc::new(EffectCounter::default()),
                    timers: Mutex::new(HashMap::new()),
                    action_broadcast,
                }),
            }
        }

        /// Send an action to the store
        ///
        /// The action is reduced immediately; its effects are spawned and the
        /// returned handle can be used to wait for them.
        ///
        /// # Errors
        ///
        /// Returns [`StoreError::ShutdownInProgress`] once the store has been
        /// torn down. The state is not touched in that case.
        #[tracing::instrument(skip(self, action), name = "store_send")]
        pub async fn send(&self, action: A) -> Result<EffectHandle, StoreError> {
            let tracking = Arc::new(EffectCounter::default());
            self.dispatch(action, &tracking).await?;
            Ok(EffectHandle { tracking })
        }

        /// Send an action and wait for a matching action produced by its effects
        ///
        /// Subscribes before sending, so a fast effect cannot be missed. The
        /// returned action has already been reduced when this resolves.
        ///
        /// # Errors
        ///
        /// - [`StoreError::Timeout`]: no matching action within `timeout`
        /// - [`StoreError::ChannelClosed`]: the broadcast channel closed
        /// - [`StoreError::ShutdownInProgress`]: the store was torn down
        pub async fn send_and_wait_for<F>(
            &self,
            action: A,
            predicate: F,
            timeout: Duration,
        ) -> Result<A, StoreError>
        where
            F: Fn(&A) -> bool,
        {
            let mut receiver = self.inner.action_broadcast.subscribe();
            self.send(action).await?;

            let wait = async {
                loop {
                    match receiver.recv().await {
                        Ok(action) if predicate(&action) => return Ok(action),
                        Ok(_) => {},
                        Err(broadcast::error::RecvError::Lagged(skipped)) => {
                            tracing::warn!(skipped, "Action observer lagged behind");
                        },
                        Err(broadcast::error::RecvError::Closed) => {
                            return Err(StoreError::ChannelClosed);
                        },
                    }
                }
            };

            tokio::time::timeout(timeout, wait)
                .await
                .map_err(|_| StoreError::Timeout)?
        }

        /// Subscribe to actions produced by effects
        #[must_use]
        pub fn subscribe_actions(&self) -> broadcast::Receiver<A> {
            self.inner.action_broadcast.subscribe()
        }

        /// Read state via a closure
        pub async fn state<F, T>(&self, f: F) -> T
        where
            F: FnOnce(&S) -> T,
        {
            let state = self.inner.state.read().await;
            f(&state)
        }

        /// Access the injected environment
        #[must_use]
        pub fn environment(&self) -> &E {
            &self.inner.environment
        }

        /// Number of effects currently running
        #[must_use]
        pub fn pending_effects(&self) -> usize {
            self.inner.pending.get()
        }

        /// Whether [`Store::shutdown`] has been called
        #[must_use]
        pub fn is_shut_down(&self) -> bool {
            self.inner.shutdown.load(Ordering::SeqCst)
        }

        /// Resolves once [`Store::shutdown`] has been called
        ///
        /// Observers waiting for an effect result race this to learn that the
        /// result will never be delivered.
        pub async fn closed(&self) {
            loop {
                let notified = self.inner.closed.notified();
                tokio::pin!(notified);
                notified.as_mut().enable();

                if self.is_shut_down() {
                    return;
                }
                notified.await;
            }
        }

        /// Stop accepting actions, abort every cancellable effect and wait for
        /// the remaining effects to finish.
        ///
        /// Timers that were aborted never deliver their action. Effects that
        /// finish after this point have their action dropped.
        ///
        /// # Errors
        ///
        /// Returns [`StoreError::ShutdownTimeout`] if effects are still
        /// running after `timeout`.
        pub async fn shutdown(&self, timeout: Duration) -> Result<(), StoreError> {
            self.inner.shutdown.store(true, Ordering::SeqCst);
            self.inner.closed.notify_waiters();
            let cancelled = self.cancel_all();
            tracing::info!(cancelled, "Store shutting down");

            match tokio::time::timeout(timeout, self.inner.pending.wait_idle()).await {
                Ok(()) => Ok(()),
                Err(_) => {
                    let running = self.inner.pending.get();
                    tracing::warn!(running, "Effects still running after shutdown timeout");
                    Err(StoreError::ShutdownTimeout(running))
                },
            }
        }

        /// [`Store::shutdown`] with the configured timeout
        ///
        /// # Errors
        ///
        /// See [`Store::shutdown`].
        pub async fn teardown(&self) -> Result<(), StoreError> {
            self.shutdown(self.inner.config.shutdown_timeout).await
        }

        async fn dispatch(&self, action: A, tracking: &Arc<EffectCounter>) -> Result<(), StoreError> {
            if self.is_shut_down() {
                tracing::debug!(?action, "Dropping action sent after shutdown");
                return Err(StoreError::ShutdownInProgress);
            }

            let effects = {
                let mut state = self.inner.state.write().await;
                self.inner
                    .reducer
                    .reduce(&mut state, action, &self.inner.environment)
            };
            metrics::counter!("store.actions.processed").increment(1);

            for effect in effects {
                self.execute(effect, tracking, None);
            }
            Ok(())
        }

        /// Reduce an effect-produced action, then announce it to observers.
        async fn feed_back(&self, action: A, tracking: &Arc<EffectCounter>) {
            match self.dispatch(action.clone(), tracking).await {
                Ok(()) => {
                    let _ = self.inner.action_broadcast.send(action);
                },
                Err(error) => {
                    tracing::trace!(%error, "Effect result dropped");
                },
            }
        }

        fn execute(&self, effect: Effect<A>, tracking: &Arc<EffectCounter>, scope: Option<EffectId>) {
            match effect {
                Effect::None => {
                    metrics::counter!("store.effects.executed", "type" => "none").increment(1);
                },
                Effect::Parallel(effects) => {
                    metrics::counter!("store.effects.executed", "type" => "parallel").increment(1);
                    for effect in effects {
                        self.execute(effect, tracking, scope);
                    }
                },
                Effect::Future(fut) => {
                    metrics::counter!("store.effects.executed", "type" => "future").increment(1);
                    let guard = EffectGuard::new(tracking, &self.inner.pending);
                    let store = self.clone();
                    let tracking = Arc::clone(tracking);

                    let task = tokio::spawn(async move {
                        let _guard = guard;
                        if let Some(action) = fut.await {
                            store.feed_back(action, &tracking).await;
                        }
                    });
                    self.register(scope, task.abort_handle());
                },
                Effect::Delay { duration, action } => {
                    metrics::counter!("store.effects.executed", "type" => "delay").increment(1);
                    tracing::trace!(?duration, "Scheduling delayed action");
                    let guard = EffectGuard::new(tracking, &self.inner.pending);
                    let store = self.clone();
                    let tracking = Arc::clone(tracking);

                    let task = tokio::spawn(async move {
                        let _guard = guard;
                        tokio::time::sleep(duration).await;
                        store.feed_back(*action, &tracking).await;
                    });
                    self.register(scope, task.abort_handle());
                },
                Effect::Cancellable { id, effect } => {
                    self.execute(*effect, tracking, Some(id));
                },
                Effect::Cancel(id) => {
                    metrics::counter!("store.effects.executed", "type" => "cancel").increment(1);
                    self.cancel(id);
                },
            }
        }

        fn register(&self, scope: Option<EffectId>, handle: AbortHandle) {
            let Some(id) = scope else {
                return;
            };
            let mut timers = self
                .inner
                .timers
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            let handles = timers.entry(id).or_default();
            handles.retain(|handle| !handle.is_finished());
            handles.push(handle);
        }

        fn cancel(&self, id: EffectId) -> usize {
            let handles = self
                .inner
                .timers
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .remove(&id)
                .unwrap_or_default();

            let cancelled = abort_all(handles);
            if cancelled > 0 {
                tracing::debug!(%id, cancelled, "Cancelled effects");
            }
            cancelled
        }

        fn cancel_all(&self) -> usize {
            let drained: Vec<_> = self
                .inner
                .timers
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .drain()
                .collect();

            drained
                .into_iter()
                .map(|(_, handles)| abort_all(handles))
                .sum()
        }
    }

    fn abort_all(handles: Vec<AbortHandle>) -> usize {
        let mut cancelled = 0;
        for handle in handles.into_iter().filter(|handle| !handle.is_finished()) {
            handle.abort();
            cancelled += 1;
        }
        metrics::counter!("store.timers.cancelled").increment(cancelled as u64);
        cancelled
    }
}

pub use store::Store;

#[cfg(test)]
mod tests {
    use super::*;
    use resort_booking_core::{smallvec, SmallVec};

    const PROMPT_TIMER: EffectId = EffectId::new("prompt");

    #[derive(Debug, Clone, Default)]
    struct TestState {
        value: i32,
        prompted: bool,
    }

    #[derive(Debug, Clone, PartialEq)]
    enum TestAction {
        Increment,
        Loaded(i32),
        Load,
        SchedulePrompt,
        Prompt,
        CancelPrompt,
        Both,
    }

    #[derive(Debug, Clone)]
    struct TestReducer;

    impl Reducer for TestReducer {
        type State = TestState;
        type Action = TestAction;
        type Environment = ();

        fn reduce(
            &self,
            state: &mut Self::State,
            action: Self::Action,
            _env: &Self::Environment,
        ) -> SmallVec<[Effect<Self::Action>; 4]> {
            match action {
                TestAction::Increment => {
                    state.value += 1;
                    SmallVec::new()
                },
                TestAction::Loaded(value) => {
                    state.value = value;
                    SmallVec::new()
                },
                TestAction::Load => smallvec![Effect::Future(Box::pin(async {
                    Some(TestAction::Loaded(42))
                }))],
                TestAction::SchedulePrompt => smallvec![Effect::cancellable(
                    PROMPT_TIMER,
                    Effect::Delay {
                        duration: Duration::from_secs(4),
                        action: Box::new(TestAction::Prompt),
                    },
                )],
                TestAction::Prompt => {
                    state.prompted = true;
                    SmallVec::new()
                },
                TestAction::CancelPrompt => smallvec![Effect::Cancel(PROMPT_TIMER)],
                TestAction::Both => smallvec![Effect::merge(vec![
                    Effect::Future(Box::pin(async { Some(TestAction::Increment) })),
                    Effect::Future(Box::pin(async { Some(TestAction::Increment) })),
                ])],
            }
        }
    }

    fn store() -> Store<TestState, TestAction, (), TestReducer> {
        Store::new(TestState::default(), TestReducer, ())
    }

    #[tokio::test]
    async fn send_reduces_synchronously() {
        let store = store();
        let _ = store.send(TestAction::Increment).await;
        assert_eq!(store.state(|s| s.value).await, 1);
    }

    #[tokio::test]
    async fn future_result_is_fed_back() {
        let store = store();
        let handle = store.send(TestAction::Load).await.unwrap();
        handle.wait().await;
        assert_eq!(store.state(|s| s.value).await, 42);
    }

    #[tokio::test]
    async fn parallel_effects_all_run() {
        let store = store();
        let handle = store.send(TestAction::Both).await.unwrap();
        handle.wait().await;
        assert_eq!(store.state(|s| s.value).await, 2);
    }

    #[tokio::test]
    async fn send_and_wait_for_sees_reduced_state() {
        let store = store();
        let action = store
            .send_and_wait_for(
                TestAction::Load,
                |a| matches!(a, TestAction::Loaded(_)),
                Duration::from_secs(1),
            )
            .await
            .unwrap();
        assert_eq!(action, TestAction::Loaded(42));
        assert_eq!(store.state(|s| s.value).await, 42);
    }

    #[tokio::test(start_paused = true)]
    async fn send_and_wait_for_times_out() {
        let store = store();
        let result = store
            .send_and_wait_for(
                TestAction::Increment,
                |a| matches!(a, TestAction::Loaded(_)),
                Duration::from_millis(50),
            )
            .await;
        assert_eq!(result, Err(StoreError::Timeout));
    }

    #[tokio::test(start_paused = true)]
    async fn delayed_action_fires_after_duration() {
        let store = store();
        let _ = store.send(TestAction::SchedulePrompt).await;

        tokio::time::sleep(Duration::from_secs(3)).await;
        assert!(!store.state(|s| s.prompted).await);

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert!(store.state(|s| s.prompted).await);
        assert_eq!(store.pending_effects(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_aborts_pending_timer() {
        let store = store();
        let handle = store.send(TestAction::SchedulePrompt).await.unwrap();
        let _ = store.send(TestAction::CancelPrompt).await;

        handle.wait().await;
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert!(!store.state(|s| s.prompted).await);
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_cancels_timers_and_rejects_sends() {
        let store = store();
        let _ = store.send(TestAction::SchedulePrompt).await;

        store.shutdown(Duration::from_secs(1)).await.unwrap();
        assert!(store.is_shut_down());
        assert_eq!(store.pending_effects(), 0);

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert!(!store.state(|s| s.prompted).await);

        let result = store.send(TestAction::Increment).await;
        assert!(matches!(result, Err(StoreError::ShutdownInProgress)));
        assert_eq!(store.state(|s| s.value).await, 0);
    }
}
