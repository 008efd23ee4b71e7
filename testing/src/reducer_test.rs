//! Given-When-Then tests for reducers.
//!
//! A test names its environment and starting state, lists the actions to
//! reduce, then checks the final state and the effects of the last action.
//! Nothing is executed: effects are inspected as values.

#![allow(clippy::module_name_repetitions)] // ReducerTest is the natural name

use resort_booking_core::{effect::Effect, reducer::Reducer};

type StateCheck<S> = Box<dyn FnOnce(&S)>;
type EffectCheck<A> = Box<dyn FnOnce(&[Effect<A>])>;

/// Fluent reducer test
///
/// Actions given to `when_action` are reduced in order. Effect checks only
/// see the effects of the last one, so "the second confirm produces
/// nothing" is a two-action test.
///
/// # Example
///
/// ```ignore
/// use resort_booking_testing::ReducerTest;
///
/// ReducerTest::new(ReservationReducer::new())
///     .with_env(test_environment())
///     .given_state(ReservationState::default())
///     .when_action(ReservationAction::SelectRoom { room })
///     .when_action(ReservationAction::Confirm)
///     .then_state(|state| assert!(state.phase.is_confirming()))
///     .then_effects(|effects| assert_eq!(effects.len(), 1))
///     .run();
/// ```
pub struct ReducerTest<R, S, A, E>
where
    R: Reducer<State = S, Action = A, Environment = E>,
{
    reducer: R,
    env: Option<E>,
    given: Option<S>,
    steps: Vec<A>,
    state_checks: Vec<StateCheck<S>>,
    effect_checks: Vec<EffectCheck<A>>,
}

impl<R, S, A, E> ReducerTest<R, S, A, E>
where
    R: Reducer<State = S, Action = A, Environment = E>,
{
    /// Start a test of `reducer`
    #[must_use]
    pub const fn new(reducer: R) -> Self {
        Self {
            reducer,
            env: None,
            given: None,
            steps: Vec::new(),
            state_checks: Vec::new(),
            effect_checks: Vec::new(),
        }
    }

    /// Environment handed to every reduction
    #[must_use]
    pub fn with_env(mut self, env: E) -> Self {
        self.env = Some(env);
        self
    }

    /// Starting state
    #[must_use]
    pub fn given_state(mut self, state: S) -> Self {
        self.given = Some(state);
        self
    }

    /// Queue one more action
    #[must_use]
    pub fn when_action(mut self, action: A) -> Self {
        self.steps.push(action);
        self
    }

    /// Check the state after the last action
    #[must_use]
    pub fn then_state<F>(mut self, check: F) -> Self
    where
        F: FnOnce(&S) + 'static,
    {
        self.state_checks.push(Box::new(check));
        self
    }

    /// Check the effects returned by the last action
    #[must_use]
    pub fn then_effects<F>(mut self, check: F) -> Self
    where
        F: FnOnce(&[Effect<A>]) + 'static,
    {
        self.effect_checks.push(Box::new(check));
        self
    }

    /// Reduce every queued action and run the checks
    ///
    /// # Panics
    ///
    /// Panics when the environment, the starting state or the actions are
    /// missing, or when a check fails.
    #[allow(clippy::panic)] // Test code can panic
    #[allow(clippy::expect_used)] // Test code can use expect
    pub fn run(self) {
        let Self {
            reducer,
            env,
            given,
            steps,
            state_checks,
            effect_checks,
        } = self;

        let env = env.expect("ReducerTest needs with_env()");
        let mut state = given.expect("ReducerTest needs given_state()");
        assert!(!steps.is_empty(), "ReducerTest needs at least one when_action()");

        let last = steps
            .into_iter()
            .fold(Vec::new(), |_, action| reducer.reduce(&mut state, action, &env).into_vec());

        state_checks.into_iter().for_each(|check| check(&state));
        effect_checks.into_iter().for_each(|check| check(&last));
    }
}

/// Checks over the effects a reducer returned
pub mod assertions {
    use resort_booking_core::effect::{Effect, EffectId};
    use std::time::Duration;

    /// Nothing to run: empty, or only `Effect::None`
    ///
    /// # Panics
    ///
    /// Panics on any other effect.
    #[allow(clippy::panic)] // Test assertion
    pub fn assert_no_effects<A: std::fmt::Debug>(effects: &[Effect<A>]) {
        assert!(
            effects.iter().all(Effect::is_none),
            "expected no effects, got {effects:?}"
        );
    }

    /// Exactly `expected` effects
    ///
    /// # Panics
    ///
    /// Panics on a different count.
    #[allow(clippy::panic)] // Test assertion
    pub fn assert_effects_count<A>(effects: &[Effect<A>], expected: usize) {
        let found = effects.len();
        assert_eq!(found, expected, "expected {expected} effects, got {found}");
    }

    /// At least one async call
    ///
    /// # Panics
    ///
    /// Panics when no `Effect::Future` is present.
    #[allow(clippy::panic)] // Test assertion
    pub fn assert_has_future_effect<A>(effects: &[Effect<A>]) {
        assert!(
            effects.iter().any(|effect| matches!(effect, Effect::Future(_))),
            "expected an async effect"
        );
    }

    /// An async call registered under `id`
    ///
    /// # Panics
    ///
    /// Panics when no cancellable `Effect::Future` carries that id.
    #[allow(clippy::panic)] // Test assertion
    pub fn assert_cancellable_future<A: std::fmt::Debug>(effects: &[Effect<A>], id: EffectId) {
        assert!(
            effects.iter().any(|effect| matches!(
                effect,
                Effect::Cancellable { id: found, effect } if *found == id
                    && matches!(effect.as_ref(), Effect::Future(_))
            )),
            "expected an async effect registered under {id}, got {effects:?}"
        );
    }

    /// The delay registered under `id`, as `(duration, action)`
    ///
    /// # Panics
    ///
    /// Panics when no cancellable delay carries that id.
    #[allow(clippy::panic)] // Test assertion
    pub fn expect_timer<'a, A: std::fmt::Debug>(
        effects: &'a [Effect<A>],
        id: EffectId,
    ) -> (Duration, &'a A) {
        effects
            .iter()
            .find_map(|effect| match effect {
                Effect::Cancellable { id: found, effect } if *found == id => {
                    match effect.as_ref() {
                        Effect::Delay { duration, action } => Some((*duration, action.as_ref())),
                        _ => None,
                    }
                },
                _ => None,
            })
            .unwrap_or_else(|| panic!("expected a timer registered as {id}, got {effects:?}"))
    }

    /// A cancellation of `id`
    ///
    /// # Panics
    ///
    /// Panics when no `Effect::Cancel(id)` is present.
    #[allow(clippy::panic)] // Test assertion
    pub fn assert_cancels<A: std::fmt::Debug>(effects: &[Effect<A>], id: EffectId) {
        assert!(
            effects
                .iter()
                .any(|effect| matches!(effect, Effect::Cancel(found) if *found == id)),
            "expected Effect::Cancel({id}), got {effects:?}"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::{assertions, ReducerTest};
    use resort_booking_core::effect::{Effect, EffectId};
    use resort_booking_core::reducer::Reducer;
    use resort_booking_core::{smallvec, SmallVec};
    use std::time::Duration;

    const REMINDER: EffectId = EffectId::new("reminder");

    #[derive(Debug, Default)]
    struct Basket {
        items: u32,
    }

    #[derive(Clone, Debug, PartialEq)]
    enum BasketAction {
        Add,
        Remind,
        Forget,
    }

    struct BasketReducer;

    impl Reducer for BasketReducer {
        type State = Basket;
        type Action = BasketAction;
        type Environment = Duration;

        fn reduce(
            &self,
            basket: &mut Basket,
            action: BasketAction,
            reminder_after: &Duration,
        ) -> SmallVec<[Effect<BasketAction>; 4]> {
            match action {
                BasketAction::Add => {
                    basket.items += 1;
                    SmallVec::new()
                },
                BasketAction::Remind => smallvec![Effect::cancellable(
                    REMINDER,
                    Effect::Delay {
                        duration: *reminder_after,
                        action: Box::new(BasketAction::Add),
                    },
                )],
                BasketAction::Forget => smallvec![Effect::Cancel(REMINDER)],
            }
        }
    }

    fn basket_test() -> ReducerTest<BasketReducer, Basket, BasketAction, Duration> {
        ReducerTest::new(BasketReducer)
            .with_env(Duration::from_secs(2))
            .given_state(Basket::default())
    }

    #[test]
    fn actions_are_reduced_in_order() {
        basket_test()
            .when_action(BasketAction::Remind)
            .when_action(BasketAction::Add)
            .when_action(BasketAction::Add)
            .then_state(|basket| assert_eq!(basket.items, 2))
            .then_effects(assertions::assert_no_effects)
            .run();
    }

    #[test]
    fn timer_is_found_by_id() {
        basket_test()
            .when_action(BasketAction::Remind)
            .then_effects(|effects| {
                let (after, action) = assertions::expect_timer(effects, REMINDER);
                assert_eq!(after, Duration::from_secs(2));
                assert_eq!(action, &BasketAction::Add);
            })
            .run();
    }

    #[test]
    fn cancellation_is_found_by_id() {
        basket_test()
            .when_action(BasketAction::Forget)
            .then_effects(|effects| {
                assertions::assert_effects_count(effects, 1);
                assertions::assert_cancels(effects, REMINDER);
            })
            .run();
    }

    #[test]
    fn registered_future_is_found_by_id() {
        let effects = [
            Effect::Future(Box::pin(async { Some(BasketAction::Add) })),
            Effect::cancellable(
                REMINDER,
                Effect::Future(Box::pin(async { Some(BasketAction::Add) })),
            ),
        ];
        assertions::assert_has_future_effect(&effects);
        assertions::assert_cancellable_future(&effects, REMINDER);
    }

    #[test]
    #[should_panic(expected = "registered under reminder")]
    fn plain_future_is_not_registered() {
        let effects = [Effect::Future(Box::pin(async { Some(BasketAction::Add) }))];
        assertions::assert_cancellable_future(&effects, REMINDER);
    }

    #[test]
    fn none_counts_as_no_effect() {
        assertions::assert_no_effects::<BasketAction>(&[]);
        assertions::assert_no_effects::<BasketAction>(&[Effect::None, Effect::None]);
    }

    #[test]
    #[should_panic(expected = "needs at least one when_action")]
    fn run_without_actions_panics() {
        basket_test().run();
    }
}
