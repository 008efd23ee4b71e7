//! Reducer composition utilities
//!
//! A screen is built from several feature reducers, each owning a slice of the
//! parent state and its own action enum. [`scope`] runs a child reducer on its
//! slice and lifts the returned effects into the parent action type, so
//! actions produced by child effects are routed back through the parent.
//!
//! # Example
//!
//! ```
//! use resort_booking_core::composition::scope;
//! use resort_booking_core::effect::Effect;
//! use resort_booking_core::reducer::Reducer;
//! use resort_booking_core::SmallVec;
//!
//! #[derive(Default)]
//! struct Counter {
//!     count: i32,
//! }
//!
//! enum CounterAction {
//!     Increment,
//! }
//!
//! enum AppAction {
//!     Counter(CounterAction),
//! }
//!
//! struct CounterReducer;
//!
//! impl Reducer for CounterReducer {
//!     type State = Counter;
//!     type Action = CounterAction;
//!     type Environment = ();
//!
//!     fn reduce(
//!         &self,
//!         state: &mut Counter,
//!         action: CounterAction,
//!         _env: &(),
//!     ) -> SmallVec<[Effect<CounterAction>; 4]> {
//!         match action {
//!             CounterAction::Increment => state.count += 1,
//!         }
//!         SmallVec::new()
//!     }
//! }
//!
//! let mut counter = Counter::default();
//! let effects = scope(&CounterReducer, &mut counter, CounterAction::Increment, &(), AppAction::Counter);
//! assert_eq!(counter.count, 1);
//! assert!(effects.is_empty());
//! ```

use crate::effect::Effect;
use crate::reducer::Reducer;
use smallvec::SmallVec;

/// Run a child reducer on its slice of state and embed its effects.
///
/// `embed` wraps child actions into the parent action type. It is usually
/// the parent enum's tuple-variant constructor.
pub fn scope<R, ParentAction>(
    reducer: &R,
    state: &mut R::State,
    action: R::Action,
    env: &R::Environment,
    embed: fn(R::Action) -> ParentAction,
) -> SmallVec<[Effect<ParentAction>; 4]>
where
    R: Reducer,
    R::Action: 'static,
    ParentAction: 'static,
{
    reducer
        .reduce(state, action, env)
        .into_iter()
        .filter(|effect| !effect.is_none())
        .map(|effect| effect.map(embed))
        .collect()
}
