//! Root reducer of a booking session.
//!
//! Routes each action to the feature that owns it. The only cross-feature
//! rule lives here: the reservation workflow's feedback timer raises the
//! feedback prompt. Teardown cancels that timer and freezes the session.

use crate::environment::BookingEnvironment;
use crate::reviews::{ReviewAction, ReviewReducer, ReviewsState};
use crate::solicitation::{SolicitationAction, SolicitationReducer, SolicitationState};
use crate::stay_feedback::{StayFeedbackAction, StayFeedbackReducer, StayFeedbackState};
use crate::workflow::{
    ReservationAction, ReservationReducer, ReservationState, FEEDBACK_PROMPT_TIMER,
};
use resort_booking_core::composition::scope;
use resort_booking_core::effect::Effect;
use resort_booking_core::reducer::Reducer;
use resort_booking_core::{smallvec, SmallVec};
use serde::{Deserialize, Serialize};

/// Lifecycle of the session
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionPhase {
    /// Accepting actions
    #[default]
    Active,
    /// The screen was left; every action is ignored
    TornDown,
}

/// Everything a booking screen renders
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingState {
    /// Reservation workflow
    pub reservation: ReservationState,
    /// Feedback prompt
    pub solicitation: SolicitationState,
    /// Resort reviews
    pub reviews: ReviewsState,
    /// Dashboard feedback dialog
    pub stay_feedback: StayFeedbackState,
    /// Lifecycle
    pub session: SessionPhase,
}

impl BookingState {
    /// Fresh session with the seeded reviews
    #[must_use]
    pub fn new() -> Self {
        Self {
            reservation: ReservationState::default(),
            solicitation: SolicitationState::default(),
            reviews: ReviewsState::seeded(),
            stay_feedback: StayFeedbackState::default(),
            session: SessionPhase::Active,
        }
    }
}

impl Default for BookingState {
    fn default() -> Self {
        Self::new()
    }
}

/// Root action of a booking session
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum BookingAction {
    /// Reservation workflow
    Reservation(ReservationAction),
    /// Feedback prompt
    Feedback(SolicitationAction),
    /// Resort reviews
    Review(ReviewAction),
    /// Dashboard feedback dialog
    StayFeedback(StayFeedbackAction),
    /// The guest left the screen
    TearDown,
}

/// Root reducer of a booking session
#[derive(Clone, Debug, Default)]
pub struct BookingReducer {
    reservation: ReservationReducer,
    solicitation: SolicitationReducer,
    reviews: ReviewReducer,
    stay_feedback: StayFeedbackReducer,
}

impl BookingReducer {
    /// Creates the reducer
    #[must_use]
    pub const fn new() -> Self {
        Self {
            reservation: ReservationReducer::new(),
            solicitation: SolicitationReducer::new(),
            reviews: ReviewReducer::new(),
            stay_feedback: StayFeedbackReducer::new(),
        }
    }
}

impl Reducer for BookingReducer {
    type State = BookingState;
    type Action = BookingAction;
    type Environment = BookingEnvironment;

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        if state.session == SessionPhase::TornDown {
            tracing::debug!(?action, "Session torn down, action ignored");
            return SmallVec::new();
        }

        match action {
            BookingAction::TearDown => {
                tracing::info!("Booking session torn down");
                state.session = SessionPhase::TornDown;
                smallvec![Effect::Cancel(FEEDBACK_PROMPT_TIMER)]
            },
            BookingAction::Reservation(ReservationAction::FeedbackDue) => {
                tracing::info!("Feedback prompt due");
                scope(
                    &self.solicitation,
                    &mut state.solicitation,
                    SolicitationAction::Trigger,
                    env,
                    BookingAction::Feedback,
                )
            },
            BookingAction::Reservation(action) => scope(
                &self.reservation,
                &mut state.reservation,
                action,
                env,
                BookingAction::Reservation,
            ),
            BookingAction::Feedback(action) => scope(
                &self.solicitation,
                &mut state.solicitation,
                action,
                env,
                BookingAction::Feedback,
            ),
            BookingAction::Review(action) => scope(
                &self.reviews,
                &mut state.reviews,
                action,
                env,
                BookingAction::Review,
            ),
            BookingAction::StayFeedback(action) => scope(
                &self.stay_feedback,
                &mut state.stay_feedback,
                action,
                env,
                BookingAction::StayFeedback,
            ),
        }
    }
}
