//! Reservation workflow.
//!
//! Drives a guest from room selection to confirmation:
//!
//! ```text
//! Idle --SelectRoom--> Confirming --Confirm(ok)--> Confirmed --DismissSuccess--> Idle
//!                         |   \--Confirm(failed)--> Idle
//!                         \--Cancel--> Idle
//! ```
//!
//! A successful confirmation schedules the feedback prompt after a random
//! delay, registered under [`FEEDBACK_PROMPT_TIMER`] so a teardown can cancel
//! it before it fires.

use crate::config::SelectionPolicy;
use crate::environment::BookingEnvironment;
use crate::error::WorkflowError;
use crate::types::{GuestComposition, ReservationIntent, Room, RoomId};
use resort_booking_core::effect::{Effect, EffectId};
use resort_booking_core::reducer::Reducer;
use resort_booking_core::{async_effect, smallvec, timer, SmallVec};
use resort_booking_runtime::retry::retry_with_timeout;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Cancellation id of the delayed feedback prompt
pub const FEEDBACK_PROMPT_TIMER: EffectId = EffectId::new("feedback-prompt");

/// Registry id of the inventory call of a confirmation
pub const INVENTORY_CALL: EffectId = EffectId::new("inventory-call");

// ============================================================================
// State
// ============================================================================

/// Where the guest is in the reservation flow
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum WorkflowPhase {
    /// Browsing rooms
    #[default]
    Idle,
    /// Confirmation surface open
    Confirming {
        /// The reservation being confirmed
        intent: ReservationIntent,
        /// The inventory call is running
        in_flight: bool,
    },
    /// Success surface open
    Confirmed {
        /// The room that was reserved
        room_id: RoomId,
    },
}

impl WorkflowPhase {
    /// Browsing rooms
    #[must_use]
    pub const fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }

    /// Confirmation surface open
    #[must_use]
    pub const fn is_confirming(&self) -> bool {
        matches!(self, Self::Confirming { .. })
    }

    /// Success surface open
    #[must_use]
    pub const fn is_confirmed(&self) -> bool {
        matches!(self, Self::Confirmed { .. })
    }

    /// The active intent, if any
    #[must_use]
    pub const fn intent(&self) -> Option<&ReservationIntent> {
        match self {
            Self::Confirming { intent, .. } => Some(intent),
            _ => None,
        }
    }
}

/// State of the reservation workflow
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReservationState {
    /// Current phase
    pub phase: WorkflowPhase,
    /// Why the last command was rejected, cleared by the next command
    pub rejection: Option<WorkflowError>,
    /// Last inventory failure, shown until the next successful selection
    pub failure: Option<WorkflowError>,
    /// Occupancy of a failed attempt, offered again on the next selection
    pub remembered_guests: Option<GuestComposition>,
}

// ============================================================================
// Actions
// ============================================================================

/// Reservation workflow actions
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReservationAction {
    // Commands
    /// Open the confirmation surface for a room
    SelectRoom {
        /// Room as the guest saw it
        room: Room,
    },
    /// Change the occupancy of the active intent
    UpdateGuestComposition {
        /// Picker label
        value: String,
    },
    /// Reserve the room of the active intent
    Confirm,
    /// Close the confirmation surface without reserving
    Cancel,
    /// Close the success surface
    DismissSuccess,

    // Effect results
    /// The inventory marked the room unavailable
    RoomReserved {
        /// Updated room
        room: Room,
    },
    /// The inventory refused or failed
    ReservationFailed {
        /// Room that was not reserved
        room_id: RoomId,
        /// Error message
        reason: String,
    },
    /// The feedback prompt delay elapsed
    FeedbackDue,
}

impl ReservationAction {
    /// Whether the action comes from the guest rather than from an effect
    #[must_use]
    pub const fn is_command(&self) -> bool {
        matches!(
            self,
            Self::SelectRoom { .. }
                | Self::UpdateGuestComposition { .. }
                | Self::Confirm
                | Self::Cancel
                | Self::DismissSuccess
        )
    }
}

// ============================================================================
// Reducer
// ============================================================================

/// Reducer of the reservation workflow
#[derive(Clone, Debug, Default)]
pub struct ReservationReducer;

impl ReservationReducer {
    /// Creates the reducer
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    fn select_room(
        state: &mut ReservationState,
        room: &Room,
        env: &BookingEnvironment,
    ) -> Result<(), WorkflowError> {
        if !state.phase.is_idle() {
            return Err(WorkflowError::SelectionInProgress);
        }
        if env.settings.selection_policy == SelectionPolicy::RequireSignIn
            && env.identity.current_user().is_none()
        {
            return Err(WorkflowError::SignInRequired);
        }
        if !room.available {
            return Err(WorkflowError::RoomUnavailable {
                room_id: room.id.clone(),
            });
        }

        let guests = state.remembered_guests.take().unwrap_or_default();
        tracing::info!(room_id = %room.id, %guests, "Reservation started");
        state.failure = None;
        state.phase = WorkflowPhase::Confirming {
            intent: ReservationIntent {
                room_id: room.id.clone(),
                guests,
            },
            in_flight: false,
        };
        Ok(())
    }

    fn update_guests(state: &mut ReservationState, value: &str) -> Result<(), WorkflowError> {
        let WorkflowPhase::Confirming { intent, in_flight } = &mut state.phase else {
            return Err(WorkflowError::NoActiveIntent);
        };
        if *in_flight {
            return Err(WorkflowError::ConfirmationInFlight);
        }
        intent.guests = GuestComposition::parse(value)?;
        Ok(())
    }

    fn confirm(
        state: &mut ReservationState,
        env: &BookingEnvironment,
    ) -> Result<Effect<ReservationAction>, WorkflowError> {
        let WorkflowPhase::Confirming { intent, in_flight } = &mut state.phase else {
            return Err(WorkflowError::NoActiveIntent);
        };
        if *in_flight {
            return Err(WorkflowError::ConfirmationInFlight);
        }
        *in_flight = true;

        let room_id = intent.room_id.clone();
        let reserved_by = env.identity.current_user().map(|user| user.display_name);
        let inventory = Arc::clone(&env.inventory);
        let policy = env.settings.inventory_call.clone();
        tracing::info!(%room_id, guests = %intent.guests, "Confirming reservation");

        let call = async_effect! {
            let result = retry_with_timeout(&policy, || {
                let inventory = Arc::clone(&inventory);
                let room_id = room_id.clone();
                let reserved_by = reserved_by.clone();
                async move { inventory.mark_unavailable(&room_id, reserved_by).await }
            })
            .await;

            match result {
                Ok(room) => Some(ReservationAction::RoomReserved { room }),
                Err(error) => Some(ReservationAction::ReservationFailed {
                    room_id,
                    reason: error.to_string(),
                }),
            }
        };
        Ok(Effect::cancellable(INVENTORY_CALL, call))
    }

    fn cancel(state: &mut ReservationState) -> Result<(), WorkflowError> {
        match &state.phase {
            WorkflowPhase::Confirming { in_flight: true, .. } => {
                Err(WorkflowError::ConfirmationInFlight)
            },
            WorkflowPhase::Confirming { intent, .. } => {
                tracing::info!(room_id = %intent.room_id, "Reservation cancelled");
                state.phase = WorkflowPhase::Idle;
                Ok(())
            },
            _ => Err(WorkflowError::NoActiveIntent),
        }
    }

    fn dismiss_success(state: &mut ReservationState) -> Result<(), WorkflowError> {
        if !state.phase.is_confirmed() {
            return Err(WorkflowError::NothingToDismiss);
        }
        state.phase = WorkflowPhase::Idle;
        Ok(())
    }

    fn command(
        state: &mut ReservationState,
        action: ReservationAction,
        env: &BookingEnvironment,
    ) -> Result<SmallVec<[Effect<ReservationAction>; 4]>, WorkflowError> {
        match action {
            ReservationAction::SelectRoom { room } => Self::select_room(state, &room, env)?,
            ReservationAction::UpdateGuestComposition { value } => {
                Self::update_guests(state, &value)?;
            },
            ReservationAction::Confirm => return Ok(smallvec![Self::confirm(state, env)?]),
            ReservationAction::Cancel => Self::cancel(state)?,
            ReservationAction::DismissSuccess => Self::dismiss_success(state)?,
            ReservationAction::RoomReserved { .. }
            | ReservationAction::ReservationFailed { .. }
            | ReservationAction::FeedbackDue => {},
        }
        Ok(SmallVec::new())
    }
}

impl Reducer for ReservationReducer {
    type State = ReservationState;
    type Action = ReservationAction;
    type Environment = BookingEnvironment;

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        if action.is_command() {
            state.rejection = None;
            return Self::command(state, action, env).unwrap_or_else(|error| {
                tracing::debug!(%error, "Reservation command rejected");
                state.rejection = Some(error);
                SmallVec::new()
            });
        }

        match action {
            // ========== Inventory accepted the reservation ==========
            ReservationAction::RoomReserved { room } => {
                let matches_intent = matches!(
                    &state.phase,
                    WorkflowPhase::Confirming { intent, in_flight: true } if intent.room_id == room.id
                );
                if !matches_intent {
                    tracing::warn!(room_id = %room.id, "Reservation result without a pending confirmation");
                    return SmallVec::new();
                }

                state.phase = WorkflowPhase::Confirmed {
                    room_id: room.id.clone(),
                };
                state.failure = None;
                state.remembered_guests = None;
                metrics::counter!("booking.reservations.confirmed").increment(1);

                let delay = env.jitter.pick(env.settings.feedback_delay);
                tracing::info!(
                    room_id = %room.id,
                    delay_ms = delay.as_millis(),
                    "Reservation confirmed, feedback prompt scheduled"
                );
                smallvec![timer! {
                    id: FEEDBACK_PROMPT_TIMER,
                    duration: delay,
                    action: ReservationAction::FeedbackDue
                }]
            },

            // ========== Inventory refused or failed ==========
            ReservationAction::ReservationFailed { room_id, reason } => {
                let WorkflowPhase::Confirming { intent, in_flight: true } = &state.phase else {
                    tracing::warn!(%room_id, "Reservation failure without a pending confirmation");
                    return SmallVec::new();
                };
                if intent.room_id != room_id {
                    tracing::warn!(%room_id, "Reservation failure for another room");
                    return SmallVec::new();
                }

                tracing::warn!(%room_id, %reason, "Reservation failed");
                metrics::counter!("booking.reservations.failed").increment(1);
                state.remembered_guests = Some(intent.guests);
                state.phase = WorkflowPhase::Idle;
                state.failure = Some(WorkflowError::ReservationFailed { room_id, reason });
                SmallVec::new()
            },

            // Routed to the feedback prompt by the app reducer
            ReservationAction::FeedbackDue
            | ReservationAction::SelectRoom { .. }
            | ReservationAction::UpdateGuestComposition { .. }
            | ReservationAction::Confirm
            | ReservationAction::Cancel
            | ReservationAction::DismissSuccess => SmallVec::new(),
        }
    }
}
