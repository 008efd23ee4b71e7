//! Async command facade over a booking [`Store`].
//!
//! Every UI command is one method returning `Result`. Commands are sent one
//! at a time, so the rejection a feature records is read back for the command
//! that caused it. `confirm` and `submit` additionally wait for the outcome
//! of their remote call, without holding up other commands meanwhile.

use crate::app::{BookingAction, BookingReducer, BookingState};
use crate::catalog;
use crate::config::BookingConfig;
use crate::environment::{BookingEnvironment, FlowSettings};
use crate::error::{BookingError, FeedbackError, InventoryError, WorkflowError};
use crate::identity::StaticIdentity;
use crate::inventory::InMemoryInventory;
use crate::reviews::ReviewAction;
use crate::sink::{FeedbackSink, InMemorySink, RestSink};
use crate::solicitation::{SolicitationAction, SolicitationState};
use crate::stay_feedback::{StayFeedbackAction, StayFeedbackState};
use crate::types::{DocumentId, ResortId, ReservationIntent, Review, Room, RoomId, StayRating};
use crate::workflow::{ReservationAction, WorkflowPhase};
use resort_booking_core::environment::SystemClock;
use resort_booking_runtime::{EffectHandle, Store, StoreConfig, StoreError, UniformJitter};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, Mutex};

/// Store running the booking reducers
pub type BookingStore = Store<BookingState, BookingAction, BookingEnvironment, BookingReducer>;

/// One guest's booking screen
pub struct BookingSession {
    store: BookingStore,
    commands: Mutex<()>,
    outcome_timeout: Duration,
}

impl BookingSession {
    /// Session over the given collaborators
    #[must_use]
    pub fn new(environment: BookingEnvironment) -> Self {
        Self::with_store_config(environment, StoreConfig::default())
    }

    /// Session with a custom store configuration
    #[must_use]
    pub fn with_store_config(environment: BookingEnvironment, config: StoreConfig) -> Self {
        let outcome_timeout = environment.settings.outcome_timeout();
        Self {
            store: Store::with_config(
                BookingState::new(),
                BookingReducer::new(),
                environment,
                config,
            ),
            commands: Mutex::new(()),
            outcome_timeout,
        }
    }

    /// Session over the seeded catalog, an anonymous guest and the sink named
    /// by the configuration
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or the sink URL
    /// cannot be used.
    pub fn from_config(config: &BookingConfig) -> Result<Self, BookingError> {
        config.validate()?;

        let sink: Arc<dyn FeedbackSink> = match &config.feedback.sink_url {
            Some(url) => Arc::new(RestSink::new(url.clone())?),
            None => Arc::new(InMemorySink::new()),
        };
        tracing::info!(
            resort_id = %config.reservation.resort_id,
            remote_sink = config.feedback.sink_url.is_some(),
            "Starting booking session"
        );

        Ok(Self::new(BookingEnvironment {
            clock: Arc::new(SystemClock),
            jitter: Arc::new(UniformJitter),
            inventory: Arc::new(InMemoryInventory::new(catalog::rooms())?),
            identity: Arc::new(StaticIdentity::anonymous()),
            sink,
            settings: FlowSettings::from_config(config),
        }))
    }

    /// The underlying store
    #[must_use]
    pub const fn store(&self) -> &BookingStore {
        &self.store
    }

    fn environment(&self) -> &BookingEnvironment {
        self.store.environment()
    }

    // ========================================================================
    // Render data
    // ========================================================================

    /// Rooms of the resort in catalog order
    pub async fn rooms(&self) -> Vec<Room> {
        self.environment().inventory.list_rooms().await
    }

    /// Current workflow phase
    pub async fn workflow_phase(&self) -> WorkflowPhase {
        self.store.state(|state| state.reservation.phase.clone()).await
    }

    /// Reservation awaiting confirmation
    pub async fn active_intent(&self) -> Option<ReservationIntent> {
        self.store
            .state(|state| state.reservation.phase.intent().cloned())
            .await
    }

    /// Last inventory failure still on screen
    pub async fn reservation_failure(&self) -> Option<WorkflowError> {
        self.store.state(|state| state.reservation.failure.clone()).await
    }

    /// Feedback prompt
    pub async fn solicitation(&self) -> SolicitationState {
        self.store.state(|state| state.solicitation.clone()).await
    }

    /// Dashboard feedback dialog
    pub async fn stay_feedback(&self) -> StayFeedbackState {
        self.store.state(|state| state.stay_feedback.clone()).await
    }

    /// Reviews of a resort, oldest first
    pub async fn reviews(&self, resort_id: &ResortId) -> Vec<Review> {
        self.store
            .state(|state| state.reviews.for_resort(resort_id).to_vec())
            .await
    }

    /// Mean review rating of a resort
    pub async fn average_rating(&self, resort_id: &ResortId) -> Option<f64> {
        self.store
            .state(|state| state.reviews.average_rating(resort_id))
            .await
    }

    // ========================================================================
    // Reservation commands
    // ========================================================================

    /// Open the confirmation surface for a room
    ///
    /// # Errors
    ///
    /// `NotFound` for a room outside the catalog, otherwise the workflow's
    /// rejection (`RoomUnavailable`, `SelectionInProgress`, `SignInRequired`).
    pub async fn select_room(&self, room_id: &RoomId) -> Result<ReservationIntent, BookingError> {
        let room = self
            .rooms()
            .await
            .into_iter()
            .find(|room| &room.id == room_id)
            .ok_or_else(|| InventoryError::NotFound {
                room_id: room_id.clone(),
            })?;

        let _guard = self.commands.lock().await;
        self.dispatch(
            BookingAction::Reservation(ReservationAction::SelectRoom { room }),
            |state| state.reservation.rejection.clone(),
        )
        .await?;
        self.store
            .state(|state| state.reservation.phase.intent().cloned())
            .await
            .ok_or_else(|| WorkflowError::NoActiveIntent.into())
    }

    /// Change the occupancy of the active reservation
    ///
    /// # Errors
    ///
    /// `NoActiveIntent`, `InvalidOption` or `ConfirmationInFlight`.
    pub async fn update_guest_composition(&self, value: &str) -> Result<(), BookingError> {
        self.reservation(ReservationAction::UpdateGuestComposition {
            value: value.to_string(),
        })
        .await
    }

    /// Reserve the selected room and wait for the inventory's answer
    ///
    /// # Errors
    ///
    /// `NoActiveIntent` or `ConfirmationInFlight` without touching the
    /// inventory, `ReservationFailed` when the inventory refused, or a store
    /// timeout when no answer arrived.
    pub async fn confirm(&self) -> Result<Room, BookingError> {
        let mut outcomes = self.store.subscribe_actions();
        self.reservation(ReservationAction::Confirm).await?;

        let outcome = self
            .outcome(&mut outcomes, |action| match action {
                BookingAction::Reservation(ReservationAction::RoomReserved { room }) => {
                    Some(Ok(room.clone()))
                },
                BookingAction::Reservation(ReservationAction::ReservationFailed {
                    room_id,
                    reason,
                }) => Some(Err(WorkflowError::ReservationFailed {
                    room_id: room_id.clone(),
                    reason: reason.clone(),
                })),
                _ => None,
            })
            .await?;
        Ok(outcome?)
    }

    /// Close the confirmation surface without reserving
    ///
    /// # Errors
    ///
    /// `NoActiveIntent` or `ConfirmationInFlight`.
    pub async fn cancel(&self) -> Result<(), BookingError> {
        self.reservation(ReservationAction::Cancel).await
    }

    /// Close the success surface; the feedback prompt stays scheduled
    ///
    /// # Errors
    ///
    /// `NothingToDismiss` outside the confirmed phase.
    pub async fn dismiss_success(&self) -> Result<(), BookingError> {
        self.reservation(ReservationAction::DismissSuccess).await
    }

    // ========================================================================
    // Feedback prompt commands
    // ========================================================================

    /// Wait until the feedback prompt is on screen
    ///
    /// # Errors
    ///
    /// A store timeout when the prompt did not appear within `timeout`.
    pub async fn wait_for_feedback_prompt(&self, timeout: Duration) -> Result<(), BookingError> {
        let mut actions = self.store.subscribe_actions();
        if self
            .store
            .state(|state| state.solicitation.phase.is_editable())
            .await
        {
            return Ok(());
        }

        tokio::time::timeout(
            timeout,
            next_matching(&mut actions, |action| {
                matches!(
                    action,
                    BookingAction::Reservation(ReservationAction::FeedbackDue)
                )
                .then_some(())
            }),
        )
        .await
        .map_err(|_| StoreError::Timeout)??;
        Ok(())
    }

    /// Select or deselect a feedback topic
    ///
    /// # Errors
    ///
    /// Only store errors; toggles outside the prompt are ignored.
    pub async fn toggle_topic(&self, label: &str) -> Result<(), BookingError> {
        self.feedback(SolicitationAction::ToggleTopic {
            label: label.to_string(),
        })
        .await
    }

    /// Replace the suggestion text, truncated to the configured limit
    ///
    /// # Errors
    ///
    /// Only store errors.
    pub async fn set_free_text(&self, text: &str) -> Result<(), BookingError> {
        self.feedback(SolicitationAction::SetFreeText {
            text: text.to_string(),
        })
        .await
    }

    /// Send the feedback and wait for the sink
    ///
    /// # Errors
    ///
    /// `NotVisible` or `SubmissionInFlight` without calling the sink,
    /// `SinkUnavailable` when the sink failed; input is kept in that case.
    pub async fn submit(&self) -> Result<DocumentId, BookingError> {
        let mut outcomes = self.store.subscribe_actions();
        self.feedback(SolicitationAction::Submit).await?;

        let outcome = self
            .outcome(&mut outcomes, |action| match action {
                BookingAction::Feedback(SolicitationAction::FeedbackSubmitted { document_id }) => {
                    Some(Ok(document_id.clone()))
                },
                BookingAction::Feedback(SolicitationAction::FeedbackSubmissionFailed {
                    reason,
                }) => Some(Err(FeedbackError::SinkUnavailable {
                    reason: reason.clone(),
                })),
                _ => None,
            })
            .await?;
        Ok(outcome?)
    }

    /// Close the prompt without sending
    ///
    /// # Errors
    ///
    /// `SubmissionInFlight` while the sink call runs.
    pub async fn skip(&self) -> Result<(), BookingError> {
        self.feedback(SolicitationAction::Skip).await
    }

    // ========================================================================
    // Reviews
    // ========================================================================

    /// Post a resort review
    ///
    /// The review is listed immediately. The returned handle resolves once
    /// the copy to the sink has finished.
    ///
    /// # Errors
    ///
    /// The review's validation error.
    pub async fn add_review(
        &self,
        resort_id: &ResortId,
        rating: u8,
        author: &str,
        comment: &str,
    ) -> Result<EffectHandle, BookingError> {
        let _guard = self.commands.lock().await;
        self.dispatch(
            BookingAction::Review(ReviewAction::AddReview {
                resort_id: resort_id.clone(),
                rating,
                author: author.to_string(),
                comment: comment.to_string(),
            }),
            |state| state.reviews.rejection.clone(),
        )
        .await
    }

    // ========================================================================
    // Stay feedback
    // ========================================================================

    /// Open the dashboard feedback dialog
    ///
    /// # Errors
    ///
    /// Only store errors.
    pub async fn open_stay_feedback(&self) -> Result<(), BookingError> {
        self.stay(StayFeedbackAction::Open).await
    }

    /// Close the dialog, discarding input
    ///
    /// # Errors
    ///
    /// `SubmissionInFlight` while the sink call runs.
    pub async fn close_stay_feedback(&self) -> Result<(), BookingError> {
        self.stay(StayFeedbackAction::Close).await
    }

    /// Pick the overall rating
    ///
    /// # Errors
    ///
    /// `NotVisible` or `SubmissionInFlight`.
    pub async fn rate_stay(&self, rating: StayRating) -> Result<(), BookingError> {
        self.stay(StayFeedbackAction::SelectRating { rating }).await
    }

    /// Replace the comments, truncated to the configured limit
    ///
    /// # Errors
    ///
    /// `NotVisible` or `SubmissionInFlight`.
    pub async fn set_stay_comments(&self, text: &str) -> Result<(), BookingError> {
        self.stay(StayFeedbackAction::SetComments {
            text: text.to_string(),
        })
        .await
    }

    /// Send the stay feedback and wait for the sink
    ///
    /// # Errors
    ///
    /// `RatingRequired`, `NotVisible` or `SubmissionInFlight` without calling
    /// the sink, `SinkUnavailable` when the sink failed.
    pub async fn submit_stay_feedback(&self) -> Result<DocumentId, BookingError> {
        let mut outcomes = self.store.subscribe_actions();
        self.stay(StayFeedbackAction::Submit).await?;

        let outcome = self
            .outcome(&mut outcomes, |action| match action {
                BookingAction::StayFeedback(StayFeedbackAction::Submitted { document_id }) => {
                    Some(Ok(document_id.clone()))
                },
                BookingAction::StayFeedback(StayFeedbackAction::SubmissionFailed { reason }) => {
                    Some(Err(FeedbackError::SinkUnavailable {
                        reason: reason.clone(),
                    }))
                },
                _ => None,
            })
            .await?;
        Ok(outcome?)
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Sign the current guest out
    pub fn sign_out(&self) {
        self.environment().identity.sign_out();
    }

    /// Leave the screen: cancel the feedback prompt timer, abort remote calls
    /// still in flight and stop the store
    ///
    /// Safe to call more than once. A `confirm` or `submit` waiting on an
    /// aborted call returns `ShutdownInProgress`.
    ///
    /// # Errors
    ///
    /// A shutdown timeout when effects are still running afterwards.
    pub async fn teardown(&self) -> Result<(), BookingError> {
        match self.store.send(BookingAction::TearDown).await {
            Ok(_) | Err(StoreError::ShutdownInProgress) => {},
            Err(error) => return Err(error.into()),
        }
        self.store.teardown().await?;
        Ok(())
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    async fn reservation(&self, action: ReservationAction) -> Result<(), BookingError> {
        let _guard = self.commands.lock().await;
        self.dispatch(BookingAction::Reservation(action), |state| {
            state.reservation.rejection.clone()
        })
        .await
        .map(drop)
    }

    async fn feedback(&self, action: SolicitationAction) -> Result<(), BookingError> {
        let _guard = self.commands.lock().await;
        self.dispatch(BookingAction::Feedback(action), |state| {
            state.solicitation.rejection.clone()
        })
        .await
        .map(drop)
    }

    async fn stay(&self, action: StayFeedbackAction) -> Result<(), BookingError> {
        let _guard = self.commands.lock().await;
        self.dispatch(BookingAction::StayFeedback(action), |state| {
            state.stay_feedback.rejection.clone()
        })
        .await
        .map(drop)
    }

    /// Send a command and turn the rejection it recorded into an error.
    /// Callers hold `commands`.
    async fn dispatch<E>(
        &self,
        action: BookingAction,
        rejection: fn(&BookingState) -> Option<E>,
    ) -> Result<EffectHandle, BookingError>
    where
        BookingError: From<E>,
    {
        let handle = self.store.send(action).await?;
        match self.store.state(rejection).await {
            Some(error) => Err(error.into()),
            None => Ok(handle),
        }
    }

    async fn outcome<T, F>(
        &self,
        receiver: &mut broadcast::Receiver<BookingAction>,
        matcher: F,
    ) -> Result<T, BookingError>
    where
        F: FnMut(&BookingAction) -> Option<T>,
    {
        let wait = tokio::time::timeout(self.outcome_timeout, next_matching(receiver, matcher));
        tokio::select! {
            biased;
            found = wait => Ok(found.map_err(|_| StoreError::Timeout)??),
            () = self.store.closed() => Err(StoreError::ShutdownInProgress.into()),
        }
    }
}

impl std::fmt::Debug for BookingSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BookingSession")
            .field("outcome_timeout", &self.outcome_timeout)
            .field("shut_down", &self.store.is_shut_down())
            .finish_non_exhaustive()
    }
}

async fn next_matching<T, F>(
    receiver: &mut broadcast::Receiver<BookingAction>,
    mut matcher: F,
) -> Result<T, StoreError>
where
    F: FnMut(&BookingAction) -> Option<T>,
{
    loop {
        match receiver.recv().await {
            Ok(action) => {
                if let Some(found) = matcher(&action) {
                    return Ok(found);
                }
            },
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "Outcome observer lagged behind");
            },
            Err(broadcast::error::RecvError::Closed) => return Err(StoreError::ChannelClosed),
        }
    }
}
