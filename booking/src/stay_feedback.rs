//! Stay feedback on the guest dashboard: one overall rating and comments.

use crate::environment::BookingEnvironment;
use crate::error::FeedbackError;
use crate::sink::SinkDocument;
use crate::types::{DocumentId, StayRating};
use resort_booking_core::effect::Effect;
use resort_booking_core::reducer::Reducer;
use resort_booking_core::{smallvec, SmallVec};
use serde::{Deserialize, Serialize};

/// Visibility of the dashboard feedback dialog
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum StayFeedbackPhase {
    /// Dialog closed
    #[default]
    Closed,
    /// Dialog open
    Open,
    /// Waiting on the sink
    Submitting,
    /// The last submission failed; input is kept
    Failed {
        /// Sink error message
        reason: String,
    },
}

/// State of the dashboard feedback dialog
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StayFeedbackState {
    /// Visibility
    pub phase: StayFeedbackPhase,
    /// Selected rating
    pub rating: Option<StayRating>,
    /// Comment text
    pub comments: String,
    /// Why the last command was rejected
    pub rejection: Option<FeedbackError>,
    /// Id of the last stored submission
    pub last_document: Option<DocumentId>,
}

/// Dashboard feedback actions
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum StayFeedbackAction {
    /// Open the dialog
    Open,
    /// Close the dialog, discarding input
    Close,
    /// Pick the overall rating
    SelectRating {
        /// Rating
        rating: StayRating,
    },
    /// Replace the comments
    SetComments {
        /// New text
        text: String,
    },
    /// Send the feedback
    Submit,
    /// The sink stored it
    Submitted {
        /// Sink id
        document_id: DocumentId,
    },
    /// The sink failed or timed out
    SubmissionFailed {
        /// Error message
        reason: String,
    },
}

/// Reducer of the dashboard feedback dialog
#[derive(Clone, Debug, Default)]
pub struct StayFeedbackReducer;

impl StayFeedbackReducer {
    /// Creates the reducer
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    fn editable(state: &StayFeedbackState) -> Result<(), FeedbackError> {
        match state.phase {
            StayFeedbackPhase::Closed => Err(FeedbackError::NotVisible),
            StayFeedbackPhase::Submitting => Err(FeedbackError::SubmissionInFlight),
            StayFeedbackPhase::Open | StayFeedbackPhase::Failed { .. } => Ok(()),
        }
    }

    fn clear(state: &mut StayFeedbackState) {
        state.phase = StayFeedbackPhase::Closed;
        state.rating = None;
        state.comments.clear();
    }

    fn command(
        state: &mut StayFeedbackState,
        action: StayFeedbackAction,
        env: &BookingEnvironment,
    ) -> Result<SmallVec<[Effect<StayFeedbackAction>; 4]>, FeedbackError> {
        match action {
            StayFeedbackAction::Open => {
                if state.phase == StayFeedbackPhase::Closed {
                    state.phase = StayFeedbackPhase::Open;
                }
            },
            StayFeedbackAction::Close => match state.phase {
                StayFeedbackPhase::Submitting => return Err(FeedbackError::SubmissionInFlight),
                _ => Self::clear(state),
            },
            StayFeedbackAction::SelectRating { rating } => {
                Self::editable(state)?;
                state.rating = Some(rating);
            },
            StayFeedbackAction::SetComments { text } => {
                Self::editable(state)?;
                state.comments = env.settings.clamp_text(text);
            },
            StayFeedbackAction::Submit => {
                Self::editable(state)?;
                let rating = state.rating.ok_or(FeedbackError::RatingRequired)?;
                state.phase = StayFeedbackPhase::Submitting;
                tracing::info!(rating = rating.label(), "Submitting stay feedback");

                let document = SinkDocument::StayFeedback {
                    rating,
                    comment: state.comments.clone(),
                    timestamp: env.clock.now(),
                };
                return Ok(smallvec![env.append_to_sink(document, |result| match result {
                    Ok(document_id) => StayFeedbackAction::Submitted { document_id },
                    Err(reason) => StayFeedbackAction::SubmissionFailed { reason },
                })]);
            },
            StayFeedbackAction::Submitted { .. } | StayFeedbackAction::SubmissionFailed { .. } => {},
        }
        Ok(SmallVec::new())
    }
}

impl Reducer for StayFeedbackReducer {
    type State = StayFeedbackState;
    type Action = StayFeedbackAction;
    type Environment = BookingEnvironment;

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        match action {
            StayFeedbackAction::Submitted { document_id } => {
                if state.phase == StayFeedbackPhase::Submitting {
                    tracing::info!(%document_id, "Stay feedback stored");
                    Self::clear(state);
                    state.last_document = Some(document_id);
                }
                SmallVec::new()
            },
            StayFeedbackAction::SubmissionFailed { reason } => {
                if state.phase == StayFeedbackPhase::Submitting {
                    tracing::warn!(%reason, "Stay feedback submission failed");
                    state.phase = StayFeedbackPhase::Failed { reason };
                }
                SmallVec::new()
            },
            command => {
                state.rejection = None;
                Self::command(state, command, env).unwrap_or_else(|error| {
                    tracing::debug!(%error, "Stay feedback command rejected");
                    state.rejection = Some(error);
                    SmallVec::new()
                })
            },
        }
    }
}
