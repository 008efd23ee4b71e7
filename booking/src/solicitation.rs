//! Feedback solicitation.
//!
//! A dismissible prompt raised a few seconds after a confirmed reservation.
//! The guest picks satisfaction topics, optionally types a suggestion, and
//! either submits it to the sink or skips.
//!
//! Input survives a failed submission: the prompt moves to
//! [`SolicitationPhase::Failed`] with the buffers intact so the guest can
//! retry or skip.

use crate::environment::BookingEnvironment;
use crate::error::FeedbackError;
use crate::sink::SinkDocument;
use crate::types::{DocumentId, FeedbackRecord, FeedbackTopic};
use resort_booking_core::effect::Effect;
use resort_booking_core::reducer::Reducer;
use resort_booking_core::{smallvec, SmallVec};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Visibility of the prompt
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SolicitationPhase {
    /// Not on screen
    #[default]
    Dormant,
    /// On screen, accepting input
    Visible,
    /// Waiting on the sink
    Submitting,
    /// The last submission failed; input is kept
    Failed {
        /// Sink error message
        reason: String,
    },
}

impl SolicitationPhase {
    /// Whether the guest can edit the prompt
    #[must_use]
    pub const fn is_editable(&self) -> bool {
        matches!(self, Self::Visible | Self::Failed { .. })
    }
}

/// State of the feedback prompt
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SolicitationState {
    /// Visibility
    pub phase: SolicitationPhase,
    /// Selected topics
    pub topics: BTreeSet<FeedbackTopic>,
    /// Free-text suggestion
    pub free_text: String,
    /// Why the last command was rejected, cleared by the next command
    pub rejection: Option<FeedbackError>,
    /// Id of the last stored answer
    pub last_document: Option<DocumentId>,
}

impl SolicitationState {
    fn clear_input(&mut self) {
        self.topics.clear();
        self.free_text.clear();
    }
}

/// Feedback prompt actions
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SolicitationAction {
    // Commands
    /// Show the prompt
    Trigger,
    /// Select or deselect a topic by label
    ToggleTopic {
        /// Chip label
        label: String,
    },
    /// Replace the suggestion text
    SetFreeText {
        /// New text
        text: String,
    },
    /// Send the answer
    Submit,
    /// Close without sending
    Skip,

    // Effect results
    /// The sink stored the answer
    FeedbackSubmitted {
        /// Sink id
        document_id: DocumentId,
    },
    /// The sink failed or timed out
    FeedbackSubmissionFailed {
        /// Error message
        reason: String,
    },
}

impl SolicitationAction {
    /// Whether the action comes from the guest or the prompt timer
    #[must_use]
    pub const fn is_command(&self) -> bool {
        !matches!(
            self,
            Self::FeedbackSubmitted { .. } | Self::FeedbackSubmissionFailed { .. }
        )
    }
}

/// Reducer of the feedback prompt
#[derive(Clone, Debug, Default)]
pub struct SolicitationReducer;

impl SolicitationReducer {
    /// Creates the reducer
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    fn submit(
        state: &mut SolicitationState,
        env: &BookingEnvironment,
    ) -> Result<Effect<SolicitationAction>, FeedbackError> {
        match state.phase {
            SolicitationPhase::Dormant => return Err(FeedbackError::NotVisible),
            SolicitationPhase::Submitting => return Err(FeedbackError::SubmissionInFlight),
            SolicitationPhase::Visible | SolicitationPhase::Failed { .. } => {},
        }

        let record = FeedbackRecord {
            topics: state.topics.clone(),
            free_text: state.free_text.clone(),
            submitted_at: env.clock.now(),
        };
        state.phase = SolicitationPhase::Submitting;
        tracing::info!(topics = record.topics.len(), "Submitting feedback");

        Ok(env.append_to_sink(
            SinkDocument::Feedback(record),
            |result| match result {
                Ok(document_id) => SolicitationAction::FeedbackSubmitted { document_id },
                Err(reason) => SolicitationAction::FeedbackSubmissionFailed { reason },
            },
        ))
    }

    fn command(
        state: &mut SolicitationState,
        action: SolicitationAction,
        env: &BookingEnvironment,
    ) -> Result<SmallVec<[Effect<SolicitationAction>; 4]>, FeedbackError> {
        match action {
            SolicitationAction::Trigger => {
                if state.phase == SolicitationPhase::Dormant {
                    tracing::info!("Feedback prompt shown");
                    state.clear_input();
                    state.phase = SolicitationPhase::Visible;
                } else {
                    tracing::debug!(phase = ?state.phase, "Feedback prompt already open");
                }
            },
            SolicitationAction::ToggleTopic { label } => {
                if !state.phase.is_editable() {
                    tracing::debug!(%label, "Topic toggled while the prompt is closed");
                } else if let Some(topic) = FeedbackTopic::from_label(&label) {
                    if !state.topics.remove(&topic) {
                        state.topics.insert(topic);
                    }
                } else {
                    tracing::debug!(%label, "Ignoring unknown feedback topic");
                }
            },
            SolicitationAction::SetFreeText { text } => {
                if state.phase.is_editable() {
                    state.free_text = env.settings.clamp_text(text);
                } else {
                    tracing::debug!("Free text set while the prompt is closed");
                }
            },
            SolicitationAction::Submit => return Ok(smallvec![Self::submit(state, env)?]),
            SolicitationAction::Skip => match state.phase {
                SolicitationPhase::Submitting => return Err(FeedbackError::SubmissionInFlight),
                SolicitationPhase::Dormant => {},
                SolicitationPhase::Visible | SolicitationPhase::Failed { .. } => {
                    tracing::info!("Feedback prompt skipped");
                    state.clear_input();
                    state.phase = SolicitationPhase::Dormant;
                },
            },
            SolicitationAction::FeedbackSubmitted { .. }
            | SolicitationAction::FeedbackSubmissionFailed { .. } => {},
        }
        Ok(SmallVec::new())
    }
}

impl Reducer for SolicitationReducer {
    type State = SolicitationState;
    type Action = SolicitationAction;
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
                tracing::debug!(%error, "Feedback command rejected");
                state.rejection = Some(error);
                SmallVec::new()
            });
        }

        if state.phase != SolicitationPhase::Submitting {
            tracing::warn!(?action, "Submission result without a pending submission");
            return SmallVec::new();
        }

        match action {
            SolicitationAction::FeedbackSubmitted { document_id } => {
                tracing::info!(%document_id, "Feedback stored");
                metrics::counter!("booking.feedback.submitted").increment(1);
                state.clear_input();
                state.phase = SolicitationPhase::Dormant;
                state.last_document = Some(document_id);
            },
            SolicitationAction::FeedbackSubmissionFailed { reason } => {
                tracing::warn!(%reason, "Feedback submission failed");
                metrics::counter!("booking.feedback.failed").increment(1);
                state.phase = SolicitationPhase::Failed { reason };
            },
            _ => {},
        }
        SmallVec::new()
    }
}
