//! Error types for the booking front end.
//!
//! Every error here is recoverable: a rejected command leaves its feature in
//! the last stable state, and a collaborator failure is surfaced to the guest
//! while their input is kept.

use crate::types::{ResortId, RoomId};
use resort_booking_runtime::StoreError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Rejections and failures of the reservation workflow
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum WorkflowError {
    /// The room is already held
    #[error("Room {room_id} is not available")]
    RoomUnavailable {
        /// The room the guest tried to select
        room_id: RoomId,
    },

    /// The command needs a reservation in the confirming step
    #[error("No reservation is awaiting confirmation")]
    NoActiveIntent,

    /// Guest composition outside the fixed set
    #[error("Unknown guest composition: {value}")]
    InvalidOption {
        /// The rejected value
        value: String,
    },

    /// The inventory refused or could not apply the reservation
    #[error("Reservation of room {room_id} failed: {reason}")]
    ReservationFailed {
        /// Room that could not be reserved
        room_id: RoomId,
        /// Collaborator error message
        reason: String,
    },

    /// A confirmation is already waiting on the inventory
    #[error("A confirmation is already in progress")]
    ConfirmationInFlight,

    /// Another reservation is open or its success message is still shown
    #[error("Finish or cancel the current reservation first")]
    SelectionInProgress,

    /// The selection policy requires a signed-in guest
    #[error("Sign in to reserve a room")]
    SignInRequired,

    /// There is no success message on screen
    #[error("No confirmation to dismiss")]
    NothingToDismiss,
}

/// Rejections and failures of the feedback surfaces
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FeedbackError {
    /// The sink refused the document or did not answer in time
    #[error("Feedback could not be sent: {reason}")]
    SinkUnavailable {
        /// Sink error message
        reason: String,
    },

    /// The prompt is not on screen
    #[error("Feedback prompt is not open")]
    NotVisible,

    /// A submission is already waiting on the sink
    #[error("Feedback is already being submitted")]
    SubmissionInFlight,

    /// Stay feedback needs a rating before it can be sent
    #[error("Select a rating before submitting")]
    RatingRequired,
}

/// Rejections of a new resort review
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReviewError {
    /// Not one of the listed resorts
    #[error("Unknown resort: {resort_id}")]
    UnknownResort {
        /// The rejected id
        resort_id: ResortId,
    },

    /// Stars outside 1..=5
    #[error("Rating must be between 1 and 5, got {rating}")]
    RatingOutOfRange {
        /// The rejected rating
        rating: u8,
    },

    /// Blank reviewer name
    #[error("Reviewer name is required")]
    MissingAuthor,

    /// Blank review text
    #[error("Review comment is required")]
    MissingComment,
}

/// Inventory store errors
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum InventoryError {
    /// No room with that id in this resort
    #[error("Room {room_id} not found")]
    NotFound {
        /// The missing room
        room_id: RoomId,
    },

    /// The room was reserved by someone else first
    #[error("Room {room_id} is already reserved")]
    AlreadyReserved {
        /// The contested room
        room_id: RoomId,
    },

    /// A remote inventory could not be reached
    #[error("Inventory unreachable: {reason}")]
    Unreachable {
        /// Transport error message
        reason: String,
    },

    /// Seed data is inconsistent
    #[error("Invalid room catalog: {reason}")]
    InvalidCatalog {
        /// What is wrong with it
        reason: String,
    },
}

/// Feedback sink errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SinkError {
    /// Could not reach the sink
    #[error("Sink unreachable: {0}")]
    Unreachable(String),

    /// The sink answered with an error status
    #[error("Sink rejected document with status {status}: {body}")]
    Rejected {
        /// HTTP status code
        status: u16,
        /// Response body
        body: String,
    },

    /// The sink answered with something other than a document id
    #[error("Malformed sink response: {0}")]
    Malformed(String),
}

/// Configuration errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A variable is set but cannot be used
    #[error("Invalid value {value:?} for {key}: {reason}")]
    Invalid {
        /// Environment variable name
        key: &'static str,
        /// The offending value
        value: String,
        /// Why it was rejected
        reason: String,
    },
}

/// Any error surfaced by a [`crate::session::BookingSession`] command
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BookingError {
    /// Reservation workflow
    #[error(transparent)]
    Workflow(#[from] WorkflowError),

    /// Feedback prompt or stay feedback
    #[error(transparent)]
    Feedback(#[from] FeedbackError),

    /// Resort reviews
    #[error(transparent)]
    Review(#[from] ReviewError),

    /// Inventory
    #[error(transparent)]
    Inventory(#[from] InventoryError),

    /// Feedback sink setup
    #[error(transparent)]
    Sink(#[from] SinkError),

    /// Configuration
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Store runtime
    #[error(transparent)]
    Store(#[from] StoreError),
}
