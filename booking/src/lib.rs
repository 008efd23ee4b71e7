//! Resort booking front end.
//!
//! Room availability, reservation confirmation and the feedback prompts that
//! follow a stay, written as composable reducers driven by a
//! [`resort_booking_runtime::Store`].
//!
//! # Architecture
//!
//! - **Inventory** ([`inventory`]): the bookable rooms of one resort
//! - **Reservation workflow** ([`workflow`]): select, confirm, success, then a
//!   randomised timer that raises the feedback prompt
//! - **Feedback solicitation** ([`solicitation`]): topic and free-text prompt
//!   forwarded to an append-only [`sink`]
//! - **Reviews** ([`reviews`]) and **stay feedback** ([`stay_feedback`]): the
//!   resort listing and guest dashboard surfaces
//! - **App** ([`app`]): composes the feature reducers and handles teardown
//! - **Session** ([`session`]): async command facade over the store
//!
//! # Example
//!
//! ```ignore
//! use resort_booking::{config::BookingConfig, session::BookingSession, types::RoomId};
//!
//! let config = BookingConfig::from_env()?;
//! let session = BookingSession::from_config(&config)?;
//!
//! session.select_room(&RoomId::new("lake-view-suite")).await?;
//! session.update_guest_composition("2 Adults").await?;
//! let room = session.confirm().await?;
//! assert!(!room.available);
//!
//! session.teardown().await?;
//! ```

pub mod app;
pub mod catalog;
pub mod config;
pub mod environment;
pub mod error;
pub mod identity;
pub mod inventory;
pub mod reviews;
pub mod session;
pub mod sink;
pub mod solicitation;
pub mod stay_feedback;
pub mod types;
pub mod workflow;

pub use app::{BookingAction, BookingReducer, BookingState};
pub use config::BookingConfig;
pub use environment::{BookingEnvironment, FlowSettings};
pub use error::BookingError;
pub use session::BookingSession;
