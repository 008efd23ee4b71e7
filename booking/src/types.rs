//! Domain types for the resort booking front end.
//!
//! Value objects and entities shared by the inventory, the reservation
//! workflow and the feedback surfaces.

use crate::error::WorkflowError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use uuid::Uuid;

// ============================================================================
// Identifiers
// ============================================================================

/// Identifier of a room, unique within one resort's room set
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomId(String);

impl RoomId {
    /// Creates a room id
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The id as a string slice
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RoomId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Identifier of a resort (`awash`, `bishoftu`, ...)
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResortId(String);

impl ResortId {
    /// Creates a resort id
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The id as a string slice
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ResortId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ResortId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Identifier the feedback sink assigns to an appended document
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentId(String);

impl DocumentId {
    /// Wraps an id returned by a sink
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// A fresh random id, for sinks that do not assign their own
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// The id as a string slice
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ============================================================================
// Resorts and rooms
// ============================================================================

/// A resort shown on the resort listing
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resort {
    /// Resort id
    pub id: ResortId,
    /// Display name
    pub name: String,
    /// City and country
    pub location: String,
    /// Starting nightly rate
    pub price: u32,
    /// Whether the resort takes bookings at all
    pub available: bool,
}

/// One bookable unit of accommodation
///
/// `available` is the only field that changes after seeding, and it only
/// ever goes from `true` to `false`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Room {
    /// Room id
    pub id: RoomId,
    /// Display name
    pub name: String,
    /// Display description
    pub description: String,
    /// Nightly rate, always positive
    pub price: u32,
    /// Short amenity labels, in display order
    pub amenities: Vec<String>,
    /// Bookable by any guest
    pub available: bool,
    /// Display name of the guest who reserved the room, if known
    pub reserved_by: Option<String>,
}

impl Room {
    /// An available room with no description or amenities
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>, price: u32) -> Self {
        Self {
            id: RoomId::new(id),
            name: name.into(),
            description: String::new(),
            price,
            amenities: Vec::new(),
            available: true,
            reserved_by: None,
        }
    }

    /// Set the description
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Set the amenity labels
    #[must_use]
    pub fn with_amenities<I, S>(mut self, amenities: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.amenities = amenities.into_iter().map(Into::into).collect();
        self
    }

    /// Mark the room as already held
    #[must_use]
    pub fn reserved(mut self) -> Self {
        self.available = false;
        self
    }
}

// ============================================================================
// Reservation
// ============================================================================

/// Occupancy of a reservation
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GuestComposition {
    /// One adult
    #[default]
    #[serde(rename = "1 Adult")]
    OneAdult,
    /// Two adults
    #[serde(rename = "2 Adults")]
    TwoAdults,
    /// Two adults and a child
    #[serde(rename = "2 Adults, 1 Child")]
    TwoAdultsOneChild,
    /// Two adults and two children
    #[serde(rename = "2 Adults, 2 Children")]
    TwoAdultsTwoChildren,
}

impl GuestComposition {
    /// Every composition, in the order a picker shows them
    pub const ALL: [Self; 4] = [
        Self::OneAdult,
        Self::TwoAdults,
        Self::TwoAdultsOneChild,
        Self::TwoAdultsTwoChildren,
    ];

    /// Label shown in the picker
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::OneAdult => "1 Adult",
            Self::TwoAdults => "2 Adults",
            Self::TwoAdultsOneChild => "2 Adults, 1 Child",
            Self::TwoAdultsTwoChildren => "2 Adults, 2 Children",
        }
    }

    /// Parse a picker label
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowError::InvalidOption`] for anything that is not one
    /// of [`GuestComposition::ALL`]'s labels.
    pub fn parse(value: &str) -> Result<Self, WorkflowError> {
        Self::ALL
            .into_iter()
            .find(|composition| composition.label() == value.trim())
            .ok_or_else(|| WorkflowError::InvalidOption {
                value: value.to_string(),
            })
    }
}

impl fmt::Display for GuestComposition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A guest's in-progress attempt to book a room
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReservationIntent {
    /// The selected room
    pub room_id: RoomId,
    /// Chosen occupancy
    pub guests: GuestComposition,
}

// ============================================================================
// Feedback
// ============================================================================

/// Satisfaction topics offered by the post-reservation prompt
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum FeedbackTopic {
    /// Food
    Food,
    /// Pool
    Pool,
    /// Waterpark
    Waterpark,
    /// Customer Service
    #[serde(rename = "Customer Service")]
    CustomerService,
    /// Other
    Other,
}

impl FeedbackTopic {
    /// Every topic, in display order
    pub const ALL: [Self; 5] = [
        Self::Food,
        Self::Pool,
        Self::Waterpark,
        Self::CustomerService,
        Self::Other,
    ];

    /// Label shown on the chip
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Food => "Food",
            Self::Pool => "Pool",
            Self::Waterpark => "Waterpark",
            Self::CustomerService => "Customer Service",
            Self::Other => "Other",
        }
    }

    /// Look up a topic by its label
    #[must_use]
    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|topic| topic.label() == label)
    }
}

impl fmt::Display for FeedbackTopic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A submitted answer to the post-reservation prompt
///
/// Serialises with the field names the `feedbacks` collection uses.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedbackRecord {
    /// Selected topics
    #[serde(rename = "options")]
    pub topics: BTreeSet<FeedbackTopic>,
    /// Free-text suggestion
    #[serde(rename = "suggestion")]
    pub free_text: String,
    /// When the guest pressed submit
    #[serde(rename = "timestamp")]
    pub submitted_at: DateTime<Utc>,
}

/// Overall rating on the guest dashboard
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StayRating {
    /// Excellent
    Excellent,
    /// Good
    Good,
    /// Okay
    Okay,
    /// Poor
    Poor,
}

impl StayRating {
    /// Every rating, best first
    pub const ALL: [Self; 4] = [Self::Excellent, Self::Good, Self::Okay, Self::Poor];

    /// Display label
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Excellent => "Excellent",
            Self::Good => "Good",
            Self::Okay => "Okay",
            Self::Poor => "Poor",
        }
    }
}

/// A guest review of a resort
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Review {
    /// Stars, 1 to 5
    pub rating: u8,
    /// Reviewer name
    pub author: String,
    /// Review text
    pub comment: String,
    /// When the review was written
    pub timestamp: DateTime<Utc>,
}
