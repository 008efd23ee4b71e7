//! Resort reviews shown on the resort listing.
//!
//! A new review is kept locally as soon as it validates, then copied to the
//! feedback sink. A failed copy is logged and surfaced but never removes the
//! local review.

use crate::catalog;
use crate::environment::BookingEnvironment;
use crate::error::ReviewError;
use crate::sink::SinkDocument;
use crate::types::{DocumentId, ResortId, Review};
use resort_booking_core::effect::Effect;
use resort_booking_core::reducer::Reducer;
use resort_booking_core::{smallvec, SmallVec};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Reviews per resort
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewsState {
    reviews: BTreeMap<ResortId, Vec<Review>>,
    /// Why the last review was rejected, cleared by the next one
    pub rejection: Option<ReviewError>,
    /// Last failed copy to the sink
    pub sync_failure: Option<String>,
    /// Sink id of the last copied review
    pub last_synced: Option<DocumentId>,
}

impl ReviewsState {
    /// Reviews from the catalog seed
    #[must_use]
    pub fn seeded() -> Self {
        Self {
            reviews: catalog::reviews().into_iter().collect(),
            ..Self::default()
        }
    }

    /// Reviews of one resort, oldest first
    #[must_use]
    pub fn for_resort(&self, resort_id: &ResortId) -> &[Review] {
        self.reviews
            .get(resort_id)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Mean rating rounded to one decimal, `None` without reviews
    #[must_use]
    pub fn average_rating(&self, resort_id: &ResortId) -> Option<f64> {
        let reviews = self.for_resort(resort_id);
        if reviews.is_empty() {
            return None;
        }

        let total: u32 = reviews.iter().map(|review| u32::from(review.rating)).sum();
        let count = u32::try_from(reviews.len()).unwrap_or(u32::MAX);
        let mean = f64::from(total) / f64::from(count);
        Some((mean * 10.0).round() / 10.0)
    }
}

/// Review actions
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReviewAction {
    /// Post a review
    AddReview {
        /// Reviewed resort
        resort_id: ResortId,
        /// Stars, 1 to 5
        rating: u8,
        /// Reviewer name
        author: String,
        /// Review text
        comment: String,
    },
    /// The sink stored the copy
    ReviewSynced {
        /// Sink id
        document_id: DocumentId,
    },
    /// The sink failed to store the copy
    ReviewSyncFailed {
        /// Error message
        reason: String,
    },
}

/// Reducer of the resort reviews
#[derive(Clone, Debug, Default)]
pub struct ReviewReducer;

impl ReviewReducer {
    /// Creates the reducer
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    fn validate(
        resort_id: &ResortId,
        rating: u8,
        author: &str,
        comment: &str,
    ) -> Result<(), ReviewError> {
        if catalog::resort(resort_id).is_none() {
            return Err(ReviewError::UnknownResort {
                resort_id: resort_id.clone(),
            });
        }
        if !(1..=5).contains(&rating) {
            return Err(ReviewError::RatingOutOfRange { rating });
        }
        if author.trim().is_empty() {
            return Err(ReviewError::MissingAuthor);
        }
        if comment.trim().is_empty() {
            return Err(ReviewError::MissingComment);
        }
        Ok(())
    }
}

impl Reducer for ReviewReducer {
    type State = ReviewsState;
    type Action = ReviewAction;
    type Environment = BookingEnvironment;

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        match action {
            ReviewAction::AddReview {
                resort_id,
                rating,
                author,
                comment,
            } => {
                state.rejection = None;
                if let Err(error) = Self::validate(&resort_id, rating, &author, &comment) {
                    tracing::debug!(%error, "Review rejected");
                    state.rejection = Some(error);
                    return SmallVec::new();
                }

                let review = Review {
                    rating,
                    author: author.trim().to_string(),
                    comment: env.settings.clamp_text(comment.trim().to_string()),
                    timestamp: env.clock.now(),
                };
                let document = SinkDocument::Review {
                    rating,
                    comment: review.comment.clone(),
                    timestamp: review.timestamp,
                };
                tracing::info!(%resort_id, rating, "Review added");
                state.reviews.entry(resort_id).or_default().push(review);

                smallvec![env.append_to_sink(document, |result| match result {
                    Ok(document_id) => ReviewAction::ReviewSynced { document_id },
                    Err(reason) => ReviewAction::ReviewSyncFailed { reason },
                })]
            },

            ReviewAction::ReviewSynced { document_id } => {
                state.sync_failure = None;
                state.last_synced = Some(document_id);
                SmallVec::new()
            },

            ReviewAction::ReviewSyncFailed { reason } => {
                tracing::warn!(%reason, "Review could not be copied to the sink");
                state.sync_failure = Some(reason);
                SmallVec::new()
            },
        }
    }
}
