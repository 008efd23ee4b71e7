//! Append-only feedback sink.
//!
//! Every feedback surface forwards its documents here. The sink assigns an
//! id and never needs to read, update or delete a document.

use crate::error::SinkError;
use crate::types::{DocumentId, FeedbackRecord, StayRating};
use async_trait::async_trait;
use resort_booking_core::effect::EffectId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

/// Registry id of in-flight sink writes
pub const SINK_WRITE: EffectId = EffectId::new("sink-write");

/// A document appended to the sink
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SinkDocument {
    /// Answer to the post-reservation prompt
    Feedback(FeedbackRecord),

    /// A resort review
    Review {
        /// Stars, 1 to 5
        rating: u8,
        /// Review text
        comment: String,
        /// When it was written
        timestamp: DateTime<Utc>,
    },

    /// Guest dashboard feedback
    StayFeedback {
        /// Overall rating
        rating: StayRating,
        /// Comments
        comment: String,
        /// When it was submitted
        timestamp: DateTime<Utc>,
    },
}

impl SinkDocument {
    /// Collection the document belongs to
    #[must_use]
    pub const fn collection(&self) -> &'static str {
        match self {
            Self::Feedback(_) => "feedbacks",
            Self::Review { .. } => "reviews",
            Self::StayFeedback { .. } => "stay_feedback",
        }
    }
}

/// Append-only destination for feedback documents
#[async_trait]
pub trait FeedbackSink: Send + Sync {
    /// Append a document and return the id the sink gave it
    ///
    /// # Errors
    ///
    /// Returns a [`SinkError`] if the document was not stored.
    async fn append(&self, document: SinkDocument) -> Result<DocumentId, SinkError>;
}

// ============================================================================
// In-memory sink
// ============================================================================

/// Sink that keeps documents in memory
///
/// Supports injected latency and failures so the submission paths can be
/// exercised without a network.
#[derive(Debug, Default)]
pub struct InMemorySink {
    documents: Mutex<Vec<(DocumentId, SinkDocument)>>,
    failures: AtomicUsize,
    calls: AtomicUsize,
    latency: Option<Duration>,
}

impl InMemorySink {
    /// An empty sink that answers immediately
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait `latency` before answering each call
    #[must_use]
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Fail the next `count` calls
    pub fn fail_next(&self, count: usize) {
        self.failures.store(count, Ordering::SeqCst);
    }

    /// Every stored document, in append order
    #[must_use]
    pub fn documents(&self) -> Vec<SinkDocument> {
        self.documents
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(_, document)| document.clone())
            .collect()
    }

    /// Number of append calls, failed ones included
    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn take_failure(&self) -> bool {
        self.failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
            .is_ok()
    }
}

#[async_trait]
impl FeedbackSink for InMemorySink {
    async fn append(&self, document: SinkDocument) -> Result<DocumentId, SinkError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        if self.take_failure() {
            return Err(SinkError::Unreachable("injected failure".to_string()));
        }

        let id = DocumentId::generate();
        tracing::debug!(collection = document.collection(), %id, "Document appended");
        self.documents
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((id.clone(), document));
        Ok(id)
    }
}

// ============================================================================
// REST sink
// ============================================================================

#[derive(Deserialize)]
struct Created {
    id: String,
}

/// Sink backed by a REST document store
///
/// Each document is POSTed as JSON to `{base_url}/{collection}`; the store
/// answers with `{"id": "..."}`.
#[derive(Debug, Clone)]
pub struct RestSink {
    client: reqwest::Client,
    base_url: String,
}

impl RestSink {
    /// Creates a sink for `base_url`
    ///
    /// # Errors
    ///
    /// Returns [`SinkError::Unreachable`] if the HTTP client cannot be built.
    pub fn new(base_url: impl Into<String>) -> Result<Self, SinkError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("resort-booking/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|error| SinkError::Unreachable(error.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl FeedbackSink for RestSink {
    async fn append(&self, document: SinkDocument) -> Result<DocumentId, SinkError> {
        let url = format!("{}/{}", self.base_url, document.collection());

        let response = self
            .client
            .post(&url)
            .json(&document)
            .send()
            .await
            .map_err(|error| SinkError::Unreachable(error.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SinkError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        let created: Created = response
            .json()
            .await
            .map_err(|error| SinkError::Malformed(error.to_string()))?;
        Ok(DocumentId::new(created.id))
    }
}
