//! Resort booking demo.
//!
//! Walks one guest through a reservation and the feedback prompt that
//! follows it, against the in-memory collaborators (or the REST sink when
//! `FEEDBACK_SINK_URL` is set).

use anyhow::Context;
use resort_booking::config::BookingConfig;
use resort_booking::session::BookingSession;
use resort_booking::types::{FeedbackTopic, RoomId};
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    let config = BookingConfig::from_env().context("Failed to read configuration")?;
    config.validate().context("Invalid configuration")?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                tracing_subscriber::EnvFilter::new(format!(
                    "resort_booking={}",
                    config.log_level
                ))
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!(resort_id = %config.reservation.resort_id, "Resort booking demo starting");

    let session = BookingSession::from_config(&config)?;

    for room in session.rooms().await {
        tracing::info!(
            room_id = %room.id,
            name = %room.name,
            price = room.price,
            available = room.available,
            "Room listed"
        );
    }

    // ========== Reservation ==========
    let intent = session
        .select_room(&RoomId::new("lake-view-suite"))
        .await?;
    tracing::info!(room_id = %intent.room_id, guests = %intent.guests, "Room selected");

    session.update_guest_composition("2 Adults").await?;
    let room = session.confirm().await?;
    tracing::info!(room_id = %room.id, available = room.available, "Room reserved");
    session.dismiss_success().await?;

    // ========== Feedback prompt ==========
    let wait = config.feedback_delay().max() + Duration::from_secs(1);
    session.wait_for_feedback_prompt(wait).await?;

    session.toggle_topic(FeedbackTopic::Pool.label()).await?;
    session.toggle_topic(FeedbackTopic::Food.label()).await?;
    session.set_free_text("Great stay").await?;
    let document_id = session.submit().await?;
    tracing::info!(%document_id, "Feedback submitted");

    session.teardown().await?;
    tracing::info!("Resort booking demo finished");
    Ok(())
}
