//! Integration tests for the reservation workflow
//!
//! Drives a `BookingSession` against the in-memory inventory with tokio time
//! paused, so the feedback prompt timer is simulated deterministically.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)] // Test code can use unwrap/expect/panic

mod common;

use common::{booking, PROMPT_DELAY};
use proptest::prelude::*;
use resort_booking::app::BookingAction;
use resort_booking::config::SelectionPolicy;
use resort_booking::environment::FlowSettings;
use resort_booking::error::{BookingError, InventoryError, WorkflowError};
use resort_booking::identity::{GuestIdentity, StaticIdentity};
use resort_booking::inventory::InventoryStore;
use resort_booking::solicitation::SolicitationPhase;
use resort_booking::types::{GuestComposition, Room, RoomId};
use resort_booking::workflow::{ReservationAction, WorkflowPhase};
use resort_booking_runtime::StoreError;
use std::time::Duration;

fn availability(rooms: &[Room]) -> Vec<(String, bool)> {
    rooms
        .iter()
        .map(|room| (room.id.to_string(), room.available))
        .collect()
}

// ============================================================================
// Selection and confirmation
// ============================================================================

#[tokio::test(start_paused = true)]
async fn confirm_reserves_only_the_selected_room() {
    let fixture = booking().build();
    let session = &fixture.session;

    let intent = session.select_room(&RoomId::new("r1")).await.unwrap();
    assert_eq!(intent.guests, GuestComposition::OneAdult);

    session.update_guest_composition("2 Adults").await.unwrap();
    assert_eq!(
        session.active_intent().await.unwrap().guests,
        GuestComposition::TwoAdults
    );

    let room = session.confirm().await.unwrap();
    assert_eq!(room.id, RoomId::new("r1"));
    assert!(!room.available);

    assert_eq!(
        availability(&session.rooms().await),
        vec![("r1".to_string(), false), ("r2".to_string(), true)]
    );
    assert_eq!(
        session.workflow_phase().await,
        WorkflowPhase::Confirmed {
            room_id: RoomId::new("r1")
        }
    );
    assert_eq!(session.active_intent().await, None);
    assert_eq!(fixture.inventory.mark_calls(), 1);

    session.teardown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn room_taken_elsewhere_fails_without_double_mutation() {
    let fixture = booking().build();
    let session = &fixture.session;

    session.select_room(&RoomId::new("r2")).await.unwrap();
    session.update_guest_composition("2 Adults, 1 Child").await.unwrap();

    // Another session reserves r2 first
    fixture
        .inventory
        .mark_unavailable(&RoomId::new("r2"), None)
        .await
        .unwrap();

    let error = session.confirm().await.unwrap_err();
    assert!(matches!(
        error,
        BookingError::Workflow(WorkflowError::ReservationFailed { ref room_id, .. })
            if *room_id == RoomId::new("r2")
    ));

    assert_eq!(session.workflow_phase().await, WorkflowPhase::Idle);
    assert!(session.reservation_failure().await.is_some());
    assert_eq!(
        availability(&session.rooms().await),
        vec![("r1".to_string(), true), ("r2".to_string(), false)]
    );
    assert_eq!(fixture.inventory.mark_calls(), 2);

    // The attempted occupancy is offered again
    let intent = session.select_room(&RoomId::new("r1")).await.unwrap();
    assert_eq!(intent.guests, GuestComposition::TwoAdultsOneChild);
    assert_eq!(session.reservation_failure().await, None);

    session.teardown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn second_confirm_in_flight_is_rejected() {
    let fixture = booking().build();
    let store = fixture.session.store();

    fixture.session.select_room(&RoomId::new("r1")).await.unwrap();

    let first = store
        .send(BookingAction::Reservation(ReservationAction::Confirm))
        .await
        .unwrap();
    store
        .send(BookingAction::Reservation(ReservationAction::Confirm))
        .await
        .unwrap();
    assert_eq!(
        store.state(|state| state.reservation.rejection.clone()).await,
        Some(WorkflowError::ConfirmationInFlight)
    );

    first.wait().await;
    assert_eq!(fixture.inventory.mark_calls(), 1);
    assert!(fixture.session.workflow_phase().await.is_confirmed());

    fixture.session.teardown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn cancel_leaves_inventory_untouched() {
    let fixture = booking().build();
    let session = &fixture.session;
    let before = availability(&session.rooms().await);

    session.select_room(&RoomId::new("r1")).await.unwrap();
    session.cancel().await.unwrap();

    assert_eq!(session.workflow_phase().await, WorkflowPhase::Idle);
    assert_eq!(availability(&session.rooms().await), before);
    assert_eq!(fixture.inventory.mark_calls(), 0);

    assert_eq!(
        session.cancel().await.unwrap_err(),
        BookingError::Workflow(WorkflowError::NoActiveIntent)
    );
}

#[tokio::test(start_paused = true)]
async fn rejected_commands_keep_state() {
    let fixture = booking()
        .rooms(vec![
            Room::new("r1", "One", 250),
            Room::new("r3", "Three", 400).reserved(),
        ])
        .build();
    let session = &fixture.session;

    assert_eq!(
        session.select_room(&RoomId::new("r3")).await.unwrap_err(),
        BookingError::Workflow(WorkflowError::RoomUnavailable {
            room_id: RoomId::new("r3")
        })
    );
    assert_eq!(session.workflow_phase().await, WorkflowPhase::Idle);

    assert_eq!(
        session.select_room(&RoomId::new("nowhere")).await.unwrap_err(),
        BookingError::Inventory(InventoryError::NotFound {
            room_id: RoomId::new("nowhere")
        })
    );

    assert_eq!(
        session.update_guest_composition("2 Adults").await.unwrap_err(),
        BookingError::Workflow(WorkflowError::NoActiveIntent)
    );

    session.select_room(&RoomId::new("r1")).await.unwrap();
    assert_eq!(
        session.update_guest_composition("3 Adults").await.unwrap_err(),
        BookingError::Workflow(WorkflowError::InvalidOption {
            value: "3 Adults".to_string()
        })
    );
    assert_eq!(
        session.active_intent().await.unwrap().guests,
        GuestComposition::OneAdult
    );

    assert_eq!(
        session.dismiss_success().await.unwrap_err(),
        BookingError::Workflow(WorkflowError::NothingToDismiss)
    );
}

// ============================================================================
// Identity
// ============================================================================

#[tokio::test(start_paused = true)]
async fn sign_in_policy_gates_selection() {
    let settings = FlowSettings {
        selection_policy: SelectionPolicy::RequireSignIn,
        ..FlowSettings::default()
    };
    let fixture = booking().settings(settings.clone()).build();
    assert_eq!(
        fixture.session.select_room(&RoomId::new("r1")).await.unwrap_err(),
        BookingError::Workflow(WorkflowError::SignInRequired)
    );

    let fixture = booking()
        .settings(settings)
        .identity(StaticIdentity::signed_in(GuestIdentity::new("u-1", "Selam")))
        .build();
    fixture.session.select_room(&RoomId::new("r1")).await.unwrap();
    let room = fixture.session.confirm().await.unwrap();
    assert_eq!(room.reserved_by.as_deref(), Some("Selam"));

    fixture.session.sign_out();
    fixture.session.dismiss_success().await.unwrap();
    assert_eq!(
        fixture.session.select_room(&RoomId::new("r2")).await.unwrap_err(),
        BookingError::Workflow(WorkflowError::SignInRequired)
    );

    fixture.session.teardown().await.unwrap();
}

// ============================================================================
// Feedback prompt timer
// ============================================================================

#[tokio::test(start_paused = true)]
async fn prompt_appears_after_the_picked_delay() {
    let fixture = booking().build();
    let session = &fixture.session;

    session.select_room(&RoomId::new("r1")).await.unwrap();
    session.confirm().await.unwrap();
    session.dismiss_success().await.unwrap();

    tokio::time::sleep(PROMPT_DELAY - Duration::from_millis(1)).await;
    assert_eq!(session.solicitation().await.phase, SolicitationPhase::Dormant);

    session
        .wait_for_feedback_prompt(Duration::from_secs(1))
        .await
        .unwrap();
    assert_eq!(session.solicitation().await.phase, SolicitationPhase::Visible);
    assert!(session.workflow_phase().await.is_idle());

    session.teardown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn teardown_before_the_timer_suppresses_the_prompt() {
    let fixture = booking().build();
    let session = &fixture.session;

    session.select_room(&RoomId::new("r1")).await.unwrap();
    session.confirm().await.unwrap();
    session.teardown().await.unwrap();

    tokio::time::sleep(PROMPT_DELAY * 3).await;
    assert_eq!(session.solicitation().await.phase, SolicitationPhase::Dormant);
    assert_eq!(session.store().pending_effects(), 0);

    assert_eq!(
        session.select_room(&RoomId::new("r2")).await.unwrap_err(),
        BookingError::Store(StoreError::ShutdownInProgress)
    );
    session.teardown().await.unwrap();
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    #[test]
    fn confirm_flips_exactly_one_room(
        open in prop::collection::vec(any::<bool>(), 1..6),
        pick in any::<prop::sample::Index>(),
    ) {
        let rooms: Vec<Room> = open
            .iter()
            .enumerate()
            .map(|(index, available)| {
                let room = Room::new(format!("r{index}"), "Room", 100 + u32::try_from(index).unwrap());
                if *available { room } else { room.reserved() }
            })
            .collect();
        let candidates: Vec<RoomId> = rooms
            .iter()
            .filter(|room| room.available)
            .map(|room| room.id.clone())
            .collect();
        prop_assume!(!candidates.is_empty());
        let target = candidates[pick.index(candidates.len())].clone();

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .start_paused(true)
            .build()
            .unwrap();
        let (before, after) = runtime.block_on(async {
            let fixture = booking().rooms(rooms).build();
            let before = fixture.session.rooms().await;
            fixture.session.select_room(&target).await.unwrap();
            fixture.session.confirm().await.unwrap();
            let after = fixture.session.rooms().await;
            fixture.session.teardown().await.unwrap();
            (before, after)
        });

        for (old, new) in before.iter().zip(&after) {
            if old.id == target {
                prop_assert!(old.available && !new.available);
            } else {
                prop_assert_eq!(old.available, new.available);
            }
        }
    }
}
