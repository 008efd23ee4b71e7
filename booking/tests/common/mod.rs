//! Shared fixture for the booking integration suites.

#![allow(dead_code)]
#![allow(clippy::unwrap_used)]

use resort_booking::environment::{BookingEnvironment, FlowSettings};
use resort_booking::identity::StaticIdentity;
use resort_booking::inventory::InMemoryInventory;
use resort_booking::session::BookingSession;
use resort_booking::sink::InMemorySink;
use resort_booking::types::Room;
use resort_booking_testing::{test_time, FixedJitter, ManualClock};
use std::sync::Arc;
use std::time::Duration;

/// Delay the fixed jitter picks for the feedback prompt
pub const PROMPT_DELAY: Duration = Duration::from_millis(4_000);

/// A session plus handles on its in-memory collaborators
pub struct Fixture {
    pub session: BookingSession,
    pub inventory: Arc<InMemoryInventory>,
    pub sink: Arc<InMemorySink>,
    pub clock: Arc<ManualClock>,
}

pub struct FixtureBuilder {
    rooms: Vec<Room>,
    sink: InMemorySink,
    identity: StaticIdentity,
    settings: FlowSettings,
}

impl FixtureBuilder {
    pub fn rooms(mut self, rooms: Vec<Room>) -> Self {
        self.rooms = rooms;
        self
    }

    pub fn sink(mut self, sink: InMemorySink) -> Self {
        self.sink = sink;
        self
    }

    pub fn identity(mut self, identity: StaticIdentity) -> Self {
        self.identity = identity;
        self
    }

    pub fn settings(mut self, settings: FlowSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn build(self) -> Fixture {
        let inventory = Arc::new(InMemoryInventory::new(self.rooms).unwrap());
        let sink = Arc::new(self.sink);
        let clock = Arc::new(ManualClock::new(test_time()));
        let session = BookingSession::new(BookingEnvironment {
            clock: clock.clone(),
            jitter: Arc::new(FixedJitter::new(PROMPT_DELAY)),
            inventory: inventory.clone(),
            identity: Arc::new(self.identity),
            sink: sink.clone(),
            settings: self.settings,
        });

        Fixture {
            session,
            inventory,
            sink,
            clock,
        }
    }
}

/// Two open rooms, r1 at 250 and r2 at 350
pub fn two_rooms() -> Vec<Room> {
    vec![Room::new("r1", "One", 250), Room::new("r2", "Two", 350)]
}

pub fn booking() -> FixtureBuilder {
    FixtureBuilder {
        rooms: two_rooms(),
        sink: InMemorySink::new(),
        identity: StaticIdentity::anonymous(),
        settings: FlowSettings::default(),
    }
}
