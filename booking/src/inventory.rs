//! Inventory store: the bookable rooms of one resort.
//!
//! Rooms are seeded once per session and listed in seeding order. The only
//! mutation is [`InventoryStore::mark_unavailable`], which flips a room's
//! availability exactly once.
//!
//! When the store is shared by several sessions (or backed by a remote
//! service), the store itself arbitrates concurrent reservations of the same
//! room: the first caller wins and later callers get
//! [`InventoryError::AlreadyReserved`].

use crate::error::InventoryError;
use crate::types::{Room, RoomId};
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::RwLock;

/// Room inventory of a resort
#[async_trait]
pub trait InventoryStore: Send + Sync {
    /// Every room, in seeding order
    async fn list_rooms(&self) -> Vec<Room>;

    /// Mark a room as reserved and attribute it to `reserved_by`
    ///
    /// # Errors
    ///
    /// - [`InventoryError::NotFound`]: no room with that id
    /// - [`InventoryError::AlreadyReserved`]: the room was already taken
    /// - [`InventoryError::Unreachable`]: a remote store failed
    async fn mark_unavailable(
        &self,
        room_id: &RoomId,
        reserved_by: Option<String>,
    ) -> Result<Room, InventoryError>;
}

/// Session-scoped inventory held in memory
#[derive(Debug)]
pub struct InMemoryInventory {
    rooms: RwLock<Vec<Room>>,
    calls: AtomicUsize,
}

impl InMemoryInventory {
    /// Seed the inventory
    ///
    /// # Errors
    ///
    /// Returns [`InventoryError::InvalidCatalog`] for duplicate ids or a
    /// room without a positive price.
    pub fn new(rooms: Vec<Room>) -> Result<Self, InventoryError> {
        let mut seen = HashSet::new();
        for room in &rooms {
            if !seen.insert(room.id.clone()) {
                return Err(InventoryError::InvalidCatalog {
                    reason: format!("duplicate room id {}", room.id),
                });
            }
            if room.price == 0 {
                return Err(InventoryError::InvalidCatalog {
                    reason: format!("room {} has no price", room.id),
                });
            }
        }

        Ok(Self {
            rooms: RwLock::new(rooms),
            calls: AtomicUsize::new(0),
        })
    }

    /// How many times [`InventoryStore::mark_unavailable`] has been called
    #[must_use]
    pub fn mark_calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl InventoryStore for InMemoryInventory {
    async fn list_rooms(&self) -> Vec<Room> {
        self.rooms.read().await.clone()
    }

    async fn mark_unavailable(
        &self,
        room_id: &RoomId,
        reserved_by: Option<String>,
    ) -> Result<Room, InventoryError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let mut rooms = self.rooms.write().await;
        let room = rooms
            .iter_mut()
            .find(|room| &room.id == room_id)
            .ok_or_else(|| InventoryError::NotFound {
                room_id: room_id.clone(),
            })?;

        if !room.available {
            return Err(InventoryError::AlreadyReserved {
                room_id: room_id.clone(),
            });
        }

        room.available = false;
        room.reserved_by = reserved_by;
        tracing::debug!(room_id = %room.id, "Room marked unavailable");
        Ok(room.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inventory() -> InMemoryInventory {
        InMemoryInventory::new(vec![Room::new("r1", "One", 250), Room::new("r2", "Two", 350)])
            .unwrap()
    }

    #[tokio::test]
    async fn mark_unavailable_is_visible_to_later_listings() {
        let inventory = inventory();

        let room = inventory
            .mark_unavailable(&RoomId::new("r1"), Some("You".to_string()))
            .await
            .unwrap();
        assert!(!room.available);
        assert_eq!(room.reserved_by.as_deref(), Some("You"));

        let rooms = inventory.list_rooms().await;
        assert_eq!(rooms[0].id, RoomId::new("r1"));
        assert!(!rooms[0].available);
        assert!(rooms[1].available);
    }

    #[tokio::test]
    async fn unknown_and_taken_rooms_fail() {
        let inventory = inventory();
        let missing = RoomId::new("r9");

        assert_eq!(
            inventory.mark_unavailable(&missing, None).await,
            Err(InventoryError::NotFound { room_id: missing })
        );

        let r2 = RoomId::new("r2");
        inventory.mark_unavailable(&r2, None).await.unwrap();
        assert_eq!(
            inventory.mark_unavailable(&r2, Some("Late".to_string())).await,
            Err(InventoryError::AlreadyReserved { room_id: r2 })
        );
        assert_eq!(inventory.list_rooms().await[1].reserved_by, None);
        assert_eq!(inventory.mark_calls(), 3);
    }

    #[test]
    fn rejects_bad_catalogs() {
        assert!(InMemoryInventory::new(vec![Room::new("a", "A", 1), Room::new("a", "B", 2)]).is_err());
        assert!(InMemoryInventory::new(vec![Room::new("a", "A", 0)]).is_err());
    }
}
