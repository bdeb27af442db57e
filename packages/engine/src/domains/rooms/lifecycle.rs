//! Room occupancy state machine.
//!
//! States: `EMPTY(0) → OPEN(1) → FULL(2) → CLOSED`, with `EMPTY` reachable
//! from `FULL` or `OPEN` on departure. Each transition is a single write to
//! the room document; user documents are never touched here - mirroring the
//! transition into `users/{uid}.currentRoomId` is the caller's job.
//!
//! `join` is a read-check followed by a write, not a transaction. Two
//! clients racing for the same seat can both pass the check; the session
//! reconciler detects the unexpected occupancy afterwards and forces a
//! reset. Accepted limitation, not exactly-once seat assignment.

use std::sync::Arc;

use serde_json::json;
use tracing::{debug, info};

use crate::common::{now_millis, EngineError, RoomId, StoreError};
use crate::kernel::BaseDocumentStore;

use super::models::{messages_path, room_path, Room, ROOMS, SEAT_FULL, SEAT_WAITING};

/// Outcome of a departure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Departure {
    /// One occupant remains; the room re-opens for matching.
    SeatFreed,
    /// The last occupant left; the room is retired and its messages purged.
    Retired,
}

/// Applies occupancy transitions to room documents. Holds no room state
/// itself - the store is authoritative.
pub struct RoomLifecycle {
    store: Arc<dyn BaseDocumentStore>,
}

impl RoomLifecycle {
    pub fn new(store: Arc<dyn BaseDocumentStore>) -> Self {
        Self { store }
    }

    /// EMPTY → OPEN: creates a room with its first seat taken.
    pub async fn create(&self, name: &str) -> Result<Room, EngineError> {
        let snapshot = self
            .store
            .add(
                ROOMS,
                json!({
                    "name": name,
                    "timestamp": now_millis(),
                    "userCount": SEAT_WAITING,
                    "exposeCount": 0,
                    "messageCount": 0,
                    "open": true,
                }),
            )
            .await?;
        let room = Room::from_snapshot(&snapshot)?;
        info!(room_id = %room.id, name = %room.name, "Room created");
        Ok(room)
    }

    /// OPEN → FULL: claims the second seat.
    ///
    /// Fails with [`EngineError::SeatTaken`] when the room no longer shows
    /// exactly one occupant at write time; the caller retries matching
    /// elsewhere.
    pub async fn join(&self, room_id: &RoomId) -> Result<(), EngineError> {
        let path = room_path(room_id);
        let snapshot = self
            .store
            .get(&path)
            .await?
            .ok_or_else(|| StoreError::NotFound(path.clone()))?;
        let room = Room::from_snapshot(&snapshot)?;

        if !room.has_open_seat() {
            debug!(room_id = %room_id, user_count = room.user_count, "Seat already claimed");
            return Err(EngineError::SeatTaken(room_id.clone()));
        }

        self.store
            .update(
                &path,
                json!({ "userCount": SEAT_FULL, "timestamp": now_millis() }),
            )
            .await?;
        info!(room_id = %room_id, "Second seat claimed");
        Ok(())
    }

    /// FULL → OPEN or OPEN → EMPTY.
    ///
    /// Reaching EMPTY retires the room permanently (`open = false`) and
    /// purges its message sub-collection; new matches never revive a retired
    /// room.
    pub async fn leave(&self, room_id: &RoomId) -> Result<Departure, EngineError> {
        let path = room_path(room_id);
        let snapshot = self
            .store
            .get(&path)
            .await?
            .ok_or_else(|| StoreError::NotFound(path.clone()))?;
        let room = Room::from_snapshot(&snapshot)?;

        if room.user_count >= SEAT_FULL {
            self.store
                .update(
                    &path,
                    json!({ "userCount": SEAT_WAITING, "timestamp": now_millis() }),
                )
                .await?;
            info!(room_id = %room_id, "Seat freed, room re-opened");
            return Ok(Departure::SeatFreed);
        }

        if room.user_count == SEAT_WAITING {
            self.store
                .update(
                    &path,
                    json!({ "userCount": 0, "open": false, "timestamp": now_millis() }),
                )
                .await?;
            self.store.delete_collection(&messages_path(room_id)).await?;
            info!(room_id = %room_id, "Room vacated and retired");
            return Ok(Departure::Retired);
        }

        // Already empty: departure is idempotent.
        debug!(room_id = %room_id, "Leave on an already-empty room");
        Ok(Departure::Retired)
    }
}
