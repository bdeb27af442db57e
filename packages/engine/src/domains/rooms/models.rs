use serde::{Deserialize, Serialize};

use crate::common::{EpochMillis, RoomId, StoreError};
use crate::kernel::DocumentSnapshot;

/// Root collection holding room documents.
pub const ROOMS: &str = "rooms";

/// Seats filled in a room that is waiting for a partner.
pub const SEAT_WAITING: i64 = 1;

/// Seats filled in a fully paired room.
pub const SEAT_FULL: i64 = 2;

/// A two-seat chat room as stored in `rooms/{roomId}`.
///
/// `user_count` is the number of occupied seats (0, 1, or 2).
/// `expose_count` counts how often the room was offered as a match
/// candidate - the fairness tie-break for matching. `open` turns false once
/// the room is permanently retired; retired rooms are never revived.
/// `message_count` is informational only, never used for reconciliation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Room {
    #[serde(skip)]
    pub id: RoomId,
    pub name: String,
    pub timestamp: EpochMillis,
    pub user_count: i64,
    pub expose_count: i64,
    #[serde(default)]
    pub message_count: i64,
    #[serde(default = "default_open")]
    pub open: bool,
}

fn default_open() -> bool {
    true
}

impl Room {
    /// Materializes a room from a pushed or fetched snapshot.
    pub fn from_snapshot(snapshot: &DocumentSnapshot) -> Result<Self, StoreError> {
        let path = format!("{ROOMS}/{}", snapshot.id);
        let mut room: Room = snapshot.decode(&path)?;
        room.id = RoomId::from(snapshot.id.clone());
        Ok(room)
    }

    /// `true` while exactly one seat is filled and the room accepts a match.
    pub fn has_open_seat(&self) -> bool {
        self.user_count == SEAT_WAITING && self.open
    }

    /// `true` once both occupants have left.
    pub fn is_vacated(&self) -> bool {
        self.user_count == 0
    }
}

/// Path of a room document.
pub fn room_path(id: &RoomId) -> String {
    format!("{ROOMS}/{id}")
}

/// Path of a room's message sub-collection.
pub fn messages_path(id: &RoomId) -> String {
    format!("{ROOMS}/{id}/messages")
}
