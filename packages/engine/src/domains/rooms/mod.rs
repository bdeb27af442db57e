//! Rooms domain: the room document model, the occupancy state machine, and
//! the open-seat matcher.

pub mod lifecycle;
pub mod matcher;
pub mod models;

pub use lifecycle::{Departure, RoomLifecycle};
pub use matcher::{RoomHandle, RoomMatcher};
pub use models::{messages_path, room_path, Room, ROOMS, SEAT_FULL, SEAT_WAITING};
