//! Deferred entry into the engine while authentication settles.
//!
//! A UI flow that needs an identity (e.g. "start chatting" pressed by an
//! anonymous visitor) records what should happen once authentication
//! settles. The slot holds at most one pending action: a later `set`
//! overwrites the earlier one, and `take` consumes the action exactly once.

use tracing::debug;

use crate::common::RoomId;

/// What to run once the user's identity resolves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PendingAction {
    /// Run matchmaking and seat the user in a room.
    EnterMatchmaking,
    /// Re-enter a specific room (e.g. deep link into an ongoing chat).
    ResumeRoom(RoomId),
}

/// Single-slot holder of the pending action.
#[derive(Debug, Default)]
pub struct Continuation {
    slot: Option<PendingAction>,
}

impl Continuation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores the action, displacing any earlier one.
    pub fn set(&mut self, action: PendingAction) {
        if let Some(displaced) = self.slot.replace(action) {
            debug!(?displaced, "Pending action overwritten");
        }
    }

    /// Consumes the pending action, leaving the slot empty.
    pub fn take(&mut self) -> Option<PendingAction> {
        self.slot.take()
    }

    pub fn is_pending(&self) -> bool {
        self.slot.is_some()
    }
}
