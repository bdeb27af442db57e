use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::common::{EpochMillis, RoomId, StoreError, UserId};
use crate::kernel::DocumentSnapshot;

/// Root collection holding user documents.
pub const USERS: &str = "users";

/// Rating a user starts with before any scored interaction.
pub const INITIAL_RATING: f64 = 5.0;

/// A participant as stored in `users/{uid}`.
///
/// Identity (the uid itself) is owned by the authentication collaborator;
/// this engine owns `current_room_id`, the activity timestamp, and the
/// cumulative rating. `current_room_id` is the unassigned (empty) id while
/// the user is not seated in a room.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(skip)]
    pub uid: UserId,
    #[serde(default)]
    pub user_name: String,
    #[serde(default)]
    pub current_room_id: RoomId,
    #[serde(default)]
    pub timestamp: EpochMillis,
    #[serde(default = "default_rating")]
    pub rating: f64,
    #[serde(default)]
    pub verified: bool,
}

fn default_rating() -> f64 {
    INITIAL_RATING
}

impl User {
    /// Materializes a user from a fetched snapshot.
    pub fn from_snapshot(snapshot: &DocumentSnapshot) -> Result<Self, StoreError> {
        let path = format!("{USERS}/{}", snapshot.id);
        let mut user: User = snapshot.decode(&path)?;
        user.uid = UserId::from(snapshot.id.clone());
        Ok(user)
    }
}

/// What a profile fetch settled on. Replaces shape-sniffing of profile data:
/// a profile either carries a usable (non-empty) display name or it does not.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Profile {
    Found(String),
    NotFound,
}

/// Reduced profile kept in the session's directory cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReducedUser {
    pub user_name: String,
}

/// uid → reduced profile, the directory cache's view handed to consumers.
pub type UserLookup = HashMap<UserId, ReducedUser>;

/// Path of a user document.
pub fn user_path(uid: &UserId) -> String {
    format!("{USERS}/{uid}")
}

/// Path of a user's rating sub-collection.
pub fn ratings_path(uid: &UserId) -> String {
    format!("{USERS}/{uid}/ratings")
}
