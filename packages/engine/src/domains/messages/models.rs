use serde::{Deserialize, Serialize};

use crate::common::{EpochMillis, StoreError, UserId};
use crate::kernel::DocumentSnapshot;

/// A chat message as stored in `rooms/{roomId}/messages/{messageId}`.
/// Immutable once written; the sub-collection is bulk-cleared when its room
/// is retired.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub uid: UserId,
    pub content: String,
    pub timestamp: EpochMillis,
}

impl Message {
    pub fn from_snapshot(snapshot: &DocumentSnapshot, collection: &str) -> Result<Self, StoreError> {
        let path = format!("{collection}/{}", snapshot.id);
        snapshot.decode(&path)
    }
}
