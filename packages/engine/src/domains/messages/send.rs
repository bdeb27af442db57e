use serde_json::json;
use tracing::{debug, warn};

use crate::common::{now_millis, RoomId, StoreError, UserId};
use crate::domains::rooms::{messages_path, room_path};
use crate::kernel::BaseDocumentStore;

/// Appends a message to the room's sub-collection.
///
/// The store assigns the write timestamp ordering; the `messageCount` bump
/// on the room document is informational only and its failure is logged, not
/// surfaced.
pub async fn send_message(
    store: &dyn BaseDocumentStore,
    room_id: &RoomId,
    uid: &UserId,
    content: &str,
) -> Result<(), StoreError> {
    store
        .add(
            &messages_path(room_id),
            json!({
                "uid": uid,
                "content": content,
                "timestamp": now_millis(),
            }),
        )
        .await?;
    debug!(room_id = %room_id, uid = %uid, "Message appended");

    if let Err(err) = store.increment(&room_path(room_id), "messageCount", 1).await {
        warn!(room_id = %room_id, error = %err, "Failed to bump message counter");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::{MemoryStore, Query};
    use serde_json::json;

    #[tokio::test]
    async fn appends_the_message_and_bumps_the_counter() {
        let store = MemoryStore::new();
        let room_id = RoomId::from("r1");
        store
            .set(
                "rooms/r1",
                json!({ "name": "r", "timestamp": 0, "userCount": 2, "exposeCount": 0, "messageCount": 0, "open": true }),
            )
            .await
            .unwrap();

        send_message(&store, &room_id, &UserId::from("u1"), "hello there")
            .await
            .unwrap();

        let messages = store
            .query("rooms/r1/messages", Query::new())
            .await
            .unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].fields["content"], "hello there");

        let room = store.get("rooms/r1").await.unwrap().unwrap();
        assert_eq!(room.fields["messageCount"], 1);
    }

    #[tokio::test]
    async fn counter_failure_does_not_fail_the_send() {
        let store = MemoryStore::new();
        // No room document: the increment will report NotFound.
        let room_id = RoomId::from("ghost");

        send_message(&store, &room_id, &UserId::from("u1"), "still lands")
            .await
            .unwrap();

        let messages = store
            .query("rooms/ghost/messages", Query::new())
            .await
            .unwrap();
        assert_eq!(messages.len(), 1);
    }
}
