//! Store operations on user documents.
//!
//! Rating writes and activity touches are non-fatal to the session: they are
//! logged and the caller proceeds with stale data (see the error-handling
//! notes in `common::errors`).

use serde_json::json;
use tracing::{debug, info, warn};

use crate::common::{now_millis, RoomId, StoreError, UserId};
use crate::kernel::{AuthIdentity, BaseDocumentStore};

use super::models::{user_path, Profile, User, INITIAL_RATING};

/// Loads the user document for a settled identity, creating the default
/// document when none exists yet (absence means a fresh signup).
pub async fn ensure_user(
    store: &dyn BaseDocumentStore,
    identity: &AuthIdentity,
) -> Result<User, StoreError> {
    let path = user_path(&identity.uid);
    if let Some(snapshot) = store.get(&path).await? {
        return User::from_snapshot(&snapshot);
    }

    let user = User {
        uid: identity.uid.clone(),
        user_name: String::new(),
        current_room_id: RoomId::unassigned(),
        timestamp: now_millis(),
        rating: INITIAL_RATING,
        verified: false,
    };
    store
        .set(
            &path,
            json!({
                "userName": user.user_name,
                "currentRoomId": "",
                "timestamp": user.timestamp,
                "rating": user.rating,
                "verified": user.verified,
            }),
        )
        .await?;
    info!(uid = %identity.uid, "Created default user document");
    Ok(user)
}

/// Fetches the reduced profile for a uid.
///
/// Absent documents and empty display names both settle on
/// [`Profile::NotFound`]: neither carries a usable name.
pub async fn fetch_profile(
    store: &dyn BaseDocumentStore,
    uid: &UserId,
) -> Result<Profile, StoreError> {
    let path = user_path(uid);
    let Some(snapshot) = store.get(&path).await? else {
        return Ok(Profile::NotFound);
    };
    let user = User::from_snapshot(&snapshot)?;
    if user.user_name.is_empty() {
        Ok(Profile::NotFound)
    } else {
        Ok(Profile::Found(user.user_name))
    }
}

/// Records the room a user is seated in.
pub async fn set_current_room(
    store: &dyn BaseDocumentStore,
    uid: &UserId,
    room_id: &RoomId,
) -> Result<(), StoreError> {
    store
        .update(
            &user_path(uid),
            json!({ "currentRoomId": room_id, "timestamp": now_millis() }),
        )
        .await?;
    debug!(uid = %uid, room_id = %room_id, "Recorded current room");
    Ok(())
}

/// Clears the user's room assignment.
pub async fn clear_current_room(
    store: &dyn BaseDocumentStore,
    uid: &UserId,
) -> Result<(), StoreError> {
    store
        .update(
            &user_path(uid),
            json!({ "currentRoomId": "", "timestamp": now_millis() }),
        )
        .await
}

/// Refreshes the user's activity timestamp. Best-effort: a failed write is
/// logged and the session proceeds.
pub async fn touch(store: &dyn BaseDocumentStore, uid: &UserId) {
    if let Err(err) = store
        .update(&user_path(uid), json!({ "timestamp": now_millis() }))
        .await
    {
        warn!(uid = %uid, error = %err, "Failed to refresh activity timestamp");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::MemoryStore;
    use serde_json::json;

    fn identity(uid: &str) -> AuthIdentity {
        AuthIdentity {
            uid: UserId::from(uid),
            email: format!("{uid}@example.org"),
        }
    }

    #[tokio::test]
    async fn ensure_user_creates_the_default_document_when_absent() {
        let store = MemoryStore::new();
        let user = ensure_user(&store, &identity("u1")).await.unwrap();
        assert!(user.current_room_id.is_unassigned());
        assert_eq!(user.rating, INITIAL_RATING);

        let snap = store.get("users/u1").await.unwrap().unwrap();
        assert_eq!(snap.fields["userName"], "");
        assert_eq!(snap.fields["currentRoomId"], "");
    }

    #[tokio::test]
    async fn ensure_user_returns_the_existing_document() {
        let store = MemoryStore::new();
        store
            .set(
                "users/u1",
                json!({ "userName": "ada", "currentRoomId": "r9", "timestamp": 5, "rating": 6.5 }),
            )
            .await
            .unwrap();

        let user = ensure_user(&store, &identity("u1")).await.unwrap();
        assert_eq!(user.user_name, "ada");
        assert_eq!(user.current_room_id, RoomId::from("r9"));
        assert_eq!(user.rating, 6.5);
    }

    #[tokio::test]
    async fn fetch_profile_distinguishes_named_from_unusable() {
        let store = MemoryStore::new();
        store
            .set("users/named", json!({ "userName": "grace" }))
            .await
            .unwrap();
        store
            .set("users/unnamed", json!({ "userName": "" }))
            .await
            .unwrap();

        assert_eq!(
            fetch_profile(&store, &UserId::from("named")).await.unwrap(),
            Profile::Found("grace".to_string())
        );
        assert_eq!(
            fetch_profile(&store, &UserId::from("unnamed")).await.unwrap(),
            Profile::NotFound
        );
        assert_eq!(
            fetch_profile(&store, &UserId::from("absent")).await.unwrap(),
            Profile::NotFound
        );
    }

    #[tokio::test]
    async fn room_assignment_round_trip() {
        let store = MemoryStore::new();
        ensure_user(&store, &identity("u1")).await.unwrap();

        let uid = UserId::from("u1");
        set_current_room(&store, &uid, &RoomId::from("r3")).await.unwrap();
        let snap = store.get("users/u1").await.unwrap().unwrap();
        assert_eq!(snap.fields["currentRoomId"], "r3");

        clear_current_room(&store, &uid).await.unwrap();
        let snap = store.get("users/u1").await.unwrap().unwrap();
        assert_eq!(snap.fields["currentRoomId"], "");
    }

    #[tokio::test]
    async fn touch_swallows_store_failures() {
        let store = MemoryStore::new();
        ensure_user(&store, &identity("u1")).await.unwrap();
        store.set_available(false);

        // Must not panic or error.
        touch(&store, &UserId::from("u1")).await;
    }
}
