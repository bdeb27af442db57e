//! Integration tests for the pairing flow: matchmaking, realtime
//! reconciliation, occupancy transitions, and the reset rules.

use serde_json::json;

use tincan_engine::common::{RoomId, UserId};
use tincan_engine::domains::rooms::{Room, RoomHandle};
use tincan_engine::domains::session::{
    AttachOptions, PendingAction, ResetReason, RoomEvent, Session, SubscriptionHub,
};
use tincan_engine::kernel::{
    BaseDocumentStore, MemoryStore, Query, SessionDeps, TestDependencies,
};

async fn seed_user(deps: &SessionDeps, uid: &str) {
    deps.store
        .set(
            &format!("users/{uid}"),
            json!({ "userName": "", "currentRoomId": "", "timestamp": 0, "rating": 5.0 }),
        )
        .await
        .unwrap();
}

fn handle_for(room_id: &str, user_count: i64) -> RoomHandle {
    RoomHandle {
        room: Room {
            id: RoomId::from(room_id),
            name: room_id.to_string(),
            timestamp: 0,
            user_count,
            expose_count: 0,
            message_count: 0,
            open: true,
        },
        freshly_created: false,
    }
}

#[tokio::test]
async fn two_sessions_pair_into_a_single_room() {
    let deps = TestDependencies::new().into_deps();

    let mut ada = Session::new(deps.clone());
    let mut lin = Session::new(deps.clone());

    // Ada asks to chat before her identity settles; the continuation runs
    // the matchmaking as soon as sign-up completes.
    ada.defer(PendingAction::EnterMatchmaking);
    ada.sign_up("ada@example.org", "pw").await.unwrap();
    assert!(ada.is_attached());

    lin.sign_up("lin@example.org", "pw").await.unwrap();
    lin.enter_matchmaking().await.unwrap();

    let ada_room = ada.state.user.as_ref().unwrap().current_room_id.clone();
    let lin_room = lin.state.user.as_ref().unwrap().current_room_id.clone();
    assert_eq!(ada_room, lin_room);

    // Exactly one room exists, with both seats filled.
    let rooms = deps.store.query("rooms", Query::new()).await.unwrap();
    assert_eq!(rooms.len(), 1);
    assert_eq!(rooms[0].fields["userCount"], 2);
}

#[tokio::test]
async fn messages_flow_between_paired_sessions() {
    let deps = TestDependencies::new().into_deps();

    let mut ada = Session::new(deps.clone());
    let mut lin = Session::new(deps.clone());
    ada.defer(PendingAction::EnterMatchmaking);
    ada.sign_up("ada@example.org", "pw").await.unwrap();
    lin.sign_up("lin@example.org", "pw").await.unwrap();
    lin.enter_matchmaking().await.unwrap();

    ada.send_message("hello from ada").await.unwrap();
    // Space the writes so the millisecond timestamps order them.
    tokio::time::sleep(std::time::Duration::from_millis(2)).await;
    lin.send_message("hello from lin").await.unwrap();

    while lin.state.messages.len() < 2 {
        assert!(lin.next_event().await.is_some());
    }
    assert_eq!(lin.state.messages[0].content, "hello from ada");
    assert_eq!(lin.state.messages[1].content, "hello from lin");

    // Message order is the timestamp order regardless of who reconciles.
    while ada.state.messages.len() < 2 {
        assert!(ada.next_event().await.is_some());
    }
    let ada_view: Vec<_> = ada.state.messages.iter().map(|m| m.content.clone()).collect();
    let lin_view: Vec<_> = lin.state.messages.iter().map(|m| m.content.clone()).collect();
    assert_eq!(ada_view, lin_view);
}

#[tokio::test]
async fn unordered_store_snapshots_surface_in_timestamp_order() {
    let store = MemoryStore::new().with_unordered_snapshots();
    let harness = TestDependencies::new().mock_store(store);
    let deps = harness.into_deps();
    seed_user(&deps, "u1").await;

    deps.store
        .set(
            "rooms/r1",
            json!({ "name": "r1", "timestamp": 0, "userCount": 2, "exposeCount": 0, "messageCount": 3, "open": true }),
        )
        .await
        .unwrap();
    for (id, ts) in [("m1", 5), ("m2", 2), ("m3", 9)] {
        deps.store
            .set(
                &format!("rooms/r1/messages/{id}"),
                json!({ "uid": "u1", "content": format!("t{ts}"), "timestamp": ts }),
            )
            .await
            .unwrap();
    }

    let hub = SubscriptionHub::new(deps.clone());
    let mut subscription = hub
        .attach(&UserId::from("u1"), &handle_for("r1", 2), AttachOptions::default())
        .await
        .unwrap();

    loop {
        match subscription.next_event().await.expect("subscription ended") {
            RoomEvent::Messages { messages, .. } if messages.len() == 3 => {
                let stamps: Vec<i64> = messages.iter().map(|m| m.timestamp).collect();
                assert_eq!(stamps, vec![2, 5, 9]);
                break;
            }
            _ => {}
        }
    }
}

#[tokio::test]
async fn cancel_is_idempotent_and_silences_the_stream() {
    let deps = TestDependencies::new().into_deps();
    seed_user(&deps, "u1").await;
    deps.store
        .set(
            "rooms/r1",
            json!({ "name": "r1", "timestamp": 0, "userCount": 1, "exposeCount": 0, "messageCount": 0, "open": true }),
        )
        .await
        .unwrap();

    let hub = SubscriptionHub::new(deps.clone());
    let mut subscription = hub
        .attach(&UserId::from("u1"), &handle_for("r1", 1), AttachOptions::default())
        .await
        .unwrap();

    subscription.cancel();
    subscription.cancel(); // second cancel is a no-op

    // Writes after cancellation never reach the consumer.
    deps.store
        .set(
            "rooms/r1/messages/m1",
            json!({ "uid": "u1", "content": "ghost", "timestamp": 1 }),
        )
        .await
        .unwrap();

    assert!(subscription.next_event().await.is_none());
}

#[tokio::test]
async fn temporary_room_resets_on_unexpected_occupancy() {
    let deps = TestDependencies::new().into_deps();
    seed_user(&deps, "u1").await;
    deps.store
        .set(
            "rooms/fresh",
            json!({ "name": "fresh", "timestamp": 0, "userCount": 1, "exposeCount": 0, "messageCount": 0, "open": true }),
        )
        .await
        .unwrap();

    let hub = SubscriptionHub::new(deps.clone());
    let mut subscription = hub
        .attach(
            &UserId::from("u1"),
            &handle_for("fresh", 1),
            AttachOptions { temporary: true },
        )
        .await
        .unwrap();

    // A third party claims the unconfirmed room.
    deps.store
        .update("rooms/fresh", json!({ "userCount": 2 }))
        .await
        .unwrap();

    loop {
        match subscription.next_event().await.expect("subscription ended") {
            RoomEvent::Reset(reason) => {
                assert_eq!(reason, ResetReason::UnexpectedOccupancy);
                break;
            }
            _ => {}
        }
    }
    // The reset is terminal.
    assert!(subscription.next_event().await.is_none());
}

#[tokio::test]
async fn vacated_room_resets_and_clears_the_assignment() {
    let deps = TestDependencies::new().into_deps();
    deps.store
        .set(
            "users/u1",
            json!({ "userName": "", "currentRoomId": "r1", "timestamp": 0, "rating": 5.0 }),
        )
        .await
        .unwrap();
    deps.store
        .set(
            "rooms/r1",
            json!({ "name": "r1", "timestamp": 0, "userCount": 2, "exposeCount": 0, "messageCount": 0, "open": true }),
        )
        .await
        .unwrap();

    let hub = SubscriptionHub::new(deps.clone());
    let mut subscription = hub
        .attach(&UserId::from("u1"), &handle_for("r1", 2), AttachOptions::default())
        .await
        .unwrap();

    deps.store
        .update("rooms/r1", json!({ "userCount": 0, "open": false }))
        .await
        .unwrap();

    loop {
        match subscription.next_event().await.expect("subscription ended") {
            RoomEvent::Reset(reason) => {
                assert_eq!(reason, ResetReason::Vacated);
                break;
            }
            _ => {}
        }
    }

    let user = deps.store.get("users/u1").await.unwrap().unwrap();
    assert_eq!(user.fields["currentRoomId"], "");
}

#[tokio::test]
async fn departures_free_the_seat_then_retire_the_room() {
    let deps = TestDependencies::new().into_deps();

    let mut ada = Session::new(deps.clone());
    let mut lin = Session::new(deps.clone());
    ada.defer(PendingAction::EnterMatchmaking);
    ada.sign_up("ada@example.org", "pw").await.unwrap();
    lin.sign_up("lin@example.org", "pw").await.unwrap();
    lin.enter_matchmaking().await.unwrap();

    let room_id = lin.state.user.as_ref().unwrap().current_room_id.clone();

    // Ada must observe the pairing before the departure, or the initial
    // one-seat snapshot would be mistaken for the freed seat below.
    loop {
        match ada.next_event().await.expect("subscription ended") {
            RoomEvent::Room(room) if room.user_count == 2 => break,
            _ => {}
        }
    }

    lin.send_message("leaving soon").await.unwrap();
    lin.leave_room().await.unwrap();

    let room = deps
        .store
        .get(&format!("rooms/{room_id}"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(room.fields["userCount"], 1);
    assert_eq!(room.fields["open"], true);

    // Ada observes the freed seat through her listener.
    loop {
        match ada.next_event().await.expect("subscription ended") {
            RoomEvent::Room(room) if room.user_count == 1 => break,
            _ => {}
        }
    }

    ada.leave_room().await.unwrap();
    let room = deps
        .store
        .get(&format!("rooms/{room_id}"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(room.fields["userCount"], 0);
    assert_eq!(room.fields["open"], false);

    let messages = deps
        .store
        .query(&format!("rooms/{room_id}/messages"), Query::new())
        .await
        .unwrap();
    assert!(messages.is_empty());
}

#[tokio::test]
async fn counterpart_names_resolve_and_refresh() {
    let deps = TestDependencies::new().into_deps();

    let mut ada = Session::new(deps.clone());
    let mut lin = Session::new(deps.clone());
    ada.defer(PendingAction::EnterMatchmaking);
    ada.sign_up("ada@example.org", "pw").await.unwrap();
    lin.sign_up("lin@example.org", "pw").await.unwrap();
    lin.enter_matchmaking().await.unwrap();

    lin.send_message("unnamed for now").await.unwrap();
    while ada.state.messages.is_empty() {
        assert!(ada.next_event().await.is_some());
    }
    // Lin has no display name yet, so nothing resolved.
    let lin_uid = lin.state.user.as_ref().unwrap().uid.clone();
    assert!(!ada.state.authors.contains_key(&lin_uid));

    // Lin picks a name; the directory listener refreshes Ada's view.
    deps.store
        .update(&format!("users/{lin_uid}"), json!({ "userName": "lin" }))
        .await
        .unwrap();

    loop {
        if let Some(event) = ada.next_event().await {
            if let RoomEvent::Messages { authors, .. } = event {
                if let Some(reduced) = authors.get(&lin_uid) {
                    assert_eq!(reduced.user_name, "lin");
                    break;
                }
            }
        } else {
            panic!("subscription ended before the name arrived");
        }
    }
}

#[tokio::test]
async fn rating_flow_updates_the_counterpart() {
    let deps = TestDependencies::new().into_deps();

    let mut ada = Session::new(deps.clone());
    let mut lin = Session::new(deps.clone());
    ada.defer(PendingAction::EnterMatchmaking);
    ada.sign_up("ada@example.org", "pw").await.unwrap();
    lin.sign_up("lin@example.org", "pw").await.unwrap();
    lin.enter_matchmaking().await.unwrap();

    ada.send_message("one two three four").await.unwrap();
    lin.send_message("five six seven eight").await.unwrap();
    while lin.state.messages.len() < 2 {
        assert!(lin.next_event().await.is_some());
    }

    let rating = lin.rate_counterpart(2.0).await.unwrap();
    assert!(rating.is_some());

    let ada_uid = ada.state.user.as_ref().unwrap().uid.clone();
    let ada_doc = deps
        .store
        .get(&format!("users/{ada_uid}"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(ada_doc.fields["rating"].as_f64().unwrap(), rating.unwrap());
}

#[tokio::test]
async fn attach_failure_is_fatal_to_the_room_session() {
    let harness = TestDependencies::new();
    let store = harness.store.clone();
    let deps = harness.into_deps();
    seed_user(&deps, "u1").await;

    store.set_available(false);
    let hub = SubscriptionHub::new(deps.clone());
    let result = hub
        .attach(&UserId::from("u1"), &handle_for("r1", 1), AttachOptions::default())
        .await;
    assert!(result.is_err());
}
