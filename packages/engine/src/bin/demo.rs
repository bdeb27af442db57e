// End-to-end demo: two clients pair up, chat, and part ways against the
// in-process store.

use anyhow::{Context, Result};
use futures::{FutureExt, StreamExt};

use tincan_engine::domains::session::{watch_lobby, RoomEvent, Session};
use tincan_engine::kernel::TestDependencies;
use tincan_engine::Config;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tincan_engine=debug".into()),
        )
        .init();

    tracing::info!("Starting tincan pairing demo");

    // Load configuration
    let config = Config::from_env().context("Failed to load configuration")?;

    // Both sessions share one store and auth provider, as two browser tabs
    // would share one backend.
    let harness = TestDependencies::new();
    let mut deps = harness.into_deps();
    deps.config = config;

    let mut lobby = watch_lobby(&deps).await?;

    let mut ada = Session::new(deps.clone());
    let mut lin = Session::new(deps.clone());

    // Ada arrives anonymously, asks to chat, and the engine defers the
    // matchmaking until her identity settles.
    ada.defer(tincan_engine::domains::session::PendingAction::EnterMatchmaking);
    ada.sign_up("ada@example.org", "hunter2").await?;
    tracing::info!(attached = ada.is_attached(), "Ada is waiting for a partner");

    // Lin signs in and matches straight into Ada's open seat.
    lin.sign_up("lin@example.org", "hunter2").await?;
    lin.enter_matchmaking().await?;

    // Ada waits until her listener confirms the pairing, then both chat.
    while let Some(event) = ada.next_event().await {
        if let RoomEvent::Room(room) = &event {
            if room.user_count == 2 {
                tracing::info!(room_id = %room.id, "Pairing confirmed");
                break;
            }
        }
    }
    ada.send_message("hello? anyone on the other end of the string?")
        .await?;
    tokio::time::sleep(std::time::Duration::from_millis(2)).await;
    lin.send_message("loud and clear, tin can and all").await?;
    tokio::time::sleep(std::time::Duration::from_millis(2)).await;
    ada.send_message("excellent").await?;

    // Drain events until both mirrors hold all three messages.
    while ada.state.messages.len() < 3 {
        let Some(event) = ada.next_event().await else {
            break;
        };
        if let RoomEvent::Messages { messages, .. } = &event {
            tracing::info!(count = messages.len(), "Ada reconciled messages");
        }
    }
    while lin.state.messages.len() < 3 {
        if lin.next_event().await.is_none() {
            break;
        }
    }
    for message in &ada.state.messages {
        println!("[{}] {}", message.uid, message.content);
    }

    // The lobby stream queued a snapshot per change; report the newest.
    let mut latest = None;
    while let Some(Some(rooms)) = lobby.next().now_or_never() {
        latest = Some(rooms);
    }
    if let Some(rooms) = latest {
        tracing::info!(rooms = rooms.len(), "Lobby snapshot");
    }

    // Lin rates the conversation and leaves; Ada's listener observes the
    // seat being freed.
    if let Some(rating) = lin.rate_counterpart(2.0).await? {
        println!("Ada's refreshed rating: {rating:.1}");
    }
    lin.leave_room().await?;

    while let Some(event) = ada.next_event().await {
        match event {
            RoomEvent::Room(room) if room.user_count == 1 => {
                tracing::info!(room_id = %room.id, "Partner left; room re-opened");
                break;
            }
            _ => {}
        }
    }

    ada.leave_room().await?;
    ada.sign_out().await?;
    lin.sign_out().await?;

    tracing::info!("Demo complete");
    Ok(())
}
