//! Session domain: the per-client context tying matchmaking, reconciliation,
//! and rating together.
//!
//! A [`Session`] is one connected client. It owns the explicit
//! [`SessionState`] container, the single-slot [`Continuation`], and the
//! currently attached room subscription. All concurrency is across sessions,
//! mediated by the store; a session itself is driven from one task.

pub mod continuation;
pub mod hub;
pub mod state;

pub use continuation::{Continuation, PendingAction};
pub use hub::{
    watch_lobby, AttachOptions, CancelHandle, LobbyWatch, ResetReason, RoomEvent,
    RoomSubscription, SubscriptionHub,
};
pub use state::SessionState;

use tracing::{debug, info, warn};

use crate::common::EngineError;
use crate::domains::messages::{self, word_metrics};
use crate::domains::ratings::{conversation_score, record_rating};
use crate::domains::rooms::{RoomLifecycle, RoomMatcher};
use crate::domains::users;
use crate::kernel::{AuthStateWatch, SessionDeps};

/// One connected client's engine context.
pub struct Session {
    deps: SessionDeps,
    matcher: RoomMatcher,
    lifecycle: RoomLifecycle,
    hub: SubscriptionHub,
    auth_watch: AuthStateWatch,
    pub state: SessionState,
    continuation: Continuation,
    subscription: Option<RoomSubscription>,
}

impl Session {
    pub fn new(deps: SessionDeps) -> Self {
        let matcher = RoomMatcher::new(deps.clone());
        let lifecycle = RoomLifecycle::new(deps.store.clone());
        let hub = SubscriptionHub::new(deps.clone());
        let auth_watch = deps.auth.watch_state();
        Self {
            deps,
            matcher,
            lifecycle,
            hub,
            auth_watch,
            state: SessionState::new(),
            continuation: Continuation::new(),
            subscription: None,
        }
    }

    /// Records what to do once authentication settles. A second call
    /// overwrites the first.
    pub fn defer(&mut self, action: PendingAction) {
        self.continuation.set(action);
    }

    /// Signs in and settles the identity immediately.
    pub async fn sign_in(&mut self, email: &str, password: &str) -> Result<(), EngineError> {
        let identity = self.deps.auth.sign_in(email, password).await?;
        self.settle_identity(identity).await
    }

    /// Registers a new account and settles the identity immediately.
    pub async fn sign_up(&mut self, email: &str, password: &str) -> Result<(), EngineError> {
        let identity = self.deps.auth.sign_up(email, password).await?;
        self.settle_identity(identity).await
    }

    /// Awaits the next authentication state change from the provider's
    /// stream and settles it: a signed-in identity bootstraps the user
    /// document and runs the pending continuation; a signed-out state clears
    /// the session. Returns the consumed action, if any.
    pub async fn auth_settled(&mut self) -> Result<Option<PendingAction>, EngineError> {
        use tokio::sync::broadcast::error::RecvError;
        loop {
            match self.auth_watch.recv().await {
                Ok(Some(identity)) => {
                    let pending = self.continuation.take();
                    let user = users::ensure_user(self.deps.store.as_ref(), &identity).await?;
                    self.state.user = Some(user);
                    if let Some(action) = pending.clone() {
                        self.run_action(action).await?;
                    }
                    return Ok(pending);
                }
                Ok(None) => {
                    self.detach();
                    self.state = SessionState::new();
                    return Ok(None);
                }
                Err(RecvError::Lagged(_)) => continue,
                Err(RecvError::Closed) => return Ok(None),
            }
        }
    }

    async fn settle_identity(
        &mut self,
        identity: crate::kernel::AuthIdentity,
    ) -> Result<(), EngineError> {
        let user = users::ensure_user(self.deps.store.as_ref(), &identity).await?;
        info!(uid = %user.uid, "Identity settled");
        self.state.user = Some(user);
        if let Some(action) = self.continuation.take() {
            self.run_action(action).await?;
        }
        Ok(())
    }

    async fn run_action(&mut self, action: PendingAction) -> Result<(), EngineError> {
        match action {
            PendingAction::EnterMatchmaking => self.enter_matchmaking().await,
            PendingAction::ResumeRoom(room_id) => {
                if let Some(user) = &mut self.state.user {
                    user.current_room_id = room_id;
                }
                // The matcher rejoins a recorded room before matching fresh.
                self.enter_matchmaking().await
            }
        }
    }

    /// Finds or creates a room for the signed-in user and attaches the
    /// realtime listeners. Any previous room's listeners are cancelled first
    /// so events never leak across rooms.
    pub async fn enter_matchmaking(&mut self) -> Result<(), EngineError> {
        let user = self.state.user.clone().ok_or(EngineError::NotSignedIn)?;
        self.detach();

        let handle = self.matcher.find_or_create(&user).await?;
        if let Some(local) = &mut self.state.user {
            local.current_room_id = handle.room.id.clone();
        }

        let subscription = self
            .hub
            .attach(&user.uid, &handle, AttachOptions::default())
            .await?;
        self.state.room = Some(handle.room.clone());
        self.subscription = Some(subscription);
        Ok(())
    }

    /// Next reconciled event for the attached room, applied to
    /// [`SessionState`] before it is returned. A reset tears the attachment
    /// down; the caller re-runs matchmaking.
    pub async fn next_event(&mut self) -> Option<RoomEvent> {
        let subscription = self.subscription.as_mut()?;
        let event = subscription.next_event().await?;
        self.state.apply(&event);
        if matches!(event, RoomEvent::Reset(_)) {
            self.detach();
        }
        Some(event)
    }

    /// Appends a message to the current room.
    pub async fn send_message(&mut self, content: &str) -> Result<(), EngineError> {
        let user = self.state.user.as_ref().ok_or(EngineError::NotSignedIn)?;
        let room = self.state.room.as_ref().ok_or(EngineError::NotAttached)?;

        messages::send_message(self.deps.store.as_ref(), &room.id, &user.uid, content).await?;
        users::touch(self.deps.store.as_ref(), &user.uid).await;
        Ok(())
    }

    /// Leaves the current room: listeners are cancelled first, then the
    /// occupancy transition is written and the user's assignment cleared.
    pub async fn leave_room(&mut self) -> Result<(), EngineError> {
        let Some(room) = self.state.room.clone() else {
            return Ok(());
        };
        let user = self.state.user.clone().ok_or(EngineError::NotSignedIn)?;

        self.detach();
        let departure = self.lifecycle.leave(&room.id).await?;
        debug!(room_id = %room.id, ?departure, "Left room");

        // The lifecycle writes only the room document; mirroring the
        // departure onto the user is this caller's job.
        users::clear_current_room(self.deps.store.as_ref(), &user.uid).await?;
        self.state.clear_room();
        Ok(())
    }

    /// Scores the finished conversation and submits a rating for the
    /// counterpart. Rating failures are non-fatal: they are logged and the
    /// session proceeds. Returns the counterpart's refreshed rating when the
    /// write landed.
    pub async fn rate_counterpart(&mut self, feedback: f64) -> Result<Option<f64>, EngineError> {
        let user = self.state.user.as_ref().ok_or(EngineError::NotSignedIn)?;

        let Some(counterpart) = self
            .state
            .messages
            .iter()
            .map(|message| message.uid.clone())
            .find(|uid| uid != &user.uid)
        else {
            debug!("No counterpart spoke; nothing to rate");
            return Ok(None);
        };

        let metrics = word_metrics(&self.state.messages, &counterpart);
        let conversation = conversation_score(metrics.sent, metrics.received);

        match record_rating(self.deps.store.as_ref(), &counterpart, feedback, conversation).await {
            Ok(rating) => Ok(Some(rating)),
            Err(err) => {
                warn!(uid = %counterpart, error = %err, "Rating submission failed");
                Ok(None)
            }
        }
    }

    /// Signs out: listeners are cancelled, auth state cleared, and the
    /// local mirror dropped.
    pub async fn sign_out(&mut self) -> Result<(), EngineError> {
        self.detach();
        self.deps.auth.sign_out().await?;
        self.state = SessionState::new();
        info!("Signed out");
        Ok(())
    }

    /// `true` while room listeners are attached.
    pub fn is_attached(&self) -> bool {
        self.subscription.is_some()
    }

    fn detach(&mut self) {
        if let Some(subscription) = self.subscription.take() {
            subscription.cancel();
        }
    }
}
