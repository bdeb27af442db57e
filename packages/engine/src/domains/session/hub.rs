//! Realtime reconciliation of pushed store snapshots.
//!
//! `SubscriptionHub::attach` opens three long-lived listeners - the room
//! document, its ordered message sub-collection, and the global user
//! directory - and drives them from a single `select!` loop per room. Each
//! pushed snapshot carries full current state, so reconciliation is "last
//! snapshot wins": room snapshots are applied as-is, message snapshots are
//! defensively re-sorted by timestamp, and unseen message authors are
//! resolved through the directory cache before the ordered list is handed
//! to the consumer.
//!
//! Listeners MUST be cancelled before a client attaches to a different
//! room; a leaked listener reconciles stale state into the wrong session.

use std::collections::BTreeSet;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};

use futures::Stream;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{mpsc, Notify};
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::wrappers::BroadcastStream;
use tracing::{debug, info, warn};

use crate::common::{EngineError, RoomId, UserId};
use crate::domains::messages::Message;
use crate::domains::rooms::{messages_path, room_path, Room, RoomHandle, ROOMS, SEAT_FULL};
use crate::domains::users::{self, UserDirectory, UserLookup, USERS};
use crate::kernel::{BaseDocumentStore, DocumentSnapshot, Query, SessionDeps};

/// Why the hub tore the room session down.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResetReason {
    /// The room reached zero occupants; it is being retired.
    Vacated,
    /// A room attached as temporary showed occupancy this client never
    /// confirmed (a third party claimed it, or it closed underneath us).
    UnexpectedOccupancy,
}

/// A reconciled update handed to the consumer. Never a diff.
#[derive(Debug, Clone)]
pub enum RoomEvent {
    /// The room document's latest state.
    Room(Room),
    /// The complete, timestamp-ordered message list plus the display names
    /// resolved so far.
    Messages {
        messages: Vec<Message>,
        authors: UserLookup,
    },
    /// The session must be reset; no further events follow.
    Reset(ResetReason),
}

/// Options for [`SubscriptionHub::attach`].
#[derive(Debug, Clone, Copy, Default)]
pub struct AttachOptions {
    /// Mark the room as not yet confirmed as a stable pairing. A temporary
    /// room observing full occupancy or closure triggers
    /// [`ResetReason::UnexpectedOccupancy`] instead of a normal update.
    pub temporary: bool,
}

/// Idempotent cancellation for one room's listeners. After `cancel`
/// returns, the subscription delivers no further event.
#[derive(Clone)]
pub struct CancelHandle {
    cancelled: Arc<AtomicBool>,
    notify: Arc<Notify>,
}

impl CancelHandle {
    fn new() -> Self {
        Self {
            cancelled: Arc::new(AtomicBool::new(false)),
            notify: Arc::new(Notify::new()),
        }
    }

    /// Detaches the listeners. Safe to call any number of times.
    pub fn cancel(&self) {
        if !self.cancelled.swap(true, Ordering::SeqCst) {
            self.notify.notify_one();
            debug!("Room listeners cancelled");
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    async fn notified(&self) {
        self.notify.notified().await;
    }
}

/// One attached room session: the reconciled event stream plus its
/// cancellation handle.
pub struct RoomSubscription {
    events: mpsc::Receiver<RoomEvent>,
    handle: CancelHandle,
}

impl RoomSubscription {
    /// A handle that cancels this subscription from anywhere.
    pub fn cancel_handle(&self) -> CancelHandle {
        self.handle.clone()
    }

    pub fn cancel(&self) {
        self.handle.cancel();
    }

    /// Next reconciled event; `None` once cancelled or after a terminal
    /// [`RoomEvent::Reset`] drained the loop.
    pub async fn next_event(&mut self) -> Option<RoomEvent> {
        if self.handle.is_cancelled() {
            return None;
        }
        let event = self.events.recv().await;
        // Nothing is delivered after cancel() completes, even if the
        // reconciler queued an event concurrently.
        if self.handle.is_cancelled() {
            return None;
        }
        event
    }
}

/// Opens and tears down the realtime listeners for a room session.
pub struct SubscriptionHub {
    deps: SessionDeps,
}

impl SubscriptionHub {
    pub fn new(deps: SessionDeps) -> Self {
        Self { deps }
    }

    /// Attaches the room, message, and directory listeners for `handle`'s
    /// room and spawns the reconciliation loop.
    ///
    /// Attachment failure is fatal to the room session: the caller should
    /// re-run matchmaking.
    pub async fn attach(
        &self,
        uid: &UserId,
        handle: &RoomHandle,
        options: AttachOptions,
    ) -> Result<RoomSubscription, EngineError> {
        let room_id = handle.room.id.clone();

        let room_watch = self
            .deps
            .store
            .watch_document(&room_path(&room_id))
            .await
            .map_err(EngineError::AttachFailed)?;
        let message_watch = self
            .deps
            .store
            .watch_query(
                &messages_path(&room_id),
                Query::new().order_asc("timestamp"),
            )
            .await
            .map_err(EngineError::AttachFailed)?;
        let directory_watch = self
            .deps
            .store
            .watch_query(USERS, Query::new())
            .await
            .map_err(EngineError::AttachFailed)?;

        let (tx, rx) = mpsc::channel(self.deps.config.channel_capacity);
        let cancel = CancelHandle::new();

        info!(room_id = %room_id, temporary = options.temporary, "Room listeners attached");
        tokio::spawn(reconcile_loop(
            self.deps.clone(),
            uid.clone(),
            room_id,
            options,
            room_watch,
            message_watch,
            directory_watch,
            tx,
            cancel.clone(),
        ));

        Ok(RoomSubscription {
            events: rx,
            handle: cancel,
        })
    }
}

enum Flow {
    Continue,
    Stop,
}

#[allow(clippy::too_many_arguments)]
async fn reconcile_loop(
    deps: SessionDeps,
    uid: UserId,
    room_id: RoomId,
    options: AttachOptions,
    mut room_watch: tokio::sync::broadcast::Receiver<DocumentSnapshot>,
    mut message_watch: tokio::sync::broadcast::Receiver<Vec<DocumentSnapshot>>,
    mut directory_watch: tokio::sync::broadcast::Receiver<Vec<DocumentSnapshot>>,
    tx: mpsc::Sender<RoomEvent>,
    cancel: CancelHandle,
) {
    let store = deps.store.as_ref();
    let message_collection = messages_path(&room_id);
    let mut directory = UserDirectory::new();
    let mut current_messages: Vec<Message> = Vec::new();

    loop {
        if cancel.is_cancelled() {
            break;
        }

        let flow = tokio::select! {
            _ = cancel.notified() => Flow::Stop,

            result = room_watch.recv() => match result {
                Ok(snapshot) => {
                    apply_room_snapshot(store, &tx, &uid, options, &snapshot).await
                }
                Err(RecvError::Lagged(skipped)) => {
                    // Full-state snapshots: the next delivery supersedes
                    // everything we missed.
                    warn!(room_id = %room_id, skipped, "Room watch lagged");
                    Flow::Continue
                }
                Err(RecvError::Closed) => Flow::Stop,
            },

            result = message_watch.recv() => match result {
                Ok(snapshots) => {
                    reconcile_messages(
                        store,
                        &tx,
                        &message_collection,
                        &mut directory,
                        &mut current_messages,
                        &snapshots,
                    )
                    .await
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!(room_id = %room_id, skipped, "Message watch lagged");
                    Flow::Continue
                }
                Err(RecvError::Closed) => Flow::Stop,
            },

            result = directory_watch.recv() => match result {
                Ok(snapshots) => {
                    if directory.merge_remote(&snapshots) && !current_messages.is_empty() {
                        // A counterpart picked or changed a name: re-deliver
                        // the current list with the refreshed lookup.
                        deliver_messages(&tx, &current_messages, &directory).await
                    } else {
                        Flow::Continue
                    }
                }
                Err(RecvError::Lagged(_)) => Flow::Continue,
                Err(RecvError::Closed) => Flow::Stop,
            },
        };

        if matches!(flow, Flow::Stop) {
            break;
        }
    }
    debug!(room_id = %room_id, "Reconciliation loop ended");
}

/// Applies one pushed room snapshot: surfaces the room, or tears the
/// session down on vacated/unexpected occupancy.
async fn apply_room_snapshot(
    store: &dyn BaseDocumentStore,
    tx: &mpsc::Sender<RoomEvent>,
    uid: &UserId,
    options: AttachOptions,
    snapshot: &DocumentSnapshot,
) -> Flow {
    let room = match Room::from_snapshot(snapshot) {
        Ok(room) => room,
        Err(err) => {
            warn!(error = %err, "Skipping malformed room snapshot");
            return Flow::Continue;
        }
    };

    if room.is_vacated() {
        info!(room_id = %room.id, "Room vacated; resetting client state");
        // Mirror the departure onto the user document; the session restarts
        // matchmaking either way.
        if let Err(err) = users::clear_current_room(store, uid).await {
            warn!(uid = %uid, error = %err, "Failed to clear current room");
        }
        let _ = tx.send(RoomEvent::Reset(ResetReason::Vacated)).await;
        return Flow::Stop;
    }

    if options.temporary && (room.user_count >= SEAT_FULL || !room.open) {
        info!(
            room_id = %room.id,
            user_count = room.user_count,
            open = room.open,
            "Unconfirmed room shows unexpected occupancy; resetting"
        );
        let _ = tx.send(RoomEvent::Reset(ResetReason::UnexpectedOccupancy)).await;
        return Flow::Stop;
    }

    if tx.send(RoomEvent::Room(room)).await.is_err() {
        return Flow::Stop;
    }
    Flow::Continue
}

/// Reconciles one pushed message result set: decode, sort, resolve unseen
/// authors, deliver.
async fn reconcile_messages(
    store: &dyn BaseDocumentStore,
    tx: &mpsc::Sender<RoomEvent>,
    collection: &str,
    directory: &mut UserDirectory,
    current_messages: &mut Vec<Message>,
    snapshots: &[DocumentSnapshot],
) -> Flow {
    let mut messages: Vec<Message> = snapshots
        .iter()
        .filter_map(|snapshot| match Message::from_snapshot(snapshot, collection) {
            Ok(message) => Some(message),
            Err(err) => {
                warn!(error = %err, "Skipping malformed message snapshot");
                None
            }
        })
        .collect();

    // The store is queried in timestamp order, but the total order by
    // timestamp is the one guarantee consumers get - sort defensively
    // rather than trusting delivery order.
    messages.sort_by_key(|message| message.timestamp);

    let authors: BTreeSet<UserId> = messages.iter().map(|m| m.uid.clone()).collect();
    directory.resolve(store, authors).await;

    *current_messages = messages;
    deliver_messages(tx, current_messages, directory).await
}

async fn deliver_messages(
    tx: &mpsc::Sender<RoomEvent>,
    messages: &[Message],
    directory: &UserDirectory,
) -> Flow {
    let event = RoomEvent::Messages {
        messages: messages.to_vec(),
        authors: directory.lookup(),
    };
    if tx.send(event).await.is_err() {
        Flow::Stop
    } else {
        Flow::Continue
    }
}

// =============================================================================
// Lobby watch
// =============================================================================

/// Push-subscription over the whole room list, ordered by activity
/// timestamp. Lagged deliveries are skipped: every item is full state.
pub struct LobbyWatch {
    inner: BroadcastStream<Vec<DocumentSnapshot>>,
}

impl Stream for LobbyWatch {
    type Item = Vec<Room>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        loop {
            match futures::ready!(Pin::new(&mut self.inner).poll_next(cx)) {
                None => return Poll::Ready(None),
                Some(Err(BroadcastStreamRecvError::Lagged(skipped))) => {
                    warn!(skipped, "Lobby watch lagged");
                    continue;
                }
                Some(Ok(snapshots)) => {
                    let rooms = snapshots
                        .iter()
                        .filter_map(|snapshot| Room::from_snapshot(snapshot).ok())
                        .collect();
                    return Poll::Ready(Some(rooms));
                }
            }
        }
    }
}

/// Opens the lobby listener.
pub async fn watch_lobby(deps: &SessionDeps) -> Result<LobbyWatch, EngineError> {
    let rx = deps
        .store
        .watch_query(ROOMS, Query::new().order_asc("timestamp"))
        .await
        .map_err(EngineError::AttachFailed)?;
    Ok(LobbyWatch {
        inner: BroadcastStream::new(rx),
    })
}
