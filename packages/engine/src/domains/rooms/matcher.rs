//! Find-or-create matching over rooms with one open seat.
//!
//! Fairness policy: candidates are ordered by ascending `exposeCount`, ties
//! broken by earliest `timestamp`, so rooms offered to the fewest previous
//! candidates are preferred and no open room is starved. Every offer bumps
//! the candidate's `exposeCount` before the seat claim is attempted.

use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::common::EngineError;
use crate::domains::users::{self, User};
use crate::kernel::{Query, SessionDeps};

use super::lifecycle::RoomLifecycle;
use super::models::{room_path, Room, ROOMS, SEAT_WAITING};

/// How often a lost seat race re-runs the candidate query before the
/// matcher falls through to creating a fresh room.
const SEAT_CLAIM_RETRIES: usize = 1;

/// The room a matching call settled on.
#[derive(Debug, Clone)]
pub struct RoomHandle {
    pub room: Room,
    /// `true` when this call created the room rather than joining one.
    /// Callers attaching a room they consider speculative (e.g. created
    /// while identity was still settling) use this to request the
    /// reconciler's unexpected-occupancy guard.
    pub freshly_created: bool,
}

/// Finds an eligible open room or creates one, claiming the seat through
/// [`RoomLifecycle`].
pub struct RoomMatcher {
    deps: SessionDeps,
    lifecycle: RoomLifecycle,
}

impl RoomMatcher {
    pub fn new(deps: SessionDeps) -> Self {
        let lifecycle = RoomLifecycle::new(deps.store.clone());
        Self { deps, lifecycle }
    }

    /// Returns a handle to a room with this user seated in it.
    ///
    /// Never returns a vacated or retired room. The resulting room id is
    /// recorded as the user's `currentRoomId`.
    pub async fn find_or_create(&self, user: &User) -> Result<RoomHandle, EngineError> {
        // Idempotent rejoin: a recorded room wins over fresh matching.
        if !user.current_room_id.is_unassigned() {
            if let Some(room) = self.rejoinable_room(user).await? {
                debug!(uid = %user.uid, room_id = %room.id, "Rejoining recorded room");
                return Ok(RoomHandle {
                    room,
                    freshly_created: false,
                });
            }
            // Stale pointer (room retired or gone): fall through to matching.
        }

        for attempt in 0..=SEAT_CLAIM_RETRIES {
            let Some(candidate) = self.next_candidate().await? else {
                break;
            };

            // Record the offer before trying to claim the seat.
            self.deps
                .store
                .increment(&room_path(&candidate.id), "exposeCount", 1)
                .await?;

            match self.lifecycle.join(&candidate.id).await {
                Ok(()) => {
                    users::set_current_room(&*self.deps.store, &user.uid, &candidate.id).await?;
                    let room = self.refreshed(&candidate).await;
                    info!(uid = %user.uid, room_id = %room.id, "Matched into open seat");
                    return Ok(RoomHandle {
                        room,
                        freshly_created: false,
                    });
                }
                Err(EngineError::SeatTaken(room_id)) => {
                    warn!(uid = %user.uid, room_id = %room_id, attempt, "Lost seat race");
                }
                Err(err) => return Err(err),
            }
        }

        let name = self.generate_room_name();
        let room = self.lifecycle.create(&name).await?;
        users::set_current_room(&*self.deps.store, &user.uid, &room.id).await?;
        info!(uid = %user.uid, room_id = %room.id, "No open seat, created room");
        Ok(RoomHandle {
            room,
            freshly_created: true,
        })
    }

    /// The recorded room, if it is still occupiable.
    async fn rejoinable_room(&self, user: &User) -> Result<Option<Room>, EngineError> {
        let path = room_path(&user.current_room_id);
        let Some(snapshot) = self.deps.store.get(&path).await? else {
            return Ok(None);
        };
        let room = Room::from_snapshot(&snapshot)?;
        if room.open && !room.is_vacated() {
            Ok(Some(room))
        } else {
            Ok(None)
        }
    }

    /// Best open-seat candidate under the fairness ordering.
    async fn next_candidate(&self) -> Result<Option<Room>, EngineError> {
        let results = self
            .deps
            .store
            .query(
                ROOMS,
                Query::new()
                    .filter("userCount", SEAT_WAITING)
                    .filter("open", true)
                    .order_asc("exposeCount")
                    .order_asc("timestamp")
                    .limit(1),
            )
            .await?;
        match results.first() {
            Some(snapshot) => Ok(Some(Room::from_snapshot(snapshot)?)),
            None => Ok(None),
        }
    }

    /// Re-reads a room after a claim so the handle reflects the seat we just
    /// took; falls back to the candidate snapshot if the read fails.
    async fn refreshed(&self, candidate: &Room) -> Room {
        match self.deps.store.get(&room_path(&candidate.id)).await {
            Ok(Some(snapshot)) => Room::from_snapshot(&snapshot).unwrap_or_else(|_| {
                let mut room = candidate.clone();
                room.user_count = 2;
                room
            }),
            _ => {
                let mut room = candidate.clone();
                room.user_count = 2;
                room
            }
        }
    }

    fn generate_room_name(&self) -> String {
        let suffix = Uuid::new_v4().simple().to_string();
        format!("{}-{}", self.deps.config.room_name_prefix, &suffix[..6])
    }
}
