//! Explicit per-session state container.
//!
//! One instance per connected client, owned by the session context and
//! updated only by applying reconciled [`RoomEvent`]s - there are no shared
//! mutable stores. Consumers read the container; they never write it.

use crate::domains::messages::Message;
use crate::domains::rooms::Room;
use crate::domains::users::{User, UserLookup};

use super::hub::RoomEvent;

/// Local mirror of everything the store pushed for this session.
#[derive(Default)]
pub struct SessionState {
    /// The signed-in user, if identity has settled.
    pub user: Option<User>,
    /// Last room snapshot, while seated.
    pub room: Option<Room>,
    /// Complete, ordered message list of the current room.
    pub messages: Vec<Message>,
    /// Display names resolved for the current room's participants.
    pub authors: UserLookup,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies one reconciled event. Last snapshot wins.
    pub fn apply(&mut self, event: &RoomEvent) {
        match event {
            RoomEvent::Room(room) => {
                self.room = Some(room.clone());
            }
            RoomEvent::Messages { messages, authors } => {
                self.messages = messages.clone();
                self.authors = authors.clone();
            }
            RoomEvent::Reset(_) => {
                self.clear_room();
            }
        }
    }

    /// Drops everything tied to the current room.
    pub fn clear_room(&mut self) {
        self.room = None;
        self.messages.clear();
        self.authors.clear();
        if let Some(user) = &mut self.user {
            user.current_room_id = Default::default();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::{RoomId, UserId};
    use crate::domains::session::hub::ResetReason;

    fn room(id: &str, user_count: i64) -> Room {
        Room {
            id: RoomId::from(id),
            name: id.to_string(),
            timestamp: 0,
            user_count,
            expose_count: 0,
            message_count: 0,
            open: true,
        }
    }

    #[test]
    fn room_events_replace_the_mirror() {
        let mut state = SessionState::new();
        state.apply(&RoomEvent::Room(room("r1", 1)));
        state.apply(&RoomEvent::Room(room("r1", 2)));
        assert_eq!(state.room.as_ref().unwrap().user_count, 2);
    }

    #[test]
    fn message_events_replace_the_whole_list() {
        let mut state = SessionState::new();
        let first = vec![Message {
            uid: UserId::from("u1"),
            content: "a".into(),
            timestamp: 1,
        }];
        let second = vec![
            first[0].clone(),
            Message {
                uid: UserId::from("u2"),
                content: "b".into(),
                timestamp: 2,
            },
        ];

        state.apply(&RoomEvent::Messages {
            messages: first,
            authors: UserLookup::new(),
        });
        state.apply(&RoomEvent::Messages {
            messages: second.clone(),
            authors: UserLookup::new(),
        });
        assert_eq!(state.messages, second);
    }

    #[test]
    fn reset_clears_room_state_and_assignment() {
        let mut state = SessionState::new();
        state.user = Some(User {
            uid: UserId::from("u1"),
            user_name: String::new(),
            current_room_id: RoomId::from("r1"),
            timestamp: 0,
            rating: 5.0,
            verified: false,
        });
        state.apply(&RoomEvent::Room(room("r1", 2)));

        state.apply(&RoomEvent::Reset(ResetReason::Vacated));
        assert!(state.room.is_none());
        assert!(state.messages.is_empty());
        assert!(state
            .user
            .as_ref()
            .unwrap()
            .current_room_id
            .is_unassigned());
    }
}
