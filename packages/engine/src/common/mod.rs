// Common types shared across the engine

pub mod entity_ids;
pub mod errors;
pub mod id;

pub use entity_ids::{MessageId, RatingId, RoomId, UserId, WordId};
pub use errors::{EngineError, StoreError};
pub use id::Id;

/// Milliseconds since the Unix epoch, the timestamp representation used by
/// every document in the store.
pub type EpochMillis = i64;

/// Current wall-clock time as epoch milliseconds.
pub fn now_millis() -> EpochMillis {
    chrono::Utc::now().timestamp_millis()
}
