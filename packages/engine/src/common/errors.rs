//! Error taxonomy for the pairing engine.
//!
//! Store-level failures and engine-level failures are kept separate: the
//! former describe what the document store reported, the latter describe
//! what the engine concluded (a lost seat race, a listener that could not be
//! attached). Vacated rooms and unexpected occupancy are *not* errors - they
//! surface as reconciliation events, see `domains::session`.

use thiserror::Error;

use super::RoomId;

/// Failures reported by the document-store collaborator.
#[derive(Error, Debug)]
pub enum StoreError {
    /// The addressed document does not exist. Callers decide what absence
    /// means: "create a default profile" for user fetches, "no candidate"
    /// for room matching.
    #[error("document not found: {0}")]
    NotFound(String),

    /// Transient transport or backend failure. Operations hitting this are
    /// abandoned for the current call; the engine does not retry beyond the
    /// single seat-claim retry in the matcher.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// A document decoded into something other than the expected shape.
    #[error("malformed document at {path}: {source}")]
    Malformed {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Failures surfaced by the engine itself.
#[derive(Error, Debug)]
pub enum EngineError {
    /// Another matcher claimed the open seat between our read and our write.
    /// The matcher retries the candidate query once, then creates a room.
    #[error("seat already taken in room {0}")]
    SeatTaken(RoomId),

    /// One of the room listeners could not be opened. Fatal for that room
    /// session; the caller should re-run matchmaking.
    #[error("failed to attach room listeners: {0}")]
    AttachFailed(StoreError),

    /// An operation that needs a signed-in user ran without one.
    #[error("no authenticated user in session")]
    NotSignedIn,

    /// An operation that needs an attached room ran without one.
    #[error("no room attached to this session")]
    NotAttached,

    #[error(transparent)]
    Store(#[from] StoreError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_error_wraps_into_engine_error() {
        let err: EngineError = StoreError::NotFound("rooms/x".into()).into();
        assert!(matches!(err, EngineError::Store(StoreError::NotFound(_))));
    }

    #[test]
    fn seat_taken_names_the_room() {
        let err = EngineError::SeatTaken(RoomId::from("r42"));
        assert!(err.to_string().contains("r42"));
    }
}
