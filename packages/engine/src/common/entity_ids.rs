//! Typed ID definitions for the store's document kinds.
//!
//! Each alias pairs the generic [`Id`] wrapper with a marker type, so ids
//! from different collections are incompatible at compile time.

use super::id::Id;

// ============================================================================
// Entity marker types
// ============================================================================

/// Marker type for room documents (`rooms/{roomId}`).
pub struct Room;

/// Marker type for user documents (`users/{uid}`).
pub struct User;

/// Marker type for message documents (`rooms/{roomId}/messages/{messageId}`).
pub struct Message;

/// Marker type for rating documents (`users/{uid}/ratings/{ratingId}`).
pub struct Rating;

/// Marker type for word-dictionary documents (`words/{wordId}`).
pub struct Word;

// ============================================================================
// Type aliases - the primary API
// ============================================================================

/// Typed ID for room documents.
pub type RoomId = Id<Room>;

/// Typed ID for user documents. This is the opaque uid issued by the
/// authentication collaborator.
pub type UserId = Id<User>;

/// Typed ID for message documents.
pub type MessageId = Id<Message>;

/// Typed ID for rating documents.
pub type RatingId = Id<Rating>;

/// Typed ID for word-dictionary documents.
pub type WordId = Id<Word>;
