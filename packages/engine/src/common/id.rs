//! Typed wrappers around store-assigned document identifiers.
//!
//! The document store hands out opaque string identifiers when a document is
//! created, so unlike numeric or UUID keys there is nothing to generate on
//! this side. `Id<T>` wraps that string with a marker type so a `RoomId`
//! can never be passed where a `UserId` is expected.
//!
//! # Example
//!
//! ```rust
//! use tincan_engine::common::{RoomId, UserId};
//!
//! let room_id = RoomId::from("a7f3");
//! let user_id = UserId::from("u-91");
//!
//! // This would be a compile error:
//! // let wrong: RoomId = user_id;
//! ```

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt::{self, Debug, Display};
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;

/// A typed wrapper around an opaque store-assigned identifier.
///
/// The type parameter `T` is a marker naming the entity this id belongs to.
/// The default value is the empty string, which the store schema uses to
/// mean "unassigned" (e.g. a user with no current room).
#[repr(transparent)]
pub struct Id<T>(String, PhantomData<fn() -> T>);

impl<T> Id<T> {
    /// Wraps a raw identifier string.
    #[inline]
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into(), PhantomData)
    }

    /// Returns the identifier as a string slice.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the id, returning the raw string.
    #[inline]
    pub fn into_string(self) -> String {
        self.0
    }

    /// An unassigned (empty) identifier.
    #[inline]
    pub fn unassigned() -> Self {
        Self(String::new(), PhantomData)
    }

    /// `true` when the identifier is the empty "unassigned" sentinel.
    #[inline]
    pub fn is_unassigned(&self) -> bool {
        self.0.is_empty()
    }
}

// ============================================================================
// Standard trait implementations
// ============================================================================

impl<T> Clone for Id<T> {
    #[inline]
    fn clone(&self) -> Self {
        Self(self.0.clone(), PhantomData)
    }
}

impl<T> Default for Id<T> {
    fn default() -> Self {
        Self::unassigned()
    }
}

impl<T> Debug for Id<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Include the marker type name for debugging clarity
        f.debug_tuple(&format!("Id<{}>", std::any::type_name::<T>()))
            .field(&self.0)
            .finish()
    }
}

impl<T> Display for Id<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        Display::fmt(&self.0, f)
    }
}

impl<T> PartialEq for Id<T> {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl<T> Eq for Id<T> {}

impl<T> PartialOrd for Id<T> {
    #[inline]
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> Ord for Id<T> {
    #[inline]
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.cmp(&other.0)
    }
}

impl<T> Hash for Id<T> {
    #[inline]
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.hash(state);
    }
}

impl<T> AsRef<str> for Id<T> {
    #[inline]
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl<T> From<String> for Id<T> {
    #[inline]
    fn from(raw: String) -> Self {
        Self::new(raw)
    }
}

impl<T> From<&str> for Id<T> {
    #[inline]
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

// ============================================================================
// Serde support
// ============================================================================

impl<T> Serialize for Id<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.0.serialize(serializer)
    }
}

impl<'de, T> Deserialize<'de> for Id<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer).map(Self::new)
    }
}

// ============================================================================
// Tests
// ============================================================================
