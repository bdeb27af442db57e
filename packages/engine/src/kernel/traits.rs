// Trait definitions for dependency injection
//
// These are INFRASTRUCTURE traits only - no business logic. The matchmaking,
// lifecycle, and reconciliation rules live in domain modules that consume
// these traits.
//
// Naming convention: Base* for trait names (e.g., BaseDocumentStore)

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::sync::broadcast;

use crate::common::{StoreError, UserId};

// =============================================================================
// Document Store Trait (Infrastructure)
// =============================================================================

/// A single document's full current state.
///
/// Push notifications always carry complete state, never deltas, so a
/// snapshot is self-contained: applying the newest one is always correct
/// ("last snapshot wins").
#[derive(Debug, Clone)]
pub struct DocumentSnapshot {
    /// Store-assigned identifier, unique within its collection.
    pub id: String,
    /// The document's fields as a JSON object.
    pub fields: Value,
}

impl DocumentSnapshot {
    /// Decodes the fields into a typed value.
    pub fn decode<T: DeserializeOwned>(&self, path: &str) -> Result<T, StoreError> {
        serde_json::from_value(self.fields.clone()).map_err(|source| StoreError::Malformed {
            path: path.to_string(),
            source,
        })
    }
}

/// Equality filter on a single field. The store boundary only guarantees
/// equality comparisons, so nothing richer is modeled here.
#[derive(Debug, Clone)]
pub struct Filter {
    pub field: String,
    pub equals: Value,
}

/// Sort direction for an ordering clause.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Ascending,
    Descending,
}

/// Ordering clause applied after filtering.
#[derive(Debug, Clone)]
pub struct OrderBy {
    pub field: String,
    pub direction: Direction,
}

/// Compound query: equality filters + ordering + limit.
#[derive(Debug, Clone, Default)]
pub struct Query {
    pub filters: Vec<Filter>,
    pub order_by: Vec<OrderBy>,
    pub limit: Option<usize>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an equality filter.
    pub fn filter(mut self, field: &str, equals: impl Into<Value>) -> Self {
        self.filters.push(Filter {
            field: field.to_string(),
            equals: equals.into(),
        });
        self
    }

    /// Adds an ascending ordering clause.
    pub fn order_asc(mut self, field: &str) -> Self {
        self.order_by.push(OrderBy {
            field: field.to_string(),
            direction: Direction::Ascending,
        });
        self
    }

    /// Adds a descending ordering clause.
    pub fn order_desc(mut self, field: &str) -> Self {
        self.order_by.push(OrderBy {
            field: field.to_string(),
            direction: Direction::Descending,
        });
        self
    }

    /// Caps the number of returned documents.
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// Push subscription over a single document. Delivered at-least-once with
/// full current state per change; the current state is delivered immediately
/// on subscription when the document exists.
pub type DocumentWatch = broadcast::Receiver<DocumentSnapshot>;

/// Push subscription over a query's full result set. Every delivery carries
/// the complete current set, so a lagged receiver recovers by simply taking
/// the next delivery.
pub type QueryWatch = broadcast::Receiver<Vec<DocumentSnapshot>>;

/// Document-store client boundary.
///
/// Paths are slash-separated: `"rooms"` is a collection, `"rooms/{id}"` a
/// document, `"rooms/{id}/messages"` a sub-collection.
/// Partial updates merge last-write-wins; `increment` is atomic per
/// document. Deleting a document surfaces through query watches (the next
/// result set no longer contains it), not through its document watch.
#[async_trait]
pub trait BaseDocumentStore: Send + Sync {
    /// Fetch a single document, `None` if absent.
    async fn get(&self, path: &str) -> Result<Option<DocumentSnapshot>, StoreError>;

    /// Create a document with a store-assigned id; returns the new snapshot.
    async fn add(&self, collection: &str, fields: Value) -> Result<DocumentSnapshot, StoreError>;

    /// Create or replace a document at a known path.
    async fn set(&self, path: &str, fields: Value) -> Result<(), StoreError>;

    /// Merge fields into an existing document (last-write-wins).
    async fn update(&self, path: &str, fields: Value) -> Result<(), StoreError>;

    /// Delete a single document.
    async fn delete(&self, path: &str) -> Result<(), StoreError>;

    /// Atomically add `by` to a numeric field (missing fields start at 0).
    async fn increment(&self, path: &str, field: &str, by: i64) -> Result<(), StoreError>;

    /// Batch-delete every document in a collection.
    async fn delete_collection(&self, collection: &str) -> Result<(), StoreError>;

    /// Run a compound query against a collection.
    async fn query(&self, collection: &str, query: Query)
        -> Result<Vec<DocumentSnapshot>, StoreError>;

    /// Open a push subscription on a single document.
    async fn watch_document(&self, path: &str) -> Result<DocumentWatch, StoreError>;

    /// Open a push subscription on a query's result set.
    async fn watch_query(&self, collection: &str, query: Query)
        -> Result<QueryWatch, StoreError>;
}

// =============================================================================
// Auth Provider Trait (Infrastructure)
// =============================================================================

/// Opaque identity issued by the authentication collaborator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthIdentity {
    pub uid: UserId,
    pub email: String,
}

/// Stream of authentication state changes. `None` means signed out.
pub type AuthStateWatch = broadcast::Receiver<Option<AuthIdentity>>;

/// Authentication provider boundary. Credential handling, password resets,
/// and email flows all live behind this trait; the engine only consumes the
/// identity it settles on.
#[async_trait]
pub trait BaseAuthProvider: Send + Sync {
    /// Register a new account and sign it in.
    async fn sign_up(&self, email: &str, password: &str) -> Result<AuthIdentity, StoreError>;

    /// Sign in an existing account.
    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthIdentity, StoreError>;

    /// Sign the current account out.
    async fn sign_out(&self) -> Result<(), StoreError>;

    /// Subscribe to authentication state changes. The current state is
    /// delivered immediately on subscription.
    fn watch_state(&self) -> AuthStateWatch;
}
