//! In-process document store with push fan-out.
//!
//! Implements [`BaseDocumentStore`] over plain maps, with topic-keyed
//! broadcast channels pushing full-state snapshots to watchers on every
//! mutation. Used by the demo binary and by every test that needs a store;
//! the `unordered_snapshots` mode exists so tests can prove that consumers
//! sort defensively instead of trusting delivery order.

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::common::StoreError;
use crate::kernel::traits::{
    BaseDocumentStore, Direction, DocumentSnapshot, DocumentWatch, Query, QueryWatch,
};

/// One registered `watch_query` subscription.
struct QueryWatcher {
    collection: String,
    query: Query,
    tx: broadcast::Sender<Vec<DocumentSnapshot>>,
}

/// In-memory [`BaseDocumentStore`].
///
/// Collections are keyed by slash-separated path (`"rooms"`,
/// `"rooms/{id}/messages"`); documents by their store-assigned id.
pub struct MemoryStore {
    collections: Mutex<HashMap<String, BTreeMap<String, Value>>>,
    doc_channels: Mutex<HashMap<String, broadcast::Sender<DocumentSnapshot>>>,
    query_watchers: Mutex<Vec<QueryWatcher>>,
    capacity: usize,
    unordered_snapshots: bool,
    available: AtomicBool,
}

impl MemoryStore {
    /// Create a store with the default channel capacity (256).
    pub fn new() -> Self {
        Self::with_capacity(256)
    }

    /// Create a store with the given broadcast channel capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            collections: Mutex::new(HashMap::new()),
            doc_channels: Mutex::new(HashMap::new()),
            query_watchers: Mutex::new(Vec::new()),
            capacity,
            unordered_snapshots: false,
            available: AtomicBool::new(true),
        }
    }

    /// Deliver query snapshots with their requested ordering deliberately
    /// destroyed. Test-only knob: consumers must survive a store that does
    /// not honor the ordered query.
    pub fn with_unordered_snapshots(mut self) -> Self {
        self.unordered_snapshots = true;
        self
    }

    /// Toggle simulated backend availability. While unavailable, every
    /// operation returns [`StoreError::Unavailable`].
    pub fn set_available(&self, available: bool) {
        self.available.store(available, AtomicOrdering::SeqCst);
    }

    fn check_available(&self) -> Result<(), StoreError> {
        if self.available.load(AtomicOrdering::SeqCst) {
            Ok(())
        } else {
            Err(StoreError::Unavailable("simulated outage".to_string()))
        }
    }

    /// Splits `"rooms/abc"` into `("rooms", "abc")`.
    fn split_path(path: &str) -> Result<(&str, &str), StoreError> {
        path.rsplit_once('/')
            .ok_or_else(|| StoreError::NotFound(path.to_string()))
    }

    /// Evaluates a query against a collection's current documents.
    fn run_query(
        docs: &BTreeMap<String, Value>,
        query: &Query,
        unordered: bool,
    ) -> Vec<DocumentSnapshot> {
        let mut results: Vec<DocumentSnapshot> = docs
            .iter()
            .filter(|(_, fields)| {
                query
                    .filters
                    .iter()
                    .all(|f| fields.get(&f.field) == Some(&f.equals))
            })
            .map(|(id, fields)| DocumentSnapshot {
                id: id.clone(),
                fields: fields.clone(),
            })
            .collect();

        results.sort_by(|a, b| {
            for clause in &query.order_by {
                let ord = cmp_values(a.fields.get(&clause.field), b.fields.get(&clause.field));
                let ord = match clause.direction {
                    Direction::Ascending => ord,
                    Direction::Descending => ord.reverse(),
                };
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            Ordering::Equal
        });

        if unordered {
            results.reverse();
        }

        if let Some(limit) = query.limit {
            results.truncate(limit);
        }

        results
    }

    /// Pushes the current state of `path` to its document watchers.
    fn notify_document(&self, path: &str, snapshot: DocumentSnapshot) {
        let channels = self.doc_channels.lock().unwrap();
        if let Some(tx) = channels.get(path) {
            // Ignore send errors (no active receivers)
            let _ = tx.send(snapshot);
        }
    }

    /// Re-evaluates and pushes every query watch registered on `collection`.
    fn notify_collection(&self, collection: &str) {
        let collections = self.collections.lock().unwrap();
        let empty = BTreeMap::new();
        let docs = collections.get(collection).unwrap_or(&empty);

        let mut watchers = self.query_watchers.lock().unwrap();
        watchers.retain(|w| w.tx.receiver_count() > 0);
        for watcher in watchers.iter().filter(|w| w.collection == collection) {
            let results = Self::run_query(docs, &watcher.query, self.unordered_snapshots);
            let _ = watcher.tx.send(results);
        }
    }

    fn write_fields(&self, path: &str, fields: Value, merge: bool) -> Result<Value, StoreError> {
        let (collection, id) = Self::split_path(path)?;
        let mut collections = self.collections.lock().unwrap();
        let docs = collections.entry(collection.to_string()).or_default();

        let stored = match docs.get_mut(id) {
            Some(existing) if merge => {
                if let (Value::Object(target), Value::Object(incoming)) =
                    (&mut *existing, fields)
                {
                    for (key, value) in incoming {
                        target.insert(key, value);
                    }
                }
                existing.clone()
            }
            Some(existing) => {
                *existing = fields;
                existing.clone()
            }
            None if merge => return Err(StoreError::NotFound(path.to_string())),
            None => {
                docs.insert(id.to_string(), fields.clone());
                fields
            }
        };
        Ok(stored)
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BaseDocumentStore for MemoryStore {
    async fn get(&self, path: &str) -> Result<Option<DocumentSnapshot>, StoreError> {
        self.check_available()?;
        let (collection, id) = Self::split_path(path)?;
        let collections = self.collections.lock().unwrap();
        Ok(collections
            .get(collection)
            .and_then(|docs| docs.get(id))
            .map(|fields| DocumentSnapshot {
                id: id.to_string(),
                fields: fields.clone(),
            }))
    }

    async fn add(&self, collection: &str, fields: Value) -> Result<DocumentSnapshot, StoreError> {
        self.check_available()?;
        let id = Uuid::now_v7().simple().to_string();
        {
            let mut collections = self.collections.lock().unwrap();
            collections
                .entry(collection.to_string())
                .or_default()
                .insert(id.clone(), fields.clone());
        }
        let snapshot = DocumentSnapshot {
            id: id.clone(),
            fields,
        };
        self.notify_document(&format!("{collection}/{id}"), snapshot.clone());
        self.notify_collection(collection);
        Ok(snapshot)
    }

    async fn set(&self, path: &str, fields: Value) -> Result<(), StoreError> {
        self.check_available()?;
        let stored = self.write_fields(path, fields, false)?;
        let (collection, id) = Self::split_path(path)?;
        self.notify_document(
            path,
            DocumentSnapshot {
                id: id.to_string(),
                fields: stored,
            },
        );
        self.notify_collection(collection);
        Ok(())
    }

    async fn update(&self, path: &str, fields: Value) -> Result<(), StoreError> {
        self.check_available()?;
        let stored = self.write_fields(path, fields, true)?;
        let (collection, id) = Self::split_path(path)?;
        self.notify_document(
            path,
            DocumentSnapshot {
                id: id.to_string(),
                fields: stored,
            },
        );
        self.notify_collection(collection);
        Ok(())
    }

    async fn delete(&self, path: &str) -> Result<(), StoreError> {
        self.check_available()?;
        let (collection, id) = Self::split_path(path)?;
        {
            let mut collections = self.collections.lock().unwrap();
            if let Some(docs) = collections.get_mut(collection) {
                docs.remove(id);
            }
        }
        self.notify_collection(collection);
        Ok(())
    }

    async fn increment(&self, path: &str, field: &str, by: i64) -> Result<(), StoreError> {
        self.check_available()?;
        let (collection, id) = Self::split_path(path)?;
        let stored = {
            let mut collections = self.collections.lock().unwrap();
            let docs = collections
                .get_mut(collection)
                .ok_or_else(|| StoreError::NotFound(path.to_string()))?;
            let fields = docs
                .get_mut(id)
                .ok_or_else(|| StoreError::NotFound(path.to_string()))?;
            let current = fields.get(field).and_then(Value::as_i64).unwrap_or(0);
            if let Value::Object(map) = fields {
                map.insert(field.to_string(), Value::from(current + by));
            }
            fields.clone()
        };
        self.notify_document(
            path,
            DocumentSnapshot {
                id: id.to_string(),
                fields: stored,
            },
        );
        self.notify_collection(collection);
        Ok(())
    }

    async fn delete_collection(&self, collection: &str) -> Result<(), StoreError> {
        self.check_available()?;
        {
            let mut collections = self.collections.lock().unwrap();
            collections.remove(collection);
        }
        self.notify_collection(collection);
        Ok(())
    }

    async fn query(
        &self,
        collection: &str,
        query: Query,
    ) -> Result<Vec<DocumentSnapshot>, StoreError> {
        self.check_available()?;
        let collections = self.collections.lock().unwrap();
        let empty = BTreeMap::new();
        let docs = collections.get(collection).unwrap_or(&empty);
        Ok(Self::run_query(docs, &query, self.unordered_snapshots))
    }

    async fn watch_document(&self, path: &str) -> Result<DocumentWatch, StoreError> {
        self.check_available()?;
        let rx = {
            let mut channels = self.doc_channels.lock().unwrap();
            let tx = channels
                .entry(path.to_string())
                .or_insert_with(|| broadcast::channel(self.capacity).0);
            tx.subscribe()
        };
        // Deliver current state immediately. Earlier subscribers on the same
        // document see a redundant full-state snapshot, which at-least-once
        // delivery permits.
        if let Some(snapshot) = self.get(path).await? {
            self.notify_document(path, snapshot);
        }
        Ok(rx)
    }

    async fn watch_query(&self, collection: &str, query: Query) -> Result<QueryWatch, StoreError> {
        self.check_available()?;
        let (tx, rx) = broadcast::channel(self.capacity);
        let initial = self.query(collection, query.clone()).await?;
        let _ = tx.send(initial);
        self.query_watchers.lock().unwrap().push(QueryWatcher {
            collection: collection.to_string(),
            query,
            tx,
        });
        Ok(rx)
    }
}

/// Field comparison for ordering clauses. Absent fields sort first; mixed
/// types compare equal (the schema never mixes types within a field).
fn cmp_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(x), Some(y)) => match (x, y) {
            (Value::Number(m), Value::Number(n)) => m
                .as_f64()
                .partial_cmp(&n.as_f64())
                .unwrap_or(Ordering::Equal),
            (Value::String(s), Value::String(t)) => s.cmp(t),
            (Value::Bool(p), Value::Bool(q)) => p.cmp(q),
            _ => Ordering::Equal,
        },
    }
}
