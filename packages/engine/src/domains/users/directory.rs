//! Read-through cache of counterpart display names.
//!
//! Session-scoped and never evicted: the working set is the handful of
//! distinct participants ever seen in the active room. A uid that resolved
//! with a usable name is never fetched again within the session; a uid that
//! resolved without one stays pending and is retried on every later call
//! (no negative caching - the counterpart may pick a name any moment).

use std::collections::HashSet;

use tracing::{debug, warn};

use crate::common::UserId;
use crate::kernel::{BaseDocumentStore, DocumentSnapshot};

use super::models::{Profile, ReducedUser, User, UserLookup};
use super::ops;

#[derive(Default)]
pub struct UserDirectory {
    entries: UserLookup,
    /// Requested uids that have not yet produced a usable name.
    pending: HashSet<UserId>,
}

impl UserDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// `true` when the uid already resolved with a usable name.
    pub fn contains(&self, uid: &UserId) -> bool {
        self.entries.contains_key(uid)
    }

    /// The cache's current view, as handed to consumers.
    pub fn lookup(&self) -> UserLookup {
        self.entries.clone()
    }

    /// Resolves every unseen uid with one profile fetch each. Fetch failures
    /// are logged and the uid stays pending; the session proceeds with the
    /// names it has.
    pub async fn resolve<I>(&mut self, store: &dyn BaseDocumentStore, ids: I)
    where
        I: IntoIterator<Item = UserId>,
    {
        for uid in ids {
            if self.entries.contains_key(&uid) {
                continue;
            }
            match ops::fetch_profile(store, &uid).await {
                Ok(Profile::Found(user_name)) => {
                    self.pending.remove(&uid);
                    self.entries.insert(uid, ReducedUser { user_name });
                }
                Ok(Profile::NotFound) => {
                    debug!(uid = %uid, "Profile has no usable name yet");
                    self.pending.insert(uid);
                }
                Err(err) => {
                    warn!(uid = %uid, error = %err, "Profile fetch failed");
                    self.pending.insert(uid);
                }
            }
        }
    }

    /// Merges a pushed user-directory snapshot into the cache: updates names
    /// of cached uids and fills in pending ones. Returns `true` when any
    /// visible name changed.
    pub fn merge_remote(&mut self, snapshots: &[DocumentSnapshot]) -> bool {
        let mut changed = false;
        for snapshot in snapshots {
            let Ok(user) = User::from_snapshot(snapshot) else {
                continue;
            };
            if user.user_name.is_empty() {
                continue;
            }
            let uid = UserId::from(snapshot.id.clone());
            let relevant = self.pending.contains(&uid)
                || self
                    .entries
                    .get(&uid)
                    .is_some_and(|cached| cached.user_name != user.user_name);
            if relevant {
                self.pending.remove(&uid);
                self.entries.insert(
                    uid,
                    ReducedUser {
                        user_name: user.user_name,
                    },
                );
                changed = true;
            }
        }
        changed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::{BaseDocumentStore, MemoryStore};
    use serde_json::json;

    #[tokio::test]
    async fn resolved_names_are_never_fetched_again() {
        let store = MemoryStore::new();
        store.set("users/u1", json!({"userName": "ada"})).await.unwrap();

        let mut directory = UserDirectory::new();
        directory.resolve(&store, [UserId::from("u1")]).await;
        assert_eq!(directory.lookup()[&UserId::from("u1")].user_name, "ada");

        // A refetch would observe the new name; the cache must not.
        store.update("users/u1", json!({"userName": "renamed"})).await.unwrap();
        directory.resolve(&store, [UserId::from("u1")]).await;
        assert_eq!(directory.lookup()[&UserId::from("u1")].user_name, "ada");
    }

    #[tokio::test]
    async fn unnamed_profiles_stay_pending_and_are_retried() {
        let store = MemoryStore::new();
        store.set("users/u2", json!({"userName": ""})).await.unwrap();

        let mut directory = UserDirectory::new();
        directory.resolve(&store, [UserId::from("u2")]).await;
        assert!(!directory.contains(&UserId::from("u2")));

        store.update("users/u2", json!({"userName": "grace"})).await.unwrap();
        directory.resolve(&store, [UserId::from("u2")]).await;
        assert_eq!(directory.lookup()[&UserId::from("u2")].user_name, "grace");
    }

    #[tokio::test]
    async fn fetch_failures_leave_the_uid_pending() {
        let store = MemoryStore::new();
        store.set("users/u3", json!({"userName": "lin"})).await.unwrap();

        let mut directory = UserDirectory::new();
        store.set_available(false);
        directory.resolve(&store, [UserId::from("u3")]).await;
        assert!(!directory.contains(&UserId::from("u3")));

        store.set_available(true);
        directory.resolve(&store, [UserId::from("u3")]).await;
        assert!(directory.contains(&UserId::from("u3")));
    }

    #[tokio::test]
    async fn merge_remote_fills_pending_and_updates_changed_names() {
        let store = MemoryStore::new();
        store.set("users/u4", json!({"userName": ""})).await.unwrap();

        let mut directory = UserDirectory::new();
        directory.resolve(&store, [UserId::from("u4")]).await;

        // Push carries the name the profile fetch did not have yet.
        let changed = directory.merge_remote(&[DocumentSnapshot {
            id: "u4".to_string(),
            fields: json!({"userName": "kay"}),
        }]);
        assert!(changed);
        assert_eq!(directory.lookup()[&UserId::from("u4")].user_name, "kay");

        // Same snapshot again: nothing visible changes.
        let changed = directory.merge_remote(&[DocumentSnapshot {
            id: "u4".to_string(),
            fields: json!({"userName": "kay"}),
        }]);
        assert!(!changed);
    }

    #[tokio::test]
    async fn merge_remote_ignores_uncached_strangers() {
        let mut directory = UserDirectory::new();
        let changed = directory.merge_remote(&[DocumentSnapshot {
            id: "stranger".to_string(),
            fields: json!({"userName": "who"}),
        }]);
        assert!(!changed);
        assert!(directory.lookup().is_empty());
    }
}
