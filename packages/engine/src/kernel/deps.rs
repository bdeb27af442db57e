//! Session dependencies (using traits for testability)
//!
//! Every connected client runs as an independent session against the shared
//! remote store; this container carries the collaborators a session needs.
//! Both collaborators sit behind trait abstractions so tests can swap in the
//! in-memory store and the mock auth provider.

use std::sync::Arc;

use crate::config::Config;
use crate::kernel::{BaseAuthProvider, BaseDocumentStore};

/// Dependencies accessible to every domain operation in a session.
#[derive(Clone)]
pub struct SessionDeps {
    pub store: Arc<dyn BaseDocumentStore>,
    pub auth: Arc<dyn BaseAuthProvider>,
    pub config: Config,
}

impl SessionDeps {
    pub fn new(
        store: Arc<dyn BaseDocumentStore>,
        auth: Arc<dyn BaseAuthProvider>,
        config: Config,
    ) -> Self {
        Self {
            store,
            auth,
            config,
        }
    }
}
