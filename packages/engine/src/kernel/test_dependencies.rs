// TestDependencies - mock implementations for testing
//
// Provides mock collaborators that can be injected into SessionDeps for
// tests and for the demo binary. The document store itself is covered by
// MemoryStore (kernel/memory_store.rs); this module adds the controllable
// auth provider and the builder that glues everything together.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::broadcast;

use crate::common::{StoreError, UserId};
use crate::config::Config;
use crate::kernel::{
    AuthIdentity, AuthStateWatch, BaseAuthProvider, MemoryStore, SessionDeps,
};

// =============================================================================
// Mock Auth Provider
// =============================================================================

/// Controllable [`BaseAuthProvider`].
///
/// Identities are derived deterministically from the email's local part so
/// tests can predict uids. Sign-in/sign-up publish the settled identity on
/// the state stream, sign-out publishes `None`.
pub struct MockAuthProvider {
    state_tx: broadcast::Sender<Option<AuthIdentity>>,
    current: Mutex<Option<AuthIdentity>>,
    sign_in_calls: Mutex<Vec<String>>,
    reject_credentials: AtomicBool,
}

impl MockAuthProvider {
    pub fn new() -> Self {
        let (state_tx, _) = broadcast::channel(16);
        Self {
            state_tx,
            current: Mutex::new(None),
            sign_in_calls: Mutex::new(Vec::new()),
            reject_credentials: AtomicBool::new(false),
        }
    }

    /// Make every sign-in/sign-up attempt fail with the provider's
    /// invalid-credential code.
    pub fn with_rejected_credentials(self) -> Self {
        self.reject_credentials.store(true, Ordering::SeqCst);
        self
    }

    /// Get all emails that attempted to sign in
    pub fn sign_in_calls(&self) -> Vec<String> {
        self.sign_in_calls.lock().unwrap().clone()
    }

    /// The identity the provider currently considers signed in.
    pub fn current_identity(&self) -> Option<AuthIdentity> {
        self.current.lock().unwrap().clone()
    }

    fn settle(&self, email: &str) -> Result<AuthIdentity, StoreError> {
        if self.reject_credentials.load(Ordering::SeqCst) {
            return Err(StoreError::NotFound("auth/invalid-credential".to_string()));
        }

        let local = email.split('@').next().unwrap_or(email);
        let identity = AuthIdentity {
            uid: UserId::from(format!("uid-{local}")),
            email: email.to_string(),
        };
        *self.current.lock().unwrap() = Some(identity.clone());
        let _ = self.state_tx.send(Some(identity.clone()));
        Ok(identity)
    }
}

impl Default for MockAuthProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BaseAuthProvider for MockAuthProvider {
    async fn sign_up(&self, email: &str, _password: &str) -> Result<AuthIdentity, StoreError> {
        self.sign_in_calls.lock().unwrap().push(email.to_string());
        self.settle(email)
    }

    async fn sign_in(&self, email: &str, _password: &str) -> Result<AuthIdentity, StoreError> {
        self.sign_in_calls.lock().unwrap().push(email.to_string());
        self.settle(email)
    }

    async fn sign_out(&self) -> Result<(), StoreError> {
        *self.current.lock().unwrap() = None;
        let _ = self.state_tx.send(None);
        Ok(())
    }

    fn watch_state(&self) -> AuthStateWatch {
        let rx = self.state_tx.subscribe();
        // Deliver the current state immediately; earlier subscribers see a
        // redundant full-state value, which the stream contract permits.
        let _ = self.state_tx.send(self.current.lock().unwrap().clone());
        rx
    }
}

// =============================================================================
// TestDependencies - Builder for test dependencies
// =============================================================================

#[derive(Clone)]
pub struct TestDependencies {
    pub store: Arc<MemoryStore>,
    pub auth: Arc<MockAuthProvider>,
}

impl TestDependencies {
    pub fn new() -> Self {
        Self {
            store: Arc::new(MemoryStore::new()),
            auth: Arc::new(MockAuthProvider::new()),
        }
    }

    /// Set a pre-configured in-memory store
    pub fn mock_store(mut self, store: MemoryStore) -> Self {
        self.store = Arc::new(store);
        self
    }

    /// Set a pre-configured auth provider
    pub fn mock_auth(mut self, auth: MockAuthProvider) -> Self {
        self.auth = Arc::new(auth);
        self
    }

    /// Convert into SessionDeps for exercising the engine
    pub fn into_deps(self) -> SessionDeps {
        SessionDeps::new(self.store, self.auth, Config::default())
    }
}

impl Default for TestDependencies {
    fn default() -> Self {
        Self::new()
    }
}
