// Session store — the single writer of cached session and credential state.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::{Mutex, RwLock};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::provider::{Credential, IdentityProvider, RefreshError, Session, SessionChange};
use super::token_file::TokenFile;

type Listener = Arc<dyn Fn(&SessionChange) + Send + Sync>;

pub struct SessionStore {
    provider: Arc<dyn IdentityProvider>,
    token_file: TokenFile,
    session: RwLock<Option<Session>>,
    credential: RwLock<Option<Credential>>,
    listeners: Mutex<Vec<(u64, Listener)>>,
    next_listener_id: AtomicU64,
    feed_shutdown: CancellationToken,
}

impl SessionStore {
    /// Connect to the identity service: load the persisted credential, fetch
    /// the current session, and start consuming the change feed.
    pub async fn connect(provider: Arc<dyn IdentityProvider>, token_file: TokenFile) -> Arc<Self> {
        let persisted = token_file.load();
        let store = Arc::new(Self {
            provider: provider.clone(),
            token_file,
            session: RwLock::new(None),
            credential: RwLock::new(persisted),
            listeners: Mutex::new(Vec::new()),
            next_listener_id: AtomicU64::new(0),
            feed_shutdown: CancellationToken::new(),
        });

        // Initial session check against the identity service.
        match provider.fetch_session().await {
            Ok(Some(session)) => store.apply(SessionChange::Established(session)),
            Ok(None) => store.apply(SessionChange::Cleared),
            Err(e) => warn!("initial session check failed: {}", e),
        }

        // The feed task holds only a weak reference so dropping the last
        // strong handle tears the store down.
        let mut changes = provider.subscribe_changes();
        let weak = Arc::downgrade(&store);
        let shutdown = store.feed_shutdown.clone();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    change = changes.recv() => {
                        let Some(change) = change else { break };
                        let Some(store) = weak.upgrade() else { break };
                        debug!("session change from identity service");
                        store.apply(change);
                    }
                }
            }
        });

        store
    }

    /// Synchronous read of the cached session.
    pub fn current_session(&self) -> Option<Session> {
        self.session.read().clone()
    }

    /// Synchronous read of the cached credential. Never touches the network.
    pub fn credential(&self) -> Option<Credential> {
        self.credential.read().clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.session.read().is_some()
    }

    /// Ask the identity service for a renewed credential. One attempt, no
    /// backoff; a failure is surfaced to the caller untouched.
    pub async fn refresh(&self) -> Result<Credential, RefreshError> {
        let session = self.provider.refresh().await?;
        let credential = session.credential.clone();
        info!("session refreshed subject={}", session.subject_id);
        self.apply(SessionChange::Established(session));
        Ok(credential)
    }

    /// Terminate the session with the identity service and clear local state.
    /// The local clear happens even if the sign-out call fails.
    pub async fn logout(&self) -> Result<(), RefreshError> {
        let result = self.provider.sign_out().await;
        self.apply(SessionChange::Cleared);
        result
    }

    /// Drop the cached session and credential without contacting the
    /// identity service. Used on terminal authentication failure.
    pub fn clear_session(&self) {
        self.apply(SessionChange::Cleared);
    }

    /// Register a listener for session transitions. The listener stops
    /// firing when the returned handle is dropped or unsubscribed.
    pub fn subscribe(
        self: &Arc<Self>,
        listener: impl Fn(&SessionChange) + Send + Sync + 'static,
    ) -> Subscription {
        let id = self.next_listener_id.fetch_add(1, Ordering::Relaxed);
        self.listeners.lock().push((id, Arc::new(listener)));
        Subscription {
            id,
            store: Arc::downgrade(self),
        }
    }

    fn apply(&self, change: SessionChange) {
        match &change {
            SessionChange::Established(session) => {
                *self.session.write() = Some(session.clone());
                *self.credential.write() = Some(session.credential.clone());
                if let Err(e) = self.token_file.store(&session.credential) {
                    warn!("failed to persist credential: {}", e);
                }
            }
            SessionChange::Cleared => {
                *self.session.write() = None;
                *self.credential.write() = None;
                if let Err(e) = self.token_file.clear() {
                    warn!("failed to clear persisted credential: {}", e);
                }
            }
        }

        // Snapshot under the lock, invoke outside it, so a listener can
        // subscribe or read the store without deadlocking.
        let listeners: Vec<Listener> = self
            .listeners
            .lock()
            .iter()
            .map(|(_, l)| Arc::clone(l))
            .collect();
        for listener in listeners {
            listener(&change);
        }
    }

    fn remove_listener(&self, id: u64) {
        self.listeners.lock().retain(|(lid, _)| *lid != id);
    }
}

impl Drop for SessionStore {
    fn drop(&mut self) {
        debug!("SessionStore dropped, stopping change feed");
        self.feed_shutdown.cancel();
    }
}

/// Handle for a registered session-change listener.
pub struct Subscription {
    id: u64,
    store: Weak<SessionStore>,
}

impl Subscription {
    pub fn unsubscribe(self) {
        // Drop does the work.
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(store) = self.store.upgrade() {
            store.remove_listener(self.id);
        }
    }
}
