use std::fmt;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;

/// Opaque bearer token proving an authenticated session to the backend.
///
/// The token value is redacted from `Debug` output so it never leaks into
/// logs.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn token(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Credential(<redacted>)")
    }
}

/// The authenticated identity and credential currently active in the client.
#[derive(Debug, Clone)]
pub struct Session {
    pub subject_id: String,
    pub display_name: String,
    pub email: String,
    pub credential: Credential,
}

/// A session transition reported by the identity service or applied locally.
#[derive(Debug, Clone)]
pub enum SessionChange {
    /// A session was established or silently renewed.
    Established(Session),
    /// The session ended (logout, expiry, or unrecoverable refresh failure).
    Cleared,
}

#[derive(Debug, Error)]
pub enum RefreshError {
    #[error("no valid session at the identity service")]
    NoSession,
    #[error("identity service error: {0}")]
    Provider(String),
}

/// Boundary to the external identity service.
///
/// The service is authority-driven: `refresh` mints a renewed session from
/// whatever server-side state it maintains and never takes a caller-supplied
/// credential as input.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Fetch the currently established session, if any.
    async fn fetch_session(&self) -> Result<Option<Session>, RefreshError>;

    /// Mint a renewed session. Not retried by callers on failure.
    async fn refresh(&self) -> Result<Session, RefreshError>;

    /// Terminate the session at the identity service.
    async fn sign_out(&self) -> Result<(), RefreshError>;

    /// Feed of asynchronous session transitions (login elsewhere, logout,
    /// silent renewal). Closing the channel ends the feed.
    fn subscribe_changes(&self) -> mpsc::UnboundedReceiver<SessionChange>;
}
