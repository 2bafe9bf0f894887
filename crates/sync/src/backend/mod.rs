//! Identity provider and document store abstractions.
//!
//! # Implementations
//!
//! - [`MemoryBackend`] - in-process provider and store, used by tests and
//!   local development
//! - [`FirebaseBackend`] - hosted provider over the Identity Toolkit and
//!   Firestore REST APIs
//!
//! Both traits are object safe so the session can hold either behind an
//! `Arc<dyn ...>`.

pub mod firebase;
pub mod memory;

pub use firebase::FirebaseBackend;
pub use memory::MemoryBackend;

use async_trait::async_trait;
use secrecy::SecretString;
use thiserror::Error;
use tokio::sync::{mpsc, watch};
use viva_mais_core::{DocumentPath, FavoritesPatch, FavoritesRecord, VisitorId};

use crate::task::OwnedTask;

/// Errors that can occur when calling a backend.
#[derive(Debug, Error)]
pub enum BackendError {
    /// The document does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// No signed-in user, or the user's token was rejected.
    #[error("Not authenticated")]
    Unauthenticated,

    /// The document changed between read and write.
    #[error("Conflicting concurrent update on {0}")]
    Conflict(String),

    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// API returned an error response.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Failed to parse a response.
    #[error("Parse error: {0}")]
    Parse(String),

    /// The backend side of a channel went away.
    #[error("Backend channel closed")]
    Closed,

    /// Failure injected by a test backend.
    #[error("Injected failure: {0}")]
    Injected(String),
}

impl BackendError {
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

/// A signed-in user as reported by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser {
    pub uid: VisitorId,
    pub anonymous: bool,
}

/// What it takes to sign a user back in on a later run.
#[derive(Clone)]
pub struct StoredCredential {
    pub uid: VisitorId,
    pub anonymous: bool,
    pub refresh_token: SecretString,
}

impl std::fmt::Debug for StoredCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoredCredential")
            .field("uid", &self.uid)
            .field("anonymous", &self.anonymous)
            .field("refresh_token", &"[REDACTED]")
            .finish()
    }
}

/// Anonymous and token-based sign-in with an observable auth state.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Create and sign in a fresh anonymous user.
    async fn sign_in_anonymously(&self) -> Result<AuthUser, BackendError>;

    /// Sign in with a pre-issued custom token.
    async fn sign_in_with_custom_token(
        &self,
        token: &SecretString,
    ) -> Result<AuthUser, BackendError>;

    /// Sign the user of a previously issued credential back in.
    async fn restore(&self, credential: &StoredCredential) -> Result<AuthUser, BackendError>;

    /// Credential of the signed-in user, for [`IdentityProvider::restore`]
    /// on a later run.
    fn credential(&self) -> Option<StoredCredential>;

    /// End the current session. The auth state becomes `None`.
    async fn sign_out(&self) -> Result<(), BackendError>;

    /// The signed-in user, if any.
    fn current_user(&self) -> Option<AuthUser>;

    /// Auth state channel. The current value is observable immediately and
    /// every sign-in or sign-out publishes a new one.
    fn auth_state(&self) -> watch::Receiver<Option<AuthUser>>;
}

/// Favorites document storage with live change delivery.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Read a document. A missing document is `Ok(None)`.
    async fn get(&self, path: &DocumentPath) -> Result<Option<FavoritesRecord>, BackendError>;

    /// Apply `patch` to an existing document.
    ///
    /// Fails with [`BackendError::NotFound`] when the document is missing.
    async fn update(&self, path: &DocumentPath, patch: &FavoritesPatch)
    -> Result<(), BackendError>;

    /// Write the whole document, creating it if needed.
    async fn create(&self, path: &DocumentPath, record: &FavoritesRecord)
    -> Result<(), BackendError>;

    /// Start delivering snapshots of `path`, beginning with the current one.
    async fn watch(&self, path: &DocumentPath) -> Result<DocumentWatch, BackendError>;
}

/// One delivery from a document watch. `Ok(None)` means the document is
/// absent.
pub type WatchEvent = Result<Option<FavoritesRecord>, BackendError>;

/// Single-consumer stream of snapshots for one document.
///
/// Dropping the watch cancels delivery: the producer sees a closed channel,
/// and any producer task owned by the watch is aborted.
#[derive(Debug)]
pub struct DocumentWatch {
    rx: mpsc::UnboundedReceiver<WatchEvent>,
    _producer: Option<OwnedTask>,
}

impl DocumentWatch {
    /// A watch fed directly through `tx`.
    #[must_use]
    pub fn channel() -> (mpsc::UnboundedSender<WatchEvent>, Self) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            tx,
            Self {
                rx,
                _producer: None,
            },
        )
    }

    /// A watch fed by a background task that stops with the watch.
    #[must_use]
    pub(crate) fn with_producer(rx: mpsc::UnboundedReceiver<WatchEvent>, producer: OwnedTask) -> Self {
        Self {
            rx,
            _producer: Some(producer),
        }
    }

    /// Next snapshot, or `None` once the producer has stopped.
    pub async fn next(&mut self) -> Option<WatchEvent> {
        self.rx.recv().await
    }
}
