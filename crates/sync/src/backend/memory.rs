//! In-process identity provider and document store.
//!
//! Documents live in a map, every write pushes a fresh snapshot to the
//! document's watchers, and users are issued random ids. Clones share one
//! client; [`MemoryBackend::reconnect`] opens another client on the same
//! server state, the way a new process would. Failure hooks let tests drive
//! the error paths of the session.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use tokio::sync::{mpsc, watch};
use tracing::debug;
use viva_mais_core::{DocumentPath, FavoritesPatch, FavoritesRecord, VisitorId};

use super::{
    AuthUser, BackendError, DocumentStore, DocumentWatch, IdentityProvider, StoredCredential,
    WatchEvent,
};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Debug, Default)]
struct Failures {
    sign_in: bool,
    custom_token: bool,
    sign_out: bool,
    writes: usize,
    conflict: bool,
}

struct Inner {
    custom_tokens: Mutex<HashMap<String, VisitorId>>,
    refresh_tokens: Mutex<HashMap<String, AuthUser>>,
    documents: Mutex<HashMap<DocumentPath, FavoritesRecord>>,
    watchers: Mutex<HashMap<DocumentPath, Vec<mpsc::UnboundedSender<WatchEvent>>>>,
    failures: Mutex<Failures>,
    writes: AtomicUsize,
}

/// In-memory backend implementing both [`IdentityProvider`] and
/// [`DocumentStore`].
///
/// Cheap to clone; clones share state, including the signed-in user.
#[derive(Clone)]
pub struct MemoryBackend {
    auth: Arc<watch::Sender<Option<AuthUser>>>,
    inner: Arc<Inner>,
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryBackend {
    #[must_use]
    pub fn new() -> Self {
        let (auth, _) = watch::channel(None);
        Self {
            auth: Arc::new(auth),
            inner: Arc::new(Inner {
                custom_tokens: Mutex::new(HashMap::new()),
                refresh_tokens: Mutex::new(HashMap::new()),
                documents: Mutex::new(HashMap::new()),
                watchers: Mutex::new(HashMap::new()),
                failures: Mutex::new(Failures::default()),
                writes: AtomicUsize::new(0),
            }),
        }
    }

    /// A new client on the same users and documents, with nobody signed in.
    #[must_use]
    pub fn reconnect(&self) -> Self {
        let (auth, _) = watch::channel(None);
        Self {
            auth: Arc::new(auth),
            inner: Arc::clone(&self.inner),
        }
    }

    /// Accept `token` for custom sign-in as user `uid`.
    pub fn register_custom_token(&self, token: &str, uid: VisitorId) {
        lock(&self.inner.custom_tokens).insert(token.to_string(), uid);
    }

    /// Make anonymous sign-in fail until reset.
    pub fn fail_sign_in(&self, fail: bool) {
        lock(&self.inner.failures).sign_in = fail;
    }

    /// Make custom-token sign-in fail until reset.
    pub fn fail_custom_token(&self, fail: bool) {
        lock(&self.inner.failures).custom_token = fail;
    }

    /// Make sign-out fail until reset.
    pub fn fail_sign_out(&self, fail: bool) {
        lock(&self.inner.failures).sign_out = fail;
    }

    /// Fail the next `count` writes (`update` or `create`). An update of a
    /// missing document reports `NotFound` without consuming one.
    pub fn fail_next_writes(&self, count: usize) {
        lock(&self.inner.failures).writes = count;
    }

    /// Reject the next write as if another writer changed the document
    /// first.
    pub fn conflict_next_write(&self) {
        lock(&self.inner.failures).conflict = true;
    }

    /// Seed or replace a document from outside any session, notifying
    /// watchers.
    pub fn put_document(&self, path: &DocumentPath, record: FavoritesRecord) {
        lock(&self.inner.documents).insert(path.clone(), record);
        self.publish(path);
    }

    /// Current contents of a document.
    #[must_use]
    pub fn document(&self, path: &DocumentPath) -> Option<FavoritesRecord> {
        lock(&self.inner.documents).get(path).cloned()
    }

    /// Deliver a read error to every watcher of `path`.
    pub fn push_watch_error(&self, path: &DocumentPath, message: &str) {
        if let Some(senders) = lock(&self.inner.watchers).get_mut(path) {
            senders.retain(|tx| {
                tx.send(Err(BackendError::Injected(message.to_string())))
                    .is_ok()
            });
        }
    }

    /// Number of live watchers on `path`. Closed watches are pruned first.
    #[must_use]
    pub fn watcher_count(&self, path: &DocumentPath) -> usize {
        let mut watchers = lock(&self.inner.watchers);
        watchers.get_mut(path).map_or(0, |senders| {
            senders.retain(|tx| !tx.is_closed());
            senders.len()
        })
    }

    /// Number of successful writes so far.
    #[must_use]
    pub fn write_count(&self) -> usize {
        self.inner.writes.load(Ordering::SeqCst)
    }

    fn take_write_failure(&self) -> Result<(), BackendError> {
        let mut failures = lock(&self.inner.failures);
        if std::mem::take(&mut failures.conflict) {
            return Err(BackendError::Conflict("document changed".to_string()));
        }
        if failures.writes > 0 {
            failures.writes -= 1;
            return Err(BackendError::Injected("write rejected".to_string()));
        }
        Ok(())
    }

    fn publish(&self, path: &DocumentPath) {
        // Watchers before documents, as in `watch`, so snapshots reach each
        // watcher in write order.
        let mut watchers = lock(&self.inner.watchers);
        let snapshot = self.document(path);
        if let Some(senders) = watchers.get_mut(path) {
            senders.retain(|tx| tx.send(Ok(snapshot.clone())).is_ok());
            debug!(path = %path, watchers = senders.len(), "Published snapshot");
        }
    }

    fn signed_in(&self, uid: VisitorId, anonymous: bool) -> AuthUser {
        let user = AuthUser { uid, anonymous };
        lock(&self.inner.refresh_tokens).insert(refresh_token(&user.uid), user.clone());
        self.auth.send_replace(Some(user.clone()));
        user
    }
}

fn refresh_token(uid: &VisitorId) -> String {
    format!("refresh-{uid}")
}

#[async_trait]
impl IdentityProvider for MemoryBackend {
    async fn sign_in_anonymously(&self) -> Result<AuthUser, BackendError> {
        if lock(&self.inner.failures).sign_in {
            return Err(BackendError::Injected("anonymous sign-in rejected".to_string()));
        }
        Ok(self.signed_in(VisitorId::generate(), true))
    }

    async fn sign_in_with_custom_token(
        &self,
        token: &SecretString,
    ) -> Result<AuthUser, BackendError> {
        if lock(&self.inner.failures).custom_token {
            return Err(BackendError::Injected("custom token rejected".to_string()));
        }
        let uid = lock(&self.inner.custom_tokens)
            .get(token.expose_secret())
            .cloned()
            .ok_or(BackendError::Unauthenticated)?;
        Ok(self.signed_in(uid, false))
    }

    async fn restore(&self, credential: &StoredCredential) -> Result<AuthUser, BackendError> {
        let user = lock(&self.inner.refresh_tokens)
            .get(credential.refresh_token.expose_secret())
            .cloned()
            .filter(|user| user.uid == credential.uid)
            .ok_or(BackendError::Unauthenticated)?;
        Ok(self.signed_in(user.uid, user.anonymous))
    }

    fn credential(&self) -> Option<StoredCredential> {
        self.current_user().map(|user| StoredCredential {
            refresh_token: SecretString::from(refresh_token(&user.uid)),
            uid: user.uid,
            anonymous: user.anonymous,
        })
    }

    async fn sign_out(&self) -> Result<(), BackendError> {
        if lock(&self.inner.failures).sign_out {
            return Err(BackendError::Injected("sign-out rejected".to_string()));
        }
        self.auth.send_replace(None);
        Ok(())
    }

    fn current_user(&self) -> Option<AuthUser> {
        self.auth.borrow().clone()
    }

    fn auth_state(&self) -> watch::Receiver<Option<AuthUser>> {
        self.auth.subscribe()
    }
}

#[async_trait]
impl DocumentStore for MemoryBackend {
    async fn get(&self, path: &DocumentPath) -> Result<Option<FavoritesRecord>, BackendError> {
        Ok(self.document(path))
    }

    async fn update(
        &self,
        path: &DocumentPath,
        patch: &FavoritesPatch,
    ) -> Result<(), BackendError> {
        if !lock(&self.inner.documents).contains_key(path) {
            return Err(BackendError::NotFound(path.to_string()));
        }
        self.take_write_failure()?;
        {
            let mut documents = lock(&self.inner.documents);
            let record = documents
                .get_mut(path)
                .ok_or_else(|| BackendError::NotFound(path.to_string()))?;
            record.apply(patch);
        }
        self.inner.writes.fetch_add(1, Ordering::SeqCst);
        self.publish(path);
        Ok(())
    }

    async fn create(
        &self,
        path: &DocumentPath,
        record: &FavoritesRecord,
    ) -> Result<(), BackendError> {
        self.take_write_failure()?;
        lock(&self.inner.documents).insert(path.clone(), record.clone());
        self.inner.writes.fetch_add(1, Ordering::SeqCst);
        self.publish(path);
        Ok(())
    }

    async fn watch(&self, path: &DocumentPath) -> Result<DocumentWatch, BackendError> {
        let (tx, watch) = DocumentWatch::channel();
        // Hold the watcher list while reading the snapshot so no write can
        // slip between the initial delivery and registration.
        let mut watchers = lock(&self.inner.watchers);
        let snapshot = self.document(path);
        tx.send(Ok(snapshot)).map_err(|_| BackendError::Closed)?;
        watchers.entry(path.clone()).or_default().push(tx);
        Ok(watch)
    }
}
