//! Visitor session: identity bootstrap and the live favorites mirror.
//!
//! A [`Session`] is created once at startup and handed to every component
//! that needs the visitor's identity, favorites or notifications.
//!
//! # Lifecycle
//!
//! 1. [`Session::connect`] picks a backend from configuration, or degraded
//!    mode when none is usable.
//! 2. [`Session::start`] spawns the auth listener. It signs in when the
//!    provider reports no user and subscribes to the favorites document of
//!    whichever user it does report.
//! 3. [`Session::wait_ready`] resolves once an identity (remote or local) is
//!    assigned.
//!
//! With a state file configured, the provider sign-in is saved after
//! bootstrap and restored on the next run, so the visitor keeps one identity
//! until [`Session::sign_out`].
//!
//! # Identity precedence
//!
//! A remote identity always wins. A locally generated id is only assigned
//! while no remote identity has been recorded, and a remote identity that
//! arrives later replaces it.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use tokio::sync::watch;
use tracing::{debug, error, info, instrument, warn};
use viva_mais_core::catalog::{Catalog, FavoriteEntry};
use viva_mais_core::{
    DocumentPath, ExperienceId, FavoriteSet, FavoritesPatch, FavoritesRecord, Notification,
    NotificationKind, VisitorId,
};

use crate::backend::{
    AuthUser, BackendError, DocumentStore, DocumentWatch, FirebaseBackend, IdentityProvider,
    WatchEvent,
};
use crate::config::{ProviderConfig, SessionConfig};
use crate::credentials::CredentialStore;
use crate::error::SyncError;
use crate::notify::Notifier;
use crate::task::OwnedTask;

const MSG_NOT_READY: &str = "Erro: Autenticação não pronta ou banco de dados indisponível.";
const MSG_ADDED: &str = "Experiência adicionada aos favoritos!";
const MSG_ADD_FAILED: &str = "Erro ao adicionar favorito.";
const MSG_REMOVED: &str = "Experiência removida dos favoritos!";
const MSG_REMOVE_FAILED: &str = "Erro ao remover favorito.";
const MSG_SIGNED_OUT: &str = "Você foi desconectado.";
const MSG_SIGN_OUT_FAILED: &str = "Erro ao fazer logout.";

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Where the current visitor id came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentitySource {
    /// Issued by the identity provider.
    Remote,
    /// Generated locally because no provider identity was available.
    Local,
}

/// Observable identity of the session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdentityState {
    pub visitor: Option<VisitorId>,
    pub source: Option<IdentitySource>,
    /// Set once bootstrap has settled on an identity.
    pub ready: bool,
}

impl IdentityState {
    #[must_use]
    pub fn is_remote(&self) -> bool {
        self.source == Some(IdentitySource::Remote)
    }
}

/// The provider and store a connected session talks to.
#[derive(Clone)]
pub struct Backends {
    pub identity: Arc<dyn IdentityProvider>,
    pub documents: Arc<dyn DocumentStore>,
}

impl Backends {
    /// Use one value for both roles.
    pub fn shared<B>(backend: B) -> Self
    where
        B: IdentityProvider + DocumentStore + 'static,
    {
        let backend = Arc::new(backend);
        Self {
            identity: backend.clone(),
            documents: backend,
        }
    }
}

struct Subscription {
    visitor: VisitorId,
    _task: OwnedTask,
}

struct SessionInner {
    config: SessionConfig,
    backends: Option<Backends>,
    identity: watch::Sender<IdentityState>,
    favorites: watch::Sender<FavoriteSet>,
    /// Whether `favorites` reflects the current identity's record.
    synced: watch::Sender<bool>,
    notifier: Notifier,
    credentials: Option<CredentialStore>,
    listener: Mutex<Option<OwnedTask>>,
    subscription: Mutex<Option<Subscription>>,
}

/// Shared handle to the visitor session.
///
/// Cheap to clone. Background tasks hold only weak references, so dropping
/// the last handle stops the auth listener and the favorites subscription.
#[derive(Clone)]
pub struct Session {
    inner: Arc<SessionInner>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("degraded", &self.is_degraded())
            .field("identity", &self.identity())
            .field("favorites", &self.favorites())
            .finish_non_exhaustive()
    }
}

impl Session {
    /// A session without a backend. Identity is local and remote writes are
    /// refused.
    #[must_use]
    pub fn offline(config: SessionConfig) -> Self {
        Self::build(config, None)
    }

    /// A session using the given backends.
    #[must_use]
    pub fn with_backends(backends: Backends, config: SessionConfig) -> Self {
        Self::build(config, Some(backends))
    }

    /// A session using one value as both identity provider and store.
    #[must_use]
    pub fn with_backend<B>(backend: B, config: SessionConfig) -> Self
    where
        B: IdentityProvider + DocumentStore + 'static,
    {
        Self::with_backends(Backends::shared(backend), config)
    }

    /// Build a session from configuration.
    ///
    /// Falls back to [`Session::offline`] when no provider descriptor is
    /// configured or the hosted client cannot be built.
    #[must_use]
    pub fn connect(config: SessionConfig) -> Self {
        let Some(descriptor) = config.provider.as_ref() else {
            info!("No provider configured, running in degraded mode");
            return Self::offline(config);
        };

        let backend = ProviderConfig::parse(descriptor)
            .map_err(|e| e.to_string())
            .and_then(|provider| {
                FirebaseBackend::new(provider, config.watch_interval).map_err(|e| e.to_string())
            });

        match backend {
            Ok(backend) => {
                info!("Connected to hosted provider");
                Self::with_backend(backend, config)
            }
            Err(e) => {
                error!(error = %e, "Provider unavailable, running in degraded mode");
                Self::offline(config)
            }
        }
    }

    fn build(config: SessionConfig, backends: Option<Backends>) -> Self {
        let (identity, _) = watch::channel(IdentityState::default());
        let (favorites, _) = watch::channel(FavoriteSet::new());
        let (synced, _) = watch::channel(false);
        let notifier = Notifier::new(config.notification_ttl);
        // Only a provider identity can be restored on a later run.
        let credentials = backends
            .as_ref()
            .and(config.state_file.clone())
            .map(CredentialStore::new);
        Self {
            inner: Arc::new(SessionInner {
                config,
                backends,
                identity,
                favorites,
                synced,
                notifier,
                credentials,
                listener: Mutex::new(None),
                subscription: Mutex::new(None),
            }),
        }
    }

    /// Whether the session runs without a remote backend.
    #[must_use]
    pub fn is_degraded(&self) -> bool {
        self.inner.backends.is_none()
    }

    #[must_use]
    pub fn config(&self) -> &SessionConfig {
        &self.inner.config
    }

    /// Begin identity bootstrap.
    ///
    /// In degraded mode a local id is assigned before this returns. With a
    /// backend the auth listener is spawned; calling `start` while it is
    /// already running does nothing.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(&self) {
        let Some(backends) = self.inner.backends.as_ref() else {
            self.assign_local_identity();
            return;
        };

        let mut listener = lock(&self.inner.listener);
        if listener.as_ref().is_some_and(|task| !task.is_finished()) {
            debug!("Auth listener already running");
            return;
        }

        let weak = Arc::downgrade(&self.inner);
        let auth = backends.identity.auth_state();
        *listener = Some(OwnedTask::spawn(run_auth_listener(weak, auth)));
        debug!("Auth listener started");
    }

    /// Wait until identity is ready and return it.
    pub async fn wait_ready(&self) -> IdentityState {
        let mut rx = self.inner.identity.subscribe();
        // The sender lives as long as `self`, so this cannot fail.
        match rx.wait_for(|state| state.ready).await {
            Ok(state) => state.clone(),
            Err(_) => self.identity(),
        }
    }

    /// Wait until the favorites mirror has received the current identity's
    /// record, and return it.
    ///
    /// Identity must be ready or about to be; without a live subscription
    /// (degraded mode, local fallback) this resolves immediately.
    pub async fn wait_synced(&self) -> FavoriteSet {
        let mut rx = self.inner.synced.subscribe();
        let _ = rx.wait_for(|synced| *synced).await;
        self.favorites()
    }

    #[must_use]
    pub fn identity(&self) -> IdentityState {
        self.inner.identity.borrow().clone()
    }

    /// The current visitor id, if any.
    #[must_use]
    pub fn visitor(&self) -> Option<VisitorId> {
        self.inner.identity.borrow().visitor.clone()
    }

    /// Snapshot of the favorites mirror.
    #[must_use]
    pub fn favorites(&self) -> FavoriteSet {
        self.inner.favorites.borrow().clone()
    }

    #[must_use]
    pub fn notification(&self) -> Option<Notification> {
        self.inner.notifier.current()
    }

    #[must_use]
    pub fn watch_identity(&self) -> watch::Receiver<IdentityState> {
        self.inner.identity.subscribe()
    }

    #[must_use]
    pub fn watch_favorites(&self) -> watch::Receiver<FavoriteSet> {
        self.inner.favorites.subscribe()
    }

    #[must_use]
    pub fn watch_notification(&self) -> watch::Receiver<Option<Notification>> {
        self.inner.notifier.subscribe()
    }

    /// Post a notification.
    pub fn notify(&self, message: impl Into<String>, kind: NotificationKind) {
        self.inner.notifier.notify(message, kind);
    }

    /// Resolve the current favorites against `catalog`.
    #[must_use]
    pub fn favorite_entries<'a>(&self, catalog: &'a Catalog) -> Vec<FavoriteEntry<'a>> {
        catalog.resolve_favorites(&self.favorites())
    }

    /// Add an experience to the visitor's favorites.
    ///
    /// Creates the favorites record when it does not exist yet. The local
    /// mirror is not touched; it updates when the subscription delivers the
    /// new snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::NotReady`] before identity is ready or without a
    /// backend, and [`SyncError::RemoteWriteFailed`] if the store rejects
    /// the write. Both also post an error notification.
    #[instrument(skip_all, fields(experience = %id))]
    pub async fn add_favorite(&self, id: ExperienceId) -> Result<(), SyncError> {
        let (backends, path) = self.writable()?;

        let result = match backends
            .documents
            .update(&path, &FavoritesPatch::Add(id.clone()))
            .await
        {
            Err(e) if e.is_not_found() => {
                debug!(reason = %SyncError::RemoteRecordMissing, "Creating favorites record");
                backends
                    .documents
                    .create(&path, &FavoritesRecord::single(id))
                    .await
            }
            other => other,
        };

        self.report_write(result, MSG_ADDED, MSG_ADD_FAILED)
    }

    /// Remove an experience from the visitor's favorites.
    ///
    /// Removing an id that is not a favorite, or from a record that does not
    /// exist, succeeds without changing anything.
    ///
    /// # Errors
    ///
    /// Same as [`Session::add_favorite`].
    #[instrument(skip_all, fields(experience = %id))]
    pub async fn remove_favorite(&self, id: ExperienceId) -> Result<(), SyncError> {
        let (backends, path) = self.writable()?;

        let result = match backends
            .documents
            .update(&path, &FavoritesPatch::Remove(id))
            .await
        {
            Err(e) if e.is_not_found() => {
                debug!("No favorites record, nothing to remove");
                Ok(())
            }
            other => other,
        };

        self.report_write(result, MSG_REMOVED, MSG_REMOVE_FAILED)
    }

    /// End the visitor session.
    ///
    /// Stops the auth listener, signs out of the provider, cancels the
    /// favorites subscription and clears identity and favorites. A new
    /// identity is issued by the next [`Session::start`].
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::SignOutFailed`] if the provider rejects the
    /// sign-out. Local state is then left as it was and the listener is
    /// restarted.
    #[instrument(skip_all)]
    pub async fn sign_out(&self) -> Result<(), SyncError> {
        if let Some(backends) = self.inner.backends.as_ref() {
            // Stop listening first so the provider's "no user" state is not
            // answered with a fresh sign-in.
            let listener = lock(&self.inner.listener).take();
            drop(listener);

            if let Err(e) = backends.identity.sign_out().await {
                error!(error = %e, "Sign-out failed");
                self.notify(MSG_SIGN_OUT_FAILED, NotificationKind::Error);
                self.start();
                return Err(SyncError::SignOutFailed(e));
            }

            if let Some(store) = self.inner.credentials.as_ref() {
                store.clear().await;
            }
        }

        let previous = {
            // Cleared under the slot lock so an in-flight delivery cannot
            // land after the cache is emptied.
            let mut slot = lock(&self.inner.subscription);
            let subscription = slot.take();
            let previous = self.inner.identity.send_replace(IdentityState::default());
            self.inner.synced.send_replace(false);
            self.inner.favorites.send_replace(FavoriteSet::new());
            drop(subscription);
            previous
        };
        info!(visitor = ?previous.visitor, "Signed out");
        self.notify(MSG_SIGNED_OUT, NotificationKind::Success);
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Internals
    // -------------------------------------------------------------------------

    /// Backends and document path for a write, or `NotReady`.
    fn writable(&self) -> Result<(Backends, DocumentPath), SyncError> {
        let state = self.identity();
        let target = match (&self.inner.backends, state.ready, state.visitor) {
            (Some(backends), true, Some(visitor)) => Some((
                backends.clone(),
                DocumentPath::favorites(&self.inner.config.app_id, &visitor),
            )),
            _ => None,
        };

        target.ok_or_else(|| {
            warn!(degraded = self.is_degraded(), "Write attempted before session was ready");
            self.notify(MSG_NOT_READY, NotificationKind::Error);
            SyncError::NotReady
        })
    }

    fn report_write(
        &self,
        result: Result<(), BackendError>,
        success: &str,
        failure: &str,
    ) -> Result<(), SyncError> {
        match result {
            Ok(()) => {
                self.notify(success, NotificationKind::Success);
                Ok(())
            }
            Err(e) => {
                let err = SyncError::RemoteWriteFailed(e);
                error!(error = %err, "Favorites write failed");
                self.notify(failure, NotificationKind::Error);
                Err(err)
            }
        }
    }

    /// Mark identity ready, generating a local id unless one is recorded.
    fn assign_local_identity(&self) {
        let mut local = false;
        self.inner.identity.send_if_modified(|state| {
            local = !state.is_remote();
            let mut changed = false;
            if state.visitor.is_none() {
                let visitor = VisitorId::generate();
                info!(visitor = %visitor, "Assigned local visitor id");
                state.visitor = Some(visitor);
                state.source = Some(IdentitySource::Local);
                changed = true;
            }
            if !state.ready {
                state.ready = true;
                changed = true;
            }
            changed
        });
        // No subscription backs a local identity.
        if local {
            self.inner.synced.send_replace(true);
        }
    }

    async fn on_auth_state(&self, user: Option<AuthUser>) {
        match user {
            Some(user) => self.on_signed_in(user).await,
            None => self.bootstrap().await,
        }
    }

    async fn on_signed_in(&self, user: AuthUser) {
        let switched = {
            // The identity changes under the slot lock, together with the
            // teardown of the previous visitor's subscription.
            let mut slot = lock(&self.inner.subscription);
            let mut switched = false;
            self.inner.identity.send_if_modified(|state| {
                let changed = !state.ready
                    || !state.is_remote()
                    || state.visitor.as_ref() != Some(&user.uid);
                switched = state.visitor.as_ref() != Some(&user.uid);
                state.visitor = Some(user.uid.clone());
                state.source = Some(IdentitySource::Remote);
                state.ready = true;
                changed
            });
            if switched {
                if let Some(old) = slot.take() {
                    debug!(visitor = %old.visitor, "Cancelled favorites subscription");
                }
                self.inner.synced.send_replace(false);
                self.inner.favorites.send_replace(FavoriteSet::new());
            }
            switched
        };

        if switched {
            info!(visitor = %user.uid, anonymous = user.anonymous, "Remote identity recorded");
        }

        self.subscribe(user.uid).await;
    }

    /// No provider user: sign in, falling back to a local id.
    async fn bootstrap(&self) {
        let Some(backends) = self.inner.backends.clone() else {
            self.assign_local_identity();
            return;
        };

        match self.sign_in(backends.identity.as_ref()).await {
            Ok(user) => {
                self.save_credential(backends.identity.as_ref()).await;
                self.on_signed_in(user).await;
            }
            Err(e) => {
                let err = SyncError::IdentityUnavailable(e);
                error!(error = %err, "Every sign-in path failed");
                self.assign_local_identity();
            }
        }
    }

    async fn sign_in(&self, identity: &dyn IdentityProvider) -> Result<AuthUser, BackendError> {
        if let Some(store) = self.inner.credentials.as_ref() {
            if let Some(credential) = store.load().await {
                match identity.restore(&credential).await {
                    Ok(user) => return Ok(user),
                    Err(BackendError::Unauthenticated) => {
                        warn!("Saved sign-in rejected, signing in again");
                        store.clear().await;
                    }
                    Err(e) => warn!(error = %e, "Could not restore saved sign-in"),
                }
            }
        }
        if let Some(token) = self.inner.config.initial_auth_token.as_ref() {
            match identity.sign_in_with_custom_token(token).await {
                Ok(user) => return Ok(user),
                Err(e) => warn!(error = %e, "Custom token sign-in failed, trying anonymous"),
            }
        }
        identity.sign_in_anonymously().await
    }

    async fn save_credential(&self, identity: &dyn IdentityProvider) {
        let (Some(store), Some(credential)) =
            (self.inner.credentials.as_ref(), identity.credential())
        else {
            return;
        };
        if let Err(e) = store.save(&credential).await {
            warn!(error = %e, "Could not save sign-in, next run starts a new visitor");
        }
    }

    /// Open the favorites subscription for `visitor`, replacing any other.
    async fn subscribe(&self, visitor: VisitorId) {
        let Some(backends) = self.inner.backends.as_ref() else {
            return;
        };

        {
            let mut slot = lock(&self.inner.subscription);
            if slot.as_ref().is_some_and(|s| s.visitor == visitor) {
                return;
            }
            // Cancel the previous identity's subscription before opening
            // the new one.
            if let Some(old) = slot.take() {
                debug!(visitor = %old.visitor, "Cancelled favorites subscription");
            }
        }

        let path = DocumentPath::favorites(&self.inner.config.app_id, &visitor);
        let watch = match backends.documents.watch(&path).await {
            Ok(watch) => watch,
            Err(e) => {
                let err = SyncError::RemoteReadFailed(e);
                error!(path = %path, error = %err, "Could not open favorites subscription");
                return;
            }
        };

        let mut slot = lock(&self.inner.subscription);
        if self.inner.identity.borrow().visitor.as_ref() != Some(&visitor) {
            debug!(path = %path, "Identity changed while opening subscription");
            return;
        }
        // Spawned under the slot lock so the task cannot observe the slot
        // before it is filled.
        let task = OwnedTask::spawn(run_subscription(
            Arc::downgrade(&self.inner),
            visitor.clone(),
            watch,
        ));
        *slot = Some(Subscription {
            visitor,
            _task: task,
        });
        debug!(path = %path, "Opened favorites subscription");
    }
}

async fn run_auth_listener(
    session: Weak<SessionInner>,
    mut auth: watch::Receiver<Option<AuthUser>>,
) {
    loop {
        let user = auth.borrow_and_update().clone();
        let Some(inner) = session.upgrade() else {
            break;
        };
        Session { inner }.on_auth_state(user).await;

        if auth.changed().await.is_err() {
            debug!("Auth state channel closed");
            break;
        }
    }
}

async fn run_subscription(
    session: Weak<SessionInner>,
    visitor: VisitorId,
    mut watch: DocumentWatch,
) {
    while let Some(event) = watch.next().await {
        let Some(inner) = session.upgrade() else {
            break;
        };
        if !deliver(&inner, &visitor, event) {
            break;
        }
    }
}

/// Push one snapshot into the cache. Returns `false` once `visitor` is no
/// longer the subscribed identity.
fn deliver(inner: &SessionInner, visitor: &VisitorId, event: WatchEvent) -> bool {
    // Held until the cache is written: sign-out and identity switches take
    // the same lock before clearing it.
    let slot = lock(&inner.subscription);
    let current = slot.as_ref().is_some_and(|s| &s.visitor == visitor)
        && inner.identity.borrow().visitor.as_ref() == Some(visitor);
    if !current {
        return false;
    }

    match event {
        Ok(record) => {
            // An absent document is an empty set.
            let favorites = record.map(|r| r.experiences).unwrap_or_default();
            debug!(visitor = %visitor, count = favorites.len(), "Favorites updated");
            inner.favorites.send_replace(favorites);
            inner.synced.send_replace(true);
        }
        Err(e) => {
            let err = SyncError::RemoteReadFailed(e);
            warn!(visitor = %visitor, error = %err, "Favorites subscription error");
        }
    }
    drop(slot);
    true
}
