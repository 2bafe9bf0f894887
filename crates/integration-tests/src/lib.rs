//! Integration tests for VivaMais Turismo.
//!
//! Scenarios run sessions against the in-process backend, so no network or
//! hosted provider is needed.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p viva-mais-integration-tests
//! ```
//!
//! # Test Categories
//!
//! - `favorites_sync` - Identity bootstrap and favorites synchronization across sessions
//! - `site_flows` - Catalog browsing, trip requests and forms

use std::time::Duration;

use viva_mais_core::{DocumentPath, ExperienceId, FavoriteSet, VisitorId};
use viva_mais_sync::backend::MemoryBackend;
use viva_mais_sync::{Session, SessionConfig};

/// Application namespace used by every test session.
pub const TEST_APP_ID: &str = "integration-app";

/// Upper bound for waiting on background delivery.
pub const DELIVERY_TIMEOUT: Duration = Duration::from_secs(5);

/// Session configuration for tests.
#[must_use]
pub fn test_config() -> SessionConfig {
    SessionConfig {
        app_id: TEST_APP_ID.to_string(),
        ..SessionConfig::default()
    }
}

/// Favorites document path for `visitor` in the test namespace.
#[must_use]
pub fn favorites_path(visitor: &VisitorId) -> DocumentPath {
    DocumentPath::favorites(TEST_APP_ID, visitor)
}

/// Parse experience ids, panicking on malformed test input.
///
/// # Panics
///
/// Panics if an id is invalid.
#[must_use]
#[allow(clippy::unwrap_used)]
pub fn favorite_set(ids: &[&str]) -> FavoriteSet {
    ids.iter().map(|s| ExperienceId::parse(s).unwrap()).collect()
}

/// A started session and the backend behind it.
pub struct TestContext {
    pub backend: MemoryBackend,
    pub session: Session,
    pub visitor: VisitorId,
}

impl TestContext {
    /// Start a session on a fresh backend and wait for its identity.
    ///
    /// # Panics
    ///
    /// Panics if bootstrap yields no visitor.
    pub async fn new() -> Self {
        Self::on(MemoryBackend::new(), test_config()).await
    }

    /// Start a session on `backend` and wait for its identity.
    ///
    /// # Panics
    ///
    /// Panics if bootstrap yields no visitor.
    #[allow(clippy::expect_used)]
    pub async fn on(backend: MemoryBackend, config: SessionConfig) -> Self {
        let session = Session::with_backend(backend.clone(), config);
        session.start();
        let visitor = session
            .wait_ready()
            .await
            .visitor
            .expect("ready session has a visitor");
        Self {
            backend,
            session,
            visitor,
        }
    }

    /// This session's favorites document path.
    #[must_use]
    pub fn path(&self) -> DocumentPath {
        favorites_path(&self.visitor)
    }

    /// Wait until the favorites mirror equals `expected`.
    ///
    /// # Panics
    ///
    /// Panics if it does not within [`DELIVERY_TIMEOUT`].
    #[allow(clippy::expect_used)]
    pub async fn wait_favorites(&self, expected: &FavoriteSet) {
        let mut rx = self.session.watch_favorites();
        tokio::time::timeout(DELIVERY_TIMEOUT, rx.wait_for(|f| f == expected))
            .await
            .expect("favorites not delivered in time")
            .expect("favorites channel closed");
    }
}
