//! Command implementations.
//!
//! Every command writes its user-facing output to the writer it is given;
//! diagnostics go through `tracing`.

pub mod catalog;
pub mod favorites;
pub mod forms;

use std::io::Write;

use thiserror::Error;
use viva_mais_core::IdError;
use viva_mais_core::catalog::UnknownVariant;
use viva_mais_sync::config::ConfigError;
use viva_mais_sync::{Session, SessionConfig, SyncError};

/// Errors that can occur while running a command.
#[derive(Debug, Error)]
pub enum CommandError {
    /// Writing output failed.
    #[error("Output error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration could not be loaded.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// A session operation failed.
    #[error("{0}")]
    Sync(#[from] SyncError),

    /// An identifier argument is malformed.
    #[error("Invalid id: {0}")]
    InvalidId(#[from] IdError),

    /// An enumerated argument is not recognized.
    #[error("{0}")]
    InvalidArgument(#[from] UnknownVariant),

    /// The experience is not in the catalog.
    #[error("Unknown experience: {0}")]
    UnknownExperience(String),

    /// A form was rejected; the notification has already been shown.
    #[error("{0}")]
    Rejected(String),
}

/// Connect a session from the environment and wait for its identity.
///
/// A saved sign-in from an earlier run is restored, so the visitor keeps the
/// same id until `sign-out`.
///
/// # Errors
///
/// Returns error if the configuration is invalid.
pub async fn ready_session() -> Result<Session, CommandError> {
    Ok(ready(Session::connect(SessionConfig::from_env()?)).await)
}

/// Start `session` and wait until it has an identity.
async fn ready(session: Session) -> Session {
    session.start();
    session.wait_ready().await;
    session
}

/// Print the session's current notification, if any.
fn print_notification(out: &mut impl Write, session: &Session) -> std::io::Result<()> {
    if let Some(notification) = session.notification() {
        writeln!(out, "{notification}")?;
    }
    Ok(())
}
