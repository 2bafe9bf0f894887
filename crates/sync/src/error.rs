//! Synchronizer error types.

use thiserror::Error;

use crate::backend::BackendError;

/// Outcome of a failed session operation.
///
/// None of these are fatal. By the time a caller sees one the failure has
/// already been logged and, for mutations, reported through a notification.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Every sign-in path failed; a local identity was assigned instead.
    #[error("Identity provider unavailable: {0}")]
    IdentityUnavailable(#[source] BackendError),

    /// A mutation was attempted before identity was ready, or without a
    /// remote backend.
    #[error("Session not ready for remote writes")]
    NotReady,

    /// A remote write was rejected.
    #[error("Remote write failed: {0}")]
    RemoteWriteFailed(#[source] BackendError),

    /// The favorites document does not exist yet.
    #[error("Remote favorites record missing")]
    RemoteRecordMissing,

    /// The live subscription reported an error.
    #[error("Remote read failed: {0}")]
    RemoteReadFailed(#[source] BackendError),

    /// Provider sign-out was rejected.
    #[error("Sign-out failed: {0}")]
    SignOutFailed(#[source] BackendError),
}
