//! VivaMais Turismo visitor sessions.
//!
//! Bootstraps a visitor identity against a hosted identity provider (or a
//! local fallback) and mirrors the visitor's favorites document into local
//! state, with transient notifications for user-facing outcomes.
//!
//! # Modules
//!
//! - [`session`] - The [`Session`] handle: identity bootstrap, favorites mirror, mutations
//! - [`backend`] - Identity provider and document store traits plus implementations
//! - [`notify`] - Self-expiring notification slot
//! - [`config`] - Environment configuration
//! - [`credentials`] - Saved sign-in between runs

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod backend;
pub mod config;
pub mod credentials;
pub mod error;
pub mod notify;
pub mod session;
mod task;

pub use config::SessionConfig;
pub use error::SyncError;
pub use notify::Notifier;
pub use session::{Backends, IdentitySource, IdentityState, Session};
