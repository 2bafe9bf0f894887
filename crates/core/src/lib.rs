//! VivaMais Turismo Core - Shared types and site logic.
//!
//! This crate provides the pieces used by every VivaMais component:
//! - `sync` - Visitor identity and favorites synchronization
//! - `cli` - Command-line front end for browsing and managing favorites
//!
//! # Architecture
//!
//! The core crate contains only types, static data and pure state machines -
//! no I/O, no network clients, no runtime. This keeps it lightweight and
//! allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for ids, emails, prices, favorites and notifications
//! - [`catalog`] - The experience/destination/article catalog and its filters
//! - [`trip_request`] - The three-step trip-request wizard
//! - [`forms`] - Contact and newsletter forms

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod catalog;
pub mod forms;
pub mod trip_request;
pub mod types;

pub use types::*;
