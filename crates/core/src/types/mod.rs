//! Core types for VivaMais Turismo.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod email;
pub mod favorites;
pub mod id;
pub mod notification;
pub mod price;

pub use email::{Email, EmailError};
pub use favorites::{DocumentPath, FavoriteSet, FavoritesPatch, FavoritesRecord};
pub use id::*;
pub use notification::{Notification, NotificationKind};
pub use price::{CurrencyCode, Price, PriceError};
