//! Stockcount Core - Shared types library.
//!
//! This crate provides the types shared by every stockcount component:
//! - `client` - HTTP normalizer, endpoint groups and cached stores
//! - `cli` - Command-line front end over the client
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no HTTP
//! clients, no persistence. Everything here can be unit tested without a
//! runtime.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for IDs, prices, emails, statuses and dates
//! - [`models`] - Records mirrored from the inventory backend
//! - [`payload`] - Tolerant decoding of the backend's inconsistent list/item shapes
//! - [`translate`] - Mapping raw error messages to user-facing text

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod models;
pub mod payload;
pub mod translate;
pub mod types;

pub use models::*;
pub use payload::{ItemPayload, ListPayload};
pub use translate::{extract_error_message, translate_error};
pub use types::*;
