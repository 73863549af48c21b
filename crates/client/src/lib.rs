//! Stockcount client library.
//!
//! Talks to the inventory REST backend and the hosted auth provider, and
//! keeps a persisted, optimistically patched replica of what it fetched.
//!
//! # Layers
//!
//! - [`api`] - HTTP wrapper that normalizes the backend's response quirks,
//!   plus one endpoint group per entity family
//! - [`auth`] - Auth provider seam and the GoTrue-compatible implementation
//! - [`storage`] - Per-store JSON snapshots
//! - [`store`] - Cached state per entity family with the reconciliation rules
//! - [`context`] - [`AppContext`], which owns all of the above and defines the
//!   init/teardown lifecycle
//!
//! # Security
//!
//! Bearer tokens are held as [`secrecy::SecretString`] and never logged.
//! Snapshots on disk do contain the session token, like browser storage would.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod api;
pub mod auth;
pub mod config;
pub mod context;
pub mod error;
pub mod storage;
pub mod store;

pub use api::{ApiClient, ApiError, ApiRequest, ImageFile, ImageSource};
pub use auth::{AuthError, AuthProvider, AuthResponse, Session, SupabaseAuth, User};
pub use config::{ClientConfig, ConfigError};
pub use context::{AppContext, BootstrapReport};
pub use error::{ClientError, ValidationError};
pub use storage::{FileStorage, MemoryStorage, SnapshotStorage, StorageError};
pub use store::{
    ActionStatus, AuthStore, CategoryStore, PeriodStore, ProductStore, RecordStore,
};
