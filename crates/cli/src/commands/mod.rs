//! Subcommand implementations. Each takes the rehydrated [`AppContext`].
//!
//! [`AppContext`]: stockcount_client::AppContext

pub mod auth;
pub mod categories;
pub mod periods;
pub mod products;
pub mod records;
pub mod sync;
