//! SQLite backend for Agora.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated thread
//! without blocking the async runtime. Every write operation of
//! [`SocialStore`](agora_core::store::SocialStore) runs the lifecycle logic
//! from `agora-core` inside a single `IMMEDIATE` transaction.

mod encode;
mod repo;
mod schema;
mod store;

pub mod error;

pub use error::{Error, Result};
pub use store::SqliteStore;
