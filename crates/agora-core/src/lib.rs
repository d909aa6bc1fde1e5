//! Core types, state machines, and trait definitions for the Agora social
//! graph.
//!
//! This crate is deliberately free of HTTP and database dependencies. The
//! lifecycle operations are plain functions over the per-entity repository
//! traits in [`store`]; a backend (e.g. `agora-store-sqlite`) runs each of
//! them inside one transaction and exposes the result through
//! [`store::SocialStore`].

pub mod decision;
pub mod error;
pub mod fanout;
pub mod id;
pub mod membership;
pub mod notification;
pub mod post;
pub mod relationship;
pub mod store;
pub mod user;
pub mod visibility;

pub use error::{Entity, Error, Result, ValidationError};

#[cfg(test)]
mod memory;
#[cfg(test)]
mod tests;
