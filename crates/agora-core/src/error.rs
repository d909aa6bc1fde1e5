//! Error types for `agora-core`.

use std::fmt;

use strum::Display;
use thiserror::Error;

use crate::id::UserId;

/// The kind of record an error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum Entity {
  User,
  Group,
  Relationship,
  Membership,
  Notification,
  Post,
  Comment,
}

/// Input rejected before any state is read or written.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
  #[error("user {0} cannot follow themselves")]
  SelfReference(UserId),

  #[error("unknown decision: {0:?}")]
  UnknownDecision(String),

  #[error("{0} must not be empty")]
  Empty(&'static str),
}

#[derive(Debug, Error)]
pub enum Error {
  #[error("{entity} not found: {key}")]
  NotFound { entity: Entity, key: String },

  #[error("conflict: {0}")]
  Conflict(String),

  #[error("invalid state: {0}")]
  InvalidState(String),

  #[error("unauthorized: {0}")]
  Unauthorized(String),

  #[error("forbidden: {0}")]
  Forbidden(String),

  #[error("validation failed: {0}")]
  Validation(#[from] ValidationError),

  /// Opaque backend failure, tagged with the operation and the entity it
  /// touched.
  #[error("storage error in {op} on {entity}: {source}")]
  Storage {
    op:     &'static str,
    entity: String,
    #[source]
    source: Box<dyn std::error::Error + Send + Sync>,
  },
}

impl Error {
  pub fn not_found(entity: Entity, key: impl fmt::Display) -> Self {
    Self::NotFound { entity, key: key.to_string() }
  }

  pub fn storage(
    op: &'static str,
    entity: impl fmt::Display,
    source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
  ) -> Self {
    Self::Storage { op, entity: entity.to_string(), source: source.into() }
  }

  pub fn is_not_found(&self) -> bool { matches!(self, Self::NotFound { .. }) }

  pub fn is_conflict(&self) -> bool { matches!(self, Self::Conflict(_)) }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
