//! Users and groups as seen from the social graph.
//!
//! Both are owned by external directories; the state machines only read
//! them, except that [`crate::membership::create_group`] inserts a group.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString, IntoStaticStr};
use uuid::Uuid;

use crate::{
  Entity, Error, Result,
  id::{GroupId, UserId},
  store::{GroupDirectory, UserDirectory},
};

/// Who may follow a user without approval.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display,
  EnumString, IntoStaticStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Privacy {
  Public,
  Private,
}

#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display,
  EnumString, IntoStaticStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum UserStatus {
  #[default]
  Active,
  Inactive,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
  pub user_id:      UserId,
  /// Stable identifier handed out to clients; never reused.
  pub external_id:  Uuid,
  pub display_name: String,
  pub privacy:      Privacy,
  pub status:       UserStatus,
  pub created_at:   DateTime<Utc>,
}

impl User {
  pub fn is_active(&self) -> bool { self.status == UserStatus::Active }
}

/// Input for seeding a user into a backend.
#[derive(Debug, Clone)]
pub struct NewUser {
  pub external_id:  Uuid,
  pub display_name: String,
  pub privacy:      Privacy,
  pub status:       UserStatus,
}

impl NewUser {
  /// An active user with a fresh external id.
  pub fn new(display_name: impl Into<String>, privacy: Privacy) -> Self {
    Self {
      external_id: Uuid::new_v4(),
      display_name: display_name.into(),
      privacy,
      status: UserStatus::default(),
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
  pub group_id:    GroupId,
  pub creator_id:  UserId,
  pub title:       String,
  pub description: String,
  pub created_at:  DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewGroup {
  pub creator_id:  UserId,
  pub title:       String,
  pub description: String,
}

// ─── Lookups ─────────────────────────────────────────────────────────────────

/// Fetch a user that exists, active or not.
pub fn require_user<S>(store: &S, id: UserId) -> Result<User>
where
  S: UserDirectory + ?Sized,
{
  store.user(id)?.ok_or_else(|| Error::not_found(Entity::User, id))
}

/// Fetch a user that may take part in a new transition. Inactive users are
/// reported as missing.
pub fn require_active_user<S>(store: &S, id: UserId) -> Result<User>
where
  S: UserDirectory + ?Sized,
{
  match store.user(id)? {
    Some(user) if user.is_active() => Ok(user),
    _ => Err(Error::not_found(Entity::User, id)),
  }
}

pub fn require_group<S>(store: &S, id: GroupId) -> Result<Group>
where
  S: GroupDirectory + ?Sized,
{
  store.group(id)?.ok_or_else(|| Error::not_found(Entity::Group, id))
}
