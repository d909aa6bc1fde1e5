//! Notification records and the operations a receiver performs on them.
//!
//! Notifications are created by [`crate::fanout`] only. Their status moves
//! forward along `unread → read → inactive` and never back; rows are never
//! deleted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString, IntoStaticStr};
use tracing::debug;

use crate::{
  Entity, Error, Result,
  id::{NotificationId, UserId},
  store::NotificationStore,
};

/// Ordered by lifecycle position, so `a < b` means `b` is further along.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize,
  Display, EnumString, IntoStaticStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum NotificationStatus {
  Unread,
  Read,
  Inactive,
}

impl NotificationStatus {
  pub fn can_advance_to(self, next: Self) -> bool { next > self }
}

/// One tag per real event; the rendered content is never needed to tell two
/// events apart.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display,
  EnumString, IntoStaticStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ActionType {
  FollowRequest,
  FollowAccepted,
  GroupInvitation,
  GroupInvitationAccepted,
  GroupJoinRequest,
  GroupJoinAccepted,
  PostComment,
}

/// The kind of record a notification points back to.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display,
  EnumString, IntoStaticStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ParentType {
  Relationship,
  Membership,
  Post,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParentRef {
  pub parent_type: ParentType,
  pub parent_id:   i64,
}

impl ParentRef {
  pub fn new(parent_type: ParentType, parent_id: i64) -> Self {
    Self { parent_type, parent_id }
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
  pub notification_id: NotificationId,
  pub receiver_id:     UserId,
  pub actor_id:        UserId,
  pub action:          ActionType,
  pub parent:          ParentRef,
  /// Human-readable text rendered at creation time.
  pub content:         String,
  pub status:          NotificationStatus,
  pub created_at:      DateTime<Utc>,
  pub updated_at:      DateTime<Utc>,
}

/// Input to [`NotificationStore::insert_notification`]. New notifications are
/// always stored `unread`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewNotification {
  pub receiver_id: UserId,
  pub actor_id:    UserId,
  pub action:      ActionType,
  pub parent:      ParentRef,
  pub content:     String,
}

// ─── Operations ──────────────────────────────────────────────────────────────

pub fn notifications_for<S>(store: &S, user: UserId) -> Result<Vec<Notification>>
where
  S: NotificationStore + ?Sized,
{
  store.notifications_for(user)
}

/// Mark a single notification read.
///
/// Only an `unread` notification owned by `user` qualifies; anything else,
/// including a second call for the same id, is reported as `NotFound`.
pub fn mark_read<S>(
  store: &mut S,
  user: UserId,
  id: NotificationId,
  now: DateTime<Utc>,
) -> Result<Notification>
where
  S: NotificationStore + ?Sized,
{
  let mut notification = store
    .notification(id)?
    .filter(|n| n.receiver_id == user && n.status == NotificationStatus::Unread)
    .ok_or_else(|| Error::not_found(Entity::Notification, id))?;

  store.set_notification_status(id, NotificationStatus::Read, now)?;
  notification.status = NotificationStatus::Read;
  notification.updated_at = now;
  debug!(%user, notification = %id, "notification marked read");
  Ok(notification)
}

/// Mark every unread notification of `user` read. Idempotent.
pub fn mark_all_read<S>(store: &mut S, user: UserId, now: DateTime<Utc>) -> Result<usize>
where
  S: NotificationStore + ?Sized,
{
  let changed = store.advance_notifications(
    user,
    NotificationStatus::Unread,
    NotificationStatus::Read,
    now,
  )?;
  debug!(%user, changed, "notifications marked read");
  Ok(changed)
}

/// Retire every read notification of `user`. Unread ones are untouched.
pub fn clear_read<S>(store: &mut S, user: UserId, now: DateTime<Utc>) -> Result<usize>
where
  S: NotificationStore + ?Sized,
{
  let changed = store.advance_notifications(
    user,
    NotificationStatus::Read,
    NotificationStatus::Inactive,
    now,
  )?;
  debug!(%user, changed, "read notifications cleared");
  Ok(changed)
}
