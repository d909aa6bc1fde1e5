//! Follow edges and their lifecycle.
//!
//! There is at most one row per ordered (follower, followed) pair. Terminal
//! rows (declined, cancelled) are kept and reused when the follower asks
//! again, so the pair never accumulates history rows.
//!
//! | from                  | action                   | to        |
//! |-----------------------|--------------------------|-----------|
//! | none                  | request (public target)  | accepted  |
//! | none                  | request (private target) | pending   |
//! | declined, cancelled   | request                  | as above  |
//! | pending               | accept                   | accepted  |
//! | pending               | decline                  | declined  |
//! | pending, accepted     | cancel                   | cancelled |

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString, IntoStaticStr};
use tracing::debug;

use crate::{
  Entity, Error, Result, ValidationError,
  decision::Decision,
  fanout::{self, Event},
  id::{RelationshipId, UserId},
  store::{NotificationStore, RelationshipStore, UserDirectory},
  user::{Privacy, require_active_user, require_user},
};

#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display,
  EnumString, IntoStaticStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum RelationshipStatus {
  Pending,
  Accepted,
  Declined,
  Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FollowAction {
  Request { target: Privacy },
  Accept,
  Decline,
  Cancel,
}

impl FollowAction {
  /// The status a row moves to, or `None` for an undefined transition.
  pub fn apply(
    self,
    from: Option<RelationshipStatus>,
  ) -> Option<RelationshipStatus> {
    use RelationshipStatus::*;

    match (from, self) {
      (None | Some(Declined | Cancelled), Self::Request { target }) => {
        Some(match target {
          Privacy::Public => Accepted,
          Privacy::Private => Pending,
        })
      }
      (Some(Pending), Self::Accept) => Some(Accepted),
      (Some(Pending), Self::Decline) => Some(Declined),
      (Some(Pending | Accepted), Self::Cancel) => Some(Cancelled),
      (Some(Pending | Accepted), Self::Request { .. })
      | (None, Self::Accept | Self::Decline | Self::Cancel)
      | (Some(Accepted | Declined | Cancelled), Self::Accept | Self::Decline)
      | (Some(Declined | Cancelled), Self::Cancel) => None,
    }
  }
}

impl From<Decision> for FollowAction {
  fn from(decision: Decision) -> Self {
    match decision {
      Decision::Accept => Self::Accept,
      Decision::Decline => Self::Decline,
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relationship {
  pub relationship_id: RelationshipId,
  pub follower_id:     UserId,
  pub followed_id:     UserId,
  pub status:          RelationshipStatus,
  pub created_at:      DateTime<Utc>,
  pub updated_at:      DateTime<Utc>,
  /// The user whose action produced the current status.
  pub updated_by:      UserId,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewRelationship {
  pub follower_id: UserId,
  pub followed_id: UserId,
  pub status:      RelationshipStatus,
  pub at:          DateTime<Utc>,
}

// ─── Operations ──────────────────────────────────────────────────────────────

/// Follow `followed`, or ask to when their account is private.
pub fn request_follow<S>(
  store: &mut S,
  follower: UserId,
  followed: UserId,
  now: DateTime<Utc>,
) -> Result<Relationship>
where
  S: UserDirectory + RelationshipStore + NotificationStore + ?Sized,
{
  if follower == followed {
    return Err(ValidationError::SelfReference(follower).into());
  }

  let actor = require_active_user(&*store, follower)?;
  let target = require_active_user(&*store, followed)?;
  let existing = store.relationship_between(follower, followed)?;

  let status = FollowAction::Request { target: target.privacy }
    .apply(existing.as_ref().map(|r| r.status))
    .ok_or_else(|| {
      Error::Conflict(format!(
        "user {follower} already has a live relationship with user {followed}"
      ))
    })?;

  let relationship = match existing {
    Some(mut row) => {
      row.status = status;
      row.updated_at = now;
      row.updated_by = follower;
      store.update_relationship(&row)?;
      row
    }
    None => store.insert_relationship(&NewRelationship {
      follower_id: follower,
      followed_id: followed,
      status,
      at: now,
    })?,
  };

  debug!(
    relationship = %relationship.relationship_id,
    %follower,
    %followed,
    %status,
    "follow requested"
  );

  fanout::dispatch(
    store,
    Event::FollowRequested { relationship: &relationship, follower: &actor },
    now,
  )?;
  Ok(relationship)
}

/// Withdraw a pending request or stop following.
pub fn cancel_follow<S>(
  store: &mut S,
  follower: UserId,
  followed: UserId,
  now: DateTime<Utc>,
) -> Result<Relationship>
where
  S: UserDirectory + RelationshipStore + NotificationStore + ?Sized,
{
  require_user(&*store, follower)?;
  let mut row = store
    .relationship_between(follower, followed)?
    .ok_or_else(|| {
      Error::not_found(Entity::Relationship, format!("{follower}->{followed}"))
    })?;

  let previous = row.status;
  let status = FollowAction::Cancel.apply(Some(previous)).ok_or_else(|| {
    Error::InvalidState(format!(
      "relationship {} is already {previous}",
      row.relationship_id
    ))
  })?;

  row.status = status;
  row.updated_at = now;
  row.updated_by = follower;
  store.update_relationship(&row)?;

  debug!(relationship = %row.relationship_id, %previous, "follow cancelled");

  fanout::dispatch(
    store,
    Event::FollowCancelled { relationship: &row, previous },
    now,
  )?;
  Ok(row)
}

/// Accept or decline a pending request. Only the followed user may answer.
pub fn respond_to_follow_request<S>(
  store: &mut S,
  id: RelationshipId,
  responder: UserId,
  decision: Decision,
  now: DateTime<Utc>,
) -> Result<Relationship>
where
  S: UserDirectory + RelationshipStore + NotificationStore + ?Sized,
{
  let mut row = store
    .relationship(id)?
    .ok_or_else(|| Error::not_found(Entity::Relationship, id))?;

  if row.followed_id != responder {
    return Err(Error::Unauthorized(format!(
      "user {responder} cannot answer follow request {id}"
    )));
  }

  let status = FollowAction::from(decision)
    .apply(Some(row.status))
    .ok_or_else(|| {
      Error::InvalidState(format!(
        "relationship {id} is {}, not pending",
        row.status
      ))
    })?;

  let responder = require_active_user(&*store, responder)?;

  row.status = status;
  row.updated_at = now;
  row.updated_by = responder.user_id;
  store.update_relationship(&row)?;

  debug!(relationship = %id, %decision, "follow request answered");

  fanout::dispatch(
    store,
    Event::FollowResponded { relationship: &row, responder: &responder },
    now,
  )?;
  Ok(row)
}

pub fn followers_of<S>(store: &S, user: UserId) -> Result<Vec<Relationship>>
where
  S: UserDirectory + RelationshipStore + ?Sized,
{
  require_user(store, user)?;
  store.followers(user)
}

pub fn following_of<S>(store: &S, user: UserId) -> Result<Vec<Relationship>>
where
  S: UserDirectory + RelationshipStore + ?Sized,
{
  require_user(store, user)?;
  store.following(user)
}
