//! Group memberships and their lifecycle.
//!
//! A member joins either by invitation from the group creator or by asking
//! to join and being accepted by the creator. Each (group, member) pair has a
//! single row; declined and cancelled rows are reused by a later invite or
//! request.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString, IntoStaticStr};
use tracing::{debug, info};

use crate::{
  Entity, Error, Result, ValidationError,
  decision::Decision,
  fanout::{self, Event},
  id::{GroupId, MembershipId, UserId},
  store::{GroupDirectory, MembershipStore, NotificationStore, UserDirectory},
  user::{Group, NewGroup, require_active_user, require_group, require_user},
};

#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display,
  EnumString, IntoStaticStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum MembershipStatus {
  Invited,
  Requested,
  Accepted,
  Declined,
  Cancelled,
}

impl MembershipStatus {
  /// Invited and requested rows are waiting on an answer.
  pub fn is_pending(self) -> bool { matches!(self, Self::Invited | Self::Requested) }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MembershipAction {
  /// The creator's own row, written together with the group.
  Found,
  Invite,
  Request,
  Accept,
  Decline,
  Cancel,
}

impl MembershipAction {
  /// The status a row moves to, or `None` for an undefined transition.
  pub fn apply(self, from: Option<MembershipStatus>) -> Option<MembershipStatus> {
    use MembershipStatus::*;

    match (from, self) {
      (None, Self::Found) => Some(Accepted),
      (None | Some(Declined | Cancelled), Self::Invite) => Some(Invited),
      (None | Some(Declined | Cancelled), Self::Request) => Some(Requested),
      (Some(Invited | Requested), Self::Accept) => Some(Accepted),
      (Some(Invited | Requested), Self::Decline) => Some(Declined),
      (Some(Invited | Requested | Accepted), Self::Cancel) => Some(Cancelled),
      (Some(_), Self::Found)
      | (Some(Invited | Requested | Accepted), Self::Invite | Self::Request)
      | (None, Self::Accept | Self::Decline | Self::Cancel)
      | (Some(Accepted | Declined | Cancelled), Self::Accept | Self::Decline)
      | (Some(Declined | Cancelled), Self::Cancel) => None,
    }
  }
}

impl From<Decision> for MembershipAction {
  fn from(decision: Decision) -> Self {
    match decision {
      Decision::Accept => Self::Accept,
      Decision::Decline => Self::Decline,
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Membership {
  pub membership_id:      MembershipId,
  pub group_id:           GroupId,
  pub member_id:          UserId,
  /// Set for invitations and for the creator's own row; `None` for join
  /// requests.
  pub inviter_id:         Option<UserId>,
  pub inviter_is_creator: bool,
  pub status:             MembershipStatus,
  pub created_at:         DateTime<Utc>,
  pub updated_at:         DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMembership {
  pub group_id:           GroupId,
  pub member_id:          UserId,
  pub inviter_id:         Option<UserId>,
  pub inviter_is_creator: bool,
  pub status:             MembershipStatus,
  pub at:                 DateTime<Utc>,
}

// ─── Operations ──────────────────────────────────────────────────────────────

/// Create a group and, in the same unit of work, its creator's accepted
/// membership.
pub fn create_group<S>(
  store: &mut S,
  creator: UserId,
  title: &str,
  description: &str,
  now: DateTime<Utc>,
) -> Result<(Group, Membership)>
where
  S: UserDirectory + GroupDirectory + MembershipStore + ?Sized,
{
  let title = title.trim();
  if title.is_empty() {
    return Err(ValidationError::Empty("group title").into());
  }
  require_active_user(&*store, creator)?;

  let group = store.insert_group(
    &NewGroup {
      creator_id:  creator,
      title:       title.to_owned(),
      description: description.trim().to_owned(),
    },
    now,
  )?;

  let status = MembershipAction::Found
    .apply(None)
    .ok_or_else(|| Error::InvalidState("cannot found a membership".into()))?;
  let membership = store.insert_membership(&NewMembership {
    group_id: group.group_id,
    member_id: creator,
    inviter_id: Some(creator),
    inviter_is_creator: true,
    status,
    at: now,
  })?;

  info!(group = %group.group_id, %creator, "group created");
  Ok((group, membership))
}

/// Invite `invitee` into `group`. Only the creator may invite.
pub fn invite<S>(
  store: &mut S,
  group: GroupId,
  inviter: UserId,
  invitee: UserId,
  now: DateTime<Utc>,
) -> Result<Membership>
where
  S: UserDirectory + GroupDirectory + MembershipStore + NotificationStore + ?Sized,
{
  let group = require_group(&*store, group)?;
  if inviter != group.creator_id {
    return Err(Error::Unauthorized(format!(
      "user {inviter} cannot invite members to group {}",
      group.group_id
    )));
  }
  let inviter = require_active_user(&*store, inviter)?;
  require_active_user(&*store, invitee)?;

  let membership = open_membership(
    store,
    &group,
    invitee,
    MembershipAction::Invite,
    Some(inviter.user_id),
    now,
  )?;

  debug!(membership = %membership.membership_id, %invitee, "member invited");

  fanout::dispatch(
    store,
    Event::GroupInvited { membership: &membership, group: &group, inviter: &inviter },
    now,
  )?;
  Ok(membership)
}

/// Ask to join `group`; the creator decides.
pub fn request_join<S>(
  store: &mut S,
  group: GroupId,
  requester: UserId,
  now: DateTime<Utc>,
) -> Result<Membership>
where
  S: UserDirectory + GroupDirectory + MembershipStore + NotificationStore + ?Sized,
{
  let group = require_group(&*store, group)?;
  let requester = require_active_user(&*store, requester)?;

  let membership = open_membership(
    store,
    &group,
    requester.user_id,
    MembershipAction::Request,
    None,
    now,
  )?;

  debug!(
    membership = %membership.membership_id,
    requester = %requester.user_id,
    "join requested"
  );

  fanout::dispatch(
    store,
    Event::JoinRequested { membership: &membership, group: &group, requester: &requester },
    now,
  )?;
  Ok(membership)
}

/// Answer a pending membership of `target` in `group`.
///
/// A join request is answered by the group creator; an invitation is
/// answered by the invitee themselves.
pub fn respond_to_membership<S>(
  store: &mut S,
  group: GroupId,
  target: UserId,
  acting: UserId,
  decision: Decision,
  now: DateTime<Utc>,
) -> Result<Membership>
where
  S: UserDirectory + GroupDirectory + MembershipStore + NotificationStore + ?Sized,
{
  let group = require_group(&*store, group)?;
  let mut row = store
    .membership(group.group_id, target)?
    .ok_or_else(|| {
      Error::not_found(Entity::Membership, format!("{}/{target}", group.group_id))
    })?;

  let previous = row.status;
  match previous {
    MembershipStatus::Requested if acting != group.creator_id => {
      return Err(Error::Forbidden(format!(
        "only the creator of group {} may answer join requests",
        group.group_id
      )));
    }
    MembershipStatus::Invited if acting != target => {
      return Err(Error::Forbidden(format!(
        "only user {target} may answer their invitation"
      )));
    }
    MembershipStatus::Requested | MembershipStatus::Invited => {}
    MembershipStatus::Accepted
    | MembershipStatus::Declined
    | MembershipStatus::Cancelled => {
      return Err(Error::Conflict(format!(
        "membership {} is already {previous}",
        row.membership_id
      )));
    }
  }

  let status = MembershipAction::from(decision)
    .apply(Some(previous))
    .ok_or_else(|| {
      Error::InvalidState(format!(
        "membership {} cannot be answered from {previous}",
        row.membership_id
      ))
    })?;
  let responder = require_active_user(&*store, acting)?;

  row.status = status;
  row.updated_at = now;
  store.update_membership(&row)?;

  debug!(membership = %row.membership_id, %previous, %decision, "membership answered");

  fanout::dispatch(
    store,
    Event::MembershipResponded {
      membership: &row,
      previous,
      group: &group,
      responder: &responder,
    },
    now,
  )?;
  Ok(row)
}

/// Withdraw a pending invitation or request, or leave the group.
pub fn cancel_membership<S>(
  store: &mut S,
  group: GroupId,
  member: UserId,
  now: DateTime<Utc>,
) -> Result<Membership>
where
  S: UserDirectory + GroupDirectory + MembershipStore + NotificationStore + ?Sized,
{
  let group = require_group(&*store, group)?;
  require_user(&*store, member)?;
  if member == group.creator_id {
    return Err(Error::Forbidden(format!(
      "the creator cannot leave group {}",
      group.group_id
    )));
  }

  let mut row = store
    .membership(group.group_id, member)?
    .ok_or_else(|| {
      Error::not_found(Entity::Membership, format!("{}/{member}", group.group_id))
    })?;

  let previous = row.status;
  row.status = MembershipAction::Cancel.apply(Some(previous)).ok_or_else(|| {
    Error::InvalidState(format!(
      "membership {} is already {previous}",
      row.membership_id
    ))
  })?;
  row.updated_at = now;
  store.update_membership(&row)?;

  debug!(membership = %row.membership_id, %previous, "membership cancelled");

  fanout::dispatch(
    store,
    Event::MembershipCancelled { membership: &row, previous, group: &group },
    now,
  )?;
  Ok(row)
}

pub fn members_of<S>(store: &S, group: GroupId) -> Result<Vec<Membership>>
where
  S: GroupDirectory + MembershipStore + ?Sized,
{
  let group = require_group(store, group)?;
  store.members(group.group_id)
}

/// Insert a row for a new pair or reopen a terminal one.
fn open_membership<S>(
  store: &mut S,
  group: &Group,
  member: UserId,
  action: MembershipAction,
  inviter: Option<UserId>,
  now: DateTime<Utc>,
) -> Result<Membership>
where
  S: MembershipStore + ?Sized,
{
  let existing = store.membership(group.group_id, member)?;
  let status = action
    .apply(existing.as_ref().map(|m| m.status))
    .ok_or_else(|| {
      Error::Conflict(format!(
        "user {member} already has a live membership in group {}",
        group.group_id
      ))
    })?;
  let inviter_is_creator = inviter == Some(group.creator_id);

  match existing {
    Some(mut row) => {
      row.status = status;
      row.inviter_id = inviter;
      row.inviter_is_creator = inviter_is_creator;
      row.updated_at = now;
      store.update_membership(&row)?;
      Ok(row)
    }
    None => store.insert_membership(&NewMembership {
      group_id: group.group_id,
      member_id: member,
      inviter_id: inviter,
      inviter_is_creator,
      status,
      at: now,
    }),
  }
}
