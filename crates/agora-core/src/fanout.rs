//! Notification fanout for lifecycle transitions.
//!
//! [`plan`] is a pure mapping from an [`Event`] to the notification writes it
//! implies; [`dispatch`] applies those writes through a [`NotificationStore`].
//! State machines call `dispatch` inside the same unit of work as their status
//! write.
//!
//! | event                         | writes                                              |
//! |-------------------------------|-----------------------------------------------------|
//! | follow requested, pending     | `follow_request` → followed                         |
//! | follow requested, auto-accept | nothing                                             |
//! | follow accepted               | request → read; `follow_accepted` → follower         |
//! | follow declined               | request → read                                      |
//! | pending follow cancelled      | request → inactive                                  |
//! | group invitation              | `group_invitation` → invitee                        |
//! | join request                  | `group_join_request` → creator                      |
//! | invitation accepted           | invitation → read; `group_invitation_accepted` → inviter |
//! | join request accepted         | request → read; `group_join_accepted` → requester   |
//! | invitation/request declined   | originating notification → read                     |
//! | pending membership cancelled  | originating notification → inactive                 |
//! | comment on someone's post     | `post_comment` → poster                             |

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::{
  Result,
  id::UserId,
  membership::{Membership, MembershipStatus},
  notification::{
    ActionType, NewNotification, Notification, NotificationStatus, ParentRef,
    ParentType,
  },
  post::{Comment, Post},
  relationship::{Relationship, RelationshipStatus},
  store::NotificationStore,
  user::{Group, User},
};

/// A lifecycle transition that has just been written.
#[derive(Debug, Clone, Copy)]
pub enum Event<'a> {
  FollowRequested {
    relationship: &'a Relationship,
    follower:     &'a User,
  },
  FollowResponded {
    relationship: &'a Relationship,
    responder:    &'a User,
  },
  FollowCancelled {
    relationship: &'a Relationship,
    previous:     RelationshipStatus,
  },
  GroupInvited {
    membership: &'a Membership,
    group:      &'a Group,
    inviter:    &'a User,
  },
  JoinRequested {
    membership: &'a Membership,
    group:      &'a Group,
    requester:  &'a User,
  },
  MembershipResponded {
    membership: &'a Membership,
    previous:   MembershipStatus,
    group:      &'a Group,
    responder:  &'a User,
  },
  MembershipCancelled {
    membership: &'a Membership,
    previous:   MembershipStatus,
    group:      &'a Group,
  },
  PostCommented {
    post:      &'a Post,
    comment:   &'a Comment,
    commenter: &'a User,
  },
}

/// A single notification write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
  Create(NewNotification),
  /// Move the originating notification forward. A missing notification, or
  /// one already at or past `to`, is left alone.
  Advance {
    receiver: UserId,
    action:   ActionType,
    parent:   ParentRef,
    to:       NotificationStatus,
  },
}

fn relationship_ref(r: &Relationship) -> ParentRef {
  ParentRef::new(ParentType::Relationship, r.relationship_id.0)
}

fn membership_ref(m: &Membership) -> ParentRef {
  ParentRef::new(ParentType::Membership, m.membership_id.0)
}

/// The originating notification of a pending membership: the invitation sent
/// to the member, or the join request sent to the creator.
fn pending_membership_notice(
  membership: &Membership,
  previous: MembershipStatus,
  group: &Group,
) -> Option<(UserId, ActionType)> {
  match previous {
    MembershipStatus::Invited => {
      Some((membership.member_id, ActionType::GroupInvitation))
    }
    MembershipStatus::Requested => {
      Some((group.creator_id, ActionType::GroupJoinRequest))
    }
    MembershipStatus::Accepted
    | MembershipStatus::Declined
    | MembershipStatus::Cancelled => None,
  }
}

/// Map an event to the notification writes it implies.
pub fn plan(event: &Event<'_>) -> Vec<Effect> {
  match *event {
    Event::FollowRequested { relationship, follower } => {
      match relationship.status {
        RelationshipStatus::Pending => vec![Effect::Create(NewNotification {
          receiver_id: relationship.followed_id,
          actor_id:    follower.user_id,
          action:      ActionType::FollowRequest,
          parent:      relationship_ref(relationship),
          content:     format!("{} wants to follow you", follower.display_name),
        })],
        RelationshipStatus::Accepted
        | RelationshipStatus::Declined
        | RelationshipStatus::Cancelled => Vec::new(),
      }
    }

    Event::FollowResponded { relationship, responder } => {
      let mut effects = vec![Effect::Advance {
        receiver: relationship.followed_id,
        action:   ActionType::FollowRequest,
        parent:   relationship_ref(relationship),
        to:       NotificationStatus::Read,
      }];
      if relationship.status == RelationshipStatus::Accepted {
        effects.push(Effect::Create(NewNotification {
          receiver_id: relationship.follower_id,
          actor_id:    responder.user_id,
          action:      ActionType::FollowAccepted,
          parent:      relationship_ref(relationship),
          content:     format!(
            "{} accepted your follow request",
            responder.display_name
          ),
        }));
      }
      effects
    }

    Event::FollowCancelled { relationship, previous } => {
      if previous == RelationshipStatus::Pending {
        vec![Effect::Advance {
          receiver: relationship.followed_id,
          action:   ActionType::FollowRequest,
          parent:   relationship_ref(relationship),
          to:       NotificationStatus::Inactive,
        }]
      } else {
        Vec::new()
      }
    }

    Event::GroupInvited { membership, group, inviter } => {
      vec![Effect::Create(NewNotification {
        receiver_id: membership.member_id,
        actor_id:    inviter.user_id,
        action:      ActionType::GroupInvitation,
        parent:      membership_ref(membership),
        content:     format!(
          "{} invited you to join {}",
          inviter.display_name, group.title
        ),
      })]
    }

    Event::JoinRequested { membership, group, requester } => {
      vec![Effect::Create(NewNotification {
        receiver_id: group.creator_id,
        actor_id:    requester.user_id,
        action:      ActionType::GroupJoinRequest,
        parent:      membership_ref(membership),
        content:     format!(
          "{} asked to join {}",
          requester.display_name, group.title
        ),
      })]
    }

    Event::MembershipResponded { membership, previous, group, responder } => {
      let mut effects = Vec::new();
      if let Some((receiver, action)) =
        pending_membership_notice(membership, previous, group)
      {
        effects.push(Effect::Advance {
          receiver,
          action,
          parent: membership_ref(membership),
          to: NotificationStatus::Read,
        });
      }

      if membership.status == MembershipStatus::Accepted {
        let confirmation = match previous {
          MembershipStatus::Requested => Some((
            membership.member_id,
            ActionType::GroupJoinAccepted,
            format!(
              "{} accepted your request to join {}",
              responder.display_name, group.title
            ),
          )),
          MembershipStatus::Invited => membership.inviter_id.map(|inviter| {
            (
              inviter,
              ActionType::GroupInvitationAccepted,
              format!(
                "{} accepted your invitation to join {}",
                responder.display_name, group.title
              ),
            )
          }),
          MembershipStatus::Accepted
          | MembershipStatus::Declined
          | MembershipStatus::Cancelled => None,
        };

        if let Some((receiver_id, action, content)) = confirmation {
          effects.push(Effect::Create(NewNotification {
            receiver_id,
            actor_id: responder.user_id,
            action,
            parent: membership_ref(membership),
            content,
          }));
        }
      }
      effects
    }

    Event::MembershipCancelled { membership, previous, group } => {
      pending_membership_notice(membership, previous, group)
        .map(|(receiver, action)| Effect::Advance {
          receiver,
          action,
          parent: membership_ref(membership),
          to: NotificationStatus::Inactive,
        })
        .into_iter()
        .collect()
    }

    Event::PostCommented { post, comment, commenter } => {
      if comment.commenter_id == post.poster_id {
        Vec::new()
      } else {
        vec![Effect::Create(NewNotification {
          receiver_id: post.poster_id,
          actor_id:    commenter.user_id,
          action:      ActionType::PostComment,
          parent:      ParentRef::new(ParentType::Post, post.post_id.0),
          content:     format!("{} commented on your post", commenter.display_name),
        })]
      }
    }
  }
}

/// Apply the writes planned for `event`. Returns the notifications created.
pub fn dispatch<S>(
  store: &mut S,
  event: Event<'_>,
  now: DateTime<Utc>,
) -> Result<Vec<Notification>>
where
  S: NotificationStore + ?Sized,
{
  let mut created = Vec::new();

  for effect in plan(&event) {
    match effect {
      Effect::Create(notification) => {
        let notification = store.insert_notification(&notification, now)?;
        debug!(
          notification = %notification.notification_id,
          receiver = %notification.receiver_id,
          action = %notification.action,
          "notification created"
        );
        created.push(notification);
      }
      Effect::Advance { receiver, action, parent, to } => {
        let Some(origin) =
          store.originating_notification(receiver, action, parent)?
        else {
          continue;
        };
        if origin.status.can_advance_to(to) {
          store.set_notification_status(origin.notification_id, to, now)?;
          debug!(
            notification = %origin.notification_id,
            from = %origin.status,
            %to,
            "notification advanced"
          );
        }
      }
    }
  }

  Ok(created)
}
