//! Lifecycle scenarios run against the in-memory repositories.

use chrono::{DateTime, Duration, TimeZone, Utc};

use crate::{
  Entity, Error, ValidationError,
  decision::Decision,
  id::{NotificationId, RelationshipId, UserId},
  membership::{self, MembershipStatus},
  memory::MemoryStore,
  notification::{self, ActionType, NotificationStatus},
  post::{NewPost, PostPrivacy},
  relationship::{self, RelationshipStatus},
  store::NotificationStore,
  user::{NewUser, Privacy, User, UserStatus},
  visibility,
};

fn now() -> DateTime<Utc> { Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap() }

fn user(store: &mut MemoryStore, name: &str, privacy: Privacy) -> User {
  store.add_user(NewUser::new(name, privacy), now())
}

fn deactivate(store: &mut MemoryStore, id: UserId) {
  for user in store.users.iter_mut().filter(|u| u.user_id == id) {
    user.status = UserStatus::Inactive;
  }
}

fn unread(store: &MemoryStore, user: UserId, action: ActionType) -> usize {
  store
    .notifications
    .iter()
    .filter(|n| {
      n.receiver_id == user && n.action == action && n.status == NotificationStatus::Unread
    })
    .count()
}

// ─── Follows ─────────────────────────────────────────────────────────────────

#[test]
fn private_target_yields_pending_and_rejects_repeat() {
  let mut s = MemoryStore::default();
  let alice = user(&mut s, "alice", Privacy::Public);
  let bob = user(&mut s, "bob", Privacy::Private);

  let rel = relationship::request_follow(&mut s, alice.user_id, bob.user_id, now()).unwrap();
  assert_eq!(rel.status, RelationshipStatus::Pending);
  assert_eq!(unread(&s, bob.user_id, ActionType::FollowRequest), 1);

  let err = relationship::request_follow(&mut s, alice.user_id, bob.user_id, now()).unwrap_err();
  assert!(err.is_conflict());
  assert_eq!(s.relationships.len(), 1);
}

#[test]
fn public_target_is_auto_accepted_without_notification() {
  let mut s = MemoryStore::default();
  let alice = user(&mut s, "alice", Privacy::Private);
  let bob = user(&mut s, "bob", Privacy::Public);

  let rel = relationship::request_follow(&mut s, alice.user_id, bob.user_id, now()).unwrap();
  assert_eq!(rel.status, RelationshipStatus::Accepted);
  assert!(s.notifications.is_empty());
}

#[test]
fn self_follow_is_rejected() {
  let mut s = MemoryStore::default();
  let alice = user(&mut s, "alice", Privacy::Public);

  let err = relationship::request_follow(&mut s, alice.user_id, alice.user_id, now()).unwrap_err();
  assert!(matches!(
    err,
    Error::Validation(ValidationError::SelfReference(id)) if id == alice.user_id
  ));
}

#[test]
fn inactive_target_is_not_found() {
  let mut s = MemoryStore::default();
  let alice = user(&mut s, "alice", Privacy::Public);
  let mut gone = NewUser::new("gone", Privacy::Public);
  gone.status = UserStatus::Inactive;
  let gone = s.add_user(gone, now());

  let err = relationship::request_follow(&mut s, alice.user_id, gone.user_id, now()).unwrap_err();
  assert!(err.is_not_found());
}

#[test]
fn only_the_followed_user_may_answer() {
  let mut s = MemoryStore::default();
  let alice = user(&mut s, "alice", Privacy::Public);
  let bob = user(&mut s, "bob", Privacy::Private);
  let rel = relationship::request_follow(&mut s, alice.user_id, bob.user_id, now()).unwrap();

  let err = relationship::respond_to_follow_request(
    &mut s,
    rel.relationship_id,
    alice.user_id,
    Decision::Accept,
    now(),
  )
  .unwrap_err();
  assert!(matches!(err, Error::Unauthorized(_)));
}

#[test]
fn accept_reads_the_request_and_notifies_the_follower() {
  let mut s = MemoryStore::default();
  let alice = user(&mut s, "alice", Privacy::Public);
  let bob = user(&mut s, "bob", Privacy::Private);
  let rel = relationship::request_follow(&mut s, alice.user_id, bob.user_id, now()).unwrap();

  let rel = relationship::respond_to_follow_request(
    &mut s,
    rel.relationship_id,
    bob.user_id,
    Decision::Accept,
    now(),
  )
  .unwrap();

  assert_eq!(rel.status, RelationshipStatus::Accepted);
  assert_eq!(rel.updated_by, bob.user_id);
  assert_eq!(unread(&s, bob.user_id, ActionType::FollowRequest), 0);
  assert_eq!(unread(&s, alice.user_id, ActionType::FollowAccepted), 1);

  let accepted = &s.notifications[1];
  assert_eq!(accepted.actor_id, bob.user_id);
  assert_eq!(accepted.content, "bob accepted your follow request");
  assert_eq!(
    relationship::followers_of(&s, bob.user_id).unwrap(),
    vec![rel]
  );
}

#[test]
fn decline_reads_the_request_and_sends_nothing() {
  let mut s = MemoryStore::default();
  let alice = user(&mut s, "alice", Privacy::Public);
  let bob = user(&mut s, "bob", Privacy::Private);
  let rel = relationship::request_follow(&mut s, alice.user_id, bob.user_id, now()).unwrap();

  let rel = relationship::respond_to_follow_request(
    &mut s,
    rel.relationship_id,
    bob.user_id,
    Decision::Decline,
    now(),
  )
  .unwrap();

  assert_eq!(rel.status, RelationshipStatus::Declined);
  assert_eq!(s.notifications.len(), 1);
  assert_eq!(s.notifications[0].status, NotificationStatus::Read);

  let err = relationship::respond_to_follow_request(
    &mut s,
    rel.relationship_id,
    bob.user_id,
    Decision::Accept,
    now(),
  )
  .unwrap_err();
  assert!(matches!(err, Error::InvalidState(_)));
}

#[test]
fn answering_a_missing_request_is_not_found() {
  let mut s = MemoryStore::default();
  let bob = user(&mut s, "bob", Privacy::Private);

  let err = relationship::respond_to_follow_request(
    &mut s,
    RelationshipId(42),
    bob.user_id,
    Decision::Accept,
    now(),
  )
  .unwrap_err();
  assert!(err.is_not_found());
}

#[test]
fn cancel_then_request_reuses_the_row() {
  let mut s = MemoryStore::default();
  let alice = user(&mut s, "alice", Privacy::Public);
  let bob = user(&mut s, "bob", Privacy::Private);

  let first = relationship::request_follow(&mut s, alice.user_id, bob.user_id, now()).unwrap();
  let cancelled = relationship::cancel_follow(&mut s, alice.user_id, bob.user_id, now()).unwrap();
  assert_eq!(cancelled.status, RelationshipStatus::Cancelled);
  // The withdrawn request no longer shows up for bob.
  assert!(s.notifications_for(bob.user_id).unwrap().is_empty());

  let again = relationship::request_follow(&mut s, alice.user_id, bob.user_id, now()).unwrap();
  assert_eq!(again.relationship_id, first.relationship_id);
  assert_eq!(again.status, RelationshipStatus::Pending);
  assert_eq!(s.relationships.len(), 1);
  assert_eq!(unread(&s, bob.user_id, ActionType::FollowRequest), 1);
}

#[test]
fn cancel_without_a_row_is_not_found() {
  let mut s = MemoryStore::default();
  let alice = user(&mut s, "alice", Privacy::Public);
  let bob = user(&mut s, "bob", Privacy::Public);

  let err = relationship::cancel_follow(&mut s, alice.user_id, bob.user_id, now()).unwrap_err();
  assert!(err.is_not_found());
}

#[test]
fn cancelling_twice_is_an_invalid_transition() {
  let mut s = MemoryStore::default();
  let alice = user(&mut s, "alice", Privacy::Public);
  let bob = user(&mut s, "bob", Privacy::Public);
  relationship::request_follow(&mut s, alice.user_id, bob.user_id, now()).unwrap();
  relationship::cancel_follow(&mut s, alice.user_id, bob.user_id, now()).unwrap();

  let err = relationship::cancel_follow(&mut s, alice.user_id, bob.user_id, now()).unwrap_err();
  assert!(matches!(err, Error::InvalidState(_)));
}

#[test]
fn inactive_responder_cannot_answer() {
  let mut s = MemoryStore::default();
  let alice = user(&mut s, "alice", Privacy::Public);
  let bob = user(&mut s, "bob", Privacy::Private);
  let rel = relationship::request_follow(&mut s, alice.user_id, bob.user_id, now()).unwrap();
  deactivate(&mut s, bob.user_id);

  let err = relationship::respond_to_follow_request(
    &mut s,
    rel.relationship_id,
    bob.user_id,
    Decision::Accept,
    now(),
  )
  .unwrap_err();
  assert!(matches!(err, Error::NotFound { entity: Entity::User, .. }));
  assert_eq!(s.relationships[0].status, RelationshipStatus::Pending);
}

#[test]
fn cancel_by_unknown_follower_names_the_user() {
  let mut s = MemoryStore::default();
  let bob = user(&mut s, "bob", Privacy::Public);

  let err = relationship::cancel_follow(&mut s, UserId(42), bob.user_id, now()).unwrap_err();
  assert!(matches!(err, Error::NotFound { entity: Entity::User, .. }));
}

// ─── Groups ──────────────────────────────────────────────────────────────────

#[test]
fn join_request_scenario() {
  let mut s = MemoryStore::default();
  let carol = user(&mut s, "carol", Privacy::Public);
  let uma = user(&mut s, "uma", Privacy::Public);

  let (group, founder) =
    membership::create_group(&mut s, carol.user_id, "Rustaceans", "crabs", now()).unwrap();
  assert_eq!(founder.status, MembershipStatus::Accepted);
  assert_eq!(founder.inviter_id, Some(carol.user_id));
  assert!(founder.inviter_is_creator);

  let requested = membership::request_join(&mut s, group.group_id, uma.user_id, now()).unwrap();
  assert_eq!(requested.status, MembershipStatus::Requested);
  assert_eq!(requested.inviter_id, None);
  assert_eq!(unread(&s, carol.user_id, ActionType::GroupJoinRequest), 1);

  let accepted = membership::respond_to_membership(
    &mut s,
    group.group_id,
    uma.user_id,
    carol.user_id,
    Decision::Accept,
    now(),
  )
  .unwrap();
  assert_eq!(accepted.status, MembershipStatus::Accepted);
  assert_eq!(unread(&s, carol.user_id, ActionType::GroupJoinRequest), 0);
  assert_eq!(unread(&s, uma.user_id, ActionType::GroupJoinAccepted), 1);

  let members = membership::members_of(&s, group.group_id).unwrap();
  assert_eq!(members.len(), 2);
}

#[test]
fn join_requests_are_answered_by_the_creator_only() {
  let mut s = MemoryStore::default();
  let carol = user(&mut s, "carol", Privacy::Public);
  let uma = user(&mut s, "uma", Privacy::Public);
  let (group, _) = membership::create_group(&mut s, carol.user_id, "g", "", now()).unwrap();
  membership::request_join(&mut s, group.group_id, uma.user_id, now()).unwrap();

  let err = membership::respond_to_membership(
    &mut s,
    group.group_id,
    uma.user_id,
    uma.user_id,
    Decision::Accept,
    now(),
  )
  .unwrap_err();
  assert!(matches!(err, Error::Forbidden(_)));
}

#[test]
fn invitations_are_answered_by_the_invitee_only() {
  let mut s = MemoryStore::default();
  let carol = user(&mut s, "carol", Privacy::Public);
  let ivan = user(&mut s, "ivan", Privacy::Public);
  let (group, _) = membership::create_group(&mut s, carol.user_id, "g", "", now()).unwrap();

  let invited =
    membership::invite(&mut s, group.group_id, carol.user_id, ivan.user_id, now()).unwrap();
  assert_eq!(invited.status, MembershipStatus::Invited);
  assert!(invited.inviter_is_creator);
  assert_eq!(unread(&s, ivan.user_id, ActionType::GroupInvitation), 1);

  let err = membership::respond_to_membership(
    &mut s,
    group.group_id,
    ivan.user_id,
    carol.user_id,
    Decision::Accept,
    now(),
  )
  .unwrap_err();
  assert!(matches!(err, Error::Forbidden(_)));

  membership::respond_to_membership(
    &mut s,
    group.group_id,
    ivan.user_id,
    ivan.user_id,
    Decision::Accept,
    now(),
  )
  .unwrap();
  assert_eq!(unread(&s, ivan.user_id, ActionType::GroupInvitation), 0);
  assert_eq!(unread(&s, carol.user_id, ActionType::GroupInvitationAccepted), 1);
}

#[test]
fn inactive_invitee_cannot_answer() {
  let mut s = MemoryStore::default();
  let carol = user(&mut s, "carol", Privacy::Public);
  let ivan = user(&mut s, "ivan", Privacy::Public);
  let (group, _) = membership::create_group(&mut s, carol.user_id, "g", "", now()).unwrap();
  membership::invite(&mut s, group.group_id, carol.user_id, ivan.user_id, now()).unwrap();
  deactivate(&mut s, ivan.user_id);

  let err = membership::respond_to_membership(
    &mut s,
    group.group_id,
    ivan.user_id,
    ivan.user_id,
    Decision::Accept,
    now(),
  )
  .unwrap_err();
  assert!(matches!(err, Error::NotFound { entity: Entity::User, .. }));
  assert_eq!(unread(&s, ivan.user_id, ActionType::GroupInvitation), 1);
}

#[test]
fn cancel_by_unknown_member_names_the_user() {
  let mut s = MemoryStore::default();
  let carol = user(&mut s, "carol", Privacy::Public);
  let (group, _) = membership::create_group(&mut s, carol.user_id, "g", "", now()).unwrap();

  let err = membership::cancel_membership(&mut s, group.group_id, UserId(42), now()).unwrap_err();
  assert!(matches!(err, Error::NotFound { entity: Entity::User, .. }));
}

#[test]
fn only_the_creator_may_invite() {
  let mut s = MemoryStore::default();
  let carol = user(&mut s, "carol", Privacy::Public);
  let mallory = user(&mut s, "mallory", Privacy::Public);
  let ivan = user(&mut s, "ivan", Privacy::Public);
  let (group, _) = membership::create_group(&mut s, carol.user_id, "g", "", now()).unwrap();

  let err = membership::invite(&mut s, group.group_id, mallory.user_id, ivan.user_id, now())
    .unwrap_err();
  assert!(matches!(err, Error::Unauthorized(_)));
}

#[test]
fn answering_twice_conflicts_and_decline_is_silent() {
  let mut s = MemoryStore::default();
  let carol = user(&mut s, "carol", Privacy::Public);
  let uma = user(&mut s, "uma", Privacy::Public);
  let (group, _) = membership::create_group(&mut s, carol.user_id, "g", "", now()).unwrap();
  membership::request_join(&mut s, group.group_id, uma.user_id, now()).unwrap();

  let declined = membership::respond_to_membership(
    &mut s,
    group.group_id,
    uma.user_id,
    carol.user_id,
    Decision::Decline,
    now(),
  )
  .unwrap();
  assert_eq!(declined.status, MembershipStatus::Declined);
  assert_eq!(s.notifications.len(), 1);

  let err = membership::respond_to_membership(
    &mut s,
    group.group_id,
    uma.user_id,
    carol.user_id,
    Decision::Accept,
    now(),
  )
  .unwrap_err();
  assert!(err.is_conflict());

  // A declined row is reopened by a fresh request.
  let again = membership::request_join(&mut s, group.group_id, uma.user_id, now()).unwrap();
  assert_eq!(again.membership_id, declined.membership_id);
  assert_eq!(again.status, MembershipStatus::Requested);
}

#[test]
fn live_memberships_conflict() {
  let mut s = MemoryStore::default();
  let carol = user(&mut s, "carol", Privacy::Public);
  let uma = user(&mut s, "uma", Privacy::Public);
  let (group, _) = membership::create_group(&mut s, carol.user_id, "g", "", now()).unwrap();
  membership::request_join(&mut s, group.group_id, uma.user_id, now()).unwrap();

  let err = membership::invite(&mut s, group.group_id, carol.user_id, uma.user_id, now())
    .unwrap_err();
  assert!(err.is_conflict());

  let err = membership::request_join(&mut s, group.group_id, carol.user_id, now()).unwrap_err();
  assert!(err.is_conflict());
}

#[test]
fn cancelling_a_request_retires_its_notification() {
  let mut s = MemoryStore::default();
  let carol = user(&mut s, "carol", Privacy::Public);
  let uma = user(&mut s, "uma", Privacy::Public);
  let (group, _) = membership::create_group(&mut s, carol.user_id, "g", "", now()).unwrap();
  membership::request_join(&mut s, group.group_id, uma.user_id, now()).unwrap();

  let cancelled =
    membership::cancel_membership(&mut s, group.group_id, uma.user_id, now()).unwrap();
  assert_eq!(cancelled.status, MembershipStatus::Cancelled);
  assert_eq!(s.notifications[0].status, NotificationStatus::Inactive);

  let err =
    membership::cancel_membership(&mut s, group.group_id, carol.user_id, now()).unwrap_err();
  assert!(matches!(err, Error::Forbidden(_)));
}

#[test]
fn empty_group_title_is_rejected() {
  let mut s = MemoryStore::default();
  let carol = user(&mut s, "carol", Privacy::Public);

  let err = membership::create_group(&mut s, carol.user_id, "   ", "", now()).unwrap_err();
  assert!(matches!(err, Error::Validation(ValidationError::Empty(_))));
  assert!(s.groups.is_empty());
}

// ─── Notifications ───────────────────────────────────────────────────────────

#[test]
fn mark_read_twice_is_not_found_the_second_time() {
  let mut s = MemoryStore::default();
  let alice = user(&mut s, "alice", Privacy::Public);
  let bob = user(&mut s, "bob", Privacy::Private);
  relationship::request_follow(&mut s, alice.user_id, bob.user_id, now()).unwrap();
  let id = s.notifications[0].notification_id;

  let read = notification::mark_read(&mut s, bob.user_id, id, now()).unwrap();
  assert_eq!(read.status, NotificationStatus::Read);

  let err = notification::mark_read(&mut s, bob.user_id, id, now()).unwrap_err();
  assert!(err.is_not_found());
}

#[test]
fn mark_read_requires_ownership() {
  let mut s = MemoryStore::default();
  let alice = user(&mut s, "alice", Privacy::Public);
  let bob = user(&mut s, "bob", Privacy::Private);
  relationship::request_follow(&mut s, alice.user_id, bob.user_id, now()).unwrap();

  let err = notification::mark_read(&mut s, alice.user_id, NotificationId(1), now()).unwrap_err();
  assert!(err.is_not_found());
}

#[test]
fn clear_read_leaves_unread_alone() {
  let mut s = MemoryStore::default();
  let bob = user(&mut s, "bob", Privacy::Private);
  let alice = user(&mut s, "alice", Privacy::Public);
  let dave = user(&mut s, "dave", Privacy::Public);
  relationship::request_follow(&mut s, alice.user_id, bob.user_id, now()).unwrap();
  relationship::request_follow(&mut s, dave.user_id, bob.user_id, now()).unwrap();

  notification::mark_read(&mut s, bob.user_id, NotificationId(1), now()).unwrap();
  assert_eq!(notification::clear_read(&mut s, bob.user_id, now()).unwrap(), 1);
  assert_eq!(notification::clear_read(&mut s, bob.user_id, now()).unwrap(), 0);

  let remaining = notification::notifications_for(&s, bob.user_id).unwrap();
  assert_eq!(remaining.len(), 1);
  assert_eq!(remaining[0].status, NotificationStatus::Unread);

  assert_eq!(notification::mark_all_read(&mut s, bob.user_id, now()).unwrap(), 1);
  assert_eq!(notification::mark_all_read(&mut s, bob.user_id, now()).unwrap(), 0);
  assert_eq!(s.unread_count(bob.user_id).unwrap(), 0);
}

// ─── Visibility ──────────────────────────────────────────────────────────────

#[test]
fn feed_unions_own_public_and_allow_listed_posts() {
  let mut s = MemoryStore::default();
  let viewer = user(&mut s, "viewer", Privacy::Public);
  let other = user(&mut s, "other", Privacy::Public);
  let t0 = now();

  let own = s.add_post(NewPost::new(viewer.user_id, PostPrivacy::Private, "mine"), t0);
  let public = s.add_post(
    NewPost::new(other.user_id, PostPrivacy::Public, "hello"),
    t0 + Duration::minutes(2),
  );
  let mut gated = NewPost::new(other.user_id, PostPrivacy::SemiPrivate, "psst");
  gated.viewers = vec![viewer.user_id];
  let gated = s.add_post(gated, t0 + Duration::minutes(1));
  s.add_post(
    NewPost::new(other.user_id, PostPrivacy::Private, "secret"),
    t0 + Duration::minutes(3),
  );
  // Same timestamp as `public`: ties go to the lower id.
  let tie = s.add_post(
    NewPost::new(other.user_id, PostPrivacy::Public, "tie"),
    t0 + Duration::minutes(2),
  );

  let feed = visibility::feed_for(&s, viewer.user_id).unwrap();
  let ids: Vec<_> = feed.iter().map(|p| p.post_id).collect();
  assert_eq!(ids, [public.post_id, tie.post_id, gated.post_id, own.post_id]);
}

#[test]
fn comments_follow_post_visibility() {
  let mut s = MemoryStore::default();
  let poster = user(&mut s, "poster", Privacy::Public);
  let friend = user(&mut s, "friend", Privacy::Public);
  let stranger = user(&mut s, "stranger", Privacy::Public);

  let mut new = NewPost::new(poster.user_id, PostPrivacy::Private, "for friends");
  new.viewers = vec![friend.user_id];
  let post = s.add_post(new, now());

  let comment = visibility::comment_on(&mut s, post.post_id, friend.user_id, "nice", now()).unwrap();
  assert_eq!(unread(&s, poster.user_id, ActionType::PostComment), 1);

  let err = visibility::comment_on(&mut s, post.post_id, stranger.user_id, "hi", now()).unwrap_err();
  assert!(err.is_not_found());

  assert_eq!(
    visibility::comments_for(&s, poster.user_id, post.post_id).unwrap(),
    vec![comment]
  );
  assert!(visibility::comments_for(&s, stranger.user_id, post.post_id).is_err());

  // Commenting on one's own post does not notify.
  visibility::comment_on(&mut s, post.post_id, poster.user_id, "thanks", now()).unwrap();
  assert_eq!(s.notifications.len(), 1);
}
