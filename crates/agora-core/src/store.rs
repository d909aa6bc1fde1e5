//! Repository traits and the `SocialStore` facade.
//!
//! The per-entity repositories are synchronous: a backend implements them over
//! an open transaction, and the lifecycle functions in this crate are generic
//! over whichever repositories they touch. [`SocialStore`] is the async surface
//! the request layer sees; each of its write methods is one transaction.

use std::future::Future;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
  Result,
  decision::Decision,
  id::{GroupId, NotificationId, PostId, RelationshipId, UserId},
  membership::{Membership, NewMembership},
  notification::{
    ActionType, NewNotification, Notification, NotificationStatus, ParentRef,
  },
  post::{Comment, NewComment, Post, PostAccess},
  relationship::{NewRelationship, Relationship},
  user::{Group, NewGroup, User},
};

// ─── Repositories ────────────────────────────────────────────────────────────

/// Read-only view of the identity subsystem.
pub trait UserDirectory {
  fn user(&self, id: UserId) -> Result<Option<User>>;

  fn user_by_external_id(&self, external_id: Uuid) -> Result<Option<User>>;
}

pub trait GroupDirectory {
  fn group(&self, id: GroupId) -> Result<Option<Group>>;

  fn insert_group(
    &mut self,
    group: &NewGroup,
    at: DateTime<Utc>,
  ) -> Result<Group>;
}

pub trait RelationshipStore {
  fn relationship(&self, id: RelationshipId) -> Result<Option<Relationship>>;

  /// The single row for an ordered pair, whatever its status.
  fn relationship_between(
    &self,
    follower: UserId,
    followed: UserId,
  ) -> Result<Option<Relationship>>;

  /// Insert a row for a pair that has none. A duplicate pair must surface as
  /// [`Error::Conflict`](crate::Error::Conflict).
  fn insert_relationship(
    &mut self,
    relationship: &NewRelationship,
  ) -> Result<Relationship>;

  /// Persist `status`, `updated_at` and `updated_by` of an existing row.
  fn update_relationship(&mut self, relationship: &Relationship) -> Result<()>;

  /// Accepted rows where `user` is followed, newest first.
  fn followers(&self, user: UserId) -> Result<Vec<Relationship>>;

  /// Accepted rows where `user` is the follower, newest first.
  fn following(&self, user: UserId) -> Result<Vec<Relationship>>;
}

pub trait MembershipStore {
  fn membership(
    &self,
    group: GroupId,
    member: UserId,
  ) -> Result<Option<Membership>>;

  /// Insert a row for a (group, member) pair that has none. A duplicate pair
  /// must surface as [`Error::Conflict`](crate::Error::Conflict).
  fn insert_membership(
    &mut self,
    membership: &NewMembership,
  ) -> Result<Membership>;

  /// Persist the mutable columns (status, inviter, `inviter_is_creator`,
  /// `updated_at`) of an existing row.
  fn update_membership(&mut self, membership: &Membership) -> Result<()>;

  /// Accepted rows of a group, oldest first.
  fn members(&self, group: GroupId) -> Result<Vec<Membership>>;
}

pub trait NotificationStore {
  fn insert_notification(
    &mut self,
    notification: &NewNotification,
    at: DateTime<Utc>,
  ) -> Result<Notification>;

  fn notification(&self, id: NotificationId) -> Result<Option<Notification>>;

  /// The newest non-inactive notification of `action` about `parent` sent to
  /// `receiver`.
  fn originating_notification(
    &self,
    receiver: UserId,
    action: ActionType,
    parent: ParentRef,
  ) -> Result<Option<Notification>>;

  fn set_notification_status(
    &mut self,
    id: NotificationId,
    status: NotificationStatus,
    at: DateTime<Utc>,
  ) -> Result<()>;

  /// Move every notification of `receiver` in status `from` to `to`.
  /// Returns the number of rows changed.
  fn advance_notifications(
    &mut self,
    receiver: UserId,
    from: NotificationStatus,
    to: NotificationStatus,
    at: DateTime<Utc>,
  ) -> Result<usize>;

  /// Unread and read notifications of `receiver`, newest first.
  fn notifications_for(&self, receiver: UserId) -> Result<Vec<Notification>>;

  fn unread_count(&self, receiver: UserId) -> Result<usize>;
}

pub trait PostStore {
  fn post(&self, id: PostId) -> Result<Option<Post>>;

  fn is_allow_listed(&self, post: PostId, viewer: UserId) -> Result<bool>;

  /// Posts that may belong in `viewer`'s feed: their own, active public
  /// ones, and active gated ones they are allow-listed on. Unordered.
  fn feed_candidates(&self, viewer: UserId) -> Result<Vec<PostAccess>>;

  fn insert_comment(
    &mut self,
    comment: &NewComment,
    at: DateTime<Utc>,
  ) -> Result<Comment>;

  /// Every comment on `post` regardless of status, oldest first.
  fn comments(&self, post: PostId) -> Result<Vec<Comment>>;
}

// ─── Facade ──────────────────────────────────────────────────────────────────

/// Abstraction over an Agora backend.
///
/// Every write method is atomic: the status change and its notification side
/// effects commit together or not at all. Actor ids are assumed to be
/// authenticated by the caller.
///
/// All methods return `Send` futures so the trait can be used in multi-threaded
/// async runtimes.
pub trait SocialStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Directory ─────────────────────────────────────────────────────────

  fn user(
    &self,
    id: UserId,
  ) -> impl Future<Output = Result<Option<User>, Self::Error>> + Send + '_;

  fn user_by_external_id(
    &self,
    external_id: Uuid,
  ) -> impl Future<Output = Result<Option<User>, Self::Error>> + Send + '_;

  // ── Relationships ─────────────────────────────────────────────────────

  /// Follow `followed`, or ask to if their account is private.
  fn request_follow(
    &self,
    follower: UserId,
    followed: UserId,
  ) -> impl Future<Output = Result<Relationship, Self::Error>> + Send + '_;

  fn cancel_follow(
    &self,
    follower: UserId,
    followed: UserId,
  ) -> impl Future<Output = Result<Relationship, Self::Error>> + Send + '_;

  fn respond_to_follow_request(
    &self,
    relationship: RelationshipId,
    responder: UserId,
    decision: Decision,
  ) -> impl Future<Output = Result<Relationship, Self::Error>> + Send + '_;

  fn followers_of(
    &self,
    user: UserId,
  ) -> impl Future<Output = Result<Vec<Relationship>, Self::Error>> + Send + '_;

  fn following_of(
    &self,
    user: UserId,
  ) -> impl Future<Output = Result<Vec<Relationship>, Self::Error>> + Send + '_;

  // ── Groups ────────────────────────────────────────────────────────────

  /// Create a group and its creator's accepted membership.
  fn create_group(
    &self,
    creator: UserId,
    title: String,
    description: String,
  ) -> impl Future<Output = Result<(Group, Membership), Self::Error>> + Send + '_;

  fn invite(
    &self,
    group: GroupId,
    inviter: UserId,
    invitee: UserId,
  ) -> impl Future<Output = Result<Membership, Self::Error>> + Send + '_;

  fn request_join(
    &self,
    group: GroupId,
    requester: UserId,
  ) -> impl Future<Output = Result<Membership, Self::Error>> + Send + '_;

  /// Answer an invitation (as the invitee) or a join request (as the
  /// creator) for `target`'s membership of `group`.
  fn respond_to_membership(
    &self,
    group: GroupId,
    target: UserId,
    acting: UserId,
    decision: Decision,
  ) -> impl Future<Output = Result<Membership, Self::Error>> + Send + '_;

  fn cancel_membership(
    &self,
    group: GroupId,
    member: UserId,
  ) -> impl Future<Output = Result<Membership, Self::Error>> + Send + '_;

  fn members_of(
    &self,
    group: GroupId,
  ) -> impl Future<Output = Result<Vec<Membership>, Self::Error>> + Send + '_;

  // ── Notifications ─────────────────────────────────────────────────────

  fn notifications_for(
    &self,
    user: UserId,
  ) -> impl Future<Output = Result<Vec<Notification>, Self::Error>> + Send + '_;

  fn unread_count(
    &self,
    user: UserId,
  ) -> impl Future<Output = Result<usize, Self::Error>> + Send + '_;

  /// Mark one unread notification read. Anything else is `NotFound`.
  fn mark_read(
    &self,
    user: UserId,
    notification: NotificationId,
  ) -> impl Future<Output = Result<Notification, Self::Error>> + Send + '_;

  fn mark_all_read(
    &self,
    user: UserId,
  ) -> impl Future<Output = Result<usize, Self::Error>> + Send + '_;

  fn clear_read(
    &self,
    user: UserId,
  ) -> impl Future<Output = Result<usize, Self::Error>> + Send + '_;

  // ── Visibility ────────────────────────────────────────────────────────

  fn can_view(
    &self,
    viewer: UserId,
    post: PostId,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  fn feed_for(
    &self,
    viewer: UserId,
  ) -> impl Future<Output = Result<Vec<Post>, Self::Error>> + Send + '_;

  fn comment_on(
    &self,
    post: PostId,
    commenter: UserId,
    body: String,
  ) -> impl Future<Output = Result<Comment, Self::Error>> + Send + '_;

  fn comments_for(
    &self,
    viewer: UserId,
    post: PostId,
  ) -> impl Future<Output = Result<Vec<Comment>, Self::Error>> + Send + '_;
}
