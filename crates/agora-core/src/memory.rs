//! In-memory repositories used to exercise the state machines without a
//! database.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
  Error, Result,
  id::{
    CommentId, GroupId, MembershipId, NotificationId, PostId, RelationshipId,
    UserId,
  },
  membership::{Membership, MembershipStatus, NewMembership},
  notification::{
    ActionType, NewNotification, Notification, NotificationStatus, ParentRef,
  },
  post::{Comment, ContentStatus, NewComment, NewPost, Post, PostAccess},
  relationship::{NewRelationship, Relationship, RelationshipStatus},
  store::{
    GroupDirectory, MembershipStore, NotificationStore, PostStore,
    RelationshipStore, UserDirectory,
  },
  user::{Group, NewGroup, NewUser, User},
};

#[derive(Debug, Default)]
pub struct MemoryStore {
  pub users:         Vec<User>,
  pub groups:        Vec<Group>,
  pub relationships: Vec<Relationship>,
  pub memberships:   Vec<Membership>,
  pub notifications: Vec<Notification>,
  pub posts:         Vec<Post>,
  pub viewers:       Vec<(PostId, UserId)>,
  pub comments:      Vec<Comment>,
}

fn next_id(len: usize) -> i64 { len as i64 + 1 }

impl MemoryStore {
  pub fn add_user(&mut self, user: NewUser, at: DateTime<Utc>) -> User {
    let user = User {
      user_id:      UserId(next_id(self.users.len())),
      external_id:  user.external_id,
      display_name: user.display_name,
      privacy:      user.privacy,
      status:       user.status,
      created_at:   at,
    };
    self.users.push(user.clone());
    user
  }

  pub fn add_post(&mut self, post: NewPost, at: DateTime<Utc>) -> Post {
    let row = Post {
      post_id:    PostId(next_id(self.posts.len())),
      poster_id:  post.poster_id,
      group_id:   post.group_id,
      privacy:    post.privacy,
      status:     ContentStatus::Active,
      body:       post.body,
      created_at: at,
    };
    self
      .viewers
      .extend(post.viewers.into_iter().map(|v| (row.post_id, v)));
    self.posts.push(row.clone());
    row
  }
}

impl UserDirectory for MemoryStore {
  fn user(&self, id: UserId) -> Result<Option<User>> {
    Ok(self.users.iter().find(|u| u.user_id == id).cloned())
  }

  fn user_by_external_id(&self, external_id: Uuid) -> Result<Option<User>> {
    Ok(self.users.iter().find(|u| u.external_id == external_id).cloned())
  }
}

impl GroupDirectory for MemoryStore {
  fn group(&self, id: GroupId) -> Result<Option<Group>> {
    Ok(self.groups.iter().find(|g| g.group_id == id).cloned())
  }

  fn insert_group(&mut self, group: &NewGroup, at: DateTime<Utc>) -> Result<Group> {
    let group = Group {
      group_id:    GroupId(next_id(self.groups.len())),
      creator_id:  group.creator_id,
      title:       group.title.clone(),
      description: group.description.clone(),
      created_at:  at,
    };
    self.groups.push(group.clone());
    Ok(group)
  }
}

impl RelationshipStore for MemoryStore {
  fn relationship(&self, id: RelationshipId) -> Result<Option<Relationship>> {
    Ok(self.relationships.iter().find(|r| r.relationship_id == id).cloned())
  }

  fn relationship_between(
    &self,
    follower: UserId,
    followed: UserId,
  ) -> Result<Option<Relationship>> {
    Ok(
      self
        .relationships
        .iter()
        .find(|r| r.follower_id == follower && r.followed_id == followed)
        .cloned(),
    )
  }

  fn insert_relationship(&mut self, new: &NewRelationship) -> Result<Relationship> {
    if self.relationship_between(new.follower_id, new.followed_id)?.is_some() {
      return Err(Error::Conflict("duplicate relationship".into()));
    }
    let row = Relationship {
      relationship_id: RelationshipId(next_id(self.relationships.len())),
      follower_id:     new.follower_id,
      followed_id:     new.followed_id,
      status:          new.status,
      created_at:      new.at,
      updated_at:      new.at,
      updated_by:      new.follower_id,
    };
    self.relationships.push(row.clone());
    Ok(row)
  }

  fn update_relationship(&mut self, relationship: &Relationship) -> Result<()> {
    let row = self
      .relationships
      .iter_mut()
      .find(|r| r.relationship_id == relationship.relationship_id)
      .ok_or_else(|| Error::storage("update_relationship", relationship.relationship_id, "missing row"))?;
    row.status = relationship.status;
    row.updated_at = relationship.updated_at;
    row.updated_by = relationship.updated_by;
    Ok(())
  }

  fn followers(&self, user: UserId) -> Result<Vec<Relationship>> {
    Ok(
      self
        .relationships
        .iter()
        .rev()
        .filter(|r| r.followed_id == user && r.status == RelationshipStatus::Accepted)
        .cloned()
        .collect(),
    )
  }

  fn following(&self, user: UserId) -> Result<Vec<Relationship>> {
    Ok(
      self
        .relationships
        .iter()
        .rev()
        .filter(|r| r.follower_id == user && r.status == RelationshipStatus::Accepted)
        .cloned()
        .collect(),
    )
  }
}

impl MembershipStore for MemoryStore {
  fn membership(&self, group: GroupId, member: UserId) -> Result<Option<Membership>> {
    Ok(
      self
        .memberships
        .iter()
        .find(|m| m.group_id == group && m.member_id == member)
        .cloned(),
    )
  }

  fn insert_membership(&mut self, new: &NewMembership) -> Result<Membership> {
    if self.membership(new.group_id, new.member_id)?.is_some() {
      return Err(Error::Conflict("duplicate membership".into()));
    }
    let row = Membership {
      membership_id:      MembershipId(next_id(self.memberships.len())),
      group_id:           new.group_id,
      member_id:          new.member_id,
      inviter_id:         new.inviter_id,
      inviter_is_creator: new.inviter_is_creator,
      status:             new.status,
      created_at:         new.at,
      updated_at:         new.at,
    };
    self.memberships.push(row.clone());
    Ok(row)
  }

  fn update_membership(&mut self, membership: &Membership) -> Result<()> {
    let row = self
      .memberships
      .iter_mut()
      .find(|m| m.membership_id == membership.membership_id)
      .ok_or_else(|| Error::storage("update_membership", membership.membership_id, "missing row"))?;
    *row = membership.clone();
    Ok(())
  }

  fn members(&self, group: GroupId) -> Result<Vec<Membership>> {
    Ok(
      self
        .memberships
        .iter()
        .filter(|m| m.group_id == group && m.status == MembershipStatus::Accepted)
        .cloned()
        .collect(),
    )
  }
}

impl NotificationStore for MemoryStore {
  fn insert_notification(
    &mut self,
    new: &NewNotification,
    at: DateTime<Utc>,
  ) -> Result<Notification> {
    let row = Notification {
      notification_id: NotificationId(next_id(self.notifications.len())),
      receiver_id:     new.receiver_id,
      actor_id:        new.actor_id,
      action:          new.action,
      parent:          new.parent,
      content:         new.content.clone(),
      status:          NotificationStatus::Unread,
      created_at:      at,
      updated_at:      at,
    };
    self.notifications.push(row.clone());
    Ok(row)
  }

  fn notification(&self, id: NotificationId) -> Result<Option<Notification>> {
    Ok(self.notifications.iter().find(|n| n.notification_id == id).cloned())
  }

  fn originating_notification(
    &self,
    receiver: UserId,
    action: ActionType,
    parent: ParentRef,
  ) -> Result<Option<Notification>> {
    Ok(
      self
        .notifications
        .iter()
        .rev()
        .find(|n| {
          n.receiver_id == receiver
            && n.action == action
            && n.parent == parent
            && n.status != NotificationStatus::Inactive
        })
        .cloned(),
    )
  }

  fn set_notification_status(
    &mut self,
    id: NotificationId,
    status: NotificationStatus,
    at: DateTime<Utc>,
  ) -> Result<()> {
    if let Some(n) = self.notifications.iter_mut().find(|n| n.notification_id == id) {
      n.status = status;
      n.updated_at = at;
    }
    Ok(())
  }

  fn advance_notifications(
    &mut self,
    receiver: UserId,
    from: NotificationStatus,
    to: NotificationStatus,
    at: DateTime<Utc>,
  ) -> Result<usize> {
    let mut changed = 0;
    for n in self
      .notifications
      .iter_mut()
      .filter(|n| n.receiver_id == receiver && n.status == from)
    {
      n.status = to;
      n.updated_at = at;
      changed += 1;
    }
    Ok(changed)
  }

  fn notifications_for(&self, receiver: UserId) -> Result<Vec<Notification>> {
    Ok(
      self
        .notifications
        .iter()
        .rev()
        .filter(|n| n.receiver_id == receiver && n.status != NotificationStatus::Inactive)
        .cloned()
        .collect(),
    )
  }

  fn unread_count(&self, receiver: UserId) -> Result<usize> {
    Ok(
      self
        .notifications
        .iter()
        .filter(|n| n.receiver_id == receiver && n.status == NotificationStatus::Unread)
        .count(),
    )
  }
}

impl PostStore for MemoryStore {
  fn post(&self, id: PostId) -> Result<Option<Post>> {
    Ok(self.posts.iter().find(|p| p.post_id == id).cloned())
  }

  fn is_allow_listed(&self, post: PostId, viewer: UserId) -> Result<bool> {
    Ok(self.viewers.contains(&(post, viewer)))
  }

  fn feed_candidates(&self, viewer: UserId) -> Result<Vec<PostAccess>> {
    // The resolver filters; hand it everything.
    self
      .posts
      .iter()
      .map(|p| {
        Ok(PostAccess {
          post:         p.clone(),
          allow_listed: self.is_allow_listed(p.post_id, viewer)?,
        })
      })
      .collect()
  }

  fn insert_comment(&mut self, new: &NewComment, at: DateTime<Utc>) -> Result<Comment> {
    let row = Comment {
      comment_id:   CommentId(next_id(self.comments.len())),
      post_id:      new.post_id,
      commenter_id: new.commenter_id,
      body:         new.body.clone(),
      status:       ContentStatus::Active,
      created_at:   at,
    };
    self.comments.push(row.clone());
    Ok(row)
  }

  fn comments(&self, post: PostId) -> Result<Vec<Comment>> {
    Ok(self.comments.iter().filter(|c| c.post_id == post).cloned().collect())
  }
}
