//! [`Repo`]: the `agora-core` repository traits over one SQLite connection.
//!
//! A `Repo` never opens or commits a transaction itself. [`SqliteStore`]
//! hands it an open transaction, runs a lifecycle function against it, and
//! commits only when that function returns `Ok`.
//!
//! [`SqliteStore`]: crate::SqliteStore

use std::fmt::Display;

use agora_core::{
  Entity, Error as CoreError, Result as CoreResult,
  id::{
    CommentId, GroupId, MembershipId, NotificationId, PostId, RelationshipId,
    UserId,
  },
  membership::{Membership, NewMembership},
  notification::{
    ActionType, NewNotification, Notification, NotificationStatus, ParentRef,
  },
  post::{Comment, ContentStatus, NewComment, NewPost, Post, PostAccess},
  relationship::{NewRelationship, Relationship},
  store::{
    GroupDirectory, MembershipStore, NotificationStore, PostStore,
    RelationshipStore, UserDirectory,
  },
  user::{Group, NewGroup, NewUser, User},
};
use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension as _, Params, Row, ffi};
use uuid::Uuid;

use crate::encode::{
  COMMENT_COLUMNS, GROUP_COLUMNS, MEMBERSHIP_COLUMNS, NOTIFICATION_COLUMNS,
  POST_COLUMNS, RELATIONSHIP_COLUMNS, RawComment, RawGroup, RawMembership,
  RawNotification, RawPost, RawRelationship, RawUser, USER_COLUMNS, encode_dt,
  encode_enum, encode_uuid,
};

// ─── Error context ───────────────────────────────────────────────────────────

trait Context<T> {
  fn context(self, op: &'static str, entity: impl Display) -> CoreResult<T>;
}

impl<T, E> Context<T> for Result<T, E>
where
  E: Into<Box<dyn std::error::Error + Send + Sync>>,
{
  fn context(self, op: &'static str, entity: impl Display) -> CoreResult<T> {
    self.map_err(|e| CoreError::storage(op, entity, e))
  }
}

/// Unique and primary-key violations become [`CoreError::Conflict`]; anything
/// else is a storage failure.
fn insert_error(op: &'static str, entity: Entity, e: rusqlite::Error) -> CoreError {
  if let rusqlite::Error::SqliteFailure(failure, _) = &e {
    if failure.extended_code == ffi::SQLITE_CONSTRAINT_UNIQUE
      || failure.extended_code == ffi::SQLITE_CONSTRAINT_PRIMARYKEY
    {
      return CoreError::Conflict(format!("duplicate {entity}"));
    }
  }
  CoreError::storage(op, entity, e)
}

// ─── Repo ────────────────────────────────────────────────────────────────────

pub struct Repo<'c> {
  conn: &'c Connection,
}

impl<'c> Repo<'c> {
  pub fn new(conn: &'c Connection) -> Self { Self { conn } }

  fn one<P, R>(
    &self,
    op: &'static str,
    entity: Entity,
    sql: &str,
    params: P,
    read: impl FnOnce(&Row<'_>) -> rusqlite::Result<R>,
  ) -> CoreResult<Option<R>>
  where
    P: Params,
  {
    self
      .conn
      .prepare_cached(sql)
      .and_then(|mut stmt| stmt.query_row(params, read).optional())
      .context(op, entity)
  }

  fn all<P, R>(
    &self,
    op: &'static str,
    entity: Entity,
    sql: &str,
    params: P,
    read: impl FnMut(&Row<'_>) -> rusqlite::Result<R>,
  ) -> CoreResult<Vec<R>>
  where
    P: Params,
  {
    let mut stmt = self.conn.prepare_cached(sql).context(op, entity)?;
    let rows = stmt.query_map(params, read).context(op, entity)?;
    rows.collect::<rusqlite::Result<Vec<_>>>().context(op, entity)
  }

  /// Run a statement and return the number of rows it changed.
  fn execute<P: Params>(
    &self,
    op: &'static str,
    entity: Entity,
    sql: &str,
    params: P,
  ) -> CoreResult<usize> {
    self
      .conn
      .prepare_cached(sql)
      .and_then(|mut stmt| stmt.execute(params))
      .context(op, entity)
  }

  /// Run an INSERT and return the new rowid.
  fn insert<P: Params>(
    &self,
    op: &'static str,
    entity: Entity,
    sql: &str,
    params: P,
  ) -> CoreResult<i64> {
    self
      .conn
      .prepare_cached(sql)
      .and_then(|mut stmt| stmt.insert(params))
      .map_err(|e| insert_error(op, entity, e))
  }

  /// An UPDATE keyed by primary key must touch exactly one row.
  fn update_one<P: Params>(
    &self,
    op: &'static str,
    entity: Entity,
    key: impl Display,
    sql: &str,
    params: P,
  ) -> CoreResult<()> {
    match self.execute(op, entity, sql, params)? {
      1 => Ok(()),
      n => Err(CoreError::storage(
        op,
        format!("{entity} {key}"),
        format!("expected one row to change, {n} did"),
      )),
    }
  }

  // ── Seeding ───────────────────────────────────────────────────────────────

  pub fn insert_user(&mut self, user: &NewUser, at: DateTime<Utc>) -> CoreResult<User> {
    let user_id = self.insert(
      "insert_user",
      Entity::User,
      "INSERT INTO users (external_id, display_name, privacy, status, created_at)
       VALUES (?1, ?2, ?3, ?4, ?5)",
      rusqlite::params![
        encode_uuid(user.external_id),
        user.display_name,
        encode_enum(user.privacy),
        encode_enum(user.status),
        encode_dt(at),
      ],
    )?;
    self
      .user(UserId(user_id))?
      .ok_or_else(|| CoreError::not_found(Entity::User, user_id))
  }

  /// Insert a post and its allow-list.
  pub fn insert_post(&mut self, post: &NewPost, at: DateTime<Utc>) -> CoreResult<Post> {
    let post_id = self.insert(
      "insert_post",
      Entity::Post,
      "INSERT INTO posts (poster_id, group_id, privacy, status, body, created_at)
       VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
      rusqlite::params![
        post.poster_id.0,
        post.group_id.map(|g| g.0),
        encode_enum(post.privacy),
        encode_enum(ContentStatus::Active),
        post.body,
        encode_dt(at),
      ],
    )?;
    for viewer in &post.viewers {
      self.execute(
        "insert_post",
        Entity::Post,
        "INSERT OR IGNORE INTO post_viewers (post_id, viewer_id) VALUES (?1, ?2)",
        rusqlite::params![post_id, viewer.0],
      )?;
    }
    self
      .post(PostId(post_id))?
      .ok_or_else(|| CoreError::not_found(Entity::Post, post_id))
  }
}

// ─── Users and groups ────────────────────────────────────────────────────────

impl UserDirectory for Repo<'_> {
  fn user(&self, id: UserId) -> CoreResult<Option<User>> {
    self
      .one(
        "user",
        Entity::User,
        &format!("SELECT {USER_COLUMNS} FROM users WHERE user_id = ?1"),
        [id.0],
        RawUser::from_row,
      )?
      .map(|raw| raw.into_user().context("user", Entity::User))
      .transpose()
  }

  fn user_by_external_id(&self, external_id: Uuid) -> CoreResult<Option<User>> {
    self
      .one(
        "user_by_external_id",
        Entity::User,
        &format!("SELECT {USER_COLUMNS} FROM users WHERE external_id = ?1"),
        [encode_uuid(external_id)],
        RawUser::from_row,
      )?
      .map(|raw| raw.into_user().context("user_by_external_id", Entity::User))
      .transpose()
  }
}

impl GroupDirectory for Repo<'_> {
  fn group(&self, id: GroupId) -> CoreResult<Option<Group>> {
    self
      .one(
        "group",
        Entity::Group,
        &format!("SELECT {GROUP_COLUMNS} FROM user_groups WHERE group_id = ?1"),
        [id.0],
        RawGroup::from_row,
      )?
      .map(|raw| raw.into_group().context("group", Entity::Group))
      .transpose()
  }

  fn insert_group(&mut self, group: &NewGroup, at: DateTime<Utc>) -> CoreResult<Group> {
    let group_id = self.insert(
      "insert_group",
      Entity::Group,
      "INSERT INTO user_groups (creator_id, title, description, created_at)
       VALUES (?1, ?2, ?3, ?4)",
      rusqlite::params![group.creator_id.0, group.title, group.description, encode_dt(at)],
    )?;
    Ok(Group {
      group_id:    GroupId(group_id),
      creator_id:  group.creator_id,
      title:       group.title.clone(),
      description: group.description.clone(),
      created_at:  at,
    })
  }
}

// ─── Relationships ───────────────────────────────────────────────────────────

impl RelationshipStore for Repo<'_> {
  fn relationship(&self, id: RelationshipId) -> CoreResult<Option<Relationship>> {
    self
      .one(
        "relationship",
        Entity::Relationship,
        &format!(
          "SELECT {RELATIONSHIP_COLUMNS} FROM relationships WHERE relationship_id = ?1"
        ),
        [id.0],
        RawRelationship::from_row,
      )?
      .map(|raw| raw.into_relationship().context("relationship", Entity::Relationship))
      .transpose()
  }

  fn relationship_between(
    &self,
    follower: UserId,
    followed: UserId,
  ) -> CoreResult<Option<Relationship>> {
    self
      .one(
        "relationship_between",
        Entity::Relationship,
        &format!(
          "SELECT {RELATIONSHIP_COLUMNS} FROM relationships
           WHERE follower_id = ?1 AND followed_id = ?2"
        ),
        [follower.0, followed.0],
        RawRelationship::from_row,
      )?
      .map(|raw| {
        raw
          .into_relationship()
          .context("relationship_between", Entity::Relationship)
      })
      .transpose()
  }

  fn insert_relationship(&mut self, new: &NewRelationship) -> CoreResult<Relationship> {
    let at = encode_dt(new.at);
    let relationship_id = self.insert(
      "insert_relationship",
      Entity::Relationship,
      "INSERT INTO relationships
         (follower_id, followed_id, status, created_at, updated_at, updated_by)
       VALUES (?1, ?2, ?3, ?4, ?4, ?1)",
      rusqlite::params![
        new.follower_id.0,
        new.followed_id.0,
        encode_enum(new.status),
        at,
      ],
    )?;
    Ok(Relationship {
      relationship_id: RelationshipId(relationship_id),
      follower_id:     new.follower_id,
      followed_id:     new.followed_id,
      status:          new.status,
      created_at:      new.at,
      updated_at:      new.at,
      updated_by:      new.follower_id,
    })
  }

  fn update_relationship(&mut self, relationship: &Relationship) -> CoreResult<()> {
    self.update_one(
      "update_relationship",
      Entity::Relationship,
      relationship.relationship_id,
      "UPDATE relationships SET status = ?2, updated_at = ?3, updated_by = ?4
       WHERE relationship_id = ?1",
      rusqlite::params![
        relationship.relationship_id.0,
        encode_enum(relationship.status),
        encode_dt(relationship.updated_at),
        relationship.updated_by.0,
      ],
    )
  }

  fn followers(&self, user: UserId) -> CoreResult<Vec<Relationship>> {
    self
      .all(
        "followers",
        Entity::Relationship,
        &format!(
          "SELECT {RELATIONSHIP_COLUMNS} FROM relationships
           WHERE followed_id = ?1 AND status = 'accepted'
           ORDER BY updated_at DESC, relationship_id DESC"
        ),
        [user.0],
        RawRelationship::from_row,
      )?
      .into_iter()
      .map(|raw| raw.into_relationship().context("followers", Entity::Relationship))
      .collect()
  }

  fn following(&self, user: UserId) -> CoreResult<Vec<Relationship>> {
    self
      .all(
        "following",
        Entity::Relationship,
        &format!(
          "SELECT {RELATIONSHIP_COLUMNS} FROM relationships
           WHERE follower_id = ?1 AND status = 'accepted'
           ORDER BY updated_at DESC, relationship_id DESC"
        ),
        [user.0],
        RawRelationship::from_row,
      )?
      .into_iter()
      .map(|raw| raw.into_relationship().context("following", Entity::Relationship))
      .collect()
  }
}

// ─── Memberships ─────────────────────────────────────────────────────────────

impl MembershipStore for Repo<'_> {
  fn membership(&self, group: GroupId, member: UserId) -> CoreResult<Option<Membership>> {
    self
      .one(
        "membership",
        Entity::Membership,
        &format!(
          "SELECT {MEMBERSHIP_COLUMNS} FROM memberships
           WHERE group_id = ?1 AND member_id = ?2"
        ),
        [group.0, member.0],
        RawMembership::from_row,
      )?
      .map(|raw| raw.into_membership().context("membership", Entity::Membership))
      .transpose()
  }

  fn insert_membership(&mut self, new: &NewMembership) -> CoreResult<Membership> {
    let membership_id = self.insert(
      "insert_membership",
      Entity::Membership,
      "INSERT INTO memberships
         (group_id, member_id, inviter_id, inviter_is_creator, status,
          created_at, updated_at)
       VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)",
      rusqlite::params![
        new.group_id.0,
        new.member_id.0,
        new.inviter_id.map(|u| u.0),
        new.inviter_is_creator,
        encode_enum(new.status),
        encode_dt(new.at),
      ],
    )?;
    Ok(Membership {
      membership_id:      MembershipId(membership_id),
      group_id:           new.group_id,
      member_id:          new.member_id,
      inviter_id:         new.inviter_id,
      inviter_is_creator: new.inviter_is_creator,
      status:             new.status,
      created_at:         new.at,
      updated_at:         new.at,
    })
  }

  fn update_membership(&mut self, membership: &Membership) -> CoreResult<()> {
    self.update_one(
      "update_membership",
      Entity::Membership,
      membership.membership_id,
      "UPDATE memberships
       SET status = ?2, inviter_id = ?3, inviter_is_creator = ?4, updated_at = ?5
       WHERE membership_id = ?1",
      rusqlite::params![
        membership.membership_id.0,
        encode_enum(membership.status),
        membership.inviter_id.map(|u| u.0),
        membership.inviter_is_creator,
        encode_dt(membership.updated_at),
      ],
    )
  }

  fn members(&self, group: GroupId) -> CoreResult<Vec<Membership>> {
    self
      .all(
        "members",
        Entity::Membership,
        &format!(
          "SELECT {MEMBERSHIP_COLUMNS} FROM memberships
           WHERE group_id = ?1 AND status = 'accepted'
           ORDER BY membership_id"
        ),
        [group.0],
        RawMembership::from_row,
      )?
      .into_iter()
      .map(|raw| raw.into_membership().context("members", Entity::Membership))
      .collect()
  }
}

// ─── Notifications ───────────────────────────────────────────────────────────

impl NotificationStore for Repo<'_> {
  fn insert_notification(
    &mut self,
    new: &NewNotification,
    at: DateTime<Utc>,
  ) -> CoreResult<Notification> {
    let notification_id = self.insert(
      "insert_notification",
      Entity::Notification,
      "INSERT INTO notifications
         (receiver_id, actor_id, action, parent_type, parent_id, content,
          status, created_at, updated_at)
       VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8)",
      rusqlite::params![
        new.receiver_id.0,
        new.actor_id.0,
        encode_enum(new.action),
        encode_enum(new.parent.parent_type),
        new.parent.parent_id,
        new.content,
        encode_enum(NotificationStatus::Unread),
        encode_dt(at),
      ],
    )?;
    Ok(Notification {
      notification_id: NotificationId(notification_id),
      receiver_id:     new.receiver_id,
      actor_id:        new.actor_id,
      action:          new.action,
      parent:          new.parent,
      content:         new.content.clone(),
      status:          NotificationStatus::Unread,
      created_at:      at,
      updated_at:      at,
    })
  }

  fn notification(&self, id: NotificationId) -> CoreResult<Option<Notification>> {
    self
      .one(
        "notification",
        Entity::Notification,
        &format!(
          "SELECT {NOTIFICATION_COLUMNS} FROM notifications WHERE notification_id = ?1"
        ),
        [id.0],
        RawNotification::from_row,
      )?
      .map(|raw| raw.into_notification().context("notification", Entity::Notification))
      .transpose()
  }

  fn originating_notification(
    &self,
    receiver: UserId,
    action: ActionType,
    parent: ParentRef,
  ) -> CoreResult<Option<Notification>> {
    self
      .one(
        "originating_notification",
        Entity::Notification,
        &format!(
          "SELECT {NOTIFICATION_COLUMNS} FROM notifications
           WHERE receiver_id = ?1 AND action = ?2
             AND parent_type = ?3 AND parent_id = ?4
             AND status != 'inactive'
           ORDER BY notification_id DESC
           LIMIT 1"
        ),
        rusqlite::params![
          receiver.0,
          encode_enum(action),
          encode_enum(parent.parent_type),
          parent.parent_id,
        ],
        RawNotification::from_row,
      )?
      .map(|raw| {
        raw
          .into_notification()
          .context("originating_notification", Entity::Notification)
      })
      .transpose()
  }

  fn set_notification_status(
    &mut self,
    id: NotificationId,
    status: NotificationStatus,
    at: DateTime<Utc>,
  ) -> CoreResult<()> {
    self.update_one(
      "set_notification_status",
      Entity::Notification,
      id,
      "UPDATE notifications SET status = ?2, updated_at = ?3 WHERE notification_id = ?1",
      rusqlite::params![id.0, encode_enum(status), encode_dt(at)],
    )
  }

  fn advance_notifications(
    &mut self,
    receiver: UserId,
    from: NotificationStatus,
    to: NotificationStatus,
    at: DateTime<Utc>,
  ) -> CoreResult<usize> {
    self.execute(
      "advance_notifications",
      Entity::Notification,
      "UPDATE notifications SET status = ?3, updated_at = ?4
       WHERE receiver_id = ?1 AND status = ?2",
      rusqlite::params![receiver.0, encode_enum(from), encode_enum(to), encode_dt(at)],
    )
  }

  fn notifications_for(&self, receiver: UserId) -> CoreResult<Vec<Notification>> {
    self
      .all(
        "notifications_for",
        Entity::Notification,
        &format!(
          "SELECT {NOTIFICATION_COLUMNS} FROM notifications
           WHERE receiver_id = ?1 AND status != 'inactive'
           ORDER BY created_at DESC, notification_id DESC"
        ),
        [receiver.0],
        RawNotification::from_row,
      )?
      .into_iter()
      .map(|raw| {
        raw
          .into_notification()
          .context("notifications_for", Entity::Notification)
      })
      .collect()
  }

  fn unread_count(&self, receiver: UserId) -> CoreResult<usize> {
    let count: i64 = self
      .one(
        "unread_count",
        Entity::Notification,
        "SELECT COUNT(*) FROM notifications WHERE receiver_id = ?1 AND status = 'unread'",
        [receiver.0],
        |row| row.get(0),
      )?
      .unwrap_or(0);
    usize::try_from(count).context("unread_count", Entity::Notification)
  }
}

// ─── Posts and comments ──────────────────────────────────────────────────────

impl PostStore for Repo<'_> {
  fn post(&self, id: PostId) -> CoreResult<Option<Post>> {
    self
      .one(
        "post",
        Entity::Post,
        &format!("SELECT {POST_COLUMNS} FROM posts WHERE post_id = ?1"),
        [id.0],
        RawPost::from_row,
      )?
      .map(|raw| raw.into_post().context("post", Entity::Post))
      .transpose()
  }

  fn is_allow_listed(&self, post: PostId, viewer: UserId) -> CoreResult<bool> {
    Ok(
      self
        .one(
          "is_allow_listed",
          Entity::Post,
          "SELECT 1 FROM post_viewers WHERE post_id = ?1 AND viewer_id = ?2",
          [post.0, viewer.0],
          |_| Ok(()),
        )?
        .is_some(),
    )
  }

  fn feed_candidates(&self, viewer: UserId) -> CoreResult<Vec<PostAccess>> {
    let columns = POST_COLUMNS
      .split(", ")
      .map(|c| format!("p.{c}"))
      .collect::<Vec<_>>()
      .join(", ");
    self
      .all(
        "feed_candidates",
        Entity::Post,
        &format!(
          "SELECT {columns},
                  EXISTS (SELECT 1 FROM post_viewers v
                          WHERE v.post_id = p.post_id AND v.viewer_id = ?1)
           FROM posts p
           WHERE p.poster_id = ?1
              OR (p.status = 'active'
                  AND (p.privacy = 'public'
                       OR EXISTS (SELECT 1 FROM post_viewers v
                                  WHERE v.post_id = p.post_id AND v.viewer_id = ?1)))"
        ),
        [viewer.0],
        |row| Ok((RawPost::from_row(row)?, row.get::<_, bool>(7)?)),
      )?
      .into_iter()
      .map(|(raw, allow_listed)| -> CoreResult<PostAccess> {
        Ok(PostAccess {
          post: raw.into_post().context("feed_candidates", Entity::Post)?,
          allow_listed,
        })
      })
      .collect()
  }

  fn insert_comment(&mut self, new: &NewComment, at: DateTime<Utc>) -> CoreResult<Comment> {
    let comment_id = self.insert(
      "insert_comment",
      Entity::Comment,
      "INSERT INTO comments (post_id, commenter_id, body, status, created_at)
       VALUES (?1, ?2, ?3, ?4, ?5)",
      rusqlite::params![
        new.post_id.0,
        new.commenter_id.0,
        new.body,
        encode_enum(ContentStatus::Active),
        encode_dt(at),
      ],
    )?;
    Ok(Comment {
      comment_id:   CommentId(comment_id),
      post_id:      new.post_id,
      commenter_id: new.commenter_id,
      body:         new.body.clone(),
      status:       ContentStatus::Active,
      created_at:   at,
    })
  }

  fn comments(&self, post: PostId) -> CoreResult<Vec<Comment>> {
    self
      .all(
        "comments",
        Entity::Comment,
        &format!(
          "SELECT {COMMENT_COLUMNS} FROM comments
           WHERE post_id = ?1
           ORDER BY created_at, comment_id"
        ),
        [post.0],
        RawComment::from_row,
      )?
      .into_iter()
      .map(|raw| raw.into_comment().context("comments", Entity::Comment))
      .collect()
  }
}
