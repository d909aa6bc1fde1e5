//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are stored as RFC 3339 strings in UTC with a fixed microsecond
//! precision, so lexical order in SQL matches chronological order. Enums are
//! stored as their lowercase names; UUIDs as hyphenated lowercase strings.

use std::str::FromStr;

use agora_core::{
  id::{
    CommentId, GroupId, MembershipId, NotificationId, PostId, RelationshipId,
    UserId,
  },
  membership::Membership,
  notification::{Notification, ParentRef},
  post::{Comment, Post},
  relationship::Relationship,
  user::{Group, User},
};
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::Row;
use uuid::Uuid;

use crate::{Error, Result};

// ─── Uuid ─────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── Enums ───────────────────────────────────────────────────────────────────

pub fn encode_enum<T: Into<&'static str>>(value: T) -> &'static str { value.into() }

pub fn decode_enum<T: FromStr>(column: &'static str, s: &str) -> Result<T> {
  s.parse().map_err(|_| Error::UnknownValue {
    column,
    value: s.to_owned(),
  })
}

// ─── Row types ───────────────────────────────────────────────────────────────
//
// Each `*_COLUMNS` constant lists the columns its `Raw*::from_row` expects, in
// order.

pub const USER_COLUMNS: &str =
  "user_id, external_id, display_name, privacy, status, created_at";

/// Raw values read directly from a `users` row.
pub struct RawUser {
  pub user_id:      i64,
  pub external_id:  String,
  pub display_name: String,
  pub privacy:      String,
  pub status:       String,
  pub created_at:   String,
}

impl RawUser {
  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      user_id:      row.get(0)?,
      external_id:  row.get(1)?,
      display_name: row.get(2)?,
      privacy:      row.get(3)?,
      status:       row.get(4)?,
      created_at:   row.get(5)?,
    })
  }

  pub fn into_user(self) -> Result<User> {
    Ok(User {
      user_id:      UserId(self.user_id),
      external_id:  decode_uuid(&self.external_id)?,
      display_name: self.display_name,
      privacy:      decode_enum("users.privacy", &self.privacy)?,
      status:       decode_enum("users.status", &self.status)?,
      created_at:   decode_dt(&self.created_at)?,
    })
  }
}

pub const GROUP_COLUMNS: &str =
  "group_id, creator_id, title, description, created_at";

pub struct RawGroup {
  pub group_id:    i64,
  pub creator_id:  i64,
  pub title:       String,
  pub description: String,
  pub created_at:  String,
}

impl RawGroup {
  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      group_id:    row.get(0)?,
      creator_id:  row.get(1)?,
      title:       row.get(2)?,
      description: row.get(3)?,
      created_at:  row.get(4)?,
    })
  }

  pub fn into_group(self) -> Result<Group> {
    Ok(Group {
      group_id:    GroupId(self.group_id),
      creator_id:  UserId(self.creator_id),
      title:       self.title,
      description: self.description,
      created_at:  decode_dt(&self.created_at)?,
    })
  }
}

pub const RELATIONSHIP_COLUMNS: &str = "relationship_id, follower_id, \
                                        followed_id, status, created_at, \
                                        updated_at, updated_by";

pub struct RawRelationship {
  pub relationship_id: i64,
  pub follower_id:     i64,
  pub followed_id:     i64,
  pub status:          String,
  pub created_at:      String,
  pub updated_at:      String,
  pub updated_by:      i64,
}

impl RawRelationship {
  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      relationship_id: row.get(0)?,
      follower_id:     row.get(1)?,
      followed_id:     row.get(2)?,
      status:          row.get(3)?,
      created_at:      row.get(4)?,
      updated_at:      row.get(5)?,
      updated_by:      row.get(6)?,
    })
  }

  pub fn into_relationship(self) -> Result<Relationship> {
    Ok(Relationship {
      relationship_id: RelationshipId(self.relationship_id),
      follower_id:     UserId(self.follower_id),
      followed_id:     UserId(self.followed_id),
      status:          decode_enum("relationships.status", &self.status)?,
      created_at:      decode_dt(&self.created_at)?,
      updated_at:      decode_dt(&self.updated_at)?,
      updated_by:      UserId(self.updated_by),
    })
  }
}

pub const MEMBERSHIP_COLUMNS: &str = "membership_id, group_id, member_id, \
                                      inviter_id, inviter_is_creator, status, \
                                      created_at, updated_at";

pub struct RawMembership {
  pub membership_id:      i64,
  pub group_id:           i64,
  pub member_id:          i64,
  pub inviter_id:         Option<i64>,
  pub inviter_is_creator: bool,
  pub status:             String,
  pub created_at:         String,
  pub updated_at:         String,
}

impl RawMembership {
  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      membership_id:      row.get(0)?,
      group_id:           row.get(1)?,
      member_id:          row.get(2)?,
      inviter_id:         row.get(3)?,
      inviter_is_creator: row.get(4)?,
      status:             row.get(5)?,
      created_at:         row.get(6)?,
      updated_at:         row.get(7)?,
    })
  }

  pub fn into_membership(self) -> Result<Membership> {
    Ok(Membership {
      membership_id:      MembershipId(self.membership_id),
      group_id:           GroupId(self.group_id),
      member_id:          UserId(self.member_id),
      inviter_id:         self.inviter_id.map(UserId),
      inviter_is_creator: self.inviter_is_creator,
      status:             decode_enum("memberships.status", &self.status)?,
      created_at:         decode_dt(&self.created_at)?,
      updated_at:         decode_dt(&self.updated_at)?,
    })
  }
}

pub const NOTIFICATION_COLUMNS: &str = "notification_id, receiver_id, \
                                        actor_id, action, parent_type, \
                                        parent_id, content, status, \
                                        created_at, updated_at";

pub struct RawNotification {
  pub notification_id: i64,
  pub receiver_id:     i64,
  pub actor_id:        i64,
  pub action:          String,
  pub parent_type:     String,
  pub parent_id:       i64,
  pub content:         String,
  pub status:          String,
  pub created_at:      String,
  pub updated_at:      String,
}

impl RawNotification {
  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      notification_id: row.get(0)?,
      receiver_id:     row.get(1)?,
      actor_id:        row.get(2)?,
      action:          row.get(3)?,
      parent_type:     row.get(4)?,
      parent_id:       row.get(5)?,
      content:         row.get(6)?,
      status:          row.get(7)?,
      created_at:      row.get(8)?,
      updated_at:      row.get(9)?,
    })
  }

  pub fn into_notification(self) -> Result<Notification> {
    Ok(Notification {
      notification_id: NotificationId(self.notification_id),
      receiver_id:     UserId(self.receiver_id),
      actor_id:        UserId(self.actor_id),
      action:          decode_enum("notifications.action", &self.action)?,
      parent:          ParentRef::new(
        decode_enum("notifications.parent_type", &self.parent_type)?,
        self.parent_id,
      ),
      content:         self.content,
      status:          decode_enum("notifications.status", &self.status)?,
      created_at:      decode_dt(&self.created_at)?,
      updated_at:      decode_dt(&self.updated_at)?,
    })
  }
}

pub const POST_COLUMNS: &str =
  "post_id, poster_id, group_id, privacy, status, body, created_at";

pub struct RawPost {
  pub post_id:    i64,
  pub poster_id:  i64,
  pub group_id:   Option<i64>,
  pub privacy:    String,
  pub status:     String,
  pub body:       String,
  pub created_at: String,
}

impl RawPost {
  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      post_id:    row.get(0)?,
      poster_id:  row.get(1)?,
      group_id:   row.get(2)?,
      privacy:    row.get(3)?,
      status:     row.get(4)?,
      body:       row.get(5)?,
      created_at: row.get(6)?,
    })
  }

  pub fn into_post(self) -> Result<Post> {
    Ok(Post {
      post_id:    PostId(self.post_id),
      poster_id:  UserId(self.poster_id),
      group_id:   self.group_id.map(GroupId),
      privacy:    decode_enum("posts.privacy", &self.privacy)?,
      status:     decode_enum("posts.status", &self.status)?,
      body:       self.body,
      created_at: decode_dt(&self.created_at)?,
    })
  }
}

pub const COMMENT_COLUMNS: &str =
  "comment_id, post_id, commenter_id, body, status, created_at";

pub struct RawComment {
  pub comment_id:   i64,
  pub post_id:      i64,
  pub commenter_id: i64,
  pub body:         String,
  pub status:       String,
  pub created_at:   String,
}

impl RawComment {
  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      comment_id:   row.get(0)?,
      post_id:      row.get(1)?,
      commenter_id: row.get(2)?,
      body:         row.get(3)?,
      status:       row.get(4)?,
      created_at:   row.get(5)?,
    })
  }

  pub fn into_comment(self) -> Result<Comment> {
    Ok(Comment {
      comment_id:   CommentId(self.comment_id),
      post_id:      PostId(self.post_id),
      commenter_id: UserId(self.commenter_id),
      body:         self.body,
      status:       decode_enum("comments.status", &self.status)?,
      created_at:   decode_dt(&self.created_at)?,
    })
  }
}
