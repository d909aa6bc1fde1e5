//! Posts, their viewer allow-lists, and comments.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString, IntoStaticStr};

use crate::id::{CommentId, GroupId, PostId, UserId};

/// Who besides the poster may read a post.
///
/// `SemiPrivate` and `Private` are resolved identically, through the
/// allow-list; see [`crate::visibility`].
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display,
  EnumString, IntoStaticStr,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum PostPrivacy {
  Public,
  SemiPrivate,
  Private,
}

impl PostPrivacy {
  pub fn is_gated(self) -> bool { !matches!(self, Self::Public) }
}

/// Soft-delete flag shared by posts and comments.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display,
  EnumString, IntoStaticStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ContentStatus {
  #[default]
  Active,
  Inactive,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
  pub post_id:    PostId,
  pub poster_id:  UserId,
  pub group_id:   Option<GroupId>,
  pub privacy:    PostPrivacy,
  pub status:     ContentStatus,
  pub body:       String,
  pub created_at: DateTime<Utc>,
}

impl Post {
  pub fn is_active(&self) -> bool { self.status == ContentStatus::Active }
}

/// Input for seeding a post. `viewers` becomes the allow-list and is ignored
/// by the resolver when the post is public.
#[derive(Debug, Clone)]
pub struct NewPost {
  pub poster_id: UserId,
  pub group_id:  Option<GroupId>,
  pub privacy:   PostPrivacy,
  pub body:      String,
  pub viewers:   Vec<UserId>,
}

impl NewPost {
  pub fn new(poster_id: UserId, privacy: PostPrivacy, body: impl Into<String>) -> Self {
    Self {
      poster_id,
      group_id: None,
      privacy,
      body: body.into(),
      viewers: Vec::new(),
    }
  }
}

/// A feed candidate together with whether the viewer is on its allow-list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostAccess {
  pub post:         Post,
  pub allow_listed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
  pub comment_id:   CommentId,
  pub post_id:      PostId,
  pub commenter_id: UserId,
  pub body:         String,
  pub status:       ContentStatus,
  pub created_at:   DateTime<Utc>,
}

impl Comment {
  pub fn is_active(&self) -> bool { self.status == ContentStatus::Active }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewComment {
  pub post_id:      PostId,
  pub commenter_id: UserId,
  pub body:         String,
}
