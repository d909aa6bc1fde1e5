//! Who may see which posts and comments, and feed assembly.
//!
//! The rules, in order:
//!
//! 1. The poster always sees their own post, active or not.
//! 2. Nobody else sees an inactive post.
//! 3. Everybody sees an active public post.
//! 4. An active semi-private or private post is visible to users on its
//!    allow-list only.
//!
//! Semi-private posts get no group-membership exception; both gated tiers are
//! resolved through the allow-list alone.

use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::{
  Entity, Error, Result, ValidationError,
  fanout::{self, Event},
  id::{PostId, UserId},
  post::{Comment, NewComment, Post},
  store::{NotificationStore, PostStore, UserDirectory},
  user::require_active_user,
};

/// The visibility rule for a post whose allow-list membership for `viewer`
/// is already known.
pub fn can_view(viewer: UserId, post: &Post, allow_listed: bool) -> bool {
  if viewer == post.poster_id {
    return true;
  }
  if !post.is_active() {
    return false;
  }
  !post.privacy.is_gated() || allow_listed
}

/// [`can_view`] with the allow-list consulted only when it matters.
pub fn can_view_post<S>(store: &S, viewer: UserId, post: &Post) -> Result<bool>
where
  S: PostStore + ?Sized,
{
  if viewer == post.poster_id || !post.is_active() || !post.privacy.is_gated() {
    return Ok(can_view(viewer, post, false));
  }
  let allow_listed = store.is_allow_listed(post.post_id, viewer)?;
  Ok(can_view(viewer, post, allow_listed))
}

/// Look up a post and decide whether `viewer` may see it.
pub fn can_view_by_id<S>(store: &S, viewer: UserId, post: PostId) -> Result<bool>
where
  S: PostStore + ?Sized,
{
  let post = store
    .post(post)?
    .ok_or_else(|| Error::not_found(Entity::Post, post))?;
  can_view_post(store, viewer, &post)
}

/// Feed order: newest first, ties broken by ascending post id.
pub fn feed_order(a: &Post, b: &Post) -> Ordering {
  b.created_at
    .cmp(&a.created_at)
    .then_with(|| a.post_id.cmp(&b.post_id))
}

/// The viewer's own posts, every active public post, and every active gated
/// post the viewer is allow-listed on, in [`feed_order`].
pub fn feed_for<S>(store: &S, viewer: UserId) -> Result<Vec<Post>>
where
  S: PostStore + ?Sized,
{
  let mut posts: Vec<Post> = store
    .feed_candidates(viewer)?
    .into_iter()
    .filter(|c| can_view(viewer, &c.post, c.allow_listed))
    .map(|c| c.post)
    .collect();
  posts.sort_by(feed_order);
  posts.dedup_by_key(|p| p.post_id);
  Ok(posts)
}

/// A comment is visible when its post is, and when it is active or written by
/// the viewer.
pub fn can_view_comment(
  viewer: UserId,
  post: &Post,
  allow_listed: bool,
  comment: &Comment,
) -> bool {
  comment.post_id == post.post_id
    && can_view(viewer, post, allow_listed)
    && (comment.is_active() || comment.commenter_id == viewer)
}

/// Comment on a post the commenter can see, notifying the poster.
pub fn comment_on<S>(
  store: &mut S,
  post: PostId,
  commenter: UserId,
  body: &str,
  now: DateTime<Utc>,
) -> Result<Comment>
where
  S: UserDirectory + PostStore + NotificationStore + ?Sized,
{
  let body = body.trim();
  if body.is_empty() {
    return Err(ValidationError::Empty("comment body").into());
  }
  let commenter = require_active_user(&*store, commenter)?;
  let post = visible_post(&*store, commenter.user_id, post)?;
  if !post.is_active() {
    return Err(Error::InvalidState(format!(
      "post {} is inactive",
      post.post_id
    )));
  }

  let comment = store.insert_comment(
    &NewComment {
      post_id:      post.post_id,
      commenter_id: commenter.user_id,
      body:         body.to_owned(),
    },
    now,
  )?;

  debug!(comment = %comment.comment_id, post = %post.post_id, "comment added");

  fanout::dispatch(
    store,
    Event::PostCommented { post: &post, comment: &comment, commenter: &commenter },
    now,
  )?;
  Ok(comment)
}

/// Comments on `post` visible to `viewer`, oldest first.
pub fn comments_for<S>(store: &S, viewer: UserId, post: PostId) -> Result<Vec<Comment>>
where
  S: PostStore + ?Sized,
{
  let post = visible_post(store, viewer, post)?;
  Ok(
    store
      .comments(post.post_id)?
      .into_iter()
      // `visible_post` already established the post half of the rule.
      .filter(|c| can_view_comment(viewer, &post, true, c))
      .collect(),
  )
}

/// Fetch a post, reporting posts the viewer may not see as missing.
fn visible_post<S>(store: &S, viewer: UserId, id: PostId) -> Result<Post>
where
  S: PostStore + ?Sized,
{
  match store.post(id)? {
    Some(post) if can_view_post(store, viewer, &post)? => Ok(post),
    _ => Err(Error::not_found(Entity::Post, id)),
  }
}
