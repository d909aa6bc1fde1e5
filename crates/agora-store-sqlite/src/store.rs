//! [`SqliteStore`]: the SQLite implementation of [`SocialStore`].

use std::path::Path;

use agora_core::{
  decision::Decision,
  id::{GroupId, NotificationId, PostId, RelationshipId, UserId},
  membership::{self, Membership},
  notification::{self, Notification},
  post::{Comment, NewPost, Post},
  relationship::{self, Relationship},
  store::{NotificationStore as _, SocialStore, UserDirectory as _},
  user::{Group, NewUser, User, require_user},
  visibility,
};
use chrono::{DateTime, SubsecRound as _, Utc};
use rusqlite::TransactionBehavior;
use tracing::{debug, info};
use uuid::Uuid;

use crate::{Result, repo::Repo, schema::SCHEMA};

/// Timestamps are stored at microsecond precision; truncate up front so the
/// values handed back to callers match what a later read returns.
fn now() -> DateTime<Utc> { Utc::now().trunc_subsecs(6) }

// ─── Store ───────────────────────────────────────────────────────────────────

/// An Agora store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection handle is shared.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let path = path.as_ref().to_owned();
    let conn = tokio_rusqlite::Connection::open(&path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    info!(path = %path.display(), "opened sqlite store");
    Ok(store)
  }

  /// Open an in-memory store, useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Run `f` inside one `IMMEDIATE` transaction. The transaction commits only
  /// if `f` succeeds; a domain error rolls back every write `f` made.
  async fn transact<T, F>(&self, op: &'static str, f: F) -> Result<T>
  where
    T: Send + 'static,
    F: FnOnce(&mut Repo<'_>) -> agora_core::Result<T> + Send + 'static,
  {
    let outcome = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let outcome = f(&mut Repo::new(&tx));
        if outcome.is_ok() {
          tx.commit()?;
        }
        Ok(outcome)
      })
      .await?;

    match &outcome {
      Ok(_) => debug!(op, "committed"),
      Err(e) => debug!(op, error = %e, "rolled back"),
    }
    Ok(outcome?)
  }

  /// Run a read-only `f` against the connection.
  async fn read<T, F>(&self, f: F) -> Result<T>
  where
    T: Send + 'static,
    F: FnOnce(&Repo<'_>) -> agora_core::Result<T> + Send + 'static,
  {
    let outcome = self.conn.call(move |conn| Ok(f(&Repo::new(conn)))).await?;
    Ok(outcome?)
  }

  // ── Seeding ───────────────────────────────────────────────────────────────
  //
  // Users and posts are owned by subsystems outside this crate; these exist
  // so a deployment or a test can populate them.

  pub async fn add_user(&self, user: NewUser) -> Result<User> {
    let now = now();
    self
      .transact("add_user", move |repo| repo.insert_user(&user, now))
      .await
  }

  /// Insert a post together with its allow-list.
  pub async fn add_post(&self, post: NewPost) -> Result<Post> {
    let now = now();
    self
      .transact("add_post", move |repo| {
        require_user(&*repo, post.poster_id)?;
        repo.insert_post(&post, now)
      })
      .await
  }
}

// ─── SocialStore impl ────────────────────────────────────────────────────────

impl SocialStore for SqliteStore {
  type Error = crate::Error;

  // ── Directory ─────────────────────────────────────────────────────────────

  async fn user(&self, id: UserId) -> Result<Option<User>> {
    self.read(move |repo| repo.user(id)).await
  }

  async fn user_by_external_id(&self, external_id: Uuid) -> Result<Option<User>> {
    self
      .read(move |repo| repo.user_by_external_id(external_id))
      .await
  }

  // ── Relationships ─────────────────────────────────────────────────────────

  async fn request_follow(&self, follower: UserId, followed: UserId) -> Result<Relationship> {
    let now = now();
    self
      .transact("request_follow", move |repo| {
        relationship::request_follow(repo, follower, followed, now)
      })
      .await
  }

  async fn cancel_follow(&self, follower: UserId, followed: UserId) -> Result<Relationship> {
    let now = now();
    self
      .transact("cancel_follow", move |repo| {
        relationship::cancel_follow(repo, follower, followed, now)
      })
      .await
  }

  async fn respond_to_follow_request(
    &self,
    relationship: RelationshipId,
    responder: UserId,
    decision: Decision,
  ) -> Result<Relationship> {
    let now = now();
    self
      .transact("respond_to_follow_request", move |repo| {
        relationship::respond_to_follow_request(repo, relationship, responder, decision, now)
      })
      .await
  }

  async fn followers_of(&self, user: UserId) -> Result<Vec<Relationship>> {
    self
      .read(move |repo| relationship::followers_of(repo, user))
      .await
  }

  async fn following_of(&self, user: UserId) -> Result<Vec<Relationship>> {
    self
      .read(move |repo| relationship::following_of(repo, user))
      .await
  }

  // ── Groups ────────────────────────────────────────────────────────────────

  async fn create_group(
    &self,
    creator: UserId,
    title: String,
    description: String,
  ) -> Result<(Group, Membership)> {
    let now = now();
    self
      .transact("create_group", move |repo| {
        membership::create_group(repo, creator, &title, &description, now)
      })
      .await
  }

  async fn invite(&self, group: GroupId, inviter: UserId, invitee: UserId) -> Result<Membership> {
    let now = now();
    self
      .transact("invite", move |repo| {
        membership::invite(repo, group, inviter, invitee, now)
      })
      .await
  }

  async fn request_join(&self, group: GroupId, requester: UserId) -> Result<Membership> {
    let now = now();
    self
      .transact("request_join", move |repo| {
        membership::request_join(repo, group, requester, now)
      })
      .await
  }

  async fn respond_to_membership(
    &self,
    group: GroupId,
    target: UserId,
    acting: UserId,
    decision: Decision,
  ) -> Result<Membership> {
    let now = now();
    self
      .transact("respond_to_membership", move |repo| {
        membership::respond_to_membership(repo, group, target, acting, decision, now)
      })
      .await
  }

  async fn cancel_membership(&self, group: GroupId, member: UserId) -> Result<Membership> {
    let now = now();
    self
      .transact("cancel_membership", move |repo| {
        membership::cancel_membership(repo, group, member, now)
      })
      .await
  }

  async fn members_of(&self, group: GroupId) -> Result<Vec<Membership>> {
    self
      .read(move |repo| membership::members_of(repo, group))
      .await
  }

  // ── Notifications ─────────────────────────────────────────────────────────

  async fn notifications_for(&self, user: UserId) -> Result<Vec<Notification>> {
    self
      .read(move |repo| notification::notifications_for(repo, user))
      .await
  }

  async fn unread_count(&self, user: UserId) -> Result<usize> {
    self.read(move |repo| repo.unread_count(user)).await
  }

  async fn mark_read(&self, user: UserId, id: NotificationId) -> Result<Notification> {
    let now = now();
    self
      .transact("mark_read", move |repo| notification::mark_read(repo, user, id, now))
      .await
  }

  async fn mark_all_read(&self, user: UserId) -> Result<usize> {
    let now = now();
    self
      .transact("mark_all_read", move |repo| {
        notification::mark_all_read(repo, user, now)
      })
      .await
  }

  async fn clear_read(&self, user: UserId) -> Result<usize> {
    let now = now();
    self
      .transact("clear_read", move |repo| notification::clear_read(repo, user, now))
      .await
  }

  // ── Visibility ────────────────────────────────────────────────────────────

  async fn can_view(&self, viewer: UserId, post: PostId) -> Result<bool> {
    self
      .read(move |repo| visibility::can_view_by_id(repo, viewer, post))
      .await
  }

  async fn feed_for(&self, viewer: UserId) -> Result<Vec<Post>> {
    self
      .read(move |repo| visibility::feed_for(repo, viewer))
      .await
  }

  async fn comment_on(&self, post: PostId, commenter: UserId, body: String) -> Result<Comment> {
    let now = now();
    self
      .transact("comment_on", move |repo| {
        visibility::comment_on(repo, post, commenter, &body, now)
      })
      .await
  }

  async fn comments_for(&self, viewer: UserId, post: PostId) -> Result<Vec<Comment>> {
    self
      .read(move |repo| visibility::comments_for(repo, viewer, post))
      .await
  }
}
