//! `agora` operator binary.
//!
//! Reads `agora.toml` (or the path given with `--config`), opens the SQLite
//! store and runs a single operation, printing the result as JSON. Actor ids
//! on the command line are trusted as already authenticated.
//!
//! ```text
//! agora add-user alice --private
//! agora follow 2 1
//! agora respond-follow 1 1 accept
//! agora notifications 2
//! ```

mod settings;

use std::path::PathBuf;

use agora_core::{
  decision::Decision,
  id::{GroupId, NotificationId, PostId, RelationshipId, UserId},
  post::{NewPost, PostPrivacy},
  store::SocialStore,
  user::{NewUser, Privacy},
};
use agora_store_sqlite::SqliteStore;
use anyhow::Context as _;
use clap::{Parser, Subcommand};
use serde::Serialize;
use serde_json::json;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use crate::settings::AdminConfig;

#[derive(Parser)]
#[command(author, version, about = "Agora social graph administration")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "agora.toml")]
  config: PathBuf,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand)]
enum Command {
  // ── Seeding ───────────────────────────────────────────────────────────────
  /// Create a user.
  AddUser {
    name:    String,
    /// Follow requests to this user need approval.
    #[arg(long)]
    private: bool,
  },
  /// Create a post. Gated posts are visible to `--viewer` users only.
  AddPost {
    poster:  i64,
    body:    String,
    /// public, semi-private or private.
    #[arg(long, default_value = "public")]
    privacy: PostPrivacy,
    #[arg(long)]
    group:   Option<i64>,
    #[arg(long = "viewer")]
    viewers: Vec<i64>,
  },
  /// Show a user by internal id.
  User { id: i64 },
  /// Show a user by external id.
  Lookup { external_id: Uuid },

  // ── Relationships ─────────────────────────────────────────────────────────
  Follow { follower: i64, followed: i64 },
  Unfollow { follower: i64, followed: i64 },
  /// Accept or decline a pending follow request.
  RespondFollow {
    relationship: i64,
    responder:    i64,
    decision:     Decision,
  },
  Followers { user: i64 },
  Following { user: i64 },

  // ── Groups ────────────────────────────────────────────────────────────────
  CreateGroup {
    creator:     i64,
    title:       String,
    #[arg(long, default_value = "")]
    description: String,
  },
  Invite { group: i64, inviter: i64, invitee: i64 },
  RequestJoin { group: i64, requester: i64 },
  /// Answer an invitation (as the invitee) or a join request (as the creator).
  RespondMembership {
    group:    i64,
    target:   i64,
    acting:   i64,
    decision: Decision,
  },
  /// Withdraw an invitation or request, or leave a group.
  Leave { group: i64, member: i64 },
  Members { group: i64 },

  // ── Notifications ─────────────────────────────────────────────────────────
  Notifications { user: i64 },
  Unread { user: i64 },
  MarkRead { user: i64, notification: i64 },
  MarkAllRead { user: i64 },
  ClearRead { user: i64 },

  // ── Visibility ────────────────────────────────────────────────────────────
  CanView { viewer: i64, post: i64 },
  Feed { viewer: i64 },
  Comment { post: i64, commenter: i64, body: String },
  Comments { viewer: i64, post: i64 },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  let cli = Cli::parse();
  let cfg = AdminConfig::load(&cli.config)?;

  tracing_subscriber::fmt()
    .with_writer(std::io::stderr)
    .with_env_filter(
      EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&cfg.log_filter)),
    )
    .init();
  tracing::debug!(config = ?cfg, "loaded configuration");

  let store = SqliteStore::open(&cfg.store_path)
    .await
    .with_context(|| format!("failed to open store at {:?}", cfg.store_path))?;

  run(&store, cli.command).await
}

async fn run(store: &SqliteStore, command: Command) -> anyhow::Result<()> {
  match command {
    Command::AddUser { name, private } => {
      let privacy = if private { Privacy::Private } else { Privacy::Public };
      emit(&store.add_user(NewUser::new(name, privacy)).await?)
    }
    Command::AddPost { poster, body, privacy, group, viewers } => {
      let mut post = NewPost::new(UserId(poster), privacy, body);
      post.group_id = group.map(GroupId);
      post.viewers = viewers.into_iter().map(UserId).collect();
      emit(&store.add_post(post).await?)
    }
    Command::User { id } => emit(&store.user(UserId(id)).await?),
    Command::Lookup { external_id } => {
      emit(&store.user_by_external_id(external_id).await?)
    }

    Command::Follow { follower, followed } => emit(
      &store
        .request_follow(UserId(follower), UserId(followed))
        .await
        .context("follow failed")?,
    ),
    Command::Unfollow { follower, followed } => emit(
      &store
        .cancel_follow(UserId(follower), UserId(followed))
        .await
        .context("unfollow failed")?,
    ),
    Command::RespondFollow { relationship, responder, decision } => emit(
      &store
        .respond_to_follow_request(
          RelationshipId(relationship),
          UserId(responder),
          decision,
        )
        .await
        .context("response failed")?,
    ),
    Command::Followers { user } => emit(&store.followers_of(UserId(user)).await?),
    Command::Following { user } => emit(&store.following_of(UserId(user)).await?),

    Command::CreateGroup { creator, title, description } => {
      let (group, membership) = store
        .create_group(UserId(creator), title, description)
        .await
        .context("group creation failed")?;
      emit(&json!({ "group": group, "membership": membership }))
    }
    Command::Invite { group, inviter, invitee } => emit(
      &store
        .invite(GroupId(group), UserId(inviter), UserId(invitee))
        .await
        .context("invitation failed")?,
    ),
    Command::RequestJoin { group, requester } => emit(
      &store
        .request_join(GroupId(group), UserId(requester))
        .await
        .context("join request failed")?,
    ),
    Command::RespondMembership { group, target, acting, decision } => emit(
      &store
        .respond_to_membership(GroupId(group), UserId(target), UserId(acting), decision)
        .await
        .context("response failed")?,
    ),
    Command::Leave { group, member } => emit(
      &store
        .cancel_membership(GroupId(group), UserId(member))
        .await
        .context("cancellation failed")?,
    ),
    Command::Members { group } => emit(&store.members_of(GroupId(group)).await?),

    Command::Notifications { user } => {
      emit(&store.notifications_for(UserId(user)).await?)
    }
    Command::Unread { user } => {
      emit(&json!({ "unread": store.unread_count(UserId(user)).await? }))
    }
    Command::MarkRead { user, notification } => emit(
      &store
        .mark_read(UserId(user), NotificationId(notification))
        .await?,
    ),
    Command::MarkAllRead { user } => {
      emit(&json!({ "marked": store.mark_all_read(UserId(user)).await? }))
    }
    Command::ClearRead { user } => {
      emit(&json!({ "cleared": store.clear_read(UserId(user)).await? }))
    }

    Command::CanView { viewer, post } => emit(&json!({
      "visible": store.can_view(UserId(viewer), PostId(post)).await?,
    })),
    Command::Feed { viewer } => emit(&store.feed_for(UserId(viewer)).await?),
    Command::Comment { post, commenter, body } => emit(
      &store
        .comment_on(PostId(post), UserId(commenter), body)
        .await
        .context("comment failed")?,
    ),
    Command::Comments { viewer, post } => {
      emit(&store.comments_for(UserId(viewer), PostId(post)).await?)
    }
  }
}

fn emit<T: Serialize>(value: &T) -> anyhow::Result<()> {
  println!("{}", serde_json::to_string_pretty(value)?);
  Ok(())
}
