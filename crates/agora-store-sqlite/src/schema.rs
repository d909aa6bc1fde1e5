//! SQL schema for the Agora SQLite store.
//!
//! Executed once at connection startup. `PRAGMA user_version` records the
//! schema revision so later migrations can be gated on it.

/// Full schema DDL; idempotent thanks to `CREATE ... IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS users (
    user_id      INTEGER PRIMARY KEY,
    external_id  TEXT NOT NULL UNIQUE,
    display_name TEXT NOT NULL,
    privacy      TEXT NOT NULL,                   -- 'public' | 'private'
    status       TEXT NOT NULL DEFAULT 'active',  -- 'active' | 'inactive'
    created_at   TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS user_groups (
    group_id    INTEGER PRIMARY KEY,
    creator_id  INTEGER NOT NULL REFERENCES users(user_id),
    title       TEXT NOT NULL,
    description TEXT NOT NULL DEFAULT '',
    created_at  TEXT NOT NULL
);

-- One row per ordered pair; rows are updated in place, never deleted.
CREATE TABLE IF NOT EXISTS relationships (
    relationship_id INTEGER PRIMARY KEY,
    follower_id     INTEGER NOT NULL REFERENCES users(user_id),
    followed_id     INTEGER NOT NULL REFERENCES users(user_id),
    status          TEXT NOT NULL,
    created_at      TEXT NOT NULL,
    updated_at      TEXT NOT NULL,
    updated_by      INTEGER NOT NULL REFERENCES users(user_id),
    UNIQUE (follower_id, followed_id),
    CHECK  (follower_id != followed_id)
);

CREATE TABLE IF NOT EXISTS memberships (
    membership_id      INTEGER PRIMARY KEY,
    group_id           INTEGER NOT NULL REFERENCES user_groups(group_id),
    member_id          INTEGER NOT NULL REFERENCES users(user_id),
    inviter_id         INTEGER REFERENCES users(user_id),
    inviter_is_creator INTEGER NOT NULL DEFAULT 0,
    status             TEXT NOT NULL,
    created_at         TEXT NOT NULL,
    updated_at         TEXT NOT NULL,
    UNIQUE (group_id, member_id)
);

-- parent_id points into relationships, memberships or posts depending on
-- parent_type, so it carries no foreign key.
CREATE TABLE IF NOT EXISTS notifications (
    notification_id INTEGER PRIMARY KEY,
    receiver_id     INTEGER NOT NULL REFERENCES users(user_id),
    actor_id        INTEGER NOT NULL REFERENCES users(user_id),
    action          TEXT NOT NULL,
    parent_type     TEXT NOT NULL,
    parent_id       INTEGER NOT NULL,
    content         TEXT NOT NULL,
    status          TEXT NOT NULL DEFAULT 'unread',
    created_at      TEXT NOT NULL,
    updated_at      TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS posts (
    post_id    INTEGER PRIMARY KEY,
    poster_id  INTEGER NOT NULL REFERENCES users(user_id),
    group_id   INTEGER REFERENCES user_groups(group_id),
    privacy    TEXT NOT NULL,                   -- 'public' | 'semi-private' | 'private'
    status     TEXT NOT NULL DEFAULT 'active',
    body       TEXT NOT NULL,
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS post_viewers (
    post_id   INTEGER NOT NULL REFERENCES posts(post_id),
    viewer_id INTEGER NOT NULL REFERENCES users(user_id),
    PRIMARY KEY (post_id, viewer_id)
);

CREATE TABLE IF NOT EXISTS comments (
    comment_id   INTEGER PRIMARY KEY,
    post_id      INTEGER NOT NULL REFERENCES posts(post_id),
    commenter_id INTEGER NOT NULL REFERENCES users(user_id),
    body         TEXT NOT NULL,
    status       TEXT NOT NULL DEFAULT 'active',
    created_at   TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS relationships_followed_idx ON relationships(followed_id, status);
CREATE INDEX IF NOT EXISTS memberships_group_idx      ON memberships(group_id, status);
CREATE INDEX IF NOT EXISTS notifications_receiver_idx ON notifications(receiver_id, status);
CREATE INDEX IF NOT EXISTS notifications_parent_idx   ON notifications(parent_type, parent_id);
CREATE INDEX IF NOT EXISTS posts_created_idx          ON posts(created_at);
CREATE INDEX IF NOT EXISTS comments_post_idx          ON comments(post_id);

PRAGMA user_version = 1;
";
