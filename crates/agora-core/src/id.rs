//! Typed row identifiers. Every id is assigned by the store on insert.

use std::fmt;

use serde::{Deserialize, Serialize};

macro_rules! define_id {
  ($(#[$meta:meta])* $name:ident) => {
    $(#[$meta])*
    #[derive(
      Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize,
      Deserialize,
    )]
    #[serde(transparent)]
    pub struct $name(pub i64);

    impl fmt::Display for $name {
      fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
      }
    }
  };
}

define_id!(UserId);
define_id!(GroupId);
define_id!(RelationshipId);
define_id!(MembershipId);
define_id!(NotificationId);
define_id!(
  /// Feed ordering falls back to ascending `PostId` for equal timestamps.
  PostId
);
define_id!(CommentId);
