//! The answer to a pending follow request, invitation, or join request.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use strum::{Display, IntoStaticStr};

use crate::ValidationError;

#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display,
  IntoStaticStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Decision {
  Accept,
  Decline,
}

impl FromStr for Decision {
  type Err = ValidationError;

  /// Accepts both the imperative (`accept`) and past-tense (`accepted`)
  /// spellings clients send.
  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.trim().to_ascii_lowercase().as_str() {
      "accept" | "accepted" => Ok(Self::Accept),
      "decline" | "declined" => Ok(Self::Decline),
      _ => Err(ValidationError::UnknownDecision(s.to_owned())),
    }
  }
}
