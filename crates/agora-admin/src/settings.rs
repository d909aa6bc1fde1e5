//! Operator configuration: an optional TOML file layered with `AGORA_*`
//! environment variables.

use std::path::{Path, PathBuf};

use anyhow::Context as _;
use serde::Deserialize;

/// Runtime configuration, deserialised from `agora.toml`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AdminConfig {
  /// SQLite database file. A leading `~/` is expanded.
  pub store_path: PathBuf,
  /// `tracing_subscriber::EnvFilter` directives, used when `RUST_LOG` is unset.
  pub log_filter: String,
}

impl Default for AdminConfig {
  fn default() -> Self {
    Self {
      store_path: PathBuf::from("agora.db"),
      log_filter: "info".to_string(),
    }
  }
}

impl AdminConfig {
  pub fn load(path: &Path) -> anyhow::Result<Self> {
    let settings = config::Config::builder()
      .add_source(config::File::from(path).required(false))
      .add_source(config::Environment::with_prefix("AGORA"))
      .build()
      .context("failed to read config file")?;

    let mut cfg: Self = settings
      .try_deserialize()
      .context("failed to deserialise AdminConfig")?;
    cfg.store_path = expand_tilde(&cfg.store_path);
    Ok(cfg)
  }
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}
