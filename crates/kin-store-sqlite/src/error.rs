//! Error type for `kin-store-sqlite`.

use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum Error {
  #[error("core error: {0}")]
  Core(#[from] kin_core::Error),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  #[error("uuid parse error: {0}")]
  Uuid(#[from] uuid::Error),

  #[error("decode error: {0}")]
  Decode(String),

  #[error("ancestor not found: {0}")]
  AncestorNotFound(Uuid),

  #[error("match not found: {0}")]
  MatchNotFound(Uuid),

  /// A match for this ancestor pair already exists (in either order; pairs
  /// are stored canonically).
  #[error("duplicate match for ancestor pair ({0}, {1})")]
  DuplicateMatch(Uuid, Uuid),

  #[error("a match must link two distinct ancestors")]
  SelfMatch,
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
