//! Error types for `kin-core`.

use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum Error {
  #[error("ancestor not found: {0}")]
  AncestorNotFound(Uuid),

  #[error("match not found: {0}")]
  MatchNotFound(Uuid),

  #[error("duplicate match for ancestor pair ({0}, {1})")]
  DuplicateMatch(Uuid, Uuid),

  #[error("a match must link two distinct ancestors")]
  SelfMatch,

  #[error("merged tree not found: {0}")]
  TreeNotFound(Uuid),

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
