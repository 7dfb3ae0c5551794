//! Compute services over the heritage store.
//!
//! Everything here is synchronous request/response work: score name
//! similarity, propose cross-user ancestor matches, infer how two users
//! relate, and fold confirmed matches into a deduplicated merged tree.
//! Services are generic over [`kin_core::store::HeritageStore`]; they
//! perform reads plus (for the matcher) idempotent inserts guarded by an
//! existence check, and nothing else.

pub mod error;
pub mod kinship;
pub mod matcher;
pub mod merge;
pub mod similarity;

pub use error::{Error, Result};
