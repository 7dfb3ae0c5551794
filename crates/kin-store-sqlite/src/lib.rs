//! SQLite backend for the Kin heritage store.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated
//! thread pool without blocking the async runtime. The extraction adapter
//! (`apply_extraction`) runs inside a single SQLite transaction — one
//! generated message either lands completely or not at all.

mod encode;
mod schema;
mod store;

pub mod error;

pub use error::{Error, Result};
pub use store::SqliteStore;

#[cfg(test)]
mod tests;
