//! Core types and trait definitions for the Kin heritage store.
//!
//! This crate is deliberately free of HTTP and database dependencies.
//! All other crates depend on it; it depends on nothing proprietary.

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod ancestor;
pub mod error;
pub mod extraction;
pub mod generate;
pub mod matching;
pub mod profile;
pub mod session;
pub mod store;
pub mod tree;

pub use error::{Error, Result};
