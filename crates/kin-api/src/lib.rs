//! JSON REST API for Kin.
//!
//! Exposes an axum [`Router`] backed by any
//! [`kin_core::store::HeritageStore`] and any
//! [`kin_core::generate::TextGenerator`]. Auth, TLS, and transport
//! concerns are the caller's responsibility; every endpoint takes the
//! acting user id explicitly.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", kin_api::router(state))
//! ```

pub mod ancestors;
pub mod connections;
pub mod error;
pub mod gemini;
pub mod guide;
pub mod heritage;
pub mod interview;
pub mod matches;
pub mod trees;

use std::{path::PathBuf, sync::Arc};

use axum::{
  Router,
  routing::{get, post},
};
use kin_core::{generate::TextGenerator, store::HeritageStore};
use serde::Deserialize;
use tower_http::trace::TraceLayer;

pub use error::ApiError;

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml`.
#[derive(Deserialize, Clone)]
pub struct ServerConfig {
  pub host:           String,
  pub port:           u16,
  pub store_path:     PathBuf,
  pub gemini_api_key: String,
  #[serde(default = "default_gemini_model")]
  pub gemini_model:   String,
}

fn default_gemini_model() -> String { "gemini-2.0-flash".to_string() }

// ─── Application state ────────────────────────────────────────────────────────

/// Shared state threaded through all axum handlers.
pub struct AppState<S, G> {
  pub store:     Arc<S>,
  pub generator: Arc<G>,
}

// Manual impl: the derive would needlessly require `S: Clone, G: Clone`.
impl<S, G> Clone for AppState<S, G> {
  fn clone(&self) -> Self {
    Self {
      store:     self.store.clone(),
      generator: self.generator.clone(),
    }
  }
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build a fully-materialised API router for `state`.
pub fn router<S, G>(state: AppState<S, G>) -> Router
where
  S: HeritageStore + 'static,
  G: TextGenerator + 'static,
{
  Router::new()
    // Interview
    .route("/interview/start", post(interview::start::<S, G>))
    .route("/interview/message", post(interview::message::<S, G>))
    .route("/interview/complete", post(interview::complete::<S, G>))
    // Heritage data
    .route("/heritage", get(heritage::summary::<S, G>))
    .route(
      "/ancestors",
      get(ancestors::list::<S, G>).post(ancestors::create::<S, G>),
    )
    .route("/ancestors/{id}", get(ancestors::get_one::<S, G>))
    .route("/tree", get(ancestors::tree::<S, G>))
    // Matching
    .route("/matches/scan", post(matches::scan::<S, G>))
    .route("/matches", get(matches::list::<S, G>))
    .route("/matches/{id}/confirm", post(matches::confirm::<S, G>))
    .route("/matches/{id}/reject", post(matches::reject::<S, G>))
    .route("/connections", get(connections::list::<S, G>))
    // Merged trees
    .route("/merged-trees", post(trees::create::<S, G>))
    .route("/merged-trees/{id}", get(trees::get_one::<S, G>))
    .route("/merged-trees/{id}/graph", get(trees::graph::<S, G>))
    .layer(TraceLayer::new_for_http())
    .with_state(state)
}
