//! Handler for `GET /connections` — users related through confirmed
//! matches.

use axum::{
  Json,
  extract::{Query, State},
};
use kin_core::{generate::TextGenerator, store::HeritageStore};
use kin_engine::matcher::{ConnectionHint, FamilyMatcher};

use crate::{AppState, ancestors::UserParams, error::ApiError};

/// `GET /connections?user_id=<id>`
pub async fn list<S, G>(
  State(state): State<AppState<S, G>>,
  Query(params): Query<UserParams>,
) -> Result<Json<Vec<ConnectionHint>>, ApiError>
where
  S: HeritageStore,
  G: TextGenerator,
{
  let matcher = FamilyMatcher::new(state.store.clone());
  let hints = matcher.find_family_connections(params.user_id).await?;
  Ok(Json(hints))
}
