//! Handlers for `/matches` endpoints — the cross-user matcher surface.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/matches/scan` | Run the matcher for a user; returns new suggestions |
//! | `GET`  | `/matches?user_id=<id>` | All matches touching the user |
//! | `POST` | `/matches/{id}/confirm` | Review action |
//! | `POST` | `/matches/{id}/reject`  | Review action |

use axum::{
  Json,
  extract::{Path, Query, State},
};
use kin_core::{
  generate::TextGenerator,
  matching::{AncestorMatch, MatchStatus},
  store::HeritageStore,
};
use kin_engine::matcher::FamilyMatcher;
use serde::Deserialize;
use uuid::Uuid;

use crate::{
  AppState,
  ancestors::UserParams,
  error::{ApiError, store_err},
};

// ─── Scan ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ScanBody {
  pub user_id: Uuid,
}

/// `POST /matches/scan` — scan all other users' ancestors and persist new
/// suggestions.
pub async fn scan<S, G>(
  State(state): State<AppState<S, G>>,
  Json(body): Json<ScanBody>,
) -> Result<Json<Vec<AncestorMatch>>, ApiError>
where
  S: HeritageStore,
  G: TextGenerator,
{
  let matcher = FamilyMatcher::new(state.store.clone());
  let created = matcher.suggest_matches_for_user(body.user_id).await?;
  Ok(Json(created))
}

// ─── List ─────────────────────────────────────────────────────────────────────

/// `GET /matches?user_id=<id>`
pub async fn list<S, G>(
  State(state): State<AppState<S, G>>,
  Query(params): Query<UserParams>,
) -> Result<Json<Vec<AncestorMatch>>, ApiError>
where
  S: HeritageStore,
  G: TextGenerator,
{
  let matches = state
    .store
    .matches_for_user(params.user_id)
    .await
    .map_err(store_err)?;
  Ok(Json(matches))
}

// ─── Review actions ───────────────────────────────────────────────────────────

async fn transition<S, G>(
  state: &AppState<S, G>,
  match_id: Uuid,
  status: MatchStatus,
) -> Result<Json<AncestorMatch>, ApiError>
where
  S: HeritageStore,
  G: TextGenerator,
{
  state
    .store
    .get_match(match_id)
    .await
    .map_err(store_err)?
    .ok_or_else(|| ApiError::NotFound(format!("match {match_id} not found")))?;

  let updated = state
    .store
    .set_match_status(match_id, status)
    .await
    .map_err(store_err)?;
  Ok(Json(updated))
}

/// `POST /matches/{id}/confirm`
pub async fn confirm<S, G>(
  State(state): State<AppState<S, G>>,
  Path(id): Path<Uuid>,
) -> Result<Json<AncestorMatch>, ApiError>
where
  S: HeritageStore,
  G: TextGenerator,
{
  transition(&state, id, MatchStatus::Confirmed).await
}

/// `POST /matches/{id}/reject`
pub async fn reject<S, G>(
  State(state): State<AppState<S, G>>,
  Path(id): Path<Uuid>,
) -> Result<Json<AncestorMatch>, ApiError>
where
  S: HeritageStore,
  G: TextGenerator,
{
  transition(&state, id, MatchStatus::Rejected).await
}
