//! Handlers for `/merged-trees` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/merged-trees` | Persist a named member-set snapshot |
//! | `GET`  | `/merged-trees/{id}` | The snapshot record |
//! | `GET`  | `/merged-trees/{id}/graph` | Recompute the merged graph |

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use kin_core::{
  generate::TextGenerator,
  store::HeritageStore,
  tree::{MergedFamilyTree, MergedTree},
};
use kin_engine::merge::TreeMerger;
use serde::Deserialize;
use uuid::Uuid;

use crate::{
  AppState,
  error::{ApiError, store_err},
};

// ─── Create ───────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct CreateBody {
  pub name:       String,
  pub created_by: Uuid,
  pub member_ids: Vec<Uuid>,
}

/// `POST /merged-trees`
pub async fn create<S, G>(
  State(state): State<AppState<S, G>>,
  Json(body): Json<CreateBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: HeritageStore,
  G: TextGenerator,
{
  if body.member_ids.is_empty() {
    return Err(ApiError::BadRequest(
      "a merged tree needs at least one member".into(),
    ));
  }

  let merger = TreeMerger::new(state.store.clone(), body.member_ids);
  let tree = merger.save_merged_tree(&body.name, body.created_by).await?;
  Ok((StatusCode::CREATED, Json(tree)))
}

// ─── Get one ──────────────────────────────────────────────────────────────────

/// `GET /merged-trees/{id}`
pub async fn get_one<S, G>(
  State(state): State<AppState<S, G>>,
  Path(id): Path<Uuid>,
) -> Result<Json<MergedFamilyTree>, ApiError>
where
  S: HeritageStore,
  G: TextGenerator,
{
  let tree = state
    .store
    .get_merged_tree(id)
    .await
    .map_err(store_err)?
    .ok_or_else(|| ApiError::NotFound(format!("merged tree {id} not found")))?;
  Ok(Json(tree))
}

// ─── Graph ────────────────────────────────────────────────────────────────────

/// `GET /merged-trees/{id}/graph` — recompute the deduplicated graph for
/// the snapshot's member set.
pub async fn graph<S, G>(
  State(state): State<AppState<S, G>>,
  Path(id): Path<Uuid>,
) -> Result<Json<MergedTree>, ApiError>
where
  S: HeritageStore,
  G: TextGenerator,
{
  let snapshot = state
    .store
    .get_merged_tree(id)
    .await
    .map_err(store_err)?
    .ok_or_else(|| ApiError::NotFound(format!("merged tree {id} not found")))?;

  let merger = TreeMerger::new(state.store.clone(), snapshot.member_ids);
  let graph = merger.build_merged_tree().await?;
  Ok(Json(graph))
}
