//! Handlers for `/ancestors` and `/tree` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/ancestors?user_id=<id>` | All of one user's ancestors |
//! | `POST` | `/ancestors` | Direct upsert keyed by `(user_id, unique_id)` |
//! | `GET`  | `/ancestors/{id}` | 404 if not found |
//! | `GET`  | `/tree?user_id=<id>` | Flat single-user tree for visualisation |

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use kin_core::{
  ancestor::{Ancestor, NewAncestor},
  generate::TextGenerator,
  store::HeritageStore,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  AppState,
  error::{ApiError, store_err},
};

#[derive(Debug, Deserialize)]
pub struct UserParams {
  pub user_id: Uuid,
}

// ─── List ─────────────────────────────────────────────────────────────────────

/// `GET /ancestors?user_id=<id>`
pub async fn list<S, G>(
  State(state): State<AppState<S, G>>,
  Query(params): Query<UserParams>,
) -> Result<Json<Vec<Ancestor>>, ApiError>
where
  S: HeritageStore,
  G: TextGenerator,
{
  let ancestors = state
    .store
    .ancestors_for_user(params.user_id)
    .await
    .map_err(store_err)?;
  Ok(Json(ancestors))
}

// ─── Create ───────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct CreateBody {
  pub user_id:     Uuid,
  pub unique_id:   String,
  pub name:        String,
  pub relation:    String,
  pub birth_year:  Option<i32>,
  pub death_year:  Option<i32>,
  pub birth_place: Option<String>,
  pub origin:      Option<String>,
}

/// `POST /ancestors` — upsert; 201 when a new record was created.
pub async fn create<S, G>(
  State(state): State<AppState<S, G>>,
  Json(body): Json<CreateBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: HeritageStore,
  G: TextGenerator,
{
  let (ancestor, created) = state
    .store
    .upsert_ancestor(NewAncestor {
      user_id:     body.user_id,
      unique_id:   body.unique_id,
      name:        body.name,
      relation:    body.relation,
      birth_year:  body.birth_year,
      death_year:  body.death_year,
      birth_place: body.birth_place,
      origin:      body.origin,
    })
    .await
    .map_err(store_err)?;

  let status =
    if created { StatusCode::CREATED } else { StatusCode::OK };
  Ok((status, Json(ancestor)))
}

// ─── Get one ──────────────────────────────────────────────────────────────────

/// `GET /ancestors/{id}`
pub async fn get_one<S, G>(
  State(state): State<AppState<S, G>>,
  Path(id): Path<Uuid>,
) -> Result<Json<Ancestor>, ApiError>
where
  S: HeritageStore,
  G: TextGenerator,
{
  let ancestor = state
    .store
    .get_ancestor(id)
    .await
    .map_err(store_err)?
    .ok_or_else(|| ApiError::NotFound(format!("ancestor {id} not found")))?;
  Ok(Json(ancestor))
}

// ─── Flat tree ────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct TreeNode {
  pub id:         String,
  pub name:       String,
  pub relation:   String,
  pub birth_year: Option<i32>,
  pub death_year: Option<i32>,
  pub origin:     Option<String>,
}

#[derive(Debug, Serialize)]
pub struct TreeResponse {
  pub tree:            Vec<TreeNode>,
  pub total_ancestors: usize,
}

/// `GET /tree?user_id=<id>` — one user's ancestors as flat visualisation
/// data. The cross-user merged graph lives under `/merged-trees`.
pub async fn tree<S, G>(
  State(state): State<AppState<S, G>>,
  Query(params): Query<UserParams>,
) -> Result<Json<TreeResponse>, ApiError>
where
  S: HeritageStore,
  G: TextGenerator,
{
  let ancestors = state
    .store
    .ancestors_for_user(params.user_id)
    .await
    .map_err(store_err)?;

  let tree: Vec<TreeNode> = ancestors
    .into_iter()
    .map(|a| TreeNode {
      id:         a.unique_id,
      name:       a.name,
      relation:   a.relation,
      birth_year: a.birth_year,
      death_year: a.death_year,
      origin:     a.origin,
    })
    .collect();

  Ok(Json(TreeResponse { total_ancestors: tree.len(), tree }))
}
