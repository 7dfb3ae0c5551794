//! Handler for `GET /heritage` — the full per-user data export.

use std::collections::BTreeMap;

use axum::{
  Json,
  extract::{Query, State},
};
use chrono::{DateTime, Utc};
use kin_core::{generate::TextGenerator, store::HeritageStore};
use serde::Serialize;
use uuid::Uuid;

use crate::{
  AppState,
  ancestors::UserParams,
  error::{ApiError, store_err},
};

#[derive(Debug, Serialize)]
pub struct HeritageUser {
  pub user_id:    Uuid,
  pub first_name: String,
  pub last_name:  String,
}

#[derive(Debug, Serialize)]
pub struct HeritageStory {
  pub content:    String,
  pub context:    Option<String>,
  pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct HeritagePerson {
  pub name:     String,
  pub relation: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub birth_year:  Option<i32>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub death_year:  Option<i32>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub birth_place: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub origin:      Option<String>,
  #[serde(skip_serializing_if = "BTreeMap::is_empty")]
  pub facts:       BTreeMap<String, String>,
  #[serde(skip_serializing_if = "Vec::is_empty")]
  pub stories:     Vec<HeritageStory>,
}

#[derive(Debug, Serialize)]
pub struct HeritageMetadata {
  pub total_ancestors:     usize,
  pub interview_completed: bool,
  pub last_updated:        DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct HeritageSummary {
  pub user:     HeritageUser,
  /// Keyed by the ancestor's user-scoped `unique_id`.
  pub people:   BTreeMap<String, HeritagePerson>,
  pub metadata: HeritageMetadata,
}

/// `GET /heritage?user_id=<id>`
pub async fn summary<S, G>(
  State(state): State<AppState<S, G>>,
  Query(params): Query<UserParams>,
) -> Result<Json<HeritageSummary>, ApiError>
where
  S: HeritageStore,
  G: TextGenerator,
{
  let profile = state
    .store
    .ensure_profile(params.user_id)
    .await
    .map_err(store_err)?;
  let ancestors = state
    .store
    .ancestors_for_user(params.user_id)
    .await
    .map_err(store_err)?;

  let mut people = BTreeMap::new();
  for ancestor in ancestors {
    let facts = state
      .store
      .facts_for_ancestor(ancestor.ancestor_id)
      .await
      .map_err(store_err)?
      .into_iter()
      .map(|f| (f.key, f.value))
      .collect();

    let stories = state
      .store
      .stories_for_ancestor(ancestor.ancestor_id)
      .await
      .map_err(store_err)?
      .into_iter()
      .map(|s| HeritageStory {
        content:    s.content,
        context:    s.context,
        created_at: s.created_at,
      })
      .collect();

    people.insert(ancestor.unique_id, HeritagePerson {
      name: ancestor.name,
      relation: ancestor.relation,
      birth_year: ancestor.birth_year,
      death_year: ancestor.death_year,
      birth_place: ancestor.birth_place,
      origin: ancestor.origin,
      facts,
      stories,
    });
  }

  Ok(Json(HeritageSummary {
    user:     HeritageUser {
      user_id:    profile.user_id,
      first_name: profile.first_name,
      last_name:  profile.last_name,
    },
    metadata: HeritageMetadata {
      total_ancestors:     people.len(),
      interview_completed: profile.interview_completed,
      last_updated:        profile.updated_at,
    },
    people,
  }))
}
