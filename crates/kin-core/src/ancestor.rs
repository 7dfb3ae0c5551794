//! Ancestor records — the fundamental unit of a user's family saga.
//!
//! An ancestor always belongs to exactly one user and is addressed within
//! that user's namespace by a `unique_id` (e.g. `bjorn_grandfather`) chosen
//! at extraction time. Ancestors are created by tag extraction or the direct
//! API, mutated by later FACT tags, and never deleted by this pipeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ─── Ancestor ────────────────────────────────────────────────────────────────

/// One relative, living or deceased, as described by one user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ancestor {
  pub ancestor_id: Uuid,
  /// The owning user. Never shared; cross-user identity is expressed with
  /// [`crate::matching::AncestorMatch`] links instead.
  pub user_id:     Uuid,
  /// User-scoped identifier, unique per `(user_id, unique_id)`.
  pub unique_id:   String,
  pub name:        String,
  /// Free-text relation to the owning user, e.g. "grandfather", "aunt".
  pub relation:    String,
  pub birth_year:  Option<i32>,
  pub death_year:  Option<i32>,
  pub birth_place: Option<String>,
  pub origin:      Option<String>,
  pub created_at:  DateTime<Utc>,
  pub updated_at:  DateTime<Utc>,
}

/// Input to [`crate::store::HeritageStore::upsert_ancestor`].
#[derive(Debug, Clone)]
pub struct NewAncestor {
  pub user_id:     Uuid,
  pub unique_id:   String,
  pub name:        String,
  pub relation:    String,
  pub birth_year:  Option<i32>,
  pub death_year:  Option<i32>,
  pub birth_place: Option<String>,
  pub origin:      Option<String>,
}

// ─── Structured fields ───────────────────────────────────────────────────────

/// The four ancestor attributes with dedicated columns. A FACT tag whose key
/// names one of these overwrites the column instead of writing a generic
/// fact row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StructuredField {
  BirthYear,
  DeathYear,
  BirthPlace,
  Origin,
}

impl StructuredField {
  pub fn from_key(key: &str) -> Option<Self> {
    match key {
      "birth_year" => Some(Self::BirthYear),
      "death_year" => Some(Self::DeathYear),
      "birth_place" => Some(Self::BirthPlace),
      "origin" => Some(Self::Origin),
      _ => None,
    }
  }
}

// ─── Facts ───────────────────────────────────────────────────────────────────

/// A key/value attribute on an ancestor not covered by the structured
/// fields (e.g. `occupation`, `hair_color`). Upserted on `(ancestor, key)`,
/// last write wins.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AncestorFact {
  pub fact_id:     Uuid,
  pub ancestor_id: Uuid,
  pub key:         String,
  pub value:       String,
  pub created_at:  DateTime<Utc>,
}

// ─── Stories ─────────────────────────────────────────────────────────────────

/// A narrative about an ancestor, authored by one user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Story {
  pub story_id:    Uuid,
  pub ancestor_id: Uuid,
  /// The authoring user (may differ from the ancestor's owner once trees
  /// are shared).
  pub user_id:     Uuid,
  pub content:     String,
  pub context:     Option<String>,
  pub created_at:  DateTime<Utc>,
}

/// Input to [`crate::store::HeritageStore::add_story`].
#[derive(Debug, Clone)]
pub struct NewStory {
  pub ancestor_id: Uuid,
  pub user_id:     Uuid,
  pub content:     String,
  pub context:     Option<String>,
}

// ─── Media ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
  Photo,
  Document,
  Video,
  Audio,
}

/// A media object attached to an ancestor. Only the URL is stored; the
/// bytes live in object storage outside this pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AncestorMedia {
  pub media_id:    Uuid,
  pub ancestor_id: Uuid,
  pub user_id:     Uuid,
  pub url:         String,
  pub media_type:  MediaType,
  pub title:       Option<String>,
  pub uploaded_at: DateTime<Utc>,
}

/// Input to [`crate::store::HeritageStore::add_media`].
#[derive(Debug, Clone)]
pub struct NewMedia {
  pub ancestor_id: Uuid,
  pub user_id:     Uuid,
  pub url:         String,
  pub media_type:  MediaType,
  pub title:       Option<String>,
}
