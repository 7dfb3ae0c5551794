//! Merged family trees.
//!
//! A [`MergedFamilyTree`] is the persisted snapshot: a name, a creator, and
//! a member user set. The merged graph itself — [`MergedTree`] — is
//! recomputed on demand from the members' ancestors and their confirmed
//! matches, and is never stored.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ─── Persisted snapshot ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MergedFamilyTree {
  pub tree_id:    Uuid,
  pub name:       String,
  pub created_by: Uuid,
  pub member_ids: Vec<Uuid>,
  pub created_at: DateTime<Utc>,
}

// ─── Transient merged graph ──────────────────────────────────────────────────

/// One fact value inside a merged node, tagged with the user whose record
/// contributed it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FactContribution {
  pub value:   String,
  pub user_id: Uuid,
}

/// One story inside a merged node, tagged with its author.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoryContribution {
  pub content: String,
  pub user_id: Uuid,
}

/// A user whose ancestor record was folded into a merged node, with the
/// relation they stated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Contributor {
  pub user_id:  Uuid,
  pub relation: String,
}

/// A cluster of one-or-more ancestor records believed to be the same real
/// person. Scalar fields are first-wins over the members in load order;
/// facts, stories, and photos are unions with per-contributor attribution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MergedNode {
  /// `merged_<root>` for multi-member clusters, `single_<id>` otherwise.
  pub id:           String,
  pub name:         String,
  pub birth_year:   Option<i32>,
  pub death_year:   Option<i32>,
  pub origin:       Option<String>,
  pub facts:        BTreeMap<String, Vec<FactContribution>>,
  pub stories:      Vec<StoryContribution>,
  pub contributors: Vec<Contributor>,
  pub photo_urls:   Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EdgeKind {
  #[serde(rename = "parent-child")]
  ParentChild,
}

/// A directed edge between merged nodes; currently only parent-child links
/// inferred from stated relations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TreeEdge {
  pub from: String,
  pub to:   String,
  #[serde(rename = "type")]
  pub kind: EdgeKind,
}

/// The recomputed merged graph for a member set.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MergedTree {
  pub nodes:    Vec<MergedNode>,
  pub edges:    Vec<TreeEdge>,
  /// Reserved for future grouping by family branch; always empty today.
  pub clusters: BTreeMap<String, Vec<String>>,
}
