//! Cross-user ancestor matching.
//!
//! For each ancestor a user has described, scan every other user's
//! ancestors for records that plausibly describe the same real person.
//! Name similarity is a hard gate; birth year, origin, and birth place
//! contribute additional confidence factors only when present on both
//! sides. Accepted candidates are persisted as review-pending
//! [`AncestorMatch`] rows — a human confirms or rejects them later.
//!
//! The scan is a full O(U·V) comparison across the other users' ancestors.
//! Acceptable at expected data scale; revisit before the ancestor table
//! grows past memory.

use std::{collections::HashMap, sync::Arc};

use kin_core::{
  ancestor::Ancestor,
  matching::{
    AncestorMatch, FamilyConnection, MatchStatus, MatchingAttributes,
    NewAncestorMatch, NewFamilyConnection, YearProximity,
  },
  store::HeritageStore,
};
use serde::Serialize;
use uuid::Uuid;

use crate::{
  Error, Result, kinship::infer_user_relationship, similarity::similarity,
};

/// Default hard gate on name similarity.
pub const NAME_SIMILARITY_THRESHOLD: f64 = 0.85;
/// Default acceptance threshold on overall confidence.
pub const MATCH_CONFIDENCE_THRESHOLD: f64 = 0.7;
/// Origin and birth-place similarities only count above this bar.
const PLACE_SIMILARITY_BAR: f64 = 0.8;

// ─── Candidate types ─────────────────────────────────────────────────────────

/// A scored candidate: another user's ancestor that may be the same person.
#[derive(Debug, Clone, Serialize)]
pub struct MatchCandidate {
  pub ancestor:            Ancestor,
  pub confidence:          f64,
  pub matching_attributes: MatchingAttributes,
}

/// One shared ancestor backing a [`ConnectionHint`], seen from the querying
/// user's side.
#[derive(Debug, Clone, Serialize)]
pub struct SharedAncestor {
  pub name:              String,
  pub relation_to_user:  String,
  pub relation_to_other: String,
}

/// Another user who appears related, with the confirmed matches that say
/// so.
#[derive(Debug, Clone, Serialize)]
pub struct ConnectionHint {
  pub user_id:            Uuid,
  pub shared_ancestors:   Vec<SharedAncestor>,
  pub relationship_hints: Vec<&'static str>,
}

// ─── Matcher ─────────────────────────────────────────────────────────────────

/// Finds potential family connections between users.
pub struct FamilyMatcher<S> {
  store: Arc<S>,
  pub name_similarity_threshold:  f64,
  pub match_confidence_threshold: f64,
}

impl<S> FamilyMatcher<S>
where
  S: HeritageStore,
{
  pub fn new(store: Arc<S>) -> Self {
    Self {
      store,
      name_similarity_threshold: NAME_SIMILARITY_THRESHOLD,
      match_confidence_threshold: MATCH_CONFIDENCE_THRESHOLD,
    }
  }

  /// Score one candidate pair. `None` when the name gate fails or overall
  /// confidence lands below the acceptance threshold.
  fn score_pair(
    &self,
    ancestor: &Ancestor,
    other: &Ancestor,
  ) -> Option<(f64, MatchingAttributes)> {
    let name_sim = similarity(&ancestor.name, &other.name);
    if name_sim < self.name_similarity_threshold {
      return None;
    }

    let mut attrs = MatchingAttributes::default();
    // Name similarity is always a factor; the rest join only when the
    // attribute is present on both sides and agrees.
    let mut factors = vec![name_sim];

    if let (Some(y1), Some(y2)) = (ancestor.birth_year, other.birth_year) {
      let diff = (y1 - y2).abs();
      if diff <= 2 {
        attrs.birth_year = Some(YearProximity::Exact);
        factors.push(1.0);
      } else if diff <= 5 {
        attrs.birth_year = Some(YearProximity::Close);
        factors.push(0.5);
      }
    }

    if let (Some(o1), Some(o2)) = (&ancestor.origin, &other.origin) {
      let origin_sim = similarity(o1, o2);
      if origin_sim > PLACE_SIMILARITY_BAR {
        attrs.origin = Some(origin_sim);
        factors.push(origin_sim);
      }
    }

    if let (Some(p1), Some(p2)) = (&ancestor.birth_place, &other.birth_place)
    {
      let place_sim = similarity(p1, p2);
      if place_sim > PLACE_SIMILARITY_BAR {
        attrs.birth_place = Some(place_sim);
        factors.push(place_sim);
      }
    }

    let confidence = factors.iter().sum::<f64>() / factors.len() as f64;

    (confidence >= self.match_confidence_threshold)
      .then_some((confidence, attrs))
  }

  /// Candidate matches for one ancestor among all *other* users'
  /// ancestors, sorted by descending confidence.
  pub async fn find_matching_ancestors(
    &self,
    ancestor: &Ancestor,
  ) -> Result<Vec<MatchCandidate>> {
    let others = self
      .store
      .ancestors_excluding_user(ancestor.user_id)
      .await
      .map_err(Error::store)?;

    let mut candidates: Vec<MatchCandidate> = others
      .into_iter()
      .filter_map(|other| {
        self.score_pair(ancestor, &other).map(
          |(confidence, matching_attributes)| MatchCandidate {
            ancestor: other,
            confidence,
            matching_attributes,
          },
        )
      })
      .collect();

    candidates.sort_by(|x, y| y.confidence.total_cmp(&x.confidence));
    Ok(candidates)
  }

  /// Run the scan for every ancestor of `user_id` and persist each accepted
  /// candidate that has no existing match row (looked up in either pairing
  /// order) as a `suggested` match. Returns the newly created rows.
  ///
  /// Idempotent over an unchanged dataset. Two concurrent runs can race
  /// past each other's existence checks; that duplicate is accepted since
  /// human confirmation still gates everything downstream.
  pub async fn suggest_matches_for_user(
    &self,
    user_id: Uuid,
  ) -> Result<Vec<AncestorMatch>> {
    let user_ancestors = self
      .store
      .ancestors_for_user(user_id)
      .await
      .map_err(Error::store)?;

    let mut created = Vec::new();
    for ancestor in &user_ancestors {
      for candidate in self.find_matching_ancestors(ancestor).await? {
        let existing = self
          .store
          .find_match_between(
            ancestor.ancestor_id,
            candidate.ancestor.ancestor_id,
          )
          .await
          .map_err(Error::store)?;
        if existing.is_some() {
          continue;
        }

        let stored = self
          .store
          .insert_match(NewAncestorMatch {
            ancestor_a:          ancestor.ancestor_id,
            ancestor_b:          candidate.ancestor.ancestor_id,
            confidence:          candidate.confidence,
            matching_attributes: candidate.matching_attributes,
            status:              MatchStatus::Suggested,
          })
          .await
          .map_err(Error::store)?;

        tracing::info!(
          match_id = %stored.match_id,
          confidence = stored.confidence,
          "suggested ancestor match"
        );
        created.push(stored);
      }
    }

    Ok(created)
  }

  /// Other users related to `user_id` through confirmed matches, each with
  /// the shared ancestors and relationship hints backing the connection.
  pub async fn find_family_connections(
    &self,
    user_id: Uuid,
  ) -> Result<Vec<ConnectionHint>> {
    let matches = self
      .store
      .matches_for_user(user_id)
      .await
      .map_err(Error::store)?;

    let mut hints: Vec<ConnectionHint> = Vec::new();
    let mut by_user: HashMap<Uuid, usize> = HashMap::new();

    for m in matches.iter().filter(|m| m.status == MatchStatus::Confirmed) {
      let a = self.load_ancestor(m.ancestor_a).await?;
      let b = self.load_ancestor(m.ancestor_b).await?;
      let (mine, theirs) =
        if a.user_id == user_id { (a, b) } else { (b, a) };

      let slot = *by_user.entry(theirs.user_id).or_insert_with(|| {
        hints.push(ConnectionHint {
          user_id:            theirs.user_id,
          shared_ancestors:   Vec::new(),
          relationship_hints: Vec::new(),
        });
        hints.len() - 1
      });

      let hint = &mut hints[slot];
      hint.relationship_hints.push(infer_user_relationship(
        &mine.relation,
        &theirs.relation,
      ));
      hint.shared_ancestors.push(SharedAncestor {
        name:              mine.name,
        relation_to_user:  mine.relation,
        relation_to_other: theirs.relation,
      });
    }

    Ok(hints)
  }

  /// Record a pending connection between two users. Get-or-create on the
  /// canonical user pair; an existing connection is returned unchanged.
  pub async fn create_family_connection(
    &self,
    user_a: Uuid,
    user_b: Uuid,
    connection_type: &str,
    shared_ancestor_name: &str,
    confidence: f64,
  ) -> Result<FamilyConnection> {
    let (connection, _created) = self
      .store
      .upsert_family_connection(NewFamilyConnection {
        user_a,
        user_b,
        connection_type: connection_type.to_string(),
        shared_ancestor_name: shared_ancestor_name.to_string(),
        confidence,
      })
      .await
      .map_err(Error::store)?;
    Ok(connection)
  }

  async fn load_ancestor(&self, id: Uuid) -> Result<Ancestor> {
    self
      .store
      .get_ancestor(id)
      .await
      .map_err(Error::store)?
      .ok_or(Error::AncestorNotFound(id))
  }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
