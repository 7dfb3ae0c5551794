//! Cross-user match links.
//!
//! An [`AncestorMatch`] asserts that two ancestor records (in practice owned
//! by different users) describe the same real person. A
//! [`FamilyConnection`] asserts that two users are related. Both store their
//! pair canonically — lower identifier first — so a pair is unique
//! regardless of discovery order.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Order a pair so the lower id comes first. Both match and connection
/// rows store pairs this way; looking a pair up in "either order" is then a
/// single canonical lookup.
pub fn canonical_pair(a: Uuid, b: Uuid) -> (Uuid, Uuid) {
  if a <= b { (a, b) } else { (b, a) }
}

// ─── Ancestor matches ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchStatus {
  Suggested,
  Confirmed,
  Rejected,
}

/// Which attributes agreed when the matcher scored a pair. Absent fields
/// contributed no confidence factor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum YearProximity {
  /// Within two years.
  Exact,
  /// Within five years.
  Close,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MatchingAttributes {
  #[serde(skip_serializing_if = "Option::is_none")]
  pub birth_year:  Option<YearProximity>,
  /// Origin similarity score, present only when it cleared the 0.8 bar.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub origin:      Option<f64>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub birth_place: Option<f64>,
}

impl MatchingAttributes {
  /// Serialise for the `matching_attributes` database column.
  pub fn to_json(&self) -> crate::Result<String> {
    Ok(serde_json::to_string(self)?)
  }

  /// Deserialise from the database column.
  pub fn from_json(s: &str) -> crate::Result<Self> {
    Ok(serde_json::from_str(s)?)
  }
}

/// A proposed or reviewed assertion that two ancestors are the same person.
/// Created by the matcher with [`MatchStatus::Suggested`]; moves to
/// confirmed/rejected only via explicit external action.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AncestorMatch {
  pub match_id:            Uuid,
  /// Canonically the lower of the two ancestor ids.
  pub ancestor_a:          Uuid,
  pub ancestor_b:          Uuid,
  /// Heuristic 0–1 estimate, not a calibrated probability.
  pub confidence:          f64,
  pub matching_attributes: MatchingAttributes,
  pub status:              MatchStatus,
  pub created_at:          DateTime<Utc>,
}

impl AncestorMatch {
  /// Given one side of the pair, return the other. `None` if `ancestor_id`
  /// is on neither side.
  pub fn other_side(&self, ancestor_id: Uuid) -> Option<Uuid> {
    if self.ancestor_a == ancestor_id {
      Some(self.ancestor_b)
    } else if self.ancestor_b == ancestor_id {
      Some(self.ancestor_a)
    } else {
      None
    }
  }
}

/// Input to [`crate::store::HeritageStore::insert_match`]. The pair may be
/// given in either order; the store canonicalises before writing.
#[derive(Debug, Clone)]
pub struct NewAncestorMatch {
  pub ancestor_a:          Uuid,
  pub ancestor_b:          Uuid,
  pub confidence:          f64,
  pub matching_attributes: MatchingAttributes,
  pub status:              MatchStatus,
}

// ─── Family connections ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionStatus {
  Pending,
  Accepted,
  Rejected,
}

/// An inferred relationship between two users, anchored on a shared
/// ancestor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FamilyConnection {
  pub connection_id:        Uuid,
  /// Canonically the lower of the two user ids.
  pub user_a:               Uuid,
  pub user_b:               Uuid,
  /// Relationship label from the inferencer, e.g. "siblings", "cousins".
  pub connection_type:      String,
  pub shared_ancestor_name: String,
  pub confidence:           f64,
  pub status:               ConnectionStatus,
  pub created_at:           DateTime<Utc>,
}

/// Input to [`crate::store::HeritageStore::upsert_family_connection`].
#[derive(Debug, Clone)]
pub struct NewFamilyConnection {
  pub user_a:               Uuid,
  pub user_b:               Uuid,
  pub connection_type:      String,
  pub shared_ancestor_name: String,
  pub confidence:           f64,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn canonical_pair_orders_low_first() {
    let low = Uuid::from_u128(1);
    let high = Uuid::from_u128(2);
    assert_eq!(canonical_pair(high, low), (low, high));
    assert_eq!(canonical_pair(low, high), (low, high));
  }

  #[test]
  fn other_side_resolves_both_directions() {
    let a = Uuid::from_u128(1);
    let b = Uuid::from_u128(2);
    let m = AncestorMatch {
      match_id:            Uuid::from_u128(3),
      ancestor_a:          a,
      ancestor_b:          b,
      confidence:          0.9,
      matching_attributes: MatchingAttributes::default(),
      status:              MatchStatus::Suggested,
      created_at:          Utc::now(),
    };
    assert_eq!(m.other_side(a), Some(b));
    assert_eq!(m.other_side(b), Some(a));
    assert_eq!(m.other_side(Uuid::from_u128(9)), None);
  }
}
