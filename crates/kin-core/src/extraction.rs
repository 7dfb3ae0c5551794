//! Records produced by the tag extractor and the report produced when they
//! are applied to the store.
//!
//! Generated interview text embeds bracketed tags — `[PERSON:…]`,
//! `[FACT:…]`, `[DATA:…]` — whose parsed forms live here. The extractor
//! (`kin-extract`) turns raw text into an [`Extraction`]; the store's
//! `apply_extraction` turns an [`Extraction`] into persisted rows and an
//! [`AppliedExtraction`] report. Tags that fail to parse are skipped, not
//! fatal, and every skip or drop is surfaced so callers can assert on what
//! was lost.

use serde::{Deserialize, Serialize};

// ─── Tag records ─────────────────────────────────────────────────────────────

/// The three tag kinds embedded in generated text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TagKind {
  Person,
  Fact,
  Data,
}

/// A `[PERSON:id=…, …]` tag: a new or existing ancestor in the current
/// user's namespace. All attributes other than `id` are kept verbatim, in
/// source order; which of them map to structured fields is the store
/// adapter's concern.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersonRecord {
  pub unique_id:  String,
  pub attributes: Vec<(String, String)>,
}

impl PersonRecord {
  /// Value for `key`, if the tag carried it. A repeated key keeps its last
  /// occurrence.
  pub fn attribute(&self, key: &str) -> Option<&str> {
    self
      .attributes
      .iter()
      .rev()
      .find(|(k, _)| k == key)
      .map(|(_, v)| v.as_str())
  }
}

/// A `[FACT:person_id=…, key=…, value=…]` tag: an attribute for an ancestor
/// that should already exist.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FactRecord {
  pub person_id: String,
  pub key:       String,
  pub value:     String,
}

/// A `[DATA:key=…, value=…]` tag: a profile-level scalar for the current
/// user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserDataRecord {
  pub key:   String,
  pub value: String,
}

/// A tag that was stripped from the text but whose data was discarded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkippedTag {
  pub kind:   TagKind,
  /// The raw attribute string between the `TYPE:` prefix and the closing
  /// bracket.
  pub body:   String,
  pub reason: String,
}

// ─── Extraction ──────────────────────────────────────────────────────────────

/// Everything the extractor pulled out of one generated message. Record
/// sequences preserve the order tags appeared in the source text.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Extraction {
  /// The text with all recognised tags stripped, for display to the user.
  pub cleaned_text: String,
  pub persons:      Vec<PersonRecord>,
  pub facts:        Vec<FactRecord>,
  pub user_data:    Vec<UserDataRecord>,
  pub skipped:      Vec<SkippedTag>,
}

impl Extraction {
  pub fn is_empty(&self) -> bool {
    self.persons.is_empty() && self.facts.is_empty() && self.user_data.is_empty()
  }
}

// ─── Application report ──────────────────────────────────────────────────────

/// An ancestor touched by a PERSON record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppliedPerson {
  pub unique_id: String,
  pub created:   bool,
}

/// A fact written by a FACT record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppliedFact {
  pub person_id:  String,
  pub key:        String,
  pub value:      String,
  /// `true` when the key named a structured ancestor field and overwrote
  /// it directly instead of writing a generic fact row.
  pub structured: bool,
}

/// A record the adapter dropped rather than wrote. Dropping is deliberate
/// (conversational continuity over strict validation) but always reported.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DroppedRecord {
  /// DATA key that names no profile field.
  UnknownProfileField { key: String, value: String },
  /// FACT whose `person_id` resolved to no ancestor of the acting user.
  UnknownPersonId { person_id: String, key: String },
  /// PERSON attribute with no structured-field counterpart; PERSON tags
  /// carry no generic attribute bag.
  IgnoredPersonAttribute { unique_id: String, key: String },
  /// FACT value that could not be parsed into the structured field's type
  /// (e.g. a non-numeric birth year).
  InvalidValue { person_id: String, key: String, value: String },
}

/// What one [`Extraction`] did to the store. All writes behind one report
/// committed in a single transaction.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppliedExtraction {
  /// Profile fields overwritten by DATA records, as `(field, value)`.
  pub profile_fields: Vec<(String, String)>,
  pub persons:        Vec<AppliedPerson>,
  pub facts:          Vec<AppliedFact>,
  pub dropped:        Vec<DroppedRecord>,
}
