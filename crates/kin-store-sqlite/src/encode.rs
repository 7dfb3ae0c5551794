//! Encoding and decoding helpers between Rust domain types and the
//! plain-text representations stored in SQLite columns.
//!
//! All timestamps are stored as RFC 3339 strings. Structured fields
//! (matching attributes, chat history, member id lists) are stored as
//! compact JSON. UUIDs are stored as hyphenated lowercase strings.

use chrono::{DateTime, Utc};
use kin_core::{
  ancestor::{Ancestor, AncestorFact, AncestorMedia, MediaType, Story},
  matching::{
    AncestorMatch, ConnectionStatus, FamilyConnection, MatchStatus,
    MatchingAttributes,
  },
  profile::UserProfile,
  session::{ChatMessage, InterviewSession},
  tree::MergedFamilyTree,
};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Uuid ────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::Decode(e.to_string()))
}

pub fn decode_opt_dt(s: Option<&str>) -> Result<Option<DateTime<Utc>>> {
  s.map(decode_dt).transpose()
}

// ─── MatchStatus ─────────────────────────────────────────────────────────────

pub fn encode_match_status(s: MatchStatus) -> &'static str {
  match s {
    MatchStatus::Suggested => "suggested",
    MatchStatus::Confirmed => "confirmed",
    MatchStatus::Rejected => "rejected",
  }
}

pub fn decode_match_status(s: &str) -> Result<MatchStatus> {
  match s {
    "suggested" => Ok(MatchStatus::Suggested),
    "confirmed" => Ok(MatchStatus::Confirmed),
    "rejected" => Ok(MatchStatus::Rejected),
    other => Err(Error::Decode(format!("unknown match status: {other:?}"))),
  }
}

// ─── ConnectionStatus ────────────────────────────────────────────────────────

pub fn encode_connection_status(s: ConnectionStatus) -> &'static str {
  match s {
    ConnectionStatus::Pending => "pending",
    ConnectionStatus::Accepted => "accepted",
    ConnectionStatus::Rejected => "rejected",
  }
}

pub fn decode_connection_status(s: &str) -> Result<ConnectionStatus> {
  match s {
    "pending" => Ok(ConnectionStatus::Pending),
    "accepted" => Ok(ConnectionStatus::Accepted),
    "rejected" => Ok(ConnectionStatus::Rejected),
    other => {
      Err(Error::Decode(format!("unknown connection status: {other:?}")))
    }
  }
}

// ─── MediaType ───────────────────────────────────────────────────────────────

pub fn encode_media_type(m: MediaType) -> &'static str {
  match m {
    MediaType::Photo => "photo",
    MediaType::Document => "document",
    MediaType::Video => "video",
    MediaType::Audio => "audio",
  }
}

pub fn decode_media_type(s: &str) -> Result<MediaType> {
  match s {
    "photo" => Ok(MediaType::Photo),
    "document" => Ok(MediaType::Document),
    "video" => Ok(MediaType::Video),
    "audio" => Ok(MediaType::Audio),
    other => Err(Error::Decode(format!("unknown media type: {other:?}"))),
  }
}

// ─── JSON-packed columns ─────────────────────────────────────────────────────

pub fn encode_matching_attributes(a: &MatchingAttributes) -> Result<String> {
  Ok(a.to_json()?)
}

pub fn decode_matching_attributes(s: &str) -> Result<MatchingAttributes> {
  Ok(MatchingAttributes::from_json(s)?)
}

pub fn encode_chat_history(h: &[ChatMessage]) -> Result<String> {
  Ok(serde_json::to_string(h)?)
}

pub fn decode_chat_history(s: &str) -> Result<Vec<ChatMessage>> {
  Ok(serde_json::from_str(s)?)
}

pub fn encode_member_ids(ids: &[Uuid]) -> Result<String> {
  Ok(serde_json::to_string(ids)?)
}

pub fn decode_member_ids(s: &str) -> Result<Vec<Uuid>> {
  Ok(serde_json::from_str(s)?)
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Raw strings read directly from a `profiles` row.
pub struct RawProfile {
  pub user_id:                String,
  pub first_name:             String,
  pub last_name:              String,
  pub interview_completed:    bool,
  pub interview_started_at:   Option<String>,
  pub interview_completed_at: Option<String>,
  pub created_at:             String,
  pub updated_at:             String,
}

impl RawProfile {
  pub const COLUMNS: &'static str = "user_id, first_name, last_name, \
     interview_completed, interview_started_at, interview_completed_at, \
     created_at, updated_at";

  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      user_id:                row.get(0)?,
      first_name:             row.get(1)?,
      last_name:              row.get(2)?,
      interview_completed:    row.get(3)?,
      interview_started_at:   row.get(4)?,
      interview_completed_at: row.get(5)?,
      created_at:             row.get(6)?,
      updated_at:             row.get(7)?,
    })
  }

  pub fn into_profile(self) -> Result<UserProfile> {
    Ok(UserProfile {
      user_id:                decode_uuid(&self.user_id)?,
      first_name:             self.first_name,
      last_name:              self.last_name,
      interview_completed:    self.interview_completed,
      interview_started_at:   decode_opt_dt(
        self.interview_started_at.as_deref(),
      )?,
      interview_completed_at: decode_opt_dt(
        self.interview_completed_at.as_deref(),
      )?,
      created_at:             decode_dt(&self.created_at)?,
      updated_at:             decode_dt(&self.updated_at)?,
    })
  }
}

/// Raw strings read directly from an `ancestors` row.
pub struct RawAncestor {
  pub ancestor_id: String,
  pub user_id:     String,
  pub unique_id:   String,
  pub name:        String,
  pub relation:    String,
  pub birth_year:  Option<i32>,
  pub death_year:  Option<i32>,
  pub birth_place: Option<String>,
  pub origin:      Option<String>,
  pub created_at:  String,
  pub updated_at:  String,
}

impl RawAncestor {
  pub const COLUMNS: &'static str = "ancestor_id, user_id, unique_id, name, \
     relation, birth_year, death_year, birth_place, origin, created_at, \
     updated_at";

  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      ancestor_id: row.get(0)?,
      user_id:     row.get(1)?,
      unique_id:   row.get(2)?,
      name:        row.get(3)?,
      relation:    row.get(4)?,
      birth_year:  row.get(5)?,
      death_year:  row.get(6)?,
      birth_place: row.get(7)?,
      origin:      row.get(8)?,
      created_at:  row.get(9)?,
      updated_at:  row.get(10)?,
    })
  }

  pub fn into_ancestor(self) -> Result<Ancestor> {
    Ok(Ancestor {
      ancestor_id: decode_uuid(&self.ancestor_id)?,
      user_id:     decode_uuid(&self.user_id)?,
      unique_id:   self.unique_id,
      name:        self.name,
      relation:    self.relation,
      birth_year:  self.birth_year,
      death_year:  self.death_year,
      birth_place: self.birth_place,
      origin:      self.origin,
      created_at:  decode_dt(&self.created_at)?,
      updated_at:  decode_dt(&self.updated_at)?,
    })
  }
}

/// Raw strings read directly from an `ancestor_facts` row.
pub struct RawFact {
  pub fact_id:     String,
  pub ancestor_id: String,
  pub key:         String,
  pub value:       String,
  pub created_at:  String,
}

impl RawFact {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      fact_id:     row.get(0)?,
      ancestor_id: row.get(1)?,
      key:         row.get(2)?,
      value:       row.get(3)?,
      created_at:  row.get(4)?,
    })
  }

  pub fn into_fact(self) -> Result<AncestorFact> {
    Ok(AncestorFact {
      fact_id:     decode_uuid(&self.fact_id)?,
      ancestor_id: decode_uuid(&self.ancestor_id)?,
      key:         self.key,
      value:       self.value,
      created_at:  decode_dt(&self.created_at)?,
    })
  }
}

/// Raw strings read directly from a `stories` row.
pub struct RawStory {
  pub story_id:    String,
  pub ancestor_id: String,
  pub user_id:     String,
  pub content:     String,
  pub context:     Option<String>,
  pub created_at:  String,
}

impl RawStory {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      story_id:    row.get(0)?,
      ancestor_id: row.get(1)?,
      user_id:     row.get(2)?,
      content:     row.get(3)?,
      context:     row.get(4)?,
      created_at:  row.get(5)?,
    })
  }

  pub fn into_story(self) -> Result<Story> {
    Ok(Story {
      story_id:    decode_uuid(&self.story_id)?,
      ancestor_id: decode_uuid(&self.ancestor_id)?,
      user_id:     decode_uuid(&self.user_id)?,
      content:     self.content,
      context:     self.context,
      created_at:  decode_dt(&self.created_at)?,
    })
  }
}

/// Raw strings read directly from an `ancestor_media` row.
pub struct RawMedia {
  pub media_id:    String,
  pub ancestor_id: String,
  pub user_id:     String,
  pub url:         String,
  pub media_type:  String,
  pub title:       Option<String>,
  pub uploaded_at: String,
}

impl RawMedia {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      media_id:    row.get(0)?,
      ancestor_id: row.get(1)?,
      user_id:     row.get(2)?,
      url:         row.get(3)?,
      media_type:  row.get(4)?,
      title:       row.get(5)?,
      uploaded_at: row.get(6)?,
    })
  }

  pub fn into_media(self) -> Result<AncestorMedia> {
    Ok(AncestorMedia {
      media_id:    decode_uuid(&self.media_id)?,
      ancestor_id: decode_uuid(&self.ancestor_id)?,
      user_id:     decode_uuid(&self.user_id)?,
      url:         self.url,
      media_type:  decode_media_type(&self.media_type)?,
      title:       self.title,
      uploaded_at: decode_dt(&self.uploaded_at)?,
    })
  }
}

/// Raw strings read directly from an `ancestor_matches` row.
pub struct RawMatch {
  pub match_id:            String,
  pub ancestor_a:          String,
  pub ancestor_b:          String,
  pub confidence:          f64,
  pub matching_attributes: String,
  pub status:              String,
  pub created_at:          String,
}

impl RawMatch {
  pub const COLUMNS: &'static str = "match_id, ancestor_a, ancestor_b, \
     confidence, matching_attributes, status, created_at";

  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      match_id:            row.get(0)?,
      ancestor_a:          row.get(1)?,
      ancestor_b:          row.get(2)?,
      confidence:          row.get(3)?,
      matching_attributes: row.get(4)?,
      status:              row.get(5)?,
      created_at:          row.get(6)?,
    })
  }

  pub fn into_match(self) -> Result<AncestorMatch> {
    Ok(AncestorMatch {
      match_id:            decode_uuid(&self.match_id)?,
      ancestor_a:          decode_uuid(&self.ancestor_a)?,
      ancestor_b:          decode_uuid(&self.ancestor_b)?,
      confidence:          self.confidence,
      matching_attributes: decode_matching_attributes(
        &self.matching_attributes,
      )?,
      status:              decode_match_status(&self.status)?,
      created_at:          decode_dt(&self.created_at)?,
    })
  }
}

/// Raw strings read directly from a `family_connections` row.
pub struct RawConnection {
  pub connection_id:        String,
  pub user_a:               String,
  pub user_b:               String,
  pub connection_type:      String,
  pub shared_ancestor_name: String,
  pub confidence:           f64,
  pub status:               String,
  pub created_at:           String,
}

impl RawConnection {
  pub const COLUMNS: &'static str = "connection_id, user_a, user_b, \
     connection_type, shared_ancestor_name, confidence, status, created_at";

  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      connection_id:        row.get(0)?,
      user_a:               row.get(1)?,
      user_b:               row.get(2)?,
      connection_type:      row.get(3)?,
      shared_ancestor_name: row.get(4)?,
      confidence:           row.get(5)?,
      status:               row.get(6)?,
      created_at:           row.get(7)?,
    })
  }

  pub fn into_connection(self) -> Result<FamilyConnection> {
    Ok(FamilyConnection {
      connection_id:        decode_uuid(&self.connection_id)?,
      user_a:               decode_uuid(&self.user_a)?,
      user_b:               decode_uuid(&self.user_b)?,
      connection_type:      self.connection_type,
      shared_ancestor_name: self.shared_ancestor_name,
      confidence:           self.confidence,
      status:               decode_connection_status(&self.status)?,
      created_at:           decode_dt(&self.created_at)?,
    })
  }
}

/// Raw strings read directly from a `merged_trees` row.
pub struct RawTree {
  pub tree_id:    String,
  pub name:       String,
  pub created_by: String,
  pub member_ids: String,
  pub created_at: String,
}

impl RawTree {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      tree_id:    row.get(0)?,
      name:       row.get(1)?,
      created_by: row.get(2)?,
      member_ids: row.get(3)?,
      created_at: row.get(4)?,
    })
  }

  pub fn into_tree(self) -> Result<MergedFamilyTree> {
    Ok(MergedFamilyTree {
      tree_id:    decode_uuid(&self.tree_id)?,
      name:       self.name,
      created_by: decode_uuid(&self.created_by)?,
      member_ids: decode_member_ids(&self.member_ids)?,
      created_at: decode_dt(&self.created_at)?,
    })
  }
}

/// Raw strings read directly from an `interview_sessions` row.
pub struct RawSession {
  pub user_id:       String,
  pub session_id:    String,
  pub chat_history:  String,
  pub completed:     bool,
  pub started_at:    String,
  pub last_activity: String,
}

impl RawSession {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      user_id:       row.get(0)?,
      session_id:    row.get(1)?,
      chat_history:  row.get(2)?,
      completed:     row.get(3)?,
      started_at:    row.get(4)?,
      last_activity: row.get(5)?,
    })
  }

  pub fn into_session(self) -> Result<InterviewSession> {
    Ok(InterviewSession {
      user_id:       decode_uuid(&self.user_id)?,
      session_id:    self.session_id,
      chat_history:  decode_chat_history(&self.chat_history)?,
      completed:     self.completed,
      started_at:    decode_dt(&self.started_at)?,
      last_activity: decode_dt(&self.last_activity)?,
    })
  }
}
