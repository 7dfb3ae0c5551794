//! Per-user heritage profile.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Extended profile data collected during the interview. One row per user,
/// created lazily on first write.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
  pub user_id:                Uuid,
  pub first_name:             String,
  pub last_name:              String,
  pub interview_completed:    bool,
  pub interview_started_at:   Option<DateTime<Utc>>,
  pub interview_completed_at: Option<DateTime<Utc>>,
  pub created_at:             DateTime<Utc>,
  pub updated_at:             DateTime<Utc>,
}

/// Profile fields a DATA tag may overwrite. A DATA key naming anything else
/// is dropped and reported, never written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfileField {
  FirstName,
  LastName,
}

impl ProfileField {
  pub fn from_key(key: &str) -> Option<Self> {
    match key {
      "first_name" => Some(Self::FirstName),
      "last_name" => Some(Self::LastName),
      _ => None,
    }
  }
}
