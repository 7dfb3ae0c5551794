//! Interview chat sessions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
  User,
  Model,
}

/// One turn of the interview transcript.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
  pub role:    ChatRole,
  pub content: String,
}

impl ChatMessage {
  pub fn user(content: impl Into<String>) -> Self {
    Self { role: ChatRole::User, content: content.into() }
  }

  pub fn model(content: impl Into<String>) -> Self {
    Self { role: ChatRole::Model, content: content.into() }
  }
}

/// A persisted interview transcript, upserted on `(user_id, session_id)`.
/// The session id is caller-supplied; session management is outside this
/// core.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterviewSession {
  pub user_id:       Uuid,
  pub session_id:    String,
  pub chat_history:  Vec<ChatMessage>,
  pub completed:     bool,
  pub started_at:    DateTime<Utc>,
  pub last_activity: DateTime<Utc>,
}
