//! Handlers for `/interview` endpoints — the conversational loop.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/interview/start`    | Stamp the profile, return the welcome message |
//! | `POST` | `/interview/message`  | One turn: generate → extract → apply → save session |
//! | `POST` | `/interview/complete` | Mark profile and session complete |
//!
//! The generator is called before any store write, so a generation failure
//! surfaces as 502 with nothing half-committed; extraction writes are one
//! atomic transaction inside `apply_extraction`.

use axum::{Json, extract::State};
use kin_core::{
  extraction::{AppliedExtraction, Extraction},
  generate::TextGenerator,
  profile::UserProfile,
  session::ChatMessage,
  store::HeritageStore,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  AppState,
  error::{ApiError, store_err},
  guide,
};

// ─── Start ────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct StartBody {
  pub user_id:    Uuid,
  /// Caller-supplied session identifier; session management lives with the
  /// caller, not in this core.
  pub session_id: String,
}

#[derive(Debug, Serialize)]
pub struct StartResponse {
  pub message:    &'static str,
  pub session_id: String,
}

/// `POST /interview/start`
pub async fn start<S, G>(
  State(state): State<AppState<S, G>>,
  Json(body): Json<StartBody>,
) -> Result<Json<StartResponse>, ApiError>
where
  S: HeritageStore,
  G: TextGenerator,
{
  state
    .store
    .mark_interview_started(body.user_id)
    .await
    .map_err(store_err)?;

  Ok(Json(StartResponse {
    message:    guide::INITIAL_MESSAGE,
    session_id: body.session_id,
  }))
}

// ─── Message ──────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct MessageBody {
  pub user_id:    Uuid,
  pub session_id: String,
  pub message:    String,
  /// Transcript so far, excluding this message.
  #[serde(default)]
  pub chat_history: Vec<ChatMessage>,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
  /// Model reply with tag markup stripped.
  pub message:   String,
  /// What the extractor found, including skipped tags.
  pub extracted: Extraction,
  /// What the store wrote, including dropped records.
  pub applied:   AppliedExtraction,
}

/// `POST /interview/message`
pub async fn message<S, G>(
  State(state): State<AppState<S, G>>,
  Json(body): Json<MessageBody>,
) -> Result<Json<MessageResponse>, ApiError>
where
  S: HeritageStore,
  G: TextGenerator,
{
  if body.message.trim().is_empty() {
    return Err(ApiError::BadRequest("message cannot be empty".into()));
  }

  let response = run_turn(
    &*state.store,
    &*state.generator,
    body.user_id,
    &body.session_id,
    &body.message,
    &body.chat_history,
  )
  .await?;

  Ok(Json(response))
}

/// One interview turn, separated from the HTTP layer so the pipeline can be
/// exercised with a scripted generator.
pub async fn run_turn<S, G>(
  store: &S,
  generator: &G,
  user_id: Uuid,
  session_id: &str,
  message: &str,
  prior_history: &[ChatMessage],
) -> Result<MessageResponse, ApiError>
where
  S: HeritageStore,
  G: TextGenerator,
{
  let history = guide::build_history(prior_history);
  let reply = generator
    .reply(&history, message)
    .await
    .map_err(|e| ApiError::Upstream(e.to_string()))?;

  let extracted = kin_extract::extract_tags(&reply);
  let applied = store
    .apply_extraction(user_id, &extracted)
    .await
    .map_err(store_err)?;

  // The transcript keeps the cleaned reply — tags are plumbing, not
  // conversation.
  let mut updated = prior_history.to_vec();
  updated.push(ChatMessage::user(message));
  updated.push(ChatMessage::model(extracted.cleaned_text.clone()));
  store
    .save_session(user_id, session_id, &updated, false)
    .await
    .map_err(store_err)?;

  Ok(MessageResponse {
    message: extracted.cleaned_text.clone(),
    extracted,
    applied,
  })
}

// ─── Complete ─────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct CompleteBody {
  pub user_id:    Uuid,
  pub session_id: Option<String>,
}

/// `POST /interview/complete`
pub async fn complete<S, G>(
  State(state): State<AppState<S, G>>,
  Json(body): Json<CompleteBody>,
) -> Result<Json<UserProfile>, ApiError>
where
  S: HeritageStore,
  G: TextGenerator,
{
  let profile = state
    .store
    .mark_interview_completed(body.user_id)
    .await
    .map_err(store_err)?;

  if let Some(session_id) = &body.session_id
    && let Some(session) = state
      .store
      .get_session(body.user_id, session_id)
      .await
      .map_err(store_err)?
  {
    state
      .store
      .save_session(body.user_id, session_id, &session.chat_history, true)
      .await
      .map_err(store_err)?;
  }

  Ok(Json(profile))
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
  use std::convert::Infallible;

  use kin_core::store::HeritageStore;
  use kin_store_sqlite::SqliteStore;

  use super::*;

  /// Deterministic stand-in for the generation service.
  struct ScriptedGenerator {
    reply: String,
  }

  impl TextGenerator for ScriptedGenerator {
    type Error = Infallible;

    async fn reply(
      &self,
      _history: &[ChatMessage],
      _message: &str,
    ) -> Result<String, Infallible> {
      Ok(self.reply.clone())
    }
  }

  /// Always fails, for the isolation test.
  struct DownGenerator;

  impl TextGenerator for DownGenerator {
    type Error = std::io::Error;

    async fn reply(
      &self,
      _history: &[ChatMessage],
      _message: &str,
    ) -> Result<String, std::io::Error> {
      Err(std::io::Error::other("model unreachable"))
    }
  }

  #[tokio::test]
  async fn turn_extracts_applies_and_saves_session() {
    let store = SqliteStore::open_in_memory().await.unwrap();
    let generator = ScriptedGenerator {
      reply: "A fine name! [DATA:key=first_name, value=Astrid] \
              [PERSON:id=bjorn_grandfather, name=Bjorn, \
              relation=grandfather] Tell me of Bjorn."
        .into(),
    };
    let user = Uuid::new_v4();

    let response = run_turn(
      &store,
      &generator,
      user,
      "session-1",
      "My grandfather was Bjorn",
      &[],
    )
    .await
    .unwrap();

    assert!(!response.message.contains("[DATA:"));
    assert!(!response.message.contains("[PERSON:"));
    assert_eq!(response.applied.persons.len(), 1);
    assert_eq!(response.applied.profile_fields.len(), 1);

    let profile = store.get_profile(user).await.unwrap().unwrap();
    assert_eq!(profile.first_name, "Astrid");

    let ancestor = store
      .ancestor_by_unique_id(user, "bjorn_grandfather")
      .await
      .unwrap()
      .unwrap();
    assert_eq!(ancestor.name, "Bjorn");

    let session = store
      .get_session(user, "session-1")
      .await
      .unwrap()
      .unwrap();
    assert_eq!(session.chat_history.len(), 2);
    // The persisted transcript carries the cleaned reply.
    assert!(!session.chat_history[1].content.contains("[PERSON:"));
  }

  #[tokio::test]
  async fn generator_failure_writes_nothing() {
    let store = SqliteStore::open_in_memory().await.unwrap();
    let user = Uuid::new_v4();

    let err = run_turn(
      &store,
      &DownGenerator,
      user,
      "session-1",
      "My grandfather was Bjorn",
      &[],
    )
    .await
    .unwrap_err();

    assert!(matches!(err, ApiError::Upstream(_)));
    assert!(store.ancestors_for_user(user).await.unwrap().is_empty());
    assert!(store.get_session(user, "session-1").await.unwrap().is_none());
  }
}
