//! Gemini client implementing [`TextGenerator`].
//!
//! Thin REST wrapper over the `generateContent` endpoint. The rest of the
//! pipeline only sees the trait; swapping the model provider touches this
//! file and the server config, nothing else.

use kin_core::{
  generate::TextGenerator,
  session::{ChatMessage, ChatRole},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

const API_BASE: &str =
  "https://generativelanguage.googleapis.com/v1beta/models";

#[derive(Debug, Error)]
pub enum GeminiError {
  #[error("http error: {0}")]
  Http(#[from] reqwest::Error),

  #[error("model returned no candidates")]
  EmptyResponse,
}

pub struct GeminiGenerator {
  http:    reqwest::Client,
  api_key: String,
  model:   String,
}

impl GeminiGenerator {
  pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
    Self {
      http:    reqwest::Client::new(),
      api_key: api_key.into(),
      model:   model.into(),
    }
  }
}

// ─── Wire types ──────────────────────────────────────────────────────────────

#[derive(Serialize)]
struct GenerateRequest {
  contents: Vec<Content>,
}

#[derive(Serialize, Deserialize)]
struct Content {
  role:  String,
  parts: Vec<Part>,
}

#[derive(Serialize, Deserialize)]
struct Part {
  text: String,
}

#[derive(Deserialize)]
struct GenerateResponse {
  #[serde(default)]
  candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
  content: Content,
}

fn role_str(role: ChatRole) -> &'static str {
  match role {
    ChatRole::User => "user",
    ChatRole::Model => "model",
  }
}

// ─── TextGenerator impl ──────────────────────────────────────────────────────

impl TextGenerator for GeminiGenerator {
  type Error = GeminiError;

  async fn reply(
    &self,
    history: &[ChatMessage],
    message: &str,
  ) -> Result<String, GeminiError> {
    let mut contents: Vec<Content> = history
      .iter()
      .map(|m| Content {
        role:  role_str(m.role).to_owned(),
        parts: vec![Part { text: m.content.clone() }],
      })
      .collect();
    contents.push(Content {
      role:  "user".to_owned(),
      parts: vec![Part { text: message.to_owned() }],
    });

    let url = format!("{API_BASE}/{}:generateContent", self.model);
    let response: GenerateResponse = self
      .http
      .post(&url)
      .query(&[("key", self.api_key.as_str())])
      .json(&GenerateRequest { contents })
      .send()
      .await?
      .error_for_status()?
      .json()
      .await?;

    let text: String = response
      .candidates
      .into_iter()
      .next()
      .ok_or(GeminiError::EmptyResponse)?
      .content
      .parts
      .into_iter()
      .map(|p| p.text)
      .collect();

    if text.is_empty() {
      return Err(GeminiError::EmptyResponse);
    }
    Ok(text)
  }
}
