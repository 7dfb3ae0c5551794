//! The text-generation seam.
//!
//! The conversational interviewer is an external, potentially slow,
//! potentially failing service. Modelling it as a trait keeps the
//! extraction pipeline deterministic under test — a scripted implementation
//! stands in for the live model — and isolates generation failures from
//! store writes: a failed reply must never corrupt previously committed
//! extractions.

use std::future::Future;

use crate::session::ChatMessage;

/// A capability that turns a chat transcript plus the latest user message
/// into the next model reply.
pub trait TextGenerator: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  fn reply<'a>(
    &'a self,
    history: &'a [ChatMessage],
    message: &'a str,
  ) -> impl Future<Output = Result<String, Self::Error>> + Send + 'a;
}
