//! The `HeritageStore` trait.
//!
//! Implemented by storage backends (e.g. `kin-store-sqlite`). Higher layers
//! (`kin-engine`, `kin-api`) depend on this abstraction, not on any
//! concrete backend.
//!
//! The acting user is always an explicit `user_id` parameter. There is no
//! implicit fallback identity; anonymous-session handling belongs to the
//! caller.

use std::future::Future;

use uuid::Uuid;

use crate::{
  ancestor::{
    Ancestor, AncestorFact, AncestorMedia, NewAncestor, NewMedia, NewStory,
    Story,
  },
  extraction::{AppliedExtraction, Extraction},
  matching::{
    AncestorMatch, FamilyConnection, MatchStatus, NewAncestorMatch,
    NewFamilyConnection,
  },
  profile::UserProfile,
  session::{ChatMessage, InterviewSession},
  tree::MergedFamilyTree,
};

/// Abstraction over a Kin heritage store backend.
///
/// Write operations are scoped to the acting user's records; nothing here
/// locks or mutates another user's data. `apply_extraction` is the one
/// multi-row write and must be atomic: every row from one extraction
/// commits together or none do.
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes (e.g. tokio with `axum`).
pub trait HeritageStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Profiles ──────────────────────────────────────────────────────────

  /// Fetch the user's profile, creating an empty one if missing.
  fn ensure_profile(
    &self,
    user_id: Uuid,
  ) -> impl Future<Output = Result<UserProfile, Self::Error>> + Send + '_;

  fn get_profile(
    &self,
    user_id: Uuid,
  ) -> impl Future<Output = Result<Option<UserProfile>, Self::Error>> + Send + '_;

  /// Stamp `interview_started_at` (idempotent; the first stamp wins).
  fn mark_interview_started(
    &self,
    user_id: Uuid,
  ) -> impl Future<Output = Result<UserProfile, Self::Error>> + Send + '_;

  /// Set `interview_completed` and stamp `interview_completed_at`.
  fn mark_interview_completed(
    &self,
    user_id: Uuid,
  ) -> impl Future<Output = Result<UserProfile, Self::Error>> + Send + '_;

  // ── Extraction (the Fact Store Adapter) ───────────────────────────────

  /// Apply one extraction to the acting user's records in a single
  /// all-or-nothing transaction: profile fields from DATA records,
  /// ancestor upserts from PERSON records, structured-field overwrites and
  /// fact upserts from FACT records. Referential misses are dropped and
  /// reported in the result, never raised.
  fn apply_extraction<'a>(
    &'a self,
    user_id: Uuid,
    extraction: &'a Extraction,
  ) -> impl Future<Output = Result<AppliedExtraction, Self::Error>> + Send + 'a;

  // ── Ancestors ─────────────────────────────────────────────────────────

  /// Create-or-update keyed by `(user_id, unique_id)`. Returns the stored
  /// ancestor and whether it was created.
  fn upsert_ancestor(
    &self,
    input: NewAncestor,
  ) -> impl Future<Output = Result<(Ancestor, bool), Self::Error>> + Send + '_;

  fn get_ancestor(
    &self,
    ancestor_id: Uuid,
  ) -> impl Future<Output = Result<Option<Ancestor>, Self::Error>> + Send + '_;

  fn ancestor_by_unique_id<'a>(
    &'a self,
    user_id: Uuid,
    unique_id: &'a str,
  ) -> impl Future<Output = Result<Option<Ancestor>, Self::Error>> + Send + 'a;

  fn ancestors_for_user(
    &self,
    user_id: Uuid,
  ) -> impl Future<Output = Result<Vec<Ancestor>, Self::Error>> + Send + '_;

  /// All ancestors owned by users *other than* `user_id` — the matcher's
  /// candidate pool.
  fn ancestors_excluding_user(
    &self,
    user_id: Uuid,
  ) -> impl Future<Output = Result<Vec<Ancestor>, Self::Error>> + Send + '_;

  fn facts_for_ancestor(
    &self,
    ancestor_id: Uuid,
  ) -> impl Future<Output = Result<Vec<AncestorFact>, Self::Error>> + Send + '_;

  // ── Stories and media ─────────────────────────────────────────────────

  fn add_story(
    &self,
    input: NewStory,
  ) -> impl Future<Output = Result<Story, Self::Error>> + Send + '_;

  fn stories_for_ancestor(
    &self,
    ancestor_id: Uuid,
  ) -> impl Future<Output = Result<Vec<Story>, Self::Error>> + Send + '_;

  fn add_media(
    &self,
    input: NewMedia,
  ) -> impl Future<Output = Result<AncestorMedia, Self::Error>> + Send + '_;

  fn media_for_ancestor(
    &self,
    ancestor_id: Uuid,
  ) -> impl Future<Output = Result<Vec<AncestorMedia>, Self::Error>> + Send + '_;

  // ── Matches ───────────────────────────────────────────────────────────

  /// Insert a match link. The pair is canonicalised (lower ancestor id
  /// first) before writing, so inserting `(B, A)` after `(A, B)` is
  /// rejected as a duplicate.
  fn insert_match(
    &self,
    input: NewAncestorMatch,
  ) -> impl Future<Output = Result<AncestorMatch, Self::Error>> + Send + '_;

  /// Look up a match for a pair, in either order.
  fn find_match_between(
    &self,
    a: Uuid,
    b: Uuid,
  ) -> impl Future<Output = Result<Option<AncestorMatch>, Self::Error>> + Send + '_;

  fn get_match(
    &self,
    match_id: Uuid,
  ) -> impl Future<Output = Result<Option<AncestorMatch>, Self::Error>> + Send + '_;

  /// Transition a match to confirmed/rejected. Errors if the match does
  /// not exist.
  fn set_match_status(
    &self,
    match_id: Uuid,
    status: MatchStatus,
  ) -> impl Future<Output = Result<AncestorMatch, Self::Error>> + Send + '_;

  /// All matches (any status) with either side owned by `user_id`.
  fn matches_for_user(
    &self,
    user_id: Uuid,
  ) -> impl Future<Output = Result<Vec<AncestorMatch>, Self::Error>> + Send + '_;

  /// Confirmed matches with *both* sides owned by users in `user_ids` —
  /// the merge builder's edge set.
  fn confirmed_matches_for_users<'a>(
    &'a self,
    user_ids: &'a [Uuid],
  ) -> impl Future<Output = Result<Vec<AncestorMatch>, Self::Error>> + Send + 'a;

  // ── Family connections ────────────────────────────────────────────────

  /// Get-or-create on the canonical user pair. Returns the connection and
  /// whether it was created; an existing row is returned unchanged.
  fn upsert_family_connection(
    &self,
    input: NewFamilyConnection,
  ) -> impl Future<Output = Result<(FamilyConnection, bool), Self::Error>> + Send + '_;

  fn connections_for_user(
    &self,
    user_id: Uuid,
  ) -> impl Future<Output = Result<Vec<FamilyConnection>, Self::Error>> + Send + '_;

  // ── Merged tree snapshots ─────────────────────────────────────────────

  fn create_merged_tree<'a>(
    &'a self,
    name: &'a str,
    created_by: Uuid,
    member_ids: &'a [Uuid],
  ) -> impl Future<Output = Result<MergedFamilyTree, Self::Error>> + Send + 'a;

  fn get_merged_tree(
    &self,
    tree_id: Uuid,
  ) -> impl Future<Output = Result<Option<MergedFamilyTree>, Self::Error>> + Send + '_;

  // ── Interview sessions ────────────────────────────────────────────────

  /// Create-or-update keyed by `(user_id, session_id)`.
  fn save_session<'a>(
    &'a self,
    user_id: Uuid,
    session_id: &'a str,
    chat_history: &'a [ChatMessage],
    completed: bool,
  ) -> impl Future<Output = Result<InterviewSession, Self::Error>> + Send + 'a;

  fn get_session<'a>(
    &'a self,
    user_id: Uuid,
    session_id: &'a str,
  ) -> impl Future<Output = Result<Option<InterviewSession>, Self::Error>> + Send + 'a;
}
