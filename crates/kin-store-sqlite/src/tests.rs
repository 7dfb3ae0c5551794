//! Integration tests for `SqliteStore` against an in-memory database.

use kin_core::{
  ancestor::{MediaType, NewAncestor, NewMedia, NewStory},
  extraction::{
    DroppedRecord, Extraction, FactRecord, PersonRecord, UserDataRecord,
  },
  matching::{
    MatchStatus, MatchingAttributes, NewAncestorMatch, NewFamilyConnection,
  },
  session::ChatMessage,
  store::HeritageStore,
};
use uuid::Uuid;

use crate::SqliteStore;

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

fn person_record(unique_id: &str, attrs: &[(&str, &str)]) -> PersonRecord {
  PersonRecord {
    unique_id:  unique_id.to_string(),
    attributes: attrs
      .iter()
      .map(|(k, v)| (k.to_string(), v.to_string()))
      .collect(),
  }
}

fn fact_record(person_id: &str, key: &str, value: &str) -> FactRecord {
  FactRecord {
    person_id: person_id.to_string(),
    key:       key.to_string(),
    value:     value.to_string(),
  }
}

fn new_ancestor(user_id: Uuid, unique_id: &str, name: &str) -> NewAncestor {
  NewAncestor {
    user_id,
    unique_id: unique_id.to_string(),
    name: name.to_string(),
    relation: "grandfather".to_string(),
    birth_year: None,
    death_year: None,
    birth_place: None,
    origin: None,
  }
}

// ─── Profiles ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn ensure_profile_creates_once() {
  let s = store().await;
  let user = Uuid::new_v4();

  let first = s.ensure_profile(user).await.unwrap();
  assert_eq!(first.user_id, user);
  assert!(first.first_name.is_empty());

  let second = s.ensure_profile(user).await.unwrap();
  assert_eq!(second.created_at, first.created_at);
}

#[tokio::test]
async fn get_profile_missing_returns_none() {
  let s = store().await;
  assert!(s.get_profile(Uuid::new_v4()).await.unwrap().is_none());
}

#[tokio::test]
async fn interview_started_stamp_is_idempotent() {
  let s = store().await;
  let user = Uuid::new_v4();

  let first = s.mark_interview_started(user).await.unwrap();
  let started = first.interview_started_at.expect("stamped");

  let second = s.mark_interview_started(user).await.unwrap();
  assert_eq!(second.interview_started_at, Some(started));
}

#[tokio::test]
async fn interview_completed_sets_flag_and_stamp() {
  let s = store().await;
  let user = Uuid::new_v4();

  let profile = s.mark_interview_completed(user).await.unwrap();
  assert!(profile.interview_completed);
  assert!(profile.interview_completed_at.is_some());
}

// ─── Extraction: DATA records ────────────────────────────────────────────────

#[tokio::test]
async fn data_records_overwrite_profile_fields() {
  let s = store().await;
  let user = Uuid::new_v4();

  let extraction = Extraction {
    user_data: vec![
      UserDataRecord { key: "first_name".into(), value: "Astrid".into() },
      UserDataRecord { key: "last_name".into(), value: "Hansen".into() },
    ],
    ..Default::default()
  };

  let applied = s.apply_extraction(user, &extraction).await.unwrap();
  assert_eq!(applied.profile_fields.len(), 2);
  assert!(applied.dropped.is_empty());

  let profile = s.get_profile(user).await.unwrap().unwrap();
  assert_eq!(profile.first_name, "Astrid");
  assert_eq!(profile.last_name, "Hansen");
}

#[tokio::test]
async fn unknown_data_key_is_dropped_and_reported() {
  let s = store().await;
  let user = Uuid::new_v4();

  let extraction = Extraction {
    user_data: vec![UserDataRecord {
      key:   "shoe_size".into(),
      value: "44".into(),
    }],
    ..Default::default()
  };

  let applied = s.apply_extraction(user, &extraction).await.unwrap();
  assert!(applied.profile_fields.is_empty());
  assert!(matches!(
    applied.dropped[0],
    DroppedRecord::UnknownProfileField { ref key, .. } if key == "shoe_size"
  ));
}

// ─── Extraction: PERSON records ──────────────────────────────────────────────

#[tokio::test]
async fn person_record_creates_ancestor() {
  let s = store().await;
  let user = Uuid::new_v4();

  let extraction = Extraction {
    persons: vec![person_record(
      "bjorn_grandfather",
      &[
        ("name", "Bjorn"),
        ("relation", "grandfather"),
        ("birth_year", "1920"),
        ("origin", "Norway"),
      ],
    )],
    ..Default::default()
  };

  let applied = s.apply_extraction(user, &extraction).await.unwrap();
  assert_eq!(applied.persons.len(), 1);
  assert!(applied.persons[0].created);

  let ancestor = s
    .ancestor_by_unique_id(user, "bjorn_grandfather")
    .await
    .unwrap()
    .unwrap();
  assert_eq!(ancestor.name, "Bjorn");
  assert_eq!(ancestor.relation, "grandfather");
  assert_eq!(ancestor.birth_year, Some(1920));
  assert_eq!(ancestor.origin.as_deref(), Some("Norway"));
}

#[tokio::test]
async fn person_record_upserts_on_user_and_unique_id() {
  let s = store().await;
  let user = Uuid::new_v4();

  let first = Extraction {
    persons: vec![person_record(
      "bjorn_grandfather",
      &[("name", "Bjorn"), ("relation", "grandfather")],
    )],
    ..Default::default()
  };
  s.apply_extraction(user, &first).await.unwrap();

  let second = Extraction {
    persons: vec![person_record(
      "bjorn_grandfather",
      &[("name", "Bjorn Hansen"), ("relation", "grandfather")],
    )],
    ..Default::default()
  };
  let applied = s.apply_extraction(user, &second).await.unwrap();
  assert!(!applied.persons[0].created);

  let ancestors = s.ancestors_for_user(user).await.unwrap();
  assert_eq!(ancestors.len(), 1);
  assert_eq!(ancestors[0].name, "Bjorn Hansen");
}

#[tokio::test]
async fn person_records_are_scoped_per_user() {
  let s = store().await;
  let (u1, u2) = (Uuid::new_v4(), Uuid::new_v4());

  let extraction = Extraction {
    persons: vec![person_record("bjorn", &[("name", "Bjorn")])],
    ..Default::default()
  };
  s.apply_extraction(u1, &extraction).await.unwrap();
  s.apply_extraction(u2, &extraction).await.unwrap();

  assert_eq!(s.ancestors_for_user(u1).await.unwrap().len(), 1);
  assert_eq!(s.ancestors_for_user(u2).await.unwrap().len(), 1);
  assert_eq!(s.ancestors_excluding_user(u1).await.unwrap().len(), 1);
}

#[tokio::test]
async fn unstructured_person_attribute_is_ignored_and_reported() {
  let s = store().await;
  let user = Uuid::new_v4();

  let extraction = Extraction {
    persons: vec![person_record(
      "bjorn",
      &[("name", "Bjorn"), ("occupation", "fisherman")],
    )],
    ..Default::default()
  };

  let applied = s.apply_extraction(user, &extraction).await.unwrap();
  assert!(matches!(
    applied.dropped[0],
    DroppedRecord::IgnoredPersonAttribute { ref key, .. }
      if key == "occupation"
  ));
  // The ancestor itself is still created, and no fact row appears.
  let ancestor = s.ancestor_by_unique_id(user, "bjorn").await.unwrap().unwrap();
  assert!(s
    .facts_for_ancestor(ancestor.ancestor_id)
    .await
    .unwrap()
    .is_empty());
}

// ─── Extraction: FACT records ────────────────────────────────────────────────

#[tokio::test]
async fn fact_with_structured_key_overwrites_ancestor_field() {
  let s = store().await;
  let user = Uuid::new_v4();

  // The spec's core property: a PERSON tag followed by a FACT tag for
  // `origin` leaves the ancestor with that origin.
  let extraction = Extraction {
    persons: vec![person_record(
      "bjorn",
      &[("name", "Bjorn"), ("relation", "grandfather")],
    )],
    facts: vec![fact_record("bjorn", "origin", "Norway")],
    ..Default::default()
  };

  let applied = s.apply_extraction(user, &extraction).await.unwrap();
  assert!(applied.facts[0].structured);

  let ancestor = s.ancestor_by_unique_id(user, "bjorn").await.unwrap().unwrap();
  assert_eq!(ancestor.origin.as_deref(), Some("Norway"));
  // Structured keys never create generic fact rows.
  assert!(s
    .facts_for_ancestor(ancestor.ancestor_id)
    .await
    .unwrap()
    .is_empty());
}

#[tokio::test]
async fn fact_applies_across_later_extraction_calls() {
  let s = store().await;
  let user = Uuid::new_v4();

  let first = Extraction {
    persons: vec![person_record("bjorn", &[("name", "Bjorn")])],
    ..Default::default()
  };
  s.apply_extraction(user, &first).await.unwrap();

  let second = Extraction {
    facts: vec![fact_record("bjorn", "death_year", "1999")],
    ..Default::default()
  };
  s.apply_extraction(user, &second).await.unwrap();

  let ancestor = s.ancestor_by_unique_id(user, "bjorn").await.unwrap().unwrap();
  assert_eq!(ancestor.death_year, Some(1999));
}

#[tokio::test]
async fn generic_fact_upserts_last_write_wins() {
  let s = store().await;
  let user = Uuid::new_v4();

  let extraction = Extraction {
    persons: vec![person_record("bjorn", &[("name", "Bjorn")])],
    facts: vec![
      fact_record("bjorn", "occupation", "farmer"),
      fact_record("bjorn", "occupation", "fisherman"),
    ],
    ..Default::default()
  };
  s.apply_extraction(user, &extraction).await.unwrap();

  let ancestor = s.ancestor_by_unique_id(user, "bjorn").await.unwrap().unwrap();
  let facts = s.facts_for_ancestor(ancestor.ancestor_id).await.unwrap();
  assert_eq!(facts.len(), 1);
  assert_eq!(facts[0].key, "occupation");
  assert_eq!(facts[0].value, "fisherman");
}

#[tokio::test]
async fn fact_for_unknown_person_is_dropped_and_reported() {
  let s = store().await;
  let user = Uuid::new_v4();

  let extraction = Extraction {
    facts: vec![fact_record("nobody", "origin", "Norway")],
    ..Default::default()
  };

  let applied = s.apply_extraction(user, &extraction).await.unwrap();
  assert!(applied.facts.is_empty());
  assert!(matches!(
    applied.dropped[0],
    DroppedRecord::UnknownPersonId { ref person_id, .. }
      if person_id == "nobody"
  ));
}

#[tokio::test]
async fn fact_does_not_resolve_other_users_ancestors() {
  let s = store().await;
  let (u1, u2) = (Uuid::new_v4(), Uuid::new_v4());

  let setup = Extraction {
    persons: vec![person_record("bjorn", &[("name", "Bjorn")])],
    ..Default::default()
  };
  s.apply_extraction(u1, &setup).await.unwrap();

  // u2's FACT must not touch u1's ancestor of the same unique id.
  let extraction = Extraction {
    facts: vec![fact_record("bjorn", "origin", "Sweden")],
    ..Default::default()
  };
  let applied = s.apply_extraction(u2, &extraction).await.unwrap();
  assert!(applied.facts.is_empty());
  assert_eq!(applied.dropped.len(), 1);

  let ancestor = s.ancestor_by_unique_id(u1, "bjorn").await.unwrap().unwrap();
  assert_eq!(ancestor.origin, None);
}

#[tokio::test]
async fn non_numeric_year_is_dropped_and_reported() {
  let s = store().await;
  let user = Uuid::new_v4();

  let extraction = Extraction {
    persons: vec![person_record("bjorn", &[("name", "Bjorn")])],
    facts: vec![fact_record("bjorn", "birth_year", "long ago")],
    ..Default::default()
  };

  let applied = s.apply_extraction(user, &extraction).await.unwrap();
  assert!(matches!(
    applied.dropped[0],
    DroppedRecord::InvalidValue { ref value, .. } if value == "long ago"
  ));

  let ancestor = s.ancestor_by_unique_id(user, "bjorn").await.unwrap().unwrap();
  assert_eq!(ancestor.birth_year, None);
}

// ─── Ancestors: direct API ───────────────────────────────────────────────────

#[tokio::test]
async fn upsert_ancestor_create_then_update() {
  let s = store().await;
  let user = Uuid::new_v4();

  let (created, was_created) = s
    .upsert_ancestor(new_ancestor(user, "bjorn", "Bjorn"))
    .await
    .unwrap();
  assert!(was_created);

  let mut update = new_ancestor(user, "bjorn", "Bjorn Hansen");
  update.birth_year = Some(1920);
  let (updated, was_created) = s.upsert_ancestor(update).await.unwrap();
  assert!(!was_created);
  assert_eq!(updated.ancestor_id, created.ancestor_id);
  assert_eq!(updated.name, "Bjorn Hansen");
  assert_eq!(updated.birth_year, Some(1920));
}

#[tokio::test]
async fn get_ancestor_missing_returns_none() {
  let s = store().await;
  assert!(s.get_ancestor(Uuid::new_v4()).await.unwrap().is_none());
}

// ─── Stories and media ───────────────────────────────────────────────────────

#[tokio::test]
async fn story_and_media_roundtrip() {
  let s = store().await;
  let user = Uuid::new_v4();
  let (ancestor, _) = s
    .upsert_ancestor(new_ancestor(user, "bjorn", "Bjorn"))
    .await
    .unwrap();

  s.add_story(NewStory {
    ancestor_id: ancestor.ancestor_id,
    user_id:     user,
    content:     "He sailed to Iceland.".into(),
    context:     Some("told at midsummer".into()),
  })
  .await
  .unwrap();

  s.add_media(NewMedia {
    ancestor_id: ancestor.ancestor_id,
    user_id:     user,
    url:         "https://media.example/bjorn.jpg".into(),
    media_type:  MediaType::Photo,
    title:       None,
  })
  .await
  .unwrap();

  let stories = s.stories_for_ancestor(ancestor.ancestor_id).await.unwrap();
  assert_eq!(stories.len(), 1);
  assert_eq!(stories[0].context.as_deref(), Some("told at midsummer"));

  let media = s.media_for_ancestor(ancestor.ancestor_id).await.unwrap();
  assert_eq!(media.len(), 1);
  assert_eq!(media[0].media_type, MediaType::Photo);
}

// ─── Matches ─────────────────────────────────────────────────────────────────

fn new_match(a: Uuid, b: Uuid) -> NewAncestorMatch {
  NewAncestorMatch {
    ancestor_a:          a,
    ancestor_b:          b,
    confidence:          0.9,
    matching_attributes: MatchingAttributes::default(),
    status:              MatchStatus::Suggested,
  }
}

async fn two_ancestors(s: &SqliteStore) -> (Uuid, Uuid) {
  let (u1, u2) = (Uuid::new_v4(), Uuid::new_v4());
  let (a, _) = s
    .upsert_ancestor(new_ancestor(u1, "a", "Bjorn"))
    .await
    .unwrap();
  let (b, _) = s
    .upsert_ancestor(new_ancestor(u2, "b", "Bjorn"))
    .await
    .unwrap();
  (a.ancestor_id, b.ancestor_id)
}

#[tokio::test]
async fn insert_match_stores_canonical_pair() {
  let s = store().await;
  let (a, b) = two_ancestors(&s).await;

  let m = s.insert_match(new_match(b, a)).await.unwrap();
  assert!(m.ancestor_a <= m.ancestor_b);
  assert_eq!(m.status, MatchStatus::Suggested);
}

#[tokio::test]
async fn reversed_pair_is_rejected_as_duplicate() {
  let s = store().await;
  let (a, b) = two_ancestors(&s).await;

  s.insert_match(new_match(a, b)).await.unwrap();

  let err = s.insert_match(new_match(b, a)).await.unwrap_err();
  assert!(matches!(err, crate::Error::DuplicateMatch(_, _)));
}

#[tokio::test]
async fn self_match_is_rejected() {
  let s = store().await;
  let (a, _) = two_ancestors(&s).await;

  let err = s.insert_match(new_match(a, a)).await.unwrap_err();
  assert!(matches!(err, crate::Error::SelfMatch));
}

#[tokio::test]
async fn find_match_between_works_in_either_order() {
  let s = store().await;
  let (a, b) = two_ancestors(&s).await;

  let m = s.insert_match(new_match(a, b)).await.unwrap();
  let found = s.find_match_between(b, a).await.unwrap().unwrap();
  assert_eq!(found.match_id, m.match_id);
}

#[tokio::test]
async fn set_match_status_transitions() {
  let s = store().await;
  let (a, b) = two_ancestors(&s).await;

  let m = s.insert_match(new_match(a, b)).await.unwrap();
  let confirmed = s
    .set_match_status(m.match_id, MatchStatus::Confirmed)
    .await
    .unwrap();
  assert_eq!(confirmed.status, MatchStatus::Confirmed);
}

#[tokio::test]
async fn set_match_status_missing_errors() {
  let s = store().await;
  let err = s
    .set_match_status(Uuid::new_v4(), MatchStatus::Confirmed)
    .await
    .unwrap_err();
  assert!(matches!(err, crate::Error::MatchNotFound(_)));
}

#[tokio::test]
async fn matching_attributes_roundtrip() {
  use kin_core::matching::YearProximity;

  let s = store().await;
  let (a, b) = two_ancestors(&s).await;

  let mut input = new_match(a, b);
  input.matching_attributes = MatchingAttributes {
    birth_year:  Some(YearProximity::Exact),
    origin:      Some(0.95),
    birth_place: None,
  };
  let m = s.insert_match(input).await.unwrap();

  let found = s.get_match(m.match_id).await.unwrap().unwrap();
  assert_eq!(found.matching_attributes.birth_year, Some(YearProximity::Exact));
  assert_eq!(found.matching_attributes.origin, Some(0.95));
  assert_eq!(found.matching_attributes.birth_place, None);
}

#[tokio::test]
async fn confirmed_matches_require_both_sides_in_member_set() {
  let s = store().await;
  let (u1, u2, u3) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());

  let (a, _) = s
    .upsert_ancestor(new_ancestor(u1, "a", "Bjorn"))
    .await
    .unwrap();
  let (b, _) = s
    .upsert_ancestor(new_ancestor(u2, "b", "Bjorn"))
    .await
    .unwrap();
  let (c, _) = s
    .upsert_ancestor(new_ancestor(u3, "c", "Bjorn"))
    .await
    .unwrap();

  let inside = s
    .insert_match(new_match(a.ancestor_id, b.ancestor_id))
    .await
    .unwrap();
  let outside = s
    .insert_match(new_match(a.ancestor_id, c.ancestor_id))
    .await
    .unwrap();
  s.set_match_status(inside.match_id, MatchStatus::Confirmed)
    .await
    .unwrap();
  s.set_match_status(outside.match_id, MatchStatus::Confirmed)
    .await
    .unwrap();

  // u3 is outside the member set, so only the u1–u2 match qualifies.
  let matches = s.confirmed_matches_for_users(&[u1, u2]).await.unwrap();
  assert_eq!(matches.len(), 1);
  assert_eq!(matches[0].match_id, inside.match_id);

  assert!(s.confirmed_matches_for_users(&[]).await.unwrap().is_empty());
}

#[tokio::test]
async fn suggested_matches_are_excluded_from_confirmed_query() {
  let s = store().await;
  let (u1, u2) = (Uuid::new_v4(), Uuid::new_v4());

  let (a, _) = s
    .upsert_ancestor(new_ancestor(u1, "a", "Bjorn"))
    .await
    .unwrap();
  let (b, _) = s
    .upsert_ancestor(new_ancestor(u2, "b", "Bjorn"))
    .await
    .unwrap();
  s.insert_match(new_match(a.ancestor_id, b.ancestor_id))
    .await
    .unwrap();

  assert!(s
    .confirmed_matches_for_users(&[u1, u2])
    .await
    .unwrap()
    .is_empty());
}

// ─── Family connections ──────────────────────────────────────────────────────

#[tokio::test]
async fn family_connection_get_or_create_on_canonical_pair() {
  let s = store().await;
  let (u1, u2) = (Uuid::new_v4(), Uuid::new_v4());

  let (first, created) = s
    .upsert_family_connection(NewFamilyConnection {
      user_a:               u1,
      user_b:               u2,
      connection_type:      "siblings".into(),
      shared_ancestor_name: "Bjorn Hansen".into(),
      confidence:           0.9,
    })
    .await
    .unwrap();
  assert!(created);
  assert!(first.user_a <= first.user_b);

  // Reversed order resolves to the same row; the original is unchanged.
  let (second, created) = s
    .upsert_family_connection(NewFamilyConnection {
      user_a:               u2,
      user_b:               u1,
      connection_type:      "cousins".into(),
      shared_ancestor_name: "Someone Else".into(),
      confidence:           0.5,
    })
    .await
    .unwrap();
  assert!(!created);
  assert_eq!(second.connection_id, first.connection_id);
  assert_eq!(second.connection_type, "siblings");

  assert_eq!(s.connections_for_user(u1).await.unwrap().len(), 1);
  assert_eq!(s.connections_for_user(u2).await.unwrap().len(), 1);
}

// ─── Merged tree snapshots ───────────────────────────────────────────────────

#[tokio::test]
async fn merged_tree_snapshot_roundtrip() {
  let s = store().await;
  let (u1, u2) = (Uuid::new_v4(), Uuid::new_v4());

  let tree = s
    .create_merged_tree("Hansen clan", u1, &[u1, u2])
    .await
    .unwrap();

  let fetched = s.get_merged_tree(tree.tree_id).await.unwrap().unwrap();
  assert_eq!(fetched.name, "Hansen clan");
  assert_eq!(fetched.created_by, u1);
  assert_eq!(fetched.member_ids, vec![u1, u2]);
}

// ─── Interview sessions ──────────────────────────────────────────────────────

#[tokio::test]
async fn session_upserts_and_keeps_started_at() {
  let s = store().await;
  let user = Uuid::new_v4();

  let first = s
    .save_session(user, "session-1", &[ChatMessage::user("hello")], false)
    .await
    .unwrap();
  assert_eq!(first.chat_history.len(), 1);
  assert!(!first.completed);

  let history = vec![
    ChatMessage::user("hello"),
    ChatMessage::model("Hail, traveler!"),
  ];
  let second = s
    .save_session(user, "session-1", &history, true)
    .await
    .unwrap();
  assert_eq!(second.chat_history.len(), 2);
  assert!(second.completed);
  assert_eq!(second.started_at, first.started_at);

  let fetched = s.get_session(user, "session-1").await.unwrap().unwrap();
  assert_eq!(fetched.chat_history.len(), 2);
}
