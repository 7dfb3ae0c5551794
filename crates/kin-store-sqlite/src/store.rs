//! [`SqliteStore`] — the SQLite implementation of [`HeritageStore`].

use std::path::Path;

use chrono::Utc;
use rusqlite::OptionalExtension as _;
use uuid::Uuid;

use kin_core::{
  ancestor::{
    Ancestor, AncestorFact, AncestorMedia, NewAncestor, NewMedia, NewStory,
    Story, StructuredField,
  },
  extraction::{
    AppliedExtraction, AppliedFact, AppliedPerson, DroppedRecord, Extraction,
  },
  matching::{
    AncestorMatch, FamilyConnection, MatchStatus, NewAncestorMatch,
    NewFamilyConnection, canonical_pair,
  },
  profile::{ProfileField, UserProfile},
  session::{ChatMessage, InterviewSession},
  store::HeritageStore,
  tree::MergedFamilyTree,
};

use crate::{
  Error, Result,
  encode::{
    RawAncestor, RawConnection, RawFact, RawMatch, RawMedia, RawProfile,
    RawSession, RawStory, RawTree, encode_chat_history,
    encode_connection_status, encode_dt, encode_match_status,
    encode_matching_attributes, encode_media_type, encode_member_ids,
    encode_uuid,
  },
  schema::SCHEMA,
};

/// PERSON-tag attributes with structured-column counterparts. Anything else
/// on a PERSON tag is ignored and reported; PERSON tags carry no generic
/// attribute bag.
const PERSON_ATTRIBUTE_KEYS: [&str; 5] =
  ["name", "relation", "birth_year", "birth_place", "origin"];

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Kin heritage store backed by a single SQLite file.
///
/// Cloning is cheap — the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store — useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Upsert the profile row and return it, applying `mutate` SQL between
  /// the insert-or-ignore and the read-back.
  async fn profile_op(
    &self,
    user_id: Uuid,
    mutate: Option<&'static str>,
  ) -> Result<UserProfile> {
    let id_str = encode_uuid(user_id);
    let now_str = encode_dt(Utc::now());

    let raw = self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT OR IGNORE INTO profiles (user_id, created_at, updated_at)
           VALUES (?1, ?2, ?2)",
          rusqlite::params![id_str, now_str],
        )?;
        if let Some(sql) = mutate {
          conn.execute(sql, rusqlite::params![id_str, now_str])?;
        }
        let raw = conn.query_row(
          &format!(
            "SELECT {} FROM profiles WHERE user_id = ?1",
            RawProfile::COLUMNS
          ),
          rusqlite::params![id_str],
          RawProfile::from_row,
        )?;
        Ok(raw)
      })
      .await?;

    raw.into_profile()
  }

  async fn ancestor_where(
    &self,
    sql_suffix: &'static str,
    param: String,
  ) -> Result<Vec<Ancestor>> {
    let raws: Vec<RawAncestor> = self
      .conn
      .call(move |conn| {
        let sql = format!(
          "SELECT {} FROM ancestors {} ORDER BY rowid",
          RawAncestor::COLUMNS,
          sql_suffix
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(rusqlite::params![param], RawAncestor::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawAncestor::into_ancestor).collect()
  }
}

// ─── HeritageStore impl ──────────────────────────────────────────────────────

impl HeritageStore for SqliteStore {
  type Error = Error;

  // ── Profiles ──────────────────────────────────────────────────────────────

  async fn ensure_profile(&self, user_id: Uuid) -> Result<UserProfile> {
    self.profile_op(user_id, None).await
  }

  async fn get_profile(&self, user_id: Uuid) -> Result<Option<UserProfile>> {
    let id_str = encode_uuid(user_id);

    let raw: Option<RawProfile> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!(
                "SELECT {} FROM profiles WHERE user_id = ?1",
                RawProfile::COLUMNS
              ),
              rusqlite::params![id_str],
              RawProfile::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawProfile::into_profile).transpose()
  }

  async fn mark_interview_started(
    &self,
    user_id: Uuid,
  ) -> Result<UserProfile> {
    // The first stamp wins; restarting an interview does not move it.
    self
      .profile_op(
        user_id,
        Some(
          "UPDATE profiles
           SET interview_started_at = COALESCE(interview_started_at, ?2),
               updated_at = ?2
           WHERE user_id = ?1",
        ),
      )
      .await
  }

  async fn mark_interview_completed(
    &self,
    user_id: Uuid,
  ) -> Result<UserProfile> {
    self
      .profile_op(
        user_id,
        Some(
          "UPDATE profiles
           SET interview_completed = 1,
               interview_completed_at = ?2,
               updated_at = ?2
           WHERE user_id = ?1",
        ),
      )
      .await
  }

  // ── Extraction (the Fact Store Adapter) ───────────────────────────────────

  async fn apply_extraction(
    &self,
    user_id: Uuid,
    extraction: &Extraction,
  ) -> Result<AppliedExtraction> {
    let user_id_str = encode_uuid(user_id);
    let extraction = extraction.clone();

    let applied = self
      .conn
      .call(move |conn| {
        // One transaction per extraction: every row from one generated
        // message commits together or not at all.
        let tx = conn.transaction()?;
        let now = encode_dt(Utc::now());
        let mut applied = AppliedExtraction::default();

        tx.execute(
          "INSERT OR IGNORE INTO profiles (user_id, created_at, updated_at)
           VALUES (?1, ?2, ?2)",
          rusqlite::params![user_id_str, now],
        )?;

        // DATA records → profile fields.
        for record in &extraction.user_data {
          let column = match ProfileField::from_key(&record.key) {
            Some(ProfileField::FirstName) => "first_name",
            Some(ProfileField::LastName) => "last_name",
            None => {
              applied.dropped.push(DroppedRecord::UnknownProfileField {
                key:   record.key.clone(),
                value: record.value.clone(),
              });
              continue;
            }
          };
          tx.execute(
            &format!(
              "UPDATE profiles SET {column} = ?2, updated_at = ?3
               WHERE user_id = ?1"
            ),
            rusqlite::params![user_id_str, record.value, now],
          )?;
          applied
            .profile_fields
            .push((record.key.clone(), record.value.clone()));
        }

        // PERSON records → ancestor upserts.
        for person in &extraction.persons {
          for (key, _) in &person.attributes {
            if !PERSON_ATTRIBUTE_KEYS.contains(&key.as_str()) {
              applied.dropped.push(DroppedRecord::IgnoredPersonAttribute {
                unique_id: person.unique_id.clone(),
                key:       key.clone(),
              });
            }
          }

          let name = person.attribute("name").unwrap_or_default();
          let relation = person.attribute("relation").unwrap_or_default();
          let birth_year = person
            .attribute("birth_year")
            .and_then(|v| v.parse::<i32>().ok());
          let birth_place = person.attribute("birth_place");
          let origin = person.attribute("origin");

          let existing: Option<String> = tx
            .query_row(
              "SELECT ancestor_id FROM ancestors
               WHERE user_id = ?1 AND unique_id = ?2",
              rusqlite::params![user_id_str, person.unique_id],
              |r| r.get(0),
            )
            .optional()?;

          match existing {
            Some(ancestor_id) => {
              tx.execute(
                "UPDATE ancestors
                 SET name = ?2, relation = ?3, birth_year = ?4,
                     birth_place = ?5, origin = ?6, updated_at = ?7
                 WHERE ancestor_id = ?1",
                rusqlite::params![
                  ancestor_id,
                  name,
                  relation,
                  birth_year,
                  birth_place,
                  origin,
                  now
                ],
              )?;
              applied.persons.push(AppliedPerson {
                unique_id: person.unique_id.clone(),
                created:   false,
              });
            }
            None => {
              tx.execute(
                "INSERT INTO ancestors (
                   ancestor_id, user_id, unique_id, name, relation,
                   birth_year, birth_place, origin, created_at, updated_at
                 ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?9)",
                rusqlite::params![
                  encode_uuid(Uuid::new_v4()),
                  user_id_str,
                  person.unique_id,
                  name,
                  relation,
                  birth_year,
                  birth_place,
                  origin,
                  now
                ],
              )?;
              applied.persons.push(AppliedPerson {
                unique_id: person.unique_id.clone(),
                created:   true,
              });
            }
          }
        }

        // FACT records → structured-field overwrites or fact upserts.
        for fact in &extraction.facts {
          let ancestor_id: Option<String> = tx
            .query_row(
              "SELECT ancestor_id FROM ancestors
               WHERE user_id = ?1 AND unique_id = ?2",
              rusqlite::params![user_id_str, fact.person_id],
              |r| r.get(0),
            )
            .optional()?;

          let Some(ancestor_id) = ancestor_id else {
            applied.dropped.push(DroppedRecord::UnknownPersonId {
              person_id: fact.person_id.clone(),
              key:       fact.key.clone(),
            });
            continue;
          };

          match StructuredField::from_key(&fact.key) {
            Some(field) => {
              let column = match field {
                StructuredField::BirthYear => "birth_year",
                StructuredField::DeathYear => "death_year",
                StructuredField::BirthPlace => "birth_place",
                StructuredField::Origin => "origin",
              };
              let sql = format!(
                "UPDATE ancestors SET {column} = ?2, updated_at = ?3
                 WHERE ancestor_id = ?1"
              );

              if matches!(
                field,
                StructuredField::BirthYear | StructuredField::DeathYear
              ) {
                // Year columns hold integers; a value that does not
                // parse is dropped rather than stored as text.
                let Ok(year) = fact.value.parse::<i32>() else {
                  applied.dropped.push(DroppedRecord::InvalidValue {
                    person_id: fact.person_id.clone(),
                    key:       fact.key.clone(),
                    value:     fact.value.clone(),
                  });
                  continue;
                };
                tx.execute(&sql, rusqlite::params![ancestor_id, year, now])?;
              } else {
                tx.execute(
                  &sql,
                  rusqlite::params![ancestor_id, fact.value, now],
                )?;
              }

              applied.facts.push(AppliedFact {
                person_id:  fact.person_id.clone(),
                key:        fact.key.clone(),
                value:      fact.value.clone(),
                structured: true,
              });
            }

            None => {
              let updated = tx.execute(
                "UPDATE ancestor_facts SET value = ?3
                 WHERE ancestor_id = ?1 AND key = ?2",
                rusqlite::params![ancestor_id, fact.key, fact.value],
              )?;
              if updated == 0 {
                tx.execute(
                  "INSERT INTO ancestor_facts (
                     fact_id, ancestor_id, key, value, created_at
                   ) VALUES (?1, ?2, ?3, ?4, ?5)",
                  rusqlite::params![
                    encode_uuid(Uuid::new_v4()),
                    ancestor_id,
                    fact.key,
                    fact.value,
                    now
                  ],
                )?;
              }
              applied.facts.push(AppliedFact {
                person_id:  fact.person_id.clone(),
                key:        fact.key.clone(),
                value:      fact.value.clone(),
                structured: false,
              });
            }
          }
        }

        tx.commit()?;
        Ok(applied)
      })
      .await?;

    Ok(applied)
  }

  // ── Ancestors ─────────────────────────────────────────────────────────────

  async fn upsert_ancestor(
    &self,
    input: NewAncestor,
  ) -> Result<(Ancestor, bool)> {
    let user_id_str = encode_uuid(input.user_id);

    let (raw, created) = self
      .conn
      .call(move |conn| {
        let now = encode_dt(Utc::now());

        let existing: Option<String> = conn
          .query_row(
            "SELECT ancestor_id FROM ancestors
             WHERE user_id = ?1 AND unique_id = ?2",
            rusqlite::params![user_id_str, input.unique_id],
            |r| r.get(0),
          )
          .optional()?;
        let created = existing.is_none();

        match existing {
          Some(ancestor_id) => {
            conn.execute(
              "UPDATE ancestors
               SET name = ?2, relation = ?3, birth_year = ?4,
                   death_year = ?5, birth_place = ?6, origin = ?7,
                   updated_at = ?8
               WHERE ancestor_id = ?1",
              rusqlite::params![
                ancestor_id,
                input.name,
                input.relation,
                input.birth_year,
                input.death_year,
                input.birth_place,
                input.origin,
                now
              ],
            )?;
          }
          None => {
            conn.execute(
              "INSERT INTO ancestors (
                 ancestor_id, user_id, unique_id, name, relation,
                 birth_year, death_year, birth_place, origin,
                 created_at, updated_at
               ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?10)",
              rusqlite::params![
                encode_uuid(Uuid::new_v4()),
                user_id_str,
                input.unique_id,
                input.name,
                input.relation,
                input.birth_year,
                input.death_year,
                input.birth_place,
                input.origin,
                now
              ],
            )?;
          }
        }

        let raw = conn.query_row(
          &format!(
            "SELECT {} FROM ancestors WHERE user_id = ?1 AND unique_id = ?2",
            RawAncestor::COLUMNS
          ),
          rusqlite::params![user_id_str, input.unique_id],
          RawAncestor::from_row,
        )?;
        Ok((raw, created))
      })
      .await?;

    Ok((raw.into_ancestor()?, created))
  }

  async fn get_ancestor(&self, ancestor_id: Uuid) -> Result<Option<Ancestor>> {
    let id_str = encode_uuid(ancestor_id);

    let raw: Option<RawAncestor> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!(
                "SELECT {} FROM ancestors WHERE ancestor_id = ?1",
                RawAncestor::COLUMNS
              ),
              rusqlite::params![id_str],
              RawAncestor::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawAncestor::into_ancestor).transpose()
  }

  async fn ancestor_by_unique_id(
    &self,
    user_id: Uuid,
    unique_id: &str,
  ) -> Result<Option<Ancestor>> {
    let user_id_str = encode_uuid(user_id);
    let unique_id = unique_id.to_owned();

    let raw: Option<RawAncestor> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!(
                "SELECT {} FROM ancestors
                 WHERE user_id = ?1 AND unique_id = ?2",
                RawAncestor::COLUMNS
              ),
              rusqlite::params![user_id_str, unique_id],
              RawAncestor::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawAncestor::into_ancestor).transpose()
  }

  async fn ancestors_for_user(&self, user_id: Uuid) -> Result<Vec<Ancestor>> {
    self
      .ancestor_where("WHERE user_id = ?1", encode_uuid(user_id))
      .await
  }

  async fn ancestors_excluding_user(
    &self,
    user_id: Uuid,
  ) -> Result<Vec<Ancestor>> {
    self
      .ancestor_where("WHERE user_id != ?1", encode_uuid(user_id))
      .await
  }

  async fn facts_for_ancestor(
    &self,
    ancestor_id: Uuid,
  ) -> Result<Vec<AncestorFact>> {
    let id_str = encode_uuid(ancestor_id);

    let raws: Vec<RawFact> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT fact_id, ancestor_id, key, value, created_at
           FROM ancestor_facts WHERE ancestor_id = ?1 ORDER BY rowid",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![id_str], RawFact::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawFact::into_fact).collect()
  }

  // ── Stories and media ─────────────────────────────────────────────────────

  async fn add_story(&self, input: NewStory) -> Result<Story> {
    let story = Story {
      story_id:    Uuid::new_v4(),
      ancestor_id: input.ancestor_id,
      user_id:     input.user_id,
      content:     input.content,
      context:     input.context,
      created_at:  Utc::now(),
    };

    let story_id_str = encode_uuid(story.story_id);
    let ancestor_id_str = encode_uuid(story.ancestor_id);
    let user_id_str = encode_uuid(story.user_id);
    let content = story.content.clone();
    let context = story.context.clone();
    let at_str = encode_dt(story.created_at);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO stories (
             story_id, ancestor_id, user_id, content, context, created_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
          rusqlite::params![
            story_id_str,
            ancestor_id_str,
            user_id_str,
            content,
            context,
            at_str
          ],
        )?;
        Ok(())
      })
      .await?;

    Ok(story)
  }

  async fn stories_for_ancestor(
    &self,
    ancestor_id: Uuid,
  ) -> Result<Vec<Story>> {
    let id_str = encode_uuid(ancestor_id);

    let raws: Vec<RawStory> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT story_id, ancestor_id, user_id, content, context,
                  created_at
           FROM stories WHERE ancestor_id = ?1 ORDER BY rowid",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![id_str], RawStory::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawStory::into_story).collect()
  }

  async fn add_media(&self, input: NewMedia) -> Result<AncestorMedia> {
    let media = AncestorMedia {
      media_id:    Uuid::new_v4(),
      ancestor_id: input.ancestor_id,
      user_id:     input.user_id,
      url:         input.url,
      media_type:  input.media_type,
      title:       input.title,
      uploaded_at: Utc::now(),
    };

    let media_id_str = encode_uuid(media.media_id);
    let ancestor_id_str = encode_uuid(media.ancestor_id);
    let user_id_str = encode_uuid(media.user_id);
    let url = media.url.clone();
    let type_str = encode_media_type(media.media_type).to_owned();
    let title = media.title.clone();
    let at_str = encode_dt(media.uploaded_at);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO ancestor_media (
             media_id, ancestor_id, user_id, url, media_type, title,
             uploaded_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
          rusqlite::params![
            media_id_str,
            ancestor_id_str,
            user_id_str,
            url,
            type_str,
            title,
            at_str
          ],
        )?;
        Ok(())
      })
      .await?;

    Ok(media)
  }

  async fn media_for_ancestor(
    &self,
    ancestor_id: Uuid,
  ) -> Result<Vec<AncestorMedia>> {
    let id_str = encode_uuid(ancestor_id);

    let raws: Vec<RawMedia> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT media_id, ancestor_id, user_id, url, media_type, title,
                  uploaded_at
           FROM ancestor_media WHERE ancestor_id = ?1 ORDER BY rowid",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![id_str], RawMedia::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawMedia::into_media).collect()
  }

  // ── Matches ───────────────────────────────────────────────────────────────

  async fn insert_match(
    &self,
    input: NewAncestorMatch,
  ) -> Result<AncestorMatch> {
    if input.ancestor_a == input.ancestor_b {
      return Err(Error::SelfMatch);
    }
    let (a, b) = canonical_pair(input.ancestor_a, input.ancestor_b);

    if self.find_match_between(a, b).await?.is_some() {
      return Err(Error::DuplicateMatch(a, b));
    }

    let stored = AncestorMatch {
      match_id:            Uuid::new_v4(),
      ancestor_a:          a,
      ancestor_b:          b,
      confidence:          input.confidence,
      matching_attributes: input.matching_attributes,
      status:              input.status,
      created_at:          Utc::now(),
    };

    let match_id_str = encode_uuid(stored.match_id);
    let a_str = encode_uuid(a);
    let b_str = encode_uuid(b);
    let attrs_str = encode_matching_attributes(&stored.matching_attributes)?;
    let status_str = encode_match_status(stored.status).to_owned();
    let at_str = encode_dt(stored.created_at);
    let confidence = stored.confidence;

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO ancestor_matches (
             match_id, ancestor_a, ancestor_b, confidence,
             matching_attributes, status, created_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
          rusqlite::params![
            match_id_str,
            a_str,
            b_str,
            confidence,
            attrs_str,
            status_str,
            at_str
          ],
        )?;
        Ok(())
      })
      .await?;

    Ok(stored)
  }

  async fn find_match_between(
    &self,
    a: Uuid,
    b: Uuid,
  ) -> Result<Option<AncestorMatch>> {
    let (a, b) = canonical_pair(a, b);
    let a_str = encode_uuid(a);
    let b_str = encode_uuid(b);

    let raw: Option<RawMatch> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!(
                "SELECT {} FROM ancestor_matches
                 WHERE ancestor_a = ?1 AND ancestor_b = ?2",
                RawMatch::COLUMNS
              ),
              rusqlite::params![a_str, b_str],
              RawMatch::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawMatch::into_match).transpose()
  }

  async fn get_match(&self, match_id: Uuid) -> Result<Option<AncestorMatch>> {
    let id_str = encode_uuid(match_id);

    let raw: Option<RawMatch> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!(
                "SELECT {} FROM ancestor_matches WHERE match_id = ?1",
                RawMatch::COLUMNS
              ),
              rusqlite::params![id_str],
              RawMatch::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawMatch::into_match).transpose()
  }

  async fn set_match_status(
    &self,
    match_id: Uuid,
    status: MatchStatus,
  ) -> Result<AncestorMatch> {
    let id_str = encode_uuid(match_id);
    let status_str = encode_match_status(status).to_owned();

    let updated = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE ancestor_matches SET status = ?2 WHERE match_id = ?1",
          rusqlite::params![id_str, status_str],
        )?)
      })
      .await?;

    if updated == 0 {
      return Err(Error::MatchNotFound(match_id));
    }

    self
      .get_match(match_id)
      .await?
      .ok_or(Error::MatchNotFound(match_id))
  }

  async fn matches_for_user(
    &self,
    user_id: Uuid,
  ) -> Result<Vec<AncestorMatch>> {
    let id_str = encode_uuid(user_id);

    let raws: Vec<RawMatch> = self
      .conn
      .call(move |conn| {
        let sql = format!(
          "SELECT {} FROM ancestor_matches m
           JOIN ancestors a ON a.ancestor_id = m.ancestor_a
           JOIN ancestors b ON b.ancestor_id = m.ancestor_b
           WHERE a.user_id = ?1 OR b.user_id = ?1
           ORDER BY m.rowid",
          RawMatch::COLUMNS
            .split(", ")
            .map(|c| format!("m.{c}"))
            .collect::<Vec<_>>()
            .join(", ")
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(rusqlite::params![id_str], RawMatch::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawMatch::into_match).collect()
  }

  async fn confirmed_matches_for_users(
    &self,
    user_ids: &[Uuid],
  ) -> Result<Vec<AncestorMatch>> {
    if user_ids.is_empty() {
      return Ok(Vec::new());
    }
    let id_strs: Vec<String> =
      user_ids.iter().copied().map(encode_uuid).collect();

    let raws: Vec<RawMatch> = self
      .conn
      .call(move |conn| {
        let placeholders =
          vec!["?"; id_strs.len()].join(", ");
        let columns = RawMatch::COLUMNS
          .split(", ")
          .map(|c| format!("m.{c}"))
          .collect::<Vec<_>>()
          .join(", ");
        let sql = format!(
          "SELECT {columns} FROM ancestor_matches m
           JOIN ancestors a ON a.ancestor_id = m.ancestor_a
           JOIN ancestors b ON b.ancestor_id = m.ancestor_b
           WHERE m.status = 'confirmed'
             AND a.user_id IN ({placeholders})
             AND b.user_id IN ({placeholders})
           ORDER BY m.rowid"
        );
        let mut stmt = conn.prepare(&sql)?;
        let params = rusqlite::params_from_iter(
          id_strs.iter().chain(id_strs.iter()),
        );
        let rows = stmt
          .query_map(params, RawMatch::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawMatch::into_match).collect()
  }

  // ── Family connections ────────────────────────────────────────────────────

  async fn upsert_family_connection(
    &self,
    input: NewFamilyConnection,
  ) -> Result<(FamilyConnection, bool)> {
    let (a, b) = canonical_pair(input.user_a, input.user_b);
    let a_str = encode_uuid(a);
    let b_str = encode_uuid(b);

    let existing: Option<RawConnection> = {
      let a_str = a_str.clone();
      let b_str = b_str.clone();
      self
        .conn
        .call(move |conn| {
          Ok(
            conn
              .query_row(
                &format!(
                  "SELECT {} FROM family_connections
                   WHERE user_a = ?1 AND user_b = ?2",
                  RawConnection::COLUMNS
                ),
                rusqlite::params![a_str, b_str],
                RawConnection::from_row,
              )
              .optional()?,
          )
        })
        .await?
    };

    if let Some(raw) = existing {
      return Ok((raw.into_connection()?, false));
    }

    let connection = FamilyConnection {
      connection_id:        Uuid::new_v4(),
      user_a:               a,
      user_b:               b,
      connection_type:      input.connection_type,
      shared_ancestor_name: input.shared_ancestor_name,
      confidence:           input.confidence,
      status:               kin_core::matching::ConnectionStatus::Pending,
      created_at:           Utc::now(),
    };

    let connection_id_str = encode_uuid(connection.connection_id);
    let type_str = connection.connection_type.clone();
    let shared_name = connection.shared_ancestor_name.clone();
    let status_str = encode_connection_status(connection.status).to_owned();
    let at_str = encode_dt(connection.created_at);
    let confidence = connection.confidence;

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO family_connections (
             connection_id, user_a, user_b, connection_type,
             shared_ancestor_name, confidence, status, created_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
          rusqlite::params![
            connection_id_str,
            a_str,
            b_str,
            type_str,
            shared_name,
            confidence,
            status_str,
            at_str
          ],
        )?;
        Ok(())
      })
      .await?;

    Ok((connection, true))
  }

  async fn connections_for_user(
    &self,
    user_id: Uuid,
  ) -> Result<Vec<FamilyConnection>> {
    let id_str = encode_uuid(user_id);

    let raws: Vec<RawConnection> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {} FROM family_connections
           WHERE user_a = ?1 OR user_b = ?1 ORDER BY rowid",
          RawConnection::COLUMNS
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![id_str], RawConnection::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws
      .into_iter()
      .map(RawConnection::into_connection)
      .collect()
  }

  // ── Merged tree snapshots ─────────────────────────────────────────────────

  async fn create_merged_tree(
    &self,
    name: &str,
    created_by: Uuid,
    member_ids: &[Uuid],
  ) -> Result<MergedFamilyTree> {
    let tree = MergedFamilyTree {
      tree_id:    Uuid::new_v4(),
      name:       name.to_owned(),
      created_by,
      member_ids: member_ids.to_vec(),
      created_at: Utc::now(),
    };

    let tree_id_str = encode_uuid(tree.tree_id);
    let name = tree.name.clone();
    let created_by_str = encode_uuid(created_by);
    let members_str = encode_member_ids(&tree.member_ids)?;
    let at_str = encode_dt(tree.created_at);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO merged_trees (
             tree_id, name, created_by, member_ids, created_at
           ) VALUES (?1, ?2, ?3, ?4, ?5)",
          rusqlite::params![
            tree_id_str,
            name,
            created_by_str,
            members_str,
            at_str
          ],
        )?;
        Ok(())
      })
      .await?;

    Ok(tree)
  }

  async fn get_merged_tree(
    &self,
    tree_id: Uuid,
  ) -> Result<Option<MergedFamilyTree>> {
    let id_str = encode_uuid(tree_id);

    let raw: Option<RawTree> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT tree_id, name, created_by, member_ids, created_at
               FROM merged_trees WHERE tree_id = ?1",
              rusqlite::params![id_str],
              RawTree::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawTree::into_tree).transpose()
  }

  // ── Interview sessions ────────────────────────────────────────────────────

  async fn save_session(
    &self,
    user_id: Uuid,
    session_id: &str,
    chat_history: &[ChatMessage],
    completed: bool,
  ) -> Result<InterviewSession> {
    let user_id_str = encode_uuid(user_id);
    let session_id = session_id.to_owned();
    let history_str = encode_chat_history(chat_history)?;

    let raw = self
      .conn
      .call(move |conn| {
        let now = encode_dt(Utc::now());
        conn.execute(
          "INSERT INTO interview_sessions (
             user_id, session_id, chat_history, completed, started_at,
             last_activity
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?5)
           ON CONFLICT (user_id, session_id) DO UPDATE SET
             chat_history = excluded.chat_history,
             completed = excluded.completed,
             last_activity = excluded.last_activity",
          rusqlite::params![
            user_id_str,
            session_id,
            history_str,
            completed,
            now
          ],
        )?;
        let raw = conn.query_row(
          "SELECT user_id, session_id, chat_history, completed, started_at,
                  last_activity
           FROM interview_sessions
           WHERE user_id = ?1 AND session_id = ?2",
          rusqlite::params![user_id_str, session_id],
          RawSession::from_row,
        )?;
        Ok(raw)
      })
      .await?;

    raw.into_session()
  }

  async fn get_session(
    &self,
    user_id: Uuid,
    session_id: &str,
  ) -> Result<Option<InterviewSession>> {
    let user_id_str = encode_uuid(user_id);
    let session_id = session_id.to_owned();

    let raw: Option<RawSession> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT user_id, session_id, chat_history, completed,
                      started_at, last_activity
               FROM interview_sessions
               WHERE user_id = ?1 AND session_id = ?2",
              rusqlite::params![user_id_str, session_id],
              RawSession::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawSession::into_session).transpose()
  }
}
