//! SQL schema for the Kin SQLite store.
//!
//! Executed once at connection startup via `PRAGMA user_version`. Future
//! migrations will be gated on that version number.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS profiles (
    user_id                TEXT PRIMARY KEY,
    first_name             TEXT NOT NULL DEFAULT '',
    last_name              TEXT NOT NULL DEFAULT '',
    interview_completed    INTEGER NOT NULL DEFAULT 0,
    interview_started_at   TEXT,
    interview_completed_at TEXT,
    created_at             TEXT NOT NULL,
    updated_at             TEXT NOT NULL
);

-- One row per relative per describing user. Cross-user identity lives in
-- ancestor_matches, never here.
CREATE TABLE IF NOT EXISTS ancestors (
    ancestor_id TEXT PRIMARY KEY,
    user_id     TEXT NOT NULL,
    unique_id   TEXT NOT NULL,    -- user-scoped id, e.g. 'bjorn_grandfather'
    name        TEXT NOT NULL,
    relation    TEXT NOT NULL,
    birth_year  INTEGER,
    death_year  INTEGER,
    birth_place TEXT,
    origin      TEXT,
    created_at  TEXT NOT NULL,
    updated_at  TEXT NOT NULL,
    UNIQUE (user_id, unique_id)
);

-- Key/value attributes outside the structured columns. No UNIQUE on
-- (ancestor_id, key): writes go through an upsert, last write wins.
CREATE TABLE IF NOT EXISTS ancestor_facts (
    fact_id     TEXT PRIMARY KEY,
    ancestor_id TEXT NOT NULL REFERENCES ancestors(ancestor_id),
    key         TEXT NOT NULL,
    value       TEXT NOT NULL,
    created_at  TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS stories (
    story_id    TEXT PRIMARY KEY,
    ancestor_id TEXT NOT NULL REFERENCES ancestors(ancestor_id),
    user_id     TEXT NOT NULL,
    content     TEXT NOT NULL,
    context     TEXT,
    created_at  TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS ancestor_media (
    media_id    TEXT PRIMARY KEY,
    ancestor_id TEXT NOT NULL REFERENCES ancestors(ancestor_id),
    user_id     TEXT NOT NULL,
    url         TEXT NOT NULL,
    media_type  TEXT NOT NULL,   -- 'photo' | 'document' | 'video' | 'audio'
    title       TEXT,
    uploaded_at TEXT NOT NULL
);

-- Pairs are canonical: ancestor_a < ancestor_b (hyphenated lowercase UUIDs
-- compare consistently with their byte order), so one UNIQUE covers both
-- insertion orders.
CREATE TABLE IF NOT EXISTS ancestor_matches (
    match_id            TEXT PRIMARY KEY,
    ancestor_a          TEXT NOT NULL REFERENCES ancestors(ancestor_id),
    ancestor_b          TEXT NOT NULL REFERENCES ancestors(ancestor_id),
    confidence          REAL NOT NULL,
    matching_attributes TEXT NOT NULL DEFAULT '{}',
    status              TEXT NOT NULL DEFAULT 'suggested',
    created_at          TEXT NOT NULL,
    UNIQUE (ancestor_a, ancestor_b),
    CHECK  (ancestor_a < ancestor_b)
);

-- Same canonical-pair scheme over users.
CREATE TABLE IF NOT EXISTS family_connections (
    connection_id        TEXT PRIMARY KEY,
    user_a               TEXT NOT NULL,
    user_b               TEXT NOT NULL,
    connection_type      TEXT NOT NULL,
    shared_ancestor_name TEXT NOT NULL,
    confidence           REAL NOT NULL,
    status               TEXT NOT NULL DEFAULT 'pending',
    created_at           TEXT NOT NULL,
    UNIQUE (user_a, user_b),
    CHECK  (user_a < user_b)
);

-- Snapshot of a merge: members only; the graph is recomputed on demand.
CREATE TABLE IF NOT EXISTS merged_trees (
    tree_id    TEXT PRIMARY KEY,
    name       TEXT NOT NULL,
    created_by TEXT NOT NULL,
    member_ids TEXT NOT NULL,    -- JSON array of user UUIDs
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS interview_sessions (
    user_id       TEXT NOT NULL,
    session_id    TEXT NOT NULL,
    chat_history  TEXT NOT NULL DEFAULT '[]',   -- JSON array of messages
    completed     INTEGER NOT NULL DEFAULT 0,
    started_at    TEXT NOT NULL,
    last_activity TEXT NOT NULL,
    PRIMARY KEY (user_id, session_id)
);

CREATE INDEX IF NOT EXISTS ancestors_user_idx      ON ancestors(user_id);
CREATE INDEX IF NOT EXISTS facts_ancestor_idx      ON ancestor_facts(ancestor_id, key);
CREATE INDEX IF NOT EXISTS stories_ancestor_idx    ON stories(ancestor_id);
CREATE INDEX IF NOT EXISTS media_ancestor_idx      ON ancestor_media(ancestor_id);
CREATE INDEX IF NOT EXISTS matches_status_idx      ON ancestor_matches(status);
CREATE INDEX IF NOT EXISTS connections_user_a_idx  ON family_connections(user_a);
CREATE INDEX IF NOT EXISTS connections_user_b_idx  ON family_connections(user_b);

PRAGMA user_version = 1;
";
