//! SQLite backend with FTS5 keyword search and stored embeddings.
//!
//! One table per entity, plus:
//! - `verses`: the scripture corpus, embeddings as little-endian f32 BLOBs
//! - `verses_fts`: external-content FTS5 index over verse text (BM25)
//!
//! Triggers keep the FTS index in sync on insert/delete/update.

use crate::vector;
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use selah_core::error::{RetrievalError, StoreError};
use selah_core::store::*;
use selah_core::{Passage, VerseIndex};
use sqlx::sqlite::{
    Sqlite, SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteRow,
    SqliteSynchronous,
};
use sqlx::{Row, SqlitePool};
use std::str::FromStr;
use tracing::{debug, info};
use uuid::Uuid;

const MIGRATIONS: &[(&str, &str)] = &[
    (
        "profiles",
        r#"
        CREATE TABLE IF NOT EXISTS profiles (
            user_id               TEXT PRIMARY KEY,
            preferred_translation TEXT,
            maturity_level        TEXT,
            current_season        TEXT
        )
        "#,
    ),
    (
        "moments",
        r#"
        CREATE TABLE IF NOT EXISTS moments (
            iid            INTEGER PRIMARY KEY AUTOINCREMENT,
            id             TEXT UNIQUE NOT NULL,
            user_id        TEXT NOT NULL,
            kind           TEXT NOT NULL,
            title          TEXT,
            content        TEXT NOT NULL,
            themes         TEXT NOT NULL DEFAULT '[]',
            struggles      TEXT NOT NULL DEFAULT '[]',
            scripture_refs TEXT NOT NULL DEFAULT '[]',
            created_at     TEXT NOT NULL
        )
        "#,
    ),
    (
        "moments index",
        "CREATE INDEX IF NOT EXISTS idx_moments_user_created ON moments(user_id, created_at DESC)",
    ),
    (
        "prayer_requests",
        r#"
        CREATE TABLE IF NOT EXISTS prayer_requests (
            iid               INTEGER PRIMARY KEY AUTOINCREMENT,
            id                TEXT UNIQUE NOT NULL,
            user_id           TEXT NOT NULL,
            title             TEXT NOT NULL,
            details           TEXT,
            category          TEXT,
            status            TEXT NOT NULL DEFAULT 'active',
            answer_reflection TEXT,
            created_at        TEXT NOT NULL,
            answered_at       TEXT
        )
        "#,
    ),
    (
        "prayer_requests index",
        "CREATE INDEX IF NOT EXISTS idx_prayers_user_status ON prayer_requests(user_id, status)",
    ),
    (
        "obedience_steps",
        r#"
        CREATE TABLE IF NOT EXISTS obedience_steps (
            iid           INTEGER PRIMARY KEY AUTOINCREMENT,
            id            TEXT UNIQUE NOT NULL,
            user_id       TEXT NOT NULL,
            action        TEXT NOT NULL,
            scripture_ref TEXT,
            due_date      TEXT,
            completed     INTEGER NOT NULL DEFAULT 0,
            created_at    TEXT NOT NULL
        )
        "#,
    ),
    (
        "memory_verses",
        r#"
        CREATE TABLE IF NOT EXISTS memory_verses (
            id             TEXT PRIMARY KEY,
            user_id        TEXT NOT NULL,
            reference      TEXT NOT NULL,
            text           TEXT NOT NULL,
            next_review_at TEXT NOT NULL
        )
        "#,
    ),
    (
        "onboarding_answers",
        r#"
        CREATE TABLE IF NOT EXISTS onboarding_answers (
            iid      INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id  TEXT NOT NULL,
            question TEXT NOT NULL,
            answer   TEXT NOT NULL
        )
        "#,
    ),
    (
        "verses",
        r#"
        CREATE TABLE IF NOT EXISTS verses (
            iid         INTEGER PRIMARY KEY AUTOINCREMENT,
            book        TEXT NOT NULL,
            chapter     INTEGER NOT NULL,
            verse       INTEGER NOT NULL,
            translation TEXT NOT NULL,
            text        TEXT NOT NULL,
            embedding   BLOB,
            UNIQUE(book, chapter, verse, translation)
        )
        "#,
    ),
    (
        "verses_fts",
        r#"
        CREATE VIRTUAL TABLE IF NOT EXISTS verses_fts USING fts5(
            text,
            content='verses',
            content_rowid='iid',
            tokenize='porter unicode61'
        )
        "#,
    ),
    (
        "verses insert trigger",
        r#"
        CREATE TRIGGER IF NOT EXISTS verses_ai AFTER INSERT ON verses BEGIN
            INSERT INTO verses_fts(rowid, text) VALUES (new.iid, new.text);
        END
        "#,
    ),
    (
        "verses delete trigger",
        r#"
        CREATE TRIGGER IF NOT EXISTS verses_ad AFTER DELETE ON verses BEGIN
            INSERT INTO verses_fts(verses_fts, rowid, text) VALUES ('delete', old.iid, old.text);
        END
        "#,
    ),
    (
        "verses update trigger",
        r#"
        CREATE TRIGGER IF NOT EXISTS verses_au AFTER UPDATE ON verses BEGIN
            INSERT INTO verses_fts(verses_fts, rowid, text) VALUES ('delete', old.iid, old.text);
            INSERT INTO verses_fts(rowid, text) VALUES (new.iid, new.text);
        END
        "#,
    ),
];

/// A SQLite persistence and retrieval backend.
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open (creating if missing) the database at `url` and run migrations.
    ///
    /// `sqlite::memory:` gives an ephemeral database for tests.
    pub async fn new(url: &str) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str(url)
            .map_err(|e| StoreError::Storage(format!("Invalid SQLite URL: {e}")))?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal);

        // An in-memory database lives only as long as its connection.
        let pool_options = if url.contains(":memory:") {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(4)
        };

        let pool = pool_options
            .connect_with(options)
            .await
            .map_err(|e| StoreError::Storage(format!("Failed to open SQLite: {e}")))?;

        let store = Self::from_pool(pool).await?;
        info!(url, "SQLite store initialized");
        Ok(store)
    }

    /// Wrap an existing pool and run migrations.
    pub async fn from_pool(pool: SqlitePool) -> Result<Self, StoreError> {
        let store = Self { pool };
        store.run_migrations().await?;
        Ok(store)
    }

    async fn run_migrations(&self) -> Result<(), StoreError> {
        for (label, sql) in MIGRATIONS {
            sqlx::query(sql)
                .execute(&self.pool)
                .await
                .map_err(|e| StoreError::MigrationFailed(format!("{label}: {e}")))?;
        }
        debug!(count = MIGRATIONS.len(), "SQLite migrations complete");
        Ok(())
    }

    /// Insert or replace a corpus verse. `None` leaves it keyword-only.
    pub async fn insert_verse(
        &self,
        passage: &Passage,
        embedding: Option<&[f32]>,
    ) -> Result<(), StoreError> {
        let blob = embedding.map(vector::embedding_to_blob);
        sqlx::query(
            r#"
            INSERT INTO verses (book, chapter, verse, translation, text, embedding)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ON CONFLICT(book, chapter, verse, translation) DO UPDATE SET
                text = excluded.text,
                embedding = excluded.embedding
            "#,
        )
        .bind(&passage.book)
        .bind(passage.chapter as i64)
        .bind(passage.verse as i64)
        .bind(passage.translation.to_lowercase())
        .bind(&passage.text)
        .bind(blob.as_deref())
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Storage(format!("verse insert: {e}")))?;
        Ok(())
    }

    /// Build a safe FTS5 query from free text: each word quoted, prefix
    /// matched, and OR-joined so partial matches still rank.
    fn sanitize_fts_query(text: &str) -> String {
        text.split_whitespace()
            .map(|w| {
                w.chars()
                    .filter(|c| c.is_alphanumeric() || *c == '_')
                    .collect::<String>()
            })
            .filter(|w| w.chars().count() >= 3)
            .map(|w| format!("\"{w}\"*"))
            .collect::<Vec<_>>()
            .join(" OR ")
    }
}

fn timestamp(at: DateTime<Utc>) -> String {
    // Fixed width so lexical order in SQL matches time order.
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| StoreError::QueryFailed(format!("bad timestamp '{raw}': {e}")))
}

fn col<T>(row: &SqliteRow, name: &str) -> Result<T, StoreError>
where
    T: for<'r> sqlx::Decode<'r, Sqlite> + sqlx::Type<Sqlite>,
{
    row.try_get(name)
        .map_err(|e| StoreError::QueryFailed(format!("{name} column: {e}")))
}

fn json_list(row: &SqliteRow, name: &str) -> Result<Vec<String>, StoreError> {
    let raw: String = col(row, name)?;
    Ok(serde_json::from_str(&raw).unwrap_or_default())
}

fn to_json(list: &[String]) -> String {
    serde_json::to_string(list).unwrap_or_else(|_| "[]".into())
}

fn row_to_moment(row: &SqliteRow) -> Result<Moment, StoreError> {
    let kind: String = col(row, "kind")?;
    Ok(Moment {
        id: col(row, "id")?,
        user_id: col(row, "user_id")?,
        kind: MomentKind::parse(&kind)
            .ok_or_else(|| StoreError::QueryFailed(format!("unknown moment kind '{kind}'")))?,
        title: col(row, "title")?,
        content: col(row, "content")?,
        themes: json_list(row, "themes")?,
        struggles: json_list(row, "struggles")?,
        scripture_refs: json_list(row, "scripture_refs")?,
        created_at: parse_timestamp(&col::<String>(row, "created_at")?)?,
    })
}

fn row_to_prayer(row: &SqliteRow) -> Result<PrayerRequest, StoreError> {
    let status: String = col(row, "status")?;
    let answered_at: Option<String> = col(row, "answered_at")?;
    Ok(PrayerRequest {
        id: col(row, "id")?,
        user_id: col(row, "user_id")?,
        title: col(row, "title")?,
        details: col(row, "details")?,
        category: col(row, "category")?,
        status: if status == PrayerStatus::Answered.as_str() {
            PrayerStatus::Answered
        } else {
            PrayerStatus::Active
        },
        answer_reflection: col(row, "answer_reflection")?,
        created_at: parse_timestamp(&col::<String>(row, "created_at")?)?,
        answered_at: answered_at.as_deref().map(parse_timestamp).transpose()?,
    })
}

fn row_to_step(row: &SqliteRow) -> Result<ObedienceStep, StoreError> {
    let due_date: Option<String> = col(row, "due_date")?;
    Ok(ObedienceStep {
        id: col(row, "id")?,
        user_id: col(row, "user_id")?,
        action: col(row, "action")?,
        scripture_ref: col(row, "scripture_ref")?,
        due_date: due_date.as_deref().map(parse_timestamp).transpose()?,
        completed: col::<i64>(row, "completed")? != 0,
        created_at: parse_timestamp(&col::<String>(row, "created_at")?)?,
    })
}

fn row_to_passage(row: &SqliteRow) -> Result<Passage, RetrievalError> {
    let read = |e: StoreError| RetrievalError::QueryFailed(e.to_string());
    Ok(Passage {
        book: col(row, "book").map_err(read)?,
        chapter: col::<i64>(row, "chapter").map_err(read)? as u32,
        verse: col::<i64>(row, "verse").map_err(read)? as u32,
        text: col(row, "text").map_err(read)?,
        translation: col(row, "translation").map_err(read)?,
        score: 0.0,
    })
}

#[async_trait]
impl SpiritualStore for SqliteStore {
    fn name(&self) -> &str {
        "sqlite"
    }

    async fn profile(&self, user_id: &str) -> Result<Option<Profile>, StoreError> {
        let row = sqlx::query("SELECT * FROM profiles WHERE user_id = ?1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StoreError::QueryFailed(format!("profile: {e}")))?;

        row.map(|r| {
            Ok(Profile {
                user_id: col(&r, "user_id")?,
                preferred_translation: col(&r, "preferred_translation")?,
                maturity_level: col(&r, "maturity_level")?,
                current_season: col(&r, "current_season")?,
            })
        })
        .transpose()
    }

    async fn upsert_profile(&self, profile: Profile) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO profiles (user_id, preferred_translation, maturity_level, current_season)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(user_id) DO UPDATE SET
                preferred_translation = excluded.preferred_translation,
                maturity_level = excluded.maturity_level,
                current_season = excluded.current_season
            "#,
        )
        .bind(&profile.user_id)
        .bind(&profile.preferred_translation)
        .bind(&profile.maturity_level)
        .bind(&profile.current_season)
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Storage(format!("profile upsert: {e}")))?;
        Ok(())
    }

    async fn recent_moments(
        &self,
        user_id: &str,
        limit: usize,
    ) -> Result<Vec<Moment>, StoreError> {
        let rows = sqlx::query(
            "SELECT * FROM moments WHERE user_id = ?1 ORDER BY created_at DESC, iid DESC LIMIT ?2",
        )
        .bind(user_id)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StoreError::QueryFailed(format!("recent moments: {e}")))?;
        rows.iter().map(row_to_moment).collect()
    }

    async fn insert_moment(&self, moment: NewMoment) -> Result<String, StoreError> {
        let id = Uuid::new_v4().to_string();
        sqlx::query(
            r#"
            INSERT INTO moments (id, user_id, kind, title, content, themes, struggles, scripture_refs, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
        )
        .bind(&id)
        .bind(&moment.user_id)
        .bind(moment.kind.as_str())
        .bind(&moment.title)
        .bind(&moment.content)
        .bind(to_json(&moment.themes))
        .bind(to_json(&moment.struggles))
        .bind(to_json(&moment.scripture_refs))
        .bind(timestamp(Utc::now()))
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Storage(format!("moment insert: {e}")))?;

        debug!(moment_id = %id, kind = moment.kind.as_str(), "Stored moment");
        Ok(id)
    }

    async fn active_prayers(
        &self,
        user_id: &str,
        limit: usize,
    ) -> Result<Vec<PrayerRequest>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT * FROM prayer_requests
            WHERE user_id = ?1 AND status = 'active'
            ORDER BY created_at DESC, iid DESC
            LIMIT ?2
            "#,
        )
        .bind(user_id)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StoreError::QueryFailed(format!("active prayers: {e}")))?;
        rows.iter().map(row_to_prayer).collect()
    }

    async fn insert_prayer_request(
        &self,
        request: NewPrayerRequest,
    ) -> Result<String, StoreError> {
        let id = Uuid::new_v4().to_string();
        sqlx::query(
            r#"
            INSERT INTO prayer_requests (id, user_id, title, details, category, status, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, 'active', ?6)
            "#,
        )
        .bind(&id)
        .bind(&request.user_id)
        .bind(&request.title)
        .bind(&request.details)
        .bind(&request.category)
        .bind(timestamp(Utc::now()))
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Storage(format!("prayer insert: {e}")))?;
        Ok(id)
    }

    async fn mark_prayer_answered(
        &self,
        user_id: &str,
        prayer_id: &str,
        reflection: Option<String>,
    ) -> Result<(), StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE prayer_requests
            SET status = 'answered', answer_reflection = ?3, answered_at = ?4
            WHERE id = ?1 AND user_id = ?2
            "#,
        )
        .bind(prayer_id)
        .bind(user_id)
        .bind(&reflection)
        .bind(timestamp(Utc::now()))
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Storage(format!("prayer update: {e}")))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("prayer request {prayer_id}")));
        }
        Ok(())
    }

    async fn due_memory_verses(
        &self,
        user_id: &str,
        now: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<MemoryVerse>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT * FROM memory_verses
            WHERE user_id = ?1 AND next_review_at <= ?2
            ORDER BY next_review_at ASC
            LIMIT ?3
            "#,
        )
        .bind(user_id)
        .bind(timestamp(now))
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StoreError::QueryFailed(format!("due verses: {e}")))?;

        rows.iter()
            .map(|r| {
                Ok(MemoryVerse {
                    id: col(r, "id")?,
                    user_id: col(r, "user_id")?,
                    reference: col(r, "reference")?,
                    text: col(r, "text")?,
                    next_review_at: parse_timestamp(&col::<String>(r, "next_review_at")?)?,
                })
            })
            .collect()
    }

    async fn insert_memory_verse(&self, verse: MemoryVerse) -> Result<String, StoreError> {
        let id = if verse.id.is_empty() {
            Uuid::new_v4().to_string()
        } else {
            verse.id
        };
        sqlx::query(
            r#"
            INSERT INTO memory_verses (id, user_id, reference, text, next_review_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT(id) DO UPDATE SET next_review_at = excluded.next_review_at
            "#,
        )
        .bind(&id)
        .bind(&verse.user_id)
        .bind(&verse.reference)
        .bind(&verse.text)
        .bind(timestamp(verse.next_review_at))
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Storage(format!("memory verse insert: {e}")))?;
        Ok(id)
    }

    async fn pending_obedience_steps(
        &self,
        user_id: &str,
        limit: usize,
    ) -> Result<Vec<ObedienceStep>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT * FROM obedience_steps
            WHERE user_id = ?1 AND completed = 0
            ORDER BY created_at ASC, iid ASC
            LIMIT ?2
            "#,
        )
        .bind(user_id)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StoreError::QueryFailed(format!("pending steps: {e}")))?;
        rows.iter().map(row_to_step).collect()
    }

    async fn insert_obedience_step(&self, step: NewObedienceStep) -> Result<String, StoreError> {
        let id = Uuid::new_v4().to_string();
        sqlx::query(
            r#"
            INSERT INTO obedience_steps (id, user_id, action, scripture_ref, due_date, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )
        .bind(&id)
        .bind(&step.user_id)
        .bind(&step.action)
        .bind(&step.scripture_ref)
        .bind(step.due_date.map(timestamp))
        .bind(timestamp(Utc::now()))
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Storage(format!("step insert: {e}")))?;
        Ok(id)
    }

    async fn onboarding_answers(
        &self,
        user_id: &str,
    ) -> Result<Vec<OnboardingAnswer>, StoreError> {
        let rows = sqlx::query("SELECT * FROM onboarding_answers WHERE user_id = ?1 ORDER BY iid")
            .bind(user_id)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StoreError::QueryFailed(format!("onboarding answers: {e}")))?;
        rows.iter()
            .map(|r| {
                Ok(OnboardingAnswer {
                    user_id: col(r, "user_id")?,
                    question: col(r, "question")?,
                    answer: col(r, "answer")?,
                })
            })
            .collect()
    }

    async fn insert_onboarding_answer(&self, answer: OnboardingAnswer) -> Result<(), StoreError> {
        sqlx::query("INSERT INTO onboarding_answers (user_id, question, answer) VALUES (?1, ?2, ?3)")
            .bind(&answer.user_id)
            .bind(&answer.question)
            .bind(&answer.answer)
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::Storage(format!("onboarding insert: {e}")))?;
        Ok(())
    }
}

#[async_trait]
impl VerseIndex for SqliteStore {
    fn name(&self) -> &str {
        "sqlite"
    }

    async fn similarity_search(
        &self,
        embedding: &[f32],
        limit: usize,
        translation: &str,
        min_similarity: f32,
    ) -> Result<Vec<Passage>, RetrievalError> {
        // Ranked in process: load the translation's embedded verses and score them.
        let rows = sqlx::query(
            "SELECT * FROM verses WHERE translation = ?1 AND embedding IS NOT NULL",
        )
        .bind(translation.to_lowercase())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RetrievalError::QueryFailed(format!("vector scan: {e}")))?;

        let mut candidates = Vec::with_capacity(rows.len());
        for row in &rows {
            let blob: Vec<u8> = row
                .try_get("embedding")
                .map_err(|e| RetrievalError::QueryFailed(format!("embedding column: {e}")))?;
            candidates.push((row_to_passage(row)?, vector::blob_to_embedding(&blob)));
        }

        Ok(vector::rank_by_similarity(
            candidates.iter().map(|(p, e)| (p, e.as_slice())),
            embedding,
            limit,
            min_similarity,
        ))
    }

    async fn keyword_search(
        &self,
        query: &str,
        limit: usize,
        translation: &str,
    ) -> Result<Vec<Passage>, RetrievalError> {
        let fts_query = Self::sanitize_fts_query(query);
        if fts_query.is_empty() {
            return Ok(Vec::new());
        }

        let rows = sqlx::query(
            r#"
            SELECT v.*, bm25(verses_fts) AS rank
            FROM verses_fts f
            JOIN verses v ON v.iid = f.rowid
            WHERE verses_fts MATCH ?1 AND v.translation = ?2
            ORDER BY rank
            LIMIT ?3
            "#,
        )
        .bind(&fts_query)
        .bind(translation.to_lowercase())
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RetrievalError::QueryFailed(format!("FTS5 search: {e}")))?;

        rows.iter()
            .map(|row| {
                let mut passage = row_to_passage(row)?;
                // bm25() is negative, lower is better.
                let rank: f64 = row.try_get("rank").unwrap_or(0.0);
                passage.score = (-rank) as f32;
                Ok(passage)
            })
            .collect()
    }
}
