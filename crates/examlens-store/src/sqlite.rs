//! SQLite-backed store.
//!
//! All queries run on tokio's blocking pool against a single connection
//! guarded by a mutex. Question sampling is done in SQL with
//! `ORDER BY RANDOM() LIMIT ?` so the bank is never loaded in full.

use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row, ToSql};

use examlens_core::model::{AnswerRecord, Attempt, Question};
use examlens_core::traits::{AttemptStore, Curriculum, QuestionBank, QuestionFilter, QuestionQuery};

use crate::error::StoreError;

const SCHEMA: &str = r#"
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS attempts (
    id              TEXT PRIMARY KEY,
    certificate     TEXT,
    subject         TEXT,
    chapter_code    TEXT,
    chapter_title   TEXT,
    created_at      TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS answer_records (
    id                    TEXT PRIMARY KEY,
    attempt_id            TEXT NOT NULL REFERENCES attempts(id),
    question_uuid         TEXT NOT NULL DEFAULT '',
    knowledge_point_code  TEXT NOT NULL,
    knowledge_point_title TEXT NOT NULL DEFAULT '',
    section_code          TEXT NOT NULL,
    section_title         TEXT NOT NULL DEFAULT '',
    is_correct            INTEGER NOT NULL,
    is_high_frequency     INTEGER NOT NULL DEFAULT 0,
    answered_at           TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_answer_records_attempt ON answer_records(attempt_id);

CREATE TABLE IF NOT EXISTS questions (
    question_uuid         TEXT PRIMARY KEY,
    certificate           TEXT NOT NULL,
    subject               TEXT NOT NULL,
    knowledge_point_code  TEXT NOT NULL,
    knowledge_point_title TEXT NOT NULL DEFAULT '',
    section_code          TEXT NOT NULL,
    section_title         TEXT NOT NULL DEFAULT '',
    stem                  TEXT NOT NULL,
    options               TEXT NOT NULL DEFAULT '[]',
    correct_answer        TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_questions_scope ON questions(certificate, subject);

CREATE TABLE IF NOT EXISTS knowledge_points (
    code          TEXT PRIMARY KEY,
    title         TEXT NOT NULL DEFAULT '',
    section_code  TEXT NOT NULL DEFAULT ''
);
"#;

const QUESTION_COLUMNS: &str = "question_uuid, certificate, subject, knowledge_point_code, \
     knowledge_point_title, section_code, section_title, stem, options, correct_answer";

/// A store over a SQLite database file (or an in-memory database).
#[derive(Clone)]
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Open (creating if needed) a database file and bootstrap the schema.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        tracing::debug!("opened sqlite store at {}", path.display());
        Self::with_connection(conn)
    }

    /// Open a private in-memory database.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Run a closure against the connection on the blocking pool.
    async fn interact<F, R>(&self, f: F) -> Result<R, StoreError>
    where
        F: FnOnce(&Connection) -> Result<R, StoreError> + Send + 'static,
        R: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let guard = conn.lock().map_err(|_| StoreError::LockPoisoned)?;
            f(&*guard)
        })
        .await
        .map_err(|e| StoreError::TaskJoin(e.to_string()))?
    }

    fn with_conn<R>(&self, f: impl FnOnce(&Connection) -> Result<R, StoreError>) -> Result<R, StoreError> {
        let guard = self.conn.lock().map_err(|_| StoreError::LockPoisoned)?;
        f(&*guard)
    }

    // -----------------------------------------------------------------------
    // Insert helpers
    // -----------------------------------------------------------------------

    /// Insert an attempt, or update the scope of an existing one.
    pub fn insert_attempt(&self, attempt: &Attempt) -> Result<(), StoreError> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO attempts
                 (id, certificate, subject, chapter_code, chapter_title, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                 ON CONFLICT(id) DO UPDATE SET
                     certificate = excluded.certificate,
                     subject = excluded.subject,
                     chapter_code = excluded.chapter_code,
                     chapter_title = excluded.chapter_title",
                params![
                    attempt.id,
                    attempt.certificate,
                    attempt.subject,
                    attempt.chapter_code,
                    attempt.chapter_title,
                    Utc::now().to_rfc3339(),
                ],
            )?;
            Ok(())
        })
    }

    /// Record an answer for an existing attempt, returning the new row id.
    pub fn insert_answer(&self, attempt_id: &str, answer: &AnswerRecord) -> Result<String, StoreError> {
        let id = uuid::Uuid::new_v4().to_string();
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO answer_records
                 (id, attempt_id, question_uuid, knowledge_point_code, knowledge_point_title,
                  section_code, section_title, is_correct, is_high_frequency, answered_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                params![
                    id,
                    attempt_id,
                    answer.question_uuid,
                    answer.knowledge_point_code,
                    answer.knowledge_point_title,
                    answer.section_code,
                    answer.section_title,
                    answer.is_correct,
                    answer.is_high_frequency,
                    Utc::now().to_rfc3339(),
                ],
            )?;
            Ok(())
        })?;
        Ok(id)
    }

    /// Insert or replace a question in the bank.
    pub fn insert_question(&self, question: &Question) -> Result<(), StoreError> {
        let options = serde_json::to_string(&question.options)?;
        self.with_conn(|conn| {
            conn.execute(
                &format!(
                    "INSERT OR REPLACE INTO questions ({QUESTION_COLUMNS})
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)"
                ),
                params![
                    question.question_uuid,
                    question.certificate,
                    question.subject,
                    question.knowledge_point_code,
                    question.knowledge_point_title,
                    question.section_code,
                    question.section_title,
                    question.stem,
                    options,
                    question.correct_answer,
                ],
            )?;
            Ok(())
        })
    }

    /// Insert or replace a curriculum knowledge point.
    pub fn insert_knowledge_point(
        &self,
        code: &str,
        title: &str,
        section_code: &str,
    ) -> Result<(), StoreError> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT OR REPLACE INTO knowledge_points (code, title, section_code)
                 VALUES (?1, ?2, ?3)",
                params![code, title, section_code],
            )?;
            Ok(())
        })
    }
}

// ---------------------------------------------------------------------------
// Queries
// ---------------------------------------------------------------------------

fn load_attempt_sync(conn: &Connection, attempt_id: &str) -> Result<Option<Attempt>, StoreError> {
    let attempt = conn
        .query_row(
            "SELECT id, certificate, subject, chapter_code, chapter_title
             FROM attempts WHERE id = ?1",
            [attempt_id],
            |row| {
                Ok(Attempt {
                    id: row.get(0)?,
                    certificate: row.get(1)?,
                    subject: row.get(2)?,
                    chapter_code: row.get(3)?,
                    chapter_title: row.get(4)?,
                })
            },
        )
        .optional()?;
    Ok(attempt)
}

fn load_answers_sync(conn: &Connection, attempt_id: &str) -> Result<Vec<AnswerRecord>, StoreError> {
    let mut stmt = conn.prepare(
        "SELECT question_uuid, knowledge_point_code, knowledge_point_title,
                section_code, section_title, is_correct, is_high_frequency
         FROM answer_records
         WHERE attempt_id = ?1
         ORDER BY rowid",
    )?;
    let rows = stmt.query_map([attempt_id], |row| {
        Ok(AnswerRecord {
            question_uuid: row.get(0)?,
            knowledge_point_code: row.get(1)?,
            knowledge_point_title: row.get(2)?,
            section_code: row.get(3)?,
            section_title: row.get(4)?,
            is_correct: row.get(5)?,
            is_high_frequency: row.get(6)?,
        })
    })?;
    Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
}

/// Raw question row; `options` is still JSON text.
struct QuestionRow {
    question: Question,
    options: String,
}

fn parse_question_row(row: &Row) -> rusqlite::Result<QuestionRow> {
    Ok(QuestionRow {
        question: Question {
            question_uuid: row.get(0)?,
            certificate: row.get(1)?,
            subject: row.get(2)?,
            knowledge_point_code: row.get(3)?,
            knowledge_point_title: row.get(4)?,
            section_code: row.get(5)?,
            section_title: row.get(6)?,
            stem: row.get(7)?,
            options: Vec::new(),
            correct_answer: row.get(9)?,
        },
        options: row.get(8)?,
    })
}

fn placeholders(start: usize, count: usize) -> String {
    (start..start + count)
        .map(|i| format!("?{i}"))
        .collect::<Vec<_>>()
        .join(", ")
}

fn sample_questions_sync(conn: &Connection, query: &QuestionQuery) -> Result<Vec<Question>, StoreError> {
    if query.limit == 0 {
        return Ok(Vec::new());
    }

    let mut clauses = vec!["certificate = ?1".to_string(), "subject = ?2".to_string()];
    let mut params: Vec<Box<dyn ToSql>> = vec![
        Box::new(query.certificate.clone()),
        Box::new(query.subject.clone()),
    ];

    let targets = match &query.filter {
        QuestionFilter::Points(codes) => Some(("knowledge_point_code", codes)),
        QuestionFilter::Sections(codes) => Some(("section_code", codes)),
        QuestionFilter::AnyInScope => None,
    };
    if let Some((column, codes)) = targets {
        if codes.is_empty() {
            return Ok(Vec::new());
        }
        clauses.push(format!(
            "{column} IN ({})",
            placeholders(params.len() + 1, codes.len())
        ));
        params.extend(codes.iter().map(|c| Box::new(c.clone()) as Box<dyn ToSql>));
    }

    if !query.exclude.is_empty() {
        clauses.push(format!(
            "question_uuid NOT IN ({})",
            placeholders(params.len() + 1, query.exclude.len())
        ));
        params.extend(query.exclude.iter().map(|id| Box::new(id.clone()) as Box<dyn ToSql>));
    }

    let sql = format!(
        "SELECT {QUESTION_COLUMNS} FROM questions WHERE {} ORDER BY RANDOM() LIMIT ?{}",
        clauses.join(" AND "),
        params.len() + 1
    );
    params.push(Box::new(query.limit as i64));

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(rusqlite::params_from_iter(params), parse_question_row)?;

    let mut questions = Vec::new();
    for row in rows {
        let QuestionRow {
            mut question,
            options,
        } = row?;
        question.options = serde_json::from_str(&options).inspect_err(|e| {
            tracing::warn!(
                "question {} has malformed options: {e}",
                question.question_uuid
            );
        })?;
        questions.push(question);
    }
    Ok(questions)
}

fn count_points_in_chapter_sync(conn: &Connection, chapter_code: &str) -> Result<u64, StoreError> {
    // Prefix match on "{chapter}." without LIKE, whose wildcards and case
    // folding would misfire on codes containing '_' or mixed case.
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM knowledge_points
         WHERE substr(code, 1, length(?1) + 1) = ?1 || '.'
           AND length(code) > length(?1) + 1",
        [chapter_code],
        |row| row.get(0),
    )?;
    Ok(count.max(0) as u64)
}

// ---------------------------------------------------------------------------
// Trait implementations
// ---------------------------------------------------------------------------

#[async_trait]
impl AttemptStore for SqliteStore {
    async fn load_attempt(&self, attempt_id: &str) -> anyhow::Result<Option<Attempt>> {
        let id = attempt_id.to_string();
        Ok(self.interact(move |conn| load_attempt_sync(conn, &id)).await?)
    }

    async fn load_answers(&self, attempt_id: &str) -> anyhow::Result<Vec<AnswerRecord>> {
        let id = attempt_id.to_string();
        Ok(self.interact(move |conn| load_answers_sync(conn, &id)).await?)
    }
}

#[async_trait]
impl QuestionBank for SqliteStore {
    async fn sample_questions(&self, query: &QuestionQuery) -> anyhow::Result<Vec<Question>> {
        let query = query.clone();
        Ok(self
            .interact(move |conn| sample_questions_sync(conn, &query))
            .await?)
    }
}

#[async_trait]
impl Curriculum for SqliteStore {
    async fn count_points_in_chapter(&self, chapter_code: &str) -> anyhow::Result<u64> {
        let chapter = chapter_code.to_string();
        Ok(self
            .interact(move |conn| count_points_in_chapter_sync(conn, &chapter))
            .await?)
    }
}
