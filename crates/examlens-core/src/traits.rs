//! Store interfaces consumed by the diagnostic engine.
//!
//! These async traits are implemented by the `examlens-store` crate (SQLite
//! and in-memory backends) and injected into the report and practice entry
//! points; the engine holds no connection state of its own.

use std::collections::BTreeSet;

use async_trait::async_trait;

use crate::codes::is_within_chapter;
use crate::model::{AnswerRecord, Attempt, Question};

// ---------------------------------------------------------------------------
// Attempts and answers
// ---------------------------------------------------------------------------

/// Read access to diagnostic attempts and their recorded answers.
#[async_trait]
pub trait AttemptStore: Send + Sync {
    /// Load an attempt by id, `None` if it does not exist.
    async fn load_attempt(&self, attempt_id: &str) -> anyhow::Result<Option<Attempt>>;

    /// Load every answer recorded for an attempt.
    async fn load_answers(&self, attempt_id: &str) -> anyhow::Result<Vec<AnswerRecord>>;
}

// ---------------------------------------------------------------------------
// Question bank
// ---------------------------------------------------------------------------

/// Random sampling from the question bank.
#[async_trait]
pub trait QuestionBank: Send + Sync {
    /// Return up to `query.limit` questions matching the query, in uniform
    /// random order, none of them in `query.exclude`.
    async fn sample_questions(&self, query: &QuestionQuery) -> anyhow::Result<Vec<Question>>;
}

/// Which questions a sampling query targets within its scope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QuestionFilter {
    /// Questions on any of these knowledge points.
    Points(Vec<String>),
    /// Questions in any of these sections.
    Sections(Vec<String>),
    /// Any question in the certificate/subject scope.
    AnyInScope,
}

/// A bounded, exclusion-aware question sampling request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionQuery {
    pub certificate: String,
    pub subject: String,
    pub filter: QuestionFilter,
    /// Question ids that must not be returned.
    pub exclude: BTreeSet<String>,
    /// Maximum number of questions to return.
    pub limit: usize,
}

impl QuestionQuery {
    /// Whether a question satisfies scope, filter and exclusion.
    pub fn admits(&self, question: &Question) -> bool {
        if question.certificate != self.certificate || question.subject != self.subject {
            return false;
        }
        if self.exclude.contains(&question.question_uuid) {
            return false;
        }
        match &self.filter {
            QuestionFilter::Points(codes) => codes.contains(&question.knowledge_point_code),
            QuestionFilter::Sections(codes) => codes.contains(&question.section_code),
            QuestionFilter::AnyInScope => true,
        }
    }
}

// ---------------------------------------------------------------------------
// Curriculum
// ---------------------------------------------------------------------------

/// Curriculum scope counts.
#[async_trait]
pub trait Curriculum: Send + Sync {
    /// Number of knowledge points whose code lies under `chapter_code`
    /// (`"{chapter_code}.%"`).
    async fn count_points_in_chapter(&self, chapter_code: &str) -> anyhow::Result<u64>;
}

/// Count the codes that lie under a chapter. Shared by in-process backends.
pub fn count_in_chapter<'a>(codes: impl IntoIterator<Item = &'a str>, chapter_code: &str) -> u64 {
    codes
        .into_iter()
        .filter(|code| is_within_chapter(code, chapter_code))
        .count() as u64
}
