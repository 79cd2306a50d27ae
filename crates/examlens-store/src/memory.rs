//! In-memory store for tests and fixtures.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use examlens_core::model::{AnswerRecord, Attempt, Question};
use examlens_core::traits::{count_in_chapter, AttemptStore, Curriculum, QuestionBank, QuestionQuery};

/// An in-process implementation of every store trait.
///
/// Sampling shuffles the matching questions with a seedable RNG, so a
/// seeded store returns the same order on every run. Each trait method
/// counts its calls and every sampling query is recorded.
pub struct MemoryStore {
    attempts: HashMap<String, Attempt>,
    answers: HashMap<String, Vec<AnswerRecord>>,
    questions: Vec<Question>,
    knowledge_points: Vec<String>,
    rng: Mutex<StdRng>,
    /// When set, sampling fails with this message.
    sampling_failure: Option<String>,
    /// Artificial latency added to every sampling call.
    sample_delay: Option<Duration>,
    load_attempt_calls: AtomicU32,
    load_answers_calls: AtomicU32,
    sample_calls: AtomicU32,
    count_calls: AtomicU32,
    queries: Mutex<Vec<QuestionQuery>>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::with_rng(StdRng::from_rng(&mut rand::rng()))
    }
}

impl MemoryStore {
    /// Create an empty store with an entropy-seeded RNG.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty store whose sampling order is fixed by `seed`.
    pub fn seeded(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }

    fn with_rng(rng: StdRng) -> Self {
        Self {
            attempts: HashMap::new(),
            answers: HashMap::new(),
            questions: Vec::new(),
            knowledge_points: Vec::new(),
            rng: Mutex::new(rng),
            sampling_failure: None,
            sample_delay: None,
            load_attempt_calls: AtomicU32::new(0),
            load_answers_calls: AtomicU32::new(0),
            sample_calls: AtomicU32::new(0),
            count_calls: AtomicU32::new(0),
            queries: Mutex::new(Vec::new()),
        }
    }

    /// Add an attempt together with its answers.
    pub fn with_attempt(mut self, attempt: Attempt, answers: Vec<AnswerRecord>) -> Self {
        self.answers.insert(attempt.id.clone(), answers);
        self.attempts.insert(attempt.id.clone(), attempt);
        self
    }

    /// Add questions to the bank.
    pub fn with_questions(mut self, questions: impl IntoIterator<Item = Question>) -> Self {
        self.questions.extend(questions);
        self
    }

    /// Add curriculum knowledge point codes.
    pub fn with_knowledge_points<S: Into<String>>(mut self, codes: impl IntoIterator<Item = S>) -> Self {
        self.knowledge_points.extend(codes.into_iter().map(Into::into));
        self
    }

    /// Make every sampling call fail.
    pub fn failing_sampling(mut self, message: &str) -> Self {
        self.sampling_failure = Some(message.to_string());
        self
    }

    /// Delay every sampling call.
    pub fn with_sample_delay(mut self, delay: Duration) -> Self {
        self.sample_delay = Some(delay);
        self
    }

    pub fn load_attempt_calls(&self) -> u32 {
        self.load_attempt_calls.load(Ordering::Relaxed)
    }

    pub fn load_answers_calls(&self) -> u32 {
        self.load_answers_calls.load(Ordering::Relaxed)
    }

    /// Number of `sample_questions` calls made.
    pub fn sample_calls(&self) -> u32 {
        self.sample_calls.load(Ordering::Relaxed)
    }

    pub fn count_calls(&self) -> u32 {
        self.count_calls.load(Ordering::Relaxed)
    }

    /// Every sampling query received, in order.
    pub fn queries(&self) -> Vec<QuestionQuery> {
        self.queries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

#[async_trait]
impl AttemptStore for MemoryStore {
    async fn load_attempt(&self, attempt_id: &str) -> anyhow::Result<Option<Attempt>> {
        self.load_attempt_calls.fetch_add(1, Ordering::Relaxed);
        Ok(self.attempts.get(attempt_id).cloned())
    }

    async fn load_answers(&self, attempt_id: &str) -> anyhow::Result<Vec<AnswerRecord>> {
        self.load_answers_calls.fetch_add(1, Ordering::Relaxed);
        Ok(self.answers.get(attempt_id).cloned().unwrap_or_default())
    }
}

#[async_trait]
impl QuestionBank for MemoryStore {
    async fn sample_questions(&self, query: &QuestionQuery) -> anyhow::Result<Vec<Question>> {
        self.sample_calls.fetch_add(1, Ordering::Relaxed);
        self.queries
            .lock()
            .map_err(|_| anyhow::anyhow!("memory store query log poisoned"))?
            .push(query.clone());

        if let Some(delay) = self.sample_delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(message) = &self.sampling_failure {
            anyhow::bail!("{message}");
        }

        let mut matching: Vec<Question> = self
            .questions
            .iter()
            .filter(|q| query.admits(q))
            .cloned()
            .collect();
        {
            let mut rng = self
                .rng
                .lock()
                .map_err(|_| anyhow::anyhow!("memory store rng poisoned"))?;
            matching.shuffle(&mut *rng);
        }
        matching.truncate(query.limit);
        Ok(matching)
    }
}

#[async_trait]
impl Curriculum for MemoryStore {
    async fn count_points_in_chapter(&self, chapter_code: &str) -> anyhow::Result<u64> {
        self.count_calls.fetch_add(1, Ordering::Relaxed);
        Ok(count_in_chapter(
            self.knowledge_points.iter().map(String::as_str),
            chapter_code,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use examlens_core::traits::QuestionFilter;
    use std::collections::BTreeSet;

    fn question(id: &str, point: &str) -> Question {
        Question {
            question_uuid: id.into(),
            certificate: "cfa".into(),
            subject: "ethics".into(),
            knowledge_point_code: point.into(),
            knowledge_point_title: String::new(),
            section_code: "C2.1".into(),
            section_title: String::new(),
            stem: "?".into(),
            options: vec![],
            correct_answer: "A".into(),
        }
    }

    fn bank(seed: u64) -> MemoryStore {
        MemoryStore::seeded(seed).with_questions((0..12).map(|i| question(&format!("q{i}"), "C2.1.4")))
    }

    fn any(limit: usize, exclude: &[&str]) -> QuestionQuery {
        QuestionQuery {
            certificate: "cfa".into(),
            subject: "ethics".into(),
            filter: QuestionFilter::AnyInScope,
            exclude: exclude.iter().map(|s| s.to_string()).collect::<BTreeSet<_>>(),
            limit,
        }
    }

    fn ids(questions: &[Question]) -> Vec<String> {
        questions.iter().map(|q| q.question_uuid.clone()).collect()
    }

    #[tokio::test]
    async fn seeded_sampling_is_reproducible() {
        let a = bank(7).sample_questions(&any(5, &[])).await.unwrap();
        let b = bank(7).sample_questions(&any(5, &[])).await.unwrap();
        assert_eq!(ids(&a), ids(&b));
        assert_eq!(a.len(), 5);
    }

    #[tokio::test]
    async fn sampling_excludes_and_counts() {
        let store = bank(1);
        let picked = store.sample_questions(&any(20, &["q0", "q5"])).await.unwrap();
        assert_eq!(picked.len(), 10);
        assert!(!ids(&picked).contains(&"q0".to_string()));
        assert_eq!(store.sample_calls(), 1);
        assert_eq!(store.queries()[0].limit, 20);
    }

    #[tokio::test]
    async fn failing_sampling_still_counts() {
        let store = bank(1).failing_sampling("database is locked");
        let err = store.sample_questions(&any(5, &[])).await.unwrap_err();
        assert_eq!(err.to_string(), "database is locked");
        assert_eq!(store.sample_calls(), 1);
    }

    #[tokio::test]
    async fn attempts_and_curriculum() {
        let attempt = Attempt {
            id: "a1".into(),
            certificate: None,
            subject: None,
            chapter_code: None,
            chapter_title: None,
        };
        let store = MemoryStore::new()
            .with_attempt(attempt.clone(), vec![])
            .with_knowledge_points(["C2.1.1", "C2.1.2", "C20.1"]);

        assert_eq!(store.load_attempt("a1").await.unwrap(), Some(attempt));
        assert_eq!(store.load_attempt("a2").await.unwrap(), None);
        assert!(store.load_answers("a2").await.unwrap().is_empty());
        assert_eq!(store.count_points_in_chapter("C2").await.unwrap(), 2);
        assert_eq!(store.load_attempt_calls(), 2);
        assert_eq!(store.load_answers_calls(), 1);
        assert_eq!(store.count_calls(), 1);
    }
}
