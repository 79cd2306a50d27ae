//! Remediation question selection.
//!
//! Given a completed diagnostic attempt, ranks the learner's weakest
//! knowledge points, classifies risk, and draws a bounded practice set from
//! the question bank in widening tiers:
//!
//! - Tier A: questions on the weakness knowledge points
//! - Tier B: questions in the weakness sections (only if A fell short)
//! - Tier C: anything in the certificate/subject scope (only if still short)
//!
//! Tiers run strictly in order because each one excludes everything the
//! previous tiers picked, along with every question the attempt already
//! answered.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::Instant;

use crate::codes::compare_codes;
use crate::error::DiagnosticError;
use crate::model::{AnswerRecord, Question};
use crate::statistics::{score_points, PointStat};
use crate::traits::{AttemptStore, QuestionBank, QuestionFilter, QuestionQuery};

/// Fewest questions a selection aims for before it stops widening.
pub const MIN_QUESTIONS: usize = 15;

/// Advertised practice set size.
pub const TARGET_QUESTIONS: usize = 18;

/// Hard upper bound on a practice set.
pub const MAX_QUESTIONS: usize = 20;

/// Number of weak knowledge points a selection targets.
pub const WEAKNESS_COUNT: usize = 3;

/// Configuration for the remediation selector.
#[derive(Debug, Clone)]
pub struct SelectorConfig {
    /// A later tier runs only while fewer than this many are selected.
    pub min_questions: usize,
    /// Reported as `target` in the selection.
    pub target_questions: usize,
    /// Upper bound on the selection.
    pub max_questions: usize,
    /// Total time budget; once spent, remaining tiers are abandoned and the
    /// questions selected so far are returned.
    pub deadline: Option<Duration>,
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            min_questions: MIN_QUESTIONS,
            target_questions: TARGET_QUESTIONS,
            max_questions: MAX_QUESTIONS,
            deadline: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Output types
// ---------------------------------------------------------------------------

/// Learner risk derived from the attempt's raw score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    High,
    Medium,
    Low,
}

impl RiskLevel {
    /// `< 0.4` high, `< 0.6` medium, otherwise low.
    pub fn from_score(score: f64) -> Self {
        if score < 0.4 {
            RiskLevel::High
        } else if score < 0.6 {
            RiskLevel::Medium
        } else {
            RiskLevel::Low
        }
    }

    /// Canned alert shown alongside the practice set.
    pub fn alert(&self) -> &'static str {
        match self {
            RiskLevel::High => {
                "High risk: fundamentals in this chapter are not yet in place. Work through every practice question and revisit the chapter material before the exam."
            }
            RiskLevel::Medium => {
                "Medium risk: several knowledge points are still shaky. Focus on the weak points below and re-test after practice."
            }
            RiskLevel::Low => {
                "Low risk: the chapter is largely under control. Use the practice set to close the remaining gaps."
            }
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RiskLevel::High => write!(f, "high"),
            RiskLevel::Medium => write!(f, "medium"),
            RiskLevel::Low => write!(f, "low"),
        }
    }
}

/// One of the attempt's weakest knowledge points.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Weakness {
    pub code: String,
    pub title: String,
    #[serde(rename = "sectionTitle")]
    pub section_title: String,
    #[serde(rename = "sectionCode")]
    pub section_code: String,
    /// Raw accuracy on the point.
    pub accuracy: f64,
}

impl From<&PointStat> for Weakness {
    fn from(point: &PointStat) -> Self {
        Self {
            code: point.code.clone(),
            title: point.title.clone(),
            section_title: point.section_title.clone(),
            section_code: point.section_code.clone(),
            accuracy: point.accuracy(),
        }
    }
}

/// A question as presented in a practice set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PracticeQuestion {
    pub question_uuid: String,
    pub stem: String,
    pub options: Vec<String>,
    pub correct_answer: String,
    pub knowledge_point_title: String,
    pub section_title: String,
}

impl From<Question> for PracticeQuestion {
    fn from(q: Question) -> Self {
        Self {
            question_uuid: q.question_uuid,
            stem: q.stem,
            options: q.options,
            correct_answer: q.correct_answer,
            knowledge_point_title: q.knowledge_point_title,
            section_title: q.section_title,
        }
    }
}

/// The remediation practice set for one attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PracticeSelection {
    pub attempt_id: String,
    /// Number of questions selected.
    pub total: usize,
    pub target: usize,
    pub risk_level: RiskLevel,
    pub risk_alert: String,
    pub weaknesses: Vec<Weakness>,
    pub questions: Vec<PracticeQuestion>,
    /// Raw score of the diagnostic attempt.
    pub score: f64,
    pub completed_correct: u32,
    pub completed_total: u32,
}

// ---------------------------------------------------------------------------
// Progress
// ---------------------------------------------------------------------------

/// Lifecycle of one selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionPhase {
    NotStarted,
    AttemptLoaded,
    AnswersLoaded,
    WeaknessesRanked,
    QuestionsSelected,
    Done,
}

/// A fallback stage of the selection pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tier {
    /// Weakness knowledge points.
    Points,
    /// Weakness sections.
    Sections,
    /// Whole certificate/subject scope.
    Scope,
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Tier::Points => write!(f, "points"),
            Tier::Sections => write!(f, "sections"),
            Tier::Scope => write!(f, "scope"),
        }
    }
}

/// Progress reporting trait.
pub trait SelectionObserver: Send + Sync {
    fn on_phase(&self, attempt_id: &str, phase: SelectionPhase);
    fn on_tier(&self, attempt_id: &str, tier: Tier, accepted: usize, selected: usize);
    fn on_deadline(&self, attempt_id: &str, skipped: Tier);
}

/// No-op observer.
pub struct NoopObserver;

impl SelectionObserver for NoopObserver {
    fn on_phase(&self, _: &str, _: SelectionPhase) {}
    fn on_tier(&self, _: &str, _: Tier, _: usize, _: usize) {}
    fn on_deadline(&self, _: &str, _: Tier) {}
}

// ---------------------------------------------------------------------------
// Pure steps
// ---------------------------------------------------------------------------

/// Raw fraction of correct answers, 0 with no answers.
pub fn overall_score(answers: &[AnswerRecord]) -> f64 {
    if answers.is_empty() {
        return 0.0;
    }
    let correct = answers.iter().filter(|a| a.is_correct).count();
    correct as f64 / answers.len() as f64
}

/// Rank points by raw wrong count, most mistakes first, code as tiebreak.
///
/// Every tested point is eligible, so an all-correct attempt still targets
/// its first points in code order.
pub fn rank_weaknesses(points: &BTreeMap<String, PointStat>, limit: usize) -> Vec<Weakness> {
    let mut ranked: Vec<&PointStat> = points.values().collect();
    ranked.sort_by(|a, b| {
        b.wrong()
            .cmp(&a.wrong())
            .then_with(|| compare_codes(&a.code, &b.code))
    });
    ranked.into_iter().take(limit).map(Weakness::from).collect()
}

/// The tiers to run for a set of weaknesses, in order.
///
/// Tiers A and B are dropped when there are no weakness codes to target.
pub fn tier_plan(weaknesses: &[Weakness]) -> Vec<(Tier, QuestionFilter)> {
    let mut plan = Vec::with_capacity(3);
    if !weaknesses.is_empty() {
        let points = weaknesses.iter().map(|w| w.code.clone()).collect();
        plan.push((Tier::Points, QuestionFilter::Points(points)));

        let mut sections: Vec<String> = Vec::new();
        for w in weaknesses {
            if !sections.contains(&w.section_code) {
                sections.push(w.section_code.clone());
            }
        }
        plan.push((Tier::Sections, QuestionFilter::Sections(sections)));
    }
    plan.push((Tier::Scope, QuestionFilter::AnyInScope));
    plan
}

/// Exclusion set and remaining capacity threaded through the tiers.
#[derive(Debug, Clone)]
pub struct TierBudget {
    excluded: BTreeSet<String>,
    remaining: usize,
}

impl TierBudget {
    /// Start a budget that excludes the attempt's answered questions.
    pub fn new(answered: impl IntoIterator<Item = String>, max_questions: usize) -> Self {
        Self {
            excluded: answered.into_iter().filter(|id| !id.is_empty()).collect(),
            remaining: max_questions,
        }
    }

    pub fn remaining(&self) -> usize {
        self.remaining
    }

    pub fn excluded(&self) -> &BTreeSet<String> {
        &self.excluded
    }

    /// Move fetched candidates into `selected`, skipping anything already
    /// excluded and stopping when the budget is spent. Returns how many
    /// were accepted.
    pub fn accept(&mut self, fetched: Vec<Question>, selected: &mut Vec<Question>) -> usize {
        let mut accepted = 0;
        for question in fetched {
            if self.remaining == 0 {
                break;
            }
            if self.excluded.insert(question.question_uuid.clone()) {
                selected.push(question);
                self.remaining -= 1;
                accepted += 1;
            }
        }
        accepted
    }
}

// ---------------------------------------------------------------------------
// Selector
// ---------------------------------------------------------------------------

/// The remediation selector.
pub struct RemediationSelector {
    attempts: Arc<dyn AttemptStore>,
    bank: Arc<dyn QuestionBank>,
    config: SelectorConfig,
}

impl RemediationSelector {
    pub fn new(
        attempts: Arc<dyn AttemptStore>,
        bank: Arc<dyn QuestionBank>,
        config: SelectorConfig,
    ) -> Self {
        Self {
            attempts,
            bank,
            config,
        }
    }

    /// Build the practice set for an attempt.
    pub async fn select(
        &self,
        attempt_id: &str,
        observer: &dyn SelectionObserver,
    ) -> Result<PracticeSelection, DiagnosticError> {
        let attempt_id = attempt_id.trim();
        if attempt_id.is_empty() {
            return Err(DiagnosticError::MissingAttemptId);
        }
        let deadline = self.config.deadline.map(|d| Instant::now() + d);
        observer.on_phase(attempt_id, SelectionPhase::NotStarted);

        let load_failed = |source: anyhow::Error| DiagnosticError::PracticeLoadFailed {
            attempt_id: attempt_id.to_string(),
            source,
        };

        let attempt = self
            .attempts
            .load_attempt(attempt_id)
            .await
            .map_err(load_failed)?
            .ok_or_else(|| DiagnosticError::AttemptNotFound(attempt_id.to_string()))?;
        let Some((certificate, subject)) = attempt.practice_scope() else {
            return Err(DiagnosticError::AttemptIncomplete(attempt_id.to_string()));
        };
        observer.on_phase(attempt_id, SelectionPhase::AttemptLoaded);

        let answers = self
            .attempts
            .load_answers(attempt_id)
            .await
            .map_err(load_failed)?;
        let score = overall_score(&answers);
        let completed_correct = answers.iter().filter(|a| a.is_correct).count() as u32;
        let completed_total = answers.len() as u32;
        observer.on_phase(attempt_id, SelectionPhase::AnswersLoaded);

        let points = score_points(&answers);
        let weaknesses = rank_weaknesses(&points, WEAKNESS_COUNT);
        observer.on_phase(attempt_id, SelectionPhase::WeaknessesRanked);

        let mut budget = TierBudget::new(
            answers.into_iter().map(|a| a.question_uuid),
            self.config.max_questions,
        );
        let mut selected: Vec<Question> = Vec::new();

        for (tier, filter) in tier_plan(&weaknesses) {
            if selected.len() >= self.config.min_questions || budget.remaining() == 0 {
                break;
            }
            let query = QuestionQuery {
                certificate: certificate.to_string(),
                subject: subject.to_string(),
                filter,
                exclude: budget.excluded().clone(),
                limit: budget.remaining(),
            };

            let sampled = match deadline {
                Some(at) => match tokio::time::timeout_at(at, self.bank.sample_questions(&query)).await {
                    Ok(result) => result,
                    Err(_) => {
                        tracing::warn!(
                            "selection deadline reached for attempt {attempt_id}, skipping tier {tier} and later"
                        );
                        observer.on_deadline(attempt_id, tier);
                        break;
                    }
                },
                None => self.bank.sample_questions(&query).await,
            };
            let fetched = sampled.map_err(load_failed)?;

            let fetched_count = fetched.len();
            let accepted = budget.accept(fetched, &mut selected);
            tracing::debug!(
                "tier {tier} for attempt {attempt_id}: fetched {fetched_count}, accepted {accepted}, selected {}",
                selected.len()
            );
            observer.on_tier(attempt_id, tier, accepted, selected.len());
        }

        selected.truncate(self.config.max_questions);
        observer.on_phase(attempt_id, SelectionPhase::QuestionsSelected);

        let risk_level = RiskLevel::from_score(score);
        let selection = PracticeSelection {
            attempt_id: attempt_id.to_string(),
            total: selected.len(),
            target: self.config.target_questions,
            risk_level,
            risk_alert: risk_level.alert().to_string(),
            weaknesses,
            questions: selected.into_iter().map(PracticeQuestion::from).collect(),
            score,
            completed_correct,
            completed_total,
        };

        tracing::info!(
            "selected {} practice questions for attempt {attempt_id} (risk {risk_level})",
            selection.total
        );
        observer.on_phase(attempt_id, SelectionPhase::Done);
        Ok(selection)
    }
}
