//! Diagnostic report assembly with JSON persistence.

use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::aggregate::{aggregate, ChapterAggregate, CoverageStat, Recommendation};
use crate::error::DiagnosticError;
use crate::model::{AnswerRecord, Attempt, MasteryLevel};
use crate::statistics::score_points;
use crate::traits::{AttemptStore, Curriculum};

/// A complete diagnostic report for one attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub attempt_id: String,
    /// When the report was generated.
    pub generated_at: DateTime<Utc>,
    pub scope: ReportScope,
    /// Chapter-level aggregate over every answer in the attempt.
    pub overall: ChapterAggregate,
    pub chapters: Vec<ChapterRow>,
    pub sections: Vec<SectionRow>,
    pub points: Vec<PointRow>,
    pub coverage: CoverageStat,
    pub recommendations: Vec<Recommendation>,
}

/// The attempt's curriculum scope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportScope {
    pub certificate: Option<String>,
    pub subject: Option<String>,
    pub chapter_code: Option<String>,
    pub chapter_title: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChapterRow {
    pub chapter_code: String,
    pub chapter_title: String,
    pub score: f64,
    pub correct: u32,
    pub total: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectionRow {
    pub section_code: String,
    pub section_title: String,
    pub score: f64,
    pub correct: u32,
    pub total: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointRow {
    pub point_code: String,
    pub point_title: String,
    pub score: f64,
    pub level: MasteryLevel,
    pub correct: u32,
    pub total: u32,
}

impl Report {
    /// Score and aggregate an attempt's answers into a report.
    ///
    /// `total_points_in_scope` is the curriculum count under the attempt's
    /// chapter (0 when the attempt has no chapter scope).
    pub fn assemble(attempt: &Attempt, answers: &[AnswerRecord], total_points_in_scope: u64) -> Self {
        let points = score_points(answers);
        let agg = aggregate(&points, total_points_in_scope);

        let chapters = attempt
            .chapter_scope()
            .map(|code| ChapterRow {
                chapter_code: code.to_string(),
                chapter_title: attempt.chapter_title.clone().unwrap_or_default(),
                score: agg.chapter.score,
                correct: agg.chapter.correct,
                total: agg.chapter.total,
            })
            .into_iter()
            .collect();

        Report {
            attempt_id: attempt.id.clone(),
            generated_at: Utc::now(),
            scope: ReportScope {
                certificate: attempt.certificate.clone(),
                subject: attempt.subject.clone(),
                chapter_code: attempt.chapter_code.clone(),
                chapter_title: attempt.chapter_title.clone(),
            },
            overall: agg.chapter,
            chapters,
            sections: agg
                .sections
                .iter()
                .map(|s| SectionRow {
                    section_code: s.code.clone(),
                    section_title: s.title.clone(),
                    score: s.score(),
                    correct: s.correct,
                    total: s.total,
                })
                .collect(),
            points: agg
                .points
                .into_iter()
                .map(|p| PointRow {
                    point_code: p.code,
                    point_title: p.title,
                    score: p.score,
                    level: p.level,
                    correct: p.correct,
                    total: p.total,
                })
                .collect(),
            coverage: agg.coverage,
            recommendations: agg.recommendations,
        }
    }

    /// Save the report as JSON to a file.
    pub fn save_json(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).context("failed to serialize report")?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, json)
            .with_context(|| format!("failed to write report to {}", path.display()))?;
        Ok(())
    }

    /// Load a report from a JSON file.
    pub fn load_json(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read report from {}", path.display()))?;
        let report: Report =
            serde_json::from_str(&content).context("failed to parse report JSON")?;
        Ok(report)
    }

    /// Format the report as a markdown summary.
    pub fn to_markdown(&self) -> String {
        let mut md = String::new();

        md.push_str(&format!("## Diagnostic report: {}\n\n", self.attempt_id));
        md.push_str(&format!(
            "**Overall:** {:.1}% ({}/{} correct)\n\n",
            self.overall.score * 100.0,
            self.overall.correct,
            self.overall.total
        ));
        md.push_str(&format!(
            "**Coverage:** {}/{} points tested ({:.1}%), {} mastered ({:.1}%)\n\n",
            self.coverage.tested_points,
            self.coverage.total_points_in_scope,
            self.coverage.coverage_hit_rate * 100.0,
            self.coverage.mastered_points,
            self.coverage.mastery_hit_rate * 100.0
        ));

        if !self.sections.is_empty() {
            md.push_str("### Sections\n\n");
            md.push_str("| Section | Title | Score | Correct |\n");
            md.push_str("|---------|-------|-------|---------|\n");
            for s in &self.sections {
                md.push_str(&format!(
                    "| {} | {} | {:.1}% | {}/{} |\n",
                    s.section_code,
                    s.section_title,
                    s.score * 100.0,
                    s.correct,
                    s.total
                ));
            }
            md.push('\n');
        }

        if !self.recommendations.is_empty() {
            md.push_str("### Recommendations\n\n");
            for r in &self.recommendations {
                md.push_str(&format!("- **{}** ({}): {}\n", r.target, r.reason, r.next_action));
            }
        }

        md
    }
}

/// Load an attempt with its answers and curriculum scope, and assemble its
/// report.
pub async fn generate_report(
    attempts: &dyn AttemptStore,
    curriculum: &dyn Curriculum,
    attempt_id: &str,
) -> Result<Report, DiagnosticError> {
    let attempt_id = attempt_id.trim();
    if attempt_id.is_empty() {
        return Err(DiagnosticError::MissingAttemptId);
    }
    let load_failed = |source: anyhow::Error| DiagnosticError::ReportLoadFailed {
        attempt_id: attempt_id.to_string(),
        source,
    };

    let attempt = attempts
        .load_attempt(attempt_id)
        .await
        .map_err(load_failed)?
        .ok_or_else(|| DiagnosticError::AttemptNotFound(attempt_id.to_string()))?;
    let answers = attempts
        .load_answers(attempt_id)
        .await
        .map_err(load_failed)?;

    let total_points_in_scope = match attempt.chapter_scope() {
        Some(chapter) => curriculum
            .count_points_in_chapter(chapter)
            .await
            .map_err(load_failed)?,
        None => {
            tracing::debug!("attempt {attempt_id} has no chapter scope, coverage is 0");
            0
        }
    };

    let report = Report::assemble(&attempt, &answers, total_points_in_scope);
    tracing::info!(
        "report for attempt {attempt_id}: {} answers, {} points, score {:.3}",
        report.overall.total,
        report.points.len(),
        report.overall.score
    );
    Ok(report)
}
