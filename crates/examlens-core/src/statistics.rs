//! Laplace-smoothed knowledge point scoring.
//!
//! Groups an attempt's answers by knowledge point and scores each point with
//! `(correct + 1) / (total + 2)`, so a handful of answers never produces a
//! literal 0% or 100% verdict.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::model::{AnswerRecord, MasteryLevel};

/// Lower bound (inclusive) of the `mastered` band.
pub const MASTERED_THRESHOLD: f64 = 0.75;

/// Lower bound (inclusive) of the `borderline` band.
pub const BORDERLINE_THRESHOLD: f64 = 0.55;

/// Laplace-smoothed accuracy.
///
/// score = (c + 1) / (n + 2)
///
/// Always strictly inside (0, 1); `laplace_score(0, 0)` is exactly 0.5.
pub fn laplace_score(correct: u32, total: u32) -> f64 {
    (f64::from(correct) + 1.0) / (f64::from(total) + 2.0)
}

impl MasteryLevel {
    /// Classify a smoothed score.
    pub fn from_score(score: f64) -> Self {
        if score >= MASTERED_THRESHOLD {
            MasteryLevel::Mastered
        } else if score >= BORDERLINE_THRESHOLD {
            MasteryLevel::Borderline
        } else {
            MasteryLevel::Weak
        }
    }
}

/// Per-knowledge-point statistics for one attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointStat {
    /// Knowledge point code.
    pub code: String,
    /// Knowledge point title.
    pub title: String,
    /// Owning section code.
    pub section_code: String,
    /// Owning section title.
    pub section_title: String,
    /// Number of answers.
    pub total: u32,
    /// Number of correct answers.
    pub correct: u32,
    /// Laplace-smoothed score.
    pub score: f64,
    /// Mastery band derived from `score`.
    pub level: MasteryLevel,
    /// True if any record flagged the point as high-frequency.
    pub high_frequency: bool,
}

impl PointStat {
    /// Number of wrong answers.
    pub fn wrong(&self) -> u32 {
        self.total - self.correct
    }

    /// Raw (unsmoothed) accuracy, 0 when nothing was answered.
    pub fn accuracy(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            f64::from(self.correct) / f64::from(self.total)
        }
    }
}

/// Score every knowledge point answered in an attempt.
///
/// Title and section are taken from the first record seen for a point.
pub fn score_points(records: &[AnswerRecord]) -> BTreeMap<String, PointStat> {
    let mut points: BTreeMap<String, PointStat> = BTreeMap::new();
    for r in records {
        let point = points
            .entry(r.knowledge_point_code.clone())
            .or_insert_with(|| PointStat {
                code: r.knowledge_point_code.clone(),
                title: r.knowledge_point_title.clone(),
                section_code: r.section_code.clone(),
                section_title: r.section_title.clone(),
                total: 0,
                correct: 0,
                score: 0.0,
                level: MasteryLevel::Weak,
                high_frequency: false,
            });
        point.total += 1;
        if r.is_correct {
            point.correct += 1;
        }
        point.high_frequency |= r.is_high_frequency;
    }

    for point in points.values_mut() {
        point.score = laplace_score(point.correct, point.total);
        point.level = MasteryLevel::from_score(point.score);
    }

    tracing::debug!("scored {} knowledge points from {} answers", points.len(), records.len());
    points
}
