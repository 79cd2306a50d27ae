//! Section/chapter roll-up, coverage analytics and recommendations.
//!
//! Point scores are rolled up into section scores with frequency-aware
//! weights (`total × 1.2` for high-frequency points), and sections into the
//! chapter score weighted by their raw answer count only.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::codes::compare_codes;
use crate::model::MasteryLevel;
use crate::statistics::PointStat;

/// Weight multiplier for high-frequency knowledge points.
pub const HIGH_FREQUENCY_BOOST: f64 = 1.2;

/// Number of recommendations in a report.
pub const RECOMMENDATION_COUNT: usize = 3;

/// Fixed follow-up attached to every recommendation.
pub const NEXT_ACTION: &str =
    "Review this knowledge point, then redo its practice questions until the answers are consistently right";

/// Weight a point contributes to its section's weighted mean.
pub fn point_weight(point: &PointStat) -> f64 {
    let boost = if point.high_frequency {
        HIGH_FREQUENCY_BOOST
    } else {
        1.0
    };
    f64::from(point.total) * boost
}

/// Aggregated statistics for one section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectionStat {
    /// Section code.
    pub code: String,
    /// Section title.
    pub title: String,
    /// Raw number of answers across the section's points.
    pub total: u32,
    /// Raw number of correct answers.
    pub correct: u32,
    /// Σ point weight.
    pub weight_sum: f64,
    /// Σ point score × point weight.
    pub weighted_score_sum: f64,
}

impl SectionStat {
    fn new(code: &str, title: &str) -> Self {
        Self {
            code: code.to_string(),
            title: title.to_string(),
            total: 0,
            correct: 0,
            weight_sum: 0.0,
            weighted_score_sum: 0.0,
        }
    }

    /// Fold a point into the section accumulators.
    pub fn add_point(&mut self, point: &PointStat) {
        let weight = point_weight(point);
        self.total += point.total;
        self.correct += point.correct;
        self.weight_sum += weight;
        self.weighted_score_sum += point.score * weight;
    }

    /// Weighted mean of the section's point scores, 0 with no weight.
    pub fn score(&self) -> f64 {
        if self.weight_sum > 0.0 {
            self.weighted_score_sum / self.weight_sum
        } else {
            0.0
        }
    }
}

/// Chapter-level aggregate for an attempt.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChapterAggregate {
    /// Section scores weighted by section answer count.
    pub score: f64,
    /// Correct answers across the chapter.
    pub correct: u32,
    /// Answers across the chapter.
    pub total: u32,
}

/// How much of the curriculum the attempt exercised, and how well.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CoverageStat {
    /// Distinct points answered.
    pub tested_points: u32,
    /// Curriculum points under the attempt's chapter.
    pub total_points_in_scope: u64,
    /// tested_points / total_points_in_scope.
    pub coverage_hit_rate: f64,
    /// Tested points at the `mastered` level.
    pub mastered_points: u32,
    /// mastered_points / tested_points.
    pub mastery_hit_rate: f64,
}

impl CoverageStat {
    /// Compute coverage for a set of scored points.
    ///
    /// Rates are 0 for a zero denominator and capped at 1 when the attempt
    /// answered points the curriculum count does not include.
    pub fn compute(points: &BTreeMap<String, PointStat>, total_points_in_scope: u64) -> Self {
        let tested = points.values().filter(|p| p.total > 0).count() as u32;
        let mastered = points
            .values()
            .filter(|p| p.total > 0 && p.level == MasteryLevel::Mastered)
            .count() as u32;
        Self {
            tested_points: tested,
            total_points_in_scope,
            coverage_hit_rate: rate(u64::from(tested), total_points_in_scope),
            mastered_points: mastered,
            mastery_hit_rate: rate(u64::from(mastered), u64::from(tested)),
        }
    }
}

fn rate(numerator: u64, denominator: u64) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        (numerator as f64 / denominator as f64).min(1.0)
    }
}

/// A follow-up suggestion for one weak knowledge point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    /// Knowledge point code.
    pub target: String,
    /// The point's mastery level.
    pub reason: MasteryLevel,
    /// What the learner should do next.
    pub next_action: String,
}

/// Everything the aggregator derives from an attempt's point statistics.
#[derive(Debug, Clone, PartialEq)]
pub struct Aggregation {
    /// Points in natural code order.
    pub points: Vec<PointStat>,
    /// Sections in natural code order.
    pub sections: Vec<SectionStat>,
    pub chapter: ChapterAggregate,
    pub coverage: CoverageStat,
    pub recommendations: Vec<Recommendation>,
}

/// Roll point statistics up into sections, sorted by natural code order.
pub fn aggregate_sections(points: &BTreeMap<String, PointStat>) -> Vec<SectionStat> {
    let mut by_code: HashMap<&str, SectionStat> = HashMap::new();
    for point in points.values() {
        by_code
            .entry(point.section_code.as_str())
            .or_insert_with(|| SectionStat::new(&point.section_code, &point.section_title))
            .add_point(point);
    }

    let mut sections: Vec<SectionStat> = by_code.into_values().collect();
    sections.sort_by(|a, b| compare_codes(&a.code, &b.code));
    sections
}

/// Section-total-weighted mean of section scores.
///
/// High-frequency boosting applies only inside sections, never here.
pub fn aggregate_chapter(sections: &[SectionStat]) -> ChapterAggregate {
    let total: u32 = sections.iter().map(|s| s.total).sum();
    let correct: u32 = sections.iter().map(|s| s.correct).sum();
    let weighted: f64 = sections
        .iter()
        .map(|s| s.score() * f64::from(s.total))
        .sum();
    let score = if total == 0 {
        0.0
    } else {
        weighted / f64::from(total)
    };
    ChapterAggregate {
        score,
        correct,
        total,
    }
}

/// The weakest answered points, lowest score first, code as tiebreak.
pub fn recommend(points: &BTreeMap<String, PointStat>) -> Vec<Recommendation> {
    let mut candidates: Vec<&PointStat> = points.values().filter(|p| p.total >= 1).collect();
    candidates.sort_by(|a, b| {
        a.score
            .total_cmp(&b.score)
            .then_with(|| compare_codes(&a.code, &b.code))
    });
    candidates
        .into_iter()
        .take(RECOMMENDATION_COUNT)
        .map(|p| Recommendation {
            target: p.code.clone(),
            reason: p.level,
            next_action: NEXT_ACTION.to_string(),
        })
        .collect()
}

/// Run the full aggregation for one attempt.
pub fn aggregate(points: &BTreeMap<String, PointStat>, total_points_in_scope: u64) -> Aggregation {
    let sections = aggregate_sections(points);
    let chapter = aggregate_chapter(&sections);

    let mut sorted_points: Vec<PointStat> = points.values().cloned().collect();
    sorted_points.sort_by(|a, b| compare_codes(&a.code, &b.code));

    Aggregation {
        points: sorted_points,
        chapter,
        coverage: CoverageStat::compute(points, total_points_in_scope),
        recommendations: recommend(points),
        sections,
    }
}
