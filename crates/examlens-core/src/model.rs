//! Core data model types for examlens.
//!
//! These are the persisted records the diagnostic engine reads: attempts,
//! the answers recorded against them, and the question bank entries the
//! remediation selector draws from.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One scored response recorded during a diagnostic attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnswerRecord {
    /// The question that was answered.
    #[serde(default)]
    pub question_uuid: String,
    /// Dotted hierarchical knowledge point id (e.g. "C2.1.4").
    pub knowledge_point_code: String,
    /// Knowledge point title.
    #[serde(default)]
    pub knowledge_point_title: String,
    /// Section the knowledge point belongs to (e.g. "C2.1").
    pub section_code: String,
    /// Section title.
    #[serde(default)]
    pub section_title: String,
    /// Whether the learner answered correctly.
    pub is_correct: bool,
    /// Whether the knowledge point is flagged as exam-critical.
    #[serde(default)]
    pub is_high_frequency: bool,
}

/// A diagnostic attempt and its curriculum scope.
///
/// Scope fields are optional at the storage layer; the consumers decide
/// which of them they require.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attempt {
    /// Attempt identifier.
    pub id: String,
    /// Certificate (license) the attempt was taken for.
    #[serde(default)]
    pub certificate: Option<String>,
    /// Subject within the certificate.
    #[serde(default)]
    pub subject: Option<String>,
    /// Chapter the attempt is scoped to.
    #[serde(default)]
    pub chapter_code: Option<String>,
    /// Chapter title.
    #[serde(default)]
    pub chapter_title: Option<String>,
}

impl Attempt {
    /// Certificate and subject, if both are present and non-blank.
    pub fn practice_scope(&self) -> Option<(&str, &str)> {
        let certificate = non_blank(self.certificate.as_deref())?;
        let subject = non_blank(self.subject.as_deref())?;
        Some((certificate, subject))
    }

    /// Chapter code, if present and non-blank.
    pub fn chapter_scope(&self) -> Option<&str> {
        non_blank(self.chapter_code.as_deref())
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// A question bank entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    /// Unique question identifier.
    pub question_uuid: String,
    /// Certificate (license) scope.
    pub certificate: String,
    /// Subject scope.
    pub subject: String,
    /// Knowledge point the question exercises.
    pub knowledge_point_code: String,
    #[serde(default)]
    pub knowledge_point_title: String,
    /// Section the knowledge point belongs to.
    pub section_code: String,
    #[serde(default)]
    pub section_title: String,
    /// Question text.
    pub stem: String,
    /// Answer options, in display order.
    #[serde(default)]
    pub options: Vec<String>,
    /// The correct answer.
    pub correct_answer: String,
}

/// Discrete mastery verdict for a knowledge point on the 0–1 diagnostic scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MasteryLevel {
    Mastered,
    Borderline,
    Weak,
}

impl fmt::Display for MasteryLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MasteryLevel::Mastered => write!(f, "mastered"),
            MasteryLevel::Borderline => write!(f, "borderline"),
            MasteryLevel::Weak => write!(f, "weak"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attempt(certificate: Option<&str>, subject: Option<&str>) -> Attempt {
        Attempt {
            id: "a1".into(),
            certificate: certificate.map(Into::into),
            subject: subject.map(Into::into),
            chapter_code: Some("C2".into()),
            chapter_title: Some("Chapter 2".into()),
        }
    }

    #[test]
    fn practice_scope_requires_both_fields() {
        assert_eq!(
            attempt(Some("cfa"), Some("ethics")).practice_scope(),
            Some(("cfa", "ethics"))
        );
        assert!(attempt(None, Some("ethics")).practice_scope().is_none());
        assert!(attempt(Some("cfa"), None).practice_scope().is_none());
        assert!(attempt(Some("  "), Some("ethics")).practice_scope().is_none());
    }

    #[test]
    fn blank_chapter_is_no_scope() {
        let mut a = attempt(Some("cfa"), Some("ethics"));
        assert_eq!(a.chapter_scope(), Some("C2"));
        a.chapter_code = Some(" ".into());
        assert!(a.chapter_scope().is_none());
    }

    #[test]
    fn mastery_level_serde() {
        assert_eq!(MasteryLevel::Borderline.to_string(), "borderline");
        let json = serde_json::to_string(&MasteryLevel::Mastered).unwrap();
        assert_eq!(json, "\"mastered\"");
    }

    #[test]
    fn answer_record_defaults() {
        let json = r#"{
            "knowledge_point_code": "C2.1.4",
            "section_code": "C2.1",
            "is_correct": true
        }"#;
        let record: AnswerRecord = serde_json::from_str(json).unwrap();
        assert!(!record.is_high_frequency);
        assert!(record.question_uuid.is_empty());
    }
}
