//! Shared fixtures for CLI integration tests.

#![allow(dead_code)]

use std::path::{Path, PathBuf};

use assert_cmd::Command;
use examlens_core::model::{AnswerRecord, Attempt, Question};
use examlens_store::SqliteStore;

pub fn examlens() -> Command {
    #[allow(deprecated)]
    let mut cmd = Command::cargo_bin("examlens").unwrap();
    cmd.env_remove("EXAMLENS_DATABASE").env("RUST_LOG", "warn");
    cmd
}

pub fn attempt(id: &str, scoped: bool) -> Attempt {
    Attempt {
        id: id.into(),
        certificate: scoped.then(|| "cfa".to_string()),
        subject: scoped.then(|| "ethics".to_string()),
        chapter_code: Some("C2".into()),
        chapter_title: Some("Standards of practice".into()),
    }
}

pub fn answer(question: &str, point: &str, section: &str, correct: bool) -> AnswerRecord {
    AnswerRecord {
        question_uuid: question.into(),
        knowledge_point_code: point.into(),
        knowledge_point_title: format!("Point {point}"),
        section_code: section.into(),
        section_title: format!("Section {section}"),
        is_correct: correct,
        is_high_frequency: false,
    }
}

pub fn question(id: &str, point: &str, section: &str) -> Question {
    Question {
        question_uuid: id.into(),
        certificate: "cfa".into(),
        subject: "ethics".into(),
        knowledge_point_code: point.into(),
        knowledge_point_title: format!("Point {point}"),
        section_code: section.into(),
        section_title: format!("Section {section}"),
        stem: format!("Stem {id}"),
        options: vec!["A".into(), "B".into()],
        correct_answer: "A".into(),
    }
}

/// Seed `exams.db` in `dir` and write a config pointing at it.
///
/// - `seven`: 10 answers on C2.1.4, 7 correct
/// - `blank`: no answers
/// - `unscoped`: no certificate or subject
///
/// The bank holds 30 in-scope questions and the curriculum 4 points under C2.
pub fn seed_workspace(dir: &Path) -> PathBuf {
    let db = dir.join("exams.db");
    let store = SqliteStore::open(&db).unwrap();

    store.insert_attempt(&attempt("seven", true)).unwrap();
    for i in 0..10 {
        store
            .insert_answer("seven", &answer(&format!("d{i}"), "C2.1.4", "C2.1", i < 7))
            .unwrap();
    }
    store.insert_attempt(&attempt("blank", true)).unwrap();
    store.insert_attempt(&attempt("unscoped", false)).unwrap();

    for i in 0..10 {
        store.insert_question(&question(&format!("p{i}"), "C2.1.4", "C2.1")).unwrap();
    }
    for i in 0..20 {
        store.insert_question(&question(&format!("o{i}"), "C2.4.1", "C2.4")).unwrap();
    }
    for code in ["C2.1.4", "C2.1.8", "C2.4.1", "C2.4.2", "C3.1.1"] {
        store.insert_knowledge_point(code, "", "").unwrap();
    }

    let config = dir.join("examlens.toml");
    std::fs::write(
        &config,
        format!("database = {:?}\n", db.to_string_lossy()),
    )
    .unwrap();
    config
}
