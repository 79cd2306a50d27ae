use std::collections::BTreeMap;

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use examlens_core::aggregate::aggregate;
use examlens_core::model::AnswerRecord;
use examlens_core::statistics::{laplace_score, score_points, PointStat};

fn make_answers(sections: u32, points_per_section: u32, answers_per_point: u32) -> Vec<AnswerRecord> {
    let mut answers = Vec::new();
    for s in 1..=sections {
        for p in 1..=points_per_section {
            for a in 0..answers_per_point {
                answers.push(AnswerRecord {
                    question_uuid: format!("q-{s}-{p}-{a}"),
                    knowledge_point_code: format!("C1.{s}.{p}"),
                    knowledge_point_title: format!("Point {s}.{p}"),
                    section_code: format!("C1.{s}"),
                    section_title: format!("Section {s}"),
                    is_correct: (a + p) % 3 != 0,
                    is_high_frequency: p % 4 == 0,
                });
            }
        }
    }
    answers
}

fn bench_laplace(c: &mut Criterion) {
    let mut group = c.benchmark_group("laplace_score");

    group.bench_function("c=7,n=10", |b| {
        b.iter(|| laplace_score(black_box(7), black_box(10)))
    });

    group.bench_function("c=0,n=0", |b| {
        b.iter(|| laplace_score(black_box(0), black_box(0)))
    });

    group.finish();
}

fn bench_score_points(c: &mut Criterion) {
    let mut group = c.benchmark_group("score_points");

    group.bench_function("small_attempt", |b| {
        let answers = make_answers(2, 3, 3);
        b.iter(|| score_points(black_box(&answers)))
    });

    group.bench_function("full_chapter", |b| {
        let answers = make_answers(12, 10, 5);
        b.iter(|| score_points(black_box(&answers)))
    });

    group.finish();
}

fn bench_aggregate(c: &mut Criterion) {
    let mut group = c.benchmark_group("aggregate");

    let points: BTreeMap<String, PointStat> = score_points(&make_answers(12, 10, 5));
    group.bench_function("full_chapter", |b| {
        b.iter(|| aggregate(black_box(&points), black_box(150)))
    });

    group.finish();
}

criterion_group!(benches, bench_laplace, bench_score_points, bench_aggregate);
criterion_main!(benches);
