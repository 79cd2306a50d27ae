//! The `examlens report` command.

use std::path::PathBuf;

use anyhow::Result;
use comfy_table::{Cell, Table};

use examlens_core::report::{generate_report, Report};

use super::{diagnostic_failure, open_store};

pub async fn execute(
    attempt_id: String,
    format: String,
    output: Option<PathBuf>,
    config_path: Option<PathBuf>,
) -> Result<()> {
    let (_, store) = open_store(config_path.as_deref())?;

    let report = generate_report(store.as_ref(), store.as_ref(), &attempt_id)
        .await
        .map_err(|e| diagnostic_failure(e, &format))?;

    if let Some(path) = &output {
        report.save_json(path)?;
        eprintln!("Report saved to: {}", path.display());
    }

    match format.as_str() {
        "markdown" | "md" => {
            println!("{}", report.to_markdown());
        }
        "json" => {
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        _ => print_text(&report),
    }

    Ok(())
}

fn print_text(report: &Report) {
    println!("Attempt {}", report.attempt_id);
    if let Some(chapter) = &report.scope.chapter_code {
        println!(
            "Chapter {} {}",
            chapter,
            report.scope.chapter_title.as_deref().unwrap_or_default()
        );
    }
    println!(
        "Overall: {:.1}% ({}/{} correct)",
        report.overall.score * 100.0,
        report.overall.correct,
        report.overall.total
    );
    println!(
        "Coverage: {}/{} points tested ({:.1}%), {} mastered ({:.1}%)",
        report.coverage.tested_points,
        report.coverage.total_points_in_scope,
        report.coverage.coverage_hit_rate * 100.0,
        report.coverage.mastered_points,
        report.coverage.mastery_hit_rate * 100.0
    );

    if !report.sections.is_empty() {
        let mut table = Table::new();
        table.set_header(vec!["Section", "Title", "Score", "Correct"]);
        for s in &report.sections {
            table.add_row(vec![
                Cell::new(&s.section_code),
                Cell::new(&s.section_title),
                Cell::new(format!("{:.1}%", s.score * 100.0)),
                Cell::new(format!("{}/{}", s.correct, s.total)),
            ]);
        }
        println!("\n{table}");
    }

    if !report.points.is_empty() {
        let mut table = Table::new();
        table.set_header(vec!["Point", "Title", "Score", "Level", "Correct"]);
        for p in &report.points {
            table.add_row(vec![
                Cell::new(&p.point_code),
                Cell::new(&p.point_title),
                Cell::new(format!("{:.1}%", p.score * 100.0)),
                Cell::new(p.level),
                Cell::new(format!("{}/{}", p.correct, p.total)),
            ]);
        }
        println!("\n{table}");
    }

    if !report.recommendations.is_empty() {
        println!("\nRecommendations:");
        for r in &report.recommendations {
            println!("  {} ({}): {}", r.target, r.reason, r.next_action);
        }
    }
}
