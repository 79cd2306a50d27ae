//! The `examlens practice` command.

use std::path::PathBuf;

use anyhow::Result;
use comfy_table::{Cell, Table};

use examlens_core::selector::{
    PracticeSelection, RemediationSelector, SelectionObserver, SelectionPhase, Tier,
};

use super::{diagnostic_failure, open_store};

/// Console progress observer.
struct ConsoleObserver;

impl SelectionObserver for ConsoleObserver {
    fn on_phase(&self, attempt_id: &str, phase: SelectionPhase) {
        tracing::debug!("attempt {attempt_id}: {phase:?}");
    }

    fn on_tier(&self, _attempt_id: &str, tier: Tier, accepted: usize, selected: usize) {
        eprintln!("  Tier {tier}: +{accepted} ({selected} selected)");
    }

    fn on_deadline(&self, attempt_id: &str, skipped: Tier) {
        eprintln!("  Deadline reached for {attempt_id}, skipped tier {skipped} onwards");
    }
}

pub async fn execute(
    attempt_id: String,
    format: String,
    config_path: Option<PathBuf>,
) -> Result<()> {
    let (config, store) = open_store(config_path.as_deref())?;

    let selector = RemediationSelector::new(
        store.clone(),
        store,
        config.selection.to_selector_config(),
    );
    let selection = selector
        .select(&attempt_id, &ConsoleObserver)
        .await
        .map_err(|e| diagnostic_failure(e, &format))?;

    match format.as_str() {
        "json" => {
            println!("{}", serde_json::to_string_pretty(&selection)?);
        }
        _ => print_text(&selection),
    }

    Ok(())
}

fn print_text(selection: &PracticeSelection) {
    println!(
        "Attempt {}: {:.1}% ({}/{} correct), risk {}",
        selection.attempt_id,
        selection.score * 100.0,
        selection.completed_correct,
        selection.completed_total,
        selection.risk_level
    );
    println!("{}", selection.risk_alert);

    if !selection.weaknesses.is_empty() {
        let mut table = Table::new();
        table.set_header(vec!["Weakness", "Title", "Section", "Accuracy"]);
        for w in &selection.weaknesses {
            table.add_row(vec![
                Cell::new(&w.code),
                Cell::new(&w.title),
                Cell::new(&w.section_title),
                Cell::new(format!("{:.1}%", w.accuracy * 100.0)),
            ]);
        }
        println!("\n{table}");
    }

    println!(
        "\n{} practice questions (target {})",
        selection.total, selection.target
    );
    if !selection.questions.is_empty() {
        let mut table = Table::new();
        table.set_header(vec!["#", "Question", "Point", "Section"]);
        for (i, q) in selection.questions.iter().enumerate() {
            table.add_row(vec![
                Cell::new(i + 1),
                Cell::new(&q.question_uuid),
                Cell::new(&q.knowledge_point_title),
                Cell::new(&q.section_title),
            ]);
        }
        println!("{table}");
    }
}
