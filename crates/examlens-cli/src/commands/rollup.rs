//! The `examlens rollup` command.

use std::path::PathBuf;

use anyhow::Result;
use comfy_table::{Cell, Table};

use examlens_core::tree::{load_nodes_json, MasteryForest, TreeNode};

pub fn execute(tree_path: PathBuf, format: String) -> Result<()> {
    let nodes = load_nodes_json(&tree_path)?;
    let mut forest = MasteryForest::build(nodes)?;
    forest.roll_up();

    match format.as_str() {
        "json" => {
            println!("{}", serde_json::to_string_pretty(forest.nodes())?);
        }
        _ => print_text(&forest),
    }

    Ok(())
}

fn print_text(forest: &MasteryForest) {
    let mut table = Table::new();
    table.set_header(vec!["Node", "Title", "Mastery", "Level", "Weak"]);

    // Depth-first, parents before children.
    let mut stack: Vec<(&TreeNode, usize)> = forest.roots().map(|n| (n, 0)).collect();
    stack.reverse();
    while let Some((node, depth)) = stack.pop() {
        let label = if node.code.is_empty() { &node.id } else { &node.code };
        table.add_row(vec![
            Cell::new(format!("{}{}", "  ".repeat(depth), label)),
            Cell::new(&node.title),
            Cell::new(
                node.mastery_score
                    .map(|s| format!("{s:.1}"))
                    .unwrap_or_else(|| "-".into()),
            ),
            Cell::new(format!("{:?}", node.mastery_level).to_lowercase()),
            Cell::new(if node.is_weak_point { "yes" } else { "" }),
        ]);
        for child in forest.children_of(&node.id).into_iter().rev() {
            stack.push((child, depth + 1));
        }
    }

    println!("{table}");
}
