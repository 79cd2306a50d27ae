//! The `examlens init` command.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use examlens_store::{load_config_from, ExamlensConfig, SqliteStore};

pub fn execute(config_path: Option<PathBuf>) -> Result<()> {
    let path = config_path.unwrap_or_else(|| PathBuf::from("examlens.toml"));

    // Create examlens.toml
    if path.exists() {
        println!("{} already exists, skipping.", path.display());
    } else {
        std::fs::write(&path, starter_config()?)
            .with_context(|| format!("failed to write {}", path.display()))?;
        println!("Created {}", path.display());
    }

    // Create the database schema
    let config = load_config_from(Some(&path))?;
    let existed = config.database.exists();
    create_parent_dir(&config.database)?;
    SqliteStore::open(&config.database)
        .with_context(|| format!("failed to create database {}", config.database.display()))?;
    if existed {
        println!("Database {} already exists, schema checked.", config.database.display());
    } else {
        println!("Created database {}", config.database.display());
    }

    println!("\nNext steps:");
    println!("  1. Load attempts, answers, questions and knowledge points into the database");
    println!("  2. Run: examlens report --attempt <id>");
    println!("  3. Run: examlens practice --attempt <id>");

    Ok(())
}

fn starter_config() -> Result<String> {
    Ok(format!(
        "# examlens configuration\n#\n# EXAMLENS_DATABASE overrides `database`; ${{VAR}} references are expanded.\n\n{}",
        ExamlensConfig::default().to_toml()?
    ))
}

fn create_parent_dir(database: &Path) -> Result<()> {
    match database.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))
        }
        _ => Ok(()),
    }
}
