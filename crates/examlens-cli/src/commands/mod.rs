//! Subcommand implementations.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};

use examlens_core::error::DiagnosticError;
use examlens_store::{load_config_from, ExamlensConfig, SqliteStore};

pub mod init;
pub mod practice;
pub mod report;
pub mod rollup;

/// Load the config and open its existing database.
pub(crate) fn open_store(config_path: Option<&Path>) -> Result<(ExamlensConfig, Arc<SqliteStore>)> {
    let config = load_config_from(config_path)?;
    anyhow::ensure!(
        config.database.exists(),
        "database not found: {} (run `examlens init` first)",
        config.database.display()
    );
    let store = SqliteStore::open(&config.database)
        .with_context(|| format!("failed to open database {}", config.database.display()))?;
    Ok((config, Arc::new(store)))
}

/// Print the `{error: {code, message}}` body on stdout for JSON consumers,
/// then hand the error back for the usual stderr report.
pub(crate) fn diagnostic_failure(err: DiagnosticError, format: &str) -> anyhow::Error {
    if format == "json" {
        match serde_json::to_string_pretty(&err.to_body()) {
            Ok(body) => println!("{body}"),
            Err(e) => tracing::warn!("failed to serialize error body: {e}"),
        }
    }
    anyhow::Error::new(err).context("diagnostic request failed")
}
