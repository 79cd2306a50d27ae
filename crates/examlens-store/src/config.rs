//! Configuration loading.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use examlens_core::selector::{SelectorConfig, MAX_QUESTIONS, MIN_QUESTIONS, TARGET_QUESTIONS};

/// Environment variable that overrides the database path.
pub const DATABASE_ENV: &str = "EXAMLENS_DATABASE";

/// Top-level examlens configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExamlensConfig {
    /// Path to the SQLite database.
    #[serde(default = "default_database")]
    pub database: PathBuf,
    /// Remediation selection limits.
    #[serde(default)]
    pub selection: SelectionConfig,
}

/// The `[selection]` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectionConfig {
    /// Stop issuing fallback tiers once this many questions are selected.
    #[serde(default = "default_min_questions")]
    pub min_questions: usize,
    /// Advertised target size of a practice set.
    #[serde(default = "default_target_questions")]
    pub target_questions: usize,
    /// Hard cap on a practice set.
    #[serde(default = "default_max_questions")]
    pub max_questions: usize,
    /// Optional bound on the whole tier pipeline, in milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deadline_ms: Option<u64>,
}

fn default_database() -> PathBuf {
    PathBuf::from("examlens.db")
}
fn default_min_questions() -> usize {
    MIN_QUESTIONS
}
fn default_target_questions() -> usize {
    TARGET_QUESTIONS
}
fn default_max_questions() -> usize {
    MAX_QUESTIONS
}

impl Default for ExamlensConfig {
    fn default() -> Self {
        Self {
            database: default_database(),
            selection: SelectionConfig::default(),
        }
    }
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            min_questions: default_min_questions(),
            target_questions: default_target_questions(),
            max_questions: default_max_questions(),
            deadline_ms: None,
        }
    }
}

impl SelectionConfig {
    /// Convert to the selector's runtime configuration.
    ///
    /// Limits are capped at [`MAX_QUESTIONS`] even if validation was skipped.
    pub fn to_selector_config(&self) -> SelectorConfig {
        let max_questions = self.max_questions.min(MAX_QUESTIONS);
        SelectorConfig {
            min_questions: self.min_questions.min(max_questions),
            target_questions: self.target_questions.min(max_questions),
            max_questions,
            deadline: self.deadline_ms.map(Duration::from_millis),
        }
    }

    fn validate(&self) -> Result<()> {
        if self.max_questions == 0 {
            anyhow::bail!("selection.max_questions must be at least 1");
        }
        if self.max_questions > MAX_QUESTIONS {
            anyhow::bail!(
                "selection.max_questions ({}) exceeds the hard cap of {MAX_QUESTIONS}",
                self.max_questions
            );
        }
        if self.target_questions > self.max_questions {
            anyhow::bail!(
                "selection.target_questions ({}) exceeds selection.max_questions ({})",
                self.target_questions,
                self.max_questions
            );
        }
        if self.min_questions > self.max_questions {
            anyhow::bail!(
                "selection.min_questions ({}) exceeds selection.max_questions ({})",
                self.min_questions,
                self.max_questions
            );
        }
        Ok(())
    }
}

impl ExamlensConfig {
    /// Render as TOML, e.g. for a starter config file.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("failed to serialize config")
    }

    /// Apply environment overrides using the given variable lookup.
    fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(db) = lookup(DATABASE_ENV).filter(|v| !v.is_empty()) {
            self.database = PathBuf::from(db);
        }
        let resolved = resolve_env_vars(&self.database.to_string_lossy(), &lookup);
        self.database = PathBuf::from(resolved);
    }
}

/// Resolve environment variable references like `${VAR_NAME}` in a string.
fn resolve_env_vars(s: &str, lookup: &impl Fn(&str) -> Option<String>) -> String {
    let mut result = s.to_string();
    while let Some(start) = result.find("${") {
        if let Some(end) = result[start..].find('}') {
            let var_name = &result[start + 2..start + end];
            let value = lookup(var_name).unwrap_or_default();
            result = format!(
                "{}{}{}",
                &result[..start],
                value,
                &result[start + end + 1..]
            );
        } else {
            break;
        }
    }
    result
}

/// Load configuration from well-known paths.
///
/// Search order:
/// 1. `examlens.toml` in the current directory
/// 2. `~/.config/examlens/config.toml`
///
/// Environment variable override: `EXAMLENS_DATABASE`.
pub fn load_config() -> Result<ExamlensConfig> {
    load_config_from(None)
}

/// Load config from an explicit path, or search the default locations.
pub fn load_config_from(path: Option<&Path>) -> Result<ExamlensConfig> {
    let config_path = if let Some(p) = path {
        if p.exists() {
            Some(p.to_path_buf())
        } else {
            anyhow::bail!("config file not found: {}", p.display());
        }
    } else {
        let local = PathBuf::from("examlens.toml");
        if local.exists() {
            Some(local)
        } else if let Some(home) = dirs_path() {
            let global = home.join("config.toml");
            if global.exists() {
                Some(global)
            } else {
                None
            }
        } else {
            None
        }
    };

    let mut config = match config_path {
        Some(path) => {
            tracing::debug!("loading config from {}", path.display());
            parse_config_file(&path)?
        }
        None => ExamlensConfig::default(),
    };

    config.apply_env_overrides(|name| std::env::var(name).ok());
    config.selection.validate()?;
    Ok(config)
}

fn parse_config_file(path: &Path) -> Result<ExamlensConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config: {}", path.display()))?;
    toml::from_str::<ExamlensConfig>(&content)
        .with_context(|| format!("failed to parse config: {}", path.display()))
}

/// `~/.config/examlens`, the global config directory.
pub fn dirs_path() -> Option<PathBuf> {
    std::env::var("HOME")
        .ok()
        .map(|h| PathBuf::from(h).join(".config").join("examlens"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name: &str| map.get(name).cloned()
    }

    #[test]
    fn resolve_env_vars_basic() {
        let lookup = env(&[("DATA_DIR", "/var/lib")]);
        assert_eq!(resolve_env_vars("${DATA_DIR}", &lookup), "/var/lib");
        assert_eq!(
            resolve_env_vars("${DATA_DIR}/examlens.db", &lookup),
            "/var/lib/examlens.db"
        );
        assert_eq!(resolve_env_vars("${MISSING}/x.db", &lookup), "/x.db");
        assert_eq!(resolve_env_vars("${UNCLOSED", &lookup), "${UNCLOSED");
    }

    #[test]
    fn default_config() {
        let config = ExamlensConfig::default();
        assert_eq!(config.database, PathBuf::from("examlens.db"));
        assert_eq!(config.selection.min_questions, 15);
        assert_eq!(config.selection.target_questions, 18);
        assert_eq!(config.selection.max_questions, 20);
        assert_eq!(config.selection.deadline_ms, None);
    }

    #[test]
    fn parse_partial_config() {
        let toml_str = r#"
database = "/tmp/exams.db"

[selection]
max_questions = 18
deadline_ms = 1500
"#;
        let config: ExamlensConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.database, PathBuf::from("/tmp/exams.db"));
        assert_eq!(config.selection.min_questions, 15);
        assert_eq!(config.selection.max_questions, 18);
        assert!(config.selection.validate().is_ok());

        let selector = config.selection.to_selector_config();
        assert_eq!(selector.max_questions, 18);
        assert_eq!(selector.deadline, Some(Duration::from_millis(1500)));
    }

    #[test]
    fn env_override_wins_and_is_resolved() {
        let mut config = ExamlensConfig::default();
        config.apply_env_overrides(env(&[
            ("EXAMLENS_DATABASE", "${HOME_DIR}/override.db"),
            ("HOME_DIR", "/home/learner"),
        ]));
        assert_eq!(config.database, PathBuf::from("/home/learner/override.db"));

        let mut config = ExamlensConfig::default();
        config.apply_env_overrides(env(&[("EXAMLENS_DATABASE", "")]));
        assert_eq!(config.database, PathBuf::from("examlens.db"));
    }

    #[test]
    fn load_from_explicit_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("examlens.toml");
        std::fs::write(&path, "database = \"custom.db\"\n").unwrap();

        let config = parse_config_file(&path).unwrap();
        assert_eq!(config.database, PathBuf::from("custom.db"));
        assert_eq!(config.selection, SelectionConfig::default());
    }

    #[test]
    fn missing_explicit_path_is_an_error() {
        let err = load_config_from(Some(Path::new("/nonexistent/examlens.toml"))).unwrap_err();
        assert!(err.to_string().contains("config file not found"));
    }

    #[test]
    fn invalid_selection_rejected() {
        let selection = SelectionConfig {
            min_questions: 30,
            ..SelectionConfig::default()
        };
        assert!(selection.validate().is_err());
        assert!(SelectionConfig::default().validate().is_ok());
    }

    #[test]
    fn max_questions_above_cap_rejected() {
        let selection = SelectionConfig {
            max_questions: 30,
            ..SelectionConfig::default()
        };
        let err = selection.validate().unwrap_err();
        assert!(err.to_string().contains("hard cap of 20"));

        let selection = SelectionConfig {
            max_questions: 16,
            ..SelectionConfig::default()
        };
        assert!(selection.validate().unwrap_err().to_string().contains("target_questions"));
    }

    #[test]
    fn selector_config_is_capped() {
        let selection = SelectionConfig {
            min_questions: 25,
            target_questions: 28,
            max_questions: 30,
            deadline_ms: None,
        };
        let selector = selection.to_selector_config();
        assert_eq!(selector.max_questions, MAX_QUESTIONS);
        assert_eq!(selector.target_questions, MAX_QUESTIONS);
        assert_eq!(selector.min_questions, MAX_QUESTIONS);
    }

    #[test]
    fn oversized_config_file_fails_to_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("examlens.toml");
        std::fs::write(&path, "[selection]\nmax_questions = 30\n").unwrap();

        let err = load_config_from(Some(&path)).unwrap_err();
        assert!(err.to_string().contains("max_questions (30)"));
    }

    #[test]
    fn starter_toml_roundtrips() {
        let rendered = ExamlensConfig::default().to_toml().unwrap();
        assert!(rendered.contains("[selection]"));
        let parsed: ExamlensConfig = toml::from_str(&rendered).unwrap();
        assert_eq!(parsed, ExamlensConfig::default());
    }
}
