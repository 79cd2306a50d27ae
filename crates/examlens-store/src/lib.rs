//! examlens-store — Storage backends and configuration.
//!
//! Implements the `AttemptStore`, `QuestionBank` and `Curriculum` traits
//! over SQLite (via `rusqlite`) and over in-process collections, and loads
//! the examlens configuration file.

pub mod config;
pub mod error;
pub mod memory;
pub mod sqlite;

pub use config::{load_config, load_config_from, ExamlensConfig, SelectionConfig};
pub use error::StoreError;
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;
