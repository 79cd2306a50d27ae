//! examlens-core — Diagnostic scoring, aggregation and remediation selection.
//!
//! This crate defines the data model, store traits and the pure scoring
//! logic that the rest of examlens builds on. Storage backends live in
//! `examlens-store`; the command-line front end in `examlens-cli`.

pub mod aggregate;
pub mod codes;
pub mod error;
pub mod model;
pub mod report;
pub mod selector;
pub mod statistics;
pub mod traits;
pub mod tree;
