//! CLI support for validif-lang
//!
//! Provides programmatic access to the `validif` commands for embedding in
//! other tools.

mod check;
mod docs;

pub use check::{execute_check, CheckOptions, CheckResult, Outcome};
pub use docs::{get_doc_topic, get_docs_overview, DocTopic};

use std::io;

use thiserror::Error;

use crate::{EvalError, ParseError};

/// Errors that can occur during CLI operations
#[derive(Debug, Error)]
pub enum CliError {
    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    #[error("Evaluation error: {0}")]
    Eval(#[from] EvalError),

    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Unknown topic: '{0}'\nRun 'validif docs' to see available topics.")]
    UnknownTopic(String),
}
