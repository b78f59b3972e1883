//! Error types for the hook's outer layer.
//!
//! The routing core never fails: malformed catalog entries and bad patterns
//! are reported as diagnostics instead. These errors only cover I/O and
//! catalog loading, and `main` turns every one of them into an empty hook
//! response.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RouterError {
    #[error("Failed to read stdin: {0}")]
    StdinRead(#[source] io::Error),

    #[error("Failed to parse input JSON: {0}")]
    InputParse(#[from] serde_json::Error),

    #[error("Failed to read router rules from {path}: {source}")]
    RulesRead { path: PathBuf, source: io::Error },

    #[error("Failed to parse router rules at {path}: {reason}")]
    RulesParse { path: PathBuf, reason: String },

    #[error("Global router rules not found (searched {searched} locations)")]
    RulesNotFound { searched: usize },

    #[error("Global router rules at {0} are missing required top-level keys")]
    MissingRequiredKeys(PathBuf),

    #[error("Failed to serialize hook output: {0}")]
    OutputSerialize(#[source] serde_json::Error),

    #[error("Failed to write hook output: {0}")]
    OutputWrite(#[source] io::Error),
}

pub type Result<T> = std::result::Result<T, RouterError>;
