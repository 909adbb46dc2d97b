//! Error types and load result structures for the rule loader.

use std::path::PathBuf;

/// Errors that can occur during rule loading.
#[derive(Debug, thiserror::Error)]
pub enum RuleError {
    /// Filesystem I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML parse/deserialization error.
    #[error("YAML parse error: {0}")]
    Parse(#[from] serde_yaml::Error),

    /// Rule validation error (empty ids, dropped rules in strict mode).
    #[error("Validation error: {0}")]
    Validation(String),
}

/// Result alias for rule operations.
pub type Result<T> = std::result::Result<T, RuleError>;

/// Outcome of loading a single rule file.
#[derive(Debug)]
pub struct LoadResult {
    /// Path to the file that was loaded.
    pub path: PathBuf,
    /// Status of the load attempt.
    pub status: LoadStatus,
}

/// Status of a single file load attempt.
#[derive(Debug)]
pub enum LoadStatus {
    /// Rule set was successfully loaded.
    Loaded { set_id: String, rules: usize },
    /// File was skipped (dotfile, other extension, disabled set).
    Skipped { reason: String },
    /// Parse or validation error occurred.
    Failed { error: String },
}
