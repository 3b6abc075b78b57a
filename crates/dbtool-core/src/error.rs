use std::path::PathBuf;

/// Failures surfaced by the migration engine and the snapshot generators.
///
/// None of these are retried. Every variant names the version or path involved
/// so the operator can find the offending file.
#[derive(Debug, thiserror::Error)]
pub enum DbToolError {
    #[error("store unavailable at {path}: {cause}")]
    StoreUnavailable { path: PathBuf, cause: String },
    #[error("migration {version} failed: {cause}")]
    MigrationFailed { version: String, cause: String },
    #[error("migration version already recorded: {0}")]
    DuplicateVersion(String),
    #[error("failed to read migration script {path}")]
    ScriptUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to list migrations directory {path}")]
    MigrationsDirUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write snapshot {path}")]
    SnapshotWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid configuration file {path}: {cause}")]
    Config { path: PathBuf, cause: String },
    #[error("query error: {0}")]
    Query(String),
}

pub type Result<T, E = DbToolError> = std::result::Result<T, E>;
