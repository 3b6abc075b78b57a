//! Store-independent pieces of the database lifecycle tool: configuration,
//! the error taxonomy, migration planning, and text table rendering.

pub mod config;
pub mod error;
pub mod plan;
pub mod table;

pub use config::DbToolConfig;
pub use error::{DbToolError, Result};
pub use plan::{
    discover_candidates, pending_only, primary_files, MigrationCandidate, MigrationFile,
    MigrationRecord,
};
pub use table::{format_table, CellValue, EMPTY_TABLE_MARKER};

/// Name of the table that records applied migration versions.
pub const TRACKING_TABLE: &str = "schema_version";
