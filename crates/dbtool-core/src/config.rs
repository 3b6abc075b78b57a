use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{DbToolError, Result};

pub const DEFAULT_STORE_PATH: &str = "expenseManagerDatabase.db";
pub const DEFAULT_MIGRATIONS_DIR: &str = "database";
pub const DEFAULT_PRIMARY_SCRIPT: &str = "expenseManagerDatabase.sql";
pub const DEFAULT_SCHEMA_OUT: &str = "database_schema.sql";
pub const DEFAULT_DUMP_OUT: &str = "database_dump_full.sql";
pub const DEFAULT_TABLE_OUT: &str = "database_dump_table.txt";

/// Locations used by every command. Passed explicitly to each component.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DbToolConfig {
    pub store_path: PathBuf,
    pub migrations_dir: PathBuf,
    /// Base install scripts, applied only by `init` and never picked up as
    /// incremental migrations. Applied in the listed order.
    pub primary_scripts: Vec<String>,
    pub schema_out: PathBuf,
    pub dump_out: PathBuf,
    pub table_out: PathBuf,
}

impl Default for DbToolConfig {
    fn default() -> Self {
        Self {
            store_path: PathBuf::from(DEFAULT_STORE_PATH),
            migrations_dir: PathBuf::from(DEFAULT_MIGRATIONS_DIR),
            primary_scripts: vec![DEFAULT_PRIMARY_SCRIPT.to_string()],
            schema_out: PathBuf::from(DEFAULT_SCHEMA_OUT),
            dump_out: PathBuf::from(DEFAULT_DUMP_OUT),
            table_out: PathBuf::from(DEFAULT_TABLE_OUT),
        }
    }
}

impl DbToolConfig {
    /// Load a JSON config file. Missing keys keep their defaults.
    ///
    /// # Errors
    /// Returns [`DbToolError::Config`] when the file cannot be read or parsed.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let body = fs::read_to_string(path).map_err(|err| DbToolError::Config {
            path: path.to_path_buf(),
            cause: err.to_string(),
        })?;
        serde_json::from_str(&body)
            .map_err(|err| DbToolError::Config { path: path.to_path_buf(), cause: err.to_string() })
    }

    #[must_use]
    pub fn is_primary(&self, name: &str) -> bool {
        self.primary_scripts.iter().any(|primary| primary == name)
    }
}
