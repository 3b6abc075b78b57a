//! Migration discovery and filtering.
//!
//! Application order is the plain lexicographic order of file names. Authors
//! must prefix names with a fixed-width increasing token (`001_`, `2024-05-01_`)
//! so that this order is the intended one; the planner only warns when it sees
//! numeric prefixes of differing width and never reorders on its own.

use std::collections::BTreeSet;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use time::PrimitiveDateTime;

use crate::error::{DbToolError, Result};

pub const SCRIPT_EXTENSION: &str = ".sql";

/// A script listed in the migrations directory whose body has not been read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationCandidate {
    pub name: String,
    pub path: PathBuf,
}

impl MigrationCandidate {
    /// # Errors
    /// Returns [`DbToolError::ScriptUnreadable`] when the file cannot be read as UTF-8 text.
    pub fn load(self) -> Result<MigrationFile> {
        let body = fs::read_to_string(&self.path)
            .map_err(|source| DbToolError::ScriptUnreadable { path: self.path.clone(), source })?;
        Ok(MigrationFile { name: self.name, path: self.path, body })
    }
}

/// A migration script loaded from disk. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationFile {
    pub name: String,
    pub path: PathBuf,
    pub body: String,
}

/// One row of the tracking table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationRecord {
    pub version: String,
    pub applied_at: Option<PrimitiveDateTime>,
}

/// List `*.sql` files in `dir`, minus the primary scripts, sorted by name.
///
/// A missing directory yields an empty plan. Bodies are not read here, so a
/// broken file that is already applied never blocks planning.
///
/// # Errors
/// Returns an error when the directory exists but cannot be listed.
pub fn discover_candidates(dir: &Path, primary: &[String]) -> Result<Vec<MigrationCandidate>> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(err) if err.kind() == ErrorKind::NotFound => {
            tracing::debug!(dir = %dir.display(), "migrations directory not found");
            return Ok(Vec::new());
        }
        Err(source) => {
            return Err(DbToolError::MigrationsDirUnreadable { path: dir.to_path_buf(), source })
        }
    };

    let mut candidates = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|source| DbToolError::MigrationsDirUnreadable {
            path: dir.to_path_buf(),
            source,
        })?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let Some(name) = entry.file_name().to_str().map(str::to_string) else {
            tracing::warn!(path = %path.display(), "skipping migration with non UTF-8 file name");
            continue;
        };
        if !name.ends_with(SCRIPT_EXTENSION) || primary.contains(&name) {
            continue;
        }
        candidates.push(MigrationCandidate { name, path });
    }

    candidates.sort_by(|a, b| a.name.cmp(&b.name));

    if has_mixed_width_prefixes(candidates.iter().map(|file| file.name.as_str())) {
        tracing::warn!(
            dir = %dir.display(),
            "migration names have numeric prefixes of different widths; \
             lexicographic order may not match the intended order"
        );
    }

    Ok(candidates)
}

/// Drop candidates whose name is already recorded. Order is preserved.
#[must_use]
pub fn pending_only(
    candidates: Vec<MigrationCandidate>,
    applied: &BTreeSet<String>,
) -> Vec<MigrationCandidate> {
    candidates.into_iter().filter(|file| !applied.contains(&file.name)).collect()
}

/// Load the primary schema scripts in their configured order.
///
/// # Errors
/// Returns [`DbToolError::ScriptUnreadable`] when any primary script is missing.
pub fn primary_files(dir: &Path, primary: &[String]) -> Result<Vec<MigrationFile>> {
    primary
        .iter()
        .map(|name| MigrationCandidate { name: name.clone(), path: dir.join(name) }.load())
        .collect()
}

fn has_mixed_width_prefixes<'a>(names: impl Iterator<Item = &'a str>) -> bool {
    let widths = names
        .map(|name| name.bytes().take_while(u8::is_ascii_digit).count())
        .filter(|width| *width > 0)
        .collect::<BTreeSet<_>>();
    widths.len() > 1
}
