use std::collections::BTreeSet;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;

use dbtool_core::{
    discover_candidates, pending_only, primary_files, DbToolConfig, DbToolError,
    MigrationCandidate, MigrationFile, MigrationRecord, Result, TRACKING_TABLE,
};
use rusqlite::{params, Connection, ErrorCode, OpenFlags};
use time::macros::format_description;
use time::PrimitiveDateTime;

pub mod snapshot;

const CREATE_TRACKING_TABLE_SQL: &str = r"
CREATE TABLE IF NOT EXISTS schema_version(
    version TEXT PRIMARY KEY,
    applied_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
)
";

const BUSY_TIMEOUT: Duration = Duration::from_millis(5000);

/// Result of [`initialize_base`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InitOutcome {
    /// The store file already existed and was left untouched.
    Skipped,
    Created { applied: Vec<String> },
}

/// One open connection to the on-disk store. Closed when dropped.
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Open the store, creating the file when it does not exist yet.
    ///
    /// # Errors
    /// Returns [`DbToolError::StoreUnavailable`] when the path cannot be opened
    /// or the file is not a readable `SQLite` database.
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path).map_err(|err| unavailable(path, &err))?;
        Self::configure(conn, path)
    }

    /// Open an existing store read-only. Never creates the file.
    ///
    /// # Errors
    /// Returns [`DbToolError::StoreUnavailable`] when the file is missing or unreadable.
    pub fn open_existing(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(DbToolError::StoreUnavailable {
                path: path.to_path_buf(),
                cause: "store file does not exist; run init first".to_string(),
            });
        }

        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .map_err(|err| unavailable(path, &err))?;
        Self::configure(conn, path)
    }

    fn configure(conn: Connection, path: &Path) -> Result<Self> {
        conn.busy_timeout(BUSY_TIMEOUT).map_err(|err| unavailable(path, &err))?;

        // Opening is lazy; touching the catalog is what detects a corrupt file.
        conn.query_row("SELECT COUNT(*) FROM sqlite_master", [], |row| row.get::<_, i64>(0))
            .map_err(|err| unavailable(path, &err))?;

        tracing::debug!(path = %path.display(), "opened sqlite store");
        Ok(Self { conn })
    }

    /// Create the tracking table when it is missing. Safe to call on every run.
    ///
    /// # Errors
    /// Returns an error when the DDL cannot be executed.
    pub fn ensure_tracking_table(&self) -> Result<()> {
        self.conn
            .execute_batch(CREATE_TRACKING_TABLE_SQL)
            .map_err(|err| query_error("failed to create tracking table", &err))
    }

    /// Every recorded version. Empty when the tracking table does not exist yet.
    ///
    /// # Errors
    /// Returns an error when the tracking table cannot be read.
    pub fn applied_versions(&self) -> Result<BTreeSet<String>> {
        Ok(self.applied_records()?.into_iter().map(|record| record.version).collect())
    }

    /// Tracking rows ordered by version.
    ///
    /// `applied_at` is `None` when the stored value is not in `SQLite`'s
    /// `CURRENT_TIMESTAMP` layout.
    ///
    /// # Errors
    /// Returns an error when the tracking table cannot be read.
    pub fn applied_records(&self) -> Result<Vec<MigrationRecord>> {
        if !table_exists(&self.conn, TRACKING_TABLE)? {
            return Ok(Vec::new());
        }

        let mut stmt = self
            .conn
            .prepare(
                "SELECT version, CAST(applied_at AS TEXT) FROM schema_version ORDER BY version",
            )
            .map_err(|err| query_error("failed to prepare tracking query", &err))?;
        let rows = stmt
            .query_map([], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, Option<String>>(1)?))
            })
            .map_err(|err| query_error("failed to read tracking table", &err))?;

        let mut records = Vec::new();
        for row in rows {
            let (version, applied_at) =
                row.map_err(|err| query_error("failed to read tracking row", &err))?;
            // `CURRENT_TIMESTAMP` layout, in UTC.
            let applied_at = applied_at.and_then(|raw| {
                PrimitiveDateTime::parse(
                    &raw,
                    format_description!("[year]-[month]-[day] [hour]:[minute]:[second]"),
                )
                .ok()
            });
            records.push(MigrationRecord { version, applied_at });
        }
        Ok(records)
    }

    /// Insert one tracking row stamped with the current time.
    ///
    /// # Errors
    /// Returns [`DbToolError::DuplicateVersion`] when `version` is already recorded.
    pub fn record_applied(&self, version: &str) -> Result<()> {
        record_version(&self.conn, version)
    }

    /// Names and paths of the pending non-primary migrations, in application order.
    ///
    /// # Errors
    /// Returns an error when the migrations directory or tracking table cannot be read.
    pub fn pending_candidates(&self, config: &DbToolConfig) -> Result<Vec<MigrationCandidate>> {
        let candidates = discover_candidates(&config.migrations_dir, &config.primary_scripts)?;
        Ok(pending_only(candidates, &self.applied_versions()?))
    }

    /// Pending non-primary migrations for `config` with their bodies loaded.
    /// Only pending scripts are read.
    ///
    /// # Errors
    /// Returns an error when planning fails or a pending script cannot be read.
    pub fn plan_pending(&self, config: &DbToolConfig) -> Result<Vec<MigrationFile>> {
        self.pending_candidates(config)?.into_iter().map(MigrationCandidate::load).collect()
    }

    /// Apply `pending` in order. See [`SqliteStore::apply_all_with`].
    ///
    /// # Errors
    /// Returns the first failure; later migrations are not attempted.
    pub fn apply_all(&mut self, pending: &[MigrationFile]) -> Result<Vec<String>> {
        self.apply_all_with(pending, |_| {})
    }

    /// Apply `pending` in order, calling `before_apply` ahead of each file.
    ///
    /// A plain script runs in its own transaction together with its tracking
    /// row, so a failing script leaves neither schema changes nor a record
    /// behind. A script that opens with `BEGIN` owns its transaction boundary:
    /// it runs as written in autocommit mode and is recorded once it has run to
    /// the end. Migrations committed before a failure stay committed.
    ///
    /// # Errors
    /// Returns [`DbToolError::MigrationFailed`] for the first script that fails
    /// and does not attempt the remaining ones.
    pub fn apply_all_with<F>(
        &mut self,
        pending: &[MigrationFile],
        mut before_apply: F,
    ) -> Result<Vec<String>>
    where
        F: FnMut(&MigrationFile),
    {
        self.ensure_tracking_table()?;

        let mut applied = Vec::with_capacity(pending.len());
        for file in pending {
            before_apply(file);
            self.apply_one(file)?;
            tracing::info!(version = %file.name, "migration applied");
            applied.push(file.name.clone());
        }
        Ok(applied)
    }

    fn apply_one(&mut self, file: &MigrationFile) -> Result<()> {
        tracing::debug!(version = %file.name, path = %file.path.display(), "executing migration");
        if opens_own_transaction(&file.body) {
            return self.apply_self_managed(file);
        }

        let tx = self.conn.transaction().map_err(|err| migration_failed(file, &err))?;
        tx.execute_batch(&file.body).map_err(|err| migration_failed(file, &err))?;

        if tx.is_autocommit() {
            // The body committed itself and ran to the end; its effects are durable.
            tracing::warn!(
                version = %file.name,
                "migration ended the enclosing transaction; recording it outside a transaction"
            );
            return record_version(&tx, &file.name);
        }

        record_version(&tx, &file.name)?;
        tx.commit().map_err(|err| migration_failed(file, &err))
    }

    fn apply_self_managed(&self, file: &MigrationFile) -> Result<()> {
        tracing::debug!(version = %file.name, "migration manages its own transaction");
        let outcome = self
            .conn
            .execute_batch(&file.body)
            .map_err(|err| migration_failed(file, &err))
            .and_then(|()| record_version(&self.conn, &file.name));
        if self.conn.is_autocommit() {
            return outcome;
        }

        // The body left its transaction open.
        match outcome {
            Ok(()) => self.conn.execute_batch("COMMIT").map_err(|err| migration_failed(file, &err)),
            Err(err) => {
                if let Err(rollback) = self.conn.execute_batch("ROLLBACK") {
                    tracing::warn!(version = %file.name, error = %rollback, "rollback failed");
                }
                Err(err)
            }
        }
    }

    /// Discover and apply every pending non-primary migration.
    ///
    /// # Errors
    /// Returns the first planning or migration failure.
    pub fn migrate<F>(&mut self, config: &DbToolConfig, before_apply: F) -> Result<Vec<String>>
    where
        F: FnMut(&MigrationFile),
    {
        self.ensure_tracking_table()?;
        let pending = self.plan_pending(config)?;
        if pending.is_empty() {
            tracing::debug!("no pending migrations");
        }
        self.apply_all_with(&pending, before_apply)
    }
}

/// Create the store and apply the primary schema scripts.
///
/// Existence of the store file is the only check: an existing file, whatever it
/// contains, is left untouched. Primary scripts are read before the file is
/// created, and a file created here is removed again when a primary script
/// fails, so a failed init never blocks the next one.
///
/// # Errors
/// Returns an error when a primary script is unreadable, the store cannot be
/// created, or a primary script fails.
pub fn initialize_base<F>(config: &DbToolConfig, before_apply: F) -> Result<InitOutcome>
where
    F: FnMut(&MigrationFile),
{
    if config.store_path.exists() {
        tracing::info!(path = %config.store_path.display(), "store already exists, skipping init");
        return Ok(InitOutcome::Skipped);
    }

    let primary = primary_files(&config.migrations_dir, &config.primary_scripts)?;
    let applied = SqliteStore::open(&config.store_path)
        .and_then(|mut store| store.apply_all_with(&primary, before_apply));

    match applied {
        Ok(applied) => Ok(InitOutcome::Created { applied }),
        Err(err) => {
            discard_store_files(&config.store_path);
            Err(err)
        }
    }
}

fn discard_store_files(path: &Path) {
    let mut journal = path.as_os_str().to_owned();
    journal.push("-journal");

    for file in [path.to_path_buf(), PathBuf::from(journal)] {
        match fs::remove_file(&file) {
            Ok(()) => tracing::debug!(path = %file.display(), "removed partially initialized store"),
            Err(err) if err.kind() == ErrorKind::NotFound => {}
            Err(err) => {
                tracing::warn!(path = %file.display(), error = %err, "failed to remove store file");
            }
        }
    }
}

/// Whether the first statement of `body`, after comments, is `BEGIN`.
fn opens_own_transaction(body: &str) -> bool {
    let mut rest = body;
    loop {
        rest = rest.trim_start();
        if let Some(comment) = rest.strip_prefix("--") {
            rest = comment.split_once('\n').map_or("", |(_, tail)| tail);
        } else if let Some(comment) = rest.strip_prefix("/*") {
            rest = comment.split_once("*/").map_or("", |(_, tail)| tail);
        } else {
            break;
        }
    }

    let keyword = rest.split(|ch: char| !ch.is_ascii_alphabetic()).next().unwrap_or_default();
    keyword.eq_ignore_ascii_case("BEGIN")
}

fn migration_failed(file: &MigrationFile, err: &rusqlite::Error) -> DbToolError {
    DbToolError::MigrationFailed { version: file.name.clone(), cause: err.to_string() }
}

fn record_version(conn: &Connection, version: &str) -> Result<()> {
    match conn.execute("INSERT INTO schema_version(version) VALUES (?1)", params![version]) {
        Ok(_) => Ok(()),
        Err(rusqlite::Error::SqliteFailure(err, _))
            if err.code == ErrorCode::ConstraintViolation =>
        {
            Err(DbToolError::DuplicateVersion(version.to_string()))
        }
        Err(err) => Err(query_error(&format!("failed to record migration version {version}"), &err)),
    }
}

fn table_exists(conn: &Connection, table_name: &str) -> Result<bool> {
    let exists = conn
        .query_row(
            "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1)",
            params![table_name],
            |row| row.get::<_, i64>(0),
        )
        .map_err(|err| query_error(&format!("failed to check if table exists: {table_name}"), &err))?;
    Ok(exists == 1)
}

pub(crate) fn query_error(context: &str, err: &rusqlite::Error) -> DbToolError {
    DbToolError::Query(format!("{context}: {err}"))
}

fn unavailable(path: &Path, err: &rusqlite::Error) -> DbToolError {
    DbToolError::StoreUnavailable { path: path.to_path_buf(), cause: err.to_string() }
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::PathBuf;

    use super::*;

    fn script(name: &str, body: &str) -> MigrationFile {
        MigrationFile { name: name.to_string(), path: PathBuf::from(name), body: body.to_string() }
    }

    fn table_names(store: &SqliteStore) -> Result<Vec<String>> {
        let mut stmt = store
            .conn
            .prepare("SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name")
            .map_err(|err| query_error("prepare", &err))?;
        let names = stmt
            .query_map([], |row| row.get::<_, String>(0))
            .map_err(|err| query_error("query", &err))?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(|err| query_error("row", &err))?;
        Ok(names)
    }

    fn test_config(root: &Path) -> DbToolConfig {
        DbToolConfig {
            store_path: root.join("app.db"),
            migrations_dir: root.join("database"),
            ..DbToolConfig::default()
        }
    }

    fn write_migrations(config: &DbToolConfig, files: &[(&str, &str)]) -> anyhow::Result<()> {
        fs::create_dir_all(&config.migrations_dir)?;
        for (name, body) in files {
            fs::write(config.migrations_dir.join(name), body)?;
        }
        Ok(())
    }

    #[test]
    fn fresh_store_has_no_applied_versions() -> anyhow::Result<()> {
        let store = SqliteStore::open(Path::new(":memory:"))?;
        assert!(store.applied_versions()?.is_empty());

        store.ensure_tracking_table()?;
        store.ensure_tracking_table()?;
        assert!(store.applied_versions()?.is_empty());
        Ok(())
    }

    #[test]
    fn record_applied_stamps_time_and_rejects_duplicates() -> anyhow::Result<()> {
        let store = SqliteStore::open(Path::new(":memory:"))?;
        store.ensure_tracking_table()?;
        store.record_applied("001_wallets.sql")?;

        let records = store.applied_records()?;
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].version, "001_wallets.sql");
        assert!(records[0].applied_at.is_some());

        let Err(err) = store.record_applied("001_wallets.sql") else {
            anyhow::bail!("expected duplicate version to be rejected");
        };
        assert!(matches!(err, DbToolError::DuplicateVersion(version) if version == "001_wallets.sql"));
        Ok(())
    }

    #[test]
    fn apply_all_is_idempotent_through_the_planner() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let config = test_config(dir.path());
        write_migrations(
            &config,
            &[
                ("001_wallets.sql", "CREATE TABLE wallets(id INTEGER PRIMARY KEY, name TEXT);"),
                ("002_seed.sql", "INSERT INTO wallets(name) VALUES ('cash');"),
            ],
        )?;

        let mut store = SqliteStore::open(&config.store_path)?;
        let first = store.migrate(&config, |_| {})?;
        assert_eq!(first, vec!["001_wallets.sql".to_string(), "002_seed.sql".to_string()]);

        let second = store.migrate(&config, |_| {})?;
        assert!(second.is_empty());

        let rows: i64 = store.conn.query_row("SELECT COUNT(*) FROM wallets", [], |row| row.get(0))?;
        assert_eq!(rows, 1);
        assert_eq!(store.applied_versions()?.len(), 2);
        Ok(())
    }

    #[test]
    fn migrations_apply_in_name_order() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let config = test_config(dir.path());
        // 002 depends on 001; written first so listing order differs from name order.
        write_migrations(
            &config,
            &[
                ("002_add_column.sql", "ALTER TABLE banks ADD COLUMN code TEXT;"),
                ("001_banks.sql", "CREATE TABLE banks(id INTEGER PRIMARY KEY, name TEXT);"),
            ],
        )?;

        let mut store = SqliteStore::open(&config.store_path)?;
        let mut seen = Vec::new();
        store.migrate(&config, |file| seen.push(file.name.clone()))?;
        assert_eq!(seen, vec!["001_banks.sql".to_string(), "002_add_column.sql".to_string()]);
        Ok(())
    }

    #[test]
    fn failed_migration_halts_sequence_and_is_not_recorded() -> anyhow::Result<()> {
        let mut store = SqliteStore::open(Path::new(":memory:"))?;
        let pending = vec![
            script("001_a.sql", "CREATE TABLE a(id INTEGER);"),
            script("002_b.sql", "CREATE TABLE b(id INTEGER); INSERT INTO missing VALUES (1);"),
            script("003_c.sql", "CREATE TABLE c(id INTEGER);"),
        ];

        let mut attempted = Vec::new();
        let Err(err) = store.apply_all_with(&pending, |file| attempted.push(file.name.clone()))
        else {
            anyhow::bail!("expected second migration to fail");
        };

        match err {
            DbToolError::MigrationFailed { version, cause } => {
                assert_eq!(version, "002_b.sql");
                assert!(cause.contains("missing"), "unexpected cause: {cause}");
            }
            other => anyhow::bail!("unexpected error: {other}"),
        }
        assert_eq!(attempted, vec!["001_a.sql".to_string(), "002_b.sql".to_string()]);
        assert_eq!(store.applied_versions()?, BTreeSet::from(["001_a.sql".to_string()]));
        // Table `b` was created by the failing script and must have been rolled back.
        assert_eq!(table_names(&store)?, vec!["a".to_string(), "schema_version".to_string()]);
        Ok(())
    }

    #[test]
    fn script_wrapped_in_its_own_transaction_is_applied_and_recorded() -> anyhow::Result<()> {
        let mut store = SqliteStore::open(Path::new(":memory:"))?;
        let pending = vec![script(
            "001_d.sql",
            "-- generated by a dump\nBEGIN TRANSACTION;\nCREATE TABLE d(id INTEGER);\nINSERT INTO d VALUES(1);\nCOMMIT;\n",
        )];

        assert_eq!(store.apply_all(&pending)?, vec!["001_d.sql".to_string()]);
        assert_eq!(store.applied_versions()?, BTreeSet::from(["001_d.sql".to_string()]));
        let rows: i64 = store.conn.query_row("SELECT COUNT(*) FROM d", [], |row| row.get(0))?;
        assert_eq!(rows, 1);
        assert!(store.conn.is_autocommit());
        Ok(())
    }

    #[test]
    fn failing_self_managed_script_is_rolled_back_and_not_recorded() -> anyhow::Result<()> {
        let mut store = SqliteStore::open(Path::new(":memory:"))?;
        let pending = vec![script(
            "001_tx.sql",
            "BEGIN; CREATE TABLE t(id INTEGER); INSERT INTO missing VALUES (1); COMMIT;",
        )];

        let Err(err) = store.apply_all(&pending) else {
            anyhow::bail!("expected failing script to be reported");
        };
        assert!(matches!(err, DbToolError::MigrationFailed { ref version, .. } if version == "001_tx.sql"));
        assert!(store.conn.is_autocommit());
        assert!(store.applied_versions()?.is_empty());
        assert!(!table_exists(&store.conn, "t")?);
        Ok(())
    }

    #[test]
    fn script_that_commits_the_enclosing_transaction_is_still_recorded() -> anyhow::Result<()> {
        let mut store = SqliteStore::open(Path::new(":memory:"))?;
        let pending = vec![
            script("001_t.sql", "CREATE TABLE t(id INTEGER); COMMIT;"),
            script("002_u.sql", "CREATE TABLE u(id INTEGER);"),
        ];

        let applied = store.apply_all(&pending)?;
        assert_eq!(applied, vec!["001_t.sql".to_string(), "002_u.sql".to_string()]);
        assert_eq!(
            store.applied_versions()?,
            BTreeSet::from(["001_t.sql".to_string(), "002_u.sql".to_string()])
        );
        assert!(table_exists(&store.conn, "t")?);
        assert!(table_exists(&store.conn, "u")?);
        Ok(())
    }

    #[test]
    fn leading_begin_is_found_after_comments() {
        assert!(opens_own_transaction("BEGIN TRANSACTION;\nCOMMIT;"));
        assert!(opens_own_transaction("  -- header\n/* note */\nbegin;"));
        assert!(!opens_own_transaction("CREATE TABLE t(id INTEGER); COMMIT;"));
        assert!(!opens_own_transaction("-- BEGIN\nCREATE TABLE t(id INTEGER);"));
        assert!(!opens_own_transaction("BEGINNING_TABLE"));
        assert!(!opens_own_transaction(""));
    }

    #[test]
    fn initialize_base_applies_primary_only_once() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let config = test_config(dir.path());
        write_migrations(
            &config,
            &[
                ("expenseManagerDatabase.sql", "CREATE TABLE transactions(id INTEGER PRIMARY KEY);"),
                ("001_extra.sql", "CREATE TABLE extra(id INTEGER);"),
            ],
        )?;

        let outcome = initialize_base(&config, |_| {})?;
        assert_eq!(
            outcome,
            InitOutcome::Created { applied: vec!["expenseManagerDatabase.sql".to_string()] }
        );

        {
            let store = SqliteStore::open(&config.store_path)?;
            assert_eq!(table_names(&store)?, vec!["schema_version".to_string(), "transactions".to_string()]);
            store.conn.execute_batch("CREATE TABLE operator_notes(body TEXT);")?;
        }
        let before = fs::read(&config.store_path)?;

        assert_eq!(initialize_base(&config, |_| {})?, InitOutcome::Skipped);
        assert_eq!(fs::read(&config.store_path)?, before);
        Ok(())
    }

    #[test]
    fn initialize_base_with_missing_primary_does_not_create_store() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let config = test_config(dir.path());

        let Err(err) = initialize_base(&config, |_| {}) else {
            anyhow::bail!("expected missing primary script to fail");
        };
        assert!(matches!(err, DbToolError::ScriptUnreadable { .. }));
        assert!(!config.store_path.exists());
        Ok(())
    }

    #[test]
    fn failed_init_removes_the_store_so_init_can_be_retried() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let config = test_config(dir.path());
        write_migrations(&config, &[("expenseManagerDatabase.sql", "INSERT INTO nope VALUES (1);")])?;

        let Err(err) = initialize_base(&config, |_| {}) else {
            anyhow::bail!("expected failing primary script to be reported");
        };
        assert!(matches!(err, DbToolError::MigrationFailed { .. }));
        assert!(!config.store_path.exists());

        write_migrations(
            &config,
            &[("expenseManagerDatabase.sql", "CREATE TABLE transactions(id INTEGER PRIMARY KEY);")],
        )?;
        assert_eq!(
            initialize_base(&config, |_| {})?,
            InitOutcome::Created { applied: vec!["expenseManagerDatabase.sql".to_string()] }
        );

        let store = SqliteStore::open_existing(&config.store_path)?;
        assert!(table_exists(&store.conn, "transactions")?);
        Ok(())
    }

    #[test]
    fn migrate_never_selects_primary_scripts() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let config = test_config(dir.path());
        write_migrations(
            &config,
            &[
                ("expenseManagerDatabase.sql", "CREATE TABLE base(id INTEGER);"),
                ("001_extra.sql", "CREATE TABLE extra(id INTEGER);"),
            ],
        )?;

        let mut store = SqliteStore::open(&config.store_path)?;
        let applied = store.migrate(&config, |_| {})?;
        assert_eq!(applied, vec!["001_extra.sql".to_string()]);
        assert!(!table_exists(&store.conn, "base")?);
        Ok(())
    }

    #[test]
    fn corrupt_file_is_reported_as_unavailable() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("broken.db");
        fs::write(&path, b"this is definitely not a sqlite database file, just text padding")?;

        let Err(err) = SqliteStore::open(&path) else {
            anyhow::bail!("expected corrupt file to be rejected");
        };
        assert!(matches!(err, DbToolError::StoreUnavailable { .. }));
        Ok(())
    }

    #[test]
    fn open_existing_does_not_create_the_file() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("absent.db");

        let Err(err) = SqliteStore::open_existing(&path) else {
            anyhow::bail!("expected missing store to be rejected");
        };
        assert!(matches!(err, DbToolError::StoreUnavailable { .. }));
        assert!(!path.exists());
        Ok(())
    }
}
