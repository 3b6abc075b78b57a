use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{ArgAction, Args, CommandFactory, Parser};
use dbtool_core::{discover_candidates, DbToolConfig, MigrationCandidate, MigrationFile};
use dbtool_store_sqlite::{initialize_base, InitOutcome, SqliteStore};
use serde_json::Value;
use time::format_description::well_known::Rfc3339;
use tracing_subscriber::EnvFilter;

const CLI_CONTRACT_VERSION: &str = "dbtool.v1";

#[derive(Debug, Parser)]
#[command(name = "dbtool")]
#[command(about = "SQLite database lifecycle tool: init, migrate, and snapshot")]
#[command(
    after_help = "Steps run in a fixed order: init, migrate, schema, dump, tabledata, status."
)]
#[allow(clippy::struct_excessive_bools)]
struct Cli {
    /// Create the store and apply the primary schema; skipped if the store exists
    #[arg(short = 'i', long)]
    init: bool,
    /// Apply all pending non-primary migrations
    #[arg(short = 'm', long)]
    migrate: bool,
    /// Write the structural schema snapshot
    #[arg(short = 's', long)]
    schema: bool,
    /// Write the full SQL dump
    #[arg(short = 'd', long)]
    dump: bool,
    /// Write the readable table dump
    #[arg(short = 't', long)]
    tabledata: bool,
    /// Run migrate, schema, dump and tabledata
    #[arg(short = 'a', long)]
    all: bool,
    /// Print applied and pending migration versions as JSON
    #[arg(long)]
    status: bool,
    /// With --migrate/--all: list pending migrations without applying them
    #[arg(long)]
    dry_run: bool,
    /// Increase log verbosity on stderr (-v info, -vv debug); RUST_LOG overrides
    #[arg(short = 'v', long, action = ArgAction::Count)]
    verbose: u8,
    #[command(flatten)]
    paths: PathArgs,
}

#[derive(Debug, Args)]
struct PathArgs {
    /// JSON file with any of: store_path, migrations_dir, primary_scripts,
    /// schema_out, dump_out, table_out
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long, env = "DBTOOL_DB")]
    db: Option<PathBuf>,
    #[arg(long)]
    migrations_dir: Option<PathBuf>,
    /// Primary schema script name; repeat for several, applied in order
    #[arg(long = "primary")]
    primary: Vec<String>,
    #[arg(long)]
    schema_out: Option<PathBuf>,
    #[arg(long)]
    dump_out: Option<PathBuf>,
    #[arg(long)]
    table_out: Option<PathBuf>,
}

impl Cli {
    fn has_action(&self) -> bool {
        self.init
            || self.migrate
            || self.schema
            || self.dump
            || self.tabledata
            || self.all
            || self.status
    }
}

/// Lazily opened store shared by every step after `init`.
struct Session<'a> {
    config: &'a DbToolConfig,
    store: Option<SqliteStore>,
}

impl<'a> Session<'a> {
    fn new(config: &'a DbToolConfig) -> Self {
        Self { config, store: None }
    }

    fn writable(&mut self) -> Result<&mut SqliteStore> {
        let store = match self.store.take() {
            Some(store) => store,
            None => {
                if !self.config.store_path.exists() {
                    tracing::warn!(
                        path = %self.config.store_path.display(),
                        "store does not exist; creating it without the primary schema (run --init first)"
                    );
                }
                SqliteStore::open(&self.config.store_path)?
            }
        };
        Ok(self.store.insert(store))
    }

    fn readable(&mut self) -> Result<&SqliteStore> {
        let store = match self.store.take() {
            Some(store) => store,
            None => SqliteStore::open_existing(&self.config.store_path)?,
        };
        Ok(self.store.insert(store))
    }

    fn existing(&mut self) -> Result<Option<&SqliteStore>> {
        if self.store.is_none() && self.config.store_path.exists() {
            self.store = Some(SqliteStore::open_existing(&self.config.store_path)?);
        }
        Ok(self.store.as_ref())
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn run(cli: &Cli) -> Result<()> {
    if !cli.has_action() {
        Cli::command().print_help().context("failed to print help")?;
        println!();
        return Ok(());
    }

    let config = resolve_config(&cli.paths)?;
    tracing::debug!(?config, "resolved configuration");

    if cli.init {
        run_init(&config)?;
    }

    let mut session = Session::new(&config);

    if cli.migrate || cli.all {
        if cli.dry_run {
            run_migrate_dry_run(&mut session)?;
        } else {
            run_migrate(&mut session)?;
        }
    }

    if cli.schema || cli.all {
        println!("Generating schema snapshot...");
        session.readable()?.write_schema_snapshot(&config.schema_out)?;
        println!("Schema written -> {}", config.schema_out.display());
    }

    if cli.dump || cli.all {
        println!("Generating SQL dump...");
        session.readable()?.write_sql_dump(&config.dump_out)?;
        println!("Dump written -> {}", config.dump_out.display());
    }

    if cli.tabledata || cli.all {
        println!("Generating readable data dump...");
        session.readable()?.write_table_dump(&config.table_out)?;
        println!("Readable dump written -> {}", config.table_out.display());
    }

    if cli.status {
        run_status(&mut session)?;
    }

    Ok(())
}

fn resolve_config(args: &PathArgs) -> Result<DbToolConfig> {
    let mut config = match &args.config {
        Some(path) => DbToolConfig::from_json_file(path)?,
        None => DbToolConfig::default(),
    };

    if let Some(db) = &args.db {
        config.store_path.clone_from(db);
    }
    if let Some(dir) = &args.migrations_dir {
        config.migrations_dir.clone_from(dir);
    }
    if !args.primary.is_empty() {
        config.primary_scripts.clone_from(&args.primary);
    }
    if let Some(path) = &args.schema_out {
        config.schema_out.clone_from(path);
    }
    if let Some(path) = &args.dump_out {
        config.dump_out.clone_from(path);
    }
    if let Some(path) = &args.table_out {
        config.table_out.clone_from(path);
    }
    Ok(config)
}

fn announce(file: &MigrationFile) {
    println!("Applying {}", file.name);
}

fn run_init(config: &DbToolConfig) -> Result<()> {
    match initialize_base(config, announce)? {
        InitOutcome::Skipped => println!("Database already exists. Skipping init."),
        InitOutcome::Created { applied } => {
            println!(
                "Database created at {} ({} primary script(s) applied).",
                config.store_path.display(),
                applied.len()
            );
        }
    }
    Ok(())
}

fn run_migrate(session: &mut Session<'_>) -> Result<()> {
    let config = session.config;
    let applied = session.writable()?.migrate(config, announce)?;
    println!("Migrations complete. ({} applied)", applied.len());
    Ok(())
}

fn run_migrate_dry_run(session: &mut Session<'_>) -> Result<()> {
    let pending = pending_migrations(session)?;
    for file in &pending {
        println!("Would apply {}", file.name);
    }
    println!("Dry run: {} pending migration(s), nothing applied.", pending.len());
    Ok(())
}

fn pending_migrations(session: &mut Session<'_>) -> Result<Vec<MigrationCandidate>> {
    let config = session.config;
    let pending = match session.existing()? {
        Some(store) => store.pending_candidates(config)?,
        None => discover_candidates(&config.migrations_dir, &config.primary_scripts)?,
    };
    Ok(pending)
}

fn run_status(session: &mut Session<'_>) -> Result<()> {
    let config = session.config;
    let pending = pending_migrations(session)?;

    let mut applied = Vec::new();
    if let Some(store) = session.existing()? {
        for record in store.applied_records()? {
            let applied_at = record
                .applied_at
                .map(|at| at.assume_utc().format(&Rfc3339))
                .transpose()
                .context("failed to format applied_at timestamp")?;
            applied.push(serde_json::json!({
                "version": record.version,
                "applied_at": applied_at,
            }));
        }
    }

    emit_json(serde_json::json!({
        "store_path": config.store_path.display().to_string(),
        "store_exists": config.store_path.exists(),
        "applied": applied,
        "pending_versions": pending.iter().map(|file| file.name.as_str()).collect::<Vec<_>>(),
        "up_to_date": pending.is_empty(),
    }))
}

fn with_contract_version(value: Value) -> Value {
    match value {
        Value::Object(mut object) => {
            object.insert(
                "contract_version".to_string(),
                Value::String(CLI_CONTRACT_VERSION.to_string()),
            );
            Value::Object(object)
        }
        other => serde_json::json!({
            "contract_version": CLI_CONTRACT_VERSION,
            "payload": other
        }),
    }
}

fn emit_json(value: Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(&with_contract_version(value))?);
    Ok(())
}
