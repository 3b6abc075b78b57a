//! Read-only textual exports of the store.
//!
//! Every generator renders the whole artifact in memory and then replaces the
//! output file in one write. Output depends only on persisted content, so two
//! runs against an unchanged store are byte-identical.

use std::fs;
use std::path::Path;

use dbtool_core::{format_table, CellValue, DbToolError, Result, EMPTY_TABLE_MARKER, TRACKING_TABLE};
use rusqlite::types::ValueRef;
use rusqlite::Connection;

use crate::{query_error, SqliteStore};

const SCHEMA_HEADER: &str = "-- Schema snapshot";
const TABLE_DUMP_HEADER: &str = "Database dump";

impl SqliteStore {
    /// Every table, index and trigger definition ordered by `(type, name)`.
    ///
    /// # Errors
    /// Returns an error when the catalog cannot be read.
    pub fn schema_snapshot(&self) -> Result<String> {
        let statements = query_strings(
            &self.conn,
            r"SELECT sql FROM sqlite_master
              WHERE sql NOT NULL
                AND type IN ('table', 'index', 'trigger')
                AND name NOT LIKE 'sqlite\_%' ESCAPE '\'
              ORDER BY type, name",
        )?;

        let mut out = format!("{SCHEMA_HEADER}\n\n");
        for sql in statements {
            out.push_str(&sql);
            out.push_str(";\n\n");
        }
        Ok(out)
    }

    /// Statements that rebuild structure and data, in `SQLite`'s dump order:
    /// tables with their rows by name, then indexes, triggers and views, then
    /// the `sqlite_sequence` counters, all inside one transaction.
    ///
    /// # Errors
    /// Returns an error when the catalog or any table cannot be read.
    pub fn sql_dump(&self) -> Result<String> {
        let mut lines = vec!["BEGIN TRANSACTION;".to_string()];
        let mut sequence_lines = Vec::new();
        let mut writable_schema = false;

        let tables = query_pairs(
            &self.conn,
            "SELECT name, sql FROM sqlite_master
             WHERE sql NOT NULL AND type == 'table'
             ORDER BY name",
        )?;

        for (table, sql) in tables {
            match table.as_str() {
                "sqlite_sequence" => {
                    sequence_lines.push(r#"DELETE FROM "sqlite_sequence";"#.to_string());
                    for (name, seq) in query_pairs(
                        &self.conn,
                        "SELECT quote(name), CAST(seq AS TEXT) FROM sqlite_sequence",
                    )? {
                        sequence_lines
                            .push(format!(r#"INSERT INTO "sqlite_sequence" VALUES({name},{seq});"#));
                    }
                    continue;
                }
                "sqlite_stat1" => lines.push(r#"ANALYZE "sqlite_master";"#.to_string()),
                internal if internal.starts_with("sqlite_") => continue,
                // Virtual tables go straight into the catalog; their shadow
                // tables are dumped as ordinary tables.
                _ if sql.starts_with("CREATE VIRTUAL TABLE") => {
                    if !writable_schema {
                        writable_schema = true;
                        lines.push("PRAGMA writable_schema=ON;".to_string());
                    }
                    lines.push(format!(
                        "INSERT INTO sqlite_master(type,name,tbl_name,rootpage,sql)\
                         VALUES('table',{name},{name},0,{sql});",
                        name = quote_literal(&table),
                        sql = quote_literal(&sql),
                    ));
                }
                _ => lines.push(format!("{sql};")),
            }

            lines.extend(insert_statements(&self.conn, &table)?);
        }

        lines.extend(
            query_strings(
                &self.conn,
                "SELECT sql FROM sqlite_master
                 WHERE sql NOT NULL AND type IN ('index', 'trigger', 'view')",
            )?
            .into_iter()
            .map(|sql| format!("{sql};")),
        );
        if writable_schema {
            lines.push("PRAGMA writable_schema=OFF;".to_string());
        }
        lines.extend(sequence_lines);
        lines.push("COMMIT;".to_string());

        let mut out = lines.join("\n");
        out.push('\n');
        Ok(out)
    }

    /// Aligned text rendering of every user table except the tracking table.
    ///
    /// # Errors
    /// Returns an error when the catalog or any table cannot be read.
    pub fn table_dump(&self) -> Result<String> {
        let tables = query_strings(
            &self.conn,
            r"SELECT name FROM sqlite_master
              WHERE type = 'table'
                AND name NOT LIKE 'sqlite\_%' ESCAPE '\'
              ORDER BY name",
        )?;

        let mut out = format!("{TABLE_DUMP_HEADER}\n\n");
        for table in tables.into_iter().filter(|table| table != TRACKING_TABLE) {
            out.push_str(&format!("\n========== {} ==========\n", table.to_uppercase()));

            let (headers, rows) = read_table(&self.conn, &table)?;
            if rows.is_empty() {
                out.push_str(EMPTY_TABLE_MARKER);
            } else {
                out.push_str(&format_table(&headers, &rows));
            }
            out.push('\n');
        }
        Ok(out)
    }

    /// # Errors
    /// Returns [`DbToolError::SnapshotWrite`] when the output cannot be written.
    pub fn write_schema_snapshot(&self, out_file: &Path) -> Result<()> {
        write_artifact(out_file, &self.schema_snapshot()?)
    }

    /// # Errors
    /// Returns [`DbToolError::SnapshotWrite`] when the output cannot be written.
    pub fn write_sql_dump(&self, out_file: &Path) -> Result<()> {
        write_artifact(out_file, &self.sql_dump()?)
    }

    /// # Errors
    /// Returns [`DbToolError::SnapshotWrite`] when the output cannot be written.
    pub fn write_table_dump(&self, out_file: &Path) -> Result<()> {
        write_artifact(out_file, &self.table_dump()?)
    }
}

fn write_artifact(out_file: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = out_file.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .map_err(|source| DbToolError::SnapshotWrite { path: out_file.to_path_buf(), source })?;
    }
    fs::write(out_file, contents)
        .map_err(|source| DbToolError::SnapshotWrite { path: out_file.to_path_buf(), source })?;
    tracing::debug!(path = %out_file.display(), bytes = contents.len(), "snapshot written");
    Ok(())
}

fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

fn insert_statements(conn: &Connection, table: &str) -> Result<Vec<String>> {
    let ident = quote_ident(table);
    let columns = table_columns(conn, table)?;
    if columns.is_empty() {
        return Ok(Vec::new());
    }

    let values = columns
        .iter()
        .map(|column| format!("quote({})", quote_ident(column)))
        .collect::<Vec<_>>()
        .join(" || ',' || ");
    let rows = query_strings(conn, &format!("SELECT {values} FROM {ident}"))?;

    Ok(rows.into_iter().map(|row| format!("INSERT INTO {ident} VALUES({row});")).collect())
}

fn table_columns(conn: &Connection, table: &str) -> Result<Vec<String>> {
    let mut stmt = conn
        .prepare(&format!("PRAGMA table_info({})", quote_ident(table)))
        .map_err(|err| query_error(&format!("failed to inspect table_info for {table}"), &err))?;
    let columns = stmt
        .query_map([], |row| row.get::<_, String>(1))
        .map_err(|err| query_error(&format!("failed to inspect table_info for {table}"), &err))?
        .collect::<rusqlite::Result<Vec<_>>>()
        .map_err(|err| query_error(&format!("failed to read columns of {table}"), &err))?;
    Ok(columns)
}

fn read_table(conn: &Connection, table: &str) -> Result<(Vec<String>, Vec<Vec<CellValue>>)> {
    let mut stmt = conn
        .prepare(&format!("SELECT * FROM {}", quote_ident(table)))
        .map_err(|err| query_error(&format!("failed to read table {table}"), &err))?;
    let headers = stmt.column_names().into_iter().map(str::to_string).collect::<Vec<_>>();
    let width = headers.len();

    let mut rows = stmt
        .query([])
        .map_err(|err| query_error(&format!("failed to read table {table}"), &err))?;
    let mut out = Vec::new();
    while let Some(row) =
        rows.next().map_err(|err| query_error(&format!("failed to read table {table}"), &err))?
    {
        let mut cells = Vec::with_capacity(width);
        for index in 0..width {
            let value = row
                .get_ref(index)
                .map_err(|err| query_error(&format!("failed to read table {table}"), &err))?;
            cells.push(cell_value(value));
        }
        out.push(cells);
    }
    Ok((headers, out))
}

fn cell_value(value: ValueRef<'_>) -> CellValue {
    match value {
        ValueRef::Null => CellValue::Null,
        ValueRef::Integer(value) => CellValue::Integer(value),
        ValueRef::Real(value) => CellValue::Real(value),
        ValueRef::Text(bytes) => CellValue::Text(String::from_utf8_lossy(bytes).into_owned()),
        ValueRef::Blob(bytes) => CellValue::Blob(bytes.to_vec()),
    }
}

fn query_strings(conn: &Connection, sql: &str) -> Result<Vec<String>> {
    let mut stmt = conn.prepare(sql).map_err(|err| query_error("failed to prepare query", &err))?;
    let values = stmt
        .query_map([], |row| row.get::<_, String>(0))
        .map_err(|err| query_error("failed to run query", &err))?
        .collect::<rusqlite::Result<Vec<_>>>()
        .map_err(|err| query_error("failed to read query row", &err))?;
    Ok(values)
}

fn query_pairs(conn: &Connection, sql: &str) -> Result<Vec<(String, String)>> {
    let mut stmt = conn.prepare(sql).map_err(|err| query_error("failed to prepare query", &err))?;
    let values = stmt
        .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))
        .map_err(|err| query_error("failed to run query", &err))?
        .collect::<rusqlite::Result<Vec<_>>>()
        .map_err(|err| query_error("failed to read query row", &err))?;
    Ok(values)
}
