//! Startup schema initializer.
//!
//! # Responsibility
//! - Ensure the `agents` table and its unique code-name index exist.
//! - Verify the resulting structure and probe connectivity.
//!
//! # Invariants
//! - Default initialization is idempotent and never destructive.
//! - Dropping existing data only happens when `reset_on_start` is enabled.
//! - Setup and verification share one transaction; a failed check leaves
//!   the store as it was.
//! - Failures are returned to the caller, never swallowed or retried.

use super::migrations::{apply_migrations, current_user_version};
use super::session::open_session;
use super::{DbError, DbResult};
use crate::config::DatabaseConfig;
use log::{error, info, warn};
use rusqlite::{Connection, TransactionBehavior};
use std::time::Instant;

const AGENTS_TABLE: &str = "agents";
const CODE_NAME_COLUMN: &str = "codename";
const AGENT_COLUMNS: [&str; 6] = [
    "id",
    "codename",
    "realname",
    "location",
    "status",
    "missionscompleted",
];

/// Outcome of a successful [`SchemaInitializer::ensure_ready`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadyStatus {
    /// The `agents` table did not exist before this call.
    pub created: bool,
    /// Existing data was dropped because reset-on-start is enabled.
    pub reset: bool,
    /// Result of the `SELECT 1` probe after setup.
    pub can_connect: bool,
    /// Migrations that advanced the schema version during this call.
    pub migrations_applied: u32,
    /// Schema version recorded after setup.
    pub schema_version: u32,
}

/// Prepares the store for repository use.
#[derive(Debug, Clone)]
pub struct SchemaInitializer {
    config: DatabaseConfig,
}

impl SchemaInitializer {
    pub fn new(config: DatabaseConfig) -> Self {
        Self { config }
    }

    /// Creates the schema if absent and verifies it.
    ///
    /// # Side effects
    /// - With `reset_on_start`, drops the `agents` table first.
    /// - Emits `db_init` logging events with duration and status.
    pub fn ensure_ready(&self) -> DbResult<ReadyStatus> {
        let started_at = Instant::now();
        info!(
            "event=db_init module=db status=start reset_on_start={}",
            self.config.reset_on_start()
        );

        match self.run() {
            Ok(status) => {
                info!(
                    "event=db_init module=db status=ok created={} reset={} can_connect={} migrations_applied={} schema_version={} duration_ms={}",
                    status.created,
                    status.reset,
                    status.can_connect,
                    status.migrations_applied,
                    status.schema_version,
                    started_at.elapsed().as_millis()
                );
                Ok(status)
            }
            Err(err) => {
                error!(
                    "event=db_init module=db status=error duration_ms={} error={}",
                    started_at.elapsed().as_millis(),
                    err
                );
                Err(err)
            }
        }
    }

    fn run(&self) -> DbResult<ReadyStatus> {
        let mut conn = open_session(&self.config)?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let reset = self.config.reset_on_start();
        if reset {
            warn!("event=db_reset module=db status=start table={AGENTS_TABLE}");
            drop_agents_table(&tx)?;
        }

        let existed = table_exists(&tx, AGENTS_TABLE)?;
        let migrations_applied = apply_migrations(&tx)?;
        ensure_agents_schema(&tx)?;
        let schema_version = current_user_version(&tx)?;
        tx.commit()?;

        Ok(ReadyStatus {
            created: !existed,
            reset,
            can_connect: probe(&conn),
            migrations_applied,
            schema_version,
        })
    }
}

fn drop_agents_table(conn: &Connection) -> DbResult<()> {
    conn.execute_batch(
        "DROP INDEX IF EXISTS ix_agents_codename;
         DROP TABLE IF EXISTS agents;
         PRAGMA user_version = 0;",
    )?;
    Ok(())
}

fn probe(conn: &Connection) -> bool {
    conn.query_row("SELECT 1;", [], |row| row.get::<_, i64>(0))
        .map(|value| value == 1)
        .unwrap_or(false)
}

/// Verifies that `agents` exists with every column the repository reads
/// and that code names are unique at the store level.
fn ensure_agents_schema(conn: &Connection) -> DbResult<()> {
    if !table_exists(conn, AGENTS_TABLE)? {
        return Err(DbError::MissingRequiredTable(AGENTS_TABLE));
    }

    for column in AGENT_COLUMNS {
        if !table_has_column(conn, AGENTS_TABLE, column)? {
            return Err(DbError::MissingRequiredColumn {
                table: AGENTS_TABLE,
                column,
            });
        }
    }

    if !has_unique_index_on(conn, AGENTS_TABLE, CODE_NAME_COLUMN)? {
        return Err(DbError::MissingUniqueIndex {
            table: AGENTS_TABLE,
            column: CODE_NAME_COLUMN,
        });
    }

    Ok(())
}

fn table_exists(conn: &Connection, table: &str) -> DbResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = ?1
        );",
        [table],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

fn table_has_column(conn: &Connection, table: &str, column: &str) -> DbResult<bool> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table});"))?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let current: String = row.get(1)?;
        if current == column {
            return Ok(true);
        }
    }
    Ok(false)
}

/// True when a full (non-partial) unique index covers exactly `column`.
fn has_unique_index_on(conn: &Connection, table: &str, column: &str) -> DbResult<bool> {
    let mut unique_indexes = Vec::new();
    let mut stmt = conn.prepare(&format!("PRAGMA index_list({table});"))?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let unique: bool = row.get("unique")?;
        let partial: bool = row.get("partial")?;
        if unique && !partial {
            unique_indexes.push(row.get::<_, String>("name")?);
        }
    }

    for index in unique_indexes {
        let mut stmt = conn.prepare("SELECT name FROM pragma_index_info(?1);")?;
        let columns = stmt
            .query_map([index.as_str()], |row| row.get::<_, Option<String>>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        if matches!(columns.as_slice(), [Some(name)] if name == column) {
            return Ok(true);
        }
    }
    Ok(false)
}
