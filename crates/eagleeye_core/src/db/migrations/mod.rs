//! SQLite migration registry and executor.
//!
//! # Responsibility
//! - Register schema migrations in strictly increasing order.
//! - Replay idempotent migration SQL and advance `PRAGMA user_version`.
//!
//! # Invariants
//! - `version` values must remain monotonic.
//! - Applied migration version is mirrored to `PRAGMA user_version`.
//! - Migration SQL is create-if-absent only; it never drops data.

use crate::db::{DbError, DbResult};
use rusqlite::Connection;

#[derive(Debug, Clone, Copy)]
struct Migration {
    version: u32,
    sql: &'static str,
}

const MIGRATIONS: &[Migration] = &[Migration {
    version: 1,
    sql: include_str!("0001_agents.sql"),
}];

/// Returns the latest migration version known by this binary.
pub fn latest_version() -> u32 {
    MIGRATIONS.last().map_or(0, |migration| migration.version)
}

/// Replays every migration on `conn` and records the latest version.
///
/// Migration SQL is create-if-absent only, so already-applied steps are
/// replayed too; that restores objects dropped while `user_version` stayed
/// current. The caller owns the surrounding transaction.
///
/// Returns how many migrations advanced `user_version` (0 when current).
pub fn apply_migrations(conn: &Connection) -> DbResult<u32> {
    let current_version = current_user_version(conn)?;
    let latest = latest_version();

    if current_version > latest {
        return Err(DbError::UnsupportedSchemaVersion {
            db_version: current_version,
            latest_supported: latest,
        });
    }

    let mut applied = 0;
    for migration in MIGRATIONS {
        conn.execute_batch(migration.sql)?;
        if migration.version > current_version {
            conn.execute_batch(&format!("PRAGMA user_version = {};", migration.version))?;
            applied += 1;
        }
    }

    Ok(applied)
}

/// Reads the schema version recorded in `PRAGMA user_version`.
pub fn current_user_version(conn: &Connection) -> DbResult<u32> {
    let version = conn.query_row("PRAGMA user_version;", [], |row| row.get::<_, u32>(0))?;
    Ok(version)
}
