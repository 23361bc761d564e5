//! Per-call SQLite session bootstrap.
//!
//! # Responsibility
//! - Open one connection for exactly one repository or initializer call.
//! - Apply session pragmas required by core behavior.
//!
//! # Invariants
//! - Returned sessions have the configured busy timeout applied.
//! - Sessions are released by `Drop`; nothing here pools or caches them.

use super::DbResult;
use crate::config::DatabaseConfig;
use log::{debug, error};
use rusqlite::Connection;
use std::time::Instant;

/// Opens a configured session against the store named by `config`.
///
/// Plain paths and `file:` URIs are both accepted; rusqlite opens with
/// URI support enabled by default.
///
/// # Side effects
/// - Creates the database file when it does not exist yet.
/// - Emits `db_session_open` logging events.
pub fn open_session(config: &DatabaseConfig) -> DbResult<Connection> {
    let started_at = Instant::now();
    let mode = if config.is_uri() { "uri" } else { "file" };

    let conn = match Connection::open(config.connection_string()) {
        Ok(conn) => conn,
        Err(err) => {
            error!(
                "event=db_session_open module=db status=error mode={} duration_ms={} error_code=db_open_failed error={}",
                mode,
                started_at.elapsed().as_millis(),
                err
            );
            return Err(err.into());
        }
    };

    if let Err(err) = conn.busy_timeout(config.busy_timeout()) {
        error!(
            "event=db_session_open module=db status=error mode={} duration_ms={} error_code=db_bootstrap_failed error={}",
            mode,
            started_at.elapsed().as_millis(),
            err
        );
        return Err(err.into());
    }

    debug!(
        "event=db_session_open module=db status=ok mode={} duration_ms={}",
        mode,
        started_at.elapsed().as_millis()
    );
    Ok(conn)
}
