//! Agent repository contract and SQLite implementation.
//!
//! # Responsibility
//! - Provide the only create/read/update/delete/search/aggregate boundary
//!   over the `agents` table.
//! - Keep SQL details and session handling inside core.
//!
//! # Invariants
//! - Every call opens its own session and releases it before returning.
//! - Write paths validate input before any SQL mutation runs.
//! - An absent id is reported as `Ok(None)`, never as an error.
//! - List and search results are ordered by `codename` ascending.

use crate::config::DatabaseConfig;
use crate::db::{open_session, DbError};
use crate::model::agent::{validate_location, Agent, AgentId, AgentValidationError, NewAgent};
use log::{error, info};
use rusqlite::{
    params, Connection, ErrorCode, OptionalExtension, Row, Rows, TransactionBehavior,
};
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Instant;

const AGENT_COLUMNS_SQL: &str = "id, codename, realname, location, status, missionscompleted";

const UNSPECIFIED_OPERATION: &str = "unspecified";

pub type RepoResult<T> = Result<T, RepoError>;

/// Error for agent persistence and query operations.
#[derive(Debug)]
pub enum RepoError {
    /// Input rejected before reaching storage.
    Validation(AgentValidationError),
    /// Store constraint (unique code name, length check) rejected a write.
    ConstraintViolation {
        operation: &'static str,
        message: String,
    },
    /// Any other failure talking to the store.
    Storage {
        operation: &'static str,
        source: DbError,
    },
    /// A stored value cannot be represented in the agent model.
    InvalidData(String),
}

impl RepoError {
    /// Classifies a storage failure, separating constraint violations.
    fn from_db(operation: &'static str, err: DbError) -> Self {
        match err {
            DbError::Sqlite(rusqlite::Error::SqliteFailure(code, message))
                if code.code == ErrorCode::ConstraintViolation =>
            {
                Self::ConstraintViolation {
                    operation,
                    message: message.unwrap_or_else(|| code.to_string()),
                }
            }
            other => Self::Storage {
                operation,
                source: other,
            },
        }
    }

    fn in_operation(self, operation: &'static str) -> Self {
        match self {
            Self::ConstraintViolation { message, .. } => {
                Self::ConstraintViolation { operation, message }
            }
            Self::Storage { source, .. } => Self::Storage { operation, source },
            other => other,
        }
    }

    /// Short stable code used in log events.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation_failed",
            Self::ConstraintViolation { .. } => "constraint_violation",
            Self::Storage { .. } => "storage_error",
            Self::InvalidData(_) => "invalid_data",
        }
    }
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::ConstraintViolation { operation, message } => {
                write!(f, "{operation}: constraint violation: {message}")
            }
            Self::Storage { operation, source } => write!(f, "{operation}: storage error: {source}"),
            Self::InvalidData(message) => write!(f, "invalid persisted agent data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Storage { source, .. } => Some(source),
            Self::ConstraintViolation { .. } | Self::InvalidData(_) => None,
        }
    }
}

impl From<AgentValidationError> for RepoError {
    fn from(value: AgentValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::from_db(UNSPECIFIED_OPERATION, value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::from_db(UNSPECIFIED_OPERATION, DbError::Sqlite(value))
    }
}

/// Repository interface for agent roster operations.
pub trait AgentRepository {
    /// Persists a new agent and returns it with its assigned id.
    fn add_agent(&self, agent: &NewAgent) -> RepoResult<Agent>;
    /// Gets one agent by id.
    fn get_agent(&self, id: AgentId) -> RepoResult<Option<Agent>>;
    /// Returns every agent ordered by code name.
    fn get_all_agents(&self) -> RepoResult<Vec<Agent>>;
    /// Moves an agent; `None` when the id does not exist.
    fn update_agent_location(&self, id: AgentId, location: &str) -> RepoResult<Option<Agent>>;
    /// Removes an agent and returns the removed row; `None` when absent.
    fn delete_agent(&self, id: AgentId) -> RepoResult<Option<Agent>>;
    /// Case-insensitive substring match on code name, ordered by code name.
    fn search_agents_by_code(&self, partial_code: &str) -> RepoResult<Vec<Agent>>;

    fn count_agents_by_status(&self) -> RepoResult<BTreeMap<String, u64>>;
    /// Adds `delta` (any sign) to the mission counter; `None` when absent.
    fn add_mission_count(&self, id: AgentId, delta: i64) -> RepoResult<Option<Agent>>;
}

/// SQLite-backed agent repository.
///
/// Holds configuration only; no connection outlives a single call.
#[derive(Debug, Clone)]
pub struct SqliteAgentRepository {
    config: DatabaseConfig,
}

impl SqliteAgentRepository {
    pub fn new(config: DatabaseConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &DatabaseConfig {
        &self.config
    }

    /// Runs `f` inside a fresh session and logs the outcome.
    ///
    /// The session is dropped before this returns, on success and on error.
    fn with_session<T>(
        &self,
        operation: &'static str,
        target: &str,
        f: impl FnOnce(&mut Connection) -> RepoResult<T>,
    ) -> RepoResult<T> {
        let started_at = Instant::now();
        let result = open_session(&self.config)
            .map_err(|err| RepoError::from_db(operation, err))
            .and_then(|mut conn| f(&mut conn))
            .map_err(|err| err.in_operation(operation));

        if let Err(err) = &result {
            error!(
                "event=agent_repo module=repo status=error op={} {} duration_ms={} error_code={} error={}",
                operation,
                target,
                started_at.elapsed().as_millis(),
                err.code(),
                err
            );
        }
        result
    }
}

impl AgentRepository for SqliteAgentRepository {
    fn add_agent(&self, agent: &NewAgent) -> RepoResult<Agent> {
        agent.validate()?;

        let created = self.with_session("add_agent", "target=new", |conn| {
            conn.execute(
                "INSERT INTO agents (
                    codename,
                    realname,
                    location,
                    status,
                    missionscompleted
                ) VALUES (?1, ?2, ?3, ?4, ?5);",
                params![
                    agent.code_name.as_str(),
                    agent.real_name.as_str(),
                    agent.location.as_str(),
                    agent.status.as_str(),
                    agent.missions_completed,
                ],
            )?;
            Ok(Agent::from_new(conn.last_insert_rowid(), agent.clone()))
        })?;

        info!(
            "event=agent_repo module=repo status=ok op=add_agent id={} code_name={}",
            created.id, created.code_name
        );
        Ok(created)
    }

    fn get_agent(&self, id: AgentId) -> RepoResult<Option<Agent>> {
        self.with_session("get_agent", &format!("id={id}"), |conn| {
            let mut stmt =
                conn.prepare(&format!("SELECT {AGENT_COLUMNS_SQL} FROM agents WHERE id = ?1;"))?;
            let mut rows = stmt.query([id])?;
            next_agent(&mut rows)
        })
    }

    fn get_all_agents(&self) -> RepoResult<Vec<Agent>> {
        self.with_session("get_all_agents", "target=all", |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {AGENT_COLUMNS_SQL} FROM agents ORDER BY codename ASC;"
            ))?;
            let mut rows = stmt.query([])?;
            collect_agents(&mut rows)
        })
    }

    fn update_agent_location(&self, id: AgentId, location: &str) -> RepoResult<Option<Agent>> {
        validate_location(location)?;

        let updated = self.with_session("update_agent_location", &format!("id={id}"), |conn| {
            let mut stmt = conn.prepare(&format!(
                "UPDATE agents SET location = ?2 WHERE id = ?1 RETURNING {AGENT_COLUMNS_SQL};"
            ))?;
            let mut rows = stmt.query(params![id, location])?;
            next_agent(&mut rows)
        })?;

        match &updated {
            Some(agent) => info!(
                "event=agent_repo module=repo status=ok op=update_agent_location id={} code_name={}",
                agent.id, agent.code_name
            ),
            None => log_not_found("update_agent_location", id),
        }
        Ok(updated)
    }

    fn delete_agent(&self, id: AgentId) -> RepoResult<Option<Agent>> {
        let removed = self.with_session("delete_agent", &format!("id={id}"), |conn| {
            let mut stmt = conn.prepare(&format!(
                "DELETE FROM agents WHERE id = ?1 RETURNING {AGENT_COLUMNS_SQL};"
            ))?;
            let mut rows = stmt.query([id])?;
            next_agent(&mut rows)
        })?;

        match &removed {
            Some(agent) => info!(
                "event=agent_repo module=repo status=ok op=delete_agent id={} code_name={}",
                agent.id, agent.code_name
            ),
            None => log_not_found("delete_agent", id),
        }
        Ok(removed)
    }

    fn search_agents_by_code(&self, partial_code: &str) -> RepoResult<Vec<Agent>> {
        self.with_session("search_agents_by_code", "target=all", |conn| {
            // instr() keeps `%` and `_` literal, unlike LIKE.
            let mut stmt = conn.prepare(&format!(
                "SELECT {AGENT_COLUMNS_SQL}
                 FROM agents
                 WHERE instr(lower(codename), lower(?1)) > 0
                 ORDER BY codename ASC;"
            ))?;
            let mut rows = stmt.query([partial_code])?;
            collect_agents(&mut rows)
        })
    }

    fn count_agents_by_status(&self) -> RepoResult<BTreeMap<String, u64>> {
        self.with_session("count_agents_by_status", "target=all", |conn| {
            let mut stmt =
                conn.prepare("SELECT status, COUNT(*) FROM agents GROUP BY status;")?;
            let mut rows = stmt.query([])?;
            let mut counts = BTreeMap::new();
            while let Some(row) = rows.next()? {
                let status: String = row.get(0)?;
                let count: i64 = row.get(1)?;
                let count = u64::try_from(count).map_err(|_| {
                    RepoError::InvalidData(format!("negative count {count} for status `{status}`"))
                })?;
                counts.insert(status, count);
            }
            Ok(counts)
        })
    }

    fn add_mission_count(&self, id: AgentId, delta: i64) -> RepoResult<Option<Agent>> {
        let updated = self.with_session("add_mission_count", &format!("id={id}"), |conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            let current: Option<i64> = tx
                .query_row(
                    "SELECT missionscompleted FROM agents WHERE id = ?1;",
                    [id],
                    |row| row.get(0),
                )
                .optional()?;
            let Some(current) = current else {
                return Ok(None);
            };

            let total = current
                .checked_add(delta)
                .ok_or(AgentValidationError::MissionCountOverflow { current, delta })?;

            let agent = {
                let mut stmt = tx.prepare(&format!(
                    "UPDATE agents SET missionscompleted = ?2 WHERE id = ?1 RETURNING {AGENT_COLUMNS_SQL};"
                ))?;
                let mut rows = stmt.query(params![id, total])?;
                next_agent(&mut rows)?
            };
            let Some(agent) = agent else {
                return Err(RepoError::InvalidData(format!(
                    "agent {id} vanished inside its own transaction"
                )));
            };
            tx.commit()?;
            Ok(Some(agent))
        })?;

        match &updated {
            Some(agent) => info!(
                "event=agent_repo module=repo status=ok op=add_mission_count id={} code_name={} delta={} missions_completed={}",
                agent.id, agent.code_name, delta, agent.missions_completed
            ),
            None => log_not_found("add_mission_count", id),
        }
        Ok(updated)
    }
}

fn log_not_found(operation: &str, id: AgentId) {
    info!("event=agent_repo module=repo status=not_found op={operation} id={id}");
}

fn next_agent(rows: &mut Rows<'_>) -> RepoResult<Option<Agent>> {
    if let Some(row) = rows.next()? {
        return Ok(Some(parse_agent_row(row)?));
    }
    Ok(None)
}

fn collect_agents(rows: &mut Rows<'_>) -> RepoResult<Vec<Agent>> {
    let mut agents = Vec::new();
    while let Some(row) = rows.next()? {
        agents.push(parse_agent_row(row)?);
    }
    Ok(agents)
}

/// Maps a stored row as-is; empty strings are valid "absent" values.
fn parse_agent_row(row: &Row<'_>) -> RepoResult<Agent> {
    Ok(Agent {
        id: row.get("id")?,
        code_name: row.get("codename")?,
        real_name: row.get("realname")?,
        location: row.get("location")?,
        status: row.get("status")?,
        missions_completed: row.get("missionscompleted")?,
    })
}
