//! Core persistence layer for the EagleEye field-agent roster.
//! This crate is the single source of truth for roster invariants.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use config::{load_dotenv, ConfigError, ConfigResult, DatabaseConfig};
pub use db::{DbError, DbResult, ReadyStatus, SchemaInitializer};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::agent::{Agent, AgentId, AgentStatus, AgentValidationError, NewAgent};
pub use repo::agent_repo::{AgentRepository, RepoError, RepoResult, SqliteAgentRepository};
pub use service::roster_service::{RosterService, StatusReport};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
