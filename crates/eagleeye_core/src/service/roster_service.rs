//! Roster use-case service.
//!
//! # Responsibility
//! - Provide stable roster entry points for CLI callers.
//! - Delegate persistence to any `AgentRepository` implementation.
//!
//! # Invariants
//! - Service APIs never bypass repository validation/persistence contracts.
//! - Service layer remains storage-agnostic.

use crate::model::agent::{Agent, AgentId, NewAgent};
use crate::repo::agent_repo::{AgentRepository, RepoResult};
use std::collections::BTreeMap;

/// Aggregated status counts plus their total.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatusReport {
    /// Agents per exact status string, sorted by status.
    pub counts: BTreeMap<String, u64>,
    /// Sum of all counts; equals the roster size.
    pub total: u64,
}

/// Use-case service wrapper for roster operations.
pub struct RosterService<R: AgentRepository> {
    repo: R,
}

impl<R: AgentRepository> RosterService<R> {
    /// Creates a service using the provided repository implementation.
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Borrows the underlying repository.
    pub fn repository(&self) -> &R {
        &self.repo
    }

    /// Adds a fully populated agent.
    pub fn add_agent(&self, agent: &NewAgent) -> RepoResult<Agent> {
        self.repo.add_agent(agent)
    }

    /// Enlists a new agent with zero completed missions.
    pub fn enlist(
        &self,
        code_name: impl Into<String>,
        real_name: impl Into<String>,
        location: impl Into<String>,
        status: impl Into<String>,
    ) -> RepoResult<Agent> {
        let agent = NewAgent::new(code_name, real_name, location, status);
        self.repo.add_agent(&agent)
    }

    pub fn get_agent(&self, id: AgentId) -> RepoResult<Option<Agent>> {
        self.repo.get_agent(id)
    }

    pub fn list_agents(&self) -> RepoResult<Vec<Agent>> {
        self.repo.get_all_agents()
    }

    /// Returns `None` when `id` does not exist.
    pub fn relocate(&self, id: AgentId, location: &str) -> RepoResult<Option<Agent>> {
        self.repo.update_agent_location(id, location)
    }

    /// Returns `None` when `id` does not exist.
    pub fn remove(&self, id: AgentId) -> RepoResult<Option<Agent>> {
        self.repo.delete_agent(id)
    }

    pub fn search(&self, partial_code: &str) -> RepoResult<Vec<Agent>> {
        self.repo.search_agents_by_code(partial_code)
    }

    /// Returns `None` when `id` does not exist.
    pub fn add_missions(&self, id: AgentId, delta: i64) -> RepoResult<Option<Agent>> {
        self.repo.add_mission_count(id, delta)
    }

    /// Counts agents per status and totals them.
    pub fn status_report(&self) -> RepoResult<StatusReport> {
        let counts = self.repo.count_agents_by_status()?;
        let total = counts.values().sum();
        Ok(StatusReport { counts, total })
    }
}
