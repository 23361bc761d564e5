//! Roster domain model.
//!
//! # Responsibility
//! - Define the agent record shared by repository, service and CLI layers.
//!
//! # Invariants
//! - Every persisted agent is identified by a stable storage-assigned `AgentId`.
//! - Deletion is a hard delete; there are no tombstones.

pub mod agent;
