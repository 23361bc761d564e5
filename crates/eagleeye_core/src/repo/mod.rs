//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define the agent data access contract.
//! - Isolate SQLite query details from service and CLI orchestration.
//!
//! # Invariants
//! - Repository writes must enforce agent validation before persistence.
//! - "Not found" is a normal `Ok(None)` result, distinct from storage errors.

pub mod agent_repo;
