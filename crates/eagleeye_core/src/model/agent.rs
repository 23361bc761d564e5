//! Agent domain model.
//!
//! # Responsibility
//! - Define the single roster record managed by core.
//! - Validate field lengths before any write reaches storage.
//!
//! # Invariants
//! - `id` is assigned by storage exactly once and never reassigned.
//! - String fields are never null; an empty string means "absent".
//! - `status` is free text; `AgentStatus` is advisory only.

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Storage-assigned identity for an agent row.
pub type AgentId = i64;

pub const CODE_NAME_MAX_CHARS: usize = 50;
pub const REAL_NAME_MAX_CHARS: usize = 100;
pub const LOCATION_MAX_CHARS: usize = 100;
pub const STATUS_MAX_CHARS: usize = 20;

/// Well-known agent status values.
///
/// Storage accepts any string up to 20 chars; this enum only covers the
/// spellings the roster expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AgentStatus {
    Active,
    Injured,
    Missing,
    Retired,
}

impl AgentStatus {
    pub const ALL: [AgentStatus; 4] = [
        AgentStatus::Active,
        AgentStatus::Injured,
        AgentStatus::Missing,
        AgentStatus::Retired,
    ];

    /// Canonical spelling as stored in `agents.status`.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Active => "Active",
            Self::Injured => "Injured",
            Self::Missing => "Missing",
            Self::Retired => "Retired",
        }
    }

    /// Parses a status name, ignoring case and surrounding whitespace.
    pub fn parse(value: &str) -> Option<Self> {
        let trimmed = value.trim();
        Self::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(trimmed))
    }
}

impl Display for AgentStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Field-level validation failure for agent writes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AgentValidationError {
    EmptyCodeName,
    TooLong {
        field: &'static str,
        max: usize,
        actual: usize,
    },
    MissionCountOverflow {
        current: i64,
        delta: i64,
    },
}

impl Display for AgentValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyCodeName => write!(f, "code name must not be empty"),
            Self::TooLong { field, max, actual } => write!(
                f,
                "{field} is {actual} characters long; at most {max} allowed"
            ),
            Self::MissionCountOverflow { current, delta } => write!(
                f,
                "adding {delta} missions to {current} overflows the mission counter"
            ),
        }
    }
}

impl Error for AgentValidationError {}

/// Agent fields supplied by the caller before storage assigns an id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewAgent {
    pub code_name: String,
    pub real_name: String,
    pub location: String,
    pub status: String,
    #[serde(default)]
    pub missions_completed: i64,
}

impl NewAgent {
    /// Creates a new agent record with zero completed missions.
    pub fn new(
        code_name: impl Into<String>,
        real_name: impl Into<String>,
        location: impl Into<String>,
        status: impl Into<String>,
    ) -> Self {
        Self {
            code_name: code_name.into(),
            real_name: real_name.into(),
            location: location.into(),
            status: status.into(),
            missions_completed: 0,
        }
    }

    /// Checks required identity and per-column length limits.
    ///
    /// Lengths are counted in chars to match SQLite `length()` on text.
    pub fn validate(&self) -> Result<(), AgentValidationError> {
        validate_fields(
            &self.code_name,
            &self.real_name,
            &self.location,
            &self.status,
        )
    }
}

/// Persisted agent row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Agent {
    pub id: AgentId,
    pub code_name: String,
    pub real_name: String,
    pub location: String,
    pub status: String,
    pub missions_completed: i64,
}

impl Agent {
    /// Attaches a storage-assigned id to caller-supplied fields.
    pub fn from_new(id: AgentId, agent: NewAgent) -> Self {
        Self {
            id,
            code_name: agent.code_name,
            real_name: agent.real_name,
            location: agent.location,
            status: agent.status,
            missions_completed: agent.missions_completed,
        }
    }

    /// Same checks as [`NewAgent::validate`], applied to a stored row.
    pub fn validate(&self) -> Result<(), AgentValidationError> {
        validate_fields(
            &self.code_name,
            &self.real_name,
            &self.location,
            &self.status,
        )
    }

    /// Returns the status as a known variant, if it is one.
    pub fn known_status(&self) -> Option<AgentStatus> {
        AgentStatus::parse(&self.status)
    }
}

impl Display for Agent {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Agent [{}] - {} | Location: {} | Status: {} | Missions: {}",
            self.code_name, self.real_name, self.location, self.status, self.missions_completed
        )
    }
}

/// Checks a single location value against the column limit.
pub fn validate_location(location: &str) -> Result<(), AgentValidationError> {
    check_len("location", location, LOCATION_MAX_CHARS)
}

fn validate_fields(
    code_name: &str,
    real_name: &str,
    location: &str,
    status: &str,
) -> Result<(), AgentValidationError> {
    if code_name.trim().is_empty() {
        return Err(AgentValidationError::EmptyCodeName);
    }
    check_len("code_name", code_name, CODE_NAME_MAX_CHARS)?;
    check_len("real_name", real_name, REAL_NAME_MAX_CHARS)?;
    check_len("location", location, LOCATION_MAX_CHARS)?;
    check_len("status", status, STATUS_MAX_CHARS)?;
    Ok(())
}

fn check_len(field: &'static str, value: &str, max: usize) -> Result<(), AgentValidationError> {
    let actual = value.chars().count();
    if actual > max {
        return Err(AgentValidationError::TooLong { field, max, actual });
    }
    Ok(())
}
