//! Database connection settings resolved from the process environment.
//!
//! # Responsibility
//! - Resolve the store connection string once, at construction.
//! - Layer a local `.env` file under the process environment.
//! - Carry optional session knobs (busy timeout, opt-in reset on start).
//!
//! # Invariants
//! - A missing or blank `DATABASE_CONNECTION_STRING` is a fatal config error.
//! - Private in-memory stores are rejected; every repository call opens its
//!   own session and would otherwise see an empty database.

use log::{debug, info};
use std::collections::HashMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const CONNECTION_STRING_VAR: &str = "DATABASE_CONNECTION_STRING";
pub const RESET_ON_START_VAR: &str = "EAGLEEYE_RESET_ON_START";
pub const BUSY_TIMEOUT_MS_VAR: &str = "EAGLEEYE_BUSY_TIMEOUT_MS";

const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;
const SQLITE_SCHEME_PREFIX: &str = "sqlite://";

pub type ConfigResult<T> = Result<T, ConfigError>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    MissingVar(&'static str),
    InvalidValue {
        key: &'static str,
        value: String,
        reason: String,
    },
    EnvFile {
        path: Option<PathBuf>,
        message: String,
    },
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingVar(key) => write!(f, "{key} is not set"),
            Self::InvalidValue { key, value, reason } => {
                write!(f, "invalid value `{value}` for {key}: {reason}")
            }
            Self::EnvFile {
                path: Some(path),
                message,
            } => write!(f, "cannot read env file `{}`: {message}", path.display()),
            Self::EnvFile {
                path: None,
                message,
            } => write!(f, "cannot read env file: {message}"),
        }
    }
}

impl Error for ConfigError {}

/// Resolved connection parameters for the agent store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseConfig {
    connection_string: String,
    reset_on_start: bool,
    busy_timeout: Duration,
}

impl DatabaseConfig {
    /// Builds a config from an explicit connection string with default knobs.
    ///
    /// No validation happens here; callers that need the in-memory check
    /// should go through [`DatabaseConfig::from_lookup`].
    pub fn new(connection_string: impl Into<String>) -> Self {
        Self {
            connection_string: normalize_connection_string(&connection_string.into()),
            reset_on_start: false,
            busy_timeout: Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS),
        }
    }

    /// Reads all settings from the process environment, after loading a
    /// `.env` file from the working directory (or a parent) when present.
    ///
    /// Variables already set in the process win over the file.
    pub fn from_env() -> ConfigResult<Self> {
        load_dotenv()?;
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads settings from the dotenv-format file at `path`, without touching
    /// the process environment. Process variables still take precedence.
    pub fn from_env_file(path: &Path) -> ConfigResult<Self> {
        let file_values = read_env_file(path)?;
        Self::from_lookup(|key| {
            std::env::var(key)
                .ok()
                .or_else(|| file_values.get(key).cloned())
        })
    }

    /// Reads all settings through `lookup`, which returns `None` for unset keys.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> ConfigResult<Self> {
        let raw = lookup(CONNECTION_STRING_VAR)
            .filter(|value| !value.trim().is_empty())
            .ok_or(ConfigError::MissingVar(CONNECTION_STRING_VAR))?;

        let connection_string = normalize_connection_string(&raw);
        if is_private_memory_store(&connection_string) {
            return Err(ConfigError::InvalidValue {
                key: CONNECTION_STRING_VAR,
                value: raw,
                reason: "private in-memory databases do not survive between sessions; \
                         use a file path or a shared-cache `file:` URI"
                    .to_string(),
            });
        }

        let reset_on_start = match lookup(RESET_ON_START_VAR) {
            Some(value) => parse_bool(RESET_ON_START_VAR, &value)?,
            None => false,
        };

        let busy_timeout_ms = match lookup(BUSY_TIMEOUT_MS_VAR) {
            Some(value) => {
                value
                    .trim()
                    .parse::<u64>()
                    .map_err(|err| ConfigError::InvalidValue {
                        key: BUSY_TIMEOUT_MS_VAR,
                        value: value.clone(),
                        reason: err.to_string(),
                    })?
            }
            None => DEFAULT_BUSY_TIMEOUT_MS,
        };

        Ok(Self {
            connection_string,
            reset_on_start,
            busy_timeout: Duration::from_millis(busy_timeout_ms),
        })
    }

    /// Enables or disables destructive table re-creation at startup.
    pub fn with_reset_on_start(mut self, reset_on_start: bool) -> Self {
        self.reset_on_start = reset_on_start;
        self
    }

    pub fn with_busy_timeout(mut self, busy_timeout: Duration) -> Self {
        self.busy_timeout = busy_timeout;
        self
    }

    pub fn connection_string(&self) -> &str {
        &self.connection_string
    }

    pub fn reset_on_start(&self) -> bool {
        self.reset_on_start
    }

    pub fn busy_timeout(&self) -> Duration {
        self.busy_timeout
    }

    /// Whether the connection string must be opened with URI semantics.
    pub fn is_uri(&self) -> bool {
        self.connection_string.starts_with("file:")
    }
}

/// Loads `.env` into the process environment without overriding variables
/// that are already set. A missing file is not an error.
///
/// Returns the path of the loaded file.
pub fn load_dotenv() -> ConfigResult<Option<PathBuf>> {
    match dotenvy::dotenv() {
        Ok(path) => {
            info!(
                "event=config_load module=config status=ok source={}",
                path.display()
            );
            Ok(Some(path))
        }
        Err(err) if err.not_found() => {
            debug!("event=config_load module=config status=skipped reason=no_env_file");
            Ok(None)
        }
        Err(err) => Err(ConfigError::EnvFile {
            path: None,
            message: err.to_string(),
        }),
    }
}

fn read_env_file(path: &Path) -> ConfigResult<HashMap<String, String>> {
    dotenvy::from_path_iter(path)
        .and_then(|entries| entries.collect::<Result<HashMap<_, _>, _>>())
        .map_err(|err| ConfigError::EnvFile {
            path: Some(path.to_path_buf()),
            message: err.to_string(),
        })
}

fn normalize_connection_string(raw: &str) -> String {
    let trimmed = raw.trim();
    trimmed
        .strip_prefix(SQLITE_SCHEME_PREFIX)
        .unwrap_or(trimmed)
        .to_string()
}

/// In-memory stores are private to one connection unless `cache=shared`.
fn is_private_memory_store(connection_string: &str) -> bool {
    if connection_string == ":memory:" {
        return true;
    }
    let Some(uri) = connection_string.strip_prefix("file:") else {
        return false;
    };
    let (path, query) = uri.split_once('?').unwrap_or((uri, ""));
    let query = query.split('#').next().unwrap_or_default();
    let params: Vec<&str> = query.split('&').collect();

    let in_memory = path == ":memory:" || params.contains(&"mode=memory");
    in_memory && !params.contains(&"cache=shared")
}

fn parse_bool(key: &'static str, value: &str) -> ConfigResult<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            key,
            value: value.to_string(),
            reason: "expected one of 1|true|yes|on|0|false|no|off".to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::{
        read_env_file, ConfigError, DatabaseConfig, BUSY_TIMEOUT_MS_VAR, CONNECTION_STRING_VAR,
        RESET_ON_START_VAR,
    };
    use std::collections::HashMap;
    use std::fs;
    use std::time::Duration;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn missing_connection_string_is_rejected() {
        let err = DatabaseConfig::from_lookup(lookup_from(&[])).unwrap_err();
        assert_eq!(err, ConfigError::MissingVar(CONNECTION_STRING_VAR));
    }

    #[test]
    fn blank_connection_string_counts_as_missing() {
        let err =
            DatabaseConfig::from_lookup(lookup_from(&[(CONNECTION_STRING_VAR, "   ")])).unwrap_err();
        assert_eq!(err, ConfigError::MissingVar(CONNECTION_STRING_VAR));
    }

    #[test]
    fn defaults_apply_when_only_connection_string_is_set() {
        let config =
            DatabaseConfig::from_lookup(lookup_from(&[(CONNECTION_STRING_VAR, "/tmp/agents.db")]))
                .unwrap();
        assert_eq!(config.connection_string(), "/tmp/agents.db");
        assert!(!config.reset_on_start());
        assert_eq!(config.busy_timeout(), Duration::from_secs(5));
        assert!(!config.is_uri());
    }

    #[test]
    fn sqlite_scheme_prefix_is_stripped() {
        let config = DatabaseConfig::from_lookup(lookup_from(&[(
            CONNECTION_STRING_VAR,
            "sqlite:///var/lib/eagleeye/agents.db",
        )]))
        .unwrap();
        assert_eq!(config.connection_string(), "/var/lib/eagleeye/agents.db");
    }

    #[test]
    fn private_memory_store_is_rejected_but_shared_cache_is_allowed() {
        let err = DatabaseConfig::from_lookup(lookup_from(&[(CONNECTION_STRING_VAR, ":memory:")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { key, .. } if key == CONNECTION_STRING_VAR));

        let config = DatabaseConfig::from_lookup(lookup_from(&[(
            CONNECTION_STRING_VAR,
            "file:roster?mode=memory&cache=shared",
        )]))
        .unwrap();
        assert!(config.is_uri());
    }

    #[test]
    fn memory_uris_without_shared_cache_are_rejected() {
        for value in [
            "file::memory:",
            "file:roster?mode=memory",
            "file:roster?mode=memory&cache=private",
            "sqlite://file:roster?mode=memory",
        ] {
            let err = DatabaseConfig::from_lookup(lookup_from(&[(CONNECTION_STRING_VAR, value)]))
                .unwrap_err();
            assert!(
                matches!(err, ConfigError::InvalidValue { key, .. } if key == CONNECTION_STRING_VAR),
                "{value} should be rejected"
            );
        }

        for value in [
            "file::memory:?cache=shared",
            "file:roster?cache=shared&mode=memory",
            "file:roster.db?mode=rwc",
        ] {
            assert!(
                DatabaseConfig::from_lookup(lookup_from(&[(CONNECTION_STRING_VAR, value)])).is_ok(),
                "{value} should be accepted"
            );
        }
    }

    #[test]
    fn env_file_values_are_read_in_dotenv_format() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".env");
        fs::write(
            &path,
            "# local settings\nDATABASE_CONNECTION_STRING=\"/srv/eagleeye/agents.db\"\nEAGLEEYE_BUSY_TIMEOUT_MS=750\n",
        )
        .unwrap();

        let values = read_env_file(&path).unwrap();
        assert_eq!(
            values.get(CONNECTION_STRING_VAR).map(String::as_str),
            Some("/srv/eagleeye/agents.db")
        );
        assert_eq!(
            values.get(BUSY_TIMEOUT_MS_VAR).map(String::as_str),
            Some("750")
        );

        let config = DatabaseConfig::from_lookup(|key| values.get(key).cloned()).unwrap();
        assert_eq!(config.connection_string(), "/srv/eagleeye/agents.db");
        assert_eq!(config.busy_timeout(), Duration::from_millis(750));
    }

    #[test]
    fn unreadable_env_file_is_reported_with_its_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.env");

        let err = DatabaseConfig::from_env_file(&path).unwrap_err();
        assert!(matches!(err, ConfigError::EnvFile { path: Some(ref reported), .. } if *reported == path));
    }

    #[test]
    fn optional_knobs_are_parsed() {
        let config = DatabaseConfig::from_lookup(lookup_from(&[
            (CONNECTION_STRING_VAR, "agents.db"),
            (RESET_ON_START_VAR, " YES "),
            (BUSY_TIMEOUT_MS_VAR, "250"),
        ]))
        .unwrap();
        assert!(config.reset_on_start());
        assert_eq!(config.busy_timeout(), Duration::from_millis(250));
    }

    #[test]
    fn invalid_knob_values_are_rejected() {
        let reset_err = DatabaseConfig::from_lookup(lookup_from(&[
            (CONNECTION_STRING_VAR, "agents.db"),
            (RESET_ON_START_VAR, "maybe"),
        ]))
        .unwrap_err();
        assert!(matches!(reset_err, ConfigError::InvalidValue { key, .. } if key == RESET_ON_START_VAR));

        let timeout_err = DatabaseConfig::from_lookup(lookup_from(&[
            (CONNECTION_STRING_VAR, "agents.db"),
            (BUSY_TIMEOUT_MS_VAR, "-1"),
        ]))
        .unwrap_err();
        assert!(
            matches!(timeout_err, ConfigError::InvalidValue { key, .. } if key == BUSY_TIMEOUT_MS_VAR)
        );
    }
}
