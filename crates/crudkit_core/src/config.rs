//! Repository and connection configuration.
//!
//! # Responsibility
//! - Describe the table a repository operates on and its bookkeeping columns.
//! - Parse connection strings into typed connection options.
//! - Validate configuration once, before any statement is issued.
//!
//! # Invariants
//! - `table` and `primary_key` are non-empty SQL identifiers after validation.
//! - Bookkeeping column names, when set, are valid SQL identifiers.
//! - Soft deletes require a configured deleted-flag column.

use crate::query::is_valid_identifier;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

const DEFAULT_CREATED_FIELD: &str = "created_at";
const DEFAULT_UPDATED_FIELD: &str = "updated_at";
const DEFAULT_DELETED_AT_FIELD: &str = "deleted_at";
const DEFAULT_DELETED_FIELD: &str = "deleted";
const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(5);
const MEMORY_TARGET: &str = "sqlite::memory:";
const SQLITE_SCHEME: &str = "sqlite://";

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Configuration error raised before any statement reaches the database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    EmptyTable,
    EmptyPrimaryKey,
    InvalidIdentifier {
        field: &'static str,
        value: String,
    },
    MissingDeletedField,
    UnknownDateFormat(String),
    UnknownKeyKind(String),
    InvalidJson(String),
    InvalidConnectionString {
        input: String,
        message: String,
    },
    SoftDeletesDisabled,
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyTable => write!(f, "table name cannot be empty"),
            Self::EmptyPrimaryKey => write!(f, "primary key column cannot be empty"),
            Self::InvalidIdentifier { field, value } => {
                write!(f, "`{value}` is not a valid identifier for {field}")
            }
            Self::MissingDeletedField => {
                write!(f, "soft deletes require a deleted flag column")
            }
            Self::UnknownDateFormat(value) => write!(
                f,
                "unsupported date format `{value}`; expected integer|datetime|date-only"
            ),
            Self::UnknownKeyKind(value) => {
                write!(f, "unsupported key kind `{value}`; expected text|integer")
            }
            Self::InvalidJson(message) => write!(f, "invalid repository config: {message}"),
            Self::InvalidConnectionString { input, message } => {
                write!(f, "invalid connection string `{input}`: {message}")
            }
            Self::SoftDeletesDisabled => {
                write!(f, "operation requires soft deletes to be enabled")
            }
        }
    }
}

impl Error for ConfigError {}

/// Rendering mode for bookkeeping timestamps.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum DateFormat {
    /// Unix seconds stored as an integer.
    Integer,
    /// `YYYY-MM-DD HH:MM:SS` in UTC.
    #[default]
    DateTime,
    /// `YYYY-MM-DD` in UTC.
    DateOnly,
}

impl DateFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Integer => "integer",
            Self::DateTime => "datetime",
            Self::DateOnly => "date-only",
        }
    }
}

impl FromStr for DateFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "int" | "integer" => Ok(Self::Integer),
            "datetime" => Ok(Self::DateTime),
            "date" | "date-only" | "date_only" => Ok(Self::DateOnly),
            _ => Err(ConfigError::UnknownDateFormat(value.to_string())),
        }
    }
}

impl TryFrom<String> for DateFormat {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<DateFormat> for String {
    fn from(value: DateFormat) -> Self {
        value.as_str().to_string()
    }
}

/// How primary-key values are bound in statements.
///
/// `Text` binds every key as a string, which SQLite coerces through column
/// affinity. `Integer` parses keys into integers and rejects non-numeric ones.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum KeyKind {
    #[default]
    Text,
    Integer,
}

impl KeyKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Integer => "integer",
        }
    }
}

impl FromStr for KeyKind {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "text" | "string" => Ok(Self::Text),
            "int" | "integer" => Ok(Self::Integer),
            _ => Err(ConfigError::UnknownKeyKind(value.to_string())),
        }
    }
}

impl TryFrom<String> for KeyKind {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<KeyKind> for String {
    fn from(value: KeyKind) -> Self {
        value.as_str().to_string()
    }
}

/// Fixed per-table settings for a record repository.
///
/// Bookkeeping columns set to `None` are skipped entirely.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RepositoryConfig {
    pub table: String,
    pub primary_key: String,
    pub use_soft_deletes: bool,
    pub use_timestamps: bool,
    pub created_field: Option<String>,
    pub updated_field: Option<String>,
    pub deleted_at_field: Option<String>,
    pub deleted_field: Option<String>,
    pub date_format: DateFormat,
    pub key_kind: KeyKind,
}

impl Default for RepositoryConfig {
    fn default() -> Self {
        Self {
            table: String::new(),
            primary_key: String::new(),
            use_soft_deletes: true,
            use_timestamps: true,
            created_field: Some(DEFAULT_CREATED_FIELD.to_string()),
            updated_field: Some(DEFAULT_UPDATED_FIELD.to_string()),
            deleted_at_field: Some(DEFAULT_DELETED_AT_FIELD.to_string()),
            deleted_field: Some(DEFAULT_DELETED_FIELD.to_string()),
            date_format: DateFormat::default(),
            key_kind: KeyKind::default(),
        }
    }
}

impl RepositoryConfig {
    /// Creates a config for `table` keyed by `primary_key` with default
    /// soft-delete and timestamp bookkeeping.
    pub fn new(table: impl Into<String>, primary_key: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            primary_key: primary_key.into(),
            ..Self::default()
        }
    }

    /// Parses a JSON document and validates the result.
    ///
    /// Unknown `date_format`/`key_kind` names surface as
    /// `UnknownDateFormat`/`UnknownKeyKind`; other shape errors as `InvalidJson`.
    pub fn from_json(json: &str) -> ConfigResult<Self> {
        let document: serde_json::Value =
            serde_json::from_str(json).map_err(|err| ConfigError::InvalidJson(err.to_string()))?;
        if let Some(name) = document.get("date_format").and_then(serde_json::Value::as_str) {
            name.parse::<DateFormat>()?;
        }
        if let Some(name) = document.get("key_kind").and_then(serde_json::Value::as_str) {
            name.parse::<KeyKind>()?;
        }

        let config: Self = serde_json::from_value(document)
            .map_err(|err| ConfigError::InvalidJson(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn with_soft_deletes(mut self, enabled: bool) -> Self {
        self.use_soft_deletes = enabled;
        self
    }

    pub fn with_timestamps(mut self, enabled: bool) -> Self {
        self.use_timestamps = enabled;
        self
    }

    pub fn with_date_format(mut self, format: DateFormat) -> Self {
        self.date_format = format;
        self
    }

    pub fn with_key_kind(mut self, kind: KeyKind) -> Self {
        self.key_kind = kind;
        self
    }

    pub fn with_created_field(mut self, column: Option<&str>) -> Self {
        self.created_field = column.map(str::to_string);
        self
    }

    pub fn with_updated_field(mut self, column: Option<&str>) -> Self {
        self.updated_field = column.map(str::to_string);
        self
    }

    pub fn with_deleted_at_field(mut self, column: Option<&str>) -> Self {
        self.deleted_at_field = column.map(str::to_string);
        self
    }

    pub fn with_deleted_field(mut self, column: Option<&str>) -> Self {
        self.deleted_field = column.map(str::to_string);
        self
    }

    /// Checks identifiers and soft-delete prerequisites.
    ///
    /// # Errors
    /// - `EmptyTable` / `EmptyPrimaryKey` for blank names.
    /// - `InvalidIdentifier` when any configured name is not a plain identifier.
    /// - `MissingDeletedField` when soft deletes are on without a flag column.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.table.trim().is_empty() {
            return Err(ConfigError::EmptyTable);
        }
        if self.primary_key.trim().is_empty() {
            return Err(ConfigError::EmptyPrimaryKey);
        }

        check_identifier("table", &self.table)?;
        check_identifier("primary_key", &self.primary_key)?;
        for (field, column) in [
            ("created_field", &self.created_field),
            ("updated_field", &self.updated_field),
            ("deleted_at_field", &self.deleted_at_field),
            ("deleted_field", &self.deleted_field),
        ] {
            if let Some(column) = column {
                check_identifier(field, column)?;
            }
        }

        if self.use_soft_deletes && self.deleted_field.is_none() {
            return Err(ConfigError::MissingDeletedField);
        }

        Ok(())
    }

    /// Created-at column, if timestamp tracking writes it.
    pub fn created_column(&self) -> Option<&str> {
        self.created_field
            .as_deref()
            .filter(|_| self.use_timestamps)
    }

    /// Updated-at column, if timestamp tracking writes it.
    pub fn updated_column(&self) -> Option<&str> {
        self.updated_field
            .as_deref()
            .filter(|_| self.use_timestamps)
    }

    /// Deleted-flag column, if soft deletes are active.
    pub fn deleted_column(&self) -> Option<&str> {
        self.deleted_field
            .as_deref()
            .filter(|_| self.use_soft_deletes)
    }

    /// Deleted-at column, if soft deletes are active.
    pub fn deleted_at_column(&self) -> Option<&str> {
        self.deleted_at_field
            .as_deref()
            .filter(|_| self.use_soft_deletes)
    }
}

fn check_identifier(field: &'static str, value: &str) -> ConfigResult<()> {
    if is_valid_identifier(value) {
        Ok(())
    } else {
        Err(ConfigError::InvalidIdentifier {
            field,
            value: value.to_string(),
        })
    }
}

/// Where a connection points to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionTarget {
    Memory,
    File(PathBuf),
}

/// Parsed connection string.
///
/// Accepted forms: `sqlite::memory:`, `sqlite://<path>`, or a bare path, each
/// optionally followed by `?busy_timeout_ms=<n>&foreign_keys=<on|off>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionConfig {
    pub target: ConnectionTarget,
    pub busy_timeout: Duration,
    pub foreign_keys: bool,
}

impl ConnectionConfig {
    pub fn memory() -> Self {
        Self {
            target: ConnectionTarget::Memory,
            busy_timeout: DEFAULT_BUSY_TIMEOUT,
            foreign_keys: true,
        }
    }

    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self {
            target: ConnectionTarget::File(path.into()),
            ..Self::memory()
        }
    }

    pub fn parse(input: &str) -> ConfigResult<Self> {
        let trimmed = input.trim();
        let invalid = |message: String| ConfigError::InvalidConnectionString {
            input: input.to_string(),
            message,
        };

        let (location, query) = match trimmed.split_once('?') {
            Some((location, query)) => (location, Some(query)),
            None => (trimmed, None),
        };

        let mut config = if location == MEMORY_TARGET || location == ":memory:" {
            Self::memory()
        } else {
            let path = location.strip_prefix(SQLITE_SCHEME).unwrap_or(location);
            if path.is_empty() {
                return Err(invalid("database path cannot be empty".to_string()));
            }
            if path.contains("://") {
                return Err(invalid("only sqlite:// connections are supported".to_string()));
            }
            Self::file(path)
        };

        for pair in query.into_iter().flat_map(|query| query.split('&')) {
            if pair.is_empty() {
                continue;
            }
            let (key, value) = pair
                .split_once('=')
                .ok_or_else(|| invalid(format!("parameter `{pair}` has no value")))?;
            match key {
                "busy_timeout_ms" => {
                    let millis = value.parse::<u64>().map_err(|_| {
                        invalid(format!("busy_timeout_ms must be an integer, got `{value}`"))
                    })?;
                    config.busy_timeout = Duration::from_millis(millis);
                }
                "foreign_keys" => {
                    config.foreign_keys = match value.to_ascii_lowercase().as_str() {
                        "on" | "true" | "1" => true,
                        "off" | "false" | "0" => false,
                        other => {
                            return Err(invalid(format!(
                                "foreign_keys must be on|off, got `{other}`"
                            )))
                        }
                    };
                }
                other => return Err(invalid(format!("unknown parameter `{other}`"))),
            }
        }

        Ok(config)
    }
}

impl FromStr for ConnectionConfig {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::parse(value)
    }
}
