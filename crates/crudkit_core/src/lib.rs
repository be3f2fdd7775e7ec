//! Generic CRUD data access over a single configured table.
//! Records are schema-less column/value maps backed by SQLite.

pub mod config;
pub mod date;
pub mod db;
pub mod logging;
pub mod model;
pub mod query;
pub mod repo;

pub use config::{
    ConfigError, ConfigResult, ConnectionConfig, ConnectionTarget, DateFormat, KeyKind,
    RepositoryConfig,
};
pub use date::{format_date, format_date_str, DateError};
pub use logging::{
    default_log_level, init_logging, init_stderr_logging, logging_status, LogTarget,
};
pub use model::record::{FieldValue, Record, RecordError, RecordKey};
pub use query::{OrderBy, Page, QueryError, SortDirection};
pub use repo::record_repo::{
    RecordRepository, RepoError, RepoResult, SqliteRecordRepository, WriteResult,
};

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
