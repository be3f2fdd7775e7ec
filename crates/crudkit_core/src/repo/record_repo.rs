//! Generic record repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Provide CRUD APIs over one configured table, returning generic records.
//! - Apply soft-delete filtering and timestamp bookkeeping per config.
//! - Keep SQL details inside the repository boundary.
//!
//! # Invariants
//! - Config is validated and the table shape checked before construction
//!   succeeds.
//! - Every read hides rows whose deleted flag is non-zero when soft deletes
//!   are enabled, except the explicit `*_with_deleted` lookups.
//! - Each call renders its own statement descriptor; nothing is carried
//!   between calls.
//! - Driver errors are returned unchanged inside `RepoError::Db`.

use crate::config::{ConfigError, ConnectionConfig, KeyKind, RepositoryConfig};
use crate::date::{format_date, DateError};
use crate::db::{open_db_with, DbError};
use crate::model::record::{FieldValue, Record, RecordError, RecordKey};
use crate::query::{
    DeleteQuery, InsertQuery, OrderBy, Page, QueryError, SelectQuery, SortDirection, Statement,
    UpdateQuery,
};
use log::debug;
use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection, Row};
use serde::Serialize;
use std::collections::BTreeSet;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error for record persistence and query operations.
#[derive(Debug)]
pub enum RepoError {
    /// Caller input rejected before reaching the database.
    Validation(String),
    /// Repository or connection configuration is unusable.
    Config(ConfigError),
    /// Driver failure, propagated as-is.
    Db(DbError),
    /// Configured table is absent from the connected database.
    MissingRequiredTable(String),
    /// Table lacks the primary key or an enabled bookkeeping column.
    MissingRequiredColumn {
        table: String,
        column: String,
    },
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(message) => write!(f, "validation failed: {message}"),
            Self::Config(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::MissingRequiredTable(table) => write!(f, "table `{table}` does not exist"),
            Self::MissingRequiredColumn { table, column } => {
                write!(f, "table `{table}` has no column `{column}`")
            }
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Config(err) => Some(err),
            Self::Db(err) => Some(err),
            Self::Validation(_)
            | Self::MissingRequiredTable(_)
            | Self::MissingRequiredColumn { .. } => None,
        }
    }
}

impl From<ConfigError> for RepoError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        match value {
            DbError::InvalidConfig(err) => Self::Config(err),
            other => Self::Db(other),
        }
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

impl From<QueryError> for RepoError {
    fn from(value: QueryError) -> Self {
        Self::Validation(value.to_string())
    }
}

impl From<RecordError> for RepoError {
    fn from(value: RecordError) -> Self {
        Self::Validation(value.to_string())
    }
}

impl From<DateError> for RepoError {
    fn from(value: DateError) -> Self {
        match value {
            DateError::Config(err) => Self::Config(err),
            DateError::OutOfRange(_) => Self::Validation(value.to_string()),
        }
    }
}

/// Outcome of a write statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct WriteResult {
    pub rows_affected: usize,
    /// Row id assigned by an INSERT; `None` for updates and deletes.
    pub last_insert_id: Option<i64>,
}

/// Repository interface for generic record CRUD on one table.
pub trait RecordRepository {
    /// Lists visible rows, optionally paginated.
    fn read(&self, page: Page) -> RepoResult<Vec<Record>>;
    /// Lists visible rows ordered by `order_column`.
    fn read_ordered(
        &self,
        order_column: &str,
        direction: SortDirection,
        page: Page,
    ) -> RepoResult<Vec<Record>>;
    /// Inserts one row, filling bookkeeping columns the input leaves out.
    fn add(&self, data: &Record) -> RepoResult<WriteResult>;
    /// Updates the given columns of the row keyed by `id`.
    fn update(&self, id: &RecordKey, data: &Record) -> RepoResult<WriteResult>;
    /// Soft-deletes `id`, or removes it when `purge` is set or soft deletes are off.
    fn delete(&self, id: &RecordKey, purge: bool) -> RepoResult<WriteResult>;
    /// Clears the soft-delete markers of `id`.
    fn restore(&self, id: &RecordKey) -> RepoResult<WriteResult>;
    /// Gets one visible row by primary key.
    fn one(&self, id: &RecordKey) -> RepoResult<Option<Record>>;
    /// Gets one row by primary key, ignoring the soft-delete flag.
    fn one_with_deleted(&self, id: &RecordKey) -> RepoResult<Option<Record>>;
    /// Lists visible rows matching every column/value pair in `filters`.
    fn find_many(
        &self,
        filters: &Record,
        page: Page,
        order: Option<OrderBy>,
    ) -> RepoResult<Vec<Record>>;
    /// Returns whether a visible row with primary key `id` exists.
    fn exists(&self, id: &RecordKey) -> RepoResult<bool>;
    /// Counts visible rows.
    fn count(&self) -> RepoResult<i64>;

    /// Coerces serializable input into a record, then calls [`Self::add`].
    fn add_serialized<T: Serialize + ?Sized>(&self, data: &T) -> RepoResult<WriteResult>
    where
        Self: Sized,
    {
        self.add(&Record::from_serialize(data)?)
    }

    /// Coerces serializable input into a record, then calls [`Self::update`].
    fn update_serialized<T: Serialize + ?Sized>(
        &self,
        id: &RecordKey,
        data: &T,
    ) -> RepoResult<WriteResult>
    where
        Self: Sized,
    {
        self.update(id, &Record::from_serialize(data)?)
    }
}

/// SQLite-backed record repository owning its connection.
pub struct SqliteRecordRepository {
    conn: Connection,
    config: RepositoryConfig,
}

impl SqliteRecordRepository {
    /// Wraps a connection after validating `config` against the live schema.
    ///
    /// # Errors
    /// - `Config` when the config fails validation.
    /// - `MissingRequiredTable` / `MissingRequiredColumn` when the table does
    ///   not carry the primary key or an active bookkeeping column.
    pub fn try_new(conn: Connection, config: RepositoryConfig) -> RepoResult<Self> {
        config.validate()?;
        ensure_table_ready(&conn, &config)?;
        debug!(
            "event=repo_ready module=repo status=ok table={} soft_deletes={} timestamps={} date_format={}",
            config.table,
            config.use_soft_deletes,
            config.use_timestamps,
            config.date_format.as_str()
        );
        Ok(Self { conn, config })
    }

    /// Opens the connection described by `connection_string`, then
    /// behaves like [`Self::try_new`].
    pub fn open(connection_string: &str, config: RepositoryConfig) -> RepoResult<Self> {
        // Reject a bad config before a file database gets created on disk.
        config.validate()?;
        let connection = ConnectionConfig::parse(connection_string)?;
        let conn = open_db_with(&connection)?;
        Self::try_new(conn, config)
    }

    pub fn config(&self) -> &RepositoryConfig {
        &self.config
    }

    /// Raw connection access, e.g. for queries that bypass soft-delete rules.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    pub fn into_connection(self) -> Connection {
        self.conn
    }

    /// Renders `raw` (Unix seconds) or now in the configured date format.
    pub fn format_date(&self, raw: Option<i64>) -> RepoResult<FieldValue> {
        Ok(format_date(self.config.date_format, raw)?)
    }

    fn select(&self) -> SelectQuery {
        SelectQuery::all(&self.config.table)
    }

    fn visible(&self, query: SelectQuery) -> SelectQuery {
        match self.config.deleted_column() {
            Some(column) => query.filter(column, Value::Integer(0)),
            None => query,
        }
    }

    fn bind_key(&self, id: &RecordKey) -> RepoResult<Value> {
        match (self.config.key_kind, id) {
            (KeyKind::Text, key) => Ok(Value::Text(key.to_string())),
            (KeyKind::Integer, RecordKey::Integer(value)) => Ok(Value::Integer(*value)),
            (KeyKind::Integer, RecordKey::Text(text)) => {
                text.trim().parse::<i64>().map(Value::Integer).map_err(|_| {
                    RepoError::Validation(format!("primary key `{text}` is not an integer"))
                })
            }
        }
    }

    fn fetch_all(&self, statement: &Statement) -> RepoResult<Vec<Record>> {
        let mut stmt = self.conn.prepare(&statement.sql)?;
        let columns: Vec<String> = stmt
            .column_names()
            .into_iter()
            .map(str::to_string)
            .collect();
        let mut rows = stmt.query(params_from_iter(statement.params.iter()))?;
        let mut records = Vec::new();

        while let Some(row) = rows.next()? {
            records.push(parse_record_row(row, &columns)?);
        }

        Ok(records)
    }

    fn fetch_one(&self, query: SelectQuery) -> RepoResult<Option<Record>> {
        let statement = query.page(Page::new(1, 0)).to_statement()?;
        Ok(self.fetch_all(&statement)?.into_iter().next())
    }

    fn execute(&self, op: &'static str, statement: &Statement) -> RepoResult<usize> {
        let changed = self
            .conn
            .execute(&statement.sql, params_from_iter(statement.params.iter()))?;
        debug!(
            "event=record_write module=repo status=ok op={} table={} rows={}",
            op, self.config.table, changed
        );
        Ok(changed)
    }

    fn write_by_key(
        &self,
        op: &'static str,
        id: &RecordKey,
        assignments: &Record,
    ) -> RepoResult<WriteResult> {
        let key = self.bind_key(id)?;
        let statement =
            UpdateQuery::new(&self.config.table, assignments, &self.config.primary_key, key)
                .to_statement()?;
        Ok(WriteResult {
            rows_affected: self.execute(op, &statement)?,
            last_insert_id: None,
        })
    }
}

impl RecordRepository for SqliteRecordRepository {
    fn read(&self, page: Page) -> RepoResult<Vec<Record>> {
        let statement = self.visible(self.select()).page(page).to_statement()?;
        self.fetch_all(&statement)
    }

    fn read_ordered(
        &self,
        order_column: &str,
        direction: SortDirection,
        page: Page,
    ) -> RepoResult<Vec<Record>> {
        let statement = self
            .visible(self.select())
            .order_by(Some(OrderBy::new(order_column, direction)))
            .page(page)
            .to_statement()?;
        self.fetch_all(&statement)
    }

    fn add(&self, data: &Record) -> RepoResult<WriteResult> {
        if data.is_empty() {
            return Err(RepoError::Validation("data is empty".to_string()));
        }

        let mut row = data.clone();
        if self.config.use_timestamps {
            let now = self.format_date(None)?;
            if let Some(column) = self.config.created_column() {
                row.insert_if_absent(column, now.clone());
            }
            if let Some(column) = self.config.updated_column() {
                row.insert_if_absent(column, now);
            }
        }
        if let Some(column) = self.config.deleted_column() {
            row.insert_if_absent(column, 0);
        }

        let statement = InsertQuery::new(&self.config.table, &row).to_statement()?;
        let rows_affected = self.execute("add", &statement)?;
        Ok(WriteResult {
            rows_affected,
            last_insert_id: Some(self.conn.last_insert_rowid()),
        })
    }

    fn update(&self, id: &RecordKey, data: &Record) -> RepoResult<WriteResult> {
        if data.is_empty() {
            return Err(RepoError::Validation("data is empty".to_string()));
        }

        let mut row = data.clone();
        if let Some(column) = self.config.updated_column() {
            row.insert_if_absent(column, self.format_date(None)?);
        }

        self.write_by_key("update", id, &row)
    }

    fn delete(&self, id: &RecordKey, purge: bool) -> RepoResult<WriteResult> {
        let Some(deleted_column) = self.config.deleted_column().filter(|_| !purge) else {
            let statement =
                DeleteQuery::new(&self.config.table, &self.config.primary_key, self.bind_key(id)?)
                    .to_statement()?;
            return Ok(WriteResult {
                rows_affected: self.execute("purge", &statement)?,
                last_insert_id: None,
            });
        };

        let now = self.format_date(None)?;
        let mut set = Record::new().with(deleted_column, 1);
        if let Some(column) = self.config.deleted_at_column() {
            set.insert(column, now.clone());
        }
        if let Some(column) = self.config.updated_column() {
            set.insert(column, now);
        }

        self.write_by_key("soft_delete", id, &set)
    }

    fn restore(&self, id: &RecordKey) -> RepoResult<WriteResult> {
        let deleted_column = self
            .config
            .deleted_column()
            .ok_or(ConfigError::SoftDeletesDisabled)?;

        let mut set = Record::new().with(deleted_column, 0);
        if let Some(column) = self.config.deleted_at_column() {
            set.insert(column, FieldValue::Null);
        }
        if let Some(column) = self.config.updated_column() {
            set.insert(column, self.format_date(None)?);
        }

        self.write_by_key("restore", id, &set)
    }

    fn one(&self, id: &RecordKey) -> RepoResult<Option<Record>> {
        let key = self.bind_key(id)?;
        let query = self
            .visible(self.select())
            .filter(&self.config.primary_key, key);
        self.fetch_one(query)
    }

    fn one_with_deleted(&self, id: &RecordKey) -> RepoResult<Option<Record>> {
        let key = self.bind_key(id)?;
        self.fetch_one(self.select().filter(&self.config.primary_key, key))
    }

    fn find_many(
        &self,
        filters: &Record,
        page: Page,
        order: Option<OrderBy>,
    ) -> RepoResult<Vec<Record>> {
        let statement = self
            .visible(self.select())
            .filter_record(filters)
            .order_by(order)
            .page(page)
            .to_statement()?;
        self.fetch_all(&statement)
    }

    fn exists(&self, id: &RecordKey) -> RepoResult<bool> {
        let key = self.bind_key(id)?;
        let statement = self
            .visible(SelectQuery::count(&self.config.table))
            .filter(&self.config.primary_key, key)
            .to_statement()?;
        Ok(count_rows(&self.conn, &statement)? > 0)
    }

    fn count(&self) -> RepoResult<i64> {
        let statement = self
            .visible(SelectQuery::count(&self.config.table))
            .to_statement()?;
        count_rows(&self.conn, &statement)
    }
}

fn count_rows(conn: &Connection, statement: &Statement) -> RepoResult<i64> {
    let total = conn.query_row(
        &statement.sql,
        params_from_iter(statement.params.iter()),
        |row| row.get::<_, i64>("total"),
    )?;
    Ok(total)
}

fn parse_record_row(row: &Row<'_>, columns: &[String]) -> RepoResult<Record> {
    let mut record = Record::new();
    for (index, column) in columns.iter().enumerate() {
        record.insert(column.as_str(), FieldValue::from(row.get_ref(index)?));
    }
    Ok(record)
}

fn ensure_table_ready(conn: &Connection, config: &RepositoryConfig) -> RepoResult<()> {
    let mut stmt = conn.prepare("SELECT name FROM pragma_table_info(?1);")?;
    let columns = stmt
        .query_map([config.table.as_str()], |row| row.get::<_, String>(0))?
        .collect::<Result<BTreeSet<_>, _>>()?;

    if columns.is_empty() {
        return Err(RepoError::MissingRequiredTable(config.table.clone()));
    }

    let required = [
        Some(config.primary_key.as_str()),
        config.created_column(),
        config.updated_column(),
        config.deleted_column(),
        config.deleted_at_column(),
    ];
    for column in required.into_iter().flatten() {
        if !columns.contains(column) {
            return Err(RepoError::MissingRequiredColumn {
                table: config.table.clone(),
                column: column.to_string(),
            });
        }
    }

    Ok(())
}
