//! Immutable statement descriptors.
//!
//! # Responsibility
//! - Describe one SELECT/INSERT/UPDATE/DELETE per call as a plain value.
//! - Render descriptors into SQL text plus positional bind values.
//!
//! # Invariants
//! - Values are always bound, never spliced into SQL text.
//! - Every identifier is checked against `IDENTIFIER_RE` and double-quoted.
//! - Descriptors hold no connection state and are never reused across calls.

use crate::model::record::Record;
use once_cell::sync::Lazy;
use regex::Regex;
use rusqlite::types::Value;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

static IDENTIFIER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("valid identifier regex"));

pub type QueryResult<T> = Result<T, QueryError>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryError {
    InvalidIdentifier(String),
    InvalidDirection(String),
    EmptyAssignments,
}

impl Display for QueryError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidIdentifier(value) => write!(f, "`{value}` is not a valid column name"),
            Self::InvalidDirection(value) => {
                write!(f, "unsupported sort direction `{value}`; expected ASC|DESC")
            }
            Self::EmptyAssignments => write!(f, "statement has no columns to write"),
        }
    }
}

impl Error for QueryError {}

/// Returns whether `value` is a plain SQL identifier.
pub fn is_valid_identifier(value: &str) -> bool {
    IDENTIFIER_RE.is_match(value)
}

fn quote_identifier(value: &str) -> QueryResult<String> {
    if is_valid_identifier(value) {
        Ok(format!("\"{value}\""))
    } else {
        Err(QueryError::InvalidIdentifier(value.to_string()))
    }
}

/// Rendered SQL with its positional bind values.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub sql: String,
    pub params: Vec<Value>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    #[default]
    Desc,
}

impl SortDirection {
    pub fn as_sql(self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

impl FromStr for SortDirection {
    type Err = QueryError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_uppercase().as_str() {
            "ASC" => Ok(Self::Asc),
            "DESC" => Ok(Self::Desc),
            _ => Err(QueryError::InvalidDirection(value.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderBy {
    pub column: String,
    pub direction: SortDirection,
}

impl OrderBy {
    pub fn new(column: impl Into<String>, direction: SortDirection) -> Self {
        Self {
            column: column.into(),
            direction,
        }
    }

    pub fn asc(column: impl Into<String>) -> Self {
        Self::new(column, SortDirection::Asc)
    }

    pub fn desc(column: impl Into<String>) -> Self {
        Self::new(column, SortDirection::Desc)
    }
}

/// Pagination window. `limit <= 0` means no window at all: every row is
/// returned and `offset` is ignored.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Page {
    pub limit: i64,
    pub offset: i64,
}

impl Page {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn new(limit: i64, offset: i64) -> Self {
        Self { limit, offset }
    }

    fn push_sql(self, sql: &mut String, params: &mut Vec<Value>) {
        if self.limit < 1 {
            return;
        }
        sql.push_str(" LIMIT ?");
        params.push(Value::Integer(self.limit));
        if self.offset > 0 {
            sql.push_str(" OFFSET ?");
            params.push(Value::Integer(self.offset));
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
struct Filter {
    column: String,
    value: Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Projection {
    All,
    Count,
}

/// SELECT over a single table with AND-combined equality filters.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectQuery {
    table: String,
    projection: Projection,
    filters: Vec<Filter>,
    order: Option<OrderBy>,
    page: Page,
}

impl SelectQuery {
    /// `SELECT * FROM table`.
    pub fn all(table: &str) -> Self {
        Self {
            table: table.to_string(),
            projection: Projection::All,
            filters: Vec::new(),
            order: None,
            page: Page::all(),
        }
    }

    /// `SELECT COUNT(*) AS total FROM table`.
    pub fn count(table: &str) -> Self {
        Self {
            projection: Projection::Count,
            ..Self::all(table)
        }
    }

    /// Adds `column = value`, or `column IS NULL` for null values.
    pub fn filter(mut self, column: &str, value: impl Into<Value>) -> Self {
        self.filters.push(Filter {
            column: column.to_string(),
            value: value.into(),
        });
        self
    }

    /// Adds one equality filter per record column.
    pub fn filter_record(self, filters: &Record) -> Self {
        filters
            .iter()
            .fold(self, |query, (column, value)| {
                query.filter(column, Value::from(value))
            })
    }

    pub fn order_by(mut self, order: Option<OrderBy>) -> Self {
        self.order = order;
        self
    }

    pub fn page(mut self, page: Page) -> Self {
        self.page = page;
        self
    }

    pub fn to_statement(&self) -> QueryResult<Statement> {
        let projection = match self.projection {
            Projection::All => "*",
            Projection::Count => "COUNT(*) AS total",
        };
        let mut sql = format!(
            "SELECT {projection} FROM {}",
            quote_identifier(&self.table)?
        );
        let mut params = Vec::new();

        push_where(&mut sql, &mut params, &self.filters)?;

        if let Some(order) = &self.order {
            sql.push_str(&format!(
                " ORDER BY {} {}",
                quote_identifier(&order.column)?,
                order.direction.as_sql()
            ));
        }

        if self.projection == Projection::All {
            self.page.push_sql(&mut sql, &mut params);
        }

        Ok(Statement { sql, params })
    }
}

/// INSERT of a single value tuple.
#[derive(Debug, Clone, PartialEq)]
pub struct InsertQuery<'a> {
    table: &'a str,
    values: &'a Record,
}

impl<'a> InsertQuery<'a> {
    pub fn new(table: &'a str, values: &'a Record) -> Self {
        Self { table, values }
    }

    pub fn to_statement(&self) -> QueryResult<Statement> {
        if self.values.is_empty() {
            return Err(QueryError::EmptyAssignments);
        }

        let mut columns = Vec::with_capacity(self.values.len());
        let mut params = Vec::with_capacity(self.values.len());
        for (column, value) in self.values {
            columns.push(quote_identifier(column)?);
            params.push(Value::from(value));
        }
        let placeholders = vec!["?"; columns.len()].join(", ");

        Ok(Statement {
            sql: format!(
                "INSERT INTO {} ({}) VALUES ({placeholders})",
                quote_identifier(self.table)?,
                columns.join(", ")
            ),
            params,
        })
    }
}

/// UPDATE of explicit assignments filtered by one key column.
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateQuery<'a> {
    table: &'a str,
    assignments: &'a Record,
    key_column: &'a str,
    key: Value,
}

impl<'a> UpdateQuery<'a> {
    pub fn new(table: &'a str, assignments: &'a Record, key_column: &'a str, key: Value) -> Self {
        Self {
            table,
            assignments,
            key_column,
            key,
        }
    }

    pub fn to_statement(&self) -> QueryResult<Statement> {
        if self.assignments.is_empty() {
            return Err(QueryError::EmptyAssignments);
        }

        let mut sets = Vec::with_capacity(self.assignments.len());
        let mut params = Vec::with_capacity(self.assignments.len() + 1);
        for (column, value) in self.assignments {
            sets.push(format!("{} = ?", quote_identifier(column)?));
            params.push(Value::from(value));
        }
        params.push(self.key.clone());

        Ok(Statement {
            sql: format!(
                "UPDATE {} SET {} WHERE {} = ?",
                quote_identifier(self.table)?,
                sets.join(", "),
                quote_identifier(self.key_column)?
            ),
            params,
        })
    }
}

/// DELETE of the row matching one key column.
#[derive(Debug, Clone, PartialEq)]
pub struct DeleteQuery<'a> {
    table: &'a str,
    key_column: &'a str,
    key: Value,
}

impl<'a> DeleteQuery<'a> {
    pub fn new(table: &'a str, key_column: &'a str, key: Value) -> Self {
        Self {
            table,
            key_column,
            key,
        }
    }

    pub fn to_statement(&self) -> QueryResult<Statement> {
        Ok(Statement {
            sql: format!(
                "DELETE FROM {} WHERE {} = ?",
                quote_identifier(self.table)?,
                quote_identifier(self.key_column)?
            ),
            params: vec![self.key.clone()],
        })
    }
}

fn push_where(sql: &mut String, params: &mut Vec<Value>, filters: &[Filter]) -> QueryResult<()> {
    for (index, filter) in filters.iter().enumerate() {
        sql.push_str(if index == 0 { " WHERE " } else { " AND " });
        let column = quote_identifier(&filter.column)?;
        if filter.value == Value::Null {
            sql.push_str(&format!("{column} IS NULL"));
        } else {
            sql.push_str(&format!("{column} = ?"));
            params.push(filter.value.clone());
        }
    }
    Ok(())
}
