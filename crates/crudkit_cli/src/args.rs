//! CLI argument definitions.

use clap::{Args, Parser, Subcommand};

/// Inspect and edit rows of one SQLite table.
#[derive(Parser, Debug)]
#[command(name = "crudkit")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Connection string (`sqlite::memory:`, `sqlite://<path>` or a file path)
    #[arg(short, long, global = true, env = "CRUDKIT_DATABASE")]
    pub database: Option<String>,

    /// Repository config as a JSON file; overrides the table flags below
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Table to operate on
    #[arg(short, long, global = true)]
    pub table: Option<String>,

    /// Primary key column
    #[arg(long, global = true, default_value = "id")]
    pub primary_key: String,

    /// Treat the deleted flag as a regular column
    #[arg(long, global = true)]
    pub no_soft_deletes: bool,

    /// Do not write created/updated timestamps
    #[arg(long, global = true)]
    pub no_timestamps: bool,

    /// Timestamp format: integer, datetime or date-only
    #[arg(long, global = true, default_value = "datetime")]
    pub date_format: String,

    /// Primary key binding: text or integer
    #[arg(long, global = true, default_value = "text")]
    pub key_kind: String,

    /// Log level (trace|debug|info|warn|error)
    #[arg(long, global = true, env = "CRUDKIT_LOG")]
    pub log_level: Option<String>,

    /// Absolute directory for rotated log files; logs go to stderr otherwise
    #[arg(long, global = true)]
    pub log_dir: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List visible rows
    Read(ListArgs),
    /// Show one visible row
    One {
        id: String,
        /// Also return soft-deleted rows
        #[arg(long)]
        with_deleted: bool,
    },
    /// Check whether a visible row exists
    Exists { id: String },
    /// List visible rows matching every `column=value` filter
    Find {
        #[arg(value_name = "COLUMN=VALUE")]
        filters: Vec<String>,
        #[command(flatten)]
        list: ListArgs,
    },
    /// Count visible rows
    Count,
    /// Insert one row from `column=value` pairs
    Add {
        #[arg(value_name = "COLUMN=VALUE", required = true)]
        values: Vec<String>,
    },
    /// Update one row from `column=value` pairs
    Update {
        id: String,
        #[arg(value_name = "COLUMN=VALUE", required = true)]
        values: Vec<String>,
    },
    /// Soft-delete one row, or remove it with --purge
    Delete {
        id: String,
        #[arg(long)]
        purge: bool,
    },
    /// Undo a soft delete
    Restore { id: String },
}

#[derive(Args, Debug)]
pub struct ListArgs {
    /// Maximum rows to return; 0 means no limit
    #[arg(long, default_value_t = 0)]
    pub limit: i64,

    /// Rows to skip
    #[arg(long, default_value_t = 0)]
    pub offset: i64,

    /// Column to order by
    #[arg(long)]
    pub order: Option<String>,

    /// ASC or DESC
    #[arg(long, default_value = "DESC")]
    pub direction: String,
}
