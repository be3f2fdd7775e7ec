//! `crudkit` command-line entry point.
//!
//! # Responsibility
//! - Map CLI subcommands onto `SqliteRecordRepository` operations.
//! - Print results as JSON on stdout; errors go to stderr with exit code 1.

mod args;

use args::{Cli, Commands, ListArgs};
use clap::Parser;
use crudkit_core::{
    init_logging, init_stderr_logging, FieldValue, OrderBy, Page, Record, RecordKey,
    RecordRepository, RepositoryConfig, SortDirection, SqliteRecordRepository,
};
use log::{error, info};
use serde::Serialize;
use std::error::Error;
use std::process::ExitCode;

const DEFAULT_CLI_LOG_LEVEL: &str = "warn";

type CliResult<T> = Result<T, Box<dyn Error>>;

fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = cli.log_level.as_deref().unwrap_or(DEFAULT_CLI_LOG_LEVEL);
    let logging = match cli.log_dir.as_deref() {
        Some(dir) => init_logging(level, dir),
        None => init_stderr_logging(level),
    };
    if let Err(err) = logging {
        eprintln!("crudkit: {err}");
        return ExitCode::FAILURE;
    }

    match run(cli) {
        Ok(output) => {
            println!("{output}");
            ExitCode::SUCCESS
        }
        Err(err) => {
            error!("event=cli_command module=cli status=error error={err}");
            eprintln!("crudkit: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> CliResult<String> {
    let database = cli
        .database
        .as_deref()
        .ok_or("missing --database (or CRUDKIT_DATABASE)")?;
    let config = repository_config(&cli)?;
    info!(
        "event=cli_command module=cli status=start table={} command={:?}",
        config.table, cli.command
    );
    let repo = SqliteRecordRepository::open(database, config)?;

    match cli.command {
        Commands::Read(list) => {
            let rows = match list.order.as_deref() {
                Some(column) => {
                    let direction: SortDirection = list.direction.parse()?;
                    repo.read_ordered(column, direction, page_of(&list))?
                }
                None => repo.read(page_of(&list))?,
            };
            to_json(&rows)
        }
        Commands::One { id, with_deleted } => {
            let key = parse_key(&id);
            let row = if with_deleted {
                repo.one_with_deleted(&key)?
            } else {
                repo.one(&key)?
            };
            to_json(&row)
        }
        Commands::Exists { id } => to_json(&repo.exists(&parse_key(&id))?),
        Commands::Find { filters, list } => {
            let filters = parse_pairs(&filters)?;
            let order = match list.order.as_deref() {
                Some(column) => Some(OrderBy::new(column, list.direction.parse()?)),
                None => None,
            };
            to_json(&repo.find_many(&filters, page_of(&list), order)?)
        }
        Commands::Count => to_json(&repo.count()?),
        Commands::Add { values } => to_json(&repo.add(&parse_pairs(&values)?)?),
        Commands::Update { id, values } => {
            to_json(&repo.update(&parse_key(&id), &parse_pairs(&values)?)?)
        }
        Commands::Delete { id, purge } => to_json(&repo.delete(&parse_key(&id), purge)?),
        Commands::Restore { id } => to_json(&repo.restore(&parse_key(&id))?),
    }
}

fn repository_config(cli: &Cli) -> CliResult<RepositoryConfig> {
    if let Some(path) = cli.config.as_deref() {
        let json = std::fs::read_to_string(path)
            .map_err(|err| format!("failed to read config `{path}`: {err}"))?;
        return Ok(RepositoryConfig::from_json(&json)?);
    }

    let table = cli
        .table
        .as_deref()
        .ok_or("missing --table (or --config)")?;
    let config = RepositoryConfig::new(table, cli.primary_key.as_str())
        .with_soft_deletes(!cli.no_soft_deletes)
        .with_timestamps(!cli.no_timestamps)
        .with_date_format(cli.date_format.parse()?)
        .with_key_kind(cli.key_kind.parse()?);
    config.validate()?;
    Ok(config)
}

fn page_of(list: &ListArgs) -> Page {
    Page::new(list.limit, list.offset)
}

/// Keys stay text; the repository's `KeyKind` decides how they bind.
fn parse_key(raw: &str) -> RecordKey {
    RecordKey::from(raw)
}

fn parse_pairs(pairs: &[String]) -> CliResult<Record> {
    let mut record = Record::new();
    for pair in pairs {
        let (column, raw) = pair
            .split_once('=')
            .ok_or_else(|| format!("expected COLUMN=VALUE, got `{pair}`"))?;
        record.insert(column.trim(), parse_value(raw));
    }
    Ok(record)
}

fn parse_value(raw: &str) -> FieldValue {
    if raw.eq_ignore_ascii_case("null") {
        return FieldValue::Null;
    }
    // Only canonical spellings become numbers, so `007` or `+1` stay text.
    if let Ok(integer) = raw.parse::<i64>() {
        if integer.to_string() == raw {
            return FieldValue::Integer(integer);
        }
    }
    if let Ok(real) = raw.parse::<f64>() {
        if real.is_finite() && real.to_string() == raw {
            return FieldValue::Real(real);
        }
    }
    FieldValue::Text(raw.to_string())
}

fn to_json<T: Serialize + ?Sized>(value: &T) -> CliResult<String> {
    Ok(serde_json::to_string_pretty(value)?)
}
