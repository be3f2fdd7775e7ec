use crudkit_core::db::open_db_in_memory;
use crudkit_core::{
    DateFormat, FieldValue, KeyKind, OrderBy, Page, Record, RecordKey, RecordRepository,
    RepoError, RepositoryConfig, SortDirection, SqliteRecordRepository, WriteResult,
};
use serde::Serialize;

const USERS_SCHEMA: &str = "CREATE TABLE users (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    role TEXT,
    created_at TEXT,
    updated_at TEXT,
    deleted_at TEXT,
    deleted INTEGER NOT NULL DEFAULT 0
);";

fn users_repo(config: RepositoryConfig) -> SqliteRecordRepository {
    let conn = open_db_in_memory().unwrap();
    conn.execute_batch(USERS_SCHEMA).unwrap();
    SqliteRecordRepository::try_new(conn, config).unwrap()
}

fn default_repo() -> SqliteRecordRepository {
    users_repo(RepositoryConfig::new("users", "id"))
}

fn key_of(result: WriteResult) -> RecordKey {
    RecordKey::from(result.last_insert_id.unwrap())
}

fn add_user(repo: &SqliteRecordRepository, name: &str, role: &str) -> RecordKey {
    key_of(
        repo.add(&Record::new().with("name", name).with("role", role))
            .unwrap(),
    )
}

fn names(records: &[Record]) -> Vec<String> {
    records
        .iter()
        .map(|record| record.get("name").and_then(FieldValue::as_str).unwrap().to_string())
        .collect()
}

#[test]
fn add_fills_created_and_updated_with_same_timestamp() {
    let repo = default_repo();

    let result = repo.add(&Record::new().with("name", "Ana")).unwrap();
    assert_eq!(result.rows_affected, 1);

    let row = repo.one(&key_of(result)).unwrap().unwrap();
    let created = row.get("created_at").unwrap();
    let updated = row.get("updated_at").unwrap();
    assert_eq!(created, updated);
    assert_eq!(created.as_str().map(str::len), Some(19));
    assert_eq!(row.get("deleted"), Some(&FieldValue::Integer(0)));
    assert_eq!(row.get("deleted_at"), Some(&FieldValue::Null));
}

#[test]
fn add_keeps_caller_supplied_timestamps() {
    let repo = default_repo();

    let data = Record::new()
        .with("name", "Ana")
        .with("created_at", "2001-02-03 04:05:06");
    let id = key_of(repo.add(&data).unwrap());

    let row = repo.one(&id).unwrap().unwrap();
    assert_eq!(
        row.get("created_at").and_then(FieldValue::as_str),
        Some("2001-02-03 04:05:06")
    );
    assert_ne!(row.get("updated_at"), row.get("created_at"));
}

#[test]
fn add_and_update_reject_empty_data() {
    let repo = default_repo();

    assert!(matches!(
        repo.add(&Record::new()),
        Err(RepoError::Validation(_))
    ));
    for id in [RecordKey::from(1), RecordKey::from("missing")] {
        assert!(matches!(
            repo.update(&id, &Record::new()),
            Err(RepoError::Validation(_))
        ));
    }
    assert_eq!(repo.count().unwrap(), 0);
}

#[test]
fn add_serialized_coerces_structs() {
    #[derive(Serialize)]
    struct NewUser {
        name: String,
        role: Option<String>,
    }

    let repo = default_repo();
    let id = key_of(
        repo.add_serialized(&NewUser {
            name: "Ana".to_string(),
            role: None,
        })
        .unwrap(),
    );

    let row = repo.one(&id).unwrap().unwrap();
    assert_eq!(row.get("name").and_then(FieldValue::as_str), Some("Ana"));
    assert_eq!(row.get("role"), Some(&FieldValue::Null));

    let err = repo
        .add_serialized(&serde_json::json!({ "name": { "first": "Ana" } }))
        .unwrap_err();
    assert!(matches!(err, RepoError::Validation(_)));
}

#[test]
fn values_are_bound_not_interpolated() {
    let repo = default_repo();
    let hostile = "Robert'); DROP TABLE users; --";

    let id = key_of(repo.add(&Record::new().with("name", hostile)).unwrap());

    let row = repo.one(&id).unwrap().unwrap();
    assert_eq!(row.get("name").and_then(FieldValue::as_str), Some(hostile));
    assert_eq!(repo.count().unwrap(), 1);
}

#[test]
fn update_changes_columns_and_bumps_updated_at() {
    let repo = default_repo();
    let id = key_of(
        repo.add(
            &Record::new()
                .with("name", "Ana")
                .with("created_at", "2000-01-01 00:00:00")
                .with("updated_at", "2000-01-01 00:00:00"),
        )
        .unwrap(),
    );

    let result = repo
        .update(&id, &Record::new().with("role", "admin"))
        .unwrap();
    assert_eq!(result.rows_affected, 1);
    assert_eq!(result.last_insert_id, None);

    let row = repo.one(&id).unwrap().unwrap();
    assert_eq!(row.get("role").and_then(FieldValue::as_str), Some("admin"));
    assert_eq!(
        row.get("created_at").and_then(FieldValue::as_str),
        Some("2000-01-01 00:00:00")
    );
    assert_ne!(
        row.get("updated_at").and_then(FieldValue::as_str),
        Some("2000-01-01 00:00:00")
    );
}

#[test]
fn update_missing_row_reports_zero_rows() {
    let repo = default_repo();
    let result = repo
        .update(&RecordKey::from(404), &Record::new().with("name", "ghost"))
        .unwrap();
    assert_eq!(result.rows_affected, 0);
}

#[test]
fn read_returns_all_rows_or_a_page() {
    let repo = default_repo();
    for name in ["a", "b", "c", "d", "e"] {
        add_user(&repo, name, "user");
    }

    assert_eq!(repo.read(Page::all()).unwrap().len(), 5);
    assert_eq!(repo.read(Page::new(0, 0)).unwrap().len(), 5);
    assert_eq!(repo.read(Page::new(-1, 0)).unwrap().len(), 5);
    assert_eq!(repo.read(Page::new(2, 0)).unwrap().len(), 2);
    assert_eq!(repo.read(Page::new(10, 3)).unwrap().len(), 2);
    assert_eq!(repo.read(Page::new(0, 3)).unwrap().len(), 5);
    assert_eq!(repo.read(Page::new(-1, 4)).unwrap().len(), 5);
}

#[test]
fn read_ordered_sorts_and_paginates() {
    let repo = default_repo();
    for name in ["carol", "alice", "bob", "dave"] {
        add_user(&repo, name, "user");
    }

    let ascending = repo
        .read_ordered("name", SortDirection::Asc, Page::all())
        .unwrap();
    assert_eq!(names(&ascending), ["alice", "bob", "carol", "dave"]);

    let page = repo
        .read_ordered("name", SortDirection::Desc, Page::new(2, 1))
        .unwrap();
    assert_eq!(names(&page), ["carol", "bob"]);

    let direction: SortDirection = "asc".parse().unwrap();
    let offset_ignored = repo.read_ordered("name", direction, Page::new(0, 3)).unwrap();
    assert_eq!(names(&offset_ignored), ["alice", "bob", "carol", "dave"]);
}

#[test]
fn read_ordered_rejects_non_identifier_columns() {
    let repo = default_repo();
    add_user(&repo, "alice", "user");

    let err = repo
        .read_ordered("name; DROP TABLE users", SortDirection::Asc, Page::all())
        .unwrap_err();
    assert!(matches!(err, RepoError::Validation(_)));
    assert_eq!(repo.count().unwrap(), 1);
}

#[test]
fn find_many_combines_filters_with_and() {
    let repo = default_repo();
    add_user(&repo, "Ana", "admin");
    add_user(&repo, "Ana", "user");
    add_user(&repo, "Bea", "admin");

    let filters = Record::new().with("name", "Ana").with("role", "admin");
    let rows = repo.find_many(&filters, Page::all(), None).unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].get("role").and_then(FieldValue::as_str), Some("admin"));
    assert_eq!(rows[0].get("name").and_then(FieldValue::as_str), Some("Ana"));

    let admins = repo
        .find_many(
            &Record::new().with("role", "admin"),
            Page::all(),
            Some(OrderBy::desc("name")),
        )
        .unwrap();
    assert_eq!(names(&admins), ["Bea", "Ana"]);

    let none = repo
        .find_many(&Record::new().with("name", "Zoe"), Page::all(), None)
        .unwrap();
    assert!(none.is_empty());
}

#[test]
fn find_many_pages_results_and_matches_nulls() {
    let repo = default_repo();
    for name in ["a", "b", "c"] {
        repo.add(&Record::new().with("name", name)).unwrap();
    }
    add_user(&repo, "d", "admin");

    let without_role = repo
        .find_many(
            &Record::new().with("role", FieldValue::Null),
            Page::new(2, 0),
            Some(OrderBy::asc("name")),
        )
        .unwrap();
    assert_eq!(names(&without_role), ["a", "b"]);
}

#[test]
fn exists_tracks_primary_key() {
    let repo = default_repo();
    let id = add_user(&repo, "Ana", "user");

    assert!(repo.exists(&id).unwrap());
    assert!(repo.exists(&RecordKey::from(id.to_string())).unwrap());
    assert!(!repo.exists(&RecordKey::from(999)).unwrap());
}

#[test]
fn integer_keys_are_parsed_and_validated() {
    let repo = users_repo(RepositoryConfig::new("users", "id").with_key_kind(KeyKind::Integer));
    let id = add_user(&repo, "Ana", "user");

    assert!(repo.one(&RecordKey::from(id.to_string())).unwrap().is_some());
    assert!(matches!(
        repo.one(&RecordKey::from("abc")),
        Err(RepoError::Validation(_))
    ));
}

#[test]
fn integer_date_format_stores_unix_seconds() {
    let conn = open_db_in_memory().unwrap();
    conn.execute_batch(
        "CREATE TABLE events (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            created_at INTEGER,
            updated_at INTEGER,
            deleted_at INTEGER,
            deleted INTEGER NOT NULL DEFAULT 0
        );",
    )
    .unwrap();
    let config = RepositoryConfig::new("events", "id").with_date_format(DateFormat::Integer);
    let repo = SqliteRecordRepository::try_new(conn, config).unwrap();
    let id = key_of(repo.add(&Record::new().with("name", "deploy")).unwrap());

    let row = repo.one(&id).unwrap().unwrap();
    let created = row.get("created_at").and_then(FieldValue::as_i64).unwrap();
    assert!(created > 1_700_000_000);
    assert_eq!(row.get("updated_at"), Some(&FieldValue::Integer(created)));
    assert_eq!(
        repo.format_date(Some(1_700_000_000)).unwrap(),
        FieldValue::Integer(1_700_000_000)
    );
}

#[test]
fn repository_format_date_follows_config() {
    let repo =
        users_repo(RepositoryConfig::new("users", "id").with_date_format(DateFormat::DateOnly));
    assert_eq!(
        repo.format_date(Some(1_700_000_000)).unwrap(),
        FieldValue::Text("2023-11-14".to_string())
    );
}

#[test]
fn tables_without_bookkeeping_columns_work_when_disabled() {
    let conn = open_db_in_memory().unwrap();
    conn.execute_batch("CREATE TABLE tags (slug TEXT PRIMARY KEY NOT NULL, label TEXT);")
        .unwrap();
    let config = RepositoryConfig::new("tags", "slug")
        .with_soft_deletes(false)
        .with_timestamps(false);
    let repo = SqliteRecordRepository::try_new(conn, config).unwrap();

    repo.add(&Record::new().with("slug", "rust").with("label", "Rust"))
        .unwrap();

    let row = repo.one(&RecordKey::from("rust")).unwrap().unwrap();
    assert_eq!(row.len(), 2);
    assert_eq!(row.get("label").and_then(FieldValue::as_str), Some("Rust"));
}

#[test]
fn try_new_rejects_invalid_config_and_missing_schema() {
    let conn = open_db_in_memory().unwrap();
    let err = SqliteRecordRepository::try_new(conn, RepositoryConfig::new("", "id"))
        .err()
        .unwrap();
    assert!(matches!(err, RepoError::Config(_)));

    let conn = open_db_in_memory().unwrap();
    let err = SqliteRecordRepository::try_new(conn, RepositoryConfig::new("users", "id"))
        .err()
        .unwrap();
    assert!(matches!(err, RepoError::MissingRequiredTable(table) if table == "users"));

    let conn = open_db_in_memory().unwrap();
    conn.execute_batch("CREATE TABLE users (id INTEGER PRIMARY KEY, name TEXT);")
        .unwrap();
    let err = SqliteRecordRepository::try_new(conn, RepositoryConfig::new("users", "id"))
        .err()
        .unwrap();
    assert!(matches!(
        err,
        RepoError::MissingRequiredColumn { column, .. } if column == "created_at"
    ));
}

#[test]
fn driver_errors_propagate_unchanged() {
    let repo = default_repo();

    let err = repo
        .add(&Record::new().with("nickname", "ana"))
        .unwrap_err();
    assert!(matches!(err, RepoError::Db(_)));

    let err = repo.add(&Record::new().with("role", "admin")).unwrap_err();
    match err {
        RepoError::Db(inner) => assert!(inner.to_string().contains("NOT NULL")),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn into_connection_hands_back_the_connection() {
    let repo = default_repo();
    add_user(&repo, "Ana", "user");

    let conn = repo.into_connection();
    let total: i64 = conn
        .query_row("SELECT COUNT(*) FROM users;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(total, 1);
}
