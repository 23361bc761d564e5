use eagleeye_core::db::migrations::latest_version;
use eagleeye_core::{
    AgentRepository, DatabaseConfig, DbError, NewAgent, SchemaInitializer, SqliteAgentRepository,
};
use rusqlite::Connection;
use std::path::Path;

fn config_for(path: &Path) -> DatabaseConfig {
    DatabaseConfig::new(path.to_str().unwrap())
}

#[test]
fn first_call_creates_schema_and_second_call_finds_it() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("roster.sqlite3");
    let initializer = SchemaInitializer::new(config_for(&path));

    let first = initializer.ensure_ready().unwrap();
    assert!(first.created);
    assert!(!first.reset);
    assert!(first.can_connect);
    assert_eq!(first.migrations_applied, 1);
    assert_eq!(first.schema_version, latest_version());

    let second = initializer.ensure_ready().unwrap();
    assert!(!second.created);
    assert_eq!(second.migrations_applied, 0);
    assert!(second.can_connect);
    assert_eq!(second.schema_version, latest_version());

    let conn = Connection::open(&path).unwrap();
    assert_table_exists(&conn, "agents");
    assert_index_is_unique(&conn, "ix_agents_codename");
}

#[test]
fn data_survives_repeated_initialization() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_for(&dir.path().join("roster.sqlite3"));
    let initializer = SchemaInitializer::new(config.clone());
    let repo = SqliteAgentRepository::new(config);

    initializer.ensure_ready().unwrap();
    let created = repo
        .add_agent(&NewAgent::new("GHOST", "Sam Lee", "Seoul", "Missing"))
        .unwrap();
    initializer.ensure_ready().unwrap();

    assert_eq!(repo.get_all_agents().unwrap(), vec![created]);
}

#[test]
fn reset_on_start_drops_existing_rows_only_when_enabled() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_for(&dir.path().join("roster.sqlite3"));
    let repo = SqliteAgentRepository::new(config.clone());

    SchemaInitializer::new(config.clone()).ensure_ready().unwrap();
    repo.add_agent(&NewAgent::new("WREN", "Kit Moss", "Dublin", "Active"))
        .unwrap();

    let reset = SchemaInitializer::new(config.with_reset_on_start(true))
        .ensure_ready()
        .unwrap();
    assert!(reset.reset);
    assert!(reset.created);
    assert!(repo.get_all_agents().unwrap().is_empty());

    // The unique index must come back with the table.
    repo.add_agent(&NewAgent::new("WREN", "Kit Moss", "Dublin", "Active"))
        .unwrap();
    assert!(repo
        .add_agent(&NewAgent::new("WREN", "Other", "Paris", "Active"))
        .is_err());
}

#[test]
fn newer_schema_version_is_refused() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("future.sqlite3");

    let conn = Connection::open(&path).unwrap();
    conn.execute_batch("PRAGMA user_version = 999;").unwrap();
    drop(conn);

    let err = SchemaInitializer::new(config_for(&path))
        .ensure_ready()
        .unwrap_err();
    match err {
        DbError::UnsupportedSchemaVersion {
            db_version,
            latest_supported,
        } => {
            assert_eq!(db_version, 999);
            assert_eq!(latest_supported, latest_version());
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn pre_existing_table_missing_a_column_fails_verification() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("legacy.sqlite3");

    let conn = Connection::open(&path).unwrap();
    conn.execute_batch(
        "CREATE TABLE agents (
            id INTEGER PRIMARY KEY,
            codename TEXT NOT NULL,
            realname TEXT NOT NULL,
            location TEXT NOT NULL,
            status TEXT NOT NULL
        );",
    )
    .unwrap();
    drop(conn);

    let err = SchemaInitializer::new(config_for(&path))
        .ensure_ready()
        .unwrap_err();
    assert!(matches!(
        err,
        DbError::MissingRequiredColumn {
            table: "agents",
            column: "missionscompleted"
        }
    ));

    // Verification runs before commit, so nothing was half-applied.
    let conn = Connection::open(&path).unwrap();
    assert_eq!(user_version(&conn), 0);
    assert!(!index_exists(&conn, "ix_agents_codename"));
}

#[test]
fn dropped_table_is_recreated_even_when_version_is_current() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("roster.sqlite3");
    let initializer = SchemaInitializer::new(config_for(&path));
    initializer.ensure_ready().unwrap();

    let conn = Connection::open(&path).unwrap();
    conn.execute_batch("DROP TABLE agents;").unwrap();
    assert_eq!(user_version(&conn), latest_version());

    let status = initializer.ensure_ready().unwrap();
    assert!(status.created);
    assert_eq!(status.migrations_applied, 0);
    assert_table_exists(&conn, "agents");
    assert_index_is_unique(&conn, "ix_agents_codename");
}

#[test]
fn dropped_unique_index_is_restored_and_enforced() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("roster.sqlite3");
    let config = config_for(&path);
    let initializer = SchemaInitializer::new(config.clone());
    initializer.ensure_ready().unwrap();

    let conn = Connection::open(&path).unwrap();
    conn.execute_batch("DROP INDEX ix_agents_codename;").unwrap();

    let status = initializer.ensure_ready().unwrap();
    assert!(!status.created);
    assert_index_is_unique(&conn, "ix_agents_codename");

    let repo = SqliteAgentRepository::new(config);
    repo.add_agent(&NewAgent::new("DUP", "First", "Oslo", "Active"))
        .unwrap();
    assert!(repo
        .add_agent(&NewAgent::new("DUP", "Second", "Rome", "Active"))
        .is_err());
}

#[test]
fn non_unique_code_name_index_fails_verification() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("roster.sqlite3");
    let initializer = SchemaInitializer::new(config_for(&path));
    initializer.ensure_ready().unwrap();

    let conn = Connection::open(&path).unwrap();
    conn.execute_batch(
        "DROP INDEX ix_agents_codename;
         CREATE INDEX ix_agents_codename ON agents (codename);",
    )
    .unwrap();

    let err = initializer.ensure_ready().unwrap_err();
    assert!(matches!(
        err,
        DbError::MissingUniqueIndex {
            table: "agents",
            column: "codename"
        }
    ));
}

#[test]
fn unreachable_store_fails_initialization() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("missing").join("roster.sqlite3");

    let err = SchemaInitializer::new(config_for(&path))
        .ensure_ready()
        .unwrap_err();
    assert!(matches!(err, DbError::Sqlite(_)));
}

#[test]
fn shared_memory_uri_keeps_data_while_a_session_is_held() {
    let config = DatabaseConfig::new("file:schema_init_shared?mode=memory&cache=shared");
    let keeper = Connection::open(config.connection_string()).unwrap();

    SchemaInitializer::new(config.clone()).ensure_ready().unwrap();
    let repo = SqliteAgentRepository::new(config);
    repo.add_agent(&NewAgent::new("MIST", "Ivy Park", "Lima", "Injured"))
        .unwrap();

    assert_eq!(repo.get_all_agents().unwrap().len(), 1);
    drop(keeper);
}

fn assert_table_exists(conn: &Connection, table_name: &str) {
    let exists: i64 = conn
        .query_row(
            "SELECT EXISTS(
                SELECT 1
                FROM sqlite_master
                WHERE type = 'table' AND name = ?1
            );",
            [table_name],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(exists, 1, "table {table_name} does not exist");
}

fn assert_index_is_unique(conn: &Connection, index_name: &str) {
    let unique: i64 = conn
        .query_row(
            "SELECT \"unique\" FROM pragma_index_list('agents') WHERE name = ?1;",
            [index_name],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(unique, 1, "index {index_name} is not unique");
}

fn user_version(conn: &Connection) -> u32 {
    conn.query_row("PRAGMA user_version;", [], |row| row.get(0))
        .unwrap()
}

fn index_exists(conn: &Connection, index_name: &str) -> bool {
    let exists: i64 = conn
        .query_row(
            "SELECT EXISTS(
                SELECT 1
                FROM sqlite_master
                WHERE type = 'index' AND name = ?1
            );",
            [index_name],
            |row| row.get(0),
        )
        .unwrap();
    exists == 1
}
