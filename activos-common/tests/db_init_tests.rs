//! Tests for database initialization and migrations
//!
//! - Automatic database creation with default schema
//! - Idempotent re-open of an existing database
//! - Migration version tracking

use activos_common::db::{get_schema_version, init_database, init_memory_database, CURRENT_SCHEMA_VERSION};

async fn table_names(pool: &sqlx::SqlitePool) -> Vec<String> {
    sqlx::query_scalar(
        "SELECT name FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
    )
    .fetch_all(pool)
    .await
    .expect("Should list tables")
}

#[tokio::test]
async fn test_database_creation_when_missing() {
    let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
    let db_path = temp_dir.path().join("nested").join("activos.db");

    let result = init_database(&db_path).await;

    assert!(result.is_ok(), "Database initialization failed: {:?}", result.err());
    assert!(db_path.exists(), "Database file was not created");
}

#[tokio::test]
async fn test_database_opens_existing() {
    let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
    let db_path = temp_dir.path().join("activos.db");

    let pool1 = init_database(&db_path).await.expect("First init should succeed");
    pool1.close().await;

    let pool2 = init_database(&db_path).await;
    assert!(pool2.is_ok(), "Failed to open existing database: {:?}", pool2.err());
}

#[tokio::test]
async fn test_all_tables_created() {
    let pool = init_memory_database().await.expect("Should init in-memory database");

    let tables = table_names(&pool).await;
    for expected in [
        "activos",
        "areas",
        "asignacion_activos",
        "asignaciones_mensuales",
        "planes_conteo",
        "registros_conteo",
        "schema_version",
        "subclasificaciones",
    ] {
        assert!(tables.contains(&expected.to_string()), "Missing table {}", expected);
    }
}

#[tokio::test]
async fn test_schema_version_is_current_after_init() {
    let pool = init_memory_database().await.expect("Should init in-memory database");

    let version = get_schema_version(&pool).await.expect("Should read version");
    assert_eq!(version, CURRENT_SCHEMA_VERSION);
}

#[tokio::test]
async fn test_migrations_are_idempotent() {
    let pool = init_memory_database().await.expect("Should init in-memory database");

    activos_common::db::create_schema(&pool)
        .await
        .expect("Second schema pass should be a no-op");

    let rows: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM schema_version")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(rows, CURRENT_SCHEMA_VERSION as i64);
}
