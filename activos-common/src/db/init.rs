//! Database initialization
//!
//! Creates the SQLite database on first run and brings the schema up to date
//! on every startup. All table creation is idempotent.

use crate::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use tracing::info;

/// How long a writer waits on a locked database before failing
const BUSY_TIMEOUT: Duration = Duration::from_millis(5000);

/// Initialize database connection and create tables if needed
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    // Create parent directory if it doesn't exist
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    // WAL allows concurrent readers with one writer; foreign keys are
    // enforced on every pooled connection, not just the first one
    let options = SqliteConnectOptions::from_str(&format!("sqlite://{}", db_path.display()))?
        .create_if_missing(true)
        .foreign_keys(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(BUSY_TIMEOUT);

    let pool = SqlitePoolOptions::new()
        .max_connections(10)
        .min_connections(1)
        .connect_with(options)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    create_schema(&pool).await?;

    Ok(pool)
}

/// Initialize a private in-memory database
///
/// Limited to a single connection that is never recycled, because every
/// SQLite `:memory:` connection is a separate database.
pub async fn init_memory_database() -> Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await?;

    create_schema(&pool).await?;

    Ok(pool)
}

/// Create all tables then run versioned migrations
pub async fn create_schema(pool: &SqlitePool) -> Result<()> {
    create_schema_version_table(pool).await?;

    // Asset registry
    create_areas_table(pool).await?;
    create_subclassifications_table(pool).await?;
    create_assets_table(pool).await?;

    // Annual count plan
    create_plans_table(pool).await?;
    create_assignments_table(pool).await?;
    create_assignment_assets_table(pool).await?;
    create_count_records_table(pool).await?;

    crate::db::migrations::run_migrations(pool).await?;

    Ok(())
}

async fn create_schema_version_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_areas_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS areas (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL UNIQUE,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_subclassifications_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS subclasificaciones (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL UNIQUE,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_assets_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS activos (
            id TEXT PRIMARY KEY,
            code TEXT NOT NULL UNIQUE,
            name TEXT NOT NULL,
            active INTEGER NOT NULL DEFAULT 1,
            area_id TEXT NOT NULL REFERENCES areas(id),
            subclasificacion_id TEXT NOT NULL REFERENCES subclasificaciones(id),
            created_at TIMESTAMP NOT NULL,
            updated_at TIMESTAMP NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_plans_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS planes_conteo (
            id TEXT PRIMARY KEY,
            year INTEGER NOT NULL UNIQUE,
            start_date TEXT NOT NULL,
            end_date TEXT NOT NULL,
            state TEXT NOT NULL DEFAULT 'draft',
            total_assets INTEGER NOT NULL,
            target_per_month INTEGER NOT NULL,
            tolerance_min INTEGER NOT NULL,
            tolerance_max INTEGER NOT NULL,
            created_by TEXT NOT NULL,
            observations TEXT,
            created_at TIMESTAMP NOT NULL,
            started_at TIMESTAMP,
            finalized_at TIMESTAMP,
            finalization_reason TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_assignments_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS asignaciones_mensuales (
            id TEXT PRIMARY KEY,
            plan_id TEXT NOT NULL REFERENCES planes_conteo(id) ON DELETE CASCADE,
            month_index INTEGER NOT NULL CHECK (month_index BETWEEN 1 AND 10),
            calendar_month INTEGER NOT NULL CHECK (calendar_month BETWEEN 1 AND 12),
            year INTEGER NOT NULL,
            assigned_count INTEGER NOT NULL DEFAULT 0,
            state TEXT NOT NULL DEFAULT 'pendiente',
            start_date TEXT NOT NULL,
            deadline TEXT NOT NULL,
            counted_count INTEGER NOT NULL DEFAULT 0,
            found_count INTEGER NOT NULL DEFAULT 0,
            missing_count INTEGER NOT NULL DEFAULT 0,
            discrepancy_count INTEGER NOT NULL DEFAULT 0,
            confirmed INTEGER NOT NULL DEFAULT 0,
            confirmed_by TEXT,
            confirmed_at TIMESTAMP,
            UNIQUE (plan_id, month_index)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Membership of an asset in one month of a plan
///
/// The primary key makes double assignment within a plan impossible.
async fn create_assignment_assets_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS asignacion_activos (
            plan_id TEXT NOT NULL REFERENCES planes_conteo(id) ON DELETE CASCADE,
            assignment_id TEXT NOT NULL REFERENCES asignaciones_mensuales(id) ON DELETE CASCADE,
            asset_id TEXT NOT NULL REFERENCES activos(id),
            assigned_at TIMESTAMP NOT NULL,
            PRIMARY KEY (plan_id, asset_id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Count records; UNIQUE (assignment_id, asset_id) is what serializes
/// concurrent registrations of the same asset
async fn create_count_records_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS registros_conteo (
            id TEXT PRIMARY KEY,
            assignment_id TEXT NOT NULL REFERENCES asignaciones_mensuales(id) ON DELETE CASCADE,
            asset_id TEXT NOT NULL REFERENCES activos(id),
            found INTEGER NOT NULL,
            found_location TEXT,
            found_condition TEXT,
            found_area_id TEXT REFERENCES areas(id),
            has_discrepancy INTEGER NOT NULL DEFAULT 0,
            discrepancy_type TEXT,
            discrepancy_description TEXT,
            comments TEXT,
            counted_by TEXT NOT NULL,
            counted_at TIMESTAMP NOT NULL,
            updated_at TIMESTAMP NOT NULL,
            state TEXT NOT NULL DEFAULT 'activo',
            UNIQUE (assignment_id, asset_id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}
