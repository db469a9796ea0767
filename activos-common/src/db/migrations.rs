//! Versioned schema migrations
//!
//! Each migration runs once, in its own transaction, and records its version
//! in `schema_version`. Published migrations are never edited; schema
//! changes always arrive as a new entry in [`MIGRATIONS`].

use crate::Result;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info, warn};

/// Highest version known to this build
pub const CURRENT_SCHEMA_VERSION: i32 = 2;

struct Migration {
    version: i32,
    description: &'static str,
}

const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        description: "lookup indexes for month membership and area grouping",
    },
    Migration {
        version: 2,
        description: "started_at column on planes_conteo",
    },
];

/// Highest applied version; 0 for a database that predates versioning
pub async fn get_schema_version(pool: &SqlitePool) -> Result<i32> {
    let tracked: bool = sqlx::query_scalar(
        "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = 'schema_version')",
    )
    .fetch_one(pool)
    .await?;

    if !tracked {
        return Ok(0);
    }

    let version: Option<i32> = sqlx::query_scalar("SELECT MAX(version) FROM schema_version")
        .fetch_one(pool)
        .await?;

    Ok(version.unwrap_or(0))
}

/// Apply every migration newer than the stored version
pub async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    let current = get_schema_version(pool).await?;

    if current > CURRENT_SCHEMA_VERSION {
        warn!(
            stored = current,
            known = CURRENT_SCHEMA_VERSION,
            "Database schema is newer than this build; continuing without migrating"
        );
        return Ok(());
    }

    let pending: Vec<&Migration> = MIGRATIONS.iter().filter(|m| m.version > current).collect();
    if pending.is_empty() {
        debug!(version = current, "Database schema is up to date");
        return Ok(());
    }

    for migration in pending {
        info!(version = migration.version, "Applying migration: {}", migration.description);

        let mut tx = pool.begin().await?;
        apply(&mut *tx, migration.version).await?;
        sqlx::query("INSERT INTO schema_version (version) VALUES (?)")
            .bind(migration.version)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
    }

    info!(version = CURRENT_SCHEMA_VERSION, "Database schema migrated");
    Ok(())
}

async fn apply(conn: &mut SqliteConnection, version: i32) -> Result<()> {
    match version {
        1 => {
            for statement in [
                "CREATE INDEX IF NOT EXISTS idx_asignacion_activos_assignment ON asignacion_activos(assignment_id)",
                "CREATE INDEX IF NOT EXISTS idx_activos_area ON activos(area_id, subclasificacion_id)",
                "CREATE INDEX IF NOT EXISTS idx_registros_asset ON registros_conteo(asset_id)",
            ] {
                sqlx::query(statement).execute(&mut *conn).await?;
            }
        }
        2 => {
            // Tables created by this build already carry the column
            let present: i64 = sqlx::query_scalar(
                "SELECT COUNT(*) FROM pragma_table_info('planes_conteo') WHERE name = 'started_at'",
            )
            .fetch_one(&mut *conn)
            .await?;

            if present == 0 {
                sqlx::query("ALTER TABLE planes_conteo ADD COLUMN started_at TIMESTAMP")
                    .execute(&mut *conn)
                    .await?;
            }
        }
        _ => {}
    }
    Ok(())
}
