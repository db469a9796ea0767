//! Asset registry queries
//!
//! Areas, subclassifications and tangible assets. The count-plan workflow
//! reads these tables but only the registry writes them.

use crate::db::models::{Area, Asset, AssetFilter, NewAsset, Subclassification};
use crate::uuid_utils::{generate, parse_stored};
use crate::{time, Error, Result};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection};
use uuid::Uuid;

const ASSET_SELECT: &str = r#"
    SELECT a.id, a.code, a.name, a.active, a.area_id, ar.name AS area_name,
           a.subclasificacion_id, s.name AS subclasificacion_name, a.created_at
    FROM activos a
    JOIN areas ar ON ar.id = a.area_id
    JOIN subclasificaciones s ON s.id = a.subclasificacion_id
"#;

/// Map a row produced by [`ASSET_SELECT`] (or a query with the same columns)
pub fn asset_from_row(row: &SqliteRow) -> Result<Asset> {
    Ok(Asset {
        id: parse_stored("activos.id", &row.get::<String, _>("id"))?,
        code: row.get("code"),
        name: row.get("name"),
        active: row.get("active"),
        area_id: parse_stored("activos.area_id", &row.get::<String, _>("area_id"))?,
        area_name: row.get("area_name"),
        subclassification_id: parse_stored(
            "activos.subclasificacion_id",
            &row.get::<String, _>("subclasificacion_id"),
        )?,
        subclassification_name: row.get("subclasificacion_name"),
        created_at: row.get("created_at"),
    })
}

fn required_name(kind: &str, name: &str) -> Result<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(Error::InvalidInput(format!("{} name must not be empty", kind)));
    }
    Ok(trimmed.to_string())
}

fn map_duplicate(err: sqlx::Error, what: String) -> Error {
    let err = Error::Database(err);
    if err.is_unique_violation() {
        Error::InvalidInput(format!("{} already exists", what))
    } else {
        err
    }
}

// ========================================
// Areas
// ========================================

pub async fn create_area(conn: &mut SqliteConnection, name: &str) -> Result<Area> {
    let name = required_name("Area", name)?;
    let id = generate();

    sqlx::query("INSERT INTO areas (id, name, created_at) VALUES (?, ?, ?)")
        .bind(id.to_string())
        .bind(&name)
        .bind(time::now())
        .execute(&mut *conn)
        .await
        .map_err(|e| map_duplicate(e, format!("Area '{}'", name)))?;

    tracing::info!(area_id = %id, name = %name, "Area created");
    Ok(Area { id, name })
}

pub async fn list_areas(conn: &mut SqliteConnection) -> Result<Vec<Area>> {
    let rows = sqlx::query("SELECT id, name FROM areas ORDER BY name")
        .fetch_all(&mut *conn)
        .await?;

    rows.iter()
        .map(|row| -> Result<Area> {
            Ok(Area {
                id: parse_stored("areas.id", &row.get::<String, _>("id"))?,
                name: row.get("name"),
            })
        })
        .collect()
}

// ========================================
// Subclassifications
// ========================================

pub async fn create_subclassification(
    conn: &mut SqliteConnection,
    name: &str,
) -> Result<Subclassification> {
    let name = required_name("Subclassification", name)?;
    let id = generate();

    sqlx::query("INSERT INTO subclasificaciones (id, name, created_at) VALUES (?, ?, ?)")
        .bind(id.to_string())
        .bind(&name)
        .bind(time::now())
        .execute(&mut *conn)
        .await
        .map_err(|e| map_duplicate(e, format!("Subclassification '{}'", name)))?;

    tracing::info!(subclassification_id = %id, name = %name, "Subclassification created");
    Ok(Subclassification { id, name })
}

pub async fn list_subclassifications(conn: &mut SqliteConnection) -> Result<Vec<Subclassification>> {
    let rows = sqlx::query("SELECT id, name FROM subclasificaciones ORDER BY name")
        .fetch_all(&mut *conn)
        .await?;

    rows.iter()
        .map(|row| -> Result<Subclassification> {
            Ok(Subclassification {
                id: parse_stored("subclasificaciones.id", &row.get::<String, _>("id"))?,
                name: row.get("name"),
            })
        })
        .collect()
}

// ========================================
// Assets
// ========================================

/// Register a new asset
///
/// Fails with `NotFound` when the area or subclassification does not exist
/// and `InvalidInput` when the code is already taken.
pub async fn create_asset(conn: &mut SqliteConnection, input: &NewAsset) -> Result<Asset> {
    let code = required_name("Asset code", &input.code)?;
    let name = required_name("Asset", &input.name)?;

    let area_exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM areas WHERE id = ?)")
        .bind(input.area_id.to_string())
        .fetch_one(&mut *conn)
        .await?;
    if !area_exists {
        return Err(Error::NotFound(format!("Area {}", input.area_id)));
    }

    let subclass_exists: bool =
        sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM subclasificaciones WHERE id = ?)")
            .bind(input.subclassification_id.to_string())
            .fetch_one(&mut *conn)
            .await?;
    if !subclass_exists {
        return Err(Error::NotFound(format!(
            "Subclassification {}",
            input.subclassification_id
        )));
    }

    let id = generate();
    let now = time::now();

    sqlx::query(
        r#"
        INSERT INTO activos (id, code, name, active, area_id, subclasificacion_id, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(id.to_string())
    .bind(&code)
    .bind(&name)
    .bind(input.active)
    .bind(input.area_id.to_string())
    .bind(input.subclassification_id.to_string())
    .bind(now)
    .bind(now)
    .execute(&mut *conn)
    .await
    .map_err(|e| map_duplicate(e, format!("Asset code '{}'", code)))?;

    tracing::info!(asset_id = %id, code = %code, "Asset registered");

    get_asset(conn, id)
        .await?
        .ok_or(Error::Database(sqlx::Error::RowNotFound))
}

pub async fn get_asset(conn: &mut SqliteConnection, id: Uuid) -> Result<Option<Asset>> {
    let sql = format!("{} WHERE a.id = ?", ASSET_SELECT);
    let row = sqlx::query(&sql)
        .bind(id.to_string())
        .fetch_optional(&mut *conn)
        .await?;

    row.as_ref().map(asset_from_row).transpose()
}

/// List assets ordered by code
pub async fn list_assets(conn: &mut SqliteConnection, filter: &AssetFilter) -> Result<Vec<Asset>> {
    let sql = format!(
        "{} WHERE (? IS NULL OR a.active = ?) AND (? IS NULL OR a.area_id = ?) ORDER BY a.code",
        ASSET_SELECT
    );
    let area = filter.area_id.map(|id| id.to_string());

    let rows = sqlx::query(&sql)
        .bind(filter.active)
        .bind(filter.active)
        .bind(&area)
        .bind(&area)
        .fetch_all(&mut *conn)
        .await?;

    rows.iter().map(asset_from_row).collect()
}

/// All assets currently active in the registry
pub async fn list_active_assets(conn: &mut SqliteConnection) -> Result<Vec<Asset>> {
    list_assets(
        conn,
        &AssetFilter {
            active: Some(true),
            area_id: None,
        },
    )
    .await
}

/// Set the registry-level active flag
pub async fn set_asset_active(conn: &mut SqliteConnection, id: Uuid, active: bool) -> Result<Asset> {
    let result = sqlx::query("UPDATE activos SET active = ?, updated_at = ? WHERE id = ?")
        .bind(active)
        .bind(time::now())
        .bind(id.to_string())
        .execute(&mut *conn)
        .await?;

    if result.rows_affected() == 0 {
        return Err(Error::NotFound(format!("Asset {}", id)));
    }

    tracing::info!(asset_id = %id, active, "Asset registry state changed");

    get_asset(conn, id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("Asset {}", id)))
}
