//! Count record persistence

use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection};
use uuid::Uuid;

use super::{opt_uuid_col, uuid_col};
use crate::error::ConteoResult;
use crate::models::{CountRecord, DiscrepancyType, RecordState};

const RECORD_COLUMNS: &str = r#"
    id, assignment_id, asset_id, found, found_location, found_condition,
    found_area_id, has_discrepancy, discrepancy_type, discrepancy_description,
    comments, counted_by, counted_at, updated_at, state
"#;

fn record_from_row(row: &SqliteRow) -> ConteoResult<CountRecord> {
    let state: String = row.get("state");
    let discrepancy_type = row
        .get::<Option<String>, _>("discrepancy_type")
        .map(|s| s.parse::<DiscrepancyType>())
        .transpose()?;

    Ok(CountRecord {
        id: uuid_col(row, "id")?,
        assignment_id: uuid_col(row, "assignment_id")?,
        asset_id: uuid_col(row, "asset_id")?,
        found: row.get("found"),
        found_location: row.get("found_location"),
        found_condition: row.get("found_condition"),
        found_area_id: opt_uuid_col(row, "found_area_id")?,
        has_discrepancy: row.get("has_discrepancy"),
        discrepancy_type,
        discrepancy_description: row.get("discrepancy_description"),
        comments: row.get("comments"),
        counted_by: row.get("counted_by"),
        counted_at: row.get("counted_at"),
        updated_at: row.get("updated_at"),
        state: state.parse::<RecordState>()?,
    })
}

/// Insert a new record
///
/// Returns the raw sqlx error so the caller can recognise the
/// (assignment_id, asset_id) unique violation.
pub async fn insert_record(conn: &mut SqliteConnection, r: &CountRecord) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO registros_conteo (
            id, assignment_id, asset_id, found, found_location, found_condition,
            found_area_id, has_discrepancy, discrepancy_type, discrepancy_description,
            comments, counted_by, counted_at, updated_at, state
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(r.id.to_string())
    .bind(r.assignment_id.to_string())
    .bind(r.asset_id.to_string())
    .bind(r.found)
    .bind(&r.found_location)
    .bind(&r.found_condition)
    .bind(r.found_area_id.map(|id| id.to_string()))
    .bind(r.has_discrepancy)
    .bind(r.discrepancy_type.map(|t| t.as_str()))
    .bind(&r.discrepancy_description)
    .bind(&r.comments)
    .bind(&r.counted_by)
    .bind(r.counted_at)
    .bind(r.updated_at)
    .bind(r.state.as_str())
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Overwrite the mutable fields of an existing record
pub async fn update_record(conn: &mut SqliteConnection, r: &CountRecord) -> ConteoResult<()> {
    sqlx::query(
        r#"
        UPDATE registros_conteo
        SET found = ?, found_location = ?, found_condition = ?, found_area_id = ?,
            has_discrepancy = ?, discrepancy_type = ?, discrepancy_description = ?,
            comments = ?, counted_by = ?, updated_at = ?, state = ?
        WHERE id = ?
        "#,
    )
    .bind(r.found)
    .bind(&r.found_location)
    .bind(&r.found_condition)
    .bind(r.found_area_id.map(|id| id.to_string()))
    .bind(r.has_discrepancy)
    .bind(r.discrepancy_type.map(|t| t.as_str()))
    .bind(&r.discrepancy_description)
    .bind(&r.comments)
    .bind(&r.counted_by)
    .bind(r.updated_at)
    .bind(r.state.as_str())
    .bind(r.id.to_string())
    .execute(&mut *conn)
    .await?;

    Ok(())
}

pub async fn get_record(conn: &mut SqliteConnection, id: Uuid) -> ConteoResult<Option<CountRecord>> {
    let sql = format!("SELECT {} FROM registros_conteo WHERE id = ?", RECORD_COLUMNS);
    let row = sqlx::query(&sql)
        .bind(id.to_string())
        .fetch_optional(&mut *conn)
        .await?;

    row.as_ref().map(record_from_row).transpose()
}

/// Records of a month, oldest count first
pub async fn list_for_assignment(conn: &mut SqliteConnection, assignment_id: Uuid) -> ConteoResult<Vec<CountRecord>> {
    let sql = format!(
        "SELECT {} FROM registros_conteo WHERE assignment_id = ? ORDER BY counted_at, id",
        RECORD_COLUMNS
    );
    let rows = sqlx::query(&sql)
        .bind(assignment_id.to_string())
        .fetch_all(&mut *conn)
        .await?;

    rows.iter().map(record_from_row).collect()
}

/// Discrepancy counts per type across a plan
pub async fn discrepancy_type_counts(
    conn: &mut SqliteConnection,
    plan_id: Uuid,
) -> ConteoResult<Vec<(DiscrepancyType, i64)>> {
    let rows = sqlx::query(
        r#"
        SELECT r.discrepancy_type, COUNT(*) AS total
        FROM registros_conteo r
        JOIN asignaciones_mensuales m ON m.id = r.assignment_id
        WHERE m.plan_id = ? AND r.has_discrepancy = 1 AND r.discrepancy_type IS NOT NULL
        GROUP BY r.discrepancy_type
        "#,
    )
    .bind(plan_id.to_string())
    .fetch_all(&mut *conn)
    .await?;

    rows.iter()
        .map(|row| -> ConteoResult<(DiscrepancyType, i64)> {
            let kind: String = row.get("discrepancy_type");
            Ok((kind.parse::<DiscrepancyType>()?, row.get::<i64, _>("total")))
        })
        .collect()
}

/// Discrepancy counts grouped by the asset's registry area (unsorted)
pub async fn discrepancy_area_counts(
    conn: &mut SqliteConnection,
    plan_id: Uuid,
) -> ConteoResult<Vec<(Uuid, String, i64)>> {
    let rows = sqlx::query(
        r#"
        SELECT a.area_id, ar.name AS area_name, COUNT(*) AS total
        FROM registros_conteo r
        JOIN asignaciones_mensuales m ON m.id = r.assignment_id
        JOIN activos a ON a.id = r.asset_id
        JOIN areas ar ON ar.id = a.area_id
        WHERE m.plan_id = ? AND r.has_discrepancy = 1
        GROUP BY a.area_id, ar.name
        "#,
    )
    .bind(plan_id.to_string())
    .fetch_all(&mut *conn)
    .await?;

    rows.iter()
        .map(|row| -> ConteoResult<(Uuid, String, i64)> {
            Ok((
                uuid_col(row, "area_id")?,
                row.get::<String, _>("area_name"),
                row.get::<i64, _>("total"),
            ))
        })
        .collect()
}
