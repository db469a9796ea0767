//! Monthly assignment and membership persistence

use activos_common::db::registry::asset_from_row;
use activos_common::db::Asset;
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection};
use uuid::Uuid;

use super::uuid_col;
use crate::error::ConteoResult;
use crate::models::{AssignmentState, MonthlyAssignment};

const ASSIGNMENT_COLUMNS: &str = r#"
    id, plan_id, month_index, calendar_month, year, assigned_count, state,
    start_date, deadline, counted_count, found_count, missing_count,
    discrepancy_count, confirmed, confirmed_by, confirmed_at
"#;

fn assignment_from_row(row: &SqliteRow) -> ConteoResult<MonthlyAssignment> {
    let state: String = row.get("state");
    Ok(MonthlyAssignment {
        id: uuid_col(row, "id")?,
        plan_id: uuid_col(row, "plan_id")?,
        month_index: row.get::<i64, _>("month_index") as u8,
        calendar_month: row.get::<i64, _>("calendar_month") as u32,
        year: row.get::<i64, _>("year") as i32,
        assigned_count: row.get("assigned_count"),
        state: state.parse::<AssignmentState>()?,
        start_date: row.get("start_date"),
        deadline: row.get("deadline"),
        counted_count: row.get("counted_count"),
        found_count: row.get("found_count"),
        missing_count: row.get("missing_count"),
        discrepancy_count: row.get("discrepancy_count"),
        confirmed: row.get("confirmed"),
        confirmed_by: row.get("confirmed_by"),
        confirmed_at: row.get("confirmed_at"),
    })
}

pub async fn insert_assignment(conn: &mut SqliteConnection, a: &MonthlyAssignment) -> ConteoResult<()> {
    sqlx::query(
        r#"
        INSERT INTO asignaciones_mensuales (
            id, plan_id, month_index, calendar_month, year, assigned_count, state,
            start_date, deadline
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(a.id.to_string())
    .bind(a.plan_id.to_string())
    .bind(a.month_index as i64)
    .bind(a.calendar_month as i64)
    .bind(a.year)
    .bind(a.assigned_count)
    .bind(a.state.as_str())
    .bind(a.start_date)
    .bind(a.deadline)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

pub async fn get_assignment(conn: &mut SqliteConnection, id: Uuid) -> ConteoResult<Option<MonthlyAssignment>> {
    let sql = format!("SELECT {} FROM asignaciones_mensuales WHERE id = ?", ASSIGNMENT_COLUMNS);
    let row = sqlx::query(&sql)
        .bind(id.to_string())
        .fetch_optional(&mut *conn)
        .await?;

    row.as_ref().map(assignment_from_row).transpose()
}

/// The plan's months ordered by month index
pub async fn list_for_plan(conn: &mut SqliteConnection, plan_id: Uuid) -> ConteoResult<Vec<MonthlyAssignment>> {
    let sql = format!(
        "SELECT {} FROM asignaciones_mensuales WHERE plan_id = ? ORDER BY month_index",
        ASSIGNMENT_COLUMNS
    );
    let rows = sqlx::query(&sql)
        .bind(plan_id.to_string())
        .fetch_all(&mut *conn)
        .await?;

    rows.iter().map(assignment_from_row).collect()
}

pub async fn set_state(conn: &mut SqliteConnection, id: Uuid, state: AssignmentState) -> ConteoResult<()> {
    sqlx::query("UPDATE asignaciones_mensuales SET state = ? WHERE id = ?")
        .bind(state.as_str())
        .bind(id.to_string())
        .execute(&mut *conn)
        .await?;
    Ok(())
}

/// Compare-and-swap on the confirmed flag; false if already confirmed
pub async fn confirm(
    conn: &mut SqliteConnection,
    id: Uuid,
    confirmed_by: &str,
    at: DateTime<Utc>,
) -> ConteoResult<bool> {
    let result = sqlx::query(
        r#"
        UPDATE asignaciones_mensuales
        SET confirmed = 1, confirmed_by = ?, confirmed_at = ?, state = ?
        WHERE id = ? AND confirmed = 0
        "#,
    )
    .bind(confirmed_by)
    .bind(at)
    .bind(AssignmentState::Completado.as_str())
    .bind(id.to_string())
    .execute(&mut *conn)
    .await?;

    Ok(result.rows_affected() == 1)
}

/// Recompute the aggregate counters from the full record set
pub async fn recompute_counters(conn: &mut SqliteConnection, id: Uuid) -> ConteoResult<()> {
    sqlx::query(
        r#"
        UPDATE asignaciones_mensuales
        SET counted_count = (SELECT COUNT(*) FROM registros_conteo r WHERE r.assignment_id = asignaciones_mensuales.id),
            found_count = (SELECT COUNT(*) FROM registros_conteo r WHERE r.assignment_id = asignaciones_mensuales.id AND r.found = 1),
            missing_count = (SELECT COUNT(*) FROM registros_conteo r WHERE r.assignment_id = asignaciones_mensuales.id AND r.found = 0),
            discrepancy_count = (SELECT COUNT(*) FROM registros_conteo r WHERE r.assignment_id = asignaciones_mensuales.id AND r.has_discrepancy = 1)
        WHERE id = ?
        "#,
    )
    .bind(id.to_string())
    .execute(&mut *conn)
    .await?;
    Ok(())
}

/// Recompute assigned_count from membership rows
pub async fn recompute_assigned_count(conn: &mut SqliteConnection, id: Uuid) -> ConteoResult<()> {
    sqlx::query(
        r#"
        UPDATE asignaciones_mensuales
        SET assigned_count = (SELECT COUNT(*) FROM asignacion_activos aa WHERE aa.assignment_id = asignaciones_mensuales.id)
        WHERE id = ?
        "#,
    )
    .bind(id.to_string())
    .execute(&mut *conn)
    .await?;
    Ok(())
}

// ========================================
// Membership
// ========================================

pub async fn insert_membership(
    conn: &mut SqliteConnection,
    plan_id: Uuid,
    assignment_id: Uuid,
    asset_id: Uuid,
    at: DateTime<Utc>,
) -> ConteoResult<()> {
    sqlx::query(
        "INSERT INTO asignacion_activos (plan_id, assignment_id, asset_id, assigned_at) VALUES (?, ?, ?, ?)",
    )
    .bind(plan_id.to_string())
    .bind(assignment_id.to_string())
    .bind(asset_id.to_string())
    .bind(at)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

pub async fn is_member(conn: &mut SqliteConnection, assignment_id: Uuid, asset_id: Uuid) -> ConteoResult<bool> {
    let exists: bool = sqlx::query_scalar(
        "SELECT EXISTS(SELECT 1 FROM asignacion_activos WHERE assignment_id = ? AND asset_id = ?)",
    )
    .bind(assignment_id.to_string())
    .bind(asset_id.to_string())
    .fetch_one(&mut *conn)
    .await?;
    Ok(exists)
}

/// Assets of a month ordered by area, subclassification and code
pub async fn assets_of(conn: &mut SqliteConnection, assignment_id: Uuid) -> ConteoResult<Vec<Asset>> {
    let rows = sqlx::query(
        r#"
        SELECT a.id, a.code, a.name, a.active, a.area_id, ar.name AS area_name,
               a.subclasificacion_id, s.name AS subclasificacion_name, a.created_at
        FROM asignacion_activos aa
        JOIN activos a ON a.id = aa.asset_id
        JOIN areas ar ON ar.id = a.area_id
        JOIN subclasificaciones s ON s.id = a.subclasificacion_id
        WHERE aa.assignment_id = ?
        ORDER BY ar.name, s.name, a.code
        "#,
    )
    .bind(assignment_id.to_string())
    .fetch_all(&mut *conn)
    .await?;

    Ok(rows.iter().map(asset_from_row).collect::<activos_common::Result<Vec<_>>>()?)
}

/// Active registry assets not yet assigned to any month of the plan
pub async fn unassigned_active_assets(conn: &mut SqliteConnection, plan_id: Uuid) -> ConteoResult<Vec<Asset>> {
    let rows = sqlx::query(
        r#"
        SELECT a.id, a.code, a.name, a.active, a.area_id, ar.name AS area_name,
               a.subclasificacion_id, s.name AS subclasificacion_name, a.created_at
        FROM activos a
        JOIN areas ar ON ar.id = a.area_id
        JOIN subclasificaciones s ON s.id = a.subclasificacion_id
        WHERE a.active = 1
          AND a.id NOT IN (SELECT asset_id FROM asignacion_activos WHERE plan_id = ?)
        ORDER BY a.code
        "#,
    )
    .bind(plan_id.to_string())
    .fetch_all(&mut *conn)
    .await?;

    Ok(rows.iter().map(asset_from_row).collect::<activos_common::Result<Vec<_>>>()?)
}

/// Assets of the month that are inactive in the registry and were never
/// counted; they count as handled without a count action
pub async fn inactive_registry_count(conn: &mut SqliteConnection, assignment_id: Uuid) -> ConteoResult<i64> {
    let count: i64 = sqlx::query_scalar(
        r#"
        SELECT COUNT(*)
        FROM asignacion_activos aa
        JOIN activos a ON a.id = aa.asset_id
        WHERE aa.assignment_id = ?
          AND a.active = 0
          AND NOT EXISTS (
              SELECT 1 FROM registros_conteo r
              WHERE r.assignment_id = aa.assignment_id AND r.asset_id = aa.asset_id
          )
        "#,
    )
    .bind(assignment_id.to_string())
    .fetch_one(&mut *conn)
    .await?;
    Ok(count)
}
