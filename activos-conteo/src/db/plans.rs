//! Annual count plan persistence

use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection};
use uuid::Uuid;

use super::uuid_col;
use crate::error::ConteoResult;
use crate::models::{AnnualCountPlan, PlanState};

const PLAN_COLUMNS: &str = r#"
    id, year, start_date, end_date, state, total_assets, target_per_month,
    tolerance_min, tolerance_max, created_by, observations, created_at,
    started_at, finalized_at, finalization_reason
"#;

fn plan_from_row(row: &SqliteRow) -> ConteoResult<AnnualCountPlan> {
    let state: String = row.get("state");
    Ok(AnnualCountPlan {
        id: uuid_col(row, "id")?,
        year: row.get::<i64, _>("year") as i32,
        start_date: row.get("start_date"),
        end_date: row.get("end_date"),
        state: state.parse::<PlanState>()?,
        total_assets: row.get("total_assets"),
        target_per_month: row.get("target_per_month"),
        tolerance_min: row.get("tolerance_min"),
        tolerance_max: row.get("tolerance_max"),
        created_by: row.get("created_by"),
        observations: row.get("observations"),
        created_at: row.get("created_at"),
        started_at: row.get("started_at"),
        finalized_at: row.get("finalized_at"),
        finalization_reason: row.get("finalization_reason"),
    })
}

pub async fn insert_plan(conn: &mut SqliteConnection, plan: &AnnualCountPlan) -> ConteoResult<()> {
    sqlx::query(
        r#"
        INSERT INTO planes_conteo (
            id, year, start_date, end_date, state, total_assets, target_per_month,
            tolerance_min, tolerance_max, created_by, observations, created_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(plan.id.to_string())
    .bind(plan.year)
    .bind(plan.start_date)
    .bind(plan.end_date)
    .bind(plan.state.as_str())
    .bind(plan.total_assets)
    .bind(plan.target_per_month)
    .bind(plan.tolerance_min)
    .bind(plan.tolerance_max)
    .bind(&plan.created_by)
    .bind(&plan.observations)
    .bind(plan.created_at)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

pub async fn get_plan(conn: &mut SqliteConnection, id: Uuid) -> ConteoResult<Option<AnnualCountPlan>> {
    let sql = format!("SELECT {} FROM planes_conteo WHERE id = ?", PLAN_COLUMNS);
    let row = sqlx::query(&sql)
        .bind(id.to_string())
        .fetch_optional(&mut *conn)
        .await?;

    row.as_ref().map(plan_from_row).transpose()
}

pub async fn year_exists(conn: &mut SqliteConnection, year: i32) -> ConteoResult<bool> {
    let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM planes_conteo WHERE year = ?)")
        .bind(year)
        .fetch_one(&mut *conn)
        .await?;
    Ok(exists)
}

/// All plans, newest year first
pub async fn list_plans(conn: &mut SqliteConnection) -> ConteoResult<Vec<AnnualCountPlan>> {
    let sql = format!("SELECT {} FROM planes_conteo ORDER BY year DESC", PLAN_COLUMNS);
    let rows = sqlx::query(&sql).fetch_all(&mut *conn).await?;
    rows.iter().map(plan_from_row).collect()
}

/// Compare-and-swap on the plan state
///
/// The stored spelling is parsed with the same rules as every other read,
/// and the update is conditioned on that exact stored value. Returns false
/// when the plan was not in `from` (or does not exist). The new state is
/// always written in canonical form.
pub async fn transition_state(
    conn: &mut SqliteConnection,
    id: Uuid,
    from: PlanState,
    to: PlanState,
    at: DateTime<Utc>,
) -> ConteoResult<bool> {
    from.ensure_transition(to)?;

    let stored: Option<String> = sqlx::query_scalar("SELECT state FROM planes_conteo WHERE id = ?")
        .bind(id.to_string())
        .fetch_optional(&mut *conn)
        .await?;
    let Some(stored) = stored else {
        return Ok(false);
    };
    if stored.parse::<PlanState>()? != from {
        return Ok(false);
    }

    let timestamp_column = match to {
        PlanState::Completed => "finalized_at",
        _ => "started_at",
    };
    let sql = format!(
        "UPDATE planes_conteo SET state = ?, {} = ? WHERE id = ? AND state = ?",
        timestamp_column
    );

    let result = sqlx::query(&sql)
        .bind(to.as_str())
        .bind(at)
        .bind(id.to_string())
        .bind(&stored)
        .execute(&mut *conn)
        .await?;

    Ok(result.rows_affected() == 1)
}

pub async fn set_finalization_reason(
    conn: &mut SqliteConnection,
    id: Uuid,
    reason: Option<&str>,
) -> ConteoResult<()> {
    sqlx::query("UPDATE planes_conteo SET finalization_reason = ? WHERE id = ?")
        .bind(reason)
        .bind(id.to_string())
        .execute(&mut *conn)
        .await?;
    Ok(())
}

pub async fn set_observations(
    conn: &mut SqliteConnection,
    id: Uuid,
    observations: Option<&str>,
) -> ConteoResult<bool> {
    let result = sqlx::query("UPDATE planes_conteo SET observations = ? WHERE id = ?")
        .bind(observations)
        .bind(id.to_string())
        .execute(&mut *conn)
        .await?;
    Ok(result.rows_affected() == 1)
}

/// Recompute total_assets as the sum of the plan's assigned counts
pub async fn sync_total_assets(conn: &mut SqliteConnection, id: Uuid) -> ConteoResult<()> {
    sqlx::query(
        r#"
        UPDATE planes_conteo
        SET total_assets = (
            SELECT COALESCE(SUM(assigned_count), 0) FROM asignaciones_mensuales WHERE plan_id = ?
        )
        WHERE id = ?
        "#,
    )
    .bind(id.to_string())
    .bind(id.to_string())
    .execute(&mut *conn)
    .await?;
    Ok(())
}
