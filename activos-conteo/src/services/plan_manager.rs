//! Annual plan generation and redistribution
//!
//! Builds the plan of a year from the active registry and keeps late
//! additions flowing into months that are still open.

use activos_common::db::registry;
use activos_common::db::Asset;
use activos_common::{time, uuid_utils};
use sqlx::SqlitePool;
use uuid::Uuid;

use super::aggregator;
use super::distribution::{self, Placeable};
use crate::db::{assignments, begin_write, is_unique_violation, plans};
use crate::error::{ConteoError, ConteoResult};
use crate::models::plan::{calendar_month, plan_window};
use crate::models::{AnnualCountPlan, AssignmentState, MonthlyAssignment, PlanDetail, PlanState};

/// Earliest year a plan may be generated for
pub const MIN_PLAN_YEAR: i32 = 2000;

fn placeable(asset: &Asset) -> Placeable {
    Placeable {
        asset_id: asset.id,
        area_key: asset.area_name.clone(),
        subclass_key: asset.subclassification_name.clone(),
    }
}

/// Years from 2000 up to next calendar year
pub fn validate_year(year: i32) -> ConteoResult<()> {
    if year < MIN_PLAN_YEAR || year > time::current_year() + 1 {
        return Err(ConteoError::InvalidYear(year));
    }
    Ok(())
}

pub struct PlanManager {
    db: SqlitePool,
}

impl PlanManager {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Generate the plan of `year` and distribute every active asset
    ///
    /// **Algorithm:**
    /// 1. Validate the year
    /// 2. Begin transaction; reject a duplicate year
    /// 3. Distribute the active assets over ten months
    /// 4. Write plan, months and memberships
    /// 5. Commit
    ///
    /// Any failure rolls the whole plan back.
    pub async fn generate_plan(
        &self,
        year: i32,
        created_by: &str,
        observations: Option<String>,
    ) -> ConteoResult<PlanDetail> {
        validate_year(year)?;

        let mut tx = begin_write(&self.db).await?;

        if plans::year_exists(&mut *tx, year).await? {
            return Err(ConteoError::DuplicatePlan(year));
        }

        let active = registry::list_active_assets(&mut *tx).await?;
        if active.is_empty() {
            return Err(ConteoError::NoActiveAssets);
        }

        let items: Vec<Placeable> = active.iter().map(placeable).collect();
        let distribution = distribution::distribute(&items)?;

        let (start_date, end_date) = plan_window(year)?;
        let now = time::now();
        let plan = AnnualCountPlan {
            id: uuid_utils::generate(),
            year,
            start_date,
            end_date,
            state: PlanState::Draft,
            total_assets: active.len() as i64,
            target_per_month: distribution.tolerance.target,
            tolerance_min: distribution.tolerance.min,
            tolerance_max: distribution.tolerance.max,
            created_by: created_by.to_string(),
            observations,
            created_at: now,
            started_at: None,
            finalized_at: None,
            finalization_reason: None,
        };

        match plans::insert_plan(&mut *tx, &plan).await {
            Err(ConteoError::Database(e)) if is_unique_violation(&e) => {
                return Err(ConteoError::DuplicatePlan(year));
            }
            other => other?,
        }

        for (position, asset_ids) in distribution.months.iter().enumerate() {
            let month_index = position as u8 + 1;
            let (cal_year, cal_month) = calendar_month(year, month_index)?;

            let assignment = MonthlyAssignment {
                id: uuid_utils::generate(),
                plan_id: plan.id,
                month_index,
                calendar_month: cal_month,
                year: cal_year,
                assigned_count: asset_ids.len() as i64,
                state: AssignmentState::Pendiente,
                start_date: time::first_day_of_month(cal_year, cal_month)?,
                deadline: time::last_day_of_month(cal_year, cal_month)?,
                counted_count: 0,
                found_count: 0,
                missing_count: 0,
                discrepancy_count: 0,
                confirmed: false,
                confirmed_by: None,
                confirmed_at: None,
            };
            assignments::insert_assignment(&mut *tx, &assignment).await?;

            for asset_id in asset_ids {
                assignments::insert_membership(&mut *tx, plan.id, assignment.id, *asset_id, now).await?;
            }
        }

        tx.commit().await?;

        tracing::info!(
            plan_id = %plan.id,
            year,
            total_assets = plan.total_assets,
            target = plan.target_per_month,
            created_by = %created_by,
            "Count plan generated"
        );

        self.get_plan_detail(plan.id).await
    }

    /// Append active assets missing from the plan to its open months
    ///
    /// Already-assigned assets never move. Returns the number appended.
    pub async fn redistribute_new_assets(&self, plan_id: Uuid, requested_by: &str) -> ConteoResult<usize> {
        let mut tx = begin_write(&self.db).await?;

        let plan = plans::get_plan(&mut *tx, plan_id)
            .await?
            .ok_or_else(|| ConteoError::NotFound(format!("Plan {}", plan_id)))?;
        if plan.state == PlanState::Completed {
            return Err(ConteoError::PlanCompleted(plan_id));
        }

        let open: Vec<MonthlyAssignment> = assignments::list_for_plan(&mut *tx, plan_id)
            .await?
            .into_iter()
            .filter(|a| !a.confirmed)
            .collect();
        if open.is_empty() {
            return Err(ConteoError::NoOpenMonth(plan_id));
        }

        let new_assets = assignments::unassigned_active_assets(&mut *tx, plan_id).await?;
        if new_assets.is_empty() {
            tracing::debug!(plan_id = %plan_id, "No new assets to redistribute");
            return Ok(0);
        }

        let items: Vec<Placeable> = new_assets.iter().map(placeable).collect();
        let fills: Vec<i64> = open.iter().map(|a| a.assigned_count).collect();
        let placement = distribution::append_to_open_months(&fills, plan.target_per_month, &items);

        let now = time::now();
        let mut appended = 0;
        for (month, asset_ids) in open.iter().zip(placement) {
            if asset_ids.is_empty() {
                continue;
            }
            for asset_id in &asset_ids {
                assignments::insert_membership(&mut *tx, plan_id, month.id, *asset_id, now).await?;
            }
            assignments::recompute_assigned_count(&mut *tx, month.id).await?;
            appended += asset_ids.len();

            tracing::debug!(
                assignment_id = %month.id,
                month_index = month.month_index,
                added = asset_ids.len(),
                "New assets appended to month"
            );
        }

        plans::sync_total_assets(&mut *tx, plan_id).await?;
        tx.commit().await?;

        tracing::info!(
            plan_id = %plan_id,
            appended,
            requested_by = %requested_by,
            "New assets redistributed"
        );

        Ok(appended)
    }

    /// Active assets not assigned to any month of the plan
    pub async fn count_unassigned_new_assets(&self, plan_id: Uuid) -> ConteoResult<usize> {
        let mut conn = self.db.acquire().await?;
        plans::get_plan(&mut *conn, plan_id)
            .await?
            .ok_or_else(|| ConteoError::NotFound(format!("Plan {}", plan_id)))?;

        Ok(assignments::unassigned_active_assets(&mut *conn, plan_id).await?.len())
    }

    /// Newest plan that is not completed, else the newest plan
    pub async fn current_plan(&self) -> ConteoResult<Option<AnnualCountPlan>> {
        let all = self.list_plans().await?;
        let open = all.iter().position(|p| p.state != PlanState::Completed);

        Ok(match open {
            Some(index) => all.into_iter().nth(index),
            None => all.into_iter().next(),
        })
    }

    /// All plans, newest year first
    pub async fn list_plans(&self) -> ConteoResult<Vec<AnnualCountPlan>> {
        let mut conn = self.db.acquire().await?;
        plans::list_plans(&mut *conn).await
    }

    /// Plan with its ten months and their progress
    pub async fn get_plan_detail(&self, plan_id: Uuid) -> ConteoResult<PlanDetail> {
        let mut conn = self.db.acquire().await?;
        let plan = plans::get_plan(&mut *conn, plan_id)
            .await?
            .ok_or_else(|| ConteoError::NotFound(format!("Plan {}", plan_id)))?;
        let assignments = aggregator::plan_views(&mut *conn, plan_id).await?;

        Ok(PlanDetail { plan, assignments })
    }
}
