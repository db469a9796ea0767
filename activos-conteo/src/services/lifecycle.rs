//! Plan lifecycle: start, month confirmation, finalization
//!
//! State changes are compare-and-swap updates inside a transaction, so two
//! concurrent confirmations of the same month cannot both succeed.

use activos_common::time;
use sqlx::{SqliteConnection, SqlitePool};
use uuid::Uuid;

use super::aggregator;
use crate::db::{assignments, begin_write, plans};
use crate::error::{ConteoError, ConteoResult};
use crate::models::{AnnualCountPlan, AssignmentView, PlanState, MONTHS_PER_PLAN};

async fn load_plan(conn: &mut SqliteConnection, plan_id: Uuid) -> ConteoResult<AnnualCountPlan> {
    plans::get_plan(conn, plan_id)
        .await?
        .ok_or_else(|| ConteoError::NotFound(format!("Plan {}", plan_id)))
}

pub struct LifecycleController {
    db: SqlitePool,
}

impl LifecycleController {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// draft → in_progress
    pub async fn start_plan(&self, plan_id: Uuid, acting_user: &str) -> ConteoResult<AnnualCountPlan> {
        let mut tx = begin_write(&self.db).await?;
        let plan = load_plan(&mut *tx, plan_id).await?;
        plan.state.ensure_transition(PlanState::InProgress)?;

        if !plans::transition_state(&mut *tx, plan_id, plan.state, PlanState::InProgress, time::now()).await? {
            let current = load_plan(&mut *tx, plan_id).await?;
            return Err(ConteoError::InvalidStateTransition {
                from: current.state.to_string(),
                to: PlanState::InProgress.to_string(),
            });
        }

        let started = load_plan(&mut *tx, plan_id).await?;
        tx.commit().await?;

        tracing::info!(plan_id = %plan_id, year = started.year, by = %acting_user, "Plan started");
        Ok(started)
    }

    /// Lock a fully counted month
    ///
    /// **Checks, in order:**
    /// 1. Month already confirmed, or plan completed → `AssignmentLocked`
    /// 2. counted + inactive-in-registry < assigned → `IncompleteMonth`
    /// 3. CAS on `confirmed = 0`; a lost race is `AssignmentLocked`
    pub async fn confirm_month(&self, assignment_id: Uuid, confirmed_by: &str) -> ConteoResult<AssignmentView> {
        let mut tx = begin_write(&self.db).await?;

        let view = aggregator::assignment_view(&mut *tx, assignment_id).await?;
        if view.assignment.confirmed {
            return Err(ConteoError::AssignmentLocked(assignment_id));
        }

        let plan = load_plan(&mut *tx, view.assignment.plan_id).await?;
        if plan.state == PlanState::Completed {
            return Err(ConteoError::AssignmentLocked(assignment_id));
        }

        if !view.fully_counted {
            return Err(ConteoError::IncompleteMonth {
                assignment_id,
                handled: view.assignment.counted_count + view.inactive_registry_count,
                assigned: view.assignment.assigned_count,
            });
        }

        if !assignments::confirm(&mut *tx, assignment_id, confirmed_by, time::now()).await? {
            return Err(ConteoError::AssignmentLocked(assignment_id));
        }

        let confirmed = aggregator::assignment_view(&mut *tx, assignment_id).await?;
        tx.commit().await?;

        tracing::info!(
            assignment_id = %assignment_id,
            plan_id = %plan.id,
            month_index = confirmed.assignment.month_index,
            confirmed_by = %confirmed_by,
            "Month confirmed"
        );

        Ok(confirmed)
    }

    /// Close the plan once all ten months are confirmed
    pub async fn finalize_plan(
        &self,
        plan_id: Uuid,
        reason: Option<String>,
        acting_user: &str,
    ) -> ConteoResult<AnnualCountPlan> {
        let mut tx = begin_write(&self.db).await?;
        let plan = load_plan(&mut *tx, plan_id).await?;

        if plan.state == PlanState::Completed {
            return Err(ConteoError::PlanCompleted(plan_id));
        }

        let months = assignments::list_for_plan(&mut *tx, plan_id).await?;
        let confirmed = months.iter().filter(|m| m.confirmed).count() as i64;
        let total = MONTHS_PER_PLAN as i64;
        if confirmed < total {
            return Err(ConteoError::PlanNotReady {
                plan_id,
                confirmed,
                total,
            });
        }

        let now = time::now();
        let mut state = plan.state;
        // A plan whose months were all handled without a count never left draft
        if state == PlanState::Draft {
            plans::transition_state(&mut *tx, plan_id, PlanState::Draft, PlanState::InProgress, now).await?;
            state = PlanState::InProgress;
        }

        if !plans::transition_state(&mut *tx, plan_id, state, PlanState::Completed, now).await? {
            return Err(ConteoError::PlanCompleted(plan_id));
        }
        plans::set_finalization_reason(&mut *tx, plan_id, reason.as_deref()).await?;

        let finalized = load_plan(&mut *tx, plan_id).await?;
        tx.commit().await?;

        tracing::info!(plan_id = %plan_id, year = finalized.year, by = %acting_user, "Plan finalized");
        Ok(finalized)
    }

    /// Replace the plan's observations; allowed in every state
    pub async fn update_observations(
        &self,
        plan_id: Uuid,
        observations: Option<String>,
    ) -> ConteoResult<AnnualCountPlan> {
        let mut conn = self.db.acquire().await?;
        let text = observations.as_deref().map(str::trim).filter(|s| !s.is_empty());

        if !plans::set_observations(&mut *conn, plan_id, text).await? {
            return Err(ConteoError::NotFound(format!("Plan {}", plan_id)));
        }

        tracing::debug!(plan_id = %plan_id, "Plan observations updated");
        load_plan(&mut *conn, plan_id).await
    }
}
