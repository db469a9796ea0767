//! Count record ledger
//!
//! Registers, corrects, deactivates and reactivates the count of each asset
//! of a month. Every mutation runs in one transaction that ends by
//! recomputing the month's counters from its full record set.

use std::collections::HashMap;

use activos_common::db::registry;
use activos_common::db::Asset;
use activos_common::{time, uuid_utils};
use sqlx::{SqliteConnection, SqlitePool};
use uuid::Uuid;

use super::aggregator;
use crate::db::{assignments, begin_write, is_unique_violation, plans, records};
use crate::error::{ConteoError, ConteoResult};
use crate::models::record::{carried_declaration, classify_discrepancy};
use crate::models::{
    AnnualCountPlan, AssignmentAsset, AssignmentState, AssignmentView, CountInput, CountRecord,
    CountRecordPatch, DiscrepancyType, MonthlyAssignment, PlanState, RecordState,
};

/// Load an assignment and its plan, rejecting writes to a locked month
async fn writable_assignment(
    conn: &mut SqliteConnection,
    assignment_id: Uuid,
) -> ConteoResult<(MonthlyAssignment, AnnualCountPlan)> {
    let assignment = assignments::get_assignment(conn, assignment_id)
        .await?
        .ok_or_else(|| ConteoError::NotFound(format!("Assignment {}", assignment_id)))?;
    let plan = plans::get_plan(conn, assignment.plan_id)
        .await?
        .ok_or_else(|| ConteoError::NotFound(format!("Plan {}", assignment.plan_id)))?;

    if assignment.confirmed || plan.state == PlanState::Completed {
        return Err(ConteoError::AssignmentLocked(assignment_id));
    }

    Ok((assignment, plan))
}

async fn load_asset(conn: &mut SqliteConnection, asset_id: Uuid) -> ConteoResult<Asset> {
    registry::get_asset(conn, asset_id)
        .await?
        .ok_or_else(|| ConteoError::NotFound(format!("Asset {}", asset_id)))
}

async fn load_record(conn: &mut SqliteConnection, record_id: Uuid) -> ConteoResult<CountRecord> {
    records::get_record(conn, record_id)
        .await?
        .ok_or(ConteoError::RecordNotFound(record_id))
}

pub struct CountLedger {
    db: SqlitePool,
}

impl CountLedger {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Register the first count of an asset in a month
    ///
    /// The (assignment, asset) unique index decides between concurrent
    /// registrations: the loser gets `AlreadyCounted`. The first record moves
    /// the month to en_progreso and a draft plan to in_progress.
    pub async fn register_count(&self, input: CountInput, counted_by: &str) -> ConteoResult<CountRecord> {
        let mut tx = begin_write(&self.db).await?;

        let assignment = assignments::get_assignment(&mut *tx, input.assignment_id)
            .await?
            .ok_or_else(|| ConteoError::NotFound(format!("Assignment {}", input.assignment_id)))?;

        if !assignments::is_member(&mut *tx, assignment.id, input.asset_id).await? {
            return Err(ConteoError::AssetNotInAssignment {
                assignment_id: assignment.id,
                asset_id: input.asset_id,
            });
        }

        let (assignment, plan) = writable_assignment(&mut *tx, assignment.id).await?;

        let asset = load_asset(&mut *tx, input.asset_id).await?;
        if input.found && !asset.active {
            return Err(ConteoError::RegistryInactiveOverrideDenied(asset.id));
        }

        let outcome = classify_discrepancy(
            input.found,
            input.found_area_id,
            asset.area_id,
            input.discrepancy_type,
            input.discrepancy_description,
        )?;

        let now = time::now();
        let record = CountRecord {
            id: uuid_utils::generate(),
            assignment_id: assignment.id,
            asset_id: asset.id,
            found: input.found,
            found_location: input.found_location,
            found_condition: input.found_condition,
            found_area_id: input.found_area_id,
            has_discrepancy: outcome.has_discrepancy,
            discrepancy_type: outcome.discrepancy_type,
            discrepancy_description: outcome.description,
            comments: input.comments,
            counted_by: counted_by.to_string(),
            counted_at: now,
            updated_at: now,
            state: RecordState::Activo,
        };

        if let Err(e) = records::insert_record(&mut *tx, &record).await {
            if is_unique_violation(&e) {
                return Err(ConteoError::AlreadyCounted {
                    assignment_id: assignment.id,
                    asset_id: asset.id,
                });
            }
            return Err(e.into());
        }

        assignments::recompute_counters(&mut *tx, assignment.id).await?;

        if assignment.state == AssignmentState::Pendiente {
            assignments::set_state(&mut *tx, assignment.id, AssignmentState::EnProgreso).await?;
        }
        if plan.state == PlanState::Draft
            && plans::transition_state(&mut *tx, plan.id, PlanState::Draft, PlanState::InProgress, now).await?
        {
            tracing::info!(plan_id = %plan.id, "Plan started by first count");
        }

        tx.commit().await?;

        tracing::info!(
            record_id = %record.id,
            assignment_id = %assignment.id,
            asset_id = %asset.id,
            found = record.found,
            discrepancy = ?record.discrepancy_type,
            counted_by = %counted_by,
            "Count registered"
        );

        Ok(record)
    }

    /// Merge `patch` over a stored record and recompute its discrepancy
    pub async fn update_count_record(
        &self,
        record_id: Uuid,
        patch: CountRecordPatch,
        acting_user: &str,
    ) -> ConteoResult<CountRecord> {
        let mut tx = begin_write(&self.db).await?;
        let record = load_record(&mut *tx, record_id).await?;
        writable_assignment(&mut *tx, record.assignment_id).await?;

        let reactivating = record.state == RecordState::Desactivado && patch.found == Some(true);
        if reactivating && !patch.has_fresh_location() {
            return Err(ConteoError::InvalidInput(
                "Reactivating a deactivated record requires a location or condition".to_string(),
            ));
        }

        let updated = apply_patch(&mut *tx, record, patch).await?;
        tx.commit().await?;

        tracing::info!(
            record_id = %updated.id,
            found = updated.found,
            discrepancy = ?updated.discrepancy_type,
            updated_by = %acting_user,
            "Count record updated"
        );

        Ok(updated)
    }

    /// Set an asset aside during the count (soft deactivation)
    ///
    /// The record becomes desactivado, not found, discrepancy faltante. The
    /// registry-level flag is untouched.
    pub async fn deactivate_record(
        &self,
        record_id: Uuid,
        reason: Option<String>,
        acting_user: &str,
    ) -> ConteoResult<CountRecord> {
        let mut tx = begin_write(&self.db).await?;
        let mut record = load_record(&mut *tx, record_id).await?;
        writable_assignment(&mut *tx, record.assignment_id).await?;

        let carried = record
            .discrepancy_description
            .take()
            .filter(|_| record.discrepancy_type == Some(DiscrepancyType::Faltante));

        record.state = RecordState::Desactivado;
        record.found = false;
        record.has_discrepancy = true;
        record.discrepancy_type = Some(DiscrepancyType::Faltante);
        record.discrepancy_description = reason.or(carried);
        record.updated_at = time::now();

        records::update_record(&mut *tx, &record).await?;
        assignments::recompute_counters(&mut *tx, record.assignment_id).await?;
        tx.commit().await?;

        tracing::info!(record_id = %record.id, asset_id = %record.asset_id, by = %acting_user, "Count record deactivated");

        Ok(record)
    }

    /// Bring a deactivated record back as found
    ///
    /// Needs at least one fresh location, condition or area.
    pub async fn reactivate_record(
        &self,
        record_id: Uuid,
        mut patch: CountRecordPatch,
        acting_user: &str,
    ) -> ConteoResult<CountRecord> {
        if patch.found == Some(false) {
            return Err(ConteoError::InvalidInput(
                "Reactivation always marks the asset as found".to_string(),
            ));
        }
        if !patch.has_fresh_location() {
            return Err(ConteoError::InvalidInput(
                "Reactivation requires a location or condition".to_string(),
            ));
        }
        patch.found = Some(true);

        let mut tx = begin_write(&self.db).await?;
        let record = load_record(&mut *tx, record_id).await?;
        writable_assignment(&mut *tx, record.assignment_id).await?;

        if record.state != RecordState::Desactivado {
            return Err(ConteoError::InvalidInput(format!("Record {} is not deactivated", record_id)));
        }

        let updated = apply_patch(&mut *tx, record, patch).await?;
        tx.commit().await?;

        tracing::info!(record_id = %updated.id, asset_id = %updated.asset_id, by = %acting_user, "Count record reactivated");

        Ok(updated)
    }

    /// Assignment with derived progress
    pub async fn get_assignment_view(&self, assignment_id: Uuid) -> ConteoResult<AssignmentView> {
        let mut conn = self.db.acquire().await?;
        aggregator::assignment_view(&mut *conn, assignment_id).await
    }

    /// Every asset of the month with its count record, if any
    pub async fn assets_of_month(&self, assignment_id: Uuid) -> ConteoResult<Vec<AssignmentAsset>> {
        let mut conn = self.db.acquire().await?;
        ensure_assignment(&mut *conn, assignment_id).await?;

        let assets = assignments::assets_of(&mut *conn, assignment_id).await?;
        let mut by_asset: HashMap<Uuid, CountRecord> = records::list_for_assignment(&mut *conn, assignment_id)
            .await?
            .into_iter()
            .map(|r| (r.asset_id, r))
            .collect();

        Ok(assets
            .into_iter()
            .map(|asset| {
                let record = by_asset.remove(&asset.id);
                AssignmentAsset { asset, record }
            })
            .collect())
    }

    pub async fn records_of_month(&self, assignment_id: Uuid) -> ConteoResult<Vec<CountRecord>> {
        let mut conn = self.db.acquire().await?;
        ensure_assignment(&mut *conn, assignment_id).await?;
        records::list_for_assignment(&mut *conn, assignment_id).await
    }

    /// Assets of the month inactive in the registry and never counted
    pub async fn inactive_registry_count(&self, assignment_id: Uuid) -> ConteoResult<i64> {
        let mut conn = self.db.acquire().await?;
        ensure_assignment(&mut *conn, assignment_id).await?;
        assignments::inactive_registry_count(&mut *conn, assignment_id).await
    }
}

async fn ensure_assignment(conn: &mut SqliteConnection, assignment_id: Uuid) -> ConteoResult<()> {
    assignments::get_assignment(conn, assignment_id)
        .await?
        .map(|_| ())
        .ok_or_else(|| ConteoError::NotFound(format!("Assignment {}", assignment_id)))
}

/// Merge, reclassify, persist and recompute counters
///
/// A found asset that is inactive in the registry cannot come back through
/// the count; only the registry may reactivate it.
async fn apply_patch(
    conn: &mut SqliteConnection,
    record: CountRecord,
    patch: CountRecordPatch,
) -> ConteoResult<CountRecord> {
    let asset = load_asset(conn, record.asset_id).await?;
    let found = patch.found.unwrap_or(record.found);

    if found && !record.found && !asset.active {
        return Err(ConteoError::RegistryInactiveOverrideDenied(asset.id));
    }

    let declared = carried_declaration(record.discrepancy_type, patch.discrepancy_type);
    let found_area_id = patch.found_area_id.or(record.found_area_id);
    let mut outcome = classify_discrepancy(
        found,
        found_area_id,
        asset.area_id,
        declared,
        patch.discrepancy_description,
    )?;
    // A stored description belongs to the discrepancy it was written for
    if outcome.description.is_none()
        && outcome.discrepancy_type.is_some()
        && outcome.discrepancy_type == record.discrepancy_type
    {
        outcome.description = record.discrepancy_description.clone();
    }

    let updated = CountRecord {
        found,
        found_location: patch.found_location.or(record.found_location),
        found_condition: patch.found_condition.or(record.found_condition),
        found_area_id,
        has_discrepancy: outcome.has_discrepancy,
        discrepancy_type: outcome.discrepancy_type,
        discrepancy_description: outcome.description,
        comments: patch.comments.or(record.comments),
        updated_at: time::now(),
        state: if found { RecordState::Activo } else { record.state },
        ..record
    };

    records::update_record(conn, &updated).await?;
    assignments::recompute_counters(conn, updated.assignment_id).await?;

    Ok(updated)
}
