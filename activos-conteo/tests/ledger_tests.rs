//! Count record ledger tests

mod helpers;

use activos_conteo::models::{
    AssignmentState, CountInput, CountRecordPatch, DiscrepancyType, PlanState, RecordState,
};
use activos_conteo::services::{CountLedger, LifecycleController, PlanManager};
use activos_conteo::ConteoError;
use helpers::*;
use uuid::Uuid;

/// Plan with 20 assets (two per month) over two areas
async fn setup() -> (sqlx::SqlitePool, Registry, activos_conteo::models::PlanDetail) {
    let pool = memory_pool().await;
    let registry = seed_registry(&pool, 2, 1, 20).await;
    let plan = generate(&pool).await;
    (pool, registry, plan)
}

async fn first_asset_of(ledger: &CountLedger, assignment_id: Uuid) -> activos_common::db::Asset {
    ledger.assets_of_month(assignment_id).await.unwrap().remove(0).asset
}

#[tokio::test]
async fn test_register_count_updates_counters_and_states() {
    let (pool, _registry, plan) = setup().await;
    let ledger = CountLedger::new(pool.clone());
    let month = plan.assignments[0].assignment.id;
    let asset = first_asset_of(&ledger, month).await;

    let record = ledger.register_count(found(month, asset.id), COUNTER).await.unwrap();

    assert!(record.found);
    assert!(!record.has_discrepancy);
    assert_eq!(record.counted_by, COUNTER);
    assert_eq!(record.state, RecordState::Activo);

    let view = ledger.get_assignment_view(month).await.unwrap();
    assert_eq!(view.assignment.counted_count, 1);
    assert_eq!(view.assignment.found_count, 1);
    assert_eq!(view.assignment.state, AssignmentState::EnProgreso);
    assert_eq!(view.progress_percent, 50);
    assert!(!view.fully_counted);

    // First count starts a draft plan
    let detail = PlanManager::new(pool.clone()).get_plan_detail(plan.plan.id).await.unwrap();
    assert_eq!(detail.plan.state, PlanState::InProgress);
    assert!(detail.plan.started_at.is_some());
}

#[tokio::test]
async fn test_second_registration_already_counted() {
    let (pool, _registry, plan) = setup().await;
    let ledger = CountLedger::new(pool.clone());
    let month = plan.assignments[0].assignment.id;
    let asset = first_asset_of(&ledger, month).await;

    ledger.register_count(found(month, asset.id), COUNTER).await.unwrap();
    let err = ledger.register_count(found(month, asset.id), COUNTER).await.unwrap_err();

    assert!(matches!(err, ConteoError::AlreadyCounted { .. }), "got {:?}", err);
    assert_eq!(ledger.records_of_month(month).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_concurrent_registrations_one_wins() {
    let (pool, _registry, plan) = setup().await;
    let month = plan.assignments[0].assignment.id;
    let asset = first_asset_of(&CountLedger::new(pool.clone()), month).await;

    let a = CountLedger::new(pool.clone());
    let b = CountLedger::new(pool.clone());
    let (ra, rb) = tokio::join!(
        a.register_count(found(month, asset.id), "a@example.org"),
        b.register_count(found(month, asset.id), "b@example.org"),
    );

    let successes = [ra.is_ok(), rb.is_ok()].iter().filter(|ok| **ok).count();
    assert_eq!(successes, 1);
    let failure = ra.err().or(rb.err()).unwrap();
    assert!(matches!(failure, ConteoError::AlreadyCounted { .. }), "got {:?}", failure);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_registrations_on_file_database() {
    let dir = tempfile::tempdir().unwrap();
    let pool = file_pool(&dir).await;
    seed_registry(&pool, 4, 1, 40).await;
    let plan = generate(&pool).await;

    let ledger = CountLedger::new(pool.clone());
    let mut tasks = Vec::new();
    for month in &plan.assignments {
        let month = month.assignment.id;
        for entry in ledger.assets_of_month(month).await.unwrap() {
            for n in 0..4 {
                let ledger = CountLedger::new(pool.clone());
                let input = found(month, entry.asset.id);
                let counter = format!("contador{}@example.org", n);
                tasks.push(tokio::spawn(async move { ledger.register_count(input, &counter).await }));
            }
        }
    }

    let (mut ok, mut already) = (0, 0);
    for task in tasks {
        match task.await.unwrap() {
            Ok(_) => ok += 1,
            Err(ConteoError::AlreadyCounted { .. }) => already += 1,
            Err(other) => panic!("unexpected error: {:?}", other),
        }
    }
    assert_eq!(ok, 40);
    assert_eq!(already, 120);

    for month in &plan.assignments {
        let view = ledger.get_assignment_view(month.assignment.id).await.unwrap();
        assert_eq!(view.assignment.counted_count, view.assignment.assigned_count);
        assert!(view.fully_counted);
    }

    let detail = PlanManager::new(pool.clone()).get_plan_detail(plan.plan.id).await.unwrap();
    assert_eq!(detail.plan.state, PlanState::InProgress);
}

#[tokio::test]
async fn test_asset_outside_assignment_rejected() {
    let (pool, _registry, plan) = setup().await;
    let ledger = CountLedger::new(pool.clone());
    let other = first_asset_of(&ledger, plan.assignments[1].assignment.id).await;

    let err = ledger
        .register_count(found(plan.assignments[0].assignment.id, other.id), COUNTER)
        .await
        .unwrap_err();

    assert!(matches!(err, ConteoError::AssetNotInAssignment { .. }));
}

#[tokio::test]
async fn test_unknown_assignment_not_found() {
    let (pool, registry, _plan) = setup().await;
    let err = CountLedger::new(pool.clone())
        .register_count(found(Uuid::new_v4(), registry.assets[0].id), COUNTER)
        .await
        .unwrap_err();

    assert!(matches!(err, ConteoError::NotFound(_)));
}

#[tokio::test]
async fn test_registry_inactive_cannot_be_found() {
    let (pool, _registry, plan) = setup().await;
    let ledger = CountLedger::new(pool.clone());
    let month = plan.assignments[0].assignment.id;
    let asset = first_asset_of(&ledger, month).await;
    set_registry_active(&pool, asset.id, false).await;

    let err = ledger.register_count(found(month, asset.id), COUNTER).await.unwrap_err();
    assert!(matches!(err, ConteoError::RegistryInactiveOverrideDenied(_)));

    // Reporting it missing is still allowed
    let mut missing = found(month, asset.id);
    missing.found = false;
    let record = ledger.register_count(missing, COUNTER).await.unwrap();
    assert_eq!(record.discrepancy_type, Some(DiscrepancyType::Faltante));
}

#[tokio::test]
async fn test_discrepancy_classification_on_register() {
    let (pool, registry, plan) = setup().await;
    let ledger = CountLedger::new(pool.clone());
    let month = plan.assignments[0].assignment.id;
    let assets = ledger.assets_of_month(month).await.unwrap();

    // Found in the other area
    let asset = &assets[0].asset;
    let elsewhere = registry.areas.iter().find(|a| a.id != asset.area_id).unwrap().id;
    let input = CountInput {
        found_area_id: Some(elsewhere),
        found_location: Some("Pasillo B".to_string()),
        ..found(month, asset.id)
    };
    let record = ledger.register_count(input, COUNTER).await.unwrap();
    assert!(record.has_discrepancy);
    assert_eq!(record.discrepancy_type, Some(DiscrepancyType::Ubicacion));

    // Declared condition mismatch
    let asset = &assets[1].asset;
    let input = CountInput {
        discrepancy_type: Some(DiscrepancyType::Estado),
        discrepancy_description: Some("Pata rota".to_string()),
        ..found(month, asset.id)
    };
    let record = ledger.register_count(input, COUNTER).await.unwrap();
    assert_eq!(record.discrepancy_type, Some(DiscrepancyType::Estado));
    assert_eq!(record.discrepancy_description.as_deref(), Some("Pata rota"));

    let view = ledger.get_assignment_view(month).await.unwrap();
    assert_eq!(view.assignment.discrepancy_count, 2);
    assert_eq!(view.progress_percent, 100);
    assert!(view.fully_counted);
}

#[tokio::test]
async fn test_found_declared_missing_rejected() {
    let (pool, _registry, plan) = setup().await;
    let ledger = CountLedger::new(pool.clone());
    let month = plan.assignments[0].assignment.id;
    let asset = first_asset_of(&ledger, month).await;

    let input = CountInput {
        discrepancy_type: Some(DiscrepancyType::Faltante),
        ..found(month, asset.id)
    };
    let err = ledger.register_count(input, COUNTER).await.unwrap_err();
    assert!(matches!(err, ConteoError::InvalidInput(_)));
    assert!(ledger.records_of_month(month).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_update_recomputes_discrepancy_and_counters() {
    let (pool, _registry, plan) = setup().await;
    let ledger = CountLedger::new(pool.clone());
    let month = plan.assignments[0].assignment.id;
    let asset = first_asset_of(&ledger, month).await;

    let mut missing = found(month, asset.id);
    missing.found = false;
    let record = ledger.register_count(missing, COUNTER).await.unwrap();
    assert_eq!(ledger.get_assignment_view(month).await.unwrap().assignment.missing_count, 1);

    let patch = CountRecordPatch {
        found: Some(true),
        comments: Some("Apareció en bodega".to_string()),
        ..Default::default()
    };
    let updated = ledger.update_count_record(record.id, patch, "revisor@example.org").await.unwrap();

    assert!(updated.found);
    assert!(!updated.has_discrepancy);
    assert_eq!(updated.discrepancy_type, None);
    assert_eq!(updated.comments.as_deref(), Some("Apareció en bodega"));

    let view = ledger.get_assignment_view(month).await.unwrap();
    assert_eq!(view.assignment.counted_count, 1);
    assert_eq!(view.assignment.found_count, 1);
    assert_eq!(view.assignment.missing_count, 0);
    assert_eq!(view.assignment.discrepancy_count, 0);
}

#[tokio::test]
async fn test_update_keeps_declared_condition() {
    let (pool, _registry, plan) = setup().await;
    let ledger = CountLedger::new(pool.clone());
    let month = plan.assignments[0].assignment.id;
    let asset = first_asset_of(&ledger, month).await;

    let input = CountInput {
        discrepancy_type: Some(DiscrepancyType::Otro),
        ..found(month, asset.id)
    };
    let record = ledger.register_count(input, COUNTER).await.unwrap();

    let patch = CountRecordPatch {
        found_location: Some("Oficina 3".to_string()),
        ..Default::default()
    };
    let updated = ledger.update_count_record(record.id, patch, COUNTER).await.unwrap();
    assert_eq!(updated.discrepancy_type, Some(DiscrepancyType::Otro));
    assert_eq!(updated.found_location.as_deref(), Some("Oficina 3"));
}

#[tokio::test]
async fn test_found_asset_drops_missing_description() {
    let (pool, _registry, plan) = setup().await;
    let ledger = CountLedger::new(pool.clone());
    let month = plan.assignments[0].assignment.id;
    let asset = first_asset_of(&ledger, month).await;

    let missing = CountInput {
        found: false,
        discrepancy_description: Some("No estaba en su puesto".to_string()),
        ..found(month, asset.id)
    };
    let record = ledger.register_count(missing, COUNTER).await.unwrap();
    assert_eq!(record.discrepancy_description.as_deref(), Some("No estaba en su puesto"));

    let patch = CountRecordPatch {
        found: Some(true),
        found_location: Some("Bodega".to_string()),
        ..Default::default()
    };
    let updated = ledger.update_count_record(record.id, patch, COUNTER).await.unwrap();
    assert!(!updated.has_discrepancy);
    assert_eq!(updated.discrepancy_type, None);
    assert_eq!(updated.discrepancy_description, None);

    // Deactivating does not turn an unrelated description into the reason
    let deactivated = ledger.deactivate_record(record.id, None, COUNTER).await.unwrap();
    assert_eq!(deactivated.discrepancy_type, Some(DiscrepancyType::Faltante));
    assert_eq!(deactivated.discrepancy_description, None);
}

#[tokio::test]
async fn test_description_kept_while_discrepancy_unchanged() {
    let (pool, registry, plan) = setup().await;
    let ledger = CountLedger::new(pool.clone());
    let month = plan.assignments[0].assignment.id;
    let asset = first_asset_of(&ledger, month).await;
    let elsewhere = registry.areas.iter().find(|a| a.id != asset.area_id).unwrap().id;

    let input = CountInput {
        found_area_id: Some(elsewhere),
        discrepancy_description: Some("En el pasillo norte".to_string()),
        ..found(month, asset.id)
    };
    let record = ledger.register_count(input, COUNTER).await.unwrap();
    assert_eq!(record.discrepancy_type, Some(DiscrepancyType::Ubicacion));

    let patch = CountRecordPatch {
        comments: Some("Etiqueta dañada".to_string()),
        ..Default::default()
    };
    let updated = ledger.update_count_record(record.id, patch, COUNTER).await.unwrap();
    assert_eq!(updated.discrepancy_type, Some(DiscrepancyType::Ubicacion));
    assert_eq!(updated.discrepancy_description.as_deref(), Some("En el pasillo norte"));
}

#[tokio::test]
async fn test_unknown_record_not_found() {
    let (pool, _registry, _plan) = setup().await;
    let err = CountLedger::new(pool.clone())
        .update_count_record(Uuid::new_v4(), CountRecordPatch::default(), COUNTER)
        .await
        .unwrap_err();
    assert!(matches!(err, ConteoError::RecordNotFound(_)));
}

#[tokio::test]
async fn test_confirmed_month_is_locked() {
    let (pool, _registry, plan) = setup().await;
    let ledger = CountLedger::new(pool.clone());
    let month = plan.assignments[0].assignment.id;

    count_month(&pool, month).await;
    LifecycleController::new(pool.clone()).confirm_month(month, COUNTER).await.unwrap();

    let record = ledger.records_of_month(month).await.unwrap().remove(0);
    let err = ledger
        .update_count_record(record.id, CountRecordPatch::default(), COUNTER)
        .await
        .unwrap_err();
    assert!(matches!(err, ConteoError::AssignmentLocked(_)), "got {:?}", err);

    let err = ledger.deactivate_record(record.id, None, COUNTER).await.unwrap_err();
    assert!(matches!(err, ConteoError::AssignmentLocked(_)));
}

#[tokio::test]
async fn test_deactivate_and_reactivate() {
    let (pool, _registry, plan) = setup().await;
    let ledger = CountLedger::new(pool.clone());
    let month = plan.assignments[0].assignment.id;
    let asset = first_asset_of(&ledger, month).await;
    let record = ledger.register_count(found(month, asset.id), COUNTER).await.unwrap();

    let deactivated = ledger
        .deactivate_record(record.id, Some("Dado de baja en sitio".to_string()), COUNTER)
        .await
        .unwrap();
    assert_eq!(deactivated.state, RecordState::Desactivado);
    assert!(!deactivated.found);
    assert_eq!(deactivated.discrepancy_type, Some(DiscrepancyType::Faltante));
    assert_eq!(ledger.get_assignment_view(month).await.unwrap().assignment.missing_count, 1);

    // A reactivation needs somewhere the asset was found
    let err = ledger
        .reactivate_record(record.id, CountRecordPatch::default(), COUNTER)
        .await
        .unwrap_err();
    assert!(matches!(err, ConteoError::InvalidInput(_)));

    let patch = CountRecordPatch {
        found_location: Some("Laboratorio".to_string()),
        ..Default::default()
    };
    let reactivated = ledger.reactivate_record(record.id, patch, COUNTER).await.unwrap();
    assert_eq!(reactivated.state, RecordState::Activo);
    assert!(reactivated.found);
    assert!(!reactivated.has_discrepancy);

    let view = ledger.get_assignment_view(month).await.unwrap();
    assert_eq!(view.assignment.found_count, 1);
    assert_eq!(view.assignment.missing_count, 0);
}

#[tokio::test]
async fn test_reactivation_denied_for_registry_inactive_asset() {
    let (pool, _registry, plan) = setup().await;
    let ledger = CountLedger::new(pool.clone());
    let month = plan.assignments[0].assignment.id;
    let asset = first_asset_of(&ledger, month).await;

    let record = ledger.register_count(found(month, asset.id), COUNTER).await.unwrap();
    ledger.deactivate_record(record.id, None, COUNTER).await.unwrap();
    set_registry_active(&pool, asset.id, false).await;

    let patch = CountRecordPatch {
        found_condition: Some("Bueno".to_string()),
        ..Default::default()
    };
    let err = ledger.reactivate_record(record.id, patch, COUNTER).await.unwrap_err();
    assert!(matches!(err, ConteoError::RegistryInactiveOverrideDenied(_)), "got {:?}", err);
}

#[tokio::test]
async fn test_registry_inactive_assets_complete_a_month() {
    let (pool, _registry, plan) = setup().await;
    let ledger = CountLedger::new(pool.clone());
    let month = plan.assignments[0].assignment.id;
    let assets = ledger.assets_of_month(month).await.unwrap();

    set_registry_active(&pool, assets[0].asset.id, false).await;
    assert_eq!(ledger.inactive_registry_count(month).await.unwrap(), 1);

    ledger
        .register_count(found(month, assets[1].asset.id), COUNTER)
        .await
        .unwrap();

    let view = ledger.get_assignment_view(month).await.unwrap();
    assert_eq!(view.assignment.counted_count, 1);
    assert_eq!(view.inactive_registry_count, 1);
    assert_eq!(view.progress_percent, 100);
    assert!(view.fully_counted);
}

#[tokio::test]
async fn test_assets_of_month_joins_records() {
    let (pool, _registry, plan) = setup().await;
    let ledger = CountLedger::new(pool.clone());
    let month = plan.assignments[0].assignment.id;
    let assets = ledger.assets_of_month(month).await.unwrap();
    assert_eq!(assets.len() as i64, plan.assignments[0].assignment.assigned_count);
    assert!(assets.iter().all(|a| a.record.is_none()));

    ledger
        .register_count(found(month, assets[0].asset.id), COUNTER)
        .await
        .unwrap();

    let assets = ledger.assets_of_month(month).await.unwrap();
    assert_eq!(assets.iter().filter(|a| a.record.is_some()).count(), 1);
}

#[tokio::test]
async fn test_progress_never_decreases_while_counting() {
    let (pool, _registry, plan) = setup().await;
    let ledger = CountLedger::new(pool.clone());
    let month = plan.assignments[3].assignment.id;

    let mut last = ledger.get_assignment_view(month).await.unwrap().progress_percent;
    for entry in ledger.assets_of_month(month).await.unwrap() {
        ledger.register_count(found(month, entry.asset.id), COUNTER).await.unwrap();
        let progress = ledger.get_assignment_view(month).await.unwrap().progress_percent;
        assert!(progress >= last);
        last = progress;
    }
    assert_eq!(last, 100);
}
