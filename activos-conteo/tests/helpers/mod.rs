//! Shared fixtures for activos-conteo integration tests

#![allow(dead_code)]

use activos_common::db::registry;
use activos_common::db::{init_database, init_memory_database, Area, Asset, NewAsset, Subclassification};
use activos_common::time;
use activos_conteo::models::{CountInput, PlanDetail};
use activos_conteo::services::{CountLedger, LifecycleController, PlanManager};
use sqlx::SqlitePool;
use uuid::Uuid;

pub const COUNTER: &str = "contador@example.org";

pub struct Registry {
    pub areas: Vec<Area>,
    pub subclasses: Vec<Subclassification>,
    pub assets: Vec<Asset>,
}

pub async fn memory_pool() -> SqlitePool {
    init_memory_database().await.expect("Failed to create in-memory database")
}

/// File-backed WAL pool with the production settings; keep `dir` alive
pub async fn file_pool(dir: &tempfile::TempDir) -> SqlitePool {
    init_database(&dir.path().join("activos.db"))
        .await
        .expect("Failed to create file database")
}

/// A plan year that is always accepted
pub fn plan_year() -> i32 {
    time::current_year()
}

/// Register `assets` active assets spread round-robin over the given number
/// of areas and subclassifications
pub async fn seed_registry(pool: &SqlitePool, areas: usize, subclasses: usize, assets: usize) -> Registry {
    let mut conn = pool.acquire().await.unwrap();

    let mut area_rows = Vec::new();
    for i in 0..areas {
        area_rows.push(registry::create_area(&mut conn, &format!("Área {:02}", i)).await.unwrap());
    }
    let mut sub_rows = Vec::new();
    for i in 0..subclasses {
        sub_rows.push(
            registry::create_subclassification(&mut conn, &format!("Subclase {:02}", i))
                .await
                .unwrap(),
        );
    }

    let mut asset_rows = Vec::new();
    for i in 0..assets {
        let asset = registry::create_asset(
            &mut conn,
            &NewAsset {
                code: format!("AFT-{:05}", i),
                name: format!("Activo {}", i),
                area_id: area_rows[i % areas].id,
                subclassification_id: sub_rows[(i / areas) % subclasses].id,
                active: true,
            },
        )
        .await
        .unwrap();
        asset_rows.push(asset);
    }

    Registry {
        areas: area_rows,
        subclasses: sub_rows,
        assets: asset_rows,
    }
}

pub async fn add_asset(pool: &SqlitePool, code: &str, area_id: Uuid, subclassification_id: Uuid) -> Asset {
    let mut conn = pool.acquire().await.unwrap();
    registry::create_asset(
        &mut conn,
        &NewAsset {
            code: code.to_string(),
            name: format!("Activo {}", code),
            area_id,
            subclassification_id,
            active: true,
        },
    )
    .await
    .unwrap()
}

pub async fn set_registry_active(pool: &SqlitePool, asset_id: Uuid, active: bool) {
    let mut conn = pool.acquire().await.unwrap();
    registry::set_asset_active(&mut conn, asset_id, active).await.unwrap();
}

pub async fn generate(pool: &SqlitePool) -> PlanDetail {
    PlanManager::new(pool.clone())
        .generate_plan(plan_year(), "planificador@example.org", None)
        .await
        .unwrap()
}

pub fn found(assignment_id: Uuid, asset_id: Uuid) -> CountInput {
    CountInput {
        assignment_id,
        asset_id,
        found: true,
        found_location: None,
        found_condition: None,
        found_area_id: None,
        discrepancy_type: None,
        discrepancy_description: None,
        comments: None,
    }
}

/// Count every asset of a month that is active in the registry
pub async fn count_month(pool: &SqlitePool, assignment_id: Uuid) {
    let ledger = CountLedger::new(pool.clone());
    let assets = ledger.assets_of_month(assignment_id).await.unwrap();
    for entry in assets {
        if entry.record.is_none() && entry.asset.active {
            ledger
                .register_count(found(assignment_id, entry.asset.id), COUNTER)
                .await
                .unwrap();
        }
    }
}

/// Count and confirm every month of a plan
pub async fn complete_all_months(pool: &SqlitePool, plan: &PlanDetail) {
    let lifecycle = LifecycleController::new(pool.clone());
    for month in &plan.assignments {
        count_month(pool, month.assignment.id).await;
        lifecycle.confirm_month(month.assignment.id, COUNTER).await.unwrap();
    }
}
