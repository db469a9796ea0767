//! Asset registry tests

use activos_common::db::registry;
use activos_common::db::{init_memory_database, AssetFilter, NewAsset};
use activos_common::Error;
use uuid::Uuid;

#[tokio::test]
async fn test_create_and_list_assets() {
    let pool = init_memory_database().await.unwrap();
    let mut conn = pool.acquire().await.unwrap();

    let area = registry::create_area(&mut conn, "Contabilidad").await.unwrap();
    let sub = registry::create_subclassification(&mut conn, "Mobiliario").await.unwrap();

    let asset = registry::create_asset(
        &mut conn,
        &NewAsset {
            code: "AFT-0001".to_string(),
            name: "Buró".to_string(),
            area_id: area.id,
            subclassification_id: sub.id,
            active: true,
        },
    )
    .await
    .unwrap();

    assert_eq!(asset.area_name, "Contabilidad");
    assert_eq!(asset.subclassification_name, "Mobiliario");
    assert!(asset.active);

    let all = registry::list_assets(&mut conn, &AssetFilter::default()).await.unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].code, "AFT-0001");
}

#[tokio::test]
async fn test_duplicate_area_rejected() {
    let pool = init_memory_database().await.unwrap();
    let mut conn = pool.acquire().await.unwrap();

    registry::create_area(&mut conn, "Almacén").await.unwrap();
    let err = registry::create_area(&mut conn, "Almacén").await.unwrap_err();

    assert!(matches!(err, Error::InvalidInput(_)), "got {:?}", err);
}

#[tokio::test]
async fn test_asset_with_unknown_area_rejected() {
    let pool = init_memory_database().await.unwrap();
    let mut conn = pool.acquire().await.unwrap();
    let sub = registry::create_subclassification(&mut conn, "Equipos").await.unwrap();

    let err = registry::create_asset(
        &mut conn,
        &NewAsset {
            code: "AFT-9".to_string(),
            name: "PC".to_string(),
            area_id: Uuid::new_v4(),
            subclassification_id: sub.id,
            active: true,
        },
    )
    .await
    .unwrap_err();

    assert!(matches!(err, Error::NotFound(_)));
}

#[tokio::test]
async fn test_active_filter_and_deactivation() {
    let pool = init_memory_database().await.unwrap();
    let mut conn = pool.acquire().await.unwrap();
    let area = registry::create_area(&mut conn, "Taller").await.unwrap();
    let sub = registry::create_subclassification(&mut conn, "Herramientas").await.unwrap();

    let mut ids = Vec::new();
    for i in 0..3 {
        let asset = registry::create_asset(
            &mut conn,
            &NewAsset {
                code: format!("AFT-{}", i),
                name: format!("Herramienta {}", i),
                area_id: area.id,
                subclassification_id: sub.id,
                active: true,
            },
        )
        .await
        .unwrap();
        ids.push(asset.id);
    }

    let updated = registry::set_asset_active(&mut conn, ids[1], false).await.unwrap();
    assert!(!updated.active);

    let active = registry::list_active_assets(&mut conn).await.unwrap();
    assert_eq!(active.len(), 2);
    assert!(active.iter().all(|a| a.id != ids[1]));

    let inactive = registry::list_assets(
        &mut conn,
        &AssetFilter {
            active: Some(false),
            area_id: Some(area.id),
        },
    )
    .await
    .unwrap();
    assert_eq!(inactive.len(), 1);
}

#[tokio::test]
async fn test_set_active_unknown_asset_is_not_found() {
    let pool = init_memory_database().await.unwrap();
    let mut conn = pool.acquire().await.unwrap();

    let err = registry::set_asset_active(&mut conn, Uuid::new_v4(), false)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));
}
