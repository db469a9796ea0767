//! Asset registry models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Area {
    pub id: Uuid,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subclassification {
    pub id: Uuid,
    pub name: String,
}

/// Tangible fixed asset (AFT)
///
/// The `active` flag is owned by the registry and is authoritative for every
/// workflow that reads it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Asset {
    pub id: Uuid,
    pub code: String,
    pub name: String,
    pub active: bool,
    pub area_id: Uuid,
    pub area_name: String,
    pub subclassification_id: Uuid,
    pub subclassification_name: String,
    pub created_at: DateTime<Utc>,
}

/// Input for registering a new asset
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewAsset {
    pub code: String,
    pub name: String,
    pub area_id: Uuid,
    pub subclassification_id: Uuid,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

/// Optional filters for asset listings
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetFilter {
    pub active: Option<bool>,
    pub area_id: Option<Uuid>,
}
