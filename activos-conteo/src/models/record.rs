//! Count records and discrepancy classification

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use super::normalize_state;
use crate::error::{ConteoError, ConteoResult};

/// Discrepancy classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscrepancyType {
    /// Found outside its registered area or location
    Ubicacion,
    /// Found in a condition that differs from the registry
    Estado,
    /// Not found
    Faltante,
    Otro,
}

impl DiscrepancyType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DiscrepancyType::Ubicacion => "ubicacion",
            DiscrepancyType::Estado => "estado",
            DiscrepancyType::Faltante => "faltante",
            DiscrepancyType::Otro => "otro",
        }
    }

    /// Types a counter declares, as opposed to ones derived from the count
    fn is_declared_kind(&self) -> bool {
        matches!(self, DiscrepancyType::Estado | DiscrepancyType::Otro)
    }
}

impl fmt::Display for DiscrepancyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DiscrepancyType {
    type Err = ConteoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize_state(s).as_str() {
            "ubicacion" | "ubicación" => Ok(DiscrepancyType::Ubicacion),
            "estado" => Ok(DiscrepancyType::Estado),
            "faltante" => Ok(DiscrepancyType::Faltante),
            "otro" => Ok(DiscrepancyType::Otro),
            other => Err(ConteoError::InvalidInput(format!(
                "Unknown discrepancy type '{}'",
                other
            ))),
        }
    }
}

/// Record state within the count
///
/// DESACTIVADO marks an asset set aside during the count; it is unrelated to
/// the registry-level active flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordState {
    Activo,
    Desactivado,
}

impl RecordState {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordState::Activo => "activo",
            RecordState::Desactivado => "desactivado",
        }
    }
}

impl FromStr for RecordState {
    type Err = ConteoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize_state(s).as_str() {
            "activo" | "active" => Ok(RecordState::Activo),
            "desactivado" | "inactive" => Ok(RecordState::Desactivado),
            other => Err(ConteoError::InvalidInput(format!("Unknown record state '{}'", other))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CountRecord {
    pub id: Uuid,
    pub assignment_id: Uuid,
    pub asset_id: Uuid,
    pub found: bool,
    pub found_location: Option<String>,
    pub found_condition: Option<String>,
    pub found_area_id: Option<Uuid>,
    pub has_discrepancy: bool,
    pub discrepancy_type: Option<DiscrepancyType>,
    pub discrepancy_description: Option<String>,
    pub comments: Option<String>,
    pub counted_by: String,
    pub counted_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub state: RecordState,
}

/// Input of a first count for an (assignment, asset) pair
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CountInput {
    pub assignment_id: Uuid,
    pub asset_id: Uuid,
    pub found: bool,
    #[serde(default)]
    pub found_location: Option<String>,
    #[serde(default)]
    pub found_condition: Option<String>,
    #[serde(default)]
    pub found_area_id: Option<Uuid>,
    /// Declared discrepancy (estado / otro); location and missing are derived
    #[serde(default)]
    pub discrepancy_type: Option<DiscrepancyType>,
    #[serde(default)]
    pub discrepancy_description: Option<String>,
    #[serde(default)]
    pub comments: Option<String>,
}

/// Partial update; absent fields keep their stored value
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CountRecordPatch {
    pub found: Option<bool>,
    pub found_location: Option<String>,
    pub found_condition: Option<String>,
    pub found_area_id: Option<Uuid>,
    pub discrepancy_type: Option<DiscrepancyType>,
    pub discrepancy_description: Option<String>,
    pub comments: Option<String>,
}

impl CountRecordPatch {
    /// True if the patch carries a fresh location or condition
    pub fn has_fresh_location(&self) -> bool {
        self.found_location.as_deref().is_some_and(|s| !s.trim().is_empty())
            || self.found_condition.as_deref().is_some_and(|s| !s.trim().is_empty())
            || self.found_area_id.is_some()
    }
}

/// Discrepancy flags computed at write time
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscrepancyOutcome {
    pub has_discrepancy: bool,
    pub discrepancy_type: Option<DiscrepancyType>,
    pub description: Option<String>,
}

impl DiscrepancyOutcome {
    fn none() -> Self {
        Self {
            has_discrepancy: false,
            discrepancy_type: None,
            description: None,
        }
    }

    fn of(kind: DiscrepancyType, description: Option<String>) -> Self {
        Self {
            has_discrepancy: true,
            discrepancy_type: Some(kind),
            description,
        }
    }
}

/// Classify a count
///
/// - not found is always `faltante`
/// - found in an area other than the registered one is `ubicacion`
/// - otherwise a declared `estado`/`otro`/`ubicacion` is kept
/// - declaring `faltante` on a found asset is rejected
pub fn classify_discrepancy(
    found: bool,
    found_area_id: Option<Uuid>,
    registered_area_id: Uuid,
    declared: Option<DiscrepancyType>,
    description: Option<String>,
) -> ConteoResult<DiscrepancyOutcome> {
    if !found {
        return Ok(DiscrepancyOutcome::of(DiscrepancyType::Faltante, description));
    }

    if declared == Some(DiscrepancyType::Faltante) {
        return Err(ConteoError::InvalidInput(
            "A found asset cannot be classified as faltante".to_string(),
        ));
    }

    if found_area_id.is_some_and(|area| area != registered_area_id) {
        return Ok(DiscrepancyOutcome::of(DiscrepancyType::Ubicacion, description));
    }

    match declared {
        Some(kind) => Ok(DiscrepancyOutcome::of(kind, description)),
        None => Ok(DiscrepancyOutcome::none()),
    }
}

/// Declared type to carry into a recomputation of an existing record
pub fn carried_declaration(
    existing: Option<DiscrepancyType>,
    patched: Option<DiscrepancyType>,
) -> Option<DiscrepancyType> {
    patched.or(existing.filter(|kind| kind.is_declared_kind()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_is_always_faltante() {
        let area = Uuid::new_v4();
        let outcome = classify_discrepancy(false, None, area, Some(DiscrepancyType::Estado), None).unwrap();
        assert!(outcome.has_discrepancy);
        assert_eq!(outcome.discrepancy_type, Some(DiscrepancyType::Faltante));
    }

    #[test]
    fn test_found_in_registered_area_has_no_discrepancy() {
        let area = Uuid::new_v4();
        let outcome = classify_discrepancy(true, Some(area), area, None, None).unwrap();
        assert_eq!(outcome, DiscrepancyOutcome::none());

        let outcome = classify_discrepancy(true, None, area, None, None).unwrap();
        assert!(!outcome.has_discrepancy);
    }

    #[test]
    fn test_found_elsewhere_is_ubicacion() {
        let outcome = classify_discrepancy(
            true,
            Some(Uuid::new_v4()),
            Uuid::new_v4(),
            Some(DiscrepancyType::Estado),
            Some("En el pasillo".to_string()),
        )
        .unwrap();
        assert_eq!(outcome.discrepancy_type, Some(DiscrepancyType::Ubicacion));
        assert_eq!(outcome.description.as_deref(), Some("En el pasillo"));
    }

    #[test]
    fn test_declared_condition_kept() {
        let area = Uuid::new_v4();
        let outcome = classify_discrepancy(true, Some(area), area, Some(DiscrepancyType::Estado), None).unwrap();
        assert!(outcome.has_discrepancy);
        assert_eq!(outcome.discrepancy_type, Some(DiscrepancyType::Estado));
    }

    #[test]
    fn test_found_declared_faltante_rejected() {
        let area = Uuid::new_v4();
        let err = classify_discrepancy(true, None, area, Some(DiscrepancyType::Faltante), None).unwrap_err();
        assert!(matches!(err, ConteoError::InvalidInput(_)));
    }

    #[test]
    fn test_carried_declaration_drops_derived_types() {
        assert_eq!(carried_declaration(Some(DiscrepancyType::Faltante), None), None);
        assert_eq!(carried_declaration(Some(DiscrepancyType::Ubicacion), None), None);
        assert_eq!(
            carried_declaration(Some(DiscrepancyType::Estado), None),
            Some(DiscrepancyType::Estado)
        );
        assert_eq!(
            carried_declaration(Some(DiscrepancyType::Estado), Some(DiscrepancyType::Otro)),
            Some(DiscrepancyType::Otro)
        );
    }

    #[test]
    fn test_discrepancy_type_parse() {
        assert_eq!("UBICACION".parse::<DiscrepancyType>().unwrap(), DiscrepancyType::Ubicacion);
        assert_eq!("Faltante".parse::<DiscrepancyType>().unwrap(), DiscrepancyType::Faltante);
        assert!("perdido".parse::<DiscrepancyType>().is_err());
    }
}
