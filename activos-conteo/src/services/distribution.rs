//! Distribution of active assets across the ten monthly buckets
//!
//! **Algorithm:**
//! 1. target = round(total / 10), accepted range [target×0.8, target×1.2]
//! 2. Group assets by area, then subclassification, largest group first
//! 3. Place each whole group in the least-filled month it fits in; a group
//!    that fits nowhere is split asset by asset
//! 4. Pull assets from the fullest month into any month below the minimum
//! 5. Verify totals and uniqueness
//!
//! Pure computation: no database access, deterministic for a given input.

use std::collections::{BTreeMap, HashSet};
use uuid::Uuid;

use crate::error::{ConteoError, ConteoResult};
use crate::models::MONTHS_PER_PLAN;

const MONTHS: usize = MONTHS_PER_PLAN as usize;

/// An asset as seen by the distributor
#[derive(Debug, Clone)]
pub struct Placeable {
    pub asset_id: Uuid,
    pub area_key: String,
    pub subclass_key: String,
}

/// Per-month target and accepted range
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tolerance {
    pub target: i64,
    pub min: i64,
    pub max: i64,
}

impl Tolerance {
    /// Integer arithmetic throughout; `max` never drops below ceil(total/10)
    /// so a small total always fits
    pub fn for_total(total: usize) -> Self {
        let total = total as i64;
        let months = MONTHS as i64;
        let target = (total * 2 + months) / (months * 2);
        let min = target * 8 / 10;
        let max = ((target * 12 + 9) / 10).max((total + months - 1) / months);
        Self { target, min, max }
    }

    pub fn contains(&self, count: i64) -> bool {
        count >= self.min && count <= self.max
    }
}

/// Result of distributing a set of assets
#[derive(Debug, Clone)]
pub struct Distribution {
    pub tolerance: Tolerance,
    /// Asset ids per month, index 0 = month 1
    pub months: Vec<Vec<Uuid>>,
}

impl Distribution {
    pub fn counts(&self) -> Vec<i64> {
        self.months.iter().map(|m| m.len() as i64).collect()
    }

    pub fn total(&self) -> usize {
        self.months.iter().map(Vec::len).sum()
    }
}

/// Group by (area, subclassification); largest first, ties by key
fn group_by_locality(assets: &[Placeable]) -> Vec<Vec<Uuid>> {
    let mut groups: BTreeMap<(&str, &str), Vec<Uuid>> = BTreeMap::new();
    for asset in assets {
        groups
            .entry((asset.area_key.as_str(), asset.subclass_key.as_str()))
            .or_default()
            .push(asset.asset_id);
    }

    let mut ordered: Vec<Vec<Uuid>> = groups.into_values().collect();
    // Stable sort keeps key order among equal sizes
    ordered.sort_by(|a, b| b.len().cmp(&a.len()));
    ordered
}

/// Index of the least-filled month among `candidates`, lowest index on ties
fn least_filled(months: &[Vec<Uuid>], candidates: impl Iterator<Item = usize>) -> Option<usize> {
    candidates.min_by_key(|&i| (months[i].len(), i))
}

/// Distribute `assets` across the ten months
pub fn distribute(assets: &[Placeable]) -> ConteoResult<Distribution> {
    let tolerance = Tolerance::for_total(assets.len());
    let max = tolerance.max as usize;
    let min = tolerance.min as usize;
    let mut months: Vec<Vec<Uuid>> = vec![Vec::new(); MONTHS];

    for group in group_by_locality(assets) {
        let fitting = least_filled(&months, (0..MONTHS).filter(|&i| months[i].len() + group.len() <= max));

        match fitting {
            Some(month) => months[month].extend(group),
            None => {
                // Split at the asset level
                for asset_id in group {
                    if let Some(month) = least_filled(&months, 0..MONTHS) {
                        months[month].push(asset_id);
                    }
                }
            }
        }
    }

    // Balancing pass: average >= min, so a donor above min always exists
    while let Some(short) = least_filled(&months, (0..MONTHS).filter(|&i| months[i].len() < min)) {
        let donor = (0..MONTHS)
            .max_by_key(|&i| (months[i].len(), std::cmp::Reverse(i)))
            .filter(|&i| months[i].len() > min);

        let Some(donor) = donor else {
            return Err(ConteoError::DistributionIntegrity(format!(
                "Cannot raise month {} to the minimum of {}",
                short + 1,
                min
            )));
        };

        if let Some(asset_id) = months[donor].pop() {
            months[short].push(asset_id);
        }
    }

    let distribution = Distribution { tolerance, months };
    validate(&distribution, assets)?;

    tracing::debug!(
        total = assets.len(),
        target = tolerance.target,
        counts = ?distribution.counts(),
        "Assets distributed"
    );

    Ok(distribution)
}

/// Check that every asset was placed exactly once
pub fn validate(distribution: &Distribution, assets: &[Placeable]) -> ConteoResult<()> {
    let placed = distribution.total();
    if placed != assets.len() {
        return Err(ConteoError::DistributionIntegrity(format!(
            "Assigned {} assets but {} are active",
            placed,
            assets.len()
        )));
    }

    let mut seen = HashSet::with_capacity(placed);
    for asset_id in distribution.months.iter().flatten() {
        if !seen.insert(*asset_id) {
            return Err(ConteoError::DistributionIntegrity(format!(
                "Asset {} assigned more than once",
                asset_id
            )));
        }
    }

    if let Some(missing) = assets.iter().find(|a| !seen.contains(&a.asset_id)) {
        return Err(ConteoError::DistributionIntegrity(format!(
            "Asset {} was not assigned",
            missing.asset_id
        )));
    }

    Ok(())
}

/// Place late assets into open months without moving existing ones
///
/// `fills` holds the current assigned count of each open month. Each locality
/// group goes whole to the least-filled month still under `target`, or to the
/// least-filled month when none is under target. Returns the new asset ids
/// per entry of `fills`.
pub fn append_to_open_months(fills: &[i64], target: i64, assets: &[Placeable]) -> Vec<Vec<Uuid>> {
    let mut current: Vec<i64> = fills.to_vec();
    let mut added: Vec<Vec<Uuid>> = vec![Vec::new(); fills.len()];

    if fills.is_empty() {
        return added;
    }

    for group in group_by_locality(assets) {
        let pick = |pred: &dyn Fn(usize) -> bool| {
            (0..current.len())
                .filter(|&i| pred(i))
                .min_by_key(|&i| (current[i], i))
        };

        let month = pick(&|i| current[i] < target).or_else(|| pick(&|_| true));

        if let Some(month) = month {
            current[month] += group.len() as i64;
            added[month].extend(group);
        }
    }

    added
}
