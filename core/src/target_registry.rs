//! Target registry: per-subject headcount plans.
//!
//! Loaded once per session, edited in memory, persisted only on commit.
//! A commit writes the whole mapping; concurrent writers resolve
//! last-write-wins.

use crate::{error::DeskResult, record::number_of, store::DeskStore, types::TargetCount};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TargetRegistry {
    targets: BTreeMap<String, TargetCount>,
}

impl TargetRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load the persisted mapping. An unreadable blob yields an empty
    /// registry. A stored value that is not a non-negative integer is
    /// truncated into range, and one that is not a number at all
    /// (`null`, text) plans for 0 without affecting other subjects.
    pub fn load(store: &DeskStore) -> Self {
        let raw = match store.subject_targets() {
            Ok(raw) => raw,
            Err(e) => {
                log::warn!("targets: registry unreadable, all targets default to 0: {e}");
                return Self::default();
            }
        };
        let targets = raw
            .into_iter()
            .map(|(subject, value)| {
                let count = number_of(&value).map(sanitize).unwrap_or(0);
                if value.as_u64() != Some(count as u64) {
                    log::warn!("targets: {subject} stored as {value}, using {count}");
                }
                (subject, count)
            })
            .collect();
        Self { targets }
    }

    pub fn from_map(targets: BTreeMap<String, TargetCount>) -> Self {
        Self { targets }
    }

    /// Plan for a subject label; unset subjects plan for 0.
    pub fn target_for(&self, subject: &str) -> TargetCount {
        self.targets.get(subject).copied().unwrap_or(0)
    }

    pub fn set_target(&mut self, subject: &str, value: TargetCount) {
        self.targets.insert(subject.to_string(), value);
    }

    pub fn as_map(&self) -> &BTreeMap<String, TargetCount> {
        &self.targets
    }

    /// Persist the full mapping under a single key.
    pub fn commit(&self, store: &DeskStore) -> DeskResult<()> {
        store.save_subject_targets(&self.targets)?;
        log::info!("targets: committed {} subject targets", self.targets.len());
        Ok(())
    }
}

fn sanitize(value: f64) -> TargetCount {
    if value.is_finite() && value > 0.0 {
        value.min(TargetCount::MAX as f64) as TargetCount
    } else {
        0
    }
}

/// Plan attainment in whole percent, rounded half up. A zero plan is 0%.
/// Shared by per-subject rows (`u32`) and the totals row (`u64`).
pub fn attainment_pct<T: Into<u64>>(fact: T, plan: T) -> u32 {
    let (fact, plan) = (fact.into(), plan.into());
    if plan == 0 {
        return 0;
    }
    let pct = ((fact as f64 / plan as f64) * 100.0).round();
    pct.min(u32::MAX as f64) as u32
}
