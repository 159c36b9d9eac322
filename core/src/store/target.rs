use super::{DeskStore, StoreKey};
use crate::error::DeskResult;
use serde_json::Value;
use std::collections::BTreeMap;

impl DeskStore {
    // ── Subject targets ───────────────────────────────────────────

    /// The raw target blob, keyed by subject label.
    /// Values are left as stored; the registry sanitizes each one.
    pub fn subject_targets(&self) -> DeskResult<BTreeMap<String, Value>> {
        match self.read_raw(StoreKey::SubjectTargets)? {
            Some(raw) => Ok(serde_json::from_str(&raw)?),
            None => Ok(BTreeMap::new()),
        }
    }

    pub fn save_subject_targets(&self, targets: &BTreeMap<String, u32>) -> DeskResult<()> {
        self.set(StoreKey::SubjectTargets, targets)
    }
}
