//! Subject identity and catalog ordering.
//!
//! A record's subject is either a named label or the unassigned bucket.
//! The bucket collects records with no label, an empty label, or a label
//! equal to the configured unassigned label, so it renders as one row.
//! The catalog is the distinct set of keys in a snapshot, ordered by the
//! configured priority list first and by a case-folded string comparison
//! after that.

use crate::{config::ReportConfig, record::StudentRecord};
use serde::{Serialize, Serializer};
use std::{cmp::Ordering, collections::BTreeSet};

/// The unassigned bucket carries its display label.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SubjectKey {
    Named(String),
    Unassigned(String),
}

impl SubjectKey {
    pub fn named(label: &str) -> Self {
        Self::Named(label.to_string())
    }

    pub fn unassigned(label: &str) -> Self {
        Self::Unassigned(label.to_string())
    }

    pub fn of(record: &StudentRecord, unassigned_label: &str) -> Self {
        match record.subject.as_deref() {
            Some(label) if !label.is_empty() && label != unassigned_label => {
                Self::Named(label.to_string())
            }
            _ => Self::unassigned(unassigned_label),
        }
    }

    /// Hard filter: a record belongs to exactly one key.
    pub fn matches(&self, record: &StudentRecord) -> bool {
        match (self, record.subject.as_deref()) {
            (Self::Named(label), Some(subject)) => label == subject,
            (Self::Unassigned(_), None) | (Self::Unassigned(_), Some("")) => true,
            (Self::Unassigned(label), Some(subject)) => label == subject,
            _ => false,
        }
    }

    pub fn label(&self) -> &str {
        match self {
            Self::Named(label) | Self::Unassigned(label) => label,
        }
    }
}

/// Serialized as its display label, which also keys the baseline map.
impl Serialize for SubjectKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.label())
    }
}

/// Presentation order for subject keys.
#[derive(Debug, Clone)]
pub struct SubjectOrder {
    priority:         Vec<String>,
    unassigned_label: String,
}

impl SubjectOrder {
    pub fn new(priority: Vec<String>, unassigned_label: String) -> Self {
        Self { priority, unassigned_label }
    }

    pub fn from_config(config: &ReportConfig) -> Self {
        Self::new(
            config.subject_priority.clone(),
            config.unassigned_subject_label.clone(),
        )
    }

    fn rank(&self, key: &SubjectKey) -> Option<usize> {
        match key {
            SubjectKey::Named(label) => self.priority.iter().position(|p| p == label),
            SubjectKey::Unassigned(_) => None,
        }
    }

    pub fn compare(&self, a: &SubjectKey, b: &SubjectKey) -> Ordering {
        match (self.rank(a), self.rank(b)) {
            (Some(ia), Some(ib)) => ia.cmp(&ib),
            (Some(_), None)      => Ordering::Less,
            (None, Some(_))      => Ordering::Greater,
            (None, None)         => collate(a.label(), b.label()).then_with(|| a.cmp(b)),
        }
    }

    /// Distinct subject keys of the snapshot, in presentation order.
    pub fn list_subjects(&self, records: &[StudentRecord]) -> Vec<SubjectKey> {
        let distinct: BTreeSet<SubjectKey> = records
            .iter()
            .map(|r| SubjectKey::of(r, &self.unassigned_label))
            .collect();
        let mut subjects: Vec<SubjectKey> = distinct.into_iter().collect();
        subjects.sort_by(|a, b| self.compare(a, b));
        subjects
    }
}

impl Default for SubjectOrder {
    fn default() -> Self {
        Self::from_config(&ReportConfig::default())
    }
}

/// Case-insensitive comparison with `ё` folded onto `е`, falling back to
/// code-point order so the result stays total.
fn collate(a: &str, b: &str) -> Ordering {
    fold(a).cmp(&fold(b)).then_with(|| a.cmp(b))
}

fn fold(s: &str) -> String {
    s.chars()
        .flat_map(char::to_lowercase)
        .map(|c| if c == 'ё' { 'е' } else { c })
        .collect()
}
