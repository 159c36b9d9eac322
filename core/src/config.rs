use serde::{Deserialize, Serialize};

/// Canonical subjects in the order the business reviews them.
pub const DEFAULT_SUBJECT_PRIORITY: [&str; 6] = [
    "Химия",
    "Биология",
    "Физика",
    "Тадж. язык",
    "Математика",
    "Английский язык",
];

pub const DEFAULT_UNASSIGNED_LABEL: &str = "Без предмета";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    /// Subjects listed here sort first, in this order.
    pub subject_priority: Vec<String>,
    /// Label of the bucket for records with no subject.
    pub unassigned_subject_label: String,
    /// Consecutive absences at which a student counts as at risk.
    pub at_risk_absence_threshold: u32,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            subject_priority: DEFAULT_SUBJECT_PRIORITY.iter().map(|s| s.to_string()).collect(),
            unassigned_subject_label: DEFAULT_UNASSIGNED_LABEL.to_string(),
            at_risk_absence_threshold: 3,
        }
    }
}

impl ReportConfig {
    /// Load from a JSON file. Fields missing from the file keep their defaults.
    /// In tests, use ReportConfig::default().
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Cannot read {path}: {e}"))?;
        let config: ReportConfig = serde_json::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Cannot parse {path}: {e}"))?;
        log::debug!(
            "loaded report config from {path}: {} priority subjects",
            config.subject_priority.len()
        );
        Ok(config)
    }
}
