//! Stored record shapes.
//!
//! Records are held by the store as whole JSON collections with the
//! camelCase field names the dashboard has always written. Only the
//! fields the analytics and dashboard read are typed; everything else
//! (names, contacts, notes, fees, ...) travels untouched in `extra`.
//!
//! Spreadsheet imports write `""` for blank cells and numbers where text
//! is expected, so the typed fields decode leniently: a blank date is an
//! absent date, and an unusable number is zero.

use crate::{clock::CalendarDate, types::RecordId};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StudentStatus {
    #[serde(rename = "Лид", alias = "Lead")]
    Lead,
    #[serde(rename = "Активный", alias = "Active")]
    Active,
    #[serde(rename = "На паузе", alias = "Paused")]
    Paused,
    #[serde(rename = "Архив", alias = "Archived")]
    Archived,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentRecord {
    pub id: RecordId,
    pub status: StudentStatus,

    #[serde(default, deserialize_with = "lenient_label", skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    #[serde(default, deserialize_with = "lenient_date", skip_serializing_if = "Option::is_none")]
    pub start_date: Option<CalendarDate>,
    #[serde(default, deserialize_with = "lenient_date", skip_serializing_if = "Option::is_none")]
    pub end_date: Option<CalendarDate>,

    #[serde(default, deserialize_with = "lenient_amount")]
    pub balance: f64,
    #[serde(default, deserialize_with = "lenient_count")]
    pub consecutive_absences: u32,

    /// Every other stored field, kept as written.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl StudentRecord {
    /// A record with only the fields the analytics reads filled in.
    pub fn new(id: RecordId, status: StudentStatus) -> Self {
        Self {
            id,
            status,
            subject: None,
            start_date: None,
            end_date: None,
            balance: 0.0,
            consecutive_absences: 0,
            extra: Map::new(),
        }
    }

    pub fn with_subject(mut self, subject: &str) -> Self {
        self.subject = Some(subject.to_string());
        self
    }

    pub fn with_start(mut self, date: &str) -> Self {
        self.start_date = Some(CalendarDate::new(date));
        self
    }

    pub fn with_end(mut self, date: &str) -> Self {
        self.end_date = Some(CalendarDate::new(date));
        self
    }

    /// A passthrough field, e.g. `fullName` or `lastAttendance`.
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.extra.get(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransactionKind {
    Payment,
    Refund,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub id: RecordId,
    pub student_id: RecordId,
    #[serde(default)]
    pub student_name: String,
    #[serde(deserialize_with = "lenient_amount")]
    pub amount: f64,
    pub date: CalendarDate,
    #[serde(rename = "type")]
    pub kind: TransactionKind,
    #[serde(default)]
    pub purpose: String,
}

// ── Lenient field decoding ───────────────────────────────────────────────────

/// Non-blank string -> date; `""`, whitespace, null and non-strings -> absent.
fn lenient_date<'de, D>(deserializer: D) -> Result<Option<CalendarDate>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) if !s.trim().is_empty() => Some(CalendarDate::new(s.trim())),
        _ => None,
    })
}

/// Strings as-is, numbers as their text, anything else absent.
fn lenient_label<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

fn lenient_amount<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(number_of(&Value::deserialize(deserializer)?).unwrap_or(0.0))
}

fn lenient_count<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    let count = number_of(&Value::deserialize(deserializer)?).unwrap_or(0.0);
    Ok(if count > 0.0 { count.min(u32::MAX as f64) as u32 } else { 0 })
}

/// A JSON number, or a string holding one.
pub(crate) fn number_of(value: &Value) -> Option<f64> {
    let n = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    n.is_finite().then_some(n)
}
