//! Point-in-time enrollment membership.

use crate::{
    clock::CalendarDate,
    record::{StudentRecord, StudentStatus},
    subject::SubjectKey,
};

/// Whether `record` counts as enrolled in `subject` on `date`.
///
/// Records without a start date only count on `today`, and only while
/// their status is Active. For every other date they are excluded.
pub fn is_active_on(
    record:  &StudentRecord,
    date:    &CalendarDate,
    subject: &SubjectKey,
    today:   &CalendarDate,
) -> bool {
    if !subject.matches(record) {
        return false;
    }
    let Some(start) = record.start_date.as_ref() else {
        return date == today && record.status == StudentStatus::Active;
    };
    let not_left = match record.end_date.as_ref() {
        Some(end) => end > date,
        None      => true,
    };
    start <= date && not_left && record.status != StudentStatus::Lead
}

/// Number of records enrolled in `subject` on `date`.
pub fn count_active_on(
    records: &[StudentRecord],
    date:    &CalendarDate,
    subject: &SubjectKey,
    today:   &CalendarDate,
) -> u32 {
    records
        .iter()
        .filter(|r| is_active_on(r, date, subject, today))
        .count() as u32
}
