//! Shared primitive types used across the dashboard.

/// A stable, unique identifier for any stored record.
pub type RecordId = i64;

/// A subject's target headcount.
pub type TargetCount = u32;
