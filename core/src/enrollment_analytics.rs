//! Subject enrollment analytics: point-in-time headcounts per subject.
//!
//! For a snapshot of student records this engine:
//!   1. Enumerates the subject catalog in presentation order
//!   2. Aggregates fact / presale / joined / left per subject for a window
//!   3. Resolves a comparison baseline (a single day, or a second window)
//!   4. Folds the per-subject figures into totals
//!
//! The engine is a pure function of (records, targets, request, today).
//! It performs no I/O and never fails; malformed dates simply compare as
//! strings.

use crate::{
    clock::{CalendarDate, DateWindow, ReportClock},
    membership::count_active_on,
    record::{StudentRecord, StudentStatus},
    subject::{SubjectKey, SubjectOrder},
    target_registry::{attainment_pct, TargetRegistry},
    types::TargetCount,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ── Public types ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubjectStats {
    pub subject: SubjectKey,
    /// Display label, also the key into the target registry.
    pub label: String,
    pub plan: TargetCount,
    /// Enrolled at the end of the window.
    pub fact: u32,
    /// Current leads, independent of the window.
    pub presale: u32,
    pub joined: u32,
    pub left: u32,
    pub dynamics: i64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Totals {
    pub plan: u64,
    pub fact: u64,
    pub presale: u64,
    pub joined: u64,
    pub left: u64,
    pub dynamics: i64,
}

/// What to compute and what to compare it against.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum ReportRequest {
    /// One day, compared with the headcount on `compare_date`.
    Daily {
        date:         CalendarDate,
        compare_date: CalendarDate,
    },
    /// One window, compared with the end-of-window headcount of another.
    Period {
        primary:    DateWindow,
        comparison: DateWindow,
    },
}

impl ReportRequest {
    /// Today against yesterday.
    pub fn daily_default(clock: &ReportClock) -> Self {
        Self::Daily {
            date:         clock.today(),
            compare_date: clock.yesterday(),
        }
    }

    /// Month to date against the previous month.
    pub fn period_default(clock: &ReportClock) -> Self {
        Self::Period {
            primary:    clock.month_to_date(),
            comparison: clock.previous_month_window(),
        }
    }

    pub fn primary_window(&self) -> DateWindow {
        match self {
            Self::Daily { date, .. }     => DateWindow::day(date.clone()),
            Self::Period { primary, .. } => primary.clone(),
        }
    }
}

/// Baseline headcount per subject, used by callers to derive deltas.
pub type Baseline = BTreeMap<SubjectKey, u32>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EnrollmentReport {
    pub request:  ReportRequest,
    pub stats:    Vec<SubjectStats>,
    pub baseline: Baseline,
    pub totals:   Totals,
}

impl EnrollmentReport {
    /// Current fact minus baseline fact. A subject missing from the
    /// baseline compares against 0.
    pub fn fact_delta(&self, subject: &SubjectKey) -> i64 {
        let current = self
            .stats
            .iter()
            .find(|s| &s.subject == subject)
            .map(|s| s.fact)
            .unwrap_or(0);
        let baseline = self.baseline.get(subject).copied().unwrap_or(0);
        current as i64 - baseline as i64
    }

    pub fn attainment_pct(stats: &SubjectStats) -> u32 {
        attainment_pct(stats.fact, stats.plan)
    }

    pub fn total_attainment_pct(&self) -> u32 {
        attainment_pct(self.totals.fact, self.totals.plan)
    }
}

// ── Engine ───────────────────────────────────────────────────────────────────

pub struct EnrollmentAnalytics<'a> {
    records: &'a [StudentRecord],
    targets: &'a TargetRegistry,
    order:   &'a SubjectOrder,
    today:   CalendarDate,
}

impl<'a> EnrollmentAnalytics<'a> {
    pub fn new(
        records: &'a [StudentRecord],
        targets: &'a TargetRegistry,
        order:   &'a SubjectOrder,
        clock:   &ReportClock,
    ) -> Self {
        Self {
            records,
            targets,
            order,
            today: clock.today(),
        }
    }

    pub fn subjects(&self) -> Vec<SubjectKey> {
        self.order.list_subjects(self.records)
    }

    /// Per-subject figures for `window`, in catalog order.
    pub fn aggregate(&self, window: &DateWindow) -> Vec<SubjectStats> {
        let subjects = self.subjects();
        self.aggregate_over(&subjects, window)
    }

    fn aggregate_over(&self, subjects: &[SubjectKey], window: &DateWindow) -> Vec<SubjectStats> {
        subjects
            .iter()
            .map(|subject| self.stats_for(subject, window))
            .collect()
    }

    fn stats_for(&self, subject: &SubjectKey, window: &DateWindow) -> SubjectStats {
        let mut presale = 0u32;
        let mut joined = 0u32;
        let mut left = 0u32;
        for record in self.records.iter().filter(|r| subject.matches(r)) {
            if record.status == StudentStatus::Lead {
                presale += 1;
            }
            if window.contains(record.start_date.as_ref()) {
                joined += 1;
            }
            if window.contains(record.end_date.as_ref()) {
                left += 1;
            }
        }
        let fact = count_active_on(self.records, &window.end, subject, &self.today);
        let label = subject.label().to_string();
        SubjectStats {
            plan: self.targets.target_for(&label),
            subject: subject.clone(),
            label,
            fact,
            presale,
            joined,
            left,
            dynamics: joined as i64 - left as i64,
        }
    }

    /// Comparison figures per subject. Daily mode counts headcount on the
    /// comparison date; period mode aggregates the comparison window and
    /// keeps only its facts.
    pub fn resolve_baseline(&self, subjects: &[SubjectKey], request: &ReportRequest) -> Baseline {
        match request {
            ReportRequest::Daily { compare_date, .. } => subjects
                .iter()
                .map(|s| {
                    (s.clone(), count_active_on(self.records, compare_date, s, &self.today))
                })
                .collect(),
            ReportRequest::Period { comparison, .. } => self
                .aggregate_over(subjects, comparison)
                .into_iter()
                .map(|s| (s.subject, s.fact))
                .collect(),
        }
    }

    /// Primary figures, baseline and totals for one request.
    pub fn derive(&self, request: &ReportRequest) -> EnrollmentReport {
        let subjects = self.subjects();
        let stats = self.aggregate_over(&subjects, &request.primary_window());
        let baseline = self.resolve_baseline(&subjects, request);
        let totals = reduce_totals(&stats);
        log::debug!(
            "enrollment: {} subjects over {}, fact={} joined={} left={}",
            stats.len(),
            request.primary_window(),
            totals.fact,
            totals.joined,
            totals.left
        );
        EnrollmentReport {
            request: request.clone(),
            stats,
            baseline,
            totals,
        }
    }
}

/// Component-wise sum of per-subject figures.
pub fn reduce_totals(stats: &[SubjectStats]) -> Totals {
    stats.iter().fold(Totals::default(), |acc, s| Totals {
        plan:     acc.plan + s.plan as u64,
        fact:     acc.fact + s.fact as u64,
        presale:  acc.presale + s.presale as u64,
        joined:   acc.joined + s.joined as u64,
        left:     acc.left + s.left as u64,
        dynamics: acc.dynamics + s.dynamics,
    })
}

// ── Memoization ──────────────────────────────────────────────────────────────

/// Everything a derived report depends on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportCacheKey {
    pub snapshot_revision: i64,
    pub targets:           TargetRegistry,
    pub request:           ReportRequest,
    pub today:             CalendarDate,
}

/// Holds the last derived report and reuses it while its inputs are unchanged.
#[derive(Debug, Default)]
pub struct ReportCache {
    last: Option<(ReportCacheKey, EnrollmentReport)>,
}

impl ReportCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_derive<F>(&mut self, key: ReportCacheKey, derive: F) -> &EnrollmentReport
    where
        F: FnOnce() -> EnrollmentReport,
    {
        if !matches!(&self.last, Some((k, _)) if *k == key) {
            self.last = None;
        }
        let (_, report) = self.last.get_or_insert_with(|| (key, derive()));
        report
    }
}
