//! Enrollment analytics tests.
//!
//! Tests cover: the worked scenarios, window boundaries, both comparison
//! modes, totals, determinism and the unassigned-subject bucket.

use std::collections::BTreeMap;
use tutor_desk_core::{
    clock::{DateWindow, ReportClock},
    enrollment_analytics::{
        reduce_totals, EnrollmentAnalytics, EnrollmentReport, ReportCache, ReportCacheKey,
        ReportRequest, SubjectStats,
    },
    record::{StudentRecord, StudentStatus},
    subject::{SubjectKey, SubjectOrder},
    target_registry::TargetRegistry,
};

// ── Helpers ──────────────────────────────────────────────────────────────────

fn clock() -> ReportClock {
    ReportClock::at("2024-06-01").expect("fixed clock")
}

fn active(id: i64, subject: &str, start: &str) -> StudentRecord {
    StudentRecord::new(id, StudentStatus::Active)
        .with_subject(subject)
        .with_start(start)
}

fn aggregate(
    records: &[StudentRecord],
    targets: &TargetRegistry,
    window: DateWindow,
) -> Vec<SubjectStats> {
    let order = SubjectOrder::default();
    EnrollmentAnalytics::new(records, targets, &order, &clock()).aggregate(&window)
}

fn only(stats: &[SubjectStats], subject: &str) -> SubjectStats {
    stats
        .iter()
        .find(|s| s.subject == SubjectKey::named(subject))
        .cloned()
        .unwrap_or_else(|| panic!("no stats for {subject}"))
}

fn mixed_snapshot() -> Vec<StudentRecord> {
    vec![
        active(1, "Математика", "2024-01-10"),
        active(2, "Математика", "2024-02-03").with_end("2024-02-20"),
        active(3, "Физика", "2023-09-01").with_end("2024-02-01"),
        StudentRecord::new(4, StudentStatus::Lead).with_subject("Физика"),
        StudentRecord::new(5, StudentStatus::Paused)
            .with_subject("Химия")
            .with_start("2024-02-10"),
        active(6, "Робототехника", "2024-02-28"),
        StudentRecord::new(7, StudentStatus::Active).with_start("2024-01-01"),
        StudentRecord::new(8, StudentStatus::Archived)
            .with_subject("Химия")
            .with_start("2023-01-01")
            .with_end("2024-02-29"),
    ]
}

// ── Scenarios ────────────────────────────────────────────────────────────────

/// A student who started on the first day of the window is both a join
/// and part of the end-of-window headcount.
#[test]
fn joined_inside_window_counts_as_fact() {
    let records = vec![active(1, "Math", "2024-01-01")];
    let stats = aggregate(&records, &TargetRegistry::new(), DateWindow::new("2024-01-01", "2024-01-31"));
    let math = only(&stats, "Math");
    assert_eq!((math.fact, math.joined, math.left, math.dynamics), (1, 1, 0, 1));
}

/// The same student one month later: still enrolled, no movement.
#[test]
fn still_enrolled_in_later_window() {
    let records = vec![active(1, "Math", "2024-01-01")];
    let stats = aggregate(&records, &TargetRegistry::new(), DateWindow::new("2024-02-01", "2024-02-28"));
    let math = only(&stats, "Math");
    assert_eq!((math.fact, math.joined, math.left, math.dynamics), (1, 0, 0, 0));
}

/// Leaving inside the window removes the student from the end headcount.
#[test]
fn leaving_inside_window_drops_fact() {
    let records = vec![active(1, "Math", "2024-01-01").with_end("2024-02-15")];
    let stats = aggregate(&records, &TargetRegistry::new(), DateWindow::new("2024-02-01", "2024-02-28"));
    let math = only(&stats, "Math");
    assert_eq!((math.fact, math.joined, math.left, math.dynamics), (0, 0, 1, -1));
}

/// Two enrolled students against a plan of one is 200% attainment.
#[test]
fn attainment_over_plan() {
    let records = vec![active(1, "Math", "2024-01-01"), active(2, "Math", "2024-01-05")];
    let mut targets = TargetRegistry::new();
    targets.set_target("Math", 1);
    let stats = aggregate(&records, &targets, DateWindow::new("2024-01-01", "2024-01-31"));
    let math = only(&stats, "Math");
    assert_eq!(math.plan, 1);
    assert_eq!(math.fact, 2);
    assert_eq!(EnrollmentReport::attainment_pct(&math), 200);
}

/// An undated lead is presale in every window and nothing else.
#[test]
fn lead_is_presale_only() {
    let records = vec![StudentRecord::new(1, StudentStatus::Lead).with_subject("Physics")];
    for window in [
        DateWindow::new("2020-01-01", "2020-12-31"),
        DateWindow::new("2024-06-01", "2024-06-01"),
        DateWindow::new("2030-01-01", "2030-01-31"),
    ] {
        let physics = only(&aggregate(&records, &TargetRegistry::new(), window), "Physics");
        assert_eq!((physics.fact, physics.joined, physics.left), (0, 0, 0));
        assert_eq!(physics.presale, 1);
    }
}

// ── Window semantics ─────────────────────────────────────────────────────────

/// Joining and leaving strictly inside the window moves joined/left but
/// not the end-of-window fact.
#[test]
fn short_enrollment_inside_window_is_not_fact() {
    let records = vec![active(1, "Math", "2024-03-05").with_end("2024-03-20")];
    let math = only(
        &aggregate(&records, &TargetRegistry::new(), DateWindow::new("2024-03-01", "2024-03-31")),
        "Math",
    );
    assert_eq!((math.fact, math.joined, math.left, math.dynamics), (0, 1, 1, 0));
}

/// Both window ends are inclusive for joins and departures.
#[test]
fn window_bounds_are_inclusive() {
    let records = vec![
        active(1, "Math", "2024-03-01"),
        active(2, "Math", "2024-01-01").with_end("2024-03-31"),
        active(3, "Math", "2024-04-01"),
    ];
    let math = only(
        &aggregate(&records, &TargetRegistry::new(), DateWindow::new("2024-03-01", "2024-03-31")),
        "Math",
    );
    assert_eq!(math.joined, 1);
    assert_eq!(math.left, 1);
    // #2 leaves on the end date, #3 has not started yet.
    assert_eq!(math.fact, 1);
}

/// Presale ignores the window entirely, even for a window in the past.
#[test]
fn presale_is_a_live_snapshot() {
    let records = vec![
        StudentRecord::new(1, StudentStatus::Lead)
            .with_subject("Math")
            .with_start("2025-01-01"),
        active(2, "Math", "2019-01-01"),
    ];
    let math = only(
        &aggregate(&records, &TargetRegistry::new(), DateWindow::new("2020-01-01", "2020-01-31")),
        "Math",
    );
    assert_eq!(math.presale, 1);
    assert_eq!(math.fact, 1);
}

/// Undated active students only appear in a window that ends today.
#[test]
fn undated_active_counts_only_for_today() {
    let records = vec![StudentRecord::new(1, StudentStatus::Active).with_subject("Math")];
    let today = only(
        &aggregate(&records, &TargetRegistry::new(), DateWindow::new("2024-05-01", "2024-06-01")),
        "Math",
    );
    assert_eq!(today.fact, 1);
    assert_eq!(today.joined, 0);

    let earlier = only(
        &aggregate(&records, &TargetRegistry::new(), DateWindow::new("2024-05-01", "2024-05-31")),
        "Math",
    );
    assert_eq!(earlier.fact, 0);
}

/// Records without a subject aggregate under the unassigned bucket,
/// which sorts with the non-priority subjects and uses the configured label.
#[test]
fn missing_subjects_form_their_own_bucket() {
    let mut blank = active(2, "", "2024-01-01");
    blank.subject = Some(String::new());
    let records = vec![
        StudentRecord::new(1, StudentStatus::Active).with_start("2024-01-01"),
        blank,
        active(3, "Физика", "2024-01-01"),
    ];
    let mut targets = TargetRegistry::new();
    targets.set_target("Без предмета", 4);
    let stats = aggregate(&records, &targets, DateWindow::new("2024-01-01", "2024-01-31"));

    assert_eq!(stats.len(), 2);
    assert_eq!(stats[0].subject, SubjectKey::named("Физика"));
    assert_eq!(stats[1].subject, SubjectKey::unassigned("Без предмета"));
    assert_eq!(stats[1].label, "Без предмета");
    assert_eq!(stats[1].fact, 2);
    assert_eq!(stats[1].plan, 4);
}

/// A record filed under the literal unassigned label lands in the same
/// row as records with no subject.
#[test]
fn literal_unassigned_label_shares_the_bucket() {
    let records = vec![
        StudentRecord::new(1, StudentStatus::Active).with_start("2024-01-01"),
        active(2, "Без предмета", "2024-01-05"),
        active(3, "Физика", "2024-01-01"),
    ];
    let stats = aggregate(&records, &TargetRegistry::new(), DateWindow::new("2024-01-01", "2024-01-31"));

    let labels: Vec<&str> = stats.iter().map(|s| s.label.as_str()).collect();
    assert_eq!(labels, vec!["Физика", "Без предмета"]);
    assert_eq!(stats[1].fact, 2);
    assert_eq!(stats[1].joined, 2);
}

/// Spreadsheet imports leave `""` in blank date cells.
fn imported(json: &str) -> Vec<StudentRecord> {
    serde_json::from_str(json).expect("imported records")
}

/// A blank end date means the student has not left.
#[test]
fn blank_end_date_is_still_enrolled() {
    let records = imported(
        r#"[{"id": 1, "status": "Активный", "subject": "Math",
             "startDate": "2024-01-01", "endDate": ""}]"#,
    );
    let math = only(
        &aggregate(&records, &TargetRegistry::new(), DateWindow::new("2024-02-01", "2024-02-28")),
        "Math",
    );
    assert_eq!((math.fact, math.joined, math.left), (1, 0, 0));
}

/// A blank start date behaves like a missing one: counted only in a
/// window that ends today, never as a join.
#[test]
fn blank_start_date_is_undated() {
    let records = imported(
        r#"[{"id": 1, "status": "Активный", "subject": "Math", "startDate": "", "endDate": " "}]"#,
    );
    let past = only(
        &aggregate(&records, &TargetRegistry::new(), DateWindow::new("2024-02-01", "2024-02-28")),
        "Math",
    );
    assert_eq!((past.fact, past.joined, past.left), (0, 0, 0));

    let today = only(
        &aggregate(&records, &TargetRegistry::new(), DateWindow::new("2024-05-01", "2024-06-01")),
        "Math",
    );
    assert_eq!((today.fact, today.joined, today.left), (1, 0, 0));
}

// ── Properties ───────────────────────────────────────────────────────────────

/// dynamics is joined − left for every subject and window.
#[test]
fn dynamics_is_joined_minus_left() {
    let records = mixed_snapshot();
    for window in [
        DateWindow::new("2024-02-01", "2024-02-29"),
        DateWindow::new("2023-01-01", "2024-12-31"),
        DateWindow::new("2024-02-20", "2024-02-20"),
    ] {
        for s in aggregate(&records, &TargetRegistry::new(), window) {
            assert_eq!(s.dynamics, s.joined as i64 - s.left as i64, "{}", s.label);
        }
    }
}

/// Totals are the component-wise sum of the subject rows.
#[test]
fn totals_sum_every_column() {
    let mut targets = TargetRegistry::new();
    targets.set_target("Математика", 30);
    targets.set_target("Химия", 20);
    let stats = aggregate(&mixed_snapshot(), &targets, DateWindow::new("2024-02-01", "2024-02-29"));
    let totals = reduce_totals(&stats);

    assert_eq!(totals.fact, stats.iter().map(|s| s.fact as u64).sum::<u64>());
    assert_eq!(totals.plan, 50);
    assert_eq!(totals.presale, 1);
    assert_eq!(totals.joined, stats.iter().map(|s| s.joined as u64).sum::<u64>());
    assert_eq!(totals.left, stats.iter().map(|s| s.left as u64).sum::<u64>());
    assert_eq!(totals.dynamics, totals.joined as i64 - totals.left as i64);
}

/// Hand-checked figures for the mixed snapshot over February 2024.
#[test]
fn mixed_snapshot_february_figures() {
    let stats = aggregate(&mixed_snapshot(), &TargetRegistry::new(), DateWindow::new("2024-02-01", "2024-02-29"));
    let labels: Vec<&str> = stats.iter().map(|s| s.label.as_str()).collect();
    assert_eq!(labels, vec!["Химия", "Физика", "Математика", "Без предмета", "Робототехника"]);

    let chem = only(&stats, "Химия");
    assert_eq!((chem.fact, chem.joined, chem.left), (1, 1, 1));

    let physics = only(&stats, "Физика");
    assert_eq!((physics.fact, physics.presale, physics.left), (0, 1, 1));

    let math = only(&stats, "Математика");
    assert_eq!((math.fact, math.joined, math.left), (1, 1, 1));

    let robotics = only(&stats, "Робототехника");
    assert_eq!((robotics.fact, robotics.joined), (1, 1));
}

/// Identical inputs produce byte-identical reports.
#[test]
fn derive_is_deterministic() {
    let records = mixed_snapshot();
    let targets = TargetRegistry::new();
    let order = SubjectOrder::default();
    let request = ReportRequest::period_default(&clock());

    let a = EnrollmentAnalytics::new(&records, &targets, &order, &clock()).derive(&request);
    let b = EnrollmentAnalytics::new(&records, &targets, &order, &clock()).derive(&request);
    assert_eq!(
        serde_json::to_string(&a).unwrap(),
        serde_json::to_string(&b).unwrap()
    );
}

/// Record order in the snapshot does not change the catalog order.
#[test]
fn catalog_order_is_stable() {
    let order = SubjectOrder::default();
    let mut records = mixed_snapshot();
    let first = order.list_subjects(&records);
    records.reverse();
    assert_eq!(first, order.list_subjects(&records));
}

// ── Comparison ───────────────────────────────────────────────────────────────

/// Daily mode compares today's headcount with the comparison date.
#[test]
fn daily_baseline_counts_compare_date() {
    let records = vec![
        active(1, "Math", "2024-05-01"),
        active(2, "Math", "2024-06-01"),
        active(3, "Math", "2024-04-01").with_end("2024-06-01"),
    ];
    let targets = TargetRegistry::new();
    let order = SubjectOrder::default();
    let request = ReportRequest::daily_default(&clock());
    let report = EnrollmentAnalytics::new(&records, &targets, &order, &clock()).derive(&request);

    let math = SubjectKey::named("Math");
    assert_eq!(report.stats[0].fact, 2);
    assert_eq!(report.baseline[&math], 2);
    assert_eq!(report.fact_delta(&math), 0);
    assert_eq!(report.stats[0].joined, 1);
    assert_eq!(report.stats[0].left, 1);
}

/// Period mode takes the fact of an independent second window.
#[test]
fn period_baseline_uses_second_window_fact() {
    let records = vec![
        active(1, "Math", "2024-01-10"),
        active(2, "Math", "2024-02-10"),
        active(3, "Math", "2024-02-12"),
        active(4, "Art", "2023-12-01").with_end("2024-01-15"),
    ];
    let targets = TargetRegistry::new();
    let order = SubjectOrder::default();
    let request = ReportRequest::Period {
        primary:    DateWindow::new("2024-02-01", "2024-02-29"),
        comparison: DateWindow::new("2024-01-01", "2024-01-31"),
    };
    let report = EnrollmentAnalytics::new(&records, &targets, &order, &clock()).derive(&request);

    let math = SubjectKey::named("Math");
    let art = SubjectKey::named("Art");
    assert_eq!(report.baseline[&math], 1);
    assert_eq!(report.baseline[&art], 0);
    assert_eq!(report.fact_delta(&math), 2);
    assert_eq!(report.fact_delta(&art), 0);
    assert_eq!(report.baseline.len(), report.stats.len());
}

/// Total attainment is computed from the totals row, 0 with no plan.
#[test]
fn total_attainment_uses_totals() {
    let records = vec![active(1, "Math", "2024-01-01"), active(2, "Art", "2024-01-01")];
    let order = SubjectOrder::default();
    let request = ReportRequest::daily_default(&clock());

    let report = EnrollmentAnalytics::new(&records, &TargetRegistry::new(), &order, &clock()).derive(&request);
    assert_eq!(report.total_attainment_pct(), 0);

    let targets = TargetRegistry::from_map(BTreeMap::from([("Math".to_string(), 4)]));
    let report = EnrollmentAnalytics::new(&records, &targets, &order, &clock()).derive(&request);
    assert_eq!(report.total_attainment_pct(), 50);
}

// ── Cache ────────────────────────────────────────────────────────────────────

/// The cache reuses a report until one of its inputs changes.
#[test]
fn cache_rederives_only_on_input_change() {
    let records = vec![active(1, "Math", "2024-01-01")];
    let order = SubjectOrder::default();
    let mut targets = TargetRegistry::new();
    let request = ReportRequest::daily_default(&clock());
    let mut cache = ReportCache::new();
    let mut derivations = 0;

    let key = |targets: &TargetRegistry, revision: i64| ReportCacheKey {
        snapshot_revision: revision,
        targets:           targets.clone(),
        request:           request.clone(),
        today:             clock().today(),
    };

    for _ in 0..3 {
        cache.get_or_derive(key(&targets, 1), || {
            derivations += 1;
            EnrollmentAnalytics::new(&records, &targets, &order, &clock()).derive(&request)
        });
    }
    assert_eq!(derivations, 1);

    targets.set_target("Math", 2);
    let report = cache.get_or_derive(key(&targets, 1), || {
        derivations += 1;
        EnrollmentAnalytics::new(&records, &targets, &order, &clock()).derive(&request)
    });
    assert_eq!(report.stats[0].plan, 2);
    assert_eq!(derivations, 2);

    cache.get_or_derive(key(&targets, 2), || {
        derivations += 1;
        EnrollmentAnalytics::new(&records, &targets, &order, &clock()).derive(&request)
    });
    assert_eq!(derivations, 3);
}
