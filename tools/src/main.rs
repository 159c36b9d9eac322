//! report-runner: headless host for the tutoring desk analytics.
//!
//! Usage:
//!   report-runner --db desk.db --seed-json data.json --mode daily --date 2024-02-01
//!   report-runner --db desk.db --mode period --p1 2024-02-01..2024-02-29 --p2 2024-01-01..2024-01-31
//!   report-runner --db desk.db --set-target Физика=15
//!   report-runner --db desk.db --ipc-mode

use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::env;
use std::io::{self, BufRead, Write};
use tutor_desk_core::{
    clock::{CalendarDate, DateWindow, ReportClock},
    config::ReportConfig,
    dashboard::DashboardSummary,
    enrollment_analytics::{
        EnrollmentAnalytics, EnrollmentReport, ReportCache, ReportCacheKey, ReportRequest,
    },
    error::DeskError,
    record::{StudentRecord, Transaction},
    store::{DeskStore, StoreKey},
    subject::SubjectOrder,
    target_registry::TargetRegistry,
    types::TargetCount,
};

#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum IpcCommand {
    GetReport {
        #[serde(default)]
        request: Option<ReportRequest>,
    },
    SetTarget {
        subject: String,
        value:   TargetCount,
    },
    CommitTargets,
    Dashboard,
    Quit,
}

#[derive(Deserialize)]
struct SeedDataset {
    #[serde(default)]
    students: Vec<StudentRecord>,
    #[serde(default)]
    transactions: Vec<Transaction>,
    #[serde(default)]
    subject_targets: Option<BTreeMap<String, TargetCount>>,
}

/// One operator session: the store, the in-memory target registry and
/// the last derived report.
struct Session {
    store:   DeskStore,
    config:  ReportConfig,
    order:   SubjectOrder,
    clock:   ReportClock,
    targets: TargetRegistry,
    cache:   ReportCache,
}

impl Session {
    fn new(store: DeskStore, config: ReportConfig, clock: ReportClock) -> Self {
        let targets = TargetRegistry::load(&store);
        let order = SubjectOrder::from_config(&config);
        Self {
            store,
            config,
            order,
            clock,
            targets,
            cache: ReportCache::new(),
        }
    }

    fn report(&mut self, request: &ReportRequest) -> Result<&EnrollmentReport> {
        let key = ReportCacheKey {
            snapshot_revision: self.store.revision(StoreKey::Students)?,
            targets:           self.targets.clone(),
            request:           request.clone(),
            today:             self.clock.today(),
        };
        let Self { store, order, clock, targets, cache, .. } = self;
        Ok(cache.get_or_derive(key, || {
            let students = store.students();
            EnrollmentAnalytics::new(&students, targets, order, clock).derive(request)
        }))
    }

    fn dashboard(&self) -> DashboardSummary {
        DashboardSummary::compute(&self.store.students(), &self.store.transactions(), &self.config)
    }
}

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let ipc_mode = args.iter().any(|a| a == "--ipc-mode");
    let db = flag_value(&args, "--db").unwrap_or(":memory:");

    let config = match flag_value(&args, "--config") {
        Some(path) => ReportConfig::load(path)?,
        None => ReportConfig::default(),
    };
    let clock = match flag_value(&args, "--today") {
        Some(day) => ReportClock::at(day)?,
        None => ReportClock::system(),
    };

    let store = DeskStore::open(db)?;
    store.migrate()?;

    if let Some(path) = flag_value(&args, "--seed-json") {
        seed_store(&store, path)?;
    }

    let mut session = Session::new(store, config, clock);

    let edits = target_edits(&args)?;
    if !edits.is_empty() {
        for (subject, value) in edits {
            session.targets.set_target(&subject, value);
        }
        session.targets.commit(&session.store)?;
    }

    if ipc_mode {
        run_ipc_loop(&mut session)?;
    } else {
        let request = build_request(&args, &session.clock)?;
        let report = session.report(&request)?.clone();
        print_report(&report);
        print_dashboard(&session.dashboard());
    }

    Ok(())
}

fn seed_store(store: &DeskStore, path: &str) -> Result<()> {
    let content = std::fs::read_to_string(path).with_context(|| format!("Cannot read {path}"))?;
    let dataset: SeedDataset =
        serde_json::from_str(&content).with_context(|| format!("Cannot parse {path}"))?;
    store.save_students(&dataset.students)?;
    store.save_transactions(&dataset.transactions)?;
    if let Some(targets) = dataset.subject_targets {
        TargetRegistry::from_map(targets).commit(store)?;
    }
    log::info!(
        "seeded {} students and {} transactions from {path}",
        dataset.students.len(),
        dataset.transactions.len()
    );
    Ok(())
}

fn build_request(args: &[String], clock: &ReportClock) -> Result<ReportRequest> {
    let mode = flag_value(args, "--mode").unwrap_or("daily");
    match mode {
        "daily" => {
            let date = match flag_value(args, "--date") {
                Some(d) => CalendarDate::parse_strict(d)?,
                None => clock.today(),
            };
            let compare_date = match flag_value(args, "--compare-date") {
                Some(d) => CalendarDate::parse_strict(d)?,
                None => clock.yesterday(),
            };
            Ok(ReportRequest::Daily { date, compare_date })
        }
        "period" => {
            let primary = match flag_value(args, "--p1") {
                Some(w) => DateWindow::parse_strict(w)?,
                None => clock.month_to_date(),
            };
            let comparison = match flag_value(args, "--p2") {
                Some(w) => DateWindow::parse_strict(w)?,
                None => clock.previous_month_window(),
            };
            Ok(ReportRequest::Period { primary, comparison })
        }
        other => Err(DeskError::UnknownMode { mode: other.to_string() }.into()),
    }
}

fn target_edits(args: &[String]) -> Result<Vec<(String, TargetCount)>> {
    args.windows(2)
        .filter(|w| w[0] == "--set-target")
        .map(|w| -> Result<(String, TargetCount)> {
            let (subject, value) = w[1]
                .rsplit_once('=')
                .with_context(|| format!("--set-target expects SUBJECT=N, got {}", w[1]))?;
            let value = value
                .trim()
                .parse::<TargetCount>()
                .with_context(|| format!("target for {subject} is not a non-negative integer"))?;
            Ok((subject.trim().to_string(), value))
        })
        .collect()
}

fn run_ipc_loop(session: &mut Session) -> Result<()> {
    let stdin = io::stdin();
    let mut stdout = io::stdout();
    let mut handle = stdin.lock();
    let mut buffer = String::new();

    loop {
        buffer.clear();
        let bytes_read = handle.read_line(&mut buffer)?;
        if bytes_read == 0 {
            break; // EOF
        }

        let cmd: IpcCommand = match serde_json::from_str(&buffer) {
            Ok(c) => c,
            Err(e) => {
                let err_json = serde_json::json!({ "error": e.to_string() });
                writeln!(stdout, "{}", err_json)?;
                stdout.flush()?;
                continue;
            }
        };

        match cmd {
            IpcCommand::Quit => break,
            IpcCommand::GetReport { request } => {
                let request = request.unwrap_or_else(|| ReportRequest::daily_default(&session.clock));
                let report = session.report(&request)?;
                writeln!(stdout, "{}", serde_json::to_string(report)?)?;
            }
            IpcCommand::SetTarget { subject, value } => {
                session.targets.set_target(&subject, value);
                writeln!(stdout, "{}", serde_json::to_string(&session.targets)?)?;
            }
            IpcCommand::CommitTargets => {
                session.targets.commit(&session.store)?;
                writeln!(stdout, "{}", serde_json::json!({ "committed": session.targets.as_map().len() }))?;
            }
            IpcCommand::Dashboard => {
                writeln!(stdout, "{}", serde_json::to_string(&session.dashboard())?)?;
            }
        }
        stdout.flush()?;
    }
    Ok(())
}

fn print_report(report: &EnrollmentReport) {
    println!("=== ENROLLMENT REPORT ===");
    match &report.request {
        ReportRequest::Daily { date, compare_date } => {
            println!("  day:        {date} (vs {compare_date})");
        }
        ReportRequest::Period { primary, comparison } => {
            println!("  period:     {primary} (vs {comparison})");
        }
    }
    println!();
    for stat in &report.stats {
        let delta = report.fact_delta(&stat.subject);
        println!(
            "  {:<20} plan {:>4} | fact {:>4} ({:>+4}) | {:>4}% | lead {:>3} | +{} -{} = {:+}",
            stat.label,
            stat.plan,
            stat.fact,
            delta,
            EnrollmentReport::attainment_pct(stat),
            stat.presale,
            stat.joined,
            stat.left,
            stat.dynamics,
        );
    }
    let t = &report.totals;
    println!();
    println!(
        "  TOTAL: {} / {} / {} | plan {}% | +{} -{} = {:+}",
        t.plan,
        t.fact,
        t.presale,
        report.total_attainment_pct(),
        t.joined,
        t.left,
        t.dynamics
    );
}

fn print_dashboard(summary: &DashboardSummary) {
    println!();
    println!("=== DASHBOARD ===");
    println!("  active students:  {}", summary.active_students);
    println!("  revenue:          {:.2}", summary.revenue);
    println!("  outstanding debt: {:.2}", summary.outstanding_debt);
    println!("  at risk:          {}", summary.at_risk_students);
}

fn flag_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.windows(2)
        .find(|w| w[0] == flag)
        .map(|w| w[1].as_str())
}
