//! dashboard-runner: headless driver for a lifecycle dashboard session.
//!
//! Usage:
//!   dashboard-runner --config dashboard.json --section retention
//!   dashboard-runner --seed 12345 --latency-ms 0 --today 2024-03-31
//!   dashboard-runner --ipc-mode      (JSON-lines commands on stdin)

use anyhow::{anyhow, Result};
use chrono::NaiveDate;
use lifecycle_core::{
    chart::{action_plan, total_expected_impact, ChartKind, Section},
    cohort::Cohort,
    command::FilterCommand,
    config::DashboardConfig,
    dispatch::{DispatchHandle, DispatchOutcome},
    session::DashboardSession,
    snapshot::DashboardSnapshot,
};
use serde::Serialize;
use std::env;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct DispatchReport {
    dispatch_id: String,
    cohort_type: String,
    ok:          bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    error_kind:  Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error:       Option<String>,
}

impl From<DispatchOutcome> for DispatchReport {
    fn from(outcome: DispatchOutcome) -> Self {
        Self {
            ok:          outcome.ok(),
            error_kind:  outcome.error.as_ref().map(|e| e.kind()),
            error:       outcome.error.as_ref().map(|e| e.to_string()),
            dispatch_id: outcome.dispatch_id,
            cohort_type: outcome.cohort_type,
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct IpcReply {
    state:    DashboardSnapshot,
    #[serde(skip_serializing_if = "Option::is_none")]
    cohort:   Option<Cohort>,
    #[serde(skip_serializing_if = "Option::is_none")]
    dispatch: Option<DispatchReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error:    Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let ipc_mode = args.iter().any(|a| a == "--ipc-mode");

    let mut config = match flag_value(&args, "--config") {
        Some(path) => DashboardConfig::load(path)?,
        None => DashboardConfig::default_test(),
    };
    config.synthetic.seed = parse_arg(&args, "--seed", config.synthetic.seed);
    config.synthetic.latency_ms = parse_arg(&args, "--latency-ms", config.synthetic.latency_ms);

    let today = match flag_value(&args, "--today") {
        Some(raw) => NaiveDate::parse_from_str(raw, "%Y-%m-%d")
            .map_err(|e| anyhow!("--today {raw}: {e}"))?,
        None => chrono::Local::now().date_naive(),
    };
    let section = match flag_value(&args, "--section") {
        Some(raw) => Some(parse_section(raw)?),
        None => None,
    };

    if !ipc_mode {
        println!("Lifecycle dashboard: dashboard-runner");
        println!("  source:    {}", config.api_base.as_deref().unwrap_or("synthetic"));
        println!("  seed:      {}", config.synthetic.seed);
        println!("  today:     {today}");
        println!("  sink:      {:?}", config.dispatch.sink);
        println!();
    }

    let mut session = DashboardSession::from_config(config, today)?;

    if ipc_mode {
        run_ipc_loop(&mut session).await?;
    } else {
        session.settle().await?;
        print_summary(&session, section);
        dispatch_sample_cohorts(&session).await?;
    }

    session.end();
    Ok(())
}

async fn run_ipc_loop(session: &mut DashboardSession) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }

        let command: FilterCommand = match serde_json::from_str(&line) {
            Ok(c) => c,
            Err(e) => {
                let err_json = serde_json::json!({ "error": e.to_string() });
                stdout.write_all(format!("{err_json}\n").as_bytes()).await?;
                stdout.flush().await?;
                continue;
            }
        };
        if command.is_quit() {
            break;
        }
        let include_data = matches!(command, FilterCommand::GetState { include_data: true });

        let reply = match command.apply(session) {
            Ok(outcome) => {
                session.settle().await?;
                let dispatch = match outcome.dispatch {
                    Some(handle) => Some(DispatchReport::from(handle.outcome().await)),
                    None => None,
                };
                IpcReply {
                    state: session.snapshot(include_data),
                    cohort: outcome.cohort,
                    dispatch,
                    error: None,
                }
            }
            Err(e) => IpcReply {
                state:    session.snapshot(false),
                cohort:   None,
                dispatch: None,
                error:    Some(e.to_string()),
            },
        };

        stdout.write_all(format!("{}\n", serde_json::to_string(&reply)?).as_bytes()).await?;
        stdout.flush().await?;
    }
    Ok(())
}

fn print_summary(session: &DashboardSession, only: Option<Section>) {
    let snapshot = session.snapshot(false);
    println!("=== FILTERS ===");
    println!("  key:            {}", snapshot.query_key);
    println!("  active filters: {}", snapshot.has_active_filters);
    println!("  loading:        {}", snapshot.is_loading);
    println!("  error:          {}", snapshot.is_error);

    let sections = [
        Section::Overview,
        Section::Attribution,
        Section::Incrementality,
        Section::Funnel,
        Section::Ltv,
        Section::Retention,
        Section::ActionPlan,
    ];
    for section in sections.into_iter().filter(|s| only.is_none_or(|o| o == *s)) {
        println!();
        println!("=== {} ===", section.heading().to_uppercase());
        if section == Section::ActionPlan {
            let plan = action_plan();
            for item in &plan {
                println!("  [{}] {} (${})", item.priority, item.title, item.expected_impact);
            }
            println!("  total expected impact: ${}", total_expected_impact(&plan));
            continue;
        }
        for metric in snapshot.section(section) {
            match &metric.error {
                Some(error) => println!("  {:<26} {:?}  {error}", metric.metric.as_str(), metric.status),
                None => println!("  {:<26} {:?}  {} rows", metric.metric.as_str(), metric.status, metric.rows),
            }
        }
    }
}

/// Click the first row of every chart and dispatch the resulting cohorts.
async fn dispatch_sample_cohorts(session: &DashboardSession) -> Result<()> {
    let mut handles: Vec<DispatchHandle> = Vec::new();
    for chart in ChartKind::ALL {
        let payload = match chart.metric() {
            Some(metric) => match session.dataset(metric) {
                Ok(Some(data)) => serde_json::to_value(&*data)?
                    .get(0)
                    .cloned()
                    .unwrap_or_default(),
                Ok(None) => continue,
                Err(e) => {
                    log::warn!("runner: skipping {}: {e}", chart.id());
                    continue;
                }
            },
            None => action_plan()
                .first()
                .map(serde_json::to_value)
                .transpose()?
                .unwrap_or_default(),
        };
        if let Some(handle) = session.act(chart, &payload)? {
            handles.push(handle);
        }
    }

    let outcomes = futures::future::join_all(handles.into_iter().map(|h| h.outcome())).await;
    println!();
    println!("=== DISPATCHED COHORTS ===");
    for outcome in outcomes {
        let report = DispatchReport::from(outcome);
        match report.error {
            Some(error) => println!("  {:<24} FAILED ({}): {error}", report.cohort_type, report.error_kind.unwrap_or("")),
            None => println!("  {:<24} ok  {}", report.cohort_type, report.dispatch_id),
        }
    }
    Ok(())
}

fn parse_section(raw: &str) -> Result<Section> {
    serde_json::from_value(serde_json::Value::String(raw.to_string()))
        .map_err(|_| anyhow!("unknown section '{raw}'"))
}

fn flag_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.windows(2)
        .find(|w| w[0] == flag)
        .map(|w| w[1].as_str())
}

fn parse_arg<T: std::str::FromStr + Copy>(args: &[String], flag: &str, default: T) -> T {
    args.windows(2)
        .find(|w| w[0] == flag)
        .and_then(|w| w[1].parse().ok())
        .unwrap_or(default)
}
