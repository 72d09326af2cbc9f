use crate::{
    chart::ChartKind,
    cohort::Cohort,
    cohort_builder::CohortBuilder,
    dispatch::DispatchHandle,
    error::DashResult,
    event::OrchestratorEvent,
    metric::MetricName,
    session::DashboardSession,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Everything a dashboard client can ask of a session.
/// Variants are only ever appended.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "cmd", rename_all = "snake_case")]
pub enum FilterCommand {
    // ── Filters ───────────────────────────────────
    SetDateRange { from: NaiveDate, to: NaiveDate },
    ToggleChannel { channel: String },
    SelectAllChannels,
    ClearChannels,
    SetSegment { segment: String },
    ResetFilters,

    // ── Data ──────────────────────────────────────
    Refresh {
        #[serde(default)]
        metric: Option<MetricName>,
    },
    GetState {
        #[serde(default)]
        include_data: bool,
    },

    // ── Cohorts ───────────────────────────────────
    Click { chart: ChartKind, payload: Value },
    Export { chart: ChartKind },

    Quit,
}

/// What applying one command produced.
#[derive(Default)]
pub struct CommandOutcome {
    pub events:   Vec<OrchestratorEvent>,
    pub cohort:   Option<Cohort>,
    pub dispatch: Option<DispatchHandle>,
}

impl FilterCommand {
    /// Apply to `session`. Does not wait for fetches or dispatches.
    pub fn apply(&self, session: &mut DashboardSession) -> DashResult<CommandOutcome> {
        let events = match self {
            Self::SetDateRange { from, to }  => session.update_date_range(*from, *to)?,
            Self::ToggleChannel { channel }  => session.toggle_channel(channel)?,
            Self::SelectAllChannels          => session.select_all_channels()?,
            Self::ClearChannels              => session.clear_channels()?,
            Self::SetSegment { segment }     => session.update_segment(segment)?,
            Self::ResetFilters               => session.reset_filters()?,
            Self::Refresh { metric }         => session.refresh(*metric)?,
            Self::GetState { .. } | Self::Quit => Vec::new(),

            Self::Click { chart, payload } => {
                let Some(cohort) = session.build_cohort(*chart, payload)? else {
                    return Ok(CommandOutcome::default());
                };
                let dispatch = session.dispatch(&cohort)?;
                return Ok(CommandOutcome {
                    events:   Vec::new(),
                    cohort:   Some(cohort),
                    dispatch: Some(dispatch),
                });
            }
            Self::Export { chart } => {
                let cohort = CohortBuilder::export(*chart);
                let dispatch = session.dispatch(&cohort)?;
                return Ok(CommandOutcome {
                    events:   Vec::new(),
                    cohort:   Some(cohort),
                    dispatch: Some(dispatch),
                });
            }
        };
        Ok(CommandOutcome { events, ..Default::default() })
    }

    pub fn is_quit(&self) -> bool {
        matches!(self, Self::Quit)
    }
}
