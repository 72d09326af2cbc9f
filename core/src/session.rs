//! DashboardSession: one user's dashboard, with filter context, metric slots,
//! cohort mapping and dispatch, wired together.
//!
//! LIFECYCLE:
//!   start → (filter mutations, refreshes, chart interactions)* → end
//!
//! RULES:
//!   - Every filter mutation goes through the session and is followed by a
//!     reconcile of the orchestrator against the new QueryKey.
//!   - A rejected mutation changes nothing and issues no fetch.
//!   - Reset restores the start-of-session filters and clears the cache.
//!   - After `end` every operation fails with SessionEnded.
//!   - Must be driven from inside a tokio runtime.

use crate::{
    chart::ChartKind,
    cohort::Cohort,
    cohort_builder::{CohortBuilder, Interaction},
    config::DashboardConfig,
    dispatch::{sink_from_config, ActionDispatcher, CohortSink, DispatchHandle},
    error::{DashError, DashResult, FilterError},
    event::OrchestratorEvent,
    filter::FilterState,
    metric::{MetricData, MetricName},
    orchestrator::{DataOrchestrator, MetricStatus, OrchestratorOptions},
    snapshot::DashboardSnapshot,
    source::{source_from_config, MetricRegistry, MetricSource},
};
use chrono::NaiveDate;
use serde_json::Value;
use std::sync::Arc;

pub struct DashboardSession {
    config:       DashboardConfig,
    defaults:     FilterState,
    filters:      FilterState,
    orchestrator: DataOrchestrator,
    builder:      CohortBuilder,
    dispatcher:   ActionDispatcher,
    ended:        bool,
}

impl DashboardSession {
    /// Start a session with session-default filters and issue the first
    /// round of fetches.
    pub fn start(
        config: DashboardConfig,
        source: Arc<dyn MetricSource>,
        sink:   Arc<dyn CohortSink>,
        today:  NaiveDate,
    ) -> DashResult<Self> {
        config.validate()?;
        let defaults = FilterState::session_default(
            config.catalog.clone(),
            today,
            config.default_window_days,
        )
        .map_err(|e| DashError::Config(e.to_string()))?;
        let orchestrator = DataOrchestrator::new(
            MetricRegistry::standard(source.clone()),
            OrchestratorOptions::from_config(&config),
        );
        let dispatcher = ActionDispatcher::new(sink, config.dispatch_timeout());

        log::info!(
            "session: started with source '{}', sink '{}', key {}",
            source.name(),
            dispatcher.sink_name(),
            defaults.query_key()
        );

        let mut session = Self {
            filters: defaults.clone(),
            defaults,
            orchestrator,
            builder: CohortBuilder::standard(),
            dispatcher,
            config,
            ended: false,
        };
        session.reconcile();
        Ok(session)
    }

    /// Start with the source and sink named in `config`.
    pub fn from_config(config: DashboardConfig, today: NaiveDate) -> DashResult<Self> {
        let source = source_from_config(&config)?;
        let sink = sink_from_config(&config.dispatch)?;
        Self::start(config, source, sink, today)
    }

    // ── Filter mutations ───────────────────────────────────────────

    pub fn update_date_range(&mut self, from: NaiveDate, to: NaiveDate) -> DashResult<Vec<OrchestratorEvent>> {
        self.ensure_live()?;
        self.filters.update_date_range(from, to).map_err(rejected)?;
        Ok(self.reconcile())
    }

    pub fn toggle_channel(&mut self, channel: &str) -> DashResult<Vec<OrchestratorEvent>> {
        self.ensure_live()?;
        self.filters.toggle_channel(channel).map_err(rejected)?;
        Ok(self.reconcile())
    }

    pub fn select_all_channels(&mut self) -> DashResult<Vec<OrchestratorEvent>> {
        self.ensure_live()?;
        self.filters.select_all_channels();
        Ok(self.reconcile())
    }

    pub fn clear_channels(&mut self) -> DashResult<Vec<OrchestratorEvent>> {
        self.ensure_live()?;
        self.filters.clear_channels();
        Ok(self.reconcile())
    }

    pub fn update_segment(&mut self, segment: &str) -> DashResult<Vec<OrchestratorEvent>> {
        self.ensure_live()?;
        self.filters.update_segment(segment).map_err(rejected)?;
        Ok(self.reconcile())
    }

    pub fn reset_filters(&mut self) -> DashResult<Vec<OrchestratorEvent>> {
        self.ensure_live()?;
        self.orchestrator.clear_cache();
        self.filters.reset_to(&self.defaults);
        log::info!("session: filters reset to session defaults");
        Ok(self.reconcile())
    }

    fn reconcile(&mut self) -> Vec<OrchestratorEvent> {
        let key = self.filters.query_key();
        self.orchestrator.reconcile(&key)
    }

    // ── Data ───────────────────────────────────────────────────────

    /// Manual retry of one metric, or of every metric when `metric` is None.
    pub fn refresh(&mut self, metric: Option<MetricName>) -> DashResult<Vec<OrchestratorEvent>> {
        self.ensure_live()?;
        Ok(match metric {
            Some(metric) => self.orchestrator.refresh(metric).into_iter().collect(),
            None => self.orchestrator.refresh_all(),
        })
    }

    /// Commit whatever has already resolved. Never waits.
    pub fn poll(&mut self) -> Vec<OrchestratorEvent> {
        self.orchestrator.drain_ready()
    }

    /// Wait until no metric is loading.
    pub async fn settle(&mut self) -> DashResult<Vec<OrchestratorEvent>> {
        self.ensure_live()?;
        Ok(self.orchestrator.settle().await)
    }

    /// The committed dataset for `metric`. A failed slot is an error; a
    /// loading slot is Ok(None).
    pub fn dataset(&self, metric: MetricName) -> DashResult<Option<Arc<MetricData>>> {
        let Some(result) = self.orchestrator.result(metric) else {
            return Ok(None);
        };
        match (&result.status, &result.error) {
            (MetricStatus::Error, Some(error)) => Err(DashError::Fetch {
                metric: metric.to_string(),
                source: error.clone(),
            }),
            _ => Ok(result.data.clone()),
        }
    }

    // ── Cohorts ────────────────────────────────────────────────────

    /// Map a chart interaction to a cohort using the chart's current dataset.
    /// Ok(None) means the payload was not actionable.
    pub fn build_cohort(&self, chart: ChartKind, payload: &Value) -> DashResult<Option<Cohort>> {
        self.ensure_live()?;
        let dataset = chart.metric().and_then(|m| self.orchestrator.data(m));
        let interaction = Interaction::new(payload).with_dataset(dataset.as_deref());
        Ok(self.builder.build(chart, &interaction))
    }

    /// Build and dispatch in one step.
    pub fn act(&self, chart: ChartKind, payload: &Value) -> DashResult<Option<DispatchHandle>> {
        let Some(cohort) = self.build_cohort(chart, payload)? else {
            return Ok(None);
        };
        self.dispatch(&cohort).map(Some)
    }

    /// Dispatch the chart's export cohort.
    pub fn export(&self, chart: ChartKind) -> DashResult<DispatchHandle> {
        self.dispatch(&CohortBuilder::export(chart))
    }

    pub fn dispatch(&self, cohort: &Cohort) -> DashResult<DispatchHandle> {
        self.ensure_live()?;
        Ok(self.dispatcher.dispatch(cohort))
    }

    // ── Reads ──────────────────────────────────────────────────────

    pub fn filters(&self) -> &FilterState {
        &self.filters
    }

    pub fn defaults(&self) -> &FilterState {
        &self.defaults
    }

    pub fn orchestrator(&self) -> &DataOrchestrator {
        &self.orchestrator
    }

    pub fn config(&self) -> &DashboardConfig {
        &self.config
    }

    pub fn snapshot(&self, include_data: bool) -> DashboardSnapshot {
        DashboardSnapshot::capture(&self.filters, &self.orchestrator, include_data)
    }

    pub fn is_ended(&self) -> bool {
        self.ended
    }

    /// Abort outstanding fetches and refuse further work.
    pub fn end(&mut self) {
        if self.ended {
            return;
        }
        self.orchestrator.abort_all();
        self.ended = true;
        log::info!("session: ended");
    }

    fn ensure_live(&self) -> DashResult<()> {
        if self.ended {
            return Err(DashError::SessionEnded);
        }
        Ok(())
    }
}

fn rejected(error: FilterError) -> DashError {
    log::warn!("session: filter change rejected: {error}");
    error.into()
}
