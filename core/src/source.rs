//! MetricSource trait and registry.
//!
//! RULE: Every data backend implements MetricSource.
//! The orchestrator never knows whether a metric came from the network or
//! from the synthetic generators. The fetch function is swapped, not the
//! protocol.

use crate::{
    config::DashboardConfig,
    error::{DashError, DashResult, FetchError},
    http_source::HttpMetricSource,
    metric::{MetricData, MetricName},
    query_key::QueryKey,
    synthetic::SyntheticMetricSource,
};
use async_trait::async_trait;
use std::{sync::Arc, time::Duration};

/// The contract every metric backend must fulfill.
#[async_trait]
pub trait MetricSource: Send + Sync {
    /// Short stable name for logging.
    fn name(&self) -> &'static str;

    /// Resolve one metric for one query key.
    async fn fetch(&self, metric: MetricName, key: &QueryKey) -> Result<MetricData, FetchError>;
}

/// The set of metrics the orchestrator keeps resolved, with the source
/// that serves each one. Registration order is the reconcile order.
#[derive(Clone)]
pub struct MetricRegistry {
    entries: Vec<(MetricName, Arc<dyn MetricSource>)>,
}

impl MetricRegistry {
    pub fn new() -> Self {
        Self { entries: Vec::new() }
    }

    /// Every catalog metric served by one source.
    pub fn standard(source: Arc<dyn MetricSource>) -> Self {
        let mut registry = Self::new();
        for metric in MetricName::ALL {
            registry.register(metric, source.clone());
        }
        registry
    }

    /// Register (or re-point) a metric.
    pub fn register(&mut self, metric: MetricName, source: Arc<dyn MetricSource>) {
        match self.entries.iter_mut().find(|(m, _)| *m == metric) {
            Some(entry) => entry.1 = source,
            None        => self.entries.push((metric, source)),
        }
    }

    pub fn metrics(&self) -> impl Iterator<Item = MetricName> + '_ {
        self.entries.iter().map(|(m, _)| *m)
    }

    pub fn source(&self, metric: MetricName) -> Option<Arc<dyn MetricSource>> {
        self.entries
            .iter()
            .find(|(m, _)| *m == metric)
            .map(|(_, s)| s.clone())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for MetricRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// The HTTP source when `api_base` is configured, otherwise the synthetic one.
pub fn source_from_config(config: &DashboardConfig) -> DashResult<Arc<dyn MetricSource>> {
    match config.api_base.as_deref() {
        Some(api_base) => {
            let source = HttpMetricSource::new(api_base, config.fetch_timeout())
                .map_err(|e| DashError::Config(format!("http source: {e}")))?;
            log::info!("source: http at {api_base}");
            Ok(Arc::new(source))
        }
        None => {
            log::info!(
                "source: synthetic (seed {}, latency {} ms)",
                config.synthetic.seed, config.synthetic.latency_ms
            );
            Ok(Arc::new(SyntheticMetricSource::new(
                config.synthetic.seed,
                Duration::from_millis(config.synthetic.latency_ms),
            )))
        }
    }
}
