//! Snapshot: a serializable view of one dashboard session.
//!
//! Built on demand by the session for the runner's IPC output and for
//! tests. It captures the filters, the key they derive, and the state of
//! every metric slot. Nothing reads a snapshot back into a session.

use crate::{
    chart::Section,
    filter::FilterState,
    metric::{MetricData, MetricName},
    orchestrator::{DataOrchestrator, MetricStatus},
};
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricSnapshot {
    pub metric: MetricName,
    pub status: MetricStatus,
    pub rows:   usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error:  Option<String>,
    /// The key this slot expects, in display form.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key:    Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data:   Option<MetricData>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSnapshot {
    pub filters:            FilterState,
    pub has_active_filters: bool,
    pub query_key:          String,
    pub is_loading:         bool,
    pub is_error:           bool,
    pub metrics:            Vec<MetricSnapshot>,
}

impl DashboardSnapshot {
    /// Capture the current state. `include_data` copies every committed
    /// dataset into the snapshot.
    pub fn capture(filters: &FilterState, orchestrator: &DataOrchestrator, include_data: bool) -> Self {
        let metrics = orchestrator
            .results()
            .map(|(metric, result)| MetricSnapshot {
                metric,
                status: result.status,
                rows:   result.data.as_ref().map_or(0, |d| d.len()),
                error:  result.error.as_ref().map(|e| e.to_string()),
                key:    result.key.as_ref().map(|k| k.to_string()),
                data:   if include_data { result.data.as_deref().cloned() } else { None },
            })
            .collect();

        Self {
            filters:            filters.clone(),
            has_active_filters: filters.has_active_filters(),
            query_key:          filters.query_key().to_string(),
            is_loading:         orchestrator.is_loading(),
            is_error:           orchestrator.is_error(),
            metrics,
        }
    }

    pub fn metric(&self, metric: MetricName) -> Option<&MetricSnapshot> {
        self.metrics.iter().find(|m| m.metric == metric)
    }

    /// The metrics rendered by `section`, in chart order.
    pub fn section(&self, section: Section) -> Vec<&MetricSnapshot> {
        section
            .charts()
            .iter()
            .filter_map(|chart| chart.metric())
            .filter_map(|metric| self.metric(metric))
            .collect()
    }

    pub fn count_with_status(&self, status: MetricStatus) -> usize {
        self.metrics.iter().filter(|m| m.status == status).count()
    }
}
