//! Orchestrator events: what reconciliation and commits actually did.
//!
//! Events are returned to the caller rather than acted on internally;
//! the runner logs them and tests assert on them.

use crate::{error::FetchError, metric::MetricName, query_key::QueryKey};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OrchestratorEvent {
    // ── Reconcile ──────────────────────────────────
    FetchIssued {
        metric: MetricName,
        key:    QueryKey,
        ticket: u64,
    },
    CacheHit {
        metric: MetricName,
        key:    QueryKey,
    },
    /// Already in flight for this key; no second request.
    Joined {
        metric: MetricName,
        key:    QueryKey,
    },
    Aborted {
        metric: MetricName,
        key:    QueryKey,
    },

    // ── Commit ─────────────────────────────────────
    Committed {
        metric: MetricName,
        key:    QueryKey,
        rows:   usize,
    },
    Failed {
        metric: MetricName,
        key:    QueryKey,
        error:  String,
    },
    /// A resolution arrived for a key the slot no longer expects.
    DiscardedStale {
        metric:   MetricName,
        key:      QueryKey,
        expected: Option<QueryKey>,
    },

    // ── Cache ──────────────────────────────────────
    Evicted {
        metric: MetricName,
        key:    QueryKey,
    },
}

impl OrchestratorEvent {
    pub fn metric(&self) -> MetricName {
        match self {
            Self::FetchIssued { metric, .. }
            | Self::CacheHit { metric, .. }
            | Self::Joined { metric, .. }
            | Self::Aborted { metric, .. }
            | Self::Committed { metric, .. }
            | Self::Failed { metric, .. }
            | Self::DiscardedStale { metric, .. }
            | Self::Evicted { metric, .. } => *metric,
        }
    }

    pub(crate) fn failed(metric: MetricName, key: QueryKey, error: &FetchError) -> Self {
        Self::Failed { metric, key, error: error.to_string() }
    }
}
