//! ActionDispatcher: hands a Cohort to an external sink without blocking
//! the caller.
//!
//! RULES:
//!   - The cohort is never mutated; the dispatcher works on its JSON form.
//!   - `dispatch` returns immediately. The outcome arrives through the
//!     returned handle or a callback.
//!   - Failures are classified (network / validation / rejection) and
//!     reported, never retried here.

use crate::{
    cohort::Cohort,
    config::{DispatchConfig, SinkKind},
    error::{DashError, DashResult, DispatchError},
    store::{CohortOutbox, OutboxSink},
    types::DispatchId,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Serialize;
use std::{sync::Arc, time::Duration};
use tokio::task::JoinHandle;

// ── Wire types ───────────────────────────────────────────────────────────────

/// What a sink receives for one dispatch.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatchEnvelope {
    pub dispatch_id: DispatchId,
    pub cohort_type: String,
    pub created_at:  DateTime<Utc>,
    pub cohort:      serde_json::Value,
}

impl DispatchEnvelope {
    pub fn new(cohort: &Cohort) -> Self {
        Self {
            dispatch_id: uuid::Uuid::new_v4().to_string(),
            cohort_type: cohort.type_tag().to_string(),
            created_at:  Utc::now(),
            cohort:      cohort.to_json(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DispatchOutcome {
    pub dispatch_id: DispatchId,
    pub cohort_type: String,
    pub error:       Option<DispatchError>,
}

impl DispatchOutcome {
    pub fn ok(&self) -> bool {
        self.error.is_none()
    }
}

impl DispatchError {
    /// Stable classification string for the UI layer.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Network(_)       => "network",
            Self::Validation(_)    => "validation",
            Self::Rejected { .. }  => "external_rejection",
        }
    }
}

// ── Sink trait ───────────────────────────────────────────────────────────────

/// Anything that can take delivery of a cohort: an ad platform, an email
/// tool, a local outbox.
#[async_trait]
pub trait CohortSink: Send + Sync {
    fn name(&self) -> &'static str;

    async fn deliver(&self, envelope: &DispatchEnvelope) -> Result<(), DispatchError>;
}

/// POSTs the envelope as JSON to a fixed endpoint.
pub struct HttpSink {
    client:   Client,
    endpoint: String,
}

impl HttpSink {
    pub fn new(endpoint: &str, timeout: Duration) -> DashResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| DashError::Config(format!("http sink client: {e}")))?;
        Ok(Self { client, endpoint: endpoint.to_string() })
    }
}

#[async_trait]
impl CohortSink for HttpSink {
    fn name(&self) -> &'static str {
        "http"
    }

    async fn deliver(&self, envelope: &DispatchEnvelope) -> Result<(), DispatchError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(envelope)
            .send()
            .await
            .map_err(|e| DispatchError::Network(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let body = response.text().await.unwrap_or_default();
        Err(DispatchError::Rejected { status: status.as_u16(), body })
    }
}

/// Build the sink named in configuration.
pub fn sink_from_config(config: &DispatchConfig) -> DashResult<Arc<dyn CohortSink>> {
    match config.sink {
        SinkKind::Http => {
            let endpoint = config
                .endpoint
                .as_deref()
                .ok_or_else(|| DashError::Config("http sink requires dispatch.endpoint".into()))?;
            Ok(Arc::new(HttpSink::new(endpoint, Duration::from_millis(config.timeout_ms))?))
        }
        SinkKind::Outbox => {
            let outbox = if config.outbox_path == ":memory:" {
                CohortOutbox::in_memory()?
            } else {
                CohortOutbox::open(&config.outbox_path)?
            };
            outbox.migrate()?;
            Ok(Arc::new(OutboxSink::new(outbox)))
        }
    }
}

// ── Dispatcher ───────────────────────────────────────────────────────────────

/// A dispatch in progress.
pub struct DispatchHandle {
    pub dispatch_id: DispatchId,
    cohort_type:     String,
    inner:           JoinHandle<DispatchOutcome>,
}

impl DispatchHandle {
    /// Wait for the sink's answer.
    pub async fn outcome(self) -> DispatchOutcome {
        match self.inner.await {
            Ok(outcome) => outcome,
            Err(e) => DispatchOutcome {
                dispatch_id: self.dispatch_id,
                cohort_type: self.cohort_type,
                error:       Some(DispatchError::Network(format!("dispatch task ended: {e}"))),
            },
        }
    }
}

#[derive(Clone)]
pub struct ActionDispatcher {
    sink:    Arc<dyn CohortSink>,
    timeout: Duration,
}

impl ActionDispatcher {
    pub fn new(sink: Arc<dyn CohortSink>, timeout: Duration) -> Self {
        Self { sink, timeout }
    }

    pub fn sink_name(&self) -> &'static str {
        self.sink.name()
    }

    /// Start delivering `cohort`. Must run inside a tokio runtime.
    pub fn dispatch(&self, cohort: &Cohort) -> DispatchHandle {
        let envelope = DispatchEnvelope::new(cohort);
        let validation = cohort.validate();
        let dispatch_id = envelope.dispatch_id.clone();
        let cohort_type = envelope.cohort_type.clone();
        let sink = self.sink.clone();
        let timeout = self.timeout;

        log::info!(
            "dispatch: {} '{}' → {}",
            envelope.cohort_type, cohort.description(), sink.name()
        );

        let inner = tokio::spawn(async move {
            let result = match validation {
                Err(e) => Err(e),
                Ok(()) => match tokio::time::timeout(timeout, sink.deliver(&envelope)).await {
                    Ok(result) => result,
                    Err(_) => Err(DispatchError::Network(format!(
                        "sink '{}' did not answer within {} ms",
                        sink.name(),
                        timeout.as_millis()
                    ))),
                },
            };
            if let Err(e) = &result {
                log::warn!("dispatch: {} failed ({}): {e}", envelope.dispatch_id, e.kind());
            }
            DispatchOutcome {
                dispatch_id: envelope.dispatch_id,
                cohort_type: envelope.cohort_type,
                error:       result.err(),
            }
        });

        DispatchHandle { dispatch_id, cohort_type, inner }
    }

    /// Fire-and-forget with a completion callback.
    pub fn dispatch_with<F>(&self, cohort: &Cohort, on_done: F) -> DispatchId
    where
        F: FnOnce(DispatchOutcome) + Send + 'static,
    {
        let handle = self.dispatch(cohort);
        let dispatch_id = handle.dispatch_id.clone();
        tokio::spawn(async move {
            on_done(handle.outcome().await);
        });
        dispatch_id
    }
}
