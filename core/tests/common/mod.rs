//! Shared fakes for the integration tests.
#![allow(dead_code)]

use async_trait::async_trait;
use chrono::NaiveDate;
use lifecycle_core::{
    dispatch::{CohortSink, DispatchEnvelope},
    error::{DispatchError, FetchError},
    metric::{MetricData, MetricName},
    query_key::QueryKey,
    source::MetricSource,
    synthetic::SyntheticMetricSource,
};
use std::{
    collections::{HashMap, HashSet},
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};
use tokio::sync::Semaphore;

/// Route library logs through the test harness (`RUST_LOG=debug` to see them).
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn key(from: NaiveDate, to: NaiveDate, channels: &[&str]) -> QueryKey {
    QueryKey::from_parts(from, to, channels.iter().copied(), "All")
}

// ── Gated source ─────────────────────────────────────────────────────────────

/// A metric source whose fetches block until the test opens the gate for
/// their key. Data comes from the synthetic generators.
pub struct GatedSource {
    gates:    Mutex<HashMap<QueryKey, Arc<Semaphore>>>,
    calls:    Mutex<Vec<(MetricName, QueryKey)>>,
    failing:  Mutex<HashSet<MetricName>>,
    data:     SyntheticMetricSource,
}

impl GatedSource {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            gates:   Mutex::new(HashMap::new()),
            calls:   Mutex::new(Vec::new()),
            failing: Mutex::new(HashSet::new()),
            data:    SyntheticMetricSource::new(11, Duration::ZERO),
        })
    }

    fn gate(&self, key: &QueryKey) -> Arc<Semaphore> {
        self.gates
            .lock()
            .unwrap()
            .entry(key.clone())
            .or_insert_with(|| Arc::new(Semaphore::new(0)))
            .clone()
    }

    /// Let every current and future fetch for `key` through.
    pub fn open(&self, key: &QueryKey) {
        self.gate(key).add_permits(1);
    }

    pub fn fail(&self, metric: MetricName) {
        self.failing.lock().unwrap().insert(metric);
    }

    pub fn heal(&self, metric: MetricName) {
        self.failing.lock().unwrap().remove(&metric);
    }

    pub fn calls_for(&self, key: &QueryKey) -> usize {
        self.calls.lock().unwrap().iter().filter(|(_, k)| k == key).count()
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn expected(&self, metric: MetricName, key: &QueryKey) -> MetricData {
        self.data.generate(metric, key)
    }
}

#[async_trait]
impl MetricSource for GatedSource {
    fn name(&self) -> &'static str {
        "gated"
    }

    async fn fetch(&self, metric: MetricName, key: &QueryKey) -> Result<MetricData, FetchError> {
        self.calls.lock().unwrap().push((metric, key.clone()));
        let gate = self.gate(key);
        let _permit = gate.acquire().await.map_err(|_| FetchError::Cancelled)?;
        if self.failing.lock().unwrap().contains(&metric) {
            return Err(FetchError::Status { code: 500, body: "upstream exploded".into() });
        }
        Ok(self.data.generate(metric, key))
    }
}

// ── Slow first call ──────────────────────────────────────────────────────────

/// The first fetch answers late with a 503; every later fetch succeeds at once.
pub struct SlowFirstCallSource {
    calls: AtomicUsize,
    delay: Duration,
    data:  SyntheticMetricSource,
}

impl SlowFirstCallSource {
    pub fn new(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            delay,
            data:  SyntheticMetricSource::new(11, Duration::ZERO),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MetricSource for SlowFirstCallSource {
    fn name(&self) -> &'static str {
        "slow-first"
    }

    async fn fetch(&self, metric: MetricName, key: &QueryKey) -> Result<MetricData, FetchError> {
        if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
            tokio::time::sleep(self.delay).await;
            return Err(FetchError::Status { code: 503, body: "old".into() });
        }
        Ok(self.data.generate(metric, key))
    }
}

// ── Recording sink ───────────────────────────────────────────────────────────

#[derive(Clone, Copy)]
pub enum SinkMode {
    Accept,
    Reject(u16),
    Unreachable,
    Hang,
}

pub struct RecordingSink {
    mode:      SinkMode,
    delivered: Mutex<Vec<DispatchEnvelope>>,
}

impl RecordingSink {
    pub fn new(mode: SinkMode) -> Arc<Self> {
        Arc::new(Self { mode, delivered: Mutex::new(Vec::new()) })
    }

    pub fn delivered(&self) -> Vec<DispatchEnvelope> {
        self.delivered.lock().unwrap().clone()
    }
}

#[async_trait]
impl CohortSink for RecordingSink {
    fn name(&self) -> &'static str {
        "recording"
    }

    async fn deliver(&self, envelope: &DispatchEnvelope) -> Result<(), DispatchError> {
        match self.mode {
            SinkMode::Accept => {
                self.delivered.lock().unwrap().push(envelope.clone());
                Ok(())
            }
            SinkMode::Reject(status) => Err(DispatchError::Rejected {
                status,
                body: "audience too small".into(),
            }),
            SinkMode::Unreachable => Err(DispatchError::Network("connection refused".into())),
            SinkMode::Hang => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Ok(())
            }
        }
    }
}
