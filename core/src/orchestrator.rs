//! DataOrchestrator: binds the current QueryKey to one result slot per
//! registered metric.
//!
//! RECONCILE (after every filter mutation):
//!   1. Slot already expects this key          → nothing to do.
//!   2. Successful cache entry for this key    → reuse it, no fetch.
//!   3. Fetch for this key already in flight   → join it.
//!   4. Otherwise                              → issue a new ticketed fetch.
//!   In cases 3 and 4 the slot resets to Loading with no data, so readers
//!   never see data that belongs to a different key.
//!
//! COMMIT (when a fetch resolves):
//!   A resolution is committed only if its ticket is still live AND its key
//!   equals the slot's expected key. Everything else is discarded. This is
//!   the only thing preventing a slow, older request from overwriting a
//!   newer one.
//!
//! RULES:
//!   - The result table has exactly one writer: the owner of this struct.
//!   - Fetch tasks never touch the table; they send a Resolution back.
//!   - A failed fetch marks only its own slot. No automatic retry.

use crate::{
    config::DashboardConfig,
    error::FetchError,
    event::OrchestratorEvent,
    metric::{MetricData, MetricName},
    query_key::QueryKey,
    source::{MetricRegistry, MetricSource},
};
use serde::Serialize;
use std::{
    collections::{BTreeMap, VecDeque},
    sync::Arc,
    time::Duration,
};
use tokio::{
    sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender},
    task::AbortHandle,
};

// ── Public types ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricStatus {
    Idle,
    Loading,
    Success,
    Error,
}

/// The current state of one metric slot.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricResult {
    pub status: MetricStatus,
    pub data:   Option<Arc<MetricData>>,
    pub error:  Option<FetchError>,
    /// The key this slot currently expects. None until first reconcile.
    pub key:    Option<QueryKey>,
}

impl MetricResult {
    fn idle() -> Self {
        Self { status: MetricStatus::Idle, data: None, error: None, key: None }
    }

    fn loading(key: QueryKey) -> Self {
        Self { status: MetricStatus::Loading, data: None, error: None, key: Some(key) }
    }

    fn success(key: QueryKey, data: Arc<MetricData>) -> Self {
        Self { status: MetricStatus::Success, data: Some(data), error: None, key: Some(key) }
    }

    fn failed(key: QueryKey, error: FetchError) -> Self {
        Self { status: MetricStatus::Error, data: None, error: Some(error), key: Some(key) }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct OrchestratorOptions {
    pub fetch_timeout:         Duration,
    pub cache_keys_per_metric: usize,
    pub abort_superseded:      bool,
}

impl OrchestratorOptions {
    pub fn from_config(config: &DashboardConfig) -> Self {
        Self {
            fetch_timeout:         config.fetch_timeout(),
            cache_keys_per_metric: config.cache_keys_per_metric.max(1),
            abort_superseded:      config.abort_superseded,
        }
    }
}

impl Default for OrchestratorOptions {
    fn default() -> Self {
        Self::from_config(&DashboardConfig::default_test())
    }
}

// ── Internals ────────────────────────────────────────────────────────────────

struct Resolution {
    metric:  MetricName,
    key:     QueryKey,
    ticket:  u64,
    outcome: Result<MetricData, FetchError>,
}

/// Sends exactly one Resolution per ticket, even if the fetch task panics
/// or is aborted (it then reports `Cancelled`).
struct Reply {
    tx:     UnboundedSender<Resolution>,
    metric: MetricName,
    key:    QueryKey,
    ticket: u64,
    sent:   bool,
}

impl Reply {
    fn send(mut self, outcome: Result<MetricData, FetchError>) {
        self.sent = true;
        let _ = self.tx.send(Resolution {
            metric: self.metric,
            key:    self.key.clone(),
            ticket: self.ticket,
            outcome,
        });
    }
}

impl Drop for Reply {
    fn drop(&mut self) {
        if !self.sent {
            let _ = self.tx.send(Resolution {
                metric:  self.metric,
                key:     self.key.clone(),
                ticket:  self.ticket,
                outcome: Err(FetchError::Cancelled),
            });
        }
    }
}

struct InFlight {
    key:    QueryKey,
    ticket: u64,
    abort:  AbortHandle,
}

struct Slot {
    current:   MetricResult,
    /// Successful results by key, oldest first.
    cache:     VecDeque<(QueryKey, Arc<MetricData>)>,
    in_flight: Vec<InFlight>,
}

impl Slot {
    fn new() -> Self {
        Self { current: MetricResult::idle(), cache: VecDeque::new(), in_flight: Vec::new() }
    }

    fn cached(&self, key: &QueryKey) -> Option<Arc<MetricData>> {
        self.cache.iter().find(|(k, _)| k == key).map(|(_, d)| d.clone())
    }

    /// Insert or refresh `key` as most recent; returns evicted keys.
    fn remember(&mut self, key: QueryKey, data: Arc<MetricData>, bound: usize) -> Vec<QueryKey> {
        self.cache.retain(|(k, _)| *k != key);
        self.cache.push_back((key, data));
        let mut evicted = Vec::new();
        while self.cache.len() > bound {
            if let Some((k, _)) = self.cache.pop_front() {
                evicted.push(k);
            }
        }
        evicted
    }

    fn touch(&mut self, key: &QueryKey) {
        if let Some(pos) = self.cache.iter().position(|(k, _)| k == key) {
            if let Some(entry) = self.cache.remove(pos) {
                self.cache.push_back(entry);
            }
        }
    }
}

// ── Orchestrator ─────────────────────────────────────────────────────────────

pub struct DataOrchestrator {
    registry:    MetricRegistry,
    options:     OrchestratorOptions,
    slots:       BTreeMap<MetricName, Slot>,
    tx:          UnboundedSender<Resolution>,
    rx:          UnboundedReceiver<Resolution>,
    next_ticket: u64,
}

impl DataOrchestrator {
    pub fn new(registry: MetricRegistry, options: OrchestratorOptions) -> Self {
        let slots = registry.metrics().map(|m| (m, Slot::new())).collect();
        let (tx, rx) = unbounded_channel();
        Self { registry, options, slots, tx, rx, next_ticket: 1 }
    }

    // ── Reconcile ──────────────────────────────────────────────────

    /// Bind every slot to `key`. Must run inside a tokio runtime.
    pub fn reconcile(&mut self, key: &QueryKey) -> Vec<OrchestratorEvent> {
        let mut events = Vec::new();
        let metrics: Vec<MetricName> = self.slots.keys().copied().collect();

        for metric in metrics {
            if self.options.abort_superseded {
                events.extend(self.abort_superseded(metric, key));
            }

            let Some(slot) = self.slots.get_mut(&metric) else { continue };
            if slot.current.key.as_ref() == Some(key) {
                continue;
            }

            if let Some(data) = slot.cached(key) {
                slot.touch(key);
                slot.current = MetricResult::success(key.clone(), data);
                log::debug!("orchestrator: {metric} cache hit for {key}");
                events.push(OrchestratorEvent::CacheHit { metric, key: key.clone() });
                continue;
            }

            slot.current = MetricResult::loading(key.clone());
            if slot.in_flight.iter().any(|f| f.key == *key) {
                log::debug!("orchestrator: {metric} joined in-flight fetch for {key}");
                events.push(OrchestratorEvent::Joined { metric, key: key.clone() });
                continue;
            }

            events.extend(self.issue(metric, key.clone()));
        }
        events
    }

    /// Manual retry: re-fetch the slot's current key, bypassing the cache.
    /// Any earlier fetch for the same key is aborted so only the newest
    /// ticket can commit.
    pub fn refresh(&mut self, metric: MetricName) -> Option<OrchestratorEvent> {
        let slot = self.slots.get_mut(&metric)?;
        let key = slot.current.key.clone()?;
        slot.cache.retain(|(k, _)| *k != key);
        slot.current = MetricResult::loading(key.clone());

        let (older, rest): (Vec<InFlight>, Vec<InFlight>) =
            slot.in_flight.drain(..).partition(|f| f.key == key);
        slot.in_flight = rest;
        for fetch in older {
            fetch.abort.abort();
            log::debug!("orchestrator: {metric} fetch #{} replaced by refresh", fetch.ticket);
        }

        self.issue(metric, key)
    }

    pub fn refresh_all(&mut self) -> Vec<OrchestratorEvent> {
        let metrics: Vec<MetricName> = self.slots.keys().copied().collect();
        metrics.into_iter().filter_map(|m| self.refresh(m)).collect()
    }

    /// Drop every cached result. Current slots are untouched.
    pub fn clear_cache(&mut self) {
        for slot in self.slots.values_mut() {
            slot.cache.clear();
        }
    }

    /// Abort every in-flight fetch. Their results will be discarded.
    pub fn abort_all(&mut self) {
        for slot in self.slots.values_mut() {
            for fetch in slot.in_flight.drain(..) {
                fetch.abort.abort();
            }
        }
    }

    fn abort_superseded(&mut self, metric: MetricName, key: &QueryKey) -> Vec<OrchestratorEvent> {
        let Some(slot) = self.slots.get_mut(&metric) else { return Vec::new() };
        let (stale, live): (Vec<InFlight>, Vec<InFlight>) =
            slot.in_flight.drain(..).partition(|f| f.key != *key);
        slot.in_flight = live;
        stale
            .into_iter()
            .map(|f| {
                f.abort.abort();
                log::debug!("orchestrator: {metric} aborted superseded fetch for {}", f.key);
                OrchestratorEvent::Aborted { metric, key: f.key }
            })
            .collect()
    }

    fn issue(&mut self, metric: MetricName, key: QueryKey) -> Option<OrchestratorEvent> {
        let source: Arc<dyn MetricSource> = self.registry.source(metric)?;
        let ticket = self.next_ticket;
        self.next_ticket += 1;

        let reply = Reply {
            tx: self.tx.clone(),
            metric,
            key: key.clone(),
            ticket,
            sent: false,
        };
        let timeout = self.options.fetch_timeout;
        let fetch_key = key.clone();
        let handle = tokio::spawn(async move {
            let outcome = match tokio::time::timeout(timeout, source.fetch(metric, &fetch_key)).await {
                Ok(outcome) => outcome,
                Err(_) => Err(FetchError::Timeout { after_ms: timeout.as_millis() as u64 }),
            };
            reply.send(outcome);
        });

        let slot = self.slots.get_mut(&metric)?;
        slot.in_flight.push(InFlight { key: key.clone(), ticket, abort: handle.abort_handle() });
        log::info!("orchestrator: {metric} fetch #{ticket} issued for {key}");
        Some(OrchestratorEvent::FetchIssued { metric, key, ticket })
    }

    // ── Commit ─────────────────────────────────────────────────────

    /// Commit every resolution that has already arrived. Never waits.
    pub fn drain_ready(&mut self) -> Vec<OrchestratorEvent> {
        let mut events = Vec::new();
        while let Ok(resolution) = self.rx.try_recv() {
            events.extend(self.commit(resolution));
        }
        events
    }

    /// Wait for the next resolution and commit it.
    /// Returns None when nothing is in flight.
    pub async fn next_resolution(&mut self) -> Option<Vec<OrchestratorEvent>> {
        if self.in_flight_count() == 0 {
            return None;
        }
        let resolution = self.rx.recv().await?;
        Some(self.commit(resolution))
    }

    /// Wait until no slot is Loading.
    pub async fn settle(&mut self) -> Vec<OrchestratorEvent> {
        let mut events = self.drain_ready();
        while self.is_loading() {
            match self.next_resolution().await {
                Some(batch) => events.extend(batch),
                None => break,
            }
        }
        events
    }

    fn commit(&mut self, resolution: Resolution) -> Vec<OrchestratorEvent> {
        let Resolution { metric, key, ticket, outcome } = resolution;
        let bound = self.options.cache_keys_per_metric;
        let Some(slot) = self.slots.get_mut(&metric) else { return Vec::new() };

        let live = slot.in_flight.iter().position(|f| f.ticket == ticket);
        if let Some(pos) = live {
            slot.in_flight.swap_remove(pos);
        }

        if live.is_none() || slot.current.key.as_ref() != Some(&key) {
            log::debug!("orchestrator: {metric} fetch #{ticket} for {key} discarded as stale");
            return vec![OrchestratorEvent::DiscardedStale {
                metric,
                key,
                expected: slot.current.key.clone(),
            }];
        }

        match outcome {
            Ok(data) => {
                let rows = data.len();
                let data = Arc::new(data);
                let mut events = vec![OrchestratorEvent::Committed { metric, key: key.clone(), rows }];
                let evicted = slot.remember(key.clone(), data.clone(), bound);
                slot.current = MetricResult::success(key.clone(), data);
                log::info!("orchestrator: {metric} fetch #{ticket} committed ({rows} rows)");
                events.extend(
                    evicted
                        .into_iter()
                        .map(|k| OrchestratorEvent::Evicted { metric, key: k }),
                );
                events
            }
            Err(error) => {
                log::warn!("orchestrator: {metric} fetch #{ticket} for {key} failed: {error}");
                let event = OrchestratorEvent::failed(metric, key.clone(), &error);
                slot.current = MetricResult::failed(key, error);
                vec![event]
            }
        }
    }

    // ── Reads ──────────────────────────────────────────────────────

    pub fn result(&self, metric: MetricName) -> Option<&MetricResult> {
        self.slots.get(&metric).map(|s| &s.current)
    }

    pub fn results(&self) -> impl Iterator<Item = (MetricName, &MetricResult)> {
        self.slots.iter().map(|(m, s)| (*m, &s.current))
    }

    pub fn data(&self, metric: MetricName) -> Option<Arc<MetricData>> {
        self.result(metric).and_then(|r| r.data.clone())
    }

    pub fn is_loading(&self) -> bool {
        self.slots.values().any(|s| s.current.status == MetricStatus::Loading)
    }

    pub fn is_error(&self) -> bool {
        self.slots.values().any(|s| s.current.status == MetricStatus::Error)
    }

    pub fn in_flight_count(&self) -> usize {
        self.slots.values().map(|s| s.in_flight.len()).sum()
    }

    /// Cached keys for `metric`, oldest first.
    pub fn cached_keys(&self, metric: MetricName) -> Vec<QueryKey> {
        self.slots
            .get(&metric)
            .map(|s| s.cache.iter().map(|(k, _)| k.clone()).collect())
            .unwrap_or_default()
    }

    pub fn metrics(&self) -> impl Iterator<Item = MetricName> + '_ {
        self.slots.keys().copied()
    }
}

impl Drop for DataOrchestrator {
    fn drop(&mut self) {
        self.abort_all();
    }
}
