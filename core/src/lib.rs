//! lifecycle-core: filter-scoped metric orchestration and cohort extraction
//! for the lifecycle attribution dashboard.
//!
//! Data flow:
//!   FilterState mutation → QueryKey → DataOrchestrator reconcile
//!   → per-metric fetch (cache hit, in-flight, or new) → key-checked commit
//!   → chart interaction → CohortBuilder → ActionDispatcher → sink

pub mod chart;
pub mod cohort;
pub mod cohort_builder;
pub mod command;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod event;
pub mod filter;
pub mod http_source;
pub mod metric;
pub mod orchestrator;
pub mod query_key;
pub mod rng;
pub mod session;
pub mod snapshot;
pub mod source;
pub mod store;
pub mod synthetic;
pub mod types;
