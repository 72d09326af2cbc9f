use chrono::NaiveDate;
use thiserror::Error;

/// Rejected filter mutations. The FilterState is left unchanged.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FilterError {
    #[error("Invalid date range: {from} is after {to}")]
    InvalidRange { from: NaiveDate, to: NaiveDate },

    #[error("Unknown segment '{segment}'")]
    UnknownSegment { segment: String },

    #[error("Unknown channel '{channel}'")]
    UnknownChannel { channel: String },

    #[error("A {days}-day window ending {today} is outside the calendar")]
    WindowOutOfRange { today: NaiveDate, days: i64 },
}

/// A single metric fetch failure. Isolated to that metric's slot.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FetchError {
    #[error("HTTP {code}: {body}")]
    Status { code: u16, body: String },

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Malformed response body: {0}")]
    Decode(String),

    #[error("Fetch timed out after {after_ms} ms")]
    Timeout { after_ms: u64 },

    #[error("Fetch task ended without a result")]
    Cancelled,
}

/// Cohort hand-off failure, classified for the UI layer.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DispatchError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Cohort failed validation: {0}")]
    Validation(String),

    #[error("Sink rejected cohort ({status}): {body}")]
    Rejected { status: u16, body: String },
}

#[derive(Error, Debug)]
pub enum DashError {
    #[error(transparent)]
    Filter(#[from] FilterError),

    #[error("Metric '{metric}' failed: {source}")]
    Fetch { metric: String, source: FetchError },

    #[error(transparent)]
    Dispatch(#[from] DispatchError),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Session has ended")]
    SessionEnded,

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type DashResult<T> = Result<T, DashError>;
