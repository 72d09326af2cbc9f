//! Shared primitive types used across the dashboard core.

/// A marketing channel name from the channel catalog (e.g. "Google Ads").
pub type ChannelName = String;

/// A customer segment name from the segment catalog (e.g. "High Value").
pub type SegmentName = String;

/// Identifier assigned to every cohort hand-off.
pub type DispatchId = String;

/// The segment that means "no segment filter".
pub const ALL_SEGMENTS: &str = "All";

/// Wire format for dates in query strings and payloads.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Longest default window a config may ask for (ten years).
pub const MAX_WINDOW_DAYS: i64 = 3650;
