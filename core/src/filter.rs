//! FilterState: the single shared filter context for one dashboard session.
//!
//! RULE: FilterState is only changed through the named operations below.
//! Every operation validates first and mutates second, so a rejected
//! mutation leaves the state exactly as it was.

use crate::{
    config::FilterCatalog,
    error::FilterError,
    query_key::QueryKey,
    types::{ChannelName, SegmentName, ALL_SEGMENTS},
};
use chrono::{NaiveDate, TimeDelta};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Inclusive date range. Invariant: `from <= to`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct DateRange {
    pub from: NaiveDate,
    pub to:   NaiveDate,
}

impl DateRange {
    pub fn new(from: NaiveDate, to: NaiveDate) -> Result<Self, FilterError> {
        if from > to {
            return Err(FilterError::InvalidRange { from, to });
        }
        Ok(Self { from, to })
    }

    /// The `days` days ending at `today` (so `days + 1` calendar dates).
    pub fn trailing(today: NaiveDate, days: i64) -> Result<Self, FilterError> {
        let from = TimeDelta::try_days(days)
            .filter(|_| days >= 0)
            .and_then(|window| today.checked_sub_signed(window))
            .ok_or(FilterError::WindowOutOfRange { today, days })?;
        Ok(Self { from, to: today })
    }

    /// Number of calendar dates covered, counting both ends.
    pub fn len_days(&self) -> i64 {
        (self.to - self.from).num_days() + 1
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterState {
    date_range:        DateRange,
    selected_channels: BTreeSet<ChannelName>,
    selected_segment:  SegmentName,
    #[serde(skip)]
    catalog:           FilterCatalog,
}

impl FilterState {
    /// Session defaults: trailing `window_days` ending today, every channel, "All".
    pub fn session_default(
        catalog: FilterCatalog,
        today: NaiveDate,
        window_days: i64,
    ) -> Result<Self, FilterError> {
        Ok(Self {
            date_range:        DateRange::trailing(today, window_days)?,
            selected_channels: catalog.channels.iter().cloned().collect(),
            selected_segment:  ALL_SEGMENTS.to_string(),
            catalog,
        })
    }

    // ── Reads ──────────────────────────────────────────────────────

    pub fn date_range(&self) -> DateRange {
        self.date_range
    }

    pub fn selected_channels(&self) -> &BTreeSet<ChannelName> {
        &self.selected_channels
    }

    pub fn selected_segment(&self) -> &str {
        &self.selected_segment
    }

    pub fn catalog(&self) -> &FilterCatalog {
        &self.catalog
    }

    /// True when the channel set differs from the full catalog or a segment is chosen.
    pub fn has_active_filters(&self) -> bool {
        let all: BTreeSet<&str> = self.catalog.channels.iter().map(String::as_str).collect();
        let selected: BTreeSet<&str> = self.selected_channels.iter().map(String::as_str).collect();
        selected != all || self.selected_segment != ALL_SEGMENTS
    }

    pub fn query_key(&self) -> QueryKey {
        QueryKey::derive(self)
    }

    // ── Mutations ──────────────────────────────────────────────────

    /// Replace both bounds together.
    pub fn update_date_range(&mut self, from: NaiveDate, to: NaiveDate) -> Result<(), FilterError> {
        self.date_range = DateRange::new(from, to)?;
        Ok(())
    }

    /// Add the channel if absent, remove it if present.
    pub fn toggle_channel(&mut self, channel: &str) -> Result<(), FilterError> {
        if !self.catalog.has_channel(channel) {
            return Err(FilterError::UnknownChannel { channel: channel.to_string() });
        }
        if !self.selected_channels.remove(channel) {
            self.selected_channels.insert(channel.to_string());
        }
        Ok(())
    }

    pub fn select_all_channels(&mut self) {
        self.selected_channels = self.catalog.channels.iter().cloned().collect();
    }

    pub fn clear_channels(&mut self) {
        self.selected_channels.clear();
    }

    pub fn update_segment(&mut self, segment: &str) -> Result<(), FilterError> {
        if !self.catalog.has_segment(segment) {
            return Err(FilterError::UnknownSegment { segment: segment.to_string() });
        }
        self.selected_segment = segment.to_string();
        Ok(())
    }

    /// Restore `defaults` exactly. The session keeps its own start-of-session copy.
    pub fn reset_to(&mut self, defaults: &FilterState) {
        *self = defaults.clone();
    }
}
