//! QueryKey: the stable fingerprint of a FilterState.
//!
//! Equal filter content gives an equal key no matter how the state was
//! reached: channels are sorted before they enter the key.

use crate::{filter::FilterState, types::DATE_FORMAT};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct QueryKey {
    pub from:     NaiveDate,
    pub to:       NaiveDate,
    pub channels: Vec<String>,
    pub segment:  String,
}

impl QueryKey {
    pub fn derive(filters: &FilterState) -> Self {
        let range = filters.date_range();
        Self::from_parts(
            range.from,
            range.to,
            filters.selected_channels().iter().cloned(),
            filters.selected_segment(),
        )
    }

    /// Build a key from loose parts. Channel order and duplicates do not matter.
    pub fn from_parts<I, S>(from: NaiveDate, to: NaiveDate, channels: I, segment: &str) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut channels: Vec<String> = channels.into_iter().map(Into::into).collect();
        channels.sort();
        channels.dedup();
        Self { from, to, channels, segment: segment.to_string() }
    }

    /// Query-string pairs for `GET /api/lifecycle/{metric}`.
    pub fn query_pairs(&self) -> [(&'static str, String); 4] {
        [
            ("startDate", self.from.format(DATE_FORMAT).to_string()),
            ("endDate", self.to.format(DATE_FORMAT).to_string()),
            ("channels", self.channels.join(",")),
            ("segment", self.segment.clone()),
        ]
    }

    /// 64-bit FNV-1a over the canonical string form. Stable across runs
    /// and platforms, unlike `std::hash`.
    pub fn fingerprint(&self) -> u64 {
        const OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
        const PRIME: u64 = 0x0000_0100_0000_01b3;
        self.to_string()
            .bytes()
            .fold(OFFSET, |hash, b| (hash ^ b as u64).wrapping_mul(PRIME))
    }
}

impl fmt::Display for QueryKey {
    /// `from|to|ch1,ch2|segment`. Field separators cannot appear in dates.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}|{}|{}|{}",
            self.from.format(DATE_FORMAT),
            self.to.format(DATE_FORMAT),
            self.channels.join(","),
            self.segment
        )
    }
}
