//! Metric catalog and the typed records each metric returns.
//!
//! The catalog is fixed. A metric's wire name is used verbatim as the
//! API route segment and as its result-table key.

use crate::error::FetchError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable metric slot assignments.
/// NEVER reorder or remove entries; only append.
/// The slot index seeds the synthetic generators.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(u64)]
pub enum MetricName {
    #[serde(rename = "sankey")]
    Sankey = 0,
    #[serde(rename = "assistedRevenue")]
    AssistedRevenue = 1,
    #[serde(rename = "holdoutLift")]
    HoldoutLift = 2,
    #[serde(rename = "incrementalityScoreboard")]
    IncrementalityScoreboard = 3,
    #[serde(rename = "funnelMetrics")]
    FunnelMetrics = 4,
    #[serde(rename = "behaviorConversion")]
    BehaviorConversion = 5,
    #[serde(rename = "ltvBySource")]
    LtvBySource = 6,
    #[serde(rename = "productLTVMatrix")]
    ProductLtvMatrix = 7,
    #[serde(rename = "churnRisk")]
    ChurnRisk = 8,
    #[serde(rename = "repeatRateForecast")]
    RepeatRateForecast = 9,
}

impl MetricName {
    pub const ALL: [MetricName; 10] = [
        Self::Sankey,
        Self::AssistedRevenue,
        Self::HoldoutLift,
        Self::IncrementalityScoreboard,
        Self::FunnelMetrics,
        Self::BehaviorConversion,
        Self::LtvBySource,
        Self::ProductLtvMatrix,
        Self::ChurnRisk,
        Self::RepeatRateForecast,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sankey                   => "sankey",
            Self::AssistedRevenue          => "assistedRevenue",
            Self::HoldoutLift              => "holdoutLift",
            Self::IncrementalityScoreboard => "incrementalityScoreboard",
            Self::FunnelMetrics            => "funnelMetrics",
            Self::BehaviorConversion       => "behaviorConversion",
            Self::LtvBySource              => "ltvBySource",
            Self::ProductLtvMatrix         => "productLTVMatrix",
            Self::ChurnRisk                => "churnRisk",
            Self::RepeatRateForecast       => "repeatRateForecast",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|m| m.as_str() == name)
    }

    pub fn slot(&self) -> u64 {
        *self as u64
    }
}

impl fmt::Display for MetricName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Records ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SankeyLink {
    pub source: String,
    pub target: String,
    pub value:  u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssistedRevenueRow {
    pub channel:            String,
    pub assisted_revenue:   f64,
    pub last_click_revenue: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HoldoutLiftRow {
    pub campaign:        String,
    pub exposed_revenue: f64,
    pub holdout_revenue: f64,
    pub lift:            f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IncrementalityRow {
    pub channel:             String,
    pub lift_per_dollar:     f64,
    pub spend:               f64,
    pub incremental_revenue: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FunnelStageRow {
    pub stage:           String,
    pub users:           u64,
    pub conversion_rate: f64,
    pub time_on_page:    f64,
    pub scroll_depth:    f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BehaviorPoint {
    pub behavior_metric:        f64,
    pub conversion_probability: f64,
    pub sessions:               u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LtvSourcePoint {
    pub date:   String,
    pub source: String,
    #[serde(rename = "LTV30")]
    pub ltv30:  f64,
    #[serde(rename = "LTV60")]
    pub ltv60:  f64,
    #[serde(rename = "LTV90")]
    pub ltv90:  f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductLtvCell {
    #[serde(rename = "firstProduct")]
    pub first_product: String,
    #[serde(rename = "LTVBucket")]
    pub ltv_bucket:    String,
    pub count:         u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChurnRiskCell {
    pub segment:    String,
    pub recency:    String,
    pub risk_score: f64,
    pub customers:  u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepeatRatePoint {
    pub cohort_month:      String,
    pub actual_rate_2nd:   f64,
    pub forecast_rate_2nd: f64,
    pub customers:         u64,
}

// ── Dataset ──────────────────────────────────────────────────────────────────

/// A resolved metric dataset. The variant always matches the metric it came from.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum MetricData {
    Sankey(Vec<SankeyLink>),
    AssistedRevenue(Vec<AssistedRevenueRow>),
    HoldoutLift(Vec<HoldoutLiftRow>),
    IncrementalityScoreboard(Vec<IncrementalityRow>),
    FunnelMetrics(Vec<FunnelStageRow>),
    BehaviorConversion(Vec<BehaviorPoint>),
    LtvBySource(Vec<LtvSourcePoint>),
    ProductLtvMatrix(Vec<ProductLtvCell>),
    ChurnRisk(Vec<ChurnRiskCell>),
    RepeatRateForecast(Vec<RepeatRatePoint>),
}

impl MetricData {
    /// Decode a JSON array into the record type for `metric`.
    pub fn decode(metric: MetricName, body: serde_json::Value) -> Result<Self, FetchError> {
        fn rows<T: serde::de::DeserializeOwned>(body: serde_json::Value) -> Result<Vec<T>, FetchError> {
            serde_json::from_value(body).map_err(|e| FetchError::Decode(e.to_string()))
        }

        Ok(match metric {
            MetricName::Sankey                   => Self::Sankey(rows(body)?),
            MetricName::AssistedRevenue          => Self::AssistedRevenue(rows(body)?),
            MetricName::HoldoutLift              => Self::HoldoutLift(rows(body)?),
            MetricName::IncrementalityScoreboard => Self::IncrementalityScoreboard(rows(body)?),
            MetricName::FunnelMetrics            => Self::FunnelMetrics(rows(body)?),
            MetricName::BehaviorConversion       => Self::BehaviorConversion(rows(body)?),
            MetricName::LtvBySource              => Self::LtvBySource(rows(body)?),
            MetricName::ProductLtvMatrix         => Self::ProductLtvMatrix(rows(body)?),
            MetricName::ChurnRisk                => Self::ChurnRisk(rows(body)?),
            MetricName::RepeatRateForecast       => Self::RepeatRateForecast(rows(body)?),
        })
    }

    pub fn metric(&self) -> MetricName {
        match self {
            Self::Sankey(_)                   => MetricName::Sankey,
            Self::AssistedRevenue(_)          => MetricName::AssistedRevenue,
            Self::HoldoutLift(_)              => MetricName::HoldoutLift,
            Self::IncrementalityScoreboard(_) => MetricName::IncrementalityScoreboard,
            Self::FunnelMetrics(_)            => MetricName::FunnelMetrics,
            Self::BehaviorConversion(_)       => MetricName::BehaviorConversion,
            Self::LtvBySource(_)              => MetricName::LtvBySource,
            Self::ProductLtvMatrix(_)         => MetricName::ProductLtvMatrix,
            Self::ChurnRisk(_)                => MetricName::ChurnRisk,
            Self::RepeatRateForecast(_)       => MetricName::RepeatRateForecast,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Self::Sankey(v)                   => v.len(),
            Self::AssistedRevenue(v)          => v.len(),
            Self::HoldoutLift(v)              => v.len(),
            Self::IncrementalityScoreboard(v) => v.len(),
            Self::FunnelMetrics(v)            => v.len(),
            Self::BehaviorConversion(v)       => v.len(),
            Self::LtvBySource(v)              => v.len(),
            Self::ProductLtvMatrix(v)         => v.len(),
            Self::ChurnRisk(v)                => v.len(),
            Self::RepeatRateForecast(v)       => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
