//! Cohort: the canonical, externally-dispatchable record built from a
//! chart interaction.
//!
//! RULE: The `type` tag fixes the field set. Every field is a string or a
//! number; nothing references chart internals.
//! Variants are only ever appended.

use crate::error::DispatchError;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Cohort {
    // ── Attribution ────────────────────────────────
    JourneyPath {
        source:      String,
        target:      String,
        users:       u64,
        description: String,
    },
    #[serde(rename_all = "camelCase")]
    AssistedChannel {
        channel:            String,
        assisted_revenue:   f64,
        last_click_revenue: f64,
        users:              u64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        lift_pct:           Option<f64>,
        description:        String,
    },

    // ── Incrementality ─────────────────────────────
    #[serde(rename_all = "camelCase")]
    HoldoutCampaign {
        campaign:            String,
        exposed_revenue:     f64,
        holdout_revenue:     f64,
        lift:                f64,
        incremental_revenue: f64,
        description:         String,
    },
    #[serde(rename_all = "camelCase")]
    IncrementalityCohort {
        channel:             String,
        lift_per_dollar:     f64,
        spend:               f64,
        incremental_revenue: f64,
        position:            usize,
        action:              ScaleAction,
        description:         String,
    },

    // ── Funnel ─────────────────────────────────────
    #[serde(rename_all = "camelCase")]
    FunnelStage {
        stage:           String,
        users:           u64,
        conversion_rate: f64,
        time_on_page:    f64,
        scroll_depth:    f64,
        description:     String,
    },
    #[serde(rename_all = "camelCase")]
    BehaviorSegment {
        behavior_metric:        f64,
        conversion_probability: f64,
        sessions:               u64,
        description:            String,
    },

    // ── LTV ────────────────────────────────────────
    LtvSource {
        source:      String,
        date:        String,
        #[serde(rename = "LTV30")]
        ltv30:       f64,
        #[serde(rename = "LTV60")]
        ltv60:       f64,
        #[serde(rename = "LTV90")]
        ltv90:       f64,
        description: String,
    },
    ProductLtvSegment {
        #[serde(rename = "firstProduct")]
        first_product: String,
        #[serde(rename = "LTVBucket")]
        ltv_bucket:    String,
        count:         u64,
        description:   String,
    },

    // ── Retention ──────────────────────────────────
    #[serde(rename_all = "camelCase")]
    ChurnRiskSegment {
        segment:     String,
        recency:     String,
        risk_score:  f64,
        customers:   u64,
        risk_label:  RiskLabel,
        description: String,
    },
    #[serde(rename_all = "camelCase")]
    RepeatRateCohort {
        cohort_month:      String,
        actual_rate_2nd:   f64,
        forecast_rate_2nd: f64,
        customers:         u64,
        description:       String,
    },

    // ── Dashboard actions ──────────────────────────
    #[serde(rename_all = "camelCase")]
    GetActionGuide {
        action_id:   u32,
        title:       String,
        category:    String,
        description: String,
    },
    #[serde(rename_all = "camelCase")]
    ChartExport {
        chart_id:    String,
        description: String,
    },
}

/// What to do with a channel given its lift-per-dollar rank.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScaleAction {
    Scale,
    Optimize,
    Retest,
}

impl ScaleAction {
    /// Rank is 1-based. Top three scale, bottom three retest; the top
    /// check wins when the dataset is small enough for both to apply.
    pub fn for_rank(rank: usize, total: usize) -> Self {
        if rank <= 3 {
            Self::Scale
        } else if rank + 3 > total {
            Self::Retest
        } else {
            Self::Optimize
        }
    }

    pub fn summary(&self) -> &'static str {
        match self {
            Self::Scale    => "Top performer to scale",
            Self::Optimize => "Optimization candidate",
            Self::Retest   => "Needs retesting",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RiskLabel {
    High,
    Medium,
    #[serde(rename = "Low-Med")]
    LowMed,
    Low,
}

impl RiskLabel {
    pub fn for_score(score: f64) -> Self {
        if score >= 75.0 {
            Self::High
        } else if score >= 50.0 {
            Self::Medium
        } else if score >= 25.0 {
            Self::LowMed
        } else {
            Self::Low
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::High   => "High",
            Self::Medium => "Medium",
            Self::LowMed => "Low-Med",
            Self::Low    => "Low",
        }
    }
}

impl Cohort {
    /// The serialized `type` tag.
    pub fn type_tag(&self) -> &'static str {
        match self {
            Self::JourneyPath { .. }          => "journey_path",
            Self::AssistedChannel { .. }      => "assisted_channel",
            Self::HoldoutCampaign { .. }      => "holdout_campaign",
            Self::IncrementalityCohort { .. } => "incrementality_cohort",
            Self::FunnelStage { .. }          => "funnel_stage",
            Self::BehaviorSegment { .. }      => "behavior_segment",
            Self::LtvSource { .. }            => "ltv_source",
            Self::ProductLtvSegment { .. }    => "product_ltv_segment",
            Self::ChurnRiskSegment { .. }     => "churn_risk_segment",
            Self::RepeatRateCohort { .. }     => "repeat_rate_cohort",
            Self::GetActionGuide { .. }       => "get_action_guide",
            Self::ChartExport { .. }          => "chart_export",
        }
    }

    pub fn description(&self) -> &str {
        match self {
            Self::JourneyPath { description, .. }
            | Self::AssistedChannel { description, .. }
            | Self::HoldoutCampaign { description, .. }
            | Self::IncrementalityCohort { description, .. }
            | Self::FunnelStage { description, .. }
            | Self::BehaviorSegment { description, .. }
            | Self::LtvSource { description, .. }
            | Self::ProductLtvSegment { description, .. }
            | Self::ChurnRiskSegment { description, .. }
            | Self::RepeatRateCohort { description, .. }
            | Self::GetActionGuide { description, .. }
            | Self::ChartExport { description, .. } => description,
        }
    }

    /// Flat JSON form handed to sinks.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }

    /// Checks the hand-off contract: a flat object whose strings are
    /// non-empty and whose numbers are finite (non-finite floats serialize
    /// as null).
    pub fn validate(&self) -> Result<(), DispatchError> {
        let json = self.to_json();
        let Some(fields) = json.as_object() else {
            return Err(DispatchError::Validation("cohort did not serialize to an object".into()));
        };
        for (name, value) in fields {
            match value {
                serde_json::Value::String(s) if s.trim().is_empty() => {
                    return Err(DispatchError::Validation(format!("field '{name}' is empty")));
                }
                serde_json::Value::Null => {
                    return Err(DispatchError::Validation(format!("field '{name}' is not a finite number")));
                }
                serde_json::Value::Array(_) | serde_json::Value::Object(_) => {
                    return Err(DispatchError::Validation(format!("field '{name}' is not a primitive")));
                }
                _ => {}
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scale_action_thresholds() {
        assert_eq!(ScaleAction::for_rank(1, 10), ScaleAction::Scale);
        assert_eq!(ScaleAction::for_rank(3, 10), ScaleAction::Scale);
        assert_eq!(ScaleAction::for_rank(4, 10), ScaleAction::Optimize);
        assert_eq!(ScaleAction::for_rank(7, 10), ScaleAction::Optimize);
        assert_eq!(ScaleAction::for_rank(8, 10), ScaleAction::Retest);
        // Five rows: rank 4 is both "not top three" and "in bottom three".
        assert_eq!(ScaleAction::for_rank(4, 5), ScaleAction::Retest);
        assert_eq!(ScaleAction::for_rank(3, 5), ScaleAction::Scale);
    }

    #[test]
    fn risk_label_boundaries() {
        assert_eq!(RiskLabel::for_score(75.0), RiskLabel::High);
        assert_eq!(RiskLabel::for_score(74.9), RiskLabel::Medium);
        assert_eq!(RiskLabel::for_score(50.0), RiskLabel::Medium);
        assert_eq!(RiskLabel::for_score(25.0), RiskLabel::LowMed);
        assert_eq!(RiskLabel::for_score(0.0), RiskLabel::Low);
    }

    #[test]
    fn non_finite_numbers_fail_validation() {
        let cohort = Cohort::BehaviorSegment {
            behavior_metric:        f64::NAN,
            conversion_probability: 12.0,
            sessions:               10,
            description:            "x".into(),
        };
        assert!(matches!(cohort.validate(), Err(DispatchError::Validation(_))));
    }
}
