//! Synthetic metric source: the development fallback used when no API
//! base URL is configured.
//!
//! Shapes follow the production endpoints. Values are jittered around
//! fixed baselines with a stream seeded by (seed, metric, query key), so
//! the same filter context always yields the same data.
//!
//! Channel-keyed datasets only include rows for selected channels.

use crate::{
    error::FetchError,
    metric::*,
    query_key::QueryKey,
    rng::{RngBank, SeriesRng},
    source::MetricSource,
    types::DATE_FORMAT,
};
use async_trait::async_trait;
use chrono::{Datelike, Duration as DateDuration};
use std::time::Duration;

const LTV_SOURCES: [&str; 5] = ["Google Ads", "Meta", "Email", "Organic", "TikTok"];
const PRODUCTS: [&str; 5] = ["Skincare Set", "Hair Care", "Makeup Kit", "Body Care", "Supplements"];
const LTV_BUCKETS: [&str; 5] = ["$0-50", "$50-100", "$100-200", "$200-500", "$500+"];
const CHURN_SEGMENTS: [&str; 5] = ["New", "Returning", "VIP", "At Risk", "Churned"];
const RECENCY_BUCKETS: [&str; 5] = ["0-7 days", "8-30 days", "31-60 days", "61-90 days", "90+ days"];

pub struct SyntheticMetricSource {
    bank:    RngBank,
    latency: Duration,
}

impl SyntheticMetricSource {
    pub fn new(seed: u64, latency: Duration) -> Self {
        Self { bank: RngBank::new(seed), latency }
    }

    /// Generate without the simulated delay.
    pub fn generate(&self, metric: MetricName, key: &QueryKey) -> MetricData {
        let mut rng = self.bank.for_metric(metric, key);
        let has = |channel: &str| key.channels.iter().any(|c| c == channel);

        match metric {
            MetricName::Sankey                   => MetricData::Sankey(sankey(&mut rng, has)),
            MetricName::AssistedRevenue          => MetricData::AssistedRevenue(assisted_revenue(&mut rng, has)),
            MetricName::HoldoutLift              => MetricData::HoldoutLift(holdout_lift(&mut rng)),
            MetricName::IncrementalityScoreboard => MetricData::IncrementalityScoreboard(incrementality(&mut rng, has)),
            MetricName::FunnelMetrics            => MetricData::FunnelMetrics(funnel(&mut rng)),
            MetricName::BehaviorConversion       => MetricData::BehaviorConversion(behavior(&mut rng)),
            MetricName::LtvBySource              => MetricData::LtvBySource(ltv_by_source(&mut rng, key, has)),
            MetricName::ProductLtvMatrix         => MetricData::ProductLtvMatrix(product_matrix(&mut rng)),
            MetricName::ChurnRisk                => MetricData::ChurnRisk(churn_risk(&mut rng)),
            MetricName::RepeatRateForecast       => MetricData::RepeatRateForecast(repeat_rate(&mut rng, key)),
        }
    }
}

#[async_trait]
impl MetricSource for SyntheticMetricSource {
    fn name(&self) -> &'static str {
        "synthetic"
    }

    async fn fetch(&self, metric: MetricName, key: &QueryKey) -> Result<MetricData, FetchError> {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        Ok(self.generate(metric, key))
    }
}

// ── Generators ───────────────────────────────────────────────────────────────

fn round1(x: f64) -> f64 {
    (x * 10.0).round() / 10.0
}

fn sankey(rng: &mut SeriesRng, has: impl Fn(&str) -> bool) -> Vec<SankeyLink> {
    let entry = [("Google Ads", 1200.0), ("Meta", 800.0), ("Email", 400.0)];
    let downstream = [
        ("Product View", "Add to Cart", 1000.0),
        ("Product View", "Exit", 1400.0),
        ("Add to Cart", "Checkout", 600.0),
        ("Add to Cart", "Exit", 400.0),
        ("Checkout", "Purchase", 480.0),
        ("Checkout", "Exit", 120.0),
    ];

    let mut links: Vec<SankeyLink> = entry
        .iter()
        .filter(|(source, _)| has(source))
        .map(|(source, base)| SankeyLink {
            source: source.to_string(),
            target: "Product View".into(),
            value:  rng.jitter(*base, 0.1).round() as u64,
        })
        .collect();
    if links.is_empty() {
        return links;
    }
    links.extend(downstream.iter().map(|(source, target, base)| SankeyLink {
        source: source.to_string(),
        target: target.to_string(),
        value:  rng.jitter(*base, 0.1).round() as u64,
    }));
    links
}

fn assisted_revenue(rng: &mut SeriesRng, has: impl Fn(&str) -> bool) -> Vec<AssistedRevenueRow> {
    let baselines = [
        ("Google Ads", 125_000.0, 85_000.0),
        ("Meta", 98_000.0, 72_000.0),
        ("Email", 45_000.0, 38_000.0),
        ("Organic", 67_000.0, 89_000.0),
        ("TikTok", 34_000.0, 23_000.0),
    ];
    baselines
        .iter()
        .filter(|(channel, _, _)| has(channel))
        .map(|(channel, assisted, last_click)| AssistedRevenueRow {
            channel:            channel.to_string(),
            assisted_revenue:   rng.jitter(*assisted, 0.15).round(),
            last_click_revenue: rng.jitter(*last_click, 0.15).round(),
        })
        .collect()
}

fn holdout_lift(rng: &mut SeriesRng) -> Vec<HoldoutLiftRow> {
    let baselines = [
        ("Black Friday Email", 45_000.0, 32_000.0),
        ("Google Search Brand", 128_000.0, 98_000.0),
        ("Meta Retargeting", 67_000.0, 56_000.0),
        ("TikTok Creative Test", 23_000.0, 21_000.0),
    ];
    baselines
        .iter()
        .map(|(campaign, exposed, holdout)| {
            let exposed = rng.jitter(*exposed, 0.1).round();
            let holdout = rng.jitter(*holdout, 0.1).round();
            HoldoutLiftRow {
                campaign:        campaign.to_string(),
                exposed_revenue: exposed,
                holdout_revenue: holdout,
                lift:            round1((exposed - holdout) / holdout * 100.0),
            }
        })
        .collect()
}

fn incrementality(rng: &mut SeriesRng, has: impl Fn(&str) -> bool) -> Vec<IncrementalityRow> {
    // (row label, owning catalog channel, lift per dollar, spend)
    let baselines = [
        ("Email Campaigns", "Email", 4.2, 12_000.0),
        ("Google Search", "Google Ads", 3.1, 45_000.0),
        ("Meta Lookalike", "Meta", 2.8, 28_000.0),
        ("TikTok Ads", "TikTok", 1.9, 15_000.0),
        ("Display Retargeting", "Google Ads", 0.8, 18_000.0),
    ];
    baselines
        .iter()
        .filter(|(_, owner, _, _)| has(owner))
        .map(|(label, _, lpd, spend)| {
            let lift_per_dollar = round1(rng.jitter(*lpd, 0.1));
            IncrementalityRow {
                channel:             label.to_string(),
                lift_per_dollar,
                spend:               *spend,
                incremental_revenue: (lift_per_dollar * spend).round(),
            }
        })
        .collect()
}

fn funnel(rng: &mut SeriesRng) -> Vec<FunnelStageRow> {
    let stages = [
        ("Visitors", 1.0, 45.0, 0.65),
        ("Product Views", 0.65, 78.0, 0.82),
        ("Add to Cart", 0.26, 120.0, 0.91),
        ("Checkout Started", 0.156, 240.0, 0.95),
        ("Purchase", 0.0936, 180.0, 1.0),
    ];
    let visitors = rng.jitter(10_000.0, 0.1).round();
    stages
        .iter()
        .map(|(stage, share, time_on_page, scroll)| {
            let users = (visitors * share).round();
            FunnelStageRow {
                stage:           stage.to_string(),
                users:           users as u64,
                conversion_rate: (users / visitors * 10_000.0).round() / 100.0,
                time_on_page:    rng.jitter(*time_on_page, 0.1).round(),
                scroll_depth:    *scroll,
            }
        })
        .collect()
}

fn behavior(rng: &mut SeriesRng) -> Vec<BehaviorPoint> {
    (0..50)
        .map(|_| BehaviorPoint {
            behavior_metric:        rng.range_f64(0.0, 100.0),
            conversion_probability: rng.range_f64(0.0, 100.0),
            sessions:               rng.range_u64(100, 1000),
        })
        .collect()
}

fn ltv_by_source(rng: &mut SeriesRng, key: &QueryKey, has: impl Fn(&str) -> bool) -> Vec<LtvSourcePoint> {
    let days = ((key.to - key.from).num_days() + 1).min(30);
    let dates: Vec<String> = (0..days)
        .rev()
        .map(|back| (key.to - DateDuration::days(back)).format(DATE_FORMAT).to_string())
        .collect();

    LTV_SOURCES
        .iter()
        .filter(|source| has(source))
        .flat_map(|source| {
            dates
                .iter()
                .map(|date| LtvSourcePoint {
                    date:   date.clone(),
                    source: source.to_string(),
                    ltv30:  rng.range_f64(20.0, 70.0),
                    ltv60:  rng.range_f64(40.0, 120.0),
                    ltv90:  rng.range_f64(70.0, 190.0),
                })
                .collect::<Vec<_>>()
        })
        .collect()
}

fn product_matrix(rng: &mut SeriesRng) -> Vec<ProductLtvCell> {
    PRODUCTS
        .iter()
        .flat_map(|product| LTV_BUCKETS.iter().map(move |bucket| (product, bucket)))
        .map(|(product, bucket)| ProductLtvCell {
            first_product: product.to_string(),
            ltv_bucket:    bucket.to_string(),
            count:         rng.range_u64(50, 500),
        })
        .collect()
}

fn churn_risk(rng: &mut SeriesRng) -> Vec<ChurnRiskCell> {
    CHURN_SEGMENTS
        .iter()
        .flat_map(|segment| RECENCY_BUCKETS.iter().map(move |recency| (segment, recency)))
        .map(|(segment, recency)| ChurnRiskCell {
            segment:    segment.to_string(),
            recency:    recency.to_string(),
            risk_score: rng.range_f64(0.0, 100.0),
            customers:  rng.range_u64(100, 1000),
        })
        .collect()
}

fn repeat_rate(rng: &mut SeriesRng, key: &QueryKey) -> Vec<RepeatRatePoint> {
    let end_index = key.to.year() * 12 + key.to.month0() as i32;
    (0..12)
        .rev()
        .map(|back| {
            let index = end_index - back;
            RepeatRatePoint {
                cohort_month:      format!("{:04}-{:02}", index.div_euclid(12), index.rem_euclid(12) + 1),
                actual_rate_2nd:   rng.range_f64(15.0, 45.0),
                forecast_rate_2nd: rng.range_f64(18.0, 53.0),
                customers:         rng.range_u64(500, 2000),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn key(channels: &[&str]) -> QueryKey {
        QueryKey::from_parts(
            NaiveDate::from_ymd_opt(2024, 1, 10).unwrap(),
            NaiveDate::from_ymd_opt(2024, 2, 20).unwrap(),
            channels.iter().copied(),
            "All",
        )
    }

    #[test]
    fn same_key_same_data() {
        let source = SyntheticMetricSource::new(42, Duration::ZERO);
        let k = key(&["Meta", "Email"]);
        for metric in MetricName::ALL {
            assert_eq!(source.generate(metric, &k), source.generate(metric, &k));
        }
    }

    #[test]
    fn channel_keyed_metrics_follow_selection() {
        let source = SyntheticMetricSource::new(42, Duration::ZERO);
        match source.generate(MetricName::AssistedRevenue, &key(&["Meta"])) {
            MetricData::AssistedRevenue(rows) => {
                assert_eq!(rows.len(), 1);
                assert_eq!(rows[0].channel, "Meta");
            }
            other => panic!("unexpected dataset {other:?}"),
        }
        assert!(source.generate(MetricName::Sankey, &key(&[])).is_empty());
    }

    #[test]
    fn repeat_rate_ends_at_range_month() {
        let source = SyntheticMetricSource::new(1, Duration::ZERO);
        match source.generate(MetricName::RepeatRateForecast, &key(&[])) {
            MetricData::RepeatRateForecast(points) => {
                assert_eq!(points.len(), 12);
                assert_eq!(points[0].cohort_month, "2023-03");
                assert_eq!(points[11].cohort_month, "2024-02");
            }
            other => panic!("unexpected dataset {other:?}"),
        }
    }
}
