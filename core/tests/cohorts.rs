//! Integration tests: chart interaction → Cohort mapping.

use lifecycle_core::{
    chart::{action_plan, ChartKind},
    cohort::{Cohort, RiskLabel, ScaleAction},
    cohort_builder::{CohortBuilder, Interaction},
    metric::{IncrementalityRow, MetricData},
};
use serde_json::{json, Value};

// ── Helpers ──────────────────────────────────────────────────────────────────

fn build(kind: ChartKind, payload: Value) -> Option<Cohort> {
    CohortBuilder::standard().build(kind, &Interaction::new(&payload))
}

fn scoreboard(lifts: &[(&str, f64)]) -> MetricData {
    MetricData::IncrementalityScoreboard(
        lifts
            .iter()
            .map(|(channel, lift)| IncrementalityRow {
                channel:             channel.to_string(),
                lift_per_dollar:     *lift,
                spend:               10_000.0,
                incremental_revenue: 10_000.0 * lift,
            })
            .collect(),
    )
}

fn incrementality_click(dataset: &MetricData, channel: &str) -> Option<Cohort> {
    let payload = json!({
        "channel": channel,
        "liftPerDollar": 1.5,
        "spend": 10000,
        "incrementalRevenue": 15000
    });
    CohortBuilder::standard().build(
        ChartKind::IncrementalityScoreboard,
        &Interaction::new(&payload).with_dataset(Some(dataset)),
    )
}

// ── Attribution ──────────────────────────────────────────────────────────────

/// A sankey link click becomes a journey_path cohort.
#[test]
fn sankey_click_builds_journey_path() {
    let cohort = build(
        ChartKind::Sankey,
        json!({ "source": "Google Ads", "target": "Product View", "value": 1200 }),
    )
    .expect("complete sankey payload must map");

    assert_eq!(
        cohort.to_json(),
        json!({
            "type": "journey_path",
            "source": "Google Ads",
            "target": "Product View",
            "users": 1200,
            "description": "Google Ads → Product View journey"
        })
    );
}

/// Graph-layout links carry node objects instead of names.
#[test]
fn sankey_click_accepts_node_objects() {
    let cohort = build(
        ChartKind::Sankey,
        json!({ "source": { "name": "Meta" }, "target": { "name": "Add to Cart" }, "value": 300 }),
    );
    assert!(matches!(
        cohort,
        Some(Cohort::JourneyPath { ref source, ref target, users: 300, .. })
            if source == "Meta" && target == "Add to Cart"
    ));
}

/// Lift percent and audience size are derived from the revenues.
#[test]
fn assisted_channel_derives_lift_and_users() {
    let cohort = build(
        ChartKind::AssistedRevenue,
        json!({ "channel": "Email", "assistedRevenue": 90000, "lastClickRevenue": 60000 }),
    )
    .unwrap();

    match cohort {
        Cohort::AssistedChannel { channel, users, lift_pct, .. } => {
            assert_eq!(channel, "Email");
            assert_eq!(users, 2000, "90000 / 45 per user");
            assert_eq!(lift_pct, Some(50.0));
        }
        other => panic!("Expected assisted_channel, got {other:?}"),
    }
}

/// Zero last-click revenue has no defined lift; the field is omitted.
#[test]
fn assisted_channel_without_last_click_omits_lift() {
    let cohort = build(
        ChartKind::AssistedRevenue,
        json!({ "channel": "Organic", "assistedRevenue": 4500, "lastClickRevenue": 0 }),
    )
    .unwrap();
    let json = cohort.to_json();
    assert!(json.get("liftPct").is_none());
    assert_eq!(json["users"], 100);
}

// ── Incrementality ───────────────────────────────────────────────────────────

/// incrementalRevenue = exposed − holdout.
#[test]
fn holdout_click_derives_incremental_revenue() {
    let cohort = build(
        ChartKind::HoldoutLift,
        json!({
            "campaign": "Black Friday Email",
            "exposedRevenue": 45000,
            "holdoutRevenue": 32000,
            "lift": 40.6
        }),
    )
    .unwrap();

    match cohort {
        Cohort::HoldoutCampaign { incremental_revenue, lift, .. } => {
            assert_eq!(incremental_revenue, 13000.0);
            assert_eq!(lift, 40.6);
        }
        other => panic!("Expected holdout_campaign, got {other:?}"),
    }
}

/// Without a lift field the lift is computed from the revenues.
#[test]
fn holdout_lift_is_computed_when_absent() {
    let cohort = build(
        ChartKind::HoldoutLift,
        json!({ "campaign": "Spring", "exposedRevenue": 45000, "holdoutRevenue": 32000 }),
    )
    .unwrap();
    assert!(matches!(cohort, Cohort::HoldoutCampaign { lift, .. } if lift == 40.6));
}

/// Rank is computed against the whole dataset, not the clicked row.
#[test]
fn incrementality_rank_uses_full_dataset() {
    let dataset = scoreboard(&[
        ("Email", 3.0),
        ("Meta", 2.5),
        ("Google Ads", 2.0),
        ("TikTok", 1.5),
        ("Organic", 1.0),
    ]);

    let meta = incrementality_click(&dataset, "Meta").unwrap();
    assert!(matches!(
        meta,
        Cohort::IncrementalityCohort { position: 2, action: ScaleAction::Scale, .. }
    ));

    let tiktok = incrementality_click(&dataset, "TikTok").unwrap();
    assert!(matches!(
        tiktok,
        Cohort::IncrementalityCohort { position: 4, action: ScaleAction::Retest, .. }
    ));
    assert_eq!(tiktok.description(), "TikTok - Needs retesting");
}

/// Middle of a large dataset is an optimization candidate.
#[test]
fn incrementality_middle_rank_is_optimize() {
    let rows: Vec<(String, f64)> = (0..10).map(|i| (format!("ch-{i}"), 10.0 - i as f64)).collect();
    let named: Vec<(&str, f64)> = rows.iter().map(|(c, l)| (c.as_str(), *l)).collect();
    let dataset = scoreboard(&named);

    let cohort = incrementality_click(&dataset, "ch-4").unwrap();
    assert!(matches!(
        cohort,
        Cohort::IncrementalityCohort { position: 5, action: ScaleAction::Optimize, .. }
    ));
}

/// Without a dataset, or with a channel not in it, there is no rank.
#[test]
fn incrementality_without_dataset_is_a_no_op() {
    let payload = json!({
        "channel": "Meta", "liftPerDollar": 2.0, "spend": 1, "incrementalRevenue": 2
    });
    assert!(build(ChartKind::IncrementalityScoreboard, payload).is_none());

    let dataset = scoreboard(&[("Email", 3.0)]);
    assert!(incrementality_click(&dataset, "Meta").is_none());
}

// ── LTV & retention ──────────────────────────────────────────────────────────

/// Line-chart events carry the row under activePayload and the series label beside it.
#[test]
fn ltv_click_unwraps_chart_event() {
    let cohort = build(
        ChartKind::LtvBySource,
        json!({
            "activePayload": [{ "payload": { "date": "2024-01-05", "LTV30": 80.0, "LTV60": 120.0, "LTV90": 150.0 } }],
            "activeLabel": "Meta"
        }),
    )
    .unwrap();

    match cohort {
        Cohort::LtvSource { source, date, ltv90, description, .. } => {
            assert_eq!(source, "Meta");
            assert_eq!(date, "2024-01-05");
            assert_eq!(ltv90, 150.0);
            assert_eq!(description, "LTV cohort for Meta source");
        }
        other => panic!("Expected ltv_source, got {other:?}"),
    }
}

/// Heatmap cells without measures default them to zero.
#[test]
fn churn_cell_defaults_missing_measures() {
    let cohort = build(ChartKind::ChurnRisk, json!({ "segment": "VIP", "recency": "61-90 days" })).unwrap();
    match cohort {
        Cohort::ChurnRiskSegment { risk_score, customers, risk_label, description, .. } => {
            assert_eq!(risk_score, 0.0);
            assert_eq!(customers, 0);
            assert_eq!(risk_label, RiskLabel::Low);
            assert_eq!(description, "VIP customers with 61-90 days recency - Low churn risk");
        }
        other => panic!("Expected churn_risk_segment, got {other:?}"),
    }
}

#[test]
fn churn_cell_labels_high_risk() {
    let cohort = build(
        ChartKind::ChurnRisk,
        json!({ "segment": "At Risk", "recency": "90+ days", "riskScore": 88.5, "customers": 412 }),
    )
    .unwrap();
    assert_eq!(cohort.to_json()["riskLabel"], "High");
}

#[test]
fn product_matrix_cell_uses_wire_field_names() {
    let cohort = build(
        ChartKind::ProductLtvMatrix,
        json!({ "firstProduct": "Hair Care", "LTVBucket": "$200-500", "count": 97 }),
    )
    .unwrap();
    let json = cohort.to_json();
    assert_eq!(json["type"], "product_ltv_segment");
    assert_eq!(json["firstProduct"], "Hair Care");
    assert_eq!(json["LTVBucket"], "$200-500");
    assert_eq!(json["count"], 97);
}

// ── Malformed payloads ───────────────────────────────────────────────────────

/// Empty-area clicks and junk never produce a cohort and never panic.
#[test]
fn malformed_payloads_map_to_none() {
    let junk = [
        Value::Null,
        json!({}),
        json!([]),
        json!("sankey"),
        json!({ "activePayload": [] }),
        json!({ "activePayload": [{ "payload": null }] }),
    ];
    for kind in ChartKind::ALL {
        for payload in &junk {
            assert!(
                build(kind, payload.clone()).is_none(),
                "{} must ignore {payload}",
                kind.id()
            );
        }
    }
}

/// A required numeric field holding a string is malformed.
#[test]
fn wrongly_typed_field_maps_to_none() {
    let cohort = build(
        ChartKind::Sankey,
        json!({ "source": "Google Ads", "target": "Product View", "value": "lots" }),
    );
    assert!(cohort.is_none());
}

// ── Dashboard actions ────────────────────────────────────────────────────────

#[test]
fn export_names_the_chart() {
    let cohort = CohortBuilder::export(ChartKind::ChurnRisk);
    assert_eq!(
        cohort.to_json(),
        json!({
            "type": "chart_export",
            "chartId": "churn-risk",
            "description": "Export Churn Risk Analysis data for campaign creation"
        })
    );
}

#[test]
fn action_plan_item_builds_action_guide() {
    let item = serde_json::to_value(&action_plan()[0]).unwrap();
    let cohort = build(ChartKind::ActionPlan, item).unwrap();
    match cohort {
        Cohort::GetActionGuide { action_id, category, title, .. } => {
            assert_eq!(action_id, 1);
            assert_eq!(category, "Email Recovery");
            assert_eq!(title, "Implement Cart Abandonment Sequence");
        }
        other => panic!("Expected get_action_guide, got {other:?}"),
    }
}

/// Every cohort the builder emits passes hand-off validation.
#[test]
fn built_cohorts_validate() {
    let cohorts = [
        build(ChartKind::Sankey, json!({ "source": "Email", "target": "Purchase", "value": 5 })),
        build(
            ChartKind::FunnelMetrics,
            json!({ "stage": "Checkout", "users": 900, "conversionRate": 4.2, "timeOnPage": 61, "scrollDepth": 77.5 }),
        ),
        build(
            ChartKind::BehaviorConversion,
            json!({ "behaviorMetric": 3.5, "conversionProbability": 12.25, "sessions": 40 }),
        ),
        build(
            ChartKind::RepeatRateForecast,
            json!({ "cohortMonth": "2024-01", "actualRate2nd": 22.0, "forecastRate2nd": 25.0, "customers": 1800 }),
        ),
    ];
    for cohort in cohorts {
        let cohort = cohort.expect("complete payload must map");
        assert!(cohort.validate().is_ok(), "{cohort:?} failed validation");
    }
}
