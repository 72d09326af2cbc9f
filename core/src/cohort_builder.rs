//! CohortBuilder: one mapping function per chart kind, held in a lookup
//! table keyed by ChartKind.
//!
//! RULES:
//!   - A mapper returns None for a payload missing required fields
//!     (e.g. a click on empty chart area). It never panics.
//!   - Derived numbers are recomputed from the payload on every call.
//!   - Rank-based fields are computed against the full current dataset.
//!   - Adding a chart kind means one new mapper and one new Cohort variant.

use crate::{
    chart::ChartKind,
    cohort::{Cohort, RiskLabel, ScaleAction},
    metric::MetricData,
};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Revenue per user used to estimate assisted-channel audience size.
pub const REVENUE_PER_USER: f64 = 45.0;

/// A raw chart interaction.
#[derive(Debug, Clone, Copy)]
pub struct Interaction<'a> {
    /// The clicked element. Either the data row itself or a chart-library
    /// event of the form `{"activePayload": [{"payload": row}], "activeLabel": ..}`.
    pub payload: &'a Value,
    /// The chart's current dataset, for mappers that rank against peers.
    pub dataset: Option<&'a MetricData>,
}

impl<'a> Interaction<'a> {
    pub fn new(payload: &'a Value) -> Self {
        Self { payload, dataset: None }
    }

    pub fn with_dataset(mut self, dataset: Option<&'a MetricData>) -> Self {
        self.dataset = dataset;
        self
    }

    /// The clicked row, unwrapping a chart-library event if present.
    fn row(&self) -> Option<&'a Map<String, Value>> {
        let object = self.payload.as_object()?;
        match object.get("activePayload") {
            Some(active) => active.as_array()?.first()?.get("payload")?.as_object(),
            None => Some(object),
        }
    }

    fn active_label(&self) -> Option<String> {
        self.payload.get("activeLabel").and_then(text_value)
    }
}

pub type CohortMapper = fn(&Interaction<'_>) -> Option<Cohort>;

pub struct CohortBuilder {
    table: BTreeMap<ChartKind, CohortMapper>,
}

impl CohortBuilder {
    pub fn empty() -> Self {
        Self { table: BTreeMap::new() }
    }

    /// Every chart kind wired to its mapper.
    pub fn standard() -> Self {
        let mut builder = Self::empty();
        builder.register(ChartKind::Sankey, journey_path);
        builder.register(ChartKind::AssistedRevenue, assisted_channel);
        builder.register(ChartKind::HoldoutLift, holdout_campaign);
        builder.register(ChartKind::IncrementalityScoreboard, incrementality_cohort);
        builder.register(ChartKind::FunnelMetrics, funnel_stage);
        builder.register(ChartKind::BehaviorConversion, behavior_segment);
        builder.register(ChartKind::LtvBySource, ltv_source);
        builder.register(ChartKind::ProductLtvMatrix, product_ltv_segment);
        builder.register(ChartKind::ChurnRisk, churn_risk_segment);
        builder.register(ChartKind::RepeatRateForecast, repeat_rate_cohort);
        builder.register(ChartKind::ActionPlan, action_guide);
        builder
    }

    pub fn register(&mut self, kind: ChartKind, mapper: CohortMapper) {
        self.table.insert(kind, mapper);
    }

    pub fn supports(&self, kind: ChartKind) -> bool {
        self.table.contains_key(&kind)
    }

    /// Map an interaction to a cohort. None means "no-op, do not dispatch".
    pub fn build(&self, kind: ChartKind, interaction: &Interaction<'_>) -> Option<Cohort> {
        let Some(mapper) = self.table.get(&kind) else {
            log::warn!("cohort: no mapper registered for chart '{}'", kind.id());
            return None;
        };
        let cohort = mapper(interaction);
        if cohort.is_none() {
            log::debug!("cohort: malformed payload for chart '{}' ignored", kind.id());
        }
        cohort
    }

    /// The "act on data" export cohort every chart offers.
    pub fn export(kind: ChartKind) -> Cohort {
        Cohort::ChartExport {
            chart_id:    kind.id().to_string(),
            description: format!("Export {} data for campaign creation", kind.title()),
        }
    }
}

impl Default for CohortBuilder {
    fn default() -> Self {
        Self::standard()
    }
}

// ── Field access ─────────────────────────────────────────────────────────────

fn text_value(value: &Value) -> Option<String> {
    let s = value.as_str()?.trim();
    (!s.is_empty()).then(|| s.to_string())
}

fn text(row: &Map<String, Value>, field: &str) -> Option<String> {
    row.get(field).and_then(text_value)
}

/// A string field, or the `name` of a node object (graph-layout links).
fn node_name(row: &Map<String, Value>, field: &str) -> Option<String> {
    let value = row.get(field)?;
    text_value(value).or_else(|| value.get("name").and_then(text_value))
}

fn number(row: &Map<String, Value>, field: &str) -> Option<f64> {
    row.get(field)?.as_f64().filter(|n| n.is_finite())
}

fn count(row: &Map<String, Value>, field: &str) -> Option<u64> {
    let value = row.get(field)?;
    value.as_u64().or_else(|| {
        value
            .as_f64()
            .filter(|n| n.is_finite() && *n >= 0.0)
            .map(|n| n.round() as u64)
    })
}

// ── Mappers ──────────────────────────────────────────────────────────────────

fn journey_path(interaction: &Interaction<'_>) -> Option<Cohort> {
    let row = interaction.row()?;
    let source = node_name(row, "source")?;
    let target = node_name(row, "target")?;
    let users = count(row, "value")?;
    Some(Cohort::JourneyPath {
        description: format!("{source} → {target} journey"),
        source,
        target,
        users,
    })
}

fn assisted_channel(interaction: &Interaction<'_>) -> Option<Cohort> {
    let row = interaction.row()?;
    let channel = text(row, "channel")?;
    let assisted = number(row, "assistedRevenue")?;
    let last_click = number(row, "lastClickRevenue")?;
    let lift_pct = (last_click != 0.0).then(|| (assisted - last_click) / last_click * 100.0);
    Some(Cohort::AssistedChannel {
        description:        format!("{channel} assisted revenue cohort"),
        channel,
        assisted_revenue:   assisted,
        last_click_revenue: last_click,
        users:              (assisted / REVENUE_PER_USER).floor().max(0.0) as u64,
        lift_pct,
    })
}

fn holdout_campaign(interaction: &Interaction<'_>) -> Option<Cohort> {
    let row = interaction.row()?;
    let campaign = text(row, "campaign")?;
    let exposed = number(row, "exposedRevenue")?;
    let holdout = number(row, "holdoutRevenue")?;
    let lift = match number(row, "lift") {
        Some(lift) => lift,
        None if holdout != 0.0 => ((exposed - holdout) / holdout * 1000.0).round() / 10.0,
        None => return None,
    };
    Some(Cohort::HoldoutCampaign {
        description:         format!("{campaign} holdout test cohort"),
        campaign,
        exposed_revenue:     exposed,
        holdout_revenue:     holdout,
        lift,
        incremental_revenue: exposed - holdout,
    })
}

fn incrementality_cohort(interaction: &Interaction<'_>) -> Option<Cohort> {
    let row = interaction.row()?;
    let channel = text(row, "channel")?;
    let lift_per_dollar = number(row, "liftPerDollar")?;
    let spend = number(row, "spend")?;
    let incremental_revenue = number(row, "incrementalRevenue")?;

    let Some(MetricData::IncrementalityScoreboard(rows)) = interaction.dataset else {
        return None;
    };
    let mut ranked: Vec<_> = rows.iter().collect();
    ranked.sort_by(|a, b| b.lift_per_dollar.total_cmp(&a.lift_per_dollar));
    let position = ranked.iter().position(|r| r.channel == channel)? + 1;
    let action = ScaleAction::for_rank(position, ranked.len());

    Some(Cohort::IncrementalityCohort {
        description: format!("{channel} - {}", action.summary()),
        channel,
        lift_per_dollar,
        spend,
        incremental_revenue,
        position,
        action,
    })
}

fn funnel_stage(interaction: &Interaction<'_>) -> Option<Cohort> {
    let row = interaction.row()?;
    let stage = text(row, "stage")?;
    Some(Cohort::FunnelStage {
        users:           count(row, "users")?,
        conversion_rate: number(row, "conversionRate")?,
        time_on_page:    number(row, "timeOnPage")?,
        scroll_depth:    number(row, "scrollDepth")?,
        description:     format!("{stage} stage optimization cohort"),
        stage,
    })
}

fn behavior_segment(interaction: &Interaction<'_>) -> Option<Cohort> {
    let row = interaction.row()?;
    let conversion_probability = number(row, "conversionProbability")?;
    Some(Cohort::BehaviorSegment {
        behavior_metric: number(row, "behaviorMetric")?,
        sessions:        count(row, "sessions")?,
        description:     format!(
            "High-probability behavior segment ({conversion_probability:.1}% conversion)"
        ),
        conversion_probability,
    })
}

fn ltv_source(interaction: &Interaction<'_>) -> Option<Cohort> {
    let row = interaction.row()?;
    let source = text(row, "source").or_else(|| interaction.active_label())?;
    Some(Cohort::LtvSource {
        date:        text(row, "date")?,
        ltv30:       number(row, "LTV30")?,
        ltv60:       number(row, "LTV60")?,
        ltv90:       number(row, "LTV90")?,
        description: format!("LTV cohort for {source} source"),
        source,
    })
}

// Heatmap cells may be clicked with no data behind them: the coordinates
// are required, the measures fall back to zero.

fn product_ltv_segment(interaction: &Interaction<'_>) -> Option<Cohort> {
    let row = interaction.row()?;
    let first_product = text(row, "firstProduct")?;
    let ltv_bucket = text(row, "LTVBucket")?;
    Some(Cohort::ProductLtvSegment {
        description: format!("{first_product} customers with {ltv_bucket} LTV"),
        count:       count(row, "count").unwrap_or(0),
        first_product,
        ltv_bucket,
    })
}

fn churn_risk_segment(interaction: &Interaction<'_>) -> Option<Cohort> {
    let row = interaction.row()?;
    let segment = text(row, "segment")?;
    let recency = text(row, "recency")?;
    let risk_score = number(row, "riskScore").unwrap_or(0.0);
    let risk_label = RiskLabel::for_score(risk_score);
    Some(Cohort::ChurnRiskSegment {
        description: format!(
            "{segment} customers with {recency} recency - {} churn risk",
            risk_label.as_str()
        ),
        customers: count(row, "customers").unwrap_or(0),
        segment,
        recency,
        risk_score,
        risk_label,
    })
}

fn repeat_rate_cohort(interaction: &Interaction<'_>) -> Option<Cohort> {
    let row = interaction.row()?;
    let cohort_month = text(row, "cohortMonth")?;
    Some(Cohort::RepeatRateCohort {
        actual_rate_2nd:   number(row, "actualRate2nd")?,
        forecast_rate_2nd: number(row, "forecastRate2nd")?,
        customers:         count(row, "customers")?,
        description:       format!("{cohort_month} cohort repeat rate analysis"),
        cohort_month,
    })
}

fn action_guide(interaction: &Interaction<'_>) -> Option<Cohort> {
    let row = interaction.row()?;
    let action_id = u32::try_from(count(row, "id").or_else(|| count(row, "actionId"))?).ok()?;
    let title = text(row, "title")?;
    Some(Cohort::GetActionGuide {
        category:    text(row, "category")?,
        description: format!("Generate detailed implementation guide for: {title}"),
        action_id,
        title,
    })
}
