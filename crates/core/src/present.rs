//! Display helpers shared by the dashboard API and the CLI.

use crate::domain::decision::{AgentLogEntry, DecisionView, OutputValue, Recommendation};
use serde::Serialize;

const GAUGE_RADIUS: f64 = 40.0;
const PREVIEW_ENTRIES: usize = 3;
const ORCHESTRATOR_AGENT: &str = "OrchestratorAgent";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ConfidenceTier {
    High,
    Moderate,
    Low,
}

impl ConfidenceTier {
    pub fn from_score(score: u8) -> Self {
        if score >= 75 {
            Self::High
        } else if score >= 55 {
            Self::Moderate
        } else {
            Self::Low
        }
    }
}

/// Dash offset of the half-circle confidence gauge arc.
pub fn gauge_dash_offset(score: u8) -> f64 {
    let pct = f64::from(score.min(100));
    std::f64::consts::PI * GAUGE_RADIUS * (1.0 - pct / 100.0)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SignalStyle {
    pub label: &'static str,
    pub trend: &'static str,
}

impl SignalStyle {
    pub fn for_recommendation(rec: Recommendation) -> Self {
        match rec {
            Recommendation::BuyNow => Self {
                label: "Strong Buy Signal",
                trend: "up",
            },
            Recommendation::Wait => Self {
                label: "Wait — Price Falling",
                trend: "down",
            },
            Recommendation::Monitor => Self {
                label: "Monitor the Market",
                trend: "flat",
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedFactor {
    pub name: String,
    pub impact: f64,
    pub direction: Option<String>,
}

/// SHAP factors by absolute impact, largest first.
pub fn ranked_shap_factors(view: &DecisionView) -> Vec<RankedFactor> {
    let mut out: Vec<_> = view
        .shap_factors
        .iter()
        .map(|f| RankedFactor {
            name: f.feature.replace('_', " "),
            impact: f.impact.abs(),
            direction: f.direction.clone(),
        })
        .collect();
    out.sort_by(|a, b| b.impact.total_cmp(&a.impact));
    out
}

/// Short `key: value` pairs shown under an agent log entry.
pub fn agent_output_preview(entry: &AgentLogEntry) -> Vec<(String, String)> {
    if entry.agent == ORCHESTRATOR_AGENT {
        return Vec::new();
    }
    let Some(output) = &entry.output else {
        return Vec::new();
    };
    output
        .iter()
        .take(PREVIEW_ENTRIES)
        .map(|(k, v)| {
            let value = match v {
                OutputValue::Number(n) if n.abs() >= 1000.0 => format_price(*n),
                OutputValue::Number(n) => format_number(*n),
                OutputValue::Text(s) => s.clone(),
            };
            (k.replace('_', " "), value)
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartPoint {
    pub label: String,
    pub historical: Option<f64>,
    pub forecast: Option<f64>,
}

/// Price history followed by the bridged forecast segment.
pub fn forecast_chart(view: &DecisionView) -> Vec<ChartPoint> {
    let mut points: Vec<_> = view
        .price_history
        .iter()
        .map(|p| ChartPoint {
            label: p.date.clone(),
            historical: Some(p.avg_price),
            forecast: None,
        })
        .collect();

    let forecast_90d = view.forecast_90d;
    let Some(last_known) = view.last_known_price else {
        return points;
    };
    if view.forecast_30d.is_none() && forecast_90d.is_none() {
        return points;
    }

    if let Some(last) = points.last_mut() {
        last.forecast = last.historical;
    }
    for (label, value) in [
        ("Now", Some(last_known)),
        ("+30d", view.forecast_30d),
        ("+90d", forecast_90d),
    ] {
        points.push(ChartPoint {
            label: label.to_string(),
            historical: None,
            forecast: value,
        });
    }
    points
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AgentPreview {
    pub agent: String,
    pub entries: Vec<(String, String)>,
}

/// Everything the result panel draws beyond the raw view.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Presentation {
    pub signal: SignalStyle,
    pub confidence_tier: ConfidenceTier,
    pub gauge_dash_offset: f64,
    pub chart: Vec<ChartPoint>,
    pub shap: Vec<RankedFactor>,
    pub agent_previews: Vec<AgentPreview>,
}

impl Presentation {
    pub fn for_view(view: &DecisionView) -> Self {
        Self {
            signal: SignalStyle::for_recommendation(view.recommendation),
            confidence_tier: ConfidenceTier::from_score(view.confidence_score),
            gauge_dash_offset: gauge_dash_offset(view.confidence_score),
            chart: forecast_chart(view),
            shap: ranked_shap_factors(view),
            agent_previews: view
                .agent_log
                .iter()
                .map(|entry| AgentPreview {
                    agent: entry.agent.clone(),
                    entries: agent_output_preview(entry),
                })
                .collect(),
        }
    }
}

pub fn format_signed_percent(pct: f64) -> String {
    if pct > 0.0 {
        format!("+{pct:.1}%")
    } else if pct < 0.0 {
        format!("{pct:.1}%")
    } else {
        "0.0%".to_string()
    }
}

/// Whole-dollar price with thousands separators, e.g. `$30,450`.
pub fn format_price(price: f64) -> String {
    let rounded = price.round();
    let sign = if rounded < 0.0 { "-" } else { "" };
    format!("{sign}${}", group_thousands(rounded.abs() as u64))
}

fn format_number(n: f64) -> String {
    if n.fract() == 0.0 {
        format!("{n:.0}")
    } else {
        n.to_string()
    }
}

fn group_thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i != 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}
