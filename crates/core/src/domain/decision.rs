use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Headline signal shown to the buyer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Recommendation {
    BuyNow,
    Wait,
    Monitor,
}

impl Recommendation {
    /// Parses the orchestrator spellings (`BUY NOW`, `BUY_NOW`, `WAIT`, `MONITOR`).
    pub fn parse(s: &str) -> Option<Self> {
        let key = s.trim().to_ascii_uppercase().replace([' ', '-'], "_");
        match key.as_str() {
            "BUY_NOW" => Some(Self::BuyNow),
            "WAIT" => Some(Self::Wait),
            "MONITOR" => Some(Self::Monitor),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BuyNow => "BUY_NOW",
            Self::Wait => "WAIT",
            Self::Monitor => "MONITOR",
        }
    }
}

impl fmt::Display for Recommendation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Volatility {
    Low,
    #[default]
    Moderate,
    High,
}

impl Volatility {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Some(Self::Low),
            "moderate" => Some(Self::Moderate),
            "high" => Some(Self::High),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentStatus {
    Ok,
    Fallback,
    Error,
}

impl AgentStatus {
    /// Unknown or missing statuses are reported as `error`.
    pub fn parse_or_error(s: Option<&str>) -> Self {
        match s.map(|s| s.trim().to_ascii_lowercase()).as_deref() {
            Some("ok") => Self::Ok,
            Some("fallback") => Self::Fallback,
            _ => Self::Error,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OutputValue {
    Number(f64),
    Text(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentLogEntry {
    pub agent: String,
    pub status: AgentStatus,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<BTreeMap<String, OutputValue>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UncertaintyRange {
    pub low: f64,
    pub high: f64,
}

impl UncertaintyRange {
    /// Orders the bounds so that `low <= high` always holds.
    pub fn new(a: f64, b: f64) -> Self {
        if a <= b {
            Self { low: a, high: b }
        } else {
            Self { low: b, high: a }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShapFactor {
    pub feature: String,
    pub impact: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub direction: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MarketContext {
    pub inventory_count: Option<u64>,
    pub inventory_trend: Option<String>,
    pub price_vs_median_pct: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub date: String,
    pub avg_price: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub listing_count: Option<u64>,
}

/// Canonical decision record every display surface renders from.
///
/// Always fully populated: absent backend data resolves to the defaults
/// applied in [`crate::normalize::normalize`], never to an error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionView {
    pub recommendation: Recommendation,
    /// 0..=100.
    pub confidence_score: u8,
    pub volatility: Volatility,
    /// 0..=100; absent means the metric is not rendered at all.
    pub risk_score: Option<u8>,
    pub projected_price: Option<f64>,
    /// Signed percentage change over 90 days.
    pub change_90d: Option<f64>,
    pub uncertainty_range: Option<UncertaintyRange>,
    /// At most three bullets, in backend order.
    pub reasoning_bullets: Vec<String>,
    pub agent_log: Vec<AgentLogEntry>,

    pub explanation: Option<String>,
    pub vehicle_name: Option<String>,
    pub current_price: Option<f64>,
    pub forecast_30d: Option<f64>,
    /// Raw 90-day forecast; may differ from `projected_price`.
    pub forecast_90d: Option<f64>,
    pub forecast_method: Option<String>,
    pub transparency_note: Option<String>,
    pub bias_statement: Option<String>,
    pub ethics_disclaimer: Option<String>,
    pub shap_factors: Vec<ShapFactor>,
    pub market_context: Option<MarketContext>,
    pub price_history: Vec<PricePoint>,
    pub last_known_price: Option<f64>,
    pub llm_key_insight: Option<String>,
}

impl DecisionView {
    /// Reasoning lines to display: the bullets, or the free-text explanation
    /// when the backend sent no bullets.
    pub fn reasoning_lines(&self) -> Vec<&str> {
        if !self.reasoning_bullets.is_empty() {
            return self.reasoning_bullets.iter().map(String::as_str).collect();
        }
        self.explanation.as_deref().into_iter().collect()
    }
}
