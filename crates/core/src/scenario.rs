//! What-if forecasts under a fixed catalog of macroeconomic shocks.

use crate::domain::decision::DecisionView;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScenarioDefinition {
    pub key: &'static str,
    pub label: &'static str,
    /// Signed adjustment applied to the 90-day change, in percentage points.
    pub delta_percent: f64,
    pub description: &'static str,
}

static SCENARIOS: [ScenarioDefinition; 4] = [
    ScenarioDefinition {
        key: "interest_rate_hike",
        label: "Rate Hike",
        delta_percent: -2.5,
        description: "Fed raises rates → lower demand",
    },
    ScenarioDefinition {
        key: "fuel_spike",
        label: "Fuel Spike",
        delta_percent: -1.8,
        description: "Gas prices surge 30%",
    },
    ScenarioDefinition {
        key: "ev_subsidy",
        label: "EV Subsidy",
        delta_percent: 1.5,
        description: "New $4k federal EV credit",
    },
    ScenarioDefinition {
        key: "supply_chain",
        label: "Supply Crunch",
        delta_percent: 3.2,
        description: "Chip shortage cuts new car output",
    },
];

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScenarioResult {
    pub adjusted_change_percent: f64,
    pub adjusted_price: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScenarioOutcome {
    pub key: &'static str,
    pub label: &'static str,
    pub delta_percent: f64,
    pub result: ScenarioResult,
}

pub fn catalog() -> &'static [ScenarioDefinition] {
    &SCENARIOS
}

pub fn find(key: &str) -> Option<&'static ScenarioDefinition> {
    SCENARIOS.iter().find(|s| s.key == key)
}

/// Adjusted forecast for the active scenario, or the baseline unchanged.
///
/// A key that is not in the catalog behaves exactly like no key.
pub fn simulate(
    base_percent: f64,
    base_projected_price: Option<f64>,
    active_scenario_key: Option<&str>,
) -> ScenarioResult {
    let Some(scenario) = active_scenario_key.and_then(find) else {
        if let Some(key) = active_scenario_key {
            tracing::debug!(key, "unknown scenario key; using baseline");
        }
        return ScenarioResult {
            adjusted_change_percent: base_percent,
            adjusted_price: base_projected_price,
        };
    };

    ScenarioResult {
        adjusted_change_percent: round_half_up(base_percent + scenario.delta_percent, 1),
        adjusted_price: base_projected_price
            .map(|price| round_half_up(price * (1.0 + scenario.delta_percent / 100.0), 0)),
    }
}

/// Selecting the active scenario again clears the selection.
pub fn toggle(active: Option<&str>, key: &str) -> Option<String> {
    if active == Some(key) {
        None
    } else {
        Some(key.to_string())
    }
}

/// Every catalog scenario applied to the view's baseline.
pub fn outlook(view: &DecisionView) -> Vec<ScenarioOutcome> {
    let base_percent = view.change_90d.unwrap_or(0.0);
    SCENARIOS
        .iter()
        .map(|s| ScenarioOutcome {
            key: s.key,
            label: s.label,
            delta_percent: s.delta_percent,
            result: simulate(base_percent, view.projected_price, Some(s.key)),
        })
        .collect()
}

fn round_half_up(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor + 0.5).floor() / factor
}
