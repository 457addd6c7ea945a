//! Maps either backend response schema onto a single [`DecisionView`].
//!
//! Each field is resolved by an ordered list of extraction rules; the first
//! rule that yields a value wins and the field default applies otherwise.
//! Nothing in here can fail.

use crate::domain::contract::{as_number, as_text, RawPredictionResponse};
use crate::domain::decision::{
    AgentLogEntry, AgentStatus, DecisionView, MarketContext, OutputValue, PricePoint,
    Recommendation, ShapFactor, UncertaintyRange, Volatility,
};
use serde_json::Value;
use std::collections::BTreeMap;

const MAX_REASONING_BULLETS: usize = 3;
const DEFAULT_CONFIDENCE: u8 = 38;

type Rule<T> = fn(&RawPredictionResponse) -> Option<T>;

fn first_match<T>(raw: &RawPredictionResponse, rules: &[Rule<T>]) -> Option<T> {
    rules.iter().find_map(|rule| rule(raw))
}

const RECOMMENDATION_RULES: &[Rule<Recommendation>] =
    &[orchestrator_recommendation, legacy_recommendation];
const CONFIDENCE_RULES: &[Rule<u8>] = &[orchestrator_confidence, legacy_confidence];
const PROJECTED_PRICE_RULES: &[Rule<f64>] = &[projected_price, legacy_forecast_90d];
const CURRENT_PRICE_RULES: &[Rule<f64>] = &[current_price, legacy_predicted_price];
const FORECAST_30D_RULES: &[Rule<f64>] = &[forecast_30d, tool_forecast_30d];
const FORECAST_90D_RULES: &[Rule<f64>] = &[legacy_forecast_90d, tool_forecast_90d];
const FORECAST_METHOD_RULES: &[Rule<String>] = &[forecast_method, tool_forecast_method];
const SHAP_RULES: &[Rule<Vec<ShapFactor>>] = &[top_level_shap, tool_shap];

/// Produces the canonical view for one backend response.
pub fn normalize(raw: &RawPredictionResponse) -> DecisionView {
    let reasoning_bullets = reasoning_bullets(raw);

    let view = DecisionView {
        recommendation: first_match(raw, RECOMMENDATION_RULES).unwrap_or(Recommendation::Monitor),
        confidence_score: first_match(raw, CONFIDENCE_RULES).unwrap_or(DEFAULT_CONFIDENCE),
        volatility: raw
            .text("volatility_index")
            .and_then(Volatility::parse)
            .unwrap_or_default(),
        risk_score: raw.number("risk_score").map(percent_score),
        projected_price: first_match(raw, PROJECTED_PRICE_RULES),
        change_90d: raw.number("predicted_90_day_change"),
        uncertainty_range: uncertainty_range(raw),
        reasoning_bullets,
        agent_log: agent_log(raw),
        explanation: owned(raw.text("explanation")),
        vehicle_name: owned(raw.text("vehicle_name")),
        current_price: first_match(raw, CURRENT_PRICE_RULES),
        forecast_30d: first_match(raw, FORECAST_30D_RULES),
        forecast_90d: first_match(raw, FORECAST_90D_RULES),
        forecast_method: first_match(raw, FORECAST_METHOD_RULES),
        transparency_note: owned(raw.text("transparency_note")),
        bias_statement: owned(raw.text("bias_statement")),
        ethics_disclaimer: owned(raw.text("ethics_disclaimer")),
        shap_factors: first_match(raw, SHAP_RULES).unwrap_or_default(),
        market_context: market_context(raw),
        price_history: price_history(raw),
        last_known_price: non_negative(
            raw.number_at(&["tool_outputs", "run_forecast", "last_known_price"]),
        ),
        llm_key_insight: llm_key_insight(raw),
    };

    tracing::debug!(
        recommendation = %view.recommendation,
        confidence_score = view.confidence_score,
        volatility = ?view.volatility,
        agent_log_len = view.agent_log.len(),
        "normalized prediction response"
    );

    view
}

/// Any non-empty orchestrator value wins; one outside the known set reads as
/// `MONITOR` rather than deferring to the legacy field.
fn orchestrator_recommendation(raw: &RawPredictionResponse) -> Option<Recommendation> {
    raw.text("final_recommendation")
        .map(|s| Recommendation::parse(s).unwrap_or(Recommendation::Monitor))
}

fn legacy_recommendation(raw: &RawPredictionResponse) -> Option<Recommendation> {
    let legacy = raw.text("recommendation")?;
    match legacy.to_ascii_uppercase().as_str() {
        "BUY" => Some(Recommendation::BuyNow),
        "NEUTRAL" => Some(Recommendation::Monitor),
        _ => Recommendation::parse(legacy),
    }
}

fn orchestrator_confidence(raw: &RawPredictionResponse) -> Option<u8> {
    raw.number("confidence_score").map(percent_score)
}

fn legacy_confidence(raw: &RawPredictionResponse) -> Option<u8> {
    let legacy = raw.text("confidence")?;
    Some(match legacy.to_ascii_uppercase().as_str() {
        "HIGH" => 85,
        "MODERATE" => 65,
        _ => DEFAULT_CONFIDENCE,
    })
}

fn projected_price(raw: &RawPredictionResponse) -> Option<f64> {
    non_negative(raw.number("projected_price"))
}

fn legacy_forecast_90d(raw: &RawPredictionResponse) -> Option<f64> {
    non_negative(raw.number("forecast_90d"))
}

fn current_price(raw: &RawPredictionResponse) -> Option<f64> {
    non_negative(raw.number("current_price"))
}

fn legacy_predicted_price(raw: &RawPredictionResponse) -> Option<f64> {
    non_negative(raw.number("predicted_price"))
}

fn forecast_30d(raw: &RawPredictionResponse) -> Option<f64> {
    non_negative(raw.number("forecast_30d"))
}

fn tool_forecast_30d(raw: &RawPredictionResponse) -> Option<f64> {
    non_negative(raw.number_at(&["tool_outputs", "run_forecast", "forecast_30d"]))
}

fn tool_forecast_90d(raw: &RawPredictionResponse) -> Option<f64> {
    non_negative(raw.number_at(&["tool_outputs", "run_forecast", "forecast_90d"]))
}

fn forecast_method(raw: &RawPredictionResponse) -> Option<String> {
    owned(raw.text("forecast_method"))
}

fn tool_forecast_method(raw: &RawPredictionResponse) -> Option<String> {
    owned(raw.text_at(&["tool_outputs", "run_forecast", "method"]))
}

fn top_level_shap(raw: &RawPredictionResponse) -> Option<Vec<ShapFactor>> {
    non_empty(shap_factors(raw.array("shap_factors")))
}

fn tool_shap(raw: &RawPredictionResponse) -> Option<Vec<ShapFactor>> {
    non_empty(shap_factors(raw.array_at(&[
        "tool_outputs",
        "run_price_prediction",
        "shap_factors",
    ])))
}

fn percent_score(n: f64) -> u8 {
    n.round().clamp(0.0, 100.0) as u8
}

fn non_negative(n: Option<f64>) -> Option<f64> {
    n.filter(|n| *n >= 0.0)
}

fn owned(s: Option<&str>) -> Option<String> {
    s.map(str::to_string)
}

fn non_empty<T>(v: Vec<T>) -> Option<Vec<T>> {
    (!v.is_empty()).then_some(v)
}

/// Insight from the LLM price analysis, dropped when that step reported an error.
fn llm_key_insight(raw: &RawPredictionResponse) -> Option<String> {
    let failed = raw
        .path(&["tool_outputs", "run_llm_price_analysis", "error"])
        .is_some_and(|e| match e {
            Value::Bool(b) => *b,
            Value::String(s) => !s.is_empty(),
            Value::Number(n) => n.as_f64() != Some(0.0),
            _ => true,
        });
    if failed {
        return None;
    }
    owned(raw.text_at(&["tool_outputs", "run_llm_price_analysis", "key_insight"]))
}

fn reasoning_bullets(raw: &RawPredictionResponse) -> Vec<String> {
    raw.array("reasoning_summary")
        .map(|items| {
            items
                .iter()
                .filter_map(as_text)
                .take(MAX_REASONING_BULLETS)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

fn uncertainty_range(raw: &RawPredictionResponse) -> Option<UncertaintyRange> {
    let low = raw.number_at(&["uncertainty_range", "low"])?;
    let high = raw.number_at(&["uncertainty_range", "high"])?;
    Some(UncertaintyRange::new(low, high))
}

fn agent_log(raw: &RawPredictionResponse) -> Vec<AgentLogEntry> {
    let Some(entries) = raw.array("agent_log") else {
        return Vec::new();
    };
    entries.iter().filter_map(agent_log_entry).collect()
}

fn agent_log_entry(value: &Value) -> Option<AgentLogEntry> {
    let obj = value.as_object()?;
    let agent = obj.get("agent").and_then(as_text)?.to_string();
    let message = obj.get("message").and_then(as_text)?.to_string();
    let status = AgentStatus::parse_or_error(obj.get("status").and_then(Value::as_str));

    let output = obj.get("output").and_then(Value::as_object).map(|map| {
        map.iter()
            .filter_map(|(k, v)| output_value(v).map(|v| (k.clone(), v)))
            .collect::<BTreeMap<_, _>>()
    });

    Some(AgentLogEntry {
        agent,
        status,
        message,
        output,
    })
}

fn output_value(value: &Value) -> Option<OutputValue> {
    match value {
        Value::Number(n) => n.as_f64().filter(|n| n.is_finite()).map(OutputValue::Number),
        Value::String(s) => Some(OutputValue::Text(s.clone())),
        Value::Bool(b) => Some(OutputValue::Text(b.to_string())),
        _ => None,
    }
}

fn shap_factors(items: Option<&Vec<Value>>) -> Vec<ShapFactor> {
    let Some(items) = items else {
        return Vec::new();
    };
    items
        .iter()
        .filter_map(|item| {
            let obj = item.as_object()?;
            Some(ShapFactor {
                feature: obj.get("feature").and_then(as_text)?.to_string(),
                impact: obj.get("impact").and_then(as_number)?,
                direction: obj.get("direction").and_then(as_text).map(str::to_string),
            })
        })
        .collect()
}

fn market_context(raw: &RawPredictionResponse) -> Option<MarketContext> {
    let ctx = raw.path(&["tool_outputs", "get_market_context"])?.as_object()?;
    Some(MarketContext {
        inventory_count: ctx
            .get("current_inventory_count")
            .and_then(as_number)
            .filter(|n| *n >= 0.0)
            .map(|n| n.round() as u64),
        inventory_trend: ctx.get("inventory_trend").and_then(as_text).map(str::to_string),
        price_vs_median_pct: ctx.get("price_vs_median_pct").and_then(as_number),
    })
}

fn price_history(raw: &RawPredictionResponse) -> Vec<PricePoint> {
    let Some(items) = raw.array_at(&["tool_outputs", "get_price_history"]) else {
        return Vec::new();
    };
    items
        .iter()
        .filter_map(|item| {
            let obj = item.as_object()?;
            Some(PricePoint {
                date: obj.get("date").and_then(as_text)?.to_string(),
                avg_price: obj.get("avg_price").and_then(as_number)?,
                listing_count: obj
                    .get("listing_count")
                    .and_then(as_number)
                    .filter(|n| *n >= 0.0)
                    .map(|n| n.round() as u64),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn view(value: Value) -> DecisionView {
        normalize(&RawPredictionResponse::new(value))
    }

    fn orchestrator_fixture() -> Value {
        json!({
            "vehicle_name": "2021 Tesla Model 3",
            "predicted_90_day_change": -4.2,
            "projected_price": 33721.6,
            "current_price": 35200,
            "confidence_score": 82,
            "volatility_index": "Moderate",
            "risk_score": 58,
            "final_recommendation": "WAIT",
            "reasoning_summary": [
                "Projected 4.2% decline over 90 days.",
                "Confidence 82% with moderate volatility.",
                "Waiting 30-90 days likely yields a better price.",
            ],
            "uncertainty_range": {"low": 31023.87, "high": 36419.33},
            "transparency_note": "Blended XGBoost + LLM forecast.",
            "agent_log": [
                {
                    "agent": "OrchestratorAgent",
                    "status": "ok",
                    "message": "Initiating pipeline.",
                    "output": {"pipeline": "7-agent"}
                },
                {
                    "agent": "DataAgent",
                    "status": "fallback",
                    "message": "Retrieved 12 months of price history.",
                    "output": {"n_months": 12, "inventory_trend": "stable", "extra": [1, 2]}
                },
                {
                    "agent": "EthicsAgent",
                    "status": "ok",
                    "message": "Fairness check passed.",
                    "output": {"bias_reviewed": true}
                }
            ],
            "recommendation": "WAIT",
            "confidence": "HIGH",
            "explanation": "Joined explanation text.",
            "forecast_90d": 33721.6,
            "forecast_method": "llm_blended",
            "tool_outputs": {
                "get_price_history": [
                    {"date": "2024-01", "avg_price": 35200, "listing_count": 312}
                ],
                "run_forecast": {
                    "forecast_30d": 34707.2,
                    "forecast_90d": 33721.6,
                    "method": "prophet",
                    "last_known_price": 35200
                },
                "get_market_context": {
                    "current_inventory_count": 312,
                    "inventory_trend": "stable",
                    "price_vs_median_pct": -2.1
                },
                "run_price_prediction": {"predicted_price": 35200, "shap_factors": []}
            },
            "shap_factors": []
        })
    }

    #[test]
    fn legacy_buy_maps_to_buy_now() {
        let v = view(json!({"recommendation": "BUY", "confidence": "HIGH", "forecast_90d": 22938}));
        assert_eq!(v.recommendation, Recommendation::BuyNow);
        assert_eq!(v.confidence_score, 85);
        assert_eq!(v.projected_price, Some(22938.0));
    }

    #[test]
    fn legacy_neutral_maps_to_monitor() {
        let v = view(json!({"recommendation": "NEUTRAL", "confidence": "MODERATE"}));
        assert_eq!(v.recommendation, Recommendation::Monitor);
        assert_eq!(v.confidence_score, 65);
    }

    #[test]
    fn legacy_wait_passes_through() {
        let v = view(json!({"recommendation": "WAIT", "confidence": "LOW"}));
        assert_eq!(v.recommendation, Recommendation::Wait);
        assert_eq!(v.confidence_score, 38);
    }

    #[test]
    fn orchestrator_recommendation_wins_over_legacy() {
        let v = view(json!({"final_recommendation": "BUY NOW", "recommendation": "NEUTRAL"}));
        assert_eq!(v.recommendation, Recommendation::BuyNow);

        let v = view(json!({"final_recommendation": "WAIT", "recommendation": "BUY"}));
        assert_eq!(v.recommendation, Recommendation::Wait);
    }

    #[test]
    fn empty_final_recommendation_falls_through() {
        let v = view(json!({"final_recommendation": "", "recommendation": "BUY"}));
        assert_eq!(v.recommendation, Recommendation::BuyNow);

        let v = view(json!({"final_recommendation": null, "recommendation": "WAIT"}));
        assert_eq!(v.recommendation, Recommendation::Wait);

        let v = view(json!({"recommendation": "SELL"}));
        assert_eq!(v.recommendation, Recommendation::Monitor);
    }

    #[test]
    fn unknown_final_recommendation_reads_as_monitor() {
        let v = view(json!({"final_recommendation": "STRONG SELL", "recommendation": "BUY"}));
        assert_eq!(v.recommendation, Recommendation::Monitor);

        let v = view(json!({"final_recommendation": "hold", "recommendation": "WAIT"}));
        assert_eq!(v.recommendation, Recommendation::Monitor);
    }

    #[test]
    fn missing_confidence_defaults_to_38() {
        let v = view(json!({"final_recommendation": "WAIT"}));
        assert_eq!(v.confidence_score, 38);
    }

    #[test]
    fn confidence_score_wins_and_is_clamped() {
        let v = view(json!({"confidence_score": 76, "confidence": "HIGH"}));
        assert_eq!(v.confidence_score, 76);

        let v = view(json!({"confidence_score": 0, "confidence": "HIGH"}));
        assert_eq!(v.confidence_score, 0);

        let v = view(json!({"confidence_score": 140.7, "risk_score": -3}));
        assert_eq!(v.confidence_score, 100);
        assert_eq!(v.risk_score, Some(0));
    }

    #[test]
    fn empty_payload_yields_documented_defaults() {
        let v = view(json!({}));
        assert_eq!(v.recommendation, Recommendation::Monitor);
        assert_eq!(v.confidence_score, 38);
        assert_eq!(v.volatility, Volatility::Moderate);
        assert_eq!(v.risk_score, None);
        assert_eq!(v.projected_price, None);
        assert_eq!(v.change_90d, None);
        assert_eq!(v.uncertainty_range, None);
        assert!(v.reasoning_bullets.is_empty());
        assert!(v.agent_log.is_empty());
        assert!(v.reasoning_lines().is_empty());
    }

    #[test]
    fn non_object_payload_is_tolerated() {
        let v = view(json!("internal server error"));
        assert_eq!(v.recommendation, Recommendation::Monitor);
        assert_eq!(v.confidence_score, 38);
    }

    #[test]
    fn projected_price_prefers_orchestrator_field() {
        let v = view(json!({"projected_price": 30000, "forecast_90d": 29000}));
        assert_eq!(v.projected_price, Some(30000.0));

        let v = view(json!({"projected_price": null, "forecast_90d": 29000}));
        assert_eq!(v.projected_price, Some(29000.0));

        let v = view(json!({"projected_price": -5, "forecast_90d": "29000"}));
        assert_eq!(v.projected_price, Some(29000.0));
    }

    #[test]
    fn forecast_90d_keeps_its_own_fallback() {
        let v = view(json!({
            "projected_price": 30000,
            "tool_outputs": {"run_forecast": {"forecast_90d": 28500}}
        }));
        assert_eq!(v.projected_price, Some(30000.0));
        assert_eq!(v.forecast_90d, Some(28500.0));

        let v = view(json!({
            "forecast_90d": 29000,
            "tool_outputs": {"run_forecast": {"forecast_90d": 28500}}
        }));
        assert_eq!(v.forecast_90d, Some(29000.0));
    }

    #[test]
    fn llm_key_insight_is_hidden_when_analysis_failed() {
        let v = view(json!({
            "tool_outputs": {"run_llm_price_analysis": {"key_insight": "Prices peak in spring."}}
        }));
        assert_eq!(v.llm_key_insight.as_deref(), Some("Prices peak in spring."));

        let v = view(json!({
            "tool_outputs": {"run_llm_price_analysis": {
                "key_insight": "Prices peak in spring.",
                "error": "rate limited"
            }}
        }));
        assert_eq!(v.llm_key_insight, None);

        let v = view(json!({
            "tool_outputs": {"run_llm_price_analysis": {"key_insight": "  ", "error": null}}
        }));
        assert_eq!(v.llm_key_insight, None);
    }

    #[test]
    fn unknown_volatility_defaults_to_moderate() {
        assert_eq!(view(json!({"volatility_index": "Extreme"})).volatility, Volatility::Moderate);
        assert_eq!(view(json!({"volatility_index": "high"})).volatility, Volatility::High);
    }

    #[test]
    fn reasoning_falls_back_to_explanation() {
        let v = view(json!({"reasoning_summary": [], "explanation": "Prices are flat."}));
        assert!(v.reasoning_bullets.is_empty());
        assert_eq!(v.reasoning_lines(), vec!["Prices are flat."]);
    }

    #[test]
    fn reasoning_is_capped_at_three_string_bullets() {
        let v = view(json!({"reasoning_summary": ["a", 7, "b", "  ", "c", "d"]}));
        assert_eq!(v.reasoning_bullets, vec!["a", "b", "c"]);
    }

    #[test]
    fn inverted_uncertainty_range_is_reordered() {
        let v = view(json!({"uncertainty_range": {"low": 36000, "high": 31000}}));
        let r = v.uncertainty_range.unwrap();
        assert!(r.low <= r.high);

        let v = view(json!({"uncertainty_range": {"low": 36000}}));
        assert_eq!(v.uncertainty_range, None);
    }

    #[test]
    fn orchestrator_report_is_fully_mapped() {
        let v = view(orchestrator_fixture());
        assert_eq!(v.recommendation, Recommendation::Wait);
        assert_eq!(v.confidence_score, 82);
        assert_eq!(v.volatility, Volatility::Moderate);
        assert_eq!(v.risk_score, Some(58));
        assert_eq!(v.projected_price, Some(33721.6));
        assert_eq!(v.change_90d, Some(-4.2));
        assert_eq!(v.reasoning_bullets.len(), 3);
        assert_eq!(v.current_price, Some(35200.0));
        assert_eq!(v.forecast_30d, Some(34707.2));
        assert_eq!(v.forecast_method.as_deref(), Some("llm_blended"));
        assert_eq!(v.last_known_price, Some(35200.0));
        assert_eq!(v.price_history.len(), 1);
        assert_eq!(v.price_history[0].listing_count, Some(312));

        let ctx = v.market_context.unwrap();
        assert_eq!(ctx.inventory_count, Some(312));
        assert_eq!(ctx.price_vs_median_pct, Some(-2.1));
    }

    #[test]
    fn agent_log_entries_are_sanitised() {
        let v = view(orchestrator_fixture());
        assert_eq!(v.agent_log.len(), 3);
        assert_eq!(v.agent_log[1].status, AgentStatus::Fallback);

        let output = v.agent_log[1].output.as_ref().unwrap();
        assert_eq!(output.get("n_months"), Some(&OutputValue::Number(12.0)));
        assert!(!output.contains_key("extra"));

        let ethics = v.agent_log[2].output.as_ref().unwrap();
        assert_eq!(
            ethics.get("bias_reviewed"),
            Some(&OutputValue::Text("true".to_string()))
        );

        let v = view(json!({
            "agent_log": [
                {"agent": "DataAgent", "status": "weird", "message": "m"},
                {"agent": "DecisionAgent"},
                "not an entry"
            ]
        }));
        assert_eq!(v.agent_log.len(), 1);
        assert_eq!(v.agent_log[0].status, AgentStatus::Error);
        assert_eq!(v.agent_log[0].output, None);
    }

    #[test]
    fn shap_factors_fall_back_to_tool_outputs() {
        let v = view(json!({
            "shap_factors": [],
            "tool_outputs": {
                "run_price_prediction": {
                    "shap_factors": [
                        {"feature": "mileage", "impact": -1200.5, "direction": "negative"},
                        {"feature": "broken"}
                    ]
                }
            }
        }));
        assert_eq!(v.shap_factors.len(), 1);
        assert_eq!(v.shap_factors[0].feature, "mileage");
    }

    #[test]
    fn normalize_is_deterministic() {
        let raw = RawPredictionResponse::new(orchestrator_fixture());
        assert_eq!(normalize(&raw), normalize(&raw));
    }
}
