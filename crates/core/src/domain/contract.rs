use anyhow::Context;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Untyped prediction backend response.
///
/// The backend has shipped two schemas over time (legacy `recommendation` /
/// `confidence` / `forecast_90d`, and the orchestrator report with
/// `final_recommendation`, `confidence_score`, `agent_log`, ...). Both may be
/// present at once and any field may be missing, so the payload is kept as a
/// JSON value and read through lenient accessors instead of a strict parse.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawPredictionResponse(Value);

impl RawPredictionResponse {
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    pub fn from_json_str(text: &str) -> anyhow::Result<Self> {
        let value = serde_json::from_str::<Value>(text)
            .context("prediction response is not valid JSON")?;
        Ok(Self(value))
    }

    pub fn as_value(&self) -> &Value {
        &self.0
    }

    pub fn into_value(self) -> Value {
        self.0
    }

    /// Looks up a nested field; `null` counts as absent.
    pub fn path(&self, keys: &[&str]) -> Option<&Value> {
        let mut cur = &self.0;
        for key in keys {
            cur = cur.as_object()?.get(*key)?;
        }
        (!cur.is_null()).then_some(cur)
    }

    pub fn field(&self, key: &str) -> Option<&Value> {
        self.path(&[key])
    }

    /// Trimmed, non-empty string at `keys`.
    pub fn text_at(&self, keys: &[&str]) -> Option<&str> {
        self.path(keys).and_then(as_text)
    }

    pub fn text(&self, key: &str) -> Option<&str> {
        self.text_at(&[key])
    }

    /// Finite number at `keys`, accepting numeric strings.
    pub fn number_at(&self, keys: &[&str]) -> Option<f64> {
        self.path(keys).and_then(as_number)
    }

    pub fn number(&self, key: &str) -> Option<f64> {
        self.number_at(&[key])
    }

    pub fn array_at(&self, keys: &[&str]) -> Option<&Vec<Value>> {
        self.path(keys).and_then(Value::as_array)
    }

    pub fn array(&self, key: &str) -> Option<&Vec<Value>> {
        self.array_at(&[key])
    }
}

impl From<Value> for RawPredictionResponse {
    fn from(value: Value) -> Self {
        Self(value)
    }
}

pub fn as_text(value: &Value) -> Option<&str> {
    value.as_str().map(str::trim).filter(|s| !s.is_empty())
}

pub fn as_number(value: &Value) -> Option<f64> {
    let n = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    n.is_finite().then_some(n)
}
