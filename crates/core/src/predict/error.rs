use serde_json::Value;
use std::fmt;

const GENERIC_MESSAGE: &str = "Prediction request failed";
const DECODE_MESSAGE: &str = "Prediction response was not valid JSON";

/// Failure of the upstream prediction call, the only error the dashboard shows.
#[derive(Debug, Clone)]
pub struct PredictionError {
    pub stage: &'static str,
    pub status: Option<u16>,
    /// Human-readable text for display.
    pub message: String,
    pub raw_body: Option<String>,
}

impl PredictionError {
    pub fn transport(err: &reqwest::Error) -> Self {
        Self {
            stage: "transport",
            status: None,
            message: err.to_string(),
            raw_body: None,
        }
    }

    pub fn http(status: u16, body: String) -> Self {
        let parsed = serde_json::from_str::<Value>(&body).ok();
        let message = parsed
            .as_ref()
            .and_then(message_from_body)
            .unwrap_or_else(|| format!("{GENERIC_MESSAGE} (HTTP {status})"));
        Self {
            stage: "http",
            status: Some(status),
            message,
            raw_body: Some(body),
        }
    }

    /// The body is kept for diagnostics only; it can be an arbitrary HTML page.
    pub fn decode(body: String) -> Self {
        Self {
            stage: "decode",
            status: None,
            message: DECODE_MESSAGE.to_string(),
            raw_body: Some(body),
        }
    }
}

impl fmt::Display for PredictionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.status {
            Some(status) => write!(
                f,
                "prediction error (stage={}, status={status}): {}",
                self.stage, self.message
            ),
            None => write!(f, "prediction error (stage={}): {}", self.stage, self.message),
        }
    }
}

impl std::error::Error for PredictionError {}

/// `detail`, else `error`; structured values are rendered as compact JSON.
pub fn message_from_body(body: &Value) -> Option<String> {
    ["detail", "error"].iter().find_map(|key| {
        match body.get(*key)? {
            Value::Null => None,
            Value::String(s) if s.trim().is_empty() => None,
            Value::String(s) => Some(s.trim().to_string()),
            other => Some(other.to_string()),
        }
    })
}

/// The single line shown to the user for a failed analysis.
pub fn user_message(err: &anyhow::Error) -> String {
    match err.downcast_ref::<PredictionError>() {
        Some(prediction) => prediction.message.clone(),
        None => format!("{err:#}"),
    }
}
