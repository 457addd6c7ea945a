use crate::domain::contract::RawPredictionResponse;
use crate::domain::decision::DecisionView;
use crate::normalize::normalize;
use crate::predict::{PredictionClient, PredictionParams};
use crate::present::Presentation;
use crate::scenario::{self, ScenarioOutcome};
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// One displayed analysis: the normalized view plus the scenario table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisReport {
    pub request_id: Uuid,
    pub received_at: DateTime<Utc>,
    pub view: DecisionView,
    pub scenarios: Vec<ScenarioOutcome>,
    pub presentation: Presentation,
}

impl AnalysisReport {
    pub fn from_raw(raw: &RawPredictionResponse) -> Self {
        let view = normalize(raw);
        let scenarios = scenario::outlook(&view);
        let presentation = Presentation::for_view(&view);
        Self {
            request_id: Uuid::new_v4(),
            received_at: Utc::now(),
            view,
            scenarios,
            presentation,
        }
    }
}

/// Validates the form, calls the backend once and normalizes the answer.
///
/// Clients assume validated params; this is the check every caller goes through.
pub async fn analyze(
    client: &dyn PredictionClient,
    params: &PredictionParams,
) -> anyhow::Result<AnalysisReport> {
    params.validate()?;

    let raw = client.get_prediction(params).await?;
    let report = AnalysisReport::from_raw(&raw);

    tracing::info!(
        backend = client.backend_name(),
        request_id = %report.request_id,
        make = %params.make,
        model = %params.model,
        year = params.year,
        recommendation = %report.view.recommendation,
        confidence_score = report.view.confidence_score,
        "analysis complete"
    );

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::decision::Recommendation;
    use crate::predict::error::{user_message, PredictionError};
    use serde_json::{json, Value};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct StubClient {
        response: Result<Value, (u16, Value)>,
        calls: AtomicUsize,
    }

    impl StubClient {
        fn ok(value: Value) -> Self {
            Self {
                response: Ok(value),
                calls: AtomicUsize::new(0),
            }
        }

        fn failing(status: u16, body: Value) -> Self {
            Self {
                response: Err((status, body)),
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait::async_trait]
    impl PredictionClient for StubClient {
        fn backend_name(&self) -> &'static str {
            "stub"
        }

        async fn get_prediction(
            &self,
            _params: &PredictionParams,
        ) -> anyhow::Result<RawPredictionResponse> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match &self.response {
                Ok(v) => Ok(RawPredictionResponse::new(v.clone())),
                Err((status, body)) => {
                    Err(PredictionError::http(*status, body.to_string()).into())
                }
            }
        }
    }

    #[tokio::test]
    async fn analyze_builds_view_and_scenarios() {
        let client = StubClient::ok(json!({
            "final_recommendation": "BUY NOW",
            "confidence_score": 79,
            "predicted_90_day_change": 2.4,
            "projected_price": 22937.6,
        }));
        let report = analyze(&client, &PredictionParams::new("honda", "civic", 2020))
            .await
            .unwrap();
        assert_eq!(report.view.recommendation, Recommendation::BuyNow);
        assert_eq!(report.scenarios.len(), 4);
        assert_eq!(report.presentation.signal.label, "Strong Buy Signal");
        assert_eq!(client.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn analyze_surfaces_upstream_message_without_retry() {
        let client = StubClient::failing(503, json!({"error": "model warming up"}));
        let err = analyze(&client, &PredictionParams::new("honda", "civic", 2020))
            .await
            .unwrap_err();
        assert_eq!(user_message(&err), "model warming up");
        assert_eq!(client.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn analyze_rejects_incomplete_form_without_calling_backend() {
        let client = StubClient::ok(json!({}));
        let res = analyze(&client, &PredictionParams::new("honda", "", 2020)).await;
        assert!(res.is_err());
        assert_eq!(client.calls.load(Ordering::SeqCst), 0);
    }
}
