use crate::config::Settings;
use crate::domain::contract::RawPredictionResponse;
use crate::predict::error::PredictionError;
use crate::predict::{PredictionClient, PredictionParams};
use anyhow::{Context, Result};
use reqwest::header::{HeaderMap, HeaderValue};
use std::time::Duration;

/// JSON-over-HTTP prediction backend.
///
/// Failures are returned as-is; the user re-triggers the analysis.
#[derive(Debug, Clone)]
pub struct HttpPredictionClient {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    path: String,
}

impl HttpPredictionClient {
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let base_url = settings.require_prediction_base_url()?.to_string();

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.prediction_timeout_secs))
            .build()
            .context("failed to build prediction http client")?;

        Ok(Self {
            http,
            base_url,
            api_key: settings.prediction_api_key.clone(),
            path: settings.prediction_path.clone(),
        })
    }

    fn url(&self) -> String {
        let path = if self.path.starts_with('/') {
            self.path.clone()
        } else {
            format!("/{}", self.path)
        };

        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }

    fn headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        if let Some(api_key) = &self.api_key {
            headers.insert("x-api-key", HeaderValue::from_str(api_key)?);
        }
        Ok(headers)
    }
}

#[async_trait::async_trait]
impl PredictionClient for HttpPredictionClient {
    fn backend_name(&self) -> &'static str {
        "http_json"
    }

    async fn get_prediction(&self, params: &PredictionParams) -> Result<RawPredictionResponse> {
        let url = self.url();
        let started = std::time::Instant::now();
        let res = self
            .http
            .post(&url)
            .headers(self.headers()?)
            .json(params)
            .send()
            .await
            .map_err(|e| PredictionError::transport(&e))?;

        let status = res.status();
        let text = res
            .text()
            .await
            .map_err(|e| PredictionError::transport(&e))?;

        tracing::info!(
            %url,
            status = status.as_u16(),
            make = %params.make,
            model = %params.model,
            year = params.year,
            elapsed_ms = started.elapsed().as_millis(),
            "prediction request finished"
        );

        if !status.is_success() {
            return Err(PredictionError::http(status.as_u16(), text).into());
        }

        RawPredictionResponse::from_json_str(&text).map_err(|e| {
            tracing::warn!(%url, error = %format!("{e:#}"), "prediction response did not decode");
            PredictionError::decode(text).into()
        })
    }
}
