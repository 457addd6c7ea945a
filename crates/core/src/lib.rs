pub mod catalog;
pub mod demo;
pub mod domain;
pub mod normalize;
pub mod predict;
pub mod present;
pub mod report;
pub mod scenario;
pub mod session;

pub mod config {
    use anyhow::Context;

    const DEFAULT_PREDICTION_PATH: &str = "/predict";
    const DEFAULT_PREDICTION_TIMEOUT_SECS: u64 = 60;
    const DEFAULT_PORT: u16 = 3000;

    #[derive(Debug, Clone)]
    pub struct Settings {
        pub prediction_api_base_url: Option<String>,
        pub prediction_api_key: Option<String>,
        pub prediction_path: String,
        pub prediction_timeout_secs: u64,
        pub sentry_dsn: Option<String>,
        pub port: u16,
    }

    impl Settings {
        pub fn from_env() -> anyhow::Result<Self> {
            Ok(Self {
                prediction_api_base_url: non_empty_var("PREDICTION_API_BASE_URL"),
                prediction_api_key: non_empty_var("PREDICTION_API_KEY"),
                prediction_path: non_empty_var("PREDICTION_PATH")
                    .unwrap_or_else(|| DEFAULT_PREDICTION_PATH.to_string()),
                prediction_timeout_secs: std::env::var("PREDICTION_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse::<u64>().ok())
                    .unwrap_or(DEFAULT_PREDICTION_TIMEOUT_SECS),
                sentry_dsn: non_empty_var("SENTRY_DSN"),
                port: std::env::var("PORT")
                    .ok()
                    .and_then(|s| s.parse::<u16>().ok())
                    .unwrap_or(DEFAULT_PORT),
            })
        }

        pub fn require_prediction_base_url(&self) -> anyhow::Result<&str> {
            self.prediction_api_base_url
                .as_deref()
                .context("PREDICTION_API_BASE_URL is required")
        }
    }

    impl Default for Settings {
        fn default() -> Self {
            Self {
                prediction_api_base_url: None,
                prediction_api_key: None,
                prediction_path: DEFAULT_PREDICTION_PATH.to_string(),
                prediction_timeout_secs: DEFAULT_PREDICTION_TIMEOUT_SECS,
                sentry_dsn: None,
                port: DEFAULT_PORT,
            }
        }
    }

    fn non_empty_var(key: &str) -> Option<String> {
        std::env::var(key)
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    }

}
