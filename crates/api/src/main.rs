use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use carsignal_core::catalog::{self, CatalogTree};
use carsignal_core::demo::{self, DemoVehicle};
use carsignal_core::domain::contract::RawPredictionResponse;
use carsignal_core::domain::decision::DecisionView;
use carsignal_core::normalize::normalize;
use carsignal_core::predict::error::{user_message, PredictionError};
use carsignal_core::predict::http::HttpPredictionClient;
use carsignal_core::predict::{PredictionClient, PredictionParams};
use carsignal_core::report::{analyze, AnalysisReport};
use carsignal_core::scenario::{self, ScenarioDefinition, ScenarioResult};
use carsignal_core::session::{ResultSlot, SlotState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = carsignal_core::config::Settings::from_env()?;
    let _sentry_guard = init_sentry(&settings);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_tracing::layer())
        .init();

    let client: Option<Arc<dyn PredictionClient>> =
        match HttpPredictionClient::from_settings(&settings) {
            Ok(client) => Some(Arc::new(client)),
            Err(e) => {
                sentry_anyhow::capture_anyhow(&e);
                tracing::error!(error = %e, "prediction backend unavailable; starting API in degraded mode");
                None
            }
        };

    let app = router(AppState::new(client));

    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], settings.port));

    tracing::info!(%addr, "api listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

fn router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/scenarios", get(get_scenarios))
        .route("/catalog", get(get_catalog))
        .route("/demos", get(get_demos))
        .route("/analyze", post(post_analyze))
        .route("/analyze/demo/:key", post(post_analyze_demo))
        .route("/analysis/latest", get(get_latest_analysis))
        .route("/normalize", post(post_normalize))
        .route("/simulate", post(post_simulate))
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

async fn healthz() -> &'static str {
    "ok"
}

#[derive(Clone)]
struct AppState {
    client: Option<Arc<dyn PredictionClient>>,
    slot: Arc<ResultSlot>,
}

impl AppState {
    fn new(client: Option<Arc<dyn PredictionClient>>) -> Self {
        Self {
            client,
            slot: Arc::new(ResultSlot::new()),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct ErrorBody {
    error: String,
}

type ApiError = (StatusCode, Json<ErrorBody>);

fn api_error(status: StatusCode, message: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorBody {
            error: message.into(),
        }),
    )
}

async fn get_scenarios() -> Json<&'static [ScenarioDefinition]> {
    Json(scenario::catalog())
}

async fn get_catalog() -> Json<CatalogTree> {
    Json(catalog::tree())
}

async fn get_demos() -> Json<&'static [DemoVehicle]> {
    Json(demo::demos())
}

async fn post_analyze(
    State(state): State<AppState>,
    Json(params): Json<PredictionParams>,
) -> Result<Json<AnalysisReport>, ApiError> {
    run_analysis(&state, params).await
}

async fn post_analyze_demo(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<AnalysisReport>, ApiError> {
    let demo = demo::find_demo(&key)
        .ok_or_else(|| api_error(StatusCode::NOT_FOUND, format!("unknown demo: {key}")))?;
    run_analysis(&state, demo.params()).await
}

async fn run_analysis(
    state: &AppState,
    params: PredictionParams,
) -> Result<Json<AnalysisReport>, ApiError> {
    // A rejected form is a 400 and must not take a ticket or replace the latest result.
    params
        .validate()
        .map_err(|e| api_error(StatusCode::BAD_REQUEST, format!("{e:#}")))?;

    let Some(client) = &state.client else {
        return Err(api_error(
            StatusCode::SERVICE_UNAVAILABLE,
            "prediction backend is not configured",
        ));
    };

    let ticket = state.slot.begin();
    match analyze(client.as_ref(), &params).await {
        Ok(report) => {
            state
                .slot
                .complete(ticket, SlotState::Ready { report: report.clone() })
                .await;
            Ok(Json(report))
        }
        Err(err) => {
            let message = user_message(&err);
            if err.downcast_ref::<PredictionError>().is_none() {
                sentry_anyhow::capture_anyhow(&err);
            }
            tracing::warn!(
                seq = ticket.seq(),
                make = %params.make,
                model = %params.model,
                error = %err,
                "analysis failed"
            );
            state
                .slot
                .complete(ticket, SlotState::Failed { error: message.clone() })
                .await;
            Err(api_error(StatusCode::BAD_GATEWAY, message))
        }
    }
}

async fn get_latest_analysis(
    State(state): State<AppState>,
) -> Result<Json<AnalysisReport>, ApiError> {
    match state.slot.current().await {
        SlotState::Ready { report } => Ok(Json(report)),
        SlotState::Failed { error } => Err(api_error(StatusCode::BAD_GATEWAY, error)),
        SlotState::Idle => Err(api_error(StatusCode::NOT_FOUND, "no analysis yet")),
    }
}

async fn post_normalize(Json(raw): Json<RawPredictionResponse>) -> Json<DecisionView> {
    Json(normalize(&raw))
}

#[derive(Debug, Deserialize)]
struct SimulateRequest {
    base_percent: f64,
    #[serde(default)]
    base_projected_price: Option<f64>,
    #[serde(default)]
    scenario: Option<String>,
}

async fn post_simulate(Json(req): Json<SimulateRequest>) -> Json<ScenarioResult> {
    Json(scenario::simulate(
        req.base_percent,
        req.base_projected_price,
        req.scenario.as_deref(),
    ))
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}

fn init_sentry(settings: &carsignal_core::config::Settings) -> Option<sentry::ClientInitGuard> {
    let dsn = settings.sentry_dsn.as_deref()?;
    Some(sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            ..Default::default()
        },
    )))
}
