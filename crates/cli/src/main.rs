use anyhow::Context;
use carsignal_core::domain::contract::RawPredictionResponse;
use carsignal_core::domain::decision::DecisionView;
use carsignal_core::normalize::normalize;
use carsignal_core::predict::error::user_message;
use carsignal_core::predict::http::HttpPredictionClient;
use carsignal_core::predict::{Condition, PredictionParams, DEFAULT_MILEAGE, DEFAULT_REGION};
use carsignal_core::present::{self, ConfidenceTier, SignalStyle};
use carsignal_core::report::{analyze, AnalysisReport};
use carsignal_core::scenario::{self, ScenarioResult};
use clap::{Args as ClapArgs, Parser, Subcommand};
use std::fmt::Write as _;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(name = "carsignal")]
struct Args {
    /// Print JSON instead of the text summary.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Normalize a saved prediction response file.
    Normalize {
        #[arg(long)]
        file: PathBuf,
    },
    /// Run a live analysis against the prediction backend.
    Analyze {
        #[command(flatten)]
        vehicle: VehicleArgs,
        #[arg(long)]
        scenario: Option<String>,
    },
    /// Analyze one of the built-in demo vehicles.
    Demo {
        key: String,
        #[arg(long)]
        scenario: Option<String>,
    },
    /// Apply a macro scenario to a baseline 90-day forecast.
    Simulate {
        #[arg(long, allow_hyphen_values = true)]
        base_percent: f64,
        #[arg(long)]
        price: Option<f64>,
        #[arg(long)]
        scenario: Option<String>,
    },
}

#[derive(Debug, ClapArgs)]
struct VehicleArgs {
    #[arg(long)]
    make: String,
    #[arg(long)]
    model: String,
    #[arg(long)]
    year: i32,
    #[arg(long, default_value_t = DEFAULT_MILEAGE)]
    mileage: u32,
    /// excellent, good, fair or salvage.
    #[arg(long, default_value = "good")]
    condition: String,
    #[arg(long, default_value = DEFAULT_REGION)]
    region: String,
}

impl VehicleArgs {
    fn into_params(self) -> anyhow::Result<PredictionParams> {
        Ok(PredictionParams {
            make: self.make,
            model: self.model,
            year: self.year,
            mileage: self.mileage,
            condition: self.condition.parse::<Condition>()?,
            region: self.region,
        })
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    let settings = match carsignal_core::config::Settings::from_env() {
        Ok(s) => s,
        Err(e) => {
            eprintln!("error: {e:#}");
            return ExitCode::FAILURE;
        }
    };
    let _sentry_guard = init_sentry(&settings);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(sentry_tracing::layer())
        .init();

    let args = Args::parse();

    match run(args, &settings).await {
        Ok(output) => {
            println!("{output}");
            ExitCode::SUCCESS
        }
        Err(err) => {
            sentry_anyhow::capture_anyhow(&err);
            tracing::debug!(error = ?err, "command failed");
            eprintln!("error: {}", user_message(&err));
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args, settings: &carsignal_core::config::Settings) -> anyhow::Result<String> {
    match args.command {
        Command::Normalize { file } => {
            let text = std::fs::read_to_string(&file)
                .with_context(|| format!("failed to read {}", file.display()))?;
            let view = normalize(&RawPredictionResponse::from_json_str(&text)?);
            if args.json {
                return Ok(serde_json::to_string_pretty(&view)?);
            }
            Ok(render_view(&view))
        }
        Command::Analyze { vehicle, scenario } => {
            let params = vehicle.into_params()?;
            let client = HttpPredictionClient::from_settings(settings)?;
            let report = analyze(&client, &params).await?;
            render_report(&report, scenario.as_deref(), args.json)
        }
        Command::Demo { key, scenario } => {
            let demo = carsignal_core::demo::find_demo(&key)
                .with_context(|| format!("unknown demo: {key}"))?;
            let client = HttpPredictionClient::from_settings(settings)?;
            let report = analyze(&client, &demo.params()).await?;
            render_report(&report, scenario.as_deref(), args.json)
        }
        Command::Simulate {
            base_percent,
            price,
            scenario: key,
        } => {
            let result = scenario::simulate(base_percent, price, key.as_deref());
            if args.json {
                return Ok(serde_json::to_string_pretty(&result)?);
            }
            Ok(render_scenario(key.as_deref(), &result))
        }
    }
}

fn render_report(
    report: &AnalysisReport,
    scenario_key: Option<&str>,
    json: bool,
) -> anyhow::Result<String> {
    let view = &report.view;
    let result = scenario::simulate(
        view.change_90d.unwrap_or(0.0),
        view.projected_price,
        scenario_key,
    );

    if json {
        let out = serde_json::json!({
            "report": report,
            "scenario": scenario_key,
            "scenario_result": result,
        });
        return Ok(serde_json::to_string_pretty(&out)?);
    }

    let mut out = render_view(view);
    out.push('\n');
    out.push_str(&render_scenario(scenario_key, &result));
    Ok(out)
}

fn render_view(view: &DecisionView) -> String {
    let mut out = String::new();
    let style = SignalStyle::for_recommendation(view.recommendation);

    if let Some(name) = &view.vehicle_name {
        let _ = writeln!(out, "{name}");
    }
    let _ = writeln!(out, "{} ({})", view.recommendation, style.label);
    let _ = write!(
        out,
        "confidence {}% ({:?}), volatility {:?}",
        view.confidence_score,
        ConfidenceTier::from_score(view.confidence_score),
        view.volatility
    );
    if let Some(risk) = view.risk_score {
        let _ = write!(out, ", risk {risk}/100");
    }
    out.push('\n');

    if let Some(price) = view.projected_price {
        let _ = write!(out, "90-day forecast {}", present::format_price(price));
        if let Some(chg) = view.change_90d {
            let _ = write!(out, " ({})", present::format_signed_percent(chg));
        }
        out.push('\n');
    }
    if let Some(range) = view.uncertainty_range {
        let _ = writeln!(
            out,
            "range {} - {}",
            present::format_price(range.low),
            present::format_price(range.high)
        );
    }

    for line in view.reasoning_lines() {
        let _ = writeln!(out, "- {line}");
    }
    if let Some(insight) = &view.llm_key_insight {
        let _ = writeln!(out, "insight: {insight}");
    }

    for entry in &view.agent_log {
        let _ = write!(out, "[{:?}] {}: {}", entry.status, entry.agent, entry.message);
        let preview = present::agent_output_preview(entry);
        if !preview.is_empty() {
            let pairs: Vec<_> = preview.iter().map(|(k, v)| format!("{k}: {v}")).collect();
            let _ = write!(out, " ({})", pairs.join(", "));
        }
        out.push('\n');
    }

    out.trim_end().to_string()
}

fn render_scenario(key: Option<&str>, result: &ScenarioResult) -> String {
    let heading = key
        .and_then(scenario::find)
        .map(|s| format!("Under: {}", s.label))
        .unwrap_or_else(|| "Base forecast".to_string());
    let price = result
        .adjusted_price
        .map(present::format_price)
        .unwrap_or_else(|| "—".to_string());
    format!(
        "{heading}: {price} ({})",
        present::format_signed_percent(result.adjusted_change_percent)
    )
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
