mod args;
mod display;

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use futures::StreamExt;
use serde::Serialize;
use severity_client::config::{DEFAULT_BASE_URL, DEFAULT_WS_URL};
use severity_client::{
    ClientConfig, ClientError, FileCredentials, PredictionClient, Session, SessionEvent,
    DEFAULT_TREND_PERIOD,
};
use severity_core::{ChartType, ExplorationRequest};
use tokio::sync::broadcast;

use crate::args::{ScenarioArgs, ScenarioInput, ScenarioInputs};

#[derive(Parser)]
#[command(name = "severity", version, about = "Accident-severity prediction client")]
struct Cli {
    /// API root of the prediction service.
    #[arg(long, global = true, env = "SEVERITY_API_URL", default_value = DEFAULT_BASE_URL)]
    api_url: String,

    /// Streaming endpoint for `watch`.
    #[arg(long, global = true, env = "SEVERITY_WS_URL", default_value = DEFAULT_WS_URL)]
    ws_url: String,

    /// Per-call timeout in seconds.
    #[arg(long, global = true, env = "SEVERITY_TIMEOUT_SECS", default_value_t = 30)]
    timeout: u64,

    /// Credentials file (defaults to ~/.config/severity/credentials.json).
    #[arg(long, global = true, env = "SEVERITY_CREDENTIALS")]
    credentials: Option<PathBuf>,

    /// Print raw JSON instead of cards.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Predict the severity of one scenario.
    Predict(ScenarioArgs),
    /// Predict every scenario in a JSON array file.
    Batch {
        #[arg(long)]
        file: PathBuf,
    },
    /// Service and model health.
    Health,
    /// Current model performance metrics.
    Metrics,
    /// Queue a model retrain.
    Retrain,
    /// Explore one dataset feature.
    Explore {
        #[arg(long)]
        feature: String,
        #[arg(long, default_value = "histogram")]
        chart_type: ChartType,
        /// JSON object of filters.
        #[arg(long)]
        filters: Option<String>,
    },
    /// Dataset summary statistics.
    Summary,
    /// Accident trends.
    Trends {
        #[arg(long, default_value = DEFAULT_TREND_PERIOD)]
        period: String,
    },
    /// Risk-factor analysis.
    RiskFactors,
    /// Geographical analysis.
    Geographical,
    /// Follow live prediction events until interrupted.
    Watch,
    /// Store a bearer token for subsequent calls.
    Login {
        #[arg(long, env = "SEVERITY_TOKEN", hide_env_values = true)]
        token: String,
    },
    /// Forget the stored token.
    Logout,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();
    tracing::info!("severity v{}", env!("CARGO_PKG_VERSION"));

    let cli = Cli::parse();
    if cli.timeout == 0 {
        bail!("--timeout must be at least 1 second");
    }

    let credentials = cli.credentials.clone().unwrap_or_else(default_credentials_path);
    let session = Session::new(FileCredentials::new(&credentials));
    let mut events = session.subscribe();

    let config = ClientConfig {
        ws_url: cli.ws_url.clone(),
        timeout: Duration::from_secs(cli.timeout),
        ..ClientConfig::default()
    }
    .with_base_url(&cli.api_url);
    let client = PredictionClient::new(config, session.clone()).context("building client")?;

    let outcome = run(&cli, &client, &session).await;
    report_session_events(&mut events);

    match outcome {
        Err(e) if e.downcast_ref::<ClientError>().is_some_and(ClientError::is_unauthorized) => {
            bail!("not authorised; log in again with `severity login --token <TOKEN>`")
        }
        other => other,
    }
}

async fn run(cli: &Cli, client: &PredictionClient, session: &Session) -> anyhow::Result<()> {
    match &cli.command {
        Command::Predict(scenario_args) => {
            let scenario = match scenario_args.resolve()? {
                ScenarioInput::Ready(s) => s,
                ScenarioInput::Invalid(errors) => {
                    display::print_field_errors(&errors);
                    bail!("scenario rejected before submission");
                }
            };
            let result = client.predict(&scenario).await?;
            emit(cli.json, &result, display::print_prediction_card)?;
        }
        Command::Batch { file } => {
            let scenarios = match args::read_batch(file)? {
                ScenarioInputs::Ready(s) => s,
                ScenarioInputs::Invalid(errors) => {
                    display::print_field_errors(&errors);
                    bail!("batch rejected before submission");
                }
            };
            let outcome = client.predict_batch(&scenarios).await?;
            if cli.json {
                print_json(&outcome.results)?;
            } else {
                display::print_batch(&outcome);
            }
        }
        Command::Health => emit(cli.json, &client.health().await?, display::print_health)?,
        Command::Metrics => emit(
            cli.json,
            &client.model_performance().await?,
            display::print_metrics,
        )?,
        Command::Retrain => emit(
            cli.json,
            &client.retrain_model().await?,
            display::print_retrain,
        )?,
        Command::Explore {
            feature,
            chart_type,
            filters,
        } => {
            let filters: Option<serde_json::Map<String, serde_json::Value>> = filters
                .as_deref()
                .map(serde_json::from_str)
                .transpose()
                .context("--filters must be a JSON object")?;
            let request = ExplorationRequest {
                feature: feature.clone(),
                chart_type: *chart_type,
                filters,
            };
            let resp = client.explore_data(&request).await?;
            emit(cli.json, &resp, display::print_exploration)?;
        }
        Command::Summary => print_json(&client.data_summary().await?)?,
        Command::Trends { period } => print_json(&client.accident_trends(period).await?)?,
        Command::RiskFactors => print_json(&client.risk_factor_analysis().await?)?,
        Command::Geographical => print_json(&client.geographical_analysis().await?)?,
        Command::Watch => watch(client).await?,
        Command::Login { token } => {
            session.log_in(token).context("storing credential")?;
            println!("Credential stored.");
        }
        Command::Logout => {
            session.log_out().context("clearing credential")?;
            println!("Credential cleared.");
        }
    }
    Ok(())
}

async fn watch(client: &PredictionClient) -> anyhow::Result<()> {
    let mut stream = client
        .subscribe()
        .await
        .with_context(|| format!("connecting to {}", client.config().ws_url))?;
    eprintln!("Watching {} (Ctrl-C to stop)", client.config().ws_url);

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            next = stream.next() => match next {
                Some(Ok(message)) => {
                    println!(
                        "{} {}",
                        chrono::Utc::now().format("%H:%M:%S"),
                        display::stream_line(&message)
                    );
                }
                Some(Err(e)) => tracing::warn!(error = %e, "stream message skipped"),
                None => {
                    eprintln!("Stream closed by server.");
                    break;
                }
            },
        }
    }
    Ok(())
}

fn report_session_events(events: &mut broadcast::Receiver<SessionEvent>) {
    while let Ok(event) = events.try_recv() {
        match event {
            SessionEvent::CredentialCleared => eprintln!("Stored credential was rejected and removed."),
            SessionEvent::AuthExpired { login_path } => {
                eprintln!("Session expired; sign in again (login entry: {login_path}).")
            }
        }
    }
}

/// Print `value` as JSON under `--json`, else as a card.
fn emit<T: Serialize + ?Sized>(json: bool, value: &T, card: impl FnOnce(&T)) -> anyhow::Result<()> {
    if json {
        print_json(value)
    } else {
        card(value);
        Ok(())
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn default_credentials_path() -> PathBuf {
    match std::env::var_os("HOME") {
        Some(home) => PathBuf::from(home)
            .join(".config")
            .join("severity")
            .join("credentials.json"),
        None => PathBuf::from(".severity-credentials.json"),
    }
}
