use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use triage_agents::TriageAgent;
use triage_core::{
    classify_heuristic, taxonomy, Classification, EmergencyReport, GeoPoint, TriageError,
    CALL_911_NOTICE,
};
use triage_observability::{init_tracing, AppMetrics};
use triage_providers::{
    build_http_client, CompletionClient, FoursquareConfig, FoursquarePlacesClient,
    OpenAiCompletionClient, OpenAiConfig, PlaceSearchClient,
};

const EXIT_SEARCH_FAILED: u8 = 2;
const EXIT_INVALID_REPORT: u8 = 64;

#[derive(Debug, Parser)]
#[command(name = "triage")]
#[command(about = "Emergency triage and nearby service ranking")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Keyword classification only; no network access.
    Classify { text: String },
    /// Classify, search nearby services and rank them.
    Run {
        #[arg(long)]
        text: String,
        #[arg(long, requires = "lon", allow_hyphen_values = true)]
        lat: Option<f64>,
        #[arg(long, requires = "lat", allow_hyphen_values = true)]
        lon: Option<f64>,
        #[command(flatten)]
        providers: ProviderArgs,
    },
    /// Print the category taxonomy.
    Taxonomy,
}

#[derive(Debug, clap::Args)]
struct ProviderArgs {
    #[arg(long, env = "TRIAGE_OPENAI_API_KEY", hide_env_values = true)]
    openai_api_key: Option<String>,
    #[arg(long, env = "TRIAGE_OPENAI_MODEL")]
    openai_model: Option<String>,
    #[arg(long, env = "TRIAGE_OPENAI_BASE_URL")]
    openai_base_url: Option<String>,
    #[arg(long, env = "TRIAGE_FOURSQUARE_API_KEY", hide_env_values = true)]
    foursquare_api_key: Option<String>,
    #[arg(long, env = "TRIAGE_FOURSQUARE_BASE_URL")]
    foursquare_base_url: Option<String>,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    init_tracing("triage_cli");
    let cli = Cli::parse();

    match cli.command {
        Command::Classify { text } => match classify_offline(&text) {
            Ok(classification) => {
                println!("{}", serde_json::to_string_pretty(&classification)?);
            }
            Err(error) => return report_failure(error),
        },
        Command::Run {
            text,
            lat,
            lon,
            providers,
        } => {
            let location = lat
                .zip(lon)
                .map(|(latitude, longitude)| GeoPoint {
                    latitude,
                    longitude,
                });
            let agent = build_agent(providers)?;

            match agent.triage(&text, location).await {
                Ok(outcome) => {
                    println!("{}", serde_json::to_string_pretty(&outcome)?);
                    if outcome.is_failed() {
                        return Ok(ExitCode::from(EXIT_SEARCH_FAILED));
                    }
                }
                Err(error) => return report_failure(error),
            }
        }
        Command::Taxonomy => {
            let entries = taxonomy::profiles().collect::<Vec<_>>();
            println!("{}", serde_json::to_string_pretty(&entries)?);
        }
    }

    Ok(ExitCode::SUCCESS)
}

fn build_agent(args: ProviderArgs) -> Result<TriageAgent> {
    let http = build_http_client().context("failed to build HTTP client")?;

    let completion = args
        .openai_api_key
        .map(|key| {
            OpenAiConfig::new(key, args.openai_model, args.openai_base_url.as_deref())
                .context("invalid OpenAI configuration")
        })
        .transpose()?
        .map(|config| {
            Arc::new(OpenAiCompletionClient::new(http.clone(), config)) as Arc<dyn CompletionClient>
        });

    let place_search = args
        .foursquare_api_key
        .map(|key| {
            FoursquareConfig::new(key, args.foursquare_base_url.as_deref())
                .context("invalid Foursquare configuration")
        })
        .transpose()?
        .map(|config| {
            Arc::new(FoursquarePlacesClient::new(http.clone(), config))
                as Arc<dyn PlaceSearchClient>
        });

    Ok(TriageAgent::new(completion, place_search, AppMetrics::shared()))
}

/// Keyword classification with the same report validation as `run`.
fn classify_offline(text: &str) -> Result<Classification, TriageError> {
    let report = EmergencyReport::new(text, None)?;
    Ok(classify_heuristic(report.text()))
}

fn report_failure(error: TriageError) -> Result<ExitCode> {
    match error {
        TriageError::InvalidReport(_) => {
            eprintln!("{error}. {CALL_911_NOTICE}");
            Ok(ExitCode::from(EXIT_INVALID_REPORT))
        }
        other => Err(other.into()),
    }
}
