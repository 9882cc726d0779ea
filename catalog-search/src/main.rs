use std::process::ExitCode;

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use catalog_search::commands::{self, Command};
use catalog_search::{AppError, Backend, Dependencies, LogFormat, Settings};

#[derive(Parser)]
#[command(name = "catalog-search")]
#[command(about = "Faceted product search over OpenSearch", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Document store to use
    #[arg(long, value_enum, default_value = "opensearch", global = true)]
    backend: Backend,

    /// OpenSearch URL (overrides OPENSEARCH_URL)
    #[arg(long, global = true)]
    opensearch_url: Option<String>,

    /// Link groups, products and properties (overrides CATALOG_PARENT_RELATIONSHIP)
    #[arg(long, global = true)]
    parent_relationship: bool,
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    match format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Text => builder.init(),
    }
}

async fn run(cli: Cli, mut settings: Settings) -> Result<(), AppError> {
    if let Some(url) = cli.opensearch_url {
        settings.opensearch_url = url;
    }
    if cli.parent_relationship {
        settings.parent_relationship = true;
    }

    let dependencies = Dependencies::new(settings, cli.backend).await?;
    let output = commands::run(&dependencies, &cli.command).await?;

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let settings = match Settings::from_env() {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    init_tracing(settings.log_format);
    info!(backend = ?cli.backend, "Starting catalog search");

    match run(cli, settings).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "Command failed");
            ExitCode::FAILURE
        }
    }
}
