use alert_relay::{config::AppConfig, supervisor::Supervisor};
use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Directory containing the optional `app.yaml`.
    #[arg(long, global = true, default_value = "configs")]
    config_dir: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Runs the alert ingestion server.
    Run,
    /// Prints the resolved configuration with secrets masked.
    CheckConfig,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing subscriber
    let subscriber =
        FmtSubscriber::builder().with_env_filter(EnvFilter::from_default_env()).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let cli = Cli::parse();

    tracing::debug!(config_dir = %cli.config_dir, "Loading application configuration...");
    let config = AppConfig::new(Some(cli.config_dir.as_str()))?;

    match cli.command {
        Commands::Run => run(config).await?,
        Commands::CheckConfig => {
            println!("{}", serde_json::to_string_pretty(&config.redacted())?)
        }
    }

    Ok(())
}

async fn run(config: AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    tracing::debug!(
        listen_address = %config.listen_address,
        threshold = config.threshold,
        shared_store = config.database_url.is_some(),
        "Configuration loaded."
    );

    let supervisor = Supervisor::from_config(config).await?;
    tracing::info!("Supervisor initialized, accepting telemetry events...");
    supervisor.run().await?;

    Ok(())
}
