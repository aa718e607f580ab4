// src/main.rs
//! Token Risk Detector server entry point
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use token_risk_detector::api::server::RiskServer;
use token_risk_detector::config::AppConfig;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Parser)]
#[command(name = "risk_server")]
#[command(about = "Token risk detection server")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Args {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server (default)
    Serve {
        /// Port to bind, overrides config and SERVER_PORT
        #[arg(long)]
        port: Option<u16>,
    },
    /// Print the effective configuration with secrets redacted
    CheckConfig,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    init_logging()?;

    let mut config = AppConfig::load().context("Failed to load configuration")?;

    match args.command.unwrap_or(Commands::Serve { port: None }) {
        Commands::CheckConfig => {
            let rendered = toml::to_string_pretty(&config.redacted())
                .context("Failed to render configuration")?;
            println!("{}", rendered);
        }
        Commands::Serve { port } => {
            if let Some(port) = port {
                config.server.port = port;
            }
            info!("Starting Token Risk Detector v{}", env!("CARGO_PKG_VERSION"));
            info!(
                ttl_hours = config.cache.ttl_hours,
                fraud_threshold = config.detection.fraud_threshold,
                remote_classifier = config.classifier.remote_enabled(),
                "configuration loaded"
            );

            let server = RiskServer::new(&config).await.context("Failed to initialize server")?;
            server.start().await?;
        }
    }

    Ok(())
}

fn init_logging() -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,hyper=info,h2=info"));

    let subscriber = FmtSubscriber::builder().with_env_filter(filter).finish();

    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}
