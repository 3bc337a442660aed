use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use smartspend_ai::config::Config;
use smartspend_ai::intent::{AttendanceDomain, IntentExtractor, PerformanceDomain};
use smartspend_ai::llm::{OllamaClient, OpenAiClient, TextGenerator};
use smartspend_ai::metrics;
use smartspend_ai::server::Server;
use smartspend_ai::services::ReceiptService;

#[derive(Parser)]
#[command(
    name = "smartspend-ai",
    version,
    about = "AI server for attendance and performance questions, receipt OCR and expense review",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// TOML configuration file (defaults to environment variables)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Log format (text, json); overrides the configured format
    #[arg(long, global = true)]
    log_format: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP server
    Serve {
        /// Bind address
        #[arg(long)]
        host: Option<String>,

        /// Bind port
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Print the intent extracted from a question
    Intent {
        /// The question, in Korean
        question: String,

        /// Which question family to parse
        #[arg(short, long, value_enum, default_value_t = Domain::Attendance)]
        domain: Domain,
    },

    /// Run receipt OCR on a local image
    Receipt {
        /// Image file (JPEG, PNG)
        path: PathBuf,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Domain {
    Attendance,
    Performance,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::from_file(path)
            .with_context(|| format!("loading configuration from {}", path.display()))?,
        None => Config::from_env(),
    };

    let log_format = cli.log_format.as_deref().unwrap_or(&config.logging.format);
    setup_tracing(log_format, &config.logging.level, cli.verbose)?;

    tracing::info!("SmartSpend AI starting");

    match cli.command {
        Commands::Serve { host, port } => {
            tracing::info!(host = ?host, port = ?port, "Starting serve command");
            serve(config, host, port).await?;
        }
        Commands::Intent { question, domain } => {
            tracing::info!(question = %question, domain = ?domain, "Starting intent command");
            intent(&config, &question, domain).await?;
        }
        Commands::Receipt { path } => {
            tracing::info!(path = %path.display(), "Starting receipt command");
            receipt(&config, &path).await?;
        }
    }

    Ok(())
}

fn setup_tracing(format: &str, level: &str, verbose: bool) -> Result<()> {
    let env_filter = if verbose {
        tracing_subscriber::EnvFilter::new("smartspend_ai=debug,tower_http=debug,info")
    } else {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(format!("smartspend_ai={level},warn")))
    };

    match format {
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer())
                .init();
        }
    }

    Ok(())
}

async fn serve(mut config: Config, host: Option<String>, port: Option<u16>) -> Result<()> {
    if let Some(host) = host {
        config.server.host = host;
    }
    if let Some(port) = port {
        config.server.port = port;
    }

    if let Err(e) = metrics::init_metrics() {
        tracing::warn!(error = %e, "Metrics disabled");
    }

    let server = Server::new(config).context("building server")?;
    server
        .start_with_shutdown(async {
            match tokio::signal::ctrl_c().await {
                Ok(()) => tracing::info!("Shutdown signal received"),
                Err(e) => tracing::error!("Failed to wait for Ctrl+C: {}", e),
            }
        })
        .await?;

    Ok(())
}

async fn intent(config: &Config, question: &str, domain: Domain) -> Result<()> {
    let ollama: Arc<dyn TextGenerator> = Arc::new(OllamaClient::with_config(config.ollama.clone())?);

    let json = match domain {
        Domain::Attendance => {
            let extractor = IntentExtractor::new(ollama, AttendanceDomain);
            serde_json::to_string_pretty(&extractor.extract(question).await)?
        }
        Domain::Performance => {
            let extractor = IntentExtractor::new(ollama, PerformanceDomain);
            serde_json::to_string_pretty(&extractor.extract(question).await)?
        }
    };

    println!("{json}");
    Ok(())
}

async fn receipt(config: &Config, path: &Path) -> Result<()> {
    let image = tokio::fs::read(path)
        .await
        .with_context(|| format!("reading {}", path.display()))?;

    let service = ReceiptService::new(OpenAiClient::with_config(config.openai.clone())?);
    let outcome = service.analyze(image).await;

    println!("{}", serde_json::to_string_pretty(&outcome)?);
    Ok(())
}
