use std::net::SocketAddr;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio::signal;
use tracing::{error, info};

use conductor_core::{
    load_config, load_config_from_env, validate_config, Config, JobRegistry, JobState,
    PipelineController, PipelineTrigger, ProcessRunner,
};
use conductor_server::{api::create_router, logging::init_logging, state::AppState};

/// Application version
const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Debug, Parser)]
#[command(name = "conductor", version, about = "Staged pipeline orchestrator")]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(long, short, env = "CONDUCTOR_CONFIG", global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Start the HTTP server (default)
    Serve,
    /// Run the whole pipeline once in the foreground and print the job
    Run {
        /// Subject key, e.g. a ticker symbol
        #[arg(default_value = "AAPL")]
        symbol: String,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            error!("Fatal error: {:#}", e);
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<ExitCode> {
    let config = match cli.config {
        Some(ref path) => load_config(path)
            .with_context(|| format!("Failed to load config from {:?}", path))?,
        None => load_config_from_env().context("Failed to load configuration")?,
    };

    // Validate configuration
    validate_config(&config).context("Configuration validation failed")?;

    init_logging(&config.logging);

    info!(version = VERSION, "Configuration loaded successfully");
    info!(
        stages = config.pipeline.stages.len(),
        max_concurrency = config.pipeline.max_concurrency,
        settle_interval_ms = config.pipeline.settle_interval_ms,
        "Pipeline configured"
    );

    let controller = PipelineController::from_config(
        &config.pipeline,
        Arc::new(ProcessRunner::new()),
        JobRegistry::new(),
    );
    let trigger = PipelineTrigger::new(Arc::new(controller));

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => {
            serve(config, trigger).await?;
            Ok(ExitCode::SUCCESS)
        }
        Command::Run { symbol } => run_once(&trigger, &symbol).await,
    }
}

async fn serve(config: Config, trigger: PipelineTrigger) -> Result<()> {
    let addr = SocketAddr::new(config.server.host, config.server.port);

    // Create app state
    let state = Arc::new(AppState::new(config, trigger));

    // Create router
    let app = create_router(state);

    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    // Run server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shut down");
    Ok(())
}

async fn run_once(trigger: &PipelineTrigger, symbol: &str) -> Result<ExitCode> {
    let job = trigger
        .trigger_and_wait(symbol)
        .await
        .with_context(|| format!("Failed to run pipeline for {:?}", symbol))?;

    let output = serde_json::to_string_pretty(&job).context("Failed to serialize job")?;
    println!("{}", output);

    if job.state == JobState::Completed {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::FAILURE)
    }
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
