//! InsightBot service and CLI entry point.
//!
//! Binary name: `insightbot`
//!
//! Parses CLI arguments, loads the TOML configuration, resolves settings
//! through the secret chain, then either serves the webhook or runs an
//! operator command.

mod cli;
mod http;
mod state;

use anyhow::Context;
use clap::Parser;

use insightbot_infra::config::load_service_config;
use insightbot_observe::tracing_setup::{init_tracing_with_default, shutdown_tracing};
use insightbot_types::config::ServiceConfig;

use cli::{Cli, Commands};
use state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_tracing_with_default(
        cli.log_format,
        cli.otel,
        cli.command.default_filter(cli.verbose),
    )
    .map_err(|e| anyhow::anyhow!("failed to initialize tracing: {e}"))?;

    let result = run(cli).await;
    shutdown_tracing();
    result
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let mut config = load_service_config(&cli.config).await;

    match cli.command {
        Commands::Serve { host, port } => {
            if let Some(host) = host {
                config.server.host = host;
            }
            if let Some(port) = port {
                config.server.port = port;
            }
            serve(config).await?;
        }

        Commands::Ask { question } => {
            let state = AppState::init(config).await?;
            cli::ask::ask(&state, &question, cli.json).await?;
        }

        Commands::Config { check_llm } => {
            let settings = state::resolve_settings(&config).await;
            cli::config::show_config(&config, &settings, check_llm, cli.json).await?;
        }

        Commands::Insights {
            start_date,
            end_date,
            region,
        } => {
            let state = AppState::init(config).await?;
            cli::insights::insights(
                &state,
                start_date.as_deref(),
                end_date.as_deref(),
                region,
                cli.json,
            )
            .await?;
        }
    }

    Ok(())
}

async fn serve(config: ServiceConfig) -> anyhow::Result<()> {
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let state = AppState::init(config).await?;

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    tracing::info!(%addr, "insightbot listening");

    let router = http::router::build_router(state);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("server stopped");
    Ok(())
}

/// Wait for Ctrl+C or SIGTERM for graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
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
    tracing::info!("shutdown signal received");
}
