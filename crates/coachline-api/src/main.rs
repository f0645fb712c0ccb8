//! Coachline CLI and relay server entry point.
//!
//! Binary name: `coachline`
//!
//! Parses CLI arguments, initializes tracing, the database and services,
//! then dispatches to a command handler or starts the relay server.

mod cli;
mod http;
mod state;

use std::time::Duration;

use clap::Parser;
use clap_complete::generate;
use coachline_observe::tracing_setup::{init_tracing, shutdown_tracing, verbosity_filter};

use cli::{Cli, Commands, UserCommand};
use state::AppState;

/// How long the dispatcher may take to drain its queue after the server stops.
const DISPATCHER_DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Interval between sweeps of expired login sessions.
const SESSION_PURGE_INTERVAL: Duration = Duration::from_secs(60 * 60);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Shell completions don't need tracing or app state
    if let Commands::Completions { shell } = &cli.command {
        let mut cmd = <Cli as clap::CommandFactory>::command();
        generate(*shell, &mut cmd, "coachline", &mut std::io::stdout());
        return Ok(());
    }

    let otel = matches!(cli.command, Commands::Serve { otel: true, .. });
    init_tracing(verbosity_filter(cli.verbose, cli.quiet), otel)
        .map_err(|e| anyhow::anyhow!("failed to initialize tracing: {e}"))?;

    let (state, dispatcher) = AppState::init().await?;

    let result = match cli.command {
        Commands::Serve { port, host, .. } => {
            let host = host.unwrap_or_else(|| state.config.server.host.clone());
            let port = port.unwrap_or(state.config.server.port);
            serve(state.clone(), &host, port).await
        }

        Commands::User { action } => match action {
            UserCommand::Add {
                username,
                email,
                role,
                password,
            } => cli::user::add_user(&state, username, email, &role, password, cli.json).await,
            UserCommand::List { role } => {
                cli::user::list_users(&state, role.as_deref(), cli.json).await
            }
        },

        Commands::History { a, b } => cli::history::show_history(&state, &a, &b, cli.json).await,

        Commands::Completions { .. } => Ok(()),
    };

    // Dropping the last queue sender lets the dispatcher drain what is
    // left and stop.
    let db_pool = state.db_pool.clone();
    drop(state);
    match tokio::time::timeout(DISPATCHER_DRAIN_TIMEOUT, dispatcher).await {
        Ok(Ok(())) => tracing::debug!("dispatcher stopped"),
        Ok(Err(err)) => tracing::warn!(error = %err, "dispatcher task failed"),
        Err(_) => tracing::warn!("dispatcher did not drain in time"),
    }

    db_pool.close().await;
    shutdown_tracing();
    result
}

async fn serve(state: AppState, host: &str, port: u16) -> anyhow::Result<()> {
    let addr = format!("{host}:{port}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!(%addr, data_dir = %state.data_dir.display(), "relay listening");
    println!(
        "  {} Coachline relay listening on {}",
        console::style("⚡").bold(),
        console::style(format!("http://{addr}")).cyan()
    );
    println!("  {}", console::style("Press Ctrl+C to stop").dim());

    let purge = tokio::spawn(purge_sessions_periodically(state.clone()));
    let router = http::router::build_router(state);

    let served = axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await;
    purge.abort();
    served?;

    println!("\n  Server stopped.");
    Ok(())
}

async fn purge_sessions_periodically(state: AppState) {
    let mut ticker = tokio::time::interval(SESSION_PURGE_INTERVAL);
    loop {
        ticker.tick().await;
        if let Err(err) = state.account_service.purge_expired_sessions().await {
            tracing::warn!(error = %err, "failed to purge expired sessions");
        }
    }
}

/// Wait for Ctrl+C or SIGTERM for graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "failed to install SIGTERM handler");
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
