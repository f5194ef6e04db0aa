//! hirechat CLI and REST/WebSocket API entry point.
//!
//! Binary name: `hirechat`
//!
//! Parses CLI arguments, initializes database and services, then dispatches
//! to the appropriate command handler or starts the API server.

mod cli;
mod http;
mod state;

use clap::Parser;
use clap_complete::generate;
use tracing::{error, info};

use cli::{Cli, Commands, ConversationCommand, DevCommand};
use hirechat_core::messaging::Caller;
use hirechat_types::message::MessageQuery;
use state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Shell completions don't need tracing or app state
    if let Commands::Completions { shell } = &cli.command {
        let mut cmd = <Cli as clap::CommandFactory>::command();
        generate(*shell, &mut cmd, "hirechat", &mut std::io::stdout());
        return Ok(());
    }

    let filter = match cli.verbose {
        0 if cli.quiet => "error",
        0 => "warn",
        1 => "info,hirechat=debug",
        _ => "trace",
    };
    hirechat_observe::tracing_setup::init_tracing(filter, cli.otel)
        .map_err(|e| anyhow::anyhow!("failed to initialize tracing: {e}"))?;

    let result = run(cli).await;
    hirechat_observe::tracing_setup::shutdown_tracing();
    result
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let state = AppState::init().await?;
    let json = cli.json;

    match cli.command {
        Commands::Conversation {
            user,
            role_hint,
            action,
        } => {
            let caller = Caller::new(user).with_role_hint(role_hint);
            match action {
                ConversationCommand::Open { application_id } => {
                    cli::conversation::open(&state, &caller, &application_id, json).await?;
                }
                ConversationCommand::Send {
                    conversation_id,
                    body,
                } => {
                    cli::conversation::send(&state, &caller, &conversation_id, &body, json)
                        .await?;
                }
                ConversationCommand::History {
                    conversation_id,
                    since,
                    limit,
                } => {
                    let query = MessageQuery {
                        since,
                        after: None,
                        limit,
                    };
                    cli::conversation::history(&state, &caller, &conversation_id, &query, json)
                        .await?;
                }
                ConversationCommand::Read { conversation_id } => {
                    cli::conversation::read(&state, &caller, &conversation_id, json).await?;
                }
                ConversationCommand::Inbox => {
                    cli::conversation::inbox(&state, &caller, json).await?;
                }
                ConversationCommand::Watch { conversation_id } => {
                    cli::conversation::watch(&state, &caller, &conversation_id, json).await?;
                }
            }
        }

        Commands::Dev { action } => match action {
            DevCommand::Application {
                employer,
                candidate,
            } => {
                cli::dev::application(&state, employer, candidate, json).await?;
            }
            DevCommand::Entitle { employer, days } => {
                cli::dev::entitle(&state, &employer, days, json).await?;
            }
            DevCommand::Token { user, hours } => {
                cli::dev::token(&state, &user, hours, json).await?;
            }
        },

        Commands::Status => {
            cli::status::status(&state, json).await?;
        }

        Commands::Serve { port, host } => {
            let host = host.unwrap_or_else(|| state.config.server.host.clone());
            let port = port.unwrap_or(state.config.server.port);
            let addr = format!("{host}:{port}");
            let listener = tokio::net::TcpListener::bind(&addr).await?;

            if !cli.quiet {
                println!(
                    "  {} hirechat API listening on {}",
                    console::style("⚡").bold(),
                    console::style(format!("http://{addr}")).cyan()
                );
                println!("  {}", console::style("Press Ctrl+C to stop").dim());
            }
            info!(%addr, "server started");

            let pool = state.db_pool.clone();
            let router = http::router::build_router(state);

            axum::serve(listener, router)
                .with_graceful_shutdown(shutdown_signal())
                .await?;

            pool.close().await;
            if !cli.quiet {
                println!("\n  Server stopped.");
            }
        }

        Commands::Completions { .. } => {}
    }

    Ok(())
}

/// Wait for Ctrl+C or SIGTERM for graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "failed to listen for Ctrl+C");
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
                error!(error = %e, "failed to install SIGTERM handler");
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
}
