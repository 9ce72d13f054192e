//! # Retro Server
//!
//! Main binary. `retro serve` (the default) runs the REST API;
//! `retro issue-token` mints an access token for local use and for
//! operators bootstrapping the first administrator.

use clap::{Parser, Subcommand};
use retro_api::{AppState, build_router};
use retro_db::Database;
use std::net::SocketAddr;
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "retro", version)]
#[command(about = "Retrospective meetings: roles, items, and vote quotas")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP API
    Serve {
        /// Do not apply pending database migrations on startup
        #[arg(long, env = "RETRO_SKIP_MIGRATIONS")]
        skip_migrations: bool,
    },
    /// Print a signed access token for a user
    IssueToken {
        #[arg(long)]
        user_id: Uuid,

        #[arg(long)]
        username: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let config = retro_common::config::init()?;

    match cli.command.unwrap_or(Command::Serve {
        skip_migrations: false,
    }) {
        Command::Serve { skip_migrations } => serve(config, skip_migrations).await,
        Command::IssueToken { user_id, username } => {
            let token = retro_common::auth::generate_access_token(
                user_id,
                &username,
                &config.auth.jwt_secret,
                config.auth.access_token_ttl_secs,
            )?;
            println!("{token}");
            Ok(())
        }
    }
}

async fn serve(
    config: &'static retro_common::config::AppConfig,
    skip_migrations: bool,
) -> anyhow::Result<()> {
    // Initialize tracing (structured logging)
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "retro=debug,tower_http=debug".into()),
        )
        .with_target(true)
        .with_thread_ids(true)
        .init();

    tracing::info!("Starting Retro v{}", env!("CARGO_PKG_VERSION"));

    let db = Database::connect(config).await?;
    if skip_migrations {
        tracing::warn!("Skipping database migrations");
    } else {
        db.migrate().await?;
    }

    let state = AppState::new(db);
    let voting = state.voting.clone();
    let router = build_router(state);
    let addr = SocketAddr::new(config.server.host.parse()?, config.server.port);

    tracing::info!("REST API listening on http://{addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    voting.flush().await;
    tracing::info!("Shut down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
}
