//! Rex API server binary.
//!
//! Serves the chat API over HTTP, backed by PostgreSQL or, with `--memory`,
//! by an in-process store that is lost on exit.

use std::sync::Arc;

use clap::Parser;
use rex_api::{AppState, LogMailer};
use rex_api::config::ApiConfig;
use sqlx::postgres::PgPoolOptions;
use tracing::{info, warn};

/// Default log filter when `RUST_LOG` is unset.
const DEFAULT_LOG_FILTER: &str = "info,rex_api=debug,rex_core=debug";

/// CLI arguments for the API server.
#[derive(Parser, Debug)]
#[command(name = "rex_api_server", about = "Rex career-mentor chat API server")]
struct Args {
    /// Address to listen on.
    #[arg(long, env = "BIND_ADDR", default_value = "127.0.0.1:3100")]
    bind: String,

    /// PostgreSQL connection URL.
    #[arg(
        long,
        env = "DATABASE_URL",
        default_value = "postgres://localhost:5432/rex"
    )]
    database_url: String,

    /// Maximum number of database connections in the pool.
    #[arg(long, default_value_t = 5)]
    max_connections: u32,

    /// Keep everything in memory instead of connecting to PostgreSQL.
    #[arg(long, default_value_t = false)]
    memory: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .init();

    let args = Args::parse();

    let config = ApiConfig {
        bind_addr: args.bind.clone(),
        pg_connection_url: args.database_url.clone(),
        ..ApiConfig::from_env()
    };

    if config.openai_api_key.is_none() {
        warn!("OPENAI_API_KEY is not set; every reply will be the fallback text");
    }

    let state = if args.memory {
        info!("using in-memory store");
        AppState::in_memory(rex_api::openai_model(&config), config.clone())
    } else {
        info!(
            database_url = %args.database_url,
            max_connections = args.max_connections,
            "configuring connection pool"
        );
        let pool = PgPoolOptions::new()
            .max_connections(args.max_connections)
            .acquire_timeout(std::time::Duration::from_secs(30))
            .connect(&args.database_url)
            .await?;

        info!("running database migrations");
        rex_api::migrate(&pool).await?;
        warn!("no mail relay configured; password reset tokens are not delivered");
        AppState::postgres(pool, Arc::new(LogMailer), config.clone())
    };

    let app = rex_api::router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    info!(addr = %listener.local_addr()?, model = %config.model, "REST API listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("shutdown signal received");
        })
        .await?;

    Ok(())
}
