use std::sync::Arc;

use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use anchornotes::api::{create_router, AppState};
use anchornotes::config::Config;
use anchornotes::db::{Database, DatabaseBackend, LibSqlBackend};

#[derive(Parser)]
#[command(name = "anchornotes")]
#[command(about = "Relevance and reminder service for AnchorNotes")]
struct Args {
    /// Bind address, overrides ANCHOR_HOST
    #[arg(long)]
    host: Option<String>,

    /// Listen port, overrides ANCHOR_PORT
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "anchornotes=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let mut config = Config::from_env();
    if let Some(host) = args.host {
        config.server.host = host;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }

    if config.server.api_tokens.is_empty() {
        tracing::warn!(
            "ANCHOR_API_TOKENS is not set. All /api/notes and /api/geofences routes will return 401."
        );
    }

    tracing::info!("Initializing database...");
    let raw_db = Database::open(&config.database).await?;
    let replica = raw_db.is_replica();
    let db: Arc<dyn DatabaseBackend> = Arc::new(LibSqlBackend::new(raw_db));

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let state = AppState::new(config.clone(), db.clone());
    let app = create_router(state);

    let cancel_token = CancellationToken::new();

    if replica {
        let token = cancel_token.child_token();
        let db = db.clone();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = token.cancelled() => {
                        tracing::info!("Replica sync task shutting down");
                        break;
                    }
                    _ = tokio::time::sleep(tokio::time::Duration::from_secs(60)) => {
                        if let Err(e) = db.sync().await {
                            tracing::error!(error = %e, "Replica sync failed");
                        }
                    }
                }
            }
        });
    }

    tracing::info!("AnchorNotes listening on {}", addr);
    tracing::info!("  Health check: http://{}/api/health", addr);
    tracing::info!("  API docs:     http://{}/api/docs", addr);
    tracing::info!("  OpenAPI spec: http://{}/api/openapi.json", addr);
    tracing::info!(
        "  Relevance window: ±{} minutes",
        config.relevance.window_minutes
    );

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(cancel_token))
        .await?;

    Ok(())
}

async fn shutdown_signal(cancel_token: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
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
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
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

    tracing::info!("Shutdown signal received, cancelling background tasks...");
    cancel_token.cancel();
}
