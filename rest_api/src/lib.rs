// rest_api/src/lib.rs
//! HTTP and WebSocket surface of MediConnect.

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::http::Method;
use axum::routing::get;
use axum::Router;
use lib::{MediConnect, Notifier};
use security::{Argon2Digest, TokenIssuer};
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

pub mod config;
pub mod error;
pub mod handlers;
pub mod ws;

pub use config::{load_api_config, ApiConfig};
pub use error::RestApiError;

/// Shared state for the Axum application.
#[derive(Clone)]
pub struct AppState {
    pub app: MediConnect,
    pub tokens: Arc<TokenIssuer>,
}

impl AppState {
    pub fn new(app: MediConnect, tokens: TokenIssuer) -> Self {
        AppState { app, tokens: Arc::new(tokens) }
    }
}

pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::PATCH, Method::DELETE])
        .allow_origin(Any)
        .allow_headers(Any);

    Router::new()
        .nest("/api", handlers::api_routes())
        .route("/ws", get(ws::ws_handler))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

/// Installs the fmt subscriber. `MEDICONNECT_LOG` wins over `level`.
pub fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_env(config::LOG_ENV).unwrap_or_else(|_| EnvFilter::new(level));
    if tracing_subscriber::fmt().with_env_filter(filter).try_init().is_err() {
        eprintln!("Tracing subscriber already installed");
    }
}

/// Opens the store, seeds it if configured, and serves until `shutdown_rx`
/// fires. Pending writes are flushed on the way out.
pub async fn start_server(config: ApiConfig, shutdown_rx: oneshot::Receiver<()>) -> Result<()> {
    if config.uses_default_secret() {
        warn!("Using the built-in JWT secret; set {} outside development", crate::config::JWT_SECRET_ENV);
    }
    let notifier = Notifier::new(config.session_buffer);
    let app = MediConnect::open(
        &config.data_directory,
        Arc::new(Argon2Digest::new()),
        notifier,
        config.transition_policy,
    )
    .with_context(|| format!("Failed to open data directory {}", config.data_directory.display()))?;

    if config.seed_demo_data {
        app.seed_demo_data().await?;
    }

    let tokens = TokenIssuer::new(config.jwt_secret.as_bytes(), config.token_ttl_hours);
    let router = build_router(AppState::new(app.clone(), tokens));

    let addr = format!("{}:{}", config.host, config.port);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("MediConnect API listening on http://{}", addr);

    axum::serve(listener, router.into_make_service())
        .with_graceful_shutdown(async {
            shutdown_rx.await.ok();
            info!("MediConnect API received shutdown signal");
        })
        .await
        .context("Server error")?;

    match app.flush().await {
        Ok(bytes) => info!(bytes, "Store flushed"),
        Err(e) => error!(error = %e, "Failed to flush store on shutdown"),
    }
    Ok(())
}
