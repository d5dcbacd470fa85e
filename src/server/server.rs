use std::future::Future;

use anyhow::{Context, Result};
use axum::extract::State;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use http::{header::CONTENT_TYPE, StatusCode};
use serde::Serialize;
use tracing::{error, info};

use crate::config::settings::SettingsConfig;
use crate::observability::metrics::{get_metrics, Metrics};
use crate::observability::routes::MetricsState;
use crate::sources::provider::TokenProvider;

#[derive(Clone)]
pub struct AppState {
    pub metrics_state: MetricsState,
    pub provider: TokenProvider,
}

impl AppState {
    pub fn new(metrics: &Metrics, provider: TokenProvider) -> Self {
        Self {
            metrics_state: MetricsState::new(metrics.registry.clone()),
            provider,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct TokenStatus {
    pub cached: bool,
    pub fresh: bool,
    pub expires_at: Option<u64>,
    pub seconds_remaining: Option<i64>,
}

pub fn router(settings_config: &SettingsConfig, state: AppState) -> Router {
    Router::new()
        .route("/token", get(get_token))
        .route("/token/status", get(get_token_status))
        .merge(state.metrics_state.router(&settings_config.metrics))
        .with_state(state)
}

/// Serve the token and metrics routes until Ctrl-C.
pub async fn start(settings_config: &SettingsConfig, provider: TokenProvider) -> Result<()> {
    start_until(settings_config, provider, ctrl_c()).await
}

/// Serve until `shutdown` resolves, letting in-flight requests finish.
pub async fn start_until(
    settings_config: &SettingsConfig,
    provider: TokenProvider,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<()> {
    let metrics = get_metrics().await;
    let app = router(settings_config, AppState::new(metrics, provider));

    let bind_addr = format!("{}:{}", settings_config.server.host, settings_config.server.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("cannot bind {}", bind_addr))?;
    info!(address = %bind_addr, "serving api token endpoints");
    metrics.up.set(1);
    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .context("server failed");
    metrics.up.set(0);
    info!("server stopped");
    served
}

async fn ctrl_c() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("shutdown signal received"),
        Err(e) => {
            // without a signal handler, run until the process is killed
            error!(error = %e, "cannot listen for ctrl-c");
            std::future::pending::<()>().await
        }
    }
}

async fn get_token(State(state): State<AppState>) -> Response {
    match state.provider.get_valid_token().await {
        Ok(token) => (StatusCode::OK, [(CONTENT_TYPE, "text/plain")], token).into_response(),
        Err(e) => {
            error!(error = %e, "cannot serve api token");
            (StatusCode::BAD_GATEWAY, e.to_string()).into_response()
        }
    }
}

async fn get_token_status(State(state): State<AppState>) -> Json<TokenStatus> {
    let now = state.provider.now();
    let margin = state.provider.safety_margin_seconds();
    let cached = state.provider.cached().await;
    Json(TokenStatus {
        cached: cached.is_some(),
        fresh: cached.as_ref().is_some_and(|t| t.is_fresh(now, margin)),
        expires_at: cached.as_ref().map(|t| t.exp_unix_ts),
        seconds_remaining: cached.as_ref().map(|t| t.seconds_remaining(now)),
    })
}
