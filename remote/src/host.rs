use std::{
    io::ErrorKind,
    net::SocketAddr,
    path::{Path, PathBuf},
};

use anyhow::Context;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use gate_common::{CommandError, RuntimeConfig, API_STATUS_PATH, API_TOGGLE_PATH};

use crate::{
    client::{DeviceClient, HttpDeviceClient},
    runtime::GateRemote,
};

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

pub async fn run() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config_path = config_path();
    let mut runtime = load_runtime_config(&config_path)
        .await
        .unwrap_or_else(|err| {
            warn!(
                "failed to load runtime config from {}: {err:#}",
                config_path.display()
            );
            RuntimeConfig::default()
        });
    apply_env_overrides(&mut runtime, |key| std::env::var(key).ok());
    runtime.sanitize();

    let client = HttpDeviceClient::new(&runtime.device, &runtime.remote)?;
    info!(
        "polling {} every {} ms",
        client.status_url(),
        runtime.remote.poll_interval_ms
    );
    let remote = GateRemote::spawn(client, runtime.remote.clone(), runtime.signal.clone());

    let addr = SocketAddr::from(([0, 0, 0, 0], runtime.http_port));
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind gate remote server at {addr}"))?;

    info!("gate remote listening on http://{addr}");
    axum::serve(listener, router(remote.clone()))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    remote.shutdown().await;
    Ok(())
}

pub fn router<C: DeviceClient>(remote: GateRemote<C>) -> Router {
    Router::new()
        .route(API_STATUS_PATH, get(handle_get_status::<C>))
        .route(API_TOGGLE_PATH, post(handle_post_toggle::<C>))
        .layer(TraceLayer::new_for_http())
        .with_state(remote)
}

async fn handle_get_status<C: DeviceClient>(
    State(remote): State<GateRemote<C>>,
) -> impl IntoResponse {
    Json(remote.snapshot())
}

async fn handle_post_toggle<C: DeviceClient>(State(remote): State<GateRemote<C>>) -> Response {
    match remote.request_toggle().await {
        Ok(()) => (StatusCode::ACCEPTED, Json(remote.snapshot())).into_response(),
        Err(CommandError::NotReady) => {
            error_response(StatusCode::CONFLICT, "Gate is not ready for a command")
        }
        Err(err @ CommandError::SendFailed(_)) => {
            error_response(StatusCode::BAD_GATEWAY, &err.to_string())
        }
    }
}

fn config_path() -> PathBuf {
    std::env::var("GATE_REMOTE_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("./.gate-remote/runtime.json"))
}

pub async fn load_runtime_config(path: &Path) -> anyhow::Result<RuntimeConfig> {
    match tokio::fs::read(path).await {
        Ok(raw) => Ok(serde_json::from_slice::<RuntimeConfig>(&raw)?),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(RuntimeConfig::default()),
        Err(err) => Err(err.into()),
    }
}

pub fn apply_env_overrides(
    runtime: &mut RuntimeConfig,
    lookup: impl Fn(&str) -> Option<String>,
) {
    if let Some(base_url) = lookup("GATE_BASE_URL") {
        runtime.device.base_url = base_url;
    }
    if let Some(port) = lookup("GATE_REMOTE_HTTP_PORT").and_then(|value| value.parse::<u16>().ok())
    {
        runtime.http_port = port;
    }
    if let Some(interval) =
        lookup("GATE_POLL_INTERVAL_MS").and_then(|value| value.parse::<u64>().ok())
    {
        runtime.remote.poll_interval_ms = interval;
    }
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!("failed to listen for shutdown signal: {err}");
        std::future::pending::<()>().await;
    }
    info!("shutdown requested");
}

fn error_response(status: StatusCode, message: &str) -> Response {
    (
        status,
        Json(ErrorBody {
            error: message.to_string(),
        }),
    )
        .into_response()
}
