use std::{
    net::SocketAddr,
    sync::{Arc, OnceLock},
    time::Instant,
};

use anyhow::Context;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use tokio::{net::TcpListener, sync::Mutex};
use tower_http::trace::TraceLayer;
use tracing::{debug, info};

use gate_common::{DEVICE_STATUS_PATH, DEVICE_TOGGLE_PATH};

use crate::gate::SimulatedGate;

type SharedGate = Arc<Mutex<SimulatedGate>>;

pub async fn run() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let travel_ms = env_parse::<u64>("GATE_SIM_TRAVEL_MS").unwrap_or(2_500);
    let fail_every = env_parse::<u64>("GATE_SIM_FAIL_EVERY");
    let port = env_parse::<u16>("GATE_SIM_HTTP_PORT").unwrap_or(8081);

    let gate: SharedGate = Arc::new(Mutex::new(SimulatedGate::new(travel_ms, fail_every)));

    let app = Router::new()
        .route(DEVICE_STATUS_PATH, get(handle_get_status))
        .route(DEVICE_TOGGLE_PATH, post(handle_post_toggle))
        .layer(TraceLayer::new_for_http())
        .with_state(gate);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind simulated gate at {addr}"))?;

    info!(
        "simulated gate listening on http://{addr} (travel {travel_ms} ms, fail every {})",
        fail_every.map_or_else(|| "never".to_string(), |n| n.to_string())
    );
    axum::serve(listener, app).await?;
    Ok(())
}

async fn handle_get_status(State(gate): State<SharedGate>) -> Response {
    let status = gate.lock().await.status(monotonic_ms());
    match status {
        Some(status) => Json(status).into_response(),
        None => {
            debug!("injecting status failure");
            StatusCode::SERVICE_UNAVAILABLE.into_response()
        }
    }
}

async fn handle_post_toggle(State(gate): State<SharedGate>) -> impl IntoResponse {
    let now_ms = monotonic_ms();
    let mut gate = gate.lock().await;
    if gate.is_travelling(now_ms) {
        info!("toggle received mid-travel, reversing");
    } else {
        info!("toggle received");
    }
    gate.toggle(now_ms);
    StatusCode::OK
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|value| value.parse::<T>().ok())
}

fn monotonic_ms() -> u64 {
    static START: OnceLock<Instant> = OnceLock::new();
    START
        .get_or_init(Instant::now)
        .elapsed()
        .as_millis()
        .try_into()
        .unwrap_or(u64::MAX)
}
