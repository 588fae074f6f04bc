use std::{future::Future, time::Duration};

use anyhow::Context;
use reqwest::{Client, StatusCode};

use gate_common::{
    DeviceConfig, DeviceStatus, NetworkError, RemoteConfig, DEVICE_STATUS_PATH,
    DEVICE_TOGGLE_PATH,
};

pub trait DeviceClient: Send + Sync + 'static {
    fn fetch_status(&self) -> impl Future<Output = Result<DeviceStatus, NetworkError>> + Send;

    fn send_toggle(&self) -> impl Future<Output = Result<(), NetworkError>> + Send;
}

#[derive(Debug, Clone)]
pub struct HttpDeviceClient {
    http: Client,
    status_url: String,
    toggle_url: String,
    status_timeout: Duration,
    toggle_timeout: Duration,
}

impl HttpDeviceClient {
    pub fn new(device: &DeviceConfig, remote: &RemoteConfig) -> anyhow::Result<Self> {
        let http = Client::builder()
            .build()
            .context("failed to build device http client")?;

        Ok(Self {
            http,
            status_url: device.endpoint(DEVICE_STATUS_PATH),
            toggle_url: device.endpoint(DEVICE_TOGGLE_PATH),
            status_timeout: Duration::from_millis(remote.status_timeout_ms),
            toggle_timeout: Duration::from_millis(remote.toggle_timeout_ms),
        })
    }

    pub fn status_url(&self) -> &str {
        &self.status_url
    }
}

impl DeviceClient for HttpDeviceClient {
    async fn fetch_status(&self) -> Result<DeviceStatus, NetworkError> {
        let response = self
            .http
            .get(&self.status_url)
            .timeout(self.status_timeout)
            .send()
            .await
            .map_err(map_reqwest_error)?;

        if response.status() != StatusCode::OK {
            return Err(NetworkError::Status(response.status().as_u16()));
        }

        let body = response.bytes().await.map_err(map_reqwest_error)?;
        DeviceStatus::parse(&body)
    }

    async fn send_toggle(&self) -> Result<(), NetworkError> {
        let response = self
            .http
            .post(&self.toggle_url)
            .timeout(self.toggle_timeout)
            .send()
            .await
            .map_err(map_reqwest_error)?;

        if !response.status().is_success() {
            return Err(NetworkError::Status(response.status().as_u16()));
        }
        Ok(())
    }
}

fn map_reqwest_error(err: reqwest::Error) -> NetworkError {
    if err.is_timeout() {
        NetworkError::Timeout
    } else if err.is_connect() {
        NetworkError::Connect(err.to_string())
    } else if err.is_decode() || err.is_body() {
        NetworkError::MalformedBody(err.to_string())
    } else {
        NetworkError::Transport(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use std::net::SocketAddr;

    use axum::{
        http::StatusCode,
        routing::{get, post},
        Router,
    };
    use pretty_assertions::assert_eq;
    use tokio::net::TcpListener;

    use super::*;
    use gate_common::ReportedGate;

    async fn serve(app: Router) -> SocketAddr {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        addr
    }

    fn client_for(addr: SocketAddr, timeout_ms: u64) -> HttpDeviceClient {
        let device = DeviceConfig {
            base_url: addr.to_string(),
            ..DeviceConfig::default()
        };
        let remote = RemoteConfig {
            status_timeout_ms: timeout_ms,
            toggle_timeout_ms: timeout_ms,
            ..RemoteConfig::default()
        };
        HttpDeviceClient::new(&device, &remote).unwrap()
    }

    #[tokio::test]
    async fn reads_status_from_device() {
        let app = Router::new().route(
            "/status",
            get(|| async { r#"{"gate":"open","rssi":-58}"# }),
        );
        let client = client_for(serve(app).await, 1_000);

        assert_eq!(
            client.fetch_status().await,
            Ok(DeviceStatus {
                gate: ReportedGate::Open,
                rssi: -58
            })
        );
    }

    #[tokio::test]
    async fn non_ok_status_is_a_failure() {
        let app = Router::new()
            .route("/status", get(|| async { StatusCode::ACCEPTED }))
            .route("/toggle", post(|| async { StatusCode::INTERNAL_SERVER_ERROR }));
        let client = client_for(serve(app).await, 1_000);

        assert_eq!(client.fetch_status().await, Err(NetworkError::Status(202)));
        assert_eq!(client.send_toggle().await, Err(NetworkError::Status(500)));
    }

    #[tokio::test]
    async fn malformed_body_is_a_failure() {
        let app = Router::new().route("/status", get(|| async { "<html>captive portal</html>" }));
        let client = client_for(serve(app).await, 1_000);

        assert!(matches!(
            client.fetch_status().await,
            Err(NetworkError::MalformedBody(_))
        ));
    }

    #[tokio::test]
    async fn any_success_status_accepts_toggle() {
        let app = Router::new().route("/toggle", post(|| async { StatusCode::NO_CONTENT }));
        let client = client_for(serve(app).await, 1_000);

        assert_eq!(client.send_toggle().await, Ok(()));
    }

    #[tokio::test]
    async fn slow_device_times_out() {
        let app = Router::new().route(
            "/status",
            get(|| async {
                tokio::time::sleep(Duration::from_secs(2)).await;
                r#"{"gate":"open","rssi":-58}"#
            }),
        );
        let client = client_for(serve(app).await, 100);

        assert_eq!(client.fetch_status().await, Err(NetworkError::Timeout));
    }

    #[tokio::test]
    async fn unreachable_device_is_a_failure() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = client_for(addr, 1_000);
        assert!(client.fetch_status().await.is_err());
        assert!(client.send_toggle().await.is_err());
    }
}
