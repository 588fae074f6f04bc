use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
    pub poll_interval_ms: u64,
    pub status_timeout_ms: u64,
    pub toggle_timeout_ms: u64,
    pub settle_ms: u64,
    pub cooldown_ms: u64,
    pub refresh_after_toggle_ms: Option<u64>,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 5_000,
            status_timeout_ms: 4_000,
            toggle_timeout_ms: 4_000,
            settle_ms: 3_000,
            cooldown_ms: 2_000,
            refresh_after_toggle_ms: None,
        }
    }
}

impl RemoteConfig {
    pub fn sanitize(&mut self) {
        self.poll_interval_ms = self.poll_interval_ms.clamp(500, 300_000);
        self.status_timeout_ms = self.status_timeout_ms.clamp(100, 60_000);
        self.toggle_timeout_ms = self.toggle_timeout_ms.clamp(100, 60_000);
        self.settle_ms = self.settle_ms.min(60_000);
        self.cooldown_ms = self.cooldown_ms.min(60_000);
        self.refresh_after_toggle_ms = self.refresh_after_toggle_ms.map(|ms| ms.min(60_000));
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SignalCalibration {
    pub floor_dbm: i32,
    pub ceiling_dbm: i32,
    pub max_bars: u8,
}

impl Default for SignalCalibration {
    fn default() -> Self {
        Self {
            floor_dbm: -100,
            ceiling_dbm: -50,
            max_bars: 4,
        }
    }
}

impl SignalCalibration {
    pub fn sanitize(&mut self) {
        if self.ceiling_dbm <= self.floor_dbm || self.max_bars == 0 {
            *self = Self::default();
        }
    }

    /// Linear scale between floor and ceiling, always clamped to `1..=max_bars`.
    pub fn bars(&self, rssi_dbm: i32) -> u8 {
        let max_bars = i64::from(self.max_bars.max(1));
        let span = i64::from(self.ceiling_dbm) - i64::from(self.floor_dbm);
        if span <= 0 {
            return 1;
        }
        let offset = i64::from(rssi_dbm) - i64::from(self.floor_dbm);
        let level = (offset * max_bars).div_euclid(span);
        // max_bars fits in u8, so the clamped level does too.
        level.clamp(1, max_bars) as u8
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
    pub base_url: String,
    /// Origin used when `base_url` is empty; a native client has no page origin.
    pub fallback_origin: String,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            fallback_origin: "http://127.0.0.1:8081".to_string(),
        }
    }
}

impl DeviceConfig {
    pub fn resolved_base(&self) -> String {
        let raw = self.base_url.trim();
        let base = if raw.is_empty() {
            self.fallback_origin.trim()
        } else {
            raw
        };

        let base = base.trim_end_matches('/');
        if base.contains("://") {
            base.to_string()
        } else {
            format!("http://{base}")
        }
    }

    pub fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.resolved_base(), path.trim_start_matches('/'))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    pub remote: RemoteConfig,
    pub signal: SignalCalibration,
    pub device: DeviceConfig,
    pub http_port: u16,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            remote: RemoteConfig::default(),
            signal: SignalCalibration::default(),
            device: DeviceConfig::default(),
            http_port: 8080,
        }
    }
}

impl RuntimeConfig {
    pub fn sanitize(&mut self) {
        self.remote.sanitize();
        self.signal.sanitize();
        if self.device.fallback_origin.trim().is_empty() {
            self.device.fallback_origin = DeviceConfig::default().fallback_origin;
        }
        if self.http_port == 0 {
            self.http_port = 8080;
        }
    }
}
