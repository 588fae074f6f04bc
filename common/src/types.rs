use serde::{Deserialize, Serialize};

use crate::error::NetworkError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportedGate {
    Open,
    Closed,
}

impl ReportedGate {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Closed => "closed",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceStatus {
    pub gate: ReportedGate,
    pub rssi: i32,
}

impl DeviceStatus {
    pub fn parse(body: &[u8]) -> Result<Self, NetworkError> {
        serde_json::from_slice(body).map_err(|err| NetworkError::MalformedBody(err.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GateState {
    #[default]
    Unknown,
    Open,
    Closed,
    Opening,
    Closing,
}

impl GateState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Unknown => "unknown",
            Self::Open => "open",
            Self::Closed => "closed",
            Self::Opening => "opening",
            Self::Closing => "closing",
        }
    }

    pub fn is_transitional(self) -> bool {
        matches!(self, Self::Opening | Self::Closing)
    }

    pub fn terminal(self) -> Self {
        match self {
            Self::Opening => Self::Open,
            Self::Closing => Self::Closed,
            other => other,
        }
    }

    pub fn toggled_transition(self) -> Option<Self> {
        match self {
            Self::Closed => Some(Self::Opening),
            Self::Open => Some(Self::Closing),
            Self::Unknown | Self::Opening | Self::Closing => None,
        }
    }
}

impl From<ReportedGate> for GateState {
    fn from(reported: ReportedGate) -> Self {
        match reported {
            ReportedGate::Open => Self::Open,
            ReportedGate::Closed => Self::Closed,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SignalSample {
    #[serde(rename = "rssiDbm")]
    pub rssi_dbm: i32,
    pub bars: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct ConnectionState {
    pub connected: bool,
    pub gate: GateState,
    pub signal: Option<SignalSample>,
    #[serde(rename = "lastUpdatedMs")]
    pub last_updated_ms: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ColorClass {
    Offline,
    Unknown,
    Open,
    Closed,
    Transitioning,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ViewModel {
    pub label: String,
    #[serde(rename = "gateLabel")]
    pub gate_label: String,
    #[serde(rename = "signalLabel")]
    pub signal_label: String,
    #[serde(rename = "signalBars")]
    pub signal_bars: Option<u8>,
    #[serde(rename = "colorClass")]
    pub color_class: ColorClass,
    #[serde(rename = "actionLabel")]
    pub action_label: String,
    #[serde(rename = "actionEnabled")]
    pub action_enabled: bool,
}
