pub mod config;
pub mod endpoints;
pub mod engine;
pub mod error;
pub mod presentation;
pub mod types;

pub use config::{DeviceConfig, RemoteConfig, RuntimeConfig, SignalCalibration};
pub use endpoints::*;
pub use engine::{EngineEvent, GateEngine, LoopPhase, PollTicket, ToggleTicket};
pub use error::{CommandError, NetworkError};
pub use presentation::present;
pub use types::{
    ColorClass, ConnectionState, DeviceStatus, GateState, ReportedGate, SignalSample, ViewModel,
};
