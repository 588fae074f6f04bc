pub mod client;
pub mod host;
pub mod runtime;

#[cfg(test)]
mod testing;

pub use client::{DeviceClient, HttpDeviceClient};
pub use runtime::{GateRemote, RemoteSnapshot};
