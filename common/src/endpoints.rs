pub const DEVICE_STATUS_PATH: &str = "/status";
pub const DEVICE_TOGGLE_PATH: &str = "/toggle";

pub const API_STATUS_PATH: &str = "/api/status";
pub const API_TOGGLE_PATH: &str = "/api/toggle";
