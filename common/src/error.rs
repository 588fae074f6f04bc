use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NetworkError {
    #[error("request timed out")]
    Timeout,
    #[error("connection failed: {0}")]
    Connect(String),
    #[error("device answered with HTTP {0}")]
    Status(u16),
    #[error("malformed status body: {0}")]
    MalformedBody(String),
    #[error("transport error: {0}")]
    Transport(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    #[error("gate is not ready for a command")]
    NotReady,
    #[error("toggle could not be sent: {0}")]
    SendFailed(NetworkError),
}
