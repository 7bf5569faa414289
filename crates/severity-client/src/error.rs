use severity_core::{ServerDataError, ValidationError};
use thiserror::Error;

/// Failure of a call to the prediction service.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Rejected locally; nothing was sent.
    #[error("invalid input: {0}")]
    Validation(#[from] ValidationError),

    /// The service answered 401. The stored credential has been cleared and
    /// an `AuthExpired` event emitted.
    #[error("not authorised; session expired")]
    Unauthorized,

    #[error(transparent)]
    Transport(#[from] TransportError),
}

impl ClientError {
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Unauthorized)
    }
}

impl From<ServerDataError> for ClientError {
    fn from(e: ServerDataError) -> Self {
        Self::Transport(TransportError::ServerData(e))
    }
}

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("HTTP request failed: {0}")]
    Network(#[source] reqwest::Error),

    #[error("request timed out")]
    Timeout,

    /// Non-2xx, non-401 status. `message` is the server's `detail` when it
    /// sent one.
    #[error("server returned {status}: {message}")]
    Status { status: u16, message: String },

    #[error("unexpected response: {0}")]
    ServerData(#[from] ServerDataError),
}

impl From<reqwest::Error> for TransportError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::Timeout
        } else {
            Self::Network(e)
        }
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(e: reqwest::Error) -> Self {
        Self::Transport(e.into())
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid timeout {0:?}: expected a positive number of seconds")]
    Timeout(String),

    #[error("failed to build HTTP client: {0}")]
    Http(#[from] reqwest::Error),
}

#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("credential file I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("credential file is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

#[cfg(feature = "stream")]
#[derive(Debug, Error)]
pub enum StreamError {
    #[error("websocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("undecodable stream message: {0}")]
    Decode(#[from] serde_json::Error),
}
