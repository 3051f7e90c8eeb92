// Gateway, session and store error types
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

/// Status reserved for failures where no HTTP response was received.
pub const TRANSPORT_STATUS: u16 = 0;

/// Generic message used when neither the server nor the status line says anything.
pub const FALLBACK_MESSAGE: &str = "Request failed";

/// Normalized failure of a gateway call.
///
/// `status` is the HTTP status of the final attempt, or [`TRANSPORT_STATUS`] when the
/// request never produced a response. `data` holds the parsed error body, if any.
#[derive(Debug, Clone, Error, Serialize)]
#[error("{message}")]
pub struct GatewayError {
    pub message: String,
    pub status: u16,
    pub data: Option<Value>,
}

impl GatewayError {
    pub fn new(message: impl Into<String>, status: u16, data: Option<Value>) -> Self {
        Self {
            message: message.into(),
            status,
            data,
        }
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self::new(message, TRANSPORT_STATUS, None)
    }

    pub fn is_transport(&self) -> bool {
        self.status == TRANSPORT_STATUS
    }

    pub fn is_unauthorized(&self) -> bool {
        self.status == 401
    }

    pub fn is_forbidden(&self) -> bool {
        self.status == 403
    }
}

impl From<reqwest::Error> for GatewayError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            GatewayError::transport(format!("Request timed out: {}", err))
        } else {
            GatewayError::transport(format!("Unable to reach the server: {}", err))
        }
    }
}

/// Session manager failures
#[derive(Debug, Clone, Error)]
pub enum SessionError {
    #[error("No credential is stored")]
    NoCredential,

    #[error("Session hydration failed: {0}")]
    Hydration(#[from] GatewayError),

    #[error("Identity payload is not a profile: {0}")]
    InvalidProfile(String),

    #[error("No identity endpoints are configured")]
    NoIdentityEndpoints,

    #[error("Credential changed while the identity was loading")]
    Superseded,
}

/// Durable key-value store failures
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Store I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Store encoding error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Download sink failures
#[derive(Debug, Error)]
pub enum DownloadError {
    #[error(transparent)]
    Gateway(#[from] GatewayError),

    #[error("Failed to save download: {0}")]
    Save(#[from] std::io::Error),
}
