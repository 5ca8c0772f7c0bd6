use thiserror::Error;

/// Length of the hash and salt prefixes carried by a verification payload.
pub const PREFIX_LEN: usize = 16;

/// Marker written in front of the serialized payload in the metadata field.
pub const PAYLOAD_MARKER: &str = "VERIFY_DATA:";

#[derive(Error, Debug)]
pub enum CardError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Render failure: {0}")]
    RenderFailure(String),

    #[error("External service unavailable: {0}")]
    ExternalServiceUnavailable(String),

    #[error("Ledger rejected request: {0}")]
    LedgerRejected(String),

    #[error("Entropy unavailable: {0}")]
    EntropyUnavailable(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl CardError {
    /// Whether the failure came from a collaborator rather than the request itself.
    pub fn is_service_failure(&self) -> bool {
        matches!(
            self,
            Self::ExternalServiceUnavailable(_) | Self::LedgerRejected(_)
        )
    }
}

#[cfg(feature = "network")]
impl From<reqwest::Error> for CardError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() || err.is_connect() || err.is_request() {
            Self::ExternalServiceUnavailable(err.to_string())
        } else if err.is_decode() {
            Self::SerializationError(err.to_string())
        } else {
            Self::LedgerRejected(err.to_string())
        }
    }
}

pub type Result<T> = std::result::Result<T, CardError>;
