//! API error handling module
//!
//! Provides a unified error type for all API endpoints with structured error variants.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use cardmark_core::CardError;
use thiserror::Error;

use crate::artifact_store::ArtifactStoreError;

/// API error type with structured variants for different error categories
#[derive(Debug, Error)]
pub enum ApiError {
    /// Bad request - client provided invalid input
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Not found - requested resource does not exist or has expired
    #[error("Not found: {0}")]
    NotFound(String),

    /// Internal server error - unexpected server-side failure
    #[error("Internal error: {0}")]
    Internal(String),

    /// Card core error - error from derivation, rendering, or the ledger
    #[error("Card error: {0}")]
    Card(#[from] CardError),

    /// Artifact storage error
    #[error("Artifact store error: {0}")]
    Store(#[from] ArtifactStoreError),
}

impl ApiError {
    /// Create a bad request error
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest(message.into())
    }

    /// Create a not found error
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    /// Create an internal server error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Store(ArtifactStoreError::InvalidId(_)) => StatusCode::NOT_FOUND,
            Self::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Card(ref e) => match e {
                CardError::InvalidInput(_) => StatusCode::BAD_REQUEST,
                CardError::RenderFailure(_) => StatusCode::UNPROCESSABLE_ENTITY,
                CardError::ExternalServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
                CardError::LedgerRejected(_) => StatusCode::BAD_GATEWAY,
                CardError::EntropyUnavailable(_) | CardError::SerializationError(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
        }
    }

    /// Get the error code for programmatic error handling
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::BadRequest(_) => "INVALID_INPUT",
            Self::NotFound(_) => "NOT_FOUND",
            Self::Internal(_) => "INTERNAL_ERROR",
            Self::Store(ArtifactStoreError::InvalidId(_)) => "NOT_FOUND",
            Self::Store(_) => "STORAGE_ERROR",
            Self::Card(ref e) => match e {
                CardError::InvalidInput(_) => "INVALID_INPUT",
                CardError::RenderFailure(_) => "RENDER_FAILURE",
                CardError::ExternalServiceUnavailable(_) => "LEDGER_UNAVAILABLE",
                CardError::LedgerRejected(_) => "LEDGER_REJECTED",
                CardError::EntropyUnavailable(_) => "ENTROPY_UNAVAILABLE",
                CardError::SerializationError(_) => "SERIALIZATION_ERROR",
            },
        }
    }

    /// Get sanitized error message for client response
    fn client_message(&self) -> String {
        match self {
            Self::Card(ref e) => match e {
                // Input problems are safe to echo back
                CardError::InvalidInput(msg) => format!("Invalid input: {}", msg),
                CardError::RenderFailure(_) => "Image could not be processed".to_string(),
                CardError::ExternalServiceUnavailable(_) => {
                    "Ledger service unavailable".to_string()
                }
                CardError::LedgerRejected(_) => "Ledger rejected the request".to_string(),
                CardError::EntropyUnavailable(_) => "Entropy source unavailable".to_string(),
                CardError::SerializationError(_) => "Payload serialization error".to_string(),
            },
            Self::Store(ArtifactStoreError::InvalidId(_)) => "Card not found".to_string(),
            Self::Store(_) | Self::Internal(_) => "Internal server error".to_string(),
            _ => self.to_string(),
        }
    }

    /// Get the error category for logging
    fn error_category(&self) -> &'static str {
        match self {
            Self::BadRequest(_) => "bad_request",
            Self::NotFound(_) => "not_found",
            Self::Internal(_) => "internal",
            Self::Card(_) => "card",
            Self::Store(_) => "store",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let category = self.error_category();
        let code = self.error_code();
        let internal_message = self.to_string();
        let client_message = self.client_message();

        // Log based on severity, always including internal details
        if status.is_server_error() {
            tracing::error!(
                status = %status,
                category = category,
                code = code,
                error = %internal_message,
                client_message = %client_message,
                "Server error"
            );
        } else {
            tracing::warn!(
                status = %status,
                category = category,
                code = code,
                error = %internal_message,
                "Client error"
            );
        }

        // All error responses include a `code` field for programmatic error handling
        let body = serde_json::json!({
            "error": client_message,
            "code": code,
        });

        (status, Json(body)).into_response()
    }
}
