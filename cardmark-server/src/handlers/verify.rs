//! Card verification handler
//!
//! Handles POST /api/verify requests that check an uploaded card.

use axum::{
    extract::{Multipart, State},
    Json,
};
use cardmark_core::{
    InvalidReason, OwnershipCheck, VerificationOutcome, VerificationPayload,
};
use serde::Serialize;

use super::WALLET_FIELD;
use crate::error::ApiError;
use crate::multipart::MultipartFields;
use crate::state::AppState;
use crate::validation::normalize_wallet_address;

/// Response for verification
///
/// Invalid cards are a normal 200 response with `valid = false`; only
/// system failures become error responses.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyResponse {
    pub valid: bool,
    pub message: String,
    /// "valid", "malformed", or "absent"
    pub outcome: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<VerificationPayload>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub ownership_verified: bool,
    pub ownership: OwnershipCheck,
    pub wallet_address: Option<String>,
}

impl VerifyResponse {
    fn from_outcome(outcome: VerificationOutcome, wallet_address: Option<String>) -> Self {
        let ownership_verified = outcome.ownership_verified();
        match outcome {
            VerificationOutcome::Valid { payload, ownership } => Self {
                valid: true,
                message: if ownership_verified {
                    "Valid membership card (ownership confirmed)".to_string()
                } else {
                    "Valid membership card".to_string()
                },
                outcome: "valid",
                data: Some(payload),
                reason: None,
                ownership_verified,
                ownership,
                wallet_address,
            },
            VerificationOutcome::Invalid { reason } => Self {
                valid: false,
                message: "Invalid membership card".to_string(),
                outcome: match reason {
                    InvalidReason::Absent => "absent",
                    InvalidReason::Malformed(_) => "malformed",
                },
                data: None,
                reason: Some(reason.description().to_string()),
                ownership_verified: false,
                ownership: OwnershipCheck::NotRequested,
                wallet_address,
            },
        }
    }
}

/// Verify a membership card
///
/// Accepts multipart/form-data with:
/// - **image** (required): the card to check
/// - **walletAddress** (optional): holder address for the ownership check
pub async fn verify_handler(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<VerifyResponse>, ApiError> {
    let mut fields = MultipartFields::parse(&mut multipart, state.max_file_size).await?;
    let wallet_address = normalize_wallet_address(fields.get_text(WALLET_FIELD))?;
    let image = fields.take_image()?;

    tracing::info!(
        file_name = ?image.file_name,
        bytes = image.data.len(),
        wallet_address = ?wallet_address,
        "Verification started"
    );

    let verifier = state.verifier.clone();
    let extracted = tokio::task::spawn_blocking(move || verifier.embedder().extract(&image.data))
        .await
        .map_err(|e| ApiError::internal(format!("Extraction task failed: {}", e)))?;

    let outcome = state
        .verifier
        .classify(extracted, wallet_address.as_deref())
        .await;

    Ok(Json(VerifyResponse::from_outcome(outcome, wallet_address)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload() -> VerificationPayload {
        VerificationPayload {
            user_id: "1700000000000".into(),
            timestamp: 1_700_000_000_123,
            hash: "0123456789abcdef".into(),
            salt: "fedcba9876543210".into(),
        }
    }

    #[test]
    fn test_valid_outcome_response() {
        let response = VerifyResponse::from_outcome(
            VerificationOutcome::Valid {
                payload: payload(),
                ownership: OwnershipCheck::Unavailable("ledger call timed out".into()),
            },
            Some("0xabc".into()),
        );
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["valid"], true);
        assert_eq!(json["ownershipVerified"], false);
        assert_eq!(json["ownership"]["status"], "unavailable");
        assert_eq!(json["data"]["userId"], "1700000000000");
        assert_eq!(json["walletAddress"], "0xabc");
    }

    #[test]
    fn test_malformed_outcome_response() {
        let response = VerifyResponse::from_outcome(
            VerificationOutcome::Invalid {
                reason: InvalidReason::Malformed("payload present but not parseable".into()),
            },
            None,
        );
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["valid"], false);
        assert_eq!(json["outcome"], "malformed");
        assert_eq!(json["reason"], "payload present but not parseable");
        assert!(json.get("data").is_none());
        assert!(json["walletAddress"].is_null());
    }
}
