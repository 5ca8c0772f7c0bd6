//! Card registration handler
//!
//! Handles POST /api/register requests that turn a photo into a membership card.

use axum::{
    extract::{Multipart, State},
    Json,
};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use cardmark_core::AnchorStatus;
use chrono::{DateTime, Utc};
use serde::Serialize;

use super::WALLET_FIELD;
use crate::error::ApiError;
use crate::multipart::MultipartFields;
use crate::state::AppState;
use crate::validation::normalize_wallet_address;

/// Ledger result as seen by clients
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnchorView {
    /// "anchored", "skipped", or "failed"
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction_ref: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub credential_expires_at: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl From<AnchorStatus> for AnchorView {
    fn from(status: AnchorStatus) -> Self {
        match status {
            AnchorStatus::Anchored { tx, expires_at } => Self {
                status: "anchored",
                transaction_ref: Some(tx.0),
                credential_expires_at: Some(expires_at),
                reason: None,
            },
            AnchorStatus::Skipped { reason } => Self {
                status: "skipped",
                transaction_ref: None,
                credential_expires_at: None,
                reason: Some(reason),
            },
            AnchorStatus::Failed { reason } => Self {
                status: "failed",
                transaction_ref: None,
                credential_expires_at: None,
                reason: Some(reason),
            },
        }
    }
}

/// The rendered card and how to fetch it again
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MembershipCard {
    /// Id for GET /api/cards/{id}
    pub artifact_id: String,
    /// `data:image/jpeg;base64,...`
    pub image_data: String,
    /// Suggested download name
    pub filename: String,
    /// Base64 of the embedded payload JSON
    pub verification_data: String,
    /// When the stored copy stops being downloadable (RFC 3339)
    pub expires_at: String,
}

/// Response for successful registration
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterResponse {
    pub message: String,
    pub user_id: String,
    pub wallet_address: String,
    pub hash_prefix: String,
    pub salt_prefix: String,
    pub anchor: AnchorView,
    pub membership_card: MembershipCard,
}

/// Register a member and issue their card
///
/// Accepts multipart/form-data with:
/// - **image** (required): the member photo
/// - **walletAddress** (required): holder address for the ledger credential
///
/// A ledger failure does not fail the request: the card is returned with
/// `anchor.status = "failed"`.
pub async fn register_handler(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<RegisterResponse>, ApiError> {
    let mut fields = MultipartFields::parse(&mut multipart, state.max_file_size).await?;
    let wallet_address = normalize_wallet_address(fields.get_text(WALLET_FIELD))?
        .ok_or_else(|| ApiError::bad_request("walletAddress is required"))?;
    let image = fields.take_image()?;

    let user_id = state.registrar.clock().now_millis().to_string();
    tracing::info!(
        user_id = %user_id,
        wallet_address = %wallet_address,
        file_name = ?image.file_name,
        bytes = image.data.len(),
        "Registration started"
    );

    // Decode/resize/encode is CPU bound
    let registrar = state.registrar.clone();
    let subject = user_id.clone();
    let artifact = tokio::task::spawn_blocking(move || registrar.render(image.data, &subject))
        .await
        .map_err(|e| ApiError::internal(format!("Render task failed: {}", e)))??;

    // The card must be stored before a ledger credential can point at it
    let artifact_id = state.artifacts.put(&artifact.bytes).await?;

    let anchor = state
        .registrar
        .anchor(&artifact.payload, Some(wallet_address.as_str()))
        .await;

    let ttl = chrono::Duration::from_std(state.artifacts.ttl()).unwrap_or(chrono::Duration::zero());
    let expires_at: DateTime<Utc> = Utc::now() + ttl;

    let message = if anchor.is_anchored() {
        "Membership card issued"
    } else {
        "Membership card issued without ledger anchoring"
    };
    tracing::info!(
        user_id = %user_id,
        artifact_id = %artifact_id,
        anchored = anchor.is_anchored(),
        "Registration complete"
    );

    let payload = &artifact.payload;
    Ok(Json(RegisterResponse {
        message: message.to_string(),
        user_id: user_id.clone(),
        wallet_address,
        hash_prefix: payload.hash.clone(),
        salt_prefix: payload.salt.clone(),
        anchor: anchor.into(),
        membership_card: MembershipCard {
            artifact_id,
            image_data: format!("data:image/jpeg;base64,{}", BASE64.encode(&artifact.bytes)),
            filename: format!("member-{}.jpg", user_id),
            verification_data: BASE64.encode(payload.to_json()?),
            expires_at: expires_at.to_rfc3339(),
        },
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use cardmark_core::TxRef;

    #[test]
    fn test_anchor_view_shapes() {
        let anchored = serde_json::to_value(AnchorView::from(AnchorStatus::Anchored {
            tx: TxRef("0xfeed".into()),
            expires_at: 99,
        }))
        .unwrap();
        assert_eq!(anchored["status"], "anchored");
        assert_eq!(anchored["transactionRef"], "0xfeed");
        assert!(anchored.get("reason").is_none());

        let failed = serde_json::to_value(AnchorView::from(AnchorStatus::Failed {
            reason: "ledger call timed out".into(),
        }))
        .unwrap();
        assert_eq!(failed["status"], "failed");
        assert_eq!(failed["reason"], "ledger call timed out");
        assert!(failed.get("transactionRef").is_none());
    }
}
