//! Card registration: derive, embed, then optionally anchor on the ledger.
//!
//! Anchoring happens after the card exists. If it fails the card is still a
//! valid, verifiable object; the failure is reported as
//! [`AnchorStatus::Failed`] instead of an error so callers can tell a partial
//! registration from a total failure.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, info, instrument, warn};
use zeroize::Zeroizing;

use crate::derive::CredentialDeriver;
use crate::embed::{CredentialEmbedder, DerivativeArtifact};
use crate::entropy::Clock;
use crate::error::{CardError, Result};
use crate::ledger::{CredentialLedger, TxRef, DEFAULT_VALIDITY_SECS};
use crate::payload::VerificationPayload;
use crate::verify::DEFAULT_LEDGER_TIMEOUT;

/// Ledger outcome of one registration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AnchorStatus {
    /// Credential issued on the ledger.
    Anchored {
        #[serde(rename = "transactionRef")]
        tx: TxRef,
        #[serde(rename = "expiresAt")]
        expires_at: u64,
    },
    /// Anchoring was not attempted.
    Skipped { reason: String },
    /// Anchoring was attempted and failed; the card itself is valid.
    Failed { reason: String },
}

impl AnchorStatus {
    pub fn is_anchored(&self) -> bool {
        matches!(self, Self::Anchored { .. })
    }
}

/// A finished registration.
#[derive(Debug, Clone)]
pub struct Registration {
    pub artifact: DerivativeArtifact,
    pub anchor: AnchorStatus,
}

impl Registration {
    pub fn payload(&self) -> &VerificationPayload {
        &self.artifact.payload
    }
}

/// Issues cards.
#[derive(Clone)]
pub struct Registrar {
    deriver: CredentialDeriver,
    embedder: CredentialEmbedder,
    ledger: Option<Arc<dyn CredentialLedger>>,
    issuer: Option<String>,
    validity_secs: u64,
    ledger_timeout: Duration,
}

impl Registrar {
    pub fn new(deriver: CredentialDeriver, embedder: CredentialEmbedder) -> Self {
        Self {
            deriver,
            embedder,
            ledger: None,
            issuer: None,
            validity_secs: DEFAULT_VALIDITY_SECS,
            ledger_timeout: DEFAULT_LEDGER_TIMEOUT,
        }
    }

    /// Anchor cards on `ledger`, checking that `issuer` is authorized first.
    pub fn with_ledger(
        mut self,
        ledger: Arc<dyn CredentialLedger>,
        issuer: Option<String>,
    ) -> Self {
        self.ledger = Some(ledger);
        self.issuer = issuer;
        self
    }

    pub fn with_validity(mut self, validity: Duration) -> Self {
        self.validity_secs = validity.as_secs();
        self
    }

    pub fn with_ledger_timeout(mut self, timeout: Duration) -> Self {
        self.ledger_timeout = timeout;
        self
    }

    /// Clock used for payload timestamps and credential expiry.
    pub fn clock(&self) -> &dyn Clock {
        self.deriver.clock()
    }

    pub fn has_ledger(&self) -> bool {
        self.ledger.is_some()
    }

    /// Derive and embed. CPU bound; the original image is wiped before returning.
    #[instrument(skip(self, image), fields(image_bytes = image.len()))]
    pub fn render(&self, image: Vec<u8>, subject_id: &str) -> Result<DerivativeArtifact> {
        let image = Zeroizing::new(image);
        let derived = self.deriver.derive(&image, subject_id)?;
        let artifact = self.embedder.embed(&image, &derived.payload)?;
        drop(image);
        debug!("Original image wiped");
        Ok(artifact)
    }

    /// Issue the ledger credential for an embedded payload.
    pub async fn anchor(&self, payload: &VerificationPayload, holder: Option<&str>) -> AnchorStatus {
        let Some(ledger) = &self.ledger else {
            return AnchorStatus::Skipped {
                reason: "ledger not configured".into(),
            };
        };
        let Some(holder) = holder.map(str::trim).filter(|h| !h.is_empty()) else {
            return AnchorStatus::Skipped {
                reason: "no holder address supplied".into(),
            };
        };

        if let Some(issuer) = &self.issuer {
            match self.bounded(ledger.is_authorized_issuer(issuer)).await {
                Ok(true) => {}
                Ok(false) => {
                    warn!(issuer = %issuer, "Issuer not authorized on ledger");
                    return AnchorStatus::Failed {
                        reason: "issuer is not authorized".into(),
                    };
                }
                Err(e) => return failed(ledger.name(), e),
            }
        }

        let now_secs = self.deriver.clock().now_millis() / 1000;
        let expires_at = now_secs.saturating_add(self.validity_secs);
        match self
            .bounded(ledger.issue_credential(holder, &payload.hash, expires_at))
            .await
        {
            Ok(tx) => {
                info!(tx = %tx, holder, expires_at, "Card anchored");
                AnchorStatus::Anchored { tx, expires_at }
            }
            Err(e) => failed(ledger.name(), e),
        }
    }

    /// Full registration for callers without a worker pool.
    pub async fn register(
        &self,
        image: Vec<u8>,
        subject_id: &str,
        holder: Option<&str>,
    ) -> Result<Registration> {
        let artifact = self.render(image, subject_id)?;
        let anchor = self.anchor(&artifact.payload, holder).await;
        Ok(Registration { artifact, anchor })
    }

    async fn bounded<T>(
        &self,
        call: impl std::future::Future<Output = Result<T>>,
    ) -> Result<T> {
        tokio::time::timeout(self.ledger_timeout, call)
            .await
            .map_err(|_| CardError::ExternalServiceUnavailable("ledger call timed out".into()))?
    }
}

fn failed(ledger: &str, err: CardError) -> AnchorStatus {
    warn!(ledger, error = %err, "Anchoring failed, card remains valid");
    AnchorStatus::Failed {
        reason: err.to_string(),
    }
}
