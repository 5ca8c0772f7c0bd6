//! Credential ledger seam.
//!
//! The ledger is an external collaborator holding one [`CredentialRecord`]
//! per issued card. The core never mutates records in memory; it issues
//! through [`CredentialLedger::issue_credential`] and reads them back for
//! ownership checks.
//!
//! Identifiers follow the on-chain encoding: a string reference is mapped to
//! a `bytes32` key as `keccak256(utf8(reference))`. Cards use their 16-char
//! hash prefix as reference, so the prefix read from a card is enough to look
//! its record up.
//!
//! - **InMemoryLedger** - process-local fake (tests, demos, CLI)
//! - **HttpLedger** - JSON client for a ledger gateway that owns the signing wallet

#[cfg(feature = "network")]
mod http;
mod memory;

#[cfg(feature = "network")]
pub use http::{HttpLedger, HttpLedgerConfig};
pub use memory::InMemoryLedger;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sha3::{Digest, Keccak256};

use crate::error::Result;

/// Default credential validity (365 days, in seconds).
pub const DEFAULT_VALIDITY_SECS: u64 = 365 * 24 * 60 * 60;

/// Ledger-owned record of one issued credential.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialRecord {
    /// `0x`-prefixed keccak256 of the image hash reference
    pub image_hash: String,
    /// Holder address
    pub holder: String,
    /// Issuer address
    pub issuer: String,
    /// Issuance time (Unix seconds)
    pub issued_at: u64,
    /// Expiry time (Unix seconds)
    pub expires_at: u64,
    pub active: bool,
}

impl CredentialRecord {
    /// Active and not yet expired at `now_secs`.
    pub fn is_current(&self, now_secs: u64) -> bool {
        self.active && self.expires_at > now_secs
    }

    pub fn held_by(&self, holder: &str) -> bool {
        self.holder.eq_ignore_ascii_case(holder.trim())
    }
}

/// Reference to a ledger transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TxRef(pub String);

impl std::fmt::Display for TxRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Map a string reference to its `0x`-prefixed `bytes32` ledger key.
pub fn bytes32_key(reference: &str) -> String {
    format!("0x{}", hex::encode(Keccak256::digest(reference.as_bytes())))
}

/// Remote credential registry.
///
/// All calls are fallible remote operations; callers bound them with a
/// timeout and never compensate a failed issuance.
#[async_trait]
pub trait CredentialLedger: Send + Sync {
    /// Issue a credential binding `image_hash_ref` to `holder` until `expires_at` (Unix seconds).
    async fn issue_credential(
        &self,
        holder: &str,
        image_hash_ref: &str,
        expires_at: u64,
    ) -> Result<TxRef>;

    async fn is_authorized_issuer(&self, issuer: &str) -> Result<bool>;

    /// Look up the credential issued for `credential_id` (an image hash reference).
    async fn get_credential(&self, credential_id: &str) -> Result<Option<CredentialRecord>>;

    async fn is_credential_active(&self, credential_id: &str) -> Result<bool> {
        Ok(self
            .get_credential(credential_id)
            .await?
            .map(|record| record.active)
            .unwrap_or(false))
    }

    /// Short name for logs.
    fn name(&self) -> &'static str;
}
