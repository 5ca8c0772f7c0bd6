//! In-process ledger for tests and local runs.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::{DashMap, DashSet};
use sha3::{Digest, Keccak256};
use tracing::info;

use super::{bytes32_key, CredentialLedger, CredentialRecord, TxRef};
use crate::entropy::{Clock, SystemClock};
use crate::error::{CardError, Result};

/// Ledger held in memory. Records are keyed by `bytes32_key(image_hash_ref)`.
pub struct InMemoryLedger {
    issuer: String,
    clock: Arc<dyn Clock>,
    records: DashMap<String, CredentialRecord>,
    issuers: DashSet<String>,
    nonce: AtomicU64,
}

impl InMemoryLedger {
    /// Ledger whose signing issuer is `issuer`, already authorized.
    pub fn new(issuer: impl Into<String>) -> Self {
        Self::with_clock(issuer, Arc::new(SystemClock))
    }

    pub fn with_clock(issuer: impl Into<String>, clock: Arc<dyn Clock>) -> Self {
        let issuer = issuer.into().to_lowercase();
        let issuers = DashSet::new();
        issuers.insert(issuer.clone());
        Self {
            issuer,
            clock,
            records: DashMap::new(),
            issuers,
            nonce: AtomicU64::new(0),
        }
    }

    pub fn authorize_issuer(&self, issuer: &str) {
        self.issuers.insert(issuer.to_lowercase());
    }

    pub fn revoke_issuer(&self, issuer: &str) {
        self.issuers.remove(&issuer.to_lowercase());
    }

    /// Deactivate a credential. Returns `false` if it does not exist.
    pub fn revoke(&self, credential_id: &str) -> bool {
        match self.records.get_mut(&bytes32_key(credential_id)) {
            Some(mut record) => {
                record.active = false;
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[async_trait]
impl CredentialLedger for InMemoryLedger {
    async fn issue_credential(
        &self,
        holder: &str,
        image_hash_ref: &str,
        expires_at: u64,
    ) -> Result<TxRef> {
        if !self.issuers.contains(&self.issuer) {
            return Err(CardError::LedgerRejected(format!(
                "issuer {} is not authorized",
                self.issuer
            )));
        }

        let key = bytes32_key(image_hash_ref);
        let issued_at = self.clock.now_millis() / 1000;
        let nonce = self.nonce.fetch_add(1, Ordering::Relaxed);

        let mut hasher = Keccak256::new();
        hasher.update(key.as_bytes());
        hasher.update(holder.as_bytes());
        hasher.update(nonce.to_be_bytes());
        let tx = TxRef(format!("0x{}", hex::encode(hasher.finalize())));

        self.records.insert(
            key.clone(),
            CredentialRecord {
                image_hash: key,
                holder: holder.trim().to_lowercase(),
                issuer: self.issuer.clone(),
                issued_at,
                expires_at,
                active: true,
            },
        );

        info!(tx = %tx, holder, "Credential issued (in-memory ledger)");
        Ok(tx)
    }

    async fn is_authorized_issuer(&self, issuer: &str) -> Result<bool> {
        Ok(self.issuers.contains(&issuer.to_lowercase()))
    }

    async fn get_credential(&self, credential_id: &str) -> Result<Option<CredentialRecord>> {
        Ok(self
            .records
            .get(&bytes32_key(credential_id))
            .map(|r| r.value().clone()))
    }

    fn name(&self) -> &'static str {
        "in-memory"
    }
}
