//! Salted content hashing for card registration.
//!
//! ```text
//! salt         = sha256(subject_id || decimal(now_ms) || entropy[32])   -> 64 hex
//! content_hash = sha256(image_bytes || utf8(salt_hex))                  -> 64 hex
//! payload      = { subject_id, now_ms, content_hash[..16], salt[..16] }
//! ```
//!
//! Only the payload leaves this module in a form meant for storage; the full
//! salt and hash are wiped from memory when the [`DerivedCredential`] drops.

use std::fmt;
use std::sync::Arc;

use sha2::{Digest, Sha256};
use tracing::debug;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::entropy::{Clock, EntropySource, OsEntropy, SystemClock};
use crate::error::{CardError, Result, PREFIX_LEN};
use crate::payload::VerificationPayload;

/// Hex length of a SHA-256 digest.
pub const DIGEST_HEX_LEN: usize = 64;

/// Per-registration salt, hex encoded.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct Salt(String);

/// SHA-256 over image bytes and salt, hex encoded.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct ContentHash(String);

macro_rules! hex_secret {
    ($ty:ident) => {
        impl $ty {
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Leading [`PREFIX_LEN`] hex chars, the only part that may be stored.
            pub fn prefix(&self) -> &str {
                &self.0[..PREFIX_LEN]
            }
        }

        impl fmt::Debug for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({}...)", stringify!($ty), self.prefix())
            }
        }
    };
}

hex_secret!(Salt);
hex_secret!(ContentHash);

/// Result of deriving a credential from one registration.
#[derive(Debug, Clone)]
pub struct DerivedCredential {
    pub salt: Salt,
    pub content_hash: ContentHash,
    pub payload: VerificationPayload,
}

/// Derives salted content hashes using injected clock and entropy sources.
#[derive(Clone)]
pub struct CredentialDeriver {
    clock: Arc<dyn Clock>,
    entropy: Arc<dyn EntropySource>,
}

impl CredentialDeriver {
    pub fn new(clock: Arc<dyn Clock>, entropy: Arc<dyn EntropySource>) -> Self {
        Self { clock, entropy }
    }

    /// Deriver backed by the system clock and the OS generator.
    pub fn with_system_sources() -> Self {
        Self::new(Arc::new(SystemClock), Arc::new(OsEntropy))
    }

    pub fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    pub fn derive(&self, image_bytes: &[u8], subject_id: &str) -> Result<DerivedCredential> {
        derive_credential(
            image_bytes,
            subject_id,
            self.clock.as_ref(),
            self.entropy.as_ref(),
        )
    }
}

impl Default for CredentialDeriver {
    fn default() -> Self {
        Self::with_system_sources()
    }
}

/// Derive salt, content hash, and payload for one registration.
///
/// Fails with `InvalidInput` on an empty image or a blank subject id, and with
/// `EntropyUnavailable` if the entropy source cannot produce a draw.
pub fn derive_credential(
    image_bytes: &[u8],
    subject_id: &str,
    clock: &dyn Clock,
    entropy: &dyn EntropySource,
) -> Result<DerivedCredential> {
    if image_bytes.is_empty() {
        return Err(CardError::InvalidInput("image bytes are empty".into()));
    }
    if subject_id.trim().is_empty() {
        return Err(CardError::InvalidInput("subject id is empty".into()));
    }

    let now_ms = clock.now_millis();
    let mut draw = entropy.draw()?;

    let mut hasher = Sha256::new();
    hasher.update(subject_id.as_bytes());
    hasher.update(now_ms.to_string().as_bytes());
    hasher.update(draw);
    let salt = Salt(hex::encode(hasher.finalize()));
    draw.zeroize();

    let mut hasher = Sha256::new();
    hasher.update(image_bytes);
    hasher.update(salt.as_str().as_bytes());
    let content_hash = ContentHash(hex::encode(hasher.finalize()));

    let payload = VerificationPayload {
        user_id: subject_id.to_string(),
        timestamp: now_ms,
        hash: content_hash.prefix().to_string(),
        salt: salt.prefix().to_string(),
    };

    debug!(
        subject_id,
        entropy_source = %entropy.source_id(),
        hash_prefix = %payload.hash,
        "Derived card credential"
    );

    Ok(DerivedCredential {
        salt,
        content_hash,
        payload,
    })
}
