//! Cardmark Core - salted image credentials for membership cards
//!
//! This crate issues and verifies photographic membership cards. A card is a
//! derivative image carrying a compact verification payload that ties it to
//! a salted hash of the original photo and, optionally, to a ledger record.
//!
//! # Features
//!
//! - Salted SHA-256 content hashing with injected clock and entropy
//! - Payload embedding in EXIF metadata plus a low-visibility pixel strip
//! - Extraction that classifies cards as valid, malformed, or absent
//! - Advisory ownership checks against a credential ledger
//! - Original images wiped from memory once the card is rendered
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use cardmark_core::{
//!     CredentialDeriver, CredentialEmbedder, JpegCardRenderer, Registrar, Verifier,
//! };
//!
//! # async fn example(photo: Vec<u8>) -> cardmark_core::Result<()> {
//! let embedder = CredentialEmbedder::new(Arc::new(JpegCardRenderer::default()));
//! let registrar = Registrar::new(CredentialDeriver::with_system_sources(), embedder.clone());
//!
//! let registration = registrar.register(photo, "1700000000000", None).await?;
//!
//! let verifier = Verifier::new(embedder, None);
//! let outcome = verifier.verify(&registration.artifact.bytes, None).await;
//! assert!(outcome.is_valid());
//! # Ok(())
//! # }
//! ```

pub mod derive;
pub mod embed;
pub mod entropy;
pub mod error;
pub mod ledger;
pub mod payload;
pub mod register;
pub mod render;
pub mod verify;

// Re-export main types for convenience
pub use derive::{derive_credential, ContentHash, CredentialDeriver, DerivedCredential, Salt};
pub use embed::{
    extract_payload, CardLayout, CredentialEmbedder, DerivativeArtifact, VerificationResult,
};
pub use entropy::{Clock, EntropySource, FixedClock, MockEntropy, OsEntropy, SystemClock};
pub use error::{CardError, Result, PAYLOAD_MARKER, PREFIX_LEN};
pub use ledger::{bytes32_key, CredentialLedger, CredentialRecord, InMemoryLedger, TxRef};
pub use payload::VerificationPayload;
pub use register::{AnchorStatus, Registrar, Registration};
pub use render::{CardRenderer, JpegCardRenderer, MetadataFields, RenderConfig};
pub use verify::{InvalidReason, OwnershipCheck, VerificationOutcome, Verifier};

#[cfg(feature = "network")]
pub use ledger::{HttpLedger, HttpLedgerConfig};
