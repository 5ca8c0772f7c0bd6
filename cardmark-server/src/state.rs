//! Application state module
//!
//! Defines shared state accessible across all request handlers.

use std::sync::Arc;

use cardmark_core::{
    CardError, CredentialDeriver, CredentialEmbedder, CredentialLedger, JpegCardRenderer,
    Registrar, Verifier,
};

use crate::artifact_store::ArtifactStore;
use crate::config::Config;

/// Application state containing shared resources.
#[derive(Clone)]
pub struct AppState {
    /// Issues cards and anchors them on the ledger
    pub registrar: Arc<Registrar>,
    /// Extracts payloads and checks ownership
    pub verifier: Arc<Verifier>,
    /// Rendered cards awaiting download
    pub artifacts: Arc<ArtifactStore>,
    /// Maximum accepted image size in bytes
    pub max_file_size: usize,
}

impl AppState {
    /// Wire the card pipeline from configuration.
    ///
    /// `ledger` is passed in rather than built here so tests can inject an
    /// in-memory ledger.
    pub fn new(
        config: &Config,
        ledger: Option<Arc<dyn CredentialLedger>>,
        artifacts: Arc<ArtifactStore>,
    ) -> Result<Self, CardError> {
        Self::with_deriver(
            config,
            CredentialDeriver::with_system_sources(),
            ledger,
            artifacts,
        )
    }

    /// Same as [`AppState::new`] with an explicit clock and entropy source.
    pub fn with_deriver(
        config: &Config,
        deriver: CredentialDeriver,
        ledger: Option<Arc<dyn CredentialLedger>>,
        artifacts: Arc<ArtifactStore>,
    ) -> Result<Self, CardError> {
        let renderer = Arc::new(JpegCardRenderer::new(config.render_config())?);
        let embedder = CredentialEmbedder::new(renderer);

        let mut registrar = Registrar::new(deriver, embedder.clone())
            .with_validity(config.credential_validity())
            .with_ledger_timeout(config.ledger_timeout());
        if let Some(ledger) = &ledger {
            registrar = registrar.with_ledger(ledger.clone(), config.ledger_issuer_address.clone());
        }

        let verifier = Verifier::new(embedder, ledger).with_ledger_timeout(config.ledger_timeout());

        Ok(Self {
            registrar: Arc::new(registrar),
            verifier: Arc::new(verifier),
            artifacts,
            max_file_size: config.max_file_size(),
        })
    }
}
