//! Common utility functions shared across CLI commands.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use cardmark_core::{
    CredentialEmbedder, CredentialLedger, HttpLedger, HttpLedgerConfig, JpegCardRenderer,
};
use chrono::{TimeZone, Utc};
use tracing::debug;

/// Ledger connection options shared by commands that talk to a ledger.
#[derive(Debug, Clone, clap::Args)]
pub struct LedgerArgs {
    /// Ledger gateway base URL (anchoring and ownership checks are skipped without it)
    #[arg(long, value_name = "URL")]
    pub ledger_url: Option<String>,

    /// Bearer token for the ledger gateway
    #[arg(long, value_name = "TOKEN", requires = "ledger_url")]
    pub ledger_api_key: Option<String>,

    /// Per-call ledger timeout in seconds
    #[arg(long, value_name = "SECS", default_value_t = 10)]
    pub ledger_timeout: u64,
}

impl LedgerArgs {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.ledger_timeout)
    }

    /// Build the gateway client when a URL was given.
    pub fn build(&self) -> Result<Option<Arc<dyn CredentialLedger>>> {
        let Some(url) = &self.ledger_url else {
            return Ok(None);
        };

        let mut config = HttpLedgerConfig::new(url.as_str());
        config.api_key = self.ledger_api_key.clone();
        config.timeout = self.timeout();
        debug!(?config, "Using ledger gateway");

        let ledger = HttpLedger::new(config).context("Failed to create ledger client")?;
        Ok(Some(Arc::new(ledger)))
    }
}

/// Embedder backed by the default JPEG renderer.
pub fn default_embedder() -> CredentialEmbedder {
    CredentialEmbedder::new(Arc::new(JpegCardRenderer::default()))
}

/// Read an input file with a uniform error message.
pub fn read_input(path: &Path, what: &str) -> Result<Vec<u8>> {
    let bytes = std::fs::read(path)
        .with_context(|| format!("Failed to read {}: {}", what, path.display()))?;
    debug!(path = %path.display(), bytes = bytes.len(), "Read {}", what);
    Ok(bytes)
}

/// Build the card output path from the photo path.
///
/// Transforms `photo.png` into `photo.card.jpg`.
pub fn build_card_path(image: &Path) -> PathBuf {
    let stem = image
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("card");
    image.with_file_name(format!("{}.card.jpg", stem))
}

/// Format a Unix timestamp (milliseconds) as a human-readable UTC string.
pub fn format_timestamp(timestamp_ms: u64) -> String {
    let secs = (timestamp_ms / 1000) as i64;
    let nsecs = ((timestamp_ms % 1000) * 1_000_000) as u32;
    match Utc.timestamp_opt(secs, nsecs) {
        chrono::LocalResult::Single(dt) => dt.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
        _ => format!("{}ms", timestamp_ms),
    }
}
