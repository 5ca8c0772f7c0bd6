//! Server configuration module
//!
//! Handles loading configuration from environment variables with sensible defaults.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use cardmark_core::{CardError, CredentialLedger, HttpLedger, HttpLedgerConfig, RenderConfig};

/// Server configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    /// Server port (default: 3001)
    pub port: u16,
    /// Server host (default: 127.0.0.1)
    pub host: [u8; 4],
    /// Allowed CORS origins, comma-separated (default: allow all in dev)
    pub allowed_origins: Option<Vec<String>>,
    /// Request body limit in MB (default: 20)
    pub body_limit_mb: usize,
    /// Maximum image size per upload in MB (default: 10)
    pub max_file_size_mb: usize,
    /// Request timeout in seconds (default: 30)
    pub timeout_secs: u64,
    /// Enable rate limiting (default: false for tests, true when loaded from env)
    pub rate_limit_enabled: bool,
    /// Rate limit: requests per second (default: 10)
    pub rate_limit_per_sec: u64,
    /// Rate limit: burst size (default: 20)
    pub rate_limit_burst: u32,
    /// Directory holding rendered cards until they expire
    pub artifact_dir: PathBuf,
    /// How long a rendered card stays downloadable, in seconds (default: 1800)
    pub artifact_ttl_secs: u64,
    /// How often the janitor sweeps the artifact directory (default: 60)
    pub janitor_interval_secs: u64,
    /// Ledger gateway base URL (anchoring disabled when unset)
    pub ledger_url: Option<String>,
    /// Bearer token for the ledger gateway
    pub ledger_api_key: Option<String>,
    /// Issuer address checked against the ledger before anchoring
    pub ledger_issuer_address: Option<String>,
    /// Per-call ledger timeout in seconds (default: 10)
    pub ledger_timeout_secs: u64,
    /// Credential validity in days (default: 365)
    pub credential_validity_days: u64,
    /// JPEG quality for rendered cards (default: 90)
    pub jpeg_quality: u8,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 3001,
            host: [127, 0, 0, 1],
            allowed_origins: None, // None = allow all (dev mode)
            body_limit_mb: 20,
            max_file_size_mb: 10,
            timeout_secs: 30,
            rate_limit_enabled: false, // Disabled by default (for tests)
            rate_limit_per_sec: 10,
            rate_limit_burst: 20,
            artifact_dir: std::env::temp_dir().join("cardmark-artifacts"),
            artifact_ttl_secs: 30 * 60,
            janitor_interval_secs: 60,
            ledger_url: None,
            ledger_api_key: None,
            ledger_issuer_address: None,
            ledger_timeout_secs: 10,
            credential_validity_days: 365,
            jpeg_quality: 90,
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.trim().parse().ok())
}

fn env_string(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let host = std::env::var("HOST")
            .ok()
            .map(|h| {
                if h == "0.0.0.0" {
                    [0, 0, 0, 0]
                } else {
                    [127, 0, 0, 1]
                }
            })
            .unwrap_or(defaults.host);

        let allowed_origins = std::env::var("ALLOWED_ORIGINS").ok().map(|origins| {
            origins
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect()
        });

        // Rate limiting enabled by default in production, can be disabled with RATE_LIMIT_ENABLED=false
        let rate_limit_enabled = std::env::var("RATE_LIMIT_ENABLED")
            .map(|v| v.to_lowercase() != "false")
            .unwrap_or(true);

        Self {
            port: env_parse("PORT").unwrap_or(defaults.port),
            host,
            allowed_origins,
            body_limit_mb: env_parse("BODY_LIMIT_MB").unwrap_or(defaults.body_limit_mb),
            max_file_size_mb: env_parse("MAX_FILE_SIZE_MB").unwrap_or(defaults.max_file_size_mb),
            timeout_secs: env_parse("REQUEST_TIMEOUT_SECS").unwrap_or(defaults.timeout_secs),
            rate_limit_enabled,
            rate_limit_per_sec: env_parse("RATE_LIMIT_PER_SEC")
                .unwrap_or(defaults.rate_limit_per_sec),
            rate_limit_burst: env_parse("RATE_LIMIT_BURST").unwrap_or(defaults.rate_limit_burst),
            artifact_dir: env_string("ARTIFACT_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.artifact_dir),
            artifact_ttl_secs: env_parse("ARTIFACT_TTL_SECS").unwrap_or(defaults.artifact_ttl_secs),
            janitor_interval_secs: env_parse("JANITOR_INTERVAL_SECS")
                .unwrap_or(defaults.janitor_interval_secs),
            ledger_url: env_string("LEDGER_URL"),
            ledger_api_key: env_string("LEDGER_API_KEY"),
            ledger_issuer_address: env_string("LEDGER_ISSUER_ADDRESS"),
            ledger_timeout_secs: env_parse("LEDGER_TIMEOUT_SECS")
                .unwrap_or(defaults.ledger_timeout_secs),
            credential_validity_days: env_parse("CREDENTIAL_VALIDITY_DAYS")
                .unwrap_or(defaults.credential_validity_days),
            jpeg_quality: env_parse("JPEG_QUALITY").unwrap_or(defaults.jpeg_quality),
        }
    }

    /// Get socket address from config
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::from((self.host, self.port))
    }

    pub fn max_file_size(&self) -> usize {
        self.max_file_size_mb * 1024 * 1024
    }

    pub fn artifact_ttl(&self) -> Duration {
        Duration::from_secs(self.artifact_ttl_secs)
    }

    pub fn janitor_interval(&self) -> Duration {
        Duration::from_secs(self.janitor_interval_secs.max(1))
    }

    pub fn ledger_timeout(&self) -> Duration {
        Duration::from_secs(self.ledger_timeout_secs)
    }

    pub fn credential_validity(&self) -> Duration {
        Duration::from_secs(self.credential_validity_days.saturating_mul(24 * 60 * 60))
    }

    pub fn render_config(&self) -> RenderConfig {
        RenderConfig {
            jpeg_quality: self.jpeg_quality,
            ..RenderConfig::default()
        }
    }

    /// Build the ledger gateway client, if one is configured.
    pub fn build_ledger(&self) -> Result<Option<Arc<dyn CredentialLedger>>, CardError> {
        let Some(url) = &self.ledger_url else {
            return Ok(None);
        };

        let mut ledger_config = HttpLedgerConfig::new(url.as_str());
        ledger_config.api_key = self.ledger_api_key.clone();
        ledger_config.timeout = self.ledger_timeout();

        Ok(Some(Arc::new(HttpLedger::new(ledger_config)?)))
    }
}
