//! JSON client for a credential ledger gateway.
//!
//! The gateway fronts the on-chain registry and owns the signing wallet, so
//! this client never handles keys. Endpoints:
//!
//! - `POST {base}/credentials` `{imageHash, holder, expiresAt}` -> `{transactionHash}`
//! - `GET  {base}/issuers/{address}` -> `{authorized}`
//! - `GET  {base}/credentials/{bytes32}` -> [`CredentialRecord`] or 404

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode, Url};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use super::{bytes32_key, CredentialLedger, CredentialRecord, TxRef};
use crate::error::{CardError, Result};

/// Configuration for the ledger gateway client.
#[derive(Clone)]
pub struct HttpLedgerConfig {
    /// Gateway base URL, without trailing slash
    pub base_url: String,
    /// Bearer token for the gateway
    pub api_key: Option<String>,
    /// Per-request timeout
    pub timeout: Duration,
}

impl std::fmt::Debug for HttpLedgerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpLedgerConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl HttpLedgerConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: None,
            timeout: Duration::from_secs(10),
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct IssueRequest<'a> {
    image_hash: String,
    holder: &'a str,
    expires_at: u64,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct IssueResponse {
    transaction_hash: String,
}

#[derive(Deserialize)]
struct IssuerResponse {
    authorized: bool,
}

/// Ledger gateway client.
pub struct HttpLedger {
    client: Client,
    config: HttpLedgerConfig,
}

impl HttpLedger {
    pub fn new(config: HttpLedgerConfig) -> Result<Self> {
        if config.base_url.is_empty() {
            return Err(CardError::InvalidInput("ledger base URL is empty".into()));
        }

        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| {
                CardError::ExternalServiceUnavailable(format!("Failed to create HTTP client: {e}"))
            })?;

        Ok(Self { client, config })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url, path)
    }

    /// `{base}/issuers/{issuer}` with the issuer percent-encoded as one path segment.
    fn issuer_url(&self, issuer: &str) -> Result<Url> {
        let mut url = Url::parse(&self.url("/issuers"))
            .map_err(|e| CardError::InvalidInput(format!("invalid ledger base URL: {e}")))?;
        url.path_segments_mut()
            .map_err(|_| CardError::InvalidInput("ledger base URL cannot carry a path".into()))?
            .push(issuer);
        Ok(url)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.config.api_key {
            Some(key) => request.bearer_auth(key),
            None => request,
        }
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response> {
        let response = self.authorize(request).send().await?;
        let status = response.status();
        if status.is_success() || status == StatusCode::NOT_FOUND {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        warn!(status = %status, body = %body, "Ledger gateway error");
        if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS {
            Err(CardError::ExternalServiceUnavailable(format!(
                "ledger gateway returned {status}"
            )))
        } else {
            Err(CardError::LedgerRejected(format!(
                "ledger gateway returned {status}: {body}"
            )))
        }
    }
}

#[async_trait]
impl CredentialLedger for HttpLedger {
    #[instrument(skip(self))]
    async fn issue_credential(
        &self,
        holder: &str,
        image_hash_ref: &str,
        expires_at: u64,
    ) -> Result<TxRef> {
        let body = IssueRequest {
            image_hash: bytes32_key(image_hash_ref),
            holder,
            expires_at,
        };
        let response = self
            .send(self.client.post(self.url("/credentials")).json(&body))
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(CardError::LedgerRejected(
                "credential endpoint not found".into(),
            ));
        }

        let issued: IssueResponse = response.json().await?;
        debug!(tx = %issued.transaction_hash, "Credential issued");
        Ok(TxRef(issued.transaction_hash))
    }

    async fn is_authorized_issuer(&self, issuer: &str) -> Result<bool> {
        let response = self
            .send(self.client.get(self.issuer_url(issuer)?))
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(false);
        }
        let parsed: IssuerResponse = response.json().await?;
        Ok(parsed.authorized)
    }

    async fn get_credential(&self, credential_id: &str) -> Result<Option<CredentialRecord>> {
        let key = bytes32_key(credential_id);
        let response = self
            .send(self.client.get(self.url(&format!("/credentials/{key}"))))
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        Ok(Some(response.json().await?))
    }

    fn name(&self) -> &'static str {
        "http-gateway"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_trims_trailing_slash() {
        let config = HttpLedgerConfig::new("https://ledger.example/api/");
        assert_eq!(config.base_url, "https://ledger.example/api");
    }

    #[test]
    fn test_debug_redacts_api_key() {
        let mut config = HttpLedgerConfig::new("https://ledger.example");
        config.api_key = Some("super-secret".into());
        let rendered = format!("{config:?}");
        assert!(!rendered.contains("super-secret"));
        assert!(rendered.contains("REDACTED"));
    }

    #[test]
    fn test_issuer_is_one_encoded_path_segment() {
        let ledger = HttpLedger::new(HttpLedgerConfig::new("https://ledger.example/api")).unwrap();
        assert_eq!(
            ledger.issuer_url("0x2222").unwrap().as_str(),
            "https://ledger.example/api/issuers/0x2222"
        );
        assert_eq!(
            ledger.issuer_url("0xab/cd?x#y").unwrap().as_str(),
            "https://ledger.example/api/issuers/0xab%2Fcd%3Fx%23y"
        );
    }

    #[test]
    fn test_empty_base_url_rejected() {
        assert!(HttpLedger::new(HttpLedgerConfig::new("")).is_err());
    }

    #[tokio::test]
    async fn test_unreachable_gateway_is_service_failure() {
        let mut config = HttpLedgerConfig::new("http://127.0.0.1:9");
        config.timeout = Duration::from_millis(500);
        let ledger = HttpLedger::new(config).unwrap();

        let err = ledger.get_credential("0123456789abcdef").await.unwrap_err();
        assert!(err.is_service_failure(), "unexpected error: {err:?}");
    }
}
