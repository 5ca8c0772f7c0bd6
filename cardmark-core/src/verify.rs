//! Card verification.
//!
//! ```text
//! Received --extract--> Extracted --Valid-----------> Valid (+ ownership check)
//!                                 --Malformed|Absent-> Invalid
//! ```
//!
//! Extraction always completes; it only classifies. The ownership check is
//! advisory: a ledger that cannot be reached leaves the card `Valid` with the
//! ownership flag unset, so "this card is forged" is never confused with
//! "the ledger could not be asked".

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tracing::{info, instrument, warn};

use crate::embed::{CredentialEmbedder, VerificationResult};
use crate::entropy::{Clock, SystemClock};
use crate::ledger::{bytes32_key, CredentialLedger};
use crate::payload::VerificationPayload;

/// Default bound on a single ledger call.
pub const DEFAULT_LEDGER_TIMEOUT: Duration = Duration::from_secs(10);

/// Result of the optional ownership refinement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "reason", rename_all = "snake_case")]
pub enum OwnershipCheck {
    /// No holder supplied or no ledger configured.
    NotRequested,
    /// Ledger holds an active credential for this holder and prefix.
    Confirmed,
    /// Ledger answered and the credential does not match.
    NotConfirmed(String),
    /// Ledger could not be consulted.
    Unavailable(String),
}

impl OwnershipCheck {
    pub fn is_confirmed(&self) -> bool {
        matches!(self, Self::Confirmed)
    }
}

/// Why a card was classified invalid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum InvalidReason {
    /// No payload in the artifact.
    Absent,
    /// Payload marker present but the payload is unusable.
    Malformed(String),
}

impl InvalidReason {
    pub fn description(&self) -> &str {
        match self {
            Self::Absent => "no verification payload found",
            Self::Malformed(reason) => reason,
        }
    }
}

/// Terminal state of one verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerificationOutcome {
    Valid {
        payload: VerificationPayload,
        ownership: OwnershipCheck,
    },
    Invalid {
        reason: InvalidReason,
    },
}

impl VerificationOutcome {
    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid { .. })
    }

    pub fn ownership_verified(&self) -> bool {
        match self {
            Self::Valid { ownership, .. } => ownership.is_confirmed(),
            Self::Invalid { .. } => false,
        }
    }
}

/// Verification state machine: `Received -> Extracted -> Done`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerificationState<'a> {
    Received(&'a [u8]),
    Extracted(VerificationResult),
    Done(VerificationOutcome),
}

impl From<VerificationResult> for VerificationOutcome {
    fn from(result: VerificationResult) -> Self {
        match result {
            VerificationResult::Valid(payload) => Self::Valid {
                payload,
                ownership: OwnershipCheck::NotRequested,
            },
            VerificationResult::Malformed(reason) => Self::Invalid {
                reason: InvalidReason::Malformed(reason),
            },
            VerificationResult::Absent => Self::Invalid {
                reason: InvalidReason::Absent,
            },
        }
    }
}

/// Extracts payloads and optionally cross-checks ownership on the ledger.
#[derive(Clone)]
pub struct Verifier {
    embedder: CredentialEmbedder,
    ledger: Option<Arc<dyn CredentialLedger>>,
    clock: Arc<dyn Clock>,
    ledger_timeout: Duration,
}

impl Verifier {
    pub fn new(embedder: CredentialEmbedder, ledger: Option<Arc<dyn CredentialLedger>>) -> Self {
        Self {
            embedder,
            ledger,
            clock: Arc::new(SystemClock),
            ledger_timeout: DEFAULT_LEDGER_TIMEOUT,
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_ledger_timeout(mut self, timeout: Duration) -> Self {
        self.ledger_timeout = timeout;
        self
    }

    pub fn embedder(&self) -> &CredentialEmbedder {
        &self.embedder
    }

    pub fn has_ledger(&self) -> bool {
        self.ledger.is_some()
    }

    /// Advance the machine by one transition. `Done` is terminal.
    pub async fn step<'a>(
        &self,
        state: VerificationState<'a>,
        holder: Option<&str>,
    ) -> VerificationState<'a> {
        match state {
            VerificationState::Received(bytes) => {
                VerificationState::Extracted(self.embedder.extract(bytes))
            }
            VerificationState::Extracted(result) => {
                VerificationState::Done(self.classify(result, holder).await)
            }
            done @ VerificationState::Done(_) => done,
        }
    }

    /// Run the full machine for one artifact.
    #[instrument(skip(self, artifact), fields(artifact_bytes = artifact.len()))]
    pub async fn verify(&self, artifact: &[u8], holder: Option<&str>) -> VerificationOutcome {
        let mut state = VerificationState::Received(artifact);
        loop {
            state = match self.step(state, holder).await {
                VerificationState::Done(outcome) => return outcome,
                next => next,
            };
        }
    }

    /// `Extracted -> {Valid, Invalid}`, with the ownership refinement for valid cards.
    pub async fn classify(
        &self,
        extracted: VerificationResult,
        holder: Option<&str>,
    ) -> VerificationOutcome {
        let payload = match VerificationOutcome::from(extracted) {
            VerificationOutcome::Valid { payload, .. } => payload,
            invalid => {
                info!(outcome = ?invalid, "Card invalid");
                return invalid;
            }
        };

        let ownership = match holder.map(str::trim).filter(|h| !h.is_empty()) {
            Some(holder) => self.check_ownership(&payload, holder).await,
            None => OwnershipCheck::NotRequested,
        };

        info!(
            user_id = %payload.user_id,
            ownership = ?ownership,
            "Card valid"
        );
        VerificationOutcome::Valid { payload, ownership }
    }

    async fn check_ownership(&self, payload: &VerificationPayload, holder: &str) -> OwnershipCheck {
        let Some(ledger) = &self.ledger else {
            return OwnershipCheck::NotRequested;
        };

        let lookup = tokio::time::timeout(self.ledger_timeout, ledger.get_credential(&payload.hash));
        let record = match lookup.await {
            Ok(Ok(record)) => record,
            Ok(Err(e)) => {
                warn!(ledger = ledger.name(), error = %e, "Ownership check failed");
                return OwnershipCheck::Unavailable(e.to_string());
            }
            Err(_) => {
                warn!(
                    ledger = ledger.name(),
                    timeout_ms = self.ledger_timeout.as_millis() as u64,
                    "Ownership check timed out"
                );
                return OwnershipCheck::Unavailable("ledger call timed out".into());
            }
        };

        let Some(record) = record else {
            return OwnershipCheck::NotConfirmed("no credential for this card".into());
        };

        let now_secs = self.clock.now_millis() / 1000;
        if !record.is_current(now_secs) {
            OwnershipCheck::NotConfirmed("credential inactive or expired".into())
        } else if !record.held_by(holder) {
            OwnershipCheck::NotConfirmed("credential held by another address".into())
        } else if !record.image_hash.eq_ignore_ascii_case(&bytes32_key(&payload.hash)) {
            OwnershipCheck::NotConfirmed("credential image hash does not match card".into())
        } else {
            OwnershipCheck::Confirmed
        }
    }
}
