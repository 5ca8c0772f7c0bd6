//! Exit codes following sysexits.h conventions.
//!
//! These codes provide semantic meaning for different failure modes,
//! enabling scripts and CI systems to handle errors appropriately.

use cardmark_core::CardError;

/// Successful execution.
pub const SUCCESS: i32 = 0;

/// General error (catch-all).
pub const GENERAL_ERROR: i32 = 1;

/// Command line usage error (invalid arguments).
/// Maps to EX_USAGE from sysexits.h.
pub const USAGE_ERROR: i32 = 64;

/// Data format error (invalid card, undecodable image).
/// Maps to EX_DATAERR from sysexits.h.
pub const INVALID_CARD: i32 = 65;

/// Cannot open input file.
/// Maps to EX_NOINPUT from sysexits.h.
pub const INPUT_ERROR: i32 = 66;

/// Service unavailable (ledger unreachable or refusing).
/// Maps to EX_UNAVAILABLE from sysexits.h.
pub const LEDGER_ERROR: i32 = 69;

/// Internal software error (entropy, serialization).
/// Maps to EX_SOFTWARE from sysexits.h.
pub const SOFTWARE_ERROR: i32 = 70;

/// I/O error (cannot write output file).
/// Maps to EX_IOERR from sysexits.h.
pub const IO_ERROR: i32 = 74;

/// Represents an exit code with optional error context.
pub struct ExitCode {
    pub code: i32,
    pub message: Option<String>,
}

impl ExitCode {
    pub const fn success() -> Self {
        Self {
            code: SUCCESS,
            message: None,
        }
    }

    pub fn from_anyhow(err: &anyhow::Error) -> Self {
        let message = format!("{err:#}");

        // Typed core errors win over message inspection
        let card_error = err.chain().find_map(|e| e.downcast_ref::<CardError>());
        let code = match card_error {
            Some(CardError::InvalidInput(_)) => USAGE_ERROR,
            Some(CardError::RenderFailure(_)) => INVALID_CARD,
            Some(CardError::ExternalServiceUnavailable(_) | CardError::LedgerRejected(_)) => {
                LEDGER_ERROR
            }
            Some(CardError::EntropyUnavailable(_) | CardError::SerializationError(_)) => {
                SOFTWARE_ERROR
            }
            None if message.contains("Failed to read") => INPUT_ERROR,
            None if message.contains("Failed to write") => IO_ERROR,
            None if message.contains("Verification failed")
                || message.contains("No card metadata") =>
            {
                INVALID_CARD
            }
            None if message.contains("ledger") => LEDGER_ERROR,
            None => GENERAL_ERROR,
        };

        Self {
            code,
            message: Some(message),
        }
    }
}
