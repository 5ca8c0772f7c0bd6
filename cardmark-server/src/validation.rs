//! Upload validation module
//!
//! Provides validation utilities for multipart image uploads and form fields.

use crate::error::ApiError;

/// Allowed MIME type categories for card uploads
const ALLOWED_MIME_PREFIXES: &[&str] = &["image/", "application/octet-stream"];

/// Longest wallet address accepted from a form field
const MAX_WALLET_ADDRESS_LEN: usize = 128;

/// Validates the Content-Type of an uploaded image
///
/// Accepts image/* and application/octet-stream. A missing Content-Type is
/// treated as binary; the decoder has the final word on the bytes.
pub fn validate_content_type(content_type: Option<&str>) -> Result<(), ApiError> {
    match content_type {
        Some(ct) => {
            let ct_lower = ct.to_lowercase();
            if ALLOWED_MIME_PREFIXES
                .iter()
                .any(|prefix| ct_lower.starts_with(prefix))
            {
                Ok(())
            } else {
                Err(ApiError::bad_request(format!(
                    "Unsupported Content-Type: '{}'. Allowed types: image/*, application/octet-stream",
                    ct
                )))
            }
        }
        None => Ok(()),
    }
}

/// Validates the size of an uploaded file
///
/// Returns an error if the file is empty or exceeds the maximum size.
pub fn validate_file_size(size: usize, max_size: usize) -> Result<(), ApiError> {
    if size == 0 {
        return Err(ApiError::bad_request("Image file is empty"));
    }
    if size > max_size {
        let max_mb = max_size / (1024 * 1024);
        let actual_mb = size / (1024 * 1024);
        Err(ApiError::bad_request(format!(
            "File too large: {} MB exceeds maximum of {} MB",
            actual_mb, max_mb
        )))
    } else {
        Ok(())
    }
}

/// Normalizes an optional wallet address form field.
///
/// Blank values count as absent. The ledger decides whether an address is
/// real; this only rejects values no ledger could accept.
pub fn normalize_wallet_address(value: Option<&str>) -> Result<Option<String>, ApiError> {
    let Some(address) = value.map(str::trim).filter(|v| !v.is_empty()) else {
        return Ok(None);
    };

    if address.len() > MAX_WALLET_ADDRESS_LEN {
        return Err(ApiError::bad_request("walletAddress is too long"));
    }
    if !address.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(ApiError::bad_request(
            "walletAddress must be alphanumeric (e.g. 0x-prefixed hex)",
        ));
    }

    Ok(Some(address.to_string()))
}
