//! Verification payload and its metadata encoding.
//!
//! The payload is the only information a card artifact carries. Its wire form
//! is fixed:
//!
//! ```text
//! VERIFY_DATA:{"userId":"1700000000000","timestamp":1700000000000,"hash":"<16 hex>","salt":"<16 hex>"}
//! ```
//!
//! Key names and key order are part of the contract; field order in
//! [`VerificationPayload`] drives the serialized order.

use serde::{Deserialize, Serialize};

use crate::error::{CardError, Result, PAYLOAD_MARKER, PREFIX_LEN};

/// Truncated, non-reversible reference to one registration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationPayload {
    /// Subject identifier the card was issued to
    #[serde(rename = "userId")]
    pub user_id: String,
    /// Registration time (Unix milliseconds)
    pub timestamp: u64,
    /// First 16 hex chars of the content hash
    pub hash: String,
    /// First 16 hex chars of the salt
    pub salt: String,
}

/// How a metadata string relates to the payload marker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MarkedPayload {
    /// No marker in the string.
    Missing,
    /// Marker found, remainder is not a usable payload.
    Unparseable(String),
    /// Marker found and the remainder parsed.
    Found(VerificationPayload),
}

impl VerificationPayload {
    /// Serialize to the compact JSON form embedded in artifacts.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| CardError::SerializationError(e.to_string()))
    }

    /// The exact string written into the artifact's description field.
    pub fn to_metadata_string(&self) -> Result<String> {
        Ok(format!("{PAYLOAD_MARKER}{}", self.to_json()?))
    }

    /// Locate the marker in a metadata string and parse what follows it.
    ///
    /// Only the first JSON value after the marker is read; trailing bytes
    /// (padding, NUL terminators) are ignored.
    pub fn from_metadata_str(description: &str) -> MarkedPayload {
        let Some(start) = description.find(PAYLOAD_MARKER) else {
            return MarkedPayload::Missing;
        };
        let rest = &description[start + PAYLOAD_MARKER.len()..];

        let mut stream =
            serde_json::Deserializer::from_str(rest).into_iter::<VerificationPayload>();
        match stream.next() {
            Some(Ok(payload)) => match payload.check_shape() {
                Ok(()) => MarkedPayload::Found(payload),
                Err(reason) => MarkedPayload::Unparseable(reason),
            },
            Some(Err(e)) => MarkedPayload::Unparseable(e.to_string()),
            None => MarkedPayload::Unparseable("empty payload after marker".into()),
        }
    }

    /// Structural checks beyond what JSON typing enforces.
    pub fn check_shape(&self) -> std::result::Result<(), String> {
        if self.user_id.is_empty() {
            return Err("userId is empty".into());
        }
        for (name, value) in [("hash", &self.hash), ("salt", &self.salt)] {
            if value.len() != PREFIX_LEN || !value.chars().all(|c| c.is_ascii_hexdigit()) {
                return Err(format!("{name} is not a {PREFIX_LEN}-char hex prefix"));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> VerificationPayload {
        VerificationPayload {
            user_id: "1700000000000".into(),
            timestamp: 1_700_000_000_123,
            hash: "0123456789abcdef".into(),
            salt: "fedcba9876543210".into(),
        }
    }

    #[test]
    fn test_metadata_string_is_bit_exact() {
        assert_eq!(
            sample().to_metadata_string().unwrap(),
            r#"VERIFY_DATA:{"userId":"1700000000000","timestamp":1700000000123,"hash":"0123456789abcdef","salt":"fedcba9876543210"}"#
        );
    }

    #[test]
    fn test_parse_ignores_trailing_bytes() {
        let s = format!("{}\0\0", sample().to_metadata_string().unwrap());
        assert_eq!(
            VerificationPayload::from_metadata_str(&s),
            MarkedPayload::Found(sample())
        );
    }

    #[test]
    fn test_parse_finds_marker_mid_string() {
        let s = format!("prefix text {}", sample().to_metadata_string().unwrap());
        assert!(matches!(
            VerificationPayload::from_metadata_str(&s),
            MarkedPayload::Found(_)
        ));
    }

    #[test]
    fn test_missing_marker() {
        assert_eq!(
            VerificationPayload::from_metadata_str("Shot on a phone"),
            MarkedPayload::Missing
        );
    }

    #[test]
    fn test_truncated_json_is_unparseable() {
        let full = sample().to_metadata_string().unwrap();
        let truncated = &full[..full.len() - 10];
        assert!(matches!(
            VerificationPayload::from_metadata_str(truncated),
            MarkedPayload::Unparseable(_)
        ));
    }

    #[test]
    fn test_bad_prefix_shape_is_unparseable() {
        let mut payload = sample();
        payload.hash = "not-hex-at-all!!".into();
        let s = payload.to_metadata_string().unwrap();
        assert!(matches!(
            VerificationPayload::from_metadata_str(&s),
            MarkedPayload::Unparseable(_)
        ));
    }
}
