#![no_main]

//! Fuzz target for VerificationPayload::from_metadata_str()
//!
//! Run with: cargo +nightly fuzz run fuzz_payload

use cardmark_core::VerificationPayload;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(description) = std::str::from_utf8(data) {
        let _ = VerificationPayload::from_metadata_str(description);
    }
});
