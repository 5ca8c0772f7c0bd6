#![no_main]

//! Fuzz target for card extraction.
//!
//! Extraction must classify every input as valid, malformed, or absent
//! without panicking, whatever the container bytes look like.
//!
//! Run with: cargo +nightly fuzz run fuzz_extract

use cardmark_core::{extract_payload, JpegCardRenderer};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let renderer = JpegCardRenderer::default();
    let _ = extract_payload(&renderer, data);
});
