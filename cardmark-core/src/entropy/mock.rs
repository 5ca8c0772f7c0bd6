//! Mock entropy implementation for testing.

use sha3::{Digest, Sha3_256};

use super::{EntropyKind, EntropySource, ENTROPY_BYTES};
use crate::error::Result;

/// Mock entropy source for testing.
/// WARNING: Do not use in production - every draw is identical!
#[derive(Debug, Clone, Copy)]
pub struct MockEntropy {
    seed: u64,
}

impl MockEntropy {
    pub fn new(seed: u64) -> Self {
        Self { seed }
    }

    /// Create a mock with default seed for simple tests.
    pub fn default_test() -> Self {
        Self::new(0xDEADBEEF_CAFEBABE)
    }
}

impl Default for MockEntropy {
    fn default() -> Self {
        Self::default_test()
    }
}

impl EntropySource for MockEntropy {
    fn draw(&self) -> Result<[u8; ENTROPY_BYTES]> {
        let mut hasher = Sha3_256::new();
        hasher.update(self.seed.to_le_bytes());
        hasher.update(b"cardmark-mock-entropy");

        let result = hasher.finalize();
        let mut entropy = [0u8; ENTROPY_BYTES];
        entropy.copy_from_slice(&result);
        Ok(entropy)
    }

    fn source_id(&self) -> EntropyKind {
        EntropyKind::Mock
    }
}
