//! Operating system entropy.

use super::{EntropyKind, EntropySource, ENTROPY_BYTES};
use crate::error::{CardError, Result};

/// Entropy drawn from the OS CSPRNG through `getrandom`.
#[derive(Debug, Clone, Copy, Default)]
pub struct OsEntropy;

impl EntropySource for OsEntropy {
    fn draw(&self) -> Result<[u8; ENTROPY_BYTES]> {
        let mut buf = [0u8; ENTROPY_BYTES];
        getrandom::fill(&mut buf)
            .map_err(|e| CardError::EntropyUnavailable(format!("OS generator failed: {e}")))?;

        // An all-zero block means the generator handed back nothing.
        if buf.iter().all(|b| *b == 0) {
            return Err(CardError::EntropyUnavailable(
                "OS generator returned an all-zero block".into(),
            ));
        }

        Ok(buf)
    }

    fn source_id(&self) -> EntropyKind {
        EntropyKind::Os
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_os_entropy_draws_differ() {
        let a = OsEntropy.draw().unwrap();
        let b = OsEntropy.draw().unwrap();
        assert_ne!(a, b, "Two OS draws should not collide");
    }

    #[test]
    fn test_os_source_id() {
        assert_eq!(OsEntropy.source_id(), EntropyKind::Os);
    }
}
