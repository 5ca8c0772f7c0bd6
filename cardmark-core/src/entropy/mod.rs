//! Entropy and clock capabilities for credential derivation.
//!
//! Salt derivation never reads ambient global state: the wall clock and the
//! random source are handed to the deriver as trait objects, so production
//! code uses the OS generator while tests substitute fixed values.
//!
//! - **OsEntropy** - operating system CSPRNG (production)
//! - **MockEntropy** - deterministic, seeded (testing only)

mod mock;
mod os;

pub use mock::MockEntropy;
pub use os::OsEntropy;

use chrono::Utc;

use crate::error::Result;

/// Number of random bytes mixed into every salt.
pub const ENTROPY_BYTES: usize = 32;

/// Source of per-registration randomness.
///
/// Implementations must be thread-safe (`Send + Sync`) and must fail rather
/// than return a degenerate draw.
pub trait EntropySource: Send + Sync {
    /// Draw 256 bits of randomness.
    fn draw(&self) -> Result<[u8; ENTROPY_BYTES]>;

    /// Identifier used in logs.
    fn source_id(&self) -> EntropyKind;
}

/// Identifies where salt entropy came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum EntropyKind {
    /// Operating system CSPRNG
    Os,
    /// Mock source for testing only (NOT random!)
    Mock,
}

impl std::fmt::Display for EntropyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Os => write!(f, "OS CSPRNG"),
            Self::Mock => write!(f, "Mock (NOT RANDOM)"),
        }
    }
}

/// Wall-clock capability in Unix milliseconds.
pub trait Clock: Send + Sync {
    fn now_millis(&self) -> u64;
}

/// Clock backed by the system UTC time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> u64 {
        Utc::now().timestamp_millis().max(0) as u64
    }
}

/// Clock frozen at a given instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedClock(pub u64);

impl Clock for FixedClock {
    fn now_millis(&self) -> u64 {
        self.0
    }
}
