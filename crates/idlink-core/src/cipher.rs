//! Password cipher algorithm identifiers.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::CoreError;

/// Default iteration count for the salted one-way digest.
///
/// Deliberately higher than a single pass: the salted form is the stronger
/// storage option and carries the extra work factor.
pub const DEFAULT_SALTED_ITERATIONS: u32 = 10_000;

/// The algorithm a stored password was encoded with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "algorithm", rename_all = "snake_case")]
pub enum CipherAlgorithm {
    /// Reversible, keyed (AES-256-GCM with a configured secret).
    Aes,
    /// One-way, unsalted SHA-256 digest.
    Sha256,
    /// One-way, salted SHA-256 digest with an iteration count.
    SaltedSha256 {
        /// Digest rounds; the salt and round count travel inside the
        /// stored value, never as a separate argument.
        iterations: u32,
    },
    /// Adaptive hash (Argon2id) with its own embedded parameters.
    Argon2,
}

impl CipherAlgorithm {
    /// Salted SHA-256 with the default work factor.
    #[must_use]
    pub fn salted_sha256() -> Self {
        CipherAlgorithm::SaltedSha256 {
            iterations: DEFAULT_SALTED_ITERATIONS,
        }
    }

    /// Whether ciphertext produced with this algorithm can be decoded back.
    #[must_use]
    pub fn is_reversible(&self) -> bool {
        matches!(self, CipherAlgorithm::Aes)
    }

    /// Whether this algorithm salts its digests.
    #[must_use]
    pub fn is_salted(&self) -> bool {
        matches!(
            self,
            CipherAlgorithm::SaltedSha256 { .. } | CipherAlgorithm::Argon2
        )
    }

    /// String representation.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            CipherAlgorithm::Aes => "aes",
            CipherAlgorithm::Sha256 => "sha256",
            CipherAlgorithm::SaltedSha256 { .. } => "ssha256",
            CipherAlgorithm::Argon2 => "argon2",
        }
    }
}

impl fmt::Display for CipherAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for CipherAlgorithm {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "aes" => Ok(CipherAlgorithm::Aes),
            "sha256" => Ok(CipherAlgorithm::Sha256),
            "ssha256" | "salted_sha256" => Ok(CipherAlgorithm::salted_sha256()),
            "argon2" | "argon2id" => Ok(CipherAlgorithm::Argon2),
            other => Err(CoreError::UnknownAlgorithm {
                value: other.to_string(),
            }),
        }
    }
}
