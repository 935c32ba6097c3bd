//! Password encoding, decoding and verification.
//!
//! One [`Encryptor`] instance serves every configured [`CipherAlgorithm`]:
//! AES-256-GCM for reversible storage, plain and salted SHA-256 digests,
//! and Argon2id with OWASP-recommended parameters.

use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Nonce,
};
use argon2::{
    password_hash::{
        rand_core::OsRng as PhcOsRng, PasswordHash, PasswordHasher as _, PasswordVerifier,
        SaltString,
    },
    Algorithm, Argon2, Params, Version,
};
use base64::{engine::general_purpose::STANDARD, Engine};
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::warn;

use idlink_core::CipherAlgorithm;

/// Length of the AES-256 key in bytes.
const KEY_LENGTH: usize = 32;

/// Length of the GCM nonce in bytes.
const NONCE_LENGTH: usize = 12;

/// Length of the GCM authentication tag in bytes.
const TAG_LENGTH: usize = 16;

/// Length of the random salt prepended to salted digests, in bytes.
const SALT_LENGTH: usize = 8;

/// Error that can occur while encoding or decoding a password.
#[derive(Debug, Error)]
pub enum CryptoError {
    /// The configured secret is unusable. Fatal at startup.
    #[error("crypto configuration error: {message}")]
    Configuration { message: String },

    /// Decoding requested for a one-way algorithm.
    #[error("decoding not supported for algorithm: {algorithm}")]
    UnsupportedOperation { algorithm: CipherAlgorithm },

    /// Encoding failed.
    #[error("encoding failed: {message}")]
    EncodingFailed { message: String },

    /// Decoding failed (corrupt input or wrong key).
    #[error("decoding failed: {message}")]
    DecodingFailed { message: String },
}

/// Result type for crypto operations.
pub type CryptoResult<T> = Result<T, CryptoError>;

/// Encodes, decodes and verifies passwords.
///
/// The configured secret only matters for [`CipherAlgorithm::Aes`]; digest
/// algorithms ignore it.
#[derive(Clone)]
pub struct Encryptor {
    key: [u8; KEY_LENGTH],
}

impl Encryptor {
    /// Build an encryptor from the configured secret.
    ///
    /// The secret is truncated or zero-padded to the 32-byte AES key
    /// length. An empty secret is a configuration error.
    pub fn new(secret: &str) -> CryptoResult<Self> {
        if secret.is_empty() {
            return Err(CryptoError::Configuration {
                message: "encryption secret must not be empty".to_string(),
            });
        }

        let mut key = [0u8; KEY_LENGTH];
        let bytes = secret.as_bytes();
        let len = bytes.len().min(KEY_LENGTH);
        key[..len].copy_from_slice(&bytes[..len]);
        Ok(Self { key })
    }

    /// Encode a clear-text value with the given algorithm.
    pub fn encode(&self, value: &str, algorithm: CipherAlgorithm) -> CryptoResult<String> {
        match algorithm {
            CipherAlgorithm::Aes => self.encrypt_aes(value),
            CipherAlgorithm::Sha256 => Ok(hex::encode(Sha256::digest(value.as_bytes()))),
            CipherAlgorithm::SaltedSha256 { iterations } => {
                let mut salt = [0u8; SALT_LENGTH];
                OsRng.fill_bytes(&mut salt);
                Ok(salted_digest(value, &salt, iterations))
            }
            CipherAlgorithm::Argon2 => self.hash_argon2(value),
        }
    }

    /// Decode an encoded value back to clear text.
    ///
    /// Only reversible algorithms support this; digest algorithms return
    /// [`CryptoError::UnsupportedOperation`].
    pub fn decode(&self, encoded: &str, algorithm: CipherAlgorithm) -> CryptoResult<String> {
        match algorithm {
            CipherAlgorithm::Aes => self.decrypt_aes(encoded),
            other => Err(CryptoError::UnsupportedOperation { algorithm: other }),
        }
    }

    /// Check a clear-text value against a stored encoding.
    ///
    /// Never errors: corrupt stored values simply fail verification.
    #[must_use]
    pub fn verify(&self, value: &str, encoded: &str, algorithm: CipherAlgorithm) -> bool {
        match algorithm {
            CipherAlgorithm::Aes => match self.decrypt_aes(encoded) {
                Ok(decrypted) => decrypted == value,
                Err(e) => {
                    warn!(error = %e, "stored value did not decrypt during verification");
                    false
                }
            },
            CipherAlgorithm::Sha256 => {
                hex::encode(Sha256::digest(value.as_bytes())) == encoded
            }
            CipherAlgorithm::SaltedSha256 { iterations } => {
                match extract_salt(encoded) {
                    Some(salt) => salted_digest(value, &salt, iterations) == encoded,
                    None => {
                        warn!("stored salted digest is malformed");
                        false
                    }
                }
            }
            CipherAlgorithm::Argon2 => match PasswordHash::new(encoded) {
                Ok(parsed) => argon2_instance()
                    .verify_password(value.as_bytes(), &parsed)
                    .is_ok(),
                Err(e) => {
                    warn!(error = %e, "stored value is not a valid argon2 hash");
                    false
                }
            },
        }
    }

    fn encrypt_aes(&self, value: &str) -> CryptoResult<String> {
        let cipher =
            Aes256Gcm::new_from_slice(&self.key).map_err(|e| CryptoError::EncodingFailed {
                message: format!("failed to create cipher: {e}"),
            })?;

        let mut nonce_bytes = [0u8; NONCE_LENGTH];
        OsRng.fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        let ciphertext = cipher.encrypt(nonce, value.as_bytes()).map_err(|e| {
            CryptoError::EncodingFailed {
                message: format!("encryption failed: {e}"),
            }
        })?;

        // nonce || ciphertext (tag is appended by AES-GCM)
        let mut bytes = Vec::with_capacity(NONCE_LENGTH + ciphertext.len());
        bytes.extend_from_slice(&nonce_bytes);
        bytes.extend_from_slice(&ciphertext);
        Ok(STANDARD.encode(bytes))
    }

    fn decrypt_aes(&self, encoded: &str) -> CryptoResult<String> {
        let bytes = STANDARD
            .decode(encoded)
            .map_err(|e| CryptoError::DecodingFailed {
                message: format!("invalid base64: {e}"),
            })?;

        if bytes.len() < NONCE_LENGTH + TAG_LENGTH {
            return Err(CryptoError::DecodingFailed {
                message: "ciphertext too short".to_string(),
            });
        }

        let cipher =
            Aes256Gcm::new_from_slice(&self.key).map_err(|e| CryptoError::DecodingFailed {
                message: format!("failed to create cipher: {e}"),
            })?;

        let (nonce_bytes, encrypted) = bytes.split_at(NONCE_LENGTH);
        let nonce = Nonce::from_slice(nonce_bytes);

        let plaintext =
            cipher
                .decrypt(nonce, encrypted)
                .map_err(|e| CryptoError::DecodingFailed {
                    message: format!("decryption failed: {e}"),
                })?;

        String::from_utf8(plaintext).map_err(|e| CryptoError::DecodingFailed {
            message: format!("decrypted data is not valid UTF-8: {e}"),
        })
    }

    fn hash_argon2(&self, value: &str) -> CryptoResult<String> {
        let salt = SaltString::generate(&mut PhcOsRng);
        let hash = argon2_instance()
            .hash_password(value.as_bytes(), &salt)
            .map_err(|e| CryptoError::EncodingFailed {
                message: format!("argon2 hashing failed: {e}"),
            })?;
        Ok(hash.to_string())
    }
}

impl std::fmt::Debug for Encryptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Encryptor")
            .field("key", &"[REDACTED]")
            .finish()
    }
}

/// Argon2id with OWASP 2024 recommended parameters.
///
/// m=19456 (19 MiB), t=2, p=1. These are hardcoded constants that are
/// always valid; a failure indicates a bug in the argon2 crate.
fn argon2_instance() -> Argon2<'static> {
    let params =
        Params::new(19456, 2, 1, None).expect("OWASP 2024 Argon2 parameters are valid constants");
    Argon2::new(Algorithm::Argon2id, Version::V0x13, params)
}

/// Iterated salted SHA-256, stored as base64(salt || digest). The salt
/// travels inside the stored value, never as a separate argument.
fn salted_digest(value: &str, salt: &[u8], iterations: u32) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt);
    hasher.update(value.as_bytes());
    let mut digest = hasher.finalize();

    for _ in 1..iterations.max(1) {
        digest = Sha256::digest(&digest);
    }

    let mut bytes = Vec::with_capacity(salt.len() + digest.len());
    bytes.extend_from_slice(salt);
    bytes.extend_from_slice(&digest);
    STANDARD.encode(bytes)
}

/// Recover the salt from a stored salted digest.
fn extract_salt(encoded: &str) -> Option<[u8; SALT_LENGTH]> {
    let bytes = STANDARD.decode(encoded).ok()?;
    if bytes.len() <= SALT_LENGTH {
        return None;
    }
    let mut salt = [0u8; SALT_LENGTH];
    salt.copy_from_slice(&bytes[..SALT_LENGTH]);
    Some(salt)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_encryptor() -> Encryptor {
        Encryptor::new("test-secret").unwrap()
    }

    #[test]
    fn test_empty_secret_is_configuration_error() {
        let result = Encryptor::new("");
        assert!(matches!(result, Err(CryptoError::Configuration { .. })));
    }

    #[test]
    fn test_aes_roundtrip() {
        let encryptor = test_encryptor();
        let encoded = encryptor.encode("password123", CipherAlgorithm::Aes).unwrap();
        assert_ne!(encoded, "password123");

        let decoded = encryptor.decode(&encoded, CipherAlgorithm::Aes).unwrap();
        assert_eq!(decoded, "password123");
        assert!(encryptor.verify("password123", &encoded, CipherAlgorithm::Aes));
        assert!(!encryptor.verify("wrong", &encoded, CipherAlgorithm::Aes));
    }

    #[test]
    fn test_aes_key_longer_than_key_length_is_truncated() {
        let long_secret = "x".repeat(100);
        let a = Encryptor::new(&long_secret).unwrap();
        let b = Encryptor::new(&long_secret[..KEY_LENGTH]).unwrap();

        let encoded = a.encode("pw", CipherAlgorithm::Aes).unwrap();
        assert_eq!(b.decode(&encoded, CipherAlgorithm::Aes).unwrap(), "pw");
    }

    #[test]
    fn test_wrong_secret_fails_decode() {
        let a = Encryptor::new("secret-a").unwrap();
        let b = Encryptor::new("secret-b").unwrap();

        let encoded = a.encode("pw", CipherAlgorithm::Aes).unwrap();
        assert!(b.decode(&encoded, CipherAlgorithm::Aes).is_err());
    }

    #[test]
    fn test_sha256_is_deterministic_and_one_way() {
        let encryptor = test_encryptor();
        let first = encryptor.encode("pw", CipherAlgorithm::Sha256).unwrap();
        let second = encryptor.encode("pw", CipherAlgorithm::Sha256).unwrap();
        assert_eq!(first, second);

        assert!(encryptor.verify("pw", &first, CipherAlgorithm::Sha256));
        assert!(!encryptor.verify("other", &first, CipherAlgorithm::Sha256));

        let result = encryptor.decode(&first, CipherAlgorithm::Sha256);
        assert!(matches!(
            result,
            Err(CryptoError::UnsupportedOperation { .. })
        ));
    }

    #[test]
    fn test_salted_sha256_differs_per_encoding_but_verifies() {
        let encryptor = test_encryptor();
        let algorithm = CipherAlgorithm::salted_sha256();

        let first = encryptor.encode("pw", algorithm).unwrap();
        let second = encryptor.encode("pw", algorithm).unwrap();
        assert_ne!(first, second);

        assert!(encryptor.verify("pw", &first, algorithm));
        assert!(encryptor.verify("pw", &second, algorithm));
        assert!(!encryptor.verify("other", &first, algorithm));
        assert!(encryptor.decode(&first, algorithm).is_err());
    }

    #[test]
    fn test_salted_sha256_corrupt_stored_value_fails_verify() {
        let encryptor = test_encryptor();
        let algorithm = CipherAlgorithm::salted_sha256();
        assert!(!encryptor.verify("pw", "not-base64!!", algorithm));
        assert!(!encryptor.verify("pw", "", algorithm));
    }

    #[test]
    fn test_corrupt_stored_values_fail_verify() {
        let encryptor = test_encryptor();
        assert!(!encryptor.verify("pw", "not-base64!!", CipherAlgorithm::Aes));
        assert!(!encryptor.verify("pw", "$argon2id$bogus", CipherAlgorithm::Argon2));
    }

    #[test]
    fn test_argon2_roundtrip() {
        let encryptor = test_encryptor();
        let encoded = encryptor.encode("pw", CipherAlgorithm::Argon2).unwrap();
        assert!(encoded.starts_with("$argon2id$"));

        assert!(encryptor.verify("pw", &encoded, CipherAlgorithm::Argon2));
        assert!(!encryptor.verify("other", &encoded, CipherAlgorithm::Argon2));
        assert!(encryptor.decode(&encoded, CipherAlgorithm::Argon2).is_err());
    }

    #[test]
    fn test_debug_redacts_key() {
        let encryptor = test_encryptor();
        let debug = format!("{encryptor:?}");
        assert!(debug.contains("[REDACTED]"));
        assert!(!debug.contains("test-secret"));
    }
}
