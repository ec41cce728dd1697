//! Cryptographic error types.

use thiserror::Error;

/// Cryptographic errors
#[derive(Debug, Error)]
pub enum CryptoError {
    /// Random number generation failed
    #[error("random number generation failed")]
    RandomFailed,

    /// Key derivation failed
    #[error("key derivation failed")]
    KeyDerivation,

    /// AEAD encryption failed
    #[error("encryption failed")]
    EncryptionFailed,

    /// AEAD decryption failed (authentication failure)
    #[error("decryption failed: authentication failure")]
    DecryptionFailed,
}
