//! AES-128-GCM frame sealing.
//!
//! A tunnel direction is keyed by expanding the session secret with
//! HKDF-SHA256 under a direction label, and every frame in that direction
//! is sealed with the next value of a monotonic counter nonce. Nonces are
//! never reused within a direction because the counter only moves forward.

use aes_gcm::aead::generic_array::GenericArray;
use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::Aes128Gcm;
use hkdf::Hkdf;
use sha2::Sha256;

use crate::{AES_KEY_SIZE, CryptoError, NONCE_SIZE};

/// AES-GCM nonce (12 bytes), built from a frame counter.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct Nonce([u8; NONCE_SIZE]);

impl Nonce {
    /// Create a nonce from a frame counter.
    ///
    /// The counter is written little-endian into the first 8 bytes; the
    /// remaining 4 bytes stay zero.
    #[must_use]
    pub fn from_counter(counter: u64) -> Self {
        let mut bytes = [0u8; NONCE_SIZE];
        bytes[..8].copy_from_slice(&counter.to_le_bytes());
        Self(bytes)
    }

    /// Get raw bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8; NONCE_SIZE] {
        &self.0
    }
}

/// One direction's AEAD cipher.
///
/// Two instances exist per session, one per direction, derived from the
/// same session secret under different labels so the keys are independent.
pub struct AeadCipher {
    cipher: Aes128Gcm,
}

impl AeadCipher {
    /// Derive a direction cipher from the session secret.
    ///
    /// Runs HKDF-SHA256 with IKM = `secret`, empty salt, and info = `label`,
    /// extracts 16 bytes, and keys AES-128-GCM with them.
    ///
    /// # Errors
    ///
    /// Returns `CryptoError::KeyDerivation` if the expansion fails.
    pub fn derive(secret: &[u8], label: &str) -> Result<Self, CryptoError> {
        let hkdf = Hkdf::<Sha256>::new(None, secret);
        let mut key = [0u8; AES_KEY_SIZE];
        hkdf.expand(label.as_bytes(), &mut key)
            .map_err(|_| CryptoError::KeyDerivation)?;
        let cipher = Aes128Gcm::new_from_slice(&key).map_err(|_| CryptoError::KeyDerivation)?;
        Ok(Self { cipher })
    }

    /// Seal a plaintext frame.
    ///
    /// Returns ciphertext with the appended authentication tag
    /// (`plaintext.len()` + 16 bytes).
    ///
    /// # Errors
    ///
    /// Returns `CryptoError::EncryptionFailed` if AEAD encryption fails.
    pub fn seal(&self, nonce: &Nonce, plaintext: &[u8]) -> Result<Vec<u8>, CryptoError> {
        self.cipher
            .encrypt(GenericArray::from_slice(nonce.as_bytes()), plaintext)
            .map_err(|_| CryptoError::EncryptionFailed)
    }

    /// Open and authenticate a ciphertext frame.
    ///
    /// # Errors
    ///
    /// Returns `CryptoError::DecryptionFailed` on authentication failure.
    /// The underlying cause is deliberately not reported.
    pub fn open(&self, nonce: &Nonce, ciphertext: &[u8]) -> Result<Vec<u8>, CryptoError> {
        self.cipher
            .decrypt(GenericArray::from_slice(nonce.as_bytes()), ciphertext)
            .map_err(|_| CryptoError::DecryptionFailed)
    }
}
