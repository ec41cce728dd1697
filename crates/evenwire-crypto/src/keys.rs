//! X25519 Diffie-Hellman key exchange (RFC 7748).
//!
//! Keys are ephemeral and per-session. A private key is 32 random bytes
//! with the X25519 clamp applied at construction, so the clamped form is
//! what gets stored, serialized, and fed to the scalar multiplication.

use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::{CryptoError, random};

/// X25519 private key (32 bytes, clamped).
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct PrivateKey([u8; 32]);

/// X25519 public key (32 bytes).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PublicKey([u8; 32]);

/// X25519 shared secret (32 bytes).
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct SharedSecret([u8; 32]);

impl PrivateKey {
    /// Generate a new private key from the OS CSPRNG.
    ///
    /// # Errors
    ///
    /// Returns `CryptoError::RandomFailed` if the CSPRNG cannot produce
    /// 32 bytes.
    pub fn generate() -> Result<Self, CryptoError> {
        let mut seed = [0u8; 32];
        random::fill(&mut seed)?;
        Ok(Self::from_seed(seed))
    }

    /// Build a private key from raw seed bytes, applying the X25519 clamp:
    /// clear the low three bits of byte 0, clear the high bit of byte 31,
    /// set bit 6 of byte 31.
    #[must_use]
    pub fn from_seed(mut seed: [u8; 32]) -> Self {
        seed[0] &= 248;
        seed[31] &= 127;
        seed[31] |= 64;
        Self(seed)
    }

    /// Derive the public key from this private key.
    #[must_use]
    pub fn public_key(&self) -> PublicKey {
        let secret = x25519_dalek::StaticSecret::from(self.0);
        PublicKey(*x25519_dalek::PublicKey::from(&secret).as_bytes())
    }

    /// Perform Diffie-Hellman key exchange.
    ///
    /// Returns `None` if the result is all zeros, which happens only when
    /// the peer sent a low-order point.
    #[must_use]
    pub fn shared_secret(&self, peer_public: &PublicKey) -> Option<SharedSecret> {
        let secret = x25519_dalek::StaticSecret::from(self.0);
        let shared = secret.diffie_hellman(&x25519_dalek::PublicKey::from(peer_public.0));
        if shared.as_bytes() == &[0u8; 32] {
            return None;
        }
        Some(SharedSecret(*shared.as_bytes()))
    }

    /// Get the clamped key bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl PublicKey {
    /// Import a public key from bytes.
    #[must_use]
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Get raw bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl SharedSecret {
    /// Get the shared secret bytes.
    ///
    /// # Security
    ///
    /// The shared secret must be run through a KDF before use as an
    /// encryption key; see [`crate::AeadCipher::derive`].
    #[must_use]
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}
