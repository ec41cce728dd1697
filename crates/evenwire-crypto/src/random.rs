//! OS randomness for the tunnel's three consumers: ephemeral key seeds,
//! the padding that stretches a handshake message to the fixed frame size,
//! and generated pre-shared keys.

use crate::CryptoError;

/// Fill `buf` from the operating system CSPRNG.
///
/// # Errors
///
/// Returns `CryptoError::RandomFailed` when the OS cannot supply the
/// bytes. Callers treat that as fatal to whatever they were setting up; a
/// session must never fall back to predictable padding or key material.
pub fn fill(buf: &mut [u8]) -> Result<(), CryptoError> {
    getrandom::getrandom(buf).map_err(|_| CryptoError::RandomFailed)
}
