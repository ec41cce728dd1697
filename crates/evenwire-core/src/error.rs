//! Error types for the tunnel.
//!
//! Every error is fatal to the session that produced it. Variants carry
//! enough context to tell read from write from crypto from congestion,
//! but authentication failures stay deliberately opaque.

use std::io;

use thiserror::Error;

use evenwire_crypto::CryptoError;

/// Tunnel errors
#[derive(Debug, Error)]
pub enum Error {
    /// Frame size cannot hold a handshake public key
    #[error("frame size too small: {got} < {min}")]
    FrameSizeTooSmall {
        /// Configured frame size
        got: usize,
        /// Minimum usable frame size
        min: usize,
    },

    /// Tick period of zero would busy-loop the tickers
    #[error("tick period must be non-zero")]
    ZeroPeriod,

    /// Ephemeral key generation failed
    #[error("failed to generate key pair: {0}")]
    KeyExchange(#[source] CryptoError),

    /// Handshake padding randomness failed
    #[error("failed to fill handshake padding: {0}")]
    HandshakePadding(#[source] CryptoError),

    /// Sending our handshake frame failed
    #[error("failed to send public key: {0}")]
    SendPublicKey(#[source] io::Error),

    /// Receiving the peer's handshake frame failed
    #[error("failed to receive public key: {0}")]
    ReceivePublicKey(#[source] io::Error),

    /// The peer's public key produced an all-zero shared secret
    #[error("peer public key is a low-order point")]
    LowOrderPeerKey,

    /// Direction key derivation failed
    #[error("failed to derive direction key: {0}")]
    DeriveKey(#[source] CryptoError),

    /// Reading from the local plaintext source failed
    #[error("failed to read plaintext: {0}")]
    PlaintextRead(#[source] io::Error),

    /// Writing to the local plaintext sink failed
    #[error("failed to write plaintext: {0}")]
    PlaintextWrite(#[source] io::Error),

    /// Reading ciphertext from the remote side failed
    #[error("failed to read ciphertext: {0}")]
    CiphertextRead(#[source] io::Error),

    /// Writing ciphertext to the remote side failed
    #[error("failed to write ciphertext: {0}")]
    CiphertextWrite(#[source] io::Error),

    /// Sealing a frame failed
    #[error("failed to seal frame: {0}")]
    Seal(#[source] CryptoError),

    /// A received frame failed to authenticate. The cause is not reported.
    #[error("failed to decrypt or verify frame")]
    Decrypt,

    /// A sealed frame came out at the wrong size
    #[error("sealed frame length mismatch: got {got}, want {want}")]
    SealedLength {
        /// Actual sealed length
        got: usize,
        /// Configured frame size
        want: usize,
    },

    /// The plaintext sink queue reached capacity
    #[error("congestion in upstream")]
    Congestion,

    /// Frame parsing error
    #[error("frame error: {0}")]
    Frame(#[from] FrameError),

    /// A tunnel task ended without reporting a result
    #[error("tunnel task failed: {0}")]
    Task(#[source] tokio::task::JoinError),
}

/// Frame-level errors
#[derive(Debug, Error)]
pub enum FrameError {
    /// Frame too short to carry a header
    #[error("frame too short: expected at least {expected}, got {actual}")]
    TooShort {
        /// Expected minimum size
        expected: usize,
        /// Actual size received
        actual: usize,
    },

    /// Declared payload length runs past the end of the frame
    #[error("payload length exceeds frame size")]
    PayloadOverflow,
}
