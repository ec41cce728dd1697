//! # Evenwire Crypto
//!
//! Cryptographic primitives for the evenwire tunnel.
//!
//! This crate provides:
//! - X25519 ephemeral key exchange with RFC 7748 clamping
//! - AES-128-GCM frame sealing keyed through HKDF-SHA256
//! - Counter-based nonces (one monotonic counter per direction)
//! - OS-sourced randomness for key seeds, handshake padding, and
//!   pre-shared keys
//!
//! ## Cryptographic Suite
//!
//! | Function | Algorithm | Security Level |
//! |----------|-----------|----------------|
//! | Key Exchange | X25519 | 128-bit |
//! | AEAD | AES-128-GCM | 128-bit key |
//! | KDF | HKDF-SHA256 | 128-bit |
//!
//! Each session derives two independent AEAD keys from the same session
//! secret by expanding it under two direction labels, so the client-to-server
//! and server-to-client streams never share a key or a nonce sequence.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_op_in_unsafe_fn)]

pub mod aead;
pub mod error;
pub mod keys;
pub mod random;

pub use aead::{AeadCipher, Nonce};
pub use error::CryptoError;
pub use keys::{PrivateKey, PublicKey, SharedSecret};

/// X25519 public key size
pub const PUBLIC_KEY_SIZE: usize = 32;

/// X25519 secret key size
pub const SECRET_KEY_SIZE: usize = 32;

/// AES-128 key size
pub const AES_KEY_SIZE: usize = 16;

/// AES-GCM nonce size
pub const NONCE_SIZE: usize = 12;

/// AES-GCM authentication tag size
pub const TAG_SIZE: usize = 16;

/// HKDF info label for the client-to-server direction
pub const CLIENT_TO_SERVER: &str = "client->server";

/// HKDF info label for the server-to-client direction
pub const SERVER_TO_CLIENT: &str = "server->client";
