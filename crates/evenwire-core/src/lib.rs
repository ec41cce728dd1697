//! # Evenwire Core
//!
//! A bidirectional, length-hiding, constant-rate encrypted tunnel between
//! two peers.
//!
//! This crate provides:
//! - Fixed-size frame packing with an embedded flow-control byte
//! - A ticker-driven sealing loop that emits one AEAD frame per tick,
//!   padding with cover frames when no plaintext is pending
//! - The matching opening loop with a bounded delivery queue
//! - Session setup: ephemeral X25519 exchange mixed with a pre-shared key
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                          Tunnel                                   │
//! │   (one session: handshake, two directions, shared flow signals)  │
//! ├──────────────────────────────────────────────────────────────────┤
//! │                  Sealing / opening loops                          │
//! │   (one frame per tick per direction, cover traffic included)     │
//! ├──────────────────────────────────────────────────────────────────┤
//! │                          Frames                                   │
//! │   (fixed-size AEAD units; state byte + length + payload + pad)   │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! On the wire every frame in a direction is exactly the same size and
//! frames are emitted at a fixed cadence, so an observer learns nothing
//! from lengths or timing. The flow-control byte inside the encrypted
//! header lets each side pause the other's plaintext intake when its own
//! delivery queue backs up.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_op_in_unsafe_fn)]

pub mod decrypt;
pub mod encrypt;
pub mod error;
pub mod flow;
pub mod frame;
mod task;
pub mod tunnel;

use std::time::Duration;

pub use decrypt::decrypt_stream;
pub use encrypt::encrypt_stream;
pub use error::{Error, FrameError};
pub use flow::FlowSignals;
pub use tunnel::{Role, TunnelConfig, connect};

/// Default ciphertext frame size in bytes
pub const DEFAULT_FRAME_SIZE: usize = 1000;

/// Default tick period
pub const DEFAULT_PERIOD: Duration = Duration::from_millis(10);

/// Capacity of the queue feeding the plaintext sink; reaching it is fatal
pub const WRITE_QUEUE_CAPACITY: usize = 10;

/// Queue depth at which this side asks the peer to pause real traffic
pub const WRITE_QUEUE_HIGH_WATER: usize = 5;
