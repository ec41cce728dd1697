//! Session setup and lifetime.
//!
//! A session starts with a cleartext handshake: each side sends exactly one
//! frame-sized message whose first 32 bytes are an ephemeral X25519 public
//! key and whose remainder is random padding, so the handshake is the same
//! size as every later data frame. The shared secret, concatenated with the
//! pre-shared key, seeds HKDF; the two direction labels then yield
//! independent AES-128-GCM keys. Mutual authentication is implicit: without
//! the pre-shared key no frame in either direction will authenticate.
//!
//! After the handshake the sealing and opening loops run concurrently. The
//! first error from either direction wins, the other loop is cancelled, and
//! both streams are dropped so the peer's loops unblock. There is no clean
//! shutdown protocol.

use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::task::JoinError;
use tracing::debug;
use zeroize::Zeroizing;

use evenwire_crypto::{
    AeadCipher, CLIENT_TO_SERVER, PUBLIC_KEY_SIZE, PrivateKey, PublicKey, SERVER_TO_CLIENT,
    TAG_SIZE, random,
};

use crate::decrypt::decrypt_stream;
use crate::encrypt::encrypt_stream;
use crate::error::Error;
use crate::flow::FlowSignals;
use crate::{DEFAULT_FRAME_SIZE, DEFAULT_PERIOD};

/// Which end of the tunnel this session is.
///
/// The role only selects the direction labels: the client seals under the
/// client-to-server key and opens under the other, the server the reverse.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// The dialing end
    Client,
    /// The accepting end
    Server,
}

impl Role {
    fn seal_label(self) -> &'static str {
        match self {
            Role::Client => CLIENT_TO_SERVER,
            Role::Server => SERVER_TO_CLIENT,
        }
    }

    fn open_label(self) -> &'static str {
        match self {
            Role::Client => SERVER_TO_CLIENT,
            Role::Server => CLIENT_TO_SERVER,
        }
    }
}

/// Tunnel tunables.
///
/// Both ends must agree on `frame_size`; `period` only sets the local
/// cadence and may differ between the ends.
#[derive(Debug, Clone, Copy)]
pub struct TunnelConfig {
    /// Size of every ciphertext frame on the wire, in bytes
    pub frame_size: usize,
    /// Interval between frames, per direction
    pub period: Duration,
}

impl Default for TunnelConfig {
    fn default() -> Self {
        Self {
            frame_size: DEFAULT_FRAME_SIZE,
            period: DEFAULT_PERIOD,
        }
    }
}

impl TunnelConfig {
    /// Check that the configuration can carry a handshake and a frame
    /// header.
    ///
    /// # Errors
    ///
    /// Returns `Error::FrameSizeTooSmall` when a public key would not fit
    /// and `Error::ZeroPeriod` for a zero tick period.
    pub fn validate(&self) -> Result<(), Error> {
        if self.frame_size < PUBLIC_KEY_SIZE {
            return Err(Error::FrameSizeTooSmall {
                got: self.frame_size,
                min: PUBLIC_KEY_SIZE,
            });
        }
        if self.period.is_zero() {
            return Err(Error::ZeroPeriod);
        }
        Ok(())
    }

    /// Plaintext bytes available inside each frame before the AEAD tag.
    #[must_use]
    pub fn plaintext_size(&self) -> usize {
        self.frame_size - TAG_SIZE
    }
}

/// Run one tunnel session over the given streams.
///
/// `plain` is the local cleartext side (stdio, a forwarded connection);
/// `transport` is the remote side carrying handshake and ciphertext frames.
/// `key` is the pre-shared key, opaque bytes agreed out of band.
///
/// The call performs the handshake, then runs both directions until either
/// fails; the first error is returned and both streams are closed. It does
/// not return on success, because there is none: a session only ends by
/// failing.
///
/// # Errors
///
/// All errors are fatal to the session; see [`Error`].
pub async fn connect<P, T>(
    plain: P,
    transport: T,
    key: &[u8],
    role: Role,
    config: TunnelConfig,
) -> Result<(), Error>
where
    P: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    T: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    config.validate()?;
    let mut transport = transport;

    let private_key = PrivateKey::generate().map_err(Error::KeyExchange)?;
    let mut hello = vec![0u8; config.frame_size];
    hello[..PUBLIC_KEY_SIZE].copy_from_slice(private_key.public_key().as_bytes());
    random::fill(&mut hello[PUBLIC_KEY_SIZE..]).map_err(Error::HandshakePadding)?;
    transport.write_all(&hello).await.map_err(Error::SendPublicKey)?;
    transport.flush().await.map_err(Error::SendPublicKey)?;

    let mut peer_hello = vec![0u8; config.frame_size];
    transport
        .read_exact(&mut peer_hello)
        .await
        .map_err(Error::ReceivePublicKey)?;
    let mut peer_public = [0u8; PUBLIC_KEY_SIZE];
    peer_public.copy_from_slice(&peer_hello[..PUBLIC_KEY_SIZE]);
    let peer_public = PublicKey::from_bytes(peer_public);

    let shared = private_key
        .shared_secret(&peer_public)
        .ok_or(Error::LowOrderPeerKey)?;
    let mut session_secret =
        Zeroizing::new(Vec::with_capacity(shared.as_bytes().len() + key.len()));
    session_secret.extend_from_slice(shared.as_bytes());
    session_secret.extend_from_slice(key);

    let seal_cipher =
        AeadCipher::derive(&session_secret, role.seal_label()).map_err(Error::DeriveKey)?;
    let open_cipher =
        AeadCipher::derive(&session_secret, role.open_label()).map_err(Error::DeriveKey)?;
    drop(session_secret);

    debug!(?role, frame_size = config.frame_size, "handshake complete");

    let signals = Arc::new(FlowSignals::new());
    let (plain_reader, plain_writer) = tokio::io::split(plain);
    let (transport_reader, transport_writer) = tokio::io::split(transport);

    let mut sealing = tokio::spawn(encrypt_stream(
        plain_reader,
        transport_writer,
        seal_cipher,
        config.frame_size,
        config.period,
        Arc::clone(&signals),
    ));
    let mut opening = tokio::spawn(decrypt_stream(
        transport_reader,
        plain_writer,
        open_cipher,
        config.frame_size,
        config.period,
        signals,
    ));

    // First failure wins; cancel the other direction and wait for it so
    // both stream halves are dropped before returning.
    let result = tokio::select! {
        res = &mut sealing => {
            opening.abort();
            let _ = (&mut opening).await;
            flatten(res)
        }
        res = &mut opening => {
            sealing.abort();
            let _ = (&mut sealing).await;
            flatten(res)
        }
    };
    if let Err(err) = &result {
        debug!(%err, ?role, "tunnel terminated");
    }
    result
}

fn flatten(res: Result<Result<(), Error>, JoinError>) -> Result<(), Error> {
    match res {
        Ok(inner) => inner,
        Err(join) => Err(Error::Task(join)),
    }
}
