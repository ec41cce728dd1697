//! The sealing half of a tunnel direction.
//!
//! One frame leaves on every tick, whether or not any plaintext arrived.
//! A background task owns the plaintext source and runs its own ticker:
//! each tick it takes a single read of whatever is available (at most one
//! payload's worth) and hands the filled frame to the main loop, unless the
//! peer has signalled congestion. The main loop ticks at the same period,
//! takes a pending frame if one is ready without waiting, or an all-zero
//! cover frame otherwise, seals it under the next counter nonce, and writes
//! exactly one ciphertext frame.
//!
//! A source error reaches the main loop through a dedicated channel that is
//! polled against the ticker, so it can surface up to one tick late.

use std::io;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tokio::time::{self, MissedTickBehavior};

use evenwire_crypto::{AeadCipher, Nonce, TAG_SIZE};

use crate::error::Error;
use crate::flow::FlowSignals;
use crate::frame;
use crate::task::TaskGuard;

/// Run the sealing loop: `reader` is the local plaintext source, `writer`
/// the remote ciphertext side.
///
/// Emits one `frame_size`-byte ciphertext frame per `period`, forever.
/// Returns the first error from the source, the sealer, or the transport;
/// the background source task is always stopped before returning.
///
/// # Errors
///
/// All errors are fatal to the session; see [`Error`].
pub async fn encrypt_stream<R, W>(
    reader: R,
    mut writer: W,
    cipher: AeadCipher,
    frame_size: usize,
    period: Duration,
    signals: Arc<FlowSignals>,
) -> Result<(), Error>
where
    R: AsyncRead + Unpin + Send + 'static,
    W: AsyncWrite + Unpin,
{
    let plaintext_size = frame_size - TAG_SIZE;
    let (frame_tx, mut frame_rx) = mpsc::channel::<Vec<u8>>(1);
    let (error_tx, mut error_rx) = mpsc::channel::<io::Error>(1);
    let source = TaskGuard::new(tokio::spawn(read_source(
        reader,
        plaintext_size,
        period,
        Arc::clone(&signals),
        frame_tx,
        error_tx,
    )));

    let result = async {
        let mut ticker = time::interval_at(time::Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        for counter in 0u64.. {
            tokio::select! {
                err = error_rx.recv() => return Err(source_error(err)),
                _ = ticker.tick() => {}
            }
            // A ready frame if there is one, cover traffic otherwise; never
            // wait on the source.
            let plaintext = match frame_rx.try_recv() {
                Ok(plaintext) => plaintext,
                Err(_) => vec![0u8; plaintext_size],
            };
            let sealed = cipher
                .seal(&Nonce::from_counter(counter), &plaintext)
                .map_err(Error::Seal)?;
            if sealed.len() != frame_size {
                return Err(Error::SealedLength {
                    got: sealed.len(),
                    want: frame_size,
                });
            }
            writer.write_all(&sealed).await.map_err(Error::CiphertextWrite)?;
            writer.flush().await.map_err(Error::CiphertextWrite)?;
        }
        unreachable!("frame counter exhausted")
    }
    .await;

    source.join().await;
    result
}

fn source_error(err: Option<io::Error>) -> Error {
    Error::PlaintextRead(err.unwrap_or_else(|| {
        io::Error::new(io::ErrorKind::UnexpectedEof, "plaintext source task stopped")
    }))
}

/// Ticker-driven plaintext intake. One read per tick, skipped entirely
/// while the peer reports congestion.
async fn read_source<R>(
    mut reader: R,
    plaintext_size: usize,
    period: Duration,
    signals: Arc<FlowSignals>,
    frames: mpsc::Sender<Vec<u8>>,
    errors: mpsc::Sender<io::Error>,
) where
    R: AsyncRead + Unpin,
{
    let mut ticker = time::interval_at(time::Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    loop {
        ticker.tick().await;
        if signals.peer_congested() {
            continue;
        }
        let mut plaintext = vec![0u8; plaintext_size];
        // One short read: take what is available, wait for at least one
        // byte, never for a full payload.
        match reader.read(frame::payload_mut(&mut plaintext)).await {
            Ok(0) => {
                let closed = io::Error::new(io::ErrorKind::UnexpectedEof, "plaintext source closed");
                let _ = errors.send(closed).await;
                return;
            }
            Ok(n) => {
                frame::pack(&mut plaintext, signals.local_state(), n);
                if frames.send(plaintext).await.is_err() {
                    return;
                }
            }
            Err(err) => {
                let _ = errors.send(err).await;
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::duplex;
    use tokio::time::timeout;

    const FRAME_SIZE: usize = 64;
    const PERIOD: Duration = Duration::from_millis(2);

    fn cipher() -> AeadCipher {
        AeadCipher::derive(b"loop test secret", "outgoing").unwrap()
    }

    async fn read_frame<R: AsyncRead + Unpin>(transport: &mut R, counter: u64) -> (u8, Vec<u8>) {
        let mut sealed = vec![0u8; FRAME_SIZE];
        timeout(Duration::from_secs(5), transport.read_exact(&mut sealed))
            .await
            .expect("timed out waiting for a frame")
            .unwrap();
        let plaintext = cipher()
            .open(&Nonce::from_counter(counter), &sealed)
            .expect("frame failed to authenticate");
        let (state, payload) = frame::unpack(&plaintext).unwrap();
        (state, payload.to_vec())
    }

    #[tokio::test]
    async fn test_emits_cover_frames_without_input() {
        let (_source, plain) = duplex(256);
        let (transport, mut observer) = duplex(64 * 1024);
        let signals = Arc::new(FlowSignals::new());

        let _loop = tokio::spawn(encrypt_stream(
            plain,
            transport,
            cipher(),
            FRAME_SIZE,
            PERIOD,
            signals,
        ));

        for counter in 0..3 {
            let (state, payload) = read_frame(&mut observer, counter).await;
            assert_eq!(state, 0);
            assert!(payload.is_empty());
        }
    }

    #[tokio::test]
    async fn test_carries_pending_data() {
        let (mut source, plain) = duplex(256);
        let (transport, mut observer) = duplex(64 * 1024);
        let signals = Arc::new(FlowSignals::new());

        let _loop = tokio::spawn(encrypt_stream(
            plain,
            transport,
            cipher(),
            FRAME_SIZE,
            PERIOD,
            signals,
        ));

        source.write_all(b"hello tunnel").await.unwrap();

        let mut delivered = Vec::new();
        for counter in 0..20 {
            let (_, payload) = read_frame(&mut observer, counter).await;
            delivered.extend_from_slice(&payload);
            if delivered.len() >= 12 {
                break;
            }
        }
        assert_eq!(delivered, b"hello tunnel");
    }

    #[tokio::test]
    async fn test_honors_peer_congestion() {
        let (mut source, plain) = duplex(256);
        let (transport, mut observer) = duplex(64 * 1024);
        let signals = Arc::new(FlowSignals::new());

        signals.set_peer(1);
        let _loop = tokio::spawn(encrypt_stream(
            plain,
            transport,
            cipher(),
            FRAME_SIZE,
            PERIOD,
            Arc::clone(&signals),
        ));

        source.write_all(b"held back").await.unwrap();

        // While the peer is congested, only cover frames go out.
        let mut counter = 0;
        for _ in 0..5 {
            let (_, payload) = read_frame(&mut observer, counter).await;
            assert!(payload.is_empty());
            counter += 1;
        }

        // Clearing the signal lets the pending data through.
        signals.set_peer(0);
        let mut delivered = Vec::new();
        for _ in 0..20 {
            let (_, payload) = read_frame(&mut observer, counter).await;
            counter += 1;
            delivered.extend_from_slice(&payload);
            if !delivered.is_empty() {
                break;
            }
        }
        assert_eq!(delivered, b"held back");
    }

    #[tokio::test]
    async fn test_source_eof_is_fatal() {
        let (source, plain) = duplex(256);
        let (transport, mut observer) = duplex(64 * 1024);
        let signals = Arc::new(FlowSignals::new());

        let handle = tokio::spawn(encrypt_stream(
            plain,
            transport,
            cipher(),
            FRAME_SIZE,
            PERIOD,
            signals,
        ));

        drop(source);

        // Keep draining so the loop is never blocked on the transport.
        let drain = tokio::spawn(async move {
            let mut sink = vec![0u8; FRAME_SIZE];
            while observer.read_exact(&mut sink).await.is_ok() {}
        });

        let result = timeout(Duration::from_secs(5), handle)
            .await
            .expect("loop did not stop on source EOF")
            .unwrap();
        assert!(matches!(result, Err(Error::PlaintextRead(_))));
        drain.abort();
    }

    #[tokio::test]
    async fn test_frames_keep_cadence() {
        let (_source, plain) = duplex(256);
        let (transport, mut observer) = duplex(64 * 1024);
        let signals = Arc::new(FlowSignals::new());
        let period = Duration::from_millis(10);

        let start = time::Instant::now();
        let _loop = tokio::spawn(encrypt_stream(
            plain,
            transport,
            cipher(),
            FRAME_SIZE,
            period,
            signals,
        ));

        let mut sealed = vec![0u8; FRAME_SIZE * 5];
        timeout(Duration::from_secs(5), observer.read_exact(&mut sealed))
            .await
            .expect("timed out waiting for frames")
            .unwrap();

        // Five frames cannot appear faster than the ticker allows.
        assert!(start.elapsed() >= period * 4);

        // And each chunk authenticates as its own fixed-size frame.
        for counter in 0..5 {
            let chunk = &sealed[counter as usize * FRAME_SIZE..][..FRAME_SIZE];
            cipher()
                .open(&Nonce::from_counter(counter), chunk)
                .expect("frame failed to authenticate");
        }
    }
}
