//! The opening half of a tunnel direction.
//!
//! Each tick reads exactly one ciphertext frame, authenticates it under the
//! next counter nonce, records the peer's flow-control byte, and queues the
//! payload for a background task that drains into the plaintext sink. The
//! queue is bounded: crossing the high-water mark raises the local
//! congestion signal (which the sealing loop stamps into outgoing frames),
//! and filling the queue completely kills the session.
//!
//! Any lost, reordered, or altered transport byte shows up here as an
//! authentication failure and is fatal.

use std::io;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tokio::time::{self, MissedTickBehavior};

use evenwire_crypto::{AeadCipher, Nonce};

use crate::error::Error;
use crate::flow::FlowSignals;
use crate::frame;
use crate::task::TaskGuard;
use crate::{WRITE_QUEUE_CAPACITY, WRITE_QUEUE_HIGH_WATER};

/// Run the opening loop: `reader` is the remote ciphertext side, `writer`
/// the local plaintext sink.
///
/// Consumes one `frame_size`-byte ciphertext frame per `period`, forever.
/// Returns the first transport, authentication, sink, or congestion error;
/// the background sink task is always stopped before returning.
///
/// # Errors
///
/// All errors are fatal to the session; see [`Error`].
pub async fn decrypt_stream<R, W>(
    mut reader: R,
    writer: W,
    cipher: AeadCipher,
    frame_size: usize,
    period: Duration,
    signals: Arc<FlowSignals>,
) -> Result<(), Error>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let (data_tx, data_rx) = mpsc::channel::<Vec<u8>>(WRITE_QUEUE_CAPACITY);
    let (error_tx, mut error_rx) = mpsc::channel::<io::Error>(1);
    let sink = TaskGuard::new(tokio::spawn(write_sink(writer, data_rx, error_tx)));

    let result = async {
        let mut ticker = time::interval_at(time::Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut sealed = vec![0u8; frame_size];
        for counter in 0u64.. {
            tokio::select! {
                err = error_rx.recv() => return Err(sink_error(err)),
                _ = ticker.tick() => {}
            }
            reader
                .read_exact(&mut sealed)
                .await
                .map_err(Error::CiphertextRead)?;
            let plaintext = cipher
                .open(&Nonce::from_counter(counter), &sealed)
                .map_err(|_| Error::Decrypt)?;
            let (state, payload) = frame::unpack(&plaintext)?;
            signals.set_peer(state);

            if data_tx.send(payload.to_vec()).await.is_err() {
                // The sink task is gone; surface its error right away.
                return Err(sink_error(error_rx.recv().await));
            }
            let queued = WRITE_QUEUE_CAPACITY - data_tx.capacity();
            if queued == WRITE_QUEUE_CAPACITY {
                return Err(Error::Congestion);
            }
            signals.set_local_congested(queued >= WRITE_QUEUE_HIGH_WATER);
        }
        unreachable!("frame counter exhausted")
    }
    .await;

    sink.join().await;
    result
}

fn sink_error(err: Option<io::Error>) -> Error {
    Error::PlaintextWrite(err.unwrap_or_else(|| {
        io::Error::new(io::ErrorKind::BrokenPipe, "plaintext sink task stopped")
    }))
}

/// Drain queued payloads into the plaintext sink, in arrival order.
async fn write_sink<W>(
    mut writer: W,
    mut payloads: mpsc::Receiver<Vec<u8>>,
    errors: mpsc::Sender<io::Error>,
) where
    W: AsyncWrite + Unpin,
{
    while let Some(payload) = payloads.recv().await {
        let written = async {
            writer.write_all(&payload).await?;
            writer.flush().await
        }
        .await;
        if let Err(err) = written {
            let _ = errors.send(err).await;
            return;
        }
    }
}
