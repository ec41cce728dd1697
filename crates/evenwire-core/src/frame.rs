//! Frame layout for the tunnel wire protocol.
//!
//! Before sealing, every frame is a fixed-size plaintext buffer laid out as
//! `[state:u8][length:u16 LE][payload:length][zero padding]`. The state byte
//! carries the sender's flow-control signal; the length field describes the
//! real payload, and everything past it is zero so that cover frames and
//! data frames are indistinguishable once sealed.

use crate::error::FrameError;

/// Size of the flow-control state field
pub const STATE_SIZE: usize = 1;

/// Size of the payload length field
pub const LENGTH_SIZE: usize = 2;

/// Total header size preceding the payload
pub const HEADER_SIZE: usize = STATE_SIZE + LENGTH_SIZE;

/// Write the frame header into `frame`.
///
/// The payload bytes at `HEADER_SIZE..HEADER_SIZE + data_len` are assumed
/// to be filled in already; the rest of the buffer must be zero.
pub fn pack(frame: &mut [u8], state: u8, data_len: usize) {
    debug_assert!(data_len <= max_payload(frame.len()));
    frame[0] = state;
    frame[STATE_SIZE..HEADER_SIZE].copy_from_slice(&(data_len as u16).to_le_bytes());
}

/// Parse a frame, returning the state byte and a view of the payload.
///
/// The payload may be empty (cover frame).
///
/// # Errors
///
/// Returns `FrameError::TooShort` if the buffer cannot hold a header and
/// `FrameError::PayloadOverflow` if the declared length runs past the end.
/// Neither occurs on frames produced by [`pack`] with a valid length.
pub fn unpack(frame: &[u8]) -> Result<(u8, &[u8]), FrameError> {
    if frame.len() < HEADER_SIZE {
        return Err(FrameError::TooShort {
            expected: HEADER_SIZE,
            actual: frame.len(),
        });
    }
    let state = frame[0];
    let data_len = u16::from_le_bytes([frame[STATE_SIZE], frame[STATE_SIZE + 1]]) as usize;
    let payload = frame[HEADER_SIZE..]
        .get(..data_len)
        .ok_or(FrameError::PayloadOverflow)?;
    Ok((state, payload))
}

/// The writable payload region of an unpacked frame buffer.
#[must_use]
pub fn payload_mut(frame: &mut [u8]) -> &mut [u8] {
    &mut frame[HEADER_SIZE..]
}

/// Maximum payload a frame of `plaintext_size` bytes can carry.
#[must_use]
pub fn max_payload(plaintext_size: usize) -> usize {
    plaintext_size.saturating_sub(HEADER_SIZE)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode_hex(hex: &str) -> Vec<u8> {
        (0..hex.len())
            .step_by(2)
            .map(|i| u8::from_str_radix(&hex[i..i + 2], 16).unwrap())
            .collect()
    }

    #[test]
    fn test_pack_vectors() {
        let cases: [(u8, usize, &str); 3] = [
            (0, 10, "000a000000000000000000000000000000000000"),
            (1, 10, "010a000000000000000000000000000000000000"),
            (1, 1, "0101000000000000000000000000000000000000"),
        ];

        for (state, data_len, frame_hex) in cases {
            let mut frame = vec![0u8; 20];
            pack(&mut frame, state, data_len);
            assert_eq!(frame, decode_hex(frame_hex));
        }
    }

    #[test]
    fn test_unpack_vectors() {
        let cases: [(&str, u8, &str); 3] = [
            ("0001000000000000000000000000000000000000", 0, "00"),
            ("0101000000000000000000000000000000000000", 1, "00"),
            ("0002001234500000000000000000000000000000", 0, "1234"),
        ];

        for (frame_hex, want_state, payload_hex) in cases {
            let frame = decode_hex(frame_hex);
            let (state, payload) = unpack(&frame).unwrap();
            assert_eq!(state, want_state);
            assert_eq!(payload, decode_hex(payload_hex).as_slice());
        }
    }

    #[test]
    fn test_round_trip() {
        for state in [0u8, 1] {
            for data_len in [0usize, 1, 17, 45] {
                let mut frame = vec![0u8; 48];
                let payload: Vec<u8> = (0..data_len as u8).collect();
                payload_mut(&mut frame)[..data_len].copy_from_slice(&payload);
                pack(&mut frame, state, data_len);

                let (got_state, got_payload) = unpack(&frame).unwrap();
                assert_eq!(got_state, state);
                assert_eq!(got_payload, payload.as_slice());
            }
        }
    }

    #[test]
    fn test_empty_payload() {
        let mut frame = vec![0u8; 16];
        pack(&mut frame, 0, 0);
        let (state, payload) = unpack(&frame).unwrap();
        assert_eq!(state, 0);
        assert!(payload.is_empty());
    }

    #[test]
    fn test_too_short() {
        assert!(matches!(
            unpack(&[0u8; 2]),
            Err(FrameError::TooShort { .. })
        ));
    }

    #[test]
    fn test_payload_overflow() {
        let mut frame = vec![0u8; 8];
        // Declares 100 payload bytes in an 8-byte frame
        frame[1] = 100;
        assert!(matches!(unpack(&frame), Err(FrameError::PayloadOverflow)));
    }

    #[test]
    fn test_max_payload() {
        assert_eq!(max_payload(48), 45);
        assert_eq!(max_payload(HEADER_SIZE), 0);
        assert_eq!(max_payload(0), 0);
    }
}
