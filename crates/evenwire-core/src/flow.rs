//! Cross-direction flow-control signals.
//!
//! One pair of atomic cells per session, shared by the sealing and opening
//! loops. The opening loop writes both: the peer's state byte from each
//! received frame, and the local state derived from its delivery queue
//! depth. The sealing loop reads both: it skips plaintext intake while the
//! peer is congested, and stamps the local state into every outgoing frame.
//!
//! Relaxed ordering suffices; the signals are hints with bounded lag, not
//! invariants.

use std::sync::atomic::{AtomicU32, Ordering};

/// Flow-control signals shared between the two directions of a session.
#[derive(Debug, Default)]
pub struct FlowSignals {
    peer: AtomicU32,
    local: AtomicU32,
}

impl FlowSignals {
    /// Create a signal pair with both sides reporting "accepting".
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the peer has asked us to pause real traffic.
    #[must_use]
    pub fn peer_congested(&self) -> bool {
        self.peer.load(Ordering::Relaxed) != 0
    }

    /// Record the peer's state byte from a received frame.
    pub(crate) fn set_peer(&self, state: u8) {
        self.peer.store(u32::from(state), Ordering::Relaxed);
    }

    /// The state byte to stamp into the next outgoing frame.
    #[must_use]
    pub fn local_state(&self) -> u8 {
        u8::from(self.local.load(Ordering::Relaxed) != 0)
    }

    /// Record whether the local delivery queue is above the high-water mark.
    pub(crate) fn set_local_congested(&self, congested: bool) {
        self.local.store(u32::from(congested), Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starts_clear() {
        let signals = FlowSignals::new();
        assert!(!signals.peer_congested());
        assert_eq!(signals.local_state(), 0);
    }

    #[test]
    fn test_peer_state_round_trip() {
        let signals = FlowSignals::new();
        signals.set_peer(1);
        assert!(signals.peer_congested());
        signals.set_peer(0);
        assert!(!signals.peer_congested());
    }

    #[test]
    fn test_local_state_round_trip() {
        let signals = FlowSignals::new();
        signals.set_local_congested(true);
        assert_eq!(signals.local_state(), 1);
        signals.set_local_congested(false);
        assert_eq!(signals.local_state(), 0);
    }
}
