// Copyright (c) 2024 Botho Foundation

//! Deterministic low-fanout destination selection.
//!
//! Reconciliation saves bandwidth at the cost of latency, so a small number
//! of peers still receive each transaction by immediate announcement. The
//! destinations are chosen deterministically from the transaction hash:
//! across the network, the fanout targets for a given transaction converge
//! to the same small subset of peers (modulo local list membership), which
//! bounds total fanout bandwidth without any coordination.

use bth_relay_common::{PeerId, TxHash};

/// Number of inbound peers a given transaction is flooded to.
pub const INBOUND_FANOUT_DESTINATIONS: usize = 2;

/// Number of outbound peers a given transaction is flooded to.
pub const OUTBOUND_FANOUT_DESTINATIONS: usize = 2;

/// Ordered list of registered peers eligible as fanout destinations.
///
/// The order is load-bearing: selection walks a circular window over the
/// list, so destinations must be appended on registration and removed
/// in place, preserving the relative order of the remaining entries. The
/// tracker keeps one list for inbound and one for outbound peers; a peer
/// belongs to exactly one of the two.
#[derive(Clone, Debug)]
pub struct FanoutDestinations {
    destinations: Vec<PeerId>,
    window: usize,
}

impl FanoutDestinations {
    /// Create an empty list selecting `window` destinations per transaction.
    pub fn new(window: usize) -> Self {
        Self {
            destinations: Vec::new(),
            window,
        }
    }

    /// Append a newly registered peer.
    pub fn register(&mut self, peer: PeerId) {
        debug_assert!(
            !self.contains(peer),
            "peer {peer} already enrolled for fanout"
        );
        self.destinations.push(peer);
    }

    /// Remove a peer, keeping the relative order of the others.
    pub fn unregister(&mut self, peer: PeerId) {
        self.destinations.retain(|candidate| *candidate != peer);
    }

    /// Whether a peer is enrolled.
    pub fn contains(&self, peer: PeerId) -> bool {
        self.destinations.contains(&peer)
    }

    /// Number of enrolled peers.
    pub fn len(&self) -> usize {
        self.destinations.len()
    }

    /// Whether no peers are enrolled.
    pub fn is_empty(&self) -> bool {
        self.destinations.is_empty()
    }

    /// Whether `peer` is a fanout destination for `wtxid`.
    ///
    /// The window starts at little-endian word 3 of the hash modulo the list
    /// length and wraps around the end of the list; the peer is selected iff
    /// it occupies one of the `window` positions from there. Word 3 is a wire
    /// constant shared with remote peers so that disconnect/reconnect churn
    /// does not bias the distribution.
    pub fn should_flood(&self, wtxid: &TxHash, peer: PeerId) -> bool {
        if self.destinations.is_empty() {
            return false;
        }

        let len = self.destinations.len();
        let start = (wtxid.u64_word(3) % len as u64) as usize;
        (0..self.window).any(|offset| self.destinations[(start + offset) % len] == peer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tx_with_word3(word3: u64) -> TxHash {
        let mut bytes = [0u8; 32];
        bytes[24..32].copy_from_slice(&word3.to_le_bytes());
        TxHash(bytes)
    }

    fn five_peers() -> FanoutDestinations {
        let mut destinations = FanoutDestinations::new(2);
        for id in 0..5 {
            destinations.register(PeerId(id));
        }
        destinations
    }

    #[test]
    fn test_window_selects_two_consecutive_peers() {
        let destinations = five_peers();
        // word3 = 2, five peers: window starts at index 2.
        let wtxid = tx_with_word3(2);

        assert!(destinations.should_flood(&wtxid, PeerId(2)));
        assert!(destinations.should_flood(&wtxid, PeerId(3)));
        assert!(!destinations.should_flood(&wtxid, PeerId(4)));
        assert!(!destinations.should_flood(&wtxid, PeerId(0)));
        assert!(!destinations.should_flood(&wtxid, PeerId(1)));
    }

    #[test]
    fn test_window_wraps_around() {
        let destinations = five_peers();
        let wtxid = tx_with_word3(4);

        assert!(destinations.should_flood(&wtxid, PeerId(4)));
        assert!(destinations.should_flood(&wtxid, PeerId(0)));
        assert!(!destinations.should_flood(&wtxid, PeerId(1)));
    }

    #[test]
    fn test_start_index_is_reduced_modulo_len() {
        let destinations = five_peers();
        // 7 mod 5 == 2: same window as word3 = 2.
        let wtxid = tx_with_word3(7);

        assert!(destinations.should_flood(&wtxid, PeerId(2)));
        assert!(destinations.should_flood(&wtxid, PeerId(3)));
        assert!(!destinations.should_flood(&wtxid, PeerId(4)));
    }

    #[test]
    fn test_empty_list_floods_nothing() {
        let destinations = FanoutDestinations::new(2);
        assert!(!destinations.should_flood(&tx_with_word3(0), PeerId(1)));
    }

    #[test]
    fn test_window_larger_than_list() {
        let mut destinations = FanoutDestinations::new(2);
        destinations.register(PeerId(9));

        assert!(destinations.should_flood(&tx_with_word3(0), PeerId(9)));
        assert!(!destinations.should_flood(&tx_with_word3(0), PeerId(10)));
    }

    #[test]
    fn test_unregister_preserves_order() {
        let mut destinations = five_peers();
        destinations.unregister(PeerId(1));

        // Remaining order is [0, 2, 3, 4]; word3 = 1 starts at peer 2.
        let wtxid = tx_with_word3(1);
        assert!(destinations.should_flood(&wtxid, PeerId(2)));
        assert!(destinations.should_flood(&wtxid, PeerId(3)));
        assert!(!destinations.should_flood(&wtxid, PeerId(0)));
        assert!(!destinations.should_flood(&wtxid, PeerId(4)));
    }

    #[test]
    fn test_selection_cardinality_matches_window() {
        let destinations = five_peers();
        let wtxid = tx_with_word3(3);

        let selected = (0..5)
            .filter(|id| destinations.should_flood(&wtxid, PeerId(*id)))
            .count();
        assert_eq!(selected, 2);
    }
}
