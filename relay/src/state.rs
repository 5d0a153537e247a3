// Copyright (c) 2024 Botho Foundation

//! Per-peer reconciliation state.

use crate::salt::SharedSalt;
use bth_relay_common::{HashSet, TxHash};

/// Transactions we want to announce to one peer at its next reconciliation.
///
/// Transactions that passed relay policy are parked here instead of being
/// announced right away. When reconciliation time comes, the sketch
/// subsystem encodes this set into a compact sketch and reconciles it with
/// the matching set on the other side of the connection.
#[derive(Clone, Debug, Default)]
pub struct ReconciliationSet {
    wtxids: HashSet<TxHash>,
}

impl ReconciliationSet {
    /// Create an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stage a transaction. Returns false if it was already staged.
    pub fn insert(&mut self, wtxid: TxHash) -> bool {
        self.wtxids.insert(wtxid)
    }

    /// Whether a transaction is currently staged.
    pub fn contains(&self, wtxid: &TxHash) -> bool {
        self.wtxids.contains(wtxid)
    }

    /// Number of staged transactions.
    pub fn len(&self) -> usize {
        self.wtxids.len()
    }

    /// Whether nothing is staged.
    pub fn is_empty(&self) -> bool {
        self.wtxids.is_empty()
    }

    /// Iterate the staged transactions, in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = &TxHash> {
        self.wtxids.iter()
    }

    /// Drop all staged transactions.
    ///
    /// Must be called at the end of every reconciliation round to avoid
    /// unbounded state growth.
    pub fn clear(&mut self) {
        self.wtxids.clear()
    }
}

/// Reconciliation parameters and staging set for a single registered peer.
///
/// Created once the handshake completes and destroyed when the peer is
/// removed. The role and the short-ID keys are fixed for the lifetime of the
/// connection; only the staging set mutates.
#[derive(Clone, Debug)]
pub struct ReconciliationState {
    /// Short-ID salting keys derived from the shared salt.
    k0: u64,
    k1: u64,

    /// Whether we request sketches from this peer. The protocol assumes each
    /// side keeps one role consistently, so this never changes after
    /// registration.
    we_initiate: bool,

    /// Transactions staged for the next round with this peer.
    local_set: ReconciliationSet,
}

impl ReconciliationState {
    pub(crate) fn new(salt: &SharedSalt, we_initiate: bool) -> Self {
        Self {
            k0: salt.k0(),
            k1: salt.k1(),
            we_initiate,
            local_set: ReconciliationSet::new(),
        }
    }

    /// The key pair used to salt short IDs on this link.
    pub fn short_id_keys(&self) -> (u64, u64) {
        (self.k0, self.k1)
    }

    /// Whether we are the reconciliation initiator towards this peer.
    pub fn we_initiate(&self) -> bool {
        self.we_initiate
    }

    /// The staging set.
    pub fn local_set(&self) -> &ReconciliationSet {
        &self.local_set
    }

    /// Mutable access to the staging set.
    pub fn local_set_mut(&mut self) -> &mut ReconciliationSet {
        &mut self.local_set
    }
}
