// Copyright (c) 2024 Botho Foundation

//! Tracking of reconciliation-related state across all peers.

use crate::{
    error::{RegistrationError, RegistrationResult},
    fanout::{FanoutDestinations, INBOUND_FANOUT_DESTINATIONS, OUTBOUND_FANOUT_DESTINATIONS},
    salt::SharedSalt,
    schedule::InitiationSchedule,
    state::ReconciliationState,
};
use bth_relay_common::{HashMap, PeerId, TxHash};
use rand_core::{CryptoRng, RngCore};
use std::{sync::Mutex, time::Instant};

/// Current reconciliation protocol version.
///
/// Peers advertising a higher version are downgraded to this one; v1 is the
/// lowest version that exists, so anything below is a protocol violation.
pub const RECON_VERSION: u32 = 1;

/// Parameters announcing our reconciliation support to a peer.
///
/// Produced by [`ReconciliationTracker::suggest_reconciling`] and
/// transmitted verbatim by the wire layer.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct ReconciliationSuggestion {
    /// Whether we want to initiate reconciliation requests (ask for
    /// sketches).
    pub we_initiate: bool,

    /// Whether we agree to respond to reconciliation requests (send our
    /// sketches).
    pub we_respond: bool,

    /// The protocol version we speak.
    pub version: u32,

    /// Our salt contribution for short-ID computation on this link.
    pub salt: u64,
}

/// Snapshot of the tracker's counters.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct TrackerStats {
    /// Peers that completed the first handshake step (have a local salt).
    pub suggested_peers: usize,

    /// Fully registered peers.
    pub registered_peers: usize,

    /// Registered inbound peers eligible as fanout destinations.
    pub inbound_fanout_peers: usize,

    /// Registered outbound peers eligible as fanout destinations.
    pub outbound_fanout_peers: usize,

    /// Peers queued for an outgoing reconciliation round.
    pub queued_initiations: usize,

    /// Transactions staged across all local sets.
    pub staged_transactions: usize,
}

/// All mutable reconciliation state, guarded by the tracker's mutex.
#[derive(Debug)]
struct TrackerInner {
    /// Per-peer locally generated salt contribution.
    ///
    /// Generated randomly per peer to prevent linking of our network
    /// identities across connections, and to stop short-ID collision
    /// attacks from halting relay of a particular transaction.
    local_salts: HashMap<PeerId, u64>,

    /// State of every registered peer.
    states: HashMap<PeerId, ReconciliationState>,

    /// Registered inbound peers, in registration order.
    inbound_fanout: FanoutDestinations,

    /// Registered outbound peers, in registration order.
    outbound_fanout: FanoutDestinations,

    /// Queue of peers we initiate reconciliation with, plus the cadence.
    schedule: InitiationSchedule,
}

impl TrackerInner {
    fn new() -> Self {
        Self {
            local_salts: HashMap::new(),
            states: HashMap::new(),
            inbound_fanout: FanoutDestinations::new(INBOUND_FANOUT_DESTINATIONS),
            outbound_fanout: FanoutDestinations::new(OUTBOUND_FANOUT_DESTINATIONS),
            schedule: InitiationSchedule::new(),
        }
    }

    /// Run every registration check without mutating anything.
    ///
    /// Returns the peer's local salt and whether we will be the initiator.
    fn validate_registration(
        &self,
        peer: PeerId,
        inbound: bool,
        they_may_initiate: bool,
        they_may_respond: bool,
        their_version: u32,
    ) -> Result<(u64, bool), RegistrationError> {
        // Salt or version updates after a successful registration are
        // treated as protocol violations.
        if self.states.contains_key(&peer) {
            return Err(RegistrationError::AlreadyRegistered);
        }

        // Downgrade to the highest version both sides speak. v1 is the
        // lowest version, so advertising something below it is a violation.
        let effective_version = their_version.min(RECON_VERSION);
        if effective_version < 1 {
            return Err(RegistrationError::UnsupportedVersion(their_version));
        }

        let local_salt = *self
            .local_salts
            .get(&peer)
            .ok_or(RegistrationError::MissingLocalSalt)?;

        // Must mirror the role derivation in suggest_reconciling.
        let we_may_initiate = !inbound;
        let we_may_respond = inbound;
        let they_initiate = they_may_initiate && we_may_respond;
        let we_initiate = we_may_initiate && they_may_respond;

        // Both roles are derived from the connection direction, so today the
        // directions cannot collide; a link claiming both would need
        // tie-breaking this version does not implement.
        if they_initiate && we_initiate {
            return Err(RegistrationError::RoleConflict);
        }
        // The peer left both flags unset: no reconciling direction at all.
        if !they_initiate && !we_initiate {
            return Err(RegistrationError::NoDirection);
        }

        Ok((local_salt, we_initiate))
    }
}

/// Coordinates all reconciliation-related communication with peers.
///
/// One instance is shared by the message-processing threads (handshake,
/// peer removal), the validation thread (staging, fanout queries), and the
/// relay ticker (initiation scheduling). A single internal mutex guards all
/// state; no operation blocks on anything else, performs I/O, or hashes
/// while holding it.
#[derive(Debug)]
pub struct ReconciliationTracker {
    inner: Mutex<TrackerInner>,
}

impl ReconciliationTracker {
    /// Create a tracker with no peers.
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(TrackerInner::new()),
        }
    }

    /// Handshake step 0a: generate the parameters inviting a peer to
    /// reconcile.
    ///
    /// Generates and stores the peer-specific salt that short IDs on this
    /// link will be keyed with, and derives our roles from the connection
    /// direction: we only initiate towards outbound peers and only respond
    /// to inbound peers. The returned suggestion is transmitted to the peer;
    /// the peer cannot be registered without this call.
    ///
    /// Must be called at most once per peer. Calling it again is caller
    /// misuse: debug builds abort, release builds keep the original salt.
    pub fn suggest_reconciling<R: RngCore + CryptoRng>(
        &self,
        peer: PeerId,
        inbound: bool,
        rng: &mut R,
    ) -> ReconciliationSuggestion {
        let (we_initiate, we_respond) = if inbound {
            (false, true)
        } else {
            (true, false)
        };

        // Drawn before taking the lock.
        let local_salt = rng.next_u64();

        let mut duplicate = false;
        let salt = {
            let mut inner = self.inner.lock().unwrap();
            match inner.local_salts.get(&peer) {
                Some(existing) => {
                    duplicate = true;
                    *existing
                }
                None => {
                    inner.local_salts.insert(peer, local_salt);
                    local_salt
                }
            }
        };

        debug_assert!(
            !duplicate,
            "suggest_reconciling called twice for peer {peer}"
        );
        if duplicate {
            tracing::warn!(peer = %peer, "ignoring repeated reconciliation suggestion");
        } else {
            tracing::debug!(
                peer = %peer,
                we_initiate,
                we_respond,
                "prepared reconciliation suggestion"
            );
        }

        ReconciliationSuggestion {
            we_initiate,
            we_respond,
            version: RECON_VERSION,
            salt,
        }
    }

    /// Handshake step 0b: the peer agreed to reconcile; register it.
    ///
    /// Validates the peer's advertised roles and version against ours,
    /// combines the two salt contributions into the short-ID keys, installs
    /// the reconciliation state, enrolls the peer as a fanout destination
    /// for its direction, and queues it for outgoing rounds if we are the
    /// initiator.
    ///
    /// Every check runs before any mutation. The SHA-256 salt combination
    /// is computed outside the critical section, so validation happens in
    /// two locked phases; a registration racing in between surfaces as
    /// [`RegistrationError::AlreadyRegistered`].
    pub fn enable_reconciliation(
        &self,
        peer: PeerId,
        inbound: bool,
        they_may_initiate: bool,
        they_may_respond: bool,
        their_version: u32,
        remote_salt: u64,
    ) -> RegistrationResult {
        let (local_salt, we_initiate) = {
            let inner = self.inner.lock().unwrap();
            inner.validate_registration(
                peer,
                inbound,
                they_may_initiate,
                they_may_respond,
                their_version,
            )?
        };

        let full_salt = SharedSalt::compute(local_salt, remote_salt);

        {
            let mut inner = self.inner.lock().unwrap();
            // Re-validate: the peer may have registered or been removed
            // while the hash ran unlocked.
            if inner.states.contains_key(&peer) {
                return Err(RegistrationError::AlreadyRegistered);
            }
            if !inner.local_salts.contains_key(&peer) {
                return Err(RegistrationError::MissingLocalSalt);
            }

            if we_initiate {
                inner.schedule.enqueue(peer);
            }
            inner
                .states
                .insert(peer, ReconciliationState::new(&full_salt, we_initiate));
            if inbound {
                inner.inbound_fanout.register(peer);
            } else {
                inner.outbound_fanout.register(peer);
            }
        }

        tracing::debug!(
            peer = %peer,
            we_initiate,
            they_initiate = !we_initiate,
            "registered peer for reconciliation"
        );

        Ok(())
    }

    /// Step 1: stage transactions for the next reconciliation with a peer.
    ///
    /// Duplicates are silently deduplicated. The peer must be registered
    /// and the batch non-empty; misuse aborts debug builds, release builds
    /// drop the batch.
    pub fn add_to_recon_set(&self, peer: PeerId, txs_to_reconcile: &[TxHash]) {
        debug_assert!(
            !txs_to_reconcile.is_empty(),
            "empty transaction batch staged for peer {peer}"
        );

        let outcome = {
            let mut inner = self.inner.lock().unwrap();
            inner.states.get_mut(&peer).map(|state| {
                let local_set = state.local_set_mut();
                let added = txs_to_reconcile
                    .iter()
                    .filter(|wtxid| local_set.insert(**wtxid))
                    .count();
                (added, local_set.len())
            })
        };

        match outcome {
            Some((added, total)) => {
                tracing::debug!(
                    peer = %peer,
                    added,
                    total,
                    "staged transactions for reconciliation"
                );
            }
            None => {
                debug_assert!(false, "add_to_recon_set for unregistered peer {peer}");
                tracing::warn!(
                    peer = %peer,
                    "dropping transactions staged for an unregistered peer"
                );
            }
        }
    }

    /// Forget all reconciliation state of a peer.
    ///
    /// Idempotent, and tolerant to removal at any point of a partial
    /// handshake. After this, reconciling with the peer requires a fresh
    /// registration.
    pub fn remove_peer(&self, peer: PeerId) {
        let was_tracked = {
            let mut inner = self.inner.lock().unwrap();
            let salt_removed = inner.local_salts.remove(&peer).is_some();
            let state_removed = inner.states.remove(&peer).is_some();
            inner.inbound_fanout.unregister(peer);
            inner.outbound_fanout.unregister(peer);
            inner.schedule.remove(peer);
            salt_removed || state_removed
        };

        if was_tracked {
            tracing::debug!(peer = %peer, "stopped tracking reconciliation state");
        }
    }

    /// Whether the peer completed registration.
    pub fn is_peer_registered(&self, peer: PeerId) -> bool {
        self.inner.lock().unwrap().states.contains_key(&peer)
    }

    /// Whether the *peer* may initiate reconciliations on this link.
    ///
    /// `None` if the peer is not registered.
    pub fn is_peer_initiator(&self, peer: PeerId) -> Option<bool> {
        let inner = self.inner.lock().unwrap();
        inner.states.get(&peer).map(|state| !state.we_initiate())
    }

    /// Size of the local staging set for a peer.
    ///
    /// `None` if the peer is not registered.
    pub fn peer_set_size(&self, peer: PeerId) -> Option<usize> {
        let inner = self.inner.lock().unwrap();
        inner.states.get(&peer).map(|state| state.local_set().len())
    }

    /// Whether `wtxid` should also be flooded (announced by full hash) to
    /// this peer, in addition to being staged for reconciliation.
    ///
    /// Deterministic in the hash and the current fanout lists; see
    /// [`FanoutDestinations::should_flood`] for the selection policy.
    pub fn should_flood_to(&self, wtxid: TxHash, peer: PeerId, inbound: bool) -> bool {
        let inner = self.inner.lock().unwrap();
        let destinations = if inbound {
            &inner.inbound_fanout
        } else {
            &inner.outbound_fanout
        };
        destinations.should_flood(&wtxid, peer)
    }

    /// Pop the next peer to initiate a reconciliation round with.
    ///
    /// Returns a peer only when the request cadence
    /// ([`RECON_REQUEST_INTERVAL`](crate::RECON_REQUEST_INTERVAL)) has
    /// elapsed since the previous initiation; ticking more often is
    /// harmless. The caller runs the round and re-appends the peer with
    /// [`requeue_initiation`](Self::requeue_initiation) once it concludes.
    pub fn next_initiation(&self, now: Instant) -> Option<PeerId> {
        let popped = self.inner.lock().unwrap().schedule.pop_due(now);
        if let Some(peer) = popped {
            tracing::trace!(peer = %peer, "initiating reconciliation round");
        }
        popped
    }

    /// Re-append a peer to the back of the initiation queue after its round
    /// concluded.
    ///
    /// No-op for peers that were removed in the meantime, that we do not
    /// initiate with, or that are already queued.
    pub fn requeue_initiation(&self, peer: PeerId) {
        let mut inner = self.inner.lock().unwrap();
        if inner
            .states
            .get(&peer)
            .is_some_and(|state| state.we_initiate())
        {
            inner.schedule.enqueue(peer);
        }
    }

    /// The peer at the front of the initiation queue, without popping it.
    pub fn peek_initiation(&self) -> Option<PeerId> {
        self.inner.lock().unwrap().schedule.peek()
    }

    /// Run a closure over a registered peer's reconciliation state.
    ///
    /// This is how the sketch subsystem reads the short-ID keys, walks the
    /// staging set, and clears it after a successful round. The closure runs
    /// under the tracker's mutex and the borrow cannot escape it; keep the
    /// work short and in-memory.
    ///
    /// Returns `None` if the peer is not registered.
    pub fn with_recon_state<F, R>(&self, peer: PeerId, f: F) -> Option<R>
    where
        F: FnOnce(&mut ReconciliationState) -> R,
    {
        let mut inner = self.inner.lock().unwrap();
        inner.states.get_mut(&peer).map(f)
    }

    /// Snapshot the tracker's counters.
    pub fn stats(&self) -> TrackerStats {
        let inner = self.inner.lock().unwrap();
        TrackerStats {
            suggested_peers: inner.local_salts.len(),
            registered_peers: inner.states.len(),
            inbound_fanout_peers: inner.inbound_fanout.len(),
            outbound_fanout_peers: inner.outbound_fanout.len(),
            queued_initiations: inner.schedule.len(),
            staged_transactions: inner
                .states
                .values()
                .map(|state| state.local_set().len())
                .sum(),
        }
    }
}

impl Default for ReconciliationTracker {
    fn default() -> Self {
        Self::new()
    }
}
