// Copyright (c) 2024 Botho Foundation

//! Transaction reconciliation for the relay layer.
//!
//! Reconciliation is a way for nodes to efficiently announce transactions.
//! Instead of flooding every transaction identifier to every peer, two nodes
//! periodically compute the symmetric difference of the sets of transactions
//! each intends to announce, and exchange only that difference. The
//! high-level protocol is:
//!
//! 0. Reconciliation protocol handshake.
//! 1. Once we accept a new transaction for relay, add it to the per-peer set
//!    instead of announcing it immediately.
//! 2. When the time comes, a reconciliation initiator requests a sketch from
//!    the peer, where a sketch is a compressed representation of their set.
//! 3. Once the initiator received the sketch, it computes a local sketch and
//!    combines the two to find the difference in *sets*.
//! 4. The initiator then requests what it is missing and announces to the
//!    peer what the peer is missing.
//! 5. If the difference was larger than estimated, one sketch extension
//!    round requests extra data; if that also fails, both sides fall back to
//!    announcing everything in their sets.
//!
//! # What lives here
//!
//! This crate owns step 0 and step 1 plus the dispatch policy around them:
//!
//! - the one-shot handshake ([`ReconciliationTracker::suggest_reconciling`]
//!   and [`ReconciliationTracker::enable_reconciliation`]) with per-peer
//!   salt generation and role negotiation,
//! - the shared-salt derivation producing the short-ID keys
//!   ([`SharedSalt`]),
//! - the per-peer staging sets ([`ReconciliationSet`]),
//! - the round-robin queue of outgoing initiations
//!   ([`InitiationSchedule`]),
//! - and the deterministic low-fanout selector deciding which transactions
//!   are additionally announced by full hash ([`FanoutDestinations`]).
//!
//! The sketch rounds themselves (steps 2-5) live in the sketch subsystem,
//! which obtains the per-link keys and the staging set through
//! [`ReconciliationTracker::with_recon_state`]. Wire framing, mempool
//! policy, and disconnect decisions are equally the embedding node's
//! concern.
//!
//! All shared state sits behind a single mutex inside
//! [`ReconciliationTracker`]; every public operation is safe to call from
//! the message-processing, validation, and relay-ticker threads.

#![warn(missing_docs)]
#![warn(unused_extern_crates)]

pub mod error;
pub mod fanout;
pub mod salt;
pub mod schedule;
pub mod state;
pub mod tracker;

pub use error::{RegistrationError, RegistrationResult};
pub use fanout::{FanoutDestinations, INBOUND_FANOUT_DESTINATIONS, OUTBOUND_FANOUT_DESTINATIONS};
pub use salt::SharedSalt;
pub use schedule::{InitiationSchedule, RECON_REQUEST_INTERVAL};
pub use state::{ReconciliationSet, ReconciliationState};
pub use tracker::{ReconciliationSuggestion, ReconciliationTracker, TrackerStats, RECON_VERSION};
