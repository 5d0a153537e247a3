// Copyright (c) 2024 Botho Foundation

//! Error types for the relay crate.

use displaydoc::Display;
use thiserror::Error;

/// Protocol violations detected while registering a peer for reconciliation.
///
/// Returned by
/// [`ReconciliationTracker::enable_reconciliation`](crate::ReconciliationTracker::enable_reconciliation).
/// None of these are retried here; the connection layer decides whether a
/// violation warrants disconnecting the peer.
#[derive(Clone, Copy, Debug, Display, Eq, Error, PartialEq)]
pub enum RegistrationError {
    /// Peer is already registered for reconciliation
    AlreadyRegistered,

    /// No local salt was generated for this peer
    MissingLocalSalt,

    /// Unsupported reconciliation protocol version: {0}
    UnsupportedVersion(u32),

    /// Both sides would initiate reconciliation on this link
    RoleConflict,

    /// Peer advertised no reconciliation direction
    NoDirection,
}

/// Convenience alias for registration outcomes.
pub type RegistrationResult = Result<(), RegistrationError>;
