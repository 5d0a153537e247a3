// Copyright (c) 2024 Botho Foundation

//! Shared identifier types for the transaction relay workspace.
//!
//! Everything the relay crates key their state on lives here: the
//! connection-scoped [`PeerId`] and the 256-bit [`TxHash`] used to identify
//! transactions across announcements and reconciliation sketches.

pub mod peer_id;
pub mod tx_hash;

pub use peer_id::PeerId;
pub use tx_hash::{ConversionError, TxHash};

/// Hash map used across the workspace.
pub use hashbrown::HashMap;

/// Hash set used across the workspace.
pub use hashbrown::HashSet;
