// Copyright (c) 2024 Botho Foundation

//! The peer ID type

use core::fmt::{Display, Formatter, Result as FmtResult};
use serde::{Deserialize, Serialize};

/// Connection-scoped peer identifier.
///
/// Assigned by the connection layer when a peer connects, and unique for the
/// lifetime of that connection (identifiers are never reused). The relay
/// layer treats it as fully opaque and only ever uses it as a map key.
#[derive(
    Clone, Copy, Debug, Default, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize,
)]
pub struct PeerId(pub u64);

impl Display for PeerId {
    fn fmt(&self, f: &mut Formatter) -> FmtResult {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for PeerId {
    fn from(src: u64) -> Self {
        Self(src)
    }
}

impl From<PeerId> for u64 {
    fn from(src: PeerId) -> u64 {
        src.0
    }
}
