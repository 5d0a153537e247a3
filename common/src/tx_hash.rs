// Copyright (c) 2024 Botho Foundation

//! The transaction hash type

use core::fmt::{Debug, Display, Formatter, Result as FmtResult};
use displaydoc::Display;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Conversion errors for shared relay types.
#[derive(Clone, Debug, Display, Eq, Error, PartialEq)]
pub enum ConversionError {
    /// Wrong length for a transaction hash: expected {expected}, got {found}
    LengthMismatch {
        /// The required byte length.
        expected: usize,
        /// The length of the rejected input.
        found: usize,
    },
}

/// The witness-inclusive hash identifying a transaction on the relay layer.
///
/// Announcements, reconciliation staging sets, and short-ID computation all
/// key on this value. The fanout selector and the sketch subsystem read it
/// as four little-endian 64-bit words (see [`TxHash::u64_word`]); the word
/// layout is relied upon by remote peers and must not change.
#[derive(Clone, Copy, Default, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub struct TxHash(pub [u8; 32]);

impl TxHash {
    /// Length of the hash in bytes.
    pub const LENGTH: usize = 32;

    /// The little-endian 64-bit word at `index`.
    ///
    /// Word 0 covers bytes 0..8 of the 32-byte value, word 3 covers bytes
    /// 24..32.
    ///
    /// # Panics
    ///
    /// Panics if `index > 3`.
    pub fn u64_word(&self, index: usize) -> u64 {
        let mut word = [0u8; 8];
        word.copy_from_slice(&self.0[index * 8..(index + 1) * 8]);
        u64::from_le_bytes(word)
    }

    /// The raw hash bytes.
    pub fn as_bytes(&self) -> &[u8; TxHash::LENGTH] {
        &self.0
    }
}

impl AsRef<[u8]> for TxHash {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl From<[u8; TxHash::LENGTH]> for TxHash {
    fn from(src: [u8; TxHash::LENGTH]) -> Self {
        Self(src)
    }
}

impl From<TxHash> for [u8; TxHash::LENGTH] {
    fn from(src: TxHash) -> Self {
        src.0
    }
}

impl TryFrom<&[u8]> for TxHash {
    type Error = ConversionError;

    fn try_from(src: &[u8]) -> Result<Self, Self::Error> {
        let bytes: [u8; TxHash::LENGTH] =
            src.try_into().map_err(|_| ConversionError::LengthMismatch {
                expected: TxHash::LENGTH,
                found: src.len(),
            })?;
        Ok(Self(bytes))
    }
}

impl Display for TxHash {
    fn fmt(&self, f: &mut Formatter) -> FmtResult {
        write!(f, "{}", hex::encode(self.0))
    }
}

impl Debug for TxHash {
    fn fmt(&self, f: &mut Formatter) -> FmtResult {
        write!(f, "TxHash({self})")
    }
}
