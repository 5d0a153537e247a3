// Copyright (c) 2024 Botho Foundation

//! Shared salt derivation for transaction short IDs.
//!
//! Reconciliation sketches are computed over short transaction IDs rather
//! than full hashes. Short IDs are keyed per link: each endpoint contributes
//! a random 64-bit salt during the handshake, and both combine the two
//! contributions into one 256-bit shared salt. The first two little-endian
//! words of that salt are the keys the sketch subsystem feeds to its
//! short-ID hash.

use sha2::{Digest, Sha256};

/// Static component of the salt used to compute short transaction IDs.
const RECON_STATIC_SALT: &str = "Tx Relay Salting";

/// 256-bit salt shared by both endpoints of a reconciling link.
///
/// `compute(a, b) == compute(b, a)`, so the two peers derive identical key
/// material without negotiating who hashes first.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct SharedSalt([u8; 32]);

impl SharedSalt {
    /// Combine the two 64-bit salt contributions into the shared salt.
    ///
    /// The contributions are sorted ascending and serialized as little-endian
    /// 8-byte values into a tagged hash:
    /// `SHA256(SHA256(tag) || SHA256(tag) || min || max)` with the tag
    /// `"Tx Relay Salting"`. The sort step makes the function symmetric in
    /// its inputs. Tag, ordering, and endianness are wire constants.
    pub fn compute(local_salt: u64, remote_salt: u64) -> Self {
        let (salt1, salt2) = if local_salt <= remote_salt {
            (local_salt, remote_salt)
        } else {
            (remote_salt, local_salt)
        };

        let tag_hash = Sha256::digest(RECON_STATIC_SALT.as_bytes());
        let mut hasher = Sha256::new();
        hasher.update(tag_hash);
        hasher.update(tag_hash);
        hasher.update(salt1.to_le_bytes());
        hasher.update(salt2.to_le_bytes());
        Self(hasher.finalize().into())
    }

    /// First short-ID key: little-endian word 0 of the shared salt.
    pub fn k0(&self) -> u64 {
        self.u64_word(0)
    }

    /// Second short-ID key: little-endian word 1 of the shared salt.
    pub fn k1(&self) -> u64 {
        self.u64_word(1)
    }

    fn u64_word(&self, index: usize) -> u64 {
        let mut word = [0u8; 8];
        word.copy_from_slice(&self.0[index * 8..(index + 1) * 8]);
        u64::from_le_bytes(word)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compute_is_symmetric() {
        let a = 0x0102030405060708;
        let b = 0x1112131415161718;

        let forward = SharedSalt::compute(a, b);
        let reverse = SharedSalt::compute(b, a);

        assert_eq!(forward, reverse);
        assert_eq!(forward.k0(), reverse.k0());
        assert_eq!(forward.k1(), reverse.k1());
    }

    #[test]
    fn test_compute_is_deterministic() {
        let first = SharedSalt::compute(1, 2);
        let second = SharedSalt::compute(1, 2);
        assert_eq!(first, second);
    }

    #[test]
    fn test_different_contributions_disagree() {
        let base = SharedSalt::compute(1, 2);
        assert_ne!(base, SharedSalt::compute(1, 3));
        assert_ne!(base, SharedSalt::compute(2, 2));
    }

    #[test]
    fn test_equal_contributions_allowed() {
        // Degenerate but legal: both sides picked the same salt.
        let salt = SharedSalt::compute(7, 7);
        assert_eq!(salt, SharedSalt::compute(7, 7));
    }
}
