//! Identity types for Mole
//!
//! Identifiers are short random tokens over a URL-safe alphabet, so they can
//! be read aloud across a table and pasted into links without escaping.

use std::fmt;

use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

/// URL-safe token alphabet
pub const ID_ALPHABET: &[u8; 64] =
    b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789_-";

/// Reference length of a session identifier
pub const SESSION_ID_LEN: usize = 6;

/// Reference length of a player identifier
pub const PLAYER_ID_LEN: usize = 8;

/// Session identity - one round-table
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    #[inline]
    pub fn new(id: impl Into<String>) -> Self {
        SessionId(id.into())
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Session({})", self.0)
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SessionId {
    fn from(s: &str) -> Self {
        SessionId::new(s)
    }
}

/// Player identity - stable for a client's lifetime, unique within a session
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerId(String);

impl PlayerId {
    #[inline]
    pub fn new(id: impl Into<String>) -> Self {
        PlayerId(id.into())
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Player({})", self.0)
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PlayerId {
    fn from(s: &str) -> Self {
        PlayerId::new(s)
    }
}

/// Source of short unique tokens
pub trait IdIssuer: Send + Sync {
    /// Produce a fresh token of `len` characters from [`ID_ALPHABET`]
    fn new_id(&self, len: usize) -> String;
}

fn token<R: Rng + ?Sized>(rng: &mut R, len: usize) -> String {
    (0..len)
        .map(|_| ID_ALPHABET[rng.gen_range(0..ID_ALPHABET.len())] as char)
        .collect()
}

/// Issuer backed by the thread-local OS-seeded generator
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomIdIssuer;

impl IdIssuer for RandomIdIssuer {
    fn new_id(&self, len: usize) -> String {
        token(&mut rand::thread_rng(), len)
    }
}

/// Reproducible issuer for tests and simulations
#[derive(Debug)]
pub struct SeededIdIssuer {
    rng: Mutex<StdRng>,
}

impl SeededIdIssuer {
    pub fn new(seed: u64) -> Self {
        SeededIdIssuer {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

impl IdIssuer for SeededIdIssuer {
    fn new_id(&self, len: usize) -> String {
        token(&mut *self.rng.lock(), len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_reference_lengths() {
        let issuer = RandomIdIssuer;
        assert_eq!(issuer.new_id(SESSION_ID_LEN).len(), 6);
        assert_eq!(issuer.new_id(PLAYER_ID_LEN).len(), 8);
    }

    #[test]
    fn test_seeded_issuer_reproducible() {
        let a = SeededIdIssuer::new(7);
        let b = SeededIdIssuer::new(7);
        assert_eq!(a.new_id(12), b.new_id(12));
        assert_ne!(a.new_id(12), a.new_id(12));
    }

    #[test]
    fn test_id_serializes_as_plain_string() {
        let id = PlayerId::new("abc_-123");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"abc_-123\"");
        assert_eq!(format!("{:?}", id), "Player(abc_-123)");
    }

    proptest! {
        #[test]
        fn prop_tokens_are_url_safe(seed in any::<u64>(), len in 0usize..32) {
            let id = SeededIdIssuer::new(seed).new_id(len);
            prop_assert_eq!(id.len(), len);
            prop_assert!(id.bytes().all(|b| ID_ALPHABET.contains(&b)));
        }
    }
}
