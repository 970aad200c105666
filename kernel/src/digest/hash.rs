//! Content-addressed hashes.
//!
//! Algorithm: SHA-256 over `domain_bytes || data`.
//! Rendered form: `"sha256:<lowercase hex>"`.

use sha2::{Digest, Sha256};

pub use super::domain::HashDomain;

/// Algorithm tag used in every [`ContentHash`] produced by this crate.
pub const HASH_ALGORITHM: &str = "sha256";

/// A content-addressed hash with algorithm identifier.
///
/// Invariant: the inner string contains a `:` with non-empty text on both
/// sides (enforced by [`ContentHash::parse`]).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContentHash {
    full: String,
    colon: usize,
}

impl ContentHash {
    /// Parse from `"algorithm:hex"` format.
    ///
    /// Returns `None` if the colon is missing or either side is empty.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        let colon = s.find(':')?;
        if colon == 0 || colon == s.len() - 1 {
            return None;
        }
        Some(Self {
            full: s.to_string(),
            colon,
        })
    }

    /// The algorithm portion (e.g., `"sha256"`).
    #[must_use]
    pub fn algorithm(&self) -> &str {
        &self.full[..self.colon]
    }

    /// The hex digest portion.
    #[must_use]
    pub fn hex_digest(&self) -> &str {
        &self.full[self.colon + 1..]
    }

    /// The full `"algorithm:hex_digest"` string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.full
    }
}

impl std::fmt::Display for ContentHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.full)
    }
}

/// Hash `data` under `domain`.
#[must_use]
pub fn canonical_hash(domain: HashDomain, data: &[u8]) -> ContentHash {
    let mut hasher = Sha256::new();
    hasher.update(domain.as_bytes());
    hasher.update(data);
    let digest = hex::encode(hasher.finalize());
    let colon = HASH_ALGORITHM.len();
    ContentHash {
        full: format!("{HASH_ALGORITHM}:{digest}"),
        colon,
    }
}
