//! Digest module: typed hash domains, content hashing, canonical JSON.

pub mod canon;
pub mod domain;
pub mod hash;
