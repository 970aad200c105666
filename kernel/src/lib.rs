//! Synthplan Kernel: molecule-level primitives shared by search and harness.
//!
//! # API Surface
//!
//! - [`molecule::reactants`] -- split and join dot-encoded reactant sets
//! - [`molecule::canonical::Canonicalizer`] -- SMILES canonicalization contract
//! - [`molecule::terminal::TerminalSet`] -- read-only purchasable-molecule set
//! - [`digest::hash::canonical_hash`] -- domain-separated SHA-256 content hashes
//! - [`digest::canon::canonical_json_bytes`] -- the single canonical JSON writer
//!
//! # Module Dependency Direction
//!
//! `molecule` and `digest` are independent of each other. Nothing in the
//! kernel knows about search trees.

#![forbid(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]

pub mod digest;
pub mod molecule;
