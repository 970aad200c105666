//! Synthplan Search: AND-OR retrosynthesis search with retro-star cost propagation.
//!
//! This crate provides the search layer. It depends only on
//! `synthplan_kernel` and does NOT depend on `synthplan_harness`.
//!
//! # Crate dependency graph
//!
//! ```text
//! synthplan_kernel  ←  synthplan_search  ←  synthplan_harness
//! (molecules, digests)  (tree, filter, loop)   (fixtures, runner, CLI)
//! ```
//!
//! # Key types
//!
//! - [`SearchTree`]: arena of molecule (OR) and reaction (AND) nodes with
//!   bottom-up cost and top-down priority propagation
//! - [`filter_candidates`]: threshold, consistency check and renormalization
//!   of raw proposals for one molecule
//! - [`SearchDriver`]: select → propose → filter → expand loop with step
//!   budget, early stop and cooperative cancellation
//! - [`SearchReport`]: auditable record of a finished search
//! - [`ReactionProposer`] / [`ValueEstimator`]: external model contracts
//!
//! [`SearchTree`]: tree::SearchTree
//! [`filter_candidates`]: filter::filter_candidates
//! [`SearchDriver`]: search::SearchDriver
//! [`SearchReport`]: report::SearchReport
//! [`ReactionProposer`]: contract::ReactionProposer
//! [`ValueEstimator`]: contract::ValueEstimator

#![forbid(unsafe_code)]

pub mod contract;
pub mod error;
pub mod filter;
pub mod node;
pub mod policy;
pub mod proposer;
pub mod report;
pub mod route;
pub mod search;
pub mod tree;
