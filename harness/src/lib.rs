//! Synthplan harness: orchestration around the search core.
//!
//! The harness loads a [`config::PlannerConfig`] and a
//! [`fixture::ScenarioFixture`], builds table-driven collaborators, plans one
//! or many targets ([`runner`]) and writes artifact directories
//! ([`artifacts`]). It does not implement search logic; that lives in
//! `synthplan-search`.

#![forbid(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]

pub mod artifacts;
pub mod config;
pub mod fixture;
pub mod logging;
pub mod runner;
pub mod tables;
