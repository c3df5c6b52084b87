//! # whale-common
//!
//! Shared error definitions, domain primitives, and constants used
//! across the whale workspace.
//!
//! This crate is the leaf of the dependency graph — it depends on no
//! other internal crate.

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used, clippy::panic))]

pub mod constants;
pub mod error;
pub mod types;
