//! # whale-runtime
//!
//! Container lifecycle for the whale runtime: the persisted container
//! descriptor, its on-disk store, and the two-stage startup protocol.
//!
//! Stage 1 runs in the host namespaces: it resolves the clone flag
//! mask, stages the overlay directories, persists the descriptor, and
//! spawns the stage 2 executable with the mask applied at `clone(2)`
//! time. Stage 2 wakes up inside the new namespaces, reloads the
//! descriptor, applies cgroups and the root filesystem, and replaces
//! itself with the user command. The serialized descriptor file is the
//! only channel between the two processes.

#![allow(unsafe_code)]
#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used, clippy::panic))]

pub mod container;
pub mod spawn;
pub mod stage1;
pub mod stage2;
pub mod store;
