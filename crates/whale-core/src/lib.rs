//! # whale-core
//!
//! Low-level Linux isolation primitives for the whale runtime:
//!
//! - **Namespace flags**: mapping requested namespace kinds to the
//!   `clone(2)` flag mask.
//! - **Overlay**: union filesystem driver selection, layer directory
//!   preparation, and mounting.
//! - **Cgroups**: per-container cpu and memory control groups.
//! - **Rootfs**: device nodes, volume binds, `pivot_root(2)`, and
//!   pseudo-filesystem mounts.
//! - **Capabilities**: a prctl wrapper reserved for a future
//!   capability-drop step.
//!
//! Everything here is a thin, strictly ordered wrapper over kernel
//! operations; no function retries or rolls back.

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used, clippy::panic))]

pub mod capability;
pub mod cgroup;
pub mod namespace;
pub mod overlay;
pub mod rootfs;

/// Converts a nix errno into a `std::io::Error` for error reporting.
pub(crate) fn errno_io(errno: nix::errno::Errno) -> std::io::Error {
    std::io::Error::from_raw_os_error(errno as i32)
}
