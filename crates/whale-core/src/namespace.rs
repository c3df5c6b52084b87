//! Namespace kind to `clone(2)` flag resolution.
//!
//! The mapping is pure: it never touches the kernel, it only computes
//! the flag mask that the stage 1 orchestrator passes to the
//! namespace-creating spawn.

use std::collections::BTreeSet;

use nix::sched::CloneFlags;
use whale_common::error::{Result, WhaleError};

/// Supported namespace vocabulary and the flag each kind maps to.
const NS_FLAGS: [(&str, CloneFlags); 5] = [
    ("mount", CloneFlags::CLONE_NEWNS),
    ("pid", CloneFlags::CLONE_NEWPID),
    ("uts", CloneFlags::CLONE_NEWUTS),
    ("net", CloneFlags::CLONE_NEWNET),
    ("ipc", CloneFlags::CLONE_NEWIPC),
];

/// Resolves a set of requested namespace kinds into a single clone
/// flag mask.
///
/// An empty set yields an empty mask, i.e. the child shares every
/// host namespace.
///
/// # Errors
///
/// Returns [`WhaleError::InvalidNamespace`] naming the first kind that
/// is not in the supported vocabulary.
pub fn clone_flags(namespaces: &BTreeSet<String>) -> Result<CloneFlags> {
    let mut flags = CloneFlags::empty();
    for ns in namespaces {
        let flag = NS_FLAGS
            .iter()
            .find(|(name, _)| *name == ns.as_str())
            .map(|(_, flag)| *flag)
            .ok_or_else(|| WhaleError::InvalidNamespace { name: ns.clone() })?;
        flags |= flag;
    }
    Ok(flags)
}
