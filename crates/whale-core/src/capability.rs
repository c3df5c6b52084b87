//! Capability manipulation via `prctl(2)`.
//!
//! The container descriptor declares a capability list that no
//! pipeline stage consumes yet; these wrappers are the insertion
//! point for a capability-drop step at the end of stage 2.

use whale_common::error::{Result, WhaleError};

/// Invokes `prctl(2)` with the given option and arguments.
///
/// # Errors
///
/// Returns an error carrying the OS errno when the call fails.
#[allow(unsafe_code)]
pub fn prctl(option: libc::c_int, arg2: libc::c_ulong, arg3: libc::c_ulong) -> Result<()> {
    // SAFETY: prctl only reads its scalar arguments for the options
    // used here; no pointers are passed.
    let rc = unsafe { libc::prctl(option, arg2, arg3, 0 as libc::c_ulong, 0 as libc::c_ulong) };
    if rc == -1 {
        return Err(WhaleError::syscall(
            format!("prctl option {option}"),
            std::io::Error::last_os_error(),
        ));
    }
    Ok(())
}

/// Removes a capability from the calling process's bounding set.
///
/// # Errors
///
/// Returns an error if the kernel rejects the drop, e.g. when the
/// caller lacks `CAP_SETPCAP`.
pub fn drop_bounding_capability(cap: libc::c_ulong) -> Result<()> {
    prctl(libc::PR_CAPBSET_DROP, cap, 0)
}
