//! Namespace-creating process spawn.
//!
//! The spec for entering namespaces is "atomically, at process
//! creation": the stage 2 executable is started via `clone(2)` with
//! the resolved flag mask, so the new process is born inside its
//! namespaces rather than joining them afterward. The child inherits
//! the parent's standard streams and environment and execs the stage 2
//! binary with the container id as its sole argument.

use std::ffi::CString;
use std::os::unix::ffi::OsStrExt;
use std::path::Path;

use nix::sched::{CloneFlags, clone};
use nix::sys::signal::Signal;
use nix::sys::wait::{WaitStatus, waitpid};
use nix::unistd::execv;
use whale_common::error::{Result, WhaleError};

/// Stack size handed to `clone(2)` for the child before it execs.
const CHILD_STACK_SIZE: usize = 1024 * 1024;

/// Exit code reported when the child fails to exec the stage binary.
const EXEC_FAILURE: isize = 127;

/// Spawns `program id` in new namespaces selected by `flags` and
/// waits for it to terminate.
///
/// Returns the child's exit status; a signal-terminated child is
/// reported as `128 + signo`, following shell convention.
///
/// # Errors
///
/// Returns an error if the program path or id cannot be passed to the
/// kernel, or if `clone(2)`/`waitpid(2)` fail.
pub fn spawn_in_namespaces(program: &Path, id: &str, flags: CloneFlags) -> Result<i32> {
    let program_c = CString::new(program.as_os_str().as_bytes()).map_err(|_| {
        WhaleError::Descriptor {
            message: format!("embedded NUL in program path {}", program.display()),
        }
    })?;
    let argv = [
        program_c.clone(),
        CString::new(id).map_err(|_| WhaleError::Descriptor {
            message: "embedded NUL in container id".to_string(),
        })?,
    ];

    let mut stack = vec![0u8; CHILD_STACK_SIZE];
    let child_main = Box::new(|| match execv(&program_c, &argv) {
        Ok(infallible) => match infallible {},
        Err(_) => EXEC_FAILURE,
    });

    tracing::info!(program = %program.display(), ?flags, "spawning stage process");
    // SAFETY: the child callback only execs; it touches no memory
    // shared with the parent beyond the borrowed argv strings, which
    // the parent keeps alive while it waits.
    let child = unsafe {
        clone(
            child_main,
            &mut stack,
            flags,
            Some(Signal::SIGCHLD as libc::c_int),
        )
    }
    .map_err(|e| {
        WhaleError::syscall(
            format!("clone {}", program.display()),
            std::io::Error::from_raw_os_error(e as i32),
        )
    })?;

    match waitpid(child, None).map_err(|e| {
        WhaleError::syscall(
            format!("waitpid {child}"),
            std::io::Error::from_raw_os_error(e as i32),
        )
    })? {
        WaitStatus::Exited(_, code) => Ok(code),
        WaitStatus::Signaled(_, signal, _) => Ok(128 + signal as i32),
        other => Err(WhaleError::syscall(
            "waitpid",
            std::io::Error::other(format!("unexpected wait status {other:?}")),
        )),
    }
}
