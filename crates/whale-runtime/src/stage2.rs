//! Stage 2: execution inside the new namespaces.
//!
//! Reloads the descriptor persisted by stage 1, joins the per-container
//! cgroups, builds the root filesystem when mount isolation was
//! requested, sets the hostname under UTS isolation, and finally
//! replaces itself with the user command via `execvpe(3)` — the
//! entrypoint's exit code becomes the container's exit code.

use std::convert::Infallible;
use std::ffi::CString;
use std::fs::File;
use std::path::Path;

use nix::unistd::{execvpe, sethostname};
use whale_common::error::{Result, WhaleError};
use whale_common::types::ContainerState;
use whale_core::cgroup::CgroupConfigurator;
use whale_core::rootfs;

use crate::container::Container;
use crate::store;

/// Runs stage 2 for the container id and execs the entrypoint.
///
/// On success this never returns: the process image is replaced.
///
/// # Errors
///
/// Returns an error if any isolation step or the final exec fails.
pub fn execute(runtime_dir: &Path, id: &str) -> Result<Infallible> {
    let mut container = store::load(runtime_dir, id)?;
    tracing::info!(id = %container.id, name = %container.name, "stage 2 starting");
    apply(&mut container)?;
    tracing::info!(cmd = ?container.cmd, "stage 2 complete, executing entrypoint");
    exec_entrypoint(&container)
}

/// Applies cgroups, the root filesystem, and the hostname.
///
/// The descriptor is persisted right after the cgroup step: once the
/// root pivots, the runtime directory is no longer reachable from
/// this process, so the persisted `Stage2Complete` records intent to
/// build rather than a completed build (see [`ContainerState`]).
fn apply(container: &mut Container) -> Result<()> {
    let cgroups = CgroupConfigurator::new(container.id.as_str());
    cgroups.setup_cpu(container.cpu_shares)?;
    cgroups.setup_memory(container.memory)?;

    container.state = ContainerState::Stage2Complete;
    store::save(container)?;

    if container.namespaces.contains("mount") {
        let overlay = container.overlay.as_ref().ok_or_else(|| WhaleError::Descriptor {
            message: "mount namespace requested but no overlay was prepared".to_string(),
        })?;
        rootfs::setup_filesystem(overlay, &container.volumes)?;
    }
    if container.namespaces.contains("uts") {
        sethostname(&container.name).map_err(|e| {
            WhaleError::syscall(
                format!("sethostname {}", container.name),
                std::io::Error::from_raw_os_error(e as i32),
            )
        })?;
        tracing::info!(hostname = %container.name, "hostname set");
    }
    Ok(())
}

/// Replaces the current process image with the user command.
///
/// Stdin is re-pointed at `/dev/null` unless interactive mode was
/// requested; stdout and stderr pass through untouched. The
/// environment is exactly the descriptor's variable list.
fn exec_entrypoint(container: &Container) -> Result<Infallible> {
    if container.cmd.is_empty() {
        return Err(WhaleError::Descriptor {
            message: "descriptor has an empty command vector".to_string(),
        });
    }
    if !container.interactive {
        let devnull = File::open("/dev/null")
            .map_err(|e| WhaleError::io("/dev/null", e))?;
        nix::unistd::dup2_stdin(&devnull).map_err(|e| {
            WhaleError::syscall(
                "detach stdin",
                std::io::Error::from_raw_os_error(e as i32),
            )
        })?;
    }

    let argv = cstring_vec(&container.cmd)?;
    let envp = cstring_vec(&container.env)?;
    execvpe(&argv[0], &argv, &envp).map_err(|e| {
        WhaleError::syscall(
            format!("exec {}", container.cmd[0]),
            std::io::Error::from_raw_os_error(e as i32),
        )
    })
}

fn cstring_vec(strings: &[String]) -> Result<Vec<CString>> {
    strings
        .iter()
        .map(|s| {
            CString::new(s.as_str()).map_err(|_| WhaleError::Descriptor {
                message: format!("embedded NUL in {s:?}"),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_command_is_rejected_before_exec() {
        let mut c = Container::new("web");
        c.interactive = true;
        let err = exec_entrypoint(&c).unwrap_err();
        assert!(matches!(err, WhaleError::Descriptor { .. }));
    }

    #[test]
    fn embedded_nul_in_env_is_rejected() {
        let err = cstring_vec(&["A=\0B".to_string()]).unwrap_err();
        assert!(matches!(err, WhaleError::Descriptor { .. }));
    }
}
