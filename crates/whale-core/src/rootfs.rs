//! Root filesystem construction inside the container's mount namespace.
//!
//! Transforms the process's view of the filesystem from the host root
//! to the container's overlay mount point: device nodes, compatibility
//! symlinks, volume binds, `pivot_root(2)`, and the proc/sys
//! pseudo-filesystems, in that strict order. A failure at any step
//! aborts the sequence; completed steps are not rolled back.

use std::fs;
use std::path::{Path, PathBuf};

use nix::mount::{MntFlags, MsFlags, mount, umount2};
use nix::sys::stat::{Mode, SFlag, makedev, mknod};
use whale_common::error::{Result, WhaleError};
use whale_common::types::Volume;

use crate::errno_io;
use crate::overlay::{self, Overlay};

/// Character devices populated into the container's `/dev`.
const DEVICES: [(&str, u64, u64); 7] = [
    ("null", 1, 3),
    ("zero", 1, 5),
    ("full", 1, 7),
    ("random", 1, 8),
    ("urandom", 1, 9),
    ("tty", 5, 0),
    ("console", 136, 1),
];

/// Symlinks wiring the container's standard streams to procfs.
const SYMLINKS: [(&str, &str); 4] = [
    ("/proc/self/fd", "dev/fd"),
    ("/proc/self/fd/0", "dev/stdin"),
    ("/proc/self/fd/1", "dev/stdout"),
    ("/proc/self/fd/2", "dev/stderr"),
];

/// Builds the container root filesystem and re-roots the process into it.
///
/// Assumes the calling process already sits in its own mount
/// namespace; the first step stops mount propagation back to the host.
///
/// # Errors
///
/// Returns an error naming the failed step and its target path.
pub fn setup_filesystem(ov: &Overlay, volumes: &[Volume]) -> Result<()> {
    tracing::info!(rootfs = %ov.mnt.display(), "building root filesystem");
    privatize_root()?;
    overlay::mount_overlay(ov)?;
    setup_devices(&ov.mnt)?;
    setup_symlinks(&ov.mnt)?;
    mount_volumes(&ov.mnt, volumes)?;
    pivot_root(&ov.mnt)?;
    mount_pseudo_filesystems()
}

/// Re-marks the host root mount as private and recursive, so mounts
/// made below never propagate between host and container.
fn privatize_root() -> Result<()> {
    tracing::debug!("remounting / as private");
    mount(
        None::<&str>,
        "/",
        None::<&str>,
        MsFlags::MS_PRIVATE | MsFlags::MS_REC,
        None::<&str>,
    )
    .map_err(|e| WhaleError::syscall("remount / as private", errno_io(e)))
}

/// Mounts a tmpfs at `<rootfs>/dev` and populates the canonical
/// device nodes, world read/writable.
fn setup_devices(rootfs: &Path) -> Result<()> {
    let dev = rootfs.join("dev");
    tracing::debug!(dev = %dev.display(), "mounting /dev tmpfs");
    mount(
        Some("tmpfs"),
        &dev,
        Some("tmpfs"),
        MsFlags::MS_NOSUID | MsFlags::MS_STRICTATIME,
        Some("mode=755"),
    )
    .map_err(|e| WhaleError::syscall(format!("mount tmpfs at {}", dev.display()), errno_io(e)))?;

    for (name, major, minor) in DEVICES {
        let node = dev.join(name);
        mknod(
            &node,
            SFlag::S_IFCHR,
            Mode::from_bits_truncate(0o666),
            makedev(major, minor),
        )
        .map_err(|e| {
            WhaleError::syscall(format!("mknod {}", node.display()), errno_io(e))
        })?;
        tracing::debug!(node = %node.display(), "created device node");
    }
    Ok(())
}

/// Creates the `/dev/fd` and standard stream symlinks into procfs.
///
/// A pre-existing link at the target is not an error.
///
/// # Errors
///
/// Returns an error for any other failed link creation.
pub fn setup_symlinks(rootfs: &Path) -> Result<()> {
    for (src, dst) in SYMLINKS {
        let dst = rootfs.join(dst);
        match std::os::unix::fs::symlink(src, &dst) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {}
            Err(e) => return Err(WhaleError::io(dst, e)),
        }
    }
    Ok(())
}

/// Resolves a volume target to its path under the new root.
fn target_in_root(rootfs: &Path, target: &Path) -> PathBuf {
    rootfs.join(target.strip_prefix("/").unwrap_or(target))
}

/// Bind-mounts every volume into the new root, in order.
///
/// The source must exist on the host. Parent directories of the
/// target are created recursively, and a regular-file source gets an
/// empty placeholder file at the target before the bind. Read-only
/// bindings carry `MS_RDONLY` in addition to `MS_BIND`.
///
/// # Errors
///
/// Returns an error if a source is missing, target preparation fails,
/// or the bind mount syscall fails; later volumes are not attempted.
pub fn mount_volumes(rootfs: &Path, volumes: &[Volume]) -> Result<()> {
    for v in volumes {
        let meta = fs::metadata(&v.source).map_err(|e| WhaleError::io(v.source.clone(), e))?;
        let target = target_in_root(rootfs, &v.target);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).map_err(|e| WhaleError::io(parent.to_path_buf(), e))?;
        }
        if !meta.is_dir() {
            drop(
                fs::OpenOptions::new()
                    .write(true)
                    .create(true)
                    .truncate(false)
                    .open(&target)
                    .map_err(|e| WhaleError::io(target.clone(), e))?,
            );
        }
        let mut flags = MsFlags::MS_BIND;
        if !v.read_write {
            flags |= MsFlags::MS_RDONLY;
        }
        tracing::info!(
            source = %v.source.display(),
            target = %target.display(),
            read_write = v.read_write,
            "bind-mounting volume"
        );
        mount(Some(&v.source), &target, None::<&str>, flags, None::<&str>).map_err(|e| {
            WhaleError::syscall(
                format!("bind {} at {}", v.source.display(), target.display()),
                errno_io(e),
            )
        })?;
    }
    Ok(())
}

/// Pivots the process root onto the overlay mount point and detaches
/// the old root.
fn pivot_root(new_root: &Path) -> Result<()> {
    let old_root = new_root.join("oldroot");
    fs::create_dir(&old_root).map_err(|e| WhaleError::io(old_root.clone(), e))?;
    tracing::info!(new_root = %new_root.display(), "pivoting root");
    nix::unistd::pivot_root(new_root, &old_root)
        .map_err(|e| WhaleError::syscall(format!("pivot_root to {}", new_root.display()), errno_io(e)))?;
    nix::unistd::chdir("/").map_err(|e| WhaleError::syscall("chdir to new root", errno_io(e)))?;
    umount2("/oldroot", MntFlags::MNT_DETACH)
        .map_err(|e| WhaleError::syscall("detach old root", errno_io(e)))?;
    fs::remove_dir("/oldroot").map_err(|e| WhaleError::io("/oldroot", e))?;
    Ok(())
}

/// Mounts `proc` and `sysfs` at their conventional locations under
/// the new root.
fn mount_pseudo_filesystems() -> Result<()> {
    tracing::debug!("mounting proc and sysfs");
    mount(Some("proc"), "proc", Some("proc"), MsFlags::empty(), None::<&str>)
        .map_err(|e| WhaleError::syscall("mount proc", errno_io(e)))?;
    mount(Some("sysfs"), "sys", Some("sysfs"), MsFlags::empty(), None::<&str>)
        .map_err(|e| WhaleError::syscall("mount sysfs", errno_io(e)))
}
