//! Union filesystem preparation and mounting.
//!
//! Preparation runs in stage 1 (host namespaces): it probes the kernel
//! for a usable union driver and stages the layer directories without
//! mounting anything. The mount itself happens in stage 2, after the
//! process has entered its new mount namespace.

use std::fs;
use std::path::{Path, PathBuf};

use nix::mount::{MsFlags, mount};
use serde::{Deserialize, Serialize};
use whale_common::error::{Result, WhaleError};

use crate::errno_io;

/// Kernel filesystem registry consulted for driver support.
const PROC_FILESYSTEMS: &str = "/proc/filesystems";

/// The union filesystem drivers whale knows how to mount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OverlayKind {
    /// The in-tree overlayfs driver.
    Overlay,
    /// The legacy out-of-tree aufs driver.
    Aufs,
}

/// A prepared copy-on-write filesystem for one container.
///
/// Allocated by stage 1, consumed (mounted) by stage 2; the four paths
/// are never mutated after stage 1 completes and nothing tears the
/// mount down.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Overlay {
    /// Selected union driver.
    #[serde(rename = "type")]
    pub kind: OverlayKind,
    /// Read-only image layer.
    pub lower: PathBuf,
    /// Writable delta layer.
    pub upper: PathBuf,
    /// Scratch space required by the union driver.
    pub work: PathBuf,
    /// Final merged mount point.
    pub mnt: PathBuf,
}

/// Selects the union driver from the kernel's registered filesystem
/// list, preferring overlayfs over aufs.
///
/// # Errors
///
/// Returns [`WhaleError::NoOverlaySupport`] when neither driver is
/// registered.
pub fn select_driver(filesystems: &str) -> Result<OverlayKind> {
    if filesystems.contains("overlay") {
        tracing::info!("kernel supports overlayfs");
        Ok(OverlayKind::Overlay)
    } else if filesystems.contains("aufs") {
        tracing::info!("kernel supports aufs");
        Ok(OverlayKind::Aufs)
    } else {
        Err(WhaleError::NoOverlaySupport)
    }
}

/// Probes the kernel and stages the overlay directory layout for a
/// container, without mounting.
///
/// Creates `rw/`, `work/`, and `rootfs/` under the container's state
/// directory. Driver selection happens first, so an unsupported kernel
/// leaves the state directory untouched.
///
/// # Errors
///
/// Returns an error if `/proc/filesystems` cannot be read, no driver
/// is available, or a directory cannot be created.
pub fn prepare_overlay(image_dir: &Path, state_dir: &Path) -> Result<Overlay> {
    let filesystems = fs::read_to_string(PROC_FILESYSTEMS)
        .map_err(|e| WhaleError::io(PROC_FILESYSTEMS, e))?;
    plan_overlay(&filesystems, image_dir, state_dir)
}

/// Driver selection and directory staging against an explicit
/// filesystem list. Split from [`prepare_overlay`] so the probe is
/// testable without a kernel.
///
/// # Errors
///
/// Returns an error if no driver is available or a directory cannot
/// be created.
pub fn plan_overlay(filesystems: &str, image_dir: &Path, state_dir: &Path) -> Result<Overlay> {
    let kind = select_driver(filesystems)?;
    let overlay = Overlay {
        kind,
        lower: image_dir.to_path_buf(),
        upper: state_dir.join("rw"),
        work: state_dir.join("work"),
        mnt: state_dir.join("rootfs"),
    };
    for dir in [&overlay.upper, &overlay.work, &overlay.mnt] {
        fs::create_dir_all(dir).map_err(|e| WhaleError::io(dir.clone(), e))?;
        tracing::debug!(dir = %dir.display(), "created overlay dir");
    }
    Ok(overlay)
}

/// Mounts the prepared overlay at its mount point, dispatching on the
/// driver selected during preparation.
///
/// # Errors
///
/// Returns an error if the `mount(2)` syscall fails.
pub fn mount_overlay(overlay: &Overlay) -> Result<()> {
    match overlay.kind {
        OverlayKind::Overlay => mount_overlayfs(overlay),
        OverlayKind::Aufs => mount_aufs(overlay),
    }
}

fn mount_overlayfs(overlay: &Overlay) -> Result<()> {
    let opts = format!(
        "lowerdir={},upperdir={},workdir={}",
        overlay.lower.display(),
        overlay.upper.display(),
        overlay.work.display()
    );
    tracing::info!(mnt = %overlay.mnt.display(), %opts, "mounting overlayfs");
    mount(
        Some("overlay"),
        &overlay.mnt,
        Some("overlay"),
        MsFlags::MS_NODEV,
        Some(opts.as_str()),
    )
    .map_err(|e| {
        WhaleError::syscall(
            format!("mount overlay at {}", overlay.mnt.display()),
            errno_io(e),
        )
    })
}

fn mount_aufs(overlay: &Overlay) -> Result<()> {
    let opts = format!(
        "br={}=rw:{}=ro",
        overlay.upper.display(),
        overlay.lower.display()
    );
    tracing::info!(mnt = %overlay.mnt.display(), %opts, "mounting aufs");
    mount(
        None::<&str>,
        &overlay.mnt,
        Some("aufs"),
        MsFlags::MS_NODEV,
        Some(opts.as_str()),
    )
    .map_err(|e| {
        WhaleError::syscall(
            format!("mount aufs at {}", overlay.mnt.display()),
            errno_io(e),
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const MODERN: &str = "nodev\tsysfs\nnodev\ttmpfs\n\text4\nnodev\toverlay\n";
    const LEGACY: &str = "nodev\tsysfs\nnodev\taufs\n\text4\n";
    const NEITHER: &str = "nodev\tsysfs\nnodev\ttmpfs\n\text4\n";

    #[test]
    fn overlayfs_is_preferred_when_registered() {
        assert_eq!(select_driver(MODERN).unwrap(), OverlayKind::Overlay);
    }

    #[test]
    fn aufs_is_the_fallback() {
        assert_eq!(select_driver(LEGACY).unwrap(), OverlayKind::Aufs);
    }

    #[test]
    fn unsupported_kernel_is_rejected() {
        assert!(matches!(
            select_driver(NEITHER),
            Err(WhaleError::NoOverlaySupport)
        ));
    }

    #[test]
    fn plan_stages_the_three_layer_dirs() {
        let state = tempfile::tempdir().expect("tempdir");
        let overlay = plan_overlay(MODERN, Path::new("/img/debian"), state.path()).expect("plan");
        assert_eq!(overlay.lower, Path::new("/img/debian"));
        assert!(overlay.upper.is_dir());
        assert!(overlay.work.is_dir());
        assert!(overlay.mnt.is_dir());
        assert_eq!(overlay.upper, state.path().join("rw"));
        assert_eq!(overlay.work, state.path().join("work"));
        assert_eq!(overlay.mnt, state.path().join("rootfs"));
    }

    #[test]
    fn no_support_creates_no_directories() {
        let state = tempfile::tempdir().expect("tempdir");
        let err = plan_overlay(NEITHER, Path::new("/img/debian"), state.path()).unwrap_err();
        assert!(matches!(err, WhaleError::NoOverlaySupport));
        assert_eq!(std::fs::read_dir(state.path()).expect("read_dir").count(), 0);
    }

    #[test]
    fn prepare_probes_the_live_kernel_registry() {
        let state = tempfile::tempdir().expect("tempdir");
        match prepare_overlay(Path::new("/img/debian"), state.path()) {
            Ok(overlay) => {
                assert!(overlay.upper.is_dir());
                assert!(overlay.work.is_dir());
                assert!(overlay.mnt.is_dir());
            }
            // Kernels without either driver must leave the state dir empty.
            Err(WhaleError::NoOverlaySupport) => {
                assert_eq!(std::fs::read_dir(state.path()).expect("read_dir").count(), 0);
            }
            Err(other) => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn driver_tag_serializes_as_lowercase() {
        let overlay = Overlay {
            kind: OverlayKind::Aufs,
            lower: PathBuf::from("/l"),
            upper: PathBuf::from("/u"),
            work: PathBuf::from("/w"),
            mnt: PathBuf::from("/m"),
        };
        let json = serde_json::to_string(&overlay).expect("encode");
        assert!(json.contains("\"type\":\"aufs\""));
    }
}
