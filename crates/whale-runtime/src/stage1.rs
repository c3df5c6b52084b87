//! Stage 1: preparation in the host namespaces.
//!
//! Resolves the clone flag mask from the requested namespace set,
//! stages the overlay directories (without mounting — the mount must
//! happen inside the new mount namespace), persists the updated
//! descriptor, and only then spawns stage 2 with the mask applied at
//! process creation. Any failure aborts before the spawn.

use std::path::Path;

use nix::sched::CloneFlags;
use whale_common::constants::ROOTFS_DIR;
use whale_common::error::{Result, WhaleError};
use whale_common::types::ContainerState;
use whale_core::overlay::Overlay;
use whale_core::{namespace, overlay};

use crate::container::Container;
use crate::{spawn, store};

/// Runs stage 1 for the container id and waits for stage 2.
///
/// Returns stage 2's exit status, which is the container's exit
/// status.
///
/// # Errors
///
/// Returns an error if preparation fails, the spawn fails, or stage 2
/// exits nonzero.
pub fn execute(runtime_dir: &Path, id: &str) -> Result<i32> {
    let mut container = store::load(runtime_dir, id)?;
    tracing::info!(id = %container.id, name = %container.name, "stage 1 starting");

    prepare(&mut container)?;
    store::save(&container)?;
    tracing::info!(clone_flags = container.clone_flags, "stage 1 complete");

    let flags = clone_mask(container.clone_flags)?;
    let status = spawn::spawn_in_namespaces(&container.stage2, container.id.as_str(), flags)?;
    if status != 0 {
        return Err(WhaleError::StageFailed {
            stage: "stage2",
            code: status,
        });
    }
    Ok(status)
}

/// Reconstructs the clone flag mask persisted in the descriptor.
fn clone_mask(bits: u64) -> Result<CloneFlags> {
    let bits = i32::try_from(bits).map_err(|_| WhaleError::Descriptor {
        message: format!("clone flag mask {bits:#x} out of range"),
    })?;
    Ok(CloneFlags::from_bits_truncate(bits))
}

/// Resolves namespace flags and stages the overlay, advancing the
/// descriptor to `Stage1Complete`.
///
/// # Errors
///
/// Returns an error on an unknown namespace kind or a failed overlay
/// preparation.
pub fn prepare(container: &mut Container) -> Result<()> {
    prepare_inner(container, overlay::prepare_overlay)
}

/// [`prepare`] against an explicit kernel filesystem list.
///
/// # Errors
///
/// Returns an error on an unknown namespace kind or a failed overlay
/// preparation.
pub fn prepare_with(container: &mut Container, filesystems: &str) -> Result<()> {
    prepare_inner(container, |image_dir, state_dir| {
        overlay::plan_overlay(filesystems, image_dir, state_dir)
    })
}

fn prepare_inner(
    container: &mut Container,
    stage_overlay: impl FnOnce(&Path, &Path) -> Result<Overlay>,
) -> Result<()> {
    let flags = namespace::clone_flags(&container.namespaces)?;
    container.clone_flags = u64::from(flags.bits() as u32);

    let image_dir = container.runtime_dir.join(ROOTFS_DIR).join(&container.image);
    container.overlay = Some(stage_overlay(&image_dir, &container.dir)?);
    container.state = ContainerState::Stage1Complete;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const MODERN: &str = "nodev\toverlay\n\text4\n";

    fn container(runtime_dir: &Path) -> Container {
        let mut c = Container::new("web");
        c.image = "debian".to_string();
        c.runtime_dir = runtime_dir.to_path_buf();
        c.dir = store::create_state_dir(runtime_dir, c.id.as_str()).expect("state dir");
        c
    }

    #[test]
    fn prepare_computes_the_mask_for_the_requested_kinds() {
        let runtime_dir = tempfile::tempdir().expect("tempdir");
        let mut c = container(runtime_dir.path());
        c.namespaces = ["mount", "pid", "uts"].iter().map(ToString::to_string).collect();

        prepare_with(&mut c, MODERN).expect("prepare");

        let expected =
            CloneFlags::CLONE_NEWNS | CloneFlags::CLONE_NEWPID | CloneFlags::CLONE_NEWUTS;
        assert_eq!(c.clone_flags, u64::from(expected.bits() as u32));
        assert_ne!(c.clone_flags, 0);
    }

    #[test]
    fn prepare_stages_overlay_paths_under_the_state_dir() {
        let runtime_dir = tempfile::tempdir().expect("tempdir");
        let mut c = container(runtime_dir.path());

        prepare_with(&mut c, MODERN).expect("prepare");

        let overlay = c.overlay.expect("overlay populated");
        assert_eq!(
            overlay.lower,
            runtime_dir.path().join("rootfs").join("debian")
        );
        assert!(overlay.upper.is_dir());
        assert!(overlay.work.is_dir());
        assert!(overlay.mnt.is_dir());
        assert_eq!(c.state, ContainerState::Stage1Complete);
    }

    #[test]
    fn prepare_rejects_unknown_namespace_kinds_before_staging() {
        let runtime_dir = tempfile::tempdir().expect("tempdir");
        let mut c = container(runtime_dir.path());
        let _ = c.namespaces.insert("cgroup".to_string());

        let err = prepare_with(&mut c, MODERN).unwrap_err();
        assert!(matches!(err, WhaleError::InvalidNamespace { .. }));
        assert!(c.overlay.is_none());
        assert_eq!(c.state, ContainerState::Created);
    }

    #[test]
    fn persisted_mask_round_trips_through_clone_mask() {
        let runtime_dir = tempfile::tempdir().expect("tempdir");
        let mut c = container(runtime_dir.path());
        c.namespaces = ["mount", "net"].iter().map(ToString::to_string).collect();
        prepare_with(&mut c, MODERN).expect("prepare");

        let mask = clone_mask(c.clone_flags).expect("mask");
        assert_eq!(mask, CloneFlags::CLONE_NEWNS | CloneFlags::CLONE_NEWNET);
    }

    #[test]
    fn out_of_range_mask_is_rejected_not_truncated() {
        let err = clone_mask(u64::from(u32::MAX) + 1).unwrap_err();
        assert!(matches!(err, WhaleError::Descriptor { .. }));
    }
}
