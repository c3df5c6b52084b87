//! The container descriptor: single source of truth for one container.
//!
//! Owned by whichever stage process currently holds it in memory;
//! cross-stage handoff happens only through the serialized file in
//! [`crate::store`].

use std::collections::BTreeSet;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use whale_common::types::{ContainerId, ContainerState, Volume};
use whale_core::overlay::Overlay;

/// Host path bound read-only into every container unless the caller
/// maps the same target themselves.
const RESOLV_CONF: &str = "/etc/resolv.conf";

/// Declarative configuration and runtime state for one container.
///
/// The identifier is immutable once assigned and uniquely names the
/// container's state directory. The clone flag mask is recomputed by
/// stage 1 from the namespace set and must not be fabricated anywhere
/// else.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Container {
    /// Unique identifier, generated once at creation.
    pub id: ContainerId,
    /// Display name; also used as the container hostname under UTS
    /// isolation.
    pub name: String,
    /// Image reference, resolved as a directory under
    /// `<runtime_dir>/rootfs/`.
    pub image: String,
    /// Absolute runtime root directory.
    pub runtime_dir: PathBuf,
    /// Per-container state directory.
    pub dir: PathBuf,
    /// Overlay descriptor; populated by stage 1 and never mutated
    /// afterward.
    pub overlay: Option<Overlay>,
    /// CPU share weight; zero leaves the kernel default in force.
    pub cpu_shares: u64,
    /// Memory limit in bytes; zero leaves the kernel default in force.
    pub memory: u64,
    /// Ordered volume bindings.
    pub volumes: Vec<Volume>,
    /// Requested namespace kinds.
    pub namespaces: BTreeSet<String>,
    /// Declared capabilities (not yet enforced by any stage).
    pub capabilities: Vec<String>,
    /// Whether the caller's stdin is attached to the entrypoint.
    pub interactive: bool,
    /// User identity string (`user:group`).
    pub user: String,
    /// Environment variables passed to the entrypoint.
    pub env: Vec<String>,
    /// Entrypoint command and arguments.
    pub cmd: Vec<String>,
    /// Resolved namespace clone-flag bitmask.
    pub clone_flags: u64,
    /// Path to the stage 1 executable.
    pub stage1: PathBuf,
    /// Path to the stage 2 executable.
    pub stage2: PathBuf,
    /// Startup phase, advanced by the stages. On disk this never
    /// moves past `Stage2Complete`; see [`ContainerState`] for the
    /// persistence caveat.
    pub state: ContainerState,
}

impl Container {
    /// Creates a descriptor with a fresh identifier and the implicit
    /// DNS resolver binding.
    ///
    /// An empty name defaults to the identifier.
    #[must_use]
    pub fn new(name: &str) -> Self {
        let id = ContainerId::generate();
        let name = if name.is_empty() {
            id.to_string()
        } else {
            name.to_string()
        };
        Self {
            id,
            name,
            image: String::new(),
            runtime_dir: PathBuf::new(),
            dir: PathBuf::new(),
            overlay: None,
            cpu_shares: 0,
            memory: 0,
            volumes: vec![Volume {
                source: RESOLV_CONF.into(),
                target: RESOLV_CONF.into(),
                read_write: false,
            }],
            namespaces: BTreeSet::new(),
            capabilities: Vec::new(),
            interactive: false,
            user: String::new(),
            env: Vec::new(),
            cmd: Vec::new(),
            clone_flags: 0,
            stage1: PathBuf::new(),
            stage2: PathBuf::new(),
            state: ContainerState::Created,
        }
    }

    /// Adds a volume binding, replacing any existing binding for the
    /// same target.
    ///
    /// This is how a caller-supplied mapping overrides the implicit
    /// read-only resolver binding.
    pub fn add_volume(&mut self, volume: Volume) {
        if let Some(existing) = self.volumes.iter_mut().find(|v| v.target == volume.target) {
            *existing = volume;
        } else {
            self.volumes.push(volume);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_container_binds_resolv_conf_read_only() {
        let c = Container::new("web");
        assert_eq!(c.volumes.len(), 1);
        let v = &c.volumes[0];
        assert_eq!(v.source, std::path::Path::new(RESOLV_CONF));
        assert_eq!(v.target, std::path::Path::new(RESOLV_CONF));
        assert!(!v.read_write);
    }

    #[test]
    fn empty_name_falls_back_to_the_id() {
        let c = Container::new("");
        assert_eq!(c.name, c.id.to_string());
    }

    #[test]
    fn conflicting_target_replaces_the_implicit_binding() {
        let mut c = Container::new("web");
        c.add_volume(Volume::parse("/my/resolv.conf:/etc/resolv.conf").unwrap());
        assert_eq!(c.volumes.len(), 1);
        assert_eq!(c.volumes[0].source, std::path::Path::new("/my/resolv.conf"));
        assert!(c.volumes[0].read_write);
    }

    #[test]
    fn distinct_targets_are_appended_in_order() {
        let mut c = Container::new("web");
        c.add_volume(Volume::parse("/host/a:/a").unwrap());
        c.add_volume(Volume::parse("/host/b:/b:ro").unwrap());
        assert_eq!(c.volumes.len(), 3);
        assert_eq!(c.volumes[1].target, std::path::Path::new("/a"));
        assert_eq!(c.volumes[2].target, std::path::Path::new("/b"));
    }

    #[test]
    fn fresh_containers_start_in_created_state() {
        assert_eq!(Container::new("x").state, ContainerState::Created);
    }
}
