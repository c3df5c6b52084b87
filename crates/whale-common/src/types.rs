//! Domain primitive types used across the whale workspace.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Unique identifier for a container instance.
///
/// Generated once at creation and never reused; it names the
/// container's state directory and cgroup subtrees, so collision
/// avoidance rests entirely on the size of the random identifier
/// space.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContainerId(String);

impl ContainerId {
    /// Creates a container ID from an existing string value.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generates a random container ID.
    #[must_use]
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    /// Returns the inner string representation.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContainerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A host path bind-mounted into the container's root filesystem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Volume {
    /// Source path on the host.
    pub source: std::path::PathBuf,
    /// Target path inside the new root.
    pub target: std::path::PathBuf,
    /// Whether the binding is writable.
    pub read_write: bool,
}

impl Volume {
    /// Parses a CLI volume specification of the form `source:target[:ro]`.
    ///
    /// The binding is read-write unless the third segment is exactly
    /// `ro`.
    ///
    /// # Errors
    ///
    /// Returns [`WhaleError::InvalidVolume`] for any other segment
    /// count.
    pub fn parse(spec: &str) -> crate::error::Result<Self> {
        let chunks: Vec<&str> = spec.split(':').collect();
        if chunks.len() != 2 && chunks.len() != 3 {
            return Err(crate::error::WhaleError::InvalidVolume {
                spec: spec.to_string(),
            });
        }
        let read_write = !(chunks.len() == 3 && chunks[2] == "ro");
        Ok(Self {
            source: chunks[0].into(),
            target: chunks[1].into(),
            read_write,
        })
    }
}

/// Startup phase of a container, advanced by the stage processes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ContainerState {
    /// Descriptor persisted, no isolation applied.
    Created,
    /// Namespace flags and overlay paths computed and persisted.
    Stage1Complete,
    /// Cgroups applied; stage 2 has committed to building the root
    /// filesystem and executing the entrypoint. This is the last
    /// state that can reach disk: once the root pivots, the runtime
    /// directory is unreachable from stage 2, so the on-disk value
    /// does not distinguish a completed build from one that failed
    /// after the cgroup step.
    Stage2Complete,
    /// The user command has replaced the stage 2 process image.
    Running,
}

impl fmt::Display for ContainerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Created => write!(f, "created"),
            Self::Stage1Complete => write!(f, "stage1-complete"),
            Self::Stage2Complete => write!(f, "stage2-complete"),
            Self::Running => write!(f, "running"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_ids_are_unique() {
        let a = ContainerId::generate();
        let b = ContainerId::generate();
        assert_ne!(a, b);
    }

    #[test]
    fn container_id_display_matches_inner() {
        let id = ContainerId::new("abc-123");
        assert_eq!(id.to_string(), "abc-123");
        assert_eq!(id.as_str(), "abc-123");
    }

    #[test]
    fn volume_two_segments_is_read_write() {
        let v = Volume::parse("/host/data:/data").unwrap();
        assert_eq!(v.source, std::path::Path::new("/host/data"));
        assert_eq!(v.target, std::path::Path::new("/data"));
        assert!(v.read_write);
    }

    #[test]
    fn volume_ro_suffix_is_read_only() {
        let v = Volume::parse("/host/data:/data:ro").unwrap();
        assert!(!v.read_write);
    }

    #[test]
    fn volume_other_third_segment_stays_read_write() {
        let v = Volume::parse("/host/data:/data:rw").unwrap();
        assert!(v.read_write);
    }

    #[test]
    fn volume_wrong_segment_count_is_rejected() {
        for spec in ["/lonely", "a:b:c:d", ""] {
            let err = Volume::parse(spec).unwrap_err();
            assert!(matches!(err, crate::error::WhaleError::InvalidVolume { .. }), "{spec}");
        }
    }

    #[test]
    fn state_display_is_stable() {
        assert_eq!(ContainerState::Created.to_string(), "created");
        assert_eq!(ContainerState::Running.to_string(), "running");
    }
}
