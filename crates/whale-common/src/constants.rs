//! System-wide constants and default paths.

/// Environment variable naming the runtime root directory.
///
/// Must be present in both stage processes' environments; its absence
/// is a fatal startup condition before any descriptor is touched.
pub const RUNTIME_DIR_ENV: &str = "WHALE_RUNTIME_DIR";

/// Default runtime root directory.
pub const DEFAULT_RUNTIME_DIR: &str = "/var/run/whale";

/// Cgroup v1 hierarchy mount point.
pub const CGROUP_ROOT: &str = "/sys/fs/cgroup";

/// Subtree name under each cgroup controller that holds per-container groups.
pub const CGROUP_SUBTREE: &str = "whale";

/// File name of the persisted container descriptor.
pub const DESCRIPTOR_FILE: &str = "config.json";

/// Directory under the runtime root holding per-container state directories.
pub const CONTAINERS_DIR: &str = "containers";

/// Directory under the runtime root holding image root filesystems.
pub const ROOTFS_DIR: &str = "rootfs";
