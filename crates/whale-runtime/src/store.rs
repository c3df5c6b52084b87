//! Descriptor persistence.
//!
//! One JSON document per container at
//! `<runtime_dir>/containers/<id>/config.json`, written with
//! two-space indentation and read back verbatim by both stages. The
//! write-then-spawn ordering in stage 1 is the only synchronization
//! the handoff needs.

use std::fs;
use std::path::{Path, PathBuf};

use whale_common::constants::{CONTAINERS_DIR, DESCRIPTOR_FILE, RUNTIME_DIR_ENV};
use whale_common::error::{Result, WhaleError};

use crate::container::Container;

/// Reads the runtime root directory from the process environment.
///
/// # Errors
///
/// Returns [`WhaleError::EnvVar`] when the variable is unset or
/// empty; both stages treat this as fatal before touching any
/// descriptor.
pub fn runtime_dir_from_env() -> Result<PathBuf> {
    match std::env::var_os(RUNTIME_DIR_ENV) {
        Some(dir) if !dir.is_empty() => Ok(PathBuf::from(dir)),
        _ => Err(WhaleError::EnvVar {
            name: RUNTIME_DIR_ENV,
        }),
    }
}

/// Returns the state directory for a container id under the runtime
/// root.
#[must_use]
pub fn state_dir(runtime_dir: &Path, id: &str) -> PathBuf {
    runtime_dir.join(CONTAINERS_DIR).join(id)
}

/// Creates the per-container state directory.
///
/// # Errors
///
/// Returns an error if the directory cannot be created.
pub fn create_state_dir(runtime_dir: &Path, id: &str) -> Result<PathBuf> {
    let dir = state_dir(runtime_dir, id);
    fs::create_dir_all(&dir).map_err(|e| WhaleError::io(dir.clone(), e))?;
    Ok(dir)
}

/// Persists the descriptor to its state directory.
///
/// # Errors
///
/// Returns an error if encoding or the file write fails.
pub fn save(container: &Container) -> Result<()> {
    let path = container.dir.join(DESCRIPTOR_FILE);
    let json = serde_json::to_string_pretty(container)?;
    fs::write(&path, json).map_err(|e| WhaleError::io(path.clone(), e))?;
    tracing::debug!(path = %path.display(), "descriptor saved");
    Ok(())
}

/// Loads the descriptor for a container id from the runtime root.
///
/// # Errors
///
/// Returns [`WhaleError::NotFound`] when no descriptor exists for the
/// id, or a decoding error when the file is malformed.
pub fn load(runtime_dir: &Path, id: &str) -> Result<Container> {
    let path = state_dir(runtime_dir, id).join(DESCRIPTOR_FILE);
    let json = match fs::read_to_string(&path) {
        Ok(json) => json,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(WhaleError::NotFound {
                kind: "container",
                id: id.to_string(),
            });
        }
        Err(e) => return Err(WhaleError::io(path, e)),
    };
    Ok(serde_json::from_str(&json)?)
}

#[cfg(test)]
mod tests {
    use whale_common::types::Volume;

    use super::*;

    #[test]
    fn descriptor_round_trips_field_for_field() {
        let runtime_dir = tempfile::tempdir().expect("tempdir");
        let mut c = Container::new("web");
        c.image = "debian".to_string();
        c.runtime_dir = runtime_dir.path().to_path_buf();
        c.cpu_shares = 512;
        c.memory = 1 << 28;
        c.namespaces = ["mount", "pid", "uts"].iter().map(ToString::to_string).collect();
        c.capabilities = vec!["CAP_NET_BIND_SERVICE".to_string()];
        c.interactive = true;
        c.user = "root:root".to_string();
        c.env = vec!["TERM=xterm".to_string()];
        c.cmd = vec!["/bin/echo".to_string(), "hi".to_string()];
        c.clone_flags = 0x2002_0000;
        c.stage1 = "./bin/stage1".into();
        c.stage2 = "./bin/stage2".into();
        c.add_volume(Volume::parse("/host/data:/data:ro").unwrap());
        c.dir = create_state_dir(runtime_dir.path(), c.id.as_str()).expect("state dir");

        save(&c).expect("save");
        let loaded = load(runtime_dir.path(), c.id.as_str()).expect("load");
        assert_eq!(loaded, c);
    }

    #[test]
    fn descriptor_file_uses_two_space_indent() {
        let runtime_dir = tempfile::tempdir().expect("tempdir");
        let mut c = Container::new("web");
        c.dir = create_state_dir(runtime_dir.path(), c.id.as_str()).expect("state dir");
        save(&c).expect("save");
        let raw = fs::read_to_string(c.dir.join(DESCRIPTOR_FILE)).expect("read");
        assert!(raw.starts_with("{\n  \""));
    }

    #[test]
    fn unknown_id_loads_as_not_found() {
        let runtime_dir = tempfile::tempdir().expect("tempdir");
        let err = load(runtime_dir.path(), "no-such-id").unwrap_err();
        assert!(matches!(
            err,
            WhaleError::NotFound { kind: "container", .. }
        ));
    }
}
