//! Unified error types for the whale workspace.
//!
//! Every pipeline operation reports failure to its immediate caller
//! with the operation identity and target path; nothing in the
//! pipeline retries or rolls back.

use std::path::PathBuf;

use thiserror::Error;

/// Top-level error type shared across the workspace.
#[derive(Debug, Error)]
pub enum WhaleError {
    /// An I/O operation failed.
    #[error("I/O error at {path}: {source}")]
    Io {
        /// Path where the I/O error occurred.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// A requested namespace kind is not in the supported vocabulary.
    #[error("invalid namespace: {name}")]
    InvalidNamespace {
        /// The offending namespace name.
        name: String,
    },

    /// A volume specification is not of the form `source:target[:ro]`.
    #[error("invalid volume: {spec}")]
    InvalidVolume {
        /// The offending volume specification.
        spec: String,
    },

    /// The kernel registers neither overlayfs nor aufs.
    #[error("no supported overlay filesystem available")]
    NoOverlaySupport,

    /// A system call failed during pipeline execution.
    #[error("{op}: {source}")]
    Syscall {
        /// Pipeline step and target, e.g. `mount overlay at /var/run/whale/...`.
        op: String,
        /// Underlying OS error.
        source: std::io::Error,
    },

    /// A required environment variable is unset.
    #[error("required environment variable {name} is not set")]
    EnvVar {
        /// Name of the missing variable.
        name: &'static str,
    },

    /// A loaded descriptor is missing or malformed in a way the
    /// pipeline cannot proceed from.
    #[error("invalid descriptor: {message}")]
    Descriptor {
        /// Description of the defect.
        message: String,
    },

    /// A required resource was not found.
    #[error("{kind} not found: {id}")]
    NotFound {
        /// Type of the missing resource.
        kind: &'static str,
        /// Identifier of the missing resource.
        id: String,
    },

    /// A stage process or the container entrypoint exited nonzero.
    #[error("{stage} exited with status {code}")]
    StageFailed {
        /// Which stage reported the failure.
        stage: &'static str,
        /// The nonzero exit status.
        code: i32,
    },

    /// Descriptor serialization or deserialization failed.
    #[error("serialization error: {source}")]
    Serialization {
        /// Underlying serialization error.
        #[from]
        source: serde_json::Error,
    },
}

/// Convenience alias used throughout the workspace.
pub type Result<T> = std::result::Result<T, WhaleError>;

impl WhaleError {
    /// Builds an `Io` error for a failed filesystem operation at `path`.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Builds a `Syscall` error naming the failed pipeline step.
    pub fn syscall(op: impl Into<String>, source: std::io::Error) -> Self {
        Self::Syscall {
            op: op.into(),
            source,
        }
    }
}
