//! Error types for memory controller operations

use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Memory controller errors
#[derive(Debug, Error)]
pub enum CgroupError {
    #[error("Cgroup not found: {0}")]
    NotFound(String),

    /// The group resolved under the unified hierarchy. Callers switch to v2
    /// handling instead of failing.
    #[error("Cgroup v2 unified hierarchy in use at {}", .0.display())]
    VersionMismatch(PathBuf),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Cgroup validation failed: {0}")]
    ValidationError(String),

    #[error("Failed to parse cgroup file: {0}")]
    ParseError(String),

    #[error("IO error on {}: {source}", path.display())]
    ControlFile {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// Coarse classification used by the lifecycle code to decide whether an
/// error is absorbed, switches mode, or aborts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    VersionMismatch,
    Validation,
    Io,
    Parse,
}

impl CgroupError {
    /// Wrap an IO error with the file or directory it happened on
    pub fn control_file(path: impl AsRef<Path>, source: io::Error) -> Self {
        let path = path.as_ref();
        match source.kind() {
            io::ErrorKind::NotFound => CgroupError::NotFound(path.display().to_string()),
            io::ErrorKind::PermissionDenied => {
                CgroupError::PermissionDenied(path.display().to_string())
            }
            _ => CgroupError::ControlFile {
                path: path.to_path_buf(),
                source,
            },
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            CgroupError::NotFound(_) => ErrorKind::NotFound,
            CgroupError::VersionMismatch(_) => ErrorKind::VersionMismatch,
            CgroupError::ValidationError(_) => ErrorKind::Validation,
            CgroupError::ParseError(_) => ErrorKind::Parse,
            CgroupError::Io(e) | CgroupError::ControlFile { source: e, .. }
                if e.kind() == io::ErrorKind::NotFound =>
            {
                ErrorKind::NotFound
            }
            CgroupError::PermissionDenied(_)
            | CgroupError::ControlFile { .. }
            | CgroupError::Io(_) => ErrorKind::Io,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.kind() == ErrorKind::NotFound
    }

    pub fn is_version_mismatch(&self) -> bool {
        self.kind() == ErrorKind::VersionMismatch
    }
}

pub type Result<T> = std::result::Result<T, CgroupError>;
