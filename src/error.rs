//! Error taxonomy and the result contract for mutating operations.

use serde::Serialize;
use std::path::{Path, PathBuf};

pub type Result<T> = std::result::Result<T, Error>;

/// Every failure the core can surface, with a machine-checkable kind.
///
/// Absence of an artifact, profile or process is not an error: probes report
/// it in their status structs and lookups return `Option`. `NotFound` is
/// reserved for operations that were explicitly asked to act on something
/// that does not exist (e.g. an unknown sandbox application id).
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("parse error in {path}: {reason}")]
    Parse { path: PathBuf, reason: String },

    #[error("permission denied: {0}")]
    Permission(String),

    #[error("no lsfg-vk installation found (neither native package nor local install)")]
    NoProvenance,

    #[error("could not determine executable from launch command: {0}")]
    UnparsableLaunchCommand(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Wrap an I/O error, promoting EACCES/EPERM to the `Permission` kind.
    pub fn io_at(err: std::io::Error, path: &Path) -> Error {
        if err.kind() == std::io::ErrorKind::PermissionDenied {
            Error::Permission(path.display().to_string())
        } else {
            Error::Io(err)
        }
    }
}

/// Exit contract for every mutating operation.
///
/// `success == false` means nothing was left behind beyond what
/// `removed_files` reports.
#[derive(Serialize, Clone, Debug)]
pub struct MutationOutcome {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub removed_files: Vec<PathBuf>,
}

impl MutationOutcome {
    pub fn ok(message: impl Into<String>) -> Self {
        MutationOutcome {
            success: true,
            message: message.into(),
            removed_files: Vec::new(),
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        MutationOutcome {
            success: false,
            message: message.into(),
            removed_files: Vec::new(),
        }
    }

    pub fn with_removed(mut self, removed: Vec<PathBuf>) -> Self {
        self.removed_files = removed;
        self
    }
}
