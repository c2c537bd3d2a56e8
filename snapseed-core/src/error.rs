//! snapseed error types.
//!
//! Every variant maps to a stable `error_type()` string so callers can branch
//! on the failure class without parsing messages. Errors are `Clone` because a
//! single-flight load hands one outcome to every waiter.

use std::path::{Path, PathBuf};

use crate::compare::Diff;
use crate::decode::DecodeError;

/// Convenience alias used throughout the crate.
pub type Result<T, E = SnapError> = std::result::Result<T, E>;

/// Main error type for snapseed operations.
#[derive(Debug, Clone, thiserror::Error)]
pub enum SnapError {
    /// A path spec resolved to zero usable fixture files.
    #[error("no fixture files resolved from {spec:?}: {reason}")]
    Resolution { spec: String, reason: String },

    /// A glob pattern could not be parsed.
    #[error("invalid glob pattern {pattern:?}: {message}")]
    InvalidGlob { pattern: String, message: String },

    /// A file was named directly but does not carry a fixture extension.
    #[error("unsupported fixture file {}: expected a .json, .yaml or .yml extension", path.display())]
    UnsupportedFile { path: PathBuf },

    /// Reading a fixture or config file failed.
    #[error("io error on {}: {message}", path.display())]
    Io { path: PathBuf, message: String },

    /// Fixture content could not be decoded.
    #[error("decode {}: {source}", path.display())]
    Decode { path: PathBuf, source: DecodeError },

    /// A directive marker was registered twice.
    #[error("directive ${name} is already registered")]
    DuplicateDirective { name: String },

    /// Seed input does not have the group/array/document shape.
    #[error(transparent)]
    Shape(#[from] ShapeError),

    /// The backing store rejected an operation.
    #[error("{operation}{}: {message}", in_group(.group))]
    Backend {
        group: Option<String>,
        operation: String,
        message: String,
    },

    /// Expected and actual trees diverge.
    #[error("{0}")]
    Comparison(Diff),

    /// The caller's context was cancelled.
    #[error("operation cancelled")]
    Cancelled,

    /// The caller's deadline passed.
    #[error("deadline exceeded")]
    DeadlineExceeded,

    /// A cache flight finished without publishing a document.
    #[error("cache slot for {key} holds no document")]
    CacheSlotEmpty { key: String },

    /// Loader configuration could not be read.
    #[error("config error: {message}")]
    Config { message: String },
}

fn in_group(group: &Option<String>) -> String {
    match group {
        Some(name) => format!(" on group {name:?}"),
        None => String::new(),
    }
}

/// Seed input shape violations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ShapeError {
    /// A top-level entry is not an array.
    #[error("group {key:?} expects an array of documents, got {actual}")]
    NotAnArray { key: String, actual: &'static str },

    /// An array element is not a document.
    #[error("group {key:?} index {index} expects a document, got {actual}")]
    NotADocument {
        key: String,
        index: usize,
        actual: &'static str,
    },
}

impl SnapError {
    /// Get the error type as a stable string.
    pub fn error_type(&self) -> &'static str {
        match self {
            SnapError::Resolution { .. } => "resolution",
            SnapError::InvalidGlob { .. } => "invalid_glob",
            SnapError::UnsupportedFile { .. } => "unsupported_file",
            SnapError::Io { .. } => "io_error",
            SnapError::Decode { .. } => "decode",
            SnapError::DuplicateDirective { .. } => "duplicate_directive",
            SnapError::Shape(_) => "shape",
            SnapError::Backend { .. } => "backend",
            SnapError::Comparison(_) => "comparison",
            SnapError::Cancelled => "cancelled",
            SnapError::DeadlineExceeded => "deadline_exceeded",
            SnapError::CacheSlotEmpty { .. } => "cache_slot_empty",
            SnapError::Config { .. } => "config_error",
        }
    }

    // Convenience constructors

    /// Create a "resolution" error.
    pub fn resolution(spec: impl Into<String>, reason: impl Into<String>) -> Self {
        SnapError::Resolution {
            spec: spec.into(),
            reason: reason.into(),
        }
    }

    /// Create an "invalid glob" error.
    pub fn invalid_glob(pattern: impl Into<String>, message: impl Into<String>) -> Self {
        SnapError::InvalidGlob {
            pattern: pattern.into(),
            message: message.into(),
        }
    }

    /// Create an "unsupported file" error.
    pub fn unsupported_file(path: impl Into<PathBuf>) -> Self {
        SnapError::UnsupportedFile { path: path.into() }
    }

    /// Create an I/O error tagged with the path it happened on.
    pub fn io(path: &Path, err: &std::io::Error) -> Self {
        SnapError::Io {
            path: path.to_path_buf(),
            message: err.to_string(),
        }
    }

    /// Create a "decode" error tagged with the fixture path.
    pub fn decode(path: impl Into<PathBuf>, source: DecodeError) -> Self {
        SnapError::Decode {
            path: path.into(),
            source,
        }
    }

    /// Create a "backend" error for an operation, optionally scoped to a group.
    pub fn backend(
        group: Option<&str>,
        operation: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        SnapError::Backend {
            group: group.map(str::to_owned),
            operation: operation.into(),
            message: message.into(),
        }
    }

    /// Create a "cache slot empty" error.
    pub fn cache_slot_empty(key: impl Into<String>) -> Self {
        SnapError::CacheSlotEmpty { key: key.into() }
    }

    /// Create a "config" error.
    pub fn config(message: impl Into<String>) -> Self {
        SnapError::Config {
            message: message.into(),
        }
    }

    /// Check if this error means no usable fixture was found.
    pub fn is_resolution(&self) -> bool {
        matches!(
            self,
            SnapError::Resolution { .. } | SnapError::InvalidGlob { .. }
        )
    }

    /// Check if this is a Shape error.
    pub fn is_shape(&self) -> bool {
        matches!(self, SnapError::Shape(_))
    }

    /// Get the mismatch list of a Comparison error.
    pub fn diff(&self) -> Option<&Diff> {
        match self {
            SnapError::Comparison(diff) => Some(diff),
            _ => None,
        }
    }
}
