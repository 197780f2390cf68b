//! Error types for gatetrack operations
//!
//! The pure engine functions (classification, rollup, readiness, dashboard
//! reductions) never fail. Errors come from the write boundary: edit
//! transitions, parsing user input, configuration and the snapshot store.

use std::path::PathBuf;
use thiserror::Error;
use uuid::Uuid;

/// Gatetrack result type alias
pub type Result<T> = std::result::Result<T, TrackerError>;

/// Error category for structured logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Configuration or checklist file could not be read or parsed
    Config,
    /// SQLite snapshot store failures
    Store,
    /// Rejected input at the write boundary
    Validation,
    /// Referenced entity does not exist
    NotFound,
    /// Name/identity clash or a stale snapshot
    Conflict,
    /// Filesystem errors outside the store
    Io,
}

impl ErrorCategory {
    /// Machine-readable code for logging
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Config => "config",
            Self::Store => "store",
            Self::Validation => "validation",
            Self::NotFound => "not_found",
            Self::Conflict => "conflict",
            Self::Io => "io",
        }
    }
}

/// Gatetrack error taxonomy
#[derive(Debug, Error)]
pub enum TrackerError {
    #[error("Failed to read file {path}: {source}")]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to write file {path}: {source}")]
    FileWrite {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse {what}: {source}")]
    ConfigParse {
        what: String,
        source: toml::de::Error,
    },

    #[error("store error: {message}: {source}")]
    Store {
        message: String,
        source: rusqlite::Error,
    },

    #[error("store contains invalid data: {0}")]
    CorruptStore(String),

    #[error("project not found: {0}")]
    ProjectNotFound(String),

    #[error("module not found: {0}")]
    ModuleNotFound(String),

    #[error("sub-module not found: {0}")]
    SubModuleNotFound(String),

    #[error("deliverable not found: {0}")]
    DeliverableNotFound(Uuid),

    #[error("{entity} name must not be empty")]
    EmptyName { entity: &'static str },

    #[error("{entity} named {name:?} already exists")]
    DuplicateName { entity: &'static str, name: String },

    #[error("{count} projects share the name {name:?}; merge by name is ambiguous")]
    AmbiguousName { name: String, count: usize },

    #[error("duplicate identity {0} in snapshot")]
    DuplicateId(Uuid),

    #[error("actual date of module {module:?} is derived from its sub-modules and cannot be edited")]
    DerivedField { module: String },

    #[error("invalid date {0:?}; expected YYYY-MM-DD")]
    InvalidDate(String),

    #[error("invalid deliverable status {0:?}; expected one of Pending, WIP, Completed, NA")]
    InvalidStatus(String),

    #[error("invalid project type {0:?}; expected one of Major, Minor, Carryover")]
    InvalidProjectType(String),

    #[error("invalid gateway {0:?}; expected one of D0..D4")]
    InvalidGateway(String),

    #[error("initial module count {0} exceeds the maximum of {max}", max = crate::portfolio::MAX_INITIAL_MODULES)]
    TooManyModules(usize),

    #[error("snapshot is stale: based on revision {expected}, store is at revision {found}")]
    StaleSnapshot { expected: u64, found: u64 },

    #[error("upload row {row}: {message}")]
    UploadRow { row: usize, message: String },
}

impl TrackerError {
    /// Get the error category
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::ConfigParse { .. } => ErrorCategory::Config,
            Self::Store { .. } | Self::CorruptStore(_) => ErrorCategory::Store,
            Self::FileRead { .. } | Self::FileWrite { .. } => ErrorCategory::Io,
            Self::ProjectNotFound(_)
            | Self::ModuleNotFound(_)
            | Self::SubModuleNotFound(_)
            | Self::DeliverableNotFound(_) => ErrorCategory::NotFound,
            Self::DuplicateName { .. }
            | Self::AmbiguousName { .. }
            | Self::DuplicateId(_)
            | Self::StaleSnapshot { .. } => ErrorCategory::Conflict,
            Self::EmptyName { .. }
            | Self::DerivedField { .. }
            | Self::InvalidDate(_)
            | Self::InvalidStatus(_)
            | Self::InvalidProjectType(_)
            | Self::InvalidGateway(_)
            | Self::TooManyModules(_)
            | Self::UploadRow { .. } => ErrorCategory::Validation,
        }
    }

    /// Wrap a rusqlite error with context.
    pub(crate) fn store(message: impl Into<String>) -> impl FnOnce(rusqlite::Error) -> Self {
        let message = message.into();
        move |source| Self::Store { message, source }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_categories() {
        assert_eq!(
            TrackerError::StaleSnapshot {
                expected: 1,
                found: 2
            }
            .category(),
            ErrorCategory::Conflict
        );
        assert_eq!(
            TrackerError::InvalidStatus("N/A".to_string()).category(),
            ErrorCategory::Validation
        );
        assert_eq!(
            TrackerError::ProjectNotFound("Apollo".to_string()).category(),
            ErrorCategory::NotFound
        );
        assert_eq!(ErrorCategory::Store.as_str(), "store");
    }

    #[test]
    fn test_display_mentions_context() {
        let err = TrackerError::UploadRow {
            row: 3,
            message: "invalid date \"2024-13-01\"".to_string(),
        };
        assert_eq!(err.to_string(), "upload row 3: invalid date \"2024-13-01\"");

        let err = TrackerError::TooManyModules(25);
        assert!(err.to_string().contains("maximum of 20"));
    }
}
