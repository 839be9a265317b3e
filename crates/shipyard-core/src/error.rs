//! Application error types with rich context

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Application error types organized by layer/domain
#[derive(Debug, Error)]
pub enum Error {
    // ─────────────────────────────────────────────────────────────
    // Common/Infrastructure Errors
    // ─────────────────────────────────────────────────────────────
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    // ─────────────────────────────────────────────────────────────
    // Resource Errors
    // ─────────────────────────────────────────────────────────────
    #[error("Resource not found: {id}")]
    ResourceNotFound { id: String },

    #[error("Resource {id} changed kind from {expected} to {found}")]
    KindMismatch {
        id: String,
        expected: String,
        found: String,
    },

    // ─────────────────────────────────────────────────────────────
    // Edit Errors
    // ─────────────────────────────────────────────────────────────
    #[error("Invalid path '{path}': {reason}")]
    InvalidPath { path: String, reason: String },

    #[error("Index {index} out of range for '{path}' (length {len})")]
    IndexOutOfRange {
        path: String,
        index: usize,
        len: usize,
    },

    #[error("Type mismatch at '{path}': expected {expected}, found {found}")]
    TypeMismatch {
        path: String,
        expected: &'static str,
        found: &'static str,
    },

    #[error("Invalid value for '{path}': {message}")]
    InvalidValue { path: String, message: String },

    #[error("Permission denied: cannot edit {id}")]
    PermissionDenied { id: String },

    #[error("Nothing to undo for {id}")]
    NothingToUndo { id: String },

    #[error("Draft for {id} has unsaved changes")]
    UnsavedChanges { id: String },

    // ─────────────────────────────────────────────────────────────
    // Save Errors
    // ─────────────────────────────────────────────────────────────
    #[error("Save already in flight for {id}")]
    SaveInFlight { id: String },

    #[error("Snapshot for {id} changed while editing; reset or force-save")]
    SaveConflict { id: String },

    #[error("Network error: {message}")]
    Network { message: String },

    #[error("Validation failed: {message}")]
    Validation { message: String },

    #[error("Permission revoked for {id}")]
    PermissionRevoked { id: String },

    #[error("Request timed out after {}ms", .after.as_millis())]
    Timeout { after: Duration },

    // ─────────────────────────────────────────────────────────────
    // Configuration Errors
    // ─────────────────────────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },

    // ─────────────────────────────────────────────────────────────
    // Channel/Communication Errors
    // ─────────────────────────────────────────────────────────────
    #[error("Channel send error: {message}")]
    ChannelSend { message: String },
}

// ─────────────────────────────────────────────────────────────────
// Convenience Constructors
// ─────────────────────────────────────────────────────────────────

impl Error {
    pub fn not_found(id: impl fmt::Display) -> Self {
        Self::ResourceNotFound { id: id.to_string() }
    }

    pub fn invalid_path(path: impl fmt::Display, reason: impl Into<String>) -> Self {
        Self::InvalidPath {
            path: path.to_string(),
            reason: reason.into(),
        }
    }

    pub fn index_out_of_range(path: impl fmt::Display, index: usize, len: usize) -> Self {
        Self::IndexOutOfRange {
            path: path.to_string(),
            index,
            len,
        }
    }

    pub fn type_mismatch(
        path: impl fmt::Display,
        expected: &'static str,
        found: &'static str,
    ) -> Self {
        Self::TypeMismatch {
            path: path.to_string(),
            expected,
            found,
        }
    }

    pub fn invalid_value(path: impl fmt::Display, message: impl Into<String>) -> Self {
        Self::InvalidValue {
            path: path.to_string(),
            message: message.into(),
        }
    }

    pub fn permission_denied(id: impl fmt::Display) -> Self {
        Self::PermissionDenied { id: id.to_string() }
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::Network {
            message: message.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    pub fn channel_send(message: impl Into<String>) -> Self {
        Self::ChannelSend {
            message: message.into(),
        }
    }

    /// Errors caused by editor wiring (a field editor addressing a path or
    /// index that does not exist). Correct editors never produce these.
    pub fn is_wiring_error(&self) -> bool {
        matches!(
            self,
            Error::InvalidPath { .. } | Error::IndexOutOfRange { .. } | Error::TypeMismatch { .. }
        )
    }

    /// Check if this is a recoverable error
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Error::Network { .. }
                | Error::Validation { .. }
                | Error::Timeout { .. }
                | Error::SaveInFlight { .. }
                | Error::SaveConflict { .. }
                | Error::InvalidValue { .. }
                | Error::NothingToUndo { .. }
                | Error::UnsavedChanges { .. }
                | Error::Config { .. }
                | Error::ChannelSend { .. }
        )
    }
}

// ─────────────────────────────────────────────────────────────────
// Save Errors (cloneable, carried in messages and events)
// ─────────────────────────────────────────────────────────────────

/// Category of a failed save
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SaveErrorKind {
    Network,
    Validation,
    PermissionRevoked,
    Timeout,
    Conflict,
    InFlight,
}

/// A save failure surfaced to the whole-resource editor.
///
/// Unlike [`Error`], this is `Clone` so it can travel through the message
/// channel and the event broadcast.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaveError {
    pub kind: SaveErrorKind,
    pub message: String,
}

impl SaveError {
    pub fn new(kind: SaveErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Whether retrying the same save can succeed without user action
    pub fn is_retryable(&self) -> bool {
        matches!(
            self.kind,
            SaveErrorKind::Network | SaveErrorKind::Timeout | SaveErrorKind::InFlight
        )
    }
}

impl fmt::Display for SaveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for SaveError {}

impl From<&Error> for SaveError {
    fn from(err: &Error) -> Self {
        let kind = match err {
            Error::Validation { .. }
            | Error::InvalidValue { .. }
            | Error::KindMismatch { .. }
            | Error::ResourceNotFound { .. } => SaveErrorKind::Validation,
            Error::PermissionRevoked { .. } | Error::PermissionDenied { .. } => {
                SaveErrorKind::PermissionRevoked
            }
            Error::Timeout { .. } => SaveErrorKind::Timeout,
            Error::SaveConflict { .. } => SaveErrorKind::Conflict,
            Error::SaveInFlight { .. } => SaveErrorKind::InFlight,
            _ => SaveErrorKind::Network,
        };
        Self::new(kind, err.to_string())
    }
}

impl From<Error> for SaveError {
    fn from(err: Error) -> Self {
        Self::from(&err)
    }
}

// ─────────────────────────────────────────────────────────────────
// Error Context Extensions
// ─────────────────────────────────────────────────────────────────

/// Log a failure together with what was being attempted.
///
/// Recoverable errors are logged at `warn`, everything else at `error`; the
/// error itself is passed through unchanged.
pub trait ResultExt<T> {
    fn context(self, context: impl Into<String>) -> Result<T>;

    /// Like [`context`](Self::context), building the message only on failure
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T, E: Into<Error>> ResultExt<T> for std::result::Result<T, E> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.with_context(|| context.into())
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| {
            let err = e.into();
            if err.is_recoverable() {
                tracing::warn!("{}: {}", f(), err);
            } else {
                tracing::error!("{}: {:?}", f(), err);
            }
            err
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_messages() {
        let err = Error::not_found("dep-1");
        assert_eq!(err.to_string(), "Resource not found: dep-1");

        let err = Error::index_out_of_range("ports", 4, 2);
        assert_eq!(
            err.to_string(),
            "Index 4 out of range for 'ports' (length 2)"
        );
    }

    #[test]
    fn test_timeout_display_uses_millis() {
        let err = Error::Timeout {
            after: Duration::from_millis(1500),
        };
        assert_eq!(err.to_string(), "Request timed out after 1500ms");
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn test_wiring_errors() {
        assert!(Error::invalid_path("nope", "unknown field").is_wiring_error());
        assert!(Error::index_out_of_range("ports", 3, 1).is_wiring_error());
        assert!(!Error::permission_denied("dep-1").is_wiring_error());
    }

    #[test]
    fn test_error_is_recoverable() {
        assert!(Error::network("connection reset").is_recoverable());
        assert!(Error::SaveInFlight { id: "x".into() }.is_recoverable());
        assert!(!Error::permission_denied("x").is_recoverable());
        assert!(!Error::invalid_path("nope", "unknown field").is_recoverable());
    }

    #[test]
    fn test_context_passes_error_through() {
        let result: std::result::Result<(), std::io::Error> = Err(std::io::Error::new(
            std::io::ErrorKind::PermissionDenied,
            "read-only",
        ));
        let err = result.context("Writing config").unwrap_err();
        assert!(matches!(err, Error::Io(_)));

        let ok: Result<u8> = Ok(7);
        assert_eq!(ok.with_context(|| unreachable!()).unwrap(), 7);
    }

    #[test]
    fn test_save_error_classification() {
        let save: SaveError = Error::validation("image must not be empty").into();
        assert_eq!(save.kind, SaveErrorKind::Validation);
        assert!(!save.is_retryable());

        let save: SaveError = Error::Timeout {
            after: Duration::from_secs(1),
        }
        .into();
        assert_eq!(save.kind, SaveErrorKind::Timeout);
        assert!(save.is_retryable());

        let save: SaveError = Error::PermissionRevoked { id: "x".into() }.into();
        assert_eq!(save.kind, SaveErrorKind::PermissionRevoked);

        let save: SaveError = Error::network("refused").into();
        assert_eq!(save.kind, SaveErrorKind::Network);
        assert_eq!(save.to_string(), "Network error: refused");
    }
}
