//! Error types for mac-trap operations.
//!
//! None of these are fatal to the sampling loop. The loop logs them and keeps
//! going; only configuration errors stop the process, and only at startup.

use std::path::PathBuf;

/// All errors that can occur in mac-trap-core operations.
#[derive(Debug, thiserror::Error)]
pub enum TripwireError {
    // ─────────────────────────────────────────────────────────────────────
    // Collaborator Errors
    // ─────────────────────────────────────────────────────────────────────
    #[error("Idle probe failed: {0}")]
    ProbeFailed(String),

    #[error("Session lock failed: {0}")]
    LockFailed(String),

    #[error("Evidence capture failed: {0}")]
    CaptureFailed(String),

    #[error("Warning launch failed: {0}")]
    WarningLaunchFailed(String),

    // ─────────────────────────────────────────────────────────────────────
    // Configuration Errors
    // ─────────────────────────────────────────────────────────────────────
    #[error("Configuration file malformed: {path}: {details}")]
    ConfigMalformed { path: PathBuf, details: String },

    #[error("Invalid configuration value for {field}: {reason}")]
    ConfigInvalid { field: &'static str, reason: String },

    // ─────────────────────────────────────────────────────────────────────
    // I/O Errors
    // ─────────────────────────────────────────────────────────────────────
    #[error("I/O error: {context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Command execution failed: {command}: {details}")]
    CommandFailed { command: String, details: String },
}

/// Convenience type alias for Results using TripwireError.
pub type Result<T> = std::result::Result<T, TripwireError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_invalid_names_the_field() {
        let err = TripwireError::ConfigInvalid {
            field: "idle_threshold_secs",
            reason: "must be positive".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Invalid configuration value for idle_threshold_secs: must be positive"
        );
    }

    #[test]
    fn io_error_keeps_source() {
        let err = TripwireError::Io {
            context: "create photos dir".to_string(),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        };
        assert!(std::error::Error::source(&err).is_some());
        assert!(err.to_string().starts_with("I/O error: create photos dir"));
    }
}
