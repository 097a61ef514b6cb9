use thiserror::Error;

use super::{AppError, ErrorCategory};

/// Failures reported by the FTP transport underneath a scan
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Protocol(String),
}

impl From<suppaftp::FtpError> for TransportError {
    fn from(err: suppaftp::FtpError) -> Self {
        match err {
            suppaftp::FtpError::ConnectionError(e) => TransportError::Io(e),
            other => TransportError::Protocol(other.to_string()),
        }
    }
}

/// Errors surfaced by a single FTP inventory scan
#[derive(Error, Debug)]
pub enum ScanError {
    #[error("Invalid scan target '{url}': {reason}")]
    InvalidTarget { url: String, reason: String },

    #[error("Scan aborted")]
    Aborted,

    #[error("Connection to {address} failed: {source}")]
    ConnectionError {
        address: String,
        #[source]
        source: TransportError,
    },

    #[error("Login rejected for user '{username}': {source}")]
    AuthError {
        username: String,
        #[source]
        source: TransportError,
    },

    #[error("ftp error: cannot change to directory '{path}': {message}")]
    PathError { path: String, message: String },

    #[error("ftp error: listing '{path}' failed: {message}")]
    ListError { path: String, message: String },

    #[error("Record sink rejected a file: {message}")]
    Sink { message: String },

    #[error("Scan worker failed: {message}")]
    Worker { message: String },
}

impl ScanError {
    /// Cancellation is not a scan-health problem; callers use this to tell it apart
    pub fn is_cancelled(&self) -> bool {
        matches!(self, ScanError::Aborted)
    }

    pub(crate) fn invalid_target(url: &str, reason: impl Into<String>) -> Self {
        ScanError::InvalidTarget {
            url: url.to_string(),
            reason: reason.into(),
        }
    }
}

impl AppError for ScanError {
    fn user_message(&self) -> String {
        match self {
            ScanError::InvalidTarget { reason, .. } => format!("Invalid FTP URL: {}", reason),
            ScanError::Aborted => "Scan was cancelled".to_string(),
            ScanError::ConnectionError { .. } => "Unable to connect to the FTP server".to_string(),
            ScanError::AuthError { .. } => {
                "Authentication failed - please check credentials".to_string()
            }
            ScanError::PathError { path, .. } => {
                format!("Directory not found or not accessible: {}", path)
            }
            ScanError::ListError { path, .. } => format!("Failed to list directory: {}", path),
            ScanError::Sink { .. } => "Failed to store discovered files".to_string(),
            ScanError::Worker { .. } => "An internal error occurred".to_string(),
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            ScanError::InvalidTarget { .. } => "SCAN_INVALID_TARGET",
            ScanError::Aborted => "SCAN_ABORTED",
            ScanError::ConnectionError { .. } => "SCAN_CONNECTION_FAILED",
            ScanError::AuthError { .. } => "SCAN_AUTH_FAILED",
            ScanError::PathError { .. } => "SCAN_PATH_ERROR",
            ScanError::ListError { .. } => "SCAN_LIST_FAILED",
            ScanError::Sink { .. } => "SCAN_SINK_FAILED",
            ScanError::Worker { .. } => "SCAN_WORKER_FAILED",
        }
    }

    fn error_category(&self) -> ErrorCategory {
        match self {
            ScanError::InvalidTarget { .. } => ErrorCategory::Config,
            ScanError::Aborted => ErrorCategory::Cancelled,
            ScanError::ConnectionError { .. } | ScanError::ListError { .. } => {
                ErrorCategory::Network
            }
            ScanError::AuthError { .. } => ErrorCategory::Auth,
            ScanError::PathError { .. } => ErrorCategory::FileSystem,
            ScanError::Sink { .. } | ScanError::Worker { .. } => ErrorCategory::Internal,
        }
    }

    fn suggested_action(&self) -> Option<String> {
        let action = match self {
            ScanError::InvalidTarget { .. } => {
                "Use a URL of the form ftp://[user[:pass]@]host[:port]/path"
            }
            ScanError::ConnectionError { .. } => "Check network connectivity and server address",
            ScanError::AuthError { .. } => "Verify username and password are correct",
            ScanError::PathError { .. } => {
                "Check that the starting directory exists on the server"
            }
            _ => return None,
        };
        Some(action.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn test_only_aborted_counts_as_cancellation() {
        assert!(ScanError::Aborted.is_cancelled());
        let failure = ScanError::ListError {
            path: "/pub/a".to_string(),
            message: "550 gone".to_string(),
        };
        assert!(!failure.is_cancelled());
        assert_eq!(failure.error_category(), ErrorCategory::Network);
    }

    #[test]
    fn test_error_messages_carry_context() {
        let err = ScanError::ConnectionError {
            address: "mirror.example.org:21".to_string(),
            source: TransportError::Io(io::Error::new(io::ErrorKind::TimedOut, "timed out")),
        };
        let message = err.to_string();
        assert!(message.contains("mirror.example.org:21"));
        assert!(message.contains("timed out"));
        assert_eq!(err.error_code(), "SCAN_CONNECTION_FAILED");

        let err = ScanError::ListError {
            path: "/pub/a/b/c".to_string(),
            message: "550 Permission denied".to_string(),
        };
        assert!(err.to_string().contains("/pub/a/b/c"));
        assert!(err.to_string().contains("550 Permission denied"));
    }
}
