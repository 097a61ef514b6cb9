pub mod scan;

pub use scan::{ScanError, TransportError};

/// Broad grouping used by callers that route errors to different handlers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Config,
    Network,
    Auth,
    FileSystem,
    Cancelled,
    Internal,
}

/// Common trait for all custom error types in the crate
pub trait AppError: std::error::Error + Send + Sync + 'static {
    /// Get a user-friendly error message
    fn user_message(&self) -> String;

    /// Get a stable error code for machine handling
    fn error_code(&self) -> &'static str;

    /// Get the error category
    fn error_category(&self) -> ErrorCategory;

    /// Get optional suggested action for the user
    fn suggested_action(&self) -> Option<String> {
        None
    }
}
