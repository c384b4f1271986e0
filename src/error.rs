/*!
 * Error types for skiff
 */

use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, SkiffError>;

/// Exit code constants for structured process exit
pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_PARTIAL: i32 = 1;
pub const EXIT_FATAL: i32 = 2;

/// Errors surfaced by the transfer engine and its collaborators
#[derive(Error, Debug)]
pub enum SkiffError {
    /// Invalid configuration (bad option, unreadable config file, bad remote address)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Bucket name rejected by the naming rules
    #[error("Invalid bucket name: {0}")]
    InvalidBucketName(String),

    /// Remote key does not exist
    #[error("Key not found: {bucket}/{key}")]
    NotFound { bucket: String, key: String },

    /// Local source file or directory does not exist
    #[error("Local path not found: {0}")]
    LocalNotFound(PathBuf),

    /// Network or storage failure on a single-shot or part transfer
    #[error("Transfer failed: {0}")]
    Transfer(String),

    /// Multipart session failure (initiate, complete, or abort)
    #[error("Multipart upload error: {0}")]
    Multipart(String),

    /// Some entries in a bulk operation failed while others succeeded
    #[error("{failed} of {total} entries failed")]
    PartialFailure { failed: usize, total: usize },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP transport error
    #[error("HTTP error: {0}")]
    Http(String),

    /// Malformed response body from the remote store
    #[error("Response decode error: {0}")]
    Decode(#[from] serde_json::Error),
}

impl SkiffError {
    /// Shorthand for a transfer error with an HTTP status attached
    pub fn status(what: &str, status: u16) -> Self {
        SkiffError::Transfer(format!("{} failed with status {}", what, status))
    }

    /// Get the process exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            SkiffError::Config(_)
            | SkiffError::InvalidBucketName(_)
            | SkiffError::LocalNotFound(_) => EXIT_FATAL,
            _ => EXIT_PARTIAL,
        }
    }

}

impl From<reqwest::Error> for SkiffError {
    fn from(err: reqwest::Error) -> Self {
        SkiffError::Http(err.to_string())
    }
}
