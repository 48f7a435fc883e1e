//! Application-wide error types.

use thiserror::Error;

/// Application-wide result type.
pub type Result<T> = std::result::Result<T, Error>;

/// Terminal failures of a merge request. None of these are retried.
#[derive(Error, Debug)]
pub enum Error {
    #[error("no download record for gid {gid}")]
    RecordNotFound { gid: String },

    #[error("not enough free space: {required_bytes} bytes required, {available_bytes} available")]
    InsufficientSpace {
        required_bytes: u64,
        available_bytes: u64,
    },

    #[error("merge tool not found: {0}")]
    ToolNotFound(String),

    #[error("merge tool failed with exit code {exit_code:?}")]
    ToolError {
        exit_code: Option<i32>,
        stderr: String,
    },

    #[error("malformed size string: {0:?}")]
    SizeFormat(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
