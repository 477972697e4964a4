use thiserror::Error;

/// Fatal error produced by a core operation.
///
/// Every variant maps to exit code 2 at the CLI boundary; none of these are
/// retried and none suspend (see the concurrency/resource model).
#[derive(Debug, Error)]
pub enum AttestError {
    #[error("parse error: {0}")]
    Parse(String),

    #[error("schema error: {0}")]
    Schema(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("platform error: {0}")]
    Platform(String),

    #[error("argument error: {0}")]
    Argument(String),
}

impl AttestError {
    pub fn parse(msg: impl Into<String>) -> Self {
        AttestError::Parse(msg.into())
    }

    pub fn schema(msg: impl Into<String>) -> Self {
        AttestError::Schema(msg.into())
    }

    pub fn platform(msg: impl Into<String>) -> Self {
        AttestError::Platform(msg.into())
    }

    pub fn argument(msg: impl Into<String>) -> Self {
        AttestError::Argument(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, AttestError>;
