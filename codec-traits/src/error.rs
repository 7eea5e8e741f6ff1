use thiserror::Error;

#[derive(Error, Debug)]
pub enum CodecError {
    #[error("input is password protected")]
    PasswordProtected,

    #[error("input is corrupt: {0}")]
    CorruptInput(String),

    #[error("resource exhausted: {0}")]
    ResourceExhausted(String),

    #[error("unsupported parameters: {0}")]
    UnsupportedParams(String),

    #[error("codec operation failed: {0}")]
    OperationFailed(String),
}

pub type Result<T> = std::result::Result<T, CodecError>;
