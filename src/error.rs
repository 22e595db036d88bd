use thiserror::Error;

#[derive(Debug, Error)]
pub enum SupportDeskError {
    #[error("configuration error: {0}")]
    Config(String),
    #[error("unauthorized: {0}")]
    Unauthorized(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("upstream unavailable: {0}")]
    Upstream(String),
    #[error("storage error: {0}")]
    Storage(String),
}

pub type Result<T> = std::result::Result<T, SupportDeskError>;
