//! The core error taxonomy (one enum, mapped to transport codes at the edges).
//!
//! Every fallible operation in the context manager, tool registry, executor,
//! and store facade returns `Result<T>` with this error. The session core and
//! REST layer each carry their own `From<CoreError>` mapping to WS close codes
//! / HTTP status codes rather than inventing their own error types.

use std::fmt;

#[derive(thiserror::Error, Debug)]
pub enum CoreError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("unauthenticated: {0}")]
    Unauthenticated(String),

    #[error("permission denied: {0}")]
    PermissionDenied(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("failed precondition: {0}")]
    FailedPrecondition(String),

    #[error("resource exhausted: {0}")]
    ResourceExhausted(String),

    #[error("cancelled: {0}")]
    Cancelled(String),

    #[error("internal: {0}")]
    Internal(String),

    #[error("unavailable: {0}")]
    Unavailable(String),

    #[error("deadline exceeded: {0}")]
    DeadlineExceeded(String),
}

/// The taxonomy code, independent of the human-readable message — used by
/// both transport mappings and by tests asserting on error class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    InvalidArgument,
    Unauthenticated,
    PermissionDenied,
    NotFound,
    Conflict,
    FailedPrecondition,
    ResourceExhausted,
    Cancelled,
    Internal,
    Unavailable,
    DeadlineExceeded,
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorCode::InvalidArgument => "INVALID_ARGUMENT",
            ErrorCode::Unauthenticated => "UNAUTHENTICATED",
            ErrorCode::PermissionDenied => "PERMISSION_DENIED",
            ErrorCode::NotFound => "NOT_FOUND",
            ErrorCode::Conflict => "CONFLICT",
            ErrorCode::FailedPrecondition => "FAILED_PRECONDITION",
            ErrorCode::ResourceExhausted => "RESOURCE_EXHAUSTED",
            ErrorCode::Cancelled => "CANCELLED",
            ErrorCode::Internal => "INTERNAL",
            ErrorCode::Unavailable => "UNAVAILABLE",
            ErrorCode::DeadlineExceeded => "DEADLINE_EXCEEDED",
        };
        f.write_str(s)
    }
}

impl CoreError {
    pub fn code(&self) -> ErrorCode {
        match self {
            CoreError::InvalidArgument(_) => ErrorCode::InvalidArgument,
            CoreError::Unauthenticated(_) => ErrorCode::Unauthenticated,
            CoreError::PermissionDenied(_) => ErrorCode::PermissionDenied,
            CoreError::NotFound(_) => ErrorCode::NotFound,
            CoreError::Conflict(_) => ErrorCode::Conflict,
            CoreError::FailedPrecondition(_) => ErrorCode::FailedPrecondition,
            CoreError::ResourceExhausted(_) => ErrorCode::ResourceExhausted,
            CoreError::Cancelled(_) => ErrorCode::Cancelled,
            CoreError::Internal(_) => ErrorCode::Internal,
            CoreError::Unavailable(_) => ErrorCode::Unavailable,
            CoreError::DeadlineExceeded(_) => ErrorCode::DeadlineExceeded,
        }
    }

    /// HTTP status for the REST surface.
    pub fn http_status(&self) -> u16 {
        match self.code() {
            ErrorCode::InvalidArgument => 400,
            ErrorCode::Unauthenticated => 401,
            ErrorCode::PermissionDenied => 403,
            ErrorCode::NotFound => 404,
            ErrorCode::Conflict => 409,
            ErrorCode::FailedPrecondition => 412,
            ErrorCode::ResourceExhausted => 429,
            ErrorCode::Cancelled => 499,
            ErrorCode::Internal => 500,
            ErrorCode::Unavailable => 503,
            ErrorCode::DeadlineExceeded => 504,
        }
    }

    /// WS close code for the session core, when the error terminates the
    /// connection outright rather than just the one request.
    pub fn ws_close_code(&self) -> u16 {
        match self.code() {
            ErrorCode::Unauthenticated => 4401,
            ErrorCode::PermissionDenied => 4403,
            ErrorCode::DeadlineExceeded => 4408,
            ErrorCode::ResourceExhausted => 4429,
            _ => 1000,
        }
    }
}

pub type Result<T> = std::result::Result<T, CoreError>;

impl From<std::io::Error> for CoreError {
    fn from(e: std::io::Error) -> Self {
        CoreError::Internal(e.to_string())
    }
}

impl From<serde_json::Error> for CoreError {
    fn from(e: serde_json::Error) -> Self {
        CoreError::InvalidArgument(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_status_mapping() {
        assert_eq!(CoreError::InvalidArgument("x".into()).http_status(), 400);
        assert_eq!(CoreError::PermissionDenied("x".into()).http_status(), 403);
        assert_eq!(CoreError::Unavailable("x".into()).http_status(), 503);
        assert_eq!(CoreError::DeadlineExceeded("x".into()).http_status(), 504);
    }

    #[test]
    fn ws_close_code_mapping() {
        assert_eq!(CoreError::Unauthenticated("x".into()).ws_close_code(), 4401);
        assert_eq!(CoreError::PermissionDenied("x".into()).ws_close_code(), 4403);
        assert_eq!(CoreError::NotFound("x".into()).ws_close_code(), 1000);
    }

    #[test]
    fn code_display() {
        assert_eq!(ErrorCode::FailedPrecondition.to_string(), "FAILED_PRECONDITION");
    }
}
