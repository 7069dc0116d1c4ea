//! XRPC error taxonomy and status classification

use atproto_ids::InvalidIdentifier;
use thiserror::Error;

/// HTTP statuses treated as transient server-side conditions.
pub const OVERLOAD_STATUSES: [u16; 9] = [408, 425, 429, 500, 502, 503, 504, 522, 524];

/// Error kinds a 400 response may carry when the credential is the problem.
const AUTH_ERROR_KINDS: [&str; 3] = ["ExpiredToken", "InvalidToken", "AuthenticationRequired"];

/// Every way an XRPC call can fail.
///
/// Only [`NetworkFailure`](XrpcError::NetworkFailure) and
/// [`ServerOverload`](XrpcError::ServerOverload) are worth retrying.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum XrpcError {
    /// A method name or other identifier failed validation
    #[error(transparent)]
    InvalidIdentifier(#[from] InvalidIdentifier),

    /// The request could not be built or sent as described
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Connection, timeout or body-read failure
    #[error("network failure: {message}")]
    NetworkFailure { message: String },

    /// Rate limiting or a transient server fault
    #[error("server overloaded ({status} {error}): {message}")]
    ServerOverload {
        status: u16,
        error: String,
        message: String,
    },

    /// The server understood the call and refused it
    #[error("{error} ({status}): {message}")]
    ApplicationError {
        status: u16,
        error: String,
        message: String,
    },

    /// Credential missing, expired or invalid
    #[error("authentication rejected ({status} {error}): {message}")]
    AuthRejected {
        status: u16,
        error: String,
        message: String,
    },

    /// A success response whose body did not match the expected shape
    #[error("failed to decode response ({status}): {message}")]
    DecodeFailure { status: u16, message: String },

    /// The caller cancelled the call
    #[error("call cancelled")]
    Cancelled,
}

impl XrpcError {
    /// Classify a non-success response.
    ///
    /// ```
    /// use atproto_xrpc::XrpcError;
    ///
    /// let err = XrpcError::from_status(400, "ExpiredToken", "token has expired");
    /// assert!(matches!(err, XrpcError::AuthRejected { .. }));
    /// assert!(XrpcError::from_status(503, "Unknown", "").is_retryable());
    /// ```
    pub fn from_status(status: u16, error: impl Into<String>, message: impl Into<String>) -> Self {
        let error = error.into();
        let message = message.into();

        if status == 401 || (status == 400 && AUTH_ERROR_KINDS.contains(&error.as_str())) {
            XrpcError::AuthRejected {
                status,
                error,
                message,
            }
        } else if OVERLOAD_STATUSES.contains(&status) {
            XrpcError::ServerOverload {
                status,
                error,
                message,
            }
        } else {
            XrpcError::ApplicationError {
                status,
                error,
                message,
            }
        }
    }

    pub fn network(message: impl Into<String>) -> Self {
        XrpcError::NetworkFailure {
            message: message.into(),
        }
    }

    /// Transient failures: network trouble and server overload.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            XrpcError::NetworkFailure { .. } | XrpcError::ServerOverload { .. }
        )
    }

    /// HTTP status, when the failure came from a response.
    pub fn status(&self) -> Option<u16> {
        match self {
            XrpcError::ServerOverload { status, .. }
            | XrpcError::ApplicationError { status, .. }
            | XrpcError::AuthRejected { status, .. }
            | XrpcError::DecodeFailure { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// The error envelope's `error` field, e.g. `RecordNotFound`.
    pub fn error_kind(&self) -> Option<&str> {
        match self {
            XrpcError::ServerOverload { error, .. }
            | XrpcError::ApplicationError { error, .. }
            | XrpcError::AuthRejected { error, .. } => Some(error.as_str()),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for XrpcError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_builder() {
            XrpcError::InvalidRequest(e.to_string())
        } else {
            XrpcError::network(e.to_string())
        }
    }
}

/// Result type for XRPC operations
pub type Result<T> = std::result::Result<T, XrpcError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification_table() {
        for status in OVERLOAD_STATUSES {
            let err = XrpcError::from_status(status, "Whatever", "");
            assert!(matches!(err, XrpcError::ServerOverload { .. }), "{status}");
            assert!(err.is_retryable());
        }
        for status in [400, 403, 404, 409, 413, 501, 505, 599] {
            let err = XrpcError::from_status(status, "InvalidRequest", "");
            assert!(matches!(err, XrpcError::ApplicationError { .. }), "{status}");
            assert!(!err.is_retryable());
        }
    }

    #[test]
    fn test_auth_rejections() {
        assert!(matches!(
            XrpcError::from_status(401, "AuthMissing", ""),
            XrpcError::AuthRejected { status: 401, .. }
        ));
        for kind in AUTH_ERROR_KINDS {
            assert!(matches!(
                XrpcError::from_status(400, kind, ""),
                XrpcError::AuthRejected { status: 400, .. }
            ));
        }
        // Only a 400 carries auth meaning in the error kind.
        assert!(matches!(
            XrpcError::from_status(403, "ExpiredToken", ""),
            XrpcError::ApplicationError { .. }
        ));
    }

    #[test]
    fn test_accessors() {
        let err = XrpcError::from_status(404, "RecordNotFound", "no such record");
        assert_eq!(err.status(), Some(404));
        assert_eq!(err.error_kind(), Some("RecordNotFound"));
        assert_eq!(err.to_string(), "RecordNotFound (404): no such record");

        assert!(XrpcError::network("connection reset").is_retryable());
        assert!(!XrpcError::Cancelled.is_retryable());
        assert_eq!(XrpcError::Cancelled.status(), None);
    }
}
