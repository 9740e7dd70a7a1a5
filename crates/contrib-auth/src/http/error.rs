/*
[INPUT]:  Error sources (HTTP, backend, wallet, persistence, serialization)
[OUTPUT]: Structured error types with retry and visibility hints
[POS]:    Error handling layer - unified error types for entire crate
[UPDATE]: When adding new error sources or changing the auth failure taxonomy
*/

use std::sync::Arc;

use reqwest::StatusCode;
use thiserror::Error;

/// Main error type for the contribution-rewards client.
///
/// Cloneable so that callers joining an in-flight handshake or refresh all
/// observe the same outcome.
#[derive(Error, Debug, Clone)]
pub enum ContribError {
    /// HTTP transport failed
    #[error("HTTP request failed: {0}")]
    Http(Arc<reqwest::Error>),

    /// Backend returned a non-success status
    #[error("API error (code {code}): {message}")]
    Api { code: u16, message: String },

    /// Backend answered 401 for the presented credential
    #[error("Unauthorized: {message}")]
    Unauthorized { message: String },

    /// Address is not a 0x-prefixed 20-byte hex account identifier
    #[error("Invalid wallet address: {0}")]
    InvalidAddress(String),

    /// Nonce could not be obtained for the wallet
    #[error("Authentication challenge unavailable: {0}")]
    ChallengeUnavailable(String),

    /// Wallet owner declined the signature prompt
    #[error("Signature request rejected by user")]
    UserRejectedSignature,

    /// Backend rejected the signed challenge
    #[error("Invalid signature: {0}")]
    InvalidSignature(String),

    /// Backend recovered a different address than the one being authenticated
    #[error("Wallet address mismatch: requested {requested}, backend confirmed {confirmed}")]
    AddressMismatch { requested: String, confirmed: String },

    /// Refresh token was rejected; session has been cleared
    #[error("Session expired, please re-authenticate")]
    SessionExpired,

    /// A newer attempt took over before this one completed
    #[error("Authentication attempt superseded by a newer one")]
    Superseded,

    /// No session is available for an authenticated call
    #[error("No active session")]
    NoSession,

    /// Request still unauthorized after a successful refresh
    #[error("Authentication failed: {message}")]
    AuthenticationFailed { message: String },

    /// Wallet signer failed for reasons other than user rejection
    #[error("Wallet error: {0}")]
    Wallet(String),

    /// Serialization/deserialization failed
    #[error("Serialization error: {0}")]
    Serialization(Arc<serde_json::Error>),

    /// URL parsing failed
    #[error("Invalid URL: {0}")]
    UrlParse(#[from] url::ParseError),

    /// Session persistence failed
    #[error("Session storage error: {0}")]
    Storage(Arc<std::io::Error>),

    /// Caller supplied an argument the operation cannot accept
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Invalid response from server
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<reqwest::Error> for ContribError {
    fn from(err: reqwest::Error) -> Self {
        ContribError::Http(Arc::new(err))
    }
}

impl From<serde_json::Error> for ContribError {
    fn from(err: serde_json::Error) -> Self {
        ContribError::Serialization(Arc::new(err))
    }
}

impl From<std::io::Error> for ContribError {
    fn from(err: std::io::Error) -> Self {
        ContribError::Storage(Arc::new(err))
    }
}

impl ContribError {
    /// Check if the whole operation may be retried as-is
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ContribError::Http(_)
                | ContribError::ChallengeUnavailable(_)
                | ContribError::UserRejectedSignature
                | ContribError::InvalidSignature(_)
                | ContribError::AddressMismatch { .. }
                | ContribError::InvalidResponse(_)
        )
    }

    /// Check if error indicates authentication failure
    pub fn is_auth_error(&self) -> bool {
        matches!(
            self,
            ContribError::Unauthorized { .. }
                | ContribError::InvalidSignature(_)
                | ContribError::AddressMismatch { .. }
                | ContribError::SessionExpired
                | ContribError::NoSession
                | ContribError::AuthenticationFailed { .. }
        )
    }

    /// Outcomes that are not faults and should not be reported as errors
    pub fn is_silent(&self) -> bool {
        matches!(
            self,
            ContribError::Superseded | ContribError::UserRejectedSignature
        )
    }

    /// Create an error from a non-success status and response body message
    pub fn from_status(status: StatusCode, message: impl Into<String>) -> Self {
        let message = message.into();
        if status == StatusCode::UNAUTHORIZED {
            ContribError::Unauthorized { message }
        } else {
            ContribError::Api {
                code: status.as_u16(),
                message,
            }
        }
    }
}

/// Result type alias for client operations
pub type Result<T> = std::result::Result<T, ContribError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_retryable() {
        assert!(ContribError::UserRejectedSignature.is_retryable());
        assert!(ContribError::ChallengeUnavailable("down".into()).is_retryable());
        assert!(!ContribError::SessionExpired.is_retryable());
        assert!(!ContribError::Superseded.is_retryable());
    }

    #[test]
    fn test_error_is_auth_error() {
        assert!(ContribError::SessionExpired.is_auth_error());
        assert!(ContribError::InvalidSignature("bad".into()).is_auth_error());
        assert!(!ContribError::UserRejectedSignature.is_auth_error());
    }

    #[test]
    fn test_silent_errors() {
        assert!(ContribError::Superseded.is_silent());
        assert!(ContribError::UserRejectedSignature.is_silent());
        assert!(!ContribError::SessionExpired.is_silent());
    }

    #[test]
    fn test_from_status() {
        match ContribError::from_status(StatusCode::UNAUTHORIZED, "expired") {
            ContribError::Unauthorized { message } => assert_eq!(message, "expired"),
            other => panic!("unexpected error: {other:?}"),
        }
        match ContribError::from_status(StatusCode::BAD_REQUEST, "bad address") {
            ContribError::Api { code, message } => {
                assert_eq!(code, 400);
                assert_eq!(message, "bad address");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
