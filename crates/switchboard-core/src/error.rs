//! Error types for the signaling relay

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::{ConnectionId, SessionId};

/// Request-scoped relay errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SignalError {
    #[error("unknown session: {0}")]
    UnknownSession(SessionId),

    #[error("{0}: This connection id is already used.")]
    ConnectionAlreadyPaired(ConnectionId),

    #[error("{0}: The other session has not joined this connection id yet.")]
    PeerNotReady(ConnectionId),

    #[error("malformed request: {0}")]
    MalformedRequest(String),
}

impl SignalError {
    pub fn malformed(reason: impl Into<String>) -> Self {
        SignalError::MalformedRequest(reason.into())
    }

    pub fn code(&self) -> ErrorCode {
        ErrorCode::from(self)
    }
}

/// Wire error codes (sent in error bodies)
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    UnknownSession,
    ConnectionInUse,
    PeerNotReady,
    MalformedRequest,
}

impl From<&SignalError> for ErrorCode {
    fn from(e: &SignalError) -> Self {
        match e {
            SignalError::UnknownSession(_) => ErrorCode::UnknownSession,
            SignalError::ConnectionAlreadyPaired(_) => ErrorCode::ConnectionInUse,
            SignalError::PeerNotReady(_) => ErrorCode::PeerNotReady,
            SignalError::MalformedRequest(_) => ErrorCode::MalformedRequest,
        }
    }
}

impl ErrorCode {
    /// HTTP status class for this error: not-found for unknown sessions,
    /// client error for everything else
    pub fn http_status(self) -> u16 {
        match self {
            ErrorCode::UnknownSession => 404,
            ErrorCode::ConnectionInUse
            | ErrorCode::PeerNotReady
            | ErrorCode::MalformedRequest => 400,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::UnknownSession => "unknown_session",
            ErrorCode::ConnectionInUse => "connection_in_use",
            ErrorCode::PeerNotReady => "peer_not_ready",
            ErrorCode::MalformedRequest => "malformed_request",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        let err = SignalError::UnknownSession("abc".into());
        assert_eq!(err.code(), ErrorCode::UnknownSession);
        assert_eq!(err.code().http_status(), 404);

        let err = SignalError::ConnectionAlreadyPaired("12345".into());
        assert_eq!(err.code().http_status(), 400);
        assert_eq!(err.to_string(), "12345: This connection id is already used.");

        assert_eq!(SignalError::malformed("missing sdp").code().as_str(), "malformed_request");
    }

    #[test]
    fn test_code_serialization() {
        let json = serde_json::to_string(&ErrorCode::PeerNotReady).unwrap();
        assert_eq!(json, "\"peer_not_ready\"");
    }
}
