//! Error types for ZooKeeper ensemble operations.
//!
//! Callers can tell apart an unreachable ensemble, a request that outlived
//! its budget, a server-side error code, and a malformed frame without
//! depending on the wire details.

use std::fmt;

use thiserror::Error;

/// Server-side error codes returned in a reply header.
///
/// Only the codes a read-only client can observe are named; everything
/// else is carried through as `Other`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    SystemError,
    RuntimeInconsistency,
    ConnectionLoss,
    MarshallingError,
    Unimplemented,
    OperationTimeout,
    BadArguments,
    NoNode,
    NoAuth,
    SessionExpired,
    InvalidAcl,
    AuthFailed,
    SessionMoved,
    NotReadOnly,
    Other(i32),
}

impl ErrorCode {
    /// Map a raw reply-header error code. `0` is success and never reaches here.
    pub fn from_raw(code: i32) -> Self {
        match code {
            -1 => ErrorCode::SystemError,
            -2 => ErrorCode::RuntimeInconsistency,
            -4 => ErrorCode::ConnectionLoss,
            -5 => ErrorCode::MarshallingError,
            -6 => ErrorCode::Unimplemented,
            -7 => ErrorCode::OperationTimeout,
            -8 => ErrorCode::BadArguments,
            -101 => ErrorCode::NoNode,
            -102 => ErrorCode::NoAuth,
            -112 => ErrorCode::SessionExpired,
            -114 => ErrorCode::InvalidAcl,
            -115 => ErrorCode::AuthFailed,
            -118 => ErrorCode::SessionMoved,
            -119 => ErrorCode::NotReadOnly,
            other => ErrorCode::Other(other),
        }
    }

    /// Raw wire value.
    pub fn as_raw(&self) -> i32 {
        match self {
            ErrorCode::SystemError => -1,
            ErrorCode::RuntimeInconsistency => -2,
            ErrorCode::ConnectionLoss => -4,
            ErrorCode::MarshallingError => -5,
            ErrorCode::Unimplemented => -6,
            ErrorCode::OperationTimeout => -7,
            ErrorCode::BadArguments => -8,
            ErrorCode::NoNode => -101,
            ErrorCode::NoAuth => -102,
            ErrorCode::SessionExpired => -112,
            ErrorCode::InvalidAcl => -114,
            ErrorCode::AuthFailed => -115,
            ErrorCode::SessionMoved => -118,
            ErrorCode::NotReadOnly => -119,
            ErrorCode::Other(code) => *code,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorCode::Other(code) => write!(f, "error code {code}"),
            named => write!(f, "{named:?} ({})", named.as_raw()),
        }
    }
}

/// Top-level error type for the zk-client crate.
#[derive(Debug, Error)]
pub enum ZkError {
    /// The ensemble address could not be parsed.
    #[error("invalid ensemble address: {0}")]
    InvalidAddress(String),

    /// Socket-level failure talking to a server.
    #[error("transport error: {0}")]
    Transport(#[from] std::io::Error),

    /// Connect or request budget exhausted.
    #[error("timeout: {0}")]
    Timeout(String),

    /// The server refused to establish a session.
    #[error("session rejected by {0}")]
    SessionRejected(String),

    /// The server answered a request with a non-zero error code.
    #[error("server returned {code} for '{path}'")]
    Server { code: ErrorCode, path: String },

    /// A frame could not be decoded, or arrived out of order.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// The connection was closed, by us or by the server.
    #[error("not connected: {0}")]
    NotConnected(String),
}

impl ZkError {
    /// Returns true if trying another server (or trying again) may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ZkError::Transport(_)
                | ZkError::Timeout(_)
                | ZkError::SessionRejected(_)
                | ZkError::NotConnected(_)
        )
    }

    /// Returns true if this error is a timeout.
    pub fn is_timeout(&self) -> bool {
        matches!(self, ZkError::Timeout(_))
    }

    /// Returns true if the server reported that the node does not exist.
    pub fn is_no_node(&self) -> bool {
        matches!(
            self,
            ZkError::Server {
                code: ErrorCode::NoNode,
                ..
            }
        )
    }
}

/// Shorthand result alias for ensemble operations.
pub type ZkResult<T> = Result<T, ZkError>;
