//! Error types for master discovery.
//!
//! Only [`DiscoveryError`] crosses the public entry points. A
//! [`DecodeError`] describes one unusable member and is handled inside the
//! resolver, which skips that member and keeps going.

use std::time::Duration;

use thiserror::Error;
use zk_client::ZkError;

/// Failure of discovery.
///
/// A `retrieve_leader`/`retrieve_all` call fails only with
/// `ConnectionTimeout` or `NoLeaderFound`. `InvalidConfig` comes from
/// [`DiscoveryConfig::new`](crate::DiscoveryConfig::new), before any call.
#[derive(Debug, Error)]
pub enum DiscoveryError {
    /// The ensemble could not be used: no server completed the session
    /// handshake within the budget, or the session failed while the
    /// membership path was being read. `source` says which.
    #[error("ensemble {ensemble} unavailable (connect timeout {timeout:?}): {source}")]
    ConnectionTimeout {
        ensemble: String,
        timeout: Duration,
        #[source]
        source: ZkError,
    },

    /// Listing and decoding left zero usable members.
    #[error("no leader found under '{path}'")]
    NoLeaderFound { path: String },

    /// Rejected at construction time; no I/O was attempted.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl DiscoveryError {
    /// Returns true when the ensemble could not be reached in time.
    pub fn is_connection_timeout(&self) -> bool {
        matches!(self, DiscoveryError::ConnectionTimeout { .. })
    }

    /// Returns true when the membership path held no usable member.
    pub fn is_no_leader(&self) -> bool {
        matches!(self, DiscoveryError::NoLeaderFound { .. })
    }
}

/// Shorthand result alias for discovery operations.
pub type DiscoveryResult<T> = Result<T, DiscoveryError>;

/// A member payload that could not be decoded with the configured schema version.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("cannot decode {len}-byte payload with schema version {version}: {reason}")]
pub struct DecodeError {
    /// Length of the raw payload.
    pub len: usize,
    /// Schema version the decode was attempted with.
    pub version: String,
    /// What was wrong with it.
    pub reason: String,
}
