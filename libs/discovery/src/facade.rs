//! The two discovery entry points.
//!
//! Each call opens its own ensemble session, resolves the members, and
//! closes the session before returning, whatever the outcome. If the
//! caller drops the future part-way, the session's socket is dropped
//! with it. Any ensemble failure, during connect or after, is reported
//! as [`DiscoveryError::ConnectionTimeout`].

use std::time::Duration;

use tracing::{debug, info, instrument};
use zk_client::{ConnectOptions, Connection, EnsembleAddress, ZkError};

use crate::codec::{MemberRecordCodec, SchemaVersion};
use crate::error::{DiscoveryError, DiscoveryResult};
use crate::models::{MemberRecord, MemberSet};
use crate::resolver::LeaderResolver;

/// Where masters register when the ensemble URI names no path.
pub const DEFAULT_MEMBERSHIP_PATH: &str = "/mesos";

/// Schema version assumed when none is configured.
pub const DEFAULT_SCHEMA_VERSION: &str = "0.24.0";

/// Everything a discovery call needs. Built without touching the network.
#[derive(Debug, Clone)]
pub struct DiscoveryConfig {
    schema_version: SchemaVersion,
    ensemble: EnsembleAddress,
    membership_path: String,
    options: ConnectOptions,
}

impl DiscoveryConfig {
    /// Validate and assemble a configuration.
    ///
    /// `ensemble_uri` is a comma-separated `host:port` list, optionally
    /// prefixed by `zk://` and suffixed by the membership path.
    pub fn new(
        schema_version: &str,
        ensemble_uri: &str,
        connect_timeout: Duration,
    ) -> DiscoveryResult<Self> {
        let schema_version = SchemaVersion::parse(schema_version)?;
        let ensemble = EnsembleAddress::parse(ensemble_uri)
            .map_err(|e| DiscoveryError::InvalidConfig(e.to_string()))?;
        if connect_timeout.is_zero() {
            return Err(DiscoveryError::InvalidConfig(
                "connect timeout must be positive".into(),
            ));
        }
        let membership_path = ensemble.path_or(DEFAULT_MEMBERSHIP_PATH).to_owned();

        Ok(Self {
            schema_version,
            ensemble,
            membership_path,
            options: ConnectOptions {
                connect_timeout,
                ..ConnectOptions::default()
            },
        })
    }

    /// Bound each list/get request by `timeout` instead of the default.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.options.request_timeout = timeout;
        self
    }

    /// Ask the ensemble for a different session timeout.
    pub fn with_session_timeout(mut self, timeout: Duration) -> Self {
        self.options.session_timeout = timeout;
        self
    }

    pub fn schema_version(&self) -> &SchemaVersion {
        &self.schema_version
    }

    pub fn ensemble(&self) -> &EnsembleAddress {
        &self.ensemble
    }

    pub fn membership_path(&self) -> &str {
        &self.membership_path
    }

    pub fn connect_options(&self) -> &ConnectOptions {
        &self.options
    }
}

/// Locates the leading master, or every registered master.
#[derive(Debug, Clone)]
pub struct MasterDiscovery {
    config: DiscoveryConfig,
    resolver: LeaderResolver,
}

impl MasterDiscovery {
    pub fn new(config: DiscoveryConfig) -> Self {
        let resolver = LeaderResolver::new(
            config.membership_path.clone(),
            MemberRecordCodec::new(config.schema_version.clone()),
        );
        Self { config, resolver }
    }

    pub fn config(&self) -> &DiscoveryConfig {
        &self.config
    }

    /// The member with the lowest live registration sequence.
    #[instrument(skip(self), fields(ensemble = %self.config.ensemble))]
    pub async fn retrieve_leader(&self) -> DiscoveryResult<MemberRecord> {
        let mut conn = self.connect().await?;
        let resolved = self.resolver.resolve_leader(&mut conn).await;
        conn.close().await;

        let leader = resolved
            .map_err(|source| self.unavailable(source))?
            .ok_or_else(|| self.no_leader())?;
        info!(leader = %leader.hostname, id = %leader.id, "found leader");
        Ok(leader)
    }

    /// All live members, leader first. Never empty.
    #[instrument(skip(self), fields(ensemble = %self.config.ensemble))]
    pub async fn retrieve_all(&self) -> DiscoveryResult<MemberSet> {
        let mut conn = self.connect().await?;
        let resolved = self.resolver.resolve_all(&mut conn).await;
        conn.close().await;

        let members = resolved.map_err(|source| self.unavailable(source))?;
        let members = MemberSet::new(members).ok_or_else(|| self.no_leader())?;
        info!(
            count = members.len(),
            leader = %members.leader().hostname,
            "found masters"
        );
        Ok(members)
    }

    async fn connect(&self) -> DiscoveryResult<Connection> {
        let options = &self.config.options;
        debug!(path = %self.config.membership_path, "opening ensemble session");
        Connection::open(&self.config.ensemble, options)
            .await
            .map_err(|source| self.unavailable(source))
    }

    fn unavailable(&self, source: ZkError) -> DiscoveryError {
        DiscoveryError::ConnectionTimeout {
            ensemble: self.config.ensemble.to_string(),
            timeout: self.config.options.connect_timeout,
            source,
        }
    }

    fn no_leader(&self) -> DiscoveryError {
        DiscoveryError::NoLeaderFound {
            path: self.config.membership_path.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_defaults_membership_path() {
        let config =
            DiscoveryConfig::new("0.24.0", "zk://10.0.0.1:2181,10.0.0.2:2181", Duration::from_secs(15))
                .unwrap();
        assert_eq!(config.membership_path(), DEFAULT_MEMBERSHIP_PATH);
        assert_eq!(config.ensemble().hosts().len(), 2);
        assert_eq!(config.connect_options().connect_timeout, Duration::from_secs(15));
    }

    #[test]
    fn config_takes_path_from_uri() {
        let config = DiscoveryConfig::new("0.23.0", "zk://localhost:2181/prod/mesos", Duration::from_secs(1))
            .unwrap()
            .with_request_timeout(Duration::from_millis(250))
            .with_session_timeout(Duration::from_secs(30));
        assert_eq!(config.membership_path(), "/prod/mesos");
        assert_eq!(config.connect_options().request_timeout, Duration::from_millis(250));
        assert_eq!(config.connect_options().session_timeout, Duration::from_secs(30));
        assert_eq!(config.schema_version().as_str(), "0.23.0");
    }

    #[test]
    fn config_rejects_bad_input() {
        let cases = [
            ("nope", "localhost:2181", Duration::from_secs(1)),
            ("0.24.0", "http://localhost:2181", Duration::from_secs(1)),
            ("0.24.0", "", Duration::from_secs(1)),
            ("0.24.0", "localhost:2181", Duration::ZERO),
        ];
        for (version, uri, timeout) in cases {
            let err = DiscoveryConfig::new(version, uri, timeout).unwrap_err();
            assert!(
                matches!(err, DiscoveryError::InvalidConfig(_)),
                "{version:?} {uri:?} {timeout:?} gave {err:?}"
            );
        }
    }
}
