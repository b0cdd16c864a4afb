//! Ensemble address parsing.
//!
//! Accepts the connection strings ZooKeeper users already pass around:
//! `h1:2181,h2:2181`, optionally prefixed by `zk://` and optionally
//! followed by a path (`zk://h1:2181,h2:2181/mesos`).

use std::fmt;
use std::str::FromStr;

use crate::error::{ZkError, ZkResult};

/// Port used when a host is listed without one.
pub const DEFAULT_PORT: u16 = 2181;

const SCHEME: &str = "zk";

/// One server of the ensemble.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct HostPort {
    host: String,
    port: u16,
}

impl HostPort {
    /// Create a new host/port pair.
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// Host name or IP literal, without brackets.
    pub fn host(&self) -> &str {
        &self.host
    }

    /// TCP port.
    pub fn port(&self) -> u16 {
        self.port
    }

    fn parse(raw: &str) -> ZkResult<Self> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(ZkError::InvalidAddress("empty host entry".into()));
        }

        let (host, port) = if let Some(bracketed) = raw.strip_prefix('[') {
            let (host, rest) = bracketed.split_once(']').ok_or_else(|| {
                ZkError::InvalidAddress(format!("unterminated IPv6 literal in '{raw}'"))
            })?;
            let port = match rest {
                "" => None,
                other => Some(other.strip_prefix(':').ok_or_else(|| {
                    ZkError::InvalidAddress(format!("unexpected '{other}' after IPv6 literal"))
                })?),
            };
            (host, port)
        } else {
            match raw.rsplit_once(':') {
                Some((host, _)) if host.contains(':') => {
                    return Err(ZkError::InvalidAddress(format!(
                        "IPv6 literal must be bracketed: '{raw}'"
                    )));
                }
                Some((host, port)) => (host, Some(port)),
                None => (raw, None),
            }
        };

        if host.is_empty() {
            return Err(ZkError::InvalidAddress(format!("missing host in '{raw}'")));
        }

        let port = match port {
            None => DEFAULT_PORT,
            Some(port) => match port.parse::<u16>() {
                Ok(0) | Err(_) => {
                    return Err(ZkError::InvalidAddress(format!(
                        "invalid port '{port}' in '{raw}'"
                    )));
                }
                Ok(port) => port,
            },
        };

        Ok(Self::new(host, port))
    }
}

impl fmt::Display for HostPort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.host.contains(':') {
            write!(f, "[{}]:{}", self.host, self.port)
        } else {
            write!(f, "{}:{}", self.host, self.port)
        }
    }
}

/// Immutable list of ensemble servers plus an optional path suffix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnsembleAddress {
    hosts: Vec<HostPort>,
    path: Option<String>,
}

impl EnsembleAddress {
    /// Parse an ensemble URI. No I/O is performed.
    pub fn parse(uri: &str) -> ZkResult<Self> {
        let uri = uri.trim();
        let rest = match uri.split_once("://") {
            Some((scheme, rest)) if scheme.eq_ignore_ascii_case(SCHEME) => rest,
            Some((scheme, _)) => {
                return Err(ZkError::InvalidAddress(format!(
                    "unsupported scheme '{scheme}', expected '{SCHEME}'"
                )));
            }
            None => uri,
        };

        if rest.contains('@') {
            return Err(ZkError::InvalidAddress(
                "credentials in the ensemble address are not supported".into(),
            ));
        }

        let (hosts, path) = match rest.find('/') {
            Some(idx) => (&rest[..idx], Some(&rest[idx..])),
            None => (rest, None),
        };

        if hosts.trim().is_empty() {
            return Err(ZkError::InvalidAddress(format!("no hosts in '{uri}'")));
        }
        let hosts = hosts
            .split(',')
            .map(HostPort::parse)
            .collect::<ZkResult<Vec<_>>>()?;

        let path = match path.map(|p| p.trim_end_matches('/')) {
            None | Some("") => None,
            Some(path) => {
                if path.split('/').skip(1).any(str::is_empty) {
                    return Err(ZkError::InvalidAddress(format!(
                        "empty segment in path '{path}'"
                    )));
                }
                Some(path.to_owned())
            }
        };

        Ok(Self { hosts, path })
    }

    /// Servers in the order they were listed.
    pub fn hosts(&self) -> &[HostPort] {
        &self.hosts
    }

    /// Path given after the host list, if any (always starts with `/`).
    pub fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }

    /// The path given in the URI, or `default` when there was none.
    pub fn path_or<'a>(&'a self, default: &'a str) -> &'a str {
        self.path().unwrap_or(default)
    }
}

impl FromStr for EnsembleAddress {
    type Err = ZkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for EnsembleAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{SCHEME}://")?;
        for (i, host) in self.hosts.iter().enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            write!(f, "{host}")?;
        }
        if let Some(path) = &self.path {
            write!(f, "{path}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_host_list() {
        let addr = EnsembleAddress::parse("10.10.1.2:2181,10.10.1.3:2182").unwrap();
        assert_eq!(
            addr.hosts(),
            &[
                HostPort::new("10.10.1.2", 2181),
                HostPort::new("10.10.1.3", 2182)
            ]
        );
        assert_eq!(addr.path(), None);
        assert_eq!(addr.path_or("/mesos"), "/mesos");
    }

    #[test]
    fn parses_scheme_and_path() {
        let addr = EnsembleAddress::parse("zk://zk1:2181,zk2/mesos/").unwrap();
        assert_eq!(addr.hosts()[1], HostPort::new("zk2", DEFAULT_PORT));
        assert_eq!(addr.path(), Some("/mesos"));
        assert_eq!(addr.to_string(), "zk://zk1:2181,zk2:2181/mesos");
    }

    #[test]
    fn parses_bracketed_ipv6() {
        let addr: EnsembleAddress = "zk://[::1]:2181,[fe80::2]".parse().unwrap();
        assert_eq!(addr.hosts()[0], HostPort::new("::1", 2181));
        assert_eq!(addr.hosts()[1].port(), DEFAULT_PORT);
        assert_eq!(addr.hosts()[0].to_string(), "[::1]:2181");
    }

    #[test]
    fn root_path_is_no_path() {
        let addr = EnsembleAddress::parse("zk://localhost:2181/").unwrap();
        assert_eq!(addr.path(), None);
    }

    #[test]
    fn rejects_malformed_addresses() {
        for bad in [
            "",
            "zk://",
            "zk:///mesos",
            "http://localhost:2181",
            "zk://user:pass@localhost:2181/mesos",
            "localhost:0",
            "localhost:99999",
            "localhost:abc",
            "h1:2181,,h2:2181",
            "::1:2181",
            "[::1",
            "[::1]x",
            "zk://h1:2181/mesos//x",
        ] {
            let err = EnsembleAddress::parse(bad).unwrap_err();
            assert!(
                matches!(err, ZkError::InvalidAddress(_)),
                "expected InvalidAddress for {bad:?}, got {err:?}"
            );
        }
    }
}
