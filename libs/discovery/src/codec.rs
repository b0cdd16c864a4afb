//! Decoding of master registration payloads.
//!
//! Masters publish a `MasterInfo` record in each registration node. Its
//! encoding changed over time, so the schema version the caller expects
//! picks one of a closed set of [`Dialect`]s: releases from 0.24 on write
//! JSON into `json.info_<seq>` nodes, older ones write protobuf into
//! `info_<seq>` nodes. Adding a dialect means adding a variant and
//! extending [`Dialect::for_version`]; call sites go through
//! [`MemberRecordCodec`] and do not change.

use std::fmt;
use std::net::Ipv4Addr;

use prost::Message;
use serde::Deserialize;

use crate::error::{DecodeError, DiscoveryError, DiscoveryResult};
use crate::models::MemberRecord;

/// First release that publishes JSON registrations.
pub const JSON_BREAKPOINT: (u64, u64, u64) = (0, 24, 0);

/// Port masters listen on when a legacy record leaves it out.
const DEFAULT_MASTER_PORT: u32 = 5050;

/// Dotted numeric release version, e.g. `0.24.0` or `1.4`.
///
/// Missing minor/patch components count as zero and a trailing qualifier
/// such as `-rc1` is ignored for ordering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaVersion {
    raw: String,
    parts: (u64, u64, u64),
}

impl SchemaVersion {
    pub fn parse(raw: &str) -> DiscoveryResult<Self> {
        let raw = raw.trim();
        let invalid = |why: &str| {
            DiscoveryError::InvalidConfig(format!("invalid schema version '{raw}': {why}"))
        };

        let numeric_end = raw
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .unwrap_or(raw.len());
        let numeric = &raw[..numeric_end];
        if numeric.is_empty() {
            return Err(invalid("expected a dotted numeric version"));
        }

        let mut parts = [0u64; 3];
        let mut count = 0;
        for piece in numeric.split('.') {
            if count == parts.len() {
                return Err(invalid("more than three components"));
            }
            parts[count] = piece
                .parse()
                .map_err(|_| invalid("empty or oversized component"))?;
            count += 1;
        }

        Ok(Self {
            raw: raw.to_owned(),
            parts: (parts[0], parts[1], parts[2]),
        })
    }

    /// The version as configured, trimmed.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// `(major, minor, patch)`.
    pub fn parts(&self) -> (u64, u64, u64) {
        self.parts
    }

    pub fn dialect(&self) -> Dialect {
        Dialect::for_version(self)
    }
}

impl fmt::Display for SchemaVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// Encodings a registration payload may use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dialect {
    /// `MasterInfo` protobuf in `info_<seq>` nodes.
    Protobuf,
    /// `MasterInfo` JSON in `json.info_<seq>` nodes.
    Json,
}

impl Dialect {
    pub fn for_version(version: &SchemaVersion) -> Self {
        if version.parts() >= JSON_BREAKPOINT {
            Dialect::Json
        } else {
            Dialect::Protobuf
        }
    }

    /// Name prefix of the registration nodes written in this dialect.
    pub fn node_prefix(&self) -> &'static str {
        match self {
            Dialect::Protobuf => "info_",
            Dialect::Json => "json.info_",
        }
    }

    /// Sequence number of a registration node, or `None` for any other child.
    pub fn sequence_of(&self, node_name: &str) -> Option<u64> {
        let digits = node_name.strip_prefix(self.node_prefix())?;
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        digits.parse().ok()
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dialect::Protobuf => write!(f, "protobuf"),
            Dialect::Json => write!(f, "json"),
        }
    }
}

/// Decodes payloads for one schema version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberRecordCodec {
    version: SchemaVersion,
    dialect: Dialect,
}

impl MemberRecordCodec {
    pub fn new(version: SchemaVersion) -> Self {
        let dialect = version.dialect();
        Self { version, dialect }
    }

    pub fn version(&self) -> &SchemaVersion {
        &self.version
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    /// Decode the payload of the registration node numbered `sequence`.
    ///
    /// Pure: the same bytes, version and sequence always give the same record.
    pub fn decode(&self, raw: &[u8], sequence: u64) -> Result<MemberRecord, DecodeError> {
        let endpoint = match self.dialect {
            Dialect::Json => decode_json(raw),
            Dialect::Protobuf => decode_protobuf(raw),
        }
        .map_err(|reason| DecodeError {
            len: raw.len(),
            version: self.version.as_str().to_owned(),
            reason,
        })?;

        Ok(MemberRecord {
            hostname: endpoint.hostname,
            ip: endpoint.ip,
            port: endpoint.port,
            pid: endpoint.pid,
            id: sequence.to_string(),
            version: self.version.as_str().to_owned(),
        })
    }
}

/// Connection details common to every dialect.
struct Endpoint {
    hostname: String,
    ip: String,
    port: u16,
    pid: String,
}

#[derive(Deserialize)]
struct JsonMasterInfo {
    hostname: Option<String>,
    ip: Option<u32>,
    port: Option<u32>,
    pid: Option<String>,
    address: Option<JsonAddress>,
}

#[derive(Deserialize)]
struct JsonAddress {
    hostname: Option<String>,
    ip: Option<String>,
    port: Option<u32>,
}

fn decode_json(raw: &[u8]) -> Result<Endpoint, String> {
    let info: JsonMasterInfo =
        serde_json::from_slice(raw).map_err(|e| format!("invalid JSON: {e}"))?;
    let (addr_hostname, addr_ip, addr_port) = match info.address {
        Some(addr) => (addr.hostname, addr.ip, addr.port),
        None => (None, None, None),
    };

    let ip = non_empty(addr_ip)
        .or_else(|| info.ip.map(packed_ip))
        .unwrap_or_default();
    let hostname = non_empty(info.hostname)
        .or_else(|| non_empty(addr_hostname))
        .or_else(|| non_empty(Some(ip.clone())))
        .ok_or("neither hostname nor ip present")?;
    let port = info
        .port
        .or(addr_port)
        .ok_or_else(|| "missing port".to_owned())
        .and_then(valid_port)?;

    Ok(Endpoint {
        hostname,
        ip,
        port,
        pid: info.pid.unwrap_or_default(),
    })
}

#[derive(Clone, PartialEq, Message)]
struct ProtoMasterInfo {
    #[prost(string, optional, tag = "1")]
    id: Option<String>,
    #[prost(uint32, optional, tag = "2")]
    ip: Option<u32>,
    #[prost(uint32, optional, tag = "3")]
    port: Option<u32>,
    #[prost(string, optional, tag = "4")]
    pid: Option<String>,
    #[prost(string, optional, tag = "5")]
    hostname: Option<String>,
    #[prost(string, optional, tag = "6")]
    version: Option<String>,
    #[prost(message, optional, tag = "7")]
    address: Option<ProtoAddress>,
}

#[derive(Clone, PartialEq, Message)]
struct ProtoAddress {
    #[prost(string, optional, tag = "1")]
    hostname: Option<String>,
    #[prost(string, optional, tag = "2")]
    ip: Option<String>,
    #[prost(int32, optional, tag = "3")]
    port: Option<i32>,
}

fn decode_protobuf(raw: &[u8]) -> Result<Endpoint, String> {
    let info = ProtoMasterInfo::decode(raw).map_err(|e| format!("invalid protobuf: {e}"))?;
    let packed = info.ip.ok_or("missing ip")?;
    let ip = packed_ip(packed);
    let hostname = non_empty(info.hostname)
        .or_else(|| info.address.as_ref().and_then(|a| non_empty(a.hostname.clone())))
        .unwrap_or_else(|| ip.clone());
    let port = info.port.unwrap_or(DEFAULT_MASTER_PORT);

    Ok(Endpoint {
        hostname,
        ip,
        port: valid_port(port)?,
        pid: info.pid.unwrap_or_default(),
    })
}

/// Masters publish the raw `in_addr` as a host-order integer, which puts
/// the first octet in the low byte.
fn packed_ip(packed: u32) -> String {
    Ipv4Addr::from(packed.to_le_bytes()).to_string()
}

fn valid_port(port: u32) -> Result<u16, String> {
    match u16::try_from(port) {
        Ok(0) | Err(_) => Err(format!("port {port} out of range")),
        Ok(port) => Ok(port),
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}
