//! # zk-client
//!
//! Minimal, read-only client for a ZooKeeper ensemble.
//!
//! This library provides:
//! - **Ensemble address** parsing for `zk://host:port,host:port/path` strings.
//! - **Connection** with a bounded connect-and-handshake budget that fails
//!   over between ensemble servers.
//! - **Read operations**: list children and fetch node data, each bounded
//!   by a request timeout.
//!
//! Watches, writes, ACLs and authentication are not implemented.
#![warn(
    missing_debug_implementations,
    rust_2018_idioms,
    unreachable_pub,
    non_snake_case,
    non_upper_case_globals
)]
#![allow(clippy::cognitive_complexity)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod address;
pub mod connection;
pub mod error;
pub mod proto;

pub use address::{DEFAULT_PORT, EnsembleAddress, HostPort};
pub use connection::{ConnectOptions, Connection};
pub use error::{ErrorCode, ZkError, ZkResult};
