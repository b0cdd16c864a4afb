//! # discovery
//!
//! Finds the leading Mesos master, or every registered master, by reading
//! the registrations masters publish as ephemeral sequential nodes in a
//! ZooKeeper ensemble.
//!
//! ```no_run
//! # use std::time::Duration;
//! # use discovery::{DiscoveryConfig, MasterDiscovery};
//! # async fn run() -> Result<(), discovery::DiscoveryError> {
//! let config = DiscoveryConfig::new("0.24.0", "zk://10.10.1.2:2181/mesos", Duration::from_secs(15))?;
//! let leader = MasterDiscovery::new(config).retrieve_leader().await?;
//! println!("{}:{}", leader.hostname, leader.port);
//! # Ok(())
//! # }
//! ```
#![warn(
    missing_debug_implementations,
    missing_copy_implementations,
    rust_2018_idioms,
    unreachable_pub,
    non_snake_case,
    non_upper_case_globals
)]
#![allow(clippy::cognitive_complexity)]
#![deny(rustdoc::broken_intra_doc_links)]
#![doc(test(
    no_crate_inject,
    attr(deny(warnings, rust_2018_idioms), allow(dead_code, unused_variables))
))]

pub mod codec;
pub mod error;
pub mod facade;
pub mod models;
pub mod resolver;

pub use codec::{Dialect, MemberRecordCodec, SchemaVersion};
pub use error::{DecodeError, DiscoveryError, DiscoveryResult};
pub use facade::{DEFAULT_MEMBERSHIP_PATH, DEFAULT_SCHEMA_VERSION, DiscoveryConfig, MasterDiscovery};
pub use models::{MemberRecord, MemberSet};
pub use resolver::{LeaderResolver, MembershipSource, RawMember};
