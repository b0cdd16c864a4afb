//! # mesos-discover
//!
//! Prints the leading Mesos master, or every registered master with `-a`,
//! as indented JSON on stdout.
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

use std::io::Write;

use anyhow::{Context, Result};
use discovery::MasterDiscovery;
use tracing::{debug, info};

pub mod config;
pub mod output;

use config::cli;

/// Run one discovery and write the result to `out`.
///
/// Nothing is written to `out` unless discovery succeeds.
pub async fn run<W: Write>(config: &cli::Config, mut out: W) -> Result<()> {
    let discovery = MasterDiscovery::new(config.discovery_config()?);
    info!(zk = %config.zk, "connecting to ZooKeeper");

    let rendered = if config.all {
        let members = discovery
            .retrieve_all()
            .await
            .context("could not find any Mesos master")?;
        info!(
            "found {} masters; current leader: {}",
            members.len(),
            members.leader().hostname
        );
        output::to_vec(&members)?
    } else {
        let leader = discovery
            .retrieve_leader()
            .await
            .context("could not find any Mesos master")?;
        info!("found leader: {}", leader.hostname);
        output::to_vec(&leader)?
    };

    debug!(bytes = rendered.len(), "writing result");
    out.write_all(&rendered)?;
    out.write_all(b"\n")?;
    out.flush()?;
    Ok(())
}
