//! mesos-discover configs

pub mod cli {
    //! Parse from either cli or env var

    /// Default Mesos schema version; registrations are JSON from here on
    pub static DEFAULT_MESOS_VERSION: &str = discovery::DEFAULT_SCHEMA_VERSION;
    /// Default time budget to reach the ensemble, in seconds
    pub const DEFAULT_TIMEOUT: u64 = 15;
    /// Default bound on each list/get request, in milliseconds
    pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 2_000;
    /// default log level. Can use this argument or DISCOVER_LOG env var
    pub const DEFAULT_DISCOVER_LOG: &str = "info";
    /// log as "json", "pretty" or "standard" (unstructured)
    pub const DEFAULT_LOG_FORMAT: &str = "standard";

    use std::time::Duration;

    use anyhow::{Context, Result};
    pub use clap::Parser;
    use discovery::DiscoveryConfig;

    #[derive(Parser, Debug, Clone, PartialEq, Eq)]
    #[clap(author, name = "mesos-discover", bin_name = "mesos-discover", about, long_about = None)]
    /// Discover the leading Mesos master by pointing at the same ZooKeeper
    /// ensemble `mesos-master` was started with. Loads `.env` from the
    /// working directory as well
    pub struct Config {
        /// ZooKeeper ensemble URI(s), eg. zk://10.10.1.2:2181,10.10.1.3:2181/mesos
        #[clap(long, env = "MESOS_ZK", value_parser)]
        pub zk: String,
        /// retrieve all Mesos masters, not just the leader
        #[clap(short = 'a', long = "all")]
        pub all: bool,
        /// the Apache Mesos version of the masters
        #[clap(long, env, value_parser, default_value = DEFAULT_MESOS_VERSION)]
        pub mesos_version: String,
        /// seconds to keep trying to reach a live ensemble member
        #[clap(long, env = "MESOS_DISCOVER_TIMEOUT", value_parser, default_value_t = DEFAULT_TIMEOUT)]
        pub timeout: u64,
        /// milliseconds to wait for each list/get reply
        #[clap(long, env, value_parser, default_value_t = DEFAULT_REQUEST_TIMEOUT_MS)]
        pub request_timeout_ms: u64,
        /// verbose (debug) logging, overrides --discover-log
        #[clap(short, long)]
        pub verbose: bool,
        /// set the log level. All valid RUST_LOG arguments are accepted
        #[clap(long, env, value_parser, default_value = DEFAULT_DISCOVER_LOG)]
        pub discover_log: String,
        /// log format: standard, json or pretty
        #[clap(long, env, value_parser, default_value = DEFAULT_LOG_FORMAT)]
        pub log_format: String,
    }

    impl Config {
        /// Connect budget as `Duration`
        pub fn timeout(&self) -> Duration {
            Duration::from_secs(self.timeout)
        }

        /// Per-request bound as `Duration`
        pub fn request_timeout(&self) -> Duration {
            Duration::from_millis(self.request_timeout_ms)
        }

        /// Filter directive handed to the subscriber
        pub fn log_level(&self) -> &str {
            if self.verbose { "debug" } else { &self.discover_log }
        }

        /// Validated discovery settings. Does not touch the network.
        pub fn discovery_config(&self) -> Result<DiscoveryConfig> {
            if self.request_timeout_ms == 0 {
                anyhow::bail!("request timeout must be positive");
            }
            let config = DiscoveryConfig::new(&self.mesos_version, &self.zk, self.timeout())
                .with_context(|| format!("invalid discovery settings for {}", self.zk))?
                .with_request_timeout(self.request_timeout());
            Ok(config)
        }
    }
}

pub mod trace {
    //! tracing configuration
    use anyhow::Result;
    use tracing_subscriber::{
        filter::EnvFilter,
        fmt::{
            self,
            format::{Format, PrettyFields},
        },
        prelude::__tracing_subscriber_SubscriberExt,
        util::SubscriberInitExt,
    };

    /// Installed subscriber settings
    #[derive(Debug)]
    pub struct Config {
        /// formatting applied to logs
        pub log_frmt: String,
    }

    impl Config {
        /// Install the global subscriber. Everything is written to stderr,
        /// stdout is reserved for results.
        pub fn parse(level: &str, log_frmt: &str) -> Result<Self> {
            let filter = EnvFilter::try_new(level).or_else(|_| EnvFilter::try_new("info"))?;

            match log_frmt {
                "json" => {
                    tracing_subscriber::registry()
                        .with(filter)
                        .with(fmt::layer().json().with_writer(std::io::stderr))
                        .init();
                }
                "pretty" => {
                    tracing_subscriber::registry()
                        .with(filter)
                        .with(
                            fmt::layer()
                                .event_format(
                                    Format::default().pretty().with_source_location(false),
                                )
                                .fmt_fields(PrettyFields::new())
                                .with_writer(std::io::stderr),
                        )
                        .init();
                }
                _ => {
                    tracing_subscriber::registry()
                        .with(filter)
                        .with(fmt::layer().with_writer(std::io::stderr))
                        .init();
                }
            }

            Ok(Self {
                log_frmt: log_frmt.to_owned(),
            })
        }
    }
}
