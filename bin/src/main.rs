#![allow(clippy::cognitive_complexity)]
use anyhow::Result;
use mesos_discover::config::{
    cli::{self, Parser},
    trace,
};
use tokio::runtime::Builder;
use tracing::*;

fn main() -> Result<()> {
    // .env first so its values can feed the env fallbacks below
    let dotenv = dotenv::dotenv();
    // parses from cli or environment var
    let config = cli::Config::parse();
    let trace_config = trace::Config::parse(config.log_level(), &config.log_format)?;
    debug!(?config, ?trace_config);
    if let Err(err) = dotenv {
        debug!(?err, ".env file not loaded");
    }

    let rt = Builder::new_current_thread().enable_all().build()?;
    let result = rt.block_on(mesos_discover::run(&config, std::io::stdout().lock()));

    if let Err(err) = result {
        error!("{err:#}");
        std::process::exit(1);
    }
    Ok(())
}
