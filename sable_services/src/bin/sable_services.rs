use anyhow::Context;
use sable_services::config::ServicesConfig;
use std::path::PathBuf;
use structopt::StructOpt;
use tracing_subscriber::util::SubscriberInitExt;

#[derive(Debug, StructOpt)]
#[structopt(rename_all = "kebab")]
struct Opts {
    /// Services config file location
    #[structopt(short, long)]
    config: PathBuf,
}

/// Main entry point.
///
/// Loads the config and sets up logging before the tokio runtime exists, so
/// that config errors are reported straight away.
pub fn main() -> anyhow::Result<()> {
    let opts = Opts::from_args();

    let config = ServicesConfig::load_file(&opts.config)
        .with_context(|| format!("Couldn't load config from {}", opts.config.display()))?;

    sable_services::tracing_config::build_subscriber(config.log.clone())?.init();

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    runtime.block_on(sable_services::run(config))
}
