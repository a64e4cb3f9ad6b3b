use clap::Parser;
use env_logger::Env;
use log::{debug, error};

pub mod cli;

use cli::Cli;
use dma_bench::run_device;

fn main() {
    let cli = Cli::parse();
    let filter = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(Env::default().default_filter_or(filter)).init();

    let config = cli.to_config();
    debug!("{:?}", config);

    if let Err(e) = run_device(&config) {
        error!("{}", e);
        std::process::exit(e.errno());
    }
}
