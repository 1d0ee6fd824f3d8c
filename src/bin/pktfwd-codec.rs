//! Command line utility for decoding txpk / encoding rxpk objects

#[macro_use]
extern crate log;

use log::LevelFilter;
use structopt::StructOpt;

use radio_pktfwd::helpers::{do_operation, Operation};

#[derive(StructOpt)]
#[structopt(name = "pktfwd-codec")]
/// Packet forwarder codec utility
struct Options {
    #[structopt(subcommand)]
    operation: Operation,

    /// Log level
    #[structopt(long, default_value = "info")]
    log_level: LevelFilter,
}

fn main() {
    let opts = Options::from_args();

    env_logger::Builder::new()
        .filter_level(opts.log_level)
        .init();

    match do_operation(opts.operation) {
        Ok(s) => println!("{}", s),
        Err(e) => {
            error!("{}", e);
            std::process::exit(1);
        }
    }
}
