use urlfetch_core::logging;

mod cli;

use crate::cli::Cli;
use clap::Parser;

#[tokio::main]
async fn main() {
    // A missing INPUT exits here with a usage error, before anything starts.
    let cli = Cli::parse();

    if cli.log_stderr || logging::init_logging().is_err() {
        logging::init_logging_stderr();
    }

    if let Err(err) = cli.run().await {
        eprintln!("urlfetch error: {:#}", err);
        std::process::exit(1);
    }
}
