//! Validate and inspect serialized patchgraph documents on the command line.

use clap::Parser as _;
use clap_verbosity_flag::{InfoLevel, Verbosity, VerbosityFilter};
use patchgraph_cli::CliArgs;
use tracing::level_filters::LevelFilter;

fn main() {
    match CliArgs::parse() {
        CliArgs::Validate(mut args) => {
            init_logging(&args.input_args.verbose);
            run(args.run());
        }
        CliArgs::Describe(mut args) => {
            init_logging(&args.input_args.verbose);
            run(args.run());
        }
        CliArgs::External(_) => {
            // Running `patchgraph COMMAND` would look for `patchgraph-COMMAND`
            // in the path and run it.
            eprintln!("External commands are not supported yet.");
            std::process::exit(1);
        }
        _ => {
            eprintln!("Unknown command");
            std::process::exit(1);
        }
    }
}

fn run(result: anyhow::Result<()>) {
    if let Err(e) = result {
        eprintln!("{e}");
        std::process::exit(1);
    }
}

fn init_logging(verbosity: &Verbosity<InfoLevel>) {
    let filter = match verbosity.filter() {
        VerbosityFilter::Off => LevelFilter::OFF,
        VerbosityFilter::Error => LevelFilter::ERROR,
        VerbosityFilter::Warn => LevelFilter::WARN,
        VerbosityFilter::Info => LevelFilter::INFO,
        VerbosityFilter::Debug => LevelFilter::DEBUG,
        VerbosityFilter::Trace => LevelFilter::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(filter)
        .with_writer(std::io::stderr)
        .without_time()
        .init();
}
