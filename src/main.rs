use clap::Parser;
use barsim::cli::{run, Cli};

fn main() -> std::process::ExitCode {
    run(Cli::parse())
}
