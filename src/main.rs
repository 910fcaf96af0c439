use clap::Parser;
use overnight::cli::{run, Cli};

fn main() -> std::process::ExitCode {
    run(Cli::parse())
}
