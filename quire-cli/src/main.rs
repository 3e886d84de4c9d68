//! The `quire` binary; see the library for the options.

use std::process::ExitCode;

use clap::Parser;
use quire_cli::{run, Options};

fn main() -> ExitCode {
    env_logger::init();

    let options = Options::parse();
    match run(&options) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{e}");
            ExitCode::FAILURE
        }
    }
}
