use std::process::ExitCode;

use clap::Parser;
use openrisk_cli::{execute, Cli};
use openrisk_core::errors::ErrorCode;

fn main() -> ExitCode {
    let cli = Cli::parse();
    openrisk_core::tracing::init_tracing(cli.verbose);

    match execute(&cli) {
        Ok(lines) => {
            for line in lines {
                println!("{line}");
            }
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("{}", err.diagnostic());
            ExitCode::FAILURE
        }
    }
}
