use std::process::ExitCode;

use clap::Parser;
use log::debug;
use quick_sh_cli::cli_args::Args;
use quick_sh_cli::commands;

fn main() -> ExitCode {
    env_logger::init();
    let args = Args::parse();

    match commands::run(&args) {
        Ok(code) => {
            debug!("Exiting with code {code}");
            // Codes outside 0..=255 cannot be passed through unchanged
            ExitCode::from(u8::try_from(code).unwrap_or(1))
        }
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}
