use clap::Parser;

use rebranch::{
    cli::{self, Cli},
    core::ExitCode,
    logging,
};

fn main() -> std::process::ExitCode {
    // Logging comes up before clap so workspace setup is already traced
    let raw_args: Vec<String> = std::env::args().collect();
    let _log_guard = logging::init_logging(logging::parse_early_log_config(&raw_args));

    let cli = Cli::parse();
    match cli::run(cli) {
        Ok(code) => code.into(),
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::GeneralError.into()
        }
    }
}
