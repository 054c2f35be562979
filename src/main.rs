use std::process::ExitCode;

use cfdtunnel::{error::exit_code, logging, Cli};
use clap::Parser;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let settings = Cli::parse().into_settings();

    if let Err(e) = logging::init(settings.verbosity) {
        eprintln!("cfdtunnel: {e}");
    }

    match cfdtunnel::run(&settings).await {
        Ok(_) => ExitCode::from(exit_code::SUCCESS),
        Err(e) => {
            // Printed unconditionally; the log filter may be off.
            eprintln!("cfdtunnel: {e}");
            tracing::debug!(error = ?e, "fatal error");
            ExitCode::from(e.exit_code())
        }
    }
}
