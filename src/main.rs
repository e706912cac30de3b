//! TinyRelay - file-queue processor and multi-agent conversation orchestrator.

use clap::Parser;
use std::process::ExitCode;

use tinyrelay::{logging, Commands};

#[tokio::main]
async fn main() -> ExitCode {
    // Parse command line arguments
    let args = Commands::parse();

    // Initialize logging; the guard flushes the log file on exit
    let _guard = if args.logs_to_file() {
        let log_dir = match args.paths() {
            Ok(paths) => paths.log_dir,
            Err(e) => {
                eprintln!("Error: {}", e);
                return ExitCode::FAILURE;
            }
        };
        match logging::init(&log_dir) {
            Ok(guard) => Some(guard),
            Err(e) => {
                eprintln!("Failed to initialize logging: {}", e);
                return ExitCode::FAILURE;
            }
        }
    } else {
        logging::init_console();
        None
    };

    // Run the command
    match args.run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{:#}", e);
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
