use clap::Parser;
use filesorter::cli::{Cli, run};
use filesorter::config::SorterConfig;
use filesorter::output::OutputFormatter;
use std::process::ExitCode;

fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match SorterConfig::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            filesorter::logging::init(cli.debug, None);
            OutputFormatter::error(&format!("Error loading configuration: {}", e));
            return ExitCode::FAILURE;
        }
    };
    filesorter::logging::init(cli.debug, config.logging.level.as_deref());

    match run(&cli, config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::debug!(error = ?e, "command failed");
            OutputFormatter::error(&format!("Error: {}", e));
            ExitCode::FAILURE
        }
    }
}
