use clap::Parser;
use std::io;

use sequence::cli::{Cli, UsageError};
use sequence::config::SequenceConfig;
use sequence::config_file::ConfigFile;
use sequence::logging::init_logging;
use sequence::platform::{is_broken_pipe, ExitCode};
use sequence::runner;

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config_file = match ConfigFile::resolve(cli.config.as_deref()) {
        Ok(file) => file,
        Err(e) => {
            tracing::error!("{:#}", e);
            ExitCode::InvalidUsage.exit();
        }
    };
    let config = SequenceConfig::from_cli(&cli, &config_file);
    tracing::debug!(?config, "configuration resolved");

    if let Err(e) = runner::run(&cli, &config) {
        let broken_pipe = e
            .chain()
            .filter_map(|cause| cause.downcast_ref::<io::Error>())
            .any(is_broken_pipe);
        if broken_pipe {
            // Broken pipe is normal in pipelines - exit quietly
            ExitCode::SignalPipe.exit();
        }

        tracing::error!("{:#}", e);
        if e.downcast_ref::<UsageError>().is_some() {
            ExitCode::InvalidUsage.exit();
        }
        ExitCode::GeneralError.exit();
    }
}
