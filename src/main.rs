//! Binary entry point for the sitedrop CLI.

use std::io::{self, Write};
use std::process;

use clap::Parser;
use thiserror::Error;

use sitedrop::{
    Cli, ConsoleObserver, DeployError, DeployRequest, DeploySettings, Deployer, FtpConnector,
    FtpStoreError, SettingsError, SettingsLoadError,
};

#[derive(Debug, Error)]
enum CliError {
    #[error("configuration error: {0}")]
    Settings(#[from] SettingsLoadError),
    #[error("{0}")]
    Request(#[from] SettingsError),
    #[error("deployment failed: {0}")]
    Deploy(#[from] DeployError<FtpStoreError>),
}

fn main() {
    let cli = Cli::parse();
    let exit_code = match run(cli) {
        Ok(()) => 0,
        Err(err) => {
            report_error(&err);
            1
        }
    };

    process::exit(exit_code);
}

fn run(cli: Cli) -> Result<(), CliError> {
    let mut settings = DeploySettings::load_without_cli_args()?;
    if cli.keep_remote {
        settings.clean_remote = false;
    }
    let request = DeployRequest::new(&cli.local_root, &cli.remote_root)?;

    let mut deployer = Deployer::new(FtpConnector, ConsoleObserver::new(io::stdout()));
    deployer.run(&settings, &request)?;
    Ok(())
}

fn report_error(err: &CliError) {
    write_error(io::stderr(), err);
}

fn write_error(mut target: impl Write, err: &CliError) {
    writeln!(target, "{err}").ok();
}
