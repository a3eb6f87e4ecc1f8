//! Binary entrypoint for the PHP AST driver.

use std::io::{self, Write};
use std::process::ExitCode;

use clap::Parser;
use phpast_driver::{Config, run, telemetry};
use phpast_protocol::driver::DRIVER_TARGET;

fn main() -> ExitCode {
    let config = Config::parse();

    match telemetry::initialise(&config) {
        Ok(handle) => handle.announce(&config),
        Err(error) => {
            writeln!(io::stderr().lock(), "{error}").ok();
            return ExitCode::from(2);
        }
    }

    let mut reader = io::stdin().lock();
    let mut writer = io::stdout().lock();

    match run(&config, &mut reader, &mut writer) {
        Ok(summary) => {
            tracing::debug!(
                target: DRIVER_TARGET,
                responses = summary.total(),
                "exiting"
            );
            ExitCode::SUCCESS
        }
        Err(error) => {
            tracing::error!(target: DRIVER_TARGET, %error, "driver stopped");
            writeln!(io::stderr().lock(), "{error}").ok();
            ExitCode::FAILURE
        }
    }
}
