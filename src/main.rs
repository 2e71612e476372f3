use clap::Parser;
use domain::services::Services;
use log::*;
use service::logging::Logger;
use std::process::ExitCode;

mod cli;
mod commands;
mod views;

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    let cli = cli::Cli::parse();
    Logger::init_logger(&cli.config);

    debug!(
        "Starting {} in {:?} mode",
        env!("CARGO_PKG_NAME"),
        cli.config.service_mode
    );

    let services = match Services::from_config(&cli.config) {
        Ok(services) => services,
        Err(err) => {
            views::print_error(&err);
            return ExitCode::FAILURE;
        }
    };

    match commands::run(&services, &cli.sign_in, cli.command).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            debug!("Command failed: {:?}", err.error_kind);
            views::print_error(&err);
            ExitCode::FAILURE
        }
    }
}
