use std::process::ExitCode;

use clap::Parser;
use pkm_error::{ErrorPolicy, TracingPolicy};

use pkm_cli::cli::Cli;
use pkm_cli::commands;
use pkm_cli::config::PkmConfig;
use pkm_cli::tracing_init;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    tracing_init::init(cli.json_logs);

    let (config, root) = match PkmConfig::load() {
        Ok(resolved) => resolved,
        Err(e) => {
            TracingPolicy.emit(&e);
            return ExitCode::from(1);
        }
    };

    let policy = TracingPolicy;

    tokio::select! {
        result = commands::dispatch(cli.command, &config, &root) => {
            match result {
                Ok(()) => ExitCode::SUCCESS,
                Err(e) => {
                    policy.emit(&e);
                    ExitCode::from(1)
                }
            }
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::warn!("interrupted, exiting cleanly");
            ExitCode::from(130)
        }
    }
}
