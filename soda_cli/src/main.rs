//! `soda`: dispense-relay controller for the shop vending machine.
//!
//! Exit codes: 0 after a clean stop (operator hold or SIGINT), 1 when
//! startup or the control loop fails.

mod cli;
mod logging;
mod run;

use clap::Parser;
use cli::{Cli, Commands};
use eyre::WrapErr;
use std::process::ExitCode;

fn main() -> ExitCode {
    match real_main() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e:?}");
            ExitCode::FAILURE
        }
    }
}

fn real_main() -> eyre::Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();

    let cfg = load_config(&cli)?;
    cfg.validate().wrap_err("invalid configuration")?;
    logging::init(&cli, &cfg.logging);

    match cli.cmd {
        Commands::Run { sim } => run::run(&cfg, sim),
        Commands::Print => run::print_once(&cfg),
        Commands::SelfCheck => run::self_check(&cfg),
    }
}

fn load_config(cli: &Cli) -> eyre::Result<soda_config::Config> {
    if cli.config.exists() {
        let text = std::fs::read_to_string(&cli.config)
            .wrap_err_with(|| format!("read config {}", cli.config.display()))?;
        soda_config::load_toml(&text)
            .wrap_err_with(|| format!("parse config {}", cli.config.display()))
    } else {
        // Every field has an installed-machine default; a missing file
        // is a plain sim/bench setup, not an error.
        Ok(soda_config::Config::default())
    }
}
