#![allow(clippy::print_stdout)]

mod args;
mod commands;
mod config;

use crate::args::{Cli, Command};
use crate::config::{AppConfig, LogSettings, load_config};
use anyhow::Context;
use clap::Parser;
use stow_logger::{LevelFilter, Logger};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let cfg: AppConfig =
        load_config(cli.config.as_deref()).context("Critical: Configuration is malformed")?;
    let _logger = init_logger(&cfg.log, cli.verbose)?;

    match cli.command {
        Command::Save { file, name } => {
            let saved = commands::save(&cfg.storage, &file, name.as_deref()).await?;
            println!("{}", saved.name);
        },
        Command::Sanitize { name } => println!("{}", commands::sanitize_report(&name)),
    }

    Ok(())
}

fn init_logger(settings: &LogSettings, verbose: bool) -> anyhow::Result<Logger> {
    let level = if verbose {
        LevelFilter::DEBUG
    } else {
        settings
            .level
            .parse::<LevelFilter>()
            .with_context(|| format!("Unknown log level '{}'", settings.level))?
    };

    let builder = Logger::builder().name(env!("CARGO_BIN_NAME")).console(true).level(level);
    let logger = match &settings.dir {
        Some(dir) => builder.path(dir).json(settings.json).init()?,
        None => builder.init()?,
    };

    Ok(logger)
}
