mod cli;
mod commands;
mod config;
mod drag;
mod layout;
mod locale;
mod logging;
mod model;
mod store;
mod ui;

use anyhow::Result;
use clap::Parser;

fn main() -> Result<()> {
    let mut args = cli::Cli::parse();
    let command = args
        .command
        .take()
        .unwrap_or_else(|| cli::Command::Tui(cli::DayArgs::default()));
    let settings = commands::Settings::load(&args)?;
    let _logger = settings.start_logging()?;
    match command {
        cli::Command::Tui(day) => commands::tui(&settings, day),
        cli::Command::Agenda(day) => commands::agenda(&settings, day),
        cli::Command::Config { init } => commands::config(&args, init),
    }
}
