use crate::locale::Locale;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "dayline", version, about = "Terminal day timeline planner")]
pub struct Cli {
    /// Path to a config file (defaults to the platform config dir)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
    /// Language for the date label and dialog
    #[arg(long, global = true, value_enum)]
    pub locale: Option<Locale>,
    /// Log level written to the log file (off, error, warn, info, debug, trace)
    #[arg(long, global = true)]
    pub log_level: Option<String>,
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Launch the interactive timeline
    Tui(DayArgs),
    /// Print the laid-out day without opening the TUI
    Agenda(DayArgs),
    /// Show the resolved configuration
    Config {
        /// Write the default config if the file does not exist yet
        #[arg(long)]
        init: bool,
    },
}

#[derive(Args, Debug, Default)]
pub struct DayArgs {
    /// Day to show in YYYY-MM-DD format (defaults to today)
    #[arg(long)]
    pub date: Option<String>,
    /// Start without the configured seed tasks
    #[arg(long)]
    pub empty: bool,
}
