use anyhow::{Context, Result};
use flexi_logger::{Cleanup, Criterion, FileSpec, Logger, LoggerHandle, Naming, WriteMode};
use log::info;
use std::fs;
use std::path::Path;

const LOG_FILE_BASENAME: &str = "dayline";
const MAX_LOG_FILE_SIZE_BYTES: u64 = 2 * 1024 * 1024;
const MAX_LOG_FILES: usize = 3;

/// Starts file logging. The terminal belongs to the TUI, so nothing goes to
/// stderr. Keep the handle alive for the whole run.
pub fn init(level: &str, dir: &Path) -> Result<LoggerHandle> {
    let level = normalize_level(level)?;
    fs::create_dir_all(dir).with_context(|| format!("creating {:?}", dir))?;
    let handle = Logger::try_with_str(level)
        .with_context(|| format!("invalid log level {}", level))?
        .log_to_file(FileSpec::default().directory(dir).basename(LOG_FILE_BASENAME))
        .rotate(
            Criterion::Size(MAX_LOG_FILE_SIZE_BYTES),
            Naming::Numbers,
            Cleanup::KeepLogFiles(MAX_LOG_FILES),
        )
        .write_mode(WriteMode::BufferAndFlush)
        .append()
        .format_for_files(flexi_logger::detailed_format)
        .start()
        .context("starting logger")?;
    info!(
        "dayline {} started level={} log_dir={}",
        env!("CARGO_PKG_VERSION"),
        level,
        dir.display()
    );
    Ok(handle)
}

fn normalize_level(level: &str) -> Result<&'static str> {
    match level.trim().to_ascii_lowercase().as_str() {
        "off" => Ok("off"),
        "trace" => Ok("trace"),
        "debug" => Ok("debug"),
        "info" => Ok("info"),
        "warn" | "warning" => Ok("warn"),
        "error" => Ok("error"),
        other => anyhow::bail!(
            "unsupported log level {}; expected off|trace|debug|info|warn|error",
            other
        ),
    }
}
