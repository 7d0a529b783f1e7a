use crate::cli::{Cli, DayArgs};
use crate::config::{load_config, locate_config, log_dir, save_config, Config, IdStyle};
use crate::layout::TimelineLayout;
use crate::store::{IdSource, RandomIds, SequentialIds, TimelineStore};
use crate::{logging, ui};
use anyhow::{anyhow, Context, Result};
use chrono::{Local, NaiveDate};
use flexi_logger::LoggerHandle;

/// Resolved config plus the command-line overrides.
pub struct Settings {
    pub config: Config,
}

impl Settings {
    pub fn load(cli: &Cli) -> Result<Self> {
        let location = locate_config(cli.config.as_deref())?;
        let mut config = load_config(&location)?;
        if let Some(locale) = cli.locale {
            config.locale = locale;
        }
        if let Some(level) = &cli.log_level {
            config.log_level = level.clone();
        }
        Ok(Settings { config })
    }

    pub fn start_logging(&self) -> Result<LoggerHandle> {
        logging::init(&self.config.log_level, &log_dir()?)
    }

    fn store(&self, args: &DayArgs) -> Result<TimelineStore> {
        let date = parse_date(args.date.as_deref())?;
        let seeds = if args.empty {
            Vec::new()
        } else {
            self.config.seed_tasks.clone()
        };
        let ids: Box<dyn IdSource> = match self.config.id_source {
            IdStyle::Sequential => Box::new(SequentialIds::default()),
            IdStyle::Random => Box::new(RandomIds),
        };
        Ok(TimelineStore::new(
            date,
            seeds,
            self.config.default_color,
            ids,
        ))
    }
}

pub fn tui(settings: &Settings, args: DayArgs) -> Result<()> {
    let store = settings.store(&args)?;
    ui::run(store, &settings.config)
}

pub fn agenda(settings: &Settings, args: DayArgs) -> Result<()> {
    let store = settings.store(&args)?;
    let layout = TimelineLayout::new(settings.config.unit_height);
    println!("{}", settings.config.locale.format_date(store.date()));
    let blocks = layout.layout_tasks(store.tasks());
    if blocks.is_empty() {
        println!("  (no tasks)");
    }
    for (task, block) in store.tasks().iter().zip(&blocks) {
        println!(
            "  {:>2}:00-{:>2}:00  {:<20} {:<7} rows {}..{}",
            task.start,
            task.end(),
            task.name,
            task.color.label(),
            block.top,
            block.bottom()
        );
    }
    Ok(())
}

pub fn config(cli: &Cli, init: bool) -> Result<()> {
    let location = locate_config(cli.config.as_deref())?;
    if init && !location.exists {
        save_config(&location, &Config::default())?;
        println!("Wrote default config to {}", location.path.display());
    }
    let config = load_config(&location)?;
    println!(
        "# {} ({})",
        location.path.display(),
        if location.path.exists() {
            "file"
        } else {
            "defaults"
        }
    );
    print!(
        "{}",
        serde_yaml::to_string(&config).context("serializing config")?
    );
    Ok(())
}

fn parse_date(input: Option<&str>) -> Result<NaiveDate> {
    let raw = match input.map(str::trim) {
        Some(r) if !r.is_empty() => r,
        _ => return Ok(Local::now().date_naive()),
    };
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|_| anyhow!("invalid date format (use YYYY-MM-DD): {}", raw))
}
