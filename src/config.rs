use crate::locale::Locale;
use crate::model::{Swatch, TaskSeed};
use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum IdStyle {
    #[default]
    Sequential,
    Random,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Terminal rows per hour.
    pub unit_height: u16,
    pub locale: Locale,
    pub default_color: Swatch,
    pub id_source: IdStyle,
    pub log_level: String,
    pub seed_tasks: Vec<TaskSeed>,
}

#[derive(Debug, Clone)]
pub struct ConfigLocation {
    pub path: PathBuf,
    pub exists: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            unit_height: 2,
            locale: Locale::Ja,
            default_color: Swatch::Purple,
            id_source: IdStyle::Sequential,
            log_level: "info".into(),
            seed_tasks: TaskSeed::defaults(),
        }
    }
}

impl Config {
    fn normalized(mut self) -> Self {
        self.unit_height = self.unit_height.max(1);
        self
    }
}

pub fn locate_config(explicit: Option<&Path>) -> Result<ConfigLocation> {
    let path = match explicit {
        Some(path) => path.to_path_buf(),
        None => project_dirs()?.config_dir().join("config.yml"),
    };
    let exists = path.exists();
    Ok(ConfigLocation { path, exists })
}

pub fn load_config(location: &ConfigLocation) -> Result<Config> {
    if !location.path.exists() {
        return Ok(Config::default());
    }
    let data = fs::read_to_string(&location.path)
        .with_context(|| format!("reading {:?}", location.path))?;
    parse_config(&data).with_context(|| format!("parsing {:?}", location.path))
}

pub fn parse_config(data: &str) -> Result<Config> {
    if data.trim().is_empty() {
        return Ok(Config::default());
    }
    let config: Config = serde_yaml::from_str(data)?;
    Ok(config.normalized())
}

pub fn save_config(location: &ConfigLocation, config: &Config) -> Result<()> {
    if let Some(parent) = location.path.parent() {
        fs::create_dir_all(parent).with_context(|| format!("creating {:?}", parent))?;
    }
    let serialized = serde_yaml::to_string(config).context("serializing config")?;
    fs::write(&location.path, serialized)
        .with_context(|| format!("writing {:?}", location.path))?;
    Ok(())
}

pub fn log_dir() -> Result<PathBuf> {
    Ok(project_dirs()?.data_local_dir().join("logs"))
}

fn project_dirs() -> Result<ProjectDirs> {
    ProjectDirs::from("", "", "dayline").context("locating config directory")
}
