// ABOUTME: Configuration management for taskgraph application
// ABOUTME: Handles loading and merging configuration from files and environment variables

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Config {
    /// Tasks run at once; 1 selects the sequential executor.
    #[serde(default = "default_max_workers")]
    pub max_workers: usize,

    #[serde(default)]
    pub continue_on_failure: bool,

    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_max_workers() -> usize {
    1
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_workers: default_max_workers(),
            continue_on_failure: false,
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl Config {
    /// Load configuration from file path or default locations
    pub fn load(path: Option<PathBuf>) -> Result<Self> {
        let config_path = match path {
            Some(p) if !p.exists() => {
                return Err(anyhow!("Config file not found: {}", p.display()));
            }
            Some(p) => Some(p),
            None => Self::find_config_file(),
        };

        let mut config = match config_path {
            Some(path) => {
                let contents = std::fs::read_to_string(&path)?;
                serde_yaml::from_str(&contents)
                    .map_err(|e| anyhow!("Invalid config file {}: {}", path.display(), e))?
            }
            None => Config::default(),
        };

        config.merge_env()?;
        Ok(config)
    }

    /// Find configuration file in standard locations
    fn find_config_file() -> Option<PathBuf> {
        let local = [
            "taskgraph.yaml",
            "taskgraph.yml",
            ".taskgraph.yaml",
            ".taskgraph.yml",
        ]
        .into_iter()
        .map(PathBuf::from)
        .find(|path| path.exists());

        local.or_else(|| {
            dirs::home_dir()
                .map(|home| home.join(".taskgraph").join("config.yaml"))
                .filter(|path| path.exists())
        })
    }

    /// Merge environment variables into configuration
    fn merge_env(&mut self) -> Result<()> {
        self.merge_vars(|key| std::env::var(key).ok())
    }

    fn merge_vars(&mut self, var: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(workers) = var("TASKGRAPH_MAX_WORKERS") {
            self.max_workers = workers
                .parse()
                .map_err(|e| anyhow!("Invalid TASKGRAPH_MAX_WORKERS '{}': {}", workers, e))?;
        }
        if let Some(value) = var("TASKGRAPH_CONTINUE") {
            self.continue_on_failure = parse_flag(&value)
                .ok_or_else(|| anyhow!("Invalid TASKGRAPH_CONTINUE '{}'", value))?;
        }
        if let Some(level) = var("TASKGRAPH_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(format) = var("TASKGRAPH_LOG_FORMAT") {
            self.logging.format = format;
        }
        Ok(())
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
