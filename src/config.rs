use clap::Parser;
use serde::Deserialize;
use std::path::PathBuf;

use crate::commands::Command;

#[derive(Parser, Debug)]
#[command(name = "linkdeck", about = "A terminal client for link-aggregator communities")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Path to data directory
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    /// Base URL of the backend API
    #[arg(long, global = true)]
    pub base_url: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub api: ApiConfig,
    pub storage: StorageConfig,
    pub display: DisplayConfig,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: String,
    pub key_header: String,
    pub timeout_secs: u64,
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct StorageConfig {
    pub path: Option<PathBuf>,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct DisplayConfig {
    pub max_depth: usize,
    pub indent: usize,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000/api".to_string(),
            key_header: "X-API-Key".to_string(),
            timeout_secs: 15,
        }
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            max_depth: 64,
            indent: 2,
        }
    }
}

impl Config {
    pub fn load(cli: &Cli) -> anyhow::Result<Self> {
        let data_dir = Self::data_dir(cli)?;
        let config_path = cli
            .config
            .clone()
            .unwrap_or_else(|| data_dir.join("config.toml"));

        let mut config = if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            toml::from_str(&content)?
        } else {
            Config::default()
        };

        // CLI overrides
        if let Some(ref base_url) = cli.base_url {
            config.api.base_url = base_url.clone();
        }

        // Resolve paths relative to data dir
        config.storage.path = match config.storage.path.take() {
            None => Some(data_dir.join("linkdeck.db")),
            Some(path) if path.is_relative() => Some(data_dir.join(path)),
            Some(path) => Some(path),
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> anyhow::Result<()> {
        if self.display.max_depth == 0 {
            anyhow::bail!("[display] max_depth must be at least 1");
        }
        Ok(())
    }

    pub fn data_dir(cli: &Cli) -> anyhow::Result<PathBuf> {
        match cli.data_dir {
            Some(ref dir) => Ok(dir.clone()),
            None => dirs::home_dir()
                .map(|home| home.join(".linkdeck"))
                .ok_or_else(|| anyhow::anyhow!("Could not determine home directory")),
        }
    }

    pub fn db_path(&self) -> PathBuf {
        self.storage
            .path
            .clone()
            .unwrap_or_else(|| PathBuf::from("linkdeck.db"))
    }
}
