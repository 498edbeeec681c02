use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub bot: BotConfig,
    #[serde(default)]
    pub paths: PathsConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct BotConfig {
    /// Seconds to sleep between poll cycles.
    pub interval: f64,
    /// Reserved for admin-only commands; not consulted by the core loop yet.
    pub admin_id: i64,
    /// API base, e.g. "https://api.telegram.org/bot". The token is appended.
    pub api_url: String,
    /// Bot token.
    pub secret: String,
    /// Initial update cursor. Polling resumes strictly after this id.
    #[serde(default)]
    pub offset: i64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct PathsConfig {
    #[serde(default = "default_chatlogs_dir")]
    pub chatlogs: PathBuf,
    #[serde(default = "default_dict_dir")]
    pub dict: PathBuf,
    #[serde(default = "default_tmp_dir")]
    pub tmp: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            chatlogs: default_chatlogs_dir(),
            dict: default_dict_dir(),
            tmp: default_tmp_dir(),
        }
    }
}

fn default_chatlogs_dir() -> PathBuf {
    PathBuf::from("chatlogs")
}

fn default_dict_dir() -> PathBuf {
    PathBuf::from("dict")
}

fn default_tmp_dir() -> PathBuf {
    PathBuf::from("tmp")
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        if !config.bot.interval.is_finite() || config.bot.interval <= 0.0 {
            anyhow::bail!(
                "interval must be a positive number of seconds, got {}",
                config.bot.interval
            );
        }

        Ok(config)
    }

    /// Creates the chatlogs, dict and tmp directories if they are missing.
    pub fn ensure_directories(&self) -> Result<()> {
        for dir in [&self.paths.chatlogs, &self.paths.dict, &self.paths.tmp] {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create directory: {}", dir.display()))?;
        }
        Ok(())
    }

    pub fn lock_path(&self) -> PathBuf {
        self.paths.tmp.join("telebot.lock")
    }
}
